//!
//!
//! # Transport layer configuration
//! The [Configuration] struct gathers every tunable of the transport layer.
//! It is validated once when the layer is created.
//!
//! The following example configures a CAN FD layer transmitting 64 bytes
//! frames, asking peers for a block size of 4 and a separation time of 5 ms
//! between consecutive frames.
//!
//!```
//! use isotp::config::Configuration;
//!
//! let config = Configuration {
//!     stmin: 5,
//!     blocksize: 4,
//!     tx_data_length: 64,
//!     can_fd: true,
//!     ..Default::default()
//! };
//!
//! assert!(config.validate().is_ok());
//!```
//!
use serde::{Deserialize, Serialize};

/// Frame lengths a CAN or CAN FD datalink can carry
pub const VALID_TX_DATA_LENGTHS: [u8; 8] = [8, 12, 16, 20, 24, 32, 48, 64];

/// Possible errors when validating a [Configuration]
#[derive(Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// tx_data_length must be one of [VALID_TX_DATA_LENGTHS]
    InvalidTxDataLength(u8),
}

/// Entire configuration of the transport layer
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Raw STmin byte requested from the peer through flow control frames
    pub stmin: u8,

    /// Block size requested from the peer through flow control frames.
    /// 0 means no flow control after the first one.
    pub blocksize: u8,

    /// Ignore the separation time required by the peer and transmit
    /// consecutive frames as fast as possible
    pub squash_stmin_requirement: bool,

    /// N_Bs, milliseconds to wait for a flow control frame before giving up
    pub rx_flowcontrol_timeout: u32,

    /// N_Cr, milliseconds to wait for a consecutive frame before giving up
    pub rx_consecutive_frame_timeout: u32,

    /// Byte used to pad every transmitted frame to `tx_data_length`.
    /// Without it only CAN FD frames are padded, to the closest supported
    /// frame length.
    pub tx_padding: Option<u8>,

    /// Number of flow control wait frames tolerated before the transmission
    /// is aborted. 0 refuses wait frames entirely.
    pub wftmax: u32,

    /// Maximum number of data bytes per transmitted frame.
    /// 8 for CAN 2.0, up to 64 for CAN FD.
    pub tx_data_length: u8,

    /// Incoming frames longer than this are refused with an overflow
    /// flow control
    pub max_frame_size: u32,

    /// Transmit CAN FD frames
    pub can_fd: bool,

    /// Request bit rate switching for transmitted CAN FD frames
    pub bitrate_switch: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            stmin: 0,
            blocksize: 8,
            squash_stmin_requirement: false,
            rx_flowcontrol_timeout: 1000,
            rx_consecutive_frame_timeout: 1000,
            tx_padding: None,
            wftmax: 0,
            tx_data_length: 8,
            max_frame_size: 4095,
            can_fd: false,
            bitrate_switch: false,
        }
    }
}

impl Configuration {
    /// Checks the consistency of the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_TX_DATA_LENGTHS.contains(&self.tx_data_length) {
            return Err(ConfigError::InvalidTxDataLength(self.tx_data_length));
        }

        Ok(())
    }
}
