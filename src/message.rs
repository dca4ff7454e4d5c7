//!# CAN Message
//! This library supports both CAN 2.0 (up to 8 data bytes per CAN frame)
//! and CAN FD (up to 64 data bytes per CAN frame)
//! formats with both standard and extended frame ID formats
//!
//! ## CAN 2.0 message construction example
//! ```
//!# use bytes::Bytes;
//!# use isotp::message::CanMessage;
//!# use embedded_can::{Id,StandardId};
//!#
//! // Frame ID
//! let message_id = Id::Standard(StandardId::new(0x123).unwrap());
//! // Create a classic CAN message with 3 data bytes. DLC is determined by the payload length.
//! let message = CanMessage::new(message_id, Bytes::copy_from_slice(&[0x1, 0x2, 0x3]), false, false).unwrap();
//!
//! assert_eq!(3, message.dlc);
//!```
//! ## CAN FD message construction example
//! ```
//!# use bytes::Bytes;
//!# use isotp::message::CanMessage;
//!# use embedded_can::{Id,StandardId};
//!#
//! let message_id = Id::Standard(StandardId::new(0x123).unwrap());
//! // 22 payload bytes with bit rate switch enabled. The DLC encodes 24 bytes
//! // because 22 is not a supported CAN FD frame length.
//! let message = CanMessage::new(message_id, Bytes::copy_from_slice(&[0u8; 22]), true, true).unwrap();
//!
//! assert_eq!(12, message.dlc);
//! ```

use bytes::Bytes;
use embedded_can::{Frame, Id};

pub const MAX_PAYLOAD_CAN_2_0: usize = 8;

pub const MAX_PAYLOAD_CAN_FD: usize = 64;

/// Data length code
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Copy, Clone)]
#[allow(clippy::upper_case_acronyms)]
pub enum DLC {
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Twelve,
    Sixteen,
    Twenty,
    TwentyFour,
    ThirtyTwo,
    FortyEight,
    SixtyFour,
}

/// Possible errors when creating a [CanMessage] object
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum MessageError {
    /// Payload length invalid
    InvalidLength(usize),
}

impl DLC {
    /// Maps an exact frame length to its DLC
    pub fn from_length(value: usize) -> Result<Self, MessageError> {
        match value {
            0 => Ok(Self::Zero),
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            4 => Ok(Self::Four),
            5 => Ok(Self::Five),
            6 => Ok(Self::Six),
            7 => Ok(Self::Seven),
            8 => Ok(Self::Eight),
            12 => Ok(Self::Twelve),
            16 => Ok(Self::Sixteen),
            20 => Ok(Self::Twenty),
            24 => Ok(Self::TwentyFour),
            32 => Ok(Self::ThirtyTwo),
            48 => Ok(Self::FortyEight),
            64 => Ok(Self::SixtyFour),
            val => Err(MessageError::InvalidLength(val)),
        }
    }

    /// Maps a frame length to the next supported DLC
    pub fn for_length(value: usize) -> Result<Self, MessageError> {
        if value > MAX_PAYLOAD_CAN_FD {
            return Err(MessageError::InvalidLength(value));
        }

        let mut length = value;

        // length used to choose the next supported DLC
        while let Err(MessageError::InvalidLength(_)) = Self::from_length(length) {
            length += 1;
        }

        Self::from_length(length)
    }

    /// Wire DLC code (0..15)
    pub fn code(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Twelve => 9,
            Self::Sixteen => 10,
            Self::Twenty => 11,
            Self::TwentyFour => 12,
            Self::ThirtyTwo => 13,
            Self::FortyEight => 14,
            Self::SixtyFour => 15,
        }
    }

    /// Number of data bytes of a frame with this DLC
    pub fn num_bytes(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Twelve => 12,
            Self::Sixteen => 16,
            Self::Twenty => 20,
            Self::TwentyFour => 24,
            Self::ThirtyTwo => 32,
            Self::FortyEight => 48,
            Self::SixtyFour => 64,
        }
    }
}

/// Smallest supported CAN FD frame length that can hold `size` payload bytes
pub(crate) fn nearest_can_fd_size(size: usize) -> Result<usize, MessageError> {
    Ok(DLC::for_length(size)?.num_bytes())
}

/// CAN message (ISO-11898) as exchanged with the datalink
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CanMessage {
    /// Arbitration ID, 11 bits standard or 29 bits extended
    pub id: Id,
    /// Payload bytes of the frame
    pub data: Bytes,
    /// Data length code matching the payload length
    pub dlc: u8,
    /// Frame has to be transmitted or has been received in a CAN FD frame
    pub is_fd: bool,
    /// Bit rate switching for CAN FD frames
    pub bitrate_switch: bool,
}

impl CanMessage {
    /// Create new CAN message. The DLC is derived from the payload length.
    pub fn new(id: Id, data: Bytes, is_fd: bool, bitrate_switch: bool) -> Result<Self, MessageError> {
        let limit = if is_fd { MAX_PAYLOAD_CAN_FD } else { MAX_PAYLOAD_CAN_2_0 };

        if data.len() > limit {
            return Err(MessageError::InvalidLength(data.len()));
        }

        let dlc = DLC::for_length(data.len())?.code();

        Ok(CanMessage {
            id,
            data,
            dlc,
            is_fd,
            bitrate_switch,
        })
    }

    /// Raw arbitration ID bits
    pub fn raw_id(&self) -> u32 {
        match self.id {
            Id::Standard(sid) => u32::from(sid.as_raw()),
            Id::Extended(eid) => eid.as_raw(),
        }
    }
}

impl Frame for CanMessage {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        CanMessage::new(id.into(), Bytes::copy_from_slice(data), false, false).ok()
    }

    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        // ISO-TP never transmits remote frames
        None
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc as usize
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
}
