//!# Protocol anomalies
//! Every anomaly the two state machines can detect is a variant of
//! [IsoTpError]. Anomalies never abort processing: they are handed to the
//! error handler registered on the transport layer, the faulty state machine
//! resets to idle and the other direction keeps running.

use crate::pdu::DecodeError;
use alloc::boxed::Box;
use core::fmt;

/// Callback receiving every detected protocol anomaly
pub type ErrorHandler = Box<dyn FnMut(&IsoTpError)>;

/// Closed set of protocol anomalies defined by ISO-15765-2
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IsoTpError {
    /// No flow control received within N_Bs after a first frame or a
    /// completed block. Transmission is aborted.
    FlowControlTimeout,

    /// No consecutive frame received within N_Cr. The assembly buffer is
    /// discarded.
    ConsecutiveFrameTimeout,

    /// A received frame could not be decoded into a PDU
    InvalidCanData(DecodeError),

    /// Flow control received while no transmission was in progress
    UnexpectedFlowControl,

    /// Consecutive frame received while reception was idle
    UnexpectedConsecutiveFrame,

    /// An ongoing reception was interrupted by a new single frame.
    /// The single frame is delivered, the assembly buffer is discarded.
    ReceptionInterruptedWithSingleFrame,

    /// An ongoing reception was interrupted by a new first frame.
    /// A new reception starts, the previous assembly buffer is discarded.
    ReceptionInterruptedWithFirstFrame,

    /// Consecutive frame carrying the wrong sequence number
    WrongSequenceNumber { expected: u8, received: u8 },

    /// Peer requested to wait but wftmax forbids wait frames
    UnsupportedWaitFrame,

    /// Peer requested to wait more than wftmax times in a row
    MaximumWaitFrameReached { count: u32 },

    /// First frame announcing a length above max_frame_size. The peer is
    /// notified with an overflow flow control.
    FrameTooLong { length: u32, max_frame_size: u32 },

    /// Consecutive frame with a different frame length than the first frame
    /// of the block while more data was expected
    ChangingInvalidRxDl { received: u8, expected: u8 },

    /// Single frame conveyed on a CAN message with a data length above
    /// 8 bytes must encode its length on the second byte
    MissingEscapeSequence,

    /// First frame received with a frame length that no CAN FD frame has
    InvalidCanFdFirstFrameRxDl { rx_dl: u8 },

    /// Peer signaled an overflow, transmission is aborted
    Overflow,
}

impl fmt::Display for IsoTpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlowControlTimeout => {
                write!(f, "reception of flow control timed out, stopping transmission")
            }
            Self::ConsecutiveFrameTimeout => write!(f, "reception of consecutive frame timed out"),
            Self::InvalidCanData(reason) => write!(f, "received invalid CAN frame: {reason}"),
            Self::UnexpectedFlowControl => {
                write!(f, "received a flow control while transmission was idle, ignoring")
            }
            Self::UnexpectedConsecutiveFrame => {
                write!(f, "received a consecutive frame while reception was idle, ignoring")
            }
            Self::ReceptionInterruptedWithSingleFrame => {
                write!(f, "reception interrupted with a new single frame")
            }
            Self::ReceptionInterruptedWithFirstFrame => {
                write!(f, "reception interrupted with a new first frame")
            }
            Self::WrongSequenceNumber { expected, received } => write!(
                f,
                "received a consecutive frame with wrong sequence number, expecting 0x{expected:X}, received 0x{received:X}"
            ),
            Self::UnsupportedWaitFrame => {
                write!(f, "received a flow control requesting to wait, but wftmax is set to 0")
            }
            Self::MaximumWaitFrameReached { count } => {
                write!(f, "received {count} wait frames, the maximum allowed by wftmax")
            }
            Self::FrameTooLong { length, max_frame_size } => write!(
                f,
                "received a first frame with a length of {length} bytes, but max_frame_size is {max_frame_size} bytes, ignoring"
            ),
            Self::ChangingInvalidRxDl { received, expected } => write!(
                f,
                "received a consecutive frame with RX_DL={received} while expecting RX_DL={expected}, ignoring frame"
            ),
            Self::MissingEscapeSequence => write!(
                f,
                "single frames conveyed on a CAN message with a data length above 8 bytes must encode their length on the second byte"
            ),
            Self::InvalidCanFdFirstFrameRxDl { rx_dl } => write!(
                f,
                "received a first frame with an RX_DL value of {rx_dl} which is invalid according to ISO-15765-2"
            ),
            Self::Overflow => {
                write!(f, "received a flow control indicating an overflow, stopping transmission")
            }
        }
    }
}
