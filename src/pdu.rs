//!# ISO-TP protocol data units
//! Decodes the payload of a CAN message into one of the four PDU types of
//! ISO-15765-2 and crafts the raw flow control payload for the transmit path.
//!
//! ```
//! use isotp::pdu::Pdu;
//!
//! // Single frame holding 3 bytes, no address prefix
//! let pdu = Pdu::decode(&[0x03, 0x01, 0x02, 0x03], 0).unwrap();
//!
//! match pdu {
//!     Pdu::SingleFrame { data, .. } => assert_eq!(&[0x01, 0x02, 0x03], data.as_ref()),
//!     _ => unreachable!(),
//! }
//! ```

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use core::fmt;
use embedded_time::duration::Microseconds;

/// Flow status nibble of a flow control frame
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FlowStatus {
    ContinueToSend,
    Wait,
    Overflow,
}

impl FlowStatus {
    fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0 => Some(Self::ContinueToSend),
            1 => Some(Self::Wait),
            2 => Some(Self::Overflow),
            _ => None,
        }
    }

    /// Wire value of the flow status
    pub fn code(self) -> u8 {
        match self {
            Self::ContinueToSend => 0,
            Self::Wait => 1,
            Self::Overflow => 2,
        }
    }
}

/// Possible errors when decoding the payload of a CAN message
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DecodeError {
    /// Message is missing data according to the prefix size of the address
    ShorterThanPrefix,
    /// No PCI byte after the address prefix
    EmptyPdu,
    /// First nibble is not a known frame type
    UnknownFrameType(u8),
    /// Announced single frame length exceeds the room left in the frame
    TruncatedSingleFrame { length: u8, room: u8 },
    /// Single frame with escape sequence requires a second length byte
    ShortEscapeSingleFrame,
    /// Escape sequence announcing a length of 0 bytes
    ZeroLengthSingleFrame,
    /// Escape sequence inside a frame of 8 bytes or less, where the length
    /// must be encoded in the first byte
    UnexpectedEscapeSequence,
    /// First frame shorter than its length field
    TruncatedFirstFrame,
    /// Flow control frames require at least 3 bytes
    TruncatedFlowControl,
    /// Flow status nibble above 2
    UnknownFlowStatus(u8),
    /// STmin byte inside a reserved range
    InvalidStMin(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShorterThanPrefix => write!(f, "message is missing data according to prefix size"),
            Self::EmptyPdu => write!(f, "empty CAN frame"),
            Self::UnknownFrameType(nibble) => write!(f, "unknown frame type {nibble}"),
            Self::TruncatedSingleFrame { length, room } => write!(
                f,
                "single frame with length of {length} while there is room for {room} bytes of data"
            ),
            Self::ShortEscapeSingleFrame => {
                write!(f, "single frame with escape sequence is missing its length byte")
            }
            Self::ZeroLengthSingleFrame => write!(f, "single frame with length of 0 bytes"),
            Self::UnexpectedEscapeSequence => {
                write!(f, "escape sequence inside a frame of 8 bytes or less")
            }
            Self::TruncatedFirstFrame => write!(f, "first frame shorter than its length field"),
            Self::TruncatedFlowControl => write!(f, "flow control frame must be at least 3 bytes"),
            Self::UnknownFlowStatus(status) => write!(f, "unknown flow status {status}"),
            Self::InvalidStMin(raw) => write!(f, "invalid STmin 0x{raw:02X} received in flow control"),
        }
    }
}

/// Protocol data unit carried by a single CAN message
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Pdu {
    SingleFrame {
        length: u8,
        data: Bytes,
        escape_sequence: bool,
        /// Data length of the carrying CAN message, prefix included
        can_dl: u8,
    },
    FirstFrame {
        length: u32,
        data: Bytes,
        escape_sequence: bool,
        /// Effective frame length the sender committed to, `max(8, can_dl)`
        rx_dl: u8,
    },
    ConsecutiveFrame {
        seqnum: u8,
        data: Bytes,
        rx_dl: u8,
    },
    FlowControl {
        flow_status: FlowStatus,
        blocksize: u8,
        /// Raw STmin byte as found on the wire
        stmin: u8,
        /// Decoded minimum separation time
        stmin_duration: Microseconds<u32>,
    },
}

impl Pdu {
    /// Decodes the full payload of a CAN message, skipping `prefix_size` bytes
    /// of addressing prefix before the PCI byte.
    pub fn decode(frame_data: &[u8], prefix_size: usize) -> Result<Self, DecodeError> {
        if frame_data.len() < prefix_size {
            return Err(DecodeError::ShorterThanPrefix);
        }

        // CAN_DL covers the whole frame, prefix included
        let can_dl = frame_data.len() as u8;
        let rx_dl = can_dl.max(8);
        let data = &frame_data[prefix_size..];

        let pci = *data.first().ok_or(DecodeError::EmptyPdu)?;

        match pci >> 4 {
            0 => Self::decode_single_frame(data, can_dl),
            1 => Self::decode_first_frame(data, rx_dl),
            2 => Ok(Pdu::ConsecutiveFrame {
                seqnum: pci & 0xF,
                data: Bytes::copy_from_slice(&data[1..]),
                rx_dl,
            }),
            3 => Self::decode_flow_control(data),
            nibble => Err(DecodeError::UnknownFrameType(nibble)),
        }
    }

    fn decode_single_frame(data: &[u8], can_dl: u8) -> Result<Self, DecodeError> {
        let length = data[0] & 0xF;

        if length != 0 {
            let room = (data.len() - 1) as u8;
            if length > room {
                return Err(DecodeError::TruncatedSingleFrame { length, room });
            }

            return Ok(Pdu::SingleFrame {
                length,
                data: Bytes::copy_from_slice(&data[1..1 + usize::from(length)]),
                escape_sequence: false,
                can_dl,
            });
        }

        // Escape sequence, the length stands in the second byte
        if data.len() < 2 {
            return Err(DecodeError::ShortEscapeSingleFrame);
        }
        if can_dl <= 8 {
            return Err(DecodeError::UnexpectedEscapeSequence);
        }

        let length = data[1];
        if length == 0 {
            return Err(DecodeError::ZeroLengthSingleFrame);
        }

        let room = (data.len() - 2) as u8;
        if length > room {
            return Err(DecodeError::TruncatedSingleFrame { length, room });
        }

        Ok(Pdu::SingleFrame {
            length,
            data: Bytes::copy_from_slice(&data[2..2 + usize::from(length)]),
            escape_sequence: true,
            can_dl,
        })
    }

    fn decode_first_frame(data: &[u8], rx_dl: u8) -> Result<Self, DecodeError> {
        if data.len() < 2 {
            return Err(DecodeError::TruncatedFirstFrame);
        }

        let length = u32::from(data[0] & 0xF) << 8 | u32::from(data[1]);

        if length != 0 {
            // Frame is maximum 4095 bytes
            let end = (data.len() - 2).min(length as usize);
            return Ok(Pdu::FirstFrame {
                length,
                data: Bytes::copy_from_slice(&data[2..2 + end]),
                escape_sequence: false,
                rx_dl,
            });
        }

        // Frame is larger than 4095 bytes, length stands in the next 4 bytes
        if data.len() < 6 {
            return Err(DecodeError::TruncatedFirstFrame);
        }

        let length = BigEndian::read_u32(&data[2..6]);
        let end = (data.len() - 6).min(length as usize);

        Ok(Pdu::FirstFrame {
            length,
            data: Bytes::copy_from_slice(&data[6..6 + end]),
            escape_sequence: true,
            rx_dl,
        })
    }

    fn decode_flow_control(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < 3 {
            return Err(DecodeError::TruncatedFlowControl);
        }

        let nibble = data[0] & 0xF;
        let flow_status = FlowStatus::from_nibble(nibble).ok_or(DecodeError::UnknownFlowStatus(nibble))?;

        let stmin = data[2];
        let stmin_duration = stmin_to_duration(stmin).ok_or(DecodeError::InvalidStMin(stmin))?;

        Ok(Pdu::FlowControl {
            flow_status,
            blocksize: data[1],
            stmin,
            stmin_duration,
        })
    }
}

/// Raw payload of a flow control frame, without addressing prefix
pub fn flow_control_data(flow_status: FlowStatus, blocksize: u8, stmin: u8) -> [u8; 3] {
    [0x30 | flow_status.code(), blocksize, stmin]
}

/// Decodes the raw STmin byte. Values 0x00-0x7F map to milliseconds,
/// 0xF1-0xF9 to multiples of 100 microseconds, everything else is reserved.
pub fn stmin_to_duration(raw: u8) -> Option<Microseconds<u32>> {
    match raw {
        0x00..=0x7F => Some(Microseconds::new(u32::from(raw) * 1_000)),
        0xF1..=0xF9 => Some(Microseconds::new(u32::from(raw - 0xF0) * 100)),
        _ => None,
    }
}
