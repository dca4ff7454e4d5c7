use crate::message::{CanMessage, MessageError, DLC};
use bytes::Bytes;
use embedded_can::{ExtendedId, Frame, Id, StandardId};

#[test]
fn test_dlc_from_length() {
    assert_eq!(Ok(DLC::Zero), DLC::from_length(0));
    assert_eq!(Ok(DLC::Seven), DLC::from_length(7));
    assert_eq!(Ok(DLC::Eight), DLC::from_length(8));
    assert_eq!(Ok(DLC::Twelve), DLC::from_length(12));
    assert_eq!(Ok(DLC::SixtyFour), DLC::from_length(64));

    assert_eq!(Err(MessageError::InvalidLength(9)), DLC::from_length(9));
    assert_eq!(Err(MessageError::InvalidLength(63)), DLC::from_length(63));
    assert_eq!(Err(MessageError::InvalidLength(65)), DLC::from_length(65));
}

#[test]
fn test_dlc_for_length_rounds_up() {
    assert_eq!(Ok(DLC::Five), DLC::for_length(5));
    assert_eq!(Ok(DLC::Eight), DLC::for_length(8));
    assert_eq!(Ok(DLC::Twelve), DLC::for_length(9));
    assert_eq!(Ok(DLC::Sixteen), DLC::for_length(13));
    assert_eq!(Ok(DLC::TwentyFour), DLC::for_length(21));
    assert_eq!(Ok(DLC::ThirtyTwo), DLC::for_length(25));
    assert_eq!(Ok(DLC::FortyEight), DLC::for_length(33));
    assert_eq!(Ok(DLC::SixtyFour), DLC::for_length(49));

    assert_eq!(Err(MessageError::InvalidLength(65)), DLC::for_length(65));
}

#[test]
fn test_dlc_codes() {
    assert_eq!(0, DLC::Zero.code());
    assert_eq!(8, DLC::Eight.code());
    assert_eq!(9, DLC::Twelve.code());
    assert_eq!(10, DLC::Sixteen.code());
    assert_eq!(11, DLC::Twenty.code());
    assert_eq!(12, DLC::TwentyFour.code());
    assert_eq!(13, DLC::ThirtyTwo.code());
    assert_eq!(14, DLC::FortyEight.code());
    assert_eq!(15, DLC::SixtyFour.code());

    assert_eq!(12, DLC::Twelve.num_bytes());
    assert_eq!(64, DLC::SixtyFour.num_bytes());
}

#[test]
fn test_message_dlc_matches_payload() {
    let id = Id::Standard(StandardId::new(0x123).unwrap());

    let message = CanMessage::new(id, Bytes::copy_from_slice(&[0u8; 3]), false, false).unwrap();
    assert_eq!(3, message.dlc);

    let message = CanMessage::new(id, Bytes::copy_from_slice(&[0u8; 22]), true, false).unwrap();
    assert_eq!(12, message.dlc);

    let message = CanMessage::new(id, Bytes::copy_from_slice(&[0u8; 64]), true, true).unwrap();
    assert_eq!(15, message.dlc);
    assert!(message.bitrate_switch);
}

#[test]
fn test_message_payload_limits() {
    let id = Id::Standard(StandardId::new(0x123).unwrap());

    assert_eq!(
        Err(MessageError::InvalidLength(9)),
        CanMessage::new(id, Bytes::copy_from_slice(&[0u8; 9]), false, false)
    );

    assert_eq!(
        Err(MessageError::InvalidLength(65)),
        CanMessage::new(id, Bytes::copy_from_slice(&[0u8; 65]), true, false)
    );
}

#[test]
fn test_frame_trait() {
    let standard_id = Id::Standard(StandardId::new(0x7FF).unwrap());
    let message = <CanMessage as Frame>::new(standard_id, &[0x01, 0x02]).unwrap();

    assert!(!message.is_extended());
    assert!(!message.is_remote_frame());
    assert_eq!(standard_id, Frame::id(&message));
    assert_eq!(&[0x01, 0x02], Frame::data(&message));
    assert_eq!(0x7FF, message.raw_id());

    let extended_id = Id::Extended(ExtendedId::new(0x18DA55AA).unwrap());
    let message = <CanMessage as Frame>::new(extended_id, &[]).unwrap();

    assert!(message.is_extended());
    assert_eq!(0x18DA55AA, message.raw_id());

    assert!(<CanMessage as Frame>::new_remote(standard_id, 4).is_none());
}
