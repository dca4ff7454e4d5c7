//!# ISO-TP addressing
//! The [Address] object carries the addressing information (N_AI) of an ISO-TP
//! endpoint. It decides which incoming CAN messages belong to this endpoint and
//! how outgoing messages are crafted to reach the peer.
//!
//! Each [AddressingMode] requires its own set of identifiers, so the address is
//! built through one constructor per mode:
//!
//! ```
//! use isotp::address::Address;
//!
//! // Normal addressing, 11 bits arbitration IDs
//! let address = Address::normal_11bits(0x456, 0x123).unwrap();
//!
//! assert!(!address.is_29bits());
//! assert_eq!(0, address.rx_prefix_size());
//!
//! // Mixed addressing, 29 bits arbitration IDs carrying target/source addresses
//! let address = Address::mixed_29bits(0x55, 0xAA, 0x99).unwrap();
//!
//! assert_eq!(Some(0x99), address.tx_extension_byte());
//! ```

use crate::message::CanMessage;
use embedded_can::{ExtendedId, Id, StandardId};
use serde::{Deserialize, Serialize};

/// Highest valid 11 bits arbitration ID
pub const MAX_STANDARD_ID: u32 = 0x7FF;

/// Highest valid 29 bits arbitration ID
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// Addressing mode defined by ISO-15765-2 section 10
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AddressingMode {
    Normal11Bits,
    Normal29Bits,
    NormalFixed29Bits,
    Extended11Bits,
    Extended29Bits,
    Mixed11Bits,
    Mixed29Bits,
}

/// Communication model of an outgoing message
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TargetAddressType {
    /// 1 to 1 communication
    Physical,
    /// 1 to n communication
    Functional,
}

/// Possible errors when creating an [Address] object
#[derive(Debug, Eq, PartialEq)]
pub enum AddressError {
    /// Arbitration ID does not fit the identifier format of the mode
    IdOutOfRange(u32),
    /// txid and rxid must be different for this mode
    ConflictingIds(u32),
}

/// Addressing information of the transport layer, immutable once built
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Address {
    mode: AddressingMode,
    txid: Option<u32>,
    rxid: Option<u32>,
    target_address: Option<u8>,
    source_address: Option<u8>,
    address_extension: Option<u8>,
    is_29bits: bool,
    tx_id_physical: u32,
    tx_id_functional: u32,
    rx_id_physical: u32,
    rx_id_functional: u32,
}

impl Address {
    /// Normal addressing with 11 bits arbitration IDs
    pub fn normal_11bits(txid: u32, rxid: u32) -> Result<Self, AddressError> {
        Self::from_ids(AddressingMode::Normal11Bits, txid, rxid, false)
    }

    /// Normal addressing with 29 bits arbitration IDs
    pub fn normal_29bits(txid: u32, rxid: u32) -> Result<Self, AddressError> {
        Self::from_ids(AddressingMode::Normal29Bits, txid, rxid, true)
    }

    /// Normal fixed addressing. Arbitration IDs are derived from the target and
    /// source addresses embedded in the 29 bits identifier.
    pub fn normal_fixed_29bits(target_address: u8, source_address: u8) -> Result<Self, AddressError> {
        Ok(Address {
            mode: AddressingMode::NormalFixed29Bits,
            txid: None,
            rxid: None,
            target_address: Some(target_address),
            source_address: Some(source_address),
            address_extension: None,
            is_29bits: true,
            tx_id_physical: 0x1800_0000 | 0xDA_0000 | (u32::from(target_address) << 8) | u32::from(source_address),
            tx_id_functional: 0x1800_0000 | 0xDB_0000 | (u32::from(target_address) << 8) | u32::from(source_address),
            rx_id_physical: 0x1800_0000 | 0xDA_0000 | (u32::from(source_address) << 8) | u32::from(target_address),
            rx_id_functional: 0x1800_0000 | 0xDB_0000 | (u32::from(source_address) << 8) | u32::from(target_address),
        })
    }

    /// Extended addressing with 11 bits arbitration IDs. The target address is
    /// prepended to every transmitted payload, the source address is expected in
    /// front of every received one.
    pub fn extended_11bits(
        txid: u32,
        rxid: u32,
        target_address: u8,
        source_address: u8,
    ) -> Result<Self, AddressError> {
        let mut address = Self::from_ids(AddressingMode::Extended11Bits, txid, rxid, false)?;
        address.target_address = Some(target_address);
        address.source_address = Some(source_address);
        Ok(address)
    }

    /// Extended addressing with 29 bits arbitration IDs
    pub fn extended_29bits(
        txid: u32,
        rxid: u32,
        target_address: u8,
        source_address: u8,
    ) -> Result<Self, AddressError> {
        let mut address = Self::from_ids(AddressingMode::Extended29Bits, txid, rxid, true)?;
        address.target_address = Some(target_address);
        address.source_address = Some(source_address);
        Ok(address)
    }

    /// Mixed addressing with 11 bits arbitration IDs. The address extension is
    /// prepended to every transmitted payload.
    pub fn mixed_11bits(txid: u32, rxid: u32, address_extension: u8) -> Result<Self, AddressError> {
        if txid > MAX_STANDARD_ID {
            return Err(AddressError::IdOutOfRange(txid));
        }
        if rxid > MAX_STANDARD_ID {
            return Err(AddressError::IdOutOfRange(rxid));
        }

        Ok(Address {
            mode: AddressingMode::Mixed11Bits,
            txid: Some(txid),
            rxid: Some(rxid),
            target_address: None,
            source_address: None,
            address_extension: Some(address_extension),
            is_29bits: false,
            tx_id_physical: txid,
            tx_id_functional: txid,
            rx_id_physical: rxid,
            rx_id_functional: rxid,
        })
    }

    /// Mixed addressing with 29 bits arbitration IDs carrying the target and
    /// source addresses, plus an address extension byte in every payload
    pub fn mixed_29bits(target_address: u8, source_address: u8, address_extension: u8) -> Result<Self, AddressError> {
        Ok(Address {
            mode: AddressingMode::Mixed29Bits,
            txid: None,
            rxid: None,
            target_address: Some(target_address),
            source_address: Some(source_address),
            address_extension: Some(address_extension),
            is_29bits: true,
            tx_id_physical: 0x1800_0000 | 0xCE_0000 | (u32::from(target_address) << 8) | u32::from(source_address),
            tx_id_functional: 0x1800_0000 | 0xCD_0000 | (u32::from(target_address) << 8) | u32::from(source_address),
            rx_id_physical: 0x1800_0000 | 0xCE_0000 | (u32::from(source_address) << 8) | u32::from(target_address),
            rx_id_functional: 0x1800_0000 | 0xCD_0000 | (u32::from(source_address) << 8) | u32::from(target_address),
        })
    }

    fn from_ids(mode: AddressingMode, txid: u32, rxid: u32, is_29bits: bool) -> Result<Self, AddressError> {
        let max = if is_29bits { MAX_EXTENDED_ID } else { MAX_STANDARD_ID };

        if txid > max {
            return Err(AddressError::IdOutOfRange(txid));
        }
        if rxid > max {
            return Err(AddressError::IdOutOfRange(rxid));
        }
        if txid == rxid {
            return Err(AddressError::ConflictingIds(txid));
        }

        Ok(Address {
            mode,
            txid: Some(txid),
            rxid: Some(rxid),
            target_address: None,
            source_address: None,
            address_extension: None,
            is_29bits,
            tx_id_physical: txid,
            tx_id_functional: txid,
            rx_id_physical: rxid,
            rx_id_functional: rxid,
        })
    }

    pub fn mode(&self) -> AddressingMode {
        self.mode
    }

    pub fn is_29bits(&self) -> bool {
        self.is_29bits
    }

    pub fn txid(&self) -> Option<u32> {
        self.txid
    }

    pub fn rxid(&self) -> Option<u32> {
        self.rxid
    }

    pub fn target_address(&self) -> Option<u8> {
        self.target_address
    }

    pub fn source_address(&self) -> Option<u8> {
        self.source_address
    }

    pub fn address_extension(&self) -> Option<u8> {
        self.address_extension
    }

    /// Arbitration ID of transmitted messages
    pub fn tx_arbitration_id(&self, address_type: TargetAddressType) -> Id {
        match address_type {
            TargetAddressType::Physical => self.make_id(self.tx_id_physical),
            TargetAddressType::Functional => self.make_id(self.tx_id_functional),
        }
    }

    /// Arbitration ID of received messages
    pub fn rx_arbitration_id(&self, address_type: TargetAddressType) -> Id {
        match address_type {
            TargetAddressType::Physical => self.make_id(self.rx_id_physical),
            TargetAddressType::Functional => self.make_id(self.rx_id_functional),
        }
    }

    /// Byte prepended to every transmitted payload, if the mode requires one
    pub fn tx_extension_byte(&self) -> Option<u8> {
        match self.mode {
            AddressingMode::Extended11Bits | AddressingMode::Extended29Bits => self.target_address,
            AddressingMode::Mixed11Bits | AddressingMode::Mixed29Bits => self.address_extension,
            _ => None,
        }
    }

    /// Byte expected in front of every received payload, if the mode requires one
    pub fn rx_extension_byte(&self) -> Option<u8> {
        match self.mode {
            AddressingMode::Extended11Bits | AddressingMode::Extended29Bits => self.source_address,
            AddressingMode::Mixed11Bits | AddressingMode::Mixed29Bits => self.address_extension,
            _ => None,
        }
    }

    /// Number of payload bytes taken by the tx prefix (0 or 1)
    pub fn tx_prefix_size(&self) -> usize {
        usize::from(self.tx_extension_byte().is_some())
    }

    /// Number of payload bytes to skip before PDU decoding (0 or 1)
    pub fn rx_prefix_size(&self) -> usize {
        usize::from(self.rx_extension_byte().is_some())
    }

    /// Returns `true` when the given message is addressed to this endpoint
    pub fn accepts(&self, msg: &CanMessage) -> bool {
        if self.is_29bits != matches!(msg.id, Id::Extended(_)) {
            return false;
        }

        let arb = msg.raw_id();

        match self.mode {
            AddressingMode::Normal11Bits | AddressingMode::Normal29Bits => Some(arb) == self.rxid,
            AddressingMode::NormalFixed29Bits => {
                matches!((arb >> 16) & 0xFF, 0xDA | 0xDB)
                    && Some(((arb >> 8) & 0xFF) as u8) == self.source_address
                    && Some((arb & 0xFF) as u8) == self.target_address
            }
            AddressingMode::Extended11Bits | AddressingMode::Extended29Bits => {
                Some(arb) == self.rxid && msg.data.first().copied() == self.source_address
            }
            AddressingMode::Mixed11Bits => {
                Some(arb) == self.rxid && msg.data.first().copied() == self.address_extension
            }
            AddressingMode::Mixed29Bits => {
                matches!((arb >> 16) & 0xFF, 0xCD | 0xCE)
                    && Some(((arb >> 8) & 0xFF) as u8) == self.source_address
                    && Some((arb & 0xFF) as u8) == self.target_address
                    && msg.data.first().copied() == self.address_extension
            }
        }
    }

    fn make_id(&self, raw: u32) -> Id {
        if self.is_29bits {
            Id::Extended(ExtendedId::new(raw & MAX_EXTENDED_ID).unwrap())
        } else {
            Id::Standard(StandardId::new((raw & MAX_STANDARD_ID) as u16).unwrap())
        }
    }
}
