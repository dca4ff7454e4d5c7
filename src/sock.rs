//!# Kernel ISO-TP sockets
//! The Linux kernel ships its own ISO-TP implementation, exposed as
//! `AF_CAN`/`SOCK_DGRAM` sockets by the
//! [can-isotp](https://github.com/hartkopp/can-isotp) module. This module only
//! configures such sockets: segmentation, flow control and timing all happen
//! in the kernel.
//!
//! ```no_run
//! use isotp::address::Address;
//! use isotp::sock::IsoTpSocket;
//!
//! fn main() -> Result<(), isotp::sock::Error> {
//!     let address = Address::normal_11bits(0x456, 0x123).unwrap();
//!     let mut socket = IsoTpSocket::open("vcan0", &address)?;
//!
//!     socket.write(&[0x01, 0x02, 0x03])?;
//!     let response = socket.read()?;
//!     println!("read {} bytes", response.len());
//!
//!     Ok(())
//! }
//! ```
use crate::address::{Address, TargetAddressType};
use crate::config::Configuration;
use bitflags::bitflags;
use embedded_can::Id;
use libc::{
    bind, c_int, c_short, c_uint, c_void, close, fcntl, if_nametoindex, read, setsockopt, sockaddr, socket, write,
    F_GETFL, F_SETFL, O_NONBLOCK, SOCK_DGRAM,
};
use std::ffi::CString;
use std::io;
use std::mem::size_of;
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, RawFd};
use std::string::String;
use std::time::Duration;
use thiserror::Error;

/// CAN address family
pub const AF_CAN: c_short = 29;

/// CAN protocol family
pub const PF_CAN: c_int = 29;

/// ISO 15765-2 transport protocol
pub const CAN_ISOTP: c_int = 6;

/// Base of the CAN socket option levels
pub const SOL_CAN_BASE: c_int = 100;

/// Option level of the ISO-TP socket options below
pub const SOL_CAN_ISOTP: c_int = SOL_CAN_BASE + CAN_ISOTP;

/// Passes a [IsoTpOptions] struct
pub const CAN_ISOTP_OPTS: c_int = 1;

/// Passes a [FlowControlOptions] struct
pub const CAN_ISOTP_RECV_FC: c_int = 2;

/// Passes a forced tx STmin as u32 nanoseconds
pub const CAN_ISOTP_TX_STMIN: c_int = 3;

/// Passes a forced rx STmin as u32 nanoseconds
pub const CAN_ISOTP_RX_STMIN: c_int = 4;

/// Passes a [LinkLayerOptions] struct
pub const CAN_ISOTP_LL_OPTS: c_int = 5;

/// Set in the arbitration ID to mark a 29 bits identifier
pub const EFF_FLAG: u32 = 0x8000_0000;

/// Valid bits of an 11 bits arbitration ID
pub const SFF_MASK: u32 = 0x0000_07FF;

/// Valid bits of a 29 bits arbitration ID
pub const EFF_MASK: u32 = 0x1FFF_FFFF;

/// Kernel structure size of a classic CAN frame
pub const CAN_MTU: u8 = 16;

/// Kernel structure size of a CAN FD frame
pub const CANFD_MTU: u8 = 72;

/// Buffer size for reading reassembled payloads
const RECV_BUFFER_SIZE: usize = 4096;

bitflags! {
    /// Behaviour flags of [IsoTpOptions], see `linux/can/isotp.h`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IsoTpBehaviour: u32 {
        /// Listen only, do not send flow controls
        const LISTEN_MODE = 0x001;
        /// Enable extended addressing
        const EXTEND_ADDR = 0x002;
        /// Pad transmitted CAN frames
        const TX_PADDING = 0x004;
        /// Expect padding in received CAN frames
        const RX_PADDING = 0x008;
        /// Check the padding length of received CAN frames
        const CHK_PAD_LEN = 0x010;
        /// Check the padding bytes of received CAN frames
        const CHK_PAD_DATA = 0x020;
        /// Half duplex error state handling
        const HALF_DUPLEX = 0x040;
        /// Ignore the STmin received in flow control frames
        const FORCE_TXSTMIN = 0x080;
        /// Ignore consecutive frames arriving faster than the own rx STmin
        const FORCE_RXSTMIN = 0x100;
        /// Use a different extended address for reception
        const RX_EXT_ADDR = 0x200;
    }
}

/// `sockaddr_can` for the transport protocol family
#[derive(Debug)]
#[repr(C)]
struct CanAddr {
    af_can: c_short,
    if_index: c_int,
    rx_id: u32,
    tx_id: u32,
    pgn: u32,
    addr: u8,
}

/// General socket options aka `can_isotp_options`
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct IsoTpOptions {
    flags: u32,
    /// Frame transmission time (N_As/N_Ar) in nanoseconds
    frame_txtime: u32,
    /// Extended address for transmission
    ext_address: u8,
    /// Content of the padding byte on the tx path
    txpad_content: u8,
    /// Content of the padding byte on the rx path
    rxpad_content: u8,
    /// Extended address for reception
    rx_ext_address: u8,
}

impl Default for IsoTpOptions {
    fn default() -> Self {
        // Defaults defined in linux/can/isotp.h
        Self {
            flags: 0x00,
            frame_txtime: 0x00,
            ext_address: 0x00,
            txpad_content: 0xCC,
            rxpad_content: 0xCC,
            rx_ext_address: 0x00,
        }
    }
}

impl IsoTpOptions {
    pub fn flags(&self) -> Option<IsoTpBehaviour> {
        IsoTpBehaviour::from_bits(self.flags)
    }

    pub fn set_flags(&mut self, flags: IsoTpBehaviour) {
        self.flags = flags.bits();
    }

    pub fn frame_txtime(&self) -> Duration {
        Duration::from_nanos(self.frame_txtime.into())
    }

    /// Frame transmission time (N_As/N_Ar), truncated to u32 nanoseconds
    pub fn set_frame_txtime(&mut self, frame_txtime: Duration) {
        self.frame_txtime = frame_txtime.as_nanos().try_into().unwrap_or(u32::MAX);
    }

    pub fn set_ext_address(&mut self, ext_address: u8) {
        self.ext_address = ext_address;
    }

    pub fn set_rx_ext_address(&mut self, rx_ext_address: u8) {
        self.rx_ext_address = rx_ext_address;
    }

    /// Padding byte written on the tx path and expected on the rx path
    pub fn set_padding_content(&mut self, content: u8) {
        self.txpad_content = content;
        self.rxpad_content = content;
    }
}

/// Flow control options aka `can_isotp_fc_options`
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct FlowControlOptions {
    /// Block size sent in flow control frames, 0 is off
    pub bs: u8,
    /// STmin sent in flow control frames, raw encoding
    pub stmin: u8,
    /// Maximum number of wait frames, 0 omits flow control wait frames
    pub wftmax: u8,
}

impl Default for FlowControlOptions {
    fn default() -> Self {
        // Defaults defined in linux/can/isotp.h
        Self {
            bs: 0,
            stmin: 0x00,
            wftmax: 0,
        }
    }
}

impl From<&Configuration> for FlowControlOptions {
    fn from(config: &Configuration) -> Self {
        Self {
            bs: config.blocksize,
            stmin: config.stmin,
            wftmax: config.wftmax.try_into().unwrap_or(u8::MAX),
        }
    }
}

bitflags! {
    /// Flags applied to transmitted CAN FD frames
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxFlags: u8 {
        /// Bit rate switch, second bitrate for payload data
        const CANFD_BRS = 0x01;
        /// Error state indicator of the transmitting node
        const CANFD_ESI = 0x02;
    }
}

/// Link layer options aka `can_isotp_ll_options`
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct LinkLayerOptions {
    /// Generated and accepted CAN frame type, [CAN_MTU] or [CANFD_MTU]
    mtu: u8,
    /// Maximum payload length of transmitted frames: 8, 12, 16, 20, 24, 32, 48 or 64
    tx_dl: u8,
    /// Flags set into the CAN FD frames at creation, e.g. [TxFlags::CANFD_BRS]
    tx_flags: u8,
}

impl LinkLayerOptions {
    pub fn new(mtu: u8, tx_dl: u8, tx_flags: TxFlags) -> Self {
        Self {
            mtu,
            tx_dl,
            tx_flags: tx_flags.bits(),
        }
    }
}

impl Default for LinkLayerOptions {
    fn default() -> Self {
        // Defaults defined in linux/can/isotp.h
        Self {
            mtu: CAN_MTU,
            tx_dl: 8,
            tx_flags: 0x00,
        }
    }
}

impl From<&Configuration> for LinkLayerOptions {
    fn from(config: &Configuration) -> Self {
        let mut tx_flags = TxFlags::empty();
        if config.can_fd && config.bitrate_switch {
            tx_flags |= TxFlags::CANFD_BRS;
        }

        Self::new(
            if config.can_fd { CANFD_MTU } else { CAN_MTU },
            config.tx_data_length,
            tx_flags,
        )
    }
}

/// Possible errors when opening or using a kernel ISO-TP socket
#[derive(Error, Debug)]
pub enum Error {
    /// CAN interface could not be found
    #[error("failed to find CAN interface {name}")]
    InterfaceNotFound { name: String },

    /// Underlying socket operation failed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// A kernel ISO-TP socket, closed upon deallocation.
///
/// Reads return whole reassembled payloads, writes accept whole payloads.
pub struct IsoTpSocket {
    fd: c_int,
    recv_buffer: [u8; RECV_BUFFER_SIZE],
}

impl IsoTpSocket {
    /// Opens a named CAN interface, such as "can0" or "vcan0", with default
    /// socket options and the IDs of the given address
    pub fn open(ifname: &str, address: &Address) -> Result<Self, Error> {
        Self::open_with_opts(
            ifname,
            address,
            Some(IsoTpOptions::default()),
            Some(FlowControlOptions::default()),
            Some(LinkLayerOptions::default()),
        )
    }

    /// Opens a named CAN interface with the given socket options
    pub fn open_with_opts(
        ifname: &str,
        address: &Address,
        isotp_options: Option<IsoTpOptions>,
        flow_control_options: Option<FlowControlOptions>,
        link_layer_options: Option<LinkLayerOptions>,
    ) -> Result<Self, Error> {
        let name = CString::new(ifname).map_err(|_| Error::InterfaceNotFound {
            name: String::from(ifname),
        })?;

        let if_index: c_uint = unsafe { if_nametoindex(name.as_ptr()) };
        if if_index == 0 {
            return Err(Error::InterfaceNotFound {
                name: String::from(ifname),
            });
        }

        Self::open_if_with_opts(
            if_index as c_int,
            address,
            isotp_options,
            flow_control_options,
            link_layer_options,
        )
    }

    /// Opens a CAN interface by kernel interface number
    pub fn open_if(if_index: c_int, address: &Address) -> Result<Self, Error> {
        Self::open_if_with_opts(
            if_index,
            address,
            Some(IsoTpOptions::default()),
            Some(FlowControlOptions::default()),
            Some(LinkLayerOptions::default()),
        )
    }

    /// Opens a CAN interface by kernel interface number with the given
    /// socket options
    pub fn open_if_with_opts(
        if_index: c_int,
        address: &Address,
        isotp_options: Option<IsoTpOptions>,
        flow_control_options: Option<FlowControlOptions>,
        link_layer_options: Option<LinkLayerOptions>,
    ) -> Result<Self, Error> {
        // The kernel has no notion of a target address type, physical is assumed.
        // Functional IDs can be crafted manually in normal addressing modes.
        let tx_id = raw_id(address.tx_arbitration_id(TargetAddressType::Physical), address.is_29bits());
        let rx_id = raw_id(address.rx_arbitration_id(TargetAddressType::Physical), address.is_29bits());

        let addr = CanAddr {
            af_can: AF_CAN,
            if_index,
            rx_id,
            tx_id,
            pgn: 0,
            addr: 0,
        };

        // Extended and mixed addressing map to the extended address options
        let isotp_options = match (isotp_options, address.tx_extension_byte()) {
            (options, None) => options,
            (options, Some(tx_extension)) => {
                let mut options = options.unwrap_or_default();
                let flags = options.flags().unwrap_or(IsoTpBehaviour::empty())
                    | IsoTpBehaviour::EXTEND_ADDR
                    | IsoTpBehaviour::RX_EXT_ADDR;
                options.set_flags(flags);
                options.set_ext_address(tx_extension);
                options.set_rx_ext_address(address.rx_extension_byte().unwrap_or(tx_extension));
                Some(options)
            }
        };

        let fd = unsafe { socket(PF_CAN, SOCK_DGRAM, CAN_ISOTP) };
        if fd == -1 {
            return Err(Error::from(io::Error::last_os_error()));
        }

        let socket = Self {
            fd,
            recv_buffer: [0x00; RECV_BUFFER_SIZE],
        };

        if let Some(isotp_options) = isotp_options {
            socket.set_opt(CAN_ISOTP_OPTS, &isotp_options)?;
        }

        if let Some(flow_control_options) = flow_control_options {
            socket.set_opt(CAN_ISOTP_RECV_FC, &flow_control_options)?;
        }

        if let Some(link_layer_options) = link_layer_options {
            socket.set_opt(CAN_ISOTP_LL_OPTS, &link_layer_options)?;
        }

        let bind_rv = unsafe {
            let sockaddr_ptr = &addr as *const CanAddr;
            bind(
                socket.fd,
                sockaddr_ptr as *const sockaddr,
                size_of::<CanAddr>() as c_uint,
            )
        };

        if bind_rv == -1 {
            return Err(Error::from(io::Error::last_os_error()));
        }

        Ok(socket)
    }

    /// Changes the socket to non-blocking mode
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        let oldfl = unsafe { fcntl(self.fd, F_GETFL) };
        if oldfl == -1 {
            return Err(io::Error::last_os_error());
        }

        let newfl = if nonblocking {
            oldfl | O_NONBLOCK
        } else {
            oldfl & !O_NONBLOCK
        };

        let rv = unsafe { fcntl(self.fd, F_SETFL, newfl) };
        if rv != 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Reads one reassembled payload. Blocks unless the socket is in
    /// non-blocking mode.
    pub fn read(&mut self) -> io::Result<&[u8]> {
        let buffer_ptr = self.recv_buffer.as_mut_ptr() as *mut c_void;

        let read_rv = unsafe { read(self.fd, buffer_ptr, RECV_BUFFER_SIZE) };
        if read_rv < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(&self.recv_buffer[0..read_rv as usize])
    }

    /// Writes one payload, segmented by the kernel
    pub fn write(&self, payload: &[u8]) -> io::Result<()> {
        let write_rv = unsafe {
            let buffer_ptr = payload.as_ptr() as *const c_void;
            write(self.fd, buffer_ptr, payload.len())
        };

        if write_rv != payload.len() as isize {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    fn set_opt<T>(&self, option: c_int, value: &T) -> Result<(), Error> {
        let value_ptr: *const c_void = value as *const T as *const c_void;

        let rv = unsafe { setsockopt(self.fd, SOL_CAN_ISOTP, option, value_ptr, size_of::<T>() as c_uint) };
        if rv == -1 {
            return Err(Error::from(io::Error::last_os_error()));
        }

        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        let rv = unsafe { close(self.fd) };
        if rv == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}

fn raw_id(id: Id, is_29bits: bool) -> u32 {
    let raw = match id {
        Id::Standard(sid) => u32::from(sid.as_raw()),
        Id::Extended(eid) => eid.as_raw(),
    };

    if is_29bits {
        (raw & EFF_MASK) | EFF_FLAG
    } else {
        raw & SFF_MASK
    }
}

impl AsRawFd for IsoTpSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl FromRawFd for IsoTpSocket {
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        Self {
            fd,
            recv_buffer: [0x00; RECV_BUFFER_SIZE],
        }
    }
}

impl IntoRawFd for IsoTpSocket {
    fn into_raw_fd(self) -> RawFd {
        let fd = self.fd;
        std::mem::forget(self);
        fd
    }
}

impl Drop for IsoTpSocket {
    fn drop(&mut self) {
        self.close().ok();
    }
}
