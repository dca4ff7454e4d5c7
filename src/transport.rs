//!# ISO-TP transport layer
//!
//!```
//! use bytes::Bytes;
//! use isotp::address::{Address, TargetAddressType};
//! use isotp::config::Configuration;
//! use isotp::example::{link_pair, ExampleClock};
//! use isotp::transport::TransportLayer;
//!
//! // Two endpoints wired back-to-back through an in-memory datalink
//! let (link_a, link_b) = link_pair();
//!
//! let address_a = Address::normal_11bits(0x456, 0x123).unwrap();
//! let address_b = Address::normal_11bits(0x123, 0x456).unwrap();
//!
//! let mut sender =
//!     TransportLayer::new(link_a, ExampleClock::default(), address_a, Configuration::default()).unwrap();
//! let mut receiver =
//!     TransportLayer::new(link_b, ExampleClock::default(), address_b, Configuration::default()).unwrap();
//!
//! sender.send(Bytes::from_static(&[0x01, 0x02, 0x03]), TargetAddressType::Physical).unwrap();
//!
//! while sender.transmitting() {
//!     sender.process().unwrap();
//!     receiver.process().unwrap();
//! }
//!
//! assert_eq!(Some(Bytes::from_static(&[0x01, 0x02, 0x03])), receiver.recv());
//! ```
use crate::address::{Address, TargetAddressType};
use crate::config::{ConfigError, Configuration};
use crate::error::{ErrorHandler, IsoTpError};
use crate::message::{nearest_can_fd_size, CanMessage, DLC};
use crate::pdu::{flow_control_data, DecodeError, FlowStatus, Pdu};
use crate::timer::Timer;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use embedded_can::Id;
use embedded_time::duration::{Microseconds, Milliseconds};
use embedded_time::{Clock, Instant};
use log::{debug, warn};

/// Byte used to pad frames when the configuration does not provide one
const DEFAULT_PADDING_BYTE: u8 = 0xCC;

/// Maximum number of payloads awaiting transmission
const TX_QUEUE_CAPACITY: usize = 32;

/// Maximum number of reassembled payloads awaiting [TransportLayer::recv]
const RX_QUEUE_CAPACITY: usize = 32;

/// Arbitration IDs reserved by ISO-15765
const RESERVED_IDS: [core::ops::RangeInclusive<u32>; 2] = [0x7F4..=0x7F6, 0x7FA..=0x7FB];

/// Frame level access to the CAN layer
pub trait Datalink {
    type Error;

    /// Enqueue a frame for transmission
    fn transmit(&mut self, msg: &CanMessage) -> Result<(), Self::Error>;

    /// Next received frame, if any. Must not block.
    fn receive(&mut self) -> Result<Option<CanMessage>, Self::Error>;
}

/// Possible errors when driving the transport layer
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessError<E> {
    /// Datalink failed to send or receive a frame
    Link(E),

    /// Monotonic clock failure
    Clock,
}

impl<E> From<embedded_time::clock::Error> for ProcessError<E> {
    fn from(_error: embedded_time::clock::Error) -> Self {
        ProcessError::Clock
    }
}

/// Possible errors when enqueueing a payload
#[derive(Debug, PartialEq, Eq)]
pub enum SendError {
    /// Transmit queue is full
    QueueFull,

    /// Functional addressing carries single frames only
    FunctionalPayloadTooLong(usize),
}

/// Possible errors of a blocking send
#[derive(Debug, PartialEq, Eq)]
pub enum BlockingSendError<E> {
    /// Payload was not fully transmitted within the allowed time
    Timeout,

    /// Payload was refused
    Send(SendError),

    /// Transport layer could not be driven
    Process(ProcessError<E>),
}

impl<E> From<SendError> for BlockingSendError<E> {
    fn from(error: SendError) -> Self {
        BlockingSendError::Send(error)
    }
}

impl<E> From<ProcessError<E>> for BlockingSendError<E> {
    fn from(error: ProcessError<E>) -> Self {
        BlockingSendError::Process(error)
    }
}

impl<E> From<embedded_time::clock::Error> for BlockingSendError<E> {
    fn from(_error: embedded_time::clock::Error) -> Self {
        BlockingSendError::Process(ProcessError::Clock)
    }
}

/// State of the reception state machine
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum RxState {
    Idle,
    WaitConsecutiveFrame,
}

/// State of the transmission state machine
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum TxState {
    Idle,
    WaitFlowControl,
    TransmitConsecutiveFrame,
}

struct TxRequest {
    data: Bytes,
    target_address_type: TargetAddressType,
}

/// The ISO-TP transport layer.
///
/// [TransportLayer::process] must be called periodically, as fast as possible.
/// It never blocks; [TransportLayer::sleep_time] hints how long a driving
/// worker may sleep between calls.
pub struct TransportLayer<L: Datalink, C: Clock> {
    link: L,
    clock: C,
    address: Address,
    config: Configuration,
    error_handler: Option<ErrorHandler>,

    tx_queue: VecDeque<TxRequest>,
    rx_queue: VecDeque<Bytes>,

    rx_state: RxState,
    tx_state: TxState,

    rx_buffer: Vec<u8>,
    rx_frame_length: u32,
    rx_block_counter: u32,
    last_seqnum: u8,
    actual_rxdl: Option<u8>,
    pending_flow_control: Option<FlowStatus>,
    last_flow_control: Option<Pdu>,

    tx_buffer: Bytes,
    tx_frame_length: u32,
    tx_block_counter: u32,
    tx_seqnum: u8,
    wft_counter: u32,
    remote_blocksize: Option<u8>,

    timer_tx_stmin: Timer<C>,
    timer_rx_fc: Timer<C>,
    timer_rx_cf: Timer<C>,
}

impl<L: Datalink, C: Clock> TransportLayer<L, C> {
    /// Creates a transport layer bound to the given datalink and address.
    /// The configuration is validated once here.
    pub fn new(link: L, clock: C, address: Address, config: Configuration) -> Result<Self, ConfigError> {
        config.validate()?;
        warn_reserved_ids(&address);

        Ok(Self {
            link,
            clock,
            address,
            error_handler: None,
            tx_queue: VecDeque::new(),
            rx_queue: VecDeque::new(),
            rx_state: RxState::Idle,
            tx_state: TxState::Idle,
            rx_buffer: Vec::new(),
            rx_frame_length: 0,
            rx_block_counter: 0,
            last_seqnum: 0,
            actual_rxdl: None,
            pending_flow_control: None,
            last_flow_control: None,
            tx_buffer: Bytes::new(),
            tx_frame_length: 0,
            tx_block_counter: 0,
            tx_seqnum: 0,
            wft_counter: 0,
            remote_blocksize: None,
            timer_tx_stmin: Timer::new(Microseconds::new(0)),
            timer_rx_fc: Timer::new(ms_to_us(config.rx_flowcontrol_timeout)),
            timer_rx_cf: Timer::new(ms_to_us(config.rx_consecutive_frame_timeout)),
            config,
        })
    }

    /// Registers the callback receiving every detected protocol anomaly
    pub fn set_error_handler(&mut self, handler: Option<ErrorHandler>) {
        self.error_handler = handler;
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Replaces the layer address. Can be set after initialization if needed.
    pub fn set_address(&mut self, address: Address) {
        warn_reserved_ids(&address);
        self.address = address;
    }

    /// Enqueue a payload to be sent over the CAN network.
    ///
    /// Functional addressing is restricted to payloads fitting a single frame.
    pub fn send(&mut self, data: Bytes, target_address_type: TargetAddressType) -> Result<(), SendError> {
        if self.tx_queue.len() >= TX_QUEUE_CAPACITY {
            return Err(SendError::QueueFull);
        }

        if target_address_type == TargetAddressType::Functional {
            let length_bytes = if self.config.tx_data_length == 8 { 1 } else { 2 };
            let maxlen = usize::from(self.config.tx_data_length) - length_bytes - self.address.tx_prefix_size();

            if data.len() > maxlen {
                return Err(SendError::FunctionalPayloadTooLong(data.len()));
            }
        }

        self.tx_queue.push_back(TxRequest {
            data,
            target_address_type,
        });

        Ok(())
    }

    /// Enqueue a payload and drive the layer until it was fully transmitted
    /// or `timeout` expired.
    ///
    /// The calling thread busy-polls the datalink, honoring STmin pacing.
    pub fn send_blocking(
        &mut self,
        data: Bytes,
        target_address_type: TargetAddressType,
        timeout: Milliseconds<u32>,
    ) -> Result<(), BlockingSendError<L::Error>> {
        self.send(data, target_address_type)?;

        let mut deadline = Timer::<C>::new(ms_to_us(timeout.0));
        deadline.start(self.clock.try_now()?);

        loop {
            self.process()?;

            if !self.transmitting() {
                return Ok(());
            }

            if deadline.is_timed_out(self.clock.try_now()?) {
                self.stop_sending();
                return Err(BlockingSendError::Timeout);
            }
        }
    }

    /// Dequeue a fully reassembled payload, if one is available
    pub fn recv(&mut self) -> Option<Bytes> {
        self.rx_queue.pop_front()
    }

    /// Returns `true` when a payload is awaiting [TransportLayer::recv]
    pub fn available(&self) -> bool {
        !self.rx_queue.is_empty()
    }

    /// Returns `true` while a payload is being transmitted or awaiting
    /// transmission
    pub fn transmitting(&self) -> bool {
        !self.tx_queue.is_empty() || self.tx_state != TxState::Idle
    }

    /// Performs one non-blocking pass of both state machines: drains the
    /// datalink, then emits every frame that is due.
    pub fn process(&mut self) -> Result<(), ProcessError<L::Error>> {
        while let Some(msg) = self.link.receive().map_err(ProcessError::Link)? {
            let now = self.clock.try_now()?;
            debug!(
                "Receiving : <{:03X}> ({})\t{:02X?}",
                msg.raw_id(),
                msg.data.len(),
                msg.data.as_ref()
            );
            self.process_rx(&msg, now);
        }

        loop {
            let now = self.clock.try_now()?;
            let Some(msg) = self.process_tx(now) else {
                break;
            };

            debug!(
                "Sending : <{:03X}> ({})\t{:02X?}",
                msg.raw_id(),
                msg.data.len(),
                msg.data.as_ref()
            );
            self.link.transmit(&msg).map_err(ProcessError::Link)?;
        }

        Ok(())
    }

    /// Empties all buffers and queues and puts both state machines back to idle
    pub fn reset(&mut self) {
        self.tx_queue.clear();
        self.rx_queue.clear();
        self.stop_sending();
        self.stop_receiving();
    }

    /// How long a driving worker may sleep before the next
    /// [TransportLayer::process] call, based on the state machines
    pub fn sleep_time(&self) -> Milliseconds<u32> {
        match (self.rx_state, self.tx_state) {
            (RxState::Idle, TxState::Idle) => Milliseconds::new(50),
            (RxState::Idle, TxState::WaitFlowControl) => Milliseconds::new(10),
            _ => Milliseconds::new(1),
        }
    }

    fn process_rx(&mut self, msg: &CanMessage, now: Instant<C>) {
        if !self.address.accepts(msg) {
            return;
        }

        let pdu = match Pdu::decode(msg.data.as_ref(), self.address.rx_prefix_size()) {
            Ok(pdu) => pdu,
            Err(DecodeError::UnexpectedEscapeSequence) => {
                self.trigger_error(&IsoTpError::MissingEscapeSequence);
                self.stop_receiving();
                return;
            }
            Err(reason) => {
                self.trigger_error(&IsoTpError::InvalidCanData(reason));
                self.stop_receiving();
                return;
            }
        };

        // Check timeout first
        if self.timer_rx_cf.is_timed_out(now) {
            self.trigger_error(&IsoTpError::ConsecutiveFrameTimeout);
            self.stop_receiving();
        }

        // Flow control goes to the transmission state machine, single slot deep
        if let Pdu::FlowControl { flow_status, .. } = &pdu {
            let restart_cf_timer = self.rx_state == RxState::WaitConsecutiveFrame
                && matches!(*flow_status, FlowStatus::ContinueToSend | FlowStatus::Wait);

            self.last_flow_control = Some(pdu);

            if restart_cf_timer {
                self.timer_rx_cf.start(now);
            }
            return;
        }

        if let Pdu::SingleFrame {
            can_dl,
            escape_sequence,
            ..
        } = &pdu
        {
            if *can_dl > 8 && !*escape_sequence {
                self.trigger_error(&IsoTpError::MissingEscapeSequence);
                return;
            }
        }

        match self.rx_state {
            RxState::Idle => {
                self.rx_frame_length = 0;
                self.timer_rx_cf.stop();

                match pdu {
                    Pdu::SingleFrame { data, .. } => self.enqueue_rx(data),
                    Pdu::FirstFrame {
                        length, data, rx_dl, ..
                    } => self.start_reception(length, &data, rx_dl, now),
                    Pdu::ConsecutiveFrame { .. } => {
                        self.trigger_error(&IsoTpError::UnexpectedConsecutiveFrame);
                    }
                    Pdu::FlowControl { .. } => {}
                }
            }
            RxState::WaitConsecutiveFrame => match pdu {
                Pdu::SingleFrame { data, .. } => {
                    self.enqueue_rx(data);
                    self.rx_state = RxState::Idle;
                    self.trigger_error(&IsoTpError::ReceptionInterruptedWithSingleFrame);
                }
                Pdu::FirstFrame {
                    length, data, rx_dl, ..
                } => {
                    self.start_reception(length, &data, rx_dl, now);
                    self.trigger_error(&IsoTpError::ReceptionInterruptedWithFirstFrame);
                }
                Pdu::ConsecutiveFrame { seqnum, data, rx_dl } => {
                    self.process_consecutive_frame(seqnum, &data, rx_dl, now);
                }
                Pdu::FlowControl { .. } => {}
            },
        }
    }

    /// Initiates the reception of a segmented payload
    fn start_reception(&mut self, length: u32, data: &[u8], rx_dl: u8, now: Instant<C>) {
        self.rx_buffer.clear();

        if nearest_can_fd_size(usize::from(rx_dl)) != Ok(usize::from(rx_dl)) {
            self.trigger_error(&IsoTpError::InvalidCanFdFirstFrameRxDl { rx_dl });
            self.stop_receiving();
            return;
        }

        self.actual_rxdl = Some(rx_dl);

        if length > self.config.max_frame_size {
            self.trigger_error(&IsoTpError::FrameTooLong {
                length,
                max_frame_size: self.config.max_frame_size,
            });
            self.request_tx_flowcontrol(FlowStatus::Overflow);
            self.rx_state = RxState::Idle;
        } else {
            self.rx_state = RxState::WaitConsecutiveFrame;
            self.rx_frame_length = length;
            self.rx_buffer.extend_from_slice(data);
            self.request_tx_flowcontrol(FlowStatus::ContinueToSend);
        }

        self.timer_rx_cf.start(now);
        self.last_seqnum = 0;
        self.rx_block_counter = 0;
    }

    fn process_consecutive_frame(&mut self, seqnum: u8, data: &[u8], rx_dl: u8, now: Instant<C>) {
        let expected = (self.last_seqnum + 1) & 0xF;

        if seqnum != expected {
            self.stop_receiving();
            self.trigger_error(&IsoTpError::WrongSequenceNumber {
                expected,
                received: seqnum,
            });
            return;
        }

        let bytes_to_receive = (self.rx_frame_length as usize).saturating_sub(self.rx_buffer.len());

        if Some(rx_dl) != self.actual_rxdl && usize::from(rx_dl) < bytes_to_receive {
            self.trigger_error(&IsoTpError::ChangingInvalidRxDl {
                received: rx_dl,
                expected: self.actual_rxdl.unwrap_or_default(),
            });
            return;
        }

        // Timeout of a late frame was handled before, restart the timer
        self.timer_rx_cf.start(now);
        self.last_seqnum = seqnum;

        let take = bytes_to_receive.min(data.len());
        self.rx_buffer.extend_from_slice(&data[..take]);

        if self.rx_buffer.len() >= self.rx_frame_length as usize {
            // Data complete, back to idle
            let payload = Bytes::from(core::mem::take(&mut self.rx_buffer));
            self.enqueue_rx(payload);
            self.stop_receiving();
        } else {
            self.rx_block_counter += 1;

            if self.config.blocksize > 0 && self.rx_block_counter % u32::from(self.config.blocksize) == 0 {
                self.request_tx_flowcontrol(FlowStatus::ContinueToSend);
                // Timer stays off while the peer waits for our flow control
                self.timer_rx_cf.stop();
            }
        }
    }

    /// One pass of the transmission state machine, emitting at most one frame
    fn process_tx(&mut self, now: Instant<C>) -> Option<CanMessage> {
        // Flow control requested by the reception state machine goes out first
        if let Some(flow_status) = self.pending_flow_control.take() {
            return self.make_flow_control(flow_status);
        }

        if let Some(Pdu::FlowControl {
            flow_status,
            blocksize,
            stmin_duration,
            ..
        }) = self.last_flow_control.take()
        {
            match flow_status {
                FlowStatus::Overflow => {
                    self.stop_sending();
                    self.trigger_error(&IsoTpError::Overflow);
                    return None;
                }
                _ if self.tx_state == TxState::Idle => {
                    self.trigger_error(&IsoTpError::UnexpectedFlowControl);
                }
                FlowStatus::Wait => {
                    if self.config.wftmax == 0 {
                        self.trigger_error(&IsoTpError::UnsupportedWaitFrame);
                    } else if self.wft_counter >= self.config.wftmax {
                        self.trigger_error(&IsoTpError::MaximumWaitFrameReached {
                            count: self.wft_counter,
                        });
                        self.stop_sending();
                    } else {
                        self.wft_counter += 1;
                        self.tx_state = TxState::WaitFlowControl;
                        self.timer_rx_fc.start(now);
                    }
                }
                FlowStatus::ContinueToSend => {
                    if !self.timer_rx_fc.is_timed_out(now) {
                        self.wft_counter = 0;
                        self.timer_rx_fc.stop();
                        self.timer_tx_stmin.set_timeout(stmin_duration);
                        self.remote_blocksize = Some(blocksize);

                        if self.tx_state == TxState::WaitFlowControl {
                            self.tx_block_counter = 0;
                            self.timer_tx_stmin.start(now);
                        }

                        self.tx_state = TxState::TransmitConsecutiveFrame;
                    }
                }
            }
        }

        if self.timer_rx_fc.is_timed_out(now) {
            self.trigger_error(&IsoTpError::FlowControlTimeout);
            self.stop_sending();
        }

        if self.tx_state != TxState::Idle && self.tx_buffer.is_empty() {
            self.stop_sending();
        }

        match self.tx_state {
            TxState::Idle => self.start_transmission(now),
            TxState::WaitFlowControl => None,
            TxState::TransmitConsecutiveFrame => self.transmit_consecutive_frame(now),
        }
    }

    /// Pops the next payload and emits its single frame or first frame
    fn start_transmission(&mut self, now: Instant<C>) -> Option<CanMessage> {
        let request = loop {
            match self.tx_queue.pop_front() {
                Some(request) if request.data.is_empty() => continue,
                Some(request) => break request,
                None => return None,
            }
        };

        self.tx_buffer = request.data;

        let tx_data_length = usize::from(self.config.tx_data_length);
        let size_on_first_byte = self.tx_buffer.len() <= 7;
        let size_offset = if size_on_first_byte { 1 } else { 2 };

        if self.tx_buffer.len() <= tx_data_length - size_offset - self.address.tx_prefix_size() {
            // Single frame
            let mut data = self.frame_header();

            if size_on_first_byte {
                data.push(self.tx_buffer.len() as u8);
            } else {
                data.push(0x00);
                data.push(self.tx_buffer.len() as u8);
            }
            data.extend_from_slice(&self.tx_buffer);

            let arbitration_id = self.address.tx_arbitration_id(request.target_address_type);
            self.make_tx_msg(arbitration_id, data)
        } else {
            // Segmented payload, starts with a first frame
            self.tx_frame_length = self.tx_buffer.len() as u32;
            let mut data = self.frame_header();

            if self.tx_frame_length <= 0xFFF {
                data.push(0x10 | ((self.tx_frame_length >> 8) & 0xF) as u8);
                data.push((self.tx_frame_length & 0xFF) as u8);
            } else {
                // Escape sequence for payloads above 4095 bytes
                data.push(0x10);
                data.push(0x00);
                let mut length = [0u8; 4];
                BigEndian::write_u32(&mut length, self.tx_frame_length);
                data.extend_from_slice(&length);
            }

            let room = tx_data_length - data.len();
            let chunk = self.tx_buffer.split_to(room.min(self.tx_buffer.len()));
            data.extend_from_slice(&chunk);

            self.tx_seqnum = 1;
            self.tx_state = TxState::WaitFlowControl;
            self.timer_rx_fc.start(now);

            self.make_tx_msg(self.address.tx_arbitration_id(TargetAddressType::Physical), data)
        }
    }

    fn transmit_consecutive_frame(&mut self, now: Instant<C>) -> Option<CanMessage> {
        let mut output_msg = None;

        if self.timer_tx_stmin.is_timed_out(now) || self.config.squash_stmin_requirement {
            let mut data = self.frame_header();
            data.push(0x20 | self.tx_seqnum);

            let room = usize::from(self.config.tx_data_length) - data.len();
            let chunk = self.tx_buffer.split_to(room.min(self.tx_buffer.len()));
            data.extend_from_slice(&chunk);

            output_msg = self.make_tx_msg(self.address.tx_arbitration_id(TargetAddressType::Physical), data);

            self.tx_seqnum = (self.tx_seqnum + 1) & 0xF;
            self.timer_tx_stmin.start(now);
            self.tx_block_counter += 1;
        }

        if self.tx_buffer.is_empty() {
            self.stop_sending();
        } else if let Some(remote_blocksize) = self.remote_blocksize {
            if remote_blocksize != 0 && self.tx_block_counter >= u32::from(remote_blocksize) {
                self.tx_state = TxState::WaitFlowControl;
                self.timer_rx_fc.start(now);
            }
        }

        output_msg
    }

    fn make_flow_control(&mut self, flow_status: FlowStatus) -> Option<CanMessage> {
        let mut data = self.frame_header();
        data.extend_from_slice(&flow_control_data(
            flow_status,
            self.config.blocksize,
            self.config.stmin,
        ));

        self.make_tx_msg(self.address.tx_arbitration_id(TargetAddressType::Physical), data)
    }

    /// Payload start of every transmitted frame: the addressing prefix, if any
    fn frame_header(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(usize::from(self.config.tx_data_length));

        if let Some(prefix) = self.address.tx_extension_byte() {
            data.push(prefix);
        }

        data
    }

    fn make_tx_msg(&self, arbitration_id: Id, mut data: Vec<u8>) -> Option<CanMessage> {
        self.pad_message_data(&mut data);

        let dlc = DLC::for_length(data.len()).ok()?;

        Some(CanMessage {
            id: arbitration_id,
            data: Bytes::from(data),
            dlc: dlc.code(),
            is_fd: self.config.can_fd,
            bitrate_switch: self.config.can_fd && self.config.bitrate_switch,
        })
    }

    fn pad_message_data(&self, data: &mut Vec<u8>) {
        let tx_data_length = usize::from(self.config.tx_data_length);

        let target_length = if self.config.tx_padding.is_some() {
            tx_data_length
        } else if tx_data_length > 8 && data.len() > 8 {
            // CAN FD frames above 8 bytes only come in a few discrete lengths
            match nearest_can_fd_size(data.len()) {
                Ok(size) => size,
                Err(_) => return,
            }
        } else {
            return;
        };

        if data.len() < target_length {
            let padding_byte = self.config.tx_padding.unwrap_or(DEFAULT_PADDING_BYTE);
            data.resize(target_length, padding_byte);
        }
    }

    fn enqueue_rx(&mut self, payload: Bytes) {
        if self.rx_queue.len() >= RX_QUEUE_CAPACITY {
            warn!("Reception queue is full, dropping payload of {} bytes", payload.len());
            return;
        }

        self.rx_queue.push_back(payload);
    }

    fn request_tx_flowcontrol(&mut self, flow_status: FlowStatus) {
        self.pending_flow_control = Some(flow_status);
    }

    fn stop_sending(&mut self) {
        self.tx_buffer = Bytes::new();
        self.tx_state = TxState::Idle;
        self.tx_frame_length = 0;
        self.timer_rx_fc.stop();
        self.timer_tx_stmin.stop();
        self.remote_blocksize = None;
        self.tx_block_counter = 0;
        self.tx_seqnum = 0;
        self.wft_counter = 0;
    }

    fn stop_receiving(&mut self) {
        self.actual_rxdl = None;
        self.rx_state = RxState::Idle;
        self.rx_buffer.clear();
        self.pending_flow_control = None;
        self.last_flow_control = None;
        self.timer_rx_cf.stop();
    }

    fn trigger_error(&mut self, error: &IsoTpError) {
        if let Some(handler) = self.error_handler.as_mut() {
            handler(error);
        }

        warn!("{error}");
    }
}

fn ms_to_us(milliseconds: u32) -> Microseconds<u32> {
    Microseconds::new(milliseconds.saturating_mul(1_000))
}

fn warn_reserved_ids(address: &Address) {
    for id in [address.txid(), address.rxid()].into_iter().flatten() {
        if RESERVED_IDS.iter().any(|range| range.contains(&id)) {
            warn!("Arbitration ID {id:03X} overlaps the range reserved by ISO-15765 (0x7F4-0x7F6 and 0x7FA-0x7FB)");
        }
    }
}
