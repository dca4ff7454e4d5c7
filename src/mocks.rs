use crate::message::CanMessage;
use crate::transport::Datalink;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use embedded_time::clock::Error as ClockError;
use embedded_time::duration::{Duration, Fraction};
use embedded_time::fixed_point::FixedPoint;
use embedded_time::timer::param::{Armed, OneShot};
use embedded_time::{Clock, Instant, Timer};
use mockall::mock;

#[derive(Debug, Default)]
struct TestClockInner {
    now: Cell<u64>,
    step: Cell<u64>,
}

/// Clock under full control of the test. Clones share the same time source,
/// so a test keeps one handle while the layer owns the other.
#[derive(Clone, Debug, Default)]
pub struct TestClock {
    inner: Rc<TestClockInner>,
}

impl TestClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_us(&self, micros: u64) {
        self.inner.now.set(self.inner.now.get() + micros);
    }

    pub fn advance_ms(&self, millis: u64) {
        self.advance_us(millis * 1_000);
    }

    /// Makes the clock tick by itself on every reading
    pub fn auto_advance_us(&self, micros: u64) {
        self.inner.step.set(micros);
    }
}

impl Clock for TestClock {
    type T = u64;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, ClockError> {
        self.inner.now.set(self.inner.now.get() + self.inner.step.get());

        Ok(Instant::new(self.inner.now.get()))
    }

    fn new_timer<Dur>(&self, duration: Dur) -> Timer<OneShot, Armed, Self, Dur>
    where
        Dur: Duration + FixedPoint,
    {
        Timer::new(self, duration)
    }
}

mock! {
    pub Link {}

    impl Datalink for Link {
        type Error = u32;

        fn transmit(&mut self, msg: &CanMessage) -> Result<(), u32>;
        fn receive(&mut self) -> Result<Option<CanMessage>, u32>;
    }
}

/// Datalink backed by two in-memory queues the test scripts and observes
pub struct QueueLink {
    /// Frames the layer will receive
    pub rx: Rc<RefCell<VecDeque<CanMessage>>>,
    /// Frames the layer emitted
    pub tx: Rc<RefCell<VecDeque<CanMessage>>>,
}

impl QueueLink {
    pub fn new() -> Self {
        Self {
            rx: Rc::new(RefCell::new(VecDeque::new())),
            tx: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    /// Handles kept by the test after the link was moved into the layer
    #[allow(clippy::type_complexity)]
    pub fn handles(&self) -> (Rc<RefCell<VecDeque<CanMessage>>>, Rc<RefCell<VecDeque<CanMessage>>>) {
        (self.rx.clone(), self.tx.clone())
    }

    /// Two links wired back-to-back, for tests driving two layers against
    /// each other
    pub fn pair() -> (QueueLink, QueueLink) {
        let a = QueueLink::new();
        let b = QueueLink {
            rx: a.tx.clone(),
            tx: a.rx.clone(),
        };

        (a, b)
    }
}

impl Datalink for QueueLink {
    type Error = Infallible;

    fn transmit(&mut self, msg: &CanMessage) -> Result<(), Self::Error> {
        self.tx.borrow_mut().push_back(msg.clone());
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<CanMessage>, Self::Error> {
        Ok(self.rx.borrow_mut().pop_front())
    }
}
