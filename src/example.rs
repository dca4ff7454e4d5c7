//! # Mock dummy structures for doc examples
//!
//! [ExampleLink] moves frames through in-memory queues and [ExampleClock]
//! ticks one microsecond per reading, which is enough to demonstrate and
//! document the transport layer without CAN hardware.
use crate::message::CanMessage;
use crate::transport::Datalink;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use embedded_time::clock::Error;
use embedded_time::duration::{Duration, Fraction};
use embedded_time::fixed_point::FixedPoint;
use embedded_time::timer::param::{Armed, OneShot};
use embedded_time::{Clock, Instant, Timer};

/// One endpoint of a pair of crossed in-memory frame queues
pub struct ExampleLink {
    tx: Rc<RefCell<VecDeque<CanMessage>>>,
    rx: Rc<RefCell<VecDeque<CanMessage>>>,
}

/// Creates two datalinks wired back-to-back: every frame transmitted on one
/// is received by the other
pub fn link_pair() -> (ExampleLink, ExampleLink) {
    let a_to_b = Rc::new(RefCell::new(VecDeque::new()));
    let b_to_a = Rc::new(RefCell::new(VecDeque::new()));

    (
        ExampleLink {
            tx: a_to_b.clone(),
            rx: b_to_a.clone(),
        },
        ExampleLink {
            tx: b_to_a,
            rx: a_to_b,
        },
    )
}

impl Datalink for ExampleLink {
    type Error = Infallible;

    fn transmit(&mut self, msg: &CanMessage) -> Result<(), Self::Error> {
        self.tx.borrow_mut().push_back(msg.clone());
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<CanMessage>, Self::Error> {
        Ok(self.rx.borrow_mut().pop_front())
    }
}

/// Clock advancing one microsecond per reading
#[derive(Debug, Default)]
pub struct ExampleClock {
    now: Cell<u64>,
}

impl Clock for ExampleClock {
    type T = u64;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, Error> {
        self.now.set(self.now.get() + 1);

        Ok(Instant::new(self.now.get()))
    }

    fn new_timer<Dur: Duration + FixedPoint>(&self, duration: Dur) -> Timer<OneShot, Armed, Self, Dur> {
        Timer::new(self, duration)
    }
}
