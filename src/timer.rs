//! Deadline based one-shot timers driven by an [embedded_time::Clock]

use embedded_time::duration::Microseconds;
use embedded_time::{Clock, Instant};

/// One-shot timer carrying an absolute deadline.
///
/// A stopped timer never reads as timed out. A running timer with a timeout
/// of zero reads as timed out immediately.
#[derive(Debug)]
pub(crate) struct Timer<C: Clock> {
    timeout: Microseconds<u32>,
    deadline: Option<Instant<C>>,
}

impl<C: Clock> Timer<C> {
    pub fn new(timeout: Microseconds<u32>) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn set_timeout(&mut self, timeout: Microseconds<u32>) {
        self.timeout = timeout;
    }

    pub fn start(&mut self, now: Instant<C>) {
        self.deadline = now.checked_add(self.timeout);
    }

    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_stopped(&self) -> bool {
        self.deadline.is_none()
    }

    pub fn is_timed_out(&self, now: Instant<C>) -> bool {
        match self.deadline {
            Some(deadline) => self.timeout == Microseconds::new(0u32) || now > deadline,
            None => false,
        }
    }
}
