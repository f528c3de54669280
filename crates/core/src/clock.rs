//! Time source for lab transitions.
//!
//! The transition engine never reads the system time directly; it is handed a [`Clock`] and
//! samples it once per transition. Production code uses [`SystemClock`]; tests and replays use
//! [`FixedClock`] so the stamped `completed_on`/`canceled_on` can be asserted exactly.

use chrono::{DateTime, Utc};
use std::sync::Arc;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the current UTC time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Returns a fixed instant and counts how often it was asked.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct CountingClock {
    at: DateTime<Utc>,
    reads: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl CountingClock {
    pub(crate) fn new(at: DateTime<Utc>) -> Self {
        Self {
            at,
            reads: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl Clock for CountingClock {
    fn now(&self) -> DateTime<Utc> {
        self.reads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.at
    }
}
