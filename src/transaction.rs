//! # Transaction Identifiers
//!
//! The TCP/UDP and Over-TCP envelopes carry a 16-bit transaction id. Ids come
//! from a [`TransactionIdSource`] handed to the
//! [`EnvelopeFramer`](crate::envelope::EnvelopeFramer). The default source is
//! one process-wide [`TransactionCounter`]; it is not scoped per
//! device. Callers that need per-device sequences create their own counters,
//! and tests inject deterministic sources.
//!
//! ```rust
//! use modbus_adu::transaction::{TransactionCounter, TransactionIdSource};
//!
//! let counter = TransactionCounter::new();
//! assert_eq!(counter.next_transaction_id(), 1);
//! assert_eq!(counter.next_transaction_id(), 2);
//! ```

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

/// Source of transaction ids for the TCP-based envelopes
pub trait TransactionIdSource: Send + Sync {
    /// Advance the sequence and return the new id
    ///
    /// Concurrent callers must never observe the same value (modulo the
    /// 16-bit wrap).
    fn next_transaction_id(&self) -> u16;
}

/// Atomically incremented 16-bit counter, wrapping modulo 65536
#[derive(Debug, Default)]
pub struct TransactionCounter {
    value: AtomicU16,
}

impl TransactionCounter {
    /// Counter whose first id is 1
    pub const fn new() -> Self {
        Self::starting_after(0)
    }

    /// Counter whose first id is `last.wrapping_add(1)`
    pub const fn starting_after(last: u16) -> Self {
        Self { value: AtomicU16::new(last) }
    }

    /// Last id handed out (0 before the first call)
    pub fn current(&self) -> u16 {
        self.value.load(Ordering::Acquire)
    }
}

impl TransactionIdSource for TransactionCounter {
    fn next_transaction_id(&self) -> u16 {
        // fetch_add wraps on overflow
        self.value.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }
}

impl<T: TransactionIdSource + ?Sized> TransactionIdSource for &T {
    fn next_transaction_id(&self) -> u16 {
        (**self).next_transaction_id()
    }
}

impl<T: TransactionIdSource + ?Sized> TransactionIdSource for Arc<T> {
    fn next_transaction_id(&self) -> u16 {
        (**self).next_transaction_id()
    }
}

impl<T: TransactionIdSource + ?Sized> TransactionIdSource for Box<T> {
    fn next_transaction_id(&self) -> u16 {
        (**self).next_transaction_id()
    }
}

static GLOBAL_COUNTER: TransactionCounter = TransactionCounter::new();

/// The process-wide counter used by default-constructed framers
pub fn global_counter() -> &'static TransactionCounter {
    &GLOBAL_COUNTER
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_counter_sequence() {
        let counter = TransactionCounter::new();
        assert_eq!(counter.current(), 0);
        assert_eq!(counter.next_transaction_id(), 1);
        assert_eq!(counter.next_transaction_id(), 2);
        assert_eq!(counter.current(), 2);
    }

    #[test]
    fn test_counter_wraps() {
        let counter = TransactionCounter::starting_after(0xFFFE);
        assert_eq!(counter.next_transaction_id(), 0xFFFF);
        assert_eq!(counter.next_transaction_id(), 0x0000);
        assert_eq!(counter.next_transaction_id(), 0x0001);
    }

    #[test]
    fn test_counter_is_distinct_across_threads() {
        let counter = Arc::new(TransactionCounter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    (0..1000).map(|_| counter.next_transaction_id()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let ids = handle.join().unwrap();
            // each thread sees its own ids strictly increasing
            assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
            for id in ids {
                assert!(seen.insert(id), "duplicate transaction id {}", id);
            }
        }
        assert_eq!(seen.len(), 8000);
        assert_eq!(counter.current(), 8000);
    }

    #[test]
    fn test_global_counter_advances() {
        let before = global_counter().next_transaction_id();
        let after = global_counter().next_transaction_id();
        assert_ne!(before, after);
    }
}
