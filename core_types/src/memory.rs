//! # Boot Pool
//!
//! Ownership contract for boot-time pool allocations.
//!
//! ## Philosophy
//!
//! - **Allocation can fail**: every allocation returns a `Result`
//! - **Release is structural**: a [`Pooled`] value releases its bytes on drop
//! - **Accounting is observable**: tests assert allocation/release symmetry
//!
//! The pool does not reimplement an allocator. Values live on the Rust heap;
//! the pool keeps the ledger the firmware allocator would keep and refuses
//! allocations once its configured budget is exhausted.

use std::cell::Cell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use thiserror::Error;

/// Page granularity used for file buffers that may be memory mapped
pub const PAGE_SIZE: usize = 4096;

/// Rounds `len` up to the next multiple of [`PAGE_SIZE`]
pub fn align_to_page(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE) * PAGE_SIZE
}

/// Pool allocation errors
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Out of resources: cannot allocate {requested} bytes")]
    OutOfResources { requested: usize },
}

#[derive(Debug, Default)]
struct PoolLedger {
    allocations: Cell<usize>,
    releases: Cell<usize>,
    outstanding_bytes: Cell<usize>,
    /// Number of further allocations that succeed before the pool fails
    remaining: Cell<Option<usize>>,
    limit_bytes: Option<usize>,
}

impl PoolLedger {
    fn reserve(&self, bytes: usize) -> Result<(), MemoryError> {
        if let Some(remaining) = self.remaining.get() {
            if remaining == 0 {
                return Err(MemoryError::OutOfResources { requested: bytes });
            }
            self.remaining.set(Some(remaining - 1));
        }
        let outstanding = self.outstanding_bytes.get();
        if let Some(limit) = self.limit_bytes {
            if outstanding.saturating_add(bytes) > limit {
                return Err(MemoryError::OutOfResources { requested: bytes });
            }
        }
        self.allocations.set(self.allocations.get() + 1);
        self.outstanding_bytes.set(outstanding + bytes);
        Ok(())
    }

    fn release(&self, bytes: usize) {
        self.releases.set(self.releases.get() + 1);
        self.outstanding_bytes
            .set(self.outstanding_bytes.get().saturating_sub(bytes));
    }
}

/// Snapshot of pool accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Successful allocations so far
    pub allocations: usize,
    /// Releases so far
    pub releases: usize,
    /// Bytes currently held by live allocations
    pub outstanding_bytes: usize,
}

impl PoolStats {
    /// Number of live allocations
    pub fn outstanding(&self) -> usize {
        self.allocations - self.releases
    }

    /// Returns true if every allocation has been released
    pub fn is_balanced(&self) -> bool {
        self.allocations == self.releases && self.outstanding_bytes == 0
    }
}

/// Handle to the boot-time pool
///
/// Cloning the handle shares the ledger. The pool is single-threaded.
#[derive(Debug, Clone, Default)]
pub struct BootPool {
    ledger: Rc<PoolLedger>,
}

impl BootPool {
    /// Creates a pool without limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool that refuses every allocation after the first `count`
    pub fn failing_after(count: usize) -> Self {
        let ledger = PoolLedger {
            remaining: Cell::new(Some(count)),
            ..PoolLedger::default()
        };
        Self {
            ledger: Rc::new(ledger),
        }
    }

    /// Creates a pool that never holds more than `bytes` at once
    pub fn with_limit(bytes: usize) -> Self {
        let ledger = PoolLedger {
            limit_bytes: Some(bytes),
            ..PoolLedger::default()
        };
        Self {
            ledger: Rc::new(ledger),
        }
    }

    /// Allocates `bytes` from the pool and places `make()` in it
    ///
    /// `make` only runs once the reservation succeeded.
    pub fn allocate<T>(&self, bytes: usize, make: impl FnOnce() -> T) -> Result<Pooled<T>, MemoryError> {
        self.ledger.reserve(bytes)?;
        Ok(Pooled {
            value: make(),
            bytes,
            ledger: Rc::clone(&self.ledger),
        })
    }

    /// Allocates a zero-filled byte buffer of `len` bytes
    pub fn allocate_zeroed(&self, len: usize) -> Result<Pooled<Vec<u8>>, MemoryError> {
        self.allocate(len, || vec![0u8; len])
    }

    /// Allocates room for `count` values of `T`, returned as an empty vector
    pub fn allocate_slots<T>(&self, count: usize) -> Result<Pooled<Vec<T>>, MemoryError> {
        let bytes = count.saturating_mul(std::mem::size_of::<T>());
        self.allocate(bytes, || Vec::with_capacity(count))
    }

    /// Allocates a copy of `text`, sized like a NUL-terminated wide string
    pub fn allocate_str(&self, text: &str) -> Result<Pooled<String>, MemoryError> {
        let bytes = (text.encode_utf16().count() + 1) * 2;
        self.allocate(bytes, || text.to_string())
    }

    /// Returns the current accounting snapshot
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocations: self.ledger.allocations.get(),
            releases: self.ledger.releases.get(),
            outstanding_bytes: self.ledger.outstanding_bytes.get(),
        }
    }
}

/// A value whose backing bytes belong to a [`BootPool`]
///
/// Dropping it returns the bytes to the pool.
pub struct Pooled<T> {
    value: T,
    bytes: usize,
    ledger: Rc<PoolLedger>,
}

impl<T> Pooled<T> {
    /// Number of pool bytes held by this value
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T> Drop for Pooled<T> {
    fn drop(&mut self) {
        self.ledger.release(self.bytes);
    }
}

impl<T: fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("value", &self.value)
            .field("bytes", &self.bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_to_page() {
        assert_eq!(align_to_page(0), 0);
        assert_eq!(align_to_page(1), PAGE_SIZE);
        assert_eq!(align_to_page(PAGE_SIZE), PAGE_SIZE);
        assert_eq!(align_to_page(PAGE_SIZE + 1), 2 * PAGE_SIZE);
    }

    #[test]
    fn test_allocate_and_release() {
        let pool = BootPool::new();
        {
            let buffer = pool.allocate_zeroed(128).unwrap();
            assert_eq!(buffer.len(), 128);
            assert_eq!(pool.stats().outstanding(), 1);
            assert_eq!(pool.stats().outstanding_bytes, 128);
        }
        let stats = pool.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.releases, 1);
        assert!(stats.is_balanced());
    }

    #[test]
    fn test_failing_after() {
        let pool = BootPool::failing_after(2);
        let _a = pool.allocate_zeroed(8).unwrap();
        let _b = pool.allocate_zeroed(8).unwrap();
        let err = pool.allocate_zeroed(8).unwrap_err();
        assert_eq!(err, MemoryError::OutOfResources { requested: 8 });
        assert_eq!(pool.stats().allocations, 2);
    }

    #[test]
    fn test_limit_counts_live_bytes_only() {
        let pool = BootPool::with_limit(100);
        let a = pool.allocate_zeroed(60).unwrap();
        assert!(pool.allocate_zeroed(60).is_err());
        drop(a);
        assert!(pool.allocate_zeroed(60).is_ok());
    }

    #[test]
    fn test_make_not_called_on_failure() {
        let pool = BootPool::failing_after(0);
        let mut called = false;
        let result = pool.allocate(4, || called = true);
        assert!(result.is_err());
        assert!(!called);
    }

    #[test]
    fn test_allocate_str_sizes_wide_string() {
        let pool = BootPool::new();
        let name = pool.allocate_str("EFI").unwrap();
        assert_eq!(name.as_str(), "EFI");
        assert_eq!(name.bytes(), 8);
    }

    #[test]
    fn test_allocate_slots() {
        let pool = BootPool::new();
        let slots: Pooled<Vec<u64>> = pool.allocate_slots(4).unwrap();
        assert!(slots.is_empty());
        assert!(slots.capacity() >= 4);
        assert_eq!(slots.bytes(), 32);
    }

    #[test]
    fn test_cloned_handle_shares_ledger() {
        let pool = BootPool::new();
        let other = pool.clone();
        let _buffer = other.allocate_zeroed(4).unwrap();
        assert_eq!(pool.stats().allocations, 1);
    }
}
