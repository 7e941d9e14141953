use crossbeam_utils::CachePadded;
use std::cell::{Cell, UnsafeCell};
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

/// Ring construction rejects capacities that are zero or not a power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCapacity(pub usize);

impl fmt::Display for InvalidCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ring capacity must be a positive power of two, got {}",
            self.0
        )
    }
}

impl std::error::Error for InvalidCapacity {}

/// Bounded single-producer/single-consumer ring of plain value records.
///
/// Exactly one thread may call [`push`](Self::push) and exactly one thread
/// may call [`pop`](Self::pop); the size accessors are safe from anywhere.
/// Violating the SPSC contract is undefined behavior by construction.
///
/// The four position counters live on separate cache lines. `write_pos` and
/// `read_pos` are published with release stores and observed with acquire
/// loads; that pairing orders the slot access before the position update and
/// is the entire correctness argument. The cached peer positions are plain
/// cells owned by one side each and refreshed only at the full/empty
/// boundary, so steady-state pushes and pops touch no foreign cache line.
pub struct RingBuffer<T> {
    write_pos: CachePadded<AtomicU64>,
    read_pos: CachePadded<AtomicU64>,
    /// Producer-owned stale copy of `read_pos`.
    cached_read_pos: CachePadded<Cell<u64>>,
    /// Consumer-owned stale copy of `write_pos`.
    cached_write_pos: CachePadded<Cell<u64>>,
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: u64,
}

unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self, InvalidCapacity> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(InvalidCapacity(capacity));
        }

        let buffer = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(RingBuffer {
            write_pos: CachePadded::new(AtomicU64::new(0)),
            read_pos: CachePadded::new(AtomicU64::new(0)),
            cached_read_pos: CachePadded::new(Cell::new(0)),
            cached_write_pos: CachePadded::new(Cell::new(0)),
            buffer,
            mask: capacity as u64 - 1,
        })
    }

    /// Producer side. Returns the value back when the ring is genuinely
    /// full; there are no spurious failures.
    #[inline(always)]
    pub fn push(&self, value: T) -> Result<(), T> {
        let w = self.write_pos.load(Ordering::Relaxed);

        if w.wrapping_sub(self.cached_read_pos.get()) >= self.capacity() as u64 {
            self.cached_read_pos.set(self.read_pos.load(Ordering::Acquire));
            if w.wrapping_sub(self.cached_read_pos.get()) >= self.capacity() as u64 {
                return Err(value);
            }
        }

        unsafe {
            let slot = self.buffer.get_unchecked((w & self.mask) as usize);
            (*slot.get()).write(value);
        }

        self.write_pos.store(w.wrapping_add(1), Ordering::Release);

        Ok(())
    }

    /// Consumer side. Returns `None` only when the ring is genuinely empty.
    #[inline(always)]
    pub fn pop(&self) -> Option<T> {
        let r = self.read_pos.load(Ordering::Relaxed);

        if r >= self.cached_write_pos.get() {
            self.cached_write_pos.set(self.write_pos.load(Ordering::Acquire));
            if r >= self.cached_write_pos.get() {
                return None;
            }
        }

        let value = unsafe {
            let slot = self.buffer.get_unchecked((r & self.mask) as usize);
            (*slot.get()).assume_init_read()
        };

        self.read_pos.store(r.wrapping_add(1), Ordering::Release);

        Some(value)
    }

    #[inline]
    pub fn available_to_read(&self) -> usize {
        let w = self.write_pos.load(Ordering::Acquire);
        let r = self.read_pos.load(Ordering::Acquire);
        w.wrapping_sub(r) as usize
    }

    #[inline]
    pub fn available_to_write(&self) -> usize {
        self.capacity().saturating_sub(self.available_to_read())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.available_to_read() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.available_to_read() >= self.capacity()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all queued values and rewind the counters. The `&mut` receiver
    /// encodes the precondition: no concurrent producer or consumer exists.
    pub fn reset(&mut self) {
        while self.pop().is_some() {}

        self.write_pos.store(0, Ordering::Relaxed);
        self.read_pos.store(0, Ordering::Relaxed);
        self.cached_read_pos.set(0);
        self.cached_write_pos.set(0);
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}
