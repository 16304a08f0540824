#![forbid(unsafe_code)]

//! Single-producer/single-consumer ring of recent frametimes.
//!
//! The host reports one frametime per rendered frame from its main thread,
//! while a background replay worker periodically drains whatever it has not
//! yet classified. [`bounded`] splits one backing store into a
//! [`RingProducer`] and a [`RingConsumer`]. Neither handle is `Clone` and
//! every mutating call takes `&mut self`, so "exactly one writer and exactly
//! one reader" is enforced by ownership rather than by caller discipline.
//!
//! # Cursors
//!
//! Both cursors are kept as monotonic counters (`written`, `read`). The
//! cyclic cursors callers reason about are those counters modulo capacity:
//!
//! - [`RingConsumer::insertion_cursor`]: next slot the producer writes.
//! - [`RingConsumer::read_cursor`]: oldest slot not yet consumed.
//!
//! Monotonic counters make "full" and "empty" distinguishable, so a ring of
//! capacity `N` that received `N` values snapshots all `N` of them.
//!
//! If the producer laps the consumer, the overwritten entries are gone and the
//! read cursor is treated as `written - capacity`.
//!
//! # Memory ordering
//!
//! Slots are written with `Relaxed` stores before the `written` counter is
//! published with `Release`; the consumer loads `written` with `Acquire`
//! before reading slots. Slots are not fenced individually: a producer that
//! laps the consumer *during* a snapshot can replace values mid-copy. With the
//! default capacity that requires more than a thousand frames inside one
//! worker iteration.
//!
//! # Example
//!
//! ```
//! use overbounce_core::ring;
//!
//! let (mut producer, mut consumer) = ring::bounded::<f32>(4, 0.5);
//! producer.add(0.016);
//! producer.add(0.017);
//! assert_eq!(consumer.snapshot(), vec![0.016, 0.017]);
//!
//! consumer.advance_read_cursor(1);
//! assert_eq!(consumer.snapshot(), vec![0.017]);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of frametimes kept by the replay ring.
pub const DEFAULT_CAPACITY: usize = 1250;

/// Default fraction of the ring discarded by [`RingConsumer::reset_read_cursor`].
pub const DEFAULT_FORGET_RATIO: f64 = 0.75;

/// A `Copy` scalar that can live in an atomic ring slot.
///
/// Values round-trip through a `u64` bit pattern so the ring needs no
/// `unsafe` cell access.
pub trait RingValue: Copy + Send + Sync + 'static {
    /// Encode into the slot representation.
    fn into_slot(self) -> u64;
    /// Decode from the slot representation.
    fn from_slot(bits: u64) -> Self;
}

impl RingValue for f32 {
    #[inline]
    fn into_slot(self) -> u64 {
        u64::from(self.to_bits())
    }

    #[inline]
    fn from_slot(bits: u64) -> Self {
        f32::from_bits(bits as u32)
    }
}

impl RingValue for f64 {
    #[inline]
    fn into_slot(self) -> u64 {
        self.to_bits()
    }

    #[inline]
    fn from_slot(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}

impl RingValue for u32 {
    #[inline]
    fn into_slot(self) -> u64 {
        u64::from(self)
    }

    #[inline]
    fn from_slot(bits: u64) -> Self {
        bits as u32
    }
}

impl RingValue for u64 {
    #[inline]
    fn into_slot(self) -> u64 {
        self
    }

    #[inline]
    fn from_slot(bits: u64) -> Self {
        bits
    }
}

impl RingValue for i32 {
    #[inline]
    fn into_slot(self) -> u64 {
        u64::from(self as u32)
    }

    #[inline]
    fn from_slot(bits: u64) -> Self {
        bits as u32 as i32
    }
}

struct RingShared<T> {
    slots: Box<[AtomicU64]>,
    /// Total number of values ever added.
    written: AtomicU64,
    forget_ratio: f64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RingShared<T> {
    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn slot_index(&self, counter: u64) -> usize {
        (counter % self.capacity() as u64) as usize
    }

    #[inline]
    fn load_written(&self) -> u64 {
        self.written.load(Ordering::Acquire)
    }

    fn forget_count(&self) -> usize {
        let forget = (self.capacity() as f64 * self.forget_ratio).floor() as usize;
        forget.min(self.capacity())
    }
}

/// Create a ring with the given capacity and forget ratio.
///
/// A capacity of 0 is clamped to 1. The forget ratio is clamped to `[0, 1]`
/// (NaN becomes 0).
#[must_use]
pub fn bounded<T: RingValue>(
    capacity: usize,
    forget_ratio: f64,
) -> (RingProducer<T>, RingConsumer<T>) {
    let capacity = capacity.max(1);
    let forget_ratio = if forget_ratio.is_nan() {
        0.0
    } else {
        forget_ratio.clamp(0.0, 1.0)
    };
    let slots: Box<[AtomicU64]> = (0..capacity).map(|_| AtomicU64::new(0)).collect();
    let shared = Arc::new(RingShared {
        slots,
        written: AtomicU64::new(0),
        forget_ratio,
        _marker: PhantomData,
    });
    (
        RingProducer {
            shared: Arc::clone(&shared),
            written: 0,
        },
        RingConsumer { shared, read: 0 },
    )
}

/// Writing half of the ring. Owned by the frame callback.
pub struct RingProducer<T: RingValue> {
    shared: Arc<RingShared<T>>,
    written: u64,
}

impl<T: RingValue> RingProducer<T> {
    /// Write `value` at the insertion cursor and advance it. Never blocks.
    #[inline]
    pub fn add(&mut self, value: T) {
        let idx = self.shared.slot_index(self.written);
        self.shared.slots[idx].store(value.into_slot(), Ordering::Relaxed);
        self.written += 1;
        self.shared.written.store(self.written, Ordering::Release);
    }

    /// Next slot that [`add`](Self::add) will write.
    #[must_use]
    pub fn insertion_cursor(&self) -> usize {
        self.shared.slot_index(self.written)
    }

    /// Number of slots in the ring.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

impl<T: RingValue> fmt::Debug for RingProducer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingProducer")
            .field("capacity", &self.capacity())
            .field("written", &self.written)
            .finish()
    }
}

/// Reading half of the ring. Owned by the replay worker.
pub struct RingConsumer<T: RingValue> {
    shared: Arc<RingShared<T>>,
    /// Total number of values consumed (monotonic).
    read: u64,
}

impl<T: RingValue> RingConsumer<T> {
    /// Oldest readable counter given `written`, skipping lapped entries.
    #[inline]
    fn effective_read(&self, written: u64) -> u64 {
        let oldest_kept = written.saturating_sub(self.shared.capacity() as u64);
        self.read.max(oldest_kept)
    }

    /// All unread values, oldest first.
    ///
    /// Takes a point-in-time view of the insertion cursor and copies the
    /// cyclic span from the read cursor to it (tail segment, then head
    /// segment). If the producer lapped the consumer, the read cursor first
    /// catches up to the oldest value still stored.
    pub fn snapshot(&mut self) -> Vec<T> {
        let written = self.shared.load_written();
        self.read = self.effective_read(written);

        let len = (written - self.read) as usize;
        let mut values = Vec::with_capacity(len);
        if len == 0 {
            return values;
        }

        let capacity = self.shared.capacity();
        let start = self.shared.slot_index(self.read);
        let end = self.shared.slot_index(written);
        let decode = |slot: &AtomicU64| T::from_slot(slot.load(Ordering::Relaxed));
        if start < end {
            values.extend(self.shared.slots[start..end].iter().map(decode));
        } else {
            values.extend(self.shared.slots[start..capacity].iter().map(decode));
            values.extend(self.shared.slots[..end].iter().map(decode));
        }
        values
    }

    /// Mark the `n` oldest unread values as consumed.
    ///
    /// The read cursor never moves past the insertion cursor.
    pub fn advance_read_cursor(&mut self, n: usize) {
        let written = self.shared.load_written();
        let read = self.effective_read(written).saturating_add(n as u64);
        self.read = read.min(written);
    }

    /// Forget all but the most recent `capacity - floor(capacity * forget_ratio)`
    /// values.
    ///
    /// The read cursor lands on `(insertion_cursor + floor(capacity * forget_ratio))
    /// mod capacity`. Slots never written since construction are not history,
    /// so a ring that has not yet received that many values keeps all of them.
    pub fn reset_read_cursor(&mut self) {
        let written = self.shared.load_written();
        let keep = (self.shared.capacity() - self.shared.forget_count()) as u64;
        // May move backwards: already consumed recent values become unread again.
        self.read = written.saturating_sub(keep);
    }

    /// Number of values a [`snapshot`](Self::snapshot) would return now.
    #[must_use]
    pub fn unread_len(&self) -> usize {
        let written = self.shared.load_written();
        (written - self.effective_read(written)) as usize
    }

    /// Next slot the producer writes.
    #[must_use]
    pub fn insertion_cursor(&self) -> usize {
        self.shared.slot_index(self.shared.load_written())
    }

    /// Oldest unread slot.
    #[must_use]
    pub fn read_cursor(&self) -> usize {
        let written = self.shared.load_written();
        self.shared.slot_index(self.effective_read(written))
    }

    /// Number of slots in the ring.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Fraction of the ring discarded by [`reset_read_cursor`](Self::reset_read_cursor).
    #[must_use]
    pub fn forget_ratio(&self) -> f64 {
        self.shared.forget_ratio
    }
}

impl<T: RingValue> fmt::Debug for RingConsumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingConsumer")
            .field("capacity", &self.capacity())
            .field("read", &self.read)
            .field("unread", &self.unread_len())
            .finish()
    }
}
