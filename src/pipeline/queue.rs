//! Bounded ring queue with sentinel-CAS cursor claims
//!
//! A fixed-capacity ring buffer moving owned values between pipeline
//! stages. Each end (push, pop) claims its cursor by swapping in a
//! sentinel value via compare-and-swap, so the queue tolerates multiple
//! producers or multiple consumers; the pipeline uses each instance in a
//! single-producer/multi-consumer or multi-producer/single-consumer
//! discipline.
//!
//! Values are moved in on push and out on pop - ownership transfers
//! through the queue with no aliasing in transit. Slots are
//! `UnsafeCell<MaybeUninit<T>>`; the cursor/length protocol below is what
//! makes the accesses disjoint.
//!
//! # Blocking and cancellation
//!
//! The blocking entry points ([`BoundedQueue::push_blocking`],
//! [`BoundedQueue::pop_blocking`]) wait on a condvar in bounded ~100 ms
//! ticks and re-evaluate a caller-supplied predicate between ticks. That
//! tick is the pipeline's cancellation granularity: a raised abort flag is
//! observed within one interval even if a wakeup is lost.
//!
//! # Protocol
//!
//! - A pusher claims `write_idx` via CAS with the sentinel; the winner
//!   moves the value into `slots[idx]`, increments `count` (Release),
//!   then publishes `(idx + 1) % capacity` (Release), handing the cursor
//!   to the next pusher. Losers yield and retry.
//! - A popper mirrors this on `read_idx`, decrementing `count`.
//! - `count` is re-checked under the claim: admission is refused at
//!   `count == capacity`, popping at `count == 0`.
//! - The CAS acquires the previous holder's cursor publication, so a
//!   claimant observes every count update made by earlier holders of the
//!   same cursor; acquire loads of `count` synchronize with the
//!   release increments/decrements, which is what carries slot contents
//!   (and slot vacancy on wraparound) across threads.

use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Cursor value marking an end as claimed. Outside `[0, capacity)`.
const CURSOR_LOCKED: usize = usize::MAX;

/// Upper bound on a single blocking wait; abort flags are sampled at
/// this interval.
pub const WAIT_TICK: Duration = Duration::from_millis(100);

/// One waitable edge of the queue (data arrival or space release)
struct WaitPoint {
    lock: Mutex<()>,
    cond: Condvar,
}

impl WaitPoint {
    fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// Park for at most [`WAIT_TICK`]. Spurious wakeups are fine; callers
    /// loop on their predicate.
    fn wait_tick(&self) {
        let mut guard = self.lock.lock();
        let _ = self.cond.wait_for(&mut guard, WAIT_TICK);
    }

    fn notify_one(&self) {
        self.cond.notify_one();
    }

    fn notify_all(&self) {
        self.cond.notify_all();
    }
}

/// Fixed-capacity ring queue carrying owned values between stages
pub struct BoundedQueue<T> {
    /// Slot storage. A slot is initialized iff it lies in the live window
    /// `[read_idx, read_idx + count)` (mod capacity).
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,

    capacity: usize,

    /// Next slot to fill. `CURSOR_LOCKED` while a pusher owns the end.
    write_idx: CachePadded<AtomicUsize>,

    /// Next slot to drain. `CURSOR_LOCKED` while a popper owns the end.
    read_idx: CachePadded<AtomicUsize>,

    /// Live entry count, `0..=capacity`.
    count: CachePadded<AtomicUsize>,

    /// Signaled on push; poppers wait here.
    data: WaitPoint,

    /// Signaled on pop; pushers wait here.
    space: WaitPoint,
}

// SAFETY: The cursor claim protocol serializes access per end, and the
// count handshake (Release update / Acquire read) carries slot contents
// between threads. Values only require Send because ownership moves.
unsafe impl<T: Send> Send for BoundedQueue<T> {}
unsafe impl<T: Send> Sync for BoundedQueue<T> {}

impl<T> BoundedQueue<T> {
    /// Create a queue with `capacity` slots
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "queue capacity must be at least 1");
        assert!(capacity < CURSOR_LOCKED);

        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            capacity,
            write_idx: CachePadded::new(AtomicUsize::new(0)),
            read_idx: CachePadded::new(AtomicUsize::new(0)),
            count: CachePadded::new(AtomicUsize::new(0)),
            data: WaitPoint::new(),
            space: WaitPoint::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current entry count. Eventually consistent under concurrent use.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `value` if a slot is free, else hand it back as `Err`
    pub fn try_push(&self, value: T) -> Result<(), T> {
        loop {
            if self.count.load(Ordering::Acquire) >= self.capacity {
                return Err(value);
            }

            let cursor = self.write_idx.load(Ordering::Relaxed);
            if cursor == CURSOR_LOCKED {
                // Another pusher holds the end.
                std::thread::yield_now();
                continue;
            }

            if self
                .write_idx
                .compare_exchange_weak(cursor, CURSOR_LOCKED, Ordering::AcqRel, Ordering::Relaxed)
                .is_err()
            {
                std::thread::yield_now();
                continue;
            }

            // Cursor claimed. Re-check admission: a rival pusher may have
            // filled the queue between the first check and the claim.
            if self.count.load(Ordering::Acquire) >= self.capacity {
                self.write_idx.store(cursor, Ordering::Release);
                return Err(value);
            }

            // SAFETY: count < capacity and we hold the write cursor, so
            // slots[cursor] is outside the live window and no other thread
            // touches it until the cursor is republished.
            unsafe {
                (*self.slots[cursor].get()).write(value);
            }

            self.count.fetch_add(1, Ordering::Release);
            self.write_idx
                .store((cursor + 1) % self.capacity, Ordering::Release);

            self.data.notify_one();
            return Ok(());
        }
    }

    /// Remove and return the head entry, or `None` if empty
    pub fn try_pop(&self) -> Option<T> {
        loop {
            if self.count.load(Ordering::Acquire) == 0 {
                return None;
            }

            let cursor = self.read_idx.load(Ordering::Relaxed);
            if cursor == CURSOR_LOCKED {
                std::thread::yield_now();
                continue;
            }

            if self
                .read_idx
                .compare_exchange_weak(cursor, CURSOR_LOCKED, Ordering::AcqRel, Ordering::Relaxed)
                .is_err()
            {
                std::thread::yield_now();
                continue;
            }

            // Re-check under the claim: a rival popper may have drained
            // the last entry.
            if self.count.load(Ordering::Acquire) == 0 {
                self.read_idx.store(cursor, Ordering::Release);
                return None;
            }

            // SAFETY: count > 0 and we hold the read cursor, so
            // slots[cursor] is the initialized head of the live window.
            let value = unsafe { (*self.slots[cursor].get()).assume_init_read() };

            self.count.fetch_sub(1, Ordering::Release);
            self.read_idx
                .store((cursor + 1) % self.capacity, Ordering::Release);

            self.space.notify_one();
            return Some(value);
        }
    }

    /// Push, waiting for space in bounded ticks
    ///
    /// `keep_going` is consulted between ticks; when it turns false the
    /// value is handed back as `Err`.
    pub fn push_blocking<F>(&self, value: T, keep_going: F) -> Result<(), T>
    where
        F: Fn() -> bool,
    {
        let mut value = value;
        loop {
            match self.try_push(value) {
                Ok(()) => return Ok(()),
                Err(v) => {
                    if !keep_going() {
                        return Err(v);
                    }
                    value = v;
                    self.space.wait_tick();
                }
            }
        }
    }

    /// Pop, waiting for data in bounded ticks
    ///
    /// Returns `None` once the queue is empty and `should_stop` reports
    /// true; a final pop attempt guards against entries racing in just
    /// before the stop condition was read.
    pub fn pop_blocking<F>(&self, should_stop: F) -> Option<T>
    where
        F: Fn() -> bool,
    {
        loop {
            if let Some(value) = self.try_pop() {
                return Some(value);
            }
            if should_stop() {
                return self.try_pop();
            }
            self.data.wait_tick();
        }
    }

    /// Wake every thread blocked on this queue (both directions)
    ///
    /// Used when the shutdown or abort flags flip, so waiters re-check
    /// their predicates immediately instead of at the next tick.
    pub fn wake_all(&self) {
        self.data.notify_all();
        self.space.notify_all();
    }
}

impl<T> Drop for BoundedQueue<T> {
    fn drop(&mut self) {
        // Exclusive access: drain whatever is still in the live window.
        let count = *self.count.get_mut();
        let mut idx = *self.read_idx.get_mut();

        for _ in 0..count {
            // SAFETY: slots in [read_idx, read_idx + count) are initialized.
            unsafe { self.slots[idx].get_mut().assume_init_drop() };
            idx = (idx + 1) % self.capacity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_push_pop_basic() {
        let queue = BoundedQueue::new(4);

        assert!(queue.is_empty());
        queue.try_push(7u64).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.try_pop(), Some(7));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_returns_value_unchanged() {
        let queue = BoundedQueue::new(2);

        queue.try_push(1u64).unwrap();
        queue.try_push(2u64).unwrap();

        // Full: the value comes back and nothing mutates.
        assert_eq!(queue.try_push(3u64), Err(3));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop(), Some(1));
    }

    #[test]
    fn test_empty_pop_returns_none() {
        let queue: BoundedQueue<u64> = BoundedQueue::new(2);
        assert_eq!(queue.try_pop(), None);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    #[should_panic(expected = "capacity must be at least 1")]
    fn test_zero_capacity_panics() {
        let _ = BoundedQueue::<u64>::new(0);
    }

    #[test]
    fn test_fifo_with_wraparound() {
        let queue = BoundedQueue::new(4);

        // Fill and drain repeatedly so the cursors wrap several times.
        for round in 0..10u64 {
            let base = round * 4;
            for i in 0..4 {
                queue.try_push(base + i).unwrap();
            }
            for i in 0..4 {
                assert_eq!(queue.try_pop(), Some(base + i));
            }
            assert_eq!(queue.try_pop(), None);
        }
    }

    #[test]
    fn test_drop_releases_remaining_items() {
        let drops = Arc::new(AtomicUsize::new(0));

        struct Tracker(Arc<AtomicUsize>);
        impl Drop for Tracker {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        {
            let queue = BoundedQueue::new(4);
            queue.try_push(Tracker(Arc::clone(&drops))).ok().unwrap();
            queue.try_push(Tracker(Arc::clone(&drops))).ok().unwrap();
            queue.try_push(Tracker(Arc::clone(&drops))).ok().unwrap();
            assert_eq!(queue.try_pop().is_some(), true);
        }

        assert_eq!(drops.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_cross_thread_handoff() {
        let queue = Arc::new(BoundedQueue::new(8));
        let count = 10_000u64;

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..count {
                    queue.push_blocking(i, || true).unwrap();
                }
            })
        };

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut received = Vec::with_capacity(count as usize);
                while received.len() < count as usize {
                    if let Some(v) = queue.try_pop() {
                        received.push(v);
                    } else {
                        thread::yield_now();
                    }
                }
                received
            })
        };

        producer.join().unwrap();
        let received = consumer.join().unwrap();

        for (i, &v) in received.iter().enumerate() {
            assert_eq!(v, i as u64, "FIFO violation at index {}", i);
        }
    }

    #[test]
    fn test_spmc_every_value_delivered_once() {
        let queue = Arc::new(BoundedQueue::new(8));
        let total = 8_000u64;
        let consumers = 4;
        let done = Arc::new(AtomicBool::new(false));

        let handles: Vec<_> = (0..consumers)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(v) =
                        queue.pop_blocking(|| done.load(Ordering::Relaxed))
                    {
                        seen.push(v);
                    }
                    seen
                })
            })
            .collect();

        for i in 0..total {
            queue.push_blocking(i, || true).unwrap();
        }
        done.store(true, Ordering::Relaxed);
        queue.wake_all();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();

        // Exactly-once delivery across competing consumers.
        assert_eq!(all.len(), total as usize);
        for (i, &v) in all.iter().enumerate() {
            assert_eq!(v, i as u64);
        }
    }

    #[test]
    fn test_mpsc_every_value_delivered_once() {
        let queue = Arc::new(BoundedQueue::new(8));
        let per_producer = 2_000u64;
        let producers = 4u64;

        let handles: Vec<_> = (0..producers)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..per_producer {
                        queue.push_blocking(p * per_producer + i, || true).unwrap();
                    }
                })
            })
            .collect();

        let mut all = Vec::with_capacity((producers * per_producer) as usize);
        while all.len() < (producers * per_producer) as usize {
            if let Some(v) = queue.try_pop() {
                all.push(v);
            } else {
                thread::yield_now();
            }
        }

        for h in handles {
            h.join().unwrap();
        }

        all.sort_unstable();
        for (i, &v) in all.iter().enumerate() {
            assert_eq!(v, i as u64);
        }
    }

    #[test]
    fn test_pop_blocking_stops_on_predicate() {
        let queue: Arc<BoundedQueue<u64>> = Arc::new(BoundedQueue::new(2));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            thread::spawn(move || queue.pop_blocking(|| stop.load(Ordering::Relaxed)))
        };

        stop.store(true, Ordering::Relaxed);
        queue.wake_all();

        // Returns None promptly once the predicate fires on an empty queue.
        assert_eq!(handle.join().unwrap(), None);
    }

    #[test]
    fn test_push_blocking_applies_backpressure() {
        let queue = Arc::new(BoundedQueue::new(1));
        queue.try_push(0u64).unwrap();

        let handle = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push_blocking(1u64, || true))
        };

        // The pusher is stalled until the consumer frees a slot.
        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.try_pop(), Some(0));

        handle.join().unwrap().unwrap();
        assert_eq!(queue.try_pop(), Some(1));
    }

    #[test]
    fn test_push_blocking_gives_value_back_on_stop() {
        let queue = BoundedQueue::new(1);
        queue.try_push(0u64).unwrap();

        assert_eq!(queue.push_blocking(9u64, || false), Err(9));
        assert_eq!(queue.len(), 1);
    }
}
