// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A fixed-capacity, non-allocating monotone deque over `(value, time)` pairs,
//! used to track a windowed maximum or minimum.
//!
//! The teacher crate's `recovery::bbr::windowed_filter::WindowedFilter` keeps
//! only the single current extremum plus its timestamp, replacing it either
//! when superseded or when it simply expires. The spec instead calls for a
//! true monotone deque (`update_max`/`update_min`, `get`) so that, as in
//! `msquic`'s `QUIC_SLIDING_WINDOW_EXTREMUM`, the second- and third-best
//! samples are retained and ready to become the new extremum the instant the
//! current one ages out — this is required for the windowed-max-over-rounds
//! filters in `bandwidth` (C2) and `ack_aggregation` (C3). The array-backed,
//! capacity-bounded shape (no heap allocation per update) is kept from the
//! teacher's filter.

/// Matches the source's `kBbrDefaultFilterCapacity`: small and fixed.
pub const CAPACITY: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Max,
    Min,
}

impl Order {
    /// True if `back`, the current last (most recently pushed) entry, should
    /// be evicted in favor of `new` because it can never again be the extremum.
    #[inline]
    fn evicts<V: PartialOrd>(self, back: V, new: V) -> bool {
        match self {
            Order::Max => back <= new,
            Order::Min => back >= new,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Entry<V> {
    value: V,
    time: u64,
}

/// A monotone deque over `(value, time)` pairs, bounded to `window_len` time
/// units and [`CAPACITY`] entries.
#[derive(Clone, Debug)]
pub struct SlidingWindowExtremum<V> {
    // entries[0..len) holds the deque content, oldest first
    entries: [Option<Entry<V>>; CAPACITY],
    len: usize,
    window_len: u64,
    order: Order,
}

impl<V: Copy + PartialOrd> SlidingWindowExtremum<V> {
    pub fn new(order: Order, window_len: u64) -> Self {
        Self {
            entries: [None; CAPACITY],
            len: 0,
            window_len,
            order,
        }
    }

    /// Empties the deque
    pub fn reset(&mut self) {
        self.entries = [None; CAPACITY];
        self.len = 0;
    }

    /// Inserts `(value, time)`, maintaining monotonicity and the window bound.
    ///
    /// `time` must be monotonically non-decreasing across calls.
    pub fn update(&mut self, value: V, time: u64) {
        while self.len > 0 {
            let back = self.entries[self.len - 1].expect("entries[0..len) are always Some");
            if self.order.evicts(back.value, value) {
                self.len -= 1;
            } else {
                break;
            }
        }

        if self.len == CAPACITY {
            self.pop_front();
        }

        self.entries[self.len] = Some(Entry { value, time });
        self.len += 1;

        self.evict_expired(time);
    }

    fn evict_expired(&mut self, now: u64) {
        while self.len > 0 {
            let front = self.entries[0].expect("entries[0..len) are always Some");
            // Strictly older than the window: the front's time plus the window
            // length has to still cover `now`.
            if front.time.saturating_add(self.window_len) < now {
                self.pop_front();
            } else {
                break;
            }
        }
    }

    fn pop_front(&mut self) {
        debug_assert!(self.len > 0);
        for i in 1..self.len {
            self.entries[i - 1] = self.entries[i];
        }
        self.entries[self.len - 1] = None;
        self.len -= 1;
    }

    /// Returns the current extremum and the time it was inserted, or `None`
    /// if the deque is empty.
    pub fn get(&self) -> Option<(V, u64)> {
        self.entries[0].map(|entry| (entry.value, entry.time))
    }

    /// Returns just the current extremum value, or a caller-supplied default
    /// if the deque is empty.
    pub fn value_or(&self, default: V) -> V {
        self.get().map(|(value, _)| value).unwrap_or(default)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.len
    }
}
