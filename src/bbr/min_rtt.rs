// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Rolling minimum-RTT tracker with expiry (C5).
//!
//! Grounded on `original_source/src/core/bbr.c`'s `MinRtt`/`MinRttTimestamp`
//! handling. The teacher's equivalent (`recovery::bbr::min_rtt`) additionally
//! special-cases a loss-based floor that BBRv2 needs and this algorithm does
//! not use; kept simple per the spec's single expiry rule.

use crate::time::Timestamp;
use core::time::Duration;

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#4.1.3
//# BBRMinRTTFilterLen = 10 secs
pub const MIN_RTT_EXPIRATION: Duration = Duration::from_secs(10);

/// Holds the rolling minimum RTT sample and whether it has just expired.
///
/// The 10 s expiry is the *only* mechanism that forces a ProbeRTT entry.
#[derive(Clone, Copy, Debug, Default)]
pub struct MinRttTracker {
    min_rtt: Duration,
    min_rtt_timestamp: Option<Timestamp>,
}

impl MinRttTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn min_rtt(&self) -> Option<Duration> {
        self.min_rtt_timestamp.map(|_| self.min_rtt)
    }

    pub fn is_valid(&self) -> bool {
        self.min_rtt_timestamp.is_some()
    }

    /// True if the currently held sample is older than [`MIN_RTT_EXPIRATION`]
    /// as of `time_now`. Computed *before* any update this call might apply.
    pub fn is_expired(&self, time_now: Timestamp) -> bool {
        match self.min_rtt_timestamp {
            Some(timestamp) => timestamp.saturating_add(MIN_RTT_EXPIRATION) <= time_now,
            None => false,
        }
    }

    /// Resets the expiry clock without changing the held minimum, used when
    /// ProbeRTT exits: the sample just re-validated by the probe shouldn't
    /// immediately re-trigger another ProbeRTT entry.
    pub fn refresh_timestamp(&mut self, time_now: Timestamp) {
        if self.min_rtt_timestamp.is_some() {
            self.min_rtt_timestamp = Some(time_now);
        }
    }

    /// Folds in a new RTT sample. Replaces the held minimum if it has
    /// expired or if `sample` is smaller. Returns whether the sample just
    /// expired (computed before the replacement), which drives a ProbeRTT
    /// entry upstream.
    pub fn on_rtt_sample(&mut self, sample: Duration, time_now: Timestamp) -> bool {
        let expired = self.is_expired(time_now);

        if expired || !self.is_valid() || sample < self.min_rtt {
            self.min_rtt = sample;
            self.min_rtt_timestamp = Some(time_now);
        }

        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_always_accepted() {
        let mut tracker = MinRttTracker::new();
        assert!(!tracker.is_valid());
        tracker.on_rtt_sample(Duration::from_millis(30), Timestamp::from_micros(0));
        assert!(tracker.is_valid());
        assert_eq!(Some(Duration::from_millis(30)), tracker.min_rtt());
    }

    #[test]
    fn larger_sample_is_ignored_while_fresh() {
        let mut tracker = MinRttTracker::new();
        tracker.on_rtt_sample(Duration::from_millis(30), Timestamp::from_micros(0));
        tracker.on_rtt_sample(Duration::from_millis(50), Timestamp::from_micros(1_000));
        assert_eq!(Some(Duration::from_millis(30)), tracker.min_rtt());
    }

    #[test]
    fn smaller_sample_always_replaces() {
        let mut tracker = MinRttTracker::new();
        tracker.on_rtt_sample(Duration::from_millis(30), Timestamp::from_micros(0));
        tracker.on_rtt_sample(Duration::from_millis(10), Timestamp::from_micros(1_000));
        assert_eq!(Some(Duration::from_millis(10)), tracker.min_rtt());
    }

    #[test]
    fn expiry_after_ten_seconds_forces_replacement_even_with_a_larger_sample() {
        let mut tracker = MinRttTracker::new();
        tracker.on_rtt_sample(Duration::from_millis(30), Timestamp::from_micros(0));

        let ten_seconds_later = Timestamp::from_micros(0) + MIN_RTT_EXPIRATION;
        assert!(tracker.is_expired(ten_seconds_later));

        let expired = tracker.on_rtt_sample(Duration::from_millis(50), ten_seconds_later);
        assert!(expired);
        assert_eq!(Some(Duration::from_millis(50)), tracker.min_rtt());
    }

    #[test]
    fn not_yet_expired_one_microsecond_before_the_boundary() {
        let mut tracker = MinRttTracker::new();
        tracker.on_rtt_sample(Duration::from_millis(30), Timestamp::from_micros(0));

        let just_before = (Timestamp::from_micros(0) + MIN_RTT_EXPIRATION)
            .saturating_duration_since(Timestamp::from_micros(0));
        let just_before = Timestamp::from_micros(0) + (just_before - Duration::from_micros(1));
        assert!(!tracker.is_expired(just_before));
    }
}
