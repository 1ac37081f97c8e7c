// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Windowed-max excess-bytes-delivered estimator (C3).
//!
//! Grounded on `original_source/src/core/bbr.c`'s
//! `BbrCongestionControlUpdateAckAggregation`. The teacher's
//! `recovery::bbr::ack_aggregation` filter follows the same "aggregated
//! minus expected, windowed-max over rounds" shape; this module keeps that
//! shape but drops the teacher's BBRv2-specific bandwidth-sample dependency
//! in favor of the plain `Bandwidth` passed in by the caller.

use crate::bbr::{
    bandwidth::Bandwidth,
    sliding_window::{Order, SlidingWindowExtremum},
};
use crate::time::Timestamp;

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#4.1.4
//# BBRExtraAckedFilterLen = 10 (rounds)
pub const MAX_ACK_HEIGHT_FILTER_LEN: u64 = 10;

/// Bounds the extra congestion window needed to absorb delayed/aggregated
/// ACKs beyond what the bandwidth-delay product predicts.
#[derive(Clone, Debug)]
pub struct AckAggregationFilter {
    aggregated_ack_bytes: u64,
    start_time: Option<Timestamp>,
    windowed_max: SlidingWindowExtremum<u64>,
}

impl Default for AckAggregationFilter {
    fn default() -> Self {
        Self {
            aggregated_ack_bytes: 0,
            start_time: None,
            windowed_max: SlidingWindowExtremum::new(Order::Max, MAX_ACK_HEIGHT_FILTER_LEN),
        }
    }
}

impl AckAggregationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.aggregated_ack_bytes = 0;
        self.start_time = None;
        self.windowed_max.reset();
    }

    /// The current excess bytes estimate, added to `target_cwnd` once the
    /// bottleneck bandwidth has been found.
    pub fn max_ack_height(&self) -> u64 {
        self.windowed_max.value_or(0)
    }

    /// Folds in one ack, returning the excess bytes this batch contributed
    /// (0 unless the aggregation hypothesis held).
    pub fn on_ack(
        &mut self,
        bandwidth: Bandwidth,
        num_retransmittable_bytes: u64,
        time_now: Timestamp,
        round_trip_counter: u64,
    ) -> u64 {
        let Some(start_time) = self.start_time else {
            self.start_time = Some(time_now);
            self.aggregated_ack_bytes = 0;
            return 0;
        };

        let elapsed = time_now.saturating_duration_since(start_time);
        let expected = bandwidth.bytes_over(elapsed);

        if self.aggregated_ack_bytes <= expected {
            // This batch broke the aggregation hypothesis: restart the window.
            self.aggregated_ack_bytes = num_retransmittable_bytes;
            self.start_time = Some(time_now);
            return 0;
        }

        self.aggregated_ack_bytes = self
            .aggregated_ack_bytes
            .saturating_add(num_retransmittable_bytes);
        let excess = self.aggregated_ack_bytes - expected;
        self.windowed_max.update(excess, round_trip_counter);
        excess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[test]
    fn first_ack_only_sets_the_start_time() {
        let mut filter = AckAggregationFilter::new();
        let excess = filter.on_ack(Bandwidth::ZERO, 1200, Timestamp::from_micros(0), 1);
        assert_eq!(0, excess);
        assert_eq!(0, filter.max_ack_height());
    }

    #[test]
    fn aggregation_below_expected_resets_the_window() {
        let mut filter = AckAggregationFilter::new();
        let bandwidth = Bandwidth::from_delivered(1_000_000, Duration::from_secs(1)).unwrap();

        filter.on_ack(bandwidth, 1200, Timestamp::from_micros(0), 1);
        // A huge elapsed time makes `expected` large, so the small ack
        // doesn't exceed it: aggregation resets instead of accumulating.
        let excess = filter.on_ack(
            bandwidth,
            1200,
            Timestamp::from_micros(10_000_000),
            2,
        );
        assert_eq!(0, excess);
    }

    #[test]
    fn bursty_acks_accumulate_excess_above_expected() {
        let mut filter = AckAggregationFilter::new();
        // A slow bandwidth estimate makes `expected` round down to 0 bytes
        // over a microsecond-scale gap, so each of the first two acks resets
        // the window (aggregated starts back at 0, which is always <= a
        // nonnegative expected); only the third call's burst lands on top of
        // an already-nonzero `aggregated_ack_bytes` and exceeds `expected`.
        let bandwidth = Bandwidth::from_delivered(1_000, Duration::from_secs(1)).unwrap();

        filter.on_ack(bandwidth, 100, Timestamp::from_micros(0), 1);
        filter.on_ack(bandwidth, 100, Timestamp::from_micros(1), 1);
        let excess = filter.on_ack(bandwidth, 100_000, Timestamp::from_micros(2), 1);
        assert!(excess > 0);
        assert_eq!(excess, filter.max_ack_height());
    }
}
