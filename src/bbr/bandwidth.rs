// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Delivery-rate sampling and the windowed-max bandwidth filter (C2).
//!
//! Grounded on the teacher's `recovery::bandwidth::estimator::Estimator`
//! for the overall shape (a windowed-max filter fed by per-acked-packet
//! delivery-rate samples, gated by an app-limited flag with a delayed exit
//! target) and on `original_source/src/core/bbr.c`'s
//! `BbrCongestionControlUpdateBandwidth` for the exact send-rate/ack-rate
//! sample computation and admission rule, since the spec's algorithm
//! matches the original bit-for-bit rather than the teacher's BBRv2 rate
//! sample (which additionally folds in loss and ECN accounting not present
//! here).

use crate::bbr::{
    gain::Gain,
    sliding_window::{Order, SlidingWindowExtremum},
    PacketNumber,
};
use crate::time::Timestamp;
use core::time::Duration;

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#2.6
//# BBR.bw: The current estimate of BBR's available bandwidth.
pub const BW_UNIT: u64 = 8;

/// A bandwidth, stored scaled by [`BW_UNIT`] so that dividing by `BW_UNIT`
/// yields bytes per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bandwidth(u64);

impl Bandwidth {
    pub const ZERO: Bandwidth = Bandwidth(0);

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// The bandwidth in plain bytes per second
    #[inline]
    pub const fn as_bytes_per_second(self) -> u64 {
        self.0 / BW_UNIT
    }

    /// Constructs a `Bandwidth` from a byte count delivered over `elapsed`,
    /// i.e. `bytes * 1_000_000 * BW_UNIT / elapsed_micros`. Returns `None`
    /// if `elapsed` is zero (the rate is undefined).
    pub fn from_delivered(bytes: u64, elapsed: Duration) -> Option<Self> {
        let elapsed_micros = elapsed.as_micros() as u64;
        if elapsed_micros == 0 {
            return None;
        }

        let raw = match bytes
            .checked_mul(1_000_000)
            .and_then(|v| v.checked_mul(BW_UNIT))
        {
            Some(scaled) => scaled / elapsed_micros,
            None => (bytes / elapsed_micros)
                .saturating_mul(1_000_000)
                .saturating_mul(BW_UNIT),
        };

        Some(Self(raw))
    }

    /// `self * gain`
    #[inline]
    pub fn scale(self, gain: Gain) -> Bandwidth {
        Bandwidth(gain.scale_u64(self.0))
    }

    /// The number of bytes deliverable over `duration` at this rate:
    /// `self * duration / 1_000_000 / BW_UNIT`.
    pub fn bytes_over(self, duration: Duration) -> u64 {
        let duration_micros = duration.as_micros() as u64;
        match self.0.checked_mul(duration_micros) {
            Some(product) => product / 1_000_000 / BW_UNIT,
            None => (self.0 / (1_000_000 * BW_UNIT)).saturating_mul(duration_micros),
        }
    }
}

/// The delivery-rate bookkeeping snapshotted on a packet at the moment it
/// was most recently used as the "last acked" reference point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LastAckedInfo {
    pub sent_time: Timestamp,
    pub ack_time: Timestamp,
    pub adjusted_ack_time: Timestamp,
    pub total_bytes_sent: u64,
    pub total_bytes_acked: u64,
}

/// One acked packet's metadata, as handed to the bandwidth filter by the
/// controller while iterating an ack event's acked-packet sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketInfo {
    pub packet_length: u32,
    pub sent_time: Timestamp,
    pub total_bytes_sent_at_send: u64,
    pub last_acked_info: Option<LastAckedInfo>,
    pub is_app_limited: bool,
}

/// The bandwidth filter: a windowed-max over delivery-rate samples, gated by
/// an app-limited flag with a delayed exit target.
#[derive(Clone, Debug)]
pub struct Estimator {
    windowed_max: SlidingWindowExtremum<Bandwidth>,
    app_limited: bool,
    app_limited_exit_target: PacketNumber,
}

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#4.1.1
//# BBRBtlBwFilterLen = 10 (rounds)
pub const MAX_BW_FILTER_LEN: u64 = 10;

impl Default for Estimator {
    fn default() -> Self {
        Self {
            windowed_max: SlidingWindowExtremum::new(Order::Max, MAX_BW_FILTER_LEN),
            app_limited: false,
            app_limited_exit_target: 0,
        }
    }
}

impl Estimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.windowed_max.reset();
        self.app_limited = false;
        self.app_limited_exit_target = 0;
    }

    /// The current windowed-max delivery rate, or zero if no sample has ever
    /// been admitted.
    pub fn get_bandwidth(&self) -> Bandwidth {
        self.windowed_max.value_or(Bandwidth::ZERO)
    }

    pub fn is_app_limited(&self) -> bool {
        self.app_limited
    }

    /// Marks the estimator app-limited: samples below the current max will
    /// be suppressed until an acked packet's `largest_ack` passes `target`.
    pub fn set_app_limited(&mut self, target: PacketNumber) {
        self.app_limited = true;
        self.app_limited_exit_target = target;
    }

    /// Must be called once per ack event, before any `on_acked_packet` calls
    /// for that event, with the event's `largest_ack`.
    pub fn on_ack_event_start(&mut self, largest_ack: PacketNumber) {
        if self.app_limited && self.app_limited_exit_target < largest_ack {
            self.app_limited = false;
        }
    }

    /// Folds in a single acked packet's delivery-rate sample.
    ///
    /// `total_bytes_acked_now` is the cumulative retransmittable bytes acked
    /// over the life of the connection, inclusive of this packet.
    #[allow(clippy::too_many_arguments)]
    pub fn on_acked_packet(
        &mut self,
        packet: &PacketInfo,
        time_now: Timestamp,
        adjusted_ack_time: Timestamp,
        total_bytes_acked_now: u64,
        round_trip_counter: u64,
    ) {
        if packet.packet_length == 0 {
            return;
        }

        let delivery_rate = match packet.last_acked_info {
            Some(last) => {
                let send_rate = {
                    let send_elapsed = packet.sent_time.saturating_duration_since(last.sent_time);
                    let bytes_sent_between = packet
                        .total_bytes_sent_at_send
                        .saturating_sub(last.total_bytes_sent);
                    Bandwidth::from_delivered(bytes_sent_between, send_elapsed)
                };

                let ack_rate = {
                    let ack_elapsed = if adjusted_ack_time > last.adjusted_ack_time {
                        adjusted_ack_time.saturating_duration_since(last.adjusted_ack_time)
                    } else {
                        time_now.saturating_duration_since(last.ack_time)
                    };
                    let bytes_acked_between =
                        total_bytes_acked_now.saturating_sub(last.total_bytes_acked);
                    Bandwidth::from_delivered(bytes_acked_between, ack_elapsed)
                };

                match (send_rate, ack_rate) {
                    (Some(s), Some(a)) => Some(s.min(a)),
                    (Some(s), None) => Some(s),
                    (None, Some(a)) => Some(a),
                    (None, None) => None,
                }
            }
            None if time_now > packet.sent_time => {
                let elapsed = time_now.saturating_duration_since(packet.sent_time);
                Bandwidth::from_delivered(total_bytes_acked_now, elapsed)
            }
            None => None,
        };

        let Some(delivery_rate) = delivery_rate else {
            return;
        };

        let current_max = self.get_bandwidth();
        if delivery_rate >= current_max || !packet.is_app_limited {
            self.windowed_max.update(delivery_rate, round_trip_counter);
        }
    }
}
