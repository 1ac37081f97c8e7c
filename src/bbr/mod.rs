// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A congestion controller implementing "Bottleneck Bandwidth and
//! Round-trip propagation time" (BBR), following the classic
//! Startup → Drain → ProbeBW ↔ ProbeRTT state machine of
//! `draft-cardwell-iccrg-bbr-congestion-control`.
//!
//! The shape of this module (a top-level controller delegating to a
//! bandwidth filter, a min-RTT tracker, a recovery sub-machine and a
//! gain-cycling ProbeBW sub-state) is grounded on the teacher's
//! `recovery::bbr::BbrCongestionController`; the control-flow and formulas
//! themselves follow `original_source/src/core/bbr.c`, which implements
//! this earlier, simpler BBRv1 algorithm rather than the teacher's BBRv2.

pub mod ack_aggregation;
pub mod bandwidth;
pub mod gain;
pub mod min_rtt;
pub mod pacing;
pub mod probe_bw;
pub mod probe_rtt;
pub mod recovery;
pub mod sliding_window;
pub mod startup;

#[cfg(test)]
mod model;

use crate::{
    event::{NetworkStatistics, Publisher},
    random::Generator,
    settings::Settings,
    time::Timestamp,
};
use bandwidth::{Bandwidth, PacketInfo};
use core::time::Duration;
use gain::Gain;
use probe_rtt::ProbeRttOutcome;

/// A packet number, opaque to BBR beyond ordering.
pub type PacketNumber = u64;

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#2.3
//# The dynamic BDP multiplier used to size the congestion window
const QUANTA_FACTOR: u32 = 3;

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#4.1
//# BBR.state transitions through these four phases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "generator", derive(bolero_generator::TypeGenerator))]
pub enum BbrState {
    #[default]
    Startup,
    Drain,
    ProbeBw,
    ProbeRtt,
}

/// One packet acknowledged by an ack event, as handed to the bandwidth filter.
pub type AckedPacket = PacketInfo;

/// The non-implicit ack-processing inputs, supplied by the enclosing
/// connection's loss-detection layer.
pub struct AckEvent<'a> {
    pub time_now: Timestamp,
    pub largest_ack: PacketNumber,
    pub largest_sent_packet_number: PacketNumber,
    pub adjusted_ack_time: Timestamp,
    pub num_retransmittable_bytes: u32,
    pub num_total_acked_retransmittable_bytes: u64,
    pub min_rtt_sample: Option<Duration>,
    pub has_loss: bool,
    pub is_implicit: bool,
    pub is_largest_acked_packet_app_limited: bool,
    pub acked_packets: &'a [AckedPacket],
    /// Ambient values the connection owns but BBR doesn't: forwarded
    /// verbatim into `NETWORK_STATISTICS` when that reporting is enabled.
    pub smoothed_rtt: Duration,
    pub posted_bytes: u64,
    pub ideal_bytes: u64,
}

/// A loss event, supplied by the enclosing connection's loss-detection layer.
pub struct LossEvent {
    pub lost_bytes: u32,
    pub largest_sent_packet_number: PacketNumber,
    pub persistent_congestion: bool,
}

/// A BBR congestion controller for a single QUIC connection's path.
#[derive(Clone, Debug)]
pub struct BbrCongestionController {
    state: BbrState,
    recovery: recovery::Recovery,
    cwnd: u32,
    initial_cwnd: u32,
    bytes_in_flight: u32,
    bytes_in_flight_max: u32,
    exemptions: u8,
    pacing_gain: Gain,
    cwnd_gain: Gain,
    send_quantum: u32,
    min_rtt: min_rtt::MinRttTracker,
    round_trip_counter: u64,
    end_of_round_trip: Option<PacketNumber>,
    probe_bw_cycle: probe_bw::ProbeBwCycle,
    startup: startup::StartupDetector,
    exiting_quiescence: bool,
    probe_rtt: probe_rtt::ProbeRttState,
    ack_aggregation: ack_aggregation::AckAggregationFilter,
    bandwidth: bandwidth::Estimator,
    max_datagram_size: u16,
    settings: Settings,
}

impl BbrCongestionController {
    /// Constructs a fresh controller (the `Initialize` operation).
    pub fn new(settings: Settings) -> Self {
        let max_datagram_size = settings.max_datagram_size;
        let min_cwnd = 4 * max_datagram_size as u32;
        let initial_cwnd = settings
            .initial_window_packets
            .saturating_mul(max_datagram_size as u32)
            .max(min_cwnd);
        let default_recovery_cwnd = 2000u32.saturating_mul(max_datagram_size as u32);

        Self {
            state: BbrState::default(),
            recovery: recovery::Recovery::with_default_window(default_recovery_cwnd),
            cwnd: initial_cwnd,
            initial_cwnd,
            bytes_in_flight: 0,
            bytes_in_flight_max: 0,
            exemptions: 0,
            pacing_gain: gain::HIGH_GAIN,
            cwnd_gain: gain::HIGH_GAIN,
            send_quantum: max_datagram_size as u32,
            min_rtt: min_rtt::MinRttTracker::new(),
            round_trip_counter: 0,
            end_of_round_trip: None,
            probe_bw_cycle: probe_bw::ProbeBwCycle::new(),
            startup: startup::StartupDetector::new(),
            exiting_quiescence: false,
            probe_rtt: probe_rtt::ProbeRttState::new(),
            ack_aggregation: ack_aggregation::AckAggregationFilter::new(),
            bandwidth: bandwidth::Estimator::new(),
            max_datagram_size,
            settings,
        }
    }

    #[inline]
    fn min_cwnd(&self) -> u32 {
        4 * self.max_datagram_size as u32
    }

    pub fn state(&self) -> BbrState {
        self.state
    }

    pub fn bytes_in_flight(&self) -> u32 {
        self.bytes_in_flight
    }

    /// `GetBytesInFlightMax`: the high-water mark of `bytes_in_flight`.
    pub fn bytes_in_flight_max(&self) -> u32 {
        self.bytes_in_flight_max
    }

    pub fn is_app_limited(&self) -> bool {
        self.bandwidth.is_app_limited()
    }

    pub fn can_send(&self) -> bool {
        self.bytes_in_flight < self.get_congestion_window() || self.exemptions > 0
    }

    pub fn set_exemption(&mut self, n: u8) {
        self.exemptions = n;
    }

    pub fn get_congestion_window(&self) -> u32 {
        if self.state == BbrState::ProbeRtt {
            return self.min_cwnd();
        }
        if self.recovery.is_in_recovery() {
            return self.cwnd.min(self.recovery.recovery_window());
        }
        self.cwnd
    }

    pub fn get_send_allowance(&self, time_since_last_send: Option<Duration>) -> u32 {
        pacing::get_send_allowance(
            self.get_congestion_window(),
            self.bytes_in_flight,
            self.bandwidth.get_bandwidth(),
            self.pacing_gain,
            self.min_rtt.min_rtt(),
            time_since_last_send,
            self.settings.pacing_enabled,
            self.state == BbrState::Startup,
        )
    }

    pub fn on_data_sent(&mut self, n: u32) {
        let was_quiescent = self.bytes_in_flight == 0;
        self.bytes_in_flight = self.bytes_in_flight.saturating_add(n);
        self.bytes_in_flight_max = self.bytes_in_flight_max.max(self.bytes_in_flight);

        if was_quiescent && self.is_app_limited() {
            self.exiting_quiescence = true;
        }

        self.exemptions = self.exemptions.saturating_sub(1);
    }

    /// Precondition: `bytes_in_flight >= n`.
    pub fn on_data_invalidated(&mut self, n: u32) -> bool {
        debug_assert!(self.bytes_in_flight >= n);
        let previous_can_send = self.can_send();
        self.bytes_in_flight = self.bytes_in_flight.saturating_sub(n);
        !previous_can_send && self.can_send()
    }

    /// The central event. Returns `true` if the connection transitioned
    /// from blocked to unblocked.
    pub fn on_data_acknowledged<P: Publisher>(
        &mut self,
        ack: &AckEvent<'_>,
        random: &mut dyn Generator,
        publisher: &mut P,
    ) -> bool {
        let previous_can_send = self.can_send();

        if ack.is_implicit {
            // An implicit ack (packet-number-space discard) has no single
            // packet's send/ack timestamps to work from, and the bytes it
            // covers were already folded into `bytes_in_flight` elsewhere;
            // only the cwnd update and blocked-state report run.
            self.update_cwnd(
                ack.num_retransmittable_bytes,
                ack.num_total_acked_retransmittable_bytes,
            );

            if self.settings.net_stats_event_enabled {
                publisher.on_network_statistics(NetworkStatistics {
                    bytes_in_flight: self.bytes_in_flight,
                    posted_bytes: ack.posted_bytes,
                    ideal_bytes: ack.ideal_bytes,
                    smoothed_rtt_micros: ack.smoothed_rtt.as_micros() as u64,
                    congestion_window: self.get_congestion_window(),
                    bandwidth_bytes_per_second: self.bandwidth.get_bandwidth().as_bytes_per_second(),
                });
            }

            return !previous_can_send && self.can_send();
        }

        // 1. previous_can_send already captured; subtract the newly acked bytes.
        let prev_inflight = self.bytes_in_flight;
        self.bytes_in_flight = self
            .bytes_in_flight
            .saturating_sub(ack.num_retransmittable_bytes);

        // 2. Min-RTT update (C5).
        let rtt_sample_expired = match ack.min_rtt_sample {
            Some(rtt) => self.min_rtt.on_rtt_sample(rtt, ack.time_now),
            None => false,
        };

        // 3. Round tracking.
        let new_round = self
            .end_of_round_trip
            .is_none_or(|end| end < ack.largest_ack);
        if new_round {
            self.round_trip_counter += 1;
            self.end_of_round_trip = Some(ack.largest_sent_packet_number);
        }

        // 4. Bandwidth filter update (C2).
        self.bandwidth.on_ack_event_start(ack.largest_ack);
        for packet in ack.acked_packets {
            self.bandwidth.on_acked_packet(
                packet,
                ack.time_now,
                ack.adjusted_ack_time,
                ack.num_total_acked_retransmittable_bytes,
                self.round_trip_counter,
            );
        }

        // 5. Recovery bookkeeping (C6).
        if self.recovery.is_in_recovery() {
            if new_round {
                self.recovery.on_new_round();
            }
            if self.recovery.maybe_exit(ack.has_loss, ack.largest_ack) {
                publisher.on_recovery_complete();
            } else {
                self.recovery
                    .on_ack(ack.num_retransmittable_bytes, self.bytes_in_flight, self.min_cwnd());
            }
        }

        // 6. Ack-aggregation update (C3).
        let bw = self.bandwidth.get_bandwidth();
        self.ack_aggregation.on_ack(
            bw,
            ack.num_retransmittable_bytes as u64,
            ack.time_now,
            self.round_trip_counter,
        );

        // 7. ProbeBW gain cycling.
        if self.state == BbrState::ProbeBw {
            let target_at_current_gain = self.target_cwnd(self.pacing_gain);
            let target_at_unit_gain = self.target_cwnd(Gain::UNIT);
            let should_advance = self.probe_bw_cycle.should_advance(
                ack.time_now,
                self.min_rtt.min_rtt(),
                ack.has_loss,
                prev_inflight,
                target_at_current_gain,
                target_at_unit_gain,
                self.bytes_in_flight,
            );
            if should_advance {
                self.probe_bw_cycle.advance(ack.time_now);
                self.pacing_gain = self.probe_bw_cycle.pacing_gain();
            }
        }

        // 8. Startup exit detection.
        if !self.startup.btlbw_found() && new_round {
            // Mirrors the original's `LastAckedPacketAppLimited = (AckedPackets
            // == NULL) ? FALSE : IsLargestAckedPacketAppLimited`: an ack with no
            // acked-packet detail never counts as an app-limited round.
            let is_largest_acked_packet_app_limited =
                !ack.acked_packets.is_empty() && ack.is_largest_acked_packet_app_limited;
            self.startup
                .on_new_round(bw, is_largest_acked_packet_app_limited);
        }

        // 9. Phase transitions.
        if self.state == BbrState::Startup && self.startup.btlbw_found() {
            self.transition_to_drain(publisher);
        }
        if self.state == BbrState::Drain && self.bytes_in_flight <= self.target_cwnd(Gain::UNIT) {
            self.transit_to_probe_bw(ack.time_now, random, publisher);
        }
        if self.state != BbrState::ProbeRtt && !self.exiting_quiescence && rtt_sample_expired {
            self.transition_to_probe_rtt(ack.largest_sent_packet_number, publisher);
        }
        self.exiting_quiescence = false;

        // 10. ProbeRTT handling.
        if self.state == BbrState::ProbeRtt {
            self.bandwidth.set_app_limited(ack.largest_sent_packet_number);
            let min_cwnd_plus_mss = self.min_cwnd().saturating_add(self.max_datagram_size as u32);
            let outcome = self.probe_rtt.on_ack(
                self.bytes_in_flight,
                min_cwnd_plus_mss,
                ack.time_now,
                self.round_trip_counter,
                new_round,
            );
            if outcome == ProbeRttOutcome::Exit {
                self.exit_probe_rtt(ack.time_now, random, publisher);
            }
        }

        // 11. Cwnd update.
        self.update_cwnd(
            ack.num_retransmittable_bytes,
            ack.num_total_acked_retransmittable_bytes,
        );

        if self.settings.net_stats_event_enabled {
            publisher.on_network_statistics(NetworkStatistics {
                bytes_in_flight: self.bytes_in_flight,
                posted_bytes: ack.posted_bytes,
                ideal_bytes: ack.ideal_bytes,
                smoothed_rtt_micros: ack.smoothed_rtt.as_micros() as u64,
                congestion_window: self.get_congestion_window(),
                bandwidth_bytes_per_second: self.bandwidth.get_bandwidth().as_bytes_per_second(),
            });
        }

        publisher.on_pacing_rate_updated(
            self.bandwidth.get_bandwidth().scale(self.pacing_gain),
            self.send_quantum,
            self.pacing_gain,
        );

        !previous_can_send && self.can_send()
    }

    pub fn on_data_lost<P: Publisher>(&mut self, loss: &LossEvent, publisher: &mut P) {
        let was_in_recovery = self.recovery.is_in_recovery();

        let round_pin = self.recovery.on_loss(
            loss.lost_bytes,
            loss.persistent_congestion,
            self.bytes_in_flight,
            self.min_cwnd(),
            loss.largest_sent_packet_number,
        );
        if let Some(largest_sent) = round_pin {
            self.end_of_round_trip = Some(largest_sent);
        }

        if !was_in_recovery {
            publisher.on_congestion_event(self.recovery.recovery_window());
        }
        if loss.persistent_congestion {
            publisher.on_persistent_congestion(self.recovery.recovery_window());
        }
    }

    /// No action; spurious congestion signals are not acted on by this
    /// algorithm.
    pub fn on_spurious_congestion_event(&mut self) -> bool {
        false
    }

    pub fn set_app_limited(&mut self, largest_sent_packet_number: PacketNumber) {
        if self.bytes_in_flight <= self.cwnd {
            self.bandwidth.set_app_limited(largest_sent_packet_number);
        }
    }

    /// Re-establishes initial state. `full` additionally zeroes `bytes_in_flight`.
    pub fn reset(&mut self, full: bool) {
        let bytes_in_flight = if full { 0 } else { self.bytes_in_flight };
        let bytes_in_flight_max = if full { 0 } else { self.bytes_in_flight_max };
        *self = Self::new(self.settings);
        self.bytes_in_flight = bytes_in_flight;
        self.bytes_in_flight_max = bytes_in_flight_max;
    }

    /// `target_cwnd(gain) = floor(bdp * gain / GAIN_UNIT) + quanta_factor * send_quantum`,
    /// falling back to `gain * initial_cwnd / GAIN_UNIT` while the bandwidth
    /// filter or min-RTT tracker have no sample yet (B1).
    fn target_cwnd(&self, gain: Gain) -> u32 {
        let bw = self.bandwidth.get_bandwidth();
        let min_rtt = self.min_rtt.min_rtt();

        let Some(rtt) = min_rtt.filter(|_| bw != Bandwidth::ZERO) else {
            return gain.scale_u32(self.initial_cwnd);
        };

        let bdp = bw.bytes_over(rtt);
        let scaled = gain.scale_u64(bdp);
        let quanta = (QUANTA_FACTOR as u64).saturating_mul(self.send_quantum as u64);
        scaled.saturating_add(quanta).min(u32::MAX as u64) as u32
    }

    fn update_send_quantum(&mut self) {
        self.send_quantum =
            pacing::compute_send_quantum(self.bandwidth.get_bandwidth(), self.pacing_gain, self.max_datagram_size);
    }

    fn update_cwnd(&mut self, acked_bytes: u32, total_bytes_acked: u64) {
        if self.state == BbrState::ProbeRtt {
            return;
        }

        self.update_send_quantum();

        let mut target = self.target_cwnd(self.cwnd_gain);
        if self.startup.btlbw_found() {
            let max_ack_height = self.ack_aggregation.max_ack_height().min(u32::MAX as u64) as u32;
            target = target.saturating_add(max_ack_height);
        }

        if self.startup.btlbw_found() {
            self.cwnd = target.min(self.cwnd.saturating_add(acked_bytes));
        } else if self.cwnd < target || total_bytes_acked < self.initial_cwnd as u64 {
            self.cwnd = self.cwnd.saturating_add(acked_bytes);
        }

        self.cwnd = self.cwnd.max(self.min_cwnd());
    }

    fn transition_to_drain<P: Publisher>(&mut self, publisher: &mut P) {
        debug_assert_eq!(self.state, BbrState::Startup);
        self.state = BbrState::Drain;
        self.pacing_gain = gain::DRAIN_GAIN;
        self.cwnd_gain = gain::HIGH_GAIN;
        publisher.on_bbr_state_changed(self.state);
    }

    fn transit_to_probe_bw<P: Publisher>(
        &mut self,
        now: Timestamp,
        random: &mut dyn Generator,
        publisher: &mut P,
    ) {
        debug_assert!(matches!(self.state, BbrState::Drain | BbrState::ProbeRtt));
        self.state = BbrState::ProbeBw;
        self.cwnd_gain = gain::CWND_GAIN;
        self.probe_bw_cycle.enter(now, random);
        self.pacing_gain = self.probe_bw_cycle.pacing_gain();
        publisher.on_bbr_state_changed(self.state);
    }

    fn transition_to_probe_rtt<P: Publisher>(
        &mut self,
        largest_sent_packet_number: PacketNumber,
        publisher: &mut P,
    ) {
        self.state = BbrState::ProbeRtt;
        self.pacing_gain = Gain::UNIT;
        self.probe_rtt.enter();
        self.bandwidth.set_app_limited(largest_sent_packet_number);
        publisher.on_bbr_state_changed(self.state);
    }

    fn exit_probe_rtt<P: Publisher>(
        &mut self,
        now: Timestamp,
        random: &mut dyn Generator,
        publisher: &mut P,
    ) {
        debug_assert_eq!(self.state, BbrState::ProbeRtt);
        self.min_rtt.refresh_timestamp(now);

        if self.startup.btlbw_found() {
            self.transit_to_probe_bw(now, random, publisher);
        } else {
            self.state = BbrState::Startup;
            self.pacing_gain = gain::HIGH_GAIN;
            self.cwnd_gain = gain::HIGH_GAIN;
            publisher.on_bbr_state_changed(self.state);
        }
    }
}
