// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A reduced operation-sequence property model checking the universal
//! invariants I1-I4 hold after every external event, for arbitrary
//! `bolero`-generated sequences of sends, acks, losses and time advances.
//!
//! Grounded on the teacher's `recovery::congestion_controller::fuzz_target`
//! `Operation` enum and `Model`, reduced to the events this crate's contract
//! actually exposes (no ECN, no MTU updates, a single congestion controller
//! rather than a choice of implementations).

use super::*;
use crate::{
    event::NoOpPublisher, random::testing::Deterministic, settings::Settings, time::Timestamp,
};
use bolero::TypeGenerator;
use core::time::Duration;

#[derive(Clone, Copy, Debug, TypeGenerator)]
enum Operation {
    SendData {
        #[generator(1..=9_000)]
        bytes: u16,
    },
    Ack {
        #[generator(1..=9_000)]
        bytes: u16,
        #[generator(1..=500)]
        rtt_millis: u16,
        has_loss: bool,
        app_limited: bool,
    },
    Lost {
        #[generator(1..=9_000)]
        bytes: u16,
        persistent_congestion: bool,
    },
    AdvanceTime {
        #[generator(1..=2_000)]
        millis: u16,
    },
}

struct Model {
    bbr: BbrCongestionController,
    random: Deterministic,
    now: Timestamp,
    next_packet_number: PacketNumber,
    outstanding: u32,
    total_sent: u64,
    total_acked: u64,
    last_acked: Option<bandwidth::LastAckedInfo>,
}

const MSS: u16 = 1200;

impl Model {
    fn new() -> Self {
        Self {
            bbr: BbrCongestionController::new(Settings {
                initial_window_packets: 10,
                max_datagram_size: MSS,
                pacing_enabled: true,
                net_stats_event_enabled: false,
            }),
            random: Deterministic { seed: 11 },
            now: Timestamp::from_micros(1),
            next_packet_number: 1,
            outstanding: 0,
            total_sent: 0,
            total_acked: 0,
            last_acked: None,
        }
    }

    fn min_cwnd(&self) -> u32 {
        4 * MSS as u32
    }

    fn apply(&mut self, op: &Operation) {
        match *op {
            Operation::SendData { bytes } => self.on_send(bytes as u32),
            Operation::Ack {
                bytes,
                rtt_millis,
                has_loss,
                app_limited,
            } => self.on_ack(bytes as u32, Duration::from_millis(rtt_millis as u64), has_loss, app_limited),
            Operation::Lost {
                bytes,
                persistent_congestion,
            } => self.on_lost(bytes as u32, persistent_congestion),
            Operation::AdvanceTime { millis } => {
                self.now = self.now + Duration::from_millis(millis as u64);
            }
        }

        self.check_invariants();
    }

    fn on_send(&mut self, bytes: u32) {
        self.bbr.on_data_sent(bytes);
        self.outstanding = self.outstanding.saturating_add(bytes);
        self.total_sent += bytes as u64;
    }

    fn on_ack(&mut self, bytes: u32, rtt: Duration, has_loss: bool, app_limited: bool) {
        let bytes = bytes.min(self.outstanding);
        if bytes == 0 {
            return;
        }
        self.outstanding -= bytes;
        self.total_acked += bytes as u64;

        let sent_time = self.now;
        self.now = self.now + rtt;
        let packet_number = self.next_packet_number;
        self.next_packet_number += 1;

        let packet = PacketInfo {
            packet_length: bytes,
            sent_time,
            total_bytes_sent_at_send: self.total_sent,
            last_acked_info: self.last_acked,
            is_app_limited: app_limited,
        };
        let acked = [packet];

        let ack = AckEvent {
            time_now: self.now,
            largest_ack: packet_number,
            largest_sent_packet_number: packet_number,
            adjusted_ack_time: self.now,
            num_retransmittable_bytes: bytes,
            num_total_acked_retransmittable_bytes: self.total_acked,
            min_rtt_sample: Some(rtt),
            has_loss,
            is_implicit: false,
            is_largest_acked_packet_app_limited: app_limited,
            acked_packets: &acked,
            smoothed_rtt: rtt,
            posted_bytes: 0,
            ideal_bytes: 0,
        };

        self.last_acked = Some(bandwidth::LastAckedInfo {
            sent_time,
            ack_time: self.now,
            adjusted_ack_time: self.now,
            total_bytes_sent: self.total_sent,
            total_bytes_acked: self.total_acked,
        });

        self.bbr
            .on_data_acknowledged(&ack, &mut self.random, &mut NoOpPublisher);
    }

    fn on_lost(&mut self, bytes: u32, persistent_congestion: bool) {
        let bytes = bytes.min(self.outstanding);
        if bytes == 0 {
            return;
        }
        self.outstanding -= bytes;
        let largest_sent_packet_number = self.next_packet_number;

        let loss = LossEvent {
            lost_bytes: bytes,
            largest_sent_packet_number,
            persistent_congestion,
        };
        self.bbr.on_data_lost(&loss, &mut NoOpPublisher);
    }

    fn check_invariants(&self) {
        // I1
        assert!(
            self.bbr.get_congestion_window() >= self.min_cwnd(),
            "I1 violated: {} < {}",
            self.bbr.get_congestion_window(),
            self.min_cwnd()
        );

        // I3
        if self.bbr.state() == BbrState::ProbeRtt {
            assert_eq!(self.min_cwnd(), self.bbr.get_congestion_window(), "I3 violated");
        }

        // I4
        if self.bbr.recovery.is_in_recovery() {
            assert!(
                self.bbr.get_congestion_window() <= self.bbr.cwnd,
                "I4 violated"
            );
        }
    }
}

#[test]
fn i1_i3_i4_hold_over_arbitrary_event_sequences() {
    bolero::check!()
        .with_type::<std::vec::Vec<Operation>>()
        .for_each(|ops| {
            let mut model = Model::new();
            for op in ops {
                model.apply(op);
            }
        });
}
