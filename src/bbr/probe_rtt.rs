// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! ProbeRTT sub-state: a 200 ms window, held open until it has also spanned
//! one full round trip.
//!
//! Grounded on `original_source/src/core/bbr.c`'s
//! `BbrCongestionControlHandleAckInProbeRtt`. The teacher's
//! `recovery::bbr::probe_rtt` implements the same two-condition exit
//! (duration elapsed *and* a round-trip sample taken) that this module
//! keeps.

use crate::time::Timestamp;
use core::time::Duration;

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#4.3.4
//# BBRProbeRTTDuration = 200 ms
pub const PROBE_RTT_DURATION: Duration = Duration::from_millis(200);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeRttOutcome {
    Continue,
    Exit,
}

/// The ProbeRTT exit timer (`probe_rtt_end_time`) and the round it armed in
/// (`probe_rtt_round`), both modeled as `Option` rather than a separate
/// `_valid` flag per field.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProbeRttState {
    end_time: Option<Timestamp>,
    round: Option<u64>,
}

impl ProbeRttState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Resets both timers on entry into ProbeRTT.
    pub fn enter(&mut self) {
        *self = Self::default();
    }

    /// Handles one ack while in ProbeRTT.
    ///
    /// `new_round` must be true exactly when the caller just incremented
    /// `round_trip_counter` for this ack.
    pub fn on_ack(
        &mut self,
        bytes_in_flight: u32,
        min_cwnd_plus_mss: u32,
        ack_time: Timestamp,
        round_trip_counter: u64,
        new_round: bool,
    ) -> ProbeRttOutcome {
        if self.end_time.is_none() {
            if bytes_in_flight < min_cwnd_plus_mss {
                self.end_time = Some(ack_time + PROBE_RTT_DURATION);
                self.round = None;
            }
            return ProbeRttOutcome::Continue;
        }

        if self.round.is_none() && new_round {
            self.round = Some(round_trip_counter);
        }

        match (self.end_time, self.round) {
            (Some(end_time), Some(_)) if end_time <= ack_time => ProbeRttOutcome::Exit,
            _ => ProbeRttOutcome::Continue,
        }
    }
}
