// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Startup bandwidth-plateau detection.
//!
//! Grounded on `original_source/src/core/bbr.c`'s
//! `BbrCongestionControlHandleAckInStartup`, which is the classic BBRv1
//! "three non-growing rounds declares the pipe full" rule. The teacher's
//! `recovery::bbr::full_pipe` detects the same plateau but additionally
//! exits on loss/ECN signals that this algorithm does not use.

use crate::bbr::{bandwidth::Bandwidth, gain};

/// Tracks whether the bottleneck bandwidth has been found (i.e. Startup
/// should exit to Drain) by watching for three consecutive rounds that fail
/// to grow the delivery-rate estimate by `STARTUP_GROWTH_TARGET`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StartupDetector {
    btlbw_found: bool,
    last_estimated_startup_bandwidth: Bandwidth,
    slow_startup_round_counter: u32,
}

impl StartupDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn btlbw_found(&self) -> bool {
        self.btlbw_found
    }

    /// Evaluates one new round's bandwidth sample. Callers must only invoke
    /// this once per new round, and only while `!btlbw_found()`.
    pub fn on_new_round(&mut self, current_bw: Bandwidth, is_largest_acked_packet_app_limited: bool) {
        debug_assert!(!self.btlbw_found);

        if is_largest_acked_packet_app_limited {
            return;
        }

        let target = self
            .last_estimated_startup_bandwidth
            .scale(gain::STARTUP_GROWTH_TARGET);

        if current_bw >= target {
            self.last_estimated_startup_bandwidth = current_bw;
            self.slow_startup_round_counter = 0;
        } else {
            self.slow_startup_round_counter += 1;
            if self.slow_startup_round_counter >= gain::STARTUP_SLOW_GROW_ROUND_LIMIT {
                self.btlbw_found = true;
            }
        }
    }
}
