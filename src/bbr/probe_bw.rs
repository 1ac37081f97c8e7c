// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! ProbeBW gain-cycle state.
//!
//! Grounded on `original_source/src/core/bbr.c`'s
//! `BbrCongestionControlTransitToProbeBw` and
//! `BbrCongestionControlAdvanceCyclePhase`. The teacher's
//! `recovery::bbr::probe_bw` implements BBRv2's DOWN/CRUISE/REFILL/UP
//! sub-phases instead of this algorithm's classic 8-phase `[5/4, 3/4, 1, 1,
//! 1, 1, 1, 1]` cycle, so only the module's *name* and its dependency on an
//! injected `Generator` for decorrelation are carried over; the cycling
//! logic itself follows the original.

use crate::bbr::gain::{self, Gain};
use crate::random::Generator;
use crate::time::Timestamp;
use core::time::Duration;

/// The pacing-gain cycle index and the timestamp the current phase began.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProbeBwCycle {
    pacing_cycle_index: u8,
    cycle_start: Option<Timestamp>,
}

impl ProbeBwCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn pacing_cycle_index(&self) -> u8 {
        self.pacing_cycle_index
    }

    pub fn pacing_gain(&self) -> Gain {
        gain::GAIN_CYCLE[self.pacing_cycle_index as usize]
    }

    /// Enters ProbeBW, drawing a random phase that is never the drain phase
    /// (index 1) so a fresh entry never immediately throttles the sender.
    pub fn enter(&mut self, now: Timestamp, random: &mut dyn Generator) {
        let r = random.gen_u32();
        let index = ((r % 7) + 2) % gain::CYCLE_LENGTH as u32;
        debug_assert_ne!(index as u8, gain::DRAIN_CYCLE_PHASE);
        self.pacing_cycle_index = index as u8;
        self.cycle_start = Some(now);
    }

    /// Decides whether the cycle should advance to its next phase.
    ///
    /// `target_at_current_gain`/`target_at_unit_gain` are `target_cwnd`
    /// evaluated at the current pacing gain and at `Gain::UNIT`
    /// respectively, computed by the caller (the target-cwnd formula lives
    /// on the controller, not here).
    #[allow(clippy::too_many_arguments)]
    pub fn should_advance(
        &self,
        now: Timestamp,
        min_rtt: Option<Duration>,
        has_loss: bool,
        prev_inflight: u32,
        target_at_current_gain: u32,
        target_at_unit_gain: u32,
        bytes_in_flight: u32,
    ) -> bool {
        let (Some(cycle_start), Some(min_rtt)) = (self.cycle_start, min_rtt) else {
            return false;
        };

        let elapsed = now.saturating_duration_since(cycle_start);
        let mut should_advance = elapsed > min_rtt;

        let pacing_gain = self.pacing_gain();
        if pacing_gain > Gain::UNIT && !has_loss && prev_inflight < target_at_current_gain {
            should_advance = false;
        }
        if pacing_gain < Gain::UNIT && bytes_in_flight <= target_at_unit_gain {
            should_advance = true;
        }

        should_advance
    }

    pub fn advance(&mut self, now: Timestamp) {
        self.pacing_cycle_index = (self.pacing_cycle_index + 1) % gain::CYCLE_LENGTH;
        self.cycle_start = Some(now);
    }
}
