// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Loss-recovery sub-machine (C6): `NotRecovery` / `Conservative` / `Growth`.
//!
//! Grounded on `original_source/src/core/bbr.c`'s `BbrCongestionControlOnCongestionEvent`
//! / `BbrCongestionControlOnAckAcknowledged`'s recovery-window maintenance.
//! Shaped like the teacher's `recovery::bbr::recovery` module (a small state
//! enum plus a standalone `recovery_window`), but the state transitions and
//! window arithmetic follow the original's BBRv1-style recovery rather than
//! the teacher's BBRv2 recovery (which additionally distinguishes a "medium"
//! deflation phase this algorithm doesn't have).

use crate::bbr::PacketNumber;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "generator", derive(bolero_generator::TypeGenerator))]
pub enum RecoveryState {
    #[default]
    NotRecovery,
    Conservative,
    Growth,
}

/// The recovery sub-machine and its `recovery_window`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Recovery {
    state: RecoveryState,
    recovery_window: u32,
    end_of_recovery: Option<PacketNumber>,
}

impl Recovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a fresh `Recovery` with the given `recovery_window`. The
    /// source initializes `recovery_window` to a constant default even
    /// though it is only read while in recovery; kept here for fidelity.
    pub fn with_default_window(recovery_window: u32) -> Self {
        Self {
            recovery_window,
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    pub fn is_in_recovery(&self) -> bool {
        self.state != RecoveryState::NotRecovery
    }

    pub fn recovery_window(&self) -> u32 {
        self.recovery_window
    }

    /// Applies a loss event: enters recovery if not already in it, then
    /// deflates (or, on persistent congestion, resets) `recovery_window`.
    ///
    /// Returns the packet number the caller should pin `end_of_round_trip`
    /// to, if recovery was just entered (forcing a new-round detection on
    /// the very next ack).
    pub fn on_loss(
        &mut self,
        lost_bytes: u32,
        persistent_congestion: bool,
        bytes_in_flight: u32,
        min_cwnd: u32,
        largest_sent_packet_number: PacketNumber,
    ) -> Option<PacketNumber> {
        let mut round_pin = None;

        if !self.is_in_recovery() {
            self.state = RecoveryState::Conservative;
            self.recovery_window = bytes_in_flight.max(min_cwnd);
            self.end_of_recovery = Some(largest_sent_packet_number);
            round_pin = Some(largest_sent_packet_number);
        }

        if persistent_congestion {
            self.recovery_window = min_cwnd;
        } else {
            self.recovery_window = self.recovery_window.saturating_sub(lost_bytes).max(min_cwnd);
        }

        round_pin
    }

    /// Applies an ack while in recovery: grows `recovery_window` in `Growth`,
    /// then floors it at `bytes_in_flight + acked_bytes` and `min_cwnd`.
    /// No-op outside recovery.
    pub fn on_ack(&mut self, acked_bytes: u32, bytes_in_flight: u32, min_cwnd: u32) {
        if !self.is_in_recovery() {
            return;
        }

        if self.state == RecoveryState::Growth {
            self.recovery_window = self.recovery_window.saturating_add(acked_bytes);
        }

        self.recovery_window = self
            .recovery_window
            .max(bytes_in_flight.saturating_add(acked_bytes))
            .max(min_cwnd);
    }

    /// Promotes `Conservative` to `Growth` on the first new round inside recovery.
    pub fn on_new_round(&mut self) {
        if self.state == RecoveryState::Conservative {
            self.state = RecoveryState::Growth;
        }
    }

    /// Exits recovery if the ack carries no loss and has moved past the
    /// packet that triggered entry. Returns whether an exit just happened.
    pub fn maybe_exit(&mut self, has_loss: bool, largest_ack: PacketNumber) -> bool {
        if !self.is_in_recovery() || has_loss {
            return false;
        }

        match self.end_of_recovery {
            Some(end) if end < largest_ack => {
                self.state = RecoveryState::NotRecovery;
                self.end_of_recovery = None;
                self.recovery_window = 0;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN_CWND: u32 = 4 * 1200;

    #[test]
    fn loss_while_not_in_recovery_enters_conservative() {
        let mut recovery = Recovery::new();
        let pin = recovery.on_loss(1000, false, 50_000, MIN_CWND, 42);
        assert_eq!(RecoveryState::Conservative, recovery.state());
        assert_eq!(Some(42), pin);
        assert_eq!(50_000, recovery.recovery_window());
    }

    #[test]
    fn persistent_congestion_resets_window_to_min_cwnd() {
        let mut recovery = Recovery::new();
        recovery.on_loss(1000, false, 50_000, MIN_CWND, 42);
        recovery.on_loss(1000, true, 50_000, MIN_CWND, 43);
        assert_eq!(MIN_CWND, recovery.recovery_window());
    }

    #[test]
    fn deflation_never_drops_below_min_cwnd() {
        let mut recovery = Recovery::new();
        recovery.on_loss(1000, false, MIN_CWND + 100, MIN_CWND, 1);
        recovery.on_loss(10_000_000, false, MIN_CWND + 100, MIN_CWND, 2);
        assert_eq!(MIN_CWND, recovery.recovery_window());
    }

    #[test]
    fn subsequent_loss_while_already_in_recovery_does_not_re_enter() {
        let mut recovery = Recovery::new();
        recovery.on_loss(1000, false, 50_000, MIN_CWND, 1);
        let pin = recovery.on_loss(500, false, 49_000, MIN_CWND, 2);
        assert_eq!(None, pin);
    }

    #[test]
    fn promotion_from_conservative_to_growth_on_new_round() {
        let mut recovery = Recovery::new();
        recovery.on_loss(1000, false, 50_000, MIN_CWND, 1);
        recovery.on_new_round();
        assert_eq!(RecoveryState::Growth, recovery.state());
    }

    #[test]
    fn growth_recovery_window_grows_by_acked_bytes() {
        let mut recovery = Recovery::new();
        recovery.on_loss(1000, false, 50_000, MIN_CWND, 1);
        recovery.on_new_round();
        recovery.on_ack(1200, 10_000, MIN_CWND);
        assert_eq!(51_200, recovery.recovery_window());
    }

    #[test]
    fn conservative_recovery_window_does_not_grow_from_acks() {
        let mut recovery = Recovery::new();
        recovery.on_loss(1000, false, 50_000, MIN_CWND, 1);
        recovery.on_ack(1200, 10_000, MIN_CWND);
        assert_eq!(50_000, recovery.recovery_window());
    }

    #[test]
    fn exit_requires_no_loss_and_largest_ack_past_end_of_recovery() {
        let mut recovery = Recovery::new();
        recovery.on_loss(1000, false, 50_000, MIN_CWND, 42);

        assert!(!recovery.maybe_exit(false, 42));
        assert!(!recovery.maybe_exit(true, 43));
        assert!(recovery.maybe_exit(false, 43));
        assert_eq!(RecoveryState::NotRecovery, recovery.state());
    }
}
