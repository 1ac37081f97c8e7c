// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Outbound reporting contract (§6 of the spec).
//!
//! BBR never branches on what a `Publisher` does with an event; these calls
//! are pure reporting, fired at the same points the original fires its
//! trace macros.

use crate::bbr::{bandwidth::Bandwidth, gain::Gain, BbrState};

/// A snapshot published on every non-implicit ack when
/// `Settings::net_stats_event_enabled` is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NetworkStatistics {
    pub bytes_in_flight: u32,
    pub posted_bytes: u64,
    pub ideal_bytes: u64,
    pub smoothed_rtt_micros: u64,
    pub congestion_window: u32,
    /// Estimated bandwidth in bytes/second (`get_bandwidth() / BW_UNIT`)
    pub bandwidth_bytes_per_second: u64,
}

pub trait Publisher {
    /// Invoked when recovery is entered
    fn on_congestion_event(&mut self, recovery_window: u32);
    /// Invoked when recovery is exited
    fn on_recovery_complete(&mut self);
    /// Invoked when a loss event reports persistent congestion
    fn on_persistent_congestion(&mut self, recovery_window: u32);
    /// Invoked whenever the BBR phase changes
    fn on_bbr_state_changed(&mut self, state: BbrState);
    /// Invoked whenever the pacing rate is recomputed
    fn on_pacing_rate_updated(&mut self, pacing_rate: Bandwidth, send_quantum: u32, gain: Gain);
    /// Invoked once per non-implicit ack when net-stats reporting is enabled
    fn on_network_statistics(&mut self, stats: NetworkStatistics);
}

/// A `Publisher` that discards every event; the default for callers that
/// don't need reporting.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpPublisher;

impl Publisher for NoOpPublisher {
    #[inline]
    fn on_congestion_event(&mut self, _recovery_window: u32) {}
    #[inline]
    fn on_recovery_complete(&mut self) {}
    #[inline]
    fn on_persistent_congestion(&mut self, _recovery_window: u32) {}
    #[inline]
    fn on_bbr_state_changed(&mut self, _state: BbrState) {}
    #[inline]
    fn on_pacing_rate_updated(&mut self, _pacing_rate: Bandwidth, _send_quantum: u32, _gain: Gain) {
    }
    #[inline]
    fn on_network_statistics(&mut self, _stats: NetworkStatistics) {}
}

#[cfg(feature = "tracing")]
mod tracing_publisher {
    use super::*;

    /// A `Publisher` that emits a `tracing` event for each callback, for
    /// callers that already wire `tracing` up to their own subscriber.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct TracingPublisher;

    impl Publisher for TracingPublisher {
        fn on_congestion_event(&mut self, recovery_window: u32) {
            tracing::trace!(recovery_window, "congestion_event");
        }

        fn on_recovery_complete(&mut self) {
            tracing::trace!("recovery_complete");
        }

        fn on_persistent_congestion(&mut self, recovery_window: u32) {
            tracing::trace!(recovery_window, "persistent_congestion");
        }

        fn on_bbr_state_changed(&mut self, state: BbrState) {
            tracing::trace!(?state, "bbr_state_changed");
        }

        fn on_pacing_rate_updated(&mut self, pacing_rate: Bandwidth, send_quantum: u32, gain: Gain) {
            tracing::trace!(
                bytes_per_second = pacing_rate.as_bytes_per_second(),
                send_quantum,
                gain = gain.as_raw(),
                "pacing_rate_updated"
            );
        }

        fn on_network_statistics(&mut self, stats: NetworkStatistics) {
            tracing::trace!(?stats, "network_statistics");
        }
    }
}

#[cfg(feature = "tracing")]
pub use tracing_publisher::TracingPublisher;

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum Event {
        CongestionEvent { recovery_window: u32 },
        RecoveryComplete,
        PersistentCongestion { recovery_window: u32 },
        BbrStateChanged(BbrState),
        PacingRateUpdated { send_quantum: u32 },
        NetworkStatistics(NetworkStatistics),
    }

    /// A `Publisher` that records every event it receives, for assertions in tests.
    #[derive(Clone, Debug, Default)]
    pub struct RecordingPublisher {
        pub events: std::vec::Vec<Event>,
    }

    impl Publisher for RecordingPublisher {
        fn on_congestion_event(&mut self, recovery_window: u32) {
            self.events.push(Event::CongestionEvent { recovery_window });
        }

        fn on_recovery_complete(&mut self) {
            self.events.push(Event::RecoveryComplete);
        }

        fn on_persistent_congestion(&mut self, recovery_window: u32) {
            self.events
                .push(Event::PersistentCongestion { recovery_window });
        }

        fn on_bbr_state_changed(&mut self, state: BbrState) {
            self.events.push(Event::BbrStateChanged(state));
        }

        fn on_pacing_rate_updated(
            &mut self,
            _pacing_rate: Bandwidth,
            send_quantum: u32,
            _gain: Gain,
        ) {
            self.events.push(Event::PacingRateUpdated { send_quantum });
        }

        fn on_network_statistics(&mut self, stats: NetworkStatistics) {
            self.events.push(Event::NetworkStatistics(stats));
        }
    }
}
