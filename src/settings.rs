// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Configuration supplied by the enclosing connection (§6 inbound contract).

//= https://www.rfc-editor.org/rfc/rfc9002#section-7.2
//# Endpoints SHOULD use an initial congestion
//# window of ten times the maximum datagram size (max_datagram_size).
const DEFAULT_INITIAL_WINDOW_PACKETS: u32 = 10;

/// Knobs the enclosing connection supplies at `Initialize` time.
///
/// This is deliberately a plain struct rather than a builder: the set of
/// knobs is small and fixed, and every field is meaningful on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "generator", derive(bolero_generator::TypeGenerator))]
pub struct Settings {
    /// The initial congestion window, expressed as a multiple of `max_datagram_size`
    pub initial_window_packets: u32,
    /// The current path's maximum datagram payload size, in bytes
    pub max_datagram_size: u16,
    /// Whether the sender should pace packets rather than send them immediately
    /// whenever the congestion window allows it
    pub pacing_enabled: bool,
    /// Whether `NETWORK_STATISTICS` notifications should be published on every ack
    pub net_stats_event_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_window_packets: DEFAULT_INITIAL_WINDOW_PACKETS,
            max_datagram_size: 1200,
            pacing_enabled: true,
            net_stats_event_enabled: false,
        }
    }
}
