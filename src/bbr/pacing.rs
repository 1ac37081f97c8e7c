// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Send-quantum sizing and the pacing allowance computation.
//!
//! Grounded on `original_source/src/core/bbr.c`'s
//! `BbrCongestionControlUpdatePacingRate` and
//! `BbrCongestionControlGetSendAllowance`, mirrored in idiom on the
//! teacher's `recovery::bbr::pacing` (which computes an
//! `interval_between_packets` rather than a per-call allowance, but shares
//! the same low/high bandwidth-threshold quantum sizing and burst cap).

use crate::bbr::{bandwidth::Bandwidth, gain::Gain};
use core::time::Duration;

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#4.5.1
//# BBRMinPipeCwnd = 4 * SMSS
pub const LOW_PACING_THRESHOLD_BYTES_PER_SECOND: u64 = 1_200_000;
pub const HIGH_PACING_THRESHOLD_BYTES_PER_SECOND: u64 = 24_000_000;
pub const MAX_SEND_QUANTUM: u32 = 64 * 1024;

/// The minimum RTT below which pacing stops being worthwhile relative to
/// timer granularity and sends go out immediately instead.
pub const MIN_PACING_RTT: Duration = Duration::from_millis(1);

/// Computes `send_quantum` from the current pacing rate, per the
/// low/high-bandwidth thresholds.
pub fn compute_send_quantum(bandwidth: Bandwidth, pacing_gain: Gain, max_datagram_size: u16) -> u32 {
    let pacing_rate = bandwidth.scale(pacing_gain);
    let mss = max_datagram_size as u32;

    let low = LOW_PACING_THRESHOLD_BYTES_PER_SECOND * crate::bbr::bandwidth::BW_UNIT;
    let high = HIGH_PACING_THRESHOLD_BYTES_PER_SECOND * crate::bbr::bandwidth::BW_UNIT;

    if pacing_rate.as_raw() < low {
        mss
    } else if pacing_rate.as_raw() < high {
        2 * mss
    } else {
        let bytes_per_ms = pacing_rate.bytes_over(Duration::from_millis(1));
        bytes_per_ms.min(MAX_SEND_QUANTUM as u64) as u32
    }
}

/// Computes the number of bytes the sender may emit right now.
#[allow(clippy::too_many_arguments)]
pub fn get_send_allowance(
    cwnd: u32,
    bytes_in_flight: u32,
    bandwidth: Bandwidth,
    pacing_gain: Gain,
    min_rtt: Option<Duration>,
    time_since_last_send: Option<Duration>,
    pacing_enabled: bool,
    is_startup: bool,
) -> u32 {
    if bytes_in_flight >= cwnd {
        return 0;
    }
    let headroom = cwnd - bytes_in_flight;

    let no_pacing = !pacing_enabled
        || time_since_last_send.is_none()
        || !matches!(min_rtt, Some(rtt) if rtt >= MIN_PACING_RTT);
    if no_pacing {
        return headroom;
    }

    let time_since_last_send = time_since_last_send.expect("checked above");
    let pacing_rate = bandwidth.scale(pacing_gain);
    let mut allowance = pacing_rate
        .bytes_over(time_since_last_send)
        .min(u32::MAX as u64) as u32;

    if is_startup {
        let startup_allowance = pacing_gain.scale_u32(cwnd).saturating_sub(bytes_in_flight);
        allowance = allowance.max(startup_allowance);
    }

    allowance = allowance.min(headroom);
    allowance.min(cwnd / 4)
}
