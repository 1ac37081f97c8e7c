// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-point gain representation.
//!
//! The spec is explicit that gains stay integer fixed-point scaled by
//! `GAIN_UNIT`, not a rational type: this deliberately departs from the
//! teacher crate's `num_rational::Ratio<u64>` gains (see `DESIGN.md`) in
//! favor of the scale-and-shift arithmetic `msquic`'s `bbr.c` uses
//! (`GAIN_UNIT`, raw `uint32_t` gain fields).

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#2.6
//# BBR.pacing_gain: The dynamic gain factor used to scale BBR.bw to produce BBR.pacing_rate.
pub const GAIN_UNIT: u32 = 256;

/// A gain, scaled by [`GAIN_UNIT`]. `Gain::UNIT` represents a multiplier of `1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gain(u32);

impl Gain {
    /// A gain of exactly `1.0`
    pub const UNIT: Gain = Gain(GAIN_UNIT);

    /// Constructs a `Gain` from an already-scaled raw value
    #[inline]
    pub const fn new_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Constructs a `Gain` representing `numerator / denominator`, rounding down
    #[inline]
    pub const fn from_ratio(numerator: u32, denominator: u32) -> Self {
        Self(((numerator as u64 * GAIN_UNIT as u64) / denominator as u64) as u32)
    }

    /// Returns the raw, `GAIN_UNIT`-scaled value
    #[inline]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Computes `value * self / GAIN_UNIT` using 64-bit arithmetic, saturating
    /// rather than overflowing if `value * self.as_raw()` would not fit in a `u64`.
    #[inline]
    pub fn scale_u64(self, value: u64) -> u64 {
        match value.checked_mul(self.0 as u64) {
            Some(product) => product / GAIN_UNIT as u64,
            None => (value / GAIN_UNIT as u64).saturating_mul(self.0 as u64),
        }
    }

    /// As [`Self::scale_u64`], clamped down into a `u32`
    #[inline]
    pub fn scale_u32(self, value: u32) -> u32 {
        self.scale_u64(value as u64).min(u32::MAX as u64) as u32
    }

    /// The inverse gain `GAIN_UNIT / self`, rounding down. Used to derive
    /// `drain_gain` from `high_gain`.
    #[inline]
    pub const fn inverse(self) -> Gain {
        Gain((GAIN_UNIT as u64 * GAIN_UNIT as u64 / self.0 as u64) as u32)
    }
}

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#4.3.1.1
//# BBRStartupPacingGain = 2/ln(2) ~= 2.89
//
// Expressed as the source does, via the rational approximation 2885/1000 plus
// one unit of slop so startup growth is never throttled by rounding.
pub const HIGH_GAIN: Gain = Gain::new_raw((2885 * GAIN_UNIT as u64 / 1000) as u32 + 1);

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#4.3.2
//# BBR.pacing_gain = 1/BBRStartupCwndGain  /* pace slowly to drain the queue */
pub const DRAIN_GAIN: Gain = HIGH_GAIN.inverse();

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#4.3.1.1
//# BBRStartupCwndGain = 2
pub const CWND_GAIN: Gain = Gain::new_raw(2 * GAIN_UNIT);

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#4.3.1.2
//# BBRStartupGrowthTarget = 1.25
pub const STARTUP_GROWTH_TARGET: Gain = Gain::from_ratio(5, 4);

/// Three consecutive rounds without reaching `STARTUP_GROWTH_TARGET` declares the pipe full.
pub const STARTUP_SLOW_GROW_ROUND_LIMIT: u32 = 3;

//= https://tools.ietf.org/id/draft-cardwell-iccrg-bbr-congestion-control-02#4.3.3
//# BBR.pacing_gain_cycle = [5/4, 3/4, 1, 1, 1, 1, 1, 1]
pub const GAIN_CYCLE: [Gain; 8] = [
    Gain::from_ratio(5, 4),
    Gain::from_ratio(3, 4),
    Gain::UNIT,
    Gain::UNIT,
    Gain::UNIT,
    Gain::UNIT,
    Gain::UNIT,
    Gain::UNIT,
];

pub const CYCLE_LENGTH: u8 = GAIN_CYCLE.len() as u8;

/// Phase index 1 is the drain phase of the cycle (`3/4`) and must never be
/// entered directly when transiting into ProbeBW.
pub const DRAIN_CYCLE_PHASE: u8 = 1;
