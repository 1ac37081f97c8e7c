// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod bbr;
pub mod event;
pub mod kalman;
pub mod random;
pub mod settings;
pub mod time;

pub use bbr::{BbrCongestionController, BbrState};
pub use settings::Settings;
