// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for cover control.
//!
//! Each type ensures values are within their valid ranges at construction
//! time, so the rest of the crate never has to re-check them.
//!
//! # Types
//!
//! - [`Percent`] - Normalized position or tilt (0-100%)
//! - [`CoverStatus`] - Unknown/Open/Closed
//! - [`QualityOfService`] - MQTT delivery level (0-2)
//! - [`DeviceClass`] - Kind of physical cover

mod device_class;
mod percent;
mod qos;
mod status;

pub use device_class::DeviceClass;
pub use percent::Percent;
pub use qos::QualityOfService;
pub use status::CoverStatus;
