// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Injected payload templates.
//!
//! The hub owns the template language. This crate only sees the compiled
//! result: a render closure supplied when the cover is configured. The core
//! never parses template syntax itself.
//!
//! - [`ValueTemplate`] decodes an inbound payload (state and position topics)
//!   into the string the cover should interpret.
//! - [`PositionTemplate`] encodes a target percentage into the payload
//!   published on the set-position topic. When present it is authoritative:
//!   no range mapping is applied to its output.
//!
//! # Examples
//!
//! ```
//! use mqtt_cover::template::{PositionTemplate, TemplateError, ValueTemplate};
//! use mqtt_cover::types::Percent;
//!
//! // Equivalent of `{{ (value | multiply(0.01)) | int }}`
//! let value = ValueTemplate::new(|payload| {
//!     let raw: f64 = payload.parse().map_err(|_| TemplateError::new("not a number"))?;
//!     Ok(((raw * 0.01) as i64).to_string())
//! });
//! assert_eq!(value.render("5000").unwrap(), "50");
//!
//! let set_position = PositionTemplate::new(|target| Ok(format!("{}", 100 - target.value())));
//! assert_eq!(set_position.render(Percent::new(62).unwrap()).unwrap(), "38");
//! ```

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::types::Percent;

/// Error returned by a render closure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TemplateError(String);

impl TemplateError {
    /// Creates a template error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TemplateError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for TemplateError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Type alias for payload decoding closures.
type ValueRenderFn = dyn Fn(&str) -> Result<String, TemplateError> + Send + Sync;

/// Type alias for position encoding closures.
type PositionRenderFn = dyn Fn(Percent) -> Result<String, TemplateError> + Send + Sync;

/// Decodes a raw inbound payload.
#[derive(Clone)]
pub struct ValueTemplate(Arc<ValueRenderFn>);

impl ValueTemplate {
    /// Wraps a render closure.
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&str) -> Result<String, TemplateError> + Send + Sync + 'static,
    {
        Self(Arc::new(render))
    }

    /// Renders the template with the payload bound as its input value.
    ///
    /// # Errors
    ///
    /// Returns whatever error the closure reports.
    pub fn render(&self, payload: &str) -> Result<String, TemplateError> {
        (self.0)(payload)
    }
}

impl fmt::Debug for ValueTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueTemplate(..)")
    }
}

/// Encodes a target position into an outbound payload.
#[derive(Clone)]
pub struct PositionTemplate(Arc<PositionRenderFn>);

impl PositionTemplate {
    /// Wraps a render closure.
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(Percent) -> Result<String, TemplateError> + Send + Sync + 'static,
    {
        Self(Arc::new(render))
    }

    /// Renders the template with `target` bound as its input value.
    ///
    /// # Errors
    ///
    /// Returns whatever error the closure reports.
    pub fn render(&self, target: Percent) -> Result<String, TemplateError> {
        (self.0)(target)
    }
}

impl fmt::Debug for PositionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PositionTemplate(..)")
    }
}
