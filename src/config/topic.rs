// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT topic validation and filter matching.

use crate::error::ConfigError;

/// Checks a topic the cover publishes to.
///
/// Publish topics must be non-empty and may not contain wildcards or NUL.
pub(crate) fn validate_publish_topic(field: &'static str, topic: &str) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidTopic {
        field,
        topic: topic.to_string(),
        reason,
    };
    if topic.is_empty() {
        return Err(invalid("topic is empty"));
    }
    if topic.contains('\0') {
        return Err(invalid("topic contains NUL"));
    }
    if topic.contains(['+', '#']) {
        return Err(invalid("wildcards are not allowed in publish topics"));
    }
    Ok(())
}

/// Checks a topic filter the cover subscribes to.
///
/// `+` must occupy a whole level and `#` must be the whole last level.
pub(crate) fn validate_subscribe_topic(
    field: &'static str,
    topic: &str,
) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidTopic {
        field,
        topic: topic.to_string(),
        reason,
    };
    if topic.is_empty() {
        return Err(invalid("topic is empty"));
    }
    if topic.contains('\0') {
        return Err(invalid("topic contains NUL"));
    }
    let level_count = topic.split('/').count();
    for (index, level) in topic.split('/').enumerate() {
        if level.contains('+') && level != "+" {
            return Err(invalid("'+' must occupy a whole level"));
        }
        if level.contains('#') && (level != "#" || index + 1 != level_count) {
            return Err(invalid("'#' must be the last level"));
        }
    }
    Ok(())
}

/// Returns `true` if `topic` matches the subscription `filter`.
pub(crate) fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
