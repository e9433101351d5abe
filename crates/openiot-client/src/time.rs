// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use chrono::{DateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time in the service timestamp format,
/// e.g. `2024-03-05T08:09:10.123Z`.
pub fn now() -> String {
    format_timestamp(&Utc::now())
}

/// Formats a timestamp with millisecond precision in UTC.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}
