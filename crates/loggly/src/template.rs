// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `@Field` message templates.
//!
//! A template such as `"@UserId unlocked @GachaId"` combined with the
//! positional values `["<USERID>", 5]` renders to
//! `"UserId=<USERID> unlocked GachaId=5"` and yields the structured data
//! `{"UserId": "<USERID>", "GachaId": 5}`.
//!
//! Tokens are `@` followed by a run of word characters, optionally followed by
//! a printf verb introduced by `%` (`@Count%04d`). Tokens consume values left
//! to right. Once values run out, remaining tokens render as
//! [`FORMAT_ERROR_MARKER`]. A bare `@` is never a token.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::message::LogData;
use crate::verb::{self, Verb};

/// Rendered in place of a token that has no value left to consume.
pub const FORMAT_ERROR_MARKER: &str = "[FORMAT ERROR]";

lazy_static! {
    /// `@` + identifier, then an optional `%` + flags, width, precision and a conversion letter.
    static ref TOKEN_REGEX: Regex =
        Regex::new(r"@(\w*)(?:%([#+\-0]*[0-9]*(?:\.[0-9]*)?[A-Za-z]))?")
            .expect("failed creating regex");
}

/// Renders `template` against `values`, returning the message and the data map.
///
/// The data map holds each token's raw value keyed by the token's name. When a
/// name appears twice the later value wins.
#[must_use]
pub fn format_data_message(template: &str, values: &[Value]) -> (String, LogData) {
    let mut data = LogData::new();
    let mut remaining = values.iter();

    let message = TOKEN_REGEX.replace_all(template, |caps: &Captures<'_>| {
        let name = caps.get(1).map_or("", |m| m.as_str());
        if name.is_empty() {
            // bare `@`: leave the match untouched, consume nothing
            return caps[0].to_string();
        }

        let Some(value) = remaining.next() else {
            return FORMAT_ERROR_MARKER.to_string();
        };

        let verb = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<Verb>().ok())
            .unwrap_or_default();

        data.insert(name.to_string(), value.clone());
        format!("{name}={}", verb::render(value, &verb))
    });

    (message.into_owned(), data)
}
