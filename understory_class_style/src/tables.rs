// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style and media tables.
//!
//! The tables are produced ahead of time by build tooling. They are keyed by
//! *normalized* tokens (see [`normalize_selector`]): `hover:text-black` is
//! looked up as `hover_text-black`. The variant style of the `i`-th clause-set
//! of a token lives in the style table under `token.i`.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::Deserialize;

use crate::error::TableError;
use crate::record::StyleRecord;

/// Normalized token (or `token.index` variant key) to style record.
pub type StyleTable = BTreeMap<String, StyleRecord>;

/// Normalized token to its ordered clause-sets.
pub type MediaTable = BTreeMap<String, Vec<Vec<RawClause>>>;

/// One `(rule, params)` pair of a clause-set, as written in the media table.
///
/// Serialized as a two-element array: `["media", "(min-width: 640px)"]`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, Option<String>)")]
pub struct RawClause {
    /// Rule name (`media`, `pseudo-class`, `selector`, `dynamic-style`, ...).
    pub rule: String,
    /// Rule parameters, if any.
    pub params: Option<String>,
}

impl RawClause {
    /// Creates a clause.
    #[must_use]
    pub fn new(rule: &str, params: Option<&str>) -> Self {
        Self {
            rule: rule.to_string(),
            params: params.map(ToString::to_string),
        }
    }

    /// Shorthand for a `media` clause.
    #[must_use]
    pub fn media(query: &str) -> Self {
        Self::new("media", Some(query))
    }
}

impl From<(String, Option<String>)> for RawClause {
    fn from((rule, params): (String, Option<String>)) -> Self {
        Self { rule, params }
    }
}

/// The style and media tables a store resolves against.
///
/// ```rust
/// use understory_class_style::StyleTables;
///
/// let tables = StyleTables::from_json(
///     r#"{
///         "styles": {
///             "text-white": { "color": "white" },
///             "dark_text-black.0": { "color": "black" }
///         },
///         "media": {
///             "dark_text-black": [[["media", "(prefers-color-scheme: dark)"]]]
///         }
///     }"#,
/// )
/// .unwrap();
///
/// assert_eq!(tables.styles.len(), 2);
/// assert_eq!(tables.media["dark_text-black"][0][0].rule, "media");
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StyleTables {
    /// Base and variant style records.
    #[serde(default)]
    pub styles: StyleTable,
    /// Conditional clause-sets of dynamic tokens.
    #[serde(default)]
    pub media: MediaTable,
}

impl StyleTables {
    /// Creates empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses tables from their JSON form.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        serde_json::from_str(json).map_err(|err| TableError::Malformed(err.to_string()))
    }

    /// Adds a style record.
    #[must_use]
    pub fn with_style(mut self, key: &str, record: StyleRecord) -> Self {
        self.styles.insert(key.to_string(), record);
        self
    }

    /// Adds the clause-sets of a token.
    #[must_use]
    pub fn with_media(mut self, token: &str, clause_sets: Vec<Vec<RawClause>>) -> Self {
        self.media.insert(token.to_string(), clause_sets);
        self
    }
}

/// Default class-name normalization.
///
/// Strips a leading `.` and escape backslashes, then replaces every character
/// other than ASCII alphanumerics, `-` and `_` with `_`. Variant prefixes and
/// fractional values therefore map to table-safe names: `dark:text-black`
/// becomes `dark_text-black`, `gap-0.5` becomes `gap-0_5`.
#[must_use]
pub fn normalize_selector(class_name: &str) -> String {
    let trimmed = class_name.trim();
    let trimmed = trimmed.strip_prefix('.').unwrap_or(trimmed);
    trimmed
        .chars()
        .filter(|c| *c != '\\')
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
