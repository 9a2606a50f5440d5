// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use alloc::string::String;

/// Errors raised while resolving a class token.
///
/// These are configuration errors in the style or media tables. They surface
/// to the caller of the first resolution of the offending token and leave no
/// cache entry behind.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StyleError {
    /// A clause-set carries more than one `dynamic-style` directive.
    #[error("clause set {index} of `{token}` has more than one unit directive")]
    MultipleUnitDirectives {
        /// Normalized token owning the clause-set.
        token: String,
        /// Position of the clause-set in the token's media list.
        index: usize,
    },
    /// A `dynamic-style` directive without a unit name.
    #[error("unit directive in clause set {index} of `{token}` names no unit")]
    MissingUnitName {
        /// Normalized token owning the clause-set.
        token: String,
        /// Position of the clause-set in the token's media list.
        index: usize,
    },
    /// The unit named by a directive is not registered.
    #[error("unknown unit `{unit}`")]
    UnknownUnit {
        /// The unit name as written in the media table.
        unit: String,
    },
    /// A unit converter could not convert a property value.
    #[error("unit `{unit}` cannot convert the value of `{property}`")]
    InvalidUnitValue {
        /// The unit name.
        unit: String,
        /// The property whose value was rejected.
        property: String,
    },
}

/// Errors raised while loading style tables.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// The input was not a valid table document.
    #[error("malformed style tables: {0}")]
    Malformed(String),
}
