// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Class Style: reactive resolution of utility-class names.
//!
//! This crate turns utility-class names such as `"p-4 text-black dark:text-white"`
//! into arrays of shared style records, caches the results, and keeps the
//! cache current as the environment changes.
//!
//! ## Core Concepts
//!
//! ### Tables
//!
//! A build step produces two tables, loaded as [`StyleTables`]:
//!
//! - the **style table** maps a normalized token to its [`StyleRecord`], and
//!   maps `"<token>.<n>"` to the variant style of the token's `n`th clause-set;
//! - the **media table** maps a normalized token to its clause-sets. A
//!   clause-set is a list of `(rule, params)` pairs that must all hold for the
//!   variant to apply.
//!
//! Tokens without a media entry are **static** and resolve once. Tokens with
//! one are **dynamic** and are re-evaluated when a [`Topic`] they depend on
//! changes.
//!
//! ### Rules
//!
//! Apart from child selectors (`selector`, `(> *)`) and unit directives
//! (`dynamic-style`, `vw`), rules are handed to a [`RuleEvaluator`] together
//! with a [`RuleContext`]. The `understory_media_query` crate provides one that
//! understands media queries and interaction pseudo-classes.
//!
//! ### The store
//!
//! [`StyleStore`] owns the cache. Resolved arrays live in an immutable
//! [`Snapshot`]; [`Selector`]s read from snapshots, and listeners registered
//! with [`StyleStore::subscribe`] are told when a new snapshot exists.
//! Entries that did not change keep their objects, so [`is_equal`] lets
//! consumers skip work cheaply.
//!
//! ```rust
//! use understory_class_style::{Interaction, StyleRecord, StyleStore, StyleTables};
//!
//! let tables = StyleTables::new()
//!     .with_style("p-4", StyleRecord::builder().set("padding", 16.0).build())
//!     .with_style("text-black", StyleRecord::builder().set("color", "black").build());
//!
//! let store = StyleStore::builder().tables(tables).build();
//! let styles = store.style("p-4 text-black", Interaction::empty()).unwrap();
//! assert_eq!(styles.len(), 2);
//! assert_eq!(styles.styles()[1].get("color").and_then(|v| v.as_str()), Some("black"));
//!
//! // Resolving again hands back the same array.
//! let again = store.style("p-4 text-black", Interaction::empty()).unwrap();
//! assert!(StyleStore::is_equal(&styles, &again));
//! ```
//!
//! Tables usually come from JSON:
//!
//! ```rust
//! use understory_class_style::StyleTables;
//!
//! let tables = StyleTables::from_json(
//!     r#"{
//!         "styles": { "sm_p-2": { "padding": 4 }, "sm_p-2.0": { "padding": 8 } },
//!         "media": { "sm_p-2": [[["media", "(min-width: 640px)"]]] }
//!     }"#,
//! )
//! .unwrap();
//! assert_eq!(tables.media["sm_p-2"][0][0].rule, "media");
//! ```
//!
//! ## Threading
//!
//! The store is single-threaded. Provider events, re-evaluation and listener
//! calls run synchronously on the caller's thread. Evaluators, unit converters
//! and providers must not call back into the store while it is resolving;
//! listeners may.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod array;
mod clause;
mod environment;
mod error;
mod key;
mod record;
mod resolve;
mod rule;
mod selector;
mod snapshot;
mod store;
mod tables;
mod topic;
mod units;

pub use array::{StyleArray, is_equal};
pub use environment::{
    AppearanceChange, AppearanceListener, AppearanceProvider, ColorScheme, DimensionKind,
    DimensionsChange, DimensionsListener, DimensionsProvider, Environment, ManualAppearance,
    ManualDimensions, Orientation, ProviderSubscription, ScaledSize,
};
pub use error::{StyleError, TableError};
pub use key::{CacheKey, Interaction, cache_key};
pub use record::{COMPILED_MARKER_FIELD, StyleRecord, StyleRecordBuilder, StyleValue};
pub use rule::{NeverMatch, RuleContext, RuleEvaluator};
pub use selector::Selector;
pub use snapshot::{Listener, Snapshot, Subscription};
pub use store::{DEFAULT_PLATFORM, StyleStore, StyleStoreBuilder};
pub use tables::{MediaTable, RawClause, StyleTable, StyleTables, normalize_selector};
pub use topic::{Topic, TopicRegistry, Topics};
pub use units::{UnitConverter, UnitRegistry};
