// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Media Query: the default rule evaluator for `understory_class_style`.
//!
//! [`MediaQueryEvaluator`] understands the rules emitted by utility-class
//! tooling:
//!
//! - `media` rules carrying a media query list, such as
//!   `(min-width: 640px) and (orientation: landscape)` or a bare platform name
//!   like `ios`;
//! - `pseudo-class` rules for `hover`, `active` and `focus`;
//! - `component` rules for the same states on the enclosing component.
//!
//! Queries are parsed with `cssparser`. Supported media features are `width`,
//! `height` and `aspect-ratio` (with `min-`/`max-` prefixes or the range
//! syntax, as in `(640px <= width < 1024px)`), `orientation` and
//! `prefers-color-scheme`.
//!
//! ```rust
//! use understory_class_style::{
//!     Interaction, ManualDimensions, RawClause, ScaledSize, StyleRecord,
//!     StyleStore, StyleTables,
//! };
//! use understory_media_query::MediaQueryEvaluator;
//!
//! let tables = StyleTables::new()
//!     .with_style("md_flex-row.0", StyleRecord::builder().set("flexDirection", "row").build())
//!     .with_media("md_flex-row", vec![vec![RawClause::media("(min-width: 768px)")]]);
//!
//! let dimensions = ManualDimensions::new(ScaledSize::new(390.0, 844.0), ScaledSize::new(390.0, 844.0));
//! let store = StyleStore::builder()
//!     .tables(tables)
//!     .evaluator(MediaQueryEvaluator::new())
//!     .dimensions(dimensions.clone())
//!     .build();
//!
//! let selector = store.create_selector("md:flex-row", Interaction::empty()).unwrap();
//! assert!(selector.select(&store.get_snapshot()).unwrap().is_empty());
//!
//! dimensions.set_window(ScaledSize::new(1024.0, 768.0));
//! assert_eq!(selector.select(&store.get_snapshot()).unwrap().len(), 1);
//! ```

mod evaluator;
mod query;

pub use evaluator::MediaQueryEvaluator;
pub use query::{Comparison, FeatureName, MediaFeature, MediaQuery, MediaQueryList, QueryError};
