// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Class-name selectors.
//!
//! A class name is a whitespace-separated list of tokens. Its resolved array
//! is the concatenation of the tokens' arrays, cached under its own key.

use alloc::vec::Vec;

use crate::array::StyleArray;
use crate::error::StyleError;
use crate::key::{CacheKey, Interaction};
use crate::resolve::Resolver;
use crate::snapshot::{Snapshot, SnapshotEdit};

/// A projection from a snapshot to one class name's styles.
///
/// Selectors are cheap to clone and never recompute anything: they only read
/// the snapshot they are given. A selector stays valid for the lifetime of its
/// store, across any number of snapshot replacements.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selector {
    key: CacheKey,
}

impl Selector {
    /// Returns the cache key this selector reads.
    #[must_use]
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Returns the class name's styles in `snapshot`.
    ///
    /// `None` only for a snapshot taken before the selector was created.
    #[must_use]
    pub fn select(&self, snapshot: &Snapshot) -> Option<StyleArray> {
        snapshot.get(&self.key).cloned()
    }
}

impl Resolver {
    /// Resolves a class name and caches the composite.
    pub(crate) fn compose(
        &mut self,
        class_name: &str,
        interaction: Interaction,
    ) -> Result<(Selector, StyleArray), StyleError> {
        let mut edit = self.snapshot().edit();
        let result = self.compose_into(&mut edit, class_name, interaction);
        // Tokens resolved before a failure stay cached.
        self.commit(edit);
        result
    }

    fn compose_into(
        &mut self,
        edit: &mut SnapshotEdit,
        class_name: &str,
        interaction: Interaction,
    ) -> Result<(Selector, StyleArray), StyleError> {
        let key = self.key(class_name, interaction);
        if let Some(existing) = edit.get(&key) {
            return Ok((Selector { key }, existing.clone()));
        }

        if self.is_precompiled() {
            let array = StyleArray::compiled(&key);
            edit.insert(key.clone(), array.clone());
            return Ok((Selector { key }, array));
        }

        let mut parts = Vec::new();
        let mut arrays = Vec::new();
        for token in class_name.split_whitespace() {
            arrays.push(self.resolve_into(edit, token, interaction)?);
            parts.push(self.key(token, interaction));
        }

        // A lone token is its own composite.
        if let [part] = parts.as_slice() {
            if *part == key {
                let array = arrays.swap_remove(0);
                return Ok((Selector { key }, array));
            }
        }

        let array = StyleArray::concat(&arrays);
        if array.is_dynamic() {
            self.track_composite(key.clone(), parts);
        }
        tracing::trace!(%key, tokens = arrays.len(), dynamic = array.is_dynamic(), "composed class name");
        edit.insert(key.clone(), array.clone());
        Ok((Selector { key }, array))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{ColorScheme, Environment, Orientation, ScaledSize};
    use crate::record::StyleRecord;
    use crate::rule::RuleContext;
    use crate::tables::{RawClause, StyleTables, normalize_selector};
    use crate::topic::Topic;
    use crate::units::UnitRegistry;
    use alloc::boxed::Box;
    use alloc::vec;

    fn dark(rule: &str, params: Option<&str>, cx: &RuleContext<'_>) -> Option<bool> {
        (rule == "media" && params == Some("(prefers-color-scheme: dark)"))
            .then(|| cx.color_scheme() == Some(ColorScheme::Dark))
    }

    fn resolver(tables: StyleTables, precompiled: bool) -> Resolver {
        Resolver::new(
            tables,
            UnitRegistry::new(),
            Box::new(dark),
            normalize_selector,
            precompiled,
            Environment {
                platform: "test".into(),
                window: ScaledSize::default(),
                orientation: Orientation::Portrait,
                color_scheme: None,
            },
        )
    }

    #[test]
    fn single_token_reuses_the_atomic_entry() {
        let style = StyleRecord::builder().set("color", "black").build();
        let mut resolver = resolver(StyleTables::new().with_style("text-black", style), false);

        let (selector, array) = resolver.compose("text-black", Interaction::empty()).unwrap();
        let atom = resolver.resolve("text-black", Interaction::empty()).unwrap();
        assert!(array.ptr_eq(&atom));
        assert_eq!(resolver.snapshot().len(), 1);
        assert!(selector.select(resolver.snapshot()).unwrap().ptr_eq(&atom));
    }

    #[test]
    fn composites_follow_their_dynamic_tokens() {
        let white = StyleRecord::builder().set("color", "white").build();
        let black = StyleRecord::builder().set("color", "black").build();
        let tables = StyleTables::new()
            .with_style("text-white", white.clone())
            .with_style("dark_text-black.0", black.clone())
            .with_media(
                "dark_text-black",
                vec![vec![RawClause::media("(prefers-color-scheme: dark)")]],
            );
        let mut resolver = resolver(tables, false);

        let (selector, before) = resolver
            .compose("text-white dark:text-black", Interaction::empty())
            .unwrap();
        assert!(before.is_dynamic());
        assert_eq!(before.len(), 1);
        assert!(before.styles()[0].ptr_eq(&white));

        resolver.set_color_scheme(Some(ColorScheme::Dark));
        assert!(resolver.refresh(Topic::ColorScheme));

        let after = selector.select(resolver.snapshot()).unwrap();
        assert_eq!(after.len(), 2);
        assert!(after.styles()[0].ptr_eq(&white));
        assert!(after.styles()[1].ptr_eq(&black));

        // The static token's entry was not touched.
        let static_key = resolver.key("text-white", Interaction::empty());
        assert!(resolver.snapshot().get(&static_key).unwrap().styles()[0].ptr_eq(&white));
    }

    #[test]
    fn static_composites_are_not_tracked() {
        let tables = StyleTables::new()
            .with_style("a", StyleRecord::builder().set("color", "red").build())
            .with_style("b", StyleRecord::builder().set("margin", 1.0).build());
        let mut resolver = resolver(tables, false);

        let (_, array) = resolver.compose("a b", Interaction::empty()).unwrap();
        assert!(!array.is_dynamic());
        assert_eq!(array.len(), 2);
        // a, b and "a b".
        assert_eq!(resolver.snapshot().len(), 3);
        assert!(!resolver.refresh(Topic::Window));
    }

    #[test]
    fn precompiled_class_names_are_single_markers() {
        let mut resolver = resolver(StyleTables::new(), true);
        let (selector, array) = resolver
            .compose("text-black font-bold", Interaction::HOVER)
            .unwrap();

        assert_eq!(selector.key().as_str(), "text-black font-bold");
        assert_eq!(array.len(), 1);
        assert_eq!(
            array.styles()[0],
            StyleRecord::compiled("text-black font-bold")
        );
        // No per-token entries.
        assert_eq!(resolver.snapshot().len(), 1);
    }

    #[test]
    fn empty_class_names_resolve_empty() {
        let mut resolver = resolver(StyleTables::new(), false);
        let (_, array) = resolver.compose("", Interaction::empty()).unwrap();
        assert!(array.is_empty());
    }
}
