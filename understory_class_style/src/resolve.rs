// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Atomic token resolution and topic-driven re-evaluation.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};

use crate::array::StyleArray;
use crate::clause::{self, CompiledMedia};
use crate::environment::{ColorScheme, DimensionsChange, Environment};
use crate::error::StyleError;
use crate::key::{CacheKey, Interaction, cache_key};
use crate::record::StyleRecord;
use crate::rule::{RuleContext, RuleEvaluator};
use crate::snapshot::{Snapshot, SnapshotEdit};
use crate::tables::StyleTables;
use crate::topic::{Topic, TopicRegistry};
use crate::units::UnitRegistry;

/// A resolved token whose value depends on its media entry.
#[derive(Debug)]
struct DynamicEntry {
    interaction: Interaction,
    base: Option<StyleRecord>,
    media: Rc<CompiledMedia>,
    /// Last converted variant per clause-set, reused while its value holds.
    converted: Vec<Option<StyleRecord>>,
    current: Option<StyleArray>,
}

impl DynamicEntry {
    fn new(interaction: Interaction, base: Option<StyleRecord>, media: Rc<CompiledMedia>) -> Self {
        let converted = (0..media.sets.len()).map(|_| None).collect();
        Self {
            interaction,
            base,
            media,
            converted,
            current: None,
        }
    }

    /// Recomputes the entry.
    ///
    /// Returns the current array and whether it differs from the previous one.
    /// An unchanged result hands back the previous array object.
    fn evaluate(
        &mut self,
        env: &Environment,
        units: &UnitRegistry,
        evaluator: &dyn RuleEvaluator,
    ) -> Result<(StyleArray, bool), StyleError> {
        let cx = RuleContext::new(env, self.interaction);
        let mut styles: Vec<StyleRecord> = self.base.iter().cloned().collect();
        let mut child_styles = Vec::new();

        for (index, set) in self.media.sets.iter().enumerate() {
            let matched = set.matches(evaluator, &cx);
            let Some(variant) = &set.variant else {
                continue;
            };
            let record = match &set.unit {
                Some(unit) => {
                    let fresh = units.convert(unit, variant, env)?;
                    match &self.converted[index] {
                        Some(previous) if *previous == fresh => previous.clone(),
                        _ => {
                            self.converted[index] = Some(fresh.clone());
                            fresh
                        }
                    }
                }
                None => variant.clone(),
            };
            if !matched {
                continue;
            }
            if set.for_children {
                child_styles.push(record);
            } else {
                styles.push(record);
            }
        }

        let next = StyleArray::new(styles, child_styles, true);
        if let Some(current) = &self.current {
            if current.same_records(&next) {
                return Ok((current.clone(), false));
            }
        }
        self.current = Some(next.clone());
        Ok((next, true))
    }
}

/// A multi-token class name whose parts include a dynamic token.
#[derive(Debug)]
struct Composite {
    parts: Vec<CacheKey>,
}

/// Mutable state behind a [`StyleStore`](crate::StyleStore).
pub(crate) struct Resolver {
    tables: StyleTables,
    units: UnitRegistry,
    evaluator: Box<dyn RuleEvaluator>,
    normalize: fn(&str) -> String,
    precompiled: bool,
    env: Environment,
    snapshot: Snapshot,
    topics: TopicRegistry<CacheKey>,
    dynamic: HashMap<CacheKey, DynamicEntry>,
    /// Compiled media entries by normalized token, shared across interaction states.
    compiled: HashMap<String, Rc<CompiledMedia>>,
    composites: HashMap<CacheKey, Composite>,
    /// Composite keys by constituent key.
    dependents: HashMap<CacheKey, Vec<CacheKey>>,
}

impl core::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Resolver")
            .field("precompiled", &self.precompiled)
            .field("env", &self.env)
            .field("entries", &self.snapshot.len())
            .field("dynamic", &self.dynamic.len())
            .field("composites", &self.composites.len())
            .finish_non_exhaustive()
    }
}

impl Resolver {
    pub(crate) fn new(
        tables: StyleTables,
        units: UnitRegistry,
        evaluator: Box<dyn RuleEvaluator>,
        normalize: fn(&str) -> String,
        precompiled: bool,
        env: Environment,
    ) -> Self {
        Self {
            tables,
            units,
            evaluator,
            normalize,
            precompiled,
            env,
            snapshot: Snapshot::default(),
            topics: TopicRegistry::new(),
            dynamic: HashMap::new(),
            compiled: HashMap::new(),
            composites: HashMap::new(),
            dependents: HashMap::new(),
        }
    }

    pub(crate) fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub(crate) fn environment(&self) -> &Environment {
        &self.env
    }

    pub(crate) fn is_precompiled(&self) -> bool {
        self.precompiled
    }

    pub(crate) fn topics(&self) -> &TopicRegistry<CacheKey> {
        &self.topics
    }

    pub(crate) fn key(&self, class_name: &str, interaction: Interaction) -> CacheKey {
        cache_key(class_name, interaction, self.precompiled)
    }

    pub(crate) fn apply_dimensions(&mut self, change: &DimensionsChange) {
        self.env.apply_dimensions(change);
    }

    pub(crate) fn set_color_scheme(&mut self, color_scheme: Option<ColorScheme>) {
        self.env.color_scheme = color_scheme;
    }

    /// Resolves one token, committing any new entry to the snapshot.
    pub(crate) fn resolve(
        &mut self,
        token: &str,
        interaction: Interaction,
    ) -> Result<StyleArray, StyleError> {
        let mut edit = self.snapshot.edit();
        let result = self.resolve_into(&mut edit, token, interaction);
        self.commit(edit);
        result
    }

    pub(crate) fn commit(&mut self, edit: SnapshotEdit) -> bool {
        match edit.finish() {
            Some(snapshot) => {
                self.snapshot = snapshot;
                true
            }
            None => false,
        }
    }

    pub(crate) fn resolve_into(
        &mut self,
        edit: &mut SnapshotEdit,
        token: &str,
        interaction: Interaction,
    ) -> Result<StyleArray, StyleError> {
        let key = self.key(token, interaction);
        if let Some(existing) = edit.get(&key) {
            return Ok(existing.clone());
        }

        if self.precompiled {
            let array = StyleArray::compiled(&key);
            edit.insert(key, array.clone());
            return Ok(array);
        }

        let name = (self.normalize)(token);
        let base = self.tables.styles.get(&name).cloned();

        let Some(media) = self.media_for(&name)? else {
            tracing::trace!(%key, "resolved static token");
            let array = StyleArray::from_styles(base.into_iter().collect());
            edit.insert(key, array.clone());
            return Ok(array);
        };

        let mut entry = DynamicEntry::new(interaction, base, media.clone());
        let (array, _) = entry.evaluate(&self.env, &self.units, self.evaluator.as_ref())?;
        for topic in media.topics.topics() {
            self.topics.subscribe(topic, key.clone());
        }
        tracing::trace!(%key, topics = ?media.topics, "resolved dynamic token");
        self.dynamic.insert(key.clone(), entry);
        edit.insert(key, array.clone());
        Ok(array)
    }

    /// Returns the compiled media entry of a normalized token, compiling it once.
    fn media_for(&mut self, name: &str) -> Result<Option<Rc<CompiledMedia>>, StyleError> {
        if let Some(media) = self.compiled.get(name) {
            return Ok(Some(media.clone()));
        }
        let Some(raw) = self.tables.media.get(name) else {
            return Ok(None);
        };
        let media = Rc::new(clause::compile(name, raw, &self.tables.styles, &self.units)?);
        self.compiled.insert(name.into(), media.clone());
        Ok(Some(media))
    }

    /// Records a dynamic composite so it follows its constituents.
    pub(crate) fn track_composite(&mut self, key: CacheKey, parts: Vec<CacheKey>) {
        for part in &parts {
            let dependents = self.dependents.entry(part.clone()).or_default();
            if !dependents.contains(&key) {
                dependents.push(key.clone());
            }
        }
        self.composites.insert(key, Composite { parts });
    }

    /// Re-evaluates every entry subscribed to `topic`, then the composites
    /// built from them.
    ///
    /// Returns `true` if a new snapshot was committed.
    pub(crate) fn refresh(&mut self, topic: Topic) -> bool {
        let mut edit = self.snapshot.edit();
        let mut changed = Vec::new();

        let visited = self.topics.publish(topic, |key| {
            let Some(entry) = self.dynamic.get_mut(key) else {
                return;
            };
            match entry.evaluate(&self.env, &self.units, self.evaluator.as_ref()) {
                Ok((array, true)) => {
                    edit.insert(key.clone(), array);
                    changed.push(key.clone());
                }
                Ok((_, false)) => {}
                Err(err) => {
                    tracing::error!(%key, topic = topic.name(), %err, "re-evaluation failed; keeping previous styles");
                }
            }
        });

        let mut affected = HashSet::new();
        for key in &changed {
            if let Some(dependents) = self.dependents.get(key) {
                affected.extend(dependents.iter().cloned());
            }
        }
        for key in affected {
            let Some(composite) = self.composites.get(&key) else {
                continue;
            };
            let next = StyleArray::concat(composite.parts.iter().filter_map(|part| edit.get(part)));
            let unchanged = edit
                .get(&key)
                .is_some_and(|current| current.same_records(&next));
            if !unchanged {
                edit.insert(key, next);
            }
        }

        tracing::debug!(
            topic = topic.name(),
            visited,
            changed = changed.len(),
            "topic published"
        );
        self.commit(edit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Orientation, ScaledSize};
    use crate::rule::NeverMatch;
    use crate::tables::{RawClause, normalize_selector};
    use alloc::vec;

    fn env() -> Environment {
        Environment {
            platform: "test".into(),
            window: ScaledSize::new(500.0, 1000.0),
            orientation: Orientation::Portrait,
            color_scheme: None,
        }
    }

    fn dark_rule(rule: &str, params: Option<&str>, cx: &RuleContext<'_>) -> Option<bool> {
        match (rule, params) {
            ("media", Some("(prefers-color-scheme: dark)")) => {
                Some(cx.color_scheme() == Some(ColorScheme::Dark))
            }
            ("media", Some("(min-width: 640px)")) => Some(cx.width() >= 640.0),
            _ => None,
        }
    }

    fn resolver(tables: StyleTables) -> Resolver {
        Resolver::new(
            tables,
            UnitRegistry::with_defaults(),
            Box::new(dark_rule),
            normalize_selector,
            false,
            env(),
        )
    }

    fn black() -> StyleRecord {
        StyleRecord::builder().set("color", "black").build()
    }

    #[test]
    fn static_tokens_resolve_once() {
        let style = black();
        let mut resolver = resolver(StyleTables::new().with_style("text-black", style.clone()));

        let first = resolver.resolve("text-black", Interaction::empty()).unwrap();
        let second = resolver.resolve("text-black", Interaction::empty()).unwrap();

        assert!(!first.is_dynamic());
        assert!(first.ptr_eq(&second));
        assert!(first.styles()[0].ptr_eq(&style));
        assert!(resolver.topics().is_empty());
    }

    #[test]
    fn missing_tokens_resolve_empty() {
        let mut resolver = resolver(StyleTables::new());
        let array = resolver.resolve("nope", Interaction::empty()).unwrap();
        assert!(array.is_empty());
        assert!(!array.is_dynamic());
    }

    #[test]
    fn dynamic_tokens_subscribe_and_follow_topics() {
        let tables = StyleTables::new()
            .with_style("dark_text-black.0", black())
            .with_media(
                "dark_text-black",
                vec![vec![RawClause::media("(prefers-color-scheme: dark)")]],
            );
        let mut resolver = resolver(tables);

        let before = resolver.resolve("dark:text-black", Interaction::empty()).unwrap();
        assert!(before.is_dynamic());
        assert!(before.is_empty());
        let key = resolver.key("dark:text-black", Interaction::empty());
        assert!(resolver.topics().is_subscribed(Topic::ColorScheme, &key));
        assert!(!resolver.topics().is_subscribed(Topic::Window, &key));

        // Window changes do not touch the entry.
        assert!(!resolver.refresh(Topic::Window));

        resolver.set_color_scheme(Some(ColorScheme::Dark));
        assert!(resolver.refresh(Topic::ColorScheme));
        let after = resolver.snapshot().get(&key).unwrap().clone();
        assert_eq!(after.len(), 1);

        // Same environment again: same object.
        assert!(!resolver.refresh(Topic::ColorScheme));
        assert!(resolver.snapshot().get(&key).unwrap().ptr_eq(&after));
    }

    #[test]
    fn unknown_units_fail_the_first_resolution() {
        let tables = StyleTables::new()
            .with_style("w-1_2.0", StyleRecord::builder().set("width", 50.0).build())
            .with_media(
                "w-1_2",
                vec![vec![RawClause::new("dynamic-style", Some("vmin"))]],
            );
        let mut resolver = resolver(tables);

        let err = resolver.resolve("w-1/2", Interaction::empty()).unwrap_err();
        assert_eq!(err, StyleError::UnknownUnit { unit: "vmin".into() });
        assert!(resolver.snapshot().is_empty());
        assert!(resolver.topics().is_empty());
    }

    #[test]
    fn converted_variants_keep_identity_while_unchanged() {
        let tables = StyleTables::new()
            .with_style("w-half.0", StyleRecord::builder().set("width", 50.0).build())
            .with_media(
                "w-half",
                vec![vec![RawClause::new("dynamic-style", Some("vw"))]],
            );
        let mut resolver = resolver(tables);

        let first = resolver.resolve("w-half", Interaction::empty()).unwrap();
        assert_eq!(first.styles()[0].get("width").and_then(|v| v.as_number()), Some(250.0));

        // Same width: nothing changes.
        assert!(!resolver.refresh(Topic::Window));

        resolver.apply_dimensions(&DimensionsChange {
            window: ScaledSize::new(800.0, 1000.0),
            screen: ScaledSize::new(800.0, 1000.0),
        });
        assert!(resolver.refresh(Topic::Window));
        let key = resolver.key("w-half", Interaction::empty());
        let second = resolver.snapshot().get(&key).unwrap();
        assert_eq!(second.styles()[0].get("width").and_then(|v| v.as_number()), Some(400.0));
        assert!(!second.ptr_eq(&first));

        // The table record is never rewritten.
        assert_eq!(
            resolver.tables.styles["w-half.0"].get("width").and_then(|v| v.as_number()),
            Some(50.0)
        );
    }

    #[test]
    fn never_match_keeps_only_base_styles() {
        let base = black();
        let tables = StyleTables::new()
            .with_style("container", base.clone())
            .with_style("container.0", StyleRecord::builder().set("maxWidth", 640.0).build())
            .with_media("container", vec![vec![RawClause::media("(min-width: 640px)")]]);
        let mut resolver = Resolver::new(
            tables,
            UnitRegistry::new(),
            Box::new(NeverMatch),
            normalize_selector,
            false,
            env(),
        );

        let array = resolver.resolve("container", Interaction::empty()).unwrap();
        assert_eq!(array.len(), 1);
        assert!(array.styles()[0].ptr_eq(&base));
        assert!(array.is_dynamic());
    }
}
