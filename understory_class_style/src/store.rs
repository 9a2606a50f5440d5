// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The public store handle and its builder.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::array::{self, StyleArray};
use crate::environment::{
    AppearanceChange, AppearanceProvider, DimensionKind, DimensionsChange, DimensionsProvider,
    Environment, ManualAppearance, ManualDimensions, Orientation, ProviderSubscription,
};
use crate::error::StyleError;
use crate::key::Interaction;
use crate::resolve::Resolver;
use crate::rule::{NeverMatch, RuleEvaluator};
use crate::selector::Selector;
use crate::snapshot::{Listener, ListenerSet, Snapshot, Subscription};
use crate::tables::{MediaTable, StyleTable, StyleTables, normalize_selector};
use crate::topic::Topic;
use crate::units::UnitRegistry;

/// Platform reported when the builder is not given one.
pub const DEFAULT_PLATFORM: &str = "unknown";

struct Shared {
    resolver: RefCell<Resolver>,
    listeners: ListenerSet,
    providers: RefCell<Vec<ProviderSubscription>>,
}

impl Shared {
    /// Runs the topic's re-evaluation, then notifies once.
    ///
    /// The resolver borrow ends before listeners run.
    fn publish(&self, topic: Topic) {
        let changed = self.resolver.borrow_mut().refresh(topic);
        tracing::trace!(topic = topic.name(), changed, "environment published");
        self.listeners.notify();
    }

    fn on_dimensions(&self, change: &DimensionsChange) {
        self.resolver.borrow_mut().apply_dimensions(change);
        self.publish(Topic::Window);
    }

    fn on_appearance(&self, change: &AppearanceChange) {
        self.resolver
            .borrow_mut()
            .set_color_scheme(change.color_scheme);
        self.publish(Topic::ColorScheme);
    }

    fn detach(&self) {
        let providers = core::mem::take(&mut *self.providers.borrow_mut());
        for subscription in providers {
            subscription.remove();
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.detach();
    }
}

/// A reactive cache of resolved class names.
///
/// The store turns class names into [`StyleArray`]s, caches them in a
/// copy-on-write [`Snapshot`], and keeps dynamic entries current as the
/// window and color scheme change. Consumers follow the snapshot protocol:
///
/// 1. create a [`Selector`] for a class name,
/// 2. read it from [`get_snapshot`](Self::get_snapshot),
/// 3. [`subscribe`](Self::subscribe) and re-read when notified, skipping work
///    when [`is_equal`](Self::is_equal) says the styles are unchanged.
///
/// Handles are cheap to clone and share one store. The store is
/// single-threaded; provider callbacks and listeners run synchronously.
///
/// ```rust
/// use std::rc::Rc;
/// use understory_class_style::{
///     ColorScheme, Interaction, ManualAppearance, RawClause, RuleContext, StyleRecord,
///     StyleStore, StyleTables,
/// };
///
/// fn prefers_dark(rule: &str, params: Option<&str>, cx: &RuleContext<'_>) -> Option<bool> {
///     (rule == "media" && params == Some("(prefers-color-scheme: dark)"))
///         .then(|| cx.color_scheme() == Some(ColorScheme::Dark))
/// }
///
/// let white = StyleRecord::builder().set("color", "white").build();
/// let black = StyleRecord::builder().set("color", "black").build();
/// let tables = StyleTables::new()
///     .with_style("text-white", white)
///     .with_style("dark_text-black.0", black)
///     .with_media(
///         "dark_text-black",
///         vec![vec![RawClause::media("(prefers-color-scheme: dark)")]],
///     );
///
/// let appearance = ManualAppearance::default();
/// let store = StyleStore::builder()
///     .tables(tables)
///     .evaluator(prefers_dark)
///     .appearance(appearance.clone())
///     .build();
///
/// let selector = store
///     .create_selector("text-white dark:text-black", Interaction::empty())
///     .unwrap();
/// let light = selector.select(&store.get_snapshot()).unwrap();
/// assert_eq!(light.len(), 1);
///
/// let notified = Rc::new(std::cell::Cell::new(false));
/// let flag = notified.clone();
/// store.subscribe(Rc::new(move || flag.set(true)));
///
/// appearance.change(Some(ColorScheme::Dark));
/// assert!(notified.get());
/// let dark = selector.select(&store.get_snapshot()).unwrap();
/// assert_eq!(dark.len(), 2);
/// assert!(!StyleStore::is_equal(&light, &dark));
/// ```
#[derive(Clone)]
pub struct StyleStore {
    shared: Rc<Shared>,
}

impl StyleStore {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> StyleStoreBuilder {
        StyleStoreBuilder::new()
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn get_snapshot(&self) -> Snapshot {
        self.shared.resolver.borrow().snapshot().clone()
    }

    /// Returns the snapshot used for non-interactive initial rendering.
    ///
    /// Identical to [`get_snapshot`](Self::get_snapshot).
    #[must_use]
    pub fn get_server_snapshot(&self) -> Snapshot {
        self.get_snapshot()
    }

    /// Registers a listener called after every batch of changes.
    ///
    /// Subscribing the same listener object twice registers it once.
    pub fn subscribe(&self, listener: Listener) -> Subscription {
        self.shared.listeners.add(listener)
    }

    /// Calls every listener once.
    pub fn notify(&self) {
        self.shared.listeners.notify();
    }

    /// Resolves a class name and returns a selector reading it from snapshots.
    ///
    /// The first call for a class name and interaction state resolves and
    /// caches it; later calls reuse the cached entry.
    pub fn create_selector(
        &self,
        class_name: &str,
        interaction: Interaction,
    ) -> Result<Selector, StyleError> {
        Ok(self.compose(class_name, interaction)?.0)
    }

    /// Resolves a class name and returns its current styles.
    pub fn style(&self, class_name: &str, interaction: Interaction) -> Result<StyleArray, StyleError> {
        Ok(self.compose(class_name, interaction)?.1)
    }

    fn compose(
        &self,
        class_name: &str,
        interaction: Interaction,
    ) -> Result<(Selector, StyleArray), StyleError> {
        self.shared
            .resolver
            .borrow_mut()
            .compose(class_name, interaction)
    }

    /// Resolves a single token.
    ///
    /// A `token` containing whitespace is a class name and resolves as
    /// [`style`](Self::style) does.
    pub fn resolve(&self, token: &str, interaction: Interaction) -> Result<StyleArray, StyleError> {
        if token.split_whitespace().nth(1).is_some() {
            return self.style(token, interaction);
        }
        self.shared
            .resolver
            .borrow_mut()
            .resolve(token, interaction)
    }

    /// Identity comparison of two arrays; see [`is_equal`](crate::is_equal).
    #[must_use]
    pub fn is_equal(a: &StyleArray, b: &StyleArray) -> bool {
        array::is_equal(a, b)
    }

    /// Re-evaluates every entry depending on `topic` against the current
    /// environment, then notifies listeners.
    ///
    /// Provider events do this automatically; hosts that change the
    /// environment some other way can call it directly.
    pub fn publish(&self, topic: Topic) {
        self.shared.publish(topic);
    }

    /// Returns a copy of the current environment.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.shared.resolver.borrow().environment().clone()
    }

    /// Returns the number of entries re-evaluated when `topic` publishes.
    #[must_use]
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.shared.resolver.borrow().topics().len(topic)
    }

    /// Detaches the store from its dimensions and appearance providers.
    ///
    /// Calling it again does nothing. Dropping the last handle detaches too.
    pub fn destroy(&self) {
        self.shared.detach();
    }
}

impl fmt::Debug for StyleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleStore")
            .field("resolver", &*self.shared.resolver.borrow())
            .field("listeners", &self.shared.listeners)
            .field("providers", &self.shared.providers.borrow().len())
            .finish()
    }
}

/// Configuration for a [`StyleStore`].
///
/// Every setting is optional:
///
/// | Setting | Default |
/// |---|---|
/// | tables | empty |
/// | dimensions | [`ManualDimensions::default`] |
/// | appearance | [`ManualAppearance::default`] |
/// | platform | [`DEFAULT_PLATFORM`] |
/// | preprocessed | `false` |
/// | evaluator | [`NeverMatch`] |
/// | units | [`UnitRegistry::with_defaults`] |
/// | normalizer | [`normalize_selector`] |
pub struct StyleStoreBuilder {
    tables: StyleTables,
    units: UnitRegistry,
    evaluator: Box<dyn RuleEvaluator>,
    dimensions: Option<Box<dyn DimensionsProvider>>,
    appearance: Option<Box<dyn AppearanceProvider>>,
    platform: String,
    preprocessed: bool,
    normalize: fn(&str) -> String,
}

impl Default for StyleStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleStoreBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: StyleTables::default(),
            units: UnitRegistry::with_defaults(),
            evaluator: Box::new(NeverMatch),
            dimensions: None,
            appearance: None,
            platform: DEFAULT_PLATFORM.to_string(),
            preprocessed: false,
            normalize: normalize_selector,
        }
    }

    /// Sets both tables.
    #[must_use]
    pub fn tables(mut self, tables: StyleTables) -> Self {
        self.tables = tables;
        self
    }

    /// Sets the style table.
    #[must_use]
    pub fn styles(mut self, styles: StyleTable) -> Self {
        self.tables.styles = styles;
        self
    }

    /// Sets the media table.
    #[must_use]
    pub fn media(mut self, media: MediaTable) -> Self {
        self.tables.media = media;
        self
    }

    /// Sets the unit registry.
    #[must_use]
    pub fn units(mut self, units: UnitRegistry) -> Self {
        self.units = units;
        self
    }

    /// Sets the conditional-rule evaluator.
    #[must_use]
    pub fn evaluator(mut self, evaluator: impl RuleEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    /// Sets the dimensions provider.
    #[must_use]
    pub fn dimensions(mut self, dimensions: impl DimensionsProvider + 'static) -> Self {
        self.dimensions = Some(Box::new(dimensions));
        self
    }

    /// Sets the appearance provider.
    #[must_use]
    pub fn appearance(mut self, appearance: impl AppearanceProvider + 'static) -> Self {
        self.appearance = Some(Box::new(appearance));
        self
    }

    /// Sets the host platform identifier.
    #[must_use]
    pub fn platform(mut self, platform: &str) -> Self {
        self.platform = platform.to_string();
        self
    }

    /// Switches to precompiled mode.
    ///
    /// Class names then resolve to compiled markers that the rendering layer
    /// looks up itself; no table lookup or rule evaluation happens.
    #[must_use]
    pub fn preprocessed(mut self, preprocessed: bool) -> Self {
        self.preprocessed = preprocessed;
        self
    }

    /// Sets the token normalizer used for table lookups.
    #[must_use]
    pub fn normalizer(mut self, normalize: fn(&str) -> String) -> Self {
        self.normalize = normalize;
        self
    }

    /// Builds the store and attaches it to the providers.
    #[must_use]
    pub fn build(self) -> StyleStore {
        let dimensions = self
            .dimensions
            .unwrap_or_else(|| Box::new(ManualDimensions::default()));
        let appearance = self
            .appearance
            .unwrap_or_else(|| Box::new(ManualAppearance::default()));

        let screen = dimensions.get(DimensionKind::Screen);
        let env = Environment {
            platform: self.platform,
            window: dimensions.get(DimensionKind::Window),
            orientation: Orientation::of(&screen),
            color_scheme: appearance.color_scheme(),
        };
        tracing::debug!(?env, preprocessed = self.preprocessed, "creating style store");

        let shared = Rc::new(Shared {
            resolver: RefCell::new(Resolver::new(
                self.tables,
                self.units,
                self.evaluator,
                self.normalize,
                self.preprocessed,
                env,
            )),
            listeners: ListenerSet::default(),
            providers: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&shared);
        let on_dimensions = dimensions.add_change_listener(Box::new(
            move |change: &DimensionsChange| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_dimensions(change);
                }
            },
        ));
        let weak = Rc::downgrade(&shared);
        let on_appearance = appearance.add_change_listener(Box::new(
            move |change: &AppearanceChange| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_appearance(change);
                }
            },
        ));
        shared
            .providers
            .borrow_mut()
            .extend([on_dimensions, on_appearance]);

        StyleStore { shared }
    }
}

impl fmt::Debug for StyleStoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleStoreBuilder")
            .field("tables", &self.tables)
            .field("units", &self.units)
            .field("platform", &self.platform)
            .field("preprocessed", &self.preprocessed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{ColorScheme, ScaledSize};
    use crate::record::StyleRecord;
    use core::cell::Cell;

    #[test]
    fn environment_is_read_from_the_providers() {
        let dimensions = ManualDimensions::new(ScaledSize::new(320.0, 640.0), ScaledSize::new(900.0, 400.0));
        let store = StyleStore::builder()
            .dimensions(dimensions)
            .appearance(ManualAppearance::new(Some(ColorScheme::Dark)))
            .platform("android")
            .build();

        let env = store.environment();
        assert_eq!(env.platform, "android");
        assert_eq!(env.window.width, 320.0);
        assert_eq!(env.orientation, Orientation::Landscape);
        assert_eq!(env.color_scheme, Some(ColorScheme::Dark));
    }

    #[test]
    fn destroy_detaches_both_providers() {
        let dimensions = ManualDimensions::default();
        let appearance = ManualAppearance::default();
        let store = StyleStore::builder()
            .dimensions(dimensions.clone())
            .appearance(appearance.clone())
            .build();
        assert_eq!(dimensions.listener_count(), 1);
        assert_eq!(appearance.listener_count(), 1);

        store.destroy();
        store.destroy();
        assert_eq!(dimensions.listener_count(), 0);
        assert_eq!(appearance.listener_count(), 0);

        appearance.change(Some(ColorScheme::Dark));
        assert_eq!(store.environment().color_scheme, None);
    }

    #[test]
    fn dropping_the_store_detaches() {
        let appearance = ManualAppearance::default();
        let store = StyleStore::builder().appearance(appearance.clone()).build();
        let other = store.clone();
        drop(store);
        assert_eq!(appearance.listener_count(), 1);
        drop(other);
        assert_eq!(appearance.listener_count(), 0);
    }

    #[test]
    fn events_without_changes_notify_but_keep_the_snapshot() {
        let appearance = ManualAppearance::default();
        let store = StyleStore::builder()
            .styles(StyleTable::from([(
                "text-black".into(),
                StyleRecord::builder().set("color", "black").build(),
            )]))
            .appearance(appearance.clone())
            .build();
        store.style("text-black", Interaction::empty()).unwrap();

        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        store.subscribe(Rc::new(move || counter.set(counter.get() + 1)));

        let before = store.get_snapshot();
        appearance.change(Some(ColorScheme::Dark));
        assert_eq!(count.get(), 1);
        assert!(store.get_snapshot().ptr_eq(&before));
        store.publish(Topic::Window);
        assert_eq!(count.get(), 2);
        assert_eq!(store.environment().color_scheme, Some(ColorScheme::Dark));
    }

    #[test]
    fn resolving_a_class_name_composes_it() {
        let store = StyleStore::builder()
            .styles(StyleTable::from([
                ("a".into(), StyleRecord::builder().set("color", "black").build()),
                ("b".into(), StyleRecord::builder().set("opacity", 0.5).build()),
            ]))
            .build();
        let resolved = store.resolve("a b", Interaction::empty()).unwrap();
        assert_eq!(resolved.len(), 2);

        let selector = store.create_selector("a b", Interaction::empty()).unwrap();
        let selected = selector.select(&store.get_snapshot()).unwrap();
        assert!(selected.ptr_eq(&resolved));
        assert_eq!(store.resolve("a", Interaction::empty()).unwrap().len(), 1);
    }

    #[test]
    fn listeners_may_read_the_store() {
        let appearance = ManualAppearance::default();
        let store = StyleStore::builder()
            .evaluator(|rule: &str, _: Option<&str>, cx: &crate::RuleContext<'_>| {
                (rule == "media").then(|| cx.color_scheme() == Some(ColorScheme::Dark))
            })
            .media(MediaTable::from([(
                "dark_x".into(),
                alloc::vec![alloc::vec![crate::RawClause::media("(prefers-color-scheme: dark)")]],
            )]))
            .appearance(appearance.clone())
            .build();
        let selector = store.create_selector("dark:x", Interaction::empty()).unwrap();

        let seen = Rc::new(Cell::new(0_usize));
        let reader = store.clone();
        let out = seen.clone();
        let selector_in_listener = selector.clone();
        store.subscribe(Rc::new(move || {
            let snapshot = reader.get_snapshot();
            out.set(out.get() + usize::from(selector_in_listener.select(&snapshot).is_some()));
        }));

        assert_eq!(store.subscriber_count(Topic::ColorScheme), 1);
        appearance.change(Some(ColorScheme::Dark));
        assert_eq!(seen.get(), 1);
        store.notify();
        assert_eq!(seen.get(), 2);
    }
}
