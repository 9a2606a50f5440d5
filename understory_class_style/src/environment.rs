// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Environment state and providers.
//!
//! The store reads viewport dimensions and the color-scheme preference from
//! two providers and listens to their change events. Hosts implement
//! [`DimensionsProvider`] and [`AppearanceProvider`] over their platform APIs;
//! [`ManualDimensions`] and [`ManualAppearance`] are in-memory providers for
//! hosts that push changes themselves (and for tests).

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

/// Size of a window or screen.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScaledSize {
    /// Width in logical pixels.
    pub width: f64,
    /// Height in logical pixels.
    pub height: f64,
    /// Device pixel ratio.
    pub scale: f64,
    /// Font scale factor.
    pub font_scale: f64,
}

impl ScaledSize {
    /// Creates a size with unit scale factors.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scale: 1.0,
            font_scale: 1.0,
        }
    }
}

impl Default for ScaledSize {
    /// A 750×1334 portrait phone at 2× scale.
    fn default() -> Self {
        Self {
            width: 750.0,
            height: 1334.0,
            scale: 2.0,
            font_scale: 2.0,
        }
    }
}

/// Screen orientation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Height is at least the width.
    #[default]
    Portrait,
    /// Width exceeds height.
    Landscape,
}

impl Orientation {
    /// Derives the orientation of a screen.
    #[must_use]
    pub fn of(screen: &ScaledSize) -> Self {
        if screen.height >= screen.width {
            Self::Portrait
        } else {
            Self::Landscape
        }
    }

    /// Returns the media-query keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

/// Color-scheme preference.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    /// Light appearance.
    Light,
    /// Dark appearance.
    Dark,
}

impl ColorScheme {
    /// Parses `light` or `dark`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// Returns the media-query keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Which size a [`DimensionsProvider`] reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    /// The application window.
    Window,
    /// The physical screen.
    Screen,
}

/// Payload of a dimensions change event.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct DimensionsChange {
    /// New window size.
    pub window: ScaledSize,
    /// New screen size.
    pub screen: ScaledSize,
}

/// Payload of an appearance change event.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AppearanceChange {
    /// New preference, `None` when the platform reports none.
    pub color_scheme: Option<ColorScheme>,
}

/// Callback registered with a [`DimensionsProvider`].
pub type DimensionsListener = Box<dyn Fn(&DimensionsChange)>;

/// Callback registered with an [`AppearanceProvider`].
pub type AppearanceListener = Box<dyn Fn(&AppearanceChange)>;

/// Source of window and screen dimensions.
pub trait DimensionsProvider {
    /// Returns the current size of the window or screen.
    fn get(&self, kind: DimensionKind) -> ScaledSize;

    /// Registers a change listener.
    fn add_change_listener(&self, listener: DimensionsListener) -> ProviderSubscription;
}

/// Source of the color-scheme preference.
pub trait AppearanceProvider {
    /// Returns the current preference.
    fn color_scheme(&self) -> Option<ColorScheme>;

    /// Registers a change listener.
    fn add_change_listener(&self, listener: AppearanceListener) -> ProviderSubscription;
}

/// Handle to a listener registered with a provider.
pub struct ProviderSubscription {
    remove: Option<Box<dyn FnOnce()>>,
}

impl ProviderSubscription {
    /// Wraps the provider's removal routine.
    #[must_use]
    pub fn new(remove: impl FnOnce() + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// A subscription with nothing to remove, for providers that never change.
    #[must_use]
    pub fn detached() -> Self {
        Self { remove: None }
    }

    /// Detaches the listener from its provider.
    pub fn remove(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl fmt::Debug for ProviderSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSubscription")
            .field("attached", &self.remove.is_some())
            .finish()
    }
}

/// The environment conditional rules are evaluated against.
#[derive(Clone, Debug, PartialEq)]
pub struct Environment {
    /// Host platform identifier (`ios`, `android`, `web`, ...).
    pub platform: String,
    /// Current window size.
    pub window: ScaledSize,
    /// Orientation of the screen.
    pub orientation: Orientation,
    /// Current color-scheme preference.
    pub color_scheme: Option<ColorScheme>,
}

impl Environment {
    pub(crate) fn apply_dimensions(&mut self, change: &DimensionsChange) {
        self.window = change.window;
        self.orientation = Orientation::of(&change.screen);
    }
}

type Callback<T> = Rc<dyn Fn(&T)>;

struct EmitterState<T: 'static> {
    next_id: u64,
    listeners: Vec<(u64, Callback<T>)>,
}

/// A listener list shared by the manual providers.
struct Emitter<T: 'static> {
    state: Rc<RefCell<EmitterState<T>>>,
}

impl<T: 'static> Emitter<T> {
    fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(EmitterState {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    fn add(&self, listener: Box<dyn Fn(&T)>) -> ProviderSubscription {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state.listeners.push((id, Rc::from(listener)));
            id
        };
        let weak: Weak<RefCell<EmitterState<T>>> = Rc::downgrade(&self.state);
        ProviderSubscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().listeners.retain(|(other, _)| *other != id);
            }
        })
    }

    fn emit(&self, event: &T) {
        // Listeners may add or remove listeners while running.
        let listeners: Vec<Callback<T>> = self
            .state
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    fn len(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

impl<T: 'static> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

/// In-memory dimensions provider driven by the host.
///
/// Clones share state, so one clone can be handed to the store while another
/// pushes changes.
///
/// ```rust
/// use understory_class_style::{DimensionKind, DimensionsProvider, ManualDimensions, ScaledSize};
///
/// let dimensions = ManualDimensions::default();
/// assert_eq!(dimensions.get(DimensionKind::Window).width, 750.0);
///
/// dimensions.set_window(ScaledSize::new(1024.0, 768.0));
/// assert_eq!(dimensions.get(DimensionKind::Screen).width, 1024.0);
/// ```
#[derive(Clone)]
pub struct ManualDimensions {
    sizes: Rc<RefCell<DimensionsChange>>,
    emitter: Emitter<DimensionsChange>,
}

impl ManualDimensions {
    /// Creates a provider with the given window and screen sizes.
    #[must_use]
    pub fn new(window: ScaledSize, screen: ScaledSize) -> Self {
        Self {
            sizes: Rc::new(RefCell::new(DimensionsChange { window, screen })),
            emitter: Emitter::new(),
        }
    }

    /// Replaces both sizes and notifies listeners.
    pub fn change(&self, change: DimensionsChange) {
        *self.sizes.borrow_mut() = change;
        self.emitter.emit(&change);
    }

    /// Sets window and screen to the same size and notifies listeners.
    pub fn set_window(&self, size: ScaledSize) {
        self.change(DimensionsChange {
            window: size,
            screen: size,
        });
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.emitter.len()
    }
}

impl Default for ManualDimensions {
    fn default() -> Self {
        Self::new(ScaledSize::default(), ScaledSize::default())
    }
}

impl DimensionsProvider for ManualDimensions {
    fn get(&self, kind: DimensionKind) -> ScaledSize {
        let sizes = self.sizes.borrow();
        match kind {
            DimensionKind::Window => sizes.window,
            DimensionKind::Screen => sizes.screen,
        }
    }

    fn add_change_listener(&self, listener: DimensionsListener) -> ProviderSubscription {
        self.emitter.add(listener)
    }
}

impl fmt::Debug for ManualDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualDimensions")
            .field("sizes", &*self.sizes.borrow())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// In-memory appearance provider driven by the host.
///
/// Clones share state.
#[derive(Clone)]
pub struct ManualAppearance {
    color_scheme: Rc<RefCell<Option<ColorScheme>>>,
    emitter: Emitter<AppearanceChange>,
}

impl ManualAppearance {
    /// Creates a provider with an initial preference.
    #[must_use]
    pub fn new(color_scheme: Option<ColorScheme>) -> Self {
        Self {
            color_scheme: Rc::new(RefCell::new(color_scheme)),
            emitter: Emitter::new(),
        }
    }

    /// Changes the preference and notifies listeners.
    pub fn change(&self, color_scheme: Option<ColorScheme>) {
        *self.color_scheme.borrow_mut() = color_scheme;
        self.emitter.emit(&AppearanceChange { color_scheme });
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.emitter.len()
    }
}

impl Default for ManualAppearance {
    fn default() -> Self {
        Self::new(None)
    }
}

impl AppearanceProvider for ManualAppearance {
    fn color_scheme(&self) -> Option<ColorScheme> {
        *self.color_scheme.borrow()
    }

    fn add_change_listener(&self, listener: AppearanceListener) -> ProviderSubscription {
        self.emitter.add(listener)
    }
}

impl fmt::Debug for ManualAppearance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualAppearance")
            .field("color_scheme", &*self.color_scheme.borrow())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
