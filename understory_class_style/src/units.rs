// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named unit converters.
//!
//! A clause-set carrying `["dynamic-style", "vw"]` has every value of its
//! variant style passed through the `vw` converter on each evaluation.
//! Conversion always produces a new record; the table's record is never
//! rewritten.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use core::fmt;

use hashbrown::HashMap;

use crate::environment::Environment;
use crate::error::StyleError;
use crate::record::{StyleRecord, StyleValue};
use crate::topic::Topics;

/// Converts one property value. `None` rejects the value.
pub type UnitConverter = Box<dyn Fn(&StyleValue, &Environment) -> Option<StyleValue>>;

struct Unit {
    topics: Topics,
    convert: UnitConverter,
}

/// Registry of named unit converters.
///
/// ```rust
/// use understory_class_style::{StyleValue, Topics, UnitRegistry};
///
/// let mut units = UnitRegistry::new();
/// units.register("half", Topics::empty(), |value, _env| {
///     value.as_number().map(|n| StyleValue::Number(n / 2.0))
/// });
/// assert!(units.contains("half"));
/// assert!(!units.contains("vw"));
/// assert!(UnitRegistry::with_defaults().contains("vw"));
/// ```
#[derive(Default)]
pub struct UnitRegistry {
    units: HashMap<String, Unit>,
}

impl UnitRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the viewport units `vw` and `vh`.
    ///
    /// Both accept numbers (`50` is half the window) and strings with or
    /// without the unit suffix (`"50vw"`, `"50"`), and depend on
    /// [`Topic::Window`](crate::Topic::Window).
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut units = Self::new();
        units.register("vw", Topics::WINDOW, |value, env| {
            viewport_fraction(value, "vw").map(|n| StyleValue::Number(n * env.window.width / 100.0))
        });
        units.register("vh", Topics::WINDOW, |value, env| {
            viewport_fraction(value, "vh").map(|n| StyleValue::Number(n * env.window.height / 100.0))
        });
        units
    }

    /// Registers (or replaces) a converter.
    ///
    /// `topics` lists the environment topics the converted values depend on;
    /// tokens using the unit are re-evaluated when those topics publish.
    pub fn register(
        &mut self,
        name: &str,
        topics: Topics,
        convert: impl Fn(&StyleValue, &Environment) -> Option<StyleValue> + 'static,
    ) {
        self.units.insert(
            name.to_string(),
            Unit {
                topics,
                convert: Box::new(convert),
            },
        );
    }

    /// Returns `true` if a converter named `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Returns the topics of a registered unit.
    #[must_use]
    pub fn topics(&self, name: &str) -> Option<Topics> {
        self.units.get(name).map(|unit| unit.topics)
    }

    /// Converts every value of `record` into a new record.
    pub fn convert(
        &self,
        name: &str,
        record: &StyleRecord,
        env: &Environment,
    ) -> Result<StyleRecord, StyleError> {
        let unit = self.units.get(name).ok_or_else(|| StyleError::UnknownUnit {
            unit: name.to_string(),
        })?;
        record.try_map_values(|property, value| {
            (unit.convert)(value, env).ok_or_else(|| StyleError::InvalidUnitValue {
                unit: name.to_string(),
                property: property.to_string(),
            })
        })
    }
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.units.keys()).finish()
    }
}

fn viewport_fraction(value: &StyleValue, suffix: &str) -> Option<f64> {
    match value {
        StyleValue::Number(n) => Some(*n),
        StyleValue::String(s) => {
            let s = s.trim();
            s.strip_suffix(suffix).unwrap_or(s).trim().parse().ok()
        }
        _ => None,
    }
}
