// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cache keys and interaction state.

use alloc::rc::Rc;
use alloc::string::String;
use core::borrow::Borrow;
use core::fmt;
use core::ops::Deref;

bitflags::bitflags! {
    /// Interaction state of an element and of its enclosing component.
    ///
    /// The empty set is the default: nothing hovered, pressed or focused.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Interaction: u8 {
        /// The element is hovered.
        const HOVER             = 0b0000_0001;
        /// The element is pressed.
        const ACTIVE            = 0b0000_0010;
        /// The element has focus.
        const FOCUS             = 0b0000_0100;
        /// The enclosing component is hovered.
        const COMPONENT_HOVER   = 0b0000_1000;
        /// The enclosing component is pressed.
        const COMPONENT_ACTIVE  = 0b0001_0000;
        /// The enclosing component has focus.
        const COMPONENT_FOCUS   = 0b0010_0000;
    }
}

impl Interaction {
    /// Key digit order.
    const KEY_ORDER: [Self; 6] = [
        Self::HOVER,
        Self::ACTIVE,
        Self::FOCUS,
        Self::COMPONENT_HOVER,
        Self::COMPONENT_ACTIVE,
        Self::COMPONENT_FOCUS,
    ];

    fn push_digits(self, out: &mut String) {
        for flag in Self::KEY_ORDER {
            out.push(if self.contains(flag) { '1' } else { '0' });
        }
    }
}

/// A cheaply clonable snapshot key.
///
/// Keys borrow as `str`, so snapshots can be queried with plain string slices.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Rc<str>);

impl CacheKey {
    /// Returns the key text.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for CacheKey {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(Rc::from(value))
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self(Rc::from(value))
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the snapshot key for a class token (or whole class name).
///
/// In precompiled mode the class name is the key; precompiled tables already
/// carry every interaction variant. Otherwise the key is the class name, a
/// `.` and one `0`/`1` digit per interaction flag, in the order hover, active,
/// focus, component hover, component active, component focus.
///
/// ```rust
/// use understory_class_style::{Interaction, cache_key};
///
/// let key = cache_key("text-black", Interaction::HOVER | Interaction::COMPONENT_FOCUS, false);
/// assert_eq!(key.as_str(), "text-black.100001");
///
/// let key = cache_key("text-black", Interaction::HOVER, true);
/// assert_eq!(key.as_str(), "text-black");
/// ```
#[must_use]
pub fn cache_key(class_name: &str, interaction: Interaction, precompiled: bool) -> CacheKey {
    if precompiled {
        return CacheKey::from(class_name);
    }
    let mut key = String::with_capacity(class_name.len() + 7);
    key.push_str(class_name);
    key.push('.');
    interaction.push_digits(&mut key);
    CacheKey::from(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_interaction_is_all_zeros() {
        let key = cache_key("p-4", Interaction::default(), false);
        assert_eq!(key.as_str(), "p-4.000000");
    }

    #[test]
    fn every_flag_has_its_own_digit() {
        let cases = [
            (Interaction::HOVER, "a.100000"),
            (Interaction::ACTIVE, "a.010000"),
            (Interaction::FOCUS, "a.001000"),
            (Interaction::COMPONENT_HOVER, "a.000100"),
            (Interaction::COMPONENT_ACTIVE, "a.000010"),
            (Interaction::COMPONENT_FOCUS, "a.000001"),
            (Interaction::all(), "a.111111"),
        ];
        for (interaction, expected) in cases {
            assert_eq!(cache_key("a", interaction, false).as_str(), expected);
        }
    }

    #[test]
    fn precompiled_keys_ignore_interaction() {
        let plain = cache_key("text-black font-bold", Interaction::empty(), true);
        let hovered = cache_key("text-black font-bold", Interaction::HOVER, true);
        assert_eq!(plain, hovered);
        assert_eq!(plain.as_str(), "text-black font-bold");
    }

    #[test]
    fn keys_borrow_as_str() {
        let mut map = hashbrown::HashMap::new();
        map.insert(cache_key("a", Interaction::empty(), false), 1);
        assert_eq!(map.get("a.000000"), Some(&1));
    }
}
