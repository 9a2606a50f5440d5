// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared style records.
//!
//! A [`StyleRecord`] is the unit handed to the rendering layer: an immutable
//! property map behind an `Rc`. Cloning a record shares it, and sharing is what
//! the store's change detection looks at (see [`StyleRecord::ptr_eq`]).

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde::Deserialize;

/// Property name under which compiled markers carry their flag.
pub const COMPILED_MARKER_FIELD: &str = "$$css";

/// A single style property value.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    /// A boolean flag.
    Bool(bool),
    /// A number (lengths, weights, opacities, ...).
    Number(f64),
    /// A string (colors, keywords, lengths with units, ...).
    String(String),
    /// A nested record (e.g. shadow offsets or transforms).
    Record(StyleRecord),
}

impl StyleValue {
    /// Returns the number, if this is a [`StyleValue::Number`].
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string, if this is a [`StyleValue::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for StyleValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<StyleRecord> for StyleValue {
    fn from(value: StyleRecord) -> Self {
        Self::Record(value)
    }
}

#[derive(Debug, Default, PartialEq)]
struct StyleRecordData {
    /// Sorted by name for binary search lookup.
    properties: Vec<(Box<str>, StyleValue)>,
    for_children: bool,
}

/// An immutable, shared map from style property names to values.
///
/// Equality (`==`) compares contents. Identity, which is what cached style
/// arrays are compared by, is checked with [`StyleRecord::ptr_eq`].
///
/// ```rust
/// use understory_class_style::StyleRecord;
///
/// let black = StyleRecord::builder().set("color", "black").build();
/// let shared = black.clone();
/// let copy = StyleRecord::builder().set("color", "black").build();
///
/// assert!(black.ptr_eq(&shared));
/// assert_eq!(black, copy);
/// assert!(!black.ptr_eq(&copy));
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(from = "BTreeMap<String, StyleValue>")]
pub struct StyleRecord {
    inner: Rc<StyleRecordData>,
}

impl StyleRecord {
    /// Returns a builder for a new record.
    #[must_use]
    pub fn builder() -> StyleRecordBuilder {
        StyleRecordBuilder::default()
    }

    /// Builds the marker record used in precompiled mode.
    ///
    /// The marker has shape `{ "$$css": true, <key>: <key> }`; the rendering
    /// layer resolves `key` against its platform-compiled styles.
    #[must_use]
    pub fn compiled(key: &str) -> Self {
        Self::builder()
            .set(COMPILED_MARKER_FIELD, true)
            .set(key, key)
            .build()
    }

    /// Returns `true` if this is a precompiled marker record.
    #[must_use]
    pub fn is_compiled(&self) -> bool {
        matches!(self.get(COMPILED_MARKER_FIELD), Some(StyleValue::Bool(true)))
    }

    /// Returns `true` if this record is relayed to child elements.
    #[must_use]
    #[inline]
    pub fn is_for_children(&self) -> bool {
        self.inner.for_children
    }

    /// Returns `true` if both handles share the same allocation.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns `true` if the record has no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.properties.is_empty()
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.properties.len()
    }

    /// Gets a property value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StyleValue> {
        self.inner
            .properties
            .binary_search_by(|(key, _)| (**key).cmp(name))
            .ok()
            .map(|idx| &self.inner.properties[idx].1)
    }

    /// Iterates properties in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> + '_ {
        self.inner.properties.iter().map(|(k, v)| (&**k, v))
    }

    /// Returns a copy of this record marked as child-directed.
    #[must_use]
    pub fn to_child_style(&self) -> Self {
        Self {
            inner: Rc::new(StyleRecordData {
                properties: self.inner.properties.clone(),
                for_children: true,
            }),
        }
    }

    /// Builds a new record by passing every value through `convert`.
    ///
    /// The receiver is left untouched. The child-directed flag carries over.
    pub fn try_map_values<E>(
        &self,
        mut convert: impl FnMut(&str, &StyleValue) -> Result<StyleValue, E>,
    ) -> Result<Self, E> {
        let properties = self
            .inner
            .properties
            .iter()
            .map(|(name, value)| Ok((name.clone(), convert(name, value)?)))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Self {
            inner: Rc::new(StyleRecordData {
                properties,
                for_children: self.inner.for_children,
            }),
        })
    }
}

impl PartialEq for StyleRecord {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.inner == *other.inner
    }
}

impl fmt::Debug for StyleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        map.entries(self.iter());
        if self.inner.for_children {
            map.entry(&"<for children>", &true);
        }
        map.finish()
    }
}

impl From<BTreeMap<String, StyleValue>> for StyleRecord {
    fn from(map: BTreeMap<String, StyleValue>) -> Self {
        Self {
            inner: Rc::new(StyleRecordData {
                properties: map
                    .into_iter()
                    .map(|(k, v)| (k.into_boxed_str(), v))
                    .collect(),
                for_children: false,
            }),
        }
    }
}

/// Builder for [`StyleRecord`].
#[derive(Debug, Default)]
pub struct StyleRecordBuilder {
    properties: Vec<(Box<str>, StyleValue)>,
}

impl StyleRecordBuilder {
    /// Sets a property, replacing an earlier value of the same name.
    #[must_use]
    pub fn set(mut self, name: &str, value: impl Into<StyleValue>) -> Self {
        let value = value.into();
        match self
            .properties
            .binary_search_by(|(key, _)| (**key).cmp(name))
        {
            Ok(idx) => self.properties[idx].1 = value,
            Err(idx) => self.properties.insert(idx, (name.into(), value)),
        }
        self
    }

    /// Builds the record.
    #[must_use]
    pub fn build(self) -> StyleRecord {
        StyleRecord {
            inner: Rc::new(StyleRecordData {
                properties: self.properties,
                for_children: false,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_properties_sorted() {
        let record = StyleRecord::builder()
            .set("marginTop", 4.0)
            .set("color", "red")
            .set("marginTop", 8.0)
            .build();

        let names: Vec<_> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["color", "marginTop"]);
        assert_eq!(record.get("marginTop"), Some(&StyleValue::Number(8.0)));
        assert_eq!(record.get("padding"), None);
    }

    #[test]
    fn compiled_marker_shape() {
        let marker = StyleRecord::compiled("text-black");
        assert!(marker.is_compiled());
        assert_eq!(marker.len(), 2);
        assert_eq!(
            marker.get("text-black"),
            Some(&StyleValue::String("text-black".into()))
        );
        assert!(!StyleRecord::builder().set("color", "black").build().is_compiled());
    }

    #[test]
    fn mapping_values_leaves_the_source_untouched() {
        let source = StyleRecord::builder().set("width", 50.0).build();
        let doubled = source
            .try_map_values(|_, value| {
                Ok::<_, ()>(StyleValue::Number(value.as_number().unwrap_or(0.0) * 2.0))
            })
            .unwrap();

        assert_eq!(source.get("width"), Some(&StyleValue::Number(50.0)));
        assert_eq!(doubled.get("width"), Some(&StyleValue::Number(100.0)));
        assert!(!source.ptr_eq(&doubled));
    }

    #[test]
    fn child_styles_are_distinct_records() {
        let gap = StyleRecord::builder().set("marginLeft", 2.0).build();
        let child = gap.to_child_style();
        assert!(child.is_for_children());
        assert!(!gap.is_for_children());
        assert_ne!(gap, child);
    }

    #[test]
    fn deserializes_nested_values() {
        let record: StyleRecord = serde_json::from_str(
            r#"{ "color": "black", "opacity": 0.5, "shadowOffset": { "width": 1, "height": 2 } }"#,
        )
        .unwrap();

        assert_eq!(record.get("opacity"), Some(&StyleValue::Number(0.5)));
        let Some(StyleValue::Record(offset)) = record.get("shadowOffset") else {
            panic!("expected a nested record");
        };
        assert_eq!(offset.get("height"), Some(&StyleValue::Number(2.0)));
    }
}
