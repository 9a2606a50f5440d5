// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resolved style arrays.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use crate::record::StyleRecord;

#[derive(Debug, Default, PartialEq)]
struct StyleArrayData {
    styles: Vec<StyleRecord>,
    child_styles: Vec<StyleRecord>,
    dynamic: bool,
}

/// The resolved styles for one cache key.
///
/// A style array is immutable and shared. The store replaces an entry's array
/// only when its contents change, so consumers can skip work whenever the
/// array they hold is still the one in the snapshot ([`StyleArray::ptr_eq`])
/// or holds the same records ([`is_equal`]).
#[derive(Clone, Default, PartialEq)]
pub struct StyleArray {
    inner: Rc<StyleArrayData>,
}

impl StyleArray {
    pub(crate) fn new(styles: Vec<StyleRecord>, child_styles: Vec<StyleRecord>, dynamic: bool) -> Self {
        Self {
            inner: Rc::new(StyleArrayData {
                styles,
                child_styles,
                dynamic,
            }),
        }
    }

    /// Builds a static array.
    #[must_use]
    pub fn from_styles(styles: Vec<StyleRecord>) -> Self {
        Self::new(styles, Vec::new(), false)
    }

    /// The singleton array used in precompiled mode.
    #[must_use]
    pub fn compiled(key: &str) -> Self {
        Self::from_styles(alloc::vec![StyleRecord::compiled(key)])
    }

    /// Concatenates arrays in order.
    ///
    /// The result is dynamic if any part is dynamic.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a Self>) -> Self {
        let mut styles = Vec::new();
        let mut child_styles = Vec::new();
        let mut dynamic = false;
        for part in parts {
            styles.extend(part.inner.styles.iter().cloned());
            child_styles.extend(part.inner.child_styles.iter().cloned());
            dynamic |= part.inner.dynamic;
        }
        Self::new(styles, child_styles, dynamic)
    }

    /// Returns the records applied to the element itself.
    #[must_use]
    #[inline]
    pub fn styles(&self) -> &[StyleRecord] {
        &self.inner.styles
    }

    /// Returns the records relayed to child elements, if any.
    #[must_use]
    pub fn child_styles(&self) -> Option<&[StyleRecord]> {
        if self.inner.child_styles.is_empty() {
            None
        } else {
            Some(&self.inner.child_styles)
        }
    }

    /// Returns `true` if the array depends on environment state.
    #[must_use]
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.inner.dynamic
    }

    /// Returns the number of records applied to the element.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.styles.len()
    }

    /// Returns `true` if no records apply to the element.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.styles.is_empty()
    }

    /// Iterates the records applied to the element.
    pub fn iter(&self) -> core::slice::Iter<'_, StyleRecord> {
        self.inner.styles.iter()
    }

    /// Returns `true` if both handles share the same allocation.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Identity comparison covering child styles as well.
    pub(crate) fn same_records(&self, other: &Self) -> bool {
        is_equal(self, other)
            && same_elements(&self.inner.child_styles, &other.inner.child_styles)
    }
}

impl<'a> IntoIterator for &'a StyleArray {
    type Item = &'a StyleRecord;
    type IntoIter = core::slice::Iter<'a, StyleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for StyleArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleArray")
            .field("styles", &self.inner.styles)
            .field("child_styles", &self.inner.child_styles)
            .field("dynamic", &self.inner.dynamic)
            .finish()
    }
}

fn same_elements(a: &[StyleRecord], b: &[StyleRecord]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.ptr_eq(b))
}

/// Returns `true` if both arrays hold the same record objects in the same order.
///
/// Records are compared by identity, never by value. Two distinct empty arrays
/// are equal.
///
/// ```rust
/// use understory_class_style::{StyleArray, StyleRecord, is_equal};
///
/// let black = StyleRecord::builder().set("color", "black").build();
/// let a = StyleArray::from_styles(vec![black.clone()]);
/// let b = StyleArray::from_styles(vec![black]);
/// assert!(is_equal(&a, &b));
///
/// let lookalike = StyleRecord::builder().set("color", "black").build();
/// let c = StyleArray::from_styles(vec![lookalike]);
/// assert!(!is_equal(&a, &c));
/// ```
#[must_use]
pub fn is_equal(a: &StyleArray, b: &StyleArray) -> bool {
    same_elements(a.styles(), b.styles())
}
