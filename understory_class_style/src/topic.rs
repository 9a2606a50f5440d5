// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Environment topics and their subscribers.

use core::hash::Hash;

use hashbrown::HashSet;

/// A category of environment state that conditional rules depend on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Window size and screen orientation.
    Window,
    /// Color-scheme preference.
    ColorScheme,
}

impl Topic {
    /// Every topic.
    pub const ALL: [Self; 2] = [Self::Window, Self::ColorScheme];

    /// Returns the topic name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Window => "window",
            Self::ColorScheme => "colorScheme",
        }
    }

    /// Converts this topic into a single-element [`Topics`] set.
    #[must_use]
    pub const fn into_set(self) -> Topics {
        match self {
            Self::Window => Topics::WINDOW,
            Self::ColorScheme => Topics::COLOR_SCHEME,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Window => 0,
            Self::ColorScheme => 1,
        }
    }
}

bitflags::bitflags! {
    /// A set of [`Topic`]s.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Topics: u8 {
        /// [`Topic::Window`].
        const WINDOW       = 0b01;
        /// [`Topic::ColorScheme`].
        const COLOR_SCHEME = 0b10;
    }
}

impl Topics {
    /// Derives the topics a media query depends on from its feature names.
    ///
    /// ```rust
    /// use understory_class_style::Topics;
    ///
    /// assert_eq!(Topics::of_media_query("(min-width: 640px)"), Topics::WINDOW);
    /// assert_eq!(
    ///     Topics::of_media_query("(prefers-color-scheme: dark) and (orientation: landscape)"),
    ///     Topics::WINDOW | Topics::COLOR_SCHEME,
    /// );
    /// assert_eq!(Topics::of_media_query("ios"), Topics::empty());
    /// ```
    #[must_use]
    pub fn of_media_query(query: &str) -> Self {
        let mut topics = Self::empty();
        if ["width", "height", "orientation", "aspect-ratio"]
            .iter()
            .any(|feature| query.contains(feature))
        {
            topics |= Self::WINDOW;
        }
        if query.contains("prefers-color-scheme") {
            topics |= Self::COLOR_SCHEME;
        }
        topics
    }

    /// Iterates the topics in this set.
    pub fn topics(self) -> impl Iterator<Item = Topic> {
        Topic::ALL
            .into_iter()
            .filter(move |topic| self.contains(topic.into_set()))
    }
}

impl From<Topic> for Topics {
    fn from(topic: Topic) -> Self {
        topic.into_set()
    }
}

/// Maps each topic to the set of subscribers depending on it.
///
/// Subscribers are keys (typically cache keys) whose value must be recomputed
/// when the topic publishes. Subscription has set semantics.
///
/// ```rust
/// use understory_class_style::{Topic, TopicRegistry};
///
/// let mut registry = TopicRegistry::new();
/// assert!(registry.subscribe(Topic::Window, "container"));
/// assert!(!registry.subscribe(Topic::Window, "container"));
/// registry.subscribe(Topic::ColorScheme, "dark_text-black");
///
/// let mut seen = Vec::new();
/// registry.publish(Topic::Window, |key| seen.push(*key));
/// assert_eq!(seen, ["container"]);
/// ```
#[derive(Clone, Debug)]
pub struct TopicRegistry<K> {
    subscribers: [HashSet<K>; 2],
}

impl<K> Default for TopicRegistry<K> {
    fn default() -> Self {
        Self {
            subscribers: [HashSet::new(), HashSet::new()],
        }
    }
}

impl<K: Eq + Hash> TopicRegistry<K> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `key` to `topic`.
    ///
    /// Returns `true` if the key was not subscribed yet.
    pub fn subscribe(&mut self, topic: Topic, key: K) -> bool {
        self.subscribers[topic.index()].insert(key)
    }

    /// Returns `true` if `key` is subscribed to `topic`.
    #[must_use]
    pub fn is_subscribed(&self, topic: Topic, key: &K) -> bool {
        self.subscribers[topic.index()].contains(key)
    }

    /// Returns the number of subscribers of `topic`.
    #[must_use]
    pub fn len(&self, topic: Topic) -> usize {
        self.subscribers[topic.index()].len()
    }

    /// Returns `true` if no topic has subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.iter().all(HashSet::is_empty)
    }

    /// Iterates the subscribers of `topic` in unspecified order.
    pub fn subscribers(&self, topic: Topic) -> impl Iterator<Item = &K> + '_ {
        self.subscribers[topic.index()].iter()
    }

    /// Invokes `callback` once per subscriber of `topic`.
    ///
    /// Returns the number of subscribers visited.
    pub fn publish(&self, topic: Topic, mut callback: impl FnMut(&K)) -> usize {
        let subscribers = &self.subscribers[topic.index()];
        for key in subscribers {
            callback(key);
        }
        subscribers.len()
    }
}
