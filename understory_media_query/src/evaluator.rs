// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The default rule evaluator.

use std::cell::RefCell;

use hashbrown::HashMap;
use understory_class_style::{Interaction, RuleContext, RuleEvaluator};

use crate::query::MediaQueryList;

/// Evaluates `media`, `pseudo-class` and `component` rules.
///
/// | Rule | Params | Matches when |
/// |---|---|---|
/// | `media` | a media query list | the query holds for the window, orientation, color scheme and platform |
/// | `pseudo-class` | `hover`, `active`, `focus` | the element is in that state |
/// | `component` | `hover`, `active`, `focus` | the enclosing component is in that state |
///
/// Every other rule, and every query that does not parse, is undefined
/// (`None`). Parsed queries are cached by their source text; unparseable ones
/// are cached too and logged once.
#[derive(Debug, Default)]
pub struct MediaQueryEvaluator {
    queries: RefCell<HashMap<String, Option<MediaQueryList>>>,
}

impl MediaQueryEvaluator {
    /// Creates an evaluator with an empty query cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of distinct query strings seen so far.
    #[must_use]
    pub fn cached_queries(&self) -> usize {
        self.queries.borrow().len()
    }

    fn media(&self, source: &str, cx: &RuleContext<'_>) -> Option<bool> {
        let mut queries = self.queries.borrow_mut();
        if !queries.contains_key(source) {
            let parsed = match MediaQueryList::parse(source) {
                Ok(query) => Some(query),
                Err(err) => {
                    tracing::trace!(query = source, %err, "ignoring unparseable media query");
                    None
                }
            };
            queries.insert(source.into(), parsed);
        }
        queries.get(source)?.as_ref().map(|query| query.matches(cx))
    }
}

impl RuleEvaluator for MediaQueryEvaluator {
    fn evaluate(&self, rule: &str, params: Option<&str>, cx: &RuleContext<'_>) -> Option<bool> {
        let params = params?;
        match rule {
            "media" => self.media(params, cx),
            "pseudo-class" => {
                interaction_flag(params, [Interaction::HOVER, Interaction::ACTIVE, Interaction::FOCUS])
                    .map(|flag| cx.interaction.contains(flag))
            }
            "component" => interaction_flag(
                params,
                [
                    Interaction::COMPONENT_HOVER,
                    Interaction::COMPONENT_ACTIVE,
                    Interaction::COMPONENT_FOCUS,
                ],
            )
            .map(|flag| cx.interaction.contains(flag)),
            _ => None,
        }
    }
}

/// Maps `hover`/`active`/`focus` (with or without a leading `:`) onto `flags`.
fn interaction_flag(params: &str, [hover, active, focus]: [Interaction; 3]) -> Option<Interaction> {
    match params.trim().trim_start_matches(':') {
        "hover" => Some(hover),
        "active" => Some(active),
        "focus" => Some(focus),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use understory_class_style::{ColorScheme, Environment, Orientation, ScaledSize};

    fn env() -> Environment {
        Environment {
            platform: "web".into(),
            window: ScaledSize::new(1280.0, 720.0),
            orientation: Orientation::Landscape,
            color_scheme: Some(ColorScheme::Light),
        }
    }

    #[test]
    fn media_rules_match_the_environment() {
        let evaluator = MediaQueryEvaluator::new();
        let env = env();
        let cx = RuleContext::new(&env, Interaction::empty());
        assert_eq!(evaluator.evaluate("media", Some("(min-width: 1024px)"), &cx), Some(true));
        assert_eq!(evaluator.evaluate("media", Some("(prefers-color-scheme: dark)"), &cx), Some(false));
        assert_eq!(evaluator.evaluate("media", Some("web"), &cx), Some(true));
        assert_eq!(evaluator.evaluate("media", None, &cx), None);
    }

    #[test]
    fn unparseable_queries_are_undefined_and_cached() {
        let evaluator = MediaQueryEvaluator::new();
        let env = env();
        let cx = RuleContext::new(&env, Interaction::empty());
        assert_eq!(evaluator.evaluate("media", Some("(min-width:"), &cx), None);
        assert_eq!(evaluator.evaluate("media", Some("(min-width:"), &cx), None);
        assert_eq!(evaluator.evaluate("media", Some("(min-width: 1px)"), &cx), Some(true));
        assert_eq!(evaluator.cached_queries(), 2);
    }

    #[test]
    fn interaction_rules_read_the_matching_flags() {
        let evaluator = MediaQueryEvaluator::new();
        let env = env();
        let element = RuleContext::new(&env, Interaction::HOVER | Interaction::COMPONENT_FOCUS);

        assert_eq!(evaluator.evaluate("pseudo-class", Some("hover"), &element), Some(true));
        assert_eq!(evaluator.evaluate("pseudo-class", Some(":focus"), &element), Some(false));
        assert_eq!(evaluator.evaluate("component", Some("focus"), &element), Some(true));
        assert_eq!(evaluator.evaluate("component", Some("hover"), &element), Some(false));
        assert_eq!(evaluator.evaluate("pseudo-class", Some("visited"), &element), None);
    }

    #[test]
    fn other_rules_are_undefined() {
        let evaluator = MediaQueryEvaluator::new();
        let env = env();
        let cx = RuleContext::new(&env, Interaction::empty());
        assert_eq!(evaluator.evaluate("selector", Some(":first-child"), &cx), None);
        assert_eq!(evaluator.evaluate("supports", Some("(display: grid)"), &cx), None);
    }
}
