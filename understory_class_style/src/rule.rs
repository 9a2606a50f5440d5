// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The conditional-rule evaluator seam.

use crate::environment::{ColorScheme, Environment, Orientation};
use crate::key::Interaction;

/// Everything a rule may be evaluated against.
#[derive(Copy, Clone, Debug)]
pub struct RuleContext<'a> {
    /// Current environment.
    pub environment: &'a Environment,
    /// Interaction state the entry was resolved for.
    pub interaction: Interaction,
}

impl<'a> RuleContext<'a> {
    /// Creates a context.
    #[must_use]
    pub fn new(environment: &'a Environment, interaction: Interaction) -> Self {
        Self {
            environment,
            interaction,
        }
    }

    /// Host platform identifier.
    #[must_use]
    pub fn platform(&self) -> &'a str {
        &self.environment.platform
    }

    /// Window width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.environment.window.width
    }

    /// Window height.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.environment.window.height
    }

    /// Screen orientation.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.environment.orientation
    }

    /// Color-scheme preference.
    #[must_use]
    pub fn color_scheme(&self) -> Option<ColorScheme> {
        self.environment.color_scheme
    }
}

/// Evaluates conditional rules such as `["media", "(min-width: 640px)"]`.
///
/// The result is tri-state: `Some(true)` matches, `Some(false)` does not, and
/// `None` means the evaluator does not understand the rule. Only `Some(true)`
/// counts as a match.
///
/// The child selector (`selector` with `(>` params) and unit directives
/// (`dynamic-style`) are handled by the store and never reach the evaluator.
///
/// Functions and closures with the matching signature are evaluators:
///
/// ```rust
/// use understory_class_style::{Interaction, RuleContext, RuleEvaluator};
/// # use understory_class_style::{Environment, Orientation, ScaledSize};
///
/// fn hover_only(rule: &str, params: Option<&str>, cx: &RuleContext<'_>) -> Option<bool> {
///     (rule == "pseudo-class" && params == Some("hover"))
///         .then(|| cx.interaction.contains(Interaction::HOVER))
/// }
/// # let env = Environment {
/// #     platform: "ios".into(),
/// #     window: ScaledSize::default(),
/// #     orientation: Orientation::Portrait,
/// #     color_scheme: None,
/// # };
/// let cx = RuleContext::new(&env, Interaction::HOVER);
/// assert_eq!(hover_only.evaluate("pseudo-class", Some("hover"), &cx), Some(true));
/// assert_eq!(hover_only.evaluate("media", Some("print"), &cx), None);
/// ```
pub trait RuleEvaluator {
    /// Evaluates one rule.
    fn evaluate(&self, rule: &str, params: Option<&str>, cx: &RuleContext<'_>) -> Option<bool>;
}

impl<F> RuleEvaluator for F
where
    F: Fn(&str, Option<&str>, &RuleContext<'_>) -> Option<bool>,
{
    fn evaluate(&self, rule: &str, params: Option<&str>, cx: &RuleContext<'_>) -> Option<bool> {
        self(rule, params, cx)
    }
}

/// An evaluator that understands no rule.
///
/// Every conditional variant stays unmatched; only base styles apply.
#[derive(Copy, Clone, Debug, Default)]
pub struct NeverMatch;

impl RuleEvaluator for NeverMatch {
    fn evaluate(&self, _rule: &str, _params: Option<&str>, _cx: &RuleContext<'_>) -> Option<bool> {
        None
    }
}
