// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compiled clause-sets of dynamic tokens.
//!
//! A token's media entry is compiled once, on its first resolution, into a
//! closed set of clause kinds. Only [`Clause::Rule`] reaches the external
//! evaluator.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::ToString;
use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::error::StyleError;
use crate::record::StyleRecord;
use crate::rule::{RuleContext, RuleEvaluator};
use crate::tables::{RawClause, StyleTable};
use crate::topic::Topics;
use crate::units::UnitRegistry;

/// Rule name of child selectors.
const SELECTOR_RULE: &str = "selector";
/// Child selectors look like `(> *)` or `(> *:not(:first-child))`.
const CHILD_COMBINATOR: &str = "(>";
/// Rule name of unit directives.
const UNIT_RULE: &str = "dynamic-style";
/// Rule name of media queries.
const MEDIA_RULE: &str = "media";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Clause {
    /// Routes the variant to child elements; always satisfied.
    Children,
    /// Converts the variant through a named unit; always satisfied.
    Unit,
    /// Delegated to the rule evaluator.
    Rule {
        name: Box<str>,
        params: Option<Box<str>>,
    },
}

#[derive(Debug)]
pub(crate) struct ClauseSet {
    clauses: SmallVec<[Clause; 2]>,
    /// Variant style, already marked child-directed when relayed to children.
    pub(crate) variant: Option<StyleRecord>,
    pub(crate) unit: Option<Box<str>>,
    pub(crate) for_children: bool,
}

impl ClauseSet {
    /// Every clause must match; evaluation stops at the first miss.
    pub(crate) fn matches(&self, evaluator: &dyn RuleEvaluator, cx: &RuleContext<'_>) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Children | Clause::Unit => true,
            Clause::Rule { name, params } => {
                evaluator.evaluate(name, params.as_deref(), cx) == Some(true)
            }
        })
    }
}

/// The compiled media entry of one normalized token.
#[derive(Debug)]
pub(crate) struct CompiledMedia {
    pub(crate) sets: Vec<ClauseSet>,
    pub(crate) topics: Topics,
}

pub(crate) fn compile(
    token: &str,
    raw_sets: &[Vec<RawClause>],
    styles: &StyleTable,
    units: &UnitRegistry,
) -> Result<CompiledMedia, StyleError> {
    let mut topics = Topics::empty();
    let mut sets = Vec::with_capacity(raw_sets.len());

    for (index, raw) in raw_sets.iter().enumerate() {
        let mut clauses = SmallVec::new();
        let mut unit: Option<Box<str>> = None;
        let mut for_children = false;

        for RawClause { rule, params } in raw {
            let params = params.as_deref();
            let clause = match (rule.as_str(), params) {
                (SELECTOR_RULE, Some(p)) if p.starts_with(CHILD_COMBINATOR) => {
                    for_children = true;
                    Clause::Children
                }
                (UNIT_RULE, _) => {
                    if unit.is_some() {
                        return Err(StyleError::MultipleUnitDirectives {
                            token: token.to_string(),
                            index,
                        });
                    }
                    let Some(name) = params.filter(|p| !p.is_empty()) else {
                        return Err(StyleError::MissingUnitName {
                            token: token.to_string(),
                            index,
                        });
                    };
                    // Unknown units fail when the variant is first converted.
                    topics |= units.topics(name).unwrap_or_default();
                    unit = Some(name.into());
                    Clause::Unit
                }
                (name, params) => {
                    if let (MEDIA_RULE, Some(query)) = (name, params) {
                        topics |= Topics::of_media_query(query);
                    }
                    Clause::Rule {
                        name: name.into(),
                        params: params.map(Into::into),
                    }
                }
            };
            clauses.push(clause);
        }

        let variant_key = format!("{token}.{index}");
        let variant = styles.get(&variant_key).map(|style| {
            if for_children {
                style.to_child_style()
            } else {
                style.clone()
            }
        });
        if variant.is_none() {
            tracing::warn!(token, index, "clause set has no variant style");
        }

        sets.push(ClauseSet {
            clauses,
            variant,
            unit,
            for_children,
        });
    }

    Ok(CompiledMedia { sets, topics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn styles() -> StyleTable {
        let mut styles = StyleTable::new();
        styles.insert(
            "gap-1.0".into(),
            StyleRecord::builder().set("marginLeft", 2.0).build(),
        );
        styles.insert(
            "w-half.0".into(),
            StyleRecord::builder().set("width", 50.0).build(),
        );
        styles
    }

    #[test]
    fn child_selectors_mark_the_set() {
        let raw = vec![vec![RawClause::new("selector", Some("(> *:not(:first-child))"))]];
        let media = compile("gap-1", &raw, &styles(), &UnitRegistry::new()).unwrap();

        let set = &media.sets[0];
        assert!(set.for_children);
        assert_eq!(set.clauses.as_slice(), &[Clause::Children]);
        assert!(set.variant.as_ref().unwrap().is_for_children());
        assert_eq!(media.topics, Topics::empty());
    }

    #[test]
    fn other_selectors_go_to_the_evaluator() {
        let raw = vec![vec![RawClause::new("selector", Some(":first-child"))]];
        let media = compile("gap-1", &raw, &styles(), &UnitRegistry::new()).unwrap();
        assert!(!media.sets[0].for_children);
        assert!(matches!(media.sets[0].clauses[0], Clause::Rule { .. }));
    }

    #[test]
    fn second_unit_directive_is_rejected() {
        let raw = vec![
            vec![RawClause::media("(min-width: 640px)")],
            vec![
                RawClause::new("dynamic-style", Some("vw")),
                RawClause::new("dynamic-style", Some("vh")),
            ],
        ];
        let err = compile("w-half", &raw, &styles(), &UnitRegistry::with_defaults()).unwrap_err();
        assert_eq!(
            err,
            StyleError::MultipleUnitDirectives {
                token: "w-half".into(),
                index: 1,
            }
        );
    }

    #[test]
    fn unit_directives_need_a_name() {
        let raw = vec![vec![RawClause::new("dynamic-style", None)]];
        let err = compile("w-half", &raw, &styles(), &UnitRegistry::new()).unwrap_err();
        assert!(matches!(err, StyleError::MissingUnitName { index: 0, .. }));
    }

    #[test]
    fn topics_come_from_every_media_clause_and_unit() {
        let raw = vec![vec![
            RawClause::new("pseudo-class", Some("hover")),
            RawClause::media("(prefers-color-scheme: dark)"),
            RawClause::new("dynamic-style", Some("vw")),
        ]];
        let media = compile("w-half", &raw, &styles(), &UnitRegistry::with_defaults()).unwrap();
        assert_eq!(media.topics, Topics::WINDOW | Topics::COLOR_SCHEME);
        assert_eq!(media.sets[0].unit.as_deref(), Some("vw"));
    }

    #[test]
    fn missing_variants_compile_to_none() {
        let raw = vec![vec![RawClause::media("(min-width: 1px)")]];
        let media = compile("absent", &raw, &styles(), &UnitRegistry::new()).unwrap();
        assert!(media.sets[0].variant.is_none());
    }
}
