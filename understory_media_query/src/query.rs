// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Media-query parsing and matching.
//!
//! Queries are tokenized and parsed with `cssparser`. Only the features a
//! native host can answer are understood; everything else is an error, which
//! the evaluator reports as an undefined rule.

use cssparser::{
    ParseError, ParseErrorKind, Parser, ParserInput, SourceLocation, Token,
    match_ignore_ascii_case,
};
use smallvec::SmallVec;
use understory_class_style::{ColorScheme, Orientation, RuleContext};

/// Pixels per `em` and `rem`, the initial font size.
const PX_PER_EM: f64 = 16.0;

/// Errors raised while parsing a media query.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The query is blank.
    #[error("empty media query")]
    Empty,
    /// The query is not valid media-query syntax.
    #[error("invalid media query at {line}:{column}: {reason}")]
    Syntax {
        /// Zero-based line of the offending token.
        line: u32,
        /// One-based column of the offending token.
        column: u32,
        /// What the tokenizer or parser ran into.
        reason: String,
    },
    /// A `min-`/`max-` feature written without `: value`.
    #[error("media feature `{0}` has no value")]
    MissingValue(String),
    /// A feature this crate does not evaluate.
    #[error("unsupported media feature `{0}`")]
    UnknownFeature(String),
    /// Range syntax on a feature that only takes keywords.
    #[error("media feature `{0}` cannot be compared")]
    NotARange(String),
    /// A length unit other than the absolute and font-relative ones.
    #[error("unsupported length unit `{0}`")]
    UnknownUnit(String),
    /// A supported feature with a value it does not accept.
    #[error("invalid value `{value}` for media feature `{feature}`")]
    InvalidValue {
        /// Feature name, including any `min-`/`max-` prefix.
        feature: String,
        /// The value as written.
        value: String,
    },
}

impl From<ParseError<'_, QueryError>> for QueryError {
    fn from(err: ParseError<'_, Self>) -> Self {
        match err.kind {
            ParseErrorKind::Custom(err) => err,
            ParseErrorKind::Basic(kind) => Self::Syntax {
                line: err.location.line,
                column: err.location.column,
                reason: format!("{kind:?}"),
            },
        }
    }
}

type Result<'i, T> = core::result::Result<T, ParseError<'i, QueryError>>;

/// A media feature this crate evaluates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeatureName {
    /// Window width in logical pixels.
    Width,
    /// Window height in logical pixels.
    Height,
    /// Window width divided by height.
    AspectRatio,
    /// Screen orientation.
    Orientation,
    /// Color-scheme preference.
    PrefersColorScheme,
}

impl FeatureName {
    fn parse(name: &str) -> Option<Self> {
        Some(match_ignore_ascii_case! { name,
            "width" => Self::Width,
            "height" => Self::Height,
            "aspect-ratio" => Self::AspectRatio,
            "orientation" => Self::Orientation,
            "prefers-color-scheme" => Self::PrefersColorScheme,
            _ => return None,
        })
    }

    /// Returns `true` for features compared numerically.
    #[must_use]
    pub fn is_range(self) -> bool {
        matches!(self, Self::Width | Self::Height | Self::AspectRatio)
    }

    fn value(self, cx: &RuleContext<'_>) -> Option<f64> {
        match self {
            Self::Width => Some(cx.width()),
            Self::Height => Some(cx.height()),
            Self::AspectRatio => (cx.height() > 0.0).then(|| cx.width() / cx.height()),
            Self::Orientation | Self::PrefersColorScheme => None,
        }
    }
}

/// How the environment value compares against the query value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Comparison {
    /// `<`
    Less,
    /// `<=`, or a `max-` prefix.
    LessOrEqual,
    /// `=`, or the plain `name: value` form.
    Equal,
    /// `>=`, or a `min-` prefix.
    GreaterOrEqual,
    /// `>`
    Greater,
}

impl Comparison {
    fn holds(self, actual: f64, expected: f64) -> bool {
        match self {
            Self::Less => actual < expected,
            Self::LessOrEqual => actual <= expected,
            Self::Equal => actual == expected,
            Self::GreaterOrEqual => actual >= expected,
            Self::Greater => actual > expected,
        }
    }

    /// `640px < width` reads as `width > 640px`.
    fn flip(self) -> Self {
        match self {
            Self::Less => Self::Greater,
            Self::LessOrEqual => Self::GreaterOrEqual,
            Self::Equal => Self::Equal,
            Self::GreaterOrEqual => Self::LessOrEqual,
            Self::Greater => Self::Less,
        }
    }

    fn parse<'i>(input: &mut Parser<'i, '_>) -> Result<'i, Self> {
        let location = input.current_source_location();
        let (strict, or_equal) = match input.next()?.clone() {
            Token::Delim('<') => (Self::Less, Self::LessOrEqual),
            Token::Delim('>') => (Self::Greater, Self::GreaterOrEqual),
            Token::Delim('=') => return Ok(Self::Equal),
            token => return Err(location.new_unexpected_token_error(token)),
        };
        match input.try_parse(|i| i.expect_delim('=')) {
            Ok(()) => Ok(or_equal),
            Err(_) => Ok(strict),
        }
    }
}

/// One condition of a media query.
#[derive(Clone, Debug, PartialEq)]
pub enum MediaFeature {
    /// A numeric comparison; lengths are in logical pixels.
    Range {
        /// The compared feature.
        name: FeatureName,
        /// How the environment value must relate to `value`.
        comparison: Comparison,
        /// The query value.
        value: f64,
    },
    /// Screen orientation.
    Orientation(Orientation),
    /// Color-scheme preference. Never matches when the platform reports none.
    PrefersColorScheme(ColorScheme),
    /// A feature in boolean context, such as `(prefers-color-scheme)`.
    Present(FeatureName),
}

impl MediaFeature {
    /// Parses the inside of one `( ... )` block.
    ///
    /// A range such as `640px <= width < 1024px` yields two features.
    fn parse_in_parens<'i>(input: &mut Parser<'i, '_>) -> Result<'i, SmallVec<[Self; 2]>> {
        if let Ok(name) = input.try_parse(|i| i.expect_ident_cloned()) {
            return Self::parse_name_first(&name, input).map(|feature| SmallVec::from_iter([feature]));
        }
        Self::parse_value_first(input)
    }

    /// `name: value`, `min-name: value`, `name <op> value` or `name`.
    fn parse_name_first<'i>(written: &str, input: &mut Parser<'i, '_>) -> Result<'i, Self> {
        let location = input.current_source_location();
        let lowered = written.to_ascii_lowercase();
        let (prefix, base) = if let Some(base) = lowered.strip_prefix("min-") {
            (Some(Comparison::GreaterOrEqual), base)
        } else if let Some(base) = lowered.strip_prefix("max-") {
            (Some(Comparison::LessOrEqual), base)
        } else {
            (None, lowered.as_str())
        };
        let name = FeatureName::parse(base)
            .filter(|name| prefix.is_none() || name.is_range())
            .ok_or_else(|| location.new_custom_error(QueryError::UnknownFeature(written.into())))?;

        if input.is_exhausted() {
            return match prefix {
                Some(_) => Err(location.new_custom_error(QueryError::MissingValue(written.into()))),
                None => Ok(Self::Present(name)),
            };
        }

        if input.try_parse(|i| i.expect_colon()).is_ok() {
            return match name {
                FeatureName::Orientation => Self::parse_orientation(written, input),
                FeatureName::PrefersColorScheme => Self::parse_color_scheme(written, input),
                _ => Ok(Self::Range {
                    name,
                    comparison: prefix.unwrap_or(Comparison::Equal),
                    value: parse_range_value(name, written, input)?,
                }),
            };
        }

        if prefix.is_some() || !name.is_range() {
            return Err(location.new_custom_error(QueryError::NotARange(written.into())));
        }
        let comparison = Comparison::parse(input)?;
        Ok(Self::Range {
            name,
            comparison,
            value: parse_range_value(name, written, input)?,
        })
    }

    /// `value <op> name` and `value <op> name <op> value`.
    fn parse_value_first<'i>(input: &mut Parser<'i, '_>) -> Result<'i, SmallVec<[Self; 2]>> {
        let start = input.state();
        let location = input.current_source_location();
        let written = loop {
            if let Token::Ident(name) = input.next()? {
                break name.clone();
            }
        };
        input.reset(&start);

        let name = FeatureName::parse(&written)
            .ok_or_else(|| location.new_custom_error(QueryError::UnknownFeature(written.to_string())))?;
        if !name.is_range() {
            return Err(location.new_custom_error(QueryError::NotARange(written.to_string())));
        }

        let mut features = SmallVec::new();
        let low = parse_range_value(name, &written, input)?;
        let comparison = Comparison::parse(input)?.flip();
        input.expect_ident_matching(&written)?;
        features.push(Self::Range {
            name,
            comparison,
            value: low,
        });
        if !input.is_exhausted() {
            let comparison = Comparison::parse(input)?;
            features.push(Self::Range {
                name,
                comparison,
                value: parse_range_value(name, &written, input)?,
            });
        }
        Ok(features)
    }

    fn parse_orientation<'i>(feature: &str, input: &mut Parser<'i, '_>) -> Result<'i, Self> {
        let location = input.current_source_location();
        let ident = input.expect_ident_cloned()?;
        match_ignore_ascii_case! { &*ident,
            "portrait" => Ok(Self::Orientation(Orientation::Portrait)),
            "landscape" => Ok(Self::Orientation(Orientation::Landscape)),
            _ => Err(invalid_value(location, feature, &ident)),
        }
    }

    fn parse_color_scheme<'i>(feature: &str, input: &mut Parser<'i, '_>) -> Result<'i, Self> {
        let location = input.current_source_location();
        let ident = input.expect_ident_cloned()?;
        ColorScheme::parse(&ident.to_ascii_lowercase())
            .map(Self::PrefersColorScheme)
            .ok_or_else(|| invalid_value(location, feature, &ident))
    }

    /// Returns `true` if the feature holds in `cx`.
    #[must_use]
    pub fn matches(&self, cx: &RuleContext<'_>) -> bool {
        match *self {
            Self::Range {
                name,
                comparison,
                value,
            } => name
                .value(cx)
                .is_some_and(|actual| comparison.holds(actual, value)),
            Self::Orientation(orientation) => cx.orientation() == orientation,
            Self::PrefersColorScheme(scheme) => cx.color_scheme() == Some(scheme),
            Self::Present(FeatureName::Orientation) => true,
            Self::Present(FeatureName::PrefersColorScheme) => cx.color_scheme().is_some(),
            Self::Present(name) => name.value(cx).is_some_and(|actual| actual != 0.0),
        }
    }
}

fn invalid_value<'i>(location: SourceLocation, feature: &str, value: &str) -> ParseError<'i, QueryError> {
    location.new_custom_error(QueryError::InvalidValue {
        feature: feature.into(),
        value: value.into(),
    })
}

fn parse_range_value<'i>(name: FeatureName, feature: &str, input: &mut Parser<'i, '_>) -> Result<'i, f64> {
    match name {
        FeatureName::AspectRatio => parse_ratio(feature, input),
        _ => parse_length(input),
    }
}

/// A length in logical pixels. Unitless numbers are taken as pixels.
fn parse_length<'i>(input: &mut Parser<'i, '_>) -> Result<'i, f64> {
    let location = input.current_source_location();
    match input.next()?.clone() {
        Token::Number { value, .. } => Ok(f64::from(value)),
        Token::Dimension { value, unit, .. } => {
            let scale = match_ignore_ascii_case! { &*unit,
                "px" => 1.0,
                "em" | "rem" => PX_PER_EM,
                "in" => 96.0,
                "cm" => 96.0 / 2.54,
                "mm" => 96.0 / 25.4,
                "q" => 96.0 / 101.6,
                "pt" => 96.0 / 72.0,
                "pc" => 16.0,
                _ => return Err(location.new_custom_error(QueryError::UnknownUnit(unit.to_string()))),
            };
            Ok(f64::from(value) * scale)
        }
        token => Err(location.new_unexpected_token_error(token)),
    }
}

/// `16/9`, `16 / 9` or a single number.
fn parse_ratio<'i>(feature: &str, input: &mut Parser<'i, '_>) -> Result<'i, f64> {
    let location = input.current_source_location();
    let position = input.position();
    let width = f64::from(input.expect_number()?);
    let height = match input.try_parse(|i| i.expect_delim('/')) {
        Ok(()) => f64::from(input.expect_number()?),
        Err(_) => 1.0,
    };
    if width < 0.0 || height <= 0.0 {
        return Err(invalid_value(location, feature, input.slice_from(position).trim()));
    }
    Ok(width / height)
}

/// A single media query: an optional media type and features joined by `and`.
///
/// The media type is compared against the host platform. `all` and `screen`
/// match every platform.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaQuery {
    negated: bool,
    media_type: Option<Box<str>>,
    features: SmallVec<[MediaFeature; 2]>,
}

impl MediaQuery {
    fn parse<'i>(input: &mut Parser<'i, '_>) -> Result<'i, Self> {
        let negated = input.try_parse(|i| i.expect_ident_matching("not")).is_ok();
        if !negated {
            let _ = input.try_parse(|i| i.expect_ident_matching("only"));
        }

        let mut features = SmallVec::new();
        let media_type = match input.try_parse(|i| i.expect_ident_cloned()) {
            Ok(ident) => Some(Box::from(ident.to_ascii_lowercase())),
            Err(_) => {
                Self::parse_condition(input, &mut features)?;
                None
            }
        };
        while input.try_parse(|i| i.expect_ident_matching("and")).is_ok() {
            Self::parse_condition(input, &mut features)?;
        }

        Ok(Self {
            negated,
            media_type,
            features,
        })
    }

    fn parse_condition<'i>(
        input: &mut Parser<'i, '_>,
        features: &mut SmallVec<[MediaFeature; 2]>,
    ) -> Result<'i, ()> {
        input.expect_parenthesis_block()?;
        features.extend(input.parse_nested_block(MediaFeature::parse_in_parens)?);
        Ok(())
    }

    /// Returns the lowercased media type, if the query names one.
    #[must_use]
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Returns the features.
    #[must_use]
    pub fn features(&self) -> &[MediaFeature] {
        &self.features
    }

    /// Returns `true` if the query was written with `not`.
    #[must_use]
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Returns `true` if the query holds in `cx`.
    #[must_use]
    pub fn matches(&self, cx: &RuleContext<'_>) -> bool {
        let type_matches = self.media_type.as_deref().is_none_or(|ty| {
            matches!(ty, "all" | "screen") || ty.eq_ignore_ascii_case(cx.platform())
        });
        let matched = type_matches && self.features.iter().all(|f| f.matches(cx));
        matched != self.negated
    }
}

/// A comma-separated list of media queries; matches if any query does.
///
/// Both the classic and the range syntax are accepted. Lengths may use any
/// absolute unit; `em` and `rem` are 16 pixels.
///
/// ```rust
/// use understory_class_style::{Environment, Interaction, Orientation, RuleContext, ScaledSize};
/// use understory_media_query::MediaQueryList;
///
/// let env = Environment {
///     platform: "android".into(),
///     window: ScaledSize::new(800.0, 600.0),
///     orientation: Orientation::Landscape,
///     color_scheme: None,
/// };
/// let cx = RuleContext::new(&env, Interaction::empty());
///
/// let query = MediaQueryList::parse("(min-width: 40em) and (orientation: landscape)").unwrap();
/// assert!(query.matches(&cx));
///
/// let query = MediaQueryList::parse("ios, (640px <= width < 768px)").unwrap();
/// assert!(!query.matches(&cx));
///
/// assert!(MediaQueryList::parse("(min-width: wide)").is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MediaQueryList {
    queries: SmallVec<[MediaQuery; 1]>,
}

impl MediaQueryList {
    /// Parses a media query list.
    pub fn parse(source: &str) -> core::result::Result<Self, QueryError> {
        if source.trim().is_empty() {
            return Err(QueryError::Empty);
        }
        let mut input = ParserInput::new(source);
        let mut parser = Parser::new(&mut input);
        let queries = parser
            .parse_entirely(|input| input.parse_comma_separated(MediaQuery::parse))
            .map_err(QueryError::from)?;
        Ok(Self {
            queries: queries.into(),
        })
    }

    /// Returns the queries.
    #[must_use]
    pub fn queries(&self) -> &[MediaQuery] {
        &self.queries
    }

    /// Returns `true` if any query holds in `cx`.
    #[must_use]
    pub fn matches(&self, cx: &RuleContext<'_>) -> bool {
        self.queries.iter().any(|query| query.matches(cx))
    }
}
