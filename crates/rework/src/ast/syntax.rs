//! Node kinds and the data each kind carries.

use std::fmt;

use bitflags::bitflags;

use crate::ast::SourcePosition;

bitflags! {
    /// Capability tags shared by several node kinds.
    ///
    /// A subscription declared against a capability fires for every kind that
    /// carries it, the same way a handler for an interface would receive every
    /// implementor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u16 {
        /// Every node kind.
        const SYNTAX = 1;
        /// Top level or block level statements: rules and at-rules.
        const STATEMENT = 1 << 1;
        /// Kinds holding raw text that is parsed on demand.
        const REFINABLE = 1 << 2;
        /// Every piece of a refined selector, combinators included.
        const SELECTOR_PART = 1 << 3;
        /// Selector parts that match an element on their own.
        const SIMPLE_SELECTOR = 1 << 4;
        /// Pieces of a refined declaration value.
        const TERM = 1 << 5;
        /// Kinds exposing a name usable by name filters.
        const NAMED = 1 << 6;
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        if names.is_empty() {
            write!(f, "<no capability>")
        } else {
            write!(f, "{}", names.join(" | "))
        }
    }
}

/// The concrete kind of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Stylesheet,
    Rule,
    AtRule,
    AtRuleExpression,
    Selector,
    TypeSelector,
    UniversalSelector,
    ClassSelector,
    IdSelector,
    AttributeSelector,
    PseudoClassSelector,
    PseudoElementSelector,
    KeyframeSelector,
    Combinator,
    Declaration,
    KeywordValue,
    NumericValue,
    HexColorValue,
    StringValue,
    FunctionValue,
    Operator,
    GenericValue,
}

impl Kind {
    pub const ALL: [Kind; 22] = [
        Kind::Stylesheet,
        Kind::Rule,
        Kind::AtRule,
        Kind::AtRuleExpression,
        Kind::Selector,
        Kind::TypeSelector,
        Kind::UniversalSelector,
        Kind::ClassSelector,
        Kind::IdSelector,
        Kind::AttributeSelector,
        Kind::PseudoClassSelector,
        Kind::PseudoElementSelector,
        Kind::KeyframeSelector,
        Kind::Combinator,
        Kind::Declaration,
        Kind::KeywordValue,
        Kind::NumericValue,
        Kind::HexColorValue,
        Kind::StringValue,
        Kind::FunctionValue,
        Kind::Operator,
        Kind::GenericValue,
    ];

    /// The capability tags this kind carries.
    pub fn capabilities(self) -> Capabilities {
        let extra = match self {
            Kind::Stylesheet | Kind::AtRuleExpression => Capabilities::empty(),
            Kind::Rule => Capabilities::STATEMENT,
            Kind::AtRule => Capabilities::STATEMENT | Capabilities::REFINABLE | Capabilities::NAMED,
            Kind::Selector => Capabilities::REFINABLE,
            Kind::TypeSelector
            | Kind::UniversalSelector
            | Kind::ClassSelector
            | Kind::IdSelector
            | Kind::AttributeSelector => {
                Capabilities::SELECTOR_PART | Capabilities::SIMPLE_SELECTOR
            }
            Kind::PseudoClassSelector | Kind::PseudoElementSelector => {
                Capabilities::SELECTOR_PART | Capabilities::SIMPLE_SELECTOR | Capabilities::NAMED
            }
            Kind::KeyframeSelector | Kind::Combinator => Capabilities::SELECTOR_PART,
            Kind::Declaration => Capabilities::REFINABLE | Capabilities::NAMED,
            Kind::FunctionValue => Capabilities::TERM | Capabilities::NAMED,
            Kind::KeywordValue
            | Kind::NumericValue
            | Kind::HexColorValue
            | Kind::StringValue
            | Kind::Operator
            | Kind::GenericValue => Capabilities::TERM,
        };
        Capabilities::SYNTAX | extra
    }

    pub fn is_refinable(self) -> bool {
        self.capabilities().contains(Capabilities::REFINABLE)
    }

    pub fn is_named(self) -> bool {
        self.capabilities().contains(Capabilities::NAMED)
    }

    /// Stable, human readable name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Stylesheet => "stylesheet",
            Kind::Rule => "rule",
            Kind::AtRule => "at-rule",
            Kind::AtRuleExpression => "at-rule expression",
            Kind::Selector => "selector",
            Kind::TypeSelector => "type selector",
            Kind::UniversalSelector => "universal selector",
            Kind::ClassSelector => "class selector",
            Kind::IdSelector => "id selector",
            Kind::AttributeSelector => "attribute selector",
            Kind::PseudoClassSelector => "pseudo-class selector",
            Kind::PseudoElementSelector => "pseudo-element selector",
            Kind::KeyframeSelector => "keyframe selector",
            Kind::Combinator => "combinator",
            Kind::Declaration => "declaration",
            Kind::KeywordValue => "keyword value",
            Kind::NumericValue => "numeric value",
            Kind::HexColorValue => "hex color value",
            Kind::StringValue => "string value",
            Kind::FunctionValue => "function value",
            Kind::Operator => "operator",
            Kind::GenericValue => "generic value",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unparsed source text kept by a refinable node until it is refined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raw {
    pub text: String,
    pub position: Option<SourcePosition>,
}

impl Raw {
    pub fn new(text: impl Into<String>, position: Option<SourcePosition>) -> Self {
        Self {
            text: text.into(),
            position,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtRule {
    pub name: String,
    pub expression: Option<Raw>,
    pub block: Option<Raw>,
}

impl AtRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: None,
            block: None,
        }
    }

    /// Whether the block holds declarations rather than nested statements.
    pub fn has_declaration_block(&self) -> bool {
        matches!(
            self.name.to_ascii_lowercase().as_str(),
            "font-face" | "page" | "counter-style" | "property" | "viewport" | "font-palette-values"
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            important: false,
        }
    }

    pub fn important(mut self, important: bool) -> Self {
        self.important = important;
        self
    }

    /// Custom properties (`--name`) keep their value as opaque text.
    pub fn is_custom(&self) -> bool {
        self.property.starts_with("--")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CombinatorKind {
    Descendant,
    Child,
    AdjacentSibling, // +
    GeneralSibling,  // ~
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Comma,
    Slash,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeOperator {
    Equals,      // =
    Includes,    // ~=
    DashMatch,   // |=
    Prefix,      // ^=
    Suffix,      // $=
    Substring,   // *=
}

impl AttributeOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeOperator::Equals => "=",
            AttributeOperator::Includes => "~=",
            AttributeOperator::DashMatch => "|=",
            AttributeOperator::Prefix => "^=",
            AttributeOperator::Suffix => "$=",
            AttributeOperator::Substring => "*=",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeMatch {
    pub operator: AttributeOperator,
    pub value: String,
    /// Quote character used in the source, `None` for an unquoted identifier.
    pub quote: Option<char>,
    /// Trailing `i` / `s` flag.
    pub flag: Option<char>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Numeric {
    pub value: f64,
    pub unit: Option<String>,
}

impl Numeric {
    pub fn new(value: f64, unit: Option<&str>) -> Self {
        Self {
            value,
            unit: unit.map(String::from),
        }
    }
}

/// The payload of a syntax node.
#[derive(Clone, Debug, PartialEq)]
pub enum Syntax {
    Stylesheet,
    Rule,
    AtRule(AtRule),
    AtRuleExpression { text: String },
    Selector,
    TypeSelector { name: String },
    UniversalSelector,
    ClassSelector { name: String },
    IdSelector { name: String },
    AttributeSelector { name: String, matcher: Option<AttributeMatch> },
    PseudoClassSelector { name: String, args: Option<String> },
    PseudoElementSelector { name: String },
    KeyframeSelector { text: String },
    Combinator(CombinatorKind),
    Declaration(Declaration),
    KeywordValue { keyword: String },
    NumericValue(Numeric),
    HexColorValue { color: String },
    StringValue { quote: char, content: String },
    FunctionValue { name: String, args: String },
    Operator(OperatorKind),
    GenericValue { text: String },
}

impl Syntax {
    pub fn kind(&self) -> Kind {
        match self {
            Syntax::Stylesheet => Kind::Stylesheet,
            Syntax::Rule => Kind::Rule,
            Syntax::AtRule(_) => Kind::AtRule,
            Syntax::AtRuleExpression { .. } => Kind::AtRuleExpression,
            Syntax::Selector => Kind::Selector,
            Syntax::TypeSelector { .. } => Kind::TypeSelector,
            Syntax::UniversalSelector => Kind::UniversalSelector,
            Syntax::ClassSelector { .. } => Kind::ClassSelector,
            Syntax::IdSelector { .. } => Kind::IdSelector,
            Syntax::AttributeSelector { .. } => Kind::AttributeSelector,
            Syntax::PseudoClassSelector { .. } => Kind::PseudoClassSelector,
            Syntax::PseudoElementSelector { .. } => Kind::PseudoElementSelector,
            Syntax::KeyframeSelector { .. } => Kind::KeyframeSelector,
            Syntax::Combinator(_) => Kind::Combinator,
            Syntax::Declaration(_) => Kind::Declaration,
            Syntax::KeywordValue { .. } => Kind::KeywordValue,
            Syntax::NumericValue(_) => Kind::NumericValue,
            Syntax::HexColorValue { .. } => Kind::HexColorValue,
            Syntax::StringValue { .. } => Kind::StringValue,
            Syntax::FunctionValue { .. } => Kind::FunctionValue,
            Syntax::Operator(_) => Kind::Operator,
            Syntax::GenericValue { .. } => Kind::GenericValue,
        }
    }

    /// The name used by name filters, for kinds carrying [`Capabilities::NAMED`].
    pub fn name(&self) -> Option<&str> {
        match self {
            Syntax::AtRule(at_rule) => Some(&at_rule.name),
            Syntax::Declaration(declaration) => Some(&declaration.property),
            Syntax::FunctionValue { name, .. }
            | Syntax::PseudoClassSelector { name, .. }
            | Syntax::PseudoElementSelector { name } => Some(name),
            _ => None,
        }
    }
}
