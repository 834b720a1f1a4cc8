//! Writes a tree back out as CSS.
//!
//! Verbose output puts one declaration per line with two-space indentation
//! and a blank line between statements. Compressed output drops every
//! optional space and the last semicolon of a block. Units that were never
//! refined are written from their raw text with whitespace collapsed.

use std::fmt::Write as _;

use crate::ast::{Ast, CombinatorKind, Kind, NodeId, OperatorKind, Syntax};
use crate::parser::lexer::collapse_whitespace;

const INDENT: &str = "  ";

pub struct Writer<'a> {
    ast: &'a Ast,
    compressed: bool,
}

impl<'a> Writer<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            compressed: false,
        }
    }

    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Render `unit` and everything under it.
    pub fn write(&self, unit: NodeId) -> String {
        let mut out = String::new();
        match self.ast.kind(unit) {
            Kind::Stylesheet => self.statements(&mut out, self.ast.children(unit), 0),
            Kind::Rule | Kind::AtRule => self.statement(&mut out, unit, 0),
            Kind::Selector => self.selector(&mut out, unit),
            Kind::Declaration => self.declaration(&mut out, unit),
            _ => self.leaf(&mut out, unit),
        }
        out
    }

    fn visible<'s>(&'s self, units: &'s [NodeId]) -> impl Iterator<Item = NodeId> + 's {
        units
            .iter()
            .copied()
            .filter(|unit| !self.ast.node(*unit).is_destroyed())
    }

    fn statements(&self, out: &mut String, units: &[NodeId], depth: usize) {
        for (index, unit) in self.visible(units).enumerate() {
            if index > 0 && !self.compressed {
                out.push('\n');
            }
            match self.ast.kind(unit) {
                Kind::Declaration => {
                    self.indent(out, depth);
                    self.declaration(out, unit);
                    out.push(';');
                    self.newline(out);
                }
                _ => self.statement(out, unit, depth),
            }
        }
    }

    fn statement(&self, out: &mut String, unit: NodeId, depth: usize) {
        self.indent(out, depth);
        match self.ast.syntax(unit) {
            Syntax::Rule => {
                let children = self.ast.children(unit);
                let selectors: Vec<NodeId> = self
                    .visible(children)
                    .filter(|child| self.ast.kind(*child) == Kind::Selector)
                    .collect();
                let separator = if self.compressed { "," } else { ", " };
                for (index, selector) in selectors.into_iter().enumerate() {
                    if index > 0 {
                        out.push_str(separator);
                    }
                    self.selector(out, selector);
                }
                let body: Vec<NodeId> = self
                    .visible(children)
                    .filter(|child| self.ast.kind(*child) != Kind::Selector)
                    .collect();
                self.body(out, &body, depth);
            }
            Syntax::AtRule(at_rule) => {
                let _ = write!(out, "@{}", at_rule.name);
                let node = self.ast.node(unit);
                let mut body = Vec::new();
                if node.is_refined() {
                    for child in self.visible(node.children()) {
                        if let Syntax::AtRuleExpression { text } = self.ast.syntax(child) {
                            let _ = write!(out, " {text}");
                        } else {
                            body.push(child);
                        }
                    }
                } else if let Some(expression) = &at_rule.expression {
                    let _ = write!(out, " {}", collapse_whitespace(&expression.text));
                }

                if !node.is_refined() && at_rule.block.is_some() {
                    let raw = at_rule
                        .block
                        .as_ref()
                        .map(|block| collapse_whitespace(&block.text))
                        .unwrap_or_default();
                    self.raw_block(out, &raw, depth);
                } else if at_rule.block.is_some() || !body.is_empty() {
                    self.body(out, &body, depth);
                } else {
                    out.push(';');
                    self.newline(out);
                }
            }
            _ => self.leaf(out, unit),
        }
    }

    fn body(&self, out: &mut String, units: &[NodeId], depth: usize) {
        if self.compressed {
            out.push('{');
            let mut first = true;
            for unit in self.visible(units) {
                if self.ast.kind(unit) == Kind::Declaration {
                    if !first {
                        out.push(';');
                    }
                    self.declaration(out, unit);
                } else {
                    self.statement(out, unit, depth + 1);
                }
                first = false;
            }
            out.push('}');
            return;
        }

        out.push_str(" {\n");
        let nested = units
            .iter()
            .any(|unit| self.ast.kind(*unit) != Kind::Declaration);
        if nested {
            self.statements(out, units, depth + 1);
        } else {
            for unit in self.visible(units) {
                self.indent(out, depth + 1);
                self.declaration(out, unit);
                out.push_str(";\n");
            }
        }
        self.indent(out, depth);
        out.push_str("}\n");
    }

    fn raw_block(&self, out: &mut String, raw: &str, depth: usize) {
        if self.compressed {
            let _ = write!(out, "{{{raw}}}");
            return;
        }
        out.push_str(" {\n");
        if !raw.is_empty() {
            self.indent(out, depth + 1);
            out.push_str(raw);
            out.push('\n');
        }
        self.indent(out, depth);
        out.push_str("}\n");
    }

    fn selector(&self, out: &mut String, unit: NodeId) {
        let node = self.ast.node(unit);
        if !node.is_refined() {
            if let Some(raw) = node.raw() {
                out.push_str(&collapse_whitespace(&raw.text));
            }
            return;
        }
        for part in self.visible(node.children()) {
            self.leaf(out, part);
        }
    }

    fn declaration(&self, out: &mut String, unit: NodeId) {
        let node = self.ast.node(unit);
        let Syntax::Declaration(declaration) = node.syntax() else {
            return;
        };
        out.push_str(&declaration.property);
        out.push_str(if self.compressed { ":" } else { ": " });

        if !node.is_refined() {
            if let Some(raw) = node.raw() {
                out.push_str(&collapse_whitespace(&raw.text));
            }
        } else {
            let mut after_value = false;
            for term in self.visible(node.children()) {
                match self.ast.syntax(term) {
                    Syntax::Operator(OperatorKind::Comma) => {
                        out.push_str(if self.compressed { "," } else { ", " });
                        after_value = false;
                    }
                    Syntax::Operator(OperatorKind::Slash) => {
                        out.push('/');
                        after_value = false;
                    }
                    _ => {
                        if after_value {
                            out.push(' ');
                        }
                        self.leaf(out, term);
                        after_value = true;
                    }
                }
            }
        }

        if declaration.important {
            out.push_str(if self.compressed { "!important" } else { " !important" });
        }
    }

    fn leaf(&self, out: &mut String, unit: NodeId) {
        let _ = match self.ast.syntax(unit) {
            Syntax::TypeSelector { name } => write!(out, "{name}"),
            Syntax::UniversalSelector => write!(out, "*"),
            Syntax::ClassSelector { name } => write!(out, ".{name}"),
            Syntax::IdSelector { name } => write!(out, "#{name}"),
            Syntax::AttributeSelector { name, matcher } => {
                let _ = write!(out, "[{name}");
                if let Some(matcher) = matcher {
                    let quote = matcher.quote.map(String::from).unwrap_or_default();
                    let operator = matcher.operator.as_str();
                    let _ = write!(out, "{operator}{quote}{}{quote}", matcher.value);
                    if let Some(flag) = matcher.flag {
                        let _ = write!(out, " {flag}");
                    }
                }
                write!(out, "]")
            }
            Syntax::PseudoClassSelector { name, args } => match args {
                Some(args) => write!(out, ":{name}({args})"),
                None => write!(out, ":{name}"),
            },
            Syntax::PseudoElementSelector { name } => write!(out, "::{name}"),
            Syntax::KeyframeSelector { text } => write!(out, "{text}"),
            Syntax::Combinator(kind) => write!(out, "{}", self.combinator(*kind)),
            Syntax::KeywordValue { keyword } => write!(out, "{keyword}"),
            Syntax::NumericValue(numeric) => {
                let unit = numeric.unit.as_deref().unwrap_or_default();
                write!(out, "{}{unit}", self.number(numeric.value))
            }
            Syntax::HexColorValue { color } => write!(out, "#{color}"),
            Syntax::StringValue { quote, content } => write!(out, "{quote}{content}{quote}"),
            Syntax::FunctionValue { name, args } => write!(out, "{name}({args})"),
            Syntax::Operator(OperatorKind::Comma) => write!(out, ","),
            Syntax::Operator(OperatorKind::Slash) => write!(out, "/"),
            Syntax::GenericValue { text } => write!(out, "{text}"),
            Syntax::AtRuleExpression { text } => write!(out, "{text}"),
            Syntax::Stylesheet
            | Syntax::Rule
            | Syntax::AtRule(_)
            | Syntax::Selector
            | Syntax::Declaration(_) => Ok(()),
        };
    }

    fn combinator(&self, kind: CombinatorKind) -> &'static str {
        match (kind, self.compressed) {
            (CombinatorKind::Descendant, _) => " ",
            (CombinatorKind::Child, false) => " > ",
            (CombinatorKind::Child, true) => ">",
            (CombinatorKind::AdjacentSibling, false) => " + ",
            (CombinatorKind::AdjacentSibling, true) => "+",
            (CombinatorKind::GeneralSibling, false) => " ~ ",
            (CombinatorKind::GeneralSibling, true) => "~",
        }
    }

    fn number(&self, value: f64) -> String {
        let text = value.to_string();
        if !self.compressed {
            return text;
        }
        if let Some(fraction) = text.strip_prefix("0.") {
            format!(".{fraction}")
        } else if let Some(fraction) = text.strip_prefix("-0.") {
            format!("-.{fraction}")
        } else {
            text
        }
    }

    fn indent(&self, out: &mut String, depth: usize) {
        if !self.compressed {
            out.push_str(&INDENT.repeat(depth));
        }
    }

    fn newline(&self, out: &mut String) {
        if !self.compressed {
            out.push('\n');
        }
    }
}
