//! Grammar rules.
//!
//! Each rule reads from a [`Source`], builds units and broadcasts every unit
//! it builds exactly once. Statement-level rules keep nested content raw; the
//! raw text is parsed later by [`Grammar::refine_content`].

use crate::ast::{AtRule, Declaration, Kind, NodeId, Raw, Syntax};
use crate::broadcast::Sender;
use crate::error::{Message, ParserError, Result};
use crate::parser::lexer::{self, collapse_whitespace, ident, scan_until};
use crate::parser::{Source, selectors, values};
use crate::refine::hold;

/// The CSS grammar.
#[derive(Clone, Copy, Debug, Default)]
pub struct Grammar;

impl Grammar {
    pub fn new() -> Self {
        Self
    }

    /// Parse a whole stylesheet and return its root.
    ///
    /// Top-level statements are emitted one by one as soon as each is attached
    /// to the root; the root itself is broadcast last.
    pub fn stylesheet(
        &self,
        source: &mut Source<'_>,
        sender: &mut Sender<'_, '_>,
    ) -> Result<NodeId> {
        let root = sender.ast_mut().create(Syntax::Stylesheet, Some(source.position()));
        loop {
            skip_filler(source)?;
            if source.is_empty() {
                break;
            }
            let held = hold(sender, |sender| {
                if self.statement(source, sender)? {
                    Ok(())
                } else {
                    Err(unexpected(source).into())
                }
            })?;
            held.attach(root, sender)?;
            held.release(sender)?;
        }
        sender.broadcast(root)?;
        Ok(root)
    }

    /// Parse statements until the source runs out.
    pub fn statements(&self, source: &mut Source<'_>, sender: &mut Sender<'_, '_>) -> Result<()> {
        loop {
            skip_filler(source)?;
            if source.is_empty() {
                return Ok(());
            }
            if !self.statement(source, sender)? {
                return Err(unexpected(source).into());
            }
        }
    }

    /// A rule or an at-rule.
    pub fn statement(&self, source: &mut Source<'_>, sender: &mut Sender<'_, '_>) -> Result<bool> {
        source.skip_whitespace()?;
        match source.peek() {
            None | Some('}') => Ok(false),
            Some('@') => self.at_rule(source, sender),
            Some(_) => self.rule(source, sender),
        }
    }

    /// `selector, selector { declarations }`
    ///
    /// Selectors and declarations are broadcast raw. The rule is broadcast
    /// once its children are attached; the children are released after it.
    pub fn rule(&self, source: &mut Source<'_>, sender: &mut Sender<'_, '_>) -> Result<bool> {
        source.skip_whitespace()?;
        let prelude = scan_until(source.rest(), &['{', ';', '}']);
        if prelude.before.trim().is_empty() {
            return Ok(false);
        }
        if prelude.stop != Some('{') {
            return Err(unexpected(source).into());
        }

        let rule = sender.ast_mut().create(Syntax::Rule, Some(source.position()));
        let held = hold(sender, |sender| {
            loop {
                if !self.selector(source, sender)? {
                    return Err(source.error(Message::ExpectedSelector).into());
                }
                source.skip_whitespace()?;
                if !source.eat(',') {
                    break;
                }
            }
            source.skip_whitespace()?;
            let (after, inner) =
                lexer::block(source.rest()).map_err(|_| source.error(Message::UnclosedBlock))?;
            let mut body = source.sub(inner);
            self.declarations(&mut body, sender)?;
            source.advance_to(after);
            Ok(())
        })?;
        held.attach(rule, sender)?;
        sender.broadcast(rule)?;
        held.release(sender)?;
        Ok(true)
    }

    /// `@name expression;` or `@name expression { block }`, both kept raw.
    pub fn at_rule(&self, source: &mut Source<'_>, sender: &mut Sender<'_, '_>) -> Result<bool> {
        source.skip_whitespace()?;
        let position = source.position();
        if !source.eat('@') {
            return Ok(false);
        }
        let (rest, name) =
            ident(source.rest()).map_err(|_| source.error(Message::MissingAtRuleName))?;
        source.advance_to(rest);

        let mut at_rule = AtRule::new(name);
        let prelude = scan_until(source.rest(), &['{', ';', '}']);
        let expression = prelude.before.trim();
        if !expression.is_empty() {
            at_rule.expression = Some(Raw::new(expression, Some(source.position_of(expression))));
        }
        source.advance_to(prelude.after);

        match prelude.stop {
            Some('{') => {
                let (after, inner) =
                    lexer::block(source.rest()).map_err(|_| source.error(Message::UnclosedBlock))?;
                at_rule.block = Some(Raw::new(inner, Some(source.position_of(inner))));
                source.advance_to(after);
            }
            Some(';') => source.advance(1),
            _ => {}
        }

        let unit = sender
            .ast_mut()
            .create_lazy(Syntax::AtRule(at_rule), None, Some(position));
        sender.broadcast(unit)?;
        Ok(true)
    }

    /// One raw selector, up to the next top-level `,` or `{`.
    pub fn selector(&self, source: &mut Source<'_>, sender: &mut Sender<'_, '_>) -> Result<bool> {
        source.skip_whitespace()?;
        let split = scan_until(source.rest(), &[',', '{', '}', ';']);
        let text = split.before.trim_end();
        if text.is_empty() {
            return Ok(false);
        }
        let position = source.position();
        let unit = sender.ast_mut().create_lazy(
            Syntax::Selector,
            Some(Raw::new(text, Some(position))),
            Some(position),
        );
        source.advance(text.len());
        sender.broadcast(unit)?;
        Ok(true)
    }

    /// Declarations separated by `;`.
    pub fn declarations(&self, source: &mut Source<'_>, sender: &mut Sender<'_, '_>) -> Result<()> {
        loop {
            source.skip_whitespace()?;
            if source.is_empty() {
                return Ok(());
            }
            if source.eat(';') {
                continue;
            }
            if !self.declaration(source, sender)? {
                return Err(source.error(Message::ExpectedDeclaration).into());
            }
        }
    }

    /// `property: value [!important]` with the value kept raw.
    pub fn declaration(
        &self,
        source: &mut Source<'_>,
        sender: &mut Sender<'_, '_>,
    ) -> Result<bool> {
        source.skip_whitespace()?;
        let position = source.position();
        let split = scan_until(source.rest(), &[';', '}']);
        if split.before.trim().is_empty() {
            return Ok(false);
        }

        let colon = scan_until(split.before, &[':']);
        let property = colon.before.trim();
        let valid_property = matches!(ident(property), Ok(("", _)));
        if colon.stop.is_none() || !valid_property {
            return Err(ParserError::new(position, Message::ExpectedDeclaration).into());
        }

        let mut value = colon.after[1..].trim();
        let mut important = false;
        let bang = scan_until(value, &['!']);
        if bang.stop.is_some() && bang.after[1..].trim().eq_ignore_ascii_case("important") {
            value = bang.before.trim_end();
            important = true;
        }
        if value.is_empty() {
            let message = Message::MissingValue(property.to_string());
            return Err(ParserError::new(position, message).into());
        }

        let property = if property.starts_with("--") {
            property.to_string()
        } else {
            property.to_ascii_lowercase()
        };
        let raw = Raw::new(value, Some(source.position_of(value)));
        let unit = sender.ast_mut().create_lazy(
            Syntax::Declaration(Declaration::new(property).important(important)),
            Some(raw),
            Some(position),
        );
        source.advance_to(split.after);
        sender.broadcast(unit)?;
        Ok(true)
    }

    /// Parse the raw content of a refinable unit and broadcast what it holds.
    pub fn refine_content(&self, unit: NodeId, sender: &mut Sender<'_, '_>) -> Result<()> {
        let node = sender.ast().node(unit);
        match node.kind() {
            Kind::Selector => {
                let Some(raw) = node.raw().cloned() else {
                    return Ok(());
                };
                let mut source = Source::at(&raw.text, raw.position);
                selectors::selector_parts(&mut source, sender)?;
                Ok(source.expect_consumed()?)
            }
            Kind::Declaration => {
                let custom = matches!(
                    node.syntax(),
                    Syntax::Declaration(declaration) if declaration.is_custom()
                );
                let Some(raw) = node.raw().cloned() else {
                    return Ok(());
                };
                let mut source = Source::at(&raw.text, raw.position);
                values::terms(&mut source, custom, sender)?;
                Ok(source.expect_consumed()?)
            }
            Kind::AtRule => {
                let Syntax::AtRule(at_rule) = node.syntax().clone() else {
                    return Ok(());
                };
                if let Some(expression) = &at_rule.expression {
                    let expression = sender.ast_mut().create(
                        Syntax::AtRuleExpression {
                            text: collapse_whitespace(&expression.text),
                        },
                        expression.position,
                    );
                    sender.broadcast(expression)?;
                }
                if let Some(block) = &at_rule.block {
                    let mut source = Source::at(&block.text, block.position);
                    if at_rule.has_declaration_block() {
                        self.declarations(&mut source, sender)?;
                    } else {
                        self.statements(&mut source, sender)?;
                    }
                    source.expect_consumed()?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Whitespace, comments and the HTML comment markers `<!--` / `-->`.
fn skip_filler(source: &mut Source<'_>) -> Result<()> {
    loop {
        source.skip_whitespace()?;
        let rest = source.rest();
        if rest.starts_with("<!--") {
            source.advance(4);
        } else if rest.starts_with("-->") {
            source.advance(3);
        } else {
            return Ok(());
        }
    }
}

fn unexpected(source: &Source<'_>) -> ParserError {
    let rest = source.rest().trim();
    let snippet = rest.lines().next().unwrap_or_default();
    source.error(Message::UnexpectedContent(snippet.to_string()))
}
