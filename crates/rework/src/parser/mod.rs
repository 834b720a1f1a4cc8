//! Parsing CSS into the tree.
//!
//! - [`source`]: cursor over source text with positions
//! - [`lexer`]: identifiers, strings, numbers, blocks and the top-level scanner
//! - [`grammar`]: statement-level rules and refinement entry points
//! - [`selectors`]: selector parts
//! - [`values`]: declaration value terms

pub mod grammar;
pub mod lexer;
pub mod selectors;
pub mod source;
pub mod values;

pub use grammar::Grammar;
pub use source::Source;

use crate::ast::NodeId;
use crate::broadcast::Sender;
use crate::error::Result;

/// Parse `text` as a stylesheet through `sender` and return the root.
pub fn parse_stylesheet(text: &str, sender: &mut Sender<'_, '_>) -> Result<NodeId> {
    let grammar = sender.grammar();
    let mut source = Source::new(text);
    let root = grammar.stylesheet(&mut source, sender)?;
    source.expect_consumed()?;
    Ok(root)
}
