//! Error types for parsing, subscription dispatch and tree edits.
//!
//! Parse errors are fatal to the parse that raised them. Subscription errors
//! split into configuration problems, rejected when a plugin registers, and
//! errors raised while a handler runs. See [`crate::emitter`] for which of
//! those are contained and which propagate.

use thiserror::Error;

use crate::ast::{Kind, NodeId, SourcePosition};
use crate::subscription::EventType;

/// What went wrong while parsing, without the position.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Text left over after a grammar rule finished.
    #[error("unparsable remainder `{0}`")]
    UnparsableRemainder(String),

    /// A `{` without its matching `}`.
    #[error("unclosed block")]
    UnclosedBlock,

    #[error("unclosed string")]
    UnclosedString,

    #[error("unclosed comment")]
    UnclosedComment,

    /// A selector group or a selector snippet with nothing in it.
    #[error("expected a selector")]
    ExpectedSelector,

    #[error("expected a declaration")]
    ExpectedDeclaration,

    /// A property followed by a colon and nothing else.
    #[error("missing value for `{0}`")]
    MissingValue(String),

    #[error("invalid selector `{0}`")]
    InvalidSelector(String),

    /// A declaration value term no value rule accepts.
    #[error("invalid value `{0}`")]
    InvalidTerm(String),

    /// Content where neither a rule nor an at-rule can start.
    #[error("unexpected `{0}`")]
    UnexpectedContent(String),

    #[error("missing at-rule name")]
    MissingAtRuleName,
}

/// A parse failure and where it happened.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{message} at {position}")]
pub struct ParserError {
    pub position: SourcePosition,
    pub message: Message,
}

impl ParserError {
    pub fn new(position: SourcePosition, message: Message) -> Self {
        Self { position, message }
    }
}

/// Errors raised by plugin registration, broadcaster stages and handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// A name filter on an event type whose units carry no name.
    #[error("name filter `{filter}` on {event_type}, which has no name")]
    NameFilterOnUnnamed { filter: String, event_type: EventType },

    #[error("empty name filter on {0}")]
    EmptyNameFilter(EventType),

    /// A refine handler on an event type covering kinds that keep no raw text.
    #[error("refine handler on {0}, which is not refinable")]
    RefineOnNonRefinable(EventType),

    /// A single-unit guard received the wrong kind of unit.
    #[error("expected a {expected}, got a {actual}")]
    UnexpectedKind { expected: Kind, actual: Kind },

    /// A single-unit guard received more than one unit.
    #[error("received a second unit {0} where exactly one was expected")]
    SecondUnit(NodeId),

    /// `find_only` matched more than one logged unit.
    #[error("found {count} units where at most one was expected")]
    MultipleFound { count: usize },

    /// Raised by a handler about its input. Reported, never fatal.
    #[error("{0}")]
    Plugin(String),

    /// Any other error out of a handler, naming the subscriber. Fatal.
    #[error("unexpected error in {subscriber}: {message}")]
    Unexpected { subscriber: String, message: String },

    /// A stage handle that is not in the chain, or not of the expected type.
    #[error("no stage with that handle in the chain")]
    MissingStage,
}

impl SubscriptionError {
    /// Create a plugin-raised error; these are reported, not fatal.
    pub fn plugin(message: impl Into<String>) -> Self {
        SubscriptionError::Plugin(message.into())
    }

    /// Whether this error points at a wiring mistake rather than at input.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, SubscriptionError::Plugin(_))
    }
}

/// Structural edits the tree refuses.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// Inserting or moving next to a unit that has no parent.
    #[error("unit {0} is not attached to a parent")]
    Detached(NodeId),

    #[error("unit {0} is already attached")]
    AlreadyAttached(NodeId),

    /// Attaching a destroyed unit, or attaching under one.
    #[error("unit {0} was destroyed")]
    Destroyed(NodeId),

    /// Attaching a unit inside its own sub-tree.
    #[error("attaching {0} would make it its own ancestor")]
    Cycle(NodeId),

    #[error("no unit {0} in this tree")]
    Missing(NodeId),
}

/// Every error the engine returns.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParserError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Anything else a handler fails with.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error>),
}

impl Error {
    pub fn other(message: impl Into<String>) -> Self {
        Error::Other(message.into().into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_error_names_position() {
        let error = ParserError::new(
            SourcePosition::new(3, 7),
            Message::UnparsableRemainder("}".to_string()),
        );
        assert_eq!(error.to_string(), "unparsable remainder `}` at line 3, column 7");
    }

    #[test]
    fn messages_render_their_details() {
        assert_eq!(Message::UnclosedBlock.to_string(), "unclosed block");
        assert_eq!(
            Message::MissingValue("color".to_string()).to_string(),
            "missing value for `color`"
        );
    }

    #[test]
    fn only_plugin_errors_are_not_configuration() {
        assert!(!SubscriptionError::plugin("nope").is_configuration());
        assert!(SubscriptionError::MissingStage.is_configuration());
        assert!(
            SubscriptionError::UnexpectedKind {
                expected: Kind::Selector,
                actual: Kind::Declaration,
            }
            .is_configuration()
        );
    }

    #[test]
    fn other_wraps_plain_messages() {
        let error = Error::other("boom");
        assert_eq!(error.to_string(), "boom");
    }
}
