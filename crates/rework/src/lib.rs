//! # rework
//!
//! A CSS syntax tree that plugins refine, rework and validate while it is
//! being parsed.
//!
//! Grammar rules build units and announce each one with `broadcast`. The
//! announcement travels through a stack of broadcaster [`Chain`]s (collectors,
//! queues, guards) and ends at the emitter, which runs the subscriptions of
//! every registered [`Plugin`] matching the unit, phase by phase:
//!
//! 1. **Refine**: lazy parsing of raw selectors, declarations and at-rules
//! 2. **Process**: observation and rework of the tree
//! 3. **Validate**: read-only checks reporting to an [`ErrorManager`]
//!
//! Selectors, declaration values and at-rule blocks are kept as raw text until
//! a refine subscriber asks for them to be parsed, so plugins only pay for the
//! detail they look at.
//!
//! ## Quick Start
//!
//! ```rust
//! use rework::parser::parse_stylesheet;
//! use rework::{Ast, DefaultErrorManager, Env, Grammar, Phase, Registry, Sender, Writer};
//!
//! let mut ast = Ast::new();
//! let registry = Registry::new();
//! let grammar = Grammar::new();
//! let mut errors = DefaultErrorManager::new();
//! let mut env = Env::new(&mut ast, &registry, &grammar, &mut errors, Phase::Process);
//! let root = parse_stylesheet(".a { color: red }", &mut Sender::new(&mut env)).unwrap();
//!
//! assert_eq!(Writer::new(&ast).write(root), ".a {\n  color: red;\n}\n");
//! ```
//!
//! ## Modules
//!
//! - [`ast`]: the arena tree, node kinds and capabilities
//! - [`broadcast`]: chains and their stages
//! - [`emitter`]: phase-aware dispatch to subscriptions
//! - [`subscription`]: plugins and the registry
//! - [`refine`]: the lazy refinement protocol
//! - [`parser`]: source cursor, lexical rules and grammar
//! - [`writer`]: CSS output

pub mod ast;
pub mod auto_refine;
pub mod broadcast;
pub mod context;
pub mod emitter;
pub mod error;
pub mod error_manager;
pub mod parser;
pub mod refine;
pub mod status;
pub mod subscription;
pub mod writer;

pub use ast::{Ast, Capabilities, Kind, Node, NodeId, SourcePosition, Syntax};
pub use auto_refine::AutoRefiner;
pub use broadcast::{Broadcaster, Chain, Next, Sender, StageId};
pub use context::Context;
pub use emitter::Env;
pub use error::{Error, Message, ParserError, Result, SubscriptionError, TreeError};
pub use error_manager::{DefaultErrorManager, Diagnostic, ErrorLevel, ErrorManager};
pub use parser::Grammar;
pub use status::{Phase, Status};
pub use subscription::{EventType, HandlerResult, Marker, Plugin, Registry, Subscriptions};
pub use writer::Writer;
