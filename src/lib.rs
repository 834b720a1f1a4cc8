//! # rework-rs
//!
//! Runs a CSS stylesheet through registered plugins and writes the result.
//!
//! ```rust
//! use rework_rs::{AutoRefine, Rework, Settings};
//!
//! let mut rework = Rework::new(Settings::new().auto_refine(AutoRefine::All).compressed(true))?;
//! let output = rework.process(".a { color: red; margin: 0.5em }")?;
//! assert_eq!(output.css, ".a{color:red;margin:.5em}");
//! # Ok::<(), rework_rs::ReworkError>(())
//! ```

pub mod error;
pub mod log_init;
pub mod settings;

use std::path::Path;
use std::rc::Rc;

use rework::broadcast::VisitingBroadcaster;
use rework::parser::parse_stylesheet;
use rework::{
    Ast, Broadcaster, Chain, DefaultErrorManager, Diagnostic, Env, ErrorManager, Grammar, Kind,
    NodeId, Phase, Plugin, Registry, Sender, StageId, Status, SubscriptionError, Writer,
};

pub use error::{Result, ReworkError};
pub use log_init::init_logger;
pub use settings::{AutoRefine, Settings};

/// What a run produced.
#[derive(Debug)]
pub struct Output {
    pub css: String,
    pub ast: Ast,
    pub root: NodeId,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses, reworks, validates and writes stylesheets with a fixed set of
/// plugins.
pub struct Rework {
    settings: Settings,
    registry: Registry,
    grammar: Grammar,
    root: Chain,
    visiting: StageId,
}

impl Rework {
    pub fn new(settings: Settings) -> Result<Self> {
        let mut root = Chain::new();
        let visiting = root.chain(VisitingBroadcaster::of(Kind::Stylesheet));
        let mut rework = Self {
            settings,
            registry: Registry::new(),
            grammar: Grammar::new(),
            root,
            visiting,
        };
        if let Some(refiner) = rework.settings.auto_refine.refiner() {
            rework.register(refiner)?;
        }
        Ok(rework)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register `plugin` and hand back a shared handle to it.
    pub fn register<P: Plugin>(&mut self, plugin: P) -> Result<Rc<P>> {
        let plugin = Rc::new(plugin);
        self.register_shared(Rc::clone(&plugin))?;
        Ok(plugin)
    }

    /// Register a plugin instance the caller keeps. Registering the same
    /// instance twice is a no-op that returns `false`.
    pub fn register_shared<P: Plugin>(&mut self, plugin: Rc<P>) -> Result<bool> {
        Ok(self.registry.register(plugin)?)
    }

    /// Append a stage to the root chain, which sees every unit on its way to
    /// the emitter during parsing: parsed, refined and inserted by plugins.
    /// Stages keep their state across runs.
    pub fn chain<B: Broadcaster>(&mut self, stage: B) -> StageId {
        self.root.chain(stage)
    }

    pub fn stage<B: Broadcaster>(&self, id: StageId) -> Option<&B> {
        self.root.get(id)
    }

    pub fn stage_mut<B: Broadcaster>(&mut self, id: StageId) -> Option<&mut B> {
        self.root.get_mut(id)
    }

    pub fn process_file(&mut self, path: impl AsRef<Path>) -> Result<Output> {
        let source = std::fs::read_to_string(path)?;
        self.process(&source)
    }

    pub fn process(&mut self, source: &str) -> Result<Output> {
        let mut ast = Ast::new();
        let mut errors =
            DefaultErrorManager::new().warnings_as_errors(self.settings.warnings_as_errors);
        if let Some(name) = &self.settings.source_name {
            errors = errors.source_name(name.clone());
        }
        if let Some(visitor) = self.root.get_mut::<VisitingBroadcaster>(self.visiting) {
            visitor.reset();
        }

        let root = {
            let mut env = Env::new(
                &mut ast,
                &self.registry,
                &self.grammar,
                &mut errors,
                Phase::Process,
            )
            .with_root(std::mem::take(&mut self.root));

            log::debug!("parsing {} bytes", source.len());
            let parsed = parse_stylesheet(source, &mut Sender::new(&mut env));
            self.root = env.take_root();
            let root = parsed?;

            log::debug!("validating from {root}");
            env.set_phase(Phase::Validate);
            let visitor = self
                .root
                .get_mut::<VisitingBroadcaster>(self.visiting)
                .ok_or(SubscriptionError::MissingStage)?;
            let visited =
                visitor.visit(&mut Sender::new(&mut env), |status| status < Status::Validated);
            visitor.reset();
            visited?;
            root
        };

        if self.settings.fail_on_errors && errors.has_errors() {
            return Err(ReworkError::Validation(errors.summarize().unwrap_or_default()));
        }

        log::debug!("writing");
        let css = Writer::new(&ast).compressed(self.settings.compressed).write(root);
        Ok(Output {
            css,
            ast,
            root,
            diagnostics: errors.into_diagnostics(),
        })
    }
}
