//! Built-in plugin refining selectors, declarations and at-rules as they are
//! broadcast.

use crate::ast::{Kind, NodeId};
use crate::context::Context;
use crate::parser::Grammar;
use crate::subscription::{HandlerResult, Plugin, Subscriptions};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AutoRefiner {
    selectors: bool,
    declarations: bool,
    at_rules: bool,
}

impl AutoRefiner {
    /// Refines nothing until told what to refine.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self::new().selectors().declarations().at_rules()
    }

    pub fn selectors(mut self) -> Self {
        self.selectors = true;
        self
    }

    pub fn declarations(mut self) -> Self {
        self.declarations = true;
        self
    }

    pub fn at_rules(mut self) -> Self {
        self.at_rules = true;
        self
    }

    fn refine_unit(
        &self,
        unit: NodeId,
        _grammar: &Grammar,
        cx: &mut Context<'_, '_>,
    ) -> HandlerResult {
        cx.refine(unit)?;
        Ok(())
    }
}

impl Plugin for AutoRefiner {
    fn subscribe(&self, subscriptions: &mut Subscriptions<Self>) {
        if self.selectors {
            subscriptions.refine(Kind::Selector, Self::refine_unit);
        }
        if self.declarations {
            subscriptions.refine(Kind::Declaration, Self::refine_unit);
        }
        if self.at_rules {
            subscriptions.refine(Kind::AtRule, Self::refine_unit);
        }
    }

    fn name(&self) -> &'static str {
        "auto-refiner"
    }
}
