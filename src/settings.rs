use rework::AutoRefiner;

/// Which units the built-in refiner parses as they are broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AutoRefine {
    /// Leave refinement to registered plugins.
    #[default]
    None,
    Selectors,
    Declarations,
    AtRules,
    All,
}

impl AutoRefine {
    pub fn refiner(self) -> Option<AutoRefiner> {
        match self {
            AutoRefine::None => None,
            AutoRefine::Selectors => Some(AutoRefiner::new().selectors()),
            AutoRefine::Declarations => Some(AutoRefiner::new().declarations()),
            AutoRefine::AtRules => Some(AutoRefiner::new().at_rules()),
            AutoRefine::All => Some(AutoRefiner::all()),
        }
    }
}

/// Options for a [`crate::Rework`] run.
#[derive(Clone, Debug)]
pub struct Settings {
    pub auto_refine: AutoRefine,
    /// Write compressed output.
    pub compressed: bool,
    /// Fail the run when validation reported errors.
    pub fail_on_errors: bool,
    pub warnings_as_errors: bool,
    /// Prefix for reported diagnostics, usually a file name.
    pub source_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_refine: AutoRefine::None,
            compressed: false,
            fail_on_errors: true,
            warnings_as_errors: false,
            source_name: None,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_refine(mut self, auto_refine: AutoRefine) -> Self {
        self.auto_refine = auto_refine;
        self
    }

    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    pub fn fail_on_errors(mut self, fail_on_errors: bool) -> Self {
        self.fail_on_errors = fail_on_errors;
        self
    }

    pub fn warnings_as_errors(mut self, warnings_as_errors: bool) -> Self {
        self.warnings_as_errors = warnings_as_errors;
        self
    }

    pub fn source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fail_on_errors_without_refining() {
        let settings = Settings::default();
        assert_eq!(settings.auto_refine, AutoRefine::None);
        assert!(settings.fail_on_errors);
        assert!(!settings.compressed);
        assert!(AutoRefine::None.refiner().is_none());
    }

    #[test]
    fn builder_setters() {
        let settings = Settings::new()
            .auto_refine(AutoRefine::All)
            .compressed(true)
            .fail_on_errors(false)
            .warnings_as_errors(true)
            .source_name("site.css");
        assert_eq!(settings.auto_refine.refiner(), Some(AutoRefiner::all()));
        assert!(settings.compressed);
        assert!(!settings.fail_on_errors);
        assert!(settings.warnings_as_errors);
        assert_eq!(settings.source_name.as_deref(), Some("site.css"));
    }
}
