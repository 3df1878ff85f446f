//! Compiled level logic, looked up by name.
//!
//! Descriptors never carry executable code. Their `setup`, `solution` and
//! `hint` bindings name a [`LevelHandler`] in a [`HandlerRegistry`], by
//! default the one registered under the level's own id.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::ProbeError;
use crate::repository::RepositoryHandle;
use crate::ui::{Prompt, Ui};

/// Value a setup action hands back to the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SetupOutput {
    /// Nothing to report.
    #[default]
    None,
    /// Text to show the learner.
    Text(String),
    /// A file the setup created.
    File(PathBuf),
}

/// Prepares the starter repository state.
pub type SetupAction = Rc<dyn Fn(&mut dyn RepositoryHandle) -> Result<SetupOutput, ProbeError>>;

/// Decides whether the learner's repository solves the level, asking the
/// learner through the prompt where the level needs answers.
pub type SolutionPredicate =
    Rc<dyn Fn(&mut dyn RepositoryHandle, &mut dyn Prompt) -> Result<bool, ProbeError>>;

/// Custom hint display.
pub type HintAction = Rc<dyn Fn(&mut dyn Ui)>;

/// The logic capabilities of one level.
#[derive(Clone, Default)]
pub struct LevelHandler {
    setup: Option<SetupAction>,
    solution: Option<SolutionPredicate>,
    hint: Option<HintAction>,
}

impl fmt::Debug for LevelHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelHandler")
            .field("setup", &self.setup.is_some())
            .field("solution", &self.solution.is_some())
            .field("hint", &self.hint.is_some())
            .finish()
    }
}

impl LevelHandler {
    /// Creates a handler with no capabilities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a setup action.
    #[must_use]
    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&mut dyn RepositoryHandle) -> Result<SetupOutput, ProbeError> + 'static,
    {
        self.setup = Some(Rc::new(setup));
        self
    }

    /// Adds a solution predicate that only inspects the repository.
    #[must_use]
    pub fn with_solution<F>(self, solution: F) -> Self
    where
        F: Fn(&mut dyn RepositoryHandle) -> Result<bool, ProbeError> + 'static,
    {
        self.with_interactive_solution(
            move |repo: &mut dyn RepositoryHandle, _: &mut dyn Prompt| solution(repo),
        )
    }

    /// Adds a solution predicate that may also question the learner.
    #[must_use]
    pub fn with_interactive_solution<F>(mut self, solution: F) -> Self
    where
        F: Fn(&mut dyn RepositoryHandle, &mut dyn Prompt) -> Result<bool, ProbeError> + 'static,
    {
        self.solution = Some(Rc::new(solution));
        self
    }

    /// Adds a hint action.
    #[must_use]
    pub fn with_hint<F>(mut self, hint: F) -> Self
    where
        F: Fn(&mut dyn Ui) + 'static,
    {
        self.hint = Some(Rc::new(hint));
        self
    }

    pub(crate) fn setup(&self) -> Option<SetupAction> {
        self.setup.clone()
    }

    pub(crate) fn solution(&self) -> Option<SolutionPredicate> {
        self.solution.clone()
    }

    pub(crate) fn hint(&self) -> Option<HintAction> {
        self.hint.clone()
    }
}

/// Handlers by name.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, LevelHandler>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in levels.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::builtin::register_all(&mut registry);
        registry
    }

    /// Registers `handler` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, handler: LevelHandler) -> &mut Self {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::debug!(handler = %name, "Replaced level handler");
        }
        self
    }

    /// Looks up a handler.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LevelHandler> {
        self.handlers.get(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}
