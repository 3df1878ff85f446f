//! Turns descriptor files into [`Level`]s.
//!
//! The loader owns everything a level needs from its surroundings: the
//! handler registry its bindings resolve against, the localization resolver,
//! the repository factory and the UI. A missing descriptor is `Ok(None)`;
//! a present but broken one is `DojoError::LoadError`.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::builtin::BUILTIN_LEVELS;
use crate::descriptor::{Binding, Descriptor};
use crate::error::{DojoError, Result};
use crate::level::{Level, LevelParts};
use crate::locale::{LocalizationResolver, TextKind};
use crate::registry::{HandlerRegistry, LevelHandler, SetupOutput};
use crate::repository::RepositoryFactory;
use crate::ui::Ui;

/// Descriptor file extension.
pub const DESCRIPTOR_EXTENSION: &str = "level";

/// Ids that can name a descriptor file.
static LEVEL_ID: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").ok());

/// Loads levels from a directory of descriptors.
pub struct LevelLoader {
    levels_dir: PathBuf,
    workdir: PathBuf,
    level_order: Vec<String>,
    registry: Rc<HandlerRegistry>,
    resolver: LocalizationResolver,
    repositories: Rc<dyn RepositoryFactory>,
    ui: Rc<RefCell<dyn Ui>>,
}

impl std::fmt::Debug for LevelLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelLoader")
            .field("levels_dir", &self.levels_dir)
            .field("workdir", &self.workdir)
            .field("level_order", &self.level_order)
            .field("locale", self.resolver.locale())
            .finish_non_exhaustive()
    }
}

impl LevelLoader {
    /// Creates a loader reading `<levels_dir>/<id>.level`.
    ///
    /// Starts with the default locale, the built-in level order and the
    /// current directory as working directory.
    #[must_use]
    pub fn new(
        levels_dir: impl Into<PathBuf>,
        registry: Rc<HandlerRegistry>,
        repositories: Rc<dyn RepositoryFactory>,
        ui: Rc<RefCell<dyn Ui>>,
    ) -> Self {
        Self {
            levels_dir: levels_dir.into(),
            workdir: PathBuf::from("."),
            level_order: BUILTIN_LEVELS.iter().map(ToString::to_string).collect(),
            registry,
            resolver: LocalizationResolver::default(),
            repositories,
            ui,
        }
    }

    /// Uses `resolver` for descriptions and requests.
    #[must_use]
    pub fn with_localization(mut self, resolver: LocalizationResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Sets the level order used for numbering and progression.
    #[must_use]
    pub fn with_level_order(mut self, order: Vec<String>) -> Self {
        self.level_order = order;
        self
    }

    /// Sets the directory level content is copied into.
    #[must_use]
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Directory holding the descriptors.
    #[must_use]
    pub fn levels_dir(&self) -> &Path {
        &self.levels_dir
    }

    /// Level ids in play order.
    #[must_use]
    pub fn level_order(&self) -> &[String] {
        &self.level_order
    }

    /// Level after `id` in play order, if any.
    #[must_use]
    pub fn next_level(&self, id: &str) -> Option<&str> {
        let position = self.level_order.iter().position(|l| l == id)?;
        self.level_order.get(position + 1).map(String::as_str)
    }

    /// Where the descriptor for `id` lives.
    #[must_use]
    pub fn descriptor_path(&self, id: &str) -> PathBuf {
        self.levels_dir.join(format!("{id}.{DESCRIPTOR_EXTENSION}"))
    }

    /// Loads the level with the given id.
    ///
    /// Returns `Ok(None)` if no descriptor exists for `id`.
    ///
    /// # Errors
    ///
    /// Returns `DojoError::LoadError` for a malformed descriptor, and
    /// `DojoError::TranslationMismatch` if its description translation is
    /// unusable.
    pub fn load(&self, id: &str) -> Result<Option<Level>> {
        let valid = LEVEL_ID.as_ref().is_some_and(|re| re.is_match(id));
        if !valid {
            tracing::debug!(level = %id, "Not a level id");
            return Ok(None);
        }
        self.load_from_file(&self.descriptor_path(id))
    }

    /// Loads a level from a descriptor file. The level id is the file stem.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`LevelLoader::load`], plus `DojoError::Io` if the file
    /// exists but cannot be read.
    pub fn load_from_file(&self, path: &Path) -> Result<Option<Level>> {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No level descriptor");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            return Err(DojoError::load_error(
                path,
                "file name is not a valid level id",
                "Rename the descriptor to <id>.level using lowercase letters, digits, '-' and '_'",
            ));
        };

        let descriptor = Descriptor::parse(&source)
            .map_err(|e| DojoError::load_error(path, e.to_string(), e.suggestion()))?;
        let level = self.build(path, id, descriptor)?;

        tracing::debug!(
            level = %level.id(),
            number = ?level.number(),
            difficulty = level.difficulty(),
            "Level loaded"
        );
        Ok(Some(level))
    }

    /// Loads a level from a descriptor file and sets it up.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`LevelLoader::load_from_file`] and [`Level::setup_level`].
    pub fn setup(&self, path: &Path) -> Result<Option<SetupOutput>> {
        match self.load_from_file(path)? {
            Some(mut level) => level.setup_level().map(Some),
            None => Ok(None),
        }
    }

    fn build(&self, path: &Path, id: &str, descriptor: Descriptor) -> Result<Level> {
        let invalid = |message: String, suggestion: &str| {
            DojoError::load_error(path, message, suggestion)
        };

        let difficulty = match descriptor.difficulty {
            None => 1,
            Some(0) => {
                return Err(invalid(
                    "difficulty must be at least 1".to_string(),
                    "Use a difficulty of 1 or more, or leave it out for 1",
                ))
            }
            Some(n) => n,
        };

        let Some(solution_binding) = &descriptor.solution else {
            return Err(invalid(
                "missing 'solution'".to_string(),
                "Add a 'solution' line; every level needs one",
            ));
        };

        if descriptor.hints.is_some() && descriptor.hint.is_some() {
            return Err(invalid(
                "'hints' and 'hint' cannot both be declared".to_string(),
                "Keep either the 'hints' list or the 'hint' binding",
            ));
        }

        let solution = self
            .handler(path, id, "solution", solution_binding)?
            .solution()
            .ok_or_else(|| missing_capability(path, id, solution_binding, "solution"))?;

        let setup = match &descriptor.setup {
            Some(binding) => Some(
                self.handler(path, id, "setup", binding)?
                    .setup()
                    .ok_or_else(|| missing_capability(path, id, binding, "setup"))?,
            ),
            None => None,
        };

        let hint_action = match &descriptor.hint {
            Some(binding) => Some(
                self.handler(path, id, "hint", binding)?
                    .hint()
                    .ok_or_else(|| missing_capability(path, id, binding, "hint"))?,
            ),
            None => None,
        };

        let default_description = descriptor.description.unwrap_or_default();
        let description =
            self.resolver
                .resolve(TextKind::Description, id, None, &default_description)?;

        Ok(Level::from_parts(LevelParts {
            id: id.to_string(),
            number: self.level_order.iter().position(|l| l == id).map(|i| i + 1),
            difficulty,
            description,
            default_description,
            hints: descriptor.hints.unwrap_or_default(),
            requests: descriptor.requests.unwrap_or_default(),
            setup,
            solution,
            hint_action,
            level_path: self.levels_dir.join(id),
            workdir: self.workdir.clone(),
            resolver: self.resolver.clone(),
            ui: Rc::clone(&self.ui),
            repositories: Rc::clone(&self.repositories),
        }))
    }

    fn handler(&self, path: &Path, id: &str, field: &str, binding: &Binding) -> Result<&LevelHandler> {
        let name = binding.handler_name(id);
        self.registry.get(name).ok_or_else(|| {
            DojoError::load_error(
                path,
                format!("'{field}' refers to '{name}', which has no registered handler"),
                "Bind the field to a registered handler by name, e.g. solution \"init\"",
            )
        })
    }
}

fn missing_capability(path: &Path, id: &str, binding: &Binding, field: &str) -> DojoError {
    let name = binding.handler_name(id);
    DojoError::load_error(
        path,
        format!("handler '{name}' does not provide a {field} action"),
        format!("Remove the '{field}' line or bind it to a handler that provides one"),
    )
}
