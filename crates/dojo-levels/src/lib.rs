//! gitdojo level engine
//!
//! Parses level descriptors, resolves localized level text, evaluates
//! solution predicates against the learner's git repository and rotates
//! through hints.

pub mod builtin;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod level;
pub mod loader;
pub mod locale;
pub mod progress;
pub mod registry;
pub mod repository;
pub mod ui;

pub use builtin::BUILTIN_LEVELS;
pub use config::{Config, CONFIG_FILE_NAME};
pub use descriptor::{Binding, Descriptor, DescriptorError};
pub use error::{DojoError, ProbeError, Result};
pub use level::{Evaluation, Level, LevelState, HIDDEN_GIT_DIR};
pub use loader::{LevelLoader, DESCRIPTOR_EXTENSION};
pub use locale::{
    Catalog, CatalogValue, JsonCatalog, Locale, LocalizationResolver, MemoryCatalog, TextKind,
    DEFAULT_LOCALE,
};
pub use progress::{HintProgressStore, Profile, ProfileStore};
pub use registry::{
    HandlerRegistry, HintAction, LevelHandler, SetupAction, SetupOutput, SolutionPredicate,
};
pub use repository::{
    GitWorkspace, GitWorkspaceFactory, ProbeResult, RepositoryFactory, RepositoryHandle,
};
pub use ui::{Prompt, RecordingUi, TerminalUi, Ui};
