//! Configuration types for gitdojo.
//!
//! Controls where level descriptors and translation catalogs live, which
//! locale is active, the learner's working directory, and the order in which
//! levels are played.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::builtin::BUILTIN_LEVELS;
use crate::error::{DojoError, Result};
use crate::locale::DEFAULT_LOCALE;

/// The config file name.
pub const CONFIG_FILE_NAME: &str = "dojo.json";

/// Accepted locale tags (`en`, `de`, `pt-BR`, `zh_CN`).
static LOCALE_TAG: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}(?:[-_][A-Za-z0-9]{2,8})?$").ok());

/// Default directory holding `<id>.level` descriptors.
fn default_levels_dir() -> String {
    "levels".to_string()
}

/// Default directory holding `<locale>.json` catalogs.
fn default_locales_dir() -> String {
    "locales".to_string()
}

/// Default active locale.
fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

/// Default working directory the learner plays in.
fn default_workdir() -> String {
    "git_dojo".to_string()
}

/// Default profile file name, relative to the working directory.
fn default_profile_file() -> String {
    ".profile.json".to_string()
}

/// Default level order: the built-in levels.
fn default_level_order() -> Vec<String> {
    BUILTIN_LEVELS.iter().map(ToString::to_string).collect()
}

/// Main configuration for gitdojo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory containing level descriptors and level content directories.
    #[serde(default = "default_levels_dir")]
    pub levels_dir: String,

    /// Directory containing translation catalogs.
    #[serde(default = "default_locales_dir")]
    pub locales_dir: String,

    /// Active locale tag.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Working directory the learner's repository lives in.
    #[serde(default = "default_workdir")]
    pub workdir: String,

    /// Profile file name inside the working directory.
    #[serde(default = "default_profile_file")]
    pub profile_file: String,

    /// Level ids in play order.
    #[serde(default = "default_level_order")]
    pub level_order: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            levels_dir: default_levels_dir(),
            locales_dir: default_locales_dir(),
            locale: default_locale(),
            workdir: default_workdir(),
            profile_file: default_profile_file(),
            level_order: default_level_order(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `dojo.json` in the current directory. If not found, returns
    /// the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            DojoError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `dojo.json` in a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `DojoError::ConfigParseError` if the file exists but contains
    /// invalid JSON, and `DojoError::ConfigValidationError` if the values are
    /// invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(DojoError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| DojoError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `DojoError::ConfigValidationError` if any validation check fails.
    pub fn validate(&self) -> Result<()> {
        if self.levels_dir.trim().is_empty() {
            return Err(DojoError::config_validation(
                "levelsDir must not be empty",
                "Point levelsDir at the directory holding your .level files in dojo.json",
            ));
        }

        if self.workdir.trim().is_empty() {
            return Err(DojoError::config_validation(
                "workdir must not be empty",
                "Set workdir to the directory you want to play in (e.g. 'git_dojo') in dojo.json",
            ));
        }

        if self.profile_file.trim().is_empty() {
            return Err(DojoError::config_validation(
                "profileFile must not be empty",
                "Set profileFile to a file name such as '.profile.json' in dojo.json",
            ));
        }

        self.validate_workdir()?;

        if !relative_components(&self.profile_file).is_some_and(|parts| parts.len() == 1) {
            return Err(DojoError::config_validation(
                format!("profileFile '{}' must be a plain file name", self.profile_file),
                "Use a file name without directories, such as '.profile.json', in dojo.json",
            ));
        }

        let locale_ok = LOCALE_TAG
            .as_ref()
            .is_some_and(|re| re.is_match(&self.locale));
        if !locale_ok {
            return Err(DojoError::config_validation(
                format!("locale '{}' is not a valid locale tag", self.locale),
                "Use a locale tag such as 'en', 'de' or 'pt-BR' in dojo.json",
            ));
        }

        if self.level_order.is_empty() {
            return Err(DojoError::config_validation(
                "levelOrder must list at least one level",
                "Add level ids to levelOrder in dojo.json or remove it to use the built-in levels",
            ));
        }

        let mut seen = HashSet::new();
        for id in &self.level_order {
            if !seen.insert(id.as_str()) {
                return Err(DojoError::config_validation(
                    format!("levelOrder lists '{id}' more than once"),
                    "Remove the duplicate entry from levelOrder in dojo.json",
                ));
            }
        }

        Ok(())
    }

    /// The working directory is cleared on every level setup, so it must be
    /// a subdirectory of the game directory holding neither levels nor
    /// catalogs.
    fn validate_workdir(&self) -> Result<()> {
        let workdir = match relative_components(&self.workdir) {
            Some(parts) if !parts.is_empty() => parts,
            _ => {
                return Err(DojoError::config_validation(
                    format!(
                        "workdir '{}' must be a subdirectory of the game directory",
                        self.workdir
                    ),
                    "Use a relative directory name such as 'git_dojo' in dojo.json",
                ));
            }
        };

        for (field, dir) in [("levelsDir", &self.levels_dir), ("localesDir", &self.locales_dir)] {
            if relative_components(dir).is_some_and(|parts| parts.starts_with(&workdir)) {
                return Err(DojoError::config_validation(
                    format!("workdir '{}' contains {field} '{dir}'", self.workdir),
                    "Keep workdir apart from levelsDir and localesDir in dojo.json",
                ));
            }
        }

        Ok(())
    }

    /// Resolves `levels_dir` against `base`.
    #[must_use]
    pub fn levels_path(&self, base: &Path) -> PathBuf {
        base.join(&self.levels_dir)
    }

    /// Resolves `locales_dir` against `base`.
    #[must_use]
    pub fn locales_path(&self, base: &Path) -> PathBuf {
        base.join(&self.locales_dir)
    }

    /// Resolves the profile file inside a working directory.
    #[must_use]
    pub fn profile_path(&self, workdir: &Path) -> PathBuf {
        workdir.join(&self.profile_file)
    }
}

/// Normal components of a path that stays inside its base directory.
///
/// Returns `None` for absolute paths and paths using `..`.
fn relative_components(path: &str) -> Option<Vec<&OsStr>> {
    let mut parts = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts)
}
