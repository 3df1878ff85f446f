//! Learner progress: hint rotation counters and level progression.
//!
//! The level engine only needs [`HintProgressStore`]; [`ProfileStore`] is the
//! JSON-file implementation the CLI uses.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DojoError, Result};

/// Per-level hint counters.
pub trait HintProgressStore {
    /// Returns the hint index to show next for `level_id` and advances the
    /// stored counter.
    fn current_hint_index(&mut self, level_id: &str) -> Result<usize>;
}

/// Persisted learner profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Level currently being played.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_level: Option<String>,

    /// Levels solved so far, in order.
    #[serde(default)]
    pub completed_levels: Vec<String>,

    /// Next hint index per level.
    #[serde(default)]
    pub hint_indices: BTreeMap<String, usize>,

    /// Failed solution attempts per level.
    #[serde(default)]
    pub attempts: BTreeMap<String, u32>,

    /// When the profile was last written.
    pub updated_at: DateTime<Utc>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            current_level: None,
            completed_levels: Vec::new(),
            hint_indices: BTreeMap::new(),
            attempts: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }
}

/// A [`Profile`] bound to the file it is persisted in.
///
/// Every mutation is written straight back to disk.
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    profile: Profile,
}

impl ProfileStore {
    /// Opens the profile at `path`, starting a fresh one if the file does not
    /// exist yet.
    ///
    /// # Errors
    ///
    /// Returns `DojoError::ProfileCorrupted` if the file is not a valid
    /// profile, or an I/O error if it cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let profile = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| DojoError::profile_corrupted(&path, e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Starting a new profile");
                Profile::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, profile })
    }

    /// Returns the profile file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current profile contents.
    #[must_use]
    pub const fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Writes the profile to disk, replacing the previous file atomically.
    pub fn save(&mut self) -> Result<()> {
        self.profile.updated_at = Utc::now();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.profile)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Makes `level_id` the current level and clears its hint counter.
    pub fn set_level(&mut self, level_id: &str) -> Result<()> {
        self.profile.current_level = Some(level_id.to_string());
        self.profile.hint_indices.remove(level_id);
        self.profile.attempts.remove(level_id);
        self.save()
    }

    /// Marks the current level as completed and moves on to `next`.
    ///
    /// With no `next` level the profile has finished the game and
    /// `current_level` becomes `None`.
    pub fn level_bump(&mut self, next: Option<&str>) -> Result<()> {
        if let Some(done) = self.profile.current_level.take() {
            if !self.profile.completed_levels.contains(&done) {
                self.profile.completed_levels.push(done.clone());
            }
            self.profile.hint_indices.remove(&done);
            self.profile.attempts.remove(&done);
            tracing::info!(level = %done, next = ?next, "Level completed");
        }
        self.profile.current_level = next.map(ToString::to_string);
        self.save()
    }

    /// Records a failed attempt on `level_id` and returns the new count.
    pub fn record_attempt(&mut self, level_id: &str) -> Result<u32> {
        let count = self
            .profile
            .attempts
            .entry(level_id.to_string())
            .or_insert(0);
        *count += 1;
        let count = *count;
        self.save()?;
        Ok(count)
    }
}

impl HintProgressStore for ProfileStore {
    fn current_hint_index(&mut self, level_id: &str) -> Result<usize> {
        let counter = self
            .profile
            .hint_indices
            .entry(level_id.to_string())
            .or_insert(0);
        let index = *counter;
        *counter += 1;
        self.save()?;
        Ok(index)
    }
}
