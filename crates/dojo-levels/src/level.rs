//! The runtime level entity.
//!
//! A [`Level`] is produced by [`crate::LevelLoader`], lives for one
//! exercise-solving session and is discarded once the learner moves on.
//!
//! State transitions:
//! - `Created` -> `SetupRun` (via `setup_level`)
//! - `Created` | `SetupRun` | `AwaitingSolution` -> `AwaitingSolution` (unsolved evaluation)
//! - any non-terminal state -> `Solved` (solved evaluation)

use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{DojoError, ProbeError, Result};
use crate::locale::{LocalizationResolver, TextKind};
use crate::progress::HintProgressStore;
use crate::registry::{HintAction, SetupAction, SetupOutput, SolutionPredicate};
use crate::repository::{RepositoryFactory, RepositoryHandle};
use crate::ui::{Prompt, Ui};

/// Name of the hidden git directory inside level content directories.
///
/// Shipping it as `.git` would make the content tree a nested repository.
pub const HIDDEN_GIT_DIR: &str = ".gitdojo";

// ============================================================================
// LevelState
// ============================================================================

/// Where a level is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LevelState {
    /// Freshly loaded.
    #[default]
    Created,
    /// The working directory has been prepared.
    SetupRun,
    /// Evaluated at least once without success.
    AwaitingSolution,
    /// The solution predicate held. Terminal.
    Solved,
}

impl LevelState {
    /// Returns `true` for the terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Solved)
    }
}

impl fmt::Display for LevelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::SetupRun => "setup_run",
            Self::AwaitingSolution => "awaiting_solution",
            Self::Solved => "solved",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Outcome of evaluating the solution predicate.
#[derive(Debug)]
pub enum Evaluation {
    /// The repository satisfies the level.
    Solved,
    /// The predicate ran and said no.
    Unsolved,
    /// The predicate could not inspect the repository.
    Errored(ProbeError),
}

impl Evaluation {
    /// Returns `true` for [`Evaluation::Solved`].
    #[must_use]
    pub const fn is_solved(&self) -> bool {
        matches!(self, Self::Solved)
    }
}

// ============================================================================
// Level
// ============================================================================

/// Everything the loader resolved for one level.
pub(crate) struct LevelParts {
    pub id: String,
    pub number: Option<usize>,
    pub difficulty: u32,
    pub description: String,
    pub default_description: String,
    pub hints: Vec<String>,
    pub requests: Vec<String>,
    pub setup: Option<SetupAction>,
    pub solution: SolutionPredicate,
    pub hint_action: Option<HintAction>,
    pub level_path: PathBuf,
    pub workdir: PathBuf,
    pub resolver: LocalizationResolver,
    pub ui: Rc<RefCell<dyn Ui>>,
    pub repositories: Rc<dyn RepositoryFactory>,
}

/// One exercise.
pub struct Level {
    id: String,
    number: Option<usize>,
    difficulty: u32,
    description: String,
    default_description: String,
    hints: Vec<String>,
    requests: Vec<String>,
    setup: Option<SetupAction>,
    solution: SolutionPredicate,
    hint_action: Option<HintAction>,
    level_path: PathBuf,
    workdir: PathBuf,
    resolver: LocalizationResolver,
    ui: Rc<RefCell<dyn Ui>>,
    repositories: Rc<dyn RepositoryFactory>,
    /// Created on first use, dropped by `reset_repo`.
    repo: Option<Box<dyn RepositoryHandle>>,
    request_index: usize,
    state: LevelState,
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Level")
            .field("id", &self.id)
            .field("number", &self.number)
            .field("difficulty", &self.difficulty)
            .field("state", &self.state)
            .field("hints", &self.hints.len())
            .field("has_setup", &self.setup.is_some())
            .field("has_hint_action", &self.hint_action.is_some())
            .field("repo_open", &self.repo.is_some())
            .finish_non_exhaustive()
    }
}

impl Level {
    pub(crate) fn from_parts(parts: LevelParts) -> Self {
        Self {
            id: parts.id,
            number: parts.number,
            difficulty: parts.difficulty,
            description: parts.description,
            default_description: parts.default_description,
            hints: parts.hints,
            requests: parts.requests,
            setup: parts.setup,
            solution: parts.solution,
            hint_action: parts.hint_action,
            level_path: parts.level_path,
            workdir: parts.workdir,
            resolver: parts.resolver,
            ui: parts.ui,
            repositories: parts.repositories,
            repo: None,
            request_index: 0,
            state: LevelState::Created,
        }
    }

    /// Level id (the descriptor's file stem).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 1-based position in the level order, if the level is part of it.
    #[must_use]
    pub const fn number(&self) -> Option<usize> {
        self.number
    }

    /// Difficulty, at least 1.
    #[must_use]
    pub const fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Description in the active locale.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Description as written in the descriptor.
    #[must_use]
    pub fn default_description(&self) -> &str {
        &self.default_description
    }

    /// Hint list, empty when the level uses a hint action or has no hints.
    #[must_use]
    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    /// Default request prompts declared by the descriptor.
    #[must_use]
    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LevelState {
        self.state
    }

    /// The level's companion content directory.
    #[must_use]
    pub fn level_path(&self) -> &Path {
        &self.level_path
    }

    /// Working directory the learner plays in.
    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Prints the level header: number, difficulty and description.
    pub fn full_description(&self) {
        let label = self
            .number
            .map_or_else(|| self.id.clone(), |n| n.to_string());
        let stars = "*".repeat(usize::try_from(self.difficulty).unwrap_or(1));

        let mut ui = self.ui.borrow_mut();
        ui.puts(&format!("Level: {label}"));
        ui.puts(&format!("Difficulty: {stars}"));
        ui.puts(&self.description);
    }

    /// Prepares the working directory for this level.
    ///
    /// Resets the repository, copies the level's content directory into the
    /// working directory when there is one, then runs the setup action.
    ///
    /// # Errors
    ///
    /// Returns `DojoError::InvalidStateTransition` for a solved level, and
    /// `DojoError::Probe` or `DojoError::Io` if preparing the directory fails.
    pub fn setup_level(&mut self) -> Result<SetupOutput> {
        if self.state.is_terminal() {
            return Err(DojoError::invalid_transition(self.state, LevelState::SetupRun));
        }

        self.repo().reset()?;
        if self.level_path.is_dir() {
            self.init_from_level()?;
        }

        let output = match self.setup.clone() {
            Some(setup) => setup(self.repo())?,
            None => SetupOutput::None,
        };

        tracing::debug!(level = %self.id, output = ?output, "Level set up");
        self.state = LevelState::SetupRun;
        Ok(output)
    }

    /// Runs the solution predicate and records the outcome.
    ///
    /// A solved level stays solved and is not evaluated again.
    pub fn evaluate(&mut self) -> Evaluation {
        if self.state.is_terminal() {
            return Evaluation::Solved;
        }

        let evaluation = match self.run_solution() {
            Ok(true) => Evaluation::Solved,
            Ok(false) => Evaluation::Unsolved,
            Err(e) => Evaluation::Errored(e),
        };

        self.state = if evaluation.is_solved() {
            LevelState::Solved
        } else {
            LevelState::AwaitingSolution
        };
        tracing::debug!(level = %self.id, evaluation = ?evaluation, "Level evaluated");
        evaluation
    }

    /// Returns whether the level is solved. Probe errors count as unsolved.
    pub fn solve(&mut self) -> bool {
        match self.evaluate() {
            Evaluation::Solved => true,
            Evaluation::Unsolved => false,
            Evaluation::Errored(e) => {
                tracing::debug!(level = %self.id, error = %e, "Solution probe failed");
                false
            }
        }
    }

    /// Runs the solution predicate without touching the level state.
    ///
    /// Used when authoring levels, where a failing probe is worth seeing.
    ///
    /// # Errors
    ///
    /// Returns `DojoError::Probe` if the predicate cannot inspect the
    /// repository.
    pub fn test(&mut self) -> Result<bool> {
        Ok(self.run_solution()?)
    }

    /// Runs the solution predicate with this level's prompt. Each run asks
    /// its questions from the first translated request on.
    fn run_solution(&mut self) -> std::result::Result<bool, ProbeError> {
        let solution = Rc::clone(&self.solution);
        self.request_index = 0;
        let repo = self
            .repo
            .get_or_insert_with(|| self.repositories.construct())
            .as_mut();
        let mut prompt = LevelPrompt {
            id: &self.id,
            resolver: &self.resolver,
            ui: &self.ui,
            index: &mut self.request_index,
        };
        solution(repo, &mut prompt)
    }

    /// Shows the next hint.
    ///
    /// Hint lists rotate through `progress`; otherwise the hint action runs.
    /// Levels with neither print nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the progress store cannot be updated.
    pub fn show_hint(&mut self, progress: &mut dyn HintProgressStore) -> Result<()> {
        if !self.hints.is_empty() {
            let index = progress.current_hint_index(&self.id)?;
            if let Some(hint) = self.hints.get(index % self.hints.len()) {
                self.ui.borrow_mut().puts(hint);
            }
        } else if let Some(hint) = &self.hint_action {
            hint(&mut *self.ui.borrow_mut());
        }
        Ok(())
    }

    /// Asks the learner a question and returns the answer.
    ///
    /// `message` is the default text; the n-th call on a level is localized
    /// against the n-th entry of the level's translated requests.
    ///
    /// # Errors
    ///
    /// Returns `DojoError::TranslationMismatch` if the translated requests
    /// have no entry for this call.
    pub fn request(&mut self, message: &str) -> Result<String> {
        LevelPrompt {
            id: &self.id,
            resolver: &self.resolver,
            ui: &self.ui,
            index: &mut self.request_index,
        }
        .request(message)
    }

    /// The repository handle, created on first use.
    pub fn repo(&mut self) -> &mut dyn RepositoryHandle {
        self.repo
            .get_or_insert_with(|| self.repositories.construct())
            .as_mut()
    }

    /// Drops the repository handle; the next `repo` call creates a new one.
    pub fn reset_repo(&mut self) {
        self.repo = None;
    }

    /// Copies the level's content directory into the working directory and
    /// activates its hidden git directory, if it ships one.
    ///
    /// # Errors
    ///
    /// Returns `DojoError::Io` if copying or renaming fails.
    pub fn init_from_level(&self) -> Result<()> {
        copy_dir_contents(&self.level_path, &self.workdir)?;
        let hidden = self.workdir.join(HIDDEN_GIT_DIR);
        let has_repository = hidden.is_dir();
        if has_repository {
            std::fs::rename(hidden, self.workdir.join(".git"))?;
        }
        tracing::debug!(
            level = %self.id,
            from = %self.level_path.display(),
            has_repository,
            "Level content copied"
        );
        Ok(())
    }
}

/// The level's view of the UI while asking questions.
struct LevelPrompt<'a> {
    id: &'a str,
    resolver: &'a LocalizationResolver,
    ui: &'a RefCell<dyn Ui>,
    index: &'a mut usize,
}

impl LevelPrompt<'_> {
    fn request(&mut self, message: &str) -> Result<String> {
        let prompt =
            self.resolver
                .resolve(TextKind::Requests, self.id, Some(*self.index), message)?;
        *self.index += 1;
        Ok(self.ui.borrow_mut().request(&prompt))
    }
}

impl Prompt for LevelPrompt<'_> {
    fn ask(&mut self, message: &str) -> std::result::Result<String, ProbeError> {
        self.request(message)
            .map_err(|e| ProbeError::prompt(e.to_string()))
    }
}

/// Copies everything inside `from` into `to`, merging with existing entries.
fn copy_dir_contents(from: &Path, to: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_contents(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;

    use super::*;
    use crate::locale::{Locale, MemoryCatalog};
    use crate::ui::RecordingUi;

    /// Repository that only counts what happens to it.
    struct FakeRepository {
        root: PathBuf,
        resets: Rc<Cell<usize>>,
        exists: Rc<Cell<bool>>,
    }

    impl RepositoryHandle for FakeRepository {
        fn workdir(&self) -> &Path {
            &self.root
        }
        fn reset(&mut self) -> std::result::Result<(), ProbeError> {
            self.resets.set(self.resets.get() + 1);
            Ok(())
        }
        fn init(&mut self) -> std::result::Result<(), ProbeError> {
            self.exists.set(true);
            Ok(())
        }
        fn write_file(&mut self, _: &str, _: &str) -> std::result::Result<(), ProbeError> {
            Ok(())
        }
        fn stage(&mut self, _: &str) -> std::result::Result<(), ProbeError> {
            Ok(())
        }
        fn commit(&mut self, _: &str) -> std::result::Result<String, ProbeError> {
            Ok("0".repeat(40))
        }
        fn create_branch(&mut self, _: &str) -> std::result::Result<(), ProbeError> {
            Ok(())
        }
        fn is_repository(&self) -> bool {
            self.exists.get()
        }
        fn current_branch(&self) -> std::result::Result<String, ProbeError> {
            Ok("master".to_string())
        }
        fn branches(&self) -> std::result::Result<Vec<String>, ProbeError> {
            if self.exists.get() {
                Ok(vec!["master".to_string()])
            } else {
                Err(ProbeError::NotARepository {
                    path: self.root.clone(),
                })
            }
        }
        fn commit_messages(&self) -> std::result::Result<Vec<String>, ProbeError> {
            Ok(Vec::new())
        }
        fn staged_paths(&self) -> std::result::Result<Vec<String>, ProbeError> {
            Ok(Vec::new())
        }
        fn config_value(&self, _: &str) -> std::result::Result<Option<String>, ProbeError> {
            Ok(None)
        }
        fn is_ignored(&self, _: &str) -> std::result::Result<bool, ProbeError> {
            Ok(false)
        }
    }

    /// Progress store returning a fixed sequence of indices.
    struct ScriptedProgress(VecDeque<usize>);

    impl HintProgressStore for ScriptedProgress {
        fn current_hint_index(&mut self, _level_id: &str) -> Result<usize> {
            Ok(self.0.pop_front().unwrap_or(0))
        }
    }

    struct Harness {
        ui: Rc<RefCell<RecordingUi>>,
        resets: Rc<Cell<usize>>,
        exists: Rc<Cell<bool>>,
        constructed: Rc<Cell<usize>>,
    }

    fn parts(harness: &Harness) -> LevelParts {
        let resets = Rc::clone(&harness.resets);
        let exists = Rc::clone(&harness.exists);
        let constructed = Rc::clone(&harness.constructed);
        let factory = move || -> Box<dyn RepositoryHandle> {
            constructed.set(constructed.get() + 1);
            Box::new(FakeRepository {
                root: PathBuf::from("/nonexistent/git_dojo"),
                resets: Rc::clone(&resets),
                exists: Rc::clone(&exists),
            })
        };
        let ui: Rc<RefCell<dyn Ui>> = harness.ui.clone();

        LevelParts {
            id: "init".to_string(),
            number: Some(1),
            difficulty: 1,
            description: "A test description".to_string(),
            default_description: "A test description".to_string(),
            hints: vec!["h1".to_string(), "h2".to_string()],
            requests: Vec::new(),
            setup: None,
            solution: Rc::new(
                |repo: &mut dyn RepositoryHandle,
                 _: &mut dyn Prompt|
                 -> std::result::Result<bool, ProbeError> {
                    Ok(!repo.branches()?.is_empty())
                },
            ),
            hint_action: None,
            level_path: PathBuf::from("/nonexistent/levels/init"),
            workdir: PathBuf::from("/nonexistent/git_dojo"),
            resolver: LocalizationResolver::default(),
            ui,
            repositories: Rc::new(factory),
        }
    }

    fn harness() -> Harness {
        Harness {
            ui: Rc::new(RefCell::new(RecordingUi::new())),
            resets: Rc::new(Cell::new(0)),
            exists: Rc::new(Cell::new(false)),
            constructed: Rc::new(Cell::new(0)),
        }
    }

    #[test]
    fn test_full_description_lines() {
        let h = harness();
        let level = Level::from_parts(parts(&h));

        level.full_description();

        insta::assert_snapshot!(h.ui.borrow().lines.join("\n"), @r"
        Level: 1
        Difficulty: *
        A test description
        ");
    }

    #[test]
    fn test_full_description_without_number_uses_id() {
        let h = harness();
        let level = Level::from_parts(LevelParts {
            number: None,
            difficulty: 3,
            ..parts(&h)
        });

        level.full_description();

        assert_eq!(
            h.ui.borrow().lines,
            vec!["Level: init", "Difficulty: ***", "A test description"]
        );
    }

    #[test]
    fn test_setup_level_resets_once_without_setup_action() {
        let h = harness();
        let mut level = Level::from_parts(parts(&h));

        let output = level.setup_level().unwrap();

        assert_eq!(output, SetupOutput::None);
        assert_eq!(h.resets.get(), 1);
        assert_eq!(level.state(), LevelState::SetupRun);

        level.setup_level().unwrap();
        assert_eq!(h.resets.get(), 2);
    }

    #[test]
    fn test_setup_level_runs_setup_after_reset() {
        let h = harness();
        let resets = Rc::clone(&h.resets);
        let setup: SetupAction = Rc::new(
            move |repo: &mut dyn RepositoryHandle| -> std::result::Result<SetupOutput, ProbeError> {
            assert_eq!(resets.get(), 1, "reset must happen before setup");
            repo.init()?;
            Ok(SetupOutput::Text("ready".to_string()))
            },
        );
        let mut level = Level::from_parts(LevelParts {
            setup: Some(setup),
            ..parts(&h)
        });

        assert_eq!(level.setup_level().unwrap(), SetupOutput::Text("ready".to_string()));
        assert_eq!(h.resets.get(), 1);
        assert!(h.exists.get());
    }

    #[test]
    fn test_solve_is_false_until_probe_succeeds() {
        let h = harness();
        let mut level = Level::from_parts(parts(&h));

        assert!(matches!(level.evaluate(), Evaluation::Errored(ProbeError::NotARepository { .. })));
        assert!(!level.solve());
        assert_eq!(level.state(), LevelState::AwaitingSolution);

        h.exists.set(true);
        assert!(level.solve());
        assert_eq!(level.state(), LevelState::Solved);
    }

    #[test]
    fn test_solved_is_terminal() {
        let h = harness();
        let mut level = Level::from_parts(parts(&h));
        h.exists.set(true);
        assert!(level.solve());

        h.exists.set(false);
        assert!(level.solve(), "a solved level is not re-evaluated");

        let err = level.setup_level().unwrap_err();
        assert!(
            matches!(&err, DojoError::InvalidStateTransition { from, .. } if from == "solved"),
            "Expected InvalidStateTransition, got: {err:?}"
        );
    }

    #[test]
    fn test_test_propagates_probe_errors() {
        let h = harness();
        let mut level = Level::from_parts(parts(&h));

        let err = level.test().unwrap_err();
        assert!(matches!(err, DojoError::Probe(ProbeError::NotARepository { .. })), "got {err:?}");
        assert_eq!(level.state(), LevelState::Created);

        h.exists.set(true);
        assert!(level.test().unwrap());
        assert_eq!(level.state(), LevelState::Created);
    }

    #[test]
    fn test_hint_rotation() {
        let h = harness();
        let mut level = Level::from_parts(parts(&h));
        let mut progress = ScriptedProgress(VecDeque::from([0, 1, 2]));

        for _ in 0..3 {
            level.show_hint(&mut progress).unwrap();
        }

        assert_eq!(h.ui.borrow().lines, vec!["h1", "h2", "h1"]);
    }

    /// Progress store that reads its counter twice per hint: once to pick
    /// the hint and once more to advance it, skipped on the last hint where
    /// the counter wraps to 0 instead.
    struct TwoReadProgress {
        reads: VecDeque<usize>,
        hints: usize,
    }

    impl HintProgressStore for TwoReadProgress {
        fn current_hint_index(&mut self, _level_id: &str) -> Result<usize> {
            let index = self.reads.pop_front().unwrap_or(0);
            if index + 1 < self.hints {
                self.reads.pop_front();
            }
            Ok(index)
        }
    }

    #[test]
    fn test_hint_rotation_from_two_read_sequence() {
        let h = harness();
        let mut level = Level::from_parts(parts(&h));
        // Reads 0,0 pick h1 and advance, 1 picks h2 and wraps, 0 picks h1.
        let mut progress = TwoReadProgress {
            reads: VecDeque::from([0, 0, 1, 0]),
            hints: level.hints().len(),
        };

        for _ in 0..3 {
            level.show_hint(&mut progress).unwrap();
        }

        assert_eq!(h.ui.borrow().lines, vec!["h1", "h2", "h1"]);
        assert!(progress.reads.is_empty());
    }

    #[test]
    fn test_hint_action_runs_without_hint_list() {
        let h = harness();
        let hint: HintAction = Rc::new(|ui: &mut dyn Ui| ui.puts("this is a hint"));
        let mut level = Level::from_parts(LevelParts {
            hints: Vec::new(),
            hint_action: Some(hint),
            ..parts(&h)
        });
        let mut progress = ScriptedProgress(VecDeque::new());

        level.show_hint(&mut progress).unwrap();

        assert_eq!(h.ui.borrow().lines, vec!["this is a hint"]);
    }

    #[test]
    fn test_show_hint_without_hints_is_noop() {
        let h = harness();
        let mut level = Level::from_parts(LevelParts {
            hints: Vec::new(),
            ..parts(&h)
        });
        let mut progress = ScriptedProgress(VecDeque::new());

        level.show_hint(&mut progress).unwrap();

        assert!(h.ui.borrow().lines.is_empty());
    }

    #[test]
    fn test_repo_is_memoized_until_reset() {
        let h = harness();
        let mut level = Level::from_parts(parts(&h));

        level.repo();
        level.repo();
        assert_eq!(h.constructed.get(), 1);

        level.reset_repo();
        assert_eq!(h.constructed.get(), 1);
        level.repo();
        assert_eq!(h.constructed.get(), 2);
    }

    #[test]
    fn test_request_localizes_by_call_order() {
        let h = harness();
        *h.ui.borrow_mut() = RecordingUi::new().with_answers(["Ada"]);
        let catalog = MemoryCatalog::new().with_list(
            "de",
            "level.init.requests",
            &["Wie heisst du?"],
        );
        let mut level = Level::from_parts(LevelParts {
            resolver: LocalizationResolver::new(Rc::new(catalog), Locale::new("de")),
            ..parts(&h)
        });

        assert_eq!(level.request("What is your name?").unwrap(), "Ada");
        assert_eq!(h.ui.borrow().prompts, vec!["Wie heisst du?"]);

        let err = level.request("What is your email?").unwrap_err();
        assert!(matches!(err, DojoError::TranslationMismatch { .. }), "got {err:?}");
    }

    #[test]
    fn test_solution_asks_through_localized_prompt() {
        let h = harness();
        *h.ui.borrow_mut() = RecordingUi::new().with_answers(["Ada", "Ada", "Bob"]);
        let catalog = MemoryCatalog::new().with_list(
            "de",
            "level.init.requests",
            &["Wie heisst du?"],
        );
        let solution: SolutionPredicate = Rc::new(
            |_: &mut dyn RepositoryHandle,
             prompt: &mut dyn Prompt|
             -> std::result::Result<bool, ProbeError> {
                Ok(prompt.ask("What is your name?")? == "Ada")
            },
        );
        let mut level = Level::from_parts(LevelParts {
            resolver: LocalizationResolver::new(Rc::new(catalog), Locale::new("de")),
            solution,
            ..parts(&h)
        });

        assert!(level.test().unwrap());
        assert!(level.test().unwrap(), "every run starts at the first request");
        assert!(!level.solve());
        assert_eq!(
            h.ui.borrow().prompts,
            vec!["Wie heisst du?", "Wie heisst du?", "Wie heisst du?"]
        );
    }

    #[test]
    fn test_solution_prompt_mismatch_is_probe_error() {
        let h = harness();
        let catalog = MemoryCatalog::new().with_list("de", "level.init.requests", &[]);
        let solution: SolutionPredicate = Rc::new(
            |_: &mut dyn RepositoryHandle,
             prompt: &mut dyn Prompt|
             -> std::result::Result<bool, ProbeError> {
                prompt.ask("What is your name?").map(|_| true)
            },
        );
        let mut level = Level::from_parts(LevelParts {
            resolver: LocalizationResolver::new(Rc::new(catalog), Locale::new("de")),
            solution,
            ..parts(&h)
        });

        assert!(matches!(level.evaluate(), Evaluation::Errored(ProbeError::Prompt { .. })));
        assert!(h.ui.borrow().prompts.is_empty());
    }

    #[test]
    fn test_request_default_locale_uses_message() {
        let h = harness();
        let mut level = Level::from_parts(parts(&h));

        level.request("What is your name?").unwrap();
        level.request("What is your email?").unwrap();

        assert_eq!(
            h.ui.borrow().prompts,
            vec!["What is your name?", "What is your email?"]
        );
    }

    #[test]
    fn test_init_from_level_copies_then_renames() {
        let levels = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let content = levels.path().join("init");
        std::fs::create_dir_all(content.join(HIDDEN_GIT_DIR).join("refs")).unwrap();
        std::fs::write(content.join(HIDDEN_GIT_DIR).join("HEAD"), "ref: refs/heads/master\n")
            .unwrap();
        std::fs::write(content.join("README"), "hello").unwrap();

        let h = harness();
        let level = Level::from_parts(LevelParts {
            level_path: content.clone(),
            workdir: work.path().to_path_buf(),
            ..parts(&h)
        });

        level.init_from_level().unwrap();

        assert_eq!(std::fs::read_to_string(work.path().join("README")).unwrap(), "hello");
        assert!(work.path().join(".git/HEAD").is_file());
        assert!(work.path().join(".git/refs").is_dir());
        assert!(!work.path().join(HIDDEN_GIT_DIR).exists());
        assert!(content.join(HIDDEN_GIT_DIR).join("HEAD").is_file(), "source stays intact");
    }

    #[test]
    fn test_init_from_level_without_hidden_repository() {
        let levels = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let content = levels.path().join("init");
        std::fs::create_dir_all(&content).unwrap();
        std::fs::write(content.join("notes.txt"), "starter notes").unwrap();

        let h = harness();
        let level = Level::from_parts(LevelParts {
            level_path: content,
            workdir: work.path().to_path_buf(),
            ..parts(&h)
        });

        level.init_from_level().unwrap();

        assert_eq!(
            std::fs::read_to_string(work.path().join("notes.txt")).unwrap(),
            "starter notes"
        );
        assert!(!work.path().join(".git").exists());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(LevelState::Created.to_string(), "created");
        assert_eq!(LevelState::AwaitingSolution.to_string(), "awaiting_solution");
        assert!(LevelState::Solved.is_terminal());
        assert!(!LevelState::SetupRun.is_terminal());
    }
}
