//! End-to-end tests for the gitdojo level engine
//!
//! These tests load the shipped level descriptors and translation catalogs,
//! play them against real git working directories in temp dirs, and check
//! the fixture levels under `tests/integration/fixtures`.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use dojo_levels::{
    Config, DojoError, GitWorkspace, GitWorkspaceFactory, HandlerRegistry, JsonCatalog,
    LevelLoader, LevelState, Locale, LocalizationResolver, ProfileStore, RecordingUi,
    RepositoryHandle, SetupOutput, Ui, BUILTIN_LEVELS, HIDDEN_GIT_DIR,
};

/// Workspace root, where the shipped `levels/` and `locales/` live.
fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .expect("Failed to find workspace root")
}

/// Path to the integration fixtures.
fn fixture_path() -> PathBuf {
    workspace_root().join("tests/integration/fixtures")
}

struct Game {
    loader: LevelLoader,
    ui: Rc<RefCell<RecordingUi>>,
    workdir: tempfile::TempDir,
}

impl Game {
    fn new(levels_dir: &Path, locale: &str) -> Self {
        let workdir = tempfile::tempdir().expect("Failed to create workdir");
        let ui = Rc::new(RefCell::new(RecordingUi::new()));
        let catalog = JsonCatalog::load_dir(&workspace_root().join("locales"))
            .expect("Failed to load shipped catalogs");

        let shared_ui: Rc<RefCell<dyn Ui>> = ui.clone();
        let loader = LevelLoader::new(
            levels_dir,
            Rc::new(HandlerRegistry::builtin()),
            Rc::new(GitWorkspaceFactory::new(workdir.path(), &[".profile.json"])),
            shared_ui,
        )
        .with_localization(LocalizationResolver::new(
            Rc::new(catalog),
            Locale::new(locale),
        ))
        .with_workdir(workdir.path());

        Self {
            loader,
            ui,
            workdir,
        }
    }

    fn shipped() -> Self {
        Self::new(&workspace_root().join("levels"), "en")
    }

    /// A second handle on the same working directory, playing the learner.
    fn learner(&self) -> GitWorkspace {
        GitWorkspace::new(self.workdir.path(), &[".profile.json"])
    }

    fn profile(&self) -> ProfileStore {
        ProfileStore::open(self.workdir.path().join(".profile.json"))
            .expect("Failed to open profile")
    }
}

/// Every built-in level has a descriptor that loads with the built-in handlers.
#[test]
fn test_shipped_levels_load() {
    let game = Game::shipped();

    for (index, id) in BUILTIN_LEVELS.iter().enumerate() {
        let level = game
            .loader
            .load(id)
            .expect("Shipped level should be valid")
            .expect("Shipped level should exist");

        assert_eq!(level.id(), *id);
        assert_eq!(level.number(), Some(index + 1));
        assert!(!level.description().is_empty(), "{id} has no description");
        assert!(!level.hints().is_empty(), "{id} has no hints");
        assert_eq!(level.state(), LevelState::Created);
    }
}

/// The shipped German catalog translates every shipped level.
#[test]
fn test_shipped_german_catalog() {
    let game = Game::new(&workspace_root().join("levels"), "de");

    for id in BUILTIN_LEVELS {
        let level = game.loader.load(id).unwrap().unwrap();
        assert_ne!(
            level.description(),
            level.default_description(),
            "{id} is not translated"
        );
    }

    let mut config = game.loader.load("config").unwrap().unwrap();
    let defaults = config.requests().to_vec();
    assert_eq!(defaults, vec!["What is your name?", "What is your email?"]);
    *game.ui.borrow_mut() = RecordingUi::new().with_answers(["Ada", "ada@example.com"]);
    assert_eq!(config.request(&defaults[0]).unwrap(), "Ada");
    assert_eq!(config.request(&defaults[1]).unwrap(), "ada@example.com");
    assert_eq!(
        game.ui.borrow().prompts,
        vec!["Wie heisst du?", "Wie lautet deine E-Mail-Adresse?"]
    );
}

/// The `config` level asks for name and email in the active locale and
/// compares the answers with the repository's identity.
#[test]
fn test_play_config_level_in_german() {
    let game = Game::new(&workspace_root().join("levels"), "de");
    let mut config = game.loader.load("config").unwrap().unwrap();
    config.setup_level().unwrap();

    let repo = git2::Repository::open(game.workdir.path()).unwrap();
    let mut settings = repo.config().unwrap();
    settings.set_str("user.name", "Ada Lovelace").unwrap();
    settings.set_str("user.email", "ada@example.com").unwrap();

    *game.ui.borrow_mut() = RecordingUi::new().with_answers(["Grace Hopper", "grace@example.com"]);
    assert!(!config.solve());
    assert_eq!(config.state(), LevelState::AwaitingSolution);

    *game.ui.borrow_mut() = RecordingUi::new().with_answers(["Ada Lovelace", "ada@example.com"]);
    assert!(config.solve());
    assert_eq!(config.state(), LevelState::Solved);
    assert_eq!(
        game.ui.borrow().prompts,
        vec!["Wie heisst du?", "Wie lautet deine E-Mail-Adresse?"]
    );
}

/// Plays the built-in levels the way a learner would.
#[test]
fn test_play_through_builtin_levels() {
    let game = Game::shipped();
    let mut learner = game.learner();

    let mut init = game.loader.load("init").unwrap().unwrap();
    assert_eq!(init.setup_level().unwrap(), SetupOutput::None);
    assert!(!init.solve());
    learner.init().unwrap();
    assert!(init.solve());
    assert_eq!(init.state(), LevelState::Solved);

    let mut add = game.loader.load("add").unwrap().unwrap();
    let output = add.setup_level().unwrap();
    assert_eq!(output, SetupOutput::File(game.workdir.path().join("README")));
    assert!(!add.solve());
    learner.stage("README").unwrap();
    assert!(add.solve());

    let mut commit = game.loader.load("commit").unwrap().unwrap();
    commit.setup_level().unwrap();
    assert!(!commit.solve());
    learner.commit("Add README").unwrap();
    assert!(commit.solve());

    let mut ignore = game.loader.load("ignore").unwrap().unwrap();
    ignore.setup_level().unwrap();
    assert!(!ignore.solve());
    std::fs::write(game.workdir.path().join(".gitignore"), ".profile.json\n*.swp\n").unwrap();
    assert!(ignore.solve());

    let mut branch = game.loader.load("branch").unwrap().unwrap();
    branch.setup_level().unwrap();
    assert!(!branch.solve());
    learner.create_branch("test_code").unwrap();
    assert!(branch.solve());
}

/// `setup_level` wipes the previous level's work but keeps the profile.
#[test]
fn test_setup_resets_working_directory() {
    let game = Game::shipped();
    let mut profile = game.profile();
    profile.set_level("add").unwrap();
    std::fs::write(game.workdir.path().join("scratch.txt"), "old work").unwrap();

    let mut add = game.loader.load("add").unwrap().unwrap();
    add.setup_level().unwrap();

    assert!(!game.workdir.path().join("scratch.txt").exists());
    assert!(game.workdir.path().join(".profile.json").exists());
    assert!(game.learner().is_ignored(".profile.json").unwrap());

    let reopened = game.profile();
    assert_eq!(reopened.profile().current_level.as_deref(), Some("add"));
}

/// Hints rotate through the persisted profile counter.
#[test]
fn test_hint_rotation_with_profile() {
    let game = Game::shipped();
    let mut profile = game.profile();
    let mut add = game.loader.load("add").unwrap().unwrap();

    for _ in 0..3 {
        add.show_hint(&mut profile).unwrap();
    }

    let hints = add.hints().to_vec();
    assert_eq!(
        game.ui.borrow().lines,
        vec![hints[0].clone(), hints[1].clone(), hints[0].clone()]
    );
    assert_eq!(game.profile().profile().hint_indices.get("add"), Some(&3));
}

/// Level progression through the profile and the level order.
#[test]
fn test_progression_follows_level_order() {
    let game = Game::shipped();
    let mut profile = game.profile();

    let mut current = game.loader.level_order()[0].clone();
    profile.set_level(&current).unwrap();
    while let Some(next) = game.loader.next_level(&current).map(ToString::to_string) {
        profile.level_bump(Some(&next)).unwrap();
        current = next;
    }
    profile.level_bump(None).unwrap();

    let done = game.profile();
    assert_eq!(done.profile().current_level, None);
    assert_eq!(done.profile().completed_levels, BUILTIN_LEVELS.to_vec());
}

/// Lays out a levels directory holding the `starter` fixture descriptor and
/// a content directory with a hidden starter repository.
fn starter_levels() -> tempfile::TempDir {
    let levels = tempfile::tempdir().expect("Failed to create levels dir");
    std::fs::copy(
        fixture_path().join("levels/starter.level"),
        levels.path().join("starter.level"),
    )
    .unwrap();

    let content = levels.path().join("starter");
    let hidden = content.join(HIDDEN_GIT_DIR);
    std::fs::create_dir_all(hidden.join("objects")).unwrap();
    std::fs::create_dir_all(hidden.join("refs/heads")).unwrap();
    std::fs::write(hidden.join("HEAD"), "ref: refs/heads/master\n").unwrap();
    std::fs::write(content.join("notes.txt"), "Notes left by the level author.\n").unwrap();
    levels
}

/// A level with a content directory gets it copied into the working directory.
#[test]
fn test_level_with_starter_repository() {
    let config = Config::load_from_dir(&fixture_path()).unwrap();
    let levels = starter_levels();
    let game = Game::new(levels.path(), "en");
    let loader = game.loader.with_level_order(config.level_order.clone());

    let mut level = loader.load("starter").unwrap().unwrap();
    assert_eq!(level.level_path(), levels.path().join("starter"));
    level.full_description();
    level.setup_level().unwrap();

    let workdir = game.workdir.path();
    assert_eq!(
        std::fs::read_to_string(workdir.join("notes.txt")).unwrap(),
        "Notes left by the level author.\n"
    );
    assert!(workdir.join(".git/HEAD").is_file());
    assert!(!workdir.join(HIDDEN_GIT_DIR).exists());
    assert!(levels.path().join("starter").join(HIDDEN_GIT_DIR).is_dir());
    assert!(level.solve(), "the copied repository satisfies the init handler");

    insta::assert_snapshot!(game.ui.borrow().lines.join("\n"), @r"
    Level: 1
    Difficulty: ***
    The repository has been prepared for you. Look around.
    ");
}

/// Broken descriptors fail loudly, missing ones quietly.
#[test]
fn test_fixture_broken_and_missing_levels() {
    let game = Game::new(&fixture_path().join("levels"), "en");

    let err = game.loader.load("broken").unwrap_err();
    assert!(
        matches!(&err, DojoError::LoadError { message, .. } if message.contains("solution")),
        "Expected LoadError, got: {err:?}"
    );
    assert!(err.to_string().contains("Suggestion:"));

    assert!(game.loader.load("absent").unwrap().is_none());
    assert!(game
        .loader
        .setup(&fixture_path().join("levels/absent.level"))
        .unwrap()
        .is_none());
}

/// The fixture config parses with its overrides and defaults.
#[test]
fn test_fixture_config() {
    let config = Config::load_from_dir(&fixture_path()).unwrap();

    assert_eq!(config.levels_dir, "levels");
    assert_eq!(config.locale, "de");
    assert_eq!(config.level_order, vec!["starter", "broken"]);
    assert_eq!(config.workdir, "git_dojo");
    assert_eq!(config.profile_file, ".profile.json");
}

/// The shipped config matches the built-in levels.
#[test]
fn test_shipped_config() {
    let config = Config::load_from_dir(&workspace_root()).unwrap();
    assert_eq!(config.level_order, BUILTIN_LEVELS.to_vec());
    assert_eq!(config.locale, "en");
}
