//! Logic for the levels that ship with gitdojo.

use crate::error::ProbeError;
use crate::registry::{HandlerRegistry, LevelHandler, SetupOutput};
use crate::repository::RepositoryHandle;

/// Built-in level ids in play order.
pub const BUILTIN_LEVELS: &[&str] = &["init", "config", "add", "commit", "ignore", "branch"];

/// Registers every built-in level handler.
pub fn register_all(registry: &mut HandlerRegistry) {
    registry
        .register("init", init())
        .register("config", config())
        .register("add", add())
        .register("commit", commit())
        .register("ignore", ignore())
        .register("branch", branch());
}

fn init() -> LevelHandler {
    LevelHandler::new().with_solution(|repo| Ok(repo.is_repository()))
}

fn config() -> LevelHandler {
    LevelHandler::new()
        .with_setup(|repo| {
            repo.init()?;
            Ok(SetupOutput::None)
        })
        .with_interactive_solution(|repo, prompt| {
            let name = prompt.ask("What is your name?")?;
            let email = prompt.ask("What is your email?")?;
            let configured = |key: &str, answer: &str| -> Result<bool, ProbeError> {
                Ok(repo.config_value(key)?.is_some_and(|value| {
                    let value = value.trim();
                    !value.is_empty() && value == answer.trim()
                }))
            };
            Ok(configured("user.name", &name)? && configured("user.email", &email)?)
        })
}

fn add() -> LevelHandler {
    LevelHandler::new()
        .with_setup(|repo| {
            repo.init()?;
            repo.write_file("README", "This is a README file.\n")?;
            Ok(SetupOutput::File(repo.workdir().join("README")))
        })
        .with_solution(|repo| Ok(repo.staged_paths()?.iter().any(|p| p == "README")))
}

fn commit() -> LevelHandler {
    LevelHandler::new()
        .with_setup(|repo| {
            repo.init()?;
            repo.write_file("README", "This is a README file.\n")?;
            repo.stage("README")?;
            Ok(SetupOutput::None)
        })
        .with_solution(|repo| Ok(!repo.commit_messages()?.is_empty()))
}

fn ignore() -> LevelHandler {
    LevelHandler::new()
        .with_setup(|repo| {
            repo.init()?;
            repo.write_file("README.swp", "")?;
            Ok(SetupOutput::None)
        })
        .with_solution(|repo| repo.is_ignored("README.swp"))
}

fn branch() -> LevelHandler {
    LevelHandler::new()
        .with_setup(|repo| seed_commit(repo).map(|_| SetupOutput::None))
        .with_solution(|repo| Ok(repo.branches()?.iter().any(|b| b == "test_code")))
}

fn seed_commit(repo: &mut dyn RepositoryHandle) -> Result<String, ProbeError> {
    repo.init()?;
    repo.write_file("README", "This is a README file.\n")?;
    repo.stage("README")?;
    repo.commit("Initial commit")
}
