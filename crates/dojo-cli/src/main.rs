//! gitdojo CLI
//!
//! Drives the level loop: set up a level, check the learner's repository,
//! hand out hints and move on to the next level.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dojo_levels::{
    Config, GitWorkspaceFactory, HandlerRegistry, JsonCatalog, Level, LevelLoader, Locale,
    LocalizationResolver, ProfileStore, SetupOutput, TerminalUi, Ui, CONFIG_FILE_NAME,
};
use tracing_subscriber::EnvFilter;

/// Failed attempts before a hint is offered.
const HINT_OFFER_THRESHOLD: u32 = 2;

/// gitdojo - learn git one level at a time
///
/// Each level prepares a small repository in the working directory and asks
/// you to do something to it with git. Run `gitdojo play` to check your work.
#[derive(Parser, Debug)]
#[command(name = "gitdojo")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: dojo.json in current directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Locale for level text (overrides the config file)
    #[arg(short, long, value_name = "TAG", global = true)]
    locale: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the current level and move on if it is solved (default)
    Play,
    /// Show a hint for the current level
    Hint,
    /// Set up the current level, or LEVEL, again
    Reset {
        /// Level id to jump to
        level: Option<String>,
    },
    /// List the levels in play order
    Levels,
    /// Check a level descriptor against the working directory
    Test {
        /// Path to the .level file
        path: PathBuf,

        /// Set the level up before checking it
        #[arg(long)]
        setup: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (warn)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, locale = ?args.locale, "gitdojo starting");

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Everything a command needs.
struct Dojo {
    config: Config,
    loader: LevelLoader,
    workdir: PathBuf,
    ui: Rc<RefCell<dyn Ui>>,
}

impl Dojo {
    fn say(&self, line: &str) {
        self.ui.borrow_mut().puts(line);
    }

    fn profile(&self) -> anyhow::Result<ProfileStore> {
        Ok(ProfileStore::open(self.config.profile_path(&self.workdir))?)
    }

    fn level(&self, id: &str) -> anyhow::Result<Level> {
        self.loader.load(id)?.with_context(|| {
            format!(
                "Level '{id}' not found in {}\n\nSuggestion: Check levelOrder in dojo.json against the .level files",
                self.loader.levels_dir().display()
            )
        })
    }

    fn first_level(&self) -> anyhow::Result<&str> {
        self.config
            .level_order
            .first()
            .map(String::as_str)
            .context("No levels configured")
    }
}

/// Runs the selected command. `Ok(false)` means "not solved".
fn run(args: Args) -> anyhow::Result<bool> {
    let base = std::env::current_dir().context("Cannot determine current directory")?;
    let mut config = load_config(args.config.as_deref())?;
    if let Some(locale) = args.locale {
        config.locale = locale;
    }
    // Re-validate after overrides
    config.validate()?;

    let ui: Rc<RefCell<dyn Ui>> = Rc::new(RefCell::new(TerminalUi));
    let dojo = build(config, &base, ui)?;

    match args.command.unwrap_or(Command::Play) {
        Command::Play => play(&dojo),
        Command::Hint => hint(&dojo).map(|()| true),
        Command::Reset { level } => reset(&dojo, level.as_deref()).map(|()| true),
        Command::Levels => list_levels(&dojo).map(|()| true),
        Command::Test { path, setup } => test_level(&dojo, &path, setup),
    }
}

/// Loads configuration from file or defaults.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Ok(Config::load_from_file(path)?)
        }
        None => Ok(Config::load()?),
    }
}

/// Wires the loader to the catalog, the git working directory and the UI.
fn build(config: Config, base: &Path, ui: Rc<RefCell<dyn Ui>>) -> anyhow::Result<Dojo> {
    let catalog = JsonCatalog::load_dir(&config.locales_path(base))?;
    let locale = Locale::new(config.locale.as_str());
    if !locale.is_default() && !catalog.locales().any(|l| *l == locale) {
        tracing::warn!(locale = %locale, "No translations for locale, using embedded text");
    }

    let workdir = base.join(&config.workdir);
    let repositories = GitWorkspaceFactory::new(&workdir, &[config.profile_file.as_str()])
        .with_protected([
            base.join(CONFIG_FILE_NAME),
            config.levels_path(base),
            config.locales_path(base),
        ]);
    let loader = LevelLoader::new(
        config.levels_path(base),
        Rc::new(HandlerRegistry::builtin()),
        Rc::new(repositories),
        Rc::clone(&ui),
    )
    .with_localization(LocalizationResolver::new(Rc::new(catalog), locale))
    .with_level_order(config.level_order.clone())
    .with_workdir(&workdir);

    tracing::debug!(loader = ?loader, "Loader ready");
    Ok(Dojo {
        config,
        loader,
        workdir,
        ui,
    })
}

/// Checks the current level; starts the first one on a fresh profile.
fn play(dojo: &Dojo) -> anyhow::Result<bool> {
    let mut profile = dojo.profile()?;

    let Some(current) = profile.profile().current_level.clone() else {
        if profile.profile().completed_levels.is_empty() {
            dojo.say("Welcome to gitdojo!");
            dojo.say(&format!(
                "Your levels are played in '{}'. Change into it and solve them with git.",
                dojo.workdir.display()
            ));
            let first = dojo.first_level()?.to_string();
            profile.set_level(&first)?;
            start_level(dojo, &first)?;
            return Ok(true);
        }
        dojo.say("Congratulations, you have solved all the levels!");
        return Ok(true);
    };

    let mut level = dojo.level(&current)?;
    if level.solve() {
        dojo.say("Congratulations, you have solved the level!");
        let next = dojo.loader.next_level(&current).map(ToString::to_string);
        profile.level_bump(next.as_deref())?;
        match next {
            Some(next) => start_level(dojo, &next)?,
            None => dojo.say("Congratulations, you have solved all the levels!"),
        }
        return Ok(true);
    }

    dojo.say("Sorry, this solution is not quite right!");
    let attempts = profile.record_attempt(&current)?;
    if attempts > HINT_OFFER_THRESHOLD {
        let answer = dojo
            .ui
            .borrow_mut()
            .request("Would you like a hint? (y/n)");
        if answer.trim().eq_ignore_ascii_case("y") {
            level.show_hint(&mut profile)?;
        }
    }
    dojo.say("");
    level.full_description();
    Ok(false)
}

/// Shows the next hint for the current level.
fn hint(dojo: &Dojo) -> anyhow::Result<()> {
    let mut profile = dojo.profile()?;
    let Some(current) = profile.profile().current_level.clone() else {
        dojo.say("There is no level in progress. Run `gitdojo play` to start.");
        return Ok(());
    };
    let mut level = dojo.level(&current)?;
    level.show_hint(&mut profile)?;
    Ok(())
}

/// Sets a level up again, optionally jumping to another one.
fn reset(dojo: &Dojo, target: Option<&str>) -> anyhow::Result<()> {
    let mut profile = dojo.profile()?;
    let id = match target {
        Some(id) => {
            if !dojo.config.level_order.iter().any(|l| l == id) {
                anyhow::bail!(
                    "Unknown level '{id}'\n\nSuggestion: Run `gitdojo levels` to see the available levels"
                );
            }
            profile.set_level(id)?;
            id.to_string()
        }
        None => match profile.profile().current_level.clone() {
            Some(id) => id,
            None => {
                let first = dojo.first_level()?.to_string();
                profile.set_level(&first)?;
                first
            }
        },
    };
    start_level(dojo, &id)
}

/// Lists levels with their status.
fn list_levels(dojo: &Dojo) -> anyhow::Result<()> {
    let profile = dojo.profile()?;
    let progress = profile.profile();

    for id in dojo.loader.level_order() {
        let marker = if progress.current_level.as_deref() == Some(id.as_str()) {
            ">"
        } else if progress.completed_levels.contains(id) {
            "x"
        } else {
            " "
        };
        match dojo.loader.load(id)? {
            Some(level) => dojo.say(&format!(
                "{marker} {:>2}. {:<10} {:<5} {}",
                level.number().unwrap_or_default(),
                id,
                "*".repeat(usize::try_from(level.difficulty()).unwrap_or(1)),
                first_line(level.description())
            )),
            None => dojo.say(&format!("{marker}  ?. {id:<10} (missing descriptor)")),
        }
    }
    Ok(())
}

/// Evaluates a descriptor directly, reporting probe errors.
fn test_level(dojo: &Dojo, path: &Path, setup: bool) -> anyhow::Result<bool> {
    let mut level = dojo.loader.load_from_file(path)?.with_context(|| {
        format!(
            "Level descriptor not found: '{}'\n\nSuggestion: Pass the path to a .level file",
            path.display()
        )
    })?;

    if setup {
        report_setup(dojo, &level.setup_level()?);
    }
    level.full_description();

    let solved = level.test()?;
    dojo.say(if solved {
        "The level is solved."
    } else {
        "The level is not solved."
    });
    Ok(solved)
}

/// Loads, sets up and describes a level.
fn start_level(dojo: &Dojo, id: &str) -> anyhow::Result<()> {
    let mut level = dojo.level(id)?;
    let output = level
        .setup_level()
        .with_context(|| format!("Failed to set up level '{id}'"))?;
    tracing::info!(level = %id, "Level started");
    dojo.say("");
    level.full_description();
    report_setup(dojo, &output);
    Ok(())
}

fn report_setup(dojo: &Dojo, output: &SetupOutput) {
    match output {
        SetupOutput::None => {}
        SetupOutput::Text(text) => dojo.say(text),
        SetupOutput::File(path) => dojo.say(&format!("Created {}", path.display())),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
