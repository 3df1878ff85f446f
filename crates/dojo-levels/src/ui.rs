//! Output and prompt capability handed to levels.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use crate::repository::ProbeResult;

/// Where level text goes and where learner answers come from.
pub trait Ui {
    /// Prints one line.
    fn puts(&mut self, line: &str);

    /// Prints `prompt` and returns the learner's answer, without the trailing
    /// newline. End of input reads as an empty answer.
    fn request(&mut self, prompt: &str) -> String;
}

/// Questions a solution predicate can put to the learner.
///
/// `message` is the default text; implementations may localize it.
pub trait Prompt {
    /// Asks `message` and returns the learner's answer.
    fn ask(&mut self, message: &str) -> ProbeResult<String>;
}

/// [`Ui`] on the process' stdout and stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalUi;

impl Ui for TerminalUi {
    fn puts(&mut self, line: &str) {
        println!("{line}");
    }

    fn request(&mut self, prompt: &str) -> String {
        let mut stdout = std::io::stdout().lock();
        // A failed flush only delays the prompt.
        let _ = write!(stdout, "{prompt} ");
        let _ = stdout.flush();
        drop(stdout);

        let mut answer = String::new();
        if let Err(e) = std::io::stdin().lock().read_line(&mut answer) {
            tracing::warn!(error = %e, "Failed to read answer");
            return String::new();
        }
        answer.trim_end_matches(['\r', '\n']).to_string()
    }
}

/// [`Ui`] that records everything and answers from a queue.
///
/// Used by tests and by non-interactive callers.
#[derive(Debug, Default, Clone)]
pub struct RecordingUi {
    /// Lines printed with [`Ui::puts`].
    pub lines: Vec<String>,
    /// Prompts printed with [`Ui::request`].
    pub prompts: Vec<String>,
    answers: VecDeque<String>,
}

impl RecordingUi {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues answers returned by successive `request` calls.
    #[must_use]
    pub fn with_answers<I, S>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.answers.extend(answers.into_iter().map(Into::into));
        self
    }
}

impl Ui for RecordingUi {
    fn puts(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn request(&mut self, prompt: &str) -> String {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().unwrap_or_default()
    }
}

impl Prompt for RecordingUi {
    fn ask(&mut self, message: &str) -> ProbeResult<String> {
        Ok(self.request(message))
    }
}
