//! Terminal detection for the maintenance commands

use std::io::IsTerminal;

/// Environment variables set by CI runners
const CI_MARKERS: [&str; 5] = ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "BUILDKITE", "TF_BUILD"];

/// How a command may talk to the user
#[derive(Debug, Clone)]
pub struct UiContext {
    /// A person is at a terminal: styled symbols, prompts allowed
    interactive: bool,
    /// `--yes` was given: destructive commands proceed without asking
    auto_yes: bool,
}

impl UiContext {
    /// Inspect stdin, stdout and the environment
    pub fn detect() -> Self {
        Self {
            interactive: attended_terminal(),
            auto_yes: false,
        }
    }

    /// Plain output and no prompts, regardless of the terminal
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            auto_yes: false,
        }
    }

    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes = yes;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }
}

fn attended_terminal() -> bool {
    std::io::stdout().is_terminal()
        && std::io::stdin().is_terminal()
        && !CI_MARKERS.iter().any(|var| std::env::var_os(var).is_some())
}
