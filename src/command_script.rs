use anyhow::{Context, Result};
use serde::Deserialize;
use std::{collections::VecDeque, fs, path::Path};

#[derive(Debug, Deserialize)]
struct CommandScriptFile {
    /// Identity token of the scripted player.
    token: String,
    /// Referral code passed to the opening session.
    #[serde(default)]
    referral: Option<String>,
    /// Clock value at `at_ms = 0`; wall time when absent.
    #[serde(default)]
    start_ms: Option<u64>,
    steps: Vec<CommandScriptStep>,
}

#[derive(Debug, Clone, Deserialize)]
struct CommandScriptStep {
    at_ms: u64,
    command: String,
}

/// Deterministic command script runner.
///
/// Scripts are a list of `{at_ms, command}` steps, executed in file order,
/// where `at_ms` is an offset from the script's start instant.
#[derive(Debug)]
pub struct CommandScriptPlayer {
    pub token: String,
    pub referral: Option<String>,
    pub start_ms: Option<u64>,
    pending: VecDeque<CommandScriptStep>,
}

impl CommandScriptPlayer {
    /// Load a command script from a JSON file on disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Self::parse(&contents)
    }

    /// Load a command script from an in-memory JSON string.
    pub fn parse(contents: &str) -> Result<Self> {
        let file: CommandScriptFile = serde_json::from_str(contents)?;
        if file.token.trim().is_empty() {
            anyhow::bail!("command script has no player token");
        }
        if file.steps.is_empty() {
            anyhow::bail!("command script contains no steps");
        }

        let mut pending = VecDeque::with_capacity(file.steps.len());
        let mut last_at: Option<u64> = None;
        for step in file.steps {
            let command = step.command.trim().to_string();
            if command.is_empty() {
                anyhow::bail!("command script contains an empty command");
            }
            if last_at.is_some_and(|prev| step.at_ms < prev) {
                anyhow::bail!("command script steps must be sorted by at_ms");
            }
            last_at = Some(step.at_ms);
            pending.push_back(CommandScriptStep {
                at_ms: step.at_ms,
                command,
            });
        }

        Ok(Self {
            token: file.token,
            referral: file.referral,
            start_ms: file.start_ms,
            pending,
        })
    }

    /// Offset of the next pending step.
    pub fn next_at(&self) -> Option<u64> {
        self.pending.front().map(|step| step.at_ms)
    }

    /// Drain and return all commands scheduled at or before `at_ms`.
    pub fn drain_ready_commands(&mut self, at_ms: u64) -> Vec<String> {
        let mut commands = Vec::new();
        while self.pending.front().is_some_and(|step| step.at_ms <= at_ms) {
            if let Some(step) = self.pending.pop_front() {
                commands.push(step.command);
            }
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_script_rejects_unsorted_steps() {
        let json = r#"{
            "token": "1",
            "steps": [
                {"at_ms": 2000, "command": "collect 0"},
                {"at_ms": 1000, "command": "collect 1"}
            ]
        }"#;
        let err = CommandScriptPlayer::parse(json).unwrap_err();
        assert!(
            err.to_string().contains("sorted by at_ms"),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn command_script_requires_token_and_steps() {
        assert!(CommandScriptPlayer::parse(r#"{"token": " ", "steps": [{"at_ms": 0, "command": "state"}]}"#).is_err());
        assert!(CommandScriptPlayer::parse(r#"{"token": "1", "steps": []}"#).is_err());
    }

    #[test]
    fn command_script_drains_in_order() {
        let json = r#"{
            "token": "1:Ada",
            "referral": "ABCD1234",
            "steps": [
                {"at_ms": 0, "command": "select 0"},
                {"at_ms": 0, "command": "select 1"},
                {"at_ms": 30000, "command": "collect 1"}
            ]
        }"#;
        let mut script = CommandScriptPlayer::parse(json).expect("script should parse");
        assert_eq!(script.referral.as_deref(), Some("ABCD1234"));
        assert_eq!(script.start_ms, None);

        assert_eq!(script.next_at(), Some(0));
        assert_eq!(
            script.drain_ready_commands(0),
            vec!["select 0".to_string(), "select 1".to_string()]
        );
        assert_eq!(script.drain_ready_commands(29_999), Vec::<String>::new());
        assert_eq!(script.next_at(), Some(30_000));
        assert_eq!(script.drain_ready_commands(30_000), vec!["collect 1".to_string()]);
        assert_eq!(script.next_at(), None);
    }
}
