//! Scripted command runner for tests.

use crate::error::Result;
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use std::sync::{Mutex, PoisonError};

/// Records every command and answers from a list of prefix rules.
///
/// The first rule whose prefix matches the displayed command line wins;
/// unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<(String, CommandOutput)>>,
    issued: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with `output`.
    pub fn respond(self, prefix: &str, output: CommandOutput) -> Self {
        self.set_response(prefix, output);
        self
    }

    /// Replace or add a rule after construction.
    pub fn set_response(&self, prefix: &str, output: CommandOutput) {
        let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        rules.retain(|(p, _)| p != prefix);
        rules.insert(0, (prefix.to_string(), output));
    }

    /// Displayed command lines, in issue order.
    pub fn commands(&self) -> Vec<String> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Standard input of the first issued command starting with `prefix`.
    pub fn stdin_for(&self, prefix: &str) -> Option<String> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|spec| spec.to_string().starts_with(prefix))
            .and_then(|spec| spec.stdin_data().map(str::to_string))
    }
}

impl CommandRunner for ScriptedRunner {
    fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let line = spec.to_string();
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(spec.clone());

        let rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(rules
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput::ok("")))
    }
}
