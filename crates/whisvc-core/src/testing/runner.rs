use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{CommandError, CommandOutput, CommandRunner, CommandSpec};

type Rule = Box<dyn Fn(&CommandSpec) -> Option<Result<CommandOutput, CommandError>> + Send + Sync>;

/// Command runner answering from rules, first match wins.
///
/// Commands no rule matches succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    /// Add a rule. Return `None` from the closure to fall through.
    #[must_use]
    pub fn rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&CommandSpec) -> Option<Result<CommandOutput, CommandError>> + Send + Sync + 'static,
    {
        self.rules.push(Box::new(rule));
        self
    }

    /// Answer every command whose program name is `program` and whose
    /// arguments contain `arg` with `output`.
    #[must_use]
    pub fn respond(self, program: &str, arg: &str, output: CommandOutput) -> Self {
        let program = program.to_string();
        let arg = arg.to_string();
        self.rule(move |spec| {
            (spec.program_name() == program && spec.args.iter().any(|a| a == &arg))
                .then(|| Ok(output.clone()))
        })
    }

    /// Fail to spawn `program` at all.
    #[must_use]
    pub fn missing(self, program: &str) -> Self {
        let program = program.to_string();
        self.rule(move |spec| {
            (spec.program_name() == program).then(|| {
                Err(CommandError::Spawn {
                    program: program.clone(),
                    reason: "not found".to_string(),
                })
            })
        })
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose rendered command line contains `needle`.
    pub fn calls_matching(&self, needle: &str) -> Vec<String> {
        self.calls()
            .iter()
            .map(CommandSpec::display)
            .filter(|line| line.contains(needle))
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        self.calls.lock().unwrap().push(spec.clone());
        for rule in &self.rules {
            if let Some(result) = rule(spec) {
                return result;
            }
        }
        Ok(CommandOutput::ok(""))
    }
}
