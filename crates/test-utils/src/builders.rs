use std::path::PathBuf;

use multirun::config::{Command, ExecutionPolicy, InstructionSet};
use multirun::resolve::ResolvedCommand;

/// Builder for `InstructionSet` to simplify test setup.
///
/// Starts from the loader defaults (serial, tagged, streamed,
/// stop-on-error).
pub struct InstructionSetBuilder {
    commands: Vec<Command>,
    policy: ExecutionPolicy,
}

impl InstructionSetBuilder {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            policy: ExecutionPolicy::default(),
        }
    }

    pub fn with(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.policy.jobs = jobs;
        self
    }

    pub fn tag_output(mut self, val: bool) -> Self {
        self.policy.tag_output = val;
        self
    }

    pub fn buffer_output(mut self, val: bool) -> Self {
        self.policy.buffer_output = val;
        self
    }

    pub fn stop_on_error(mut self, val: bool) -> Self {
        self.policy.stop_on_error = val;
        self
    }

    pub fn workspace_root(mut self, root: &str) -> Self {
        self.policy.workspace_root = root.to_string();
        self
    }

    pub fn build(self) -> InstructionSet {
        InstructionSet::new_unchecked(self.commands, self.policy)
    }
}

impl Default for InstructionSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `Command`.
pub struct CommandBuilder {
    command: Command,
}

impl CommandBuilder {
    pub fn new(tag: &str, path: &str) -> Self {
        Self {
            command: Command {
                tag: tag.to_string(),
                path: path.to_string(),
                args: vec![],
                env: vec![],
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.command.args.push(arg.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.command.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> Command {
        self.command
    }
}

/// A resolved command whose program is just its tag.
///
/// Enough for the fake runner, which dispatches on the tag.
pub fn resolved(index: usize, tag: &str) -> ResolvedCommand {
    ResolvedCommand {
        index,
        tag: tag.to_string(),
        program: PathBuf::from(tag),
        args: vec![],
        env: vec![],
    }
}

/// One resolved command per tag, indexed in order.
pub fn resolved_all(tags: &[&str]) -> Vec<ResolvedCommand> {
    tags.iter()
        .enumerate()
        .map(|(index, tag)| resolved(index, tag))
        .collect()
}

/// Policy with the given `jobs` and everything else defaulted.
pub fn policy(jobs: usize) -> ExecutionPolicy {
    ExecutionPolicy {
        jobs,
        ..ExecutionPolicy::default()
    }
}
