// src/config/validate.rs

use crate::config::model::{Command, ExecutionPolicy, InstructionSet, RawCommand, RawInstructionSet};
use crate::errors::{MultirunError, Result};

impl TryFrom<RawInstructionSet> for InstructionSet {
    type Error = crate::errors::MultirunError;

    fn try_from(raw: RawInstructionSet) -> std::result::Result<Self, Self::Error> {
        let policy = validate_policy(&raw)?;
        let commands = raw
            .commands
            .into_iter()
            .enumerate()
            .map(|(index, cmd)| validate_command(index, cmd))
            .collect::<Result<Vec<_>>>()?;

        Ok(InstructionSet::new_unchecked(commands, policy))
    }
}

fn validate_policy(raw: &RawInstructionSet) -> Result<ExecutionPolicy> {
    let jobs = usize::try_from(raw.jobs).map_err(|_| {
        MultirunError::ConfigError(format!("jobs must be at least 0 (got {})", raw.jobs))
    })?;

    Ok(ExecutionPolicy {
        jobs,
        tag_output: raw.print_command,
        buffer_output: raw.buffer_output,
        stop_on_error: raw.stop_on_error,
        workspace_root: raw.workspace_root.clone(),
    })
}

fn validate_command(index: usize, raw: RawCommand) -> Result<Command> {
    if raw.path.trim().is_empty() {
        return Err(MultirunError::ConfigError(format!(
            "command #{index} has an empty `path`"
        )));
    }

    let env = raw
        .env
        .iter()
        .map(|entry| parse_env_entry(index, entry))
        .collect::<Result<Vec<_>>>()?;

    let tag = match raw.tag {
        Some(tag) => tag,
        None => raw.path.clone(),
    };

    Ok(Command {
        tag,
        path: raw.path,
        args: raw.args,
        env,
    })
}

fn parse_env_entry(index: usize, entry: &str) -> Result<(String, String)> {
    match entry.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(MultirunError::ConfigError(format!(
            "command #{index} has env entry '{entry}' (expected KEY=VALUE)"
        ))),
    }
}
