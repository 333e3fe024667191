// src/config/model.rs

use serde::Deserialize;

/// Instruction file as read from JSON, before validation.
///
/// ```json
/// {
///   "commands": [
///     {"tag": "fmt", "path": "tools/fmt.sh", "args": ["--check"], "env": ["CI=1"]}
///   ],
///   "jobs": 0,
///   "printCommand": true,
///   "bufferOutput": false,
///   "stopOnError": true,
///   "workspaceRoot": "_main"
/// }
/// ```
///
/// Every field except `commands` is optional. Older generators spelled the
/// policy fields in snake case; those spellings are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstructionSet {
    pub commands: Vec<RawCommand>,

    /// Signed so that a negative value reaches validation instead of failing
    /// deserialization with a less helpful message.
    #[serde(default = "default_jobs")]
    pub jobs: i64,

    #[serde(default = "default_print_command", alias = "print_command")]
    pub print_command: bool,

    #[serde(default, alias = "buffer_output")]
    pub buffer_output: bool,

    #[serde(default = "default_stop_on_error", alias = "stop_on_error")]
    pub stop_on_error: bool,

    #[serde(default, alias = "workspace_name")]
    pub workspace_root: String,
}

fn default_jobs() -> i64 {
    1
}

fn default_print_command() -> bool {
    true
}

fn default_stop_on_error() -> bool {
    true
}

/// One entry of `commands`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCommand {
    /// Display label; defaults to `path` when absent.
    #[serde(default)]
    pub tag: Option<String>,

    pub path: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// `KEY=VALUE` overrides, applied in order.
    #[serde(default)]
    pub env: Vec<String>,
}

/// A validated command. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub tag: String,
    pub path: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

/// Run policy shared by every command of an instruction set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPolicy {
    /// 0 = unbounded fan-out, 1 = serial, N > 1 = bounded pool of N workers.
    pub jobs: usize,
    pub tag_output: bool,
    pub buffer_output: bool,
    pub stop_on_error: bool,
    pub workspace_root: String,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            jobs: default_jobs() as usize,
            tag_output: default_print_command(),
            buffer_output: false,
            stop_on_error: default_stop_on_error(),
            workspace_root: String::new(),
        }
    }
}

/// Validated instruction set: the commands plus the policy to run them with.
///
/// Only constructed through `TryFrom<RawInstructionSet>` (see `validate.rs`)
/// or [`InstructionSet::new_unchecked`] for callers that build it in code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionSet {
    pub commands: Vec<Command>,
    pub policy: ExecutionPolicy,
}

impl InstructionSet {
    pub fn new_unchecked(commands: Vec<Command>, policy: ExecutionPolicy) -> Self {
        Self { commands, policy }
    }
}
