// src/resolve/rewrite.rs

//! Launch rewrites for artifacts the host cannot execute directly.
//!
//! A rewrite sees the command after path resolution and may replace the
//! program and prepend arguments. New platforms or artifact types are added as
//! new [`LaunchRewrite`] implementations registered on the resolver.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::debug;

use crate::errors::{MultirunError, Result};
use crate::resolve::ResolvedCommand;

pub trait LaunchRewrite: Send + Sync + fmt::Debug {
    /// Whether this rewrite handles the resolved program.
    fn applies_to(&self, program: &Path) -> bool;

    fn rewrite(&self, command: ResolvedCommand) -> Result<ResolvedCommand>;
}

/// Finds an interpreter by name.
pub type InterpreterLookup = Box<dyn Fn(&str) -> Result<PathBuf> + Send + Sync>;

/// Runs script artifacts through an interpreter:
/// `<interpreter> -c '<script> "$@"' -- <args...>`.
///
/// The interpreter is looked up on first use and reused for the rest of the
/// run.
pub struct InterpreterRewrite {
    interpreter: String,
    extensions: Vec<String>,
    enabled: bool,
    lookup: InterpreterLookup,
    located: OnceLock<PathBuf>,
}

impl fmt::Debug for InterpreterRewrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpreterRewrite")
            .field("interpreter", &self.interpreter)
            .field("extensions", &self.extensions)
            .field("enabled", &self.enabled)
            .field("located", &self.located.get())
            .finish_non_exhaustive()
    }
}

impl InterpreterRewrite {
    pub fn new(interpreter: impl Into<String>, extensions: &[&str], lookup: InterpreterLookup) -> Self {
        Self {
            interpreter: interpreter.into(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            enabled: true,
            lookup,
            located: OnceLock::new(),
        }
    }

    /// Shell scripts via bash. Only enabled on Windows, where `.bash`/`.sh`
    /// artifacts have no native launcher. `BAZEL_SH` overrides the `PATH`
    /// search.
    pub fn bash_scripts() -> Self {
        let name = if cfg!(windows) { "bash.exe" } else { "bash" };
        Self::new(name, &["bash", "sh"], Box::new(lookup_bash)).enabled(cfg!(windows))
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn interpreter_path(&self) -> Result<PathBuf> {
        if let Some(path) = self.located.get() {
            return Ok(path.clone());
        }
        let path = (self.lookup)(&self.interpreter)?;
        debug!(interpreter = %path.display(), "located script interpreter");
        Ok(self.located.get_or_init(|| path).clone())
    }
}

impl LaunchRewrite for InterpreterRewrite {
    fn applies_to(&self, program: &Path) -> bool {
        self.enabled
            && program
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }

    fn rewrite(&self, command: ResolvedCommand) -> Result<ResolvedCommand> {
        let interpreter = self.interpreter_path()?;

        let mut args = Vec::with_capacity(command.args.len() + 3);
        args.push("-c".to_string());
        args.push(format!("{} \"$@\"", command.program.display()));
        args.push("--".to_string());
        args.extend(command.args);

        Ok(ResolvedCommand {
            program: interpreter,
            args,
            ..command
        })
    }
}

fn lookup_bash(name: &str) -> Result<PathBuf> {
    if let Some(bash) = std::env::var_os("BAZEL_SH").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(bash));
    }
    which::which(name).map_err(|e| MultirunError::InterpreterNotFound {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
