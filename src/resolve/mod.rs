// src/resolve/mod.rs

//! Command resolution: logical artifact paths -> executable locations.
//!
//! - [`runfiles`] finds and reads the runfiles tree.
//! - [`rewrite`] holds the pluggable launch rewrites applied after lookup.
//!
//! Resolution is eager: [`Resolver::resolve_all`] resolves every command
//! before anything runs and fails on the first unresolvable one.

pub mod rewrite;
pub mod runfiles;

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::config::Command;
use crate::errors::{MultirunError, Result};
use crate::fs::FileSystem;

pub use rewrite::{InterpreterRewrite, LaunchRewrite};
pub use runfiles::{Runfiles, RunfilesEnv};

/// A command ready to be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// Position in the instruction set.
    pub index: usize,
    pub tag: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Applied in order on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct Resolver<'a> {
    fs: &'a dyn FileSystem,
    runfiles: Runfiles,
    workspace_root: String,
    rewrites: Vec<Box<dyn LaunchRewrite>>,
}

impl<'a> Resolver<'a> {
    pub fn new(fs: &'a dyn FileSystem, runfiles: Runfiles, workspace_root: impl Into<String>) -> Self {
        Self {
            fs,
            runfiles,
            workspace_root: workspace_root.into(),
            rewrites: Vec::new(),
        }
    }

    pub fn with_rewrite(mut self, rewrite: impl LaunchRewrite + 'static) -> Self {
        self.rewrites.push(Box::new(rewrite));
        self
    }

    /// Logical paths tried for `path`, in order.
    ///
    /// `../repo/x` addresses an external repository and is looked up as
    /// `repo/x`. Anything else is tried under `workspace_root` and as given,
    /// then the same two forms again with its leading segment stripped, so
    /// that both `<repo>/pkg/bin` and `pkg/bin` style paths resolve.
    pub fn candidates(&self, path: &str) -> Vec<String> {
        let path = path.replace('\\', "/");

        if let Some(external) = path.strip_prefix("../") {
            return vec![external.to_string()];
        }

        let mut forms = vec![path.as_str()];
        if let Some((_, stripped)) = path.split_once('/') {
            if !stripped.is_empty() {
                forms.push(stripped);
            }
        }

        let mut out: Vec<String> = Vec::with_capacity(forms.len() * 2);
        for form in forms {
            for candidate in [self.under_root(form), form.to_string()] {
                if !out.contains(&candidate) {
                    out.push(candidate);
                }
            }
        }
        out
    }

    fn under_root(&self, path: &str) -> String {
        if self.workspace_root.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.workspace_root.trim_end_matches('/'), path)
        }
    }

    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        if Path::new(path).is_absolute() {
            return if self.fs.is_file(Path::new(path)) {
                Ok(PathBuf::from(path))
            } else {
                Err(MultirunError::Resolution {
                    path: path.to_string(),
                    tried: vec![path.to_string()],
                })
            };
        }

        let candidates = self.candidates(path);
        for candidate in &candidates {
            if let Some(real) = self.runfiles.rlocation(self.fs, candidate) {
                debug!(path, candidate = %candidate, real = %real.display(), "resolved command path");
                return Ok(real);
            }
        }

        Err(MultirunError::Resolution {
            path: path.to_string(),
            tried: candidates,
        })
    }

    /// Resolve one command, appending `extra_args` and applying any matching
    /// launch rewrite.
    pub fn resolve_command(
        &self,
        index: usize,
        command: &Command,
        extra_args: &[String],
    ) -> Result<ResolvedCommand> {
        let program = self.resolve(&command.path)?;

        let mut env = self.runfiles.child_env();
        env.extend(command.env.iter().cloned());

        let mut resolved = ResolvedCommand {
            index,
            tag: command.tag.clone(),
            program,
            args: command.args.iter().chain(extra_args).cloned().collect(),
            env,
        };

        for rewrite in &self.rewrites {
            if rewrite.applies_to(&resolved.program) {
                debug!(tag = %resolved.tag, ?rewrite, "rewriting launch");
                resolved = rewrite.rewrite(resolved)?;
            }
        }

        Ok(resolved)
    }

    /// Resolve every command or none.
    pub fn resolve_all(&self, commands: &[Command], extra_args: &[String]) -> Result<Vec<ResolvedCommand>> {
        commands
            .iter()
            .enumerate()
            .map(|(index, command)| {
                self.resolve_command(index, command, extra_args)
                    .inspect_err(|err| error!(tag = %command.tag, error = %err, "command resolution failed"))
            })
            .collect()
    }
}
