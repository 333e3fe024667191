// src/resolve/runfiles.rs

//! Runfiles lookup: where the build put the artifacts this launcher runs.
//!
//! A runfiles tree is either a manifest (`<logical> <real>` per line) or a
//! plain directory mirroring the logical layout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{MultirunError, Result};
use crate::fs::FileSystem;

pub const MANIFEST_ENV: &str = "RUNFILES_MANIFEST_FILE";
pub const DIR_ENV: &str = "RUNFILES_DIR";

/// Inputs for runfiles discovery, captured once from the process.
#[derive(Debug, Clone, Default)]
pub struct RunfilesEnv {
    pub manifest_var: Option<String>,
    pub dir_var: Option<String>,
    pub exe: Option<PathBuf>,
    pub cwd: PathBuf,
}

impl RunfilesEnv {
    pub fn from_process(exe: Option<PathBuf>) -> Self {
        Self {
            manifest_var: non_empty_var(MANIFEST_ENV),
            dir_var: non_empty_var(DIR_ENV),
            exe,
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runfiles {
    Manifest {
        path: PathBuf,
        entries: HashMap<String, PathBuf>,
    },
    Directory(PathBuf),
}

impl Runfiles {
    pub fn from_directory(root: impl Into<PathBuf>) -> Self {
        Runfiles::Directory(root.into())
    }

    /// Parse a manifest file. Lines without a target (directory markers) and
    /// blank lines are skipped.
    pub fn from_manifest(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let contents = fs.read_to_string(path).map_err(|e| {
            MultirunError::ConfigError(format!("unreadable runfiles manifest {path:?}: {e:#}"))
        })?;

        let entries = contents
            .lines()
            .filter_map(|line| line.split_once(' '))
            .filter(|(_, real)| !real.is_empty())
            .map(|(logical, real)| (logical.to_string(), PathBuf::from(real)))
            .collect();

        Ok(Runfiles::Manifest {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Find the runfiles tree for this process.
    ///
    /// Order: `RUNFILES_MANIFEST_FILE`, `RUNFILES_DIR`, `<exe>.runfiles_manifest`,
    /// `<exe>.runfiles/`, and finally the working directory.
    pub fn discover(fs: &dyn FileSystem, env: &RunfilesEnv) -> Result<Self> {
        if let Some(manifest) = &env.manifest_var {
            debug!(manifest = %manifest, "using runfiles manifest from environment");
            return Self::from_manifest(fs, Path::new(manifest));
        }
        if let Some(dir) = &env.dir_var {
            debug!(dir = %dir, "using runfiles directory from environment");
            return Ok(Self::from_directory(dir));
        }

        if let Some(exe) = &env.exe {
            let manifest = sibling(exe, ".runfiles_manifest");
            if fs.is_file(&manifest) {
                debug!(manifest = %manifest.display(), "using runfiles manifest next to executable");
                return Self::from_manifest(fs, &manifest);
            }
            let dir = sibling(exe, ".runfiles");
            if fs.is_dir(&dir) {
                debug!(dir = %dir.display(), "using runfiles directory next to executable");
                return Ok(Self::from_directory(dir));
            }
        }

        debug!(cwd = %env.cwd.display(), "no runfiles found; resolving against working directory");
        Ok(Self::from_directory(env.cwd.clone()))
    }

    /// Real location of a logical runfiles path, if it exists.
    pub fn rlocation(&self, fs: &dyn FileSystem, logical: &str) -> Option<PathBuf> {
        let candidate = match self {
            Runfiles::Manifest { entries, .. } => entries.get(logical)?.clone(),
            Runfiles::Directory(root) => root.join(logical),
        };
        fs.is_file(&candidate).then_some(candidate)
    }

    /// Variables that let children find the same runfiles tree.
    pub fn child_env(&self) -> Vec<(String, String)> {
        match self {
            Runfiles::Manifest { path, .. } => {
                vec![(MANIFEST_ENV.to_string(), path.to_string_lossy().into_owned())]
            }
            Runfiles::Directory(root) => {
                vec![(DIR_ENV.to_string(), root.to_string_lossy().into_owned())]
            }
        }
    }
}

fn sibling(exe: &Path, suffix: &str) -> PathBuf {
    let mut name = exe.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
