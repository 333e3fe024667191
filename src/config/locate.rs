// src/config/locate.rs

//! Finding the instructions file when no path is given on the command line.
//!
//! The build generates `<name>.json` next to the `<name>` (or `<name>.exe`)
//! launcher, so the path is derived from the running executable.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::errors::Result;

const EXE_SUFFIX: &str = ".exe";
const INSTRUCTIONS_SUFFIX: &str = ".json";

/// Capability to find the path of the running executable.
pub trait SelfLocator {
    fn current_exe(&self) -> Result<PathBuf>;
}

/// Production locator backed by [`std::env::current_exe`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSelfLocator;

impl SelfLocator for ProcessSelfLocator {
    fn current_exe(&self) -> Result<PathBuf> {
        let exe = std::env::current_exe().context("locating the running executable")?;
        Ok(exe)
    }
}

/// Derive the instructions path for an executable path.
pub fn instructions_path_for(exe: &Path) -> PathBuf {
    let exe = exe.to_string_lossy();
    let base = exe.strip_suffix(EXE_SUFFIX).unwrap_or(exe.as_ref());
    PathBuf::from(format!("{base}{INSTRUCTIONS_SUFFIX}"))
}

/// Instructions path next to whatever executable `locator` reports.
pub fn default_instructions_path(locator: &dyn SelfLocator) -> Result<PathBuf> {
    let exe = locator.current_exe()?;
    Ok(instructions_path_for(&exe))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLocator(&'static str);

    impl SelfLocator for FixedLocator {
        fn current_exe(&self) -> Result<PathBuf> {
            Ok(PathBuf::from(self.0))
        }
    }

    #[test]
    fn exe_suffix_is_replaced() {
        assert_eq!(
            instructions_path_for(Path::new("/out/bin/deploy_all.exe")),
            PathBuf::from("/out/bin/deploy_all.json")
        );
    }

    #[test]
    fn suffix_is_appended_without_exe() {
        assert_eq!(
            instructions_path_for(Path::new("/out/bin/deploy_all")),
            PathBuf::from("/out/bin/deploy_all.json")
        );
    }

    #[test]
    fn default_path_uses_the_injected_locator() {
        let path = default_instructions_path(&FixedLocator("/tmp/run_checks")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/run_checks.json"));
    }
}
