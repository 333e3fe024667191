// src/config/mod.rs

//! Instruction set loading and validation for multirun.
//!
//! Responsibilities:
//! - Define the JSON-backed data model (`model.rs`).
//! - Load an instructions file from disk (`loader.rs`).
//! - Validate policy values and commands (`validate.rs`).
//! - Find the default instructions file next to the executable (`locate.rs`).

pub mod loader;
pub mod locate;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use locate::{default_instructions_path, instructions_path_for, ProcessSelfLocator, SelfLocator};
pub use model::{Command, ExecutionPolicy, InstructionSet, RawCommand, RawInstructionSet};
