use std::fmt;

/// Concurrency strategy derived from the `jobs` policy value.
///
/// - `Unbounded`: `jobs = 0`, every command is launched at once.
/// - `Serial`: `jobs = 1`, strict list order, one command at a time.
/// - `Bounded(n)`: `jobs = n > 1`, a pool of `n` workers draining a FIFO queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Unbounded,
    Serial,
    Bounded(usize),
}

impl ExecutionMode {
    pub fn from_jobs(jobs: usize) -> Self {
        match jobs {
            0 => ExecutionMode::Unbounded,
            1 => ExecutionMode::Serial,
            n => ExecutionMode::Bounded(n),
        }
    }

    /// How children of this mode get their standard input.
    ///
    /// Only serial execution forwards the parent's stdin, because exactly one
    /// child can ever be reading it.
    pub fn stdin_mode(self) -> StdinMode {
        match self {
            ExecutionMode::Serial => StdinMode::Inherit,
            ExecutionMode::Unbounded | ExecutionMode::Bounded(_) => StdinMode::Null,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Unbounded => write!(f, "unbounded"),
            ExecutionMode::Serial => write!(f, "serial"),
            ExecutionMode::Bounded(n) => write!(f, "bounded({n})"),
        }
    }
}

/// Standard input routing for a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdinMode {
    /// Child reads the parent's stdin.
    Inherit,
    /// Child reads from the null device.
    Null,
}
