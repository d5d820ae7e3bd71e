use thiserror::Error;

/// Fatal engine signals. These abort the current top-level operation;
/// everything recoverable is an in-tree error marker or a warning instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("recursion limit exceeded (depth {0})")]
    RecursionLimit(u32),
    #[error("hard time limit exceeded ({0} ms)")]
    Timeout(u64),
    #[error("arena memory limit exceeded ({0} nodes)")]
    OutOfMemory(u64),
}

/// Non-fatal warnings delivered through the signal channel without
/// interrupting the computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The rewrite loop stopped at its iteration cap; the result is
    /// best-effort.
    IterationLimit { limit: u32 },
    /// The arena crossed the scope's memory low-water mark.
    MemoryLowWater { nodes: u64, low_water: u64 },
    /// A soft time budget elapsed; the result is best-effort.
    TimeBudget { elapsed_ms: u64 },
}

/// A signal sent to the caller-supplied handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Warning(Warning),
    Fatal(EngineError),
}
