use thiserror::Error;

pub type Result<T> = core::result::Result<T, ShimError>;

/// Everything that can go wrong between the operator console and the fabric.
///
/// FIFO and stream state problems are reported, never panicked on; a map
/// failure is fatal at initialization but still surfaces as a value so the
/// caller decides how to die.
#[derive(Error, Debug)]
pub enum ShimError {
    #[error("could not open {path}: {err}")]
    MapUnavailable { path: &'static str, err: std::io::Error },

    #[error("mapping of physical address 0x{addr:08x} failed: {err}")]
    MapFailed { addr: u32, err: std::io::Error },

    #[error("{0}")]
    Config(String),

    #[error("line {line}: {kind}")]
    Parse { line: usize, kind: ParseKind },

    #[error("program file contains no commands")]
    EmptyProgram,

    #[error("{field} out of range: {value} (valid range {min} - {max})")]
    ValueOutOfRange { field: &'static str, value: u32, min: u32, max: u32 },

    #[error("channel index out of range: {0} (must be 0-7)")]
    ChannelOutOfRange(u32),

    #[error("channel order value out of range: {0} (must be 0-7)")]
    OrderValueOutOfRange(u32),

    #[error("channel value out of range: {0} (valid range -32767 - 32767)")]
    SampleOutOfRange(i32),

    #[error("{fifo} FIFO is not present")]
    FifoNotPresent { fifo: &'static str },

    #[error("{fifo} FIFO is empty")]
    FifoEmpty { fifo: &'static str },

    #[error("{fifo} FIFO has no room for {words} word(s)")]
    FifoFull { fifo: &'static str, words: u32 },

    #[error("{0}")]
    StreamState(String),

    #[error("worker aborted: {0}")]
    WorkerAbort(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Location-independent half of a parse error; `ShimError::Parse` adds the
/// 1-based line number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseKind {
    #[error("unknown opcode character '{0}'")]
    UnknownOpcodeChar(char),

    #[error("wrong field count: expected {expected}, found {found}")]
    WrongFieldCount { expected: &'static str, found: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("value {value} out of range (valid range {min} - {max})")]
    ValueOutOfRange { value: i64, min: i64, max: i64 },

    #[error("order value {0} out of range (must be 0-7)")]
    OrderValueOutOfRange(i64),
}

impl ShimError {
    pub fn stream_state(msg: impl Into<String>) -> Self { ShimError::StreamState(msg.into()) }
}
