use thiserror::Error;

use crate::token::ParseError;

/// Everything the VM can put in a context's error slot. The first error
/// stored halts the interpreter loop; sub-evaluators copy theirs into the
/// parent unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    #[error("division by zero")]
    DivideByZero,
    #[error("cannot build an array longer than {} elements", crate::vm::MAX_ARRAY_LEN)]
    ArrayTooLarge,
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: i64 },
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("function expects {expected} arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("operation budget exceeded")]
    OpBudgetExceeded,
    #[error("nested evaluation exceeds depth limit")]
    DepthExceeded,
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}
