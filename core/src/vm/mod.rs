//! Bytecode, evaluation context and the interpreter.

mod builtins;
mod bytecode;
mod compiler;
mod context;
mod error;
#[allow(clippy::module_inception)]
mod vm;

#[cfg(test)]
mod vm_test;

pub use builtins::builtin_value;
pub use bytecode::{dump, ByteCode};
pub use compiler::Compiler;
pub use context::{
    Context, LoadNameFn, RollFlags, StoreNameFn, MAX_ARRAY_LEN, MAX_SUB_THREAD_DEPTH, OP_BUDGET,
};
pub use error::VmError;
pub use vm::{computed_execute, func_invoke, invoke_native, COMPUTED_OP_TAX, FUNCTION_OP_TAX};
