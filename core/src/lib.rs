//! drs — an embeddable expression language and VM for tabletop dice
//! scripting.
//!
//! The host builds a [`Context`], optionally installs flags and the two
//! name callbacks, and calls [`Context::run`] with a source expression:
//!
//! ```
//! use drs_core::{Context, Value};
//!
//! let mut ctx = Context::new();
//! let ret = ctx.run("1 + 2 * 3").unwrap();
//! assert_eq!(ret, Value::Int(7));
//! ```

pub mod ast;
pub mod op;
pub mod roll;
pub mod token;
pub mod val;
pub mod vm;

pub use val::{Value, ValueMap};
pub use vm::{Context, RollFlags, VmError};
