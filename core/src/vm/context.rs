use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::val::{Value, ValueMap};
use crate::vm::{ByteCode, VmError};

/// Arrays refuse to grow past this many elements.
pub const MAX_ARRAY_LEN: usize = 512;

/// Operation budget per root evaluation; the runaway guard.
pub const OP_BUDGET: i64 = 30_000;

/// Maximum sub-evaluation nesting before bailing out.
pub const MAX_SUB_THREAD_DEPTH: usize = 64;

/// Host callback storing a named variable outside the VM.
pub type StoreNameFn = Rc<RefCell<dyn FnMut(&str, Value)>>;

/// Host callback resolving a named variable; `None` falls through to the
/// builtin table.
pub type LoadNameFn = Rc<RefCell<dyn FnMut(&str) -> Option<Value>>>;

/// Evaluation options, copied into every sub-evaluation.
#[derive(Debug, Clone, Default)]
pub struct RollFlags {
    /// Resolve every die at its minimum face.
    pub dice_min_mode: bool,
    /// Resolve every die at its maximum face.
    pub dice_max_mode: bool,
    /// Unknown names load as their literal string instead of `Undefined`.
    pub disable_load_varname: bool,
    /// Division by zero yields `Undefined` instead of an error.
    pub ignore_div0: bool,
    /// Face count for bare `Nd` rolls when no expression is configured.
    pub default_dice_side_num: i64,
    /// Expression evaluated to derive the face count for bare `Nd` rolls.
    pub default_dice_side_expr: String,
    /// Write the disassembled program to stderr before executing.
    pub print_bytecode: bool,
}

/// One evaluation frame: the compiled program, the operand stack, result
/// and error slots, the op counter, and the host bindings.
///
/// A `Context` is single-threaded and synchronous; evaluating a computed
/// value or calling a user function builds a child context that inherits
/// the flags and callbacks and pays its op count back on completion.
pub struct Context {
    pub(crate) code: Rc<[ByteCode]>,
    pub(crate) code_index: usize,
    pub(crate) stack: Vec<Value>,
    pub(crate) top: usize,

    /// Monotonic operation counter; see `OP_BUDGET`.
    pub num_op_count: i64,
    pub flags: RollFlags,
    pub error: Option<VmError>,

    /// Result of the last evaluation.
    pub ret: Option<Value>,
    /// Unparsed tail of the last `run` input.
    pub rest_input: String,
    /// Consumed prefix of the last `run` input.
    pub matched: String,

    /// Function-scope bindings (parameters of the enclosing call).
    pub(crate) attrs: ValueMap,
    /// Receiver of the evaluation (the computed value or function being
    /// run), used for attribute resolution inside its body.
    pub(crate) current_this: Option<Value>,
    pub(crate) sub_thread_depth: usize,

    /// Fallback variable store used when the host installs no callbacks.
    pub(crate) local_vars: ValueMap,

    pub value_store_name_func: Option<StoreNameFn>,
    pub value_load_name_func: Option<LoadNameFn>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            code: Rc::from(Vec::new()),
            code_index: 0,
            stack: Vec::new(),
            top: 0,
            num_op_count: 0,
            flags: RollFlags::default(),
            error: None,
            ret: None,
            rest_input: String::new(),
            matched: String::new(),
            attrs: ValueMap::new(),
            current_this: None,
            sub_thread_depth: 0,
            local_vars: ValueMap::new(),
            value_store_name_func: None,
            value_load_name_func: None,
        }
    }

    /// Pre-size the operand stack for a program of `n` opcodes.
    pub fn init(&mut self, n: usize) {
        self.stack.reserve(n);
    }

    #[inline]
    pub fn stack_top(&self) -> Option<&Value> {
        if self.top == 0 {
            None
        } else {
            self.stack.get(self.top - 1)
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.sub_thread_depth
    }

    #[inline]
    pub(crate) fn push(&mut self, value: Value) {
        if self.top < self.stack.len() {
            self.stack[self.top] = value;
        } else {
            self.stack.push(value);
        }
        self.top += 1;
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Value {
        debug_assert!(self.top > 0, "operand stack underflow");
        self.top -= 1;
        std::mem::take(&mut self.stack[self.top])
    }

    /// Record the first error; later ones are ignored so the earliest
    /// failure is what the host observes.
    #[inline]
    pub fn set_error(&mut self, error: VmError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Count one operation against the budget. Returns false (and errors
    /// the context) once the budget is exhausted.
    #[inline]
    pub(crate) fn count_op(&mut self) -> bool {
        self.num_op_count += 1;
        if self.num_op_count > OP_BUDGET {
            self.set_error(VmError::OpBudgetExceeded);
            return false;
        }
        true
    }

    /// Store a variable through the host callback, or into the context's
    /// own map when no callback is installed.
    pub fn store_name(&mut self, name: &str, value: Value) {
        if let Some(store) = &self.value_store_name_func {
            let store = store.clone();
            (&mut *store.borrow_mut())(name, value);
        } else {
            self.local_vars.put(name, value);
        }
    }

    /// Resolve a name without the builtin fallback: function parameters
    /// first, then the receiver's attributes, then context-local
    /// variables, then the host callback.
    pub(crate) fn resolve_name(&mut self, name: &str) -> Option<Value> {
        if let Some(v) = self.attrs.get(name) {
            return Some(v.clone());
        }
        if let Some(Value::Computed(cd)) = &self.current_this {
            let attrs = cd.attrs.borrow();
            if let Some(v) = attrs.as_ref().and_then(|m| m.get(name)) {
                return Some(v.clone());
            }
        }
        if let Some(v) = self.local_vars.get(name) {
            return Some(v.clone());
        }
        if let Some(load) = &self.value_load_name_func {
            let load = load.clone();
            let result = (&mut *load.borrow_mut())(name);
            if let Some(v) = result {
                return Some(v);
            }
        }
        None
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("code_len", &self.code.len())
            .field("code_index", &self.code_index)
            .field("top", &self.top)
            .field("num_op_count", &self.num_op_count)
            .field("flags", &self.flags)
            .field("error", &self.error)
            .field("ret", &self.ret)
            .field("sub_thread_depth", &self.sub_thread_depth)
            .finish()
    }
}
