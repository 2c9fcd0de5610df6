//! The opcode dispatch loop and the sub-evaluation protocol.

use tracing::{debug, trace};

use crate::ast;
use crate::op::BinOp;
use crate::roll;
use crate::val::{Value, BIN_OPERATORS};
use crate::vm::{
    builtins, bytecode, ByteCode, Compiler, Context, VmError, MAX_ARRAY_LEN, MAX_SUB_THREAD_DEPTH,
};

/// Op-count tax charged to a child context on computed-value entry.
pub const COMPUTED_OP_TAX: i64 = 200;

/// Op-count tax charged to a child context on user-function entry.
pub const FUNCTION_OP_TAX: i64 = 100;

impl Context {
    /// Parse, compile and execute one source expression.
    ///
    /// On return `ret`/`error` hold the outcome, `matched` the consumed
    /// prefix and `rest_input` the unparsed tail. The op counter is *not*
    /// reset: sub-evaluations pre-seed it before calling into here.
    pub fn run(&mut self, source: &str) -> Result<Value, VmError> {
        self.error = None;
        self.ret = None;
        self.top = 0;
        self.code_index = 0;
        if let Err(err) = self.prepare(source) {
            self.set_error(err.clone());
            return Err(err);
        }
        self.execute()
    }

    /// Parse and compile only; `execute` evaluates the compiled program.
    pub(crate) fn prepare(&mut self, source: &str) -> Result<(), VmError> {
        let outcome = ast::parse_program(source).map_err(VmError::from)?;
        self.matched = source[..outcome.matched_end].to_string();
        self.rest_input = source[outcome.matched_end..].to_string();
        self.code = Compiler::new().compile(&outcome.expr);
        self.init(self.code.len());
        Ok(())
    }

    /// Evaluate the current bytecode from the start. This is also the
    /// entry used for cached computed/function bodies.
    pub fn execute(&mut self) -> Result<Value, VmError> {
        self.code_index = 0;
        self.top = 0;
        self.error = None;

        if self.flags.print_bytecode {
            eprint!("{}", bytecode::dump(&self.code));
        }

        let code = self.code.clone();
        while self.code_index < code.len() && self.error.is_none() {
            let op = &code[self.code_index];
            self.code_index += 1;
            trace!(ip = self.code_index - 1, op = ?op, "step");
            self.step(op);
        }

        if let Some(err) = self.error.clone() {
            return Err(err);
        }
        let ret = self.stack_top().cloned().unwrap_or(Value::Undefined);
        self.ret = Some(ret.clone());
        Ok(ret)
    }

    fn step(&mut self, op: &ByteCode) {
        match op {
            ByteCode::PushInt(i) => self.push(Value::Int(*i)),
            ByteCode::PushFloat(f) => self.push(Value::Float(*f)),
            ByteCode::PushStr(s) => self.push(Value::Str(s.clone())),
            ByteCode::PushUndefined => self.push(Value::Undefined),
            ByteCode::PushNull => self.push(Value::Null),
            ByteCode::PushArray(n) => {
                if *n > MAX_ARRAY_LEN {
                    self.set_error(VmError::ArrayTooLarge);
                    return;
                }
                let mut items = Vec::with_capacity(*n);
                for _ in 0..*n {
                    items.push(self.pop());
                }
                items.reverse();
                self.push(Value::array(items));
            }
            ByteCode::PushComputed(cd) => self.push(Value::Computed(cd.clone())),
            ByteCode::PushFunction(fd) => self.push(Value::Function(fd.clone())),
            ByteCode::LoadName(name) => {
                let value = self.load_name_or_default(name);
                if matches!(value, Value::Computed(_)) {
                    if let Some(executed) = computed_execute(self, &value) {
                        self.push(executed);
                    }
                } else {
                    self.push(value);
                }
            }
            ByteCode::LoadNameRaw(name) => {
                let value = self.load_name_or_default(name);
                self.push(value);
            }
            ByteCode::StoreName(name) => {
                let value = self.pop();
                self.store_name(name, value.clone());
                self.push(value);
            }
            ByteCode::LoadAttr(name) => {
                let obj = self.pop();
                match obj.get_attr(self, name) {
                    Some(value) => self.push(value),
                    None => self.set_error(VmError::TypeMismatch(format!(
                        "{} has no attributes",
                        obj.type_name()
                    ))),
                }
            }
            ByteCode::StoreAttr(name) => {
                let value = self.pop();
                let obj = self.pop();
                match obj.set_attr(name, &value) {
                    Some(_) => self.push(value),
                    None => self.set_error(VmError::TypeMismatch(format!(
                        "cannot set attributes on {}",
                        obj.type_name()
                    ))),
                }
            }
            ByteCode::GetIndex => {
                let index = self.pop();
                let obj = self.pop();
                match index.read_int() {
                    Some(index) => {
                        if let Some(value) = obj.array_get_item(self, index) {
                            self.push(value);
                        }
                    }
                    None => self.set_error(VmError::TypeMismatch(
                        "index must be an integer".to_string(),
                    )),
                }
            }
            ByteCode::SetIndex => {
                let value = self.pop();
                let index = self.pop();
                let obj = self.pop();
                match index.read_int() {
                    Some(index) => {
                        if obj.array_set_item(self, index, &value) {
                            self.push(value);
                        }
                    }
                    None => self.set_error(VmError::TypeMismatch(
                        "index must be an integer".to_string(),
                    )),
                }
            }
            ByteCode::GetSlice => {
                let b = self.pop();
                let a = self.pop();
                let obj = self.pop();
                if let Some(value) = obj.get_slice_ex(self, &a, &b) {
                    self.push(value);
                }
            }
            ByteCode::SetSlice => {
                let value = self.pop();
                let b = self.pop();
                let a = self.pop();
                let obj = self.pop();
                if obj.set_slice_ex(self, &a, &b, &value) {
                    self.push(value);
                }
            }
            ByteCode::CallMethod { name, argc } => {
                let args = self.pop_args(*argc);
                let receiver = self.pop();
                if let Some(value) = receiver.call_method(self, name, &args) {
                    self.push(value);
                }
            }
            ByteCode::Call(argc) => {
                let args = self.pop_args(*argc);
                let callee = self.pop();
                match &callee {
                    Value::Function(_) => {
                        if let Some(value) = func_invoke(self, &callee, args) {
                            self.push(value);
                        }
                    }
                    Value::NativeFunction(_) => {
                        if let Some(value) = invoke_native(self, &callee, &args) {
                            self.push(value);
                        }
                    }
                    other => self.set_error(VmError::TypeMismatch(format!(
                        "{} is not callable",
                        other.type_name()
                    ))),
                }
            }
            ByteCode::BinOp(index) => {
                if !self.count_op() {
                    return;
                }
                let rhs = self.pop();
                let lhs = self.pop();
                let func = BIN_OPERATORS[*index as usize];
                match func(&lhs, self, &rhs) {
                    Some(value) => self.push(value),
                    None => {
                        if self.error.is_none() {
                            let op = BinOp::from_index(*index as usize)
                                .map(|op| op.to_string())
                                .unwrap_or_else(|| "?".to_string());
                            self.set_error(VmError::TypeMismatch(format!(
                                "cannot apply {} {op} {}",
                                lhs.type_name(),
                                rhs.type_name()
                            )));
                        }
                    }
                }
            }
            ByteCode::Neg => {
                let value = self.pop();
                match value.op_negation() {
                    Some(value) => self.push(value),
                    None => self.set_error(VmError::TypeMismatch(format!(
                        "cannot negate {}",
                        value.type_name()
                    ))),
                }
            }
            ByteCode::Pos => {
                let value = self.pop();
                match value.op_positive() {
                    Some(value) => self.push(value),
                    None => self.set_error(VmError::TypeMismatch(format!(
                        "unary '+' undefined for {}",
                        value.type_name()
                    ))),
                }
            }
            ByteCode::Pop => {
                let _ = self.pop();
            }
            ByteCode::Roll => {
                if !self.count_op() {
                    return;
                }
                let sides = self.pop();
                let count = self.pop();
                if let Some((count, sides)) = self.dice_params(&count, &sides) {
                    if let Some(sum) = roll::roll_sum(self, count, sides) {
                        self.push(Value::Int(sum));
                    }
                }
            }
            ByteCode::RollDefault => {
                if !self.count_op() {
                    return;
                }
                let count = self.pop();
                let count = match count.read_int() {
                    Some(count) => count,
                    None => {
                        self.set_error(VmError::TypeMismatch(
                            "dice count must be an integer".to_string(),
                        ));
                        return;
                    }
                };
                if let Some(sides) = self.default_dice_sides() {
                    if let Some(sum) = roll::roll_sum(self, count, sides) {
                        self.push(Value::Int(sum));
                    }
                }
            }
            ByteCode::RollKeep { high } => {
                if !self.count_op() {
                    return;
                }
                let keep = self.pop();
                let sides = self.pop();
                let count = self.pop();
                let keep = match keep.read_int() {
                    Some(keep) => keep,
                    None => {
                        self.set_error(VmError::TypeMismatch(
                            "keep count must be an integer".to_string(),
                        ));
                        return;
                    }
                };
                if let Some((count, sides)) = self.dice_params(&count, &sides) {
                    if let Some(sum) = roll::roll_keep(self, count, sides, keep, *high) {
                        self.push(Value::Int(sum));
                    }
                }
            }
        }
    }

    fn pop_args(&mut self, argc: usize) -> Vec<Value> {
        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            args.push(self.pop());
        }
        args.reverse();
        args
    }

    fn load_name_or_default(&mut self, name: &str) -> Value {
        if let Some(value) = self.resolve_name(name) {
            return value;
        }
        if let Some(value) = builtins::builtin_value(name) {
            return value;
        }
        if self.flags.disable_load_varname {
            Value::str(name)
        } else {
            Value::Undefined
        }
    }

    fn dice_params(&mut self, count: &Value, sides: &Value) -> Option<(i64, i64)> {
        match (count.read_int(), sides.read_int()) {
            (Some(count), Some(sides)) => Some((count, sides)),
            _ => {
                self.set_error(VmError::TypeMismatch(
                    "dice parameters must be integers".to_string(),
                ));
                None
            }
        }
    }

    /// Face count for a bare `Nd` roll: the configured expression if any,
    /// else the configured number, else 100.
    fn default_dice_sides(&mut self) -> Option<i64> {
        let expr = self.flags.default_dice_side_expr.clone();
        if !expr.is_empty() {
            let mut vm = self.sub_context(None, COMPUTED_OP_TAX);
            if vm.sub_thread_depth > MAX_SUB_THREAD_DEPTH {
                self.set_error(VmError::DepthExceeded);
                return None;
            }
            // The expression would recurse through its own bare-roll
            // default; evaluate it with the expression cleared.
            vm.flags.default_dice_side_expr = String::new();
            match vm.run(&expr) {
                Err(err) => {
                    self.set_error(err);
                    None
                }
                Ok(value) => {
                    self.num_op_count = vm.num_op_count;
                    if !self.count_op() {
                        return None;
                    }
                    match value.read_int() {
                        Some(sides) => Some(sides),
                        None => {
                            self.set_error(VmError::TypeMismatch(format!(
                                "default dice faces must be an integer, got {}",
                                value.type_name()
                            )));
                            None
                        }
                    }
                }
            }
        } else if self.flags.default_dice_side_num > 0 {
            Some(self.flags.default_dice_side_num)
        } else {
            Some(100)
        }
    }

    /// Child context for a sub-evaluation: same flags and callbacks, one
    /// level deeper, op counter seeded with the parent's plus the tax.
    fn sub_context(&self, this: Option<Value>, tax: i64) -> Context {
        let mut child = Context::new();
        child.flags = self.flags.clone();
        child.value_store_name_func = self.value_store_name_func.clone();
        child.value_load_name_func = self.value_load_name_func.clone();
        child.sub_thread_depth = self.sub_thread_depth + 1;
        child.current_this = this;
        child.num_op_count = self.num_op_count + tax;
        child
    }
}

/// Evaluate a computed value in a child context and hand back a clone of
/// its result. The first evaluation compiles and caches the body; errors
/// and the final op count propagate to the parent.
pub fn computed_execute(ctx: &mut Context, value: &Value) -> Option<Value> {
    let cd = match value.read_computed() {
        Some(cd) => cd.clone(),
        None => return None,
    };

    let mut vm = ctx.sub_context(Some(value.clone()), COMPUTED_OP_TAX);
    if vm.sub_thread_depth > MAX_SUB_THREAD_DEPTH {
        ctx.set_error(VmError::DepthExceeded);
        return None;
    }
    trace!(depth = vm.sub_thread_depth, expr = %cd.expr, "computed execute");

    match cd.cached_code() {
        Some(code) => {
            vm.code = code;
            let _ = vm.execute();
        }
        None => match vm.prepare(&cd.expr) {
            Ok(()) => {
                cd.cache_code(vm.code.clone());
                debug!(expr = %cd.expr, "compiled computed body");
                let _ = vm.execute();
            }
            Err(err) => vm.set_error(err),
        },
    }

    if let Some(err) = vm.error.take() {
        ctx.set_error(err);
        return None;
    }
    let ret = vm.stack_top().cloned().unwrap_or(Value::Undefined);
    ctx.num_op_count = vm.num_op_count;
    // The evaluation itself counts as one parent-side operation.
    if !ctx.count_op() {
        return None;
    }
    Some(ret)
}

/// Call a user function: arity-check, bind parameters into the child's
/// scope, then run the (cached) body like a computed value.
pub fn func_invoke(ctx: &mut Context, value: &Value, params: Vec<Value>) -> Option<Value> {
    let fd = match value {
        Value::Function(fd) => fd.clone(),
        _ => return None,
    };
    if fd.params.len() != params.len() {
        ctx.set_error(VmError::ArityMismatch {
            expected: fd.params.len(),
            got: params.len(),
        });
        return None;
    }

    let mut vm = ctx.sub_context(Some(value.clone()), FUNCTION_OP_TAX);
    if vm.sub_thread_depth > MAX_SUB_THREAD_DEPTH {
        ctx.set_error(VmError::DepthExceeded);
        return None;
    }
    for (name, arg) in fd.params.iter().zip(params) {
        vm.attrs.put(name.clone(), arg);
    }
    trace!(depth = vm.sub_thread_depth, name = %fd.name, "function invoke");

    match fd.cached_code() {
        Some(code) => {
            vm.code = code;
            let _ = vm.execute();
        }
        None => match vm.prepare(&fd.expr) {
            Ok(()) => {
                fd.cache_code(vm.code.clone());
                debug!(name = %fd.name, "compiled function body");
                let _ = vm.execute();
            }
            Err(err) => vm.set_error(err),
        },
    }

    if let Some(err) = vm.error.take() {
        ctx.set_error(err);
        return None;
    }
    let ret = vm.stack_top().cloned().unwrap_or(Value::Undefined);
    ctx.num_op_count = vm.num_op_count;
    vm.attrs.clear();
    if !ctx.count_op() {
        return None;
    }
    Some(ret)
}

/// Native functions bypass the interpreter: arity-check, then call the
/// host directly on the current context. A `None` return with no error
/// becomes `Undefined`.
pub fn invoke_native(ctx: &mut Context, value: &Value, params: &[Value]) -> Option<Value> {
    let nd = match value {
        Value::NativeFunction(nd) => nd.clone(),
        _ => return None,
    };
    if nd.params.len() != params.len() {
        ctx.set_error(VmError::ArityMismatch {
            expected: nd.params.len(),
            got: params.len(),
        });
        return None;
    }
    let ret = (nd.func)(ctx, params);
    if ctx.error.is_some() {
        return None;
    }
    Some(ret.unwrap_or(Value::Undefined))
}
