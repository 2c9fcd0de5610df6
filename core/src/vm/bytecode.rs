use std::fmt;
use std::rc::Rc;

use crate::val::{ComputedData, FunctionData};

/// One opcode of the linear bytecode the parser emits.
///
/// Literal-carrying opcodes hold `Rc` payloads so cached programs re-push
/// the same handle on every execution; a computed or function literal in a
/// cached body therefore keeps its attribute map and compiled cache across
/// runs of that body.
#[derive(Clone)]
pub enum ByteCode {
    PushInt(i64),
    PushFloat(f64),
    PushStr(Rc<str>),
    PushUndefined,
    PushNull,
    /// Pop n values, push them as one array.
    PushArray(usize),
    PushComputed(Rc<ComputedData>),
    PushFunction(Rc<FunctionData>),
    /// Resolve a name; a Computed result is executed and replaced by its
    /// return value.
    LoadName(Rc<str>),
    /// Resolve a name without executing a Computed result. Emitted for
    /// attribute bases and `&name`.
    LoadNameRaw(Rc<str>),
    /// Store the stack top under a name, leaving the value on the stack.
    StoreName(Rc<str>),
    LoadAttr(Rc<str>),
    StoreAttr(Rc<str>),
    /// obj idx -> obj[idx]
    GetIndex,
    /// obj idx val -> val, assigning obj[idx]
    SetIndex,
    /// obj a b -> obj[a:b]
    GetSlice,
    /// obj a b val -> val, assigning obj[a:b]
    SetSlice,
    CallMethod { name: Rc<str>, argc: usize },
    /// f a1..an -> f(a1..an)
    Call(usize),
    /// Index into the runtime operator table.
    BinOp(u8),
    Neg,
    Pos,
    Pop,
    /// count sides -> sum of `count` rolls of a `sides`-faced die.
    Roll,
    /// count -> sum, with the face count taken from the context flags.
    RollDefault,
    /// count sides keep -> sum of the kept highest/lowest rolls.
    RollKeep { high: bool },
}

impl fmt::Debug for ByteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteCode::PushInt(i) => write!(f, "push.int {i}"),
            ByteCode::PushFloat(x) => write!(f, "push.flt {x}"),
            ByteCode::PushStr(s) => write!(f, "push.str {:?}", s.as_ref()),
            ByteCode::PushUndefined => write!(f, "push.undef"),
            ByteCode::PushNull => write!(f, "push.null"),
            ByteCode::PushArray(n) => write!(f, "push.arr {n}"),
            ByteCode::PushComputed(cd) => write!(f, "push.computed &({})", cd.expr),
            ByteCode::PushFunction(fd) => {
                write!(f, "push.func {}({})", fd.name, fd.params.join(", "))
            }
            ByteCode::LoadName(s) => write!(f, "ld.name {}", s.as_ref()),
            ByteCode::LoadNameRaw(s) => write!(f, "ld.name.raw {}", s.as_ref()),
            ByteCode::StoreName(s) => write!(f, "st.name {}", s.as_ref()),
            ByteCode::LoadAttr(s) => write!(f, "ld.attr {}", s.as_ref()),
            ByteCode::StoreAttr(s) => write!(f, "st.attr {}", s.as_ref()),
            ByteCode::GetIndex => write!(f, "idx.get"),
            ByteCode::SetIndex => write!(f, "idx.set"),
            ByteCode::GetSlice => write!(f, "slice.get"),
            ByteCode::SetSlice => write!(f, "slice.set"),
            ByteCode::CallMethod { name, argc } => {
                write!(f, "call.method {} argc={argc}", name.as_ref())
            }
            ByteCode::Call(argc) => write!(f, "call argc={argc}"),
            ByteCode::BinOp(idx) => match crate::op::BinOp::from_index(*idx as usize) {
                Some(op) => write!(f, "binop {op}"),
                None => write!(f, "binop ?{idx}"),
            },
            ByteCode::Neg => write!(f, "neg"),
            ByteCode::Pos => write!(f, "pos"),
            ByteCode::Pop => write!(f, "pop"),
            ByteCode::Roll => write!(f, "roll"),
            ByteCode::RollDefault => write!(f, "roll.default"),
            ByteCode::RollKeep { high } => {
                write!(f, "roll.keep {}", if *high { "high" } else { "low" })
            }
        }
    }
}

/// Disassembly, one opcode per line, as written to stderr by the
/// `print_bytecode` flag.
pub fn dump(code: &[ByteCode]) -> String {
    let mut out = String::new();
    for (i, op) in code.iter().enumerate() {
        out.push_str(&format!("{i:4}  {op:?}\n"));
    }
    out
}
