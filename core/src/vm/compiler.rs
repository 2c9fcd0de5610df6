//! Lowers the expression tree to the linear opcode sequence.

use std::rc::Rc;

use crate::ast::{AssignTarget, Expr};
use crate::val::Value;
use crate::vm::ByteCode;

pub struct Compiler {
    code: Vec<ByteCode>,
}

impl Compiler {
    pub fn new() -> Self {
        Self { code: Vec::new() }
    }

    pub fn compile(mut self, expr: &Expr) -> Rc<[ByteCode]> {
        self.emit_expr(expr);
        Rc::from(self.code)
    }

    fn emit(&mut self, op: ByteCode) {
        self.code.push(op);
    }

    fn emit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Int(i) => self.emit(ByteCode::PushInt(*i)),
            Expr::Float(f) => self.emit(ByteCode::PushFloat(*f)),
            Expr::Str(s) => self.emit(ByteCode::PushStr(Rc::from(s.as_str()))),
            Expr::Undefined => self.emit(ByteCode::PushUndefined),
            Expr::Null => self.emit(ByteCode::PushNull),
            Expr::Ident(name) => self.emit(ByteCode::LoadName(Rc::from(name.as_str()))),
            Expr::RawRef(name) => self.emit(ByteCode::LoadNameRaw(Rc::from(name.as_str()))),
            Expr::Array(items) => {
                for item in items {
                    self.emit_expr(item);
                }
                self.emit(ByteCode::PushArray(items.len()));
            }
            Expr::Computed(src) => {
                // The literal's value handle is baked into the opcode, so
                // re-running this program shares attributes and the
                // compiled-body cache.
                match Value::computed(src.clone()) {
                    Value::Computed(cd) => self.emit(ByteCode::PushComputed(cd)),
                    _ => unreachable!(),
                }
            }
            Expr::Function { expr, name, params } => {
                match Value::function(expr.clone(), name.clone(), params.clone()) {
                    Value::Function(fd) => self.emit(ByteCode::PushFunction(fd)),
                    _ => unreachable!(),
                }
            }
            Expr::Bin(l, op, r) => {
                self.emit_expr(l);
                self.emit_expr(r);
                self.emit(ByteCode::BinOp(op.index() as u8));
            }
            Expr::Neg(inner) => {
                self.emit_expr(inner);
                self.emit(ByteCode::Neg);
            }
            Expr::Pos(inner) => {
                self.emit_expr(inner);
                self.emit(ByteCode::Pos);
            }
            Expr::Index(base, index) => {
                self.emit_base(base);
                self.emit_expr(index);
                self.emit(ByteCode::GetIndex);
            }
            Expr::Slice(base, a, b) => {
                self.emit_base(base);
                self.emit_opt(a.as_deref());
                self.emit_opt(b.as_deref());
                self.emit(ByteCode::GetSlice);
            }
            Expr::Attr(base, name) => {
                self.emit_base(base);
                self.emit(ByteCode::LoadAttr(Rc::from(name.as_str())));
            }
            Expr::MethodCall(base, name, args) => {
                self.emit_base(base);
                for arg in args {
                    self.emit_expr(arg);
                }
                self.emit(ByteCode::CallMethod {
                    name: Rc::from(name.as_str()),
                    argc: args.len(),
                });
            }
            Expr::Call(f, args) => {
                self.emit_expr(f);
                for arg in args {
                    self.emit_expr(arg);
                }
                self.emit(ByteCode::Call(args.len()));
            }
            Expr::Roll { count, sides, keep } => {
                match count {
                    Some(count) => self.emit_expr(count),
                    None => self.emit(ByteCode::PushInt(1)),
                }
                match sides {
                    Some(sides) => {
                        self.emit_expr(sides);
                        match keep {
                            Some((high, keep)) => {
                                self.emit_expr(keep);
                                self.emit(ByteCode::RollKeep { high: *high });
                            }
                            None => self.emit(ByteCode::Roll),
                        }
                    }
                    None => self.emit(ByteCode::RollDefault),
                }
            }
            Expr::Assign(target, rhs) => match target {
                AssignTarget::Name(name) => {
                    self.emit_expr(rhs);
                    self.emit(ByteCode::StoreName(Rc::from(name.as_str())));
                }
                AssignTarget::Attr(base, name) => {
                    self.emit_base(base);
                    self.emit_expr(rhs);
                    self.emit(ByteCode::StoreAttr(Rc::from(name.as_str())));
                }
                AssignTarget::Index(base, index) => {
                    self.emit_base(base);
                    self.emit_expr(index);
                    self.emit_expr(rhs);
                    self.emit(ByteCode::SetIndex);
                }
                AssignTarget::Slice(base, a, b) => {
                    self.emit_base(base);
                    self.emit_opt(a.as_deref());
                    self.emit_opt(b.as_deref());
                    self.emit_expr(rhs);
                    self.emit(ByteCode::SetSlice);
                }
            },
            Expr::Seq(stmts) => {
                for (i, stmt) in stmts.iter().enumerate() {
                    self.emit_expr(stmt);
                    if i != stmts.len() - 1 {
                        self.emit(ByteCode::Pop);
                    }
                }
            }
        }
    }

    /// Attribute/index bases load names raw so a computed value can be
    /// addressed without being executed.
    fn emit_base(&mut self, base: &Expr) {
        match base {
            Expr::Ident(name) => self.emit(ByteCode::LoadNameRaw(Rc::from(name.as_str()))),
            _ => self.emit_expr(base),
        }
    }

    fn emit_opt(&mut self, expr: Option<&Expr>) {
        match expr {
            Some(expr) => self.emit_expr(expr),
            None => self.emit(ByteCode::PushUndefined),
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
