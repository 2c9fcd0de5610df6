use std::fmt::{self, Display};

/// Binary operators in dispatch-table order.
///
/// The discriminant doubles as the index into the runtime operator table
/// (`Value` has one entry point per variant), and is what the `BinOp`
/// opcode carries. The order is load-bearing: arithmetic first, then the
/// six comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BinOp {
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    Mod = 4,
    Pow = 5,
    Lt = 6,
    Le = 7,
    Eq = 8,
    Ne = 9,
    Ge = 10,
    Gt = 11,
}

impl BinOp {
    pub const COUNT: usize = 12;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        use BinOp::*;
        const TABLE: [BinOp; BinOp::COUNT] = [Add, Sub, Mul, Div, Mod, Pow, Lt, Le, Eq, Ne, Ge, Gt];
        TABLE.get(index).copied()
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Ge => ">=",
            BinOp::Gt => ">",
        };
        write!(f, "{s}")
    }
}
