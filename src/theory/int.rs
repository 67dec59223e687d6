//! Integer arithmetic with literal folding and neutral elements.
//!
//! Arithmetic is unbounded (`BigInt`); division and remainder truncate toward
//! zero. Division by a literal zero is left unevaluated. Terms are never
//! re-associated, so `(x + 1) + 3` stays as written.

use log::debug;
use num_bigint::BigInt;

use super::{FunctionDecl, Theory};
use crate::context::Context;
use crate::reference::Ref;
use crate::types::Sort;

pub const PLUS: &str = "plus";
pub const MINUS: &str = "minus";
pub const MUL: &str = "mul";
pub const DIV: &str = "div";
pub const REM: &str = "rem";
pub const NEG: &str = "neg";
pub const LT: &str = "lt";
pub const LE: &str = "le";

pub struct IntTheory;

impl Theory for IntTheory {
    fn name(&self) -> &'static str {
        "int"
    }

    fn functions(&self) -> Vec<FunctionDecl> {
        vec![
            FunctionDecl::new(PLUS, 2, Sort::Int),
            FunctionDecl::new(MINUS, 2, Sort::Int),
            FunctionDecl::new(MUL, 2, Sort::Int),
            FunctionDecl::new(DIV, 2, Sort::Int),
            FunctionDecl::new(REM, 2, Sort::Int),
            FunctionDecl::new(NEG, 1, Sort::Int),
            FunctionDecl::new(LT, 2, Sort::Bool),
            FunctionDecl::new(LE, 2, Sort::Bool),
        ]
    }

    fn rewrite(&self, ctx: &Context, func: &str, args: &[Ref]) -> Option<Ref> {
        let values: Vec<Option<BigInt>> = args.iter().map(|&a| ctx.int_value(a)).collect();
        let zero = BigInt::from(0);
        let one = BigInt::from(1);

        match (func, values.as_slice()) {
            (NEG, [Some(a)]) => Some(ctx.mk_int(-a)),
            (NEG, [None]) => ctx.as_app(args[0], NEG).map(|inner| inner[0]),

            (PLUS, [Some(a), Some(b)]) => Some(ctx.mk_int(a + b)),
            (PLUS, [Some(a), None]) if *a == zero => Some(args[1]),
            (PLUS, [None, Some(b)]) if *b == zero => Some(args[0]),

            (MINUS, [Some(a), Some(b)]) => Some(ctx.mk_int(a - b)),
            (MINUS, [None, Some(b)]) if *b == zero => Some(args[0]),
            (MINUS, _) if args[0] == args[1] => Some(ctx.mk_int(0)),

            (MUL, [Some(a), Some(b)]) => Some(ctx.mk_int(a * b)),
            (MUL, [Some(a), None]) | (MUL, [None, Some(a)]) if *a == zero => Some(ctx.mk_int(0)),
            (MUL, [Some(a), None]) if *a == one => Some(args[1]),
            (MUL, [None, Some(b)]) if *b == one => Some(args[0]),

            (DIV, [_, Some(b)]) if *b == zero => {
                debug!("int: division by zero left unevaluated");
                None
            }
            (DIV, [Some(a), Some(b)]) => Some(ctx.mk_int(a / b)),
            (DIV, [None, Some(b)]) if *b == one => Some(args[0]),

            (REM, [_, Some(b)]) if *b == zero => None,
            (REM, [Some(a), Some(b)]) => Some(ctx.mk_int(a % b)),
            (REM, [None, Some(b)]) if *b == one => Some(ctx.mk_int(0)),

            (LT, [Some(a), Some(b)]) => Some(ctx.mk_bool(a < b)),
            (LT, _) if args[0] == args[1] => Some(ctx.ff),
            (LE, [Some(a), Some(b)]) => Some(ctx.mk_bool(a <= b)),
            (LE, _) if args[0] == args[1] => Some(ctx.tt),

            _ => None,
        }
    }

    fn infix(&self, func: &str) -> Option<&'static str> {
        match func {
            PLUS => Some("+"),
            MINUS => Some("-"),
            MUL => Some("*"),
            DIV => Some("/"),
            REM => Some("%"),
            NEG => Some("-"),
            LT => Some("<"),
            LE => Some("<="),
            _ => None,
        }
    }
}

impl Context {
    pub fn plus(&self, a: Ref, b: Ref) -> Ref {
        self.apply(PLUS, vec![a, b])
    }

    pub fn minus(&self, a: Ref, b: Ref) -> Ref {
        self.apply(MINUS, vec![a, b])
    }

    pub fn mul(&self, a: Ref, b: Ref) -> Ref {
        self.apply(MUL, vec![a, b])
    }

    pub fn div(&self, a: Ref, b: Ref) -> Ref {
        self.apply(DIV, vec![a, b])
    }

    pub fn rem(&self, a: Ref, b: Ref) -> Ref {
        self.apply(REM, vec![a, b])
    }

    pub fn neg(&self, a: Ref) -> Ref {
        self.apply(NEG, vec![a])
    }

    pub fn lt(&self, a: Ref, b: Ref) -> Ref {
        self.apply(LT, vec![a, b])
    }

    pub fn le(&self, a: Ref, b: Ref) -> Ref {
        self.apply(LE, vec![a, b])
    }
}
