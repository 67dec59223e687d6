//! Symbolic semantics of statements.
//!
//! Every statement shape is handled by exactly one [`Rule`]. A rule merges its
//! incoming states, simulates the statement on the merged state and yields one
//! state per outgoing edge (a single state for statements without successors).

use log::{debug, warn};

use crate::context::Context;
use crate::error::Result;
use crate::ir::{BinOp, CmpOp, Condition, InvokeKind, Operand, Rvalue, Stmt};
use crate::purity::is_pure_method;
use crate::reference::Ref;
use crate::state::{merge, SymbolicExecutionState};

type State = SymbolicExecutionState;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Rule {
    Assignment,
    FieldRead,
    FieldWrite,
    ArrayRead,
    ArrayWrite,
    ArrayLength,
    /// Static call of a pure method whose result is used.
    PureStaticInvoke,
    /// Virtual call of a pure method whose result is used.
    PureVirtualInvoke,
    /// Call of any other method; the heap is havocked.
    ImpureInvoke,
    ReturnValue,
    ReturnVoid,
    Branch,
    /// Statements without effect: `goto`, `nop`, discarded pure calls.
    Dummy,
    /// Statements the analysis does not model; treated as no-ops.
    IgnoreAndWarn,
}

impl Rule {
    pub const ALL: [Rule; 14] = [
        Rule::Assignment,
        Rule::FieldRead,
        Rule::FieldWrite,
        Rule::ArrayRead,
        Rule::ArrayWrite,
        Rule::ArrayLength,
        Rule::PureStaticInvoke,
        Rule::PureVirtualInvoke,
        Rule::ImpureInvoke,
        Rule::ReturnValue,
        Rule::ReturnVoid,
        Rule::Branch,
        Rule::Dummy,
        Rule::IgnoreAndWarn,
    ];

    pub fn accepts(&self, stmt: &Stmt, inputs: &[State]) -> bool {
        if inputs.is_empty() {
            return false;
        }
        match self {
            Rule::Assignment => matches!(stmt, Stmt::Assign { .. }),
            Rule::FieldRead => matches!(stmt, Stmt::ReadField { .. }),
            Rule::FieldWrite => matches!(stmt, Stmt::WriteField { .. }),
            Rule::ArrayRead => matches!(stmt, Stmt::ReadArray { .. }),
            Rule::ArrayWrite => matches!(stmt, Stmt::WriteArray { .. }),
            Rule::ArrayLength => matches!(stmt, Stmt::ArrayLength { .. }),
            Rule::PureStaticInvoke => matches!(
                stmt,
                Stmt::Invoke { lhs: Some(_), kind: InvokeKind::Static, method, .. }
                    if is_pure_method(&method.signature())
            ),
            Rule::PureVirtualInvoke => matches!(
                stmt,
                Stmt::Invoke { lhs: Some(_), kind: InvokeKind::Virtual(_), method, .. }
                    if is_pure_method(&method.signature())
            ),
            Rule::ImpureInvoke => matches!(
                stmt,
                Stmt::Invoke { method, .. } if !is_pure_method(&method.signature())
            ),
            Rule::ReturnValue => matches!(stmt, Stmt::Return(Some(_))),
            Rule::ReturnVoid => matches!(stmt, Stmt::Return(None)),
            Rule::Branch => matches!(stmt, Stmt::If { .. }),
            Rule::Dummy => match stmt {
                Stmt::Goto(_) | Stmt::Nop => true,
                Stmt::Invoke { lhs: None, method, .. } => is_pure_method(&method.signature()),
                _ => false,
            },
            Rule::IgnoreAndWarn => matches!(stmt, Stmt::Throw(_) | Stmt::Other(_)),
        }
    }

    /// The unique rule accepting `stmt` with `inputs`.
    ///
    /// # Panics
    ///
    /// Panics if no rule or more than one rule accepts.
    pub fn select(stmt: &Stmt, inputs: &[State]) -> Rule {
        let accepting: Vec<Rule> = Rule::ALL
            .iter()
            .copied()
            .filter(|r| r.accepts(stmt, inputs))
            .collect();
        match accepting.as_slice() {
            [rule] => *rule,
            [] => panic!(
                "No rule accepts `{}` with {} input states",
                stmt,
                inputs.len()
            ),
            rules => panic!("Rules {:?} all accept `{}`", rules, stmt),
        }
    }

    /// Apply the rule to `stmt`, producing one state per outgoing edge.
    pub fn apply(
        &self,
        ctx: &Context,
        stmt: &Stmt,
        inputs: &[State],
        edges: usize,
    ) -> Result<Vec<State>> {
        let state = merge(ctx, inputs);
        let heap = ctx.heap();

        let outputs = match (self, stmt) {
            (Rule::Assignment, Stmt::Assign { lhs, rhs }) => {
                let value = rvalue(ctx, &state, rhs)?;
                replicate(state.assign(ctx.lookup(lhs)?, value), edges)
            }
            (Rule::FieldRead, Stmt::ReadField { lhs, base, field }) => {
                let h = state.value_of(ctx, heap);
                let obj = operand(ctx, &state, base)?;
                let value = ctx.select(h, obj, ctx.mk_field(&field.id()));
                replicate(state.assign(ctx.lookup(lhs)?, value), edges)
            }
            (Rule::FieldWrite, Stmt::WriteField { base, field, value }) => {
                let h = state.value_of(ctx, heap);
                let obj = operand(ctx, &state, base)?;
                let value = operand(ctx, &state, value)?;
                let h = ctx.store(h, obj, ctx.mk_field(&field.id()), value);
                replicate(state.assign(heap, h), edges)
            }
            (Rule::ArrayRead, Stmt::ReadArray { lhs, array, index }) => {
                let h = state.value_of(ctx, heap);
                let arr = operand(ctx, &state, array)?;
                let idx = operand(ctx, &state, index)?;
                let value = ctx.select(h, arr, ctx.arr(idx));
                replicate(state.assign(ctx.lookup(lhs)?, value), edges)
            }
            (Rule::ArrayWrite, Stmt::WriteArray { array, index, value }) => {
                let h = state.value_of(ctx, heap);
                let arr = operand(ctx, &state, array)?;
                let idx = operand(ctx, &state, index)?;
                let value = operand(ctx, &state, value)?;
                let h = ctx.store(h, arr, ctx.arr(idx), value);
                replicate(state.assign(heap, h), edges)
            }
            (Rule::ArrayLength, Stmt::ArrayLength { lhs, array }) => {
                let arr = operand(ctx, &state, array)?;
                replicate(state.assign(ctx.lookup(lhs)?, ctx.length(arr)), edges)
            }
            (
                Rule::PureStaticInvoke | Rule::PureVirtualInvoke,
                Stmt::Invoke {
                    lhs: Some(lhs),
                    kind,
                    method,
                    args,
                },
            ) => {
                let f = ctx.function(&method.signature())?;
                let mut call_args = vec![state.value_of(ctx, heap)];
                if let InvokeKind::Virtual(receiver) = kind {
                    call_args.push(operand(ctx, &state, receiver)?);
                }
                for arg in args {
                    call_args.push(operand(ctx, &state, arg)?);
                }
                let value = ctx.mk_app(f, call_args);
                replicate(state.assign(ctx.lookup(lhs)?, value), edges)
            }
            (Rule::ImpureInvoke, Stmt::Invoke { lhs, method, .. }) => {
                debug!("havoc heap after call to {}", method.signature());
                let fresh_heap = ctx.fresh(crate::symbols::HEAP_NAME, ctx.symbol_sort(heap));
                let mut next = state.assign(heap, ctx.mk_sym(fresh_heap));
                if let Some(lhs) = lhs {
                    let target = ctx.lookup(lhs)?;
                    let fresh = ctx.fresh(lhs, ctx.symbol_sort(target));
                    next = next.assign(target, ctx.mk_sym(fresh));
                }
                replicate(next, edges)
            }
            (Rule::ReturnValue, Stmt::Return(Some(value))) => {
                let value = operand(ctx, &state, value)?;
                match ctx.result() {
                    Some(result) => vec![state.assign(result, value)],
                    None => vec![state],
                }
            }
            (Rule::ReturnVoid, Stmt::Return(None)) => vec![state],
            (Rule::Branch, Stmt::If { cond, .. }) => {
                let guard = condition(ctx, &state, cond)?;
                vec![state.constrain_negated(guard), state.constrain(guard)]
            }
            (Rule::Dummy, _) => replicate(state, edges),
            (Rule::IgnoreAndWarn, _) => {
                warn!("ignoring unsupported statement `{}`", stmt);
                replicate(state, edges)
            }
            (rule, stmt) => panic!("Rule {:?} applied to `{}`", rule, stmt),
        };
        Ok(outputs)
    }
}

fn replicate(state: State, edges: usize) -> Vec<State> {
    vec![state; edges.max(1)]
}

fn operand(ctx: &Context, state: &State, op: &Operand) -> Result<Ref> {
    Ok(match op {
        Operand::Local(name) => state.value_of(ctx, ctx.lookup(name)?),
        Operand::Int(n) => ctx.mk_int(*n),
        Operand::Bool(b) => ctx.mk_bool(*b),
        Operand::Null => ctx.mk_null(),
    })
}

fn rvalue(ctx: &Context, state: &State, rv: &Rvalue) -> Result<Ref> {
    Ok(match rv {
        Rvalue::Use(a) => operand(ctx, state, a)?,
        Rvalue::Neg(a) => ctx.neg(operand(ctx, state, a)?),
        Rvalue::Binary(op, a, b) => {
            let (a, b) = (operand(ctx, state, a)?, operand(ctx, state, b)?);
            match op {
                BinOp::Add => ctx.plus(a, b),
                BinOp::Sub => ctx.minus(a, b),
                BinOp::Mul => ctx.mul(a, b),
                BinOp::Div => ctx.div(a, b),
                BinOp::Rem => ctx.rem(a, b),
            }
        }
        Rvalue::Compare(op, a, b) => {
            let (a, b) = (operand(ctx, state, a)?, operand(ctx, state, b)?);
            compare(ctx, *op, a, b)
        }
    })
}

fn condition(ctx: &Context, state: &State, cond: &Condition) -> Result<Ref> {
    let a = operand(ctx, state, &cond.lhs)?;
    let b = operand(ctx, state, &cond.rhs)?;
    Ok(compare(ctx, cond.op, a, b))
}

fn compare(ctx: &Context, op: CmpOp, a: Ref, b: Ref) -> Ref {
    match op {
        CmpOp::Eq => ctx.mk_eq(a, b),
        CmpOp::Ne => -ctx.mk_eq(a, b),
        CmpOp::Lt => ctx.lt(a, b),
        CmpOp::Le => ctx.le(a, b),
        CmpOp::Gt => ctx.lt(b, a),
        CmpOp::Ge => ctx.le(b, a),
    }
}
