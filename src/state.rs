use std::collections::BTreeSet;

use log::debug;

use crate::constraint::ConstraintSet;
use crate::context::Context;
use crate::reference::Ref;
use crate::store::Store;
use crate::types::SymbolId;

/// A symbolic execution state: path condition plus symbolic store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolicExecutionState {
    pub constraints: ConstraintSet,
    pub store: Store,
}

impl SymbolicExecutionState {
    /// The initial state: no constraints, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(constraints: ConstraintSet, store: Store) -> Self {
        Self { constraints, store }
    }

    pub fn value_of(&self, ctx: &Context, sym: SymbolId) -> Ref {
        self.store.value_of(ctx, sym)
    }

    pub fn assign(&self, sym: SymbolId, value: Ref) -> Self {
        Self {
            constraints: self.constraints.clone(),
            store: self.store.assign(sym, value),
        }
    }

    pub fn constrain(&self, constraint: Ref) -> Self {
        Self {
            constraints: self.constraints.add(constraint),
            store: self.store.clone(),
        }
    }

    pub fn constrain_negated(&self, constraint: Ref) -> Self {
        Self {
            constraints: self.constraints.add_negated(constraint),
            store: self.store.clone(),
        }
    }

    /// Simplify constraints and store values, dropping bindings `x := x`.
    ///
    /// The store of the result is in canonical form, so simplified states can be
    /// compared structurally.
    pub fn simplify(&self, ctx: &Context) -> Self {
        let constraints = self.constraints.simplify(ctx);
        let bindings = self
            .store
            .flatten()
            .into_iter()
            .map(|(sym, value)| (sym, ctx.simplify(value)))
            .filter(|&(sym, value)| ctx.as_sym(value) != Some(sym));
        Self {
            constraints,
            store: Store::from_bindings(bindings),
        }
    }

    pub fn display(&self, ctx: &Context) -> String {
        format!("{} {}", self.constraints.display(ctx), self.store.display(ctx))
    }
}

/// Merge several states reaching the same statement into one.
///
/// Constraints shared by all states are kept as they are. The remaining
/// constraints of each state form its guard; the disjunction of the guards is
/// added unless it is trivially true. Every symbol whose value differs between
/// the states is bound to a value summary over the guards.
pub fn merge(ctx: &Context, states: &[SymbolicExecutionState]) -> SymbolicExecutionState {
    assert!(!states.is_empty(), "Cannot merge zero states");
    if states.len() == 1 {
        return states[0].clone();
    }

    let common = states[1..]
        .iter()
        .fold(states[0].constraints.clone(), |acc, s| acc.intersection(&s.constraints));
    let guards: Vec<Ref> = states
        .iter()
        .map(|s| s.constraints.difference(&common).as_formula(ctx))
        .collect();
    let disjunction = ctx.simplify(ctx.mk_or(guards.iter().copied()));
    let constraints = if disjunction == ctx.tt {
        common
    } else {
        common.add(disjunction)
    };

    let flat: Vec<_> = states.iter().map(|s| s.store.flatten()).collect();
    let symbols: BTreeSet<SymbolId> = flat.iter().flat_map(|b| b.keys().copied()).collect();
    let mut bindings = Vec::with_capacity(symbols.len());
    for sym in symbols {
        let values: Vec<Ref> = flat
            .iter()
            .map(|b| b.get(&sym).copied().unwrap_or_else(|| ctx.mk_sym(sym)))
            .collect();
        let value = if values.iter().all(|&v| v == values[0]) {
            values[0]
        } else {
            ctx.mk_summary(guards.iter().copied().zip(values))
        };
        bindings.push((sym, value));
    }

    debug!(
        "merge: {} states, {} common constraints, guard {}",
        states.len(),
        constraints.len(),
        ctx.display(disjunction)
    );
    SymbolicExecutionState::with(constraints, Store::from_bindings(bindings))
}
