//! Loop summarisation.
//!
//! A loop is executed once, symbolically, from its entry states. Symbols whose
//! value on a back edge differs from their value at entry are *modified*: they
//! are replaced by fresh symbols (anonymised) and the pass is repeated until the
//! set of modified symbols no longer grows. The states of the last pass stand
//! for an arbitrary iteration; their exit states continue the walk after the loop.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::constraint::ConstraintSet;
use crate::context::Context;
use crate::driver::{Driver, Env, StateMap};
use crate::error::Result;
use crate::node::Node;
use crate::reference::Ref;
use crate::state::{merge, SymbolicExecutionState};
use crate::store::Store;
use crate::theory::heap::STORE;
use crate::types::{LoopId, StmtId, SymbolId};

type State = SymbolicExecutionState;

/// Abstraction of all iterations of one loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSummary {
    pub head: StmtId,
    /// State at the head of an arbitrary iteration: the entry store with every
    /// modified symbol bound to a fresh symbol, and no constraints.
    pub leaf: State,
    /// Symbols whose value may change across iterations.
    pub modified: BTreeSet<SymbolId>,
    /// Location set over-approximating the heap locations written by the loop.
    pub modifies: Ref,
    /// Number of passes over the body until the modified set was stable.
    pub passes: usize,
}

/// Everything a parent driver takes over from a loop analysis.
pub(crate) struct LoopAnalysis {
    pub inputs: StateMap,
    pub outputs: StateMap,
    pub nested: BTreeMap<LoopId, LoopSummary>,
    pub summary: LoopSummary,
}

pub(crate) fn summarize_loop(env: Env<'_>, id: LoopId, entry: Vec<State>) -> Result<LoopAnalysis> {
    let ctx = env.ctx;
    let head = env.get_loop(id).head;
    let entry_state = merge(ctx, &entry).simplify(ctx);

    let mut modified: BTreeSet<SymbolId> = BTreeSet::new();
    let mut fresh: BTreeMap<SymbolId, SymbolId> = BTreeMap::new();
    let mut passes = 0;

    loop {
        passes += 1;
        let seeds: Vec<State> = entry
            .iter()
            .map(|s| anonymize(ctx, s, &modified, &mut fresh))
            .collect();
        let seed_store = merge(ctx, &seeds).simplify(ctx).store;

        let mut driver = Driver::for_loop(env, id, seeds);
        driver.run()?;

        let changed = changed_symbols(ctx, &seed_store, driver.back_edge_states());
        let grown: Vec<SymbolId> = changed.difference(&modified).copied().collect();
        debug!(
            "loop {} pass {}: {} back-edge states, newly modified {:?}",
            id,
            passes,
            driver.back_edge_states().len(),
            grown.iter().map(|&s| ctx.symbol_name(s)).collect::<Vec<_>>()
        );
        if !grown.is_empty() {
            modified.extend(grown);
            continue;
        }

        let modifies = if modified.contains(&ctx.heap()) {
            written_locations(ctx, &seed_store, driver.back_edge_states())
        } else {
            ctx.empty_locs()
        };
        let leaf = anonymize(
            ctx,
            &State::with(ConstraintSet::new(), entry_state.store.clone()),
            &modified,
            &mut fresh,
        )
        .simplify(ctx);
        debug!("loop {} summary: {}", id, leaf.display(ctx));

        let (inputs, outputs, nested) = driver.into_parts();
        return Ok(LoopAnalysis {
            inputs,
            outputs,
            nested,
            summary: LoopSummary {
                head,
                leaf,
                modified,
                modifies,
                passes,
            },
        });
    }
}

/// Bind every modified symbol to its fresh symbol, keeping the constraints.
fn anonymize(
    ctx: &Context,
    state: &State,
    modified: &BTreeSet<SymbolId>,
    fresh: &mut BTreeMap<SymbolId, SymbolId>,
) -> State {
    if modified.is_empty() {
        return state.clone();
    }
    let mut bindings = state.store.flatten();
    for &sym in modified.iter() {
        let anon = *fresh
            .entry(sym)
            .or_insert_with(|| ctx.fresh(&ctx.symbol_name(sym), ctx.symbol_sort(sym)));
        bindings.insert(sym, ctx.mk_sym(anon));
    }
    State::with(state.constraints.clone(), Store::from_bindings(bindings))
}

/// Symbols whose value in some back-edge state differs from the seed store.
fn changed_symbols(ctx: &Context, seed: &Store, back: &[State]) -> BTreeSet<SymbolId> {
    let before = seed.flatten();
    let mut changed = BTreeSet::new();
    for state in back {
        let after = state.store.flatten();
        for &sym in before.keys().chain(after.keys()) {
            let old = before.get(&sym).copied().unwrap_or_else(|| ctx.mk_sym(sym));
            let new = after.get(&sym).copied().unwrap_or_else(|| ctx.mk_sym(sym));
            if old != new {
                changed.insert(sym);
            }
        }
    }
    changed
}

/// Locations written between the seed heap and the back-edge heaps, or
/// `allLocs` if some heap is not a chain of writes over the seed heap.
fn written_locations(ctx: &Context, seed: &Store, back: &[State]) -> Ref {
    let heap = ctx.heap();
    let base = seed.value_of(ctx, heap);
    let mut locations = Vec::new();
    for state in back {
        if !collect_writes(ctx, state.value_of(ctx, heap), base, &mut locations) {
            return ctx.all_locs();
        }
    }
    locations.sort();
    locations.dedup();
    let set = locations
        .into_iter()
        .fold(ctx.empty_locs(), |acc, (obj, field)| ctx.union(acc, ctx.singleton(obj, field)));
    ctx.simplify(set)
}

fn collect_writes(ctx: &Context, heap: Ref, base: Ref, out: &mut Vec<(Ref, Ref)>) -> bool {
    if heap == base {
        return true;
    }
    if let Some(args) = ctx.as_app(heap, STORE) {
        out.push((args[1], args[2]));
        return collect_writes(ctx, args[0], base, out);
    }
    match ctx.node(heap) {
        Node::Summary(branches) if !heap.is_negated() => branches
            .iter()
            .all(|&(_, value)| collect_writes(ctx, value, base, out)),
        _ => false,
    }
}
