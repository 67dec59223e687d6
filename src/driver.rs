//! Worklist traversal of the control-flow graph.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use log::{debug, trace, warn};

use crate::cfg::{Cfg, Loop};
use crate::context::Context;
use crate::error::Result;
use crate::ir::Method;
use crate::rules::Rule;
use crate::state::SymbolicExecutionState;
use crate::summary::{summarize_loop, LoopSummary};
use crate::types::{LoopId, StmtId};

type State = SymbolicExecutionState;

pub(crate) type StateMap = HashMap<StmtId, Vec<State>>;

/// Read-only environment shared by a driver and all its loop sub-drivers.
#[derive(Clone, Copy)]
pub(crate) struct Env<'a> {
    pub ctx: &'a Context,
    pub method: &'a Method,
    pub cfg: &'a Cfg,
    pub loops: &'a [Loop],
}

impl<'a> Env<'a> {
    pub fn get_loop(&self, id: LoopId) -> &'a Loop {
        &self.loops[id.index()]
    }

    pub fn loop_headed_by(&self, stmt: StmtId) -> Option<LoopId> {
        self.loops
            .iter()
            .position(|l| l.head == stmt)
            .map(LoopId::new)
    }

    pub fn is_loop_exit(&self, stmt: StmtId) -> bool {
        self.loops.iter().any(|l| l.exits.contains(&stmt))
    }

    /// Loop for which `from -> to` is a back edge.
    fn back_edge_of(&self, from: StmtId, to: StmtId) -> Option<LoopId> {
        self.loops
            .iter()
            .position(|l| l.is_back_edge(from, to))
            .map(LoopId::new)
    }
}

/// Worklist driver over one region of the CFG.
///
/// The top-level driver walks the whole method; a loop sub-driver is rooted at
/// the loop head, stays inside the loop body, and collects the states flowing
/// along back edges instead of following them.
pub(crate) struct Driver<'a> {
    env: Env<'a>,
    root: StmtId,
    stop_at: BTreeSet<StmtId>,
    /// Do not delegate the root even though it heads a loop.
    ignore_top_loop: bool,
    summarizing: Option<LoopId>,
    seeds: usize,
    inputs: StateMap,
    outputs: StateMap,
    summaries: BTreeMap<LoopId, LoopSummary>,
}

impl<'a> Driver<'a> {
    pub fn new(env: Env<'a>, root: StmtId, initial: Vec<State>, stop_at: BTreeSet<StmtId>) -> Self {
        let seeds = initial.len();
        Self {
            env,
            root,
            stop_at,
            ignore_top_loop: false,
            summarizing: None,
            seeds,
            inputs: HashMap::from([(root, initial)]),
            outputs: HashMap::new(),
            summaries: BTreeMap::new(),
        }
    }

    /// Sub-driver executing one pass over the body of loop `id`.
    pub fn for_loop(env: Env<'a>, id: LoopId, initial: Vec<State>) -> Self {
        let mut driver = Self::new(env, env.get_loop(id).head, initial, BTreeSet::new());
        driver.ignore_top_loop = true;
        driver.summarizing = Some(id);
        driver
    }

    /// States delivered to the root along back edges during the run.
    pub fn back_edge_states(&self) -> &[State] {
        self.inputs
            .get(&self.root)
            .map_or(&[][..], |states| &states[self.seeds..])
    }

    pub fn into_parts(self) -> (StateMap, StateMap, BTreeMap<LoopId, LoopSummary>) {
        (self.inputs, self.outputs, self.summaries)
    }

    fn in_scope(&self, stmt: StmtId) -> bool {
        match self.summarizing {
            None => true,
            Some(id) => self.env.get_loop(id).contains(stmt),
        }
    }

    fn received(&self, stmt: StmtId) -> usize {
        self.inputs.get(&stmt).map_or(0, Vec::len)
    }

    pub fn run(&mut self) -> Result<()> {
        let env = self.env;
        let mut queue = VecDeque::from([self.root]);
        let mut stop = self.stop_at.clone();
        let mut done: HashSet<StmtId> = HashSet::new();
        let mut postponed = 0usize;

        while let Some(stmt) = queue.pop_front() {
            if stop.contains(&stmt) {
                trace!("{}: stop node, discarded", stmt);
                continue;
            }
            if done.contains(&stmt) {
                warn!("{}: already executed, ignoring late input states", stmt);
                continue;
            }

            let analysed_head = self.ignore_top_loop && stmt == self.root;
            let delegate = env.loop_headed_by(stmt).filter(|_| !analysed_head);
            let required = match delegate {
                _ if analysed_head => 0,
                Some(id) => env.get_loop(id).entry_edges(env.cfg),
                None => env.cfg.preds(stmt).len(),
            };
            let received = self.received(stmt);

            if received < required {
                if postponed <= queue.len() {
                    trace!("{}: {} of {} input states, postponed", stmt, received, required);
                    queue.push_back(stmt);
                    postponed += 1;
                    continue;
                }
                if received == 0 {
                    warn!("{}: worklist stalled on a statement without input states, dropped", stmt);
                    postponed = 0;
                    continue;
                }
                warn!(
                    "{}: worklist stalled, proceeding with {} of {} input states",
                    stmt, received, required
                );
            }
            postponed = 0;
            done.insert(stmt);

            let next = if let Some(id) = delegate {
                self.analyze_loop(id)?
            } else {
                if env.is_loop_exit(stmt) && received > 0 {
                    stop.insert(stmt);
                }
                self.step(stmt)?
            };

            for succ in next {
                if self.in_scope(succ) && !queue.contains(&succ) {
                    queue.push_back(succ);
                }
            }
        }
        Ok(())
    }

    /// Execute one statement; returns the successors that received a state.
    fn step(&mut self, stmt: StmtId) -> Result<Vec<StmtId>> {
        let env = self.env;
        let ir = env.method.stmt(stmt);
        let succs = env.cfg.succs(stmt);

        let outputs: Vec<State> = {
            let inputs = self.inputs.get(&stmt).map_or(&[][..], Vec::as_slice);
            let rule = Rule::select(ir, inputs);
            debug!("{} `{}`: {:?} on {} input states", stmt, ir, rule, inputs.len());
            rule.apply(env.ctx, ir, inputs, succs.len())?
                .iter()
                .map(|s| s.simplify(env.ctx))
                .collect()
        };

        if !succs.is_empty() && outputs.len() != succs.len() {
            panic!(
                "Statement {} `{}` has {} outgoing edges but produced {} states",
                stmt,
                ir,
                succs.len(),
                outputs.len()
            );
        }
        for (i, state) in outputs.iter().enumerate() {
            trace!("{} output {}: {}", stmt, i, state.display(env.ctx));
        }
        self.outputs.insert(stmt, outputs.clone());

        let mut next = Vec::with_capacity(succs.len());
        for (&succ, state) in succs.iter().zip(outputs) {
            if self.deliver(stmt, succ, state) {
                next.push(succ);
            }
        }
        Ok(next)
    }

    /// Append `state` to the inputs of `to`; returns whether `to` should be enqueued.
    ///
    /// States along a back edge are recorded only by the driver summarising that
    /// loop, and never cause the head to be enqueued again.
    fn deliver(&mut self, from: StmtId, to: StmtId, state: State) -> bool {
        match self.env.back_edge_of(from, to) {
            Some(id) if self.summarizing == Some(id) => {
                trace!("{} -> {}: back-edge state recorded", from, to);
                self.inputs.entry(to).or_default().push(state);
                false
            }
            Some(_) => {
                trace!("{} -> {}: back-edge state dropped", from, to);
                false
            }
            None => {
                self.inputs.entry(to).or_default().push(state);
                true
            }
        }
    }

    /// Summarise loop `id` and continue at its exit successors.
    fn analyze_loop(&mut self, id: LoopId) -> Result<Vec<StmtId>> {
        let env = self.env;
        let lp = env.get_loop(id);
        let entry = self.inputs.get(&lp.head).cloned().unwrap_or_default();
        debug!("{}: delegating loop {} with {} entry states", lp.head, id, entry.len());

        let mut result = summarize_loop(env, id, entry)?;
        for &s in lp.body.iter() {
            if s != lp.head {
                if let Some(states) = result.inputs.remove(&s) {
                    self.inputs.insert(s, states);
                }
            }
            if let Some(states) = result.outputs.get(&s) {
                self.outputs.insert(s, states.clone());
            }
        }
        self.summaries.append(&mut result.nested);
        self.summaries.insert(id, result.summary);

        let mut next = Vec::new();
        for &exit in lp.exits.iter() {
            let Some(outputs) = result.outputs.get(&exit) else {
                debug!("{}: loop exit never reached", exit);
                continue;
            };
            for (&succ, state) in env.cfg.succs(exit).iter().zip(outputs) {
                if !lp.contains(succ) && self.deliver(exit, succ, state.clone()) {
                    next.push(succ);
                }
            }
        }
        Ok(next)
    }
}
