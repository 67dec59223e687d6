use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use log::debug;

use crate::cfg::{find_loops, Cfg, Loop};
use crate::context::Context;
use crate::driver::{Driver, Env, StateMap};
use crate::error::Result;
use crate::ir::{InvokeKind, Method, Program, Stmt};
use crate::purity::is_pure_method;
use crate::reference::Ref;
use crate::state::SymbolicExecutionState;
use crate::summary::LoopSummary;
use crate::types::{LoopId, Sort, StmtId, SymbolId};

type State = SymbolicExecutionState;

/// Owner theory recorded for function symbols of pure program methods.
pub const PROGRAM_THEORY: &str = "program";

/// Analysis settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bucket bits of the expression table (`2^bits` buckets).
    pub storage_bits: usize,
    /// Statements at which the walk stops; their inputs are still recorded.
    pub stop_at: Vec<StmtId>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_bits: 16,
            stop_at: Vec::new(),
        }
    }
}

/// Symbolic execution of one method.
///
/// Construction registers all symbols; [`Analysis::execute`] walks the method
/// and fills the per-statement input/output state lists and loop summaries.
pub struct Analysis {
    ctx: Context,
    method: Method,
    cfg: Cfg,
    loops: Vec<Loop>,
    config: Config,
    inputs: StateMap,
    outputs: StateMap,
    summaries: BTreeMap<LoopId, LoopSummary>,
    executed: bool,
}

impl Analysis {
    pub fn new(method: Method) -> Result<Self> {
        Self::with_config(method, Config::default())
    }

    pub fn with_config(method: Method, config: Config) -> Result<Self> {
        method.validate()?;
        let ctx = Context::new(config.storage_bits)?;
        register_symbols(&ctx, &method)?;
        let cfg = Cfg::new(&method);
        let loops = find_loops(&cfg);
        debug!(
            "analysis of {}.{}: {} statements, {} loops",
            method.class,
            method.signature(),
            method.len(),
            loops.len()
        );
        Ok(Self {
            ctx,
            method,
            cfg,
            loops,
            config,
            inputs: StateMap::new(),
            outputs: StateMap::new(),
            summaries: BTreeMap::new(),
            executed: false,
        })
    }

    /// Analyse the method `signature` (e.g. `int count(int)`) of `class`.
    pub fn create(program: &Program, class: &str, signature: &str) -> Result<Self> {
        Self::new(program.find(class, signature)?.clone())
    }

    /// Run the symbolic execution. Running it again has no effect.
    pub fn execute(&mut self) -> Result<()> {
        if self.executed {
            debug!("analysis already executed");
            return Ok(());
        }
        let (inputs, outputs, summaries) = {
            let env = Env {
                ctx: &self.ctx,
                method: &self.method,
                cfg: &self.cfg,
                loops: &self.loops,
            };
            let stop_at: BTreeSet<StmtId> = self.config.stop_at.iter().copied().collect();
            let mut driver = Driver::new(env, self.cfg.root(), vec![State::new()], stop_at);
            driver.run()?;
            driver.into_parts()
        };
        self.inputs = inputs;
        self.outputs = outputs;
        self.summaries = summaries;
        self.executed = true;
        debug!("analysis done: {:?}", self.ctx);
        Ok(())
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn input_states(&self, stmt: StmtId) -> &[State] {
        self.inputs.get(&stmt).map_or(&[][..], Vec::as_slice)
    }

    pub fn output_states(&self, stmt: StmtId) -> &[State] {
        self.outputs.get(&stmt).map_or(&[][..], Vec::as_slice)
    }

    /// Output states of every statement without successors, by statement.
    pub fn leaves(&self) -> BTreeMap<StmtId, &[State]> {
        self.cfg
            .tails()
            .iter()
            .map(|&t| (t, self.output_states(t)))
            .collect()
    }

    /// All leaf states, in statement order.
    pub fn leaf_states(&self) -> Vec<&State> {
        self.cfg
            .tails()
            .iter()
            .flat_map(|&t| self.output_states(t))
            .collect()
    }

    pub fn loop_summaries(&self) -> &BTreeMap<LoopId, LoopSummary> {
        &self.summaries
    }

    /// Leaf state of every summarised loop.
    pub fn loop_leaf_states(&self) -> BTreeMap<LoopId, &State> {
        self.summaries.iter().map(|(&id, s)| (id, &s.leaf)).collect()
    }

    /// Summary state of the loop headed by `head`.
    pub fn loop_leaf_state(&self, head: StmtId) -> Option<&State> {
        self.summaries
            .values()
            .find(|s| s.head == head)
            .map(|s| &s.leaf)
    }

    /// Symbol of the local (or parameter) `name`; `heap` and `result` name the
    /// heap and result symbols unless a local shadows them.
    pub fn local(&self, name: &str) -> Result<SymbolId> {
        self.ctx.lookup(name)
    }

    /// Expression standing for the initial value of the symbol `name`.
    pub fn symbol(&self, name: &str) -> Result<Ref> {
        Ok(self.ctx.mk_sym(self.local(name)?))
    }

    pub fn function_symbol(&self, name: &str) -> Result<SymbolId> {
        self.ctx.function(name)
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    pub fn loops(&self) -> &[Loop] {
        &self.loops
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Debug for Analysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analysis")
            .field("method", &self.method.signature())
            .field("statements", &self.method.len())
            .field("loops", &self.loops.len())
            .field("executed", &self.executed)
            .field("context", &self.ctx)
            .finish()
    }
}

/// Register the result, the parameters and locals, and one function symbol per
/// pure method whose result is used.
fn register_symbols(ctx: &Context, method: &Method) -> Result<()> {
    if let Some(ret) = &method.ret {
        ctx.register_result(ret.sort())?;
    }
    for (name, ty) in method.params.iter().chain(method.locals.iter()) {
        ctx.register_local(name, ty.sort())?;
    }
    for stmt in method.body.iter() {
        if let Stmt::Invoke {
            lhs: Some(_),
            kind,
            method: callee,
            args,
        } = stmt
        {
            let signature = callee.signature();
            if !is_pure_method(&signature) || ctx.function(&signature).is_ok() {
                continue;
            }
            let receiver = usize::from(matches!(kind, InvokeKind::Virtual(_)));
            let sort = callee.ret.as_ref().map_or(Sort::Any, |t| t.sort());
            ctx.register_function(PROGRAM_THEORY, &signature, 1 + receiver + args.len(), sort)?;
        }
    }
    Ok(())
}
