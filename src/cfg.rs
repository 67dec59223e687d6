//! Control-flow graph over statement ids, and natural-loop detection.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::ir::{Method, Stmt};
use crate::types::{LoopId, StmtId};

/// Control-flow graph of a method body.
///
/// Edges are kept as ordered lists: an `if` has successors
/// `[fall-through, jump target]`, and an `if` whose target is the next statement
/// contributes two parallel edges. Predecessor lists count edges, not statements.
#[derive(Debug, Clone)]
pub struct Cfg {
    succs: Vec<Vec<StmtId>>,
    preds: Vec<Vec<StmtId>>,
    tails: Vec<StmtId>,
}

impl Cfg {
    pub fn new(method: &Method) -> Self {
        let n = method.body.len();
        let mut succs = vec![Vec::new(); n];
        let mut preds = vec![Vec::new(); n];
        for (i, stmt) in method.body.iter().enumerate() {
            let id = StmtId::new(i);
            let out = match stmt {
                Stmt::If { target, .. } => vec![id.next(), *target],
                Stmt::Goto(target) => vec![*target],
                Stmt::Return(_) | Stmt::Throw(_) => Vec::new(),
                _ => vec![id.next()],
            };
            for &succ in out.iter() {
                preds[succ.index()].push(id);
            }
            succs[i] = out;
        }
        let tails = (0..n)
            .filter(|&i| succs[i].is_empty())
            .map(StmtId::new)
            .collect();
        Self { succs, preds, tails }
    }

    pub fn len(&self) -> usize {
        self.succs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.succs.is_empty()
    }

    pub fn root(&self) -> StmtId {
        StmtId::new(0)
    }

    pub fn succs(&self, stmt: StmtId) -> &[StmtId] {
        &self.succs[stmt.index()]
    }

    pub fn preds(&self, stmt: StmtId) -> &[StmtId] {
        &self.preds[stmt.index()]
    }

    /// Statements without successors.
    pub fn tails(&self) -> &[StmtId] {
        &self.tails
    }

    pub fn is_tail(&self, stmt: StmtId) -> bool {
        self.succs(stmt).is_empty()
    }

    /// Statements reachable from the root, in reverse postorder.
    pub fn reverse_postorder(&self) -> Vec<StmtId> {
        let mut visited = vec![false; self.len()];
        let mut order = Vec::with_capacity(self.len());
        let mut stack = vec![(self.root(), 0usize)];
        visited[0] = true;
        while let Some((node, next)) = stack.pop() {
            let succs = self.succs(node);
            if next < succs.len() {
                stack.push((node, next + 1));
                let succ = succs[next];
                if !visited[succ.index()] {
                    visited[succ.index()] = true;
                    stack.push((succ, 0));
                }
            } else {
                order.push(node);
            }
        }
        order.reverse();
        order
    }

    /// Immediate dominators of reachable statements; the root maps to itself.
    pub fn immediate_dominators(&self) -> HashMap<StmtId, StmtId> {
        let rpo = self.reverse_postorder();
        let position: HashMap<StmtId, usize> = rpo.iter().enumerate().map(|(i, &s)| (s, i)).collect();
        let mut idom: HashMap<StmtId, StmtId> = HashMap::new();
        idom.insert(self.root(), self.root());

        let intersect = |idom: &HashMap<StmtId, StmtId>, mut a: StmtId, mut b: StmtId| {
            while a != b {
                while position[&a] > position[&b] {
                    a = idom[&a];
                }
                while position[&b] > position[&a] {
                    b = idom[&b];
                }
            }
            a
        };

        let mut changed = true;
        while changed {
            changed = false;
            for &node in rpo.iter().skip(1) {
                let mut new_idom: Option<StmtId> = None;
                for &pred in self.preds(node) {
                    if !idom.contains_key(&pred) {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => intersect(&idom, pred, current),
                    });
                }
                if let Some(new_idom) = new_idom {
                    if idom.get(&node) != Some(&new_idom) {
                        idom.insert(node, new_idom);
                        changed = true;
                    }
                }
            }
        }
        idom
    }
}

/// A natural loop: its head, all statements in its body (head included), and
/// the body statements with a successor outside the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loop {
    pub head: StmtId,
    pub body: BTreeSet<StmtId>,
    pub exits: BTreeSet<StmtId>,
}

impl Loop {
    pub fn contains(&self, stmt: StmtId) -> bool {
        self.body.contains(&stmt)
    }

    /// Whether `from -> to` is a back edge of this loop.
    pub fn is_back_edge(&self, from: StmtId, to: StmtId) -> bool {
        to == self.head && self.contains(from)
    }

    /// Predecessor edges of the head that enter the loop from outside.
    pub fn entry_edges(&self, cfg: &Cfg) -> usize {
        cfg.preds(self.head).iter().filter(|&&p| !self.contains(p)).count()
    }
}

/// Find the natural loops of `cfg`, ordered by head.
///
/// A back edge is an edge whose target dominates its source. Loops sharing a
/// head are merged into one.
pub fn find_loops(cfg: &Cfg) -> Vec<Loop> {
    let idom = cfg.immediate_dominators();
    let dominates = |a: StmtId, mut b: StmtId| -> bool {
        loop {
            if a == b {
                return true;
            }
            match idom.get(&b) {
                Some(&parent) if parent != b => b = parent,
                _ => return false,
            }
        }
    };

    let mut bodies: HashMap<StmtId, BTreeSet<StmtId>> = HashMap::new();
    for (i, succs) in cfg.succs.iter().enumerate() {
        let from = StmtId::new(i);
        if !idom.contains_key(&from) {
            continue;
        }
        for &head in succs.iter() {
            if !dominates(head, from) {
                continue;
            }
            let body = bodies.entry(head).or_insert_with(|| BTreeSet::from([head]));
            let mut work = vec![from];
            while let Some(node) = work.pop() {
                if body.insert(node) {
                    let reachable = cfg.preds(node).iter().filter(|&&p| idom.contains_key(&p));
                    work.extend(reachable.copied());
                }
            }
        }
    }

    let mut loops: Vec<Loop> = bodies
        .into_iter()
        .map(|(head, body)| {
            let exits = body
                .iter()
                .copied()
                .filter(|&s| cfg.succs(s).iter().any(|t| !body.contains(t)))
                .collect();
            Loop { head, body, exits }
        })
        .collect();
    loops.sort_by_key(|l| l.head);
    for (i, l) in loops.iter().enumerate() {
        debug!(
            "loop {}: head {}, {} statements, exits {:?}",
            LoopId::new(i),
            l.head,
            l.body.len(),
            l.exits
        );
    }
    loops
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::ir::{BinOp, CmpOp, Operand, Rvalue, Type};

    fn local(name: &str) -> Operand {
        Operand::local(name)
    }

    /// `while (i < n) { if (i == 3) { j = j + 1 } i = i + 1 } return j`
    fn counting_loop() -> Method {
        Method::builder("Demo", "count")
            .param("n", Type::Int)
            .local("i", Type::Int)
            .local("j", Type::Int)
            .returns(Type::Int)
            .stmts([
                Stmt::assign("i", Rvalue::Use(Operand::Int(0))),
                Stmt::branch(CmpOp::Ge, local("i"), local("n"), 6),
                Stmt::branch(CmpOp::Ne, local("i"), Operand::Int(3), 4),
                Stmt::assign("j", Rvalue::Binary(BinOp::Add, local("j"), Operand::Int(1))),
                Stmt::assign("i", Rvalue::Binary(BinOp::Add, local("i"), Operand::Int(1))),
                Stmt::goto(1),
                Stmt::Return(Some(local("j"))),
            ])
            .build()
            .unwrap()
    }

    #[test]
    fn test_edges() {
        let cfg = Cfg::new(&counting_loop());
        assert_eq!(cfg.succs(StmtId::new(1)), &[StmtId::new(2), StmtId::new(6)]);
        assert_eq!(cfg.preds(StmtId::new(1)), &[StmtId::new(0), StmtId::new(5)]);
        assert_eq!(cfg.preds(StmtId::new(4)), &[StmtId::new(2), StmtId::new(3)]);
        assert_eq!(cfg.tails(), &[StmtId::new(6)]);
    }

    #[test]
    fn test_parallel_edges_counted() {
        let m = Method::builder("Demo", "f")
            .param("x", Type::Int)
            .stmt(Stmt::branch(CmpOp::Eq, local("x"), Operand::Int(0), 1))
            .stmt(Stmt::Return(None))
            .build()
            .unwrap();
        let cfg = Cfg::new(&m);
        assert_eq!(cfg.succs(StmtId::new(0)).len(), 2);
        assert_eq!(cfg.preds(StmtId::new(1)).len(), 2);
    }

    #[test]
    fn test_dominators() {
        let cfg = Cfg::new(&counting_loop());
        let idom = cfg.immediate_dominators();
        assert_eq!(idom[&StmtId::new(4)], StmtId::new(2));
        assert_eq!(idom[&StmtId::new(6)], StmtId::new(1));
        assert_eq!(idom[&StmtId::new(1)], StmtId::new(0));
    }

    #[test]
    fn test_single_loop() {
        let cfg = Cfg::new(&counting_loop());
        let loops = find_loops(&cfg);
        assert_eq!(loops.len(), 1);
        let l = &loops[0];
        assert_eq!(l.head, StmtId::new(1));
        assert_eq!(l.body, (1..=5).map(StmtId::new).collect());
        assert_eq!(l.exits, BTreeSet::from([StmtId::new(1)]));
        assert!(l.is_back_edge(StmtId::new(5), StmtId::new(1)));
        assert!(!l.is_back_edge(StmtId::new(0), StmtId::new(1)));
        assert_eq!(l.entry_edges(&cfg), 1);
    }

    #[test]
    fn test_nested_loops() {
        // for i { for j { } }
        let m = Method::builder("Demo", "nested")
            .param("n", Type::Int)
            .local("i", Type::Int)
            .local("j", Type::Int)
            .stmts([
                Stmt::assign("i", Rvalue::Use(Operand::Int(0))),
                Stmt::branch(CmpOp::Ge, local("i"), local("n"), 8),
                Stmt::assign("j", Rvalue::Use(Operand::Int(0))),
                Stmt::branch(CmpOp::Ge, local("j"), local("n"), 6),
                Stmt::assign("j", Rvalue::Binary(BinOp::Add, local("j"), Operand::Int(1))),
                Stmt::goto(3),
                Stmt::assign("i", Rvalue::Binary(BinOp::Add, local("i"), Operand::Int(1))),
                Stmt::goto(1),
                Stmt::Return(None),
            ])
            .build()
            .unwrap();
        let cfg = Cfg::new(&m);
        let loops = find_loops(&cfg);
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[0].head, StmtId::new(1));
        assert_eq!(loops[1].head, StmtId::new(3));
        assert!(loops[1].body.is_subset(&loops[0].body));
        assert_eq!(loops[1].body, (3..=5).map(StmtId::new).collect());
        assert_eq!(loops[1].exits, BTreeSet::from([StmtId::new(3)]));
    }

    #[test]
    fn test_unreachable_code_has_no_loops() {
        let m = Method::builder("Demo", "dead")
            .stmts([Stmt::Return(None), Stmt::goto(1)])
            .build()
            .unwrap();
        let cfg = Cfg::new(&m);
        assert!(find_loops(&cfg).is_empty());
        assert_eq!(cfg.reverse_postorder(), vec![StmtId::new(0)]);
    }

    #[test]
    fn test_loop_body_excludes_unreachable_predecessors() {
        let m = Method::builder("Demo", "deadJump")
            .param("n", Type::Int)
            .local("i", Type::Int)
            .returns(Type::Int)
            .stmts([
                Stmt::assign("i", Rvalue::Use(Operand::Int(0))),
                Stmt::branch(CmpOp::Ge, local("i"), local("n"), 5),
                Stmt::assign("i", Rvalue::Binary(BinOp::Add, local("i"), Operand::Int(1))),
                Stmt::goto(1),
                Stmt::goto(2),
                Stmt::Return(Some(local("i"))),
            ])
            .build()
            .unwrap();
        let cfg = Cfg::new(&m);
        let loops = find_loops(&cfg);
        assert_eq!(loops.len(), 1);
        let body: Vec<usize> = loops[0].body.iter().map(|s| s.index()).collect();
        assert_eq!(body, vec![1, 2, 3]);
        assert!(!loops[0].contains(StmtId::new(4)));
        assert_eq!(loops[0].entry_edges(&cfg), 1);
    }
}
