use std::collections::BTreeSet;

use test_log::test;

use symex_rs::analysis::Analysis;
use symex_rs::ir::{BinOp, CmpOp, FieldRef, InvokeKind, Method, MethodRef, Operand, Rvalue, Stmt, Type};
use symex_rs::types::StmtId;

fn local(name: &str) -> Operand {
    Operand::local(name)
}

fn add(lhs: &str, a: Operand, b: Operand) -> Stmt {
    Stmt::assign(lhs, Rvalue::Binary(BinOp::Add, a, b))
}

fn executed(method: Method) -> Analysis {
    let mut analysis = Analysis::new(method).unwrap();
    analysis.execute().unwrap();
    analysis
}

/// Two paths through the method, each ending in its own return.
fn two_returns() -> Method {
    Method::builder("Demo", "twoReturns")
        .param("input", Type::Int)
        .local("test", Type::Int)
        .local("result", Type::Int)
        .returns(Type::Int)
        .stmts([
            add("test", local("input"), Operand::Int(1)),
            Stmt::branch(CmpOp::Eq, local("test"), Operand::Int(42), 4),
            add("result", local("test"), Operand::Int(3)),
            Stmt::Return(Some(local("result"))),
            add("test", local("test"), Operand::Int(2)),
            add("test", local("test"), Operand::Int(4)),
            Stmt::Return(Some(local("test"))),
        ])
        .build()
        .unwrap()
}

/// Two paths joining before a single return.
fn diamond() -> Method {
    Method::builder("Demo", "diamond")
        .param("input", Type::Int)
        .local("test", Type::Int)
        .local("result", Type::Int)
        .returns(Type::Int)
        .stmts([
            add("test", local("input"), Operand::Int(1)),
            Stmt::branch(CmpOp::Eq, local("test"), Operand::Int(42), 4),
            add("test", local("test"), Operand::Int(3)),
            Stmt::goto(5),
            add("test", local("test"), Operand::Int(2)),
            add("result", local("test"), Operand::Int(4)),
            Stmt::Return(Some(local("result"))),
        ])
        .build()
        .unwrap()
}

/// `int sum(int n) { int s = 0; for (int i = 0; i < n; i++) s += i; return s; }`
fn counting_loop() -> Method {
    Method::builder("Demo", "sum")
        .param("n", Type::Int)
        .local("i", Type::Int)
        .local("s", Type::Int)
        .returns(Type::Int)
        .stmts([
            Stmt::assign("i", Rvalue::Use(Operand::Int(0))),
            Stmt::assign("s", Rvalue::Use(Operand::Int(0))),
            Stmt::branch(CmpOp::Ge, local("i"), local("n"), 6),
            add("s", local("s"), local("i")),
            add("i", local("i"), Operand::Int(1)),
            Stmt::goto(2),
            Stmt::Return(Some(local("s"))),
        ])
        .build()
        .unwrap()
}

#[test]
fn test_separate_returns() {
    let analysis = executed(two_returns());
    let ctx = analysis.context();
    let input = analysis.symbol("input").unwrap();
    let test = analysis.local("test").unwrap();
    let result = ctx.result().unwrap();

    let ip1 = ctx.plus(input, ctx.mk_int(1));
    let c = ctx.mk_eq(ip1, ctx.mk_int(42));

    let leaves = analysis.leaves();
    assert_eq!(leaves.keys().copied().collect::<Vec<_>>(), vec![StmtId::new(3), StmtId::new(6)]);

    let at3 = &leaves[&StmtId::new(3)];
    assert_eq!(at3.len(), 1);
    assert_eq!(at3[0].constraints.iter().collect::<Vec<_>>(), vec![-c]);
    assert_eq!(at3[0].store.get(test), Some(ip1));
    assert_eq!(at3[0].store.get(result), Some(ctx.plus(ip1, ctx.mk_int(3))));

    let at6 = &leaves[&StmtId::new(6)];
    assert_eq!(at6.len(), 1);
    let value = ctx.plus(ctx.plus(ip1, ctx.mk_int(2)), ctx.mk_int(4));
    assert_eq!(at6[0].constraints.iter().collect::<Vec<_>>(), vec![c]);
    assert_eq!(at6[0].store.get(test), Some(value));
    assert_eq!(at6[0].store.get(result), Some(value));
}

#[test]
fn test_join_builds_value_summary() {
    let analysis = executed(diamond());
    let ctx = analysis.context();
    let input = analysis.symbol("input").unwrap();
    let test = analysis.local("test").unwrap();
    let result = ctx.result().unwrap();

    let ip1 = ctx.plus(input, ctx.mk_int(1));
    let c = ctx.mk_eq(ip1, ctx.mk_int(42));
    let summary = ctx.mk_summary([
        (c, ctx.plus(ip1, ctx.mk_int(2))),
        (-c, ctx.plus(ip1, ctx.mk_int(3))),
    ]);

    let leaves = analysis.leaf_states();
    assert_eq!(leaves.len(), 1);
    assert!(leaves[0].constraints.is_empty());
    assert_eq!(leaves[0].store.get(test), Some(summary));
    assert_eq!(leaves[0].store.get(result), Some(ctx.plus(summary, ctx.mk_int(4))));
    assert_eq!(analysis.input_states(StmtId::new(5)).len(), 2);
}

#[test]
fn test_counting_loop() {
    let analysis = executed(counting_loop());
    let ctx = analysis.context();
    let n = analysis.symbol("n").unwrap();
    let i1 = analysis.symbol("i_1").unwrap();
    let s1 = analysis.symbol("s_1").unwrap();
    let result = ctx.result().unwrap();

    let summaries = analysis.loop_summaries();
    assert_eq!(summaries.len(), 1);
    let summary = summaries.values().next().unwrap();
    assert_eq!(summary.head, StmtId::new(2));
    assert_eq!(summary.passes, 3);
    let modified: BTreeSet<_> = [analysis.local("i").unwrap(), analysis.local("s").unwrap()].into();
    assert_eq!(summary.modified, modified);
    assert_eq!(summary.modifies, ctx.empty_locs());
    assert!(summary.leaf.constraints.is_empty());

    let leaves = analysis.leaf_states();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].constraints.iter().collect::<Vec<_>>(), vec![ctx.le(n, i1)]);
    assert_eq!(leaves[0].store.get(result), Some(s1));

    // Statements inside the loop keep the states of the last pass.
    let body = analysis.output_states(StmtId::new(3));
    assert_eq!(body.len(), 1);
    assert_eq!(body[0].store.get(analysis.local("s").unwrap()), Some(ctx.plus(s1, i1)));
}

#[test]
fn test_do_while_loop() {
    let method = Method::builder("Demo", "count")
        .param("n", Type::Int)
        .local("i", Type::Int)
        .returns(Type::Int)
        .stmts([
            Stmt::assign("i", Rvalue::Use(Operand::Int(0))),
            add("i", local("i"), Operand::Int(1)),
            Stmt::branch(CmpOp::Lt, local("i"), local("n"), 1),
            Stmt::Return(Some(local("i"))),
        ])
        .build()
        .unwrap();
    let analysis = executed(method);
    let ctx = analysis.context();
    let n = analysis.symbol("n").unwrap();
    let i1 = analysis.symbol("i_1").unwrap();
    let next = ctx.plus(i1, ctx.mk_int(1));

    let summary = analysis.loop_leaf_state(StmtId::new(1)).unwrap();
    assert_eq!(summary.store.get(analysis.local("i").unwrap()), Some(i1));

    let leaves = analysis.leaf_states();
    assert_eq!(leaves.len(), 1);
    assert!(leaves[0].constraints.contains(-ctx.lt(next, n)));
    assert_eq!(leaves[0].store.get(ctx.result().unwrap()), Some(next));
}

#[test]
fn test_nested_loops() {
    let method = Method::builder("Demo", "triangle")
        .param("n", Type::Int)
        .local("i", Type::Int)
        .local("j", Type::Int)
        .local("s", Type::Int)
        .returns(Type::Int)
        .stmts([
            Stmt::assign("i", Rvalue::Use(Operand::Int(0))),
            Stmt::branch(CmpOp::Ge, local("i"), local("n"), 9),
            Stmt::assign("j", Rvalue::Use(Operand::Int(0))),
            Stmt::branch(CmpOp::Ge, local("j"), local("i"), 7),
            add("s", local("s"), local("j")),
            add("j", local("j"), Operand::Int(1)),
            Stmt::goto(3),
            add("i", local("i"), Operand::Int(1)),
            Stmt::goto(1),
            Stmt::Return(Some(local("s"))),
        ])
        .build()
        .unwrap();
    let analysis = executed(method);
    assert_eq!(analysis.loops().len(), 2);

    let heads: Vec<StmtId> = analysis.loop_summaries().values().map(|s| s.head).collect();
    assert_eq!(heads.len(), 2);
    assert!(heads.contains(&StmtId::new(1)));
    assert!(heads.contains(&StmtId::new(3)));

    let outer = analysis
        .loop_summaries()
        .values()
        .find(|s| s.head == StmtId::new(1))
        .unwrap();
    for name in ["i", "j", "s"] {
        assert!(outer.modified.contains(&analysis.local(name).unwrap()), "{} not modified", name);
    }
    assert!(!outer.modified.contains(&analysis.local("n").unwrap()));

    assert_eq!(analysis.leaf_states().len(), 1);
    assert!(!analysis.output_states(StmtId::new(4)).is_empty());
}

#[test]
fn test_field_write_then_read() {
    let field = FieldRef::new("Node", "val", Type::Int);
    let method = Method::builder("Node", "roundTrip")
        .param("o", Type::object("Node"))
        .param("x", Type::Int)
        .local("y", Type::Int)
        .returns(Type::Int)
        .stmts([
            Stmt::WriteField {
                base: local("o"),
                field: field.clone(),
                value: local("x"),
            },
            Stmt::ReadField {
                lhs: "y".into(),
                base: local("o"),
                field,
            },
            Stmt::Return(Some(local("y"))),
        ])
        .build()
        .unwrap();
    let analysis = executed(method);
    let ctx = analysis.context();
    let o = analysis.symbol("o").unwrap();
    let x = analysis.symbol("x").unwrap();
    let heap = ctx.heap();

    let leaf = analysis.leaf_states()[0];
    assert_eq!(leaf.store.get(ctx.result().unwrap()), Some(x));
    assert_eq!(
        leaf.store.get(heap),
        Some(ctx.store(ctx.mk_sym(heap), o, ctx.mk_field("Node.val"), x))
    );
}

#[test]
fn test_three_way_join() {
    let method = Method::builder("Demo", "eitherNonNegative")
        .param("a", Type::Int)
        .param("b", Type::Int)
        .local("x", Type::Int)
        .returns(Type::Int)
        .stmts([
            Stmt::assign("x", Rvalue::Use(Operand::Int(0))),
            Stmt::branch(CmpOp::Ge, local("a"), Operand::Int(0), 4),
            Stmt::branch(CmpOp::Ge, local("b"), Operand::Int(0), 4),
            Stmt::assign("x", Rvalue::Use(Operand::Int(1))),
            Stmt::Return(Some(local("x"))),
        ])
        .build()
        .unwrap();
    let analysis = executed(method);
    let ctx = analysis.context();
    let a = ctx.le(ctx.mk_int(0), analysis.symbol("a").unwrap());
    let b = ctx.le(ctx.mk_int(0), analysis.symbol("b").unwrap());

    assert_eq!(analysis.input_states(StmtId::new(4)).len(), 3);
    let leaves = analysis.leaf_states();
    assert_eq!(leaves.len(), 1);
    assert!(leaves[0].constraints.is_empty());
    assert_eq!(
        leaves[0].store.get(ctx.result().unwrap()),
        Some(ctx.mk_summary([
            (ctx.mk_or([a, b]), ctx.mk_int(0)),
            (ctx.mk_and([-a, -b]), ctx.mk_int(1)),
        ]))
    );
}

#[test]
fn test_array_accesses() {
    let method = Method::builder("Demo", "arrays")
        .param("a", Type::array(Type::Int))
        .local("v", Type::Int)
        .local("w", Type::Int)
        .local("length", Type::Int)
        .returns(Type::Int)
        .stmts([
            Stmt::WriteArray {
                array: local("a"),
                index: Operand::Int(0),
                value: Operand::Int(5),
            },
            Stmt::ReadArray {
                lhs: "v".into(),
                array: local("a"),
                index: Operand::Int(0),
            },
            Stmt::ReadArray {
                lhs: "w".into(),
                array: local("a"),
                index: Operand::Int(1),
            },
            Stmt::ArrayLength {
                lhs: "length".into(),
                array: local("a"),
            },
            add("length", local("length"), local("v")),
            Stmt::Return(Some(local("length"))),
        ])
        .build()
        .unwrap();
    let analysis = executed(method);
    let ctx = analysis.context();
    let a = analysis.symbol("a").unwrap();
    let heap = ctx.mk_sym(ctx.heap());

    // The local `length` is not the `length` function of the heap theory.
    let length = analysis.local("length").unwrap();
    assert_ne!(Ok(length), analysis.function_symbol("length"));

    let leaf = analysis.leaf_states()[0];
    let expected = ctx.simplify(ctx.plus(ctx.length(a), ctx.mk_int(5)));
    assert_eq!(leaf.store.get(length), Some(expected));
    assert_eq!(leaf.store.get(ctx.result().unwrap()), Some(expected));
    assert_eq!(
        leaf.store.get(analysis.local("w").unwrap()),
        Some(ctx.select(heap, a, ctx.arr(ctx.mk_int(1))))
    );
    assert_eq!(
        leaf.store.get(ctx.heap()),
        Some(ctx.store(heap, a, ctx.arr(ctx.mk_int(0)), ctx.mk_int(5)))
    );
}

#[test]
fn test_loop_modifies_heap() {
    let method = Method::builder("Node", "fill")
        .param("o", Type::object("Node"))
        .param("n", Type::Int)
        .stmts([
            Stmt::branch(CmpOp::Le, local("n"), Operand::Int(0), 4),
            Stmt::WriteField {
                base: local("o"),
                field: FieldRef::new("Node", "val", Type::Int),
                value: local("n"),
            },
            Stmt::assign("n", Rvalue::Binary(BinOp::Sub, local("n"), Operand::Int(1))),
            Stmt::goto(0),
            Stmt::Return(None),
        ])
        .build()
        .unwrap();
    let analysis = executed(method);
    let ctx = analysis.context();
    let o = analysis.symbol("o").unwrap();

    let summary = analysis.loop_summaries().values().next().unwrap();
    assert!(summary.modified.contains(&ctx.heap()));
    assert_eq!(summary.passes, 2);
    assert_eq!(summary.modifies, ctx.singleton(o, ctx.mk_field("Node.val")));
    assert_eq!(summary.leaf.store.get(ctx.heap()), Some(analysis.symbol("heap_1").unwrap()));
}

#[test]
fn test_pure_call_is_uninterpreted_function() {
    let abs = MethodRef::new("java.lang.Math", "abs", vec![Type::Int], Some(Type::Int));
    let method = Method::builder("Demo", "magnitude")
        .param("x", Type::Int)
        .local("r", Type::Int)
        .returns(Type::Int)
        .stmts([
            Stmt::Invoke {
                lhs: Some("r".into()),
                kind: InvokeKind::Static,
                method: abs.clone(),
                args: vec![local("x")],
            },
            Stmt::Return(Some(local("r"))),
        ])
        .build()
        .unwrap();
    let analysis = executed(method);
    let ctx = analysis.context();
    let f = analysis.function_symbol(&abs.signature()).unwrap();
    let x = analysis.symbol("x").unwrap();

    let leaf = analysis.leaf_states()[0];
    let expected = ctx.mk_app(f, vec![ctx.mk_sym(ctx.heap()), x]);
    assert_eq!(leaf.store.get(ctx.result().unwrap()), Some(expected));
    assert_eq!(leaf.store.get(ctx.heap()), None);
}

#[test]
fn test_impure_call_havocs_heap_and_result() {
    let next = MethodRef::new("Demo", "next", vec![], Some(Type::Int));
    let method = Method::builder("Demo", "pull")
        .local("r", Type::Int)
        .returns(Type::Int)
        .stmts([
            Stmt::Invoke {
                lhs: Some("r".into()),
                kind: InvokeKind::Static,
                method: next,
                args: vec![],
            },
            Stmt::Return(Some(local("r"))),
        ])
        .build()
        .unwrap();
    let analysis = executed(method);
    let ctx = analysis.context();

    let leaf = analysis.leaf_states()[0];
    assert_eq!(leaf.store.get(ctx.heap()), Some(analysis.symbol("heap_1").unwrap()));
    assert_eq!(leaf.store.get(ctx.result().unwrap()), Some(analysis.symbol("r_1").unwrap()));
}

#[test]
fn test_results_are_deterministic() {
    for method in [two_returns, diamond, counting_loop] {
        let a = executed(method());
        let b = executed(method());
        let render = |analysis: &Analysis| -> Vec<String> {
            analysis
                .leaf_states()
                .iter()
                .map(|s| s.display(analysis.context()))
                .collect()
        };
        assert_eq!(render(&a), render(&b));
    }
}

#[test]
fn test_states_are_simplified() {
    for method in [two_returns(), diamond(), counting_loop()] {
        let analysis = executed(method);
        let ctx = analysis.context();
        for i in 0..analysis.method().len() {
            for state in analysis.output_states(StmtId::new(i)) {
                assert_eq!(&state.simplify(ctx), state);
            }
        }
    }
}

#[test]
fn test_one_output_state_per_edge() {
    for method in [two_returns(), diamond(), counting_loop()] {
        let analysis = executed(method);
        let cfg = analysis.cfg();
        for i in 0..cfg.len() {
            let stmt = StmtId::new(i);
            let outputs = analysis.output_states(stmt);
            if !cfg.is_tail(stmt) && !outputs.is_empty() {
                assert_eq!(outputs.len(), cfg.succs(stmt).len(), "statement {}", stmt);
            }
        }
    }
}
