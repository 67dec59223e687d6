//! Heap theory: the heap is a value, updated with `store` and read with `select`.
//!
//! Array elements live at location `(array, arr(index))`; the array length is
//! the uninterpreted `length(array)`.

use log::debug;

use super::{FunctionDecl, Theory};
use crate::context::Context;
use crate::node::{Literal, Node};
use crate::reference::Ref;
use crate::types::Sort;

pub const SELECT: &str = "select";
pub const STORE: &str = "store";
pub const ARR: &str = "arr";
pub const LENGTH: &str = "length";

pub struct HeapTheory;

impl Theory for HeapTheory {
    fn name(&self) -> &'static str {
        "heap"
    }

    fn functions(&self) -> Vec<FunctionDecl> {
        vec![
            FunctionDecl::new(SELECT, 3, Sort::Any),
            FunctionDecl::new(STORE, 4, Sort::Heap),
            FunctionDecl::new(ARR, 1, Sort::Field),
            FunctionDecl::new(LENGTH, 1, Sort::Int),
        ]
    }

    fn rewrite(&self, ctx: &Context, func: &str, args: &[Ref]) -> Option<Ref> {
        match func {
            SELECT => {
                let (heap, obj, field) = (args[0], args[1], args[2]);
                let inner = ctx.as_app(heap, STORE)?;
                let (h0, o2, f2, value) = (inner[0], inner[1], inner[2], inner[3]);
                if o2 == obj && f2 == field {
                    debug!("heap: read-over-write hit");
                    Some(value)
                } else if distinct_fields(ctx, field, f2) {
                    debug!("heap: read-over-write miss");
                    Some(ctx.select(h0, obj, field))
                } else {
                    None
                }
            }
            STORE => {
                let (heap, obj, field, value) = (args[0], args[1], args[2], args[3]);
                if let Some(read) = ctx.as_app(value, SELECT) {
                    if read == [heap, obj, field] {
                        debug!("heap: storing the value just read");
                        return Some(heap);
                    }
                }
                let inner = ctx.as_app(heap, STORE)?;
                if inner[1] == obj && inner[2] == field {
                    debug!("heap: write-over-write");
                    Some(ctx.store(inner[0], obj, field, value))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// Whether two field terms certainly denote different fields.
fn distinct_fields(ctx: &Context, f1: Ref, f2: Ref) -> bool {
    if f1 == f2 {
        return false;
    }
    let is_field_literal = |f: Ref| !f.is_negated() && matches!(ctx.node(f), Node::Lit(Literal::Field(_)));
    match (ctx.as_app(f1, ARR), ctx.as_app(f2, ARR)) {
        (Some(i), Some(j)) => ctx.is_literal(i[0]) && ctx.is_literal(j[0]),
        (Some(_), None) => is_field_literal(f2),
        (None, Some(_)) => is_field_literal(f1),
        (None, None) => is_field_literal(f1) && is_field_literal(f2),
    }
}

impl Context {
    pub fn select(&self, heap: Ref, obj: Ref, field: Ref) -> Ref {
        self.apply(SELECT, vec![heap, obj, field])
    }

    pub fn store(&self, heap: Ref, obj: Ref, field: Ref, value: Ref) -> Ref {
        self.apply(STORE, vec![heap, obj, field, value])
    }

    pub fn arr(&self, index: Ref) -> Ref {
        self.apply(ARR, vec![index])
    }

    pub fn length(&self, array: Ref) -> Ref {
        self.apply(LENGTH, vec![array])
    }
}
