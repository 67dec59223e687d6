//! Symbolic stores: finite maps from symbols to expressions, built up from
//! elementary updates and parallel composition.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::context::Context;
use crate::reference::Ref;
use crate::types::SymbolId;

/// A symbolic store.
///
/// In `Parallel(a, b)` the bindings of `b` are the later ones and win on
/// conflicts. Stores compare equal when their flattened bindings agree.
#[derive(Debug, Clone, Default)]
pub enum Store {
    #[default]
    Empty,
    Elementary(SymbolId, Ref),
    Parallel(Rc<Store>, Rc<Store>),
}

impl Store {
    pub fn elementary(sym: SymbolId, value: Ref) -> Self {
        Store::Elementary(sym, value)
    }

    pub fn parallel(first: Store, second: Store) -> Self {
        match (first, second) {
            (Store::Empty, s) | (s, Store::Empty) => s,
            (a, b) => Store::Parallel(Rc::new(a), Rc::new(b)),
        }
    }

    /// Store with `sym` rebound to `value`.
    pub fn assign(&self, sym: SymbolId, value: Ref) -> Self {
        Store::parallel(self.clone(), Store::elementary(sym, value))
    }

    /// Canonical store built from bindings, right-nested in symbol order.
    pub fn from_bindings(bindings: impl IntoIterator<Item = (SymbolId, Ref)>) -> Self {
        let sorted: BTreeMap<SymbolId, Ref> = bindings.into_iter().collect();
        sorted
            .into_iter()
            .rev()
            .fold(Store::Empty, |acc, (sym, value)| {
                Store::parallel(Store::elementary(sym, value), acc)
            })
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Store::Empty => true,
            Store::Elementary(..) => false,
            Store::Parallel(a, b) => a.is_empty() && b.is_empty(),
        }
    }

    /// Latest binding of `sym`, if any.
    pub fn get(&self, sym: SymbolId) -> Option<Ref> {
        let mut stack = vec![self];
        while let Some(store) = stack.pop() {
            match store {
                Store::Empty => {}
                Store::Elementary(s, v) if *s == sym => return Some(*v),
                Store::Elementary(..) => {}
                Store::Parallel(a, b) => {
                    // Search the later half first.
                    stack.push(a);
                    stack.push(b);
                }
            }
        }
        None
    }

    /// Resolve all bindings; later bindings override earlier ones.
    pub fn flatten(&self) -> BTreeMap<SymbolId, Ref> {
        let mut bindings = BTreeMap::new();
        let mut stack = vec![self];
        while let Some(store) = stack.pop() {
            match store {
                Store::Empty => {}
                Store::Elementary(s, v) => {
                    bindings.insert(*s, *v);
                }
                Store::Parallel(a, b) => {
                    stack.push(b);
                    stack.push(a);
                }
            }
        }
        bindings
    }

    /// Current value of `sym`: its binding, or the symbol itself when unbound.
    pub fn value_of(&self, ctx: &Context, sym: SymbolId) -> Ref {
        self.get(sym).unwrap_or_else(|| ctx.mk_sym(sym))
    }

    pub fn display(&self, ctx: &Context) -> String {
        let parts: Vec<String> = self
            .flatten()
            .into_iter()
            .map(|(sym, value)| format!("{} := {}", ctx.symbol_name(sym), ctx.display(value)))
            .collect();
        format!("[{}]", parts.join(", "))
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        self.flatten() == other.flatten()
    }
}

impl Eq for Store {}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::Sort;

    #[test]
    fn test_later_binding_wins() {
        let ctx = Context::new(8).unwrap();
        let x = ctx.register_local("x", Sort::Int).unwrap();
        let store = Store::Empty.assign(x, ctx.mk_int(1)).assign(x, ctx.mk_int(2));
        assert_eq!(store.get(x), Some(ctx.mk_int(2)));
        assert_eq!(store.flatten().get(&x), Some(&ctx.mk_int(2)));
    }

    #[test]
    fn test_unbound_value_is_symbol() {
        let ctx = Context::new(8).unwrap();
        let x = ctx.register_local("x", Sort::Int).unwrap();
        assert_eq!(Store::Empty.value_of(&ctx, x), ctx.mk_sym(x));
        assert_eq!(Store::Empty.get(x), None);
    }

    #[test]
    fn test_equality_is_extensional() {
        let ctx = Context::new(8).unwrap();
        let x = ctx.register_local("x", Sort::Int).unwrap();
        let y = ctx.register_local("y", Sort::Int).unwrap();
        let a = Store::Empty.assign(x, ctx.mk_int(1)).assign(y, ctx.mk_int(2));
        let b = Store::Empty
            .assign(y, ctx.mk_int(2))
            .assign(x, ctx.mk_int(0))
            .assign(x, ctx.mk_int(1));
        assert_eq!(a, b);
        assert_eq!(Store::from_bindings(a.flatten()), b);
        assert_ne!(a, Store::Empty);
    }

    #[test]
    fn test_parallel_drops_empty() {
        let ctx = Context::new(8).unwrap();
        let x = ctx.register_local("x", Sort::Int).unwrap();
        let s = Store::parallel(Store::Empty, Store::elementary(x, ctx.tt));
        assert!(matches!(s, Store::Elementary(..)));
        assert!(Store::parallel(Store::Empty, Store::Empty).is_empty());
    }

    #[test]
    fn test_display() {
        let ctx = Context::new(8).unwrap();
        let x = ctx.register_local("x", Sort::Int).unwrap();
        let s = Store::Empty.assign(x, ctx.mk_int(7));
        assert_eq!(s.display(&ctx), "[x := 7]");
    }

    #[test]
    fn test_deep_chain() {
        let ctx = Context::new(8).unwrap();
        let x = ctx.register_local("x", Sort::Int).unwrap();
        let mut store = Store::Empty;
        for i in 0..1_000 {
            store = store.assign(x, ctx.mk_int(i));
        }
        assert_eq!(store.get(x), Some(ctx.mk_int(999)));
        assert_eq!(store.flatten().len(), 1);
    }
}
