//! Pluggable theories: each contributes function symbols and local rewrite laws.

pub mod heap;
pub mod int;
pub mod locset;

use crate::context::Context;
use crate::reference::Ref;
use crate::types::Sort;

pub use heap::HeapTheory;
pub use int::IntTheory;
pub use locset::LocSetTheory;

/// Function symbol contributed by a theory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: &'static str,
    pub arity: usize,
    pub sort: Sort,
}

impl FunctionDecl {
    pub const fn new(name: &'static str, arity: usize, sort: Sort) -> Self {
        Self { name, arity, sort }
    }
}

pub trait Theory {
    /// Theory name; also recorded as the owner of its function symbols.
    fn name(&self) -> &'static str;

    fn functions(&self) -> Vec<FunctionDecl>;

    /// Rewrite `func(args)` one step, where `args` are already simplified.
    ///
    /// Returns `None` when no law applies. The result is simplified again by the
    /// caller, so a law may return a term that exposes further redexes.
    fn rewrite(&self, ctx: &Context, func: &str, args: &[Ref]) -> Option<Ref>;

    /// Infix operator used when pretty-printing a binary application of `func`.
    fn infix(&self, _func: &str) -> Option<&'static str> {
        None
    }
}

/// The integer, heap and location-set theories, in registration order.
pub fn default_theories() -> Vec<Box<dyn Theory>> {
    vec![Box::new(IntTheory), Box::new(HeapTheory), Box::new(LocSetTheory)]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_default_theories_have_distinct_functions() {
        let mut seen = HashSet::new();
        for theory in default_theories() {
            for decl in theory.functions() {
                assert!(seen.insert(decl.name), "duplicate function {}", decl.name);
            }
        }
        assert!(seen.contains("plus"));
        assert!(seen.contains("select"));
        assert!(seen.contains("elementOf"));
    }
}
