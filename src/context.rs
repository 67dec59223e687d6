use std::cell::RefCell;
use std::cmp::min;
use std::fmt::{Debug, Write as _};

use log::debug;
use num_bigint::BigInt;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::node::{Literal, Node};
use crate::reference::Ref;
use crate::symbols::{SymbolKind, SymbolRegistry};
use crate::table::Table;
use crate::theory::{default_theories, Theory};
use crate::types::{Sort, SymbolId};

type Storage = Table<Node>;

/// Expression manager: owns the hash-consed node table, the symbol registry,
/// the installed theories and the simplification memo.
///
/// All expression handles ([`Ref`]) are only meaningful relative to the context
/// that created them.
pub struct Context {
    storage: RefCell<Storage>,
    cache: RefCell<Cache<Ref, Ref>>,
    symbols: RefCell<SymbolRegistry>,
    theories: Vec<Box<dyn Theory>>,
    pub tt: Ref,
    pub ff: Ref,
}

impl Context {
    /// Create a context with the integer, heap and location-set theories.
    pub fn new(storage_bits: usize) -> Result<Self> {
        Self::with_theories(storage_bits, default_theories())
    }

    /// Create a context with the given theories; their function symbols are
    /// registered in order and must not clash.
    pub fn with_theories(storage_bits: usize, theories: Vec<Box<dyn Theory>>) -> Result<Self> {
        if storage_bits > 31 {
            return Err(Error::InvalidStorageBits(storage_bits));
        }

        let cache_bits = min(storage_bits, 16);

        let mut storage = Storage::new(storage_bits);
        let tt = storage.put(Node::True);
        assert_eq!(tt, 1); // Make sure `true` is (1).
        let tt = Ref::positive(tt as u32);

        let mut symbols = SymbolRegistry::new();
        for theory in theories.iter() {
            for decl in theory.functions() {
                symbols.register_function(theory.name(), decl.name, decl.arity, decl.sort)?;
            }
        }

        Ok(Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(cache_bits)),
            symbols: RefCell::new(symbols),
            theories,
            tt,
            ff: -tt,
        })
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.borrow();
        f.debug_struct("Context")
            .field("nodes", &self.storage.borrow().size())
            .field("symbols", &self.symbols.borrow().len())
            .field("theories", &self.theories.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("cache_hits", &cache.hits())
            .field("cache_misses", &cache.misses())
            .finish()
    }
}

// Registry access.
impl Context {
    pub fn symbols(&self) -> std::cell::Ref<'_, SymbolRegistry> {
        self.symbols.borrow()
    }

    pub fn cache(&self) -> std::cell::Ref<'_, Cache<Ref, Ref>> {
        self.cache.borrow()
    }

    pub(crate) fn cached(&self, r: Ref) -> Option<Ref> {
        self.cache.borrow().get(&r).copied()
    }

    pub(crate) fn remember(&self, r: Ref, simplified: Ref) {
        self.cache.borrow_mut().insert(&r, simplified);
    }

    /// Number of distinct expression nodes created so far.
    pub fn size(&self) -> usize {
        self.storage.borrow().size()
    }

    pub fn register_local(&self, name: &str, sort: Sort) -> Result<SymbolId> {
        self.symbols.borrow_mut().register_local(name, sort)
    }

    pub fn register_result(&self, sort: Sort) -> Result<SymbolId> {
        self.symbols.borrow_mut().register_result(sort)
    }

    pub fn register_function(
        &self,
        theory: &'static str,
        name: &str,
        arity: usize,
        sort: Sort,
    ) -> Result<SymbolId> {
        self.symbols
            .borrow_mut()
            .register_function(theory, name, arity, sort)
    }

    pub fn fresh(&self, base: &str, sort: Sort) -> SymbolId {
        self.symbols.borrow_mut().fresh(base, sort)
    }

    pub fn lookup(&self, name: &str) -> Result<SymbolId> {
        self.symbols.borrow().lookup(name)
    }

    pub fn function(&self, name: &str) -> Result<SymbolId> {
        self.symbols.borrow().function(name)
    }

    pub fn heap(&self) -> SymbolId {
        self.symbols.borrow().heap()
    }

    pub fn result(&self) -> Option<SymbolId> {
        self.symbols.borrow().result()
    }

    pub fn symbol_name(&self, id: SymbolId) -> String {
        self.symbols.borrow().name(id).to_string()
    }

    pub fn symbol_sort(&self, id: SymbolId) -> Sort {
        self.symbols.borrow().get(id).sort
    }

    /// Function symbol of an installed theory.
    ///
    /// # Panics
    ///
    /// Panics if no installed theory declares `name`.
    pub fn builtin(&self, name: &str) -> SymbolId {
        match self.symbols.borrow().function(name) {
            Ok(id) => id,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn theory(&self, name: &str) -> Option<&dyn Theory> {
        self.theories
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Theory owning the function symbol `f`, if any.
    pub fn theory_of(&self, f: SymbolId) -> Option<&dyn Theory> {
        let owner = match self.symbols.borrow().get(f).kind {
            SymbolKind::Function { theory, .. } => theory,
            _ => return None,
        };
        self.theory(owner)
    }
}

// Node access.
impl Context {
    /// Node behind `r`, ignoring its negation.
    pub fn node(&self, r: Ref) -> Node {
        self.storage.borrow().value(r.index()).clone()
    }

    pub fn is_true(&self, r: Ref) -> bool {
        r == self.tt
    }

    pub fn is_false(&self, r: Ref) -> bool {
        r == self.ff
    }

    pub fn int_value(&self, r: Ref) -> Option<BigInt> {
        if r.is_negated() {
            return None;
        }
        match self.node(r) {
            Node::Lit(Literal::Int(n)) => Some(n),
            _ => None,
        }
    }

    pub fn is_literal(&self, r: Ref) -> bool {
        !r.is_negated() && matches!(self.node(r), Node::Lit(_))
    }

    pub fn as_sym(&self, r: Ref) -> Option<SymbolId> {
        if r.is_negated() {
            return None;
        }
        match self.node(r) {
            Node::Sym(id) => Some(id),
            _ => None,
        }
    }

    /// Arguments of `r` if it is a (non-negated) application of the function named `name`.
    pub fn as_app(&self, r: Ref, name: &str) -> Option<Vec<Ref>> {
        if r.is_negated() {
            return None;
        }
        match self.node(r) {
            Node::App(f, args) if self.symbols.borrow().name(f) == name => Some(args),
            _ => None,
        }
    }

    pub fn sort_of(&self, r: Ref) -> Sort {
        if r.is_negated() {
            return Sort::Bool;
        }
        match self.node(r) {
            Node::True | Node::Eq(..) | Node::And(_) | Node::Or(_) => Sort::Bool,
            Node::Lit(Literal::Int(_)) => Sort::Int,
            Node::Lit(Literal::Null) => Sort::Object,
            Node::Lit(Literal::Field(_)) => Sort::Field,
            Node::Sym(id) | Node::App(id, _) => self.symbol_sort(id),
            Node::Summary(branches) => self.sort_of(branches[0].1),
        }
    }
}

// Constructors.
impl Context {
    fn put(&self, node: Node) -> Ref {
        let index = self.storage.borrow_mut().put(node);
        Ref::positive(index as u32)
    }

    pub fn mk_bool(&self, value: bool) -> Ref {
        if value {
            self.tt
        } else {
            self.ff
        }
    }

    pub fn mk_int(&self, value: impl Into<BigInt>) -> Ref {
        self.put(Node::Lit(Literal::Int(value.into())))
    }

    pub fn mk_null(&self) -> Ref {
        self.put(Node::Lit(Literal::Null))
    }

    pub fn mk_field(&self, name: &str) -> Ref {
        self.put(Node::Lit(Literal::Field(name.to_string())))
    }

    pub fn mk_sym(&self, id: SymbolId) -> Ref {
        self.put(Node::Sym(id))
    }

    pub fn mk_app(&self, f: SymbolId, args: Vec<Ref>) -> Ref {
        {
            let symbols = self.symbols.borrow();
            let symbol = symbols.get(f);
            match symbol.kind {
                SymbolKind::Function { arity, .. } => assert_eq!(
                    arity,
                    args.len(),
                    "Function `{}` applied to {} arguments",
                    symbol.name,
                    args.len()
                ),
                _ => panic!("`{}` is not a function symbol", symbol.name),
            }
        }
        self.put(Node::App(f, args))
    }

    /// Apply the installed theory function `name`.
    pub fn apply(&self, name: &str, args: Vec<Ref>) -> Ref {
        self.mk_app(self.builtin(name), args)
    }

    pub fn mk_not(&self, r: Ref) -> Ref {
        -r
    }

    pub fn mk_eq(&self, a: Ref, b: Ref) -> Ref {
        if a == b {
            return self.tt;
        }
        if a == -b {
            return self.ff;
        }
        if a == self.tt {
            return b;
        }
        if b == self.tt {
            return a;
        }
        if a == self.ff {
            return -b;
        }
        if b == self.ff {
            return -a;
        }
        if self.is_literal(a) && self.is_literal(b) {
            return self.ff;
        }
        self.put(Node::Eq(a, b))
    }

    pub fn mk_and(&self, items: impl IntoIterator<Item = Ref>) -> Ref {
        let mut flat = Vec::new();
        for item in items {
            if item == self.tt {
                continue;
            }
            if item == self.ff {
                return self.ff;
            }
            match (item.is_negated(), self.node(item)) {
                (false, Node::And(inner)) => flat.extend(inner),
                _ => flat.push(item),
            }
        }
        flat.sort();
        flat.dedup();
        if flat.windows(2).any(|w| w[0] == -w[1]) {
            return self.ff;
        }
        if let Some(rewritten) = self.absorb(&flat, false) {
            return self.mk_and(rewritten);
        }
        match flat.len() {
            0 => self.tt,
            1 => flat[0],
            _ => self.put(Node::And(flat)),
        }
    }

    pub fn mk_or(&self, items: impl IntoIterator<Item = Ref>) -> Ref {
        let mut flat = Vec::new();
        for item in items {
            if item == self.ff {
                continue;
            }
            if item == self.tt {
                return self.tt;
            }
            match (item.is_negated(), self.node(item)) {
                (false, Node::Or(inner)) => flat.extend(inner),
                _ => flat.push(item),
            }
        }
        flat.sort();
        flat.dedup();
        if flat.windows(2).any(|w| w[0] == -w[1]) {
            return self.tt;
        }
        if let Some(rewritten) = self.absorb(&flat, true) {
            return self.mk_or(rewritten);
        }
        match flat.len() {
            0 => self.ff,
            1 => flat[0],
            _ => self.put(Node::Or(flat)),
        }
    }

    /// One absorption step over the sorted operands of a disjunction (or,
    /// dually, a conjunction): `x || (x && y)` is `x` and `x || (!x && y)` is
    /// `x || y`. Every step shrinks the operands.
    fn absorb(&self, items: &[Ref], disjunction: bool) -> Option<Vec<Ref>> {
        for (i, &item) in items.iter().enumerate() {
            let inner = match (item.is_negated(), self.node(item)) {
                (false, Node::And(inner)) if disjunction => inner,
                (false, Node::Or(inner)) if !disjunction => inner,
                _ => continue,
            };
            let mut rest = items.to_vec();
            if inner.iter().any(|c| items.contains(c)) {
                rest.remove(i);
                return Some(rest);
            }
            let kept: Vec<Ref> = inner
                .iter()
                .copied()
                .filter(|&c| !items.contains(&-c))
                .collect();
            if kept.len() < inner.len() {
                rest[i] = if disjunction {
                    self.mk_and(kept)
                } else {
                    self.mk_or(kept)
                };
                return Some(rest);
            }
        }
        None
    }

    /// Build a value summary from `(guard, value)` branches.
    ///
    /// Branches with a `false` guard are dropped and branches sharing a value are
    /// merged under the disjunction of their guards. A summary left with a single
    /// branch, or with a `true` guard, collapses to that branch's value.
    pub fn mk_summary(&self, branches: impl IntoIterator<Item = (Ref, Ref)>) -> Ref {
        let branches: Vec<(Ref, Ref)> = branches.into_iter().collect();
        assert!(!branches.is_empty(), "Value summary needs at least one branch");

        let mut merged: Vec<(Ref, Ref)> = Vec::with_capacity(branches.len());
        for &(guard, value) in branches.iter() {
            if guard == self.ff {
                continue;
            }
            match merged.iter_mut().find(|(_, v)| *v == value) {
                Some(entry) => entry.0 = self.mk_or([entry.0, guard]),
                None => merged.push((guard, value)),
            }
        }
        if let Some(&(_, value)) = merged.iter().find(|(g, _)| *g == self.tt) {
            return value;
        }

        match merged.len() {
            0 => {
                debug!("mk_summary: all guards are false, keeping the first value");
                branches[0].1
            }
            1 => merged[0].1,
            _ => {
                merged.sort();
                self.put(Node::Summary(merged))
            }
        }
    }
}

// Pretty-printing.
impl Context {
    /// Render `r` in infix notation, e.g. `((input + 1) + 3)`.
    pub fn display(&self, r: Ref) -> String {
        let mut out = String::new();
        self.write_expr(r, &mut out, false);
        out
    }

    fn write_expr(&self, r: Ref, out: &mut String, nested: bool) {
        if r == self.tt {
            out.push_str("true");
            return;
        }
        if r == self.ff {
            out.push_str("false");
            return;
        }
        let node = self.node(r);
        if r.is_negated() {
            if let Node::Eq(a, b) = node {
                self.write_infix(a, "!=", b, out, nested);
            } else {
                out.push('!');
                self.write_expr(r.regular(), out, true);
            }
            return;
        }
        match node {
            Node::True => out.push_str("true"),
            Node::Lit(Literal::Int(n)) => {
                let _ = write!(out, "{}", n);
            }
            Node::Lit(Literal::Null) => out.push_str("null"),
            Node::Lit(Literal::Field(name)) => out.push_str(&name),
            Node::Sym(id) => out.push_str(self.symbols.borrow().name(id)),
            Node::App(f, args) => {
                let name = self.symbol_name(f);
                let infix = self.theory_of(f).and_then(|t| t.infix(&name));
                match (infix, args.as_slice()) {
                    (Some(op), [a, b]) => self.write_infix(*a, op, *b, out, nested),
                    (Some(op), [a]) => {
                        out.push_str(op);
                        self.write_expr(*a, out, true);
                    }
                    _ => {
                        out.push_str(&name);
                        out.push('(');
                        self.write_list(&args, ", ", out);
                        out.push(')');
                    }
                }
            }
            Node::Summary(branches) => {
                out.push('{');
                for (i, (guard, value)) in branches.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    self.write_expr(*guard, out, false);
                    out.push_str(" => ");
                    self.write_expr(*value, out, false);
                }
                out.push('}');
            }
            Node::Eq(a, b) => self.write_infix(a, "==", b, out, nested),
            Node::And(items) => self.write_connective(&items, " && ", out, nested),
            Node::Or(items) => self.write_connective(&items, " || ", out, nested),
        }
    }

    fn write_infix(&self, a: Ref, op: &str, b: Ref, out: &mut String, nested: bool) {
        if nested {
            out.push('(');
        }
        self.write_expr(a, out, true);
        let _ = write!(out, " {} ", op);
        self.write_expr(b, out, true);
        if nested {
            out.push(')');
        }
    }

    fn write_connective(&self, items: &[Ref], sep: &str, out: &mut String, nested: bool) {
        if nested {
            out.push('(');
        }
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(sep);
            }
            self.write_expr(*item, out, true);
        }
        if nested {
            out.push(')');
        }
    }

    fn write_list(&self, items: &[Ref], sep: &str, out: &mut String) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(sep);
            }
            self.write_expr(*item, out, false);
        }
    }
}
