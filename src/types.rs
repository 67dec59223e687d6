//! Type-safe wrappers for symbols, statements and loops, plus the sort lattice.
//!
//! Symbol ids, statement ids and loop ids are all plain indices underneath;
//! the newtypes keep them from being mixed up across the driver and the registry.
use std::fmt;

/// A symbol identifier (0-indexed into the symbol registry).
///
/// Symbol ids are stable for the lifetime of a [`Context`][crate::context::Context]:
/// symbols are never unregistered.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn new(index: u32) -> Self {
        SymbolId(index)
    }

    /// Returns the raw index as a `usize`.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Position of a statement in a method body (0-indexed).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StmtId(usize);

impl StmtId {
    pub fn new(index: usize) -> Self {
        StmtId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// The statement that textually follows this one.
    pub fn next(self) -> Self {
        StmtId(self.0 + 1)
    }
}

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for StmtId {
    fn from(index: usize) -> Self {
        StmtId(index)
    }
}

/// Index of a natural loop in the loop list of a method.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct LoopId(usize);

impl LoopId {
    pub fn new(index: usize) -> Self {
        LoopId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Sort of a symbolic value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Sort {
    Bool,
    Int,
    /// Object or array reference.
    Object,
    Heap,
    Field,
    LocSet,
    /// Result sort of functions whose arguments range over several sorts.
    Any,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sort::Bool => "bool",
            Sort::Int => "int",
            Sort::Object => "object",
            Sort::Heap => "heap",
            Sort::Field => "field",
            Sort::LocSet => "locset",
            Sort::Any => "any",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stmt_navigation() {
        let s0 = StmtId::new(0);
        let s1 = s0.next();
        assert_eq!(s1.index(), 1);
        assert!(s0 < s1);
        assert_eq!(StmtId::from(1), s1);
        assert_eq!(s1.to_string(), "#1");
    }

    #[test]
    fn test_symbol_ids() {
        let a = SymbolId::new(0);
        let b = SymbolId::new(3);
        assert!(a < b);
        assert_eq!(b.index(), 3);
        assert_eq!(b.to_string(), "s3");
    }

    #[test]
    fn test_sort_display() {
        assert_eq!(Sort::LocSet.to_string(), "locset");
        assert_eq!(LoopId::new(2).to_string(), "L2");
    }
}
