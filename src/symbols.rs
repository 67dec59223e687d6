//! Symbol registry: program variables, the heap, the result, fresh symbols and
//! function symbols contributed by theories and pure methods.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::error::{Error, Result};
use crate::types::{Sort, SymbolId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Method parameter or local variable.
    Local,
    /// The program heap.
    Heap,
    /// The method return value.
    Result,
    /// Generated by the analysis (impure calls, loop anonymisation).
    Fresh,
    Function { arity: usize, theory: &'static str },
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Local => f.write_str("local"),
            SymbolKind::Heap => f.write_str("heap"),
            SymbolKind::Result => f.write_str("result"),
            SymbolKind::Fresh => f.write_str("fresh symbol"),
            SymbolKind::Function { theory, .. } => write!(f, "function of theory `{}`", theory),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    /// Value sort; for functions, the result sort.
    pub sort: Sort,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { .. })
    }
}

pub const HEAP_NAME: &str = "heap";
pub const RESULT_NAME: &str = "result";

/// Program locals and function symbols live in separate name spaces: a local
/// may be named like a theory function, `heap`, or `result`.
pub struct SymbolRegistry {
    symbols: Vec<Symbol>,
    /// Locals (parameters included) and fresh symbols.
    locals: HashMap<String, SymbolId>,
    functions: HashMap<String, SymbolId>,
    heap: SymbolId,
    result: Option<SymbolId>,
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolRegistry {
    /// Create a registry holding only the heap symbol.
    pub fn new() -> Self {
        let mut registry = Self {
            symbols: Vec::new(),
            locals: HashMap::new(),
            functions: HashMap::new(),
            heap: SymbolId::new(0),
            result: None,
        };
        registry.heap = registry.insert(HEAP_NAME.to_string(), Sort::Heap, SymbolKind::Heap);
        registry
    }

    fn insert(&mut self, name: String, sort: Sort, kind: SymbolKind) -> SymbolId {
        let id = SymbolId::new(self.symbols.len() as u32);
        debug!("register {} `{}`: {} as {}", kind, name, sort, id);
        self.symbols.push(Symbol { name, sort, kind });
        id
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn name(&self, id: SymbolId) -> &str {
        &self.get(id).name
    }

    pub fn heap(&self) -> SymbolId {
        self.heap
    }

    pub fn result(&self) -> Option<SymbolId> {
        self.result
    }

    /// Register the result symbol. A local named `result` of the same sort
    /// registered later resolves to the same symbol.
    pub fn register_result(&mut self, sort: Sort) -> Result<SymbolId> {
        if let Some(id) = self.result {
            return self.check_sort(id, sort);
        }
        let id = self.insert(RESULT_NAME.to_string(), sort, SymbolKind::Result);
        self.result = Some(id);
        Ok(id)
    }

    /// Register a program variable; re-registering the same name with the same
    /// sort returns the existing symbol.
    pub fn register_local(&mut self, name: &str, sort: Sort) -> Result<SymbolId> {
        if let Some(&id) = self.locals.get(name) {
            return self.check_sort(id, sort);
        }
        let id = match self.result {
            Some(result) if name == RESULT_NAME && self.get(result).sort == sort => result,
            _ => self.insert(name.to_string(), sort, SymbolKind::Local),
        };
        self.locals.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn register_function(
        &mut self,
        theory: &'static str,
        name: &str,
        arity: usize,
        sort: Sort,
    ) -> Result<SymbolId> {
        if self.functions.contains_key(name) {
            return Err(Error::FunctionNameClash {
                name: name.to_string(),
                theory: theory.to_string(),
            });
        }
        let id = self.insert(name.to_string(), sort, SymbolKind::Function { arity, theory });
        self.functions.insert(name.to_string(), id);
        Ok(id)
    }

    /// Allocate a new symbol named `base_k` with the smallest free `k >= 1`.
    pub fn fresh(&mut self, base: &str, sort: Sort) -> SymbolId {
        let mut k = 1;
        loop {
            let name = format!("{}_{}", base, k);
            if !self.locals.contains_key(&name) {
                let id = self.insert(name.clone(), sort, SymbolKind::Fresh);
                self.locals.insert(name, id);
                return id;
            }
            k += 1;
        }
    }

    /// Look up a local or fresh symbol by name. Without a local of that name,
    /// `heap` and `result` resolve to the heap and result symbols.
    pub fn lookup(&self, name: &str) -> Result<SymbolId> {
        if let Some(&id) = self.locals.get(name) {
            return Ok(id);
        }
        match name {
            HEAP_NAME => Some(self.heap),
            RESULT_NAME => self.result,
            _ => None,
        }
        .ok_or_else(|| Error::SymbolNotFound(name.to_string()))
    }

    /// Look up a function symbol by name.
    pub fn function(&self, name: &str) -> Result<SymbolId> {
        self.functions
            .get(name)
            .copied()
            .ok_or_else(|| Error::FunctionNotFound(name.to_string()))
    }

    /// Iterate over all symbols in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId::new(i as u32), s))
    }

    fn check_sort(&self, id: SymbolId, sort: Sort) -> Result<SymbolId> {
        let symbol = self.get(id);
        if symbol.sort == sort {
            Ok(id)
        } else {
            Err(Error::SortMismatch {
                name: symbol.name.clone(),
                existing: symbol.sort,
                requested: sort,
            })
        }
    }
}
