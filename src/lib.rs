//! # symex-rs: Symbolic Execution of Three-Address Code
//!
//! **`symex-rs`** executes method bodies given in a small three-address
//! intermediate representation *symbolically*: instead of concrete values, every
//! local holds an expression over the initial values of the parameters, and
//! every branch splits the state into a path where the condition holds and one
//! where it does not.
//!
//! ## Key Features
//!
//! - **Context-Centric Architecture**: All expressions are built through the
//!   [`Context`][crate::context::Context], which hash-conses them into a shared
//!   table. Structurally equal expressions get the same [`Ref`][crate::reference::Ref],
//!   so equality checks are a single integer comparison.
//! - **Pluggable Theories**: Integer arithmetic, the heap, and location sets are
//!   [`Theory`][crate::theory::Theory] implementations contributing function
//!   symbols and rewrite rules. The simplifier knows nothing about them.
//! - **State Merging**: States reaching the same statement are merged into one,
//!   with differing values represented as guarded *value summaries*.
//! - **Loop Summaries**: Loops are executed once with every modified symbol
//!   replaced by a fresh one, which yields an abstraction of all iterations.
//!
//! ## Basic Usage
//!
//! ```rust
//! use symex_rs::analysis::Analysis;
//! use symex_rs::ir::{BinOp, Method, Operand, Rvalue, Stmt, Type};
//!
//! // int inc(int x) { x = x + 1; return x; }
//! let method = Method::builder("Demo", "inc")
//!     .param("x", Type::Int)
//!     .returns(Type::Int)
//!     .stmt(Stmt::assign("x", Rvalue::Binary(BinOp::Add, Operand::local("x"), Operand::Int(1))))
//!     .stmt(Stmt::Return(Some(Operand::local("x"))))
//!     .build()
//!     .unwrap();
//!
//! let mut analysis = Analysis::new(method).unwrap();
//! analysis.execute().unwrap();
//!
//! let ctx = analysis.context();
//! let x = analysis.symbol("x").unwrap();
//! let result = ctx.result().unwrap();
//! let leaf = analysis.leaf_states()[0];
//! assert_eq!(leaf.store.get(result), Some(ctx.plus(x, ctx.mk_int(1))));
//! ```
//!
//! ## Core Components
//!
//! - **[`context`]**: The expression manager and smart constructors.
//! - **[`state`]**: Symbolic execution states and their merging.
//! - **[`rules`]**: One symbolic execution rule per kind of statement.
//! - **[`analysis`]**: The entry point: walks a method and collects its leaves.
//! - **[`dot`]**: Visualisation of the analysed control-flow graph.

pub mod analysis;
pub mod cache;
pub mod cfg;
pub mod constraint;
pub mod context;
pub mod dot;
mod driver;
pub mod error;
pub mod ir;
pub mod node;
pub mod purity;
pub mod reference;
pub mod rules;
pub mod simplify;
pub mod state;
pub mod store;
pub mod summary;
pub mod symbols;
pub mod table;
pub mod theory;
pub mod types;
pub mod utils;

pub use analysis::{Analysis, Config};
pub use constraint::ConstraintSet;
pub use context::Context;
pub use error::{Error, Result};
pub use reference::Ref;
pub use state::SymbolicExecutionState;
pub use store::Store;
