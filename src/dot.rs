//! Analysis results to DOT (Graphviz) conversion.
//!
//! The control-flow graph of the analysed method is rendered with one node per
//! statement, labelled with the statement text and the number of input and
//! output states recorded for it:
//! - loop heads use [`DotConfig::head_shape`], statements without successors
//!   use [`DotConfig::tail_shape`];
//! - the jump edge of an `if` is solid, its fall-through edge dashed;
//! - back edges are dotted.
//!
//! # Examples
//!
//! ```
//! use symex_rs::analysis::Analysis;
//! use symex_rs::ir::{Method, Operand, Stmt, Type};
//!
//! let method = Method::builder("Demo", "id")
//!     .param("x", Type::Int)
//!     .returns(Type::Int)
//!     .stmt(Stmt::Return(Some(Operand::local("x"))))
//!     .build()
//!     .unwrap();
//! let mut analysis = Analysis::new(method).unwrap();
//! analysis.execute().unwrap();
//! let dot = analysis.to_dot().unwrap();
//! assert!(dot.starts_with("digraph"));
//! ```

use std::fmt::Write as _;

use crate::analysis::Analysis;
use crate::ir::Stmt;
use crate::types::StmtId;

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for ordinary statements (default: "box")
    pub node_shape: &'static str,
    /// Shape for loop heads (default: "doubleoctagon")
    pub head_shape: &'static str,
    /// Shape for statements without successors (default: "doublecircle")
    pub tail_shape: &'static str,
    /// Style for jump and sequential edges (default: "solid")
    pub edge_style: &'static str,
    /// Style for the fall-through edge of an `if` (default: "dashed")
    pub fallthrough_style: &'static str,
    /// Style for loop back edges (default: "dotted")
    pub back_edge_style: &'static str,
    /// Whether to print the leaf states below each tail (default: false)
    pub show_leaves: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "box",
            head_shape: "doubleoctagon",
            tail_shape: "doublecircle",
            edge_style: "solid",
            fallthrough_style: "dashed",
            back_edge_style: "dotted",
            show_leaves: false,
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Analysis {
    /// Render the control-flow graph with state counts in DOT format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let cfg = self.cfg();
        let method = self.method();
        let ctx = self.context();

        let mut dot = String::new();
        writeln!(dot, "digraph \"{}\" {{", escape(&method.signature()))?;
        writeln!(dot, "node [shape={}, fontname=monospace];", config.node_shape)?;

        for i in 0..cfg.len() {
            let id = StmtId::new(i);
            let shape = if self.loops().iter().any(|l| l.head == id) {
                config.head_shape
            } else if cfg.is_tail(id) {
                config.tail_shape
            } else {
                config.node_shape
            };
            let mut label = format!(
                "{}: {}\\nin {} / out {}",
                i,
                escape(&method.stmt(id).to_string()),
                self.input_states(id).len(),
                self.output_states(id).len()
            );
            if config.show_leaves && cfg.is_tail(id) {
                for state in self.output_states(id) {
                    write!(label, "\\n{}", escape(&state.display(ctx)))?;
                }
            }
            writeln!(dot, "{} [shape={}, label=\"{}\"];", i, shape, label)?;
        }

        for i in 0..cfg.len() {
            let from = StmtId::new(i);
            let is_branch = matches!(method.stmt(from), Stmt::If { .. });
            for (k, &to) in cfg.succs(from).iter().enumerate() {
                let style = if self.loops().iter().any(|l| l.is_back_edge(from, to)) {
                    config.back_edge_style
                } else if is_branch && k == 0 {
                    config.fallthrough_style
                } else {
                    config.edge_style
                };
                writeln!(dot, "{} -> {} [style={}];", i, to.index(), style)?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}
