use num_bigint::BigInt;

use crate::reference::Ref;
use crate::types::SymbolId;
use crate::utils::{hash_bytes, pairing2, pairing3, pairing_seq, MyHash};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Literal {
    Int(BigInt),
    Null,
    /// Field identifier, e.g. `Node.next`.
    Field(String),
}

impl MyHash for Literal {
    fn hash(&self) -> u64 {
        match self {
            Literal::Int(n) => pairing2(1, hash_bytes(&n.to_signed_bytes_le())),
            Literal::Null => 2,
            Literal::Field(name) => pairing2(3, hash_bytes(name.as_bytes())),
        }
    }
}

/// Expression node stored in the hash-consing table.
///
/// Children are [`Ref`] handles, so structurally equal expressions share one
/// index. Negation lives in the handle sign and never appears as a node.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Node {
    /// The boolean literal `true`; always stored at index 1.
    True,
    Lit(Literal),
    Sym(SymbolId),
    App(SymbolId, Vec<Ref>),
    /// Value summary: `(guard, value)` pairs sorted by guard.
    Summary(Vec<(Ref, Ref)>),
    Eq(Ref, Ref),
    And(Vec<Ref>),
    Or(Vec<Ref>),
}

impl Node {
    /// Handles of all direct children, in order.
    pub fn children(&self) -> Vec<Ref> {
        match self {
            Node::True | Node::Lit(_) | Node::Sym(_) => Vec::new(),
            Node::App(_, args) => args.clone(),
            Node::Summary(branches) => branches.iter().flat_map(|&(g, v)| [g, v]).collect(),
            Node::Eq(a, b) => vec![*a, *b],
            Node::And(items) | Node::Or(items) => items.clone(),
        }
    }
}

fn hash_refs(refs: &[Ref]) -> u64 {
    pairing_seq(refs.iter().map(MyHash::hash))
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        match self {
            Node::True => 1,
            Node::Lit(lit) => pairing2(2, lit.hash()),
            Node::Sym(id) => pairing2(3, id.index() as u64),
            Node::App(f, args) => pairing3(4, f.index() as u64, hash_refs(args)),
            Node::Summary(branches) => pairing2(
                5,
                pairing_seq(branches.iter().flat_map(|(g, v)| [g.hash(), v.hash()])),
            ),
            Node::Eq(a, b) => pairing3(6, a.hash(), b.hash()),
            Node::And(items) => pairing2(7, hash_refs(items)),
            Node::Or(items) => pairing2(8, hash_refs(items)),
        }
    }
}
