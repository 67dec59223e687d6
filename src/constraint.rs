use crate::context::Context;
use crate::node::Node;
use crate::reference::Ref;

/// Path condition: a finite conjunction of boolean expressions.
///
/// The set is kept sorted and deduplicated. `true` is never stored, and a set
/// containing `false` (or a formula together with its complement) is collapsed
/// to `{false}`.
///
/// `==` compares the stored items; see [`ConstraintSet::equivalent`] for
/// comparison after simplification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConstraintSet {
    items: Vec<Ref>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalized(mut items: Vec<Ref>) -> Self {
        items.retain(|&c| c != Ref::TRUE);
        items.sort();
        items.dedup();
        if items.contains(&Ref::FALSE) || items.windows(2).any(|w| w[0] == -w[1]) {
            items = vec![Ref::FALSE];
        }
        Self { items }
    }

    /// The set extended with `constraint`.
    pub fn add(&self, constraint: Ref) -> Self {
        let mut items = self.items.clone();
        items.push(constraint);
        Self::normalized(items)
    }

    /// The set extended with the complement of `constraint`.
    pub fn add_negated(&self, constraint: Ref) -> Self {
        self.add(-constraint)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, constraint: Ref) -> bool {
        self.items.binary_search(&constraint).is_ok()
    }

    /// Whether the set is syntactically contradictory.
    pub fn is_unsatisfiable(&self) -> bool {
        self.items == [Ref::FALSE]
    }

    pub fn iter(&self) -> impl Iterator<Item = Ref> + '_ {
        self.items.iter().copied()
    }

    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            items: self.iter().filter(|&c| other.contains(c)).collect(),
        }
    }

    /// Constraints of `self` that are not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        Self {
            items: self.iter().filter(|&c| !other.contains(c)).collect(),
        }
    }

    /// The conjunction of all constraints.
    pub fn as_formula(&self, ctx: &Context) -> Ref {
        ctx.mk_and(self.iter())
    }

    /// Simplify every constraint and split top-level conjunctions.
    pub fn simplify(&self, ctx: &Context) -> Self {
        let mut items = Vec::with_capacity(self.items.len());
        for c in self.iter() {
            let c = ctx.simplify(c);
            match (c.is_negated(), ctx.node(c)) {
                (false, Node::And(parts)) => items.extend(parts),
                _ => items.push(c),
            }
        }
        Self::normalized(items)
    }

    /// Whether both sets denote the same conjunction once simplified.
    pub fn equivalent(&self, ctx: &Context, other: &Self) -> bool {
        self == other || self.simplify(ctx) == other.simplify(ctx)
    }

    pub fn display(&self, ctx: &Context) -> String {
        let parts: Vec<String> = self.iter().map(|c| ctx.display(c)).collect();
        format!("{{{}}}", parts.join(", "))
    }
}

impl FromIterator<Ref> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Ref>>(iter: I) -> Self {
        Self::normalized(iter.into_iter().collect())
    }
}
