use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::ops::Neg;

use crate::utils::MyHash;

/// Handle to a hash-consed expression node.
///
/// The sign of the handle carries logical negation: `-r` is the complement of the
/// boolean expression `r`, so negation never allocates and `--r == r`.
/// Index 0 is never a valid node; index 1 is always the literal `true`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Ref(i32);

impl Ref {
    /// The literal `true`.
    pub const TRUE: Ref = Ref(1);
    /// The literal `false`, i.e. the complement of [`Ref::TRUE`].
    pub const FALSE: Ref = Ref(-1);

    pub const fn positive(index: u32) -> Self {
        assert!(index != 0, "Node index should not be zero");
        Self(index as i32)
    }

    pub const fn is_negated(&self) -> bool {
        self.0 < 0
    }

    pub const fn negate(self) -> Self {
        Self(-self.0)
    }

    /// Strip the negation, yielding the handle of the underlying node.
    pub const fn regular(self) -> Self {
        Self(self.0.abs())
    }

    /// Return the internal representation of the reference.
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Return the index of the referenced node.
    pub const fn index(self) -> usize {
        self.0.unsigned_abs() as usize
    }

    pub(crate) fn as_lit(self) -> u32 {
        signed_to_lit(self.0)
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

/// Handles are ordered by node index first, so that `x` and `-x` are adjacent
/// after sorting.
impl Ord for Ref {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.index(), self.is_negated()).cmp(&(other.index(), other.is_negated()))
    }
}

impl PartialOrd for Ref {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}

impl MyHash for Ref {
    fn hash(&self) -> u64 {
        self.as_lit() as u64
    }
}

pub(crate) fn signed_to_lit(value: i32) -> u32 {
    (value.unsigned_abs() << 1) + (value < 0) as u32
}
