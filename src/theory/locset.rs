//! Location sets, used to describe which heap locations a loop may modify.

use super::{FunctionDecl, Theory};
use crate::context::Context;
use crate::reference::Ref;
use crate::types::Sort;

pub const EMPTY: &str = "empty";
pub const ALL_LOCS: &str = "allLocs";
pub const SINGLETON: &str = "singleton";
pub const UNION: &str = "union";
pub const ELEMENT_OF: &str = "elementOf";

pub struct LocSetTheory;

impl Theory for LocSetTheory {
    fn name(&self) -> &'static str {
        "locset"
    }

    fn functions(&self) -> Vec<FunctionDecl> {
        vec![
            FunctionDecl::new(EMPTY, 0, Sort::LocSet),
            FunctionDecl::new(ALL_LOCS, 0, Sort::LocSet),
            FunctionDecl::new(SINGLETON, 2, Sort::LocSet),
            FunctionDecl::new(UNION, 2, Sort::LocSet),
            FunctionDecl::new(ELEMENT_OF, 3, Sort::Bool),
        ]
    }

    fn rewrite(&self, ctx: &Context, func: &str, args: &[Ref]) -> Option<Ref> {
        let empty = ctx.empty_locs();
        let all = ctx.all_locs();
        match func {
            UNION => {
                let (a, b) = (args[0], args[1]);
                if a == empty || a == b {
                    Some(b)
                } else if b == empty {
                    Some(a)
                } else if a == all || b == all {
                    Some(all)
                } else {
                    None
                }
            }
            ELEMENT_OF => {
                let (obj, field, set) = (args[0], args[1], args[2]);
                if set == empty {
                    Some(ctx.ff)
                } else if set == all || set == ctx.singleton(obj, field) {
                    Some(ctx.tt)
                } else if let Some(parts) = ctx.as_app(set, UNION) {
                    Some(ctx.mk_or([
                        ctx.element_of(obj, field, parts[0]),
                        ctx.element_of(obj, field, parts[1]),
                    ]))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl Context {
    pub fn empty_locs(&self) -> Ref {
        self.apply(EMPTY, Vec::new())
    }

    pub fn all_locs(&self) -> Ref {
        self.apply(ALL_LOCS, Vec::new())
    }

    pub fn singleton(&self, obj: Ref, field: Ref) -> Ref {
        self.apply(SINGLETON, vec![obj, field])
    }

    pub fn union(&self, a: Ref, b: Ref) -> Ref {
        self.apply(UNION, vec![a, b])
    }

    pub fn element_of(&self, obj: Ref, field: Ref, set: Ref) -> Ref {
        self.apply(ELEMENT_OF, vec![obj, field, set])
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_union_laws() {
        let ctx = Context::new(8).unwrap();
        let o = ctx.mk_sym(ctx.register_local("o", Sort::Object).unwrap());
        let s = ctx.singleton(o, ctx.mk_field("A.f"));
        assert_eq!(ctx.simplify(ctx.union(ctx.empty_locs(), s)), s);
        assert_eq!(ctx.simplify(ctx.union(s, s)), s);
        assert_eq!(ctx.simplify(ctx.union(s, ctx.all_locs())), ctx.all_locs());
    }

    #[test]
    fn test_element_of() {
        let ctx = Context::new(8).unwrap();
        let o = ctx.mk_sym(ctx.register_local("o", Sort::Object).unwrap());
        let f = ctx.mk_field("A.f");
        let g = ctx.mk_field("A.g");
        let s = ctx.singleton(o, f);
        assert_eq!(ctx.simplify(ctx.element_of(o, f, ctx.empty_locs())), ctx.ff);
        assert_eq!(ctx.simplify(ctx.element_of(o, f, ctx.all_locs())), ctx.tt);
        assert_eq!(ctx.simplify(ctx.element_of(o, f, s)), ctx.tt);

        let u = ctx.union(ctx.singleton(o, g), s);
        assert_eq!(ctx.simplify(ctx.element_of(o, f, u)), ctx.tt);
    }
}
