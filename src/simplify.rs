use log::{debug, trace};

use crate::context::Context;
use crate::node::Node;
use crate::reference::Ref;
use crate::types::SymbolId;

impl Context {
    /// Bring `r` to its simplified form.
    ///
    /// Children are simplified first, the node is rebuilt through the canonicalising
    /// constructors, and the owning theory's laws are applied to applications until
    /// none fires. The result is memoised and `simplify(simplify(e)) == simplify(e)`.
    pub fn simplify(&self, r: Ref) -> Ref {
        if r.is_negated() {
            return -self.simplify(r.regular());
        }
        if let Some(res) = self.cached(r) {
            trace!("simplify: cache hit for {}", r);
            return res;
        }

        let res = match self.node(r) {
            Node::True | Node::Lit(_) | Node::Sym(_) => r,
            Node::App(f, args) => {
                let args: Vec<Ref> = args.iter().map(|&a| self.simplify(a)).collect();
                self.simplify_app(f, args)
            }
            Node::Summary(branches) => {
                let branches: Vec<(Ref, Ref)> = branches
                    .iter()
                    .map(|&(g, v)| (self.simplify(g), self.simplify(v)))
                    .collect();
                self.mk_summary(branches)
            }
            Node::Eq(a, b) => {
                let (a, b) = (self.simplify(a), self.simplify(b));
                self.mk_eq(a, b)
            }
            Node::And(items) => {
                let items: Vec<Ref> = items.iter().map(|&x| self.simplify(x)).collect();
                self.mk_and(items)
            }
            Node::Or(items) => {
                let items: Vec<Ref> = items.iter().map(|&x| self.simplify(x)).collect();
                self.mk_or(items)
            }
        };

        self.remember(r, res);
        if res != r {
            // The simplified form is a fixpoint.
            self.remember(res.regular(), res.regular());
        }
        res
    }

    fn simplify_app(&self, f: SymbolId, args: Vec<Ref>) -> Ref {
        let name = self.symbol_name(f);
        let rewritten = self
            .theory_of(f)
            .and_then(|theory| theory.rewrite(self, &name, &args));
        match rewritten {
            Some(res) => {
                debug!("simplify: rewrote {}({} args) to {}", name, args.len(), self.display(res));
                self.simplify(res)
            }
            None => self.mk_app(f, args),
        }
    }
}
