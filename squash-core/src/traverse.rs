//! Generic walks over the argument graph.
//!
//! Grounded on `prog/any.go`'s `ForeachArg`/`ForeachSubArg`: both do a
//! full depth-first descent through `GroupArg` children, a `UnionArg`'s
//! chosen option, and a `PointerArg`'s pointee, sharing one [`ArgCtx`]
//! for the whole walk so that setting `ctx.stop` from the callback
//! halts not just further descent but every remaining sibling at any
//! level — the two differ only in their entry point (a whole [`Call`]
//! versus a single [`Arg`]).
//!
//! Callers get the path to the visited node rather than a mutable
//! reference to it: holding a `&mut Arg` for every frame of a recursive
//! descent at once isn't expressible safely, so classification
//! (read-only) walks the tree directly, and squashing resolves one
//! fresh mutable path at a time via [`resolve_mut`].

use squash_types::{Arg, ArgCtx, Call};

/// One step down from a parent `Arg` (or a `Call`'s top-level argument
/// list) to a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Index into a `Call`'s argument list or a `GroupArg`'s `inner`.
    Index(usize),
    /// The sole child of a `UnionArg` (`option`) or `PointerArg` (`res`).
    Descend,
}

/// A path from a traversal's entry point down to one visited `Arg`.
pub type ArgPath = Vec<Step>;

fn visit_arg(arg: &Arg, path: &mut ArgPath, ctx: &mut ArgCtx, f: &mut dyn FnMut(&Arg, &[Step], &mut ArgCtx)) {
    f(arg, path, ctx);
    if ctx.stop {
        return;
    }
    match arg {
        Arg::Group(g) => {
            for (i, child) in g.inner.iter().enumerate() {
                path.push(Step::Index(i));
                visit_arg(child, path, ctx, f);
                path.pop();
                if ctx.stop {
                    break;
                }
            }
        }
        Arg::Union(u) => {
            path.push(Step::Descend);
            visit_arg(&u.option, path, ctx, f);
            path.pop();
        }
        Arg::Pointer(p) => {
            if let Some(res) = &p.res {
                path.push(Step::Descend);
                visit_arg(res, path, ctx, f);
                path.pop();
            }
        }
        Arg::Const(_) | Arg::Result(_) | Arg::Data(_) => {}
    }
}

/// `ForeachArg`: visit every top-level argument of `call` and
/// everything reachable beneath it, in one shared traversal context.
pub fn foreach_arg(call: &Call, mut f: impl FnMut(&Arg, &[Step], &mut ArgCtx)) {
    let mut ctx = ArgCtx::default();
    let mut path = ArgPath::new();
    for (i, arg) in call.args.iter().enumerate() {
        path.clear();
        path.push(Step::Index(i));
        visit_arg(arg, &mut path, &mut ctx, &mut f);
        if ctx.stop {
            break;
        }
    }
}

/// `ForeachSubArg`: visit `arg` and everything reachable beneath it.
pub fn foreach_sub_arg(arg: &Arg, mut f: impl FnMut(&Arg, &[Step], &mut ArgCtx)) {
    let mut ctx = ArgCtx::default();
    let mut path = ArgPath::new();
    visit_arg(arg, &mut path, &mut ctx, &mut f);
}

/// Resolve a path recorded by [`foreach_arg`] back into a mutable
/// reference, navigating fresh from `call` each time so that no two
/// resolved paths ever alias.
pub fn resolve_mut<'a>(call: &'a mut Call, path: &[Step]) -> &'a mut Arg {
    let mut steps = path.iter();
    let first = match steps.next().expect("path must have at least one step") {
        Step::Index(i) => *i,
        Step::Descend => panic!("path must start with a top-level index"),
    };
    let mut current = &mut call.args[first];
    for step in steps {
        current = match (current, step) {
            (Arg::Group(g), Step::Index(i)) => &mut g.inner[*i],
            (Arg::Union(u), Step::Descend) => &mut u.option,
            (Arg::Pointer(p), Step::Descend) => {
                p.res.as_deref_mut().expect("path descends into a populated pointee")
            }
            _ => panic!("path does not match the argument graph shape"),
        };
    }
    current
}
