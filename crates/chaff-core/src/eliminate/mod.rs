//! Single-use temporary elimination for one function body.
//!
//! The upstream code generator emits one short-lived local per expression
//! operand. This pass decides, per single-assignment local, whether its
//! initializer can be substituted at each use without observable change,
//! then erases the declaration and splices the initializer in.
//!
//! Four analysis phases feed one rewrite phase:
//! 1. Scan declaration facts ([`scan`])
//! 2. Inspect initializers, seed the affects graph ([`deps`])
//! 3. Saturate the graph to its transitive closure ([`deps`])
//! 4. Track live ranges and dependency clobbers ([`live`])
//! 5. Rewrite: drop declarations, collapse, substitute ([`rewrite`])

mod deps;
mod live;
mod rewrite;
mod scan;

use std::collections::{HashMap, HashSet};

use crate::ast::{Node, UnaryOp};

/// Most uses a binding may have and still be substituted. Raising this risks
/// super-linear growth when eliminated bindings reference each other.
const MAX_USES: usize = 1;

/// Everything the passes learn about one name.
#[derive(Debug)]
pub(crate) struct Binding {
    /// Declared by a `var` in this function.
    pub is_local: bool,
    /// Exactly one declaration, never reassigned, never incremented.
    pub single_def: bool,
    /// Number of `Name` references, local or not.
    pub use_count: usize,
    /// Initializer subtree (`undefined` synthesized when absent).
    pub init: Node,
    /// Every initializer node is of a side-effect-free kind.
    pub pure_init: bool,
    /// Transitively reads at least one non-local name.
    pub depends_on_global: bool,
    /// Some use observed the binding after a dependency may have changed.
    pub deps_mutated: bool,
}

impl Binding {
    fn declared(init: Node) -> Self {
        Binding {
            is_local: true,
            single_def: true,
            use_count: 0,
            init,
            pure_init: true,
            depends_on_global: false,
            deps_mutated: false,
        }
    }

    fn foreign(use_count: usize) -> Self {
        Binding {
            is_local: false,
            single_def: false,
            use_count,
            init: crate::ast::undefined_node(),
            pure_init: false,
            depends_on_global: false,
            deps_mutated: false,
        }
    }

    fn is_eliminable(&self) -> bool {
        self.single_def
            && self.pure_init
            && (self.use_count == 0 || (self.use_count <= MAX_USES && !self.deps_mutated))
    }
}

/// Per-function analysis state, built by phases 1-4, read by the rewriter.
#[derive(Debug, Default)]
pub(crate) struct Analysis {
    pub bindings: HashMap<String, Binding>,
    /// `affects[x]` holds the single-def bindings whose initializer reads
    /// `x`; after closure, transitively so.
    pub affects: HashMap<String, HashSet<String>>,
}

impl Analysis {
    fn is_local(&self, name: &str) -> bool {
        self.bindings.get(name).is_some_and(|b| b.is_local)
    }
}

/// Eliminate substitutable bindings from a function body, in place.
/// Returns the number of bindings eliminated.
pub fn optimize_function(body: &mut Vec<Node>) -> usize {
    let mut analysis = Analysis::default();
    scan::scan(body, &mut analysis);
    deps::analyze_initializers(&mut analysis);
    deps::close_dependencies(&mut analysis);
    live::analyze(body, &mut analysis);
    rewrite::rewrite(body, &analysis)
}

/// Kinds that cannot issue a call, construct, throw, or reassign. Prefix
/// increment and decrement are mutations, so they stay outside the set even
/// though the generator never emits them in initializer position.
pub(crate) fn is_pure_node(node: &Node) -> bool {
    match node {
        Node::Name(_) | Node::Num(_) | Node::Str(_) | Node::Binary { .. } | Node::Sub { .. } => {
            true
        }
        Node::UnaryPrefix { op, .. } => !matches!(op, UnaryOp::Inc | UnaryOp::Dec),
        _ => false,
    }
}

/// The name ultimately written by an assignment or increment target:
/// `H[x].y = v` mutates `H`.
pub(crate) fn base_name(mut node: &Node) -> Option<&str> {
    loop {
        match node {
            Node::Name(name) => return Some(name),
            Node::Sub { object, .. } | Node::Dot { object, .. } => node = object,
            _ => return None,
        }
    }
}

/// Every name syntactically referenced under `node`.
pub(crate) fn collect_names(node: &Node, out: &mut HashSet<String>) {
    if let Node::Name(name) = node {
        out.insert(name.clone());
    }
    node.each_child(&mut |child| collect_names(child, out));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;

    fn name(n: &str) -> Node {
        Node::Name(n.to_string())
    }

    #[test]
    fn base_name_digs_through_member_chains() {
        let target = Node::Sub {
            object: Box::new(Node::Dot {
                object: Box::new(name("H")),
                field: "cells".to_string(),
            }),
            index: Box::new(name("i")),
        };
        assert_eq!(base_name(&target), Some("H"));
        assert_eq!(base_name(&Node::Num(1.0)), None);
    }

    #[test]
    fn pure_node_set_excludes_prefix_increment() {
        let add = Node::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(name("x")),
            rhs: Box::new(Node::Num(1.0)),
        };
        assert!(is_pure_node(&add));
        assert!(is_pure_node(&Node::UnaryPrefix {
            op: UnaryOp::Neg,
            expr: Box::new(name("x")),
        }));
        assert!(!is_pure_node(&Node::UnaryPrefix {
            op: UnaryOp::Inc,
            expr: Box::new(name("x")),
        }));
        assert!(!is_pure_node(&Node::Call {
            callee: Box::new(name("f")),
            args: vec![],
        }));
    }
}
