//! Phase 1: declaration facts.
//!
//! One walk populates the binding table: locality, single-definition
//! status, use counts, and recorded initializers. A name referenced before
//! (or without) a declaration can never be treated as eliminable, so such
//! references poison the single-def bit up front.

use std::collections::HashSet;

use crate::ast::{undefined_node, Node, UnaryOp};
use crate::walk::{walk_body, Visit};

use super::{base_name, collect_names, Analysis, Binding};

pub(crate) fn scan(body: &mut [Node], analysis: &mut Analysis) {
    walk_body(body, &mut |node| {
        match node {
            Node::Var(decls) => {
                for decl in decls {
                    record_declaration(analysis, &decl.name, decl.init.clone());
                }
            }
            Node::Name(name) => record_use(analysis, name),
            Node::Assign { target, .. } => {
                if let Some(base) = base_name(target) {
                    record_mutation(analysis, base);
                }
            }
            Node::UnaryPrefix {
                op: UnaryOp::Inc | UnaryOp::Dec,
                expr,
            }
            | Node::UnaryPostfix {
                op: UnaryOp::Inc | UnaryOp::Dec,
                expr,
            } => {
                if let Some(base) = base_name(expr) {
                    record_mutation(analysis, base);
                }
            }
            Node::Function { .. } | Node::Defun { .. } => {
                // A nested function may capture anything it mentions, and the
                // live-range analysis never looks inside one, so every name it
                // references or declares loses single-def status.
                let mut captured = HashSet::new();
                collect_names(node, &mut captured);
                collect_declared(node, &mut captured);
                for name in captured {
                    record_capture(analysis, &name);
                }
            }
            _ => {}
        }
        Visit::Descend
    });
}

fn record_declaration(analysis: &mut Analysis, name: &str, init: Option<Node>) {
    let init = init.unwrap_or_else(undefined_node);
    match analysis.bindings.get_mut(name) {
        None => {
            analysis
                .bindings
                .insert(name.to_string(), Binding::declared(init));
        }
        Some(binding) => {
            // Re-declared, or referenced before this declaration.
            binding.is_local = true;
            binding.single_def = false;
        }
    }
}

fn record_use(analysis: &mut Analysis, name: &str) {
    match analysis.bindings.get_mut(name) {
        Some(binding) => binding.use_count += 1,
        None => {
            analysis
                .bindings
                .insert(name.to_string(), Binding::foreign(1));
        }
    }
}

fn record_mutation(analysis: &mut Analysis, name: &str) {
    if let Some(binding) = analysis.bindings.get_mut(name) {
        binding.single_def = false;
    }
}

/// Names declared by `var` anywhere under `node`.
fn collect_declared(node: &Node, out: &mut HashSet<String>) {
    if let Node::Var(decls) = node {
        for decl in decls {
            out.insert(decl.name.clone());
        }
    }
    node.each_child(&mut |child| collect_declared(child, out));
}

fn record_capture(analysis: &mut Analysis, name: &str) {
    match analysis.bindings.get_mut(name) {
        Some(binding) => binding.single_def = false,
        None => {
            analysis
                .bindings
                .insert(name.to_string(), Binding::foreign(0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn scan_source(source: &str) -> Analysis {
        let Node::Toplevel(mut body) = parse(source).expect("parse failure") else {
            unreachable!()
        };
        let mut analysis = Analysis::default();
        scan(&mut body, &mut analysis);
        analysis
    }

    #[test]
    fn single_def_with_use_count() {
        let a = scan_source("var a = x + 1; return a;");
        let binding = &a.bindings["a"];
        assert!(binding.is_local);
        assert!(binding.single_def);
        assert_eq!(binding.use_count, 1);
        // `x` is counted too, but is not local.
        let x = &a.bindings["x"];
        assert!(!x.is_local);
        assert_eq!(x.use_count, 1);
    }

    #[test]
    fn reassignment_clears_single_def() {
        let a = scan_source("var a = 1; a = 2;");
        assert!(!a.bindings["a"].single_def);
    }

    #[test]
    fn increment_clears_single_def() {
        let a = scan_source("var a = 1; a++; var b = 1; --b;");
        assert!(!a.bindings["a"].single_def);
        assert!(!a.bindings["b"].single_def);
    }

    #[test]
    fn member_assignment_clears_the_base_object() {
        let a = scan_source("var h = g; h[0] = 1;");
        assert!(!a.bindings["h"].single_def);
    }

    #[test]
    fn use_before_declaration_clears_single_def() {
        let a = scan_source("f(a); var a = 1;");
        let binding = &a.bindings["a"];
        assert!(binding.is_local);
        assert!(!binding.single_def);
    }

    #[test]
    fn redeclaration_clears_single_def() {
        let a = scan_source("var a = 1; var a = 2;");
        assert!(!a.bindings["a"].single_def);
    }

    #[test]
    fn missing_initializer_synthesizes_undefined() {
        let a = scan_source("var a;");
        assert_eq!(a.bindings["a"].init, undefined_node());
        assert!(a.bindings["a"].single_def);
    }

    #[test]
    fn names_inside_nested_functions_are_poisoned() {
        let a = scan_source("var a = 1; var f = function () { return a; };");
        assert!(!a.bindings["a"].single_def);
        // `f` itself is declared normally.
        assert!(a.bindings["f"].single_def);
    }

    #[test]
    fn for_in_binding_is_opaque() {
        let a = scan_source("for (var k in obj) { f(k); }");
        // The header `var` is skipped; `k` is known only from its uses.
        let k = &a.bindings["k"];
        assert!(!k.is_local);
        assert!(!k.single_def);
    }
}
