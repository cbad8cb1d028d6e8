//! Phases 2 and 3: initializer inspection and dependency closure.
//!
//! Phase 2 decides purity per single-def binding and seeds the affects
//! graph with direct edges (`x -> y` when `y`'s initializer reads `x`).
//! Phase 3 saturates the graph so a kill of `x` can reach every binding
//! whose recorded value would go stale, and propagates the
//! depends-on-a-global flag along the way.

use std::collections::HashSet;

use crate::ast::Node;

use super::{is_pure_node, Analysis};

pub(crate) fn analyze_initializers(analysis: &mut Analysis) {
    let single_defs: Vec<String> = analysis
        .bindings
        .iter()
        .filter(|(_, binding)| binding.single_def)
        .map(|(name, _)| name.clone())
        .collect();

    for name in single_defs {
        let init = analysis.bindings[&name].init.clone();
        let mut pure = true;
        let mut reads = Vec::new();
        inspect(&init, &mut pure, &mut reads);

        analysis.bindings.get_mut(&name).unwrap().pure_init = pure;
        for read in reads {
            if !analysis.is_local(&read) {
                analysis.bindings.get_mut(&name).unwrap().depends_on_global = true;
            }
            analysis
                .affects
                .entry(read)
                .or_default()
                .insert(name.clone());
        }
    }
}

fn inspect(node: &Node, pure: &mut bool, reads: &mut Vec<String>) {
    if !is_pure_node(node) {
        *pure = false;
    }
    if let Node::Name(name) = node {
        // The synthetic initializer depends on nothing.
        if name != "undefined" {
            reads.push(name.clone());
        }
    }
    node.each_child(&mut |child| inspect(child, pure, reads));
}

/// Saturate the affects graph to a fixed point. Monotone: edges are only
/// added, so repeated sweeps terminate.
pub(crate) fn close_dependencies(analysis: &mut Analysis) {
    let sources: Vec<String> = analysis.affects.keys().cloned().collect();
    loop {
        let mut changed = false;
        for source in &sources {
            let targets: Vec<String> = analysis.affects[source].iter().cloned().collect();
            let mut gained: HashSet<String> = HashSet::new();
            for target in &targets {
                if let Some(indirect) = analysis.affects.get(target) {
                    for beyond in indirect {
                        if !analysis.affects[source].contains(beyond) {
                            gained.insert(beyond.clone());
                        }
                    }
                }
            }
            if gained.is_empty() {
                continue;
            }
            changed = true;
            let source_is_local = analysis.is_local(source);
            for name in gained {
                if !source_is_local {
                    if let Some(binding) = analysis.bindings.get_mut(&name) {
                        binding.depends_on_global = true;
                    }
                }
                analysis
                    .affects
                    .get_mut(source)
                    .unwrap()
                    .insert(name);
            }
        }
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;
    use crate::parser::parse;

    fn analyze(source: &str) -> Analysis {
        let Node::Toplevel(mut body) = parse(source).expect("parse failure") else {
            unreachable!()
        };
        let mut analysis = Analysis::default();
        super::super::scan::scan(&mut body, &mut analysis);
        analyze_initializers(&mut analysis);
        close_dependencies(&mut analysis);
        analysis
    }

    #[test]
    fn direct_edges_and_purity() {
        let a = analyze("var a = x + 1; var b = f();");
        assert!(a.bindings["a"].pure_init);
        assert!(a.affects["x"].contains("a"));
        assert!(!a.bindings["b"].pure_init);
    }

    #[test]
    fn global_read_marks_the_binding() {
        let a = analyze("var local = 1; var viaLocal = local; var viaGlobal = remote;");
        assert!(!a.bindings["viaLocal"].depends_on_global);
        assert!(a.bindings["viaGlobal"].depends_on_global);
    }

    #[test]
    fn closure_reaches_transitive_dependents() {
        let a = analyze("var a = x; var b = a; var c = b;");
        let reachable = &a.affects["x"];
        assert!(reachable.contains("a"));
        assert!(reachable.contains("b"));
        assert!(reachable.contains("c"));
    }

    #[test]
    fn global_flag_propagates_through_the_closure() {
        let a = analyze("var a = remote; var b = a; var c = b;");
        assert!(a.bindings["a"].depends_on_global);
        assert!(a.bindings["b"].depends_on_global);
        assert!(a.bindings["c"].depends_on_global);
    }

    #[test]
    fn synthetic_undefined_is_pure_and_dependency_free() {
        let a = analyze("var a;");
        assert!(a.bindings["a"].pure_init);
        assert!(!a.bindings["a"].depends_on_global);
        assert!(!a.affects.contains_key("undefined"));
    }

    #[test]
    fn edges_only_target_single_defs() {
        let a = analyze("var a = x; a = 2; var b = x;");
        // `a` lost single-def status, so only `b` hangs off `x`.
        let targets = &a.affects["x"];
        assert!(!targets.contains("a"));
        assert!(targets.contains("b"));
    }
}
