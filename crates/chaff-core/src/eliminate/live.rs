//! Phase 4: live ranges and dependency clobbers.
//!
//! A binding becomes live at its declaration and dies when a dependency is
//! mutated, when control flow could clobber it, or when it is used. A use
//! that finds its binding dead sets `deps_mutated`: substituting there
//! could observe a stale value.
//!
//! The traversal is structured, not flat. Branching constructs fork the
//! live set from a snapshot and join by intersection; loops conservatively
//! empty it at both boundaries, which avoids modeling back-edges.

use std::collections::HashSet;

use crate::ast::{Node, UnaryOp};

use super::{base_name, collect_names, Analysis};

pub(crate) fn analyze(body: &[Node], analysis: &mut Analysis) {
    let mut scanner = LiveScan {
        analysis,
        live: HashSet::new(),
    };
    scanner.scan_stmts(body);
}

struct LiveScan<'a> {
    analysis: &'a mut Analysis,
    live: HashSet<String>,
}

impl LiveScan<'_> {
    fn scan_stmts(&mut self, stmts: &[Node]) {
        for stmt in stmts {
            self.scan(stmt);
        }
    }

    fn scan(&mut self, node: &Node) {
        match node {
            Node::Var(decls) => {
                for decl in decls {
                    // The initializer runs first and may clobber on its own.
                    if let Some(init) = &decl.init {
                        self.scan(init);
                    }
                    if self.analysis.bindings[&decl.name].single_def {
                        self.live.insert(decl.name.clone());
                    }
                    // The name now has a value; anything recorded against an
                    // earlier definition of it has gone stale.
                    self.kill_dependents(&decl.name);
                }
            }

            Node::Name(name) => {
                if let Some(binding) = self.analysis.bindings.get_mut(name.as_str()) {
                    if binding.single_def && !self.live.remove(name.as_str()) {
                        binding.deps_mutated = true;
                    }
                }
            }

            Node::Assign { target, value, .. } => {
                if let Some(base) = base_name(target) {
                    self.kill_dependents(base);
                }
                // An assignment can run setters and coercions; a binding
                // built on non-locals survives only if consumed right here.
                let mut referenced = HashSet::new();
                collect_names(node, &mut referenced);
                let bindings = &self.analysis.bindings;
                self.live
                    .retain(|name| !bindings[name].depends_on_global || referenced.contains(name));
                self.scan(target);
                self.scan(value);
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
                    self.kill_dependents(base);
                }
                self.scan(expr);
            }

            Node::Call { .. } | Node::New { .. } | Node::Throw(_) | Node::Debugger => {
                self.control_flow_kill(node);
                node.each_child(&mut |child| self.scan(child));
            }

            Node::Label { body, .. } => {
                self.control_flow_kill(node);
                self.scan(body);
            }

            Node::Function { .. } | Node::Defun { .. } => {
                // Opaque: the body runs at an unknown time.
                self.live.clear();
            }

            Node::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let entry = self.live.clone();
                let mut merged = entry.clone();
                self.scan_branch(&entry, &mut merged, |s| s.scan(cond));
                self.scan_branch(&entry, &mut merged, |s| s.scan(then_branch));
                if let Some(else_branch) = else_branch {
                    self.scan_branch(&entry, &mut merged, |s| s.scan(else_branch));
                }
                self.live = merged;
            }

            Node::Try {
                body,
                catch,
                finally,
            } => {
                let entry = self.live.clone();
                let mut merged = entry.clone();
                self.scan_branch(&entry, &mut merged, |s| s.scan_stmts(body));
                if let Some(catch) = catch {
                    self.scan_branch(&entry, &mut merged, |s| s.scan_stmts(&catch.body));
                }
                if let Some(finally) = finally {
                    self.scan_branch(&entry, &mut merged, |s| s.scan_stmts(finally));
                }
                self.live = merged;
            }

            Node::Switch {
                discriminant,
                cases,
            } => {
                self.scan(discriminant);
                let entry = self.live.clone();
                let mut merged = entry.clone();
                for case in cases {
                    self.scan_branch(&entry, &mut merged, |s| {
                        if let Some(test) = &case.test {
                            s.scan(test);
                        }
                        s.scan_stmts(&case.body);
                    });
                }
                self.live = merged;
            }

            Node::While { cond, body } => self.scan_loop(|s| {
                s.scan(cond);
                s.scan(body);
            }),
            Node::Do { body, cond } => self.scan_loop(|s| {
                s.scan(body);
                s.scan(cond);
            }),
            Node::For {
                init,
                cond,
                step,
                body,
            } => self.scan_loop(|s| {
                for part in [init, cond, step].into_iter().flatten() {
                    s.scan(part);
                }
                s.scan(body);
            }),
            Node::ForIn {
                init,
                key,
                object,
                body,
            } => self.scan_loop(|s| {
                // The header `var` is opaque, like everywhere else.
                if let Some(init) = init {
                    if !matches!(**init, Node::Var(_)) {
                        s.scan(init);
                    }
                }
                s.scan(key);
                s.scan(object);
                s.scan(body);
            }),

            other => other.each_child(&mut |child| self.scan(child)),
        }
    }

    /// Run one branch from a snapshot of the live set, then intersect the
    /// survivors into `merged`.
    fn scan_branch(
        &mut self,
        entry: &HashSet<String>,
        merged: &mut HashSet<String>,
        branch: impl FnOnce(&mut Self),
    ) {
        self.live = entry.clone();
        branch(self);
        merged.retain(|name| self.live.contains(name));
    }

    /// Nothing stays live across a loop boundary, in either direction.
    fn scan_loop(&mut self, inner: impl FnOnce(&mut Self)) {
        self.live.clear();
        inner(self);
        self.live.clear();
    }

    /// Kill every binding whose recorded initializer transitively reads
    /// `name`.
    fn kill_dependents(&mut self, name: &str) {
        if let Some(dependents) = self.analysis.affects.get(name) {
            for dependent in dependents {
                self.live.remove(dependent);
            }
        }
    }

    /// A call, construction, throw, label, or debugger stop may mutate any
    /// non-local and may not return. Only bindings built purely from locals
    /// and consumed in this very statement survive.
    fn control_flow_kill(&mut self, node: &Node) {
        let mut referenced = HashSet::new();
        collect_names(node, &mut referenced);
        let bindings = &self.analysis.bindings;
        self.live
            .retain(|name| !bindings[name].depends_on_global && referenced.contains(name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    /// Run phases 1-4 on a source body.
    fn analyze_source(source: &str) -> Analysis {
        let Node::Toplevel(mut body) = parse(source).expect("parse failure") else {
            unreachable!()
        };
        let mut analysis = Analysis::default();
        super::super::scan::scan(&mut body, &mut analysis);
        super::super::deps::analyze_initializers(&mut analysis);
        super::super::deps::close_dependencies(&mut analysis);
        analyze(&body, &mut analysis);
        analysis
    }

    fn deps_mutated(analysis: &Analysis, name: &str) -> bool {
        analysis.bindings[name].deps_mutated
    }

    #[test]
    fn straight_line_use_is_clean() {
        let a = analyze_source("var a = x + 1; return a;");
        assert!(!deps_mutated(&a, "a"));
    }

    #[test]
    fn dependency_write_kills_the_range() {
        let a = analyze_source("var a = x + 1; x = 2; return a;");
        assert!(deps_mutated(&a, "a"));
    }

    #[test]
    fn dependency_increment_kills_the_range() {
        let a = analyze_source("var a = x + 1; x++; return a;");
        assert!(deps_mutated(&a, "a"));
    }

    #[test]
    fn transitive_dependency_write_kills_the_range() {
        let a = analyze_source("var b = x; var a = b + 1; x = 2; return a;");
        assert!(deps_mutated(&a, "a"));
    }

    #[test]
    fn call_kills_global_dependent_bindings() {
        let a = analyze_source("var a = remote; g(); return a;");
        assert!(deps_mutated(&a, "a"));
    }

    #[test]
    fn call_spares_a_binding_consumed_in_the_same_statement() {
        let a = analyze_source("var one = 1; var a = one + 1; g(a);");
        assert!(!deps_mutated(&a, "a"));
    }

    #[test]
    fn call_kills_bindings_it_does_not_mention() {
        let a = analyze_source("var one = 1; var a = one + 1; g(); return a;");
        assert!(deps_mutated(&a, "a"));
    }

    #[test]
    fn redefinition_of_a_dependency_kills_dependents() {
        // `a` records the parameter `x`; the inner `var x` then gives the
        // name a new value, so substituting `a` later would read the wrong
        // slot.
        let a = analyze_source("var a = x + 1; var x = 0; return a;");
        assert!(deps_mutated(&a, "a"));
    }

    #[test]
    fn branches_join_by_intersection() {
        let a = analyze_source("var a = x + 1; if (c) { x = 2; } return a;");
        assert!(deps_mutated(&a, "a"));
        let b = analyze_source("var a = x + 1; if (c) { y = 2; } return a;");
        assert!(!deps_mutated(&b, "a"));
    }

    #[test]
    fn use_inside_a_branch_with_no_clobber_is_clean() {
        let a = analyze_source("var a = x + 1; if (c) { return a; } return 0;");
        assert!(!deps_mutated(&a, "a"));
    }

    #[test]
    fn loops_are_barriers_in_both_directions() {
        // Declared before the loop, used inside it.
        let a = analyze_source("var a = x + 1; while (c) { h[0] = a; }");
        assert!(deps_mutated(&a, "a"));
        // Declared inside the loop, used after it.
        let b = analyze_source("while (c) { var a = x + 1; } return a;");
        assert!(deps_mutated(&b, "a"));
    }

    #[test]
    fn use_within_one_loop_iteration_is_clean() {
        let a = analyze_source("while (c) { var a = x + 1; h[0] = a; }");
        assert!(!deps_mutated(&a, "a"));
    }

    #[test]
    fn second_use_sees_a_dead_binding() {
        let a = analyze_source("var one = 1; var a = one + 1; f(a, a);");
        // First use consumes the range; the second observes it dead.
        assert!(deps_mutated(&a, "a"));
    }

    #[test]
    fn throw_and_new_are_clobbers() {
        let a = analyze_source("var a = remote; throw e; return a;");
        assert!(deps_mutated(&a, "a"));
        let b = analyze_source("var b = remote; var o = new C(); return b;");
        assert!(deps_mutated(&b, "b"));
    }

    #[test]
    fn assignment_spares_local_only_bindings() {
        let a = analyze_source("var one = 1; var a = one + 1; y = 2; return a;");
        assert!(!deps_mutated(&a, "a"));
    }

    #[test]
    fn assignment_kills_unconsumed_global_dependents() {
        let a = analyze_source("var a = remote; y = 2; return a;");
        assert!(deps_mutated(&a, "a"));
    }
}
