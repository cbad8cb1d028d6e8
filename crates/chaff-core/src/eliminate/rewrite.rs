//! Phase 5: the rewrite.
//!
//! Three steps, in order: drop the doomed declarations, collapse references
//! between eliminated initializers to a fixed point, then substitute each
//! remaining use. Initializers are pure by construction, so dropping and
//! duplicating them cannot change behavior; substituted subtrees are cloned
//! because the printer owns the tree afterwards.

use std::collections::HashMap;

use crate::ast::Node;
use crate::walk::{walk, walk_body, Visit};

use super::Analysis;

pub(crate) fn rewrite(body: &mut [Node], analysis: &Analysis) -> usize {
    let mut values: HashMap<String, Node> = analysis
        .bindings
        .iter()
        .filter(|(_, binding)| binding.is_eliminable())
        .map(|(name, binding)| (name.clone(), binding.init.clone()))
        .collect();
    if values.is_empty() {
        return 0;
    }
    let eliminated = values.len();

    strip_declarations(body, &values);
    collapse_values(&mut values);
    substitute_uses(body, &values);
    eliminated
}

/// Remove eliminated bindings from every `var`; a statement left empty
/// becomes the no-op placeholder.
fn strip_declarations(body: &mut [Node], values: &HashMap<String, Node>) {
    walk_body(body, &mut |node| {
        if let Node::Var(decls) = node {
            decls.retain(|decl| !values.contains_key(&decl.name));
            if decls.is_empty() {
                return Visit::Replace(Node::Block(Vec::new()));
            }
        }
        Visit::Descend
    });
}

/// Rewrite references between eliminated initializers until none remain.
/// Terminates because single-def bindings cannot form reference cycles; a
/// self-reference would need two definitions of the same name and is a
/// malformed input, not a recoverable state.
fn collapse_values(values: &mut HashMap<String, Node>) {
    let names: Vec<String> = values.keys().cloned().collect();
    loop {
        let mut changed = false;
        for name in &names {
            let mut value = values.remove(name).unwrap();
            walk(&mut value, &mut |node| {
                if let Node::Name(referenced) = node {
                    assert!(
                        referenced != name,
                        "eliminated binding {name:?} references itself"
                    );
                    if let Some(init) = values.get(referenced.as_str()) {
                        changed = true;
                        return Visit::Replace(init.clone());
                    }
                }
                Visit::Descend
            });
            values.insert(name.clone(), value);
        }
        if !changed {
            break;
        }
    }
}

fn substitute_uses(body: &mut [Node], values: &HashMap<String, Node>) {
    walk_body(body, &mut |node| {
        if let Node::Name(name) = node {
            if let Some(init) = values.get(name.as_str()) {
                return Visit::Replace(init.clone());
            }
        }
        Visit::Descend
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;

    fn name(n: &str) -> Node {
        Node::Name(n.to_string())
    }

    fn add(lhs: Node, rhs: Node) -> Node {
        Node::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[test]
    fn collapse_reaches_a_fixed_point() {
        // a = x + 1, b = a + 2, c = b + 3: c must bottom out in x only.
        let mut values = HashMap::from([
            ("a".to_string(), add(name("x"), Node::Num(1.0))),
            ("b".to_string(), add(name("a"), Node::Num(2.0))),
            ("c".to_string(), add(name("b"), Node::Num(3.0))),
        ]);
        collapse_values(&mut values);
        let expected = add(add(add(name("x"), Node::Num(1.0)), Node::Num(2.0)), Node::Num(3.0));
        assert_eq!(values["c"], expected);
    }

    #[test]
    #[should_panic(expected = "references itself")]
    fn self_reference_fails_loudly() {
        let mut values =
            HashMap::from([("a".to_string(), add(name("a"), Node::Num(1.0)))]);
        collapse_values(&mut values);
    }

    #[test]
    fn strip_replaces_empty_declarations_with_a_noop() {
        let mut body = vec![Node::Var(vec![crate::ast::VarDecl {
            name: "a".to_string(),
            init: Some(Node::Num(1.0)),
        }])];
        let values = HashMap::from([("a".to_string(), Node::Num(1.0))]);
        strip_declarations(&mut body, &values);
        assert_eq!(body, vec![Node::Block(vec![])]);
    }
}
