//! Generic pre-order traversal with in-place replacement.
//!
//! Every pass in this crate is a visitor over this walker. The observer sees
//! each node before its children and answers with a [`Visit`]: descend,
//! splice a replacement into the parent slot (the replacement itself is not
//! traversed), or stop the whole traversal.

use crate::ast::Node;

/// Observer verdict for one visited node.
pub enum Visit {
    /// Keep the node and traverse its children.
    Descend,
    /// Overwrite the node in place; the replacement subtree is not traversed.
    Replace(Node),
    /// Abort the entire traversal.
    Stop,
}

/// Walk `node` pre-order. Returns `false` if the observer stopped the
/// traversal, `true` otherwise.
pub fn walk<F>(node: &mut Node, f: &mut F) -> bool
where
    F: FnMut(&mut Node) -> Visit,
{
    match f(node) {
        Visit::Replace(replacement) => {
            *node = replacement;
            true
        }
        Visit::Stop => false,
        Visit::Descend => walk_children(node, f),
    }
}

/// Walk a statement list in order.
pub fn walk_body<F>(body: &mut [Node], f: &mut F) -> bool
where
    F: FnMut(&mut Node) -> Visit,
{
    for stmt in body {
        if !walk(stmt, f) {
            return false;
        }
    }
    true
}

fn walk_opt<F>(slot: &mut Option<Box<Node>>, f: &mut F) -> bool
where
    F: FnMut(&mut Node) -> Visit,
{
    match slot {
        Some(node) => walk(node, f),
        None => true,
    }
}

fn walk_children<F>(node: &mut Node, f: &mut F) -> bool
where
    F: FnMut(&mut Node) -> Visit,
{
    match node {
        Node::Toplevel(body) | Node::Block(body) => walk_body(body, f),
        Node::Defun { body, .. } | Node::Function { body, .. } => walk_body(body, f),
        Node::Var(decls) => {
            for decl in decls {
                if let Some(init) = &mut decl.init {
                    if !walk(init, f) {
                        return false;
                    }
                }
            }
            true
        }
        Node::Stat(expr) | Node::Throw(expr) => walk(expr, f),
        Node::Return(value) => match value {
            Some(value) => walk(value, f),
            None => true,
        },
        Node::If {
            cond,
            then_branch,
            else_branch,
        } => walk(cond, f) && walk(then_branch, f) && walk_opt(else_branch, f),
        Node::While { cond, body } => walk(cond, f) && walk(body, f),
        Node::Do { body, cond } => walk(body, f) && walk(cond, f),
        Node::For {
            init,
            cond,
            step,
            body,
        } => walk_opt(init, f) && walk_opt(cond, f) && walk_opt(step, f) && walk(body, f),
        Node::ForIn {
            init,
            key,
            object,
            body,
        } => {
            // The iterated binding is opaque to every pass: a `var` child of
            // a for-in header is never visited.
            if let Some(init) = init {
                if !matches!(**init, Node::Var(_)) && !walk(init, f) {
                    return false;
                }
            }
            walk(key, f) && walk(object, f) && walk(body, f)
        }
        Node::Switch {
            discriminant,
            cases,
        } => {
            if !walk(discriminant, f) {
                return false;
            }
            for case in cases {
                if let Some(test) = &mut case.test {
                    if !walk(test, f) {
                        return false;
                    }
                }
                if !walk_body(&mut case.body, f) {
                    return false;
                }
            }
            true
        }
        Node::Try {
            body,
            catch,
            finally,
        } => {
            if !walk_body(body, f) {
                return false;
            }
            if let Some(catch) = catch {
                if !walk_body(&mut catch.body, f) {
                    return false;
                }
            }
            match finally {
                Some(finally) => walk_body(finally, f),
                None => true,
            }
        }
        Node::Label { body, .. } => walk(body, f),
        Node::Array(elems) => walk_body(elems, f),
        Node::Object(fields) => {
            for (_, value) in fields {
                if !walk(value, f) {
                    return false;
                }
            }
            true
        }
        Node::Binary { lhs, rhs, .. } => walk(lhs, f) && walk(rhs, f),
        Node::UnaryPrefix { expr, .. } | Node::UnaryPostfix { expr, .. } => walk(expr, f),
        Node::Assign { target, value, .. } => walk(target, f) && walk(value, f),
        Node::Conditional {
            cond,
            then_val,
            else_val,
        } => walk(cond, f) && walk(then_val, f) && walk(else_val, f),
        Node::Seq { first, second } => walk(first, f) && walk(second, f),
        Node::Dot { object, .. } => walk(object, f),
        Node::Sub { object, index } => walk(object, f) && walk(index, f),
        Node::Call { callee, args } | Node::New { callee, args } => {
            walk(callee, f) && walk_body(args, f)
        }
        Node::Break(_)
        | Node::Continue(_)
        | Node::Debugger
        | Node::Name(_)
        | Node::Num(_)
        | Node::Str(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Node, VarDecl};

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

    /// Replacement splices into the parent slot and is not re-traversed.
    #[test]
    fn replacement_splices_in_place() {
        let mut tree = Node::Stat(Box::new(add(name("a"), name("b"))));
        let mut visited = Vec::new();
        walk(&mut tree, &mut |node| {
            if let Node::Name(n) = node {
                visited.push(n.clone());
                if n == "a" {
                    return Visit::Replace(add(name("x"), name("y")));
                }
            }
            Visit::Descend
        });
        // `x`/`y` live inside a replacement subtree, so they are not visited.
        assert_eq!(visited, vec!["a".to_string(), "b".to_string()]);
        let expected = Node::Stat(Box::new(add(add(name("x"), name("y")), name("b"))));
        assert_eq!(tree, expected);
    }

    /// Stop aborts the traversal across sibling subtrees.
    #[test]
    fn stop_aborts_everything() {
        let mut tree = Node::Block(vec![
            Node::Stat(Box::new(name("a"))),
            Node::Stat(Box::new(name("b"))),
        ]);
        let mut visited = Vec::new();
        let finished = walk(&mut tree, &mut |node| {
            if let Node::Name(n) = node {
                visited.push(n.clone());
                return Visit::Stop;
            }
            Visit::Descend
        });
        assert!(!finished);
        assert_eq!(visited, vec!["a".to_string()]);
    }

    /// A for-in header's `var` child is opaque; the key name is still seen.
    #[test]
    fn for_in_var_child_is_skipped() {
        let mut tree = Node::ForIn {
            init: Some(Box::new(Node::Var(vec![VarDecl {
                name: "k".to_string(),
                init: Some(name("leak")),
            }]))),
            key: Box::new(name("k")),
            object: Box::new(name("obj")),
            body: Box::new(Node::Block(vec![])),
        };
        let mut visited = Vec::new();
        walk(&mut tree, &mut |node| {
            if let Node::Name(n) = node {
                visited.push(n.clone());
            }
            Visit::Descend
        });
        assert_eq!(visited, vec!["k".to_string(), "obj".to_string()]);
    }
}
