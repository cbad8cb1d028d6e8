//! Additive chain folding.
//!
//! Generated code strings additions together one operand at a time, so a
//! chain like `1 + 2 + x + 3` is common after elimination. This pass sums
//! the literal leaves of each maximal `+` chain and rebuilds it with the
//! constant innermost: `((6) + x)`. Any leaf that is not a number or a
//! name, or any nested operator other than `+`, leaves the chain untouched.

use crate::ast::{BinaryOp, Node};
use crate::walk::{walk, Visit};

/// Fold additive chains under `node`, in place.
pub fn fold_additions(node: &mut Node) {
    walk(node, &mut |candidate| {
        if let Node::Binary {
            op: BinaryOp::Add, ..
        } = candidate
        {
            if let Some(folded) = fold_chain(candidate) {
                // The replacement is not re-traversed; the chain was
                // consumed whole.
                return Visit::Replace(folded);
            }
        }
        Visit::Descend
    });
}

fn fold_chain(root: &Node) -> Option<Node> {
    let mut sum = 0.0;
    let mut literals = 0usize;
    let mut names = Vec::new();
    gather(root, &mut sum, &mut literals, &mut names)?;
    if literals == 0 {
        return None;
    }

    let mut chain = Node::Num(sum);
    for name in names {
        chain = Node::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(chain),
            rhs: Box::new(Node::Name(name)),
        };
    }
    Some(chain)
}

/// Collect the leaves of a `+` chain in encounter order. `None` aborts the
/// whole fold.
fn gather(node: &Node, sum: &mut f64, literals: &mut usize, names: &mut Vec<String>) -> Option<()> {
    match node {
        Node::Binary {
            op: BinaryOp::Add,
            lhs,
            rhs,
        } => {
            gather(lhs, sum, literals, names)?;
            gather(rhs, sum, literals, names)
        }
        Node::Num(value) => {
            *sum += value;
            *literals += 1;
            Some(())
        }
        Node::Name(name) => {
            names.push(name.clone());
            Some(())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::printer::print;

    fn fold_source(source: &str) -> String {
        let mut ast = parse(source).expect("parse failure");
        fold_additions(&mut ast);
        print(&ast)
    }

    #[test]
    fn literals_sum_into_the_innermost_slot() {
        assert_eq!(fold_source("var a = 1 + 2 + x;"), "var a = 3 + x;\n");
        assert_eq!(fold_source("var a = x + 1 + y + 2;"), "var a = 3 + x + y;\n");
    }

    #[test]
    fn all_literal_chain_becomes_one_constant() {
        assert_eq!(fold_source("var a = 1 + 2 + 3;"), "var a = 6;\n");
    }

    #[test]
    fn chains_without_a_literal_are_untouched() {
        assert_eq!(fold_source("var a = x + y;"), "var a = x + y;\n");
    }

    #[test]
    fn foreign_operands_abort_the_chain() {
        // The outer chain is left alone; pure sub-chains still fold on the
        // way down.
        assert_eq!(fold_source("var a = 1 + 2 + f(x);"), "var a = 3 + f(x);\n");
        assert_eq!(fold_source("var a = x - (1 + y) + 2;"), "var a = x - (1 + y) + 2;\n");
    }

    #[test]
    fn inner_chains_under_other_operators_still_fold() {
        assert_eq!(fold_source("var a = (1 + 2 + x) * y;"), "var a = (3 + x) * y;\n");
        assert_eq!(fold_source("f(1 + 2 + x, 3 + 4);"), "f(3 + x, 7);\n");
    }

    #[test]
    fn folding_is_idempotent() {
        let once = fold_source("var a = 1 + 2 + x + y;");
        let mut ast = parse(&once).expect("parse failure");
        fold_additions(&mut ast);
        assert_eq!(print(&ast), once);
    }
}
