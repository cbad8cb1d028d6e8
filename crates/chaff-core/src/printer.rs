//! Source text regeneration.
//!
//! Statements print with 2-space indentation; expressions parenthesize by
//! precedence (a child below the context level gets wrapped). An empty
//! `Block` in a statement list prints nothing, so a `var` reduced to the
//! no-op placeholder disappears from the output.

use std::fmt::Write;

use crate::ast::{BinaryOp, Node, UnaryOp, VarDecl};

// Precedence levels, loosest to tightest.
const PREC_SEQ: u8 = 0;
const PREC_ASSIGN: u8 = 1;
const PREC_COND: u8 = 2;
const PREC_UNARY: u8 = 13;
const PREC_POSTFIX: u8 = 14;
const PREC_MEMBER: u8 = 15;
const PREC_PRIMARY: u8 = 16;

/// Print a node to source text. `Toplevel` and statements end with a newline;
/// bare expressions do not.
pub fn print(node: &Node) -> String {
    let mut out = String::new();
    match node {
        Node::Toplevel(body) => print_stmts(body, &mut out, ""),
        _ if is_statement(node) => print_stmt(node, &mut out, ""),
        _ => print_expr(node, &mut out, "", PREC_SEQ),
    }
    out
}

fn is_statement(node: &Node) -> bool {
    matches!(
        node,
        Node::Defun { .. }
            | Node::Block(_)
            | Node::Var(_)
            | Node::Stat(_)
            | Node::Return(_)
            | Node::If { .. }
            | Node::While { .. }
            | Node::Do { .. }
            | Node::For { .. }
            | Node::ForIn { .. }
            | Node::Switch { .. }
            | Node::Try { .. }
            | Node::Throw(_)
            | Node::Label { .. }
            | Node::Break(_)
            | Node::Continue(_)
            | Node::Debugger
    )
}

fn print_stmts(stmts: &[Node], out: &mut String, indent: &str) {
    for stmt in stmts {
        // The rewriter leaves empty blocks where declarations used to be.
        if matches!(stmt, Node::Block(body) if body.is_empty()) {
            continue;
        }
        print_stmt(stmt, out, indent);
    }
}

fn print_stmt(node: &Node, out: &mut String, indent: &str) {
    match node {
        Node::Toplevel(body) | Node::Block(body) => {
            let _ = writeln!(out, "{indent}{{");
            print_stmts(body, out, &child_indent(indent));
            let _ = writeln!(out, "{indent}}}");
        }
        Node::Defun { name, params, body } => {
            let _ = writeln!(out, "{indent}function {name}({}) {{", params.join(", "));
            print_stmts(body, out, &child_indent(indent));
            let _ = writeln!(out, "{indent}}}");
        }
        Node::Var(decls) => {
            out.push_str(indent);
            write_var_fragment(decls, out, indent);
            out.push_str(";\n");
        }
        Node::Stat(expr) => {
            out.push_str(indent);
            if starts_with_function_or_object(expr) {
                out.push('(');
                print_expr(expr, out, indent, PREC_SEQ);
                out.push(')');
            } else {
                print_expr(expr, out, indent, PREC_SEQ);
            }
            out.push_str(";\n");
        }
        Node::Return(value) => {
            out.push_str(indent);
            out.push_str("return");
            if let Some(value) = value {
                out.push(' ');
                print_expr(value, out, indent, PREC_SEQ);
            }
            out.push_str(";\n");
        }
        Node::If { .. } => {
            out.push_str(indent);
            print_if(node, out, indent);
        }
        Node::While { cond, body } => {
            out.push_str(indent);
            out.push_str("while (");
            print_expr(cond, out, indent, PREC_SEQ);
            out.push_str(") ");
            print_braced_body(body, out, indent);
            out.push('\n');
        }
        Node::Do { body, cond } => {
            out.push_str(indent);
            out.push_str("do ");
            print_braced_body(body, out, indent);
            out.push_str(" while (");
            print_expr(cond, out, indent, PREC_SEQ);
            out.push_str(");\n");
        }
        Node::For {
            init,
            cond,
            step,
            body,
        } => {
            out.push_str(indent);
            out.push_str("for (");
            match init.as_deref() {
                Some(Node::Var(decls)) => write_var_fragment(decls, out, indent),
                // A header declaration can collapse to the no-op placeholder.
                Some(Node::Block(body)) if body.is_empty() => {}
                Some(expr) => print_expr(expr, out, indent, PREC_SEQ),
                None => {}
            }
            out.push_str("; ");
            if let Some(cond) = cond {
                print_expr(cond, out, indent, PREC_SEQ);
            }
            out.push_str("; ");
            if let Some(step) = step {
                print_expr(step, out, indent, PREC_SEQ);
            }
            out.push_str(") ");
            print_braced_body(body, out, indent);
            out.push('\n');
        }
        Node::ForIn {
            init,
            key,
            object,
            body,
        } => {
            out.push_str(indent);
            out.push_str("for (");
            match init.as_deref() {
                Some(Node::Var(decls)) => write_var_fragment(decls, out, indent),
                _ => print_expr(key, out, indent, PREC_SEQ),
            }
            out.push_str(" in ");
            print_expr(object, out, indent, PREC_SEQ);
            out.push_str(") ");
            print_braced_body(body, out, indent);
            out.push('\n');
        }
        Node::Switch {
            discriminant,
            cases,
        } => {
            out.push_str(indent);
            out.push_str("switch (");
            print_expr(discriminant, out, indent, PREC_SEQ);
            out.push_str(") {\n");
            let case_indent = child_indent(indent);
            for case in cases {
                out.push_str(&case_indent);
                match &case.test {
                    Some(test) => {
                        out.push_str("case ");
                        print_expr(test, out, &case_indent, PREC_SEQ);
                        out.push_str(":\n");
                    }
                    None => out.push_str("default:\n"),
                }
                print_stmts(&case.body, out, &child_indent(&case_indent));
            }
            let _ = writeln!(out, "{indent}}}");
        }
        Node::Try {
            body,
            catch,
            finally,
        } => {
            let _ = writeln!(out, "{indent}try {{");
            print_stmts(body, out, &child_indent(indent));
            out.push_str(indent);
            out.push('}');
            if let Some(catch) = catch {
                let _ = writeln!(out, " catch ({}) {{", catch.param);
                print_stmts(&catch.body, out, &child_indent(indent));
                out.push_str(indent);
                out.push('}');
            }
            if let Some(finally) = finally {
                out.push_str(" finally {\n");
                print_stmts(finally, out, &child_indent(indent));
                out.push_str(indent);
                out.push('}');
            }
            out.push('\n');
        }
        Node::Throw(value) => {
            out.push_str(indent);
            out.push_str("throw ");
            print_expr(value, out, indent, PREC_SEQ);
            out.push_str(";\n");
        }
        Node::Label { name, body } => {
            let _ = writeln!(out, "{indent}{name}:");
            print_stmt(body, out, indent);
        }
        Node::Break(label) => match label {
            Some(label) => {
                let _ = writeln!(out, "{indent}break {label};");
            }
            None => {
                let _ = writeln!(out, "{indent}break;");
            }
        },
        Node::Continue(label) => match label {
            Some(label) => {
                let _ = writeln!(out, "{indent}continue {label};");
            }
            None => {
                let _ = writeln!(out, "{indent}continue;");
            }
        },
        Node::Debugger => {
            let _ = writeln!(out, "{indent}debugger;");
        }
        expr => {
            out.push_str(indent);
            print_expr(expr, out, indent, PREC_SEQ);
            out.push_str(";\n");
        }
    }
}

/// `if`/`else if` chains share a line with the closing brace.
fn print_if(node: &Node, out: &mut String, indent: &str) {
    let Node::If {
        cond,
        then_branch,
        else_branch,
    } = node
    else {
        unreachable!("print_if requires an if node");
    };
    out.push_str("if (");
    print_expr(cond, out, indent, PREC_SEQ);
    out.push_str(") ");
    print_braced_body(then_branch, out, indent);
    match else_branch.as_deref() {
        None => out.push('\n'),
        Some(chained @ Node::If { .. }) => {
            out.push_str(" else ");
            print_if(chained, out, indent);
        }
        Some(other) => {
            out.push_str(" else ");
            print_braced_body(other, out, indent);
            out.push('\n');
        }
    }
}

/// Print a loop/branch body as a braced block regardless of its node shape.
fn print_braced_body(body: &Node, out: &mut String, indent: &str) {
    out.push_str("{\n");
    let inner = child_indent(indent);
    match body {
        Node::Block(stmts) => print_stmts(stmts, out, &inner),
        other => print_stmt(other, out, &inner),
    }
    out.push_str(indent);
    out.push('}');
}

fn child_indent(indent: &str) -> String {
    format!("{indent}  ")
}

fn write_var_fragment(decls: &[VarDecl], out: &mut String, indent: &str) {
    out.push_str("var ");
    for (i, decl) in decls.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&decl.name);
        if let Some(init) = &decl.init {
            out.push_str(" = ");
            print_expr(init, out, indent, PREC_ASSIGN);
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

fn bin_prec(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::LogicalOr => 3,
        BinaryOp::LogicalAnd => 4,
        BinaryOp::BitOr => 5,
        BinaryOp::BitXor => 6,
        BinaryOp::BitAnd => 7,
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::StrictEq | BinaryOp::StrictNe => 8,
        BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge
        | BinaryOp::In
        | BinaryOp::Instanceof => 9,
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 10,
        BinaryOp::Add | BinaryOp::Sub => 11,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 12,
    }
}

fn prec(node: &Node) -> u8 {
    match node {
        Node::Seq { .. } => PREC_SEQ,
        Node::Assign { .. } => PREC_ASSIGN,
        Node::Conditional { .. } => PREC_COND,
        Node::Binary { op, .. } => bin_prec(*op),
        Node::UnaryPrefix { .. } => PREC_UNARY,
        // A folded constant can be negative; it prints with a leading minus.
        Node::Num(n) if *n < 0.0 => PREC_UNARY,
        Node::UnaryPostfix { .. } => PREC_POSTFIX,
        Node::Call { .. } | Node::New { .. } | Node::Dot { .. } | Node::Sub { .. } => PREC_MEMBER,
        _ => PREC_PRIMARY,
    }
}

fn print_expr(node: &Node, out: &mut String, indent: &str, min_prec: u8) {
    if prec(node) < min_prec {
        out.push('(');
        print_expr(node, out, indent, PREC_SEQ);
        out.push(')');
        return;
    }

    match node {
        Node::Name(name) => out.push_str(name),
        Node::Num(value) => write_num(out, *value),
        Node::Str(value) => write_str(out, value),
        Node::Array(elems) => {
            out.push('[');
            for (i, elem) in elems.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                print_expr(elem, out, indent, PREC_ASSIGN);
            }
            out.push(']');
        }
        Node::Object(fields) => {
            if fields.is_empty() {
                out.push_str("{}");
            } else {
                out.push_str("{ ");
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_object_key(out, key);
                    out.push_str(": ");
                    print_expr(value, out, indent, PREC_ASSIGN);
                }
                out.push_str(" }");
            }
        }
        Node::Binary { op, lhs, rhs } => {
            let level = bin_prec(*op);
            print_expr(lhs, out, indent, level);
            let _ = write!(out, " {} ", op.as_str());
            print_expr(rhs, out, indent, level + 1);
        }
        Node::UnaryPrefix { op, expr } => {
            out.push_str(op.as_str());
            let mut operand = String::new();
            print_expr(expr, &mut operand, indent, PREC_UNARY);
            // `- -x` and `+ +x` must not collapse into `--x` / `++x`.
            if op.is_word()
                || (matches!(op, UnaryOp::Neg | UnaryOp::Dec) && operand.starts_with('-'))
                || (matches!(op, UnaryOp::Plus | UnaryOp::Inc) && operand.starts_with('+'))
            {
                out.push(' ');
            }
            out.push_str(&operand);
        }
        Node::UnaryPostfix { op, expr } => {
            print_expr(expr, out, indent, PREC_POSTFIX);
            out.push_str(op.as_str());
        }
        Node::Assign { op, target, value } => {
            print_expr(target, out, indent, PREC_COND);
            let _ = write!(out, " {} ", op.as_str());
            print_expr(value, out, indent, PREC_ASSIGN);
        }
        Node::Conditional {
            cond,
            then_val,
            else_val,
        } => {
            print_expr(cond, out, indent, PREC_COND + 1);
            out.push_str(" ? ");
            print_expr(then_val, out, indent, PREC_ASSIGN);
            out.push_str(" : ");
            print_expr(else_val, out, indent, PREC_ASSIGN);
        }
        Node::Seq { first, second } => {
            print_expr(first, out, indent, PREC_SEQ);
            out.push_str(", ");
            print_expr(second, out, indent, PREC_ASSIGN);
        }
        Node::Dot { object, field } => {
            // `5..toString()` territory: a numeric object needs parens.
            if matches!(object.as_ref(), Node::Num(_)) {
                out.push('(');
                print_expr(object, out, indent, PREC_SEQ);
                out.push(')');
            } else {
                print_expr(object, out, indent, PREC_MEMBER);
            }
            out.push('.');
            out.push_str(field);
        }
        Node::Sub { object, index } => {
            print_expr(object, out, indent, PREC_MEMBER);
            out.push('[');
            print_expr(index, out, indent, PREC_SEQ);
            out.push(']');
        }
        Node::Call { callee, args } => {
            print_expr(callee, out, indent, PREC_MEMBER);
            write_args(args, out, indent);
        }
        Node::New { callee, args } => {
            out.push_str("new ");
            print_expr(callee, out, indent, PREC_MEMBER);
            write_args(args, out, indent);
        }
        Node::Function { name, params, body } => {
            match name {
                Some(name) => {
                    let _ = write!(out, "function {name}({}) {{\n", params.join(", "));
                }
                None => {
                    let _ = write!(out, "function ({}) {{\n", params.join(", "));
                }
            }
            print_stmts(body, out, &child_indent(indent));
            out.push_str(indent);
            out.push('}');
        }
        other => {
            // Statement kinds never reach expression position.
            unreachable!("not an expression: {other:?}");
        }
    }
}

fn write_args(args: &[Node], out: &mut String, indent: &str) {
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        print_expr(arg, out, indent, PREC_ASSIGN);
    }
    out.push(')');
}

/// Integral values print without a fraction; everything else uses the
/// shortest round-trip form.
pub(crate) fn write_num(out: &mut String, value: f64) {
    if value == value.trunc() && value.is_finite() && value.abs() < 1e15 {
        let _ = write!(out, "{}", value as i64);
    } else {
        let _ = write!(out, "{value}");
    }
}

fn write_str(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_object_key(out: &mut String, key: &str) {
    let plain = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$')
        && !key.as_bytes()[0].is_ascii_digit();
    if plain {
        out.push_str(key);
    } else {
        write_str(out, key);
    }
}

/// Would the expression's leftmost token be `function` or `{`? Such
/// statements must print parenthesized.
fn starts_with_function_or_object(node: &Node) -> bool {
    match node {
        Node::Function { .. } | Node::Object(_) => true,
        Node::Binary { lhs, .. } => starts_with_function_or_object(lhs),
        Node::Assign { target, .. } => starts_with_function_or_object(target),
        Node::Seq { first, .. } => starts_with_function_or_object(first),
        Node::Conditional { cond, .. } => starts_with_function_or_object(cond),
        Node::Call { callee, .. } => starts_with_function_or_object(callee),
        Node::Dot { object, .. } | Node::Sub { object, .. } => {
            starts_with_function_or_object(object)
        }
        Node::UnaryPostfix { expr, .. } => starts_with_function_or_object(expr),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn roundtrip(source: &str) -> String {
        print(&parse(source).expect("parse failure"))
    }

    /// Parsing the printer's output reproduces the same text.
    #[test]
    fn print_is_a_fixpoint() {
        let sources = [
            "function f(x) {\n  var a = x + 1;\n  return a;\n}\n",
            "if (a) {\n  b();\n} else if (c) {\n  d();\n} else {\n  e();\n}\n",
            "for (var i = 0; i < 10; i++) {\n  f(i);\n}\n",
            "x = a ? b : c, y = -(-z);\n",
        ];
        for source in sources {
            let once = roundtrip(source);
            assert_eq!(once, roundtrip(&once), "not a fixpoint: {source}");
        }
    }

    #[test]
    fn precedence_forces_parens() {
        assert_eq!(roundtrip("x = (a + b) * c;"), "x = (a + b) * c;\n");
        assert_eq!(roundtrip("x = a + b * c;"), "x = a + b * c;\n");
        assert_eq!(roundtrip("x = (a, b);"), "x = (a, b);\n");
        assert_eq!(roundtrip("f((a, b), c);"), "f((a, b), c);\n");
    }

    #[test]
    fn nested_minus_keeps_a_space() {
        assert_eq!(roundtrip("x = -(-y);"), "x = - -y;\n");
        assert_eq!(roundtrip("x = a - -b;"), "x = a - -b;\n");
    }

    #[test]
    fn numbers_print_canonically() {
        assert_eq!(roundtrip("x = 3;"), "x = 3;\n");
        assert_eq!(roundtrip("x = 0x10;"), "x = 16;\n");
        assert_eq!(roundtrip("x = 1.5;"), "x = 1.5;\n");
    }

    #[test]
    fn empty_block_prints_nothing_in_statement_lists() {
        assert_eq!(roundtrip(";\nreturn 0;"), "return 0;\n");
    }

    #[test]
    fn function_expression_statement_is_parenthesized() {
        assert_eq!(
            roundtrip("(function () {\n  g();\n})();"),
            "(function () {\n  g();\n})();\n"
        );
    }
}
