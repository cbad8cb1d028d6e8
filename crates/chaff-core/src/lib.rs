//! Post-pass optimizer for machine-generated JavaScript.
//!
//! Compilers that target JavaScript emit one short-lived local per
//! expression operand, which bloats output and defeats later peephole
//! passes. This crate parses such a file, eliminates every temporary whose
//! initializer can be proven safe to substitute at its use site, folds the
//! resulting additive constant chains, and prints the source back out.
//!
//! The interesting part is [`optimize_function`]: a per-function dataflow
//! analysis over declaration facts, initializer purity, a transitive
//! dependency graph, and live ranges with mutation kills. See the
//! `eliminate` module for the phase breakdown.

pub mod ast;
pub mod error;
pub mod fold;
pub mod lexer;
pub mod marker;
pub mod parser;
pub mod printer;
pub mod walk;

mod eliminate;

pub use ast::{AssignOp, BinaryOp, CatchClause, Node, SwitchCase, UnaryOp, VarDecl};
pub use eliminate::optimize_function;
pub use error::Error;
pub use fold::fold_additions;
pub use parser::parse;
pub use printer::print;
pub use walk::{walk, walk_body, Visit};
