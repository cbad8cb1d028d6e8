//! Recursive descent parser for the generated-JavaScript dialect.
//!
//! Fails fast on the first malformed construct: the input is machine
//! emitted, so an error means the file is not ours to optimize.

use crate::ast::{AssignOp, BinaryOp, CatchClause, Node, SwitchCase, UnaryOp, VarDecl};
use crate::error::Error;
use crate::lexer::{Lexer, Token, TokenKind};

/// Parse a whole source file into a [`Node::Toplevel`].
pub fn parse(source: &str) -> Result<Node, Error> {
    let mut parser = Parser::new(source)?;
    let mut body = Vec::new();
    while parser.current.kind != TokenKind::Eof {
        body.push(parser.parse_statement()?);
    }
    Ok(Node::Toplevel(body))
}

/// Words that can never appear as a plain `Name` in expression position.
const RESERVED: &[&str] = &[
    "break", "case", "catch", "continue", "debugger", "default", "delete", "do", "else",
    "finally", "for", "function", "if", "in", "instanceof", "new", "return", "switch", "throw",
    "try", "typeof", "var", "void", "while",
];

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self, Error> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn bump(&mut self) -> Result<Token, Error> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            line: self.current.line,
            col: self.current.col,
            message: message.into(),
        }
    }

    fn at_punct(&self, punct: &str) -> bool {
        matches!(&self.current.kind, TokenKind::Punct(p) if *p == punct)
    }

    fn eat_punct(&mut self, punct: &str) -> Result<bool, Error> {
        if self.at_punct(punct) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), Error> {
        if self.eat_punct(punct)? {
            Ok(())
        } else {
            Err(self.error(format!("expected {punct:?}, found {:?}", self.current.kind)))
        }
    }

    fn at_word(&self, word: &str) -> bool {
        matches!(&self.current.kind, TokenKind::Ident(w) if w == word)
    }

    fn eat_word(&mut self, word: &str) -> Result<bool, Error> {
        if self.at_word(word) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_ident(&mut self) -> Result<String, Error> {
        match &self.current.kind {
            TokenKind::Ident(w) if !RESERVED.contains(&w.as_str()) => {
                let w = w.clone();
                self.bump()?;
                Ok(w)
            }
            other => Err(self.error(format!("expected identifier, found {other:?}"))),
        }
    }

    /// Consume a statement terminator: `;`, or nothing before `}` / EOF.
    fn semicolon(&mut self) -> Result<(), Error> {
        if self.eat_punct(";")? || self.at_punct("}") || self.current.kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.error(format!("expected \";\", found {:?}", self.current.kind)))
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Node, Error> {
        match &self.current.kind {
            TokenKind::Punct("{") => {
                self.bump()?;
                Ok(Node::Block(self.parse_block_body()?))
            }
            TokenKind::Punct(";") => {
                self.bump()?;
                Ok(Node::Block(Vec::new()))
            }
            TokenKind::Ident(word) => match word.as_str() {
                "var" => {
                    self.bump()?;
                    let decls = self.parse_var_decls(false)?;
                    self.semicolon()?;
                    Ok(Node::Var(decls))
                }
                "function" => self.parse_defun(),
                "if" => self.parse_if(),
                "while" => {
                    self.bump()?;
                    self.expect_punct("(")?;
                    let cond = self.parse_expression(false)?;
                    self.expect_punct(")")?;
                    let body = self.parse_statement()?;
                    Ok(Node::While {
                        cond: Box::new(cond),
                        body: Box::new(body),
                    })
                }
                "do" => {
                    self.bump()?;
                    let body = self.parse_statement()?;
                    if !self.eat_word("while")? {
                        return Err(self.error("expected \"while\" after do body"));
                    }
                    self.expect_punct("(")?;
                    let cond = self.parse_expression(false)?;
                    self.expect_punct(")")?;
                    self.semicolon()?;
                    Ok(Node::Do {
                        body: Box::new(body),
                        cond: Box::new(cond),
                    })
                }
                "for" => self.parse_for(),
                "return" => {
                    self.bump()?;
                    let value = if self.at_punct(";")
                        || self.at_punct("}")
                        || self.current.kind == TokenKind::Eof
                    {
                        None
                    } else {
                        Some(Box::new(self.parse_expression(false)?))
                    };
                    self.semicolon()?;
                    Ok(Node::Return(value))
                }
                "break" => {
                    self.bump()?;
                    let label = self.parse_opt_label()?;
                    self.semicolon()?;
                    Ok(Node::Break(label))
                }
                "continue" => {
                    self.bump()?;
                    let label = self.parse_opt_label()?;
                    self.semicolon()?;
                    Ok(Node::Continue(label))
                }
                "switch" => self.parse_switch(),
                "try" => self.parse_try(),
                "throw" => {
                    self.bump()?;
                    let value = self.parse_expression(false)?;
                    self.semicolon()?;
                    Ok(Node::Throw(Box::new(value)))
                }
                "debugger" => {
                    self.bump()?;
                    self.semicolon()?;
                    Ok(Node::Debugger)
                }
                word if !RESERVED.contains(&word) => {
                    // A lone identifier followed by `:` is a label.
                    if let TokenKind::Punct(":") = self.lexer.peek_token()?.kind {
                        let name = word.to_string();
                        self.bump()?;
                        self.bump()?;
                        let body = self.parse_statement()?;
                        return Ok(Node::Label {
                            name,
                            body: Box::new(body),
                        });
                    }
                    self.parse_expression_statement()
                }
                _ => self.parse_expression_statement(),
            },
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Node, Error> {
        let expr = self.parse_expression(false)?;
        self.semicolon()?;
        Ok(Node::Stat(Box::new(expr)))
    }

    fn parse_opt_label(&mut self) -> Result<Option<String>, Error> {
        match &self.current.kind {
            TokenKind::Ident(w) if !RESERVED.contains(&w.as_str()) => {
                let w = w.clone();
                self.bump()?;
                Ok(Some(w))
            }
            _ => Ok(None),
        }
    }

    /// Statements up to and including a closing `}`.
    fn parse_block_body(&mut self) -> Result<Vec<Node>, Error> {
        let mut body = Vec::new();
        while !self.eat_punct("}")? {
            if self.current.kind == TokenKind::Eof {
                return Err(self.error("unexpected end of input in block"));
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_var_decls(&mut self, no_in: bool) -> Result<Vec<VarDecl>, Error> {
        let mut decls = Vec::new();
        loop {
            let name = self.expect_ident()?;
            let init = if self.eat_punct("=")? {
                Some(self.parse_assignment(no_in)?)
            } else {
                None
            };
            decls.push(VarDecl { name, init });
            if !self.eat_punct(",")? {
                break;
            }
        }
        Ok(decls)
    }

    fn parse_defun(&mut self) -> Result<Node, Error> {
        self.bump()?;
        let name = self.expect_ident()?;
        let (params, body) = self.parse_function_rest()?;
        Ok(Node::Defun { name, params, body })
    }

    fn parse_function_rest(&mut self) -> Result<(Vec<String>, Vec<Node>), Error> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        if !self.eat_punct(")")? {
            loop {
                params.push(self.expect_ident()?);
                if !self.eat_punct(",")? {
                    break;
                }
            }
            self.expect_punct(")")?;
        }
        self.expect_punct("{")?;
        let body = self.parse_block_body()?;
        Ok((params, body))
    }

    fn parse_if(&mut self) -> Result<Node, Error> {
        self.bump()?;
        self.expect_punct("(")?;
        let cond = self.parse_expression(false)?;
        self.expect_punct(")")?;
        let then_branch = self.parse_statement()?;
        let else_branch = if self.eat_word("else")? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Node::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }

    fn parse_for(&mut self) -> Result<Node, Error> {
        self.bump()?;
        self.expect_punct("(")?;

        if self.eat_word("var")? {
            let decls = self.parse_var_decls(true)?;
            if self.eat_word("in")? {
                if decls.len() != 1 || decls[0].init.is_some() {
                    return Err(self.error("bad for-in declaration"));
                }
                let key = Node::Name(decls[0].name.clone());
                let init = Node::Var(decls);
                return self.parse_for_in(Some(init), key);
            }
            self.expect_punct(";")?;
            return self.parse_for_rest(Some(Box::new(Node::Var(decls))));
        }

        if self.eat_punct(";")? {
            return self.parse_for_rest(None);
        }

        let first = self.parse_expression(true)?;
        if self.eat_word("in")? {
            return self.parse_for_in(None, first);
        }
        self.expect_punct(";")?;
        self.parse_for_rest(Some(Box::new(first)))
    }

    fn parse_for_rest(&mut self, init: Option<Box<Node>>) -> Result<Node, Error> {
        let cond = if self.at_punct(";") {
            None
        } else {
            Some(Box::new(self.parse_expression(false)?))
        };
        self.expect_punct(";")?;
        let step = if self.at_punct(")") {
            None
        } else {
            Some(Box::new(self.parse_expression(false)?))
        };
        self.expect_punct(")")?;
        let body = self.parse_statement()?;
        Ok(Node::For {
            init,
            cond,
            step,
            body: Box::new(body),
        })
    }

    fn parse_for_in(&mut self, init: Option<Node>, key: Node) -> Result<Node, Error> {
        let object = self.parse_expression(false)?;
        self.expect_punct(")")?;
        let body = self.parse_statement()?;
        Ok(Node::ForIn {
            init: init.map(Box::new),
            key: Box::new(key),
            object: Box::new(object),
            body: Box::new(body),
        })
    }

    fn parse_switch(&mut self) -> Result<Node, Error> {
        self.bump()?;
        self.expect_punct("(")?;
        let discriminant = self.parse_expression(false)?;
        self.expect_punct(")")?;
        self.expect_punct("{")?;

        let mut cases = Vec::new();
        while !self.eat_punct("}")? {
            let test = if self.eat_word("case")? {
                Some(self.parse_expression(false)?)
            } else if self.eat_word("default")? {
                None
            } else {
                return Err(self.error(format!(
                    "expected \"case\" or \"default\", found {:?}",
                    self.current.kind
                )));
            };
            self.expect_punct(":")?;
            let mut body = Vec::new();
            while !self.at_punct("}") && !self.at_word("case") && !self.at_word("default") {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, body });
        }
        Ok(Node::Switch {
            discriminant: Box::new(discriminant),
            cases,
        })
    }

    fn parse_try(&mut self) -> Result<Node, Error> {
        self.bump()?;
        self.expect_punct("{")?;
        let body = self.parse_block_body()?;

        let catch = if self.eat_word("catch")? {
            self.expect_punct("(")?;
            let param = self.expect_ident()?;
            self.expect_punct(")")?;
            self.expect_punct("{")?;
            Some(CatchClause {
                param,
                body: self.parse_block_body()?,
            })
        } else {
            None
        };
        let finally = if self.eat_word("finally")? {
            self.expect_punct("{")?;
            Some(self.parse_block_body()?)
        } else {
            None
        };
        if catch.is_none() && finally.is_none() {
            return Err(self.error("try without catch or finally"));
        }
        Ok(Node::Try {
            body,
            catch,
            finally,
        })
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn parse_expression(&mut self, no_in: bool) -> Result<Node, Error> {
        let mut expr = self.parse_assignment(no_in)?;
        while self.eat_punct(",")? {
            let second = self.parse_assignment(no_in)?;
            expr = Node::Seq {
                first: Box::new(expr),
                second: Box::new(second),
            };
        }
        Ok(expr)
    }

    fn parse_assignment(&mut self, no_in: bool) -> Result<Node, Error> {
        let target = self.parse_conditional(no_in)?;
        let op = match &self.current.kind {
            TokenKind::Punct("=") => AssignOp::Assign,
            TokenKind::Punct("+=") => AssignOp::Add,
            TokenKind::Punct("-=") => AssignOp::Sub,
            TokenKind::Punct("*=") => AssignOp::Mul,
            TokenKind::Punct("/=") => AssignOp::Div,
            TokenKind::Punct("%=") => AssignOp::Mod,
            TokenKind::Punct("<<=") => AssignOp::Shl,
            TokenKind::Punct(">>=") => AssignOp::Shr,
            TokenKind::Punct(">>>=") => AssignOp::UShr,
            TokenKind::Punct("&=") => AssignOp::BitAnd,
            TokenKind::Punct("|=") => AssignOp::BitOr,
            TokenKind::Punct("^=") => AssignOp::BitXor,
            _ => return Ok(target),
        };
        self.bump()?;
        let value = self.parse_assignment(no_in)?;
        Ok(Node::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self, no_in: bool) -> Result<Node, Error> {
        let cond = self.parse_binary(1, no_in)?;
        if !self.eat_punct("?")? {
            return Ok(cond);
        }
        let then_val = self.parse_assignment(false)?;
        self.expect_punct(":")?;
        let else_val = self.parse_assignment(no_in)?;
        Ok(Node::Conditional {
            cond: Box::new(cond),
            then_val: Box::new(then_val),
            else_val: Box::new(else_val),
        })
    }

    fn binary_op(&self, no_in: bool) -> Option<(BinaryOp, u8)> {
        let op = match &self.current.kind {
            TokenKind::Punct("||") => (BinaryOp::LogicalOr, 1),
            TokenKind::Punct("&&") => (BinaryOp::LogicalAnd, 2),
            TokenKind::Punct("|") => (BinaryOp::BitOr, 3),
            TokenKind::Punct("^") => (BinaryOp::BitXor, 4),
            TokenKind::Punct("&") => (BinaryOp::BitAnd, 5),
            TokenKind::Punct("==") => (BinaryOp::Eq, 6),
            TokenKind::Punct("!=") => (BinaryOp::Ne, 6),
            TokenKind::Punct("===") => (BinaryOp::StrictEq, 6),
            TokenKind::Punct("!==") => (BinaryOp::StrictNe, 6),
            TokenKind::Punct("<") => (BinaryOp::Lt, 7),
            TokenKind::Punct("<=") => (BinaryOp::Le, 7),
            TokenKind::Punct(">") => (BinaryOp::Gt, 7),
            TokenKind::Punct(">=") => (BinaryOp::Ge, 7),
            TokenKind::Ident(w) if w == "instanceof" => (BinaryOp::Instanceof, 7),
            TokenKind::Ident(w) if w == "in" && !no_in => (BinaryOp::In, 7),
            TokenKind::Punct("<<") => (BinaryOp::Shl, 8),
            TokenKind::Punct(">>") => (BinaryOp::Shr, 8),
            TokenKind::Punct(">>>") => (BinaryOp::UShr, 8),
            TokenKind::Punct("+") => (BinaryOp::Add, 9),
            TokenKind::Punct("-") => (BinaryOp::Sub, 9),
            TokenKind::Punct("*") => (BinaryOp::Mul, 10),
            TokenKind::Punct("/") => (BinaryOp::Div, 10),
            TokenKind::Punct("%") => (BinaryOp::Mod, 10),
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary(&mut self, min_prec: u8, no_in: bool) -> Result<Node, Error> {
        let mut lhs = self.parse_unary(no_in)?;
        while let Some((op, prec)) = self.binary_op(no_in) {
            if prec < min_prec {
                break;
            }
            self.bump()?;
            // Left-associative: the right operand starts one level tighter.
            let rhs = self.parse_binary(prec + 1, no_in)?;
            lhs = Node::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self, no_in: bool) -> Result<Node, Error> {
        let op = match &self.current.kind {
            TokenKind::Punct("-") => Some(UnaryOp::Neg),
            TokenKind::Punct("+") => Some(UnaryOp::Plus),
            TokenKind::Punct("!") => Some(UnaryOp::Not),
            TokenKind::Punct("~") => Some(UnaryOp::BitNot),
            TokenKind::Punct("++") => Some(UnaryOp::Inc),
            TokenKind::Punct("--") => Some(UnaryOp::Dec),
            TokenKind::Ident(w) if w == "typeof" => Some(UnaryOp::TypeOf),
            TokenKind::Ident(w) if w == "void" => Some(UnaryOp::Void),
            TokenKind::Ident(w) if w == "delete" => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.bump()?;
            let expr = self.parse_unary(no_in)?;
            return Ok(Node::UnaryPrefix {
                op,
                expr: Box::new(expr),
            });
        }

        let mut expr = self.parse_member(true)?;
        loop {
            let op = match &self.current.kind {
                TokenKind::Punct("++") => UnaryOp::Inc,
                TokenKind::Punct("--") => UnaryOp::Dec,
                _ => break,
            };
            self.bump()?;
            expr = Node::UnaryPostfix {
                op,
                expr: Box::new(expr),
            };
        }
        Ok(expr)
    }

    /// Member expressions, `new`, and (when `allow_call`) call chains.
    fn parse_member(&mut self, allow_call: bool) -> Result<Node, Error> {
        let mut expr = if self.at_word("new") {
            self.bump()?;
            let callee = self.parse_member(false)?;
            let args = if self.at_punct("(") {
                self.parse_args()?
            } else {
                Vec::new()
            };
            Node::New {
                callee: Box::new(callee),
                args,
            }
        } else {
            self.parse_primary()?
        };

        loop {
            if self.eat_punct(".")? {
                let field = match &self.current.kind {
                    TokenKind::Ident(w) => w.clone(),
                    other => {
                        return Err(self.error(format!("expected property name, found {other:?}")))
                    }
                };
                self.bump()?;
                expr = Node::Dot {
                    object: Box::new(expr),
                    field,
                };
            } else if self.eat_punct("[")? {
                let index = self.parse_expression(false)?;
                self.expect_punct("]")?;
                expr = Node::Sub {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if allow_call && self.at_punct("(") {
                let args = self.parse_args()?;
                expr = Node::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Node>, Error> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        if self.eat_punct(")")? {
            return Ok(args);
        }
        loop {
            args.push(self.parse_assignment(false)?);
            if !self.eat_punct(",")? {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Node, Error> {
        match &self.current.kind {
            TokenKind::Num(value) => {
                let value = *value;
                self.bump()?;
                Ok(Node::Num(value))
            }
            TokenKind::Str(value) => {
                let value = value.clone();
                self.bump()?;
                Ok(Node::Str(value))
            }
            TokenKind::Punct("(") => {
                self.bump()?;
                let expr = self.parse_expression(false)?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            TokenKind::Punct("[") => {
                self.bump()?;
                let mut elems = Vec::new();
                if !self.eat_punct("]")? {
                    loop {
                        elems.push(self.parse_assignment(false)?);
                        if !self.eat_punct(",")? {
                            break;
                        }
                    }
                    self.expect_punct("]")?;
                }
                Ok(Node::Array(elems))
            }
            TokenKind::Punct("{") => {
                self.bump()?;
                let mut fields = Vec::new();
                if !self.eat_punct("}")? {
                    loop {
                        let key = match &self.current.kind {
                            TokenKind::Ident(w) => w.clone(),
                            TokenKind::Str(s) => s.clone(),
                            TokenKind::Num(n) => {
                                let mut key = String::new();
                                crate::printer::write_num(&mut key, *n);
                                key
                            }
                            other => {
                                return Err(self
                                    .error(format!("expected property key, found {other:?}")))
                            }
                        };
                        self.bump()?;
                        self.expect_punct(":")?;
                        fields.push((key, self.parse_assignment(false)?));
                        if !self.eat_punct(",")? {
                            break;
                        }
                    }
                    self.expect_punct("}")?;
                }
                Ok(Node::Object(fields))
            }
            TokenKind::Ident(w) if w == "function" => {
                self.bump()?;
                let name = match &self.current.kind {
                    TokenKind::Ident(w) if !RESERVED.contains(&w.as_str()) => {
                        let w = w.clone();
                        self.bump()?;
                        Some(w)
                    }
                    _ => None,
                };
                let (params, body) = self.parse_function_rest()?;
                Ok(Node::Function { name, params, body })
            }
            TokenKind::Ident(w) if !RESERVED.contains(&w.as_str()) => {
                let w = w.clone();
                self.bump()?;
                Ok(Node::Name(w))
            }
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }
}
