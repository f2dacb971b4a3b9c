use crate::ast::*;
use crate::lexeme::TokenKind;
use crate::span::{Span, Spanned};

use super::Parser;

/// A simple statement, or the `k, v := range x` header only a `for` accepts.
enum Simple {
    Stmt(Stmt),
    Range {
        key: Option<Spanned<Expr>>,
        value: Option<Spanned<Expr>>,
        define: bool,
        expr: Spanned<Expr>,
        span: Span,
    },
}

impl Parser {
    pub(super) fn parse_block(&mut self) -> Block {
        let start = self.expect(TokenKind::LBrace);
        if !self.enter_nesting() {
            self.exit_nesting();
            self.synchronize();
            return Block {
                stmts: Vec::new(),
                span: start,
            };
        }
        let saved = std::mem::replace(&mut self.no_composite, false);
        let stmts = self.parse_stmt_list();
        self.no_composite = saved;
        self.exit_nesting();
        let end = self.expect(TokenKind::RBrace);
        Block {
            stmts,
            span: start.merge(end),
        }
    }

    /// Statements up to a closing brace, a case label or end of input.
    pub(super) fn parse_stmt_list(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                TokenKind::RBrace | TokenKind::Case | TokenKind::Default | TokenKind::Eof => break,
                TokenKind::Semicolon => {
                    self.advance();
                    continue;
                }
                _ => {}
            }
            let before = self.pos;
            let stmt = self.parse_stmt();
            stmts.push(stmt);
            if !matches!(
                self.peek(),
                TokenKind::RBrace | TokenKind::Case | TokenKind::Default
            ) {
                self.expect_terminator();
            }
            if self.pos == before {
                self.advance();
            }
        }
        stmts
    }

    fn parse_stmt(&mut self) -> Stmt {
        let start = self.current_span();
        match self.peek() {
            TokenKind::Var | TokenKind::Const | TokenKind::Type => {
                let decl = self.parse_gen_decl();
                let span = decl.span;
                self.stmt(StmtKind::Decl(decl), span)
            }
            TokenKind::Return => {
                self.advance();
                let values = if matches!(self.peek(), TokenKind::Semicolon | TokenKind::RBrace) {
                    Vec::new()
                } else {
                    self.parse_expr_list()
                };
                self.stmt(StmtKind::Return(values), start.merge(self.prev_span()))
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Goto => {
                let kind = match self.peek() {
                    TokenKind::Break => BranchKind::Break,
                    TokenKind::Continue => BranchKind::Continue,
                    _ => BranchKind::Goto,
                };
                self.advance();
                let label = if self.at(TokenKind::Ident) {
                    Some(self.expect_ident())
                } else {
                    if kind == BranchKind::Goto {
                        self.error_at_current("expected label after 'goto'");
                    }
                    None
                };
                self.stmt(StmtKind::Branch { kind, label }, start.merge(self.prev_span()))
            }
            TokenKind::Fallthrough => {
                self.advance();
                self.stmt(
                    StmtKind::Branch {
                        kind: BranchKind::Fallthrough,
                        label: None,
                    },
                    start,
                )
            }
            TokenKind::Go | TokenKind::Defer => {
                let is_go = self.at(TokenKind::Go);
                self.advance();
                let call = self.parse_expr();
                if !matches!(call.node, Expr::Call { .. }) {
                    self.error_at("expression must be a function call", call.span);
                }
                let span = start.merge(call.span);
                let kind = if is_go {
                    StmtKind::Go(call)
                } else {
                    StmtKind::Defer(call)
                };
                self.stmt(kind, span)
            }
            TokenKind::LBrace => {
                let block = self.parse_block();
                let span = block.span;
                self.stmt(StmtKind::Block(block), span)
            }
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::Select => self.parse_select_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Ident if self.peek_nth(1) == TokenKind::Colon => {
                let label = self.expect_ident();
                self.advance();
                let inner = if matches!(self.peek(), TokenKind::RBrace | TokenKind::Semicolon) {
                    let span = self.prev_span();
                    self.stmt(StmtKind::Empty, span)
                } else {
                    self.parse_stmt()
                };
                let span = start.merge(inner.span);
                self.stmt(
                    StmtKind::Labeled {
                        label,
                        stmt: Box::new(inner),
                    },
                    span,
                )
            }
            _ => self.parse_simple_stmt(),
        }
    }

    fn parse_simple_stmt(&mut self) -> Stmt {
        match self.parse_simple(false) {
            Simple::Stmt(stmt) => stmt,
            Simple::Range { span, .. } => {
                self.error_at("'range' is only allowed in a for statement", span);
                self.stmt(StmtKind::Empty, span)
            }
        }
    }

    fn parse_simple(&mut self, range_ok: bool) -> Simple {
        let start = self.current_span();
        if range_ok && self.at(TokenKind::Range) {
            self.advance();
            let expr = self.parse_expr();
            let span = start.merge(expr.span);
            return Simple::Range {
                key: None,
                value: None,
                define: false,
                expr,
                span,
            };
        }

        let lhs = self.parse_expr_list();
        let op = match self.peek() {
            TokenKind::Define => Some(AssignOp::Define),
            TokenKind::Assign => Some(AssignOp::Assign),
            TokenKind::PlusAssign => Some(AssignOp::Add),
            TokenKind::MinusAssign => Some(AssignOp::Sub),
            TokenKind::StarAssign => Some(AssignOp::Mul),
            TokenKind::SlashAssign => Some(AssignOp::Div),
            TokenKind::PercentAssign => Some(AssignOp::Rem),
            TokenKind::AmpAssign => Some(AssignOp::BitAnd),
            TokenKind::PipeAssign => Some(AssignOp::BitOr),
            TokenKind::CaretAssign => Some(AssignOp::BitXor),
            TokenKind::ShlAssign => Some(AssignOp::Shl),
            TokenKind::ShrAssign => Some(AssignOp::Shr),
            TokenKind::AmpCaretAssign => Some(AssignOp::AndNot),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            if range_ok && self.at(TokenKind::Range) && matches!(op, AssignOp::Define | AssignOp::Assign) {
                self.advance();
                let expr = self.parse_expr();
                let span = start.merge(expr.span);
                if lhs.len() > 2 {
                    self.error_at("range yields at most two values", span);
                }
                let mut lhs = lhs.into_iter();
                return Simple::Range {
                    key: lhs.next(),
                    value: lhs.next(),
                    define: op == AssignOp::Define,
                    expr,
                    span,
                };
            }
            let rhs = self.parse_expr_list();
            let span = start.merge(self.prev_span());
            if op != AssignOp::Define && op != AssignOp::Assign && (lhs.len() != 1 || rhs.len() != 1) {
                self.error_at("compound assignment takes exactly one operand on each side", span);
            }
            if op == AssignOp::Define {
                if let Some(bad) = lhs.iter().find(|e| e.node.as_ident().is_none()) {
                    let bad_span = bad.span;
                    self.error_at("non-name on left side of ':='", bad_span);
                }
            }
            return Simple::Stmt(self.stmt(StmtKind::Assign { lhs, op, rhs }, span));
        }

        let mut lhs = lhs;
        if lhs.len() > 1 {
            self.error_at_current("expected ':=' or '=' after expression list");
        }
        let first = lhs.swap_remove(0);

        match self.peek() {
            TokenKind::Arrow => {
                self.advance();
                let value = self.parse_expr();
                let span = start.merge(value.span);
                Simple::Stmt(self.stmt(StmtKind::Send { chan: first, value }, span))
            }
            TokenKind::Inc | TokenKind::Dec => {
                let inc = self.at(TokenKind::Inc);
                self.advance();
                let span = start.merge(self.prev_span());
                Simple::Stmt(self.stmt(StmtKind::IncDec { expr: first, inc }, span))
            }
            _ => {
                let span = first.span;
                Simple::Stmt(self.stmt(StmtKind::Expr(first), span))
            }
        }
    }

    /// The optional `init;` part of an `if` or `switch` header, followed by
    /// the remaining simple statement (if any) before the `{`.
    fn parse_header(&mut self) -> (Option<Box<Stmt>>, Option<Stmt>) {
        let saved = std::mem::replace(&mut self.no_composite, true);
        let mut init = None;
        let mut rest = None;
        if !self.at(TokenKind::LBrace) {
            let first = if self.at(TokenKind::Semicolon) {
                None
            } else {
                Some(self.parse_simple_stmt())
            };
            if self.at(TokenKind::Semicolon) && self.tokens[self.pos].lexeme == ";" {
                self.advance();
                init = first.map(Box::new);
                if !self.at(TokenKind::LBrace) {
                    rest = Some(self.parse_simple_stmt());
                }
            } else {
                rest = first;
            }
        }
        self.no_composite = saved;
        (init, rest)
    }

    fn parse_if_stmt(&mut self) -> Stmt {
        let start = self.expect(TokenKind::If);
        let (init, rest) = self.parse_header();
        let cond = match rest {
            Some(Stmt {
                kind: StmtKind::Expr(cond),
                ..
            }) => cond,
            Some(other) => {
                self.error_at("expected condition expression", other.span);
                Spanned::new(Expr::ident("_"), other.span)
            }
            None => {
                self.error_at_current("missing condition in if statement");
                Spanned::new(Expr::ident("_"), self.current_span())
            }
        };
        let then = self.parse_block();
        let els = if self.eat(TokenKind::Else) {
            match self.peek() {
                TokenKind::If => Some(Box::new(self.parse_if_stmt())),
                TokenKind::LBrace => {
                    let block = self.parse_block();
                    let span = block.span;
                    Some(Box::new(self.stmt(StmtKind::Block(block), span)))
                }
                _ => {
                    self.error_at_current("expected 'if' or block after 'else'");
                    None
                }
            }
        } else {
            None
        };
        self.stmt(
            StmtKind::If {
                init,
                cond,
                then,
                els,
            },
            start.merge(self.prev_span()),
        )
    }

    fn parse_switch_stmt(&mut self) -> Stmt {
        let start = self.expect(TokenKind::Switch);
        let (init, rest) = self.parse_header();

        let is_guard = |stmt: &Stmt| match &stmt.kind {
            StmtKind::Expr(e) => matches!(e.node, Expr::TypeAssert { ty: None, .. }),
            StmtKind::Assign {
                op: AssignOp::Define,
                rhs,
                lhs,
            } => {
                lhs.len() == 1
                    && rhs.len() == 1
                    && matches!(rhs[0].node, Expr::TypeAssert { ty: None, .. })
            }
            _ => false,
        };

        if let Some(guard) = rest.as_ref().filter(|s| is_guard(s)) {
            let guard = guard.clone();
            let clauses = self.parse_case_clauses();
            return self.stmt(
                StmtKind::TypeSwitch {
                    init,
                    assign: Box::new(guard),
                    clauses,
                },
                start.merge(self.prev_span()),
            );
        }

        let tag = match rest {
            None => None,
            Some(Stmt {
                kind: StmtKind::Expr(tag),
                ..
            }) => Some(tag),
            Some(other) => {
                self.error_at("expected switch expression", other.span);
                None
            }
        };
        let clauses = self.parse_case_clauses();
        self.stmt(
            StmtKind::Switch { init, tag, clauses },
            start.merge(self.prev_span()),
        )
    }

    fn parse_case_clauses(&mut self) -> Vec<CaseClause> {
        self.expect(TokenKind::LBrace);
        let mut clauses = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let start = self.current_span();
            let exprs = if self.eat(TokenKind::Case) {
                Some(self.parse_expr_list())
            } else if self.eat(TokenKind::Default) {
                None
            } else {
                self.error_at_current("expected 'case' or 'default'");
                self.synchronize();
                continue;
            };
            self.expect(TokenKind::Colon);
            let body = self.parse_stmt_list();
            clauses.push(CaseClause {
                exprs,
                body,
                span: start.merge(self.prev_span()),
            });
        }
        self.expect(TokenKind::RBrace);
        clauses
    }

    fn parse_select_stmt(&mut self) -> Stmt {
        let start = self.expect(TokenKind::Select);
        self.expect(TokenKind::LBrace);
        let mut clauses = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let clause_start = self.current_span();
            let comm = if self.eat(TokenKind::Case) {
                Some(Box::new(self.parse_simple_stmt()))
            } else if self.eat(TokenKind::Default) {
                None
            } else {
                self.error_at_current("expected 'case' or 'default'");
                self.synchronize();
                continue;
            };
            self.expect(TokenKind::Colon);
            let body = self.parse_stmt_list();
            clauses.push(CommClause {
                comm,
                body,
                span: clause_start.merge(self.prev_span()),
            });
        }
        self.expect(TokenKind::RBrace);
        self.stmt(StmtKind::Select { clauses }, start.merge(self.prev_span()))
    }

    fn parse_for_stmt(&mut self) -> Stmt {
        let start = self.expect(TokenKind::For);
        let saved = std::mem::replace(&mut self.no_composite, true);

        let mut init = None;
        let mut cond = None;
        let mut post = None;

        if !self.at(TokenKind::LBrace) {
            let first = if self.at(TokenKind::Semicolon) {
                None
            } else {
                Some(self.parse_simple(true))
            };

            if let Some(Simple::Range {
                key,
                value,
                define,
                expr,
                ..
            }) = first
            {
                self.no_composite = saved;
                let body = self.parse_block();
                return self.stmt(
                    StmtKind::Range {
                        key,
                        value,
                        define,
                        expr,
                        body,
                    },
                    start.merge(self.prev_span()),
                );
            }
            let first = match first {
                Some(Simple::Stmt(stmt)) => Some(stmt),
                _ => None,
            };

            if self.at(TokenKind::Semicolon) {
                // Three-clause form.
                self.advance();
                init = first.map(Box::new);
                if !self.at(TokenKind::Semicolon) {
                    cond = Some(self.parse_expr());
                }
                self.expect(TokenKind::Semicolon);
                if !self.at(TokenKind::LBrace) {
                    post = Some(Box::new(self.parse_simple_stmt()));
                }
            } else {
                match first {
                    Some(Stmt {
                        kind: StmtKind::Expr(e),
                        ..
                    }) => cond = Some(e),
                    Some(other) => self.error_at("expected for loop condition", other.span),
                    None => {}
                }
            }
        }

        self.no_composite = saved;
        let body = self.parse_block();
        self.stmt(
            StmtKind::For {
                init,
                cond,
                post,
                body,
            },
            start.merge(self.prev_span()),
        )
    }
}
