use crate::ast::*;
use crate::lexeme::TokenKind;
use crate::span::{Span, Spanned};

use super::Parser;

impl Parser {
    pub(super) fn parse_expr(&mut self) -> Spanned<Expr> {
        self.parse_expr_bp(0)
    }

    pub(super) fn parse_expr_list(&mut self) -> Vec<Spanned<Expr>> {
        let mut exprs = vec![self.parse_expr()];
        while self.eat(TokenKind::Comma) {
            exprs.push(self.parse_expr());
        }
        exprs
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Spanned<Expr> {
        if !self.enter_nesting() {
            self.exit_nesting();
            let span = self.current_span();
            self.synchronize();
            return Spanned::new(Expr::ident("_"), span);
        }

        let mut lhs = self.parse_unary();

        loop {
            let Some(op) = binary_op(self.peek()) else {
                break;
            };
            let (l_bp, r_bp) = op_binding_power(op);
            if l_bp < min_bp {
                break;
            }

            self.advance(); // consume operator
            let rhs = self.parse_expr_bp(r_bp);
            let span = lhs.span.merge(rhs.span);
            lhs = Spanned::new(
                Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }

        self.exit_nesting();
        lhs
    }

    fn parse_unary(&mut self) -> Spanned<Expr> {
        let start = self.current_span();
        let op = match self.peek() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Caret => UnaryOp::BitNot,
            TokenKind::Star => UnaryOp::Deref,
            TokenKind::Amp => UnaryOp::Addr,
            TokenKind::Arrow if self.peek_nth(1) == TokenKind::Chan => {
                let ty = self.parse_type();
                return self.parse_postfix(Spanned::new(Expr::Type(ty.node), ty.span));
            }
            TokenKind::Arrow => UnaryOp::Recv,
            _ => {
                let primary = self.parse_primary();
                return self.parse_postfix(primary);
            }
        };
        self.advance();
        if !self.enter_nesting() {
            self.exit_nesting();
            return Spanned::new(Expr::ident("_"), start);
        }
        let operand = self.parse_unary();
        self.exit_nesting();
        let span = start.merge(operand.span);
        Spanned::new(
            Expr::Unary {
                op,
                expr: Box::new(operand),
            },
            span,
        )
    }

    /// Selectors, type assertions, index and slice expressions, calls and
    /// composite literals after a named type.
    fn parse_postfix(&mut self, mut expr: Spanned<Expr>) -> Spanned<Expr> {
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    if self.eat(TokenKind::LParen) {
                        let ty = if self.eat(TokenKind::Type) {
                            None
                        } else {
                            Some(self.parse_type().node)
                        };
                        self.expect(TokenKind::RParen);
                        let span = expr.span.merge(self.prev_span());
                        expr = Spanned::new(
                            Expr::TypeAssert {
                                expr: Box::new(expr),
                                ty,
                            },
                            span,
                        );
                    } else {
                        let sel = self.expect_ident();
                        let span = expr.span.merge(sel.span);
                        expr = Spanned::new(
                            Expr::Selector {
                                expr: Box::new(expr),
                                sel,
                            },
                            span,
                        );
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let saved = std::mem::replace(&mut self.no_composite, false);
                    expr = self.parse_index_or_slice(expr);
                    self.no_composite = saved;
                }
                TokenKind::LParen => {
                    self.advance();
                    let saved = std::mem::replace(&mut self.no_composite, false);
                    let mut args = Vec::new();
                    let mut ellipsis = false;
                    while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                        args.push(self.parse_arg());
                        if self.eat(TokenKind::Ellipsis) {
                            ellipsis = true;
                        }
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen);
                    self.no_composite = saved;
                    let span = expr.span.merge(self.prev_span());
                    expr = Spanned::new(
                        Expr::Call {
                            func: Box::new(expr),
                            args,
                            ellipsis,
                        },
                        span,
                    );
                }
                TokenKind::LBrace if !self.no_composite => match type_of_name(&expr.node) {
                    Some(ty) => expr = self.parse_composite(Some(ty), expr.span),
                    None => break,
                },
                _ => break,
            }
        }
        expr
    }

    /// A call argument; `make` and `new` take types.
    fn parse_arg(&mut self) -> Spanned<Expr> {
        if matches!(self.peek(), TokenKind::Map | TokenKind::Chan) {
            let ty = self.parse_type();
            let span = ty.span;
            if self.at(TokenKind::LBrace) {
                return self.parse_composite(Some(ty.node), span);
            }
            return Spanned::new(Expr::Type(ty.node), span);
        }
        self.parse_expr()
    }

    fn parse_index_or_slice(&mut self, expr: Spanned<Expr>) -> Spanned<Expr> {
        let low = if self.at(TokenKind::Colon) {
            None
        } else {
            Some(Box::new(self.parse_expr()))
        };

        if !self.eat(TokenKind::Colon) {
            self.expect(TokenKind::RBracket);
            let span = expr.span.merge(self.prev_span());
            let index = match low {
                Some(index) => index,
                None => Box::new(Spanned::new(Expr::ident("_"), span)),
            };
            return Spanned::new(
                Expr::Index {
                    expr: Box::new(expr),
                    index,
                },
                span,
            );
        }

        let high = if matches!(self.peek(), TokenKind::Colon | TokenKind::RBracket) {
            None
        } else {
            Some(Box::new(self.parse_expr()))
        };
        let max = if self.eat(TokenKind::Colon) {
            Some(Box::new(self.parse_expr()))
        } else {
            None
        };
        self.expect(TokenKind::RBracket);
        let span = expr.span.merge(self.prev_span());
        Spanned::new(
            Expr::Slice {
                expr: Box::new(expr),
                low,
                high,
                max,
            },
            span,
        )
    }

    fn parse_primary(&mut self) -> Spanned<Expr> {
        let start = self.current_span();
        let kind = self.peek();

        if kind.is_builtin_type() {
            let name = self.advance().lexeme.clone();
            return Spanned::new(Expr::Type(Type::Named(name)), start);
        }

        match kind {
            TokenKind::Ident => {
                let name = self.advance().lexeme.clone();
                Spanned::new(Expr::Ident(name), start)
            }
            TokenKind::Int | TokenKind::Float | TokenKind::Char | TokenKind::String => {
                let text = self.advance().lexeme.clone();
                let lit = match kind {
                    TokenKind::Int => Literal::Int(text),
                    TokenKind::Float => Literal::Float(text),
                    TokenKind::Char => Literal::Char(text),
                    _ => Literal::String(text),
                };
                Spanned::new(Expr::Lit(lit), start)
            }
            TokenKind::LParen => {
                self.advance();
                let saved = std::mem::replace(&mut self.no_composite, false);
                let inner = self.parse_expr();
                self.no_composite = saved;
                self.expect(TokenKind::RParen);
                Spanned::new(Expr::Paren(Box::new(inner)), start.merge(self.prev_span()))
            }
            TokenKind::Func => {
                self.advance();
                let (params, results) = self.parse_signature();
                let ty = FuncType { params, results };
                if self.at(TokenKind::LBrace) {
                    let body = self.parse_block();
                    Spanned::new(Expr::FuncLit { ty, body }, start.merge(self.prev_span()))
                } else {
                    Spanned::new(Expr::Type(Type::Func(ty)), start.merge(self.prev_span()))
                }
            }
            TokenKind::LBracket
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Struct
            | TokenKind::Interface => {
                let ty = self.parse_type();
                if self.at(TokenKind::LBrace) {
                    self.parse_composite(Some(ty.node), ty.span)
                } else {
                    Spanned::new(Expr::Type(ty.node), ty.span)
                }
            }
            _ => {
                self.error_at_current("expected expression");
                if !matches!(
                    kind,
                    TokenKind::Semicolon | TokenKind::RBrace | TokenKind::RParen | TokenKind::Eof
                ) {
                    self.advance();
                }
                Spanned::new(Expr::ident("_"), start)
            }
        }
    }

    /// `{ elems }` after an optional type. Elements may be `key: value` and
    /// nested literals may omit their type.
    fn parse_composite(&mut self, ty: Option<Type>, start: Span) -> Spanned<Expr> {
        self.expect(TokenKind::LBrace);
        let saved = std::mem::replace(&mut self.no_composite, false);
        let mut elts = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let before = self.pos;
            let key = self.parse_element();
            let elt = if self.eat(TokenKind::Colon) {
                let value = self.parse_element();
                let span = key.span.merge(value.span);
                Spanned::new(
                    Expr::KeyValue {
                        key: Box::new(key),
                        value: Box::new(value),
                    },
                    span,
                )
            } else {
                key
            };
            elts.push(elt);
            if !self.eat(TokenKind::Comma) {
                // A trailing newline before `}` arrives as a terminator.
                if self.at(TokenKind::Semicolon) && self.tokens[self.pos].lexeme == "\n" {
                    self.advance();
                }
                break;
            }
            if self.at(TokenKind::Semicolon) && self.tokens[self.pos].lexeme == "\n" {
                self.advance();
            }
            if self.pos == before {
                break;
            }
        }
        self.expect(TokenKind::RBrace);
        self.no_composite = saved;
        Spanned::new(Expr::Composite { ty, elts }, start.merge(self.prev_span()))
    }

    fn parse_element(&mut self) -> Spanned<Expr> {
        if self.at(TokenKind::LBrace) {
            let start = self.current_span();
            return self.parse_composite(None, start);
        }
        self.parse_expr()
    }
}

/// The type named by `T` or `pkg.T`, when `expr` is one of those forms.
fn type_of_name(expr: &Expr) -> Option<Type> {
    match expr {
        Expr::Ident(name) if name != "_" => Some(Type::Named(name.clone())),
        Expr::Selector { expr, sel } => match &expr.node {
            Expr::Ident(pkg) => Some(Type::Qualified(pkg.clone(), sel.node.clone())),
            _ => None,
        },
        Expr::Type(ty) => Some(ty.clone()),
        _ => None,
    }
}

fn binary_op(kind: TokenKind) -> Option<BinOp> {
    let op = match kind {
        TokenKind::OrOr => BinOp::LogOr,
        TokenKind::AndAnd => BinOp::LogAnd,
        TokenKind::EqEq => BinOp::Eq,
        TokenKind::NotEq => BinOp::Ne,
        TokenKind::Lt => BinOp::Lt,
        TokenKind::LtEq => BinOp::Le,
        TokenKind::Gt => BinOp::Gt,
        TokenKind::GtEq => BinOp::Ge,
        TokenKind::Plus => BinOp::Add,
        TokenKind::Minus => BinOp::Sub,
        TokenKind::Pipe => BinOp::BitOr,
        TokenKind::Caret => BinOp::BitXor,
        TokenKind::Star => BinOp::Mul,
        TokenKind::Slash => BinOp::Div,
        TokenKind::Percent => BinOp::Rem,
        TokenKind::Shl => BinOp::Shl,
        TokenKind::Shr => BinOp::Shr,
        TokenKind::Amp => BinOp::BitAnd,
        TokenKind::AmpCaret => BinOp::AndNot,
        _ => return None,
    };
    Some(op)
}

/// Left-associative: the right binding power is one higher.
fn op_binding_power(op: BinOp) -> (u8, u8) {
    let p = op.precedence() * 2;
    (p, p + 1)
}
