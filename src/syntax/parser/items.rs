use crate::ast::*;
use crate::lexeme::TokenKind;
use crate::span::Spanned;

use super::Parser;

/// One comma-separated entry of a parameter list before grouping.
enum ParamEntry {
    /// A lone identifier: either a name awaiting a type or a type name.
    Ident(Spanned<String>),
    Named(Spanned<String>, Spanned<Type>),
    Type(Spanned<Type>),
}

impl Parser {
    pub(super) fn parse_func_decl(&mut self) -> FuncDecl {
        let start = self.expect(TokenKind::Func);
        let recv = if self.at(TokenKind::LParen) {
            Some(self.parse_params())
        } else {
            None
        };
        let name = self.expect_ident();
        let (params, results) = self.parse_signature();
        let body = if self.at(TokenKind::LBrace) {
            Some(self.parse_block())
        } else {
            None
        };
        FuncDecl {
            recv,
            name,
            params,
            results,
            body,
            span: start.merge(self.prev_span()),
        }
    }

    /// `(params) result` where the result is a parenthesized list, a bare
    /// type, or absent.
    pub(super) fn parse_signature(&mut self) -> (Vec<Field>, Vec<Field>) {
        let params = self.parse_params();
        let results = if self.at(TokenKind::LParen) {
            self.parse_params()
        } else if self.at_type_start() {
            vec![Field::unnamed(self.parse_type())]
        } else {
            Vec::new()
        };
        (params, results)
    }

    /// Parse a parenthesized parameter list. Entries are either all named
    /// (`a, b int, c string`) or all unnamed (`int, string`).
    pub(super) fn parse_params(&mut self) -> Vec<Field> {
        self.expect(TokenKind::LParen);
        let saved = std::mem::replace(&mut self.no_composite, false);
        let mut entries = Vec::new();
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            let before = self.pos;
            entries.push(self.parse_param_entry());
            if !self.eat(TokenKind::Comma) {
                break;
            }
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::RParen);
        self.no_composite = saved;
        self.group_params(entries)
    }

    fn parse_param_entry(&mut self) -> ParamEntry {
        if self.at(TokenKind::Ident) {
            match self.peek_nth(1) {
                TokenKind::Comma | TokenKind::RParen => {
                    return ParamEntry::Ident(self.expect_ident());
                }
                TokenKind::Dot => return ParamEntry::Type(self.parse_type()),
                _ => {
                    let name = self.expect_ident();
                    let ty = self.parse_param_type();
                    return ParamEntry::Named(name, ty);
                }
            }
        }
        ParamEntry::Type(self.parse_param_type())
    }

    fn parse_param_type(&mut self) -> Spanned<Type> {
        if self.at(TokenKind::Ellipsis) {
            let start = self.current_span();
            self.advance();
            let elem = self.parse_type();
            let span = start.merge(elem.span);
            return Spanned::new(Type::Variadic(Box::new(elem.node)), span);
        }
        self.parse_type()
    }

    fn group_params(&mut self, entries: Vec<ParamEntry>) -> Vec<Field> {
        let named = entries.iter().any(|e| matches!(e, ParamEntry::Named(..)));
        if !named {
            return entries
                .into_iter()
                .map(|entry| match entry {
                    ParamEntry::Ident(name) => {
                        Field::unnamed(Spanned::new(Type::Named(name.node), name.span))
                    }
                    ParamEntry::Type(ty) | ParamEntry::Named(_, ty) => Field::unnamed(ty),
                })
                .collect();
        }

        let mut fields = Vec::new();
        let mut pending: Vec<Spanned<String>> = Vec::new();
        for entry in entries {
            match entry {
                ParamEntry::Ident(name) => pending.push(name),
                ParamEntry::Named(name, ty) => {
                    pending.push(name);
                    fields.push(Field {
                        names: std::mem::take(&mut pending),
                        ty,
                    });
                }
                ParamEntry::Type(ty) => {
                    self.error_at("mixed named and unnamed parameters", ty.span);
                }
            }
        }
        if let Some(last) = pending.last() {
            let span = last.span;
            self.error_at("missing parameter type", span);
        }
        fields
    }

    pub(super) fn parse_gen_decl(&mut self) -> GenDecl {
        let start = self.current_span();
        let keyword = match self.peek() {
            TokenKind::Const => DeclKeyword::Const,
            TokenKind::Type => DeclKeyword::Type,
            _ => DeclKeyword::Var,
        };
        self.advance();
        let mut specs = Vec::new();
        if self.eat(TokenKind::LParen) {
            while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                let before = self.pos;
                specs.push(self.parse_spec(keyword));
                if !self.at(TokenKind::RParen) {
                    self.expect_terminator();
                }
                if self.pos == before {
                    self.advance();
                }
            }
            self.expect(TokenKind::RParen);
        } else {
            specs.push(self.parse_spec(keyword));
        }
        GenDecl {
            keyword,
            specs,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_spec(&mut self, keyword: DeclKeyword) -> Spec {
        if keyword == DeclKeyword::Type {
            let name = self.expect_ident();
            let alias = self.eat(TokenKind::Assign);
            let ty = self.parse_type();
            return Spec::Type(TypeSpec { name, alias, ty });
        }

        let mut names = vec![self.expect_ident()];
        while self.eat(TokenKind::Comma) {
            names.push(self.expect_ident());
        }
        let ty = if self.at_type_start() {
            Some(self.parse_type())
        } else {
            None
        };
        let values = if self.eat(TokenKind::Assign) {
            self.parse_expr_list()
        } else {
            Vec::new()
        };
        if keyword == DeclKeyword::Var && ty.is_none() && values.is_empty() {
            self.error_at_current("expected type or initializer");
        }
        Spec::Value(ValueSpec { names, ty, values })
    }

    pub(super) fn at_type_start(&self) -> bool {
        let kind = self.peek();
        kind.is_builtin_type()
            || matches!(
                kind,
                TokenKind::Ident
                    | TokenKind::Star
                    | TokenKind::LBracket
                    | TokenKind::Map
                    | TokenKind::Chan
                    | TokenKind::Arrow
                    | TokenKind::Func
                    | TokenKind::Struct
                    | TokenKind::Interface
                    | TokenKind::LParen
            )
    }

    pub(super) fn parse_type(&mut self) -> Spanned<Type> {
        let start = self.current_span();
        if !self.enter_nesting() {
            self.exit_nesting();
            return Spanned::new(Type::named("_"), start);
        }
        let ty = self.parse_type_inner();
        self.exit_nesting();
        Spanned::new(ty, start.merge(self.prev_span()))
    }

    fn parse_type_inner(&mut self) -> Type {
        let kind = self.peek();
        if kind.is_builtin_type() {
            let name = self.advance().lexeme.clone();
            return Type::Named(name);
        }
        match kind {
            TokenKind::Ident => {
                let name = self.expect_ident();
                if self.at(TokenKind::Dot) && self.peek_nth(1) == TokenKind::Ident {
                    self.advance();
                    let member = self.expect_ident();
                    Type::Qualified(name.node, member.node)
                } else {
                    Type::Named(name.node)
                }
            }
            TokenKind::Star => {
                self.advance();
                Type::Pointer(Box::new(self.parse_type().node))
            }
            TokenKind::LBracket => {
                self.advance();
                let len = if self.at(TokenKind::RBracket) {
                    None
                } else {
                    let saved = std::mem::replace(&mut self.no_composite, false);
                    let len = self.parse_expr();
                    self.no_composite = saved;
                    Some(Box::new(len))
                };
                self.expect(TokenKind::RBracket);
                Type::Array(len, Box::new(self.parse_type().node))
            }
            TokenKind::Map => {
                self.advance();
                self.expect(TokenKind::LBracket);
                let key = self.parse_type();
                self.expect(TokenKind::RBracket);
                let value = self.parse_type();
                Type::Map(Box::new(key.node), Box::new(value.node))
            }
            TokenKind::Chan => {
                self.advance();
                let dir = if self.eat(TokenKind::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                Type::Chan(dir, Box::new(self.parse_type().node))
            }
            TokenKind::Arrow => {
                self.advance();
                self.expect(TokenKind::Chan);
                Type::Chan(ChanDir::Recv, Box::new(self.parse_type().node))
            }
            TokenKind::Func => {
                self.advance();
                let (params, results) = self.parse_signature();
                Type::Func(FuncType { params, results })
            }
            TokenKind::Struct => {
                self.advance();
                Type::Struct(self.parse_struct_fields())
            }
            TokenKind::Interface => {
                self.advance();
                Type::Interface(self.parse_interface_methods())
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_type();
                self.expect(TokenKind::RParen);
                inner.node
            }
            _ => {
                self.error_at_current("expected type");
                Type::named("_")
            }
        }
    }

    fn parse_struct_fields(&mut self) -> Vec<Field> {
        self.expect(TokenKind::LBrace);
        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let before = self.pos;
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            let embedded = self.at(TokenKind::Star)
                || (self.at(TokenKind::Ident)
                    && matches!(
                        self.peek_nth(1),
                        TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Dot | TokenKind::String
                    ));
            if embedded {
                fields.push(Field::unnamed(self.parse_type()));
            } else {
                let mut names = vec![self.expect_ident()];
                while self.eat(TokenKind::Comma) {
                    names.push(self.expect_ident());
                }
                let ty = self.parse_type();
                fields.push(Field { names, ty });
            }
            // Field tags carry no meaning here.
            self.eat(TokenKind::String);
            self.expect_terminator();
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace);
        fields
    }

    fn parse_interface_methods(&mut self) -> Vec<Field> {
        self.expect(TokenKind::LBrace);
        let mut methods = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let before = self.pos;
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            if self.at(TokenKind::Ident) && self.peek_nth(1) == TokenKind::LParen {
                let name = self.expect_ident();
                let start = self.current_span();
                let (params, results) = self.parse_signature();
                let sig = Spanned::new(
                    Type::Func(FuncType { params, results }),
                    start.merge(self.prev_span()),
                );
                methods.push(Field {
                    names: vec![name],
                    ty: sig,
                });
            } else {
                methods.push(Field::unnamed(self.parse_type()));
            }
            self.expect_terminator();
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace);
        methods
    }
}
