mod expr;
mod items;
mod stmt;

#[cfg(test)]
mod tests;

use crate::ast::*;
use crate::diagnostic::{Diagnostic, ErrorKind};
use crate::lexeme::{Token, TokenKind};
use crate::span::{Span, Spanned};

const MAX_NESTING_DEPTH: u32 = 256;

/// Recursive-descent parser over a scanned token stream.
///
/// Statement terminators follow the usual newline rule: a line break after
/// an identifier, literal, closing bracket, `++`/`--` or one of the
/// keywords `break`, `continue`, `fallthrough`, `return` ends the statement.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    depth: u32,
    next_id: NodeId,
    /// Inside an `if`/`for`/`switch` header, where `T{` opens the body.
    no_composite: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, file_id: u16) -> Self {
        Self {
            tokens: insert_terminators(tokens, file_id),
            pos: 0,
            diagnostics: Vec::new(),
            depth: 0,
            next_id: 0,
            no_composite: false,
        }
    }

    fn enter_nesting(&mut self) -> bool {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            self.error_with_help(
                "nesting depth exceeded (maximum 256 levels)",
                "extract deeply nested code into functions",
            );
            return false;
        }
        true
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    pub fn parse_file(mut self) -> Result<File, Vec<Diagnostic>> {
        let package = if self.eat(TokenKind::Package) {
            let name = self.expect_ident();
            self.expect_terminator();
            Some(name)
        } else {
            None
        };

        let imports = self.parse_imports();
        let decls = self.parse_top_decls();

        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }
        Ok(File {
            package,
            imports,
            decls,
            next_id: self.next_id,
        })
    }

    /// Parse a standalone statement sequence, as found inside a block.
    pub fn parse_stmts(mut self) -> Result<(Vec<Stmt>, NodeId), Vec<Diagnostic>> {
        let stmts = self.parse_stmt_list();
        if !self.at(TokenKind::Eof) {
            self.error_at_current("expected end of input");
        }
        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }
        Ok((stmts, self.next_id))
    }

    fn parse_imports(&mut self) -> Vec<Import> {
        let mut imports = Vec::new();
        while self.at(TokenKind::Import) {
            self.advance();
            if self.eat(TokenKind::LParen) {
                while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                    let before = self.pos;
                    if let Some(import) = self.parse_import_spec() {
                        imports.push(import);
                    }
                    if !self.at(TokenKind::RParen) {
                        self.expect_terminator();
                    }
                    if self.pos == before {
                        self.advance();
                    }
                }
                self.expect(TokenKind::RParen);
            } else if let Some(import) = self.parse_import_spec() {
                imports.push(import);
            }
            self.expect_terminator();
        }
        imports
    }

    fn parse_import_spec(&mut self) -> Option<Import> {
        let start = self.current_span();
        let alias = match self.peek() {
            TokenKind::Ident | TokenKind::Dot => Some(self.advance().lexeme.clone()),
            _ => None,
        };
        if !self.at(TokenKind::String) {
            self.error_at_current("expected import path");
            return None;
        }
        let path = self.advance().lexeme.clone();
        Some(Import {
            alias,
            path,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_top_decls(&mut self) -> Vec<Decl> {
        let mut decls = Vec::new();
        while !self.at(TokenKind::Eof) {
            let before = self.pos;
            match self.peek() {
                TokenKind::Semicolon => {
                    self.advance();
                    continue;
                }
                TokenKind::Func => decls.push(Decl::Func(self.parse_func_decl())),
                TokenKind::Var | TokenKind::Const | TokenKind::Type => {
                    decls.push(Decl::Gen(self.parse_gen_decl()))
                }
                TokenKind::Import => {
                    self.error_with_help(
                        "imports must appear before other declarations",
                        "move this import to the top of the file",
                    );
                    self.parse_imports();
                }
                _ => {
                    self.error_at_current("expected declaration");
                    self.advance();
                }
            }
            if !self.at(TokenKind::Eof) && self.pos != before {
                self.expect_terminator();
            }
        }
        decls
    }

    // --- Token helpers ---

    fn fresh_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn stmt(&mut self, kind: StmtKind, span: Span) -> Stmt {
        let id = self.fresh_id();
        Stmt::new(id, kind, span)
    }

    fn peek(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn peek_nth(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Span {
        if self.at(kind) {
            let span = self.current_span();
            self.advance();
            span
        } else {
            self.error_at_current(&format!("expected {}", kind.description()));
            self.current_span()
        }
    }

    /// A statement or declaration ends at `;`, a newline, or before `)`/`}`.
    fn expect_terminator(&mut self) {
        match self.peek() {
            TokenKind::Semicolon => {
                self.advance();
            }
            TokenKind::RParen | TokenKind::RBrace | TokenKind::Eof => {}
            _ => {
                self.error_at_current("expected ';' or newline");
                self.synchronize();
            }
        }
    }

    /// Skip to the end of the current statement after an error.
    fn synchronize(&mut self) {
        while !matches!(
            self.peek(),
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        ) {
            self.advance();
        }
        self.eat(TokenKind::Semicolon);
    }

    fn expect_ident(&mut self) -> Spanned<String> {
        if self.at(TokenKind::Ident) {
            let tok = self.advance();
            Spanned::new(tok.lexeme.clone(), tok.span)
        } else {
            self.error_at_current("expected identifier");
            Spanned::new("_".to_string(), self.current_span())
        }
    }

    fn describe_current(&self) -> String {
        let tok = &self.tokens[self.pos];
        match tok.kind {
            TokenKind::Semicolon if tok.lexeme == "\n" => "newline".to_string(),
            TokenKind::Ident => format!("identifier '{}'", tok.lexeme),
            TokenKind::Int | TokenKind::Float | TokenKind::Char | TokenKind::String => {
                format!("{} {}", tok.kind.description(), tok.lexeme)
            }
            kind => kind.description(),
        }
    }

    fn error_at_current(&mut self, msg: &str) {
        let found = self.describe_current();
        let span = self.current_span();
        self.diagnostics.push(Diagnostic::error(
            ErrorKind::Parse,
            format!("{}, found {}", msg, found),
            span,
        ));
    }

    fn error_with_help(&mut self, msg: &str, help: &str) {
        let span = self.current_span();
        self.diagnostics.push(
            Diagnostic::error(ErrorKind::Parse, msg.to_string(), span).with_help(help.to_string()),
        );
    }

    fn error_at(&mut self, msg: &str, span: Span) {
        self.diagnostics
            .push(Diagnostic::error(ErrorKind::Parse, msg.to_string(), span));
    }
}

fn ends_statement(kind: TokenKind) -> bool {
    kind.is_builtin_type()
        || matches!(
            kind,
            TokenKind::Ident
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::Char
                | TokenKind::String
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Fallthrough
                | TokenKind::Return
                | TokenKind::Inc
                | TokenKind::Dec
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        )
}

/// Turn line breaks that end a statement into `;` tokens and append `Eof`.
fn insert_terminators(tokens: Vec<Token>, file_id: u16) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len() + tokens.len() / 4 + 2);
    for tok in tokens {
        if tok.newline_before {
            if let Some(prev) = out.last() {
                if ends_statement(prev.kind) {
                    let at = Span::new(file_id, prev.span.end, prev.span.end);
                    out.push(Token::new(TokenKind::Semicolon, "\n", at));
                }
            }
        }
        out.push(tok);
    }
    let end = out.last().map(|t| t.span.end).unwrap_or(0);
    if out.last().is_some_and(|t| ends_statement(t.kind)) {
        out.push(Token::new(
            TokenKind::Semicolon,
            "\n",
            Span::new(file_id, end, end),
        ));
    }
    out.push(Token::new(TokenKind::Eof, "", Span::new(file_id, end, end)));
    out
}
