//! Scanner: comment stripping and tokenization.
//!
//! Scanning happens in two passes. [`preprocess`] blanks every comment byte
//! while leaving literals alone, so that the [`Lexer`] never has to think
//! about comments. Both passes bounds-check every read; running off the end
//! of the buffer is a scan error.

use crate::diagnostic::{Diagnostic, ErrorKind};
use crate::lexeme::{Token, TokenKind};
use crate::span::Span;

/// Knobs for the scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanOptions {
    /// Reject `//` and `/*` inside string and character literals.
    pub strict_literals: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            strict_literals: true,
        }
    }
}

fn scan_error(message: String, file_id: u16, start: usize, end: usize) -> Diagnostic {
    Diagnostic::error(
        ErrorKind::Scan,
        message,
        Span::new(file_id, start as u32, end as u32),
    )
}

/// Blank out every comment (delimiters included) with spaces.
///
/// The result has the same length as the input. Newlines inside block
/// comments survive so that line structure and byte offsets are unchanged.
pub fn preprocess(source: &str, file_id: u16, options: ScanOptions) -> Result<String, Diagnostic> {
    let src = source.as_bytes();
    let mut out = src.to_vec();
    let mut pos = 0;

    while pos < src.len() {
        match src[pos] {
            b'/' if src.get(pos + 1) == Some(&b'/') => {
                while pos < src.len() && src[pos] != b'\n' {
                    out[pos] = b' ';
                    pos += 1;
                }
            }
            b'/' if src.get(pos + 1) == Some(&b'*') => {
                let start = pos;
                let close = src[pos + 2..]
                    .windows(2)
                    .position(|w| w == b"*/")
                    .map(|offset| pos + 2 + offset);
                let Some(close) = close else {
                    return Err(scan_error(
                        "unterminated block comment".to_string(),
                        file_id,
                        start,
                        src.len(),
                    )
                    .with_help("close the comment with `*/`".to_string()));
                };
                for byte in &mut out[start..close + 2] {
                    if *byte != b'\n' {
                        *byte = b' ';
                    }
                }
                pos = close + 2;
            }
            quote @ (b'"' | b'\'') => {
                let end = skip_quoted(src, pos, quote, file_id)?;
                check_literal_body(src, pos, end, file_id, options)?;
                pos = end;
            }
            b'`' => {
                let end = skip_raw(src, pos, file_id)?;
                check_literal_body(src, pos, end, file_id, options)?;
                pos = end;
            }
            _ => pos += 1,
        }
    }

    String::from_utf8(out).map_err(|_| {
        scan_error(
            "source is not valid UTF-8".to_string(),
            file_id,
            0,
            src.len(),
        )
    })
}

/// Return the index one past the closing quote of the literal opened at `start`.
fn skip_quoted(src: &[u8], start: usize, quote: u8, file_id: u16) -> Result<usize, Diagnostic> {
    let what = if quote == b'"' {
        "string"
    } else {
        "character"
    };
    let mut pos = start + 1;
    loop {
        let Some(&byte) = src.get(pos) else {
            return Err(scan_error(
                format!("unterminated {} literal", what),
                file_id,
                start,
                src.len(),
            ));
        };
        match byte {
            b'\\' => {
                if pos + 1 >= src.len() {
                    return Err(scan_error(
                        format!("escape sequence in {} literal runs past end of input", what),
                        file_id,
                        pos,
                        src.len(),
                    ));
                }
                pos += 2;
            }
            b'\n' => {
                return Err(scan_error(
                    format!("unterminated {} literal", what),
                    file_id,
                    start,
                    pos,
                )
                .with_help(format!("{} literals cannot span lines", what)));
            }
            b if b == quote => return Ok(pos + 1),
            _ => pos += 1,
        }
    }
}

fn skip_raw(src: &[u8], start: usize, file_id: u16) -> Result<usize, Diagnostic> {
    match src[start + 1..].iter().position(|&b| b == b'`') {
        Some(offset) => Ok(start + 1 + offset + 1),
        None => Err(scan_error(
            "unterminated raw string literal".to_string(),
            file_id,
            start,
            src.len(),
        )),
    }
}

fn check_literal_body(
    src: &[u8],
    start: usize,
    end: usize,
    file_id: u16,
    options: ScanOptions,
) -> Result<(), Diagnostic> {
    if !options.strict_literals {
        return Ok(());
    }
    let body = &src[start..end];
    if body.windows(2).any(|w| w == b"//" || w == b"/*") {
        return Err(scan_error(
            "comment opener inside a literal".to_string(),
            file_id,
            start,
            end,
        )
        .with_help("set `strict_literals = false` under [scan] to accept it".to_string()));
    }
    Ok(())
}

/// Scan `source` into tokens. Comments are stripped first.
pub fn tokenize(
    source: &str,
    file_id: u16,
    options: ScanOptions,
) -> Result<Vec<Token>, Vec<Diagnostic>> {
    let stripped = preprocess(source, file_id, options).map_err(|d| vec![d])?;
    let (tokens, diagnostics) = Lexer::new(&stripped, file_id).tokenize();
    if diagnostics.is_empty() {
        Ok(tokens)
    } else {
        Err(diagnostics)
    }
}

pub struct Lexer<'src> {
    source: &'src [u8],
    file_id: u16,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    /// A newline was crossed since the last token.
    saw_newline: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, file_id: u16) -> Self {
        Self {
            source: source.as_bytes(),
            file_id,
            pos: 0,
            diagnostics: Vec::new(),
            saw_newline: false,
        }
    }

    /// Tokenize comment-free input.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        while let Some(tok) = self.next_token() {
            tokens.push(tok);
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Option<Token> {
        loop {
            self.skip_whitespace();

            let ch = self.peek()?;
            let start = self.pos;

            let token = if is_ident_start(ch) {
                Some(self.scan_ident_or_keyword())
            } else if ch.is_ascii_digit()
                || (ch == b'.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
            {
                Some(self.scan_number())
            } else {
                match ch {
                    b'"' | b'\'' => self.scan_quoted(ch),
                    b'`' => self.scan_raw(),
                    _ => self.scan_punctuation(start),
                }
            };

            if let Some(mut tok) = token {
                tok.newline_before = self.saw_newline;
                self.saw_newline = false;
                return Some(tok);
            }
            // error recorded, keep scanning
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_ascii_whitespace() {
                break;
            }
            if ch == b'\n' {
                self.saw_newline = true;
            }
            self.pos += 1;
        }
    }

    fn scan_ident_or_keyword(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        let text = self.text(start, self.pos);
        let kind = TokenKind::from_keyword(&text).unwrap_or(TokenKind::Ident);
        self.make_token(kind, text, start)
    }

    /// Numeric literal: optional `0x` prefix, digit run, optional fraction,
    /// optional exponent. Anything glued on afterwards is malformed.
    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        let mut kind = TokenKind::Int;

        let is_hex = self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X'));
        if is_hex {
            self.pos += 2;
            let digits = self.eat_while(|c| c.is_ascii_hexdigit());
            let mut fraction = 0;
            if self.peek() == Some(b'.') {
                self.pos += 1;
                kind = TokenKind::Float;
                fraction = self.eat_while(|c| c.is_ascii_hexdigit());
            }
            if digits == 0 && fraction == 0 {
                self.error(
                    "hexadecimal literal has no digits".to_string(),
                    start,
                    self.pos,
                );
                return self.malformed(start);
            }
            if matches!(self.peek(), Some(b'p' | b'P')) {
                kind = TokenKind::Float;
                if !self.scan_exponent(start) {
                    return self.malformed(start);
                }
            } else if kind == TokenKind::Float {
                self.error(
                    "hexadecimal mantissa requires a 'p' exponent".to_string(),
                    start,
                    self.pos,
                );
                return self.malformed(start);
            }
        } else {
            self.eat_while(|c| c.is_ascii_digit());
            if self.peek() == Some(b'.') && self.peek_at(1) != Some(b'.') {
                self.pos += 1;
                kind = TokenKind::Float;
                self.eat_while(|c| c.is_ascii_digit());
            }
            if matches!(self.peek(), Some(b'e' | b'E')) {
                kind = TokenKind::Float;
                if !self.scan_exponent(start) {
                    return self.malformed(start);
                }
            }
        }

        match self.peek() {
            Some(b'i') if !self.peek_at(1).is_some_and(is_ident_continue) => {
                self.pos += 1;
                self.diagnostics.push(
                    scan_error(
                        format!(
                            "imaginary literal '{}' is not supported",
                            self.text(start, self.pos)
                        ),
                        self.file_id,
                        start,
                        self.pos,
                    )
                    .with_help("the target grammar has no complex numbers".to_string()),
                );
                self.malformed(start)
            }
            Some(c) if is_ident_continue(c) || c == b'.' && kind == TokenKind::Float => {
                self.eat_while(|c| is_ident_continue(c) || c == b'.');
                self.error(
                    format!("malformed numeric literal '{}'", self.text(start, self.pos)),
                    start,
                    self.pos,
                );
                self.malformed(start)
            }
            _ => {
                let text = self.text(start, self.pos);
                self.make_token(kind, text, start)
            }
        }
    }

    /// Consume `e`/`p`, an optional sign and at least one digit.
    fn scan_exponent(&mut self, start: usize) -> bool {
        self.pos += 1;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        if self.eat_while(|c| c.is_ascii_digit()) == 0 {
            self.error(
                format!("exponent has no digits in '{}'", self.text(start, self.pos)),
                start,
                self.pos,
            );
            return false;
        }
        true
    }

    /// Placeholder for a literal that already produced an error.
    fn malformed(&self, start: usize) -> Token {
        self.make_token(TokenKind::Int, self.text(start, self.pos), start)
    }

    fn scan_quoted(&mut self, quote: u8) -> Option<Token> {
        let start = self.pos;
        match skip_quoted(self.source, start, quote, self.file_id) {
            Ok(end) => {
                self.pos = end;
                let kind = if quote == b'"' {
                    TokenKind::String
                } else {
                    TokenKind::Char
                };
                if kind == TokenKind::Char && end - start == 2 {
                    self.error("empty character literal".to_string(), start, end);
                    return None;
                }
                Some(self.make_token(kind, self.text(start, end), start))
            }
            Err(diag) => {
                self.diagnostics.push(diag);
                self.pos = self.source.len();
                None
            }
        }
    }

    fn scan_raw(&mut self) -> Option<Token> {
        let start = self.pos;
        match skip_raw(self.source, start, self.file_id) {
            Ok(end) => {
                self.pos = end;
                Some(self.make_token(TokenKind::String, self.text(start, end), start))
            }
            Err(diag) => {
                self.diagnostics.push(diag);
                self.pos = self.source.len();
                None
            }
        }
    }

    fn scan_punctuation(&mut self, start: usize) -> Option<Token> {
        match TokenKind::match_punctuation(&self.source[start..]) {
            Some((kind, len)) => {
                self.pos += len;
                Some(self.make_token(kind, self.text(start, self.pos), start))
            }
            None => {
                let ch = self.text_char(start);
                self.pos += ch.len_utf8();
                self.diagnostics.push(
                    scan_error(
                        format!("unexpected character '{}' (U+{:04X})", ch, ch as u32),
                        self.file_id,
                        start,
                        self.pos,
                    )
                    .with_help("this character is not part of the source grammar".to_string()),
                );
                None
            }
        }
    }

    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) -> usize {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn text(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.source[start..end]).into_owned()
    }

    fn text_char(&self, start: usize) -> char {
        std::str::from_utf8(&self.source[start..])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn error(&mut self, message: String, start: usize, end: usize) {
        self.diagnostics
            .push(scan_error(message, self.file_id, start, end));
    }

    fn make_token(&self, kind: TokenKind, lexeme: String, start: usize) -> Token {
        Token::new(
            kind,
            lexeme,
            Span::new(self.file_id, start as u32, self.pos as u32),
        )
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        let tokens = tokenize(source, 0, ScanOptions::default())
            .unwrap_or_else(|d| panic!("unexpected errors: {:?}", d));
        tokens.into_iter().map(|t| t.kind).collect()
    }

    fn lex_lexemes(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source, 0, ScanOptions::default())
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.lexeme))
            .collect()
    }

    fn lex_errors(source: &str) -> Vec<Diagnostic> {
        match tokenize(source, 0, ScanOptions::default()) {
            Ok(tokens) => panic!("expected scan errors, got {:?}", tokens),
            Err(diags) => diags,
        }
    }

    #[test]
    fn test_preprocess_blanks_line_comment() {
        let src = "// note\nfunc f(x int) int { return x }";
        let out = preprocess(src, 0, ScanOptions::default()).unwrap();
        assert_eq!(out, "       \nfunc f(x int) int { return x }");
    }

    #[test]
    fn test_scanner_scenario() {
        let src = "// note\nfunc f(x int) int { return x }";
        assert_eq!(
            lex_lexemes(src),
            vec![
                (TokenKind::Func, "func".to_string()),
                (TokenKind::Ident, "f".to_string()),
                (TokenKind::LParen, "(".to_string()),
                (TokenKind::Ident, "x".to_string()),
                (TokenKind::IntTy, "int".to_string()),
                (TokenKind::RParen, ")".to_string()),
                (TokenKind::IntTy, "int".to_string()),
                (TokenKind::LBrace, "{".to_string()),
                (TokenKind::Return, "return".to_string()),
                (TokenKind::Ident, "x".to_string()),
                (TokenKind::RBrace, "}".to_string()),
            ]
        );
    }

    #[test]
    fn test_preprocess_block_comment_keeps_newlines() {
        let src = "a /* one\ntwo */ b";
        let out = preprocess(src, 0, ScanOptions::default()).unwrap();
        assert_eq!(out.len(), src.len());
        assert_eq!(out, "a       \n       b");
    }

    #[test]
    fn test_preprocess_leaves_literals_alone() {
        let src = "s := \"a\\\"b\" + 'x' // tail";
        let out = preprocess(src, 0, ScanOptions::default()).unwrap();
        assert_eq!(out, "s := \"a\\\"b\" + 'x'        ");
    }

    #[test]
    fn test_escaped_quote_does_not_end_literal() {
        let kinds = lex_lexemes(r#"x := "say \"hi\"" + y"#);
        assert_eq!(kinds[2], (TokenKind::String, r#""say \"hi\"""#.to_string()));
        assert_eq!(kinds[4], (TokenKind::Ident, "y".to_string()));
    }

    #[test]
    fn test_escaped_char_quote() {
        let kinds = lex_lexemes(r"c := '\''");
        assert_eq!(kinds[2], (TokenKind::Char, r"'\''".to_string()));
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            lex("package import func var const type struct interface map chan"),
            vec![
                TokenKind::Package,
                TokenKind::Import,
                TokenKind::Func,
                TokenKind::Var,
                TokenKind::Const,
                TokenKind::Type,
                TokenKind::Struct,
                TokenKind::Interface,
                TokenKind::Map,
                TokenKind::Chan,
            ]
        );
        assert_eq!(
            lex("go defer goto fallthrough select switch case default range"),
            vec![
                TokenKind::Go,
                TokenKind::Defer,
                TokenKind::Goto,
                TokenKind::Fallthrough,
                TokenKind::Select,
                TokenKind::Switch,
                TokenKind::Case,
                TokenKind::Default,
                TokenKind::Range,
            ]
        );
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            lex("a &^= b &^ c && d <- e := f ..."),
            vec![
                TokenKind::Ident,
                TokenKind::AmpCaretAssign,
                TokenKind::Ident,
                TokenKind::AmpCaret,
                TokenKind::Ident,
                TokenKind::AndAnd,
                TokenKind::Ident,
                TokenKind::Arrow,
                TokenKind::Ident,
                TokenKind::Define,
                TokenKind::Ident,
                TokenKind::Ellipsis,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            lex_lexemes("42 0x1F 3.14 .5 1e9 2.5E-3 7. 0x1p4"),
            vec![
                (TokenKind::Int, "42".to_string()),
                (TokenKind::Int, "0x1F".to_string()),
                (TokenKind::Float, "3.14".to_string()),
                (TokenKind::Float, ".5".to_string()),
                (TokenKind::Float, "1e9".to_string()),
                (TokenKind::Float, "2.5E-3".to_string()),
                (TokenKind::Float, "7.".to_string()),
                (TokenKind::Float, "0x1p4".to_string()),
            ]
        );
    }

    #[test]
    fn test_newline_flag() {
        let tokens = tokenize("a\nb c", 0, ScanOptions::default()).unwrap();
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
        assert!(!tokens[2].newline_before);
    }

    #[test]
    fn test_spans_survive_comment_stripping() {
        let tokens = tokenize("/* xx */ foo", 0, ScanOptions::default()).unwrap();
        assert_eq!(tokens[0].span, Span::new(0, 9, 12));
    }

    // --- Error path tests ---

    #[test]
    fn test_error_imaginary_literal() {
        let diags = lex_errors("x := 3i");
        assert_eq!(diags[0].kind, ErrorKind::Scan);
        assert!(diags[0].message.contains("imaginary"), "{}", diags[0].message);
    }

    #[test]
    fn test_error_hex_without_digits() {
        let diags = lex_errors("x := 0x");
        assert!(diags[0].message.contains("no digits"), "{}", diags[0].message);
    }

    #[test]
    fn test_error_exponent_without_digits() {
        let diags = lex_errors("x := 1e+");
        assert!(diags[0].message.contains("exponent"), "{}", diags[0].message);
    }

    #[test]
    fn test_error_glued_digit_run() {
        let diags = lex_errors("x := 12abc");
        assert!(diags[0].message.contains("malformed"), "{}", diags[0].message);
        assert!(diags[0].message.contains("12abc"));
    }

    #[test]
    fn test_error_unterminated_block_comment() {
        let diags = lex_errors("a /* never closed");
        assert!(diags[0].message.contains("unterminated block comment"));
        assert_eq!(diags[0].span.end as usize, "a /* never closed".len());
    }

    #[test]
    fn test_error_unterminated_string() {
        let diags = lex_errors("s := \"abc");
        assert!(diags[0].message.contains("unterminated string"));
    }

    #[test]
    fn test_error_string_across_newline() {
        let diags = lex_errors("s := \"abc\nd\"");
        assert!(diags[0].message.contains("unterminated string"));
    }

    #[test]
    fn test_error_escape_at_end_of_buffer() {
        let diags = lex_errors("c := '\\");
        assert!(diags[0].message.contains("past end of input"), "{}", diags[0].message);
    }

    #[test]
    fn test_error_unterminated_char() {
        let diags = lex_errors("c := 'a");
        assert!(diags[0].message.contains("unterminated character"));
    }

    #[test]
    fn test_error_comment_opener_in_string() {
        let diags = lex_errors("s := \"http://example\"");
        assert!(diags[0].message.contains("comment opener"));
        let diags = lex_errors("s := `a /* b`");
        assert!(diags[0].message.contains("comment opener"));
    }

    #[test]
    fn test_relaxed_literals_accept_comment_opener() {
        let options = ScanOptions {
            strict_literals: false,
        };
        let tokens = tokenize("s := \"http://example\"", 0, options).unwrap();
        assert_eq!(tokens[2].lexeme, "\"http://example\"");
    }

    #[test]
    fn test_error_unexpected_character() {
        let diags = lex_errors("a @ b");
        assert!(diags[0].message.contains("unexpected character '@'"));
        assert!(diags[0].help.is_some());
    }
}
