use crate::span::Span;

/// Token categories of the source grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    Ident,
    Int,
    Float,
    Char,
    String,

    // Declaration keywords
    Package,
    Import,
    Func,
    Var,
    Const,
    Type,
    Struct,
    Interface,
    Map,
    Chan,

    // Control keywords
    If,
    Else,
    For,
    Range,
    Switch,
    Case,
    Default,
    Select,
    Break,
    Continue,
    Goto,
    Fallthrough,
    Return,
    Go,
    Defer,

    // Builtin type keywords
    IntTy,
    Int8Ty,
    Int16Ty,
    Int32Ty,
    Int64Ty,
    UintTy,
    Uint8Ty,
    Uint16Ty,
    Uint32Ty,
    Uint64Ty,
    Float32Ty,
    Float64Ty,
    BoolTy,
    StringTy,
    ByteTy,
    RuneTy,

    // Operators
    Plus,           // +
    Minus,          // -
    Star,           // *
    Slash,          // /
    Percent,        // %
    Amp,            // &
    Pipe,           // |
    Caret,          // ^
    Shl,            // <<
    Shr,            // >>
    AmpCaret,       // &^
    PlusAssign,     // +=
    MinusAssign,    // -=
    StarAssign,     // *=
    SlashAssign,    // /=
    PercentAssign,  // %=
    AmpAssign,      // &=
    PipeAssign,     // |=
    CaretAssign,    // ^=
    ShlAssign,      // <<=
    ShrAssign,      // >>=
    AmpCaretAssign, // &^=
    AndAnd,         // &&
    OrOr,           // ||
    Arrow,          // <-
    Inc,            // ++
    Dec,            // --
    EqEq,           // ==
    Lt,             // <
    Gt,             // >
    Assign,         // =
    Bang,           // !
    NotEq,          // !=
    LtEq,           // <=
    GtEq,           // >=
    Define,         // :=
    Ellipsis,       // ...

    // Delimiters
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    LBrace,    // {
    RBrace,    // }
    Comma,     // ,
    Dot,       // .
    Semicolon, // ;
    Colon,     // :

    // End of input; appended by the parser, never scanned.
    Eof,
}

/// Keyword table: lexeme text to category.
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("package", TokenKind::Package),
    ("import", TokenKind::Import),
    ("func", TokenKind::Func),
    ("var", TokenKind::Var),
    ("const", TokenKind::Const),
    ("type", TokenKind::Type),
    ("struct", TokenKind::Struct),
    ("interface", TokenKind::Interface),
    ("map", TokenKind::Map),
    ("chan", TokenKind::Chan),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("for", TokenKind::For),
    ("range", TokenKind::Range),
    ("switch", TokenKind::Switch),
    ("case", TokenKind::Case),
    ("default", TokenKind::Default),
    ("select", TokenKind::Select),
    ("break", TokenKind::Break),
    ("continue", TokenKind::Continue),
    ("goto", TokenKind::Goto),
    ("fallthrough", TokenKind::Fallthrough),
    ("return", TokenKind::Return),
    ("go", TokenKind::Go),
    ("defer", TokenKind::Defer),
    ("int", TokenKind::IntTy),
    ("int8", TokenKind::Int8Ty),
    ("int16", TokenKind::Int16Ty),
    ("int32", TokenKind::Int32Ty),
    ("int64", TokenKind::Int64Ty),
    ("uint", TokenKind::UintTy),
    ("uint8", TokenKind::Uint8Ty),
    ("uint16", TokenKind::Uint16Ty),
    ("uint32", TokenKind::Uint32Ty),
    ("uint64", TokenKind::Uint64Ty),
    ("float32", TokenKind::Float32Ty),
    ("float64", TokenKind::Float64Ty),
    ("bool", TokenKind::BoolTy),
    ("string", TokenKind::StringTy),
    ("byte", TokenKind::ByteTy),
    ("rune", TokenKind::RuneTy),
];

/// Punctuation table, longest lexemes first so a prefix scan finds the
/// maximal munch.
pub(crate) const PUNCTUATION: &[(&str, TokenKind)] = &[
    ("&^=", TokenKind::AmpCaretAssign),
    ("<<=", TokenKind::ShlAssign),
    (">>=", TokenKind::ShrAssign),
    ("...", TokenKind::Ellipsis),
    ("&^", TokenKind::AmpCaret),
    ("+=", TokenKind::PlusAssign),
    ("-=", TokenKind::MinusAssign),
    ("*=", TokenKind::StarAssign),
    ("/=", TokenKind::SlashAssign),
    ("%=", TokenKind::PercentAssign),
    ("&=", TokenKind::AmpAssign),
    ("|=", TokenKind::PipeAssign),
    ("^=", TokenKind::CaretAssign),
    ("<<", TokenKind::Shl),
    (">>", TokenKind::Shr),
    ("&&", TokenKind::AndAnd),
    ("||", TokenKind::OrOr),
    ("<-", TokenKind::Arrow),
    ("++", TokenKind::Inc),
    ("--", TokenKind::Dec),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::NotEq),
    ("<=", TokenKind::LtEq),
    (">=", TokenKind::GtEq),
    (":=", TokenKind::Define),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("&", TokenKind::Amp),
    ("|", TokenKind::Pipe),
    ("^", TokenKind::Caret),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("=", TokenKind::Assign),
    ("!", TokenKind::Bang),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    (";", TokenKind::Semicolon),
    (":", TokenKind::Colon),
];

impl TokenKind {
    /// Try to match an identifier string to a keyword.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        KEYWORDS
            .iter()
            .find(|(text, _)| *text == s)
            .map(|(_, kind)| *kind)
    }

    /// Longest punctuation lexeme that prefixes `rest`, with its byte length.
    pub fn match_punctuation(rest: &[u8]) -> Option<(TokenKind, usize)> {
        PUNCTUATION
            .iter()
            .find(|(text, _)| rest.starts_with(text.as_bytes()))
            .map(|(text, kind)| (*kind, text.len()))
    }

    pub fn is_builtin_type(self) -> bool {
        matches!(
            self,
            TokenKind::IntTy
                | TokenKind::Int8Ty
                | TokenKind::Int16Ty
                | TokenKind::Int32Ty
                | TokenKind::Int64Ty
                | TokenKind::UintTy
                | TokenKind::Uint8Ty
                | TokenKind::Uint16Ty
                | TokenKind::Uint32Ty
                | TokenKind::Uint64Ty
                | TokenKind::Float32Ty
                | TokenKind::Float64Ty
                | TokenKind::BoolTy
                | TokenKind::StringTy
                | TokenKind::ByteTy
                | TokenKind::RuneTy
        )
    }

    pub fn description(self) -> String {
        match self {
            TokenKind::Ident => "identifier".to_string(),
            TokenKind::Int => "integer literal".to_string(),
            TokenKind::Float => "float literal".to_string(),
            TokenKind::Char => "character literal".to_string(),
            TokenKind::String => "string literal".to_string(),
            TokenKind::Eof => "end of file".to_string(),
            other => match KEYWORDS
                .iter()
                .chain(PUNCTUATION.iter())
                .find(|(_, kind)| *kind == other)
            {
                Some((text, _)) => format!("'{}'", text),
                None => format!("{:?}", other),
            },
        }
    }
}

/// A scanned token: its text, its category and where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
            newline_before: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(TokenKind::from_keyword("func"), Some(TokenKind::Func));
        assert_eq!(TokenKind::from_keyword("int"), Some(TokenKind::IntTy));
        assert_eq!(TokenKind::from_keyword("fallthrough"), Some(TokenKind::Fallthrough));
        assert_eq!(TokenKind::from_keyword("main"), None);
        assert_eq!(TokenKind::from_keyword("Func"), None);
    }

    #[test]
    fn test_punctuation_longest_match() {
        assert_eq!(
            TokenKind::match_punctuation(b"&^= b"),
            Some((TokenKind::AmpCaretAssign, 3))
        );
        assert_eq!(TokenKind::match_punctuation(b"&^b"), Some((TokenKind::AmpCaret, 2)));
        assert_eq!(TokenKind::match_punctuation(b"&b"), Some((TokenKind::Amp, 1)));
        assert_eq!(TokenKind::match_punctuation(b"<-ch"), Some((TokenKind::Arrow, 2)));
        assert_eq!(TokenKind::match_punctuation(b"@"), None);
    }

    #[test]
    fn test_punctuation_table_is_longest_first() {
        for pair in PUNCTUATION.windows(2) {
            assert!(pair[0].0.len() >= pair[1].0.len(), "{:?}", pair);
        }
    }

    #[test]
    fn test_description() {
        assert_eq!(TokenKind::Func.description(), "'func'");
        assert_eq!(TokenKind::Define.description(), "':='");
        assert_eq!(TokenKind::Ident.description(), "identifier");
    }
}
