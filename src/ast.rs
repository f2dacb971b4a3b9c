pub mod display;
pub mod splice;

use crate::span::{Span, Spanned};

/// Identity of a statement within one file. Two statements that print the
/// same are still distinct nodes when their ids differ.
pub type NodeId = u32;

/// A parsed source file.
#[derive(Clone, Debug)]
pub struct File {
    pub package: Option<Spanned<String>>,
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,
    /// Next unused statement id.
    pub next_id: NodeId,
}

impl File {
    pub fn fresh_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn functions(&self) -> impl Iterator<Item = &FuncDecl> {
        self.decls.iter().filter_map(|decl| match decl {
            Decl::Func(func) => Some(func),
            Decl::Gen(_) => None,
        })
    }

    pub fn find_function(&self, name: &str) -> Option<&FuncDecl> {
        self.functions().find(|func| func.name.node == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub alias: Option<String>,
    pub path: String,
    pub span: Span,
}

/// Top-level declarations.
#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Func(FuncDecl),
    Gen(GenDecl),
}

/// `var`, `const` or `type` declaration, possibly grouped in parentheses.
#[derive(Clone, Debug, PartialEq)]
pub struct GenDecl {
    pub keyword: DeclKeyword,
    pub specs: Vec<Spec>,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclKeyword {
    Var,
    Const,
    Type,
}

impl DeclKeyword {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKeyword::Var => "var",
            DeclKeyword::Const => "const",
            DeclKeyword::Type => "type",
        }
    }
}

/// Specifications inside a general declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum Spec {
    Value(ValueSpec),
    Type(TypeSpec),
}

/// `a, b T = x, y`
#[derive(Clone, Debug, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<Spanned<String>>,
    pub ty: Option<Spanned<Type>>,
    pub values: Vec<Spanned<Expr>>,
}

/// `Name T` or `Name = T`
#[derive(Clone, Debug, PartialEq)]
pub struct TypeSpec {
    pub name: Spanned<String>,
    pub alias: bool,
    pub ty: Spanned<Type>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    /// Receiver bindings, as written. Legal input has at most one.
    pub recv: Option<Vec<Field>>,
    pub name: Spanned<String>,
    pub params: Vec<Field>,
    pub results: Vec<Field>,
    pub body: Option<Block>,
    pub span: Span,
}

/// One entry of a parameter, result, receiver or struct field list. An
/// entry binds zero or more names to one shared type.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub names: Vec<Spanned<String>>,
    pub ty: Spanned<Type>,
}

impl Field {
    pub fn unnamed(ty: Spanned<Type>) -> Self {
        Self {
            names: Vec::new(),
            ty,
        }
    }

    /// Number of values this entry stands for; an unnamed entry is one value.
    pub fn arity(&self) -> usize {
        self.names.len().max(1)
    }
}

/// Total number of values in a field list.
pub fn arity(fields: &[Field]) -> usize {
    fields.iter().map(Field::arity).sum()
}

/// Syntactic types (as written in source).
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    /// Builtin or locally declared type name.
    Named(String),
    /// `pkg.Name`
    Qualified(String, String),
    Pointer(Box<Type>),
    /// `[N]T`, or `[]T` when the length is absent.
    Array(Option<Box<Spanned<Expr>>>, Box<Type>),
    Map(Box<Type>, Box<Type>),
    Chan(ChanDir, Box<Type>),
    Func(FuncType),
    Struct(Vec<Field>),
    /// Method signatures (named entries) and embedded interfaces (unnamed).
    Interface(Vec<Field>),
    /// `...T`, only as the last parameter.
    Variadic(Box<Type>),
}

impl Type {
    pub fn named(name: &str) -> Self {
        Type::Named(name.to_string())
    }

    pub fn pointer_to(self) -> Self {
        Type::Pointer(Box::new(self))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncType {
    pub params: Vec<Field>,
    pub results: Vec<Field>,
}

/// A braced statement sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// A statement with its identity.
#[derive(Clone, Debug)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(id: NodeId, kind: StmtKind, span: Span) -> Self {
        Self { id, kind, span }
    }
}

impl PartialEq for Stmt {
    /// Structural equality; identity is `id`.
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

/// Statements.
#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Decl(GenDecl),
    Empty,
    Labeled {
        label: Spanned<String>,
        stmt: Box<Stmt>,
    },
    Expr(Spanned<Expr>),
    Send {
        chan: Spanned<Expr>,
        value: Spanned<Expr>,
    },
    IncDec {
        expr: Spanned<Expr>,
        inc: bool,
    },
    Assign {
        lhs: Vec<Spanned<Expr>>,
        op: AssignOp,
        rhs: Vec<Spanned<Expr>>,
    },
    Go(Spanned<Expr>),
    Defer(Spanned<Expr>),
    Return(Vec<Spanned<Expr>>),
    Branch {
        kind: BranchKind,
        label: Option<Spanned<String>>,
    },
    Block(Block),
    If {
        init: Option<Box<Stmt>>,
        cond: Spanned<Expr>,
        then: Block,
        els: Option<Box<Stmt>>,
    },
    Switch {
        init: Option<Box<Stmt>>,
        tag: Option<Spanned<Expr>>,
        clauses: Vec<CaseClause>,
    },
    TypeSwitch {
        init: Option<Box<Stmt>>,
        assign: Box<Stmt>,
        clauses: Vec<CaseClause>,
    },
    Select {
        clauses: Vec<CommClause>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Spanned<Expr>>,
        post: Option<Box<Stmt>>,
        body: Block,
    },
    Range {
        key: Option<Spanned<Expr>>,
        value: Option<Spanned<Expr>>,
        define: bool,
        expr: Spanned<Expr>,
        body: Block,
    },
}

/// `case a, b:` or `default:` (when `exprs` is `None`).
#[derive(Clone, Debug, PartialEq)]
pub struct CaseClause {
    pub exprs: Option<Vec<Spanned<Expr>>>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A `select` arm; `comm` is `None` for `default:`.
#[derive(Clone, Debug, PartialEq)]
pub struct CommClause {
    pub comm: Option<Box<Stmt>>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

impl BranchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchKind::Break => "break",
            BranchKind::Continue => "continue",
            BranchKind::Goto => "goto",
            BranchKind::Fallthrough => "fallthrough",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Define, // :=
    Assign, // =
    Add,    // +=
    Sub,    // -=
    Mul,    // *=
    Div,    // /=
    Rem,    // %=
    BitAnd, // &=
    BitOr,  // |=
    BitXor, // ^=
    Shl,    // <<=
    Shr,    // >>=
    AndNot, // &^=
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Define => ":=",
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::AndNot => "&^=",
        }
    }
}

/// Expressions.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Ident(String),
    Lit(Literal),
    Composite {
        ty: Option<Type>,
        elts: Vec<Spanned<Expr>>,
    },
    KeyValue {
        key: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },
    FuncLit {
        ty: FuncType,
        body: Block,
    },
    Paren(Box<Spanned<Expr>>),
    Selector {
        expr: Box<Spanned<Expr>>,
        sel: Spanned<String>,
    },
    Index {
        expr: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
    Slice {
        expr: Box<Spanned<Expr>>,
        low: Option<Box<Spanned<Expr>>>,
        high: Option<Box<Spanned<Expr>>>,
        max: Option<Box<Spanned<Expr>>>,
    },
    /// `x.(T)`, or `x.(type)` inside a type switch when `ty` is `None`.
    TypeAssert {
        expr: Box<Spanned<Expr>>,
        ty: Option<Type>,
    },
    Call {
        func: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
        ellipsis: bool,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Spanned<Expr>>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    /// A type in expression position: conversions, `make`, `new`.
    Type(Type),
}

impl Expr {
    pub fn ident(name: &str) -> Self {
        Expr::Ident(name.to_string())
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_ident() == Some("_")
    }

    /// Name of the called function for a plain `f(...)` call.
    pub fn callee_name(&self) -> Option<&str> {
        match self {
            Expr::Call { func, .. } => func.node.as_ident(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    Int(String),
    Float(String),
    Imag(String),
    Char(String),
    String(String),
}

impl Literal {
    pub fn text(&self) -> &str {
        match self {
            Literal::Int(s)
            | Literal::Float(s)
            | Literal::Imag(s)
            | Literal::Char(s)
            | Literal::String(s) => s,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,   // +
    Neg,    // -
    Not,    // !
    BitNot, // ^
    Deref,  // *
    Addr,   // &
    Recv,   // <-
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "^",
            UnaryOp::Deref => "*",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    LogOr,  // ||
    LogAnd, // &&
    Eq,     // ==
    Ne,     // !=
    Lt,     // <
    Le,     // <=
    Gt,     // >
    Ge,     // >=
    Add,    // +
    Sub,    // -
    BitOr,  // |
    BitXor, // ^
    Mul,    // *
    Div,    // /
    Rem,    // %
    Shl,    // <<
    Shr,    // >>
    BitAnd, // &
    AndNot, // &^
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::LogOr => "||",
            BinOp::LogAnd => "&&",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::BitAnd => "&",
            BinOp::AndNot => "&^",
        }
    }

    /// Precedence level, 1 (loosest) to 5 (tightest).
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::LogOr => 1,
            BinOp::LogAnd => 2,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 3,
            BinOp::Add | BinOp::Sub | BinOp::BitOr | BinOp::BitXor => 4,
            BinOp::Mul
            | BinOp::Div
            | BinOp::Rem
            | BinOp::Shl
            | BinOp::Shr
            | BinOp::BitAnd
            | BinOp::AndNot => 5,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 3
    }
}
