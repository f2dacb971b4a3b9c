//! Legality sieve: constructs the target grammar cannot express.
//!
//! Any match is fatal. The engine runs these checks on every statement it
//! visits; [`check_file`] runs them alone over a whole tree.

use crate::ast::*;
use crate::diagnostic::{Diagnostic, ErrorKind};
use crate::span::{Span, Spanned};

/// A forbidden source construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Construct {
    LabeledJump,
    Fallthrough,
    LabeledStatement,
    DeferredCall,
    ConcurrentLaunch,
    ChannelSend,
    ChannelReceive,
    Select,
    TypeSwitch,
    TypeAssertion,
    SliceExpression,
    ImaginaryLiteral,
    /// A map element read or update where no temporary can be placed.
    MapSubscript,
}

impl Construct {
    pub fn name(self) -> &'static str {
        match self {
            Construct::LabeledJump => "goto statement",
            Construct::Fallthrough => "fallthrough statement",
            Construct::LabeledStatement => "labeled statement",
            Construct::DeferredCall => "defer statement",
            Construct::ConcurrentLaunch => "go statement",
            Construct::ChannelSend => "channel send",
            Construct::ChannelReceive => "channel receive",
            Construct::Select => "select statement",
            Construct::TypeSwitch => "type switch",
            Construct::TypeAssertion => "type assertion",
            Construct::SliceExpression => "slice expression",
            Construct::ImaginaryLiteral => "imaginary literal",
            Construct::MapSubscript => "map subscript in this position",
        }
    }

    fn help(self) -> &'static str {
        match self {
            Construct::LabeledJump => "restructure the jump as a loop with break or continue",
            Construct::Fallthrough => "merge the case bodies or call a shared function",
            Construct::LabeledStatement => "remove the label; labeled break and continue need a flag variable instead",
            Construct::DeferredCall => "call the function explicitly before each return",
            Construct::ConcurrentLaunch => "use a timer or the host's task scheduling instead",
            Construct::ChannelSend | Construct::ChannelReceive | Construct::Select => {
                "channels have no counterpart; pass values through function calls"
            }
            Construct::TypeSwitch | Construct::TypeAssertion => {
                "dispatch on a concrete tag value instead of the dynamic type"
            }
            Construct::SliceExpression => "copy the elements with an explicit loop",
            Construct::ImaginaryLiteral => "complex numbers are not available",
            Construct::MapSubscript => "read the element into a variable in a separate statement first",
        }
    }
}

pub(super) fn illegal(construct: Construct, span: Span) -> Diagnostic {
    Diagnostic::error(
        ErrorKind::IllegalConstruct(construct),
        format!("{} is not supported by the target grammar", construct.name()),
        span,
    )
    .with_help(construct.help().to_string())
}

/// Declaration-level checks: receiver count and pointer results.
pub(super) fn check_func(func: &FuncDecl) -> Result<(), Diagnostic> {
    if let Some(recv) = &func.recv {
        if arity(recv) > 1 {
            let span = recv
                .iter()
                .flat_map(|f| f.names.iter().map(|n| n.span))
                .reduce(Span::merge)
                .unwrap_or(func.name.span);
            return Err(Diagnostic::error(
                ErrorKind::MultiReceiver,
                format!("function '{}' declares more than one receiver", func.name.node),
                span,
            ));
        }
    }
    if let Some(pointer) = func.results.iter().find(|r| r.ty.node.is_pointer()) {
        return Err(Diagnostic::error(
            ErrorKind::PointerResult,
            format!("function '{}' returns a pointer", func.name.node),
            pointer.ty.span,
        )
        .with_note("the target grammar has no return-by-pointer convention".to_string())
        .with_help("return the value through an output parameter instead".to_string()));
    }
    Ok(())
}

/// Check one statement's own form and every expression it holds directly.
/// Nested statements are checked when the engine reaches them.
pub(super) fn check_stmt(stmt: &Stmt) -> Result<(), Diagnostic> {
    let span = stmt.span;
    match &stmt.kind {
        StmtKind::Branch {
            kind: BranchKind::Goto,
            ..
        } => Err(illegal(Construct::LabeledJump, span)),
        StmtKind::Branch {
            kind: BranchKind::Fallthrough,
            ..
        } => Err(illegal(Construct::Fallthrough, span)),
        StmtKind::Labeled { label, .. } => Err(illegal(Construct::LabeledStatement, label.span)),
        StmtKind::Defer(_) => Err(illegal(Construct::DeferredCall, span)),
        StmtKind::Go(_) => Err(illegal(Construct::ConcurrentLaunch, span)),
        StmtKind::Send { .. } => Err(illegal(Construct::ChannelSend, span)),
        StmtKind::Select { .. } => Err(illegal(Construct::Select, span)),
        StmtKind::TypeSwitch { .. } => Err(illegal(Construct::TypeSwitch, span)),
        StmtKind::Decl(gen) => check_gen_decl(gen),
        StmtKind::Expr(e) => check_expr(e),
        StmtKind::IncDec { expr, .. } => check_expr(expr),
        StmtKind::Assign { lhs, rhs, .. } => check_exprs(lhs).and_then(|_| check_exprs(rhs)),
        StmtKind::Return(values) => check_exprs(values),
        StmtKind::If { cond, .. } => check_expr(cond),
        StmtKind::Switch { tag, clauses, .. } => {
            if let Some(tag) = tag {
                check_expr(tag)?;
            }
            for clause in clauses {
                if let Some(exprs) = &clause.exprs {
                    check_exprs(exprs)?;
                }
            }
            Ok(())
        }
        StmtKind::For { cond, .. } => match cond {
            Some(cond) => check_expr(cond),
            None => Ok(()),
        },
        StmtKind::Range {
            key, value, expr, ..
        } => {
            for e in [key, value].into_iter().flatten() {
                check_expr(e)?;
            }
            check_expr(expr)
        }
        StmtKind::Branch { .. } | StmtKind::Block(_) | StmtKind::Empty => Ok(()),
    }
}

pub(super) fn check_gen_decl(gen: &GenDecl) -> Result<(), Diagnostic> {
    for spec in &gen.specs {
        if let Spec::Value(v) = spec {
            check_exprs(&v.values)?;
        }
    }
    Ok(())
}

fn check_exprs(exprs: &[Spanned<Expr>]) -> Result<(), Diagnostic> {
    exprs.iter().try_for_each(check_expr)
}

/// Check an expression tree, including the bodies of function literals.
pub(super) fn check_expr(expr: &Spanned<Expr>) -> Result<(), Diagnostic> {
    let span = expr.span;
    match &expr.node {
        Expr::Ident(_) | Expr::Type(_) => Ok(()),
        Expr::Lit(Literal::Imag(_)) => Err(illegal(Construct::ImaginaryLiteral, span)),
        Expr::Lit(_) => Ok(()),
        Expr::TypeAssert { .. } => Err(illegal(Construct::TypeAssertion, span)),
        Expr::Slice { .. } => Err(illegal(Construct::SliceExpression, span)),
        Expr::Unary {
            op: UnaryOp::Recv, ..
        } => Err(illegal(Construct::ChannelReceive, span)),
        Expr::Unary { expr, .. } => check_expr(expr),
        Expr::Composite { elts, .. } => check_exprs(elts),
        Expr::KeyValue { key, value } => check_expr(key).and_then(|_| check_expr(value)),
        Expr::FuncLit { body, .. } => check_stmts(&body.stmts),
        Expr::Paren(inner) => check_expr(inner),
        Expr::Selector { expr, .. } => check_expr(expr),
        Expr::Index { expr, index } => check_expr(expr).and_then(|_| check_expr(index)),
        Expr::Call { func, args, .. } => check_expr(func).and_then(|_| check_exprs(args)),
        Expr::Binary { lhs, rhs, .. } => check_expr(lhs).and_then(|_| check_expr(rhs)),
    }
}

fn check_stmts(stmts: &[Stmt]) -> Result<(), Diagnostic> {
    stmts.iter().try_for_each(check_stmt_deep)
}

fn check_stmt_deep(stmt: &Stmt) -> Result<(), Diagnostic> {
    check_stmt(stmt)?;
    let single = |s: &Option<Box<Stmt>>| match s {
        Some(s) => check_stmt_deep(s),
        None => Ok(()),
    };
    match &stmt.kind {
        StmtKind::Block(block) => check_stmts(&block.stmts),
        StmtKind::If {
            init, then, els, ..
        } => {
            single(init)?;
            check_stmts(&then.stmts)?;
            single(els)
        }
        StmtKind::Switch { init, clauses, .. } => {
            single(init)?;
            clauses.iter().try_for_each(|c| check_stmts(&c.body))
        }
        StmtKind::For {
            init, post, body, ..
        } => {
            single(init)?;
            single(post)?;
            check_stmts(&body.stmts)
        }
        StmtKind::Range { body, .. } => check_stmts(&body.stmts),
        _ => Ok(()),
    }
}

/// Run only the sieve over a whole file, without rewriting anything.
pub fn check_file(file: &File) -> Result<(), Diagnostic> {
    for decl in &file.decls {
        match decl {
            Decl::Func(func) => {
                check_func(func)?;
                if let Some(body) = &func.body {
                    check_stmts(&body.stmts)?;
                }
            }
            Decl::Gen(gen) => check_gen_decl(gen)?,
        }
    }
    Ok(())
}
