//! Lowering and legality engine.
//!
//! Walks a parsed [`File`] top-down, rejecting constructs the target
//! grammar cannot express and rewriting the rest in place: receivers
//! become parameters, extra results become output parameters, tuple
//! assignments are split, `&^` is desugared and map subscripts become
//! container calls.
//!
//! Statement sequences are traversed with an explicit cursor. When a rule
//! splices new statements in front of the cursor, traversal resumes at the
//! same index, so the spliced nodes and the rewritten statement are each
//! visited again. Every rule is a no-op on its own output.

mod assign;
mod container;
mod ops;
mod sieve;
mod signature;


use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::ast::splice;
use crate::ast::*;
use crate::diagnostic::{Diagnostic, ErrorKind};
use crate::span::{Span, Spanned};
use crate::typecheck::{ResolvedType, TypeResolver};

pub use sieve::{check_file, Construct};

use signature::{field_names, ReturnPlan};

/// Names the engine writes into the output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LowerOptions {
    /// Library function reading a container element: `get(m, k, &v) -> bool`.
    pub container_get: String,
    /// Library function writing a container element: `set(m, k, v)`.
    pub container_set: String,
    /// Prefix of synthesized variables: stand-ins for `_` and temporaries
    /// holding container elements.
    pub discard_prefix: String,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            container_get: "containerGet".to_string(),
            container_set: "containerSet".to_string(),
            discard_prefix: "_unused".to_string(),
        }
    }
}

/// Lower `file` in place.
///
/// On success returns the non-fatal warnings collected along the way. The
/// first fatal diagnostic aborts the whole transformation; the tree is then
/// in an unspecified, partially rewritten state and must be discarded.
pub fn lower_file(
    file: &mut File,
    resolver: &dyn TypeResolver,
    options: &LowerOptions,
) -> Result<Vec<Diagnostic>, Diagnostic> {
    let shapes = signature::collect_shapes(file);
    let mut lowerer = Lowerer {
        resolver,
        options,
        shapes,
        next_id: file.next_id,
        discards: 0,
        warnings: Vec::new(),
        returns: Vec::new(),
        lowered_returns: BTreeSet::new(),
    };
    for decl in &mut file.decls {
        match decl {
            Decl::Func(func) => lowerer.lower_func(func)?,
            Decl::Gen(gen) => {
                sieve::check_gen_decl(gen)?;
                lowerer.lower_gen_decl(gen)?;
            }
        }
    }
    file.next_id = lowerer.next_id;
    debug!(warnings = lowerer.warnings.len(), "lowered file");
    Ok(lowerer.warnings)
}

/// Statements to splice in front of a rewritten statement.
type Prelude = Vec<Stmt>;

/// Move an expression out of its slot, leaving `_` behind.
fn take_expr(slot: &mut Spanned<Expr>) -> Spanned<Expr> {
    let span = slot.span;
    std::mem::replace(slot, Spanned::new(Expr::ident("_"), span))
}

/// `name(args...)`
fn call_expr(name: &str, args: Vec<Spanned<Expr>>, span: Span) -> Spanned<Expr> {
    let func = Box::new(Spanned::new(Expr::ident(name), span));
    Spanned::new(
        Expr::Call {
            func,
            args,
            ellipsis: false,
        },
        span,
    )
}

/// `&target`
fn address_of(target: Spanned<Expr>) -> Spanned<Expr> {
    let span = target.span;
    Spanned::new(
        Expr::Unary {
            op: UnaryOp::Addr,
            expr: Box::new(target),
        },
        span,
    )
}

/// Names already declared in the scope a statement sits in, so a `:=`
/// only reassigns them: earlier statements of its sequence and, in a
/// function's outermost block, the function's parameters and results.
#[derive(Clone, Copy)]
struct Declared<'s> {
    before: &'s [Stmt],
    outer: &'s [String],
}

impl Declared<'_> {
    fn nothing() -> Declared<'static> {
        Declared {
            before: &[],
            outer: &[],
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.outer.iter().any(|n| n == name) || declared_before(self.before, name)
    }
}

fn declared_before(before: &[Stmt], name: &str) -> bool {
    before.iter().any(|stmt| match &stmt.kind {
        StmtKind::Decl(gen) => gen.specs.iter().any(|spec| match spec {
            Spec::Value(v) => v.names.iter().any(|n| n.node == name),
            Spec::Type(_) => false,
        }),
        StmtKind::Assign {
            lhs,
            op: AssignOp::Define,
            ..
        } => lhs.iter().any(|target| target.node.as_ident() == Some(name)),
        _ => false,
    })
}

/// A `var` declaration with one typed spec per variable.
fn var_gen(vars: Vec<(String, Type)>, span: Span) -> GenDecl {
    let specs = vars
        .into_iter()
        .map(|(name, ty)| {
            Spec::Value(ValueSpec {
                names: vec![Spanned::new(name, span)],
                ty: Some(Spanned::new(ty, span)),
                values: Vec::new(),
            })
        })
        .collect();
    GenDecl {
        keyword: DeclKeyword::Var,
        specs,
        span,
    }
}

struct Lowerer<'a> {
    resolver: &'a dyn TypeResolver,
    options: &'a LowerOptions,
    /// Result shape (names per entry) of every plain function in the file,
    /// as declared before lowering.
    shapes: BTreeMap<String, Vec<usize>>,
    next_id: NodeId,
    discards: usize,
    warnings: Vec<Diagnostic>,
    /// One entry per enclosing function body; `None` for function literals
    /// and functions whose results did not move.
    returns: Vec<Option<ReturnPlan>>,
    /// Returns already rewritten against their plan.
    lowered_returns: BTreeSet<NodeId>,
}

impl Lowerer<'_> {
    // --- Node construction ---

    fn new_stmt(&mut self, kind: StmtKind, span: Span) -> Stmt {
        let id = self.next_id;
        self.next_id += 1;
        Stmt::new(id, kind, span)
    }

    /// `var (a A; b B)`, one spec per variable.
    fn var_decl(&mut self, vars: Vec<(String, Type)>, span: Span) -> Stmt {
        self.new_stmt(StmtKind::Decl(var_gen(vars, span)), span)
    }

    /// The declaration for `vars`, or nothing when there are none.
    fn prelude(&mut self, vars: Vec<(String, Type)>, span: Span) -> Prelude {
        if vars.is_empty() {
            Vec::new()
        } else {
            vec![self.var_decl(vars, span)]
        }
    }

    fn discard_name(&mut self) -> String {
        let name = format!("{}{}", self.options.discard_prefix, self.discards);
        self.discards += 1;
        name
    }

    /// Turn a resolver answer into an annotation, or fail naming `what`.
    fn require_type(
        &self,
        resolved: Option<ResolvedType>,
        what: &str,
        span: Span,
    ) -> Result<Type, Diagnostic> {
        match resolved {
            Some(ty) => Ok(ty.annotation()),
            None => Err(Diagnostic::error(
                ErrorKind::TypeResolution,
                format!("cannot resolve the type of {}", what),
                span,
            )
            .with_help("declare it with an explicit type before this statement".to_string())),
        }
    }

    // --- Traversal ---

    fn lower_gen_decl(&mut self, gen: &mut GenDecl) -> Result<(), Diagnostic> {
        for spec in &mut gen.specs {
            if let Spec::Value(v) = spec {
                for value in &mut v.values {
                    self.lower_expr(value)?;
                }
            }
        }
        Ok(())
    }

    fn lower_block(&mut self, stmts: &mut Vec<Stmt>) -> Result<(), Diagnostic> {
        self.lower_sequence(stmts, &[])
    }

    /// Lower a statement sequence. `outer` names what the enclosing
    /// function declares in the same scope as the sequence.
    fn lower_sequence(&mut self, stmts: &mut Vec<Stmt>, outer: &[String]) -> Result<(), Diagnostic> {
        let mut i = 0;
        while i < stmts.len() {
            trace!(id = stmts[i].id, index = i, "visit statement");
            sieve::check_stmt(&stmts[i])?;
            if self.rewrite_in_sequence(stmts, i, outer)? {
                continue;
            }
            self.lower_stmt(&mut stmts[i])?;
            i += 1;
        }
        Ok(())
    }

    /// Rules that may splice siblings. Returns whether one fired; the cursor
    /// then stays at `i`.
    fn rewrite_in_sequence(
        &mut self,
        stmts: &mut Vec<Stmt>,
        i: usize,
        outer: &[String],
    ) -> Result<bool, Diagnostic> {
        if self.hoist_init(stmts, i) {
            return Ok(true);
        }
        if self.lower_for_post(stmts, i)? {
            return Ok(true);
        }
        if self.split_var_decl(stmts, i)? {
            return Ok(true);
        }
        let (before, rest) = stmts.split_at_mut(i);
        let declared = Declared { before, outer };
        if let Some(prelude) = self.rewrite_stmt(declared, &mut rest[0])? {
            let anchor = stmts[i].id;
            for stmt in prelude {
                splice::insert_before(stmts, anchor, stmt);
            }
            return Ok(true);
        }
        Ok(self.lower_return(stmts, i))
    }

    /// A statement in a header slot (`init`, `post`). Anything that needs
    /// declarations was moved out of the header before we get here; a post
    /// statement reading a container has no place for its temporaries.
    fn visit_single(&mut self, slot: &mut Option<Box<Stmt>>) -> Result<(), Diagnostic> {
        let Some(stmt) = slot else {
            return Ok(());
        };
        trace!(id = stmt.id, "visit header statement");
        sieve::check_stmt(stmt)?;
        if let Some(prelude) = self.rewrite_stmt(Declared::nothing(), stmt)? {
            if !prelude.is_empty() {
                return Err(sieve::illegal(Construct::MapSubscript, stmt.span)
                    .with_note("a loop post statement runs on every iteration".to_string()));
            }
        }
        self.lower_stmt(stmt)
    }

    /// `if a, b := f(); b {}` → `{ a, b := f(); if b {} }`, likewise for
    /// `switch` and `for`, so the split has a sequence to splice into. An
    /// `if`/`switch` whose header expression reads a container is hoisted
    /// too, so the read can move in front of it after its init.
    fn hoist_init(&mut self, stmts: &mut [Stmt], i: usize) -> bool {
        let span = stmts[i].span;
        let header_reads = match &stmts[i].kind {
            StmtKind::If { cond, .. } => self.reads_container(cond, span),
            StmtKind::Switch { tag: Some(tag), .. } => self.reads_container(tag, span),
            _ => false,
        };
        let init = match &mut stmts[i].kind {
            StmtKind::If { init, .. } | StmtKind::Switch { init, .. } | StmtKind::For { init, .. } => {
                let hoist = match init {
                    Some(stmt) => header_reads || self.needs_splice(stmt),
                    None => false,
                };
                if hoist {
                    init.take()
                } else {
                    None
                }
            }
            _ => None,
        };
        let Some(init) = init else {
            return false;
        };
        let placeholder = Stmt::new(stmts[i].id, StmtKind::Empty, span);
        let header = std::mem::replace(&mut stmts[i], placeholder);
        let block = Block {
            stmts: vec![*init, header],
            span,
        };
        stmts[i] = self.new_stmt(StmtKind::Block(block), span);
        debug!(id = stmts[i].id, "hoisted header initializer into a block");
        true
    }

    /// A `for` post statement whose rewrite needs declarations: lower it on
    /// its own and splice the declarations in front of the loop. Anything
    /// else the rewrite produced would run once instead of per iteration.
    fn lower_for_post(&mut self, stmts: &mut Vec<Stmt>, i: usize) -> Result<bool, Diagnostic> {
        let anchor = stmts[i].id;
        let post = match &mut stmts[i].kind {
            StmtKind::For { post, .. } => {
                let split = matches!(post, Some(stmt) if self.needs_declarations(stmt));
                if split {
                    post.take()
                } else {
                    None
                }
            }
            _ => None,
        };
        let Some(post) = post else {
            return Ok(false);
        };
        let post_id = post.id;
        let post_span = post.span;
        let mut scratch = vec![*post];
        self.lower_block(&mut scratch)?;
        let Some(index) = splice::find_identity(&scratch, post_id) else {
            return Ok(false);
        };
        let lowered = scratch.remove(index);
        if scratch.iter().any(|stmt| !matches!(stmt.kind, StmtKind::Decl(_))) {
            return Err(sieve::illegal(Construct::MapSubscript, post_span)
                .with_note("a loop post statement runs on every iteration".to_string()));
        }
        if let StmtKind::For { post, .. } = &mut stmts[i].kind {
            *post = Some(Box::new(lowered));
        }
        for stmt in scratch {
            splice::insert_before(stmts, anchor, stmt);
        }
        debug!(id = anchor, "moved loop post declarations before the loop");
        Ok(true)
    }

    /// Structural recursion into one statement's children.
    fn lower_stmt(&mut self, stmt: &mut Stmt) -> Result<(), Diagnostic> {
        match &mut stmt.kind {
            StmtKind::Decl(gen) => self.lower_gen_decl(gen),
            StmtKind::Expr(expr) => self.lower_expr(expr),
            StmtKind::IncDec { expr, .. } => self.lower_expr(expr),
            StmtKind::Assign { lhs, op, rhs } => {
                if ops::desugar_assign(op, rhs) {
                    debug!(id = stmt.id, "desugared and-not assignment");
                }
                for expr in lhs.iter_mut().chain(rhs.iter_mut()) {
                    self.lower_expr(expr)?;
                }
                Ok(())
            }
            StmtKind::Return(values) => {
                for value in values {
                    self.lower_expr(value)?;
                }
                Ok(())
            }
            StmtKind::Block(block) => self.lower_block(&mut block.stmts),
            StmtKind::If {
                init,
                cond,
                then,
                els,
            } => {
                self.visit_single(init)?;
                self.lower_expr(cond)?;
                self.lower_block(&mut then.stmts)?;
                if let Some(els) = els {
                    self.wrap_else_if(els);
                    sieve::check_stmt(els)?;
                    self.lower_stmt(els)?;
                }
                Ok(())
            }
            StmtKind::Switch { init, tag, clauses } => {
                self.visit_single(init)?;
                if let Some(tag) = tag {
                    self.lower_expr(tag)?;
                }
                for clause in clauses {
                    if let Some(exprs) = &mut clause.exprs {
                        for expr in exprs {
                            self.lower_expr(expr)?;
                        }
                    }
                    self.lower_block(&mut clause.body)?;
                }
                Ok(())
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                self.visit_single(init)?;
                if let Some(cond) = cond {
                    self.lower_expr(cond)?;
                }
                self.visit_single(post)?;
                self.lower_block(&mut body.stmts)
            }
            StmtKind::Range {
                key,
                value,
                expr,
                body,
                ..
            } => {
                for target in [key, value].into_iter().flatten() {
                    self.lower_expr(target)?;
                }
                self.lower_expr(expr)?;
                self.lower_block(&mut body.stmts)
            }
            // Rejected by the sieve before we get here.
            StmtKind::Labeled { .. }
            | StmtKind::Go(_)
            | StmtKind::Defer(_)
            | StmtKind::Send { .. }
            | StmtKind::Select { .. }
            | StmtKind::TypeSwitch { .. } => Ok(()),
            StmtKind::Branch { .. } | StmtKind::Empty => Ok(()),
        }
    }

    /// `else if a, b := f(); b {}` → `else { if a, b := f(); b {} }`, so the
    /// inner statement sits in a sequence and can be hoisted. Same for an
    /// `else if` whose condition reads a container.
    fn wrap_else_if(&mut self, els: &mut Stmt) {
        let needs = match &els.kind {
            StmtKind::If { init, cond, .. } => {
                init.as_ref().is_some_and(|init| self.needs_splice(init))
                    || self.reads_container(cond, els.span)
            }
            _ => false,
        };
        if !needs {
            return;
        }
        let span = els.span;
        let wrapper = self.new_stmt(
            StmtKind::Block(Block {
                stmts: Vec::new(),
                span,
            }),
            span,
        );
        let inner = std::mem::replace(els, wrapper);
        if let StmtKind::Block(block) = &mut els.kind {
            block.stmts.push(inner);
        }
        debug!(id = els.id, "wrapped else-if in a block");
    }

    /// Container subscripts still present here sit where no temporary can
    /// be placed (loop conditions, case expressions, package-level
    /// initializers, parallel assignments) and are fatal.
    fn lower_expr(&mut self, expr: &mut Spanned<Expr>) -> Result<(), Diagnostic> {
        if self.is_container_index(&expr.node, expr.span) {
            return Err(sieve::illegal(Construct::MapSubscript, expr.span));
        }
        if ops::desugar_binary(&mut expr.node) {
            debug!(start = expr.span.start, "desugared and-not expression");
        }
        match &mut expr.node {
            Expr::Ident(_) | Expr::Lit(_) | Expr::Type(_) => Ok(()),
            Expr::Composite { elts, .. } => {
                for elt in elts {
                    self.lower_expr(elt)?;
                }
                Ok(())
            }
            Expr::KeyValue { key, value } => {
                self.lower_expr(key)?;
                self.lower_expr(value)
            }
            Expr::FuncLit { ty, body } => {
                let mut outer = field_names(&ty.params);
                outer.extend(field_names(&ty.results));
                self.returns.push(None);
                let lowered = self.lower_sequence(&mut body.stmts, &outer);
                self.returns.pop();
                lowered
            }
            Expr::Paren(inner) => self.lower_expr(inner),
            Expr::Selector { expr, .. } => self.lower_expr(expr),
            Expr::Index { expr, index } => {
                self.lower_expr(expr)?;
                self.lower_expr(index)
            }
            Expr::Slice {
                expr,
                low,
                high,
                max,
            } => {
                self.lower_expr(expr)?;
                for bound in [low, high, max].into_iter().flatten() {
                    self.lower_expr(bound)?;
                }
                Ok(())
            }
            Expr::TypeAssert { expr, .. } => self.lower_expr(expr),
            Expr::Call { func, args, .. } => {
                self.lower_expr(func)?;
                for arg in args {
                    self.lower_expr(arg)?;
                }
                Ok(())
            }
            Expr::Unary { expr, .. } => self.lower_expr(expr),
            Expr::Binary { lhs, rhs, .. } => {
                self.lower_expr(lhs)?;
                self.lower_expr(rhs)
            }
        }
    }
}
