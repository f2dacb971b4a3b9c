//! Single-file scope resolver.
//!
//! Built once from the parsed tree before lowering. It records every
//! binding with the span of the scope that owns it and the offset where it
//! becomes visible; a query at a position picks the innermost visible
//! binding. Types are inferred only as far as declarations, literals,
//! conversions and same-file signatures allow.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use tracing::trace;

use super::{ResolvedType, TypeResolver};
use crate::ast::*;
use crate::span::{Span, Spanned};

/// Named types are followed at most this many times.
const MAX_TYPE_INDIRECTION: usize = 16;

#[derive(Clone, Debug)]
struct Binding {
    name: String,
    ty: Type,
    scope: Span,
    pos: u32,
}

/// In-process [`TypeResolver`] over the declarations of one file.
#[derive(Clone, Debug, Default)]
pub struct ScopeResolver {
    /// Flattened result types of package-level functions.
    functions: BTreeMap<String, Vec<Type>>,
    /// Flattened result types of methods, keyed by receiver type name.
    methods: BTreeMap<(String, String), Vec<Type>>,
    types: BTreeMap<String, Type>,
    globals: BTreeMap<String, Type>,
    bindings: Vec<Binding>,
}

fn flatten(fields: &[Field]) -> Vec<Type> {
    fields
        .iter()
        .flat_map(|f| std::iter::repeat(f.ty.node.clone()).take(f.arity()))
        .collect()
}

/// Name of the receiver's base type: `T` for both `T` and `*T`.
fn receiver_type_name(recv: &[Field]) -> Option<String> {
    match &recv.first()?.ty.node {
        Type::Named(name) => Some(name.clone()),
        Type::Pointer(inner) => match inner.as_ref() {
            Type::Named(name) => Some(name.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn binding_type(ty: &Type) -> Type {
    match ty {
        Type::Variadic(elem) => Type::Array(None, elem.clone()),
        other => other.clone(),
    }
}

impl ScopeResolver {
    pub fn new(file: &File) -> Self {
        let mut resolver = Self::default();

        for decl in &file.decls {
            match decl {
                Decl::Func(func) => {
                    let results = flatten(&func.results);
                    match &func.recv {
                        None => {
                            resolver.functions.insert(func.name.node.clone(), results);
                        }
                        Some(recv) => {
                            if let Some(base) = receiver_type_name(recv) {
                                resolver
                                    .methods
                                    .insert((base, func.name.node.clone()), results);
                            }
                        }
                    }
                }
                Decl::Gen(gen) => {
                    for spec in &gen.specs {
                        if let Spec::Type(t) = spec {
                            resolver.types.insert(t.name.node.clone(), t.ty.node.clone());
                        }
                    }
                }
            }
        }

        for decl in &file.decls {
            if let Decl::Gen(gen) = decl {
                for spec in &gen.specs {
                    if let Spec::Value(v) = spec {
                        for (name, ty) in resolver.spec_types(v, gen.span) {
                            resolver.globals.insert(name, ty);
                        }
                    }
                }
            }
        }

        for func in file.functions() {
            resolver.visit_func(func);
        }

        trace!(
            functions = resolver.functions.len(),
            bindings = resolver.bindings.len(),
            "scope resolver built"
        );
        resolver
    }

    // --- Collection ---

    fn bind(&mut self, name: &str, ty: Type, scope: Span, pos: u32) {
        if name == "_" {
            return;
        }
        self.bindings.push(Binding {
            name: name.to_string(),
            ty,
            scope,
            pos,
        });
    }

    fn bind_fields(&mut self, fields: &[Field], scope: Span, pos: u32) {
        for field in fields {
            for name in &field.names {
                self.bind(&name.node, binding_type(&field.ty.node), scope, pos);
            }
        }
    }

    fn visit_func(&mut self, func: &FuncDecl) {
        let scope = func.span;
        if let Some(recv) = &func.recv {
            self.bind_fields(recv, scope, scope.start);
        }
        self.bind_fields(&func.params, scope, scope.start);
        self.bind_fields(&func.results, scope, scope.start);
        if let Some(body) = &func.body {
            self.visit_block(body);
        }
    }

    fn visit_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.visit_stmt(stmt, block.span);
        }
    }

    fn visit_stmts(&mut self, stmts: &[Stmt], scope: Span) {
        for stmt in stmts {
            self.visit_stmt(stmt, scope);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt, scope: Span) {
        let pos = stmt.span.start;
        match &stmt.kind {
            StmtKind::Decl(gen) => self.visit_local_decl(gen, scope, pos, stmt.span),
            StmtKind::Assign { lhs, op, rhs } => {
                for value in rhs {
                    self.visit_expr(&value.node);
                }
                if *op == AssignOp::Define {
                    let names: Vec<&str> = lhs.iter().filter_map(|e| e.node.as_ident()).collect();
                    for (name, ty) in self.define_types(&names, rhs, stmt.span) {
                        self.bind(&name, ty, scope, pos);
                    }
                }
            }
            StmtKind::Labeled { stmt: inner, .. } => self.visit_stmt(inner, scope),
            StmtKind::Expr(e) | StmtKind::Go(e) | StmtKind::Defer(e) => self.visit_expr(&e.node),
            StmtKind::Return(values) => {
                for value in values {
                    self.visit_expr(&value.node);
                }
            }
            StmtKind::Block(block) => self.visit_block(block),
            StmtKind::If {
                init, then, els, ..
            } => {
                if let Some(init) = init {
                    self.visit_stmt(init, stmt.span);
                }
                self.visit_block(then);
                if let Some(els) = els {
                    self.visit_stmt(els, stmt.span);
                }
            }
            StmtKind::Switch { init, clauses, .. } | StmtKind::TypeSwitch { init, clauses, .. } => {
                if let Some(init) = init {
                    self.visit_stmt(init, stmt.span);
                }
                for clause in clauses {
                    self.visit_stmts(&clause.body, clause.span);
                }
            }
            StmtKind::Select { clauses } => {
                for clause in clauses {
                    if let Some(comm) = &clause.comm {
                        self.visit_stmt(comm, clause.span);
                    }
                    self.visit_stmts(&clause.body, clause.span);
                }
            }
            StmtKind::For { init, body, .. } => {
                if let Some(init) = init {
                    self.visit_stmt(init, stmt.span);
                }
                self.visit_block(body);
            }
            StmtKind::Range {
                key,
                value,
                define,
                expr,
                body,
            } => {
                if *define {
                    let (key_ty, value_ty) = self.range_types(&expr.node, stmt.span);
                    let vars = [(key, key_ty), (value, value_ty)];
                    for (var, ty) in vars {
                        if let (Some(var), Some(ty)) = (var, ty) {
                            if let Some(name) = var.node.as_ident() {
                                self.bind(name, ty, stmt.span, pos);
                            }
                        }
                    }
                }
                self.visit_block(body);
            }
            StmtKind::Send { .. }
            | StmtKind::IncDec { .. }
            | StmtKind::Branch { .. }
            | StmtKind::Empty => {}
        }
    }

    fn visit_local_decl(&mut self, gen: &GenDecl, scope: Span, pos: u32, at: Span) {
        for spec in &gen.specs {
            match spec {
                Spec::Value(v) => {
                    for value in &v.values {
                        self.visit_expr(&value.node);
                    }
                    for (name, ty) in self.spec_types(v, at) {
                        self.bind(&name, ty, scope, pos);
                    }
                }
                Spec::Type(t) => {
                    self.types.insert(t.name.node.clone(), t.ty.node.clone());
                }
            }
        }
    }

    /// Descend into function literals, whose parameters open a new scope.
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::FuncLit { ty, body } => {
                self.bind_fields(&ty.params, body.span, body.span.start);
                self.bind_fields(&ty.results, body.span, body.span.start);
                self.visit_block(body);
            }
            Expr::Call { func, args, .. } => {
                self.visit_expr(&func.node);
                for arg in args {
                    self.visit_expr(&arg.node);
                }
            }
            Expr::Paren(inner) => self.visit_expr(&inner.node),
            Expr::Binary { lhs, rhs, .. } => {
                self.visit_expr(&lhs.node);
                self.visit_expr(&rhs.node);
            }
            Expr::Unary { expr, .. } => self.visit_expr(&expr.node),
            Expr::Composite { elts, .. } => {
                for elt in elts {
                    self.visit_expr(&elt.node);
                }
            }
            Expr::KeyValue { value, .. } => self.visit_expr(&value.node),
            _ => {}
        }
    }

    fn spec_types(&self, spec: &ValueSpec, at: Span) -> Vec<(String, Type)> {
        let names: Vec<&str> = spec.names.iter().map(|n| n.node.as_str()).collect();
        match &spec.ty {
            Some(ty) => names
                .iter()
                .map(|n| (n.to_string(), ty.node.clone()))
                .collect(),
            None => self.define_types(&names, &spec.values, at),
        }
    }

    /// Types of names bound by `names := values` (or `var names = values`).
    fn define_types(&self, names: &[&str], values: &[Spanned<Expr>], at: Span) -> Vec<(String, Type)> {
        let mut out = Vec::new();
        if names.len() == values.len() {
            for (name, value) in names.iter().zip(values) {
                if let Some(ty) = self.type_of(&value.node, at) {
                    out.push((name.to_string(), ty));
                }
            }
        } else if let [value] = values {
            for (i, name) in names.iter().enumerate() {
                if let Some(ty) = self.result_type(&value.node, i, at) {
                    out.push((name.to_string(), ty));
                }
            }
        }
        out
    }

    fn range_types(&self, expr: &Expr, at: Span) -> (Option<Type>, Option<Type>) {
        let int = || Some(Type::named("int"));
        match self.type_of(expr, at).map(|t| self.underlying(&t)) {
            Some(Type::Map(key, value)) => (Some(*key), Some(*value)),
            Some(Type::Array(_, elem)) => (int(), Some(*elem)),
            Some(Type::Chan(_, elem)) => (Some(*elem), None),
            Some(Type::Named(name)) if name == "string" => (int(), Some(Type::named("rune"))),
            _ => (None, None),
        }
    }

    // --- Queries ---

    fn lookup(&self, name: &str, at: Span) -> Option<&Type> {
        self.bindings
            .iter()
            .filter(|b| b.name == name && b.scope.contains(at) && b.pos <= at.start)
            .min_by_key(|b| (b.scope.end - b.scope.start, Reverse(b.pos)))
            .map(|b| &b.ty)
            .or_else(|| self.globals.get(name))
    }

    /// Follow named types to their declared structure.
    fn underlying(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        for _ in 0..MAX_TYPE_INDIRECTION {
            match &current {
                Type::Named(name) => match self.types.get(name) {
                    Some(next) => current = next.clone(),
                    None => break,
                },
                _ => break,
            }
        }
        current
    }

    fn field_type(&self, base: &Type, field: &str) -> Option<Type> {
        let base = match self.underlying(base) {
            Type::Pointer(inner) => self.underlying(&inner),
            other => other,
        };
        match base {
            Type::Struct(fields) => fields
                .iter()
                .find(|f| f.names.iter().any(|n| n.node == field))
                .map(|f| f.ty.node.clone()),
            _ => None,
        }
    }

    fn type_of(&self, expr: &Expr, at: Span) -> Option<Type> {
        match expr {
            Expr::Ident(name) => match name.as_str() {
                "true" | "false" => Some(Type::named("bool")),
                "nil" | "_" => None,
                _ => self.lookup(name, at).cloned(),
            },
            Expr::Lit(lit) => match lit {
                Literal::Int(_) => Some(Type::named("int")),
                Literal::Float(_) => Some(Type::named("float64")),
                Literal::Char(_) => Some(Type::named("rune")),
                Literal::String(_) => Some(Type::named("string")),
                Literal::Imag(_) => None,
            },
            Expr::Composite { ty, .. } => ty.clone(),
            Expr::FuncLit { ty, .. } => Some(Type::Func(ty.clone())),
            Expr::Paren(inner) => self.type_of(&inner.node, at),
            Expr::Selector { expr, sel } => {
                let base = self.type_of(&expr.node, at)?;
                self.field_type(&base, &sel.node)
            }
            Expr::Index { expr, .. } => {
                let base = self.type_of(&expr.node, at)?;
                match self.underlying(&base) {
                    Type::Map(_, value) => Some(*value),
                    Type::Array(_, elem) => Some(*elem),
                    Type::Pointer(inner) => match self.underlying(&inner) {
                        Type::Array(_, elem) => Some(*elem),
                        _ => None,
                    },
                    Type::Named(name) if name == "string" => Some(Type::named("byte")),
                    _ => None,
                }
            }
            Expr::Slice { expr, .. } => self.type_of(&expr.node, at),
            Expr::TypeAssert { ty, .. } => ty.clone(),
            Expr::Call { .. } => self.result_type(expr, 0, at),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Addr => self.type_of(&expr.node, at).map(Type::pointer_to),
                UnaryOp::Deref => match self.underlying(&self.type_of(&expr.node, at)?) {
                    Type::Pointer(inner) => Some(*inner),
                    _ => None,
                },
                UnaryOp::Not => Some(Type::named("bool")),
                UnaryOp::Recv => match self.underlying(&self.type_of(&expr.node, at)?) {
                    Type::Chan(_, elem) => Some(*elem),
                    _ => None,
                },
                UnaryOp::Plus | UnaryOp::Neg | UnaryOp::BitNot => self.type_of(&expr.node, at),
            },
            Expr::Binary { op, lhs, rhs } => {
                if op.is_comparison() || matches!(op, BinOp::LogAnd | BinOp::LogOr) {
                    return Some(Type::named("bool"));
                }
                if matches!(op, BinOp::Shl | BinOp::Shr) {
                    return self.type_of(&lhs.node, at);
                }
                // An untyped literal operand takes the other operand's type.
                let (first, second) = match lhs.node {
                    Expr::Lit(_) => (rhs, lhs),
                    _ => (lhs, rhs),
                };
                self.type_of(&first.node, at)
                    .or_else(|| self.type_of(&second.node, at))
            }
            Expr::KeyValue { .. } | Expr::Type(_) => None,
        }
    }

    /// Type of the `index`-th value of a possibly multi-valued expression.
    fn result_type(&self, expr: &Expr, index: usize, at: Span) -> Option<Type> {
        match expr {
            Expr::Call { func, args, .. } => self.call_result(&func.node, args, index, at),
            Expr::Index { expr: base, .. } if index > 0 => {
                let base = self.type_of(&base.node, at)?;
                match self.underlying(&base) {
                    Type::Map(..) if index == 1 => Some(Type::named("bool")),
                    _ => None,
                }
            }
            Expr::TypeAssert { .. } | Expr::Unary { op: UnaryOp::Recv, .. } if index == 1 => {
                Some(Type::named("bool"))
            }
            Expr::Paren(inner) => self.result_type(&inner.node, index, at),
            _ if index == 0 => self.type_of(expr, at),
            _ => None,
        }
    }

    fn call_result(&self, func: &Expr, args: &[Spanned<Expr>], index: usize, at: Span) -> Option<Type> {
        match func {
            Expr::Type(ty) if index == 0 => Some(ty.clone()),
            Expr::Paren(inner) => match &inner.node {
                Expr::Type(ty) if index == 0 => Some(ty.clone()),
                other => self.call_result(other, args, index, at),
            },
            Expr::Ident(name) => {
                if let Some(results) = self.functions.get(name) {
                    if self.lookup(name, at).is_none() {
                        return results.get(index).cloned();
                    }
                }
                if index > 0 {
                    return self.func_value_result(func, index, at);
                }
                match name.as_str() {
                    "len" | "cap" | "copy" => Some(Type::named("int")),
                    "make" => match args.first().map(|a| &a.node) {
                        Some(Expr::Type(ty)) => Some(ty.clone()),
                        _ => None,
                    },
                    "new" => match args.first().map(|a| &a.node) {
                        Some(Expr::Type(ty)) => Some(ty.clone().pointer_to()),
                        Some(Expr::Ident(name)) => Some(Type::Named(name.clone()).pointer_to()),
                        _ => None,
                    },
                    "append" => args.first().and_then(|a| self.type_of(&a.node, at)),
                    _ => self.func_value_result(func, index, at),
                }
            }
            Expr::Selector { expr, sel } => {
                let recv = self.type_of(&expr.node, at)?;
                let base = match recv {
                    Type::Pointer(inner) => *inner,
                    other => other,
                };
                match base {
                    Type::Named(name) => self
                        .methods
                        .get(&(name, sel.node.clone()))
                        .and_then(|results| results.get(index).cloned()),
                    _ => None,
                }
            }
            _ => self.func_value_result(func, index, at),
        }
    }

    /// Result of calling a variable of function type.
    fn func_value_result(&self, func: &Expr, index: usize, at: Span) -> Option<Type> {
        match self.underlying(&self.type_of(func, at)?) {
            Type::Func(sig) => flatten(&sig.results).get(index).cloned(),
            _ => None,
        }
    }

    fn resolved(&self, ty: Type) -> ResolvedType {
        let container = matches!(self.underlying(&ty), Type::Map(..));
        ResolvedType::with_container(ty, container)
    }
}

impl TypeResolver for ScopeResolver {
    fn resolve(&self, expr: &Expr, at: Span) -> Option<ResolvedType> {
        self.type_of(expr, at).map(|ty| self.resolved(ty))
    }

    fn resolve_result(&self, call: &Expr, index: usize, at: Span) -> Option<ResolvedType> {
        self.result_type(call, index, at).map(|ty| self.resolved(ty))
    }
}
