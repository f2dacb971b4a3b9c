//! Map subscripts become container library calls.
//!
//! Whole-statement forms (`m[k] = v`, `v := m[k]`, `v, ok := m[k]`) map
//! onto one call. A read anywhere else is first moved into a temporary
//! declared in front of the statement; compound updates read into a
//! temporary and write the new value back.

use tracing::debug;

use super::{address_of, call_expr, ops, sieve, take_expr, Construct, Declared, Lowerer, Prelude};
use crate::ast::display::format_expr;
use crate::ast::*;
use crate::diagnostic::{Diagnostic, ErrorKind};
use crate::span::{Span, Spanned};

/// Direct subexpressions in evaluation order. Function literal bodies are
/// not entered.
fn children_mut(expr: &mut Expr) -> Vec<&mut Spanned<Expr>> {
    match expr {
        Expr::Ident(_) | Expr::Lit(_) | Expr::Type(_) | Expr::FuncLit { .. } => Vec::new(),
        Expr::Composite { elts, .. } => elts.iter_mut().collect(),
        Expr::KeyValue { key, value } => vec![&mut **key, &mut **value],
        Expr::Paren(inner) => vec![&mut **inner],
        Expr::Selector { expr, .. } | Expr::TypeAssert { expr, .. } | Expr::Unary { expr, .. } => {
            vec![&mut **expr]
        }
        Expr::Index { expr, index } => vec![&mut **expr, &mut **index],
        Expr::Slice {
            expr,
            low,
            high,
            max,
        } => {
            let mut children = vec![&mut **expr];
            children.extend([low, high, max].into_iter().flatten().map(|bound| &mut **bound));
            children
        }
        Expr::Call { func, args, .. } => {
            let mut children = vec![&mut **func];
            children.extend(args.iter_mut());
            children
        }
        Expr::Binary { lhs, rhs, .. } => vec![&mut **lhs, &mut **rhs],
    }
}

/// Replace the first subexpression matching `is_read` (pre-order) with
/// the identifier `temp` and return it, with whether it sat on the right
/// of `&&` or `||`.
fn take_first_read(
    slot: &mut Spanned<Expr>,
    is_read: &dyn Fn(&Expr) -> bool,
    temp: &str,
    conditional: bool,
) -> Option<(Spanned<Expr>, bool)> {
    if is_read(&slot.node) {
        let span = slot.span;
        let read = std::mem::replace(slot, Spanned::new(Expr::ident(temp), span));
        return Some((read, conditional));
    }
    let lazy = matches!(
        slot.node,
        Expr::Binary {
            op: BinOp::LogAnd | BinOp::LogOr,
            ..
        }
    );
    for (n, child) in children_mut(&mut slot.node).into_iter().enumerate() {
        if let Some(found) = take_first_read(child, is_read, temp, conditional || (lazy && n == 1)) {
            return Some(found);
        }
    }
    None
}

/// Expressions of a statement that are evaluated once, before the
/// statement takes effect, so a read in them can run first. Container
/// targets contribute their map and key only.
fn read_slots<'s>(kind: &'s mut StmtKind, is_read: &dyn Fn(&Expr) -> bool) -> Vec<&'s mut Spanned<Expr>> {
    match kind {
        StmtKind::Expr(expr) | StmtKind::Range { expr, .. } => vec![expr],
        StmtKind::Assign { lhs, rhs, .. } => {
            let mut slots = Vec::new();
            for target in lhs.iter_mut() {
                if is_read(&target.node) {
                    slots.extend(children_mut(&mut target.node));
                } else {
                    slots.push(target);
                }
            }
            slots.extend(rhs.iter_mut());
            slots
        }
        StmtKind::IncDec { expr, .. } => {
            if is_read(&expr.node) {
                children_mut(&mut expr.node)
            } else {
                vec![expr]
            }
        }
        StmtKind::Return(values) => values.iter_mut().collect(),
        StmtKind::Decl(gen) => gen
            .specs
            .iter_mut()
            .flat_map(|spec| match spec {
                Spec::Value(v) => v.values.iter_mut().collect::<Vec<_>>(),
                Spec::Type(_) => Vec::new(),
            })
            .collect(),
        StmtKind::If {
            init: None, cond, ..
        } => vec![cond],
        StmtKind::Switch {
            init: None,
            tag: Some(tag),
            ..
        } => vec![tag],
        _ => Vec::new(),
    }
}

/// Whether evaluating `expr` twice gives the same place: no calls, channel
/// receives or function literals.
fn is_stable(expr: &Expr) -> bool {
    match expr {
        Expr::Call { .. } | Expr::FuncLit { .. } => false,
        Expr::Unary {
            op: UnaryOp::Recv, ..
        } => false,
        _ => {
            let mut copy = expr.clone();
            children_mut(&mut copy).into_iter().all(|child| is_stable(&child.node))
        }
    }
}

/// `m[k]` → `(m, k)`, leaving placeholders behind.
fn take_index(slot: &mut Spanned<Expr>) -> Option<(Spanned<Expr>, Spanned<Expr>)> {
    match &mut slot.node {
        Expr::Index { expr, index } => Some((take_expr(expr), take_expr(index))),
        _ => None,
    }
}

impl Lowerer<'_> {
    /// Whether `expr` subscripts a value the resolver knows is a container.
    pub(super) fn is_container_index(&self, expr: &Expr, at: Span) -> bool {
        match expr {
            Expr::Index { expr: base, .. } => self
                .resolver
                .resolve(&base.node, at)
                .is_some_and(|ty| ty.is_container()),
            _ => false,
        }
    }

    /// Whether `expr` reads a container element outside a function literal.
    pub(super) fn reads_container(&self, expr: &Spanned<Expr>, at: Span) -> bool {
        let is_read = |e: &Expr| self.is_container_index(e, at);
        let mut scratch = expr.clone();
        take_first_read(&mut scratch, &is_read, "_", false).is_some()
    }

    /// Whether `stmt` updates a container element in place or reads one
    /// where a temporary would have to be placed in front of it.
    pub(super) fn has_container_work(&self, stmt: &Stmt) -> bool {
        let at = stmt.span;
        let is_read = |e: &Expr| self.is_container_index(e, at);
        match &stmt.kind {
            StmtKind::IncDec { expr, .. } if is_read(&expr.node) => return true,
            StmtKind::Assign { lhs, op, .. }
                if ops::binary_op(*op).is_some() && lhs.iter().any(|t| is_read(&t.node)) =>
            {
                return true
            }
            _ => {}
        }
        let mut scratch = stmt.kind.clone();
        read_slots(&mut scratch, &is_read)
            .into_iter()
            .any(|slot| take_first_read(slot, &is_read, "_", false).is_some())
    }

    /// `m[k] = v` → `containerSet(m, k, v)`.
    pub(super) fn lower_container_write(&mut self, stmt: &mut Stmt) -> bool {
        let at = stmt.span;
        let StmtKind::Assign { lhs, op, rhs } = &mut stmt.kind else {
            return false;
        };
        if *op != AssignOp::Assign
            || lhs.len() != 1
            || rhs.len() != 1
            || !self.is_container_index(&lhs[0].node, at)
        {
            return false;
        }
        let Some((map, key)) = take_index(&mut lhs[0]) else {
            return false;
        };
        let value = take_expr(&mut rhs[0]);
        let call = call_expr(&self.options.container_set, vec![map, key, value], at);
        stmt.kind = StmtKind::Expr(call);
        debug!(id = stmt.id, "lowered container write");
        true
    }

    /// `v := m[k]`, `v, ok := m[k]`, `v = m[k]`, `v, ok = m[k]` become a
    /// `containerGet(m, k, &v)` call, with declarations for defined names.
    pub(super) fn lower_container_read(
        &mut self,
        declared: Declared<'_>,
        stmt: &mut Stmt,
    ) -> Result<Option<Prelude>, Diagnostic> {
        let at = stmt.span;
        let StmtKind::Assign { lhs, op, rhs } = &mut stmt.kind else {
            return Ok(None);
        };
        if !matches!(op, AssignOp::Define | AssignOp::Assign)
            || rhs.len() != 1
            || !matches!(lhs.len(), 1 | 2)
        {
            return Ok(None);
        }
        let Expr::Index { expr: base, .. } = &rhs[0].node else {
            return Ok(None);
        };
        if !self.is_container_index(&rhs[0].node, at) {
            if lhs.len() == 2 {
                let shown = format_expr(&base.node);
                return Err(Diagnostic::error(
                    ErrorKind::TypeResolution,
                    format!("cannot tell whether '{}' is a map", shown),
                    base.span,
                )
                .with_help("declare the map with an explicit map type".to_string()));
            }
            return Ok(None);
        }

        let define = *op == AssignOp::Define;
        let blank_value = lhs[0].node.is_blank();
        let declare_value = blank_value
            || (define && !lhs[0].node.as_ident().is_some_and(|n| declared.contains(n)));
        let mut vars = Vec::new();
        if declare_value {
            let resolved = self.resolver.resolve(&rhs[0].node, at);
            let ty = self.require_type(resolved, "the map element", rhs[0].span)?;
            let name = if blank_value {
                let name = self.discard_name();
                lhs[0].node = Expr::ident(&name);
                name
            } else {
                lhs[0].node.as_ident().unwrap_or_default().to_string()
            };
            vars.push((name, ty));
        }

        let ok = match lhs.get(1) {
            Some(target) if !target.node.is_blank() => Some(target.clone()),
            _ => None,
        };
        if define {
            if let Some(name) = ok.as_ref().and_then(|t| t.node.as_ident()) {
                if !declared.contains(name) {
                    vars.push((name.to_string(), Type::named("bool")));
                }
            }
        }

        let Some((map, key)) = take_index(&mut rhs[0]) else {
            return Ok(None);
        };
        let value = take_expr(&mut lhs[0]);
        let call = call_expr(&self.options.container_get, vec![map, key, address_of(value)], at);
        stmt.kind = match ok {
            Some(ok) => StmtKind::Assign {
                lhs: vec![ok],
                op: AssignOp::Assign,
                rhs: vec![call],
            },
            None => StmtKind::Expr(call),
        };
        debug!(id = stmt.id, declared = vars.len(), "lowered container read");
        Ok(Some(self.prelude(vars, at)))
    }

    /// `m[k] op= v` → `var t V; containerGet(m, k, &t)` before, then
    /// `containerSet(m, k, t op v)`. `m[k]++` and `m[k]--` use `1`.
    pub(super) fn lower_container_update(&mut self, stmt: &mut Stmt) -> Result<Option<Prelude>, Diagnostic> {
        let at = stmt.span;
        let (target, op, value) = match &mut stmt.kind {
            StmtKind::IncDec { expr, inc } if self.is_container_index(&expr.node, at) => {
                let op = if *inc { BinOp::Add } else { BinOp::Sub };
                let one = Spanned::new(Expr::Lit(Literal::Int("1".to_string())), expr.span);
                (expr, op, one)
            }
            StmtKind::Assign { lhs, op, rhs } if lhs.len() == 1 && rhs.len() == 1 => {
                let Some(op) = ops::binary_op(*op) else {
                    return Ok(None);
                };
                if !self.is_container_index(&lhs[0].node, at) {
                    return Ok(None);
                }
                (&mut lhs[0], op, take_expr(&mut rhs[0]))
            }
            _ => return Ok(None),
        };
        if !is_stable(&target.node) {
            return Err(sieve::illegal(Construct::MapSubscript, target.span)
                .with_note("the map and key of an updated element are evaluated twice".to_string()));
        }
        let resolved = self.resolver.resolve(&target.node, at);
        let ty = self.require_type(resolved, "the map element", target.span)?;
        let Some((map, key)) = take_index(target) else {
            return Ok(None);
        };

        let temp = self.discard_name();
        let span = map.span;
        let get = call_expr(
            &self.options.container_get,
            vec![
                map.clone(),
                key.clone(),
                address_of(Spanned::new(Expr::ident(&temp), span)),
            ],
            at,
        );
        let updated = Spanned::new(
            Expr::Binary {
                op,
                lhs: Box::new(Spanned::new(Expr::ident(&temp), span)),
                rhs: Box::new(value),
            },
            at,
        );
        stmt.kind = StmtKind::Expr(call_expr(&self.options.container_set, vec![map, key, updated], at));

        let mut prelude = vec![self.var_decl(vec![(temp, ty)], at)];
        prelude.push(self.new_stmt(StmtKind::Expr(get), at));
        debug!(id = stmt.id, "lowered container update");
        Ok(Some(prelude))
    }

    /// A container read inside a larger expression: `x := m[k] + 1` →
    /// `var t V; containerGet(m, k, &t)` before, then `x := t + 1`. One
    /// read per call; the cursor revisits for the next.
    pub(super) fn hoist_container_read(&mut self, stmt: &mut Stmt) -> Result<Option<Prelude>, Diagnostic> {
        let at = stmt.span;
        let temp = format!("{}{}", self.options.discard_prefix, self.discards);
        let is_read = |e: &Expr| self.is_container_index(e, at);
        let found = read_slots(&mut stmt.kind, &is_read)
            .into_iter()
            .find_map(|slot| take_first_read(slot, &is_read, &temp, false));
        let Some((mut read, conditional)) = found else {
            return Ok(None);
        };
        self.discards += 1;

        let resolved = self.resolver.resolve(&read.node, at);
        let ty = self.require_type(resolved, "the map element", read.span)?;
        if conditional {
            self.warnings.push(
                Diagnostic::warning(
                    "container read now runs before the short-circuit operator guarding it".to_string(),
                    read.span,
                )
                .with_help("the element is read even when the left operand decides the result".to_string()),
            );
        }
        let span = read.span;
        let Some((map, key)) = take_index(&mut read) else {
            return Ok(None);
        };
        let get = call_expr(
            &self.options.container_get,
            vec![map, key, address_of(Spanned::new(Expr::ident(&temp), span))],
            span,
        );
        let mut prelude = vec![self.var_decl(vec![(temp, ty)], at)];
        prelude.push(self.new_stmt(StmtKind::Expr(get), at));
        debug!(id = stmt.id, "hoisted container read");
        Ok(Some(prelude))
    }
}
