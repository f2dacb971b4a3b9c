//! Tuple assignments: `a, b := f()`, `a, b = f()` and `var a, b = f()`.

use tracing::debug;

use super::signature::out_positions;
use super::{address_of, take_expr, var_gen, Declared, Lowerer, Prelude};
use crate::ast::splice;
use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::span::Spanned;

impl Lowerer<'_> {
    /// Whether rewriting `stmt` would splice anything in front of it.
    /// Errs on the side of `true`.
    pub(super) fn needs_splice(&self, stmt: &Stmt) -> bool {
        self.needs_declarations(stmt) || self.has_container_work(stmt)
    }

    /// Whether rewriting `stmt` would declare variables in front of it.
    pub(super) fn needs_declarations(&self, stmt: &Stmt) -> bool {
        let StmtKind::Assign { lhs, op, rhs } = &stmt.kind else {
            return false;
        };
        let [value] = rhs.as_slice() else {
            return false;
        };
        let define = *op == AssignOp::Define;
        if self.is_container_index(&value.node, stmt.span) {
            return define || lhs.first().is_some_and(|t| t.node.is_blank());
        }
        lhs.len() > 1 && (define || lhs.iter().any(|t| t.node.is_blank()))
    }

    /// Statement-local rules, first match wins. `Some` when one fired,
    /// carrying the declarations to splice before `stmt`.
    pub(super) fn rewrite_stmt(
        &mut self,
        declared: Declared<'_>,
        stmt: &mut Stmt,
    ) -> Result<Option<Prelude>, Diagnostic> {
        if self.lower_container_write(stmt) {
            return Ok(Some(Vec::new()));
        }
        if let Some(prelude) = self.lower_container_read(declared, stmt)? {
            return Ok(Some(prelude));
        }
        if let Some(prelude) = self.split_tuple_define(declared, stmt)? {
            return Ok(Some(prelude));
        }
        if let Some(prelude) = self.complete_tuple_assign(stmt)? {
            return Ok(Some(prelude));
        }
        if let Some(prelude) = self.lower_container_update(stmt)? {
            return Ok(Some(prelude));
        }
        self.hoist_container_read(stmt)
    }

    /// `a, b := f()` → `var a A; var b B` before, then `a, b = f()`.
    fn split_tuple_define(
        &mut self,
        declared: Declared<'_>,
        stmt: &mut Stmt,
    ) -> Result<Option<Prelude>, Diagnostic> {
        let at = stmt.span;
        let StmtKind::Assign { lhs, op, rhs } = &mut stmt.kind else {
            return Ok(None);
        };
        if *op != AssignOp::Define || rhs.len() != 1 || lhs.len() <= rhs.len() {
            return Ok(None);
        }
        let call = &rhs[0].node;
        let mut vars = Vec::new();
        for (position, target) in lhs.iter_mut().enumerate() {
            if target.node.is_blank() {
                let resolved = self.resolver.resolve_result(call, position, at);
                let ty = self.require_type(resolved, "the discarded value", target.span)?;
                let name = self.discard_name();
                target.node = Expr::ident(&name);
                vars.push((name, ty));
                continue;
            }
            let Some(name) = target.node.as_ident() else {
                continue;
            };
            if declared.contains(name) {
                continue;
            }
            let resolved = self
                .resolver
                .resolve(&target.node, at)
                .or_else(|| self.resolver.resolve_result(call, position, at));
            let ty = self.require_type(resolved, &format!("'{}'", name), target.span)?;
            vars.push((name.to_string(), ty));
        }
        *op = AssignOp::Assign;
        debug!(id = stmt.id, declared = vars.len(), "split tuple definition");
        Ok(Some(self.prelude(vars, at)))
    }

    /// Result shape to mirror at a call site binding `count` values.
    fn call_shape(&self, call: &Expr, count: usize) -> Vec<usize> {
        call.callee_name()
            .and_then(|name| self.shapes.get(name))
            .filter(|shape| shape.iter().sum::<usize>() == count)
            .cloned()
            .unwrap_or_else(|| vec![1; count])
    }

    /// `a, b, c = f(x)` → `a = f(x, &c, &b)`: targets beyond the first become
    /// address-of arguments in the order output parameters were appended.
    fn complete_tuple_assign(&mut self, stmt: &mut Stmt) -> Result<Option<Prelude>, Diagnostic> {
        let at = stmt.span;
        let StmtKind::Assign { lhs, op, rhs } = &mut stmt.kind else {
            return Ok(None);
        };
        if *op != AssignOp::Assign || rhs.len() != 1 || lhs.len() <= rhs.len() {
            return Ok(None);
        }
        if !matches!(rhs[0].node, Expr::Call { .. }) {
            return Ok(None);
        }
        let shape = self.call_shape(&rhs[0].node, lhs.len());
        let (first_stays, positions) = out_positions(&shape);

        let mut vars = Vec::new();
        for &position in &positions {
            if !lhs[position].node.is_blank() {
                continue;
            }
            let resolved = self.resolver.resolve_result(&rhs[0].node, position, at);
            let ty = self.require_type(resolved, "the discarded value", lhs[position].span)?;
            let name = self.discard_name();
            lhs[position].node = Expr::ident(&name);
            vars.push((name, ty));
        }

        let mut targets: Vec<Option<Spanned<Expr>>> =
            std::mem::take(lhs).into_iter().map(Some).collect();
        let mut call = take_expr(&mut rhs[0]);
        if let Expr::Call { args, .. } = &mut call.node {
            for &position in &positions {
                if let Some(target) = targets[position].take() {
                    args.push(address_of(target));
                }
            }
        }
        let first = targets
            .first_mut()
            .and_then(Option::take)
            .filter(|target| first_stays && !target.node.is_blank());
        stmt.kind = match first {
            Some(first) => StmtKind::Assign {
                lhs: vec![first],
                op: AssignOp::Assign,
                rhs: vec![call],
            },
            None => StmtKind::Expr(call),
        };
        debug!(id = stmt.id, outs = positions.len(), "completed tuple assignment");
        Ok(Some(self.prelude(vars, at)))
    }

    /// `var a, b = f()` → `var a A; var b B` followed by `a, b = f()`.
    /// A single `var v = m[k]` over a container is split the same way.
    pub(super) fn split_var_decl(&mut self, stmts: &mut Vec<Stmt>, i: usize) -> Result<bool, Diagnostic> {
        let at = stmts[i].span;
        let anchor = stmts[i].id;
        let StmtKind::Decl(gen) = &mut stmts[i].kind else {
            return Ok(false);
        };
        if gen.keyword != DeclKeyword::Var || gen.specs.len() != 1 {
            return Ok(false);
        }
        let Spec::Value(spec) = &mut gen.specs[0] else {
            return Ok(false);
        };
        let [value] = spec.values.as_slice() else {
            return Ok(false);
        };
        let tuple = spec.names.len() > 1;
        if !tuple && !self.is_container_index(&value.node, at) {
            return Ok(false);
        }

        let mut vars = Vec::new();
        for (position, name) in spec.names.iter().enumerate() {
            if name.node == "_" {
                continue;
            }
            let ty = match &spec.ty {
                Some(ty) => ty.node.clone(),
                None => {
                    let resolved = if tuple {
                        self.resolver.resolve_result(&value.node, position, at)
                    } else {
                        self.resolver.resolve(&value.node, at)
                    };
                    self.require_type(resolved, &format!("'{}'", name.node), name.span)?
                }
            };
            vars.push((name.node.clone(), ty));
        }

        let targets = spec
            .names
            .iter()
            .map(|name| Spanned::new(Expr::Ident(name.node.clone()), name.span))
            .collect();
        let value = spec.values.remove(0);
        stmts[i].kind = if vars.is_empty() {
            StmtKind::Empty
        } else {
            StmtKind::Decl(var_gen(vars, at))
        };
        let assign = self.new_stmt(
            StmtKind::Assign {
                lhs: targets,
                op: AssignOp::Assign,
                rhs: vec![value],
            },
            at,
        );
        splice::insert_after(stmts, anchor, assign);
        debug!(id = anchor, "split var declaration");
        Ok(true)
    }
}
