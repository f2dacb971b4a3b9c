//! Receiver folding, multi-result lowering and the matching return rewrite.

use std::collections::BTreeMap;

use tracing::debug;

use super::{sieve, take_expr, Lowerer};
use crate::ast::splice;
use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::span::Spanned;

/// How one function's results were redistributed, for rewriting its
/// `return` statements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct ReturnPlan {
    /// Flattened result count before lowering.
    pub(super) total: usize,
    /// Position 0 is still returned by value.
    pub(super) keep_first: bool,
    /// `(position, parameter name)` for every moved result, ascending.
    pub(super) outs: Vec<(usize, String)>,
    /// `(parameter name, local name)` for every moved named result,
    /// ascending. A bare `return` copies each local out.
    pub(super) named: Vec<(String, String)>,
}

/// Results redistributed by [`lower_results`].
struct MovedResults {
    plan: ReturnPlan,
    /// Locals standing in for moved named results, declared at the top of
    /// the body.
    locals: Vec<(String, Type)>,
}

/// Whether result entry `index` (binding `names` names) moves to the
/// parameter list.
fn moves(index: usize, names: usize) -> bool {
    names > 1 || index != 0
}

/// For a result shape (names per entry), whether the first value stays a
/// return value, and the flattened positions in the order their output
/// parameters are appended.
pub(super) fn out_positions(shape: &[usize]) -> (bool, Vec<usize>) {
    let mut starts = Vec::with_capacity(shape.len());
    let mut next = 0;
    for &arity in shape {
        starts.push(next);
        next += arity;
    }
    let mut positions = Vec::new();
    for (index, &arity) in shape.iter().enumerate().rev() {
        if moves(index, arity) {
            positions.extend(starts[index]..starts[index] + arity);
        }
    }
    let first_stays = shape.first().is_some_and(|&arity| !moves(0, arity));
    (first_stays, positions)
}

/// Result shapes of every plain function in the file, recorded before any
/// signature is rewritten.
pub(super) fn collect_shapes(file: &File) -> BTreeMap<String, Vec<usize>> {
    file.functions()
        .filter(|func| func.recv.is_none())
        .map(|func| {
            let shape = func.results.iter().map(Field::arity).collect();
            (func.name.node.clone(), shape)
        })
        .collect()
}

/// Move the single receiver to the front of the parameter list.
fn fold_receiver(func: &mut FuncDecl) {
    if let Some(recv) = func.recv.take() {
        for (offset, field) in recv.into_iter().enumerate() {
            splice::insert_at(&mut func.params, offset, field);
        }
        debug!(func = %func.name.node, "folded receiver into parameters");
    }
}

/// Output parameter name for value `offset` of result entry `index`:
/// `_k` with `k = count - index`, and `_k_j` inside a multi-name entry.
fn out_name(count: usize, index: usize, names: usize, offset: usize) -> String {
    if names > 1 {
        format!("_{}_{}", count - index, offset + 1)
    } else {
        format!("_{}", count - index)
    }
}

/// Turn every result but the first into a trailing pointer parameter.
///
/// Moved results always get synthesized parameter names. A moved result
/// that had a name of its own keeps living as a local of that name, so the
/// body can go on reading and writing it by value.
fn lower_results(func: &mut FuncDecl) -> Option<MovedResults> {
    let count = func.results.len();
    let total = arity(&func.results);
    let mut starts = Vec::with_capacity(count);
    let mut next = 0;
    for field in &func.results {
        starts.push(next);
        next += field.arity();
    }

    let mut kept = Vec::new();
    let mut outs = Vec::new();
    let mut named = Vec::new();
    let mut locals = Vec::new();
    let entries = std::mem::take(&mut func.results);
    for (index, entry) in entries.into_iter().enumerate().rev() {
        if !moves(index, entry.names.len()) {
            kept.push(entry);
            continue;
        }
        let arity = entry.arity();
        let mut params = Vec::with_capacity(arity);
        for offset in 0..arity {
            let name = out_name(count, index, entry.names.len(), offset);
            let span = entry.names.get(offset).map_or(entry.ty.span, |n| n.span);
            if let Some(local) = entry.names.get(offset) {
                named.push((starts[index] + offset, name.clone(), local.node.clone()));
                locals.push((starts[index] + offset, local.node.clone(), entry.ty.node.clone()));
            }
            outs.push((starts[index] + offset, name.clone()));
            params.push(Spanned::new(name, span));
        }
        debug!(
            func = %func.name.node,
            entry = index,
            "moved result to output parameter"
        );
        let moved = Field {
            names: params,
            ty: entry.ty.map(Type::pointer_to),
        };
        let end = func.params.len();
        splice::insert_at(&mut func.params, end, moved);
    }
    func.results = kept;

    if outs.is_empty() {
        return None;
    }
    outs.sort_by_key(|(position, _)| *position);
    named.sort_by_key(|(position, _, _)| *position);
    locals.sort_by_key(|(position, _, _)| *position);
    Some(MovedResults {
        plan: ReturnPlan {
            total,
            keep_first: !func.results.is_empty(),
            outs,
            named: named.into_iter().map(|(_, out, local)| (out, local)).collect(),
        },
        locals: locals.into_iter().map(|(_, name, ty)| (name, ty)).collect(),
    })
}

/// Names bound by a parameter or result list.
pub(super) fn field_names(fields: &[Field]) -> Vec<String> {
    fields
        .iter()
        .flat_map(|field| field.names.iter().map(|name| name.node.clone()))
        .collect()
}

impl Lowerer<'_> {
    pub(super) fn lower_func(&mut self, func: &mut FuncDecl) -> Result<(), Diagnostic> {
        sieve::check_func(func)?;
        fold_receiver(func);
        let moved = lower_results(func);
        let mut scope = field_names(&func.params);
        scope.extend(field_names(&func.results));
        let Some(body) = &mut func.body else {
            return Ok(());
        };
        let plan = match moved {
            Some(MovedResults { plan, locals }) => {
                if !locals.is_empty() {
                    let decl = self.var_decl(locals, body.span);
                    splice::insert_at(&mut body.stmts, 0, decl);
                }
                Some(plan)
            }
            None => None,
        };
        self.returns.push(plan);
        let lowered = self.lower_sequence(&mut body.stmts, &scope);
        self.returns.pop();
        lowered
    }

    /// Rewrite a `return` inside a function whose results moved. Returns
    /// whether the cursor should revisit the statement's position.
    pub(super) fn lower_return(&mut self, stmts: &mut Vec<Stmt>, index: usize) -> bool {
        let Some(Some(plan)) = self.returns.last() else {
            return false;
        };
        let StmtKind::Return(values) = &stmts[index].kind else {
            return false;
        };
        let id = stmts[index].id;
        if self.lowered_returns.contains(&id) {
            return false;
        }
        let plan = plan.clone();
        if values.len() == plan.total {
            self.split_return(stmts, index, &plan);
            self.lowered_returns.insert(id);
            return true;
        }
        if values.is_empty() && !plan.named.is_empty() {
            self.write_named_results(stmts, index, &plan);
            self.lowered_returns.insert(id);
            return true;
        }
        if values.len() == 1 && self.forward_return(stmts, index, &plan) {
            self.lowered_returns.insert(id);
        }
        false
    }

    /// `*out = local` before a new statement ahead of `stmts[index]`.
    fn store_out(&mut self, stmts: &mut Vec<Stmt>, index: usize, out: &str, value: Spanned<Expr>) {
        let anchor = stmts[index].id;
        let span = stmts[index].span;
        let target = Spanned::new(
            Expr::Unary {
                op: UnaryOp::Deref,
                expr: Box::new(Spanned::new(Expr::ident(out), value.span)),
            },
            value.span,
        );
        let assign = self.new_stmt(
            StmtKind::Assign {
                lhs: vec![target],
                op: AssignOp::Assign,
                rhs: vec![value],
            },
            span,
        );
        splice::insert_before(stmts, anchor, assign);
    }

    /// Bare `return` with named results: `*_1 = r; return`.
    fn write_named_results(&mut self, stmts: &mut Vec<Stmt>, index: usize, plan: &ReturnPlan) {
        let anchor = stmts[index].id;
        let span = stmts[index].span;
        for (out, local) in &plan.named {
            self.store_out(stmts, index, out, Spanned::new(Expr::ident(local), span));
        }
        debug!(id = anchor, outs = plan.named.len(), "copied named results out");
    }

    /// `return a, b, c` → `*_2 = b; *_1 = c; return a`.
    fn split_return(&mut self, stmts: &mut Vec<Stmt>, index: usize, plan: &ReturnPlan) {
        let anchor = stmts[index].id;
        let mut values = match &mut stmts[index].kind {
            StmtKind::Return(values) => std::mem::take(values),
            _ => return,
        };
        for (position, name) in &plan.outs {
            let value = take_expr(&mut values[*position]);
            if let Some(at) = splice::find_identity(stmts, anchor) {
                self.store_out(stmts, at, name, value);
            }
        }
        values.truncate(usize::from(plan.keep_first));
        if let Some(pos) = splice::find_identity(stmts, anchor) {
            stmts[pos].kind = StmtKind::Return(values);
        }
        debug!(outs = plan.outs.len(), "split multi-value return");
    }

    /// `return g(x)` where `g` moved the same result positions: the output
    /// parameters are passed straight through, `return g(x, _2, _1)`.
    fn forward_return(&mut self, stmts: &mut Vec<Stmt>, index: usize, plan: &ReturnPlan) -> bool {
        let anchor = stmts[index].id;
        let span = stmts[index].span;
        let StmtKind::Return(values) = &mut stmts[index].kind else {
            return false;
        };
        let Some(shape) = values[0]
            .node
            .callee_name()
            .and_then(|callee| self.shapes.get(callee))
        else {
            return false;
        };
        if shape.iter().sum::<usize>() != plan.total {
            return false;
        }
        let (first_stays, positions) = out_positions(shape);
        let mut moved = positions.clone();
        moved.sort_unstable();
        let planned: Vec<usize> = plan.outs.iter().map(|(position, _)| *position).collect();
        if first_stays != plan.keep_first || moved != planned {
            return false;
        }
        if let Expr::Call { args, .. } = &mut values[0].node {
            for position in &positions {
                if let Some((_, name)) = plan.outs.iter().find(|(p, _)| p == position) {
                    args.push(Spanned::new(Expr::ident(name), span));
                }
            }
        }
        if !plan.keep_first {
            let call = values.remove(0);
            let stmt = self.new_stmt(StmtKind::Expr(call), span);
            splice::insert_before(stmts, anchor, stmt);
        }
        debug!(id = anchor, "forwarded output parameters through return");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_positions_default_shape() {
        // (a, b, c) = f(): c is appended first, then b.
        assert_eq!(out_positions(&[1, 1, 1]), (true, vec![2, 1]));
    }

    #[test]
    fn test_out_positions_multi_name_entries() {
        // (x, y int, err error): err first, then x and y.
        assert_eq!(out_positions(&[2, 1]), (false, vec![2, 0, 1]));
        // (n int, a, b string)
        assert_eq!(out_positions(&[1, 2]), (true, vec![1, 2]));
        // single entry with two names
        assert_eq!(out_positions(&[2]), (false, vec![0, 1]));
    }

    #[test]
    fn test_out_positions_single_result() {
        assert_eq!(out_positions(&[1]), (true, vec![]));
        assert_eq!(out_positions(&[]), (false, vec![]));
    }
}
