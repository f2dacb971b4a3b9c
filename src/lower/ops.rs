//! AND-NOT desugaring: `a &^ b` becomes `a & (^(b))`.

use super::take_expr;
use crate::ast::*;
use crate::span::Spanned;

/// `(^(operand))`
pub(super) fn complement(operand: Spanned<Expr>) -> Spanned<Expr> {
    let span = operand.span;
    let inner = Spanned::new(Expr::Paren(Box::new(operand)), span);
    let not = Spanned::new(
        Expr::Unary {
            op: UnaryOp::BitNot,
            expr: Box::new(inner),
        },
        span,
    );
    Spanned::new(Expr::Paren(Box::new(not)), span)
}

/// The binary operator a compound assignment applies, `None` for `:=`
/// and `=`.
pub(super) fn binary_op(op: AssignOp) -> Option<BinOp> {
    Some(match op {
        AssignOp::Define | AssignOp::Assign => return None,
        AssignOp::Add => BinOp::Add,
        AssignOp::Sub => BinOp::Sub,
        AssignOp::Mul => BinOp::Mul,
        AssignOp::Div => BinOp::Div,
        AssignOp::Rem => BinOp::Rem,
        AssignOp::BitAnd => BinOp::BitAnd,
        AssignOp::BitOr => BinOp::BitOr,
        AssignOp::BitXor => BinOp::BitXor,
        AssignOp::Shl => BinOp::Shl,
        AssignOp::Shr => BinOp::Shr,
        AssignOp::AndNot => BinOp::AndNot,
    })
}

/// Rewrite a binary `&^` node in place. Returns whether it fired.
pub(super) fn desugar_binary(expr: &mut Expr) -> bool {
    match expr {
        Expr::Binary { op, rhs, .. } if *op == BinOp::AndNot => {
            *op = BinOp::BitAnd;
            let operand = take_expr(rhs);
            **rhs = complement(operand);
            true
        }
        _ => false,
    }
}

/// Rewrite `a &^= b` to `a &= (^(b))`. Returns whether it fired.
pub(super) fn desugar_assign(op: &mut AssignOp, rhs: &mut [Spanned<Expr>]) -> bool {
    if *op != AssignOp::AndNot {
        return false;
    }
    *op = AssignOp::BitAnd;
    for value in rhs {
        let operand = take_expr(value);
        *value = complement(operand);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::display::format_expr;

    fn ident(name: &str) -> Box<Spanned<Expr>> {
        Box::new(Spanned::dummy(Expr::ident(name)))
    }

    /// Evaluate integer expressions over two variables `a` and `b`.
    fn eval(expr: &Expr, a: i64, b: i64) -> i64 {
        match expr {
            Expr::Ident(name) if name == "a" => a,
            Expr::Ident(name) if name == "b" => b,
            Expr::Paren(inner) => eval(&inner.node, a, b),
            Expr::Unary {
                op: UnaryOp::BitNot,
                expr,
            } => !eval(&expr.node, a, b),
            Expr::Binary { op, lhs, rhs } => {
                let (l, r) = (eval(&lhs.node, a, b), eval(&rhs.node, a, b));
                match op {
                    BinOp::BitAnd => l & r,
                    BinOp::AndNot => l & !r,
                    BinOp::BitOr => l | r,
                    other => panic!("unsupported operator {:?}", other),
                }
            }
            other => panic!("unsupported expression {:?}", other),
        }
    }

    fn and_not(lhs: Box<Spanned<Expr>>, rhs: Box<Spanned<Expr>>) -> Expr {
        Expr::Binary {
            op: BinOp::AndNot,
            lhs,
            rhs,
        }
    }

    #[test]
    fn test_desugar_shape() {
        let mut expr = and_not(ident("a"), ident("b"));
        assert!(desugar_binary(&mut expr));
        assert_eq!(format_expr(&expr), "a & (^(b))");
        assert!(!desugar_binary(&mut expr), "already lowered");
    }

    #[test]
    fn test_desugar_keeps_compound_operand_grouped() {
        let rhs = Box::new(Spanned::dummy(Expr::Binary {
            op: BinOp::BitOr,
            lhs: ident("a"),
            rhs: ident("b"),
        }));
        let mut expr = and_not(ident("a"), rhs);
        desugar_binary(&mut expr);
        assert_eq!(format_expr(&expr), "a & (^(a | b))");
    }

    #[test]
    fn test_desugar_assign() {
        let mut op = AssignOp::AndNot;
        let mut rhs = vec![Spanned::dummy(Expr::ident("mask"))];
        assert!(desugar_assign(&mut op, &mut rhs));
        assert_eq!(op, AssignOp::BitAnd);
        assert_eq!(format_expr(&rhs[0].node), "(^(mask))");
        assert!(!desugar_assign(&mut op, &mut rhs));
    }

    #[test]
    fn test_binary_op_of_compound_assignments() {
        assert_eq!(binary_op(AssignOp::Add), Some(BinOp::Add));
        assert_eq!(binary_op(AssignOp::AndNot), Some(BinOp::AndNot));
        assert_eq!(binary_op(AssignOp::Shl), Some(BinOp::Shl));
        assert_eq!(binary_op(AssignOp::Define), None);
        assert_eq!(binary_op(AssignOp::Assign), None);
    }

    #[test]
    fn test_and_not_equivalence_over_integers() {
        let original = and_not(ident("a"), ident("b"));
        let mut lowered = original.clone();
        desugar_binary(&mut lowered);

        // xorshift64: deterministic, wide coverage of bit patterns
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as i64
        };
        let edges = [0, 1, -1, i64::MAX, i64::MIN, 0x5555_5555, -0x5555_5556];
        let mut pairs: Vec<(i64, i64)> = edges
            .iter()
            .flat_map(|&a| edges.iter().map(move |&b| (a, b)))
            .collect();
        pairs.extend((0..2000).map(|_| (next(), next())));

        for (a, b) in pairs {
            assert_eq!(
                eval(&original, a, b),
                eval(&lowered, a, b),
                "a = {}, b = {}",
                a,
                b
            );
        }
    }
}
