//! Read-only traversal helpers over the syntax tree.

use crate::ast::{Expr, FunctionArgs, SelectItem, Statement};

/// Calls `visit` on `expr` and every expression nested inside it, parents first.
/// Stops at the first error.
pub fn walk_expr<E>(expr: &Expr, visit: &mut impl FnMut(&Expr) -> Result<(), E>) -> Result<(), E> {
    visit(expr)?;
    match expr {
        Expr::Column(_) | Expr::Literal(_) => {}
        Expr::Function(call) => {
            if let FunctionArgs::Exprs(args) = &call.args {
                for arg in args {
                    walk_expr(arg, visit)?;
                }
            }
        }
        Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } | Expr::Nested(expr) => {
            walk_expr(expr, visit)?;
        }
        Expr::Binary { left, right, .. } => {
            walk_expr(left, visit)?;
            walk_expr(right, visit)?;
        }
        Expr::InList { expr, list, .. } => {
            walk_expr(expr, visit)?;
            for item in list {
                walk_expr(item, visit)?;
            }
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            walk_expr(expr, visit)?;
            walk_expr(low, visit)?;
            walk_expr(high, visit)?;
        }
        Expr::Case {
            operand,
            branches,
            else_result,
        } => {
            if let Some(operand) = operand {
                walk_expr(operand, visit)?;
            }
            for (condition, result) in branches {
                walk_expr(condition, visit)?;
                walk_expr(result, visit)?;
            }
            if let Some(else_result) = else_result {
                walk_expr(else_result, visit)?;
            }
        }
    }
    Ok(())
}

/// Top-level expressions of a statement in clause order: select list, join
/// conditions, WHERE, GROUP BY, HAVING, ORDER BY.
pub fn statement_exprs(statement: &Statement) -> Vec<&Expr> {
    let mut exprs = Vec::new();
    for item in &statement.projection {
        if let SelectItem::Expr { expr, .. } = item {
            exprs.push(expr);
        }
    }
    if let Some(from) = &statement.from {
        exprs.extend(from.joins.iter().map(|j| &j.on));
    }
    exprs.extend(statement.selection.iter());
    exprs.extend(statement.group_by.iter());
    exprs.extend(statement.having.iter());
    exprs.extend(statement.order_by.iter().map(|o| &o.expr));
    exprs
}

/// Splits an expression into its top-level AND operands, looking through parentheses.
pub fn conjuncts(expr: &Expr) -> Vec<&Expr> {
    let mut out = Vec::new();
    let mut pending = vec![expr];
    while let Some(expr) = pending.pop() {
        match expr {
            Expr::Binary {
                left,
                op: crate::ast::BinaryOp::And,
                right,
            } => {
                pending.push(right);
                pending.push(left);
            }
            Expr::Nested(inner) => pending.push(inner),
            other => out.push(other),
        }
    }
    out
}

/// Looks through any number of enclosing parentheses.
pub fn strip_nested(mut expr: &Expr) -> &Expr {
    while let Expr::Nested(inner) = expr {
        expr = inner;
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_sql;

    #[test]
    fn test_walk_visits_every_column() {
        let stmt = parse_sql(
            "SELECT a, f(b, CASE WHEN c THEN d END) FROM t WHERE e IN (g, h) AND i BETWEEN j AND k",
        )
        .unwrap();
        let mut names = Vec::new();
        for expr in statement_exprs(&stmt) {
            walk_expr(expr, &mut |e| {
                if let Expr::Column(c) = e {
                    names.push(c.name.value.clone());
                }
                Ok::<_, ()>(())
            })
            .unwrap();
        }
        assert_eq!(
            names,
            vec!["a", "b", "c", "d", "e", "g", "h", "i", "j", "k"]
        );
    }

    #[test]
    fn test_conjuncts_look_through_parentheses() {
        let stmt = parse_sql("SELECT 1 WHERE (a = 1 AND (b = 2)) AND c = 3 OR d").unwrap();
        // Top level is OR, so there is a single conjunct.
        assert_eq!(conjuncts(stmt.selection.as_ref().unwrap()).len(), 1);

        let stmt = parse_sql("SELECT 1 WHERE (a = 1 AND (b = 2)) AND c = 3").unwrap();
        assert_eq!(conjuncts(stmt.selection.as_ref().unwrap()).len(), 3);
    }
}
