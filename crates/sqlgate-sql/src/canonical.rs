//! Canonical serialization of the syntax tree.
//!
//! `Display` on [`Statement`] produces the only SQL text that ever leaves the
//! gate. The format is fixed: upper-case keywords, single spaces, identifiers bare
//! only when they are lower-case and not keywords, and parentheses kept from the
//! source plus whatever precedence requires. Printing a parsed statement and parsing
//! the output again yields the same text.

use std::fmt::{self, Display, Formatter, Write};

use crate::ast::{
    BinaryOp, ColumnRef, Expr, FromClause, FunctionArgs, FunctionCall, Ident, Join, JoinKind,
    LimitValue, Literal, NullsOrder, OrderByItem, OrderDirection, PREC_COMPARISON, PREC_CONCAT,
    SelectItem, Statement, TableRef, UnaryOp,
};
use crate::lexer::Keyword;

/// PostgreSQL reserved words, including those that may only name a function or type.
const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "binary", "both", "case", "cast", "check", "collate", "collation",
    "column", "concurrently", "constraint", "create", "cross", "current_catalog",
    "current_date", "current_role", "current_schema", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "false", "fetch", "for", "foreign", "freeze", "from", "full", "grant", "group",
    "having", "ilike", "in", "initially", "inner", "intersect", "into", "is", "isnull",
    "join", "lateral", "leading", "left", "like", "limit", "localtime", "localtimestamp",
    "natural", "not", "notnull", "null", "offset", "on", "only", "or", "order", "outer",
    "overlaps", "placing", "primary", "references", "returning", "right", "select",
    "session_user", "similar", "some", "symmetric", "system_user", "table", "tablesample",
    "then", "to", "trailing", "true", "union", "unique", "user", "using", "variadic",
    "verbose", "when", "where", "window", "with",
];

/// PostgreSQL keywords that can name a column but are parsed as special syntax when
/// called like a function (`coalesce(..)`, `extract(..)`).
const COLUMN_NAME_KEYWORDS: &[&str] = &[
    "between", "bigint", "bit", "boolean", "char", "character", "coalesce", "dec", "decimal",
    "exists", "extract", "float", "greatest", "grouping", "inout", "int", "integer",
    "interval", "json", "json_array", "json_arrayagg", "json_exists", "json_object",
    "json_objectagg", "json_query", "json_scalar", "json_serialize", "json_table",
    "json_value", "least", "merge_action", "national", "nchar", "none", "normalize",
    "nullif", "numeric", "out", "overlay", "position", "precision", "real", "row", "setof",
    "smallint", "substring", "time", "timestamp", "treat", "trim", "values", "varchar",
    "xmlattributes", "xmlconcat", "xmlelement", "xmlexists", "xmlforest", "xmlnamespaces",
    "xmlparse", "xmlpi", "xmlroot", "xmlserialize", "xmltable",
];

/// Lower-case ASCII word that is not one of our own keywords.
fn is_plain_word(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && Keyword::lookup(value).is_none()
}

/// True when `value` can be printed without quotes as a table, column or alias
/// name, lexes back to itself and means the same thing to PostgreSQL.
pub fn is_bare_identifier(value: &str) -> bool {
    is_plain_word(value)
        && !RESERVED_WORDS.contains(&value)
        && !COLUMN_NAME_KEYWORDS.contains(&value)
}

/// Like [`is_bare_identifier`], but for the name in a function call. Column-name
/// keywords stay bare there, since quoting `coalesce` would look up an ordinary
/// function that does not exist.
pub fn is_bare_function_name(value: &str) -> bool {
    is_plain_word(value) && !RESERVED_WORDS.contains(&value)
}

/// Writes an identifier, quoting it when needed.
pub fn write_ident(f: &mut impl Write, value: &str) -> fmt::Result {
    if is_bare_identifier(value) {
        f.write_str(value)
    } else {
        write_quoted(f, value)
    }
}

fn write_quoted(f: &mut impl Write, value: &str) -> fmt::Result {
    f.write_char('"')?;
    f.write_str(&value.replace('"', "\"\""))?;
    f.write_char('"')
}

fn write_separated<T: Display>(f: &mut Formatter<'_>, items: &[T], separator: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Writes `expr`, wrapped in parentheses when `parenthesize` is set.
fn write_operand(f: &mut Formatter<'_>, expr: &Expr, parenthesize: bool) -> fmt::Result {
    if parenthesize {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_ident(f, &self.value)
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        write_separated(f, &self.projection, ", ")?;

        if let Some(from) = &self.from {
            write!(f, " FROM {}", from)?;
        }
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {}", selection)?;
        }
        if !self.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            write_separated(f, &self.group_by, ", ")?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        if !self.order_by.is_empty() {
            f.write_str(" ORDER BY ")?;
            write_separated(f, &self.order_by, ", ")?;
        }
        match self.limit {
            Some(LimitValue::Count(n)) => write!(f, " LIMIT {}", n)?,
            Some(LimitValue::All) => f.write_str(" LIMIT ALL")?,
            None => {}
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}

impl Display for SelectItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SelectItem::Wildcard(_) => f.write_str("*"),
            SelectItem::QualifiedWildcard(qualifier) => write!(f, "{}.*", qualifier),
            SelectItem::Expr { expr, alias } => {
                write!(f, "{}", expr)?;
                if let Some(alias) = alias {
                    write!(f, " AS {}", alias)?;
                }
                Ok(())
            }
        }
    }
}

impl Display for FromClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for join in &self.joins {
            write!(f, " {}", join)?;
        }
        Ok(())
    }
}

impl Display for TableRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

impl Display for JoinKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        })
    }
}

impl Display for Join {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ON {}", self.kind, self.table, self.on)
    }
}

impl Display for OrderByItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        match self.direction {
            Some(OrderDirection::Asc) => f.write_str(" ASC")?,
            Some(OrderDirection::Desc) => f.write_str(" DESC")?,
            None => {}
        }
        match self.nulls {
            Some(NullsOrder::First) => f.write_str(" NULLS FIRST")?,
            Some(NullsOrder::Last) => f.write_str(" NULLS LAST")?,
            None => {}
        }
        Ok(())
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(qualifier) = &self.qualifier {
            write!(f, "{}.", qualifier)?;
        }
        write!(f, "{}", self.name)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => f.write_str(n),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Boolean(true) => f.write_str("TRUE"),
            Literal::Boolean(false) => f.write_str("FALSE"),
            Literal::Null => f.write_str("NULL"),
        }
    }
}

impl Display for FunctionCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(qualifier) = &self.qualifier {
            write!(f, "{}.", qualifier)?;
        }
        if is_bare_function_name(&self.name.value) {
            f.write_str(&self.name.value)?;
        } else {
            write_quoted(f, &self.name.value)?;
        }
        f.write_char('(')?;
        match &self.args {
            FunctionArgs::Wildcard => f.write_str("*")?,
            FunctionArgs::Exprs(args) => {
                if self.distinct {
                    f.write_str("DISTINCT ")?;
                }
                write_separated(f, args, ", ")?;
            }
        }
        f.write_str(")")
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Or => "OR",
            BinaryOp::And => "AND",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Like => "LIKE",
            BinaryOp::NotLike => "NOT LIKE",
            BinaryOp::ILike => "ILIKE",
            BinaryOp::NotILike => "NOT ILIKE",
            BinaryOp::Concat => "||",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        })
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(column) => write!(f, "{}", column),
            Expr::Literal(literal) => write!(f, "{}", literal),
            Expr::Function(call) => write!(f, "{}", call),
            Expr::Nested(inner) => write!(f, "({})", inner),

            Expr::Unary { op, expr } => {
                match op {
                    UnaryOp::Not => f.write_str("NOT ")?,
                    UnaryOp::Minus => f.write_str("-")?,
                    UnaryOp::Plus => f.write_str("+")?,
                }
                // `--` would lex as a comment.
                let doubled_minus = *op == UnaryOp::Minus
                    && matches!(
                        **expr,
                        Expr::Unary {
                            op: UnaryOp::Minus,
                            ..
                        }
                    );
                write_operand(f, expr, expr.precedence() < op.precedence() || doubled_minus)
            }

            Expr::Binary { left, op, right } => {
                let precedence = op.precedence();
                write_operand(f, left, left.precedence() < precedence)?;
                write!(f, " {} ", op)?;
                write_operand(f, right, right.precedence() <= precedence)
            }

            Expr::IsNull { expr, negated } => {
                write_operand(f, expr, expr.precedence() < PREC_COMPARISON)?;
                f.write_str(if *negated { " IS NOT NULL" } else { " IS NULL" })
            }

            Expr::InList {
                expr,
                list,
                negated,
            } => {
                write_operand(f, expr, expr.precedence() < PREC_COMPARISON)?;
                f.write_str(if *negated { " NOT IN (" } else { " IN (" })?;
                write_separated(f, list, ", ")?;
                f.write_str(")")
            }

            Expr::Between {
                expr,
                negated,
                low,
                high,
            } => {
                write_operand(f, expr, expr.precedence() < PREC_COMPARISON)?;
                f.write_str(if *negated { " NOT BETWEEN " } else { " BETWEEN " })?;
                write_operand(f, low, low.precedence() < PREC_CONCAT)?;
                f.write_str(" AND ")?;
                write_operand(f, high, high.precedence() < PREC_CONCAT)
            }

            Expr::Case {
                operand,
                branches,
                else_result,
            } => {
                f.write_str("CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {}", operand)?;
                }
                for (condition, result) in branches {
                    write!(f, " WHEN {} THEN {}", condition, result)?;
                }
                if let Some(else_result) = else_result {
                    write!(f, " ELSE {}", else_result)?;
                }
                f.write_str(" END")
            }
        }
    }
}
