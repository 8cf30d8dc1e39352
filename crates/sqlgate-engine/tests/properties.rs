//! Purity, idempotence and oracle properties of the pipeline.

mod common;

use common::{bounding, catalog, check};
use proptest::prelude::*;
use serde_json::Value;
use sqlgate_core::SchemaCatalogConfig;
use sqlgate_engine::{GeneratedCandidate, ValidationVerdict, validate};
use sqlgate_policy::SchemaCatalog;
use sqlgate_sql::{Statement, parse_sql};
use sqlparser::ast::{Expr, SelectItem, SetExpr};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Column names that are PostgreSQL keywords but plain identifiers to our lexer.
const RESERVED_POOL: &[&str] = &[
    "user",
    "table",
    "column",
    "check",
    "current_user",
    "position",
    "only",
    "both",
];

/// Accepted canonical SQL must be exactly one query according to an independent parser.
fn assert_single_select(sql: &str) {
    let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
        .unwrap_or_else(|e| panic!("oracle failed to parse {:?}: {}", sql, e));
    assert_eq!(statements.len(), 1, "{}", sql);
    assert!(
        matches!(statements[0], sqlparser::ast::Statement::Query(_)),
        "not a query: {}",
        sql
    );
}

/// The column each projected item names, as PostgreSQL would read it.
fn projected_columns(sql: &str) -> Vec<String> {
    let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
        .unwrap_or_else(|e| panic!("oracle failed to parse {:?}: {}", sql, e));
    let sqlparser::ast::Statement::Query(query) = &statements[0] else {
        panic!("not a query: {}", sql);
    };
    let SetExpr::Select(select) = query.body.as_ref() else {
        panic!("not a plain select: {}", sql);
    };
    select
        .projection
        .iter()
        .map(|item| match item {
            SelectItem::UnnamedExpr(Expr::Identifier(ident)) => ident.value.clone(),
            SelectItem::UnnamedExpr(Expr::CompoundIdentifier(parts)) => {
                parts.last().map(|p| p.value.clone()).unwrap_or_default()
            }
            other => panic!("{} is not a column reference in {}", other, sql),
        })
        .collect()
}

/// The statement tree without source positions or quoting flags.
fn shape(statement: &Statement) -> Value {
    fn strip(value: &mut Value) {
        match value {
            Value::Object(map) => {
                map.remove("position");
                map.remove("quoted");
                map.values_mut().for_each(strip);
            }
            Value::Array(items) => items.iter_mut().for_each(strip),
            _ => {}
        }
    }
    let mut value = serde_json::to_value(statement).unwrap();
    strip(&mut value);
    value
}

fn reserved_catalog() -> SchemaCatalog {
    let mut columns = vec![("id", "integer")];
    columns.extend(RESERVED_POOL.iter().map(|c| (*c, "text")));
    let config = SchemaCatalogConfig {
        version: 1,
        ..Default::default()
    }
    .with_table("account", &columns);
    SchemaCatalog::from_config(&config).unwrap()
}

fn column() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["id", "name", "price", "p.id", "p.name", "p.price"])
}

fn predicate() -> impl Strategy<Value = String> {
    prop_oneof![
        (column(), 0i64..1000).prop_map(|(c, n)| format!("{} > {}", c, n)),
        (column(), "[a-z%]{0,6}").prop_map(|(c, s)| format!("{} LIKE '{}'", c, s)),
        column().prop_map(|c| format!("{} IS NOT NULL", c)),
        (column(), 0i64..10, 10i64..20)
            .prop_map(|(c, lo, hi)| format!("{} not between {} and {}", c, lo, hi)),
        (column(), column()).prop_map(|(a, b)| format!("({} = {} OR {} <> 1)", a, b, a)),
        column().prop_map(|c| format!("{} IN (1, 2, 3)", c)),
        column().prop_map(|c| format!("NOT -{} < 0", c)),
    ]
}

/// Candidates over the `product` table, most of them acceptable.
fn product_query() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(column(), 1..4),
        prop::option::of(prop::collection::vec(predicate(), 1..3)),
        prop::option::of((column(), any::<bool>())),
        prop::option::of(0u64..50_000),
        prop::option::of(0u64..100),
        any::<bool>(),
    )
        .prop_map(|(columns, predicates, order, limit, offset, lower)| {
            let mut sql = format!("SELECT {} FROM product p", columns.join(", "));
            if let Some(predicates) = predicates {
                sql.push_str(" WHERE ");
                sql.push_str(&predicates.join(" AND "));
            }
            if let Some((column, desc)) = order {
                sql.push_str(&format!(" ORDER BY {}{}", column, if desc { " DESC" } else { "" }));
            }
            if let Some(limit) = limit {
                sql.push_str(&format!(" LIMIT {}", limit));
            }
            if let Some(offset) = offset {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
            if lower { sql.to_lowercase() } else { sql }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_accepted_output_is_idempotent(sql in product_query()) {
        let first = check(&sql);
        if let ValidationVerdict::Accepted { canonical_sql, row_limit, .. } = &first {
            prop_assert!(*row_limit <= bounding().max_rows);
            prop_assert_eq!(check(canonical_sql), first.clone());
            assert_single_select(canonical_sql);
        }
    }

    #[test]
    fn prop_reserved_word_columns_keep_their_meaning(
        columns in prop::collection::vec(prop::sample::select(RESERVED_POOL.to_vec()), 1..5),
        qualify in any::<bool>(),
    ) {
        let projection: Vec<String> = columns
            .iter()
            .map(|c| if qualify { format!("a.{}", c) } else { c.to_string() })
            .collect();
        let sql = format!("SELECT {} FROM account AS a LIMIT 5", projection.join(", "));

        let verdict = validate(&GeneratedCandidate::new(sql.as_str()), &reserved_catalog(), &bounding());
        let canonical = verdict
            .canonical_sql()
            .unwrap_or_else(|| panic!("{} was rejected: {:?}", sql, verdict))
            .to_string();

        assert_single_select(&canonical);
        prop_assert_eq!(projected_columns(&canonical), columns);
        prop_assert_eq!(shape(&parse_sql(&canonical).unwrap()), shape(&parse_sql(&sql).unwrap()));
    }

    #[test]
    fn prop_validation_is_pure(text in any::<String>()) {
        let catalog = catalog();
        let config = bounding();
        let candidate = GeneratedCandidate::new(text);
        prop_assert_eq!(
            validate(&candidate, &catalog, &config),
            validate(&candidate, &catalog, &config)
        );
    }

    #[test]
    fn prop_comment_anywhere_is_rejected(sql in product_query(), cut in any::<prop::sample::Index>(), marker in prop::sample::select(vec!["--", "/*", "#"])) {
        // Split on a char boundary outside any string literal by inserting before a space.
        let spaces: Vec<usize> = sql.match_indices(' ').map(|(i, _)| i).collect();
        let at = spaces[cut.index(spaces.len())];
        let quotes_before = sql[..at].matches('\'').count();
        prop_assume!(quotes_before % 2 == 0);
        let commented = format!("{} {}{}", &sql[..at], marker, &sql[at..]);
        let verdict = check(&commented);
        prop_assert_eq!(verdict.code(), Some("IllegalComment"));
    }
}

#[test]
fn test_oracle_accepts_reference_outputs() {
    for sql in [
        "SELECT id, name FROM seller ORDER BY name",
        "SELECT c.name, count(*) AS n FROM customer c JOIN \"order\" o ON o.customer_id = c.id GROUP BY c.name HAVING count(*) > 2",
        "SELECT name FROM product WHERE price BETWEEN 1 AND 2 OR name ILIKE 'x%' ORDER BY price DESC NULLS LAST",
        "SELECT coalesce(name, 'none') FROM seller LIMIT ALL OFFSET 10",
        "SELECT count(*) AS password FROM seller GROUP BY password",
        "SELECT upper(name) AS name FROM seller GROUP BY name ORDER BY name",
        "SELECT name AS password FROM seller ORDER BY password",
    ] {
        let verdict = check(sql);
        let canonical = verdict
            .canonical_sql()
            .unwrap_or_else(|| panic!("{} was rejected: {:?}", sql, verdict));
        assert_single_select(canonical);
    }
}
