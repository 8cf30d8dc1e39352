//! Policy checks against the shipped sample catalog.

use pretty_assertions::assert_eq;
use sqlgate_core::SchemaCatalogConfig;
use sqlgate_policy::{CatalogStore, SchemaCatalog, ViolationKind, check};
use sqlgate_sql::parse_sql;

fn catalog() -> SchemaCatalog {
    let config = SchemaCatalogConfig::from_yaml(include_str!("../../../config/catalog.yaml")).unwrap();
    SchemaCatalog::from_config(&config).unwrap()
}

fn violation(sql: &str) -> ViolationKind {
    check(&parse_sql(sql).unwrap(), &catalog()).unwrap_err().kind
}

#[test]
fn test_sample_catalog_shape() {
    let catalog = catalog();
    assert_eq!(catalog.version(), 1);
    assert_eq!(catalog.table_count(), 5);
    assert!(catalog.has_foreign_key("order_product", "order_id", "order", "id"));
    assert!(catalog.allows_function("round", 2));
    assert!(!catalog.allows_function("round", 3));
}

#[test]
fn test_join_path_through_link_table() {
    let checked = check(
        &parse_sql(
            "SELECT s.name, sum(op.quantity) FROM seller s \
             JOIN \"order\" o ON o.seller_id = s.id \
             JOIN order_product op ON op.order_id = o.id \
             GROUP BY s.name",
        )
        .unwrap(),
        &catalog(),
    )
    .unwrap();
    assert_eq!(checked.tables(), ["seller", "order", "order_product"]);
    assert_eq!(checked.catalog_version(), 1);
}

#[test]
fn test_join_must_use_declared_edge() {
    // Both columns exist, but customer.id -> order.seller_id is not an edge.
    assert_eq!(
        violation("SELECT c.name FROM customer c JOIN \"order\" o ON o.seller_id = c.id"),
        ViolationKind::JoinNotInSchemaGraph
    );
    // An edge between two earlier tables does not justify the new one.
    assert_eq!(
        violation(
            "SELECT c.name FROM customer c JOIN seller s ON c.seller_id = s.id \
             JOIN product p ON c.seller_id = s.id"
        ),
        ViolationKind::JoinNotInSchemaGraph
    );
}

#[test]
fn test_unquoted_order_table_does_not_parse() {
    assert!(parse_sql("SELECT id FROM order").is_err());
}

#[test]
fn test_snapshot_survives_reload() {
    let store = CatalogStore::new(catalog());
    let before = store.snapshot();

    let mut next = SchemaCatalogConfig::from_yaml(include_str!("../../../config/catalog.yaml")).unwrap();
    next.version = 2;
    next.tables.retain(|t| t.name != "product" && t.name != "order_product");
    next.foreign_keys.retain(|fk| fk.from_table != "order_product");
    store.publish(SchemaCatalog::from_config(&next).unwrap()).unwrap();

    let statement = parse_sql("SELECT name FROM product").unwrap();
    assert!(check(&statement, &before).is_ok());
    assert_eq!(
        check(&statement, &store.snapshot()).unwrap_err().kind,
        ViolationKind::TableNotAllowed
    );
}
