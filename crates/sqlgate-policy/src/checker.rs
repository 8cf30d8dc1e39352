//! Allow-list policy checks over a parsed statement.
//!
//! The [`PolicyChecker`] walks a [`Statement`] against a [`SchemaCatalog`] and runs
//! six checks in a fixed order, stopping at the first violation:
//!
//! 1. **Tables** - every table in FROM and JOIN exists in the catalog
//! 2. **System references** - no identifier names a system schema or relation
//! 3. **Columns** - every column resolves to exactly one table in scope
//! 4. **Joins** - every JOIN follows a declared foreign key
//! 5. **Functions** - every call is allow-listed with a matching arity
//! 6. **Wildcards** - `*` and `q.*` expand to explicit catalog columns

use sqlgate_core::Position;
use sqlgate_sql::ast::{BinaryOp, ColumnRef, Expr, Ident, SelectItem, Statement, TableRef};
use sqlgate_sql::visit::{conjuncts, statement_exprs, strip_nested, walk_expr};

use crate::catalog::{Column, SchemaCatalog, Table};
use crate::error::{PolicyViolation, ViolationKind};
use crate::system::is_system_name;

/// A statement that passed every policy check, with wildcards expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedStatement {
    statement: Statement,
    catalog_version: u64,
    tables: Vec<String>,
}

impl CheckedStatement {
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn into_statement(self) -> Statement {
        self.statement
    }

    /// Version of the catalog the statement was checked against.
    pub fn catalog_version(&self) -> u64 {
        self.catalog_version
    }

    /// Catalog tables the statement reads, in FROM order.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }
}

/// Run every policy check on `statement`.
pub fn check(
    statement: &Statement,
    catalog: &SchemaCatalog,
) -> Result<CheckedStatement, PolicyViolation> {
    PolicyChecker::new(catalog).check(statement)
}

/// A table in scope under the name columns qualify it with.
#[derive(Debug, Clone, Copy)]
struct Binding<'a> {
    name: &'a Ident,
    table: &'a Table,
}

/// Checks statements against one catalog snapshot.
pub struct PolicyChecker<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> PolicyChecker<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Run the checks in order. Each check assumes the previous ones passed.
    pub fn check(&self, statement: &Statement) -> Result<CheckedStatement, PolicyViolation> {
        let table_refs = statement.table_refs();

        // 1. Table allow-list
        let tables = self.check_tables(&table_refs)?;

        // 2. System catalog references
        self.check_system_references(statement, &table_refs)?;

        // 3. Column allow-list
        let scope = self.build_scope(&table_refs, &tables)?;
        let group_by = self.check_columns(statement, &scope)?;

        // 4. Join graph
        self.check_joins(statement, &scope)?;

        // 5. Function allow-list
        self.check_functions(statement)?;

        // 6. Wildcard expansion
        let mut expanded = self.expand_wildcards(statement, &scope)?;
        expanded.group_by = group_by;

        let tables: Vec<String> = tables.iter().map(|t| t.name.clone()).collect();
        tracing::debug!(
            catalog_version = self.catalog.version(),
            tables = ?tables,
            "Statement passed policy checks"
        );

        Ok(CheckedStatement {
            statement: expanded,
            catalog_version: self.catalog.version(),
            tables,
        })
    }

    // =========================================================================
    // 1. TABLES
    // =========================================================================

    fn check_tables(&self, table_refs: &[&TableRef]) -> Result<Vec<&'a Table>, PolicyViolation> {
        let mut tables = Vec::with_capacity(table_refs.len());
        for table_ref in table_refs {
            if let Some(schema) = &table_ref.schema {
                if is_system_name(&schema.value) {
                    return Err(PolicyViolation::catalog_reference(
                        &schema.value,
                        schema.position,
                    ));
                }
            }
            let name = &table_ref.name;
            if is_system_name(&name.value) {
                return Err(PolicyViolation::catalog_reference(&name.value, name.position));
            }
            if let Some(schema) = &table_ref.schema {
                return Err(PolicyViolation::schema_qualified_table(
                    &schema.value,
                    &name.value,
                    schema.position,
                ));
            }
            let table = self
                .catalog
                .table(&name.value)
                .ok_or_else(|| PolicyViolation::table_not_allowed(&name.value, name.position))?;
            tables.push(table);
        }
        Ok(tables)
    }

    // =========================================================================
    // 2. SYSTEM REFERENCES
    // =========================================================================

    fn check_system_references(
        &self,
        statement: &Statement,
        table_refs: &[&TableRef],
    ) -> Result<(), PolicyViolation> {
        let reject_system = |ident: &Ident| {
            if is_system_name(&ident.value) {
                Err(PolicyViolation::catalog_reference(
                    &ident.value,
                    ident.position,
                ))
            } else {
                Ok(())
            }
        };

        for table_ref in table_refs {
            if let Some(alias) = &table_ref.alias {
                reject_system(alias)?;
            }
        }

        for item in &statement.projection {
            match item {
                SelectItem::Wildcard(_) => {}
                SelectItem::QualifiedWildcard(qualifier) => reject_system(qualifier)?,
                SelectItem::Expr { alias, .. } => {
                    if let Some(alias) = alias {
                        reject_system(alias)?;
                    }
                }
            }
        }

        for expr in statement_exprs(statement) {
            walk_expr(expr, &mut |e| match e {
                Expr::Column(column) => {
                    if let Some(qualifier) = &column.qualifier {
                        reject_system(qualifier)?;
                    }
                    reject_system(&column.name)
                }
                Expr::Function(call) => {
                    if let Some(qualifier) = &call.qualifier {
                        reject_system(qualifier)?;
                    }
                    reject_system(&call.name)
                }
                _ => Ok(()),
            })?;
        }
        Ok(())
    }

    // =========================================================================
    // 3. COLUMNS
    // =========================================================================

    /// Bindings in FROM order. A name bound twice is ambiguous.
    fn build_scope<'s>(
        &self,
        table_refs: &[&'s TableRef],
        tables: &[&'a Table],
    ) -> Result<Vec<Binding<'s>>, PolicyViolation>
    where
        'a: 's,
    {
        let mut scope: Vec<Binding<'s>> = Vec::with_capacity(table_refs.len());
        for (table_ref, &table) in table_refs.iter().zip(tables) {
            let name = table_ref.binding();
            if scope.iter().any(|b| b.name.value == name.value) {
                return Err(PolicyViolation::duplicate_binding(&name.value, name.position));
            }
            scope.push(Binding { name, table });
        }
        Ok(scope)
    }

    /// Returns the GROUP BY list with alias references replaced by the aliased
    /// expressions.
    fn check_columns(
        &self,
        statement: &Statement,
        scope: &[Binding],
    ) -> Result<Vec<Expr>, PolicyViolation> {
        for item in &statement.projection {
            if let SelectItem::Expr { expr, .. } = item {
                self.check_expr_columns(expr, scope)?;
            }
        }

        // A join condition only sees the tables joined so far.
        if let Some(from) = &statement.from {
            for (i, join) in from.joins.iter().enumerate() {
                self.check_expr_columns(&join.on, &scope[..i + 2])?;
            }
        }

        if let Some(selection) = &statement.selection {
            self.check_expr_columns(selection, scope)?;
        }

        let aliases: Vec<&str> = statement
            .projection
            .iter()
            .filter_map(|item| match item {
                SelectItem::Expr {
                    alias: Some(alias), ..
                } => Some(alias.value.as_str()),
                _ => None,
            })
            .collect();

        let group_by = statement
            .group_by
            .iter()
            .map(|expr| self.resolve_group_by_item(expr, &statement.projection, scope))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(having) = &statement.having {
            self.check_expr_columns(having, scope)?;
        }

        // ORDER BY names resolve to output columns first, so an alias wins.
        for item in &statement.order_by {
            if !is_alias_reference(&item.expr, &aliases) {
                self.check_expr_columns(&item.expr, scope)?;
            }
        }

        Ok(group_by)
    }

    /// GROUP BY names resolve to FROM columns first, and only fall back to a
    /// select-list alias when no table in scope has the column. The alias is then
    /// replaced by its expression, so the executed text never names a column the
    /// catalog does not list.
    fn resolve_group_by_item(
        &self,
        expr: &Expr,
        projection: &[SelectItem],
        scope: &[Binding],
    ) -> Result<Expr, PolicyViolation> {
        let Expr::Column(column) = expr else {
            self.check_expr_columns(expr, scope)?;
            return Ok(expr.clone());
        };
        let violation = match resolve_column(column, scope) {
            Ok(_) => return Ok(expr.clone()),
            Err(violation) => violation,
        };
        if column.qualifier.is_some() || violation.kind != ViolationKind::ColumnNotAllowed {
            return Err(violation);
        }

        let name = &column.name;
        let mut aliased = projection.iter().filter_map(|item| match item {
            SelectItem::Expr {
                expr,
                alias: Some(alias),
            } if alias.value == name.value => Some(expr),
            _ => None,
        });
        match (aliased.next(), aliased.next()) {
            (Some(target), None) => Ok(target.clone()),
            (Some(_), Some(_)) => Err(PolicyViolation::ambiguous_alias(&name.value, name.position)),
            (None, _) => Err(violation),
        }
    }

    fn check_expr_columns(&self, expr: &Expr, scope: &[Binding]) -> Result<(), PolicyViolation> {
        walk_expr(expr, &mut |e| match e {
            Expr::Column(column) => resolve_column(column, scope).map(|_| ()),
            _ => Ok(()),
        })
    }

    // =========================================================================
    // 4. JOINS
    // =========================================================================

    fn check_joins(&self, statement: &Statement, scope: &[Binding]) -> Result<(), PolicyViolation> {
        let Some(from) = &statement.from else {
            return Ok(());
        };
        for (i, join) in from.joins.iter().enumerate() {
            let joined = i + 1;
            let visible = &scope[..=joined];
            let witnessed = conjuncts(&join.on)
                .into_iter()
                .any(|conjunct| self.is_foreign_key_equality(conjunct, visible, joined));
            if !witnessed {
                return Err(PolicyViolation::join_not_in_graph(
                    &join.table.name.value,
                    join.position,
                ));
            }
        }
        Ok(())
    }

    /// True if `expr` is `a.x = b.y` where one side belongs to the newly joined
    /// table, the other to an earlier one, and a declared edge links the two columns.
    fn is_foreign_key_equality(&self, expr: &Expr, scope: &[Binding], joined: usize) -> bool {
        let Expr::Binary {
            left,
            op: BinaryOp::Eq,
            right,
        } = strip_nested(expr)
        else {
            return false;
        };
        let (Expr::Column(left), Expr::Column(right)) = (strip_nested(left), strip_nested(right))
        else {
            return false;
        };
        let (Ok((li, left_column)), Ok((ri, right_column))) =
            (resolve_column(left, scope), resolve_column(right, scope))
        else {
            return false;
        };

        let spans_join = (li == joined && ri < joined) || (ri == joined && li < joined);
        spans_join
            && self.catalog.has_foreign_key(
                &scope[li].table.name,
                &left_column.name,
                &scope[ri].table.name,
                &right_column.name,
            )
    }

    // =========================================================================
    // 5. FUNCTIONS
    // =========================================================================

    fn check_functions(&self, statement: &Statement) -> Result<(), PolicyViolation> {
        for expr in statement_exprs(statement) {
            walk_expr(expr, &mut |e| {
                let Expr::Function(call) = e else {
                    return Ok(());
                };
                if let Some(qualifier) = &call.qualifier {
                    return Err(PolicyViolation::disallowed_function(
                        &format!("{}.{}", qualifier.value, call.name.value),
                        qualifier.position,
                    ));
                }
                let name = &call.name;
                let arity = call.args.arity();
                match self.catalog.function_arities(&name.value) {
                    None => Err(PolicyViolation::disallowed_function(
                        &name.value,
                        name.position,
                    )),
                    Some(arities) if !arities.contains(&arity) => {
                        let allowed: Vec<usize> = arities.iter().copied().collect();
                        Err(PolicyViolation::function_arity(
                            &name.value,
                            arity,
                            &allowed,
                            name.position,
                        ))
                    }
                    Some(_) => Ok(()),
                }
            })?;
        }
        Ok(())
    }

    // =========================================================================
    // 6. WILDCARDS
    // =========================================================================

    fn expand_wildcards(
        &self,
        statement: &Statement,
        scope: &[Binding],
    ) -> Result<Statement, PolicyViolation> {
        let qualify = scope.len() > 1;
        let mut projection = Vec::with_capacity(statement.projection.len());
        for item in &statement.projection {
            match item {
                SelectItem::Wildcard(position) => {
                    if scope.is_empty() {
                        return Err(PolicyViolation::wildcard_without_tables(*position));
                    }
                    for binding in scope {
                        projection.extend(expand_binding(binding, qualify, *position));
                    }
                }
                SelectItem::QualifiedWildcard(qualifier) => {
                    let binding = scope
                        .iter()
                        .find(|b| b.name.value == qualifier.value)
                        .ok_or_else(|| {
                            PolicyViolation::unknown_qualifier(&qualifier.value, qualifier.position)
                        })?;
                    projection.extend(expand_binding(binding, qualify, qualifier.position));
                }
                SelectItem::Expr { .. } => projection.push(item.clone()),
            }
        }

        Ok(Statement {
            projection,
            ..statement.clone()
        })
    }
}

/// Resolve a column reference to its binding index and catalog column.
fn resolve_column<'b>(
    column: &ColumnRef,
    scope: &[Binding<'b>],
) -> Result<(usize, &'b Column), PolicyViolation> {
    let name = &column.name;
    if let Some(qualifier) = &column.qualifier {
        let (index, binding) = scope
            .iter()
            .enumerate()
            .find(|(_, b)| b.name.value == qualifier.value)
            .ok_or_else(|| PolicyViolation::unknown_qualifier(&qualifier.value, qualifier.position))?;
        let found = binding.table.column(&name.value).ok_or_else(|| {
            PolicyViolation::column_not_in_table(&binding.table.name, &name.value, name.position)
        })?;
        return Ok((index, found));
    }

    let mut matches = scope
        .iter()
        .enumerate()
        .filter_map(|(i, b)| b.table.column(&name.value).map(|c| (i, b, c)));
    let Some((index, _, found)) = matches.next() else {
        return Err(PolicyViolation::column_not_allowed(&name.value, name.position));
    };
    let others: Vec<&str> = matches.map(|(_, b, _)| b.name.value.as_str()).collect();
    if !others.is_empty() {
        let mut tables = vec![scope[index].name.value.as_str()];
        tables.extend(others);
        return Err(PolicyViolation::ambiguous_column(
            &name.value,
            &tables,
            column.position(),
        ));
    }
    Ok((index, found))
}

/// A bare name that matches a select-list alias.
fn is_alias_reference(expr: &Expr, aliases: &[&str]) -> bool {
    matches!(
        expr,
        Expr::Column(ColumnRef { qualifier: None, name }) if aliases.contains(&name.value.as_str())
    )
}

fn expand_binding(binding: &Binding, qualify: bool, position: Position) -> Vec<SelectItem> {
    binding
        .table
        .columns
        .iter()
        .map(|column| {
            let qualifier = qualify.then(|| Ident {
                value: binding.name.value.clone(),
                quoted: binding.name.quoted,
                position,
            });
            SelectItem::Expr {
                expr: Expr::Column(ColumnRef {
                    qualifier,
                    name: Ident::new(column.name.clone(), position),
                }),
                alias: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationKind;
    use pretty_assertions::assert_eq;
    use sqlgate_core::SchemaCatalogConfig;
    use sqlgate_sql::parse_sql;

    fn catalog() -> SchemaCatalog {
        let config = SchemaCatalogConfig {
            version: 4,
            ..Default::default()
        }
        .with_table("seller", &[("id", "integer"), ("name", "text")])
        .with_table(
            "customer",
            &[("id", "integer"), ("name", "text"), ("seller_id", "integer")],
        )
        .with_table("product", &[("id", "integer"), ("name", "text"), ("price", "numeric")])
        .with_foreign_key("customer", "seller_id", "seller", "id")
        .with_function("count", 1)
        .with_function("lower", 1);
        SchemaCatalog::from_config(&config).unwrap()
    }

    fn check_sql(sql: &str) -> Result<CheckedStatement, PolicyViolation> {
        check(&parse_sql(sql).unwrap(), &catalog())
    }

    fn violation(sql: &str) -> ViolationKind {
        check_sql(sql).unwrap_err().kind
    }

    #[test]
    fn test_accepts_simple_select() {
        let checked = check_sql("SELECT id, name FROM seller ORDER BY name").unwrap();
        assert_eq!(checked.catalog_version(), 4);
        assert_eq!(checked.tables(), &["seller".to_string()]);
    }

    #[test]
    fn test_unknown_table() {
        let err = check_sql("SELECT id FROM vendor").unwrap_err();
        assert_eq!(err.kind, ViolationKind::TableNotAllowed);
        assert_eq!(err.position, Position::new(1, 16));
        assert_eq!(violation("SELECT id FROM public.seller"), ViolationKind::TableNotAllowed);
        assert_eq!(
            violation("SELECT c.id FROM customer c JOIN vendor v ON v.id = c.id"),
            ViolationKind::TableNotAllowed
        );
    }

    #[test]
    fn test_system_references() {
        for sql in [
            "SELECT * FROM pg_catalog.pg_tables",
            "SELECT * FROM information_schema.tables",
            "SELECT * FROM pg_user",
            "SELECT * FROM sqlite_master",
            "SELECT pg_sleep(10) FROM seller",
            "SELECT id FROM seller WHERE pg_catalog.lower(name) = 'x'",
            "SELECT id AS pg_x FROM seller",
            "SELECT pg_tables.id FROM seller",
            "SELECT id FROM seller AS pg_alias",
        ] {
            assert_eq!(violation(sql), ViolationKind::CatalogReference, "{}", sql);
        }
    }

    #[test]
    fn test_columns() {
        assert_eq!(
            violation("SELECT password FROM seller"),
            ViolationKind::ColumnNotAllowed
        );
        assert_eq!(
            violation("SELECT x.id FROM seller"),
            ViolationKind::ColumnNotAllowed
        );
        assert_eq!(violation("SELECT id"), ViolationKind::ColumnNotAllowed);
        assert_eq!(
            violation("SELECT name FROM customer c JOIN seller s ON c.seller_id = s.id"),
            ViolationKind::AmbiguousColumn
        );
        assert_eq!(
            violation("SELECT s.id FROM seller s JOIN customer s ON s.seller_id = s.id"),
            ViolationKind::AmbiguousColumn
        );
    }

    #[test]
    fn test_join_condition_only_sees_joined_tables() {
        // product is joined after the ON clause that references it.
        assert_eq!(
            violation(
                "SELECT c.id FROM customer c JOIN seller s ON s.id = p.id JOIN product p ON p.id = c.id"
            ),
            ViolationKind::ColumnNotAllowed
        );
    }

    #[test]
    fn test_aliases_in_order_and_group_by() {
        assert!(check_sql("SELECT lower(name) AS n FROM seller ORDER BY n").is_ok());
        let checked = check_sql("SELECT name AS n, count(id) AS c FROM seller GROUP BY n").unwrap();
        assert_eq!(
            checked.statement().to_string(),
            "SELECT name AS n, count(id) AS c FROM seller GROUP BY name"
        );
        assert_eq!(
            violation("SELECT lower(name) AS n FROM seller WHERE n = 'x'"),
            ViolationKind::ColumnNotAllowed
        );
    }

    #[test]
    fn test_group_by_prefers_table_columns_over_aliases() {
        // `password` is not a catalog column, so the alias expression is grouped on.
        let checked =
            check_sql("SELECT count(*) AS password FROM seller GROUP BY password").unwrap();
        assert_eq!(
            checked.statement().to_string(),
            "SELECT count(*) AS password FROM seller GROUP BY count(*)"
        );

        // A real column shadows an alias of the same name.
        let checked = check_sql("SELECT lower(name) AS name FROM seller GROUP BY name").unwrap();
        assert_eq!(
            checked.statement().to_string(),
            "SELECT lower(name) AS name FROM seller GROUP BY name"
        );

        assert_eq!(
            violation("SELECT id AS x, name AS x FROM seller GROUP BY x"),
            ViolationKind::AmbiguousColumn
        );
        assert_eq!(
            violation("SELECT id AS n FROM seller GROUP BY s.n"),
            ViolationKind::ColumnNotAllowed
        );
        assert_eq!(
            violation("SELECT id AS n FROM seller GROUP BY n + 1"),
            ViolationKind::ColumnNotAllowed
        );
    }

    #[test]
    fn test_join_graph() {
        assert!(
            check_sql("SELECT s.name, c.name FROM seller s JOIN customer c ON c.seller_id = s.id")
                .is_ok()
        );
        assert!(
            check_sql(
                "SELECT s.name FROM customer c LEFT JOIN seller s ON (s.id = c.seller_id) AND s.name <> ''"
            )
            .is_ok()
        );
        assert_eq!(
            violation("SELECT s.name FROM seller s JOIN product p ON p.id = s.id"),
            ViolationKind::JoinNotInSchemaGraph
        );
        assert_eq!(
            violation("SELECT s.name FROM seller s JOIN customer c ON c.seller_id = s.id OR 1 = 1"),
            ViolationKind::JoinNotInSchemaGraph
        );
        assert_eq!(
            violation("SELECT s.name FROM seller s JOIN customer c ON c.seller_id > s.id"),
            ViolationKind::JoinNotInSchemaGraph
        );
    }

    #[test]
    fn test_functions() {
        assert!(check_sql("SELECT count(*) FROM seller").is_ok());
        assert_eq!(
            violation("SELECT upper(name) FROM seller"),
            ViolationKind::DisallowedFunction
        );
        assert_eq!(
            violation("SELECT lower(name, id) FROM seller"),
            ViolationKind::DisallowedFunction
        );
        assert_eq!(
            violation("SELECT public.lower(name) FROM seller"),
            ViolationKind::DisallowedFunction
        );
    }

    #[test]
    fn test_wildcards_expand_to_catalog_columns() {
        let checked = check_sql("SELECT * FROM seller").unwrap();
        assert_eq!(checked.statement().to_string(), "SELECT id, name FROM seller");

        let checked =
            check_sql("SELECT s.*, c.id FROM seller s JOIN customer c ON c.seller_id = s.id")
                .unwrap();
        assert_eq!(
            checked.statement().to_string(),
            "SELECT s.id, s.name, c.id FROM seller AS s JOIN customer AS c ON c.seller_id = s.id"
        );

        assert_eq!(violation("SELECT *"), ViolationKind::ColumnNotAllowed);
        assert_eq!(
            violation("SELECT x.* FROM seller"),
            ViolationKind::ColumnNotAllowed
        );
    }

    #[test]
    fn test_checks_run_in_order() {
        // Unknown table wins over an unknown column.
        assert_eq!(
            violation("SELECT nope FROM vendor"),
            ViolationKind::TableNotAllowed
        );
        // A system reference wins over a bad column.
        assert_eq!(
            violation("SELECT nope, pg_backend_pid() FROM seller"),
            ViolationKind::CatalogReference
        );
        // Columns are checked before the join graph.
        assert_eq!(
            violation("SELECT nope FROM seller s JOIN product p ON p.id = s.id"),
            ViolationKind::ColumnNotAllowed
        );
        // The join graph is checked before functions.
        assert_eq!(
            violation("SELECT upper(s.name) FROM seller s JOIN product p ON p.id = s.id"),
            ViolationKind::JoinNotInSchemaGraph
        );
    }
}
