// ABOUTME: Dialect-aware SQL statement builder for schema and record statements
// ABOUTME: Quotes identifiers, numbers placeholders, and declares result columns per store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::fmt::Write as _;

use super::schema::{ColumnDef, ColumnType, EntitySchema, OnDelete, SortDirection};
use super::translator::{Convention, NativeRow, StoreValue};

/// SQL dialect of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Embedded store: snake_case plural tables, TEXT timestamps
    Sqlite,
    /// Networked store: PascalCase model tables, camelCase columns, TIMESTAMPTZ
    Postgres,
}

impl Dialect {
    /// Field naming convention
    #[must_use]
    pub const fn convention(self) -> Convention {
        match self {
            Self::Sqlite => Convention::SnakeCase,
            Self::Postgres => Convention::CamelCase,
        }
    }

    /// Table name for an entity
    #[must_use]
    pub const fn table_name(self, schema: &EntitySchema) -> &'static str {
        match self {
            Self::Sqlite => schema.table,
            Self::Postgres => schema.model,
        }
    }

    /// Store column name for a canonical field
    #[must_use]
    pub fn column_name(self, field: &str) -> String {
        self.convention().column_name(field)
    }

    /// Column SQL type
    #[must_use]
    pub const fn sql_type(self, ty: ColumnType) -> &'static str {
        match (self, ty) {
            (_, ColumnType::Text | ColumnType::Date | ColumnType::JsonList)
            | (Self::Sqlite, ColumnType::Timestamp) => "TEXT",
            (Self::Sqlite, ColumnType::Integer) => "INTEGER",
            (Self::Postgres, ColumnType::Integer) => "BIGINT",
            (Self::Sqlite, ColumnType::Real) => "REAL",
            (Self::Postgres, ColumnType::Real) => "DOUBLE PRECISION",
            (_, ColumnType::Boolean) => "BOOLEAN",
            (Self::Postgres, ColumnType::Timestamp) => "TIMESTAMPTZ",
        }
    }

    fn placeholder(self, index: usize) -> String {
        match self {
            Self::Sqlite => format!("?{index}"),
            Self::Postgres => format!("${index}"),
        }
    }
}

/// Quote an identifier
#[must_use]
pub fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// A statement ready to bind and run
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    /// SQL text with numbered placeholders
    pub sql: String,
    /// Parameters in placeholder order
    pub params: Vec<StoreValue>,
    /// Columns the statement yields, with their logical types
    pub columns: Vec<(String, ColumnType)>,
}

impl SqlStatement {
    fn new(sql: String, params: Vec<StoreValue>) -> Self {
        Self {
            sql,
            params,
            columns: Vec::new(),
        }
    }

    fn yielding(mut self, columns: Vec<(String, ColumnType)>) -> Self {
        self.columns = columns;
        self
    }
}

/// Behaviour of an insert that hits a unique key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Surface the constraint violation
    Fail,
    /// Leave the existing row untouched
    Ignore,
    /// Update the listed store columns of the existing row
    ///
    /// Only a row whose owner column equals the incoming row's is updated; a
    /// conflict with another owner's row changes nothing and returns no row.
    Merge {
        /// Store column names forming the unique key
        target: Vec<String>,
        /// Store column names to overwrite from the incoming row
        update: Vec<String>,
        /// Store column holding the owner
        owner: String,
    },
}

// ================================
// Schema statements
// ================================

fn column_definition(dialect: Dialect, column: &ColumnDef) -> String {
    let name = quote(&dialect.column_name(column.name));
    if column.name == "id" {
        return format!("{name} TEXT PRIMARY KEY");
    }

    let mut def = format!("{name} {}", dialect.sql_type(column.ty));
    let timestamp_column = column.system && column.ty == ColumnType::Timestamp;
    if column.required || column.system {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = column.default {
        let _ = write!(def, " DEFAULT {default}");
    } else if timestamp_column {
        def.push_str(" DEFAULT CURRENT_TIMESTAMP");
    }
    push_reference(dialect, column, &mut def);
    def
}

fn push_reference(dialect: Dialect, column: &ColumnDef, def: &mut String) {
    if let Some(fk) = column.references {
        let action = match fk.on_delete {
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
        };
        let _ = write!(
            def,
            " REFERENCES {}(\"id\") ON DELETE {action}",
            quote(dialect.table_name(fk.entity.schema()))
        );
    }
}

/// `CREATE TABLE IF NOT EXISTS` for an entity
#[must_use]
pub fn create_table(dialect: Dialect, schema: &EntitySchema) -> String {
    let columns: Vec<String> = schema
        .all_columns()
        .iter()
        .map(|column| column_definition(dialect, column))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote(dialect.table_name(schema)),
        columns.join(",\n    ")
    )
}

/// `CREATE [UNIQUE] INDEX IF NOT EXISTS` statements for an entity
#[must_use]
pub fn create_indexes(dialect: Dialect, schema: &EntitySchema) -> Vec<String> {
    let table = quote(dialect.table_name(schema));
    let mut statements = Vec::new();

    if !schema.unique.is_empty() {
        let columns: Vec<String> = schema
            .unique
            .iter()
            .map(|field| quote(&dialect.column_name(field)))
            .collect();
        statements.push(format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {table} ({})",
            quote(&format!("uq_{}_{}", schema.table, schema.unique.join("_"))),
            columns.join(", ")
        ));
    }

    let owner = schema.owner_field();
    if owner != "id" && schema.unique.first() != Some(&owner) {
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {table} ({})",
            quote(&format!("idx_{}_{owner}", schema.table)),
            quote(&dialect.column_name(owner))
        ));
    }

    statements
}

/// `ALTER TABLE .. ADD COLUMN` for a column missing from an existing table
///
/// The added column is nullable and only keeps constant defaults, since
/// existing rows must accept it.
#[must_use]
pub fn add_column(dialect: Dialect, schema: &EntitySchema, column: &ColumnDef) -> String {
    let mut def = format!(
        "{} {}",
        quote(&dialect.column_name(column.name)),
        dialect.sql_type(column.ty)
    );
    if let Some(default) = column.default {
        let _ = write!(def, " DEFAULT {default}");
    }
    push_reference(dialect, column, &mut def);
    format!(
        "ALTER TABLE {} ADD COLUMN {def}",
        quote(dialect.table_name(schema))
    )
}

// ================================
// Record statements
// ================================

/// Every column of an entity as the store names it
#[must_use]
pub fn result_columns(dialect: Dialect, schema: &EntitySchema) -> Vec<(String, ColumnType)> {
    schema
        .all_columns()
        .iter()
        .map(|column| (dialect.column_name(column.name), column.ty))
        .collect()
}

fn returning_clause(columns: &[(String, ColumnType)]) -> String {
    let names: Vec<String> = columns.iter().map(|(name, _)| quote(name)).collect();
    format!(" RETURNING {}", names.join(", "))
}

fn where_clause(dialect: Dialect, conditions: &NativeRow, params: &mut Vec<StoreValue>) -> String {
    if conditions.is_empty() {
        return String::new();
    }
    let predicates: Vec<String> = conditions
        .values()
        .iter()
        .map(|(column, value)| {
            if value.is_null() {
                format!("{} IS NULL", quote(column))
            } else {
                params.push(value.clone());
                format!("{} = {}", quote(column), dialect.placeholder(params.len()))
            }
        })
        .collect();
    format!(" WHERE {}", predicates.join(" AND "))
}

/// INSERT returning the stored row
#[must_use]
pub fn insert(
    dialect: Dialect,
    schema: &EntitySchema,
    row: &NativeRow,
    conflict: &Conflict,
) -> SqlStatement {
    let columns: Vec<String> = row.columns().map(quote).collect();
    let placeholders: Vec<String> = (1..=row.len()).map(|i| dialect.placeholder(i)).collect();
    let params: Vec<StoreValue> = row.values().iter().map(|(_, v)| v.clone()).collect();

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(dialect.table_name(schema)),
        columns.join(", "),
        placeholders.join(", ")
    );
    match conflict {
        Conflict::Fail => {}
        Conflict::Ignore => sql.push_str(" ON CONFLICT DO NOTHING"),
        Conflict::Merge {
            target,
            update,
            owner,
        } => {
            let target: Vec<String> = target.iter().map(|c| quote(c)).collect();
            let assignments: Vec<String> = update
                .iter()
                .map(|c| format!("{0} = excluded.{0}", quote(c)))
                .collect();
            let _ = write!(
                sql,
                " ON CONFLICT ({}) DO UPDATE SET {} WHERE {}.{owner} = excluded.{owner}",
                target.join(", "),
                assignments.join(", "),
                quote(dialect.table_name(schema)),
                owner = quote(owner)
            );
        }
    }

    let yielded = result_columns(dialect, schema);
    sql.push_str(&returning_clause(&yielded));
    SqlStatement::new(sql, params).yielding(yielded)
}

/// SELECT every column with equality conditions, ordering and paging
#[must_use]
pub fn select(
    dialect: Dialect,
    schema: &EntitySchema,
    conditions: &NativeRow,
    order: (&str, SortDirection),
    limit: Option<u32>,
    offset: Option<u32>,
) -> SqlStatement {
    let yielded = result_columns(dialect, schema);
    let names: Vec<String> = yielded.iter().map(|(name, _)| quote(name)).collect();
    let mut params = Vec::new();

    let mut sql = format!(
        "SELECT {} FROM {}",
        names.join(", "),
        quote(dialect.table_name(schema))
    );
    sql.push_str(&where_clause(dialect, conditions, &mut params));
    let _ = write!(
        sql,
        " ORDER BY {} {}",
        quote(&dialect.column_name(order.0)),
        order.1.as_sql()
    );
    // secondary sort keeps paging stable when the primary key ties
    if order.0 != "id" {
        sql.push_str(", \"id\" ASC");
    }

    match (limit, offset, dialect) {
        (Some(limit), _, _) => {
            let _ = write!(sql, " LIMIT {limit}");
        }
        (None, Some(_), Dialect::Sqlite) => sql.push_str(" LIMIT -1"),
        (None, _, _) => {}
    }
    if let Some(offset) = offset {
        let _ = write!(sql, " OFFSET {offset}");
    }

    SqlStatement::new(sql, params).yielding(yielded)
}

/// UPDATE matching rows, returning them
#[must_use]
pub fn update(
    dialect: Dialect,
    schema: &EntitySchema,
    changes: &NativeRow,
    conditions: &NativeRow,
) -> SqlStatement {
    let mut params: Vec<StoreValue> = Vec::with_capacity(changes.len() + conditions.len());
    let assignments: Vec<String> = changes
        .values()
        .iter()
        .map(|(column, value)| {
            params.push(value.clone());
            format!("{} = {}", quote(column), dialect.placeholder(params.len()))
        })
        .collect();

    let mut sql = format!(
        "UPDATE {} SET {}",
        quote(dialect.table_name(schema)),
        assignments.join(", ")
    );
    sql.push_str(&where_clause(dialect, conditions, &mut params));

    let yielded = result_columns(dialect, schema);
    sql.push_str(&returning_clause(&yielded));
    SqlStatement::new(sql, params).yielding(yielded)
}

/// DELETE matching rows
#[must_use]
pub fn delete(dialect: Dialect, schema: &EntitySchema, conditions: &NativeRow) -> SqlStatement {
    let mut params = Vec::new();
    let mut sql = format!("DELETE FROM {}", quote(dialect.table_name(schema)));
    sql.push_str(&where_clause(dialect, conditions, &mut params));
    SqlStatement::new(sql, params)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::schema::EntityKind;

    fn owner_row(dialect: Dialect) -> NativeRow {
        let mut row = NativeRow::new();
        row.push(
            dialect.column_name("user_id"),
            StoreValue::Text(Some("u1".to_owned())),
        );
        row
    }

    #[test]
    fn postgres_tables_follow_model_convention() {
        let ddl = create_table(Dialect::Postgres, EntityKind::Story.schema());
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"Story\""));
        assert!(ddl.contains("\"userId\" TEXT NOT NULL REFERENCES \"User\"(\"id\") ON DELETE CASCADE"));
        assert!(ddl.contains("\"journalEntryId\" TEXT REFERENCES \"JournalEntry\"(\"id\") ON DELETE SET NULL"));
        assert!(ddl.contains("\"createdAt\" TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP"));
    }

    #[test]
    fn sqlite_tables_use_snake_case() {
        let ddl = create_table(Dialect::Sqlite, EntityKind::WellnessEntry.schema());
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"wellness_entries\""));
        assert!(ddl.contains("\"supplements\" TEXT DEFAULT '[]'"));
        assert!(ddl.contains("\"created_at\" TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP"));

        let indexes = create_indexes(Dialect::Sqlite, EntityKind::WellnessEntry.schema());
        assert_eq!(indexes.len(), 1);
        assert!(indexes[0].contains("UNIQUE INDEX IF NOT EXISTS \"uq_wellness_entries_user_id_date\""));
    }

    #[test]
    fn added_columns_are_nullable() {
        let schema = EntityKind::PersonMessageUpload.schema();
        let column = schema.column("message_count").unwrap();
        let sql = add_column(Dialect::Sqlite, schema, &column);
        assert_eq!(
            sql,
            "ALTER TABLE \"person_message_uploads\" ADD COLUMN \"message_count\" INTEGER"
        );
    }

    #[test]
    fn merge_insert_updates_only_listed_columns() {
        let schema = EntityKind::WellnessEntry.schema();
        let mut row = owner_row(Dialect::Sqlite);
        row.push("date", StoreValue::Text(Some("2024-01-01".to_owned())));
        row.push("exercise_minutes", StoreValue::Integer(Some(45)));
        let conflict = Conflict::Merge {
            target: vec!["user_id".to_owned(), "date".to_owned()],
            update: vec!["exercise_minutes".to_owned(), "updated_at".to_owned()],
            owner: "user_id".to_owned(),
        };

        let stmt = insert(Dialect::Sqlite, schema, &row, &conflict);
        assert!(stmt.sql.contains("VALUES (?1, ?2, ?3)"));
        assert!(stmt.sql.contains(
            "ON CONFLICT (\"user_id\", \"date\") DO UPDATE SET \"exercise_minutes\" = excluded.\"exercise_minutes\""
        ));
        assert!(stmt.sql.contains(
            "WHERE \"wellness_entries\".\"user_id\" = excluded.\"user_id\" RETURNING"
        ));
        assert!(!stmt.sql.contains("\"created_at\" = excluded"));
        assert!(stmt.sql.contains(" RETURNING \"id\""));
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn select_scopes_and_pages() {
        let schema = EntityKind::JournalEntry.schema();
        let mut conditions = owner_row(Dialect::Postgres);
        conditions.push("mood", StoreValue::Text(None));

        let stmt = select(
            Dialect::Postgres,
            schema,
            &conditions,
            ("created_at", SortDirection::Desc),
            None,
            Some(20),
        );
        assert!(stmt.sql.contains("FROM \"JournalEntry\" WHERE \"userId\" = $1 AND \"mood\" IS NULL"));
        assert!(stmt.sql.ends_with("ORDER BY \"createdAt\" DESC, \"id\" ASC OFFSET 20"));
        assert_eq!(stmt.params.len(), 1);

        let sqlite = select(
            Dialect::Sqlite,
            schema,
            &owner_row(Dialect::Sqlite),
            ("created_at", SortDirection::Desc),
            None,
            Some(5),
        );
        assert!(sqlite.sql.ends_with("LIMIT -1 OFFSET 5"));
    }

    #[test]
    fn update_numbers_conditions_after_assignments() {
        let schema = EntityKind::Goal.schema();
        let mut changes = NativeRow::new();
        changes.push("progress", StoreValue::Integer(Some(50)));
        let mut conditions = owner_row(Dialect::Sqlite);
        conditions.push("id", StoreValue::Text(Some("g1".to_owned())));

        let stmt = update(Dialect::Sqlite, schema, &changes, &conditions);
        assert!(stmt
            .sql
            .starts_with("UPDATE \"goals\" SET \"progress\" = ?1 WHERE \"user_id\" = ?2 AND \"id\" = ?3"));
        assert_eq!(stmt.params.len(), 3);
    }
}
