use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use tracing::info;

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

/// Offset added to every schema version stored in `PRAGMA user_version`, so that
/// a database created by some other tool (user_version = 0) is never mistaken
/// for one of ours.
pub const BASE_DB_VERSION: usize = 99999;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Only mutated when optional field assignments are passed in
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                is_unique: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Blob,
}

impl SqlType {
    fn keyword(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Blob => "BLOB",
        }
    }

    fn from_keyword(keyword: &str) -> Option<&'static SqlType> {
        match keyword {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            "BLOB" => Some(&SqlType::Blob),
            _ => None,
        }
    }
}

#[allow(unused)]
pub enum ForeignKeyOnChange {
    NoAction,
    Restrict,
    SetNull,
    SetDefault,
    Cascade,
}

impl ForeignKeyOnChange {
    fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyOnChange::NoAction => "NO ACTION",
            ForeignKeyOnChange::Restrict => "RESTRICT",
            ForeignKeyOnChange::SetNull => "SET NULL",
            ForeignKeyOnChange::SetDefault => "SET DEFAULT",
            ForeignKeyOnChange::Cascade => "CASCADE",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub on_delete: ForeignKeyOnChange,
}

pub struct Column<'a, S: AsRef<str>> {
    pub name: S,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<S>,
    pub foreign_key: Option<&'a ForeignKey>,
}

impl Column<'_, &'static str> {
    fn definition(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type.keyword());
        if self.is_primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.non_null {
            sql.push_str(" NOT NULL");
        }
        if self.is_unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default_value) = self.default_value {
            sql.push_str(&format!(" DEFAULT {}", default_value));
        }
        if let Some(fk) = self.foreign_key {
            sql.push_str(&format!(
                " REFERENCES {}({}) ON DELETE {}",
                fk.foreign_table,
                fk.foreign_column,
                fk.on_delete.as_sql()
            ));
        }
        sql
    }
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static, &'static str>],
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
    /// Raw `CHECK` expressions appended to the table definition.
    pub checks: &'static [&'static str],
}

impl Table {
    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(|c| c.definition()).collect();
        for unique in self.unique_constraints {
            parts.push(format!("UNIQUE ({})", unique.join(", ")));
        }
        for check in self.checks {
            parts.push(format!("CHECK ({})", check));
        }
        format!("CREATE TABLE {} ({});", self.name, parts.join(", "))
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&self.create_sql(), params![])
            .with_context(|| format!("Failed to create table {}", self.name))?;
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        self.validate_columns(conn)?;
        self.validate_indices(conn)?;
        self.validate_unique_constraints(conn)?;
        self.validate_foreign_keys(conn)
    }

    fn validate_columns(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual: Vec<Column<'static, String>> = stmt
            .query_map(params![], |row| {
                let declared: String = row.get(2)?;
                Ok((
                    row.get::<_, String>(1)?,
                    declared,
                    row.get::<_, i32>(3)? == 1,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i32>(5)? == 1,
                ))
            })?
            .map(|r| -> Result<Column<'static, String>> {
                let (name, declared, non_null, default_value, is_primary_key) = r?;
                let sql_type = SqlType::from_keyword(&declared).ok_or_else(|| {
                    anyhow::anyhow!(
                        "Table {} column {} has unsupported type {}",
                        self.name,
                        name,
                        declared
                    )
                })?;
                Ok(Column {
                    name,
                    sql_type,
                    is_primary_key,
                    non_null,
                    is_unique: false,
                    default_value,
                    foreign_key: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if actual.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found: [{}], expected: [{}]",
                self.name,
                actual.len(),
                self.columns.len(),
                actual
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                self.columns
                    .iter()
                    .map(|c| c.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for (actual, expected) in actual.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if actual.sql_type != expected.sql_type {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            // sqlite reports defaults with or without the outer parentheses
            let actual_default = actual.default_value.as_deref().map(unwrap_parentheses);
            let expected_default = expected.default_value.map(unwrap_parentheses);
            if actual_default != expected_default {
                bail!(
                    "Table {} column {} default value mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.default_value,
                    actual.default_value
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key,
                    actual.is_primary_key
                );
            }
        }
        Ok(())
    }

    fn validate_indices(&self, conn: &Connection) -> Result<()> {
        for (index_name, _) in self.indices {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(()),
                )
                .is_ok();
            if !exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }
        Ok(())
    }

    fn validate_unique_constraints(&self, conn: &Connection) -> Result<()> {
        if self.unique_constraints.is_empty() {
            return Ok(());
        }

        let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", self.name))?;
        let unique_indices: Vec<String> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i32>(2)?)))?
            .filter_map(|r| r.ok())
            .filter(|(_, unique)| *unique == 1)
            .map(|(name, _)| name)
            .collect();

        let mut covered: Vec<Vec<String>> = Vec::with_capacity(unique_indices.len());
        for index_name in &unique_indices {
            let mut idx_stmt = conn.prepare(&format!("PRAGMA index_info({})", index_name))?;
            let mut cols: Vec<String> = idx_stmt
                .query_map([], |row| row.get::<_, String>(2))?
                .filter_map(|r| r.ok())
                .collect();
            cols.sort();
            covered.push(cols);
        }

        for expected in self.unique_constraints {
            let mut wanted: Vec<&str> = expected.to_vec();
            wanted.sort();
            let found = covered
                .iter()
                .any(|cols| cols.iter().map(String::as_str).eq(wanted.iter().copied()));
            if !found {
                bail!(
                    "Table {} is missing unique constraint on columns ({})",
                    self.name,
                    expected.join(", ")
                );
            }
        }
        Ok(())
    }

    fn validate_foreign_keys(&self, conn: &Connection) -> Result<()> {
        // foreign_key_list columns: id, seq, table, from, to, on_update, on_delete, match
        let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list({})", self.name))?;
        let actual: Vec<(String, String, String, String)> = stmt
            .query_map([], |row| Ok((row.get(3)?, row.get(2)?, row.get(4)?, row.get(6)?)))?
            .filter_map(|r| r.ok())
            .collect();

        for column in self.columns {
            let Some(fk) = column.foreign_key else {
                continue;
            };
            let on_delete = fk.on_delete.as_sql();
            let matches = actual.iter().any(|(from, table, to, action)| {
                from == column.name
                    && table == fk.foreign_table
                    && to == fk.foreign_column
                    && action == on_delete
            });
            if matches {
                continue;
            }
            match actual.iter().find(|(from, ..)| from == column.name) {
                Some((_, table, to, action)) => bail!(
                    "Table {} column {} has foreign key mismatch: expected REFERENCES {}({}) ON DELETE {}, got REFERENCES {}({}) ON DELETE {}",
                    self.name,
                    column.name,
                    fk.foreign_table,
                    fk.foreign_column,
                    on_delete,
                    table,
                    to,
                    action
                ),
                None => bail!(
                    "Table {} column {} is missing foreign key: expected REFERENCES {}({}) ON DELETE {}",
                    self.name,
                    column.name,
                    fk.foreign_table,
                    fk.foreign_column,
                    on_delete
                ),
            }
        }
        Ok(())
    }
}

fn unwrap_parentheses(s: &str) -> &str {
    s.strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(s)
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.pragma_update(None, "user_version", BASE_DB_VERSION + self.version)?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

/// Brings `conn` to the latest of `schemas`: creates it on an empty database,
/// runs pending migrations on an older one, then validates the result.
///
/// Returns the schema version the database ends up at.
pub fn ensure_schema(
    conn: &mut Connection,
    schemas: &'static [VersionedSchema],
    label: &str,
) -> Result<usize> {
    let Some(latest) = schemas.last() else {
        bail!("No schema versions defined for {} db", label);
    };

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;
    if table_count == 0 {
        info!("Creating {} db schema at version {}", label, latest.version);
        latest.create(conn)?;
        return Ok(latest.version);
    }

    let stored: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if stored < BASE_DB_VERSION as i64 {
        bail!(
            "{} db has user_version {}, which was not written by this application",
            label,
            stored
        );
    }
    let mut current = (stored - BASE_DB_VERSION as i64) as usize;
    if current > latest.version {
        bail!(
            "{} db is at version {}, newer than the latest known version {}",
            label,
            current,
            latest.version
        );
    }

    if current < latest.version {
        let from = current;
        let tx = conn.transaction()?;
        for schema in schemas.iter().filter(|s| s.version > from) {
            if let Some(migration) = schema.migration {
                info!(
                    "Migrating {} db from version {} to {}",
                    label, current, schema.version
                );
                migration(&tx)?;
            }
            current = schema.version;
        }
        tx.pragma_update(None, "user_version", BASE_DB_VERSION + current)?;
        tx.commit()?;
    }

    latest
        .validate(conn)
        .with_context(|| format!("{} db schema validation failed", label))?;
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARENT_TABLE: Table = Table {
        name: "parent",
        columns: &[
            sqlite_column!("id", &SqlType::Text, is_primary_key = true),
            sqlite_column!("label", &SqlType::Text, non_null = true),
        ],
        indices: &[("idx_parent_label", "label")],
        unique_constraints: &[],
        checks: &[],
    };

    const CHILD_FK: ForeignKey = ForeignKey {
        foreign_table: "parent",
        foreign_column: "id",
        on_delete: ForeignKeyOnChange::Cascade,
    };

    const CHILD_TABLE: Table = Table {
        name: "child",
        columns: &[
            sqlite_column!(
                "parent_id",
                &SqlType::Text,
                non_null = true,
                foreign_key = Some(&CHILD_FK)
            ),
            sqlite_column!("left_key", &SqlType::Text),
            sqlite_column!("right_key", &SqlType::Text),
            sqlite_column!(
                "created_at",
                &SqlType::Integer,
                non_null = true,
                default_value = Some(DEFAULT_TIMESTAMP)
            ),
        ],
        indices: &[],
        unique_constraints: &[&["parent_id", "left_key"]],
        checks: &["(left_key IS NULL) <> (right_key IS NULL)"],
    };

    const SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
        version: 0,
        tables: &[PARENT_TABLE, CHILD_TABLE],
        migration: None,
    }];

    #[test]
    fn test_create_then_validate() {
        let conn = Connection::open_in_memory().unwrap();
        SCHEMAS[0].create(&conn).unwrap();
        SCHEMAS[0].validate(&conn).unwrap();

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, BASE_DB_VERSION as i64);
    }

    #[test]
    fn test_check_constraint_is_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        SCHEMAS[0].create(&conn).unwrap();
        conn.execute("INSERT INTO parent (id, label) VALUES ('p', 'x')", [])
            .unwrap();

        let both = conn.execute(
            "INSERT INTO child (parent_id, left_key, right_key) VALUES ('p', 'a', 'b')",
            [],
        );
        assert!(both.is_err());

        let neither = conn.execute("INSERT INTO child (parent_id) VALUES ('p')", []);
        assert!(neither.is_err());

        conn.execute(
            "INSERT INTO child (parent_id, left_key) VALUES ('p', 'a')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_validate_detects_missing_index() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE parent (id TEXT PRIMARY KEY, label TEXT NOT NULL)",
            [],
        )
        .unwrap();

        let err = PARENT_TABLE.validate(&conn).unwrap_err().to_string();
        assert!(err.contains("missing index"));
        assert!(err.contains("idx_parent_label"));
    }

    #[test]
    fn test_validate_detects_column_count_mismatch() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE parent (id TEXT PRIMARY KEY)", [])
            .unwrap();

        let err = PARENT_TABLE.validate(&conn).unwrap_err().to_string();
        assert!(err.contains("has 1 columns, expected 2"));
    }

    #[test]
    fn test_validate_detects_missing_foreign_key() {
        let conn = Connection::open_in_memory().unwrap();
        PARENT_TABLE.create(&conn).unwrap();
        conn.execute(
            &format!(
                "CREATE TABLE child (parent_id TEXT NOT NULL, left_key TEXT, right_key TEXT, created_at INTEGER NOT NULL DEFAULT {}, UNIQUE (parent_id, left_key))",
                DEFAULT_TIMESTAMP
            ),
            [],
        )
        .unwrap();

        let err = CHILD_TABLE.validate(&conn).unwrap_err().to_string();
        assert!(err.contains("missing foreign key"));
    }

    #[test]
    fn test_ensure_schema_creates_then_reopens() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test.db");

        let mut conn = Connection::open(&path).unwrap();
        assert_eq!(ensure_schema(&mut conn, SCHEMAS, "test").unwrap(), 0);
        drop(conn);

        let mut conn = Connection::open(&path).unwrap();
        assert_eq!(ensure_schema(&mut conn, SCHEMAS, "test").unwrap(), 0);
    }

    const PARENT_TABLE_V1: Table = Table {
        name: "parent",
        columns: &[
            sqlite_column!("id", &SqlType::Text, is_primary_key = true),
            sqlite_column!("label", &SqlType::Text, non_null = true),
            sqlite_column!("note", &SqlType::Text),
        ],
        indices: &[("idx_parent_label", "label")],
        unique_constraints: &[],
        checks: &[],
    };

    fn add_parent_note(conn: &Connection) -> Result<()> {
        conn.execute("ALTER TABLE parent ADD COLUMN note TEXT", [])?;
        conn.execute("UPDATE parent SET note = 'migrated'", [])?;
        Ok(())
    }

    const MIGRATED_SCHEMAS: &[VersionedSchema] = &[
        VersionedSchema {
            version: 0,
            tables: &[PARENT_TABLE, CHILD_TABLE],
            migration: None,
        },
        VersionedSchema {
            version: 1,
            tables: &[PARENT_TABLE_V1, CHILD_TABLE],
            migration: Some(add_parent_note),
        },
    ];

    #[test]
    fn test_ensure_schema_runs_pending_migrations() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test.db");

        let mut conn = Connection::open(&path).unwrap();
        assert_eq!(ensure_schema(&mut conn, SCHEMAS, "test").unwrap(), 0);
        conn.execute("INSERT INTO parent (id, label) VALUES ('p', 'x')", [])
            .unwrap();
        drop(conn);

        let mut conn = Connection::open(&path).unwrap();
        assert_eq!(
            ensure_schema(&mut conn, MIGRATED_SCHEMAS, "test").unwrap(),
            1
        );
        let note: String = conn
            .query_row("SELECT note FROM parent WHERE id = 'p'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(note, "migrated");
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, BASE_DB_VERSION as i64 + 1);
        drop(conn);

        let mut conn = Connection::open(&path).unwrap();
        assert_eq!(
            ensure_schema(&mut conn, MIGRATED_SCHEMAS, "test").unwrap(),
            1
        );
    }

    #[test]
    fn test_ensure_schema_rejects_newer_database() {
        let mut conn = Connection::open_in_memory().unwrap();
        MIGRATED_SCHEMAS[1].create(&conn).unwrap();

        let err = ensure_schema(&mut conn, SCHEMAS, "test")
            .unwrap_err()
            .to_string();
        assert!(err.contains("newer than the latest known version"));
    }

    #[test]
    fn test_ensure_schema_rejects_foreign_database() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE something (id INTEGER)", []).unwrap();

        let err = ensure_schema(&mut conn, SCHEMAS, "test")
            .unwrap_err()
            .to_string();
        assert!(err.contains("not written by this application"));
    }
}
