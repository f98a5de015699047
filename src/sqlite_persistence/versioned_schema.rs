use super::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::{params, types::Type, Connection};

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                default_value: None,
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
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }

    fn from_sql(s: &str) -> Option<&'static SqlType> {
        match s {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            _ => None,
        }
    }
}

pub struct Column<'a, S: AsRef<str>> {
    pub name: S,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub default_value: Option<S>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static, &'static str>],
    pub indices: &'static [(&'static str, &'static str)],
    /// Raw `CHECK` expressions appended to the table definition.
    pub checks: &'static [&'static str],
}

impl Table {
    pub fn create_sql(&self) -> String {
        let mut create_sql = format!("CREATE TABLE {} (", self.name);
        for (column_index, column) in self.columns.iter().enumerate() {
            if column_index > 0 {
                create_sql.push_str(", ");
            }
            create_sql.push_str(&format!("{} {}", column.name, column.sql_type.as_sql()));
            if column.is_primary_key {
                create_sql.push_str(" PRIMARY KEY");
            }
            if column.non_null {
                create_sql.push_str(" NOT NULL");
            }
            if let Some(default_value) = column.default_value {
                create_sql.push_str(&format!(" DEFAULT {}", default_value));
            }
        }
        for check in self.checks {
            create_sql.push_str(&format!(", CHECK ({})", check));
        }
        create_sql.push_str(");");
        create_sql
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
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
}

/// SQLite reports defaults the way they were written, possibly parenthesized.
fn normalized_default(value: Option<&str>) -> Option<&str> {
    value.map(|v| {
        v.strip_prefix('(')
            .and_then(|v| v.strip_suffix(')'))
            .unwrap_or(v)
    })
}

fn column_mismatch(
    actual: &Column<'_, String>,
    expected: &Column<'_, &'static str>,
) -> Option<String> {
    if actual.name != expected.name {
        return Some(format!("expected column {}, found {}", expected.name, actual.name));
    }
    if actual.sql_type != expected.sql_type {
        return Some(format!(
            "column {} has type {:?}, expected {:?}",
            expected.name, actual.sql_type, expected.sql_type
        ));
    }
    if actual.non_null != expected.non_null {
        return Some(format!(
            "column {} NOT NULL is {}, expected {}",
            expected.name, actual.non_null, expected.non_null
        ));
    }
    if normalized_default(actual.default_value.as_deref())
        != normalized_default(expected.default_value)
    {
        return Some(format!(
            "column {} defaults to {:?}, expected {:?}",
            expected.name, actual.default_value, expected.default_value
        ));
    }
    if actual.is_primary_key != expected.is_primary_key {
        return Some(format!(
            "column {} primary key is {}, expected {}",
            expected.name, actual.is_primary_key, expected.is_primary_key
        ));
    }
    None
}

fn read_columns(conn: &Connection, table: &str) -> Result<Vec<Column<'static, String>>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table))?;
    let columns = stmt
        .query_map(params![], |row| {
            let declared: String = row.get(2)?;
            let sql_type = SqlType::from_sql(&declared).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(2, declared.clone(), Type::Text)
            })?;
            Ok(Column {
                name: row.get(1)?,
                sql_type,
                non_null: row.get::<_, i32>(3)? == 1,
                default_value: row.get::<_, Option<String>>(4)?,
                is_primary_key: row.get::<_, i32>(5)? == 1,
            })
        })?
        .collect::<Result<_, _>>()?;
    Ok(columns)
}

fn index_exists(conn: &Connection, table: &str, index: &str) -> bool {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
        params![index, table],
        |_| Ok(()),
    )
    .is_ok()
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    /// Checks that the tables found in `conn` have the columns and indices declared here.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            let actual = read_columns(conn, table.name)?;
            if actual.len() != table.columns.len() {
                let found: Vec<&str> = actual.iter().map(|c| c.name.as_str()).collect();
                bail!(
                    "Table {} has columns [{}], expected {} columns",
                    table.name,
                    found.join(", "),
                    table.columns.len()
                );
            }
            for (actual_column, expected_column) in actual.iter().zip(table.columns) {
                if let Some(mismatch) = column_mismatch(actual_column, expected_column) {
                    bail!("Table {}: {}", table.name, mismatch);
                }
            }
            for (index_name, _) in table.indices {
                if !index_exists(conn, table.name, index_name) {
                    bail!("Table {} is missing index '{}'", table.name, index_name);
                }
            }
        }
        Ok(())
    }
}
