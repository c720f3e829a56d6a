//! MySQL / MariaDB adapter.
//!
//! Holds one physical `MySqlConnection`. Introspection reads
//! `information_schema` for the connected database.

use crate::db::adapter::{DatabaseAdapter, connection_suggestion};
use crate::db::params::bind_mysql_params;
use crate::db::types::{RowValues, rows_to_result};
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnSchema, ConnectionSettings, DatabaseEngine, DatabaseLayout, ForeignKeySchema,
    QueryRequest, QueryResult, TableSchema,
};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Executor, Row, Statement};
use tracing::{debug, info, warn};

/// Introspection query templates.
pub mod queries {
    pub const CURRENT_DATABASE: &str = "SELECT CONVERT(DATABASE() USING utf8) AS name";

    pub const LIST_TABLES: &str = r#"
        SELECT CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = ?
        AND TABLE_TYPE = 'BASE TABLE'
        "#;

    pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
            CONVERT(COLUMN_TYPE USING utf8) AS COLUMN_TYPE,
            CONVERT(IS_NULLABLE USING utf8) AS IS_NULLABLE,
            CONVERT(COLUMN_DEFAULT USING utf8) AS COLUMN_DEFAULT,
            CONVERT(COLUMN_KEY USING utf8) AS COLUMN_KEY
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#;

    pub const DESCRIBE_FOREIGN_KEYS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
            CONVERT(REFERENCED_TABLE_NAME USING utf8) AS REFERENCED_TABLE_NAME,
            CONVERT(REFERENCED_COLUMN_NAME USING utf8) AS REFERENCED_COLUMN_NAME,
            CONVERT(CONSTRAINT_NAME USING utf8) AS CONSTRAINT_NAME
        FROM information_schema.KEY_COLUMN_USAGE
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        AND REFERENCED_TABLE_NAME IS NOT NULL
        ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
        "#;
}

pub struct MySqlAdapter {
    settings: ConnectionSettings,
    conn: Option<MySqlConnection>,
}

impl MySqlAdapter {
    /// Create a disconnected adapter. Settings for another engine are rejected.
    pub fn new(settings: ConnectionSettings) -> DbResult<Self> {
        if settings.engine != DatabaseEngine::MySql {
            return Err(DbError::validation(format!(
                "MySQL adapter cannot be built from {} settings",
                settings.engine
            )));
        }
        Ok(Self {
            settings,
            conn: None,
        })
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.settings.host)
            .port(self.settings.port)
            .database(&self.settings.database)
            .username(&self.settings.username)
            .password(&self.settings.password)
            .charset("utf8mb4")
    }

    fn conn_mut(&mut self) -> DbResult<&mut MySqlConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| DbError::not_connected(DatabaseEngine::MySql))
    }
}

impl std::fmt::Debug for MySqlAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlAdapter")
            .field("settings", &self.settings)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl DatabaseAdapter for MySqlAdapter {
    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::MySql
    }

    fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connect(&mut self) -> DbResult<()> {
        if self.conn.is_some() {
            warn!(host = %self.settings.host, database = %self.settings.database, "MySQL adapter already connected");
            return Ok(());
        }

        let conn = MySqlConnection::connect_with(&self.connect_options())
            .await
            .map_err(|e| {
                DbError::connection(
                    format!("Failed to connect: {}", e),
                    connection_suggestion(DatabaseEngine::MySql, &e),
                )
            })?;

        info!(
            host = %self.settings.host,
            port = self.settings.port,
            database = %self.settings.database,
            "Connected to MySQL"
        );
        self.conn = Some(conn);
        Ok(())
    }

    async fn disconnect(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match conn.close().await {
            Ok(()) => debug!(database = %self.settings.database, "MySQL connection closed"),
            Err(e) => warn!(
                database = %self.settings.database,
                error = %e,
                "Error closing MySQL connection"
            ),
        }
    }

    async fn execute(&mut self, request: &QueryRequest) -> DbResult<QueryResult> {
        let conn = self.conn_mut()?;

        let rows: Vec<MySqlRow> = if request.params.is_empty() {
            (&mut *conn).fetch_all(request.sql.as_str()).await?
        } else {
            bind_mysql_params(sqlx::query(&request.sql), &request.params)
                .fetch_all(&mut *conn)
                .await?
        };

        let columns = match rows.first() {
            Some(row) => row.column_names(),
            None => describe_result_columns(conn, &request.sql).await,
        };

        debug!(rows = rows.len(), columns = columns.len(), "MySQL query executed");
        Ok(rows_to_result(columns, &rows))
    }

    async fn introspect(&mut self) -> DbResult<DatabaseLayout> {
        let fallback_name = self.settings.database.clone();
        let conn = self.conn_mut()?;

        let name = sqlx::query_scalar::<_, Option<String>>(queries::CURRENT_DATABASE)
            .fetch_one(&mut *conn)
            .await?
            .unwrap_or(fallback_name);

        let table_rows = sqlx::query(queries::LIST_TABLES)
            .bind(&name)
            .fetch_all(&mut *conn)
            .await?;

        let mut tables = Vec::with_capacity(table_rows.len());
        for row in &table_rows {
            let table_name = get_string(row, "TABLE_NAME");
            if table_name.is_empty() {
                continue;
            }
            let columns = describe_columns(conn, &name, &table_name).await?;
            let foreign_keys = describe_foreign_keys(conn, &name, &table_name).await?;
            tables.push(TableSchema {
                name: table_name,
                columns,
                foreign_keys,
            });
        }

        debug!(database = %name, table_count = tables.len(), "Introspected MySQL database");
        Ok(DatabaseLayout { name, tables })
    }
}

/// Result-column names of a statement that returned no rows.
async fn describe_result_columns(conn: &mut MySqlConnection, sql: &str) -> Vec<String> {
    match conn.prepare(sql).await {
        Ok(stmt) => stmt.columns().iter().map(|c| c.name().to_string()).collect(),
        Err(e) => {
            debug!(error = %e, "Statement cannot be prepared; returning no columns");
            Vec::new()
        }
    }
}

async fn describe_columns(
    conn: &mut MySqlConnection,
    schema: &str,
    table: &str,
) -> DbResult<Vec<ColumnSchema>> {
    let rows = sqlx::query(queries::DESCRIBE_COLUMNS)
        .bind(schema)
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows
        .iter()
        .map(|row| ColumnSchema {
            name: get_string(row, "COLUMN_NAME"),
            data_type: get_string(row, "COLUMN_TYPE"),
            nullable: get_string(row, "IS_NULLABLE").eq_ignore_ascii_case("YES"),
            default_value: get_optional_string(row, "COLUMN_DEFAULT"),
            primary_key: get_string(row, "COLUMN_KEY") == "PRI",
        })
        .collect())
}

async fn describe_foreign_keys(
    conn: &mut MySqlConnection,
    schema: &str,
    table: &str,
) -> DbResult<Vec<ForeignKeySchema>> {
    let rows = sqlx::query(queries::DESCRIBE_FOREIGN_KEYS)
        .bind(schema)
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows
        .iter()
        .map(|row| ForeignKeySchema {
            column: get_string(row, "COLUMN_NAME"),
            foreign_table: get_string(row, "REFERENCED_TABLE_NAME"),
            foreign_column: get_string(row, "REFERENCED_COLUMN_NAME"),
            constraint_name: get_string(row, "CONSTRAINT_NAME"),
        })
        .collect())
}

/// Safely get a string from a MySQL row.
/// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
fn get_string(row: &MySqlRow, column: &str) -> String {
    get_optional_string(row, column).unwrap_or_default()
}

/// Safely get an optional string from a MySQL row.
fn get_optional_string(row: &MySqlRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .or_else(|| {
            row.try_get::<Option<Vec<u8>>, _>(column)
                .ok()
                .flatten()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConnectionConfig;

    fn adapter() -> MySqlAdapter {
        let settings = ConnectionConfig::new("mysql", "shop", "root", "pw")
            .validate()
            .unwrap();
        MySqlAdapter::new(settings).unwrap()
    }

    #[test]
    fn test_rejects_postgres_settings() {
        let settings = ConnectionConfig::new("postgres", "shop", "app", "pw")
            .validate()
            .unwrap();
        let err = MySqlAdapter::new(settings).unwrap_err();
        assert!(matches!(err, DbError::Validation { .. }));
    }

    #[test]
    fn test_new_adapter_is_disconnected() {
        let adapter = adapter();
        assert!(!adapter.is_connected());
        assert_eq!(adapter.engine(), DatabaseEngine::MySql);
        assert_eq!(adapter.settings().port, 3306);
    }

    #[test]
    fn test_debug_hides_password() {
        let debug = format!("{:?}", adapter());
        assert!(!debug.contains("\"pw\""));
        assert!(debug.contains("connected: false"));
    }

    #[tokio::test]
    async fn test_execute_requires_connection() {
        let mut adapter = adapter();
        let err = adapter
            .execute(&QueryRequest::new("SELECT 1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotConnected { .. }));
    }

    #[tokio::test]
    async fn test_introspect_requires_connection() {
        let mut adapter = adapter();
        let err = adapter.introspect().await.unwrap_err();
        assert!(matches!(err, DbError::NotConnected { .. }));
    }

    #[tokio::test]
    async fn test_disconnect_without_connection_is_noop() {
        let mut adapter = adapter();
        adapter.disconnect().await;
        adapter.disconnect().await;
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_queries_filter_base_tables_and_references() {
        assert!(queries::LIST_TABLES.contains("'BASE TABLE'"));
        assert!(queries::DESCRIBE_COLUMNS.contains("ORDER BY ORDINAL_POSITION"));
        assert!(queries::DESCRIBE_FOREIGN_KEYS.contains("REFERENCED_TABLE_NAME IS NOT NULL"));
    }
}
