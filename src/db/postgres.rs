//! PostgreSQL adapter.
//!
//! Holds one physical `PgConnection`. Introspection covers base tables in
//! the `public` schema of the connected database.

use crate::db::adapter::{DatabaseAdapter, connection_suggestion};
use crate::db::params::bind_postgres_params;
use crate::db::types::{RowValues, rows_to_result};
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnSchema, ConnectionSettings, DatabaseEngine, DatabaseLayout, ForeignKeySchema,
    QueryRequest, QueryResult, TableSchema,
};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Executor, Row, Statement};
use tracing::{debug, info, warn};

/// Schema covered by introspection.
pub const INTROSPECTION_SCHEMA: &str = "public";

/// Introspection query templates. `$1` is always the schema name.
pub mod queries {
    pub const CURRENT_DATABASE: &str = "SELECT current_database()::text";

    pub const LIST_TABLES: &str = r#"
        SELECT table_name::text AS table_name
        FROM information_schema.tables
        WHERE table_schema = $1
        AND table_type = 'BASE TABLE'
        "#;

    /// `data_type` is the engine's own spelling (`character varying(100)`,
    /// `integer[]`, enum names), not the information_schema category.
    pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            c.column_name::text AS column_name,
            format_type(a.atttypid, a.atttypmod) AS data_type,
            c.is_nullable::text AS is_nullable,
            c.column_default::text AS column_default,
            (pk.column_name IS NOT NULL) AS is_primary_key
        FROM information_schema.columns c
        JOIN pg_catalog.pg_attribute a
            ON a.attrelid = format('%I.%I', c.table_schema, c.table_name)::regclass
            AND a.attname = c.column_name::text
        LEFT JOIN (
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
            WHERE tc.constraint_type = 'PRIMARY KEY'
            AND tc.table_schema = $1
            AND tc.table_name = $2
        ) pk ON pk.column_name = c.column_name
        WHERE c.table_schema = $1 AND c.table_name = $2
        ORDER BY c.ordinal_position
        "#;

    /// Constraint names are only unique per table, so foreign keys are read
    /// from `pg_constraint` by table oid. Column pairs come from zipping
    /// `conkey` with `confkey`.
    pub const DESCRIBE_FOREIGN_KEYS: &str = r#"
        SELECT
            a.attname::text AS column_name,
            rt.relname::text AS foreign_table_name,
            ra.attname::text AS foreign_column_name,
            con.conname::text AS constraint_name
        FROM pg_catalog.pg_constraint con
        JOIN pg_catalog.pg_class t ON t.oid = con.conrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
        JOIN pg_catalog.pg_class rt ON rt.oid = con.confrelid
        CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
            WITH ORDINALITY AS k(attnum, ref_attnum, position)
        JOIN pg_catalog.pg_attribute a
            ON a.attrelid = con.conrelid AND a.attnum = k.attnum
        JOIN pg_catalog.pg_attribute ra
            ON ra.attrelid = con.confrelid AND ra.attnum = k.ref_attnum
        WHERE con.contype = 'f'
        AND n.nspname::text = $1
        AND t.relname::text = $2
        ORDER BY con.conname, k.position
        "#;
}

pub struct PostgresAdapter {
    settings: ConnectionSettings,
    conn: Option<PgConnection>,
}

impl PostgresAdapter {
    /// Create a disconnected adapter. Settings for another engine are rejected.
    pub fn new(settings: ConnectionSettings) -> DbResult<Self> {
        if settings.engine != DatabaseEngine::Postgres {
            return Err(DbError::validation(format!(
                "PostgreSQL adapter cannot be built from {} settings",
                settings.engine
            )));
        }
        Ok(Self {
            settings,
            conn: None,
        })
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.settings.host)
            .port(self.settings.port)
            .database(&self.settings.database)
            .username(&self.settings.username)
            .password(&self.settings.password)
            .application_name(env!("CARGO_PKG_NAME"))
    }

    fn conn_mut(&mut self) -> DbResult<&mut PgConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| DbError::not_connected(DatabaseEngine::Postgres))
    }
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdapter")
            .field("settings", &self.settings)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl DatabaseAdapter for PostgresAdapter {
    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::Postgres
    }

    fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connect(&mut self) -> DbResult<()> {
        if self.conn.is_some() {
            warn!(host = %self.settings.host, database = %self.settings.database, "PostgreSQL adapter already connected");
            return Ok(());
        }

        let mut conn = PgConnection::connect_with(&self.connect_options())
            .await
            .map_err(|e| {
                DbError::connection(
                    format!("Failed to connect: {}", e),
                    connection_suggestion(DatabaseEngine::Postgres, &e),
                )
            })?;

        // Startup succeeded; confirm the session accepts queries before handing it out.
        if let Err(e) = conn.ping().await {
            if let Err(close_err) = conn.close().await {
                warn!(
                    database = %self.settings.database,
                    error = %close_err,
                    "Error closing PostgreSQL connection after failed handshake"
                );
            }
            return Err(DbError::connection(
                format!("Connection handshake failed: {}", e),
                connection_suggestion(DatabaseEngine::Postgres, &e),
            ));
        }

        info!(
            host = %self.settings.host,
            port = self.settings.port,
            database = %self.settings.database,
            "Connected to PostgreSQL"
        );
        self.conn = Some(conn);
        Ok(())
    }

    async fn disconnect(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match conn.close().await {
            Ok(()) => debug!(database = %self.settings.database, "PostgreSQL connection closed"),
            Err(e) => warn!(
                database = %self.settings.database,
                error = %e,
                "Error closing PostgreSQL connection"
            ),
        }
    }

    async fn execute(&mut self, request: &QueryRequest) -> DbResult<QueryResult> {
        let conn = self.conn_mut()?;

        let rows: Vec<PgRow> = if request.params.is_empty() {
            (&mut *conn).fetch_all(request.sql.as_str()).await?
        } else {
            bind_postgres_params(sqlx::query(&request.sql), &request.params)
                .fetch_all(&mut *conn)
                .await?
        };

        let columns = match rows.first() {
            Some(row) => row.column_names(),
            None => describe_result_columns(conn, &request.sql).await,
        };

        debug!(rows = rows.len(), columns = columns.len(), "PostgreSQL query executed");
        Ok(rows_to_result(columns, &rows))
    }

    async fn introspect(&mut self) -> DbResult<DatabaseLayout> {
        let conn = self.conn_mut()?;

        let name: String = sqlx::query_scalar(queries::CURRENT_DATABASE)
            .fetch_one(&mut *conn)
            .await?;

        let table_names: Vec<String> = sqlx::query_scalar(queries::LIST_TABLES)
            .bind(INTROSPECTION_SCHEMA)
            .fetch_all(&mut *conn)
            .await?;

        let mut tables = Vec::with_capacity(table_names.len());
        for table_name in table_names {
            let columns = describe_columns(conn, &table_name).await?;
            let foreign_keys = describe_foreign_keys(conn, &table_name).await?;
            tables.push(TableSchema {
                name: table_name,
                columns,
                foreign_keys,
            });
        }

        debug!(database = %name, table_count = tables.len(), "Introspected PostgreSQL database");
        Ok(DatabaseLayout { name, tables })
    }
}

/// Result-column names of a statement that returned no rows.
async fn describe_result_columns(conn: &mut PgConnection, sql: &str) -> Vec<String> {
    match conn.prepare(sql).await {
        Ok(stmt) => stmt.columns().iter().map(|c| c.name().to_string()).collect(),
        Err(e) => {
            debug!(error = %e, "Statement cannot be prepared; returning no columns");
            Vec::new()
        }
    }
}

async fn describe_columns(conn: &mut PgConnection, table: &str) -> DbResult<Vec<ColumnSchema>> {
    let rows = sqlx::query(queries::DESCRIBE_COLUMNS)
        .bind(INTROSPECTION_SCHEMA)
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| -> DbResult<ColumnSchema> {
            let is_nullable: String = row.try_get("is_nullable")?;
            Ok(ColumnSchema {
                name: row.try_get("column_name")?,
                data_type: row.try_get("data_type")?,
                nullable: is_nullable.eq_ignore_ascii_case("YES"),
                default_value: row.try_get("column_default")?,
                primary_key: row.try_get("is_primary_key")?,
            })
        })
        .collect()
}

async fn describe_foreign_keys(
    conn: &mut PgConnection,
    table: &str,
) -> DbResult<Vec<ForeignKeySchema>> {
    let rows = sqlx::query(queries::DESCRIBE_FOREIGN_KEYS)
        .bind(INTROSPECTION_SCHEMA)
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| -> DbResult<ForeignKeySchema> {
            Ok(ForeignKeySchema {
                column: row.try_get("column_name")?,
                foreign_table: row.try_get("foreign_table_name")?,
                foreign_column: row.try_get("foreign_column_name")?,
                constraint_name: row.try_get("constraint_name")?,
            })
        })
        .collect()
}
