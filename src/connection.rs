// connection.rs - Connection provider
//
// Each test gets its own single-connection pool. The connection pins
// `search_path` to the test's schema (with `public` behind it for the
// PostGIS types and functions), so fixtures and queries can use unqualified
// table names while staying isolated from every other test.

use crate::config::DbConfig;
use crate::errors::{Error, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::io;
use tokio::sync::OnceCell;

static POSTGIS: OnceCell<()> = OnceCell::const_new();

/// Open a connection for one test
///
/// With `schema` set, every connection the pool opens starts with
/// `SET search_path TO <schema>, public`. Connection failures are fatal:
/// tests assume the database is already running, so nothing is retried and
/// the driver's own error is what the test reports.
pub async fn connect(config: &DbConfig, schema: Option<&str>) -> Result<PgPool> {
    let options = config.connect_options()?;
    let target = config.redacted_url();

    tracing::debug!(db = %target, schema = ?schema, "connecting");
    check_reachable(config, &options, &target).await?;

    let mut pool_options = PgPoolOptions::new()
        .max_connections(1)
        .min_connections(0)
        .acquire_timeout(config.acquire_timeout);

    if let Some(schema) = schema {
        let set_search_path = format!("SET search_path TO {}, public", quote_ident(schema));
        pool_options = pool_options.after_connect(move |conn, _meta| {
            let statement = set_search_path.clone();
            Box::pin(async move {
                conn.execute(statement.as_str()).await?;
                Ok(())
            })
        });
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|source| Error::Connection {
            target: target.clone(),
            source,
        })?;
    tracing::debug!(db = %target, "connected");

    Ok(pool)
}

/// Open and close one plain connection, bounded by `acquire_timeout`
///
/// The pool retries refused connections until its timeout and then reports
/// only `PoolTimedOut`; a direct connection fails at once with the cause.
async fn check_reachable(config: &DbConfig, options: &PgConnectOptions, target: &str) -> Result<()> {
    let connection_error = |source: sqlx::Error| Error::Connection {
        target: target.to_string(),
        source,
    };

    let conn = tokio::time::timeout(config.acquire_timeout, PgConnection::connect_with(options))
        .await
        .map_err(|_| {
            connection_error(sqlx::Error::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no connection within {:?}", config.acquire_timeout),
            )))
        })?
        .map_err(connection_error)?;

    if let Err(e) = conn.close().await {
        tracing::debug!(db = %target, error = %e, "closing reachability check failed");
    }
    Ok(())
}

/// Make sure the postgis extension exists, once per process
pub async fn ensure_postgis(pool: &PgPool) -> Result<()> {
    POSTGIS
        .get_or_try_init(|| async {
            sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis SCHEMA public")
                .execute(pool)
                .await
                .map_err(|e| Error::query("creating extension postgis", e))?;
            tracing::info!("postgis extension available");
            Ok::<(), Error>(())
        })
        .await?;
    Ok(())
}

/// Installed PostGIS version, or `None` if the extension is missing
pub async fn postgis_version(pool: &PgPool) -> Result<Option<String>> {
    sqlx::query_scalar::<_, String>("SELECT extversion FROM pg_extension WHERE extname = 'postgis'")
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::query("reading postgis version", e))
}

/// Drop (if present) and recreate a schema
pub async fn create_schema(pool: &PgPool, schema: &str) -> Result<()> {
    drop_schema(pool, schema).await?;
    let statement = format!("CREATE SCHEMA {}", quote_ident(schema));
    sqlx::query(&statement)
        .execute(pool)
        .await
        .map_err(|e| Error::query(statement.clone(), e))?;
    Ok(())
}

/// Drop a schema with everything in it
pub async fn drop_schema(pool: &PgPool, schema: &str) -> Result<()> {
    let statement = format!("DROP SCHEMA IF EXISTS {} CASCADE", quote_ident(schema));
    sqlx::query(&statement)
        .execute(pool)
        .await
        .map_err(|source| Error::Teardown {
            schema: schema.to_string(),
            source,
        })?;
    Ok(())
}

/// Quote an SQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
