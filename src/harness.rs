// harness.rs - Scoped database access for tests
//
// `DbTest::dbconnect` is the piece every test goes through:
// 1. Create a fresh schema named after the test
// 2. Hand the test body a `TestConnection` pinned to that schema
// 3. Drop the schema and close the connection, whatever the body did
//
// The body runs on its own tokio task so that a failed `assert!` (a panic)
// is caught, the schema is still dropped, and the panic is then resumed so
// the test fails as usual.

use crate::config::DbConfig;
use crate::connection;
use crate::errors::{Error, Result};
use crate::fixtures::{self, FixtureDir, FixtureTable};
use crate::row::Row;
use sqlx::PgPool;
use std::future::Future;
use std::path::Path;

/// Connection settings plus the fixture directory for a test run
#[derive(Debug, Clone)]
pub struct DbTest {
    config: DbConfig,
    fixtures: FixtureDir,
}

impl DbTest {
    pub fn new(config: DbConfig, fixtures: FixtureDir) -> Self {
        Self { config, fixtures }
    }

    /// Build the harness from environment variables (and `.env`)
    pub fn from_env() -> Result<Self> {
        let config = DbConfig::from_env()?;
        let fixtures = FixtureDir::discover(config.fixture_dir.as_deref())?;
        Ok(Self::new(config, fixtures))
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn fixtures(&self) -> &FixtureDir {
        &self.fixtures
    }

    /// Connect and create a fresh schema for `test_name`
    ///
    /// The caller owns the teardown; prefer `dbconnect`, which guarantees it.
    pub async fn connect(&self, test_name: &str) -> Result<TestConnection> {
        let schema = generate_test_schema_name(test_name);
        let pool = connection::connect(&self.config, Some(&schema)).await?;
        prepare_schema(&pool, &schema, self.config.require_postgis).await?;
        tracing::info!(test = test_name, schema = %schema, "test schema ready");

        Ok(TestConnection {
            pool,
            schema,
            fixtures: self.fixtures.clone(),
        })
    }

    /// Run `test_fn` with a connection to a fresh, isolated schema
    ///
    /// The schema is dropped and the connection closed after the body
    /// returns `Ok`, returns `Err` or panics. A panic is resumed after the
    /// teardown; an error from the body wins over a teardown error.
    pub async fn dbconnect<F, Fut>(&self, test_name: &str, test_fn: F) -> anyhow::Result<()>
    where
        F: FnOnce(TestConnection) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let conn = self.connect(test_name).await?;
        let outcome = tokio::spawn(test_fn(conn.clone())).await;
        let teardown = conn.teardown().await;

        match outcome {
            Ok(result) => {
                if let Err(e) = &teardown {
                    tracing::warn!(test = test_name, error = %e, "teardown failed");
                }
                result?;
                teardown?;
                Ok(())
            }
            Err(join_error) => {
                if let Err(e) = teardown {
                    tracing::warn!(test = test_name, error = %e, "teardown failed");
                }
                if join_error.is_panic() {
                    std::panic::resume_unwind(join_error.into_panic());
                }
                Err(anyhow::anyhow!("test body of {test_name} was cancelled"))
            }
        }
    }
}

/// A live connection pinned to one test's schema
///
/// Cloning is cheap and every clone talks to the same single connection.
#[derive(Debug, Clone)]
pub struct TestConnection {
    pool: PgPool,
    schema: String,
    fixtures: FixtureDir,
}

impl TestConnection {
    /// Name of the schema this test owns
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The underlying pool, for typed `sqlx` queries
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Execute a fixture file given by path
    pub async fn load_fixtures(&self, path: impl AsRef<Path>) -> Result<()> {
        fixtures::load_fixtures(&self.pool, path.as_ref()).await
    }

    /// Execute a fixture file from the fixture directory
    pub async fn load_fixture(&self, name: &str) -> Result<()> {
        self.load_fixtures(self.fixtures.path(name)).await
    }

    /// Execute the fixture file that seeds `T`
    pub async fn load_table<T: FixtureTable>(&self) -> Result<()> {
        self.load_fixture(T::FIXTURE).await
    }

    /// Run a single statement, returning the number of affected rows
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::query(sql.trim(), e))?;
        Ok(result.rows_affected())
    }

    /// Run a query and fetch every row as a dynamically typed `Row`
    pub async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>> {
        tracing::debug!(schema = %self.schema, sql = sql.trim(), "fetching rows");
        let pg_rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::query(sql.trim(), e))?;
        pg_rows.iter().map(Row::from_pg_row).collect()
    }

    /// `SELECT COUNT(*)` of a table
    pub async fn count_rows(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", connection::quote_ident(table));
        sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::query(sql.clone(), e))
    }

    /// Drop the schema and close the connection
    pub async fn teardown(self) -> Result<()> {
        let dropped = connection::drop_schema(&self.pool, &self.schema).await;
        self.pool.close().await;
        tracing::info!(schema = %self.schema, ok = dropped.is_ok(), "test schema dropped");
        dropped
    }
}

/// Bootstrap PostGIS if asked to and create `schema`
///
/// The pool is closed before a setup error is returned, since no
/// `TestConnection` exists yet to tear it down.
async fn prepare_schema(pool: &PgPool, schema: &str, require_postgis: bool) -> Result<()> {
    let setup = async {
        if require_postgis {
            connection::ensure_postgis(pool).await?;
        }
        connection::create_schema(pool, schema).await
    };
    if let Err(e) = setup.await {
        tracing::warn!(schema = %schema, error = %e, "schema setup failed, closing connection");
        pool.close().await;
        return Err(e);
    }
    Ok(())
}

/// Schema name for a test: `test_` plus the sanitised, truncated test name
///
/// Only ASCII alphanumerics and underscores survive, lower-cased, and the
/// name is cut at 50 characters to stay under the 63-byte identifier limit.
pub fn generate_test_schema_name(test_name: &str) -> String {
    let sanitized: String = test_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .take(50)
        .collect();

    format!("test_{}", sanitized)
}
