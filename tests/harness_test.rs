/// Harness lifecycle tests
///
/// The per-test schema has to disappear whether the body succeeds, returns
/// an error or panics, and tests must not see each other's tables.
///
/// Prerequisites: DATABASE_URL (or PG* variables), PostGIS available

mod common;

use anyhow::Result;
use common::harness;
use spatial_db_tests::{connection, generate_test_schema_name, DbConfig, DbTest, Error};
use std::time::Duration;

async fn schema_exists(config: &DbConfig, schema: &str) -> Result<bool> {
    let pool = connection::connect(config, None).await?;
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
    )
    .bind(schema)
    .fetch_one(&pool)
    .await?;
    pool.close().await;
    Ok(exists)
}

#[tokio::test]
async fn test_schema_is_dropped_after_success() -> Result<()> {
    let harness = harness();
    let schema = generate_test_schema_name("schema_dropped_after_success");

    harness
        .dbconnect("schema_dropped_after_success", |conn| async move {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
            )
            .bind(conn.schema())
            .fetch_one(conn.pool())
            .await?;
            assert!(exists, "schema should exist while the test runs");
            Ok(())
        })
        .await?;

    assert!(!schema_exists(harness.config(), &schema).await?);
    Ok(())
}

#[tokio::test]
async fn test_schema_is_dropped_after_error() -> Result<()> {
    let harness = harness();
    let schema = generate_test_schema_name("schema_dropped_after_error");

    let result = harness
        .dbconnect("schema_dropped_after_error", |conn| async move {
            conn.load_fixture("organizations.sql").await?;
            anyhow::bail!("body failed on purpose")
        })
        .await;

    assert_eq!(result.unwrap_err().to_string(), "body failed on purpose");
    assert!(!schema_exists(harness.config(), &schema).await?);
    Ok(())
}

#[tokio::test]
async fn test_schema_is_dropped_after_panic() -> Result<()> {
    let harness = harness();
    let config = harness.config().clone();
    let schema = generate_test_schema_name("schema_dropped_after_panic");

    let outcome = tokio::spawn(async move {
        harness
            .dbconnect("schema_dropped_after_panic", |conn| async move {
                conn.load_fixture("japan_segments.sql").await?;
                let segments = conn.count_rows("japan_segments").await?;
                assert_eq!(segments, 0, "deliberately failing assertion");
                Ok(())
            })
            .await
    })
    .await;

    let join_error = outcome.expect_err("the assertion failure should propagate as a panic");
    assert!(join_error.is_panic());
    assert!(!schema_exists(&config, &schema).await?);
    Ok(())
}

#[tokio::test]
async fn test_tests_are_isolated_by_schema() -> Result<()> {
    let harness = harness();
    let outer = harness.clone();

    harness
        .dbconnect("isolation_outer", |conn| async move {
            conn.load_fixture("organizations.sql").await?;

            outer
                .dbconnect("isolation_inner", |inner| async move {
                    assert_ne!(inner.schema(), "test_isolation_outer");
                    let visible: Option<String> =
                        sqlx::query_scalar("SELECT to_regclass('organizations')::text")
                            .fetch_one(inner.pool())
                            .await?;
                    assert_eq!(visible, None, "the other test's tables must not be visible");
                    Ok(())
                })
                .await?;

            assert_eq!(conn.count_rows("organizations").await?, 7);
            Ok(())
        })
        .await
}

#[tokio::test]
async fn test_unreachable_database_fails_before_the_body() -> Result<()> {
    let base = harness();
    let config = DbConfig {
        url: None,
        host: "127.0.0.1".to_string(),
        port: 1,
        acquire_timeout: Duration::from_secs(2),
        ..base.config().clone()
    };
    let harness = DbTest::new(config, base.fixtures().clone());

    let err = harness
        .dbconnect("unreachable_database", |_conn| async move {
            panic!("the body must not run without a connection")
        })
        .await
        .unwrap_err();

    match err.downcast_ref::<Error>() {
        Some(Error::Connection {
            source: sqlx::Error::Io(io_error),
            ..
        }) => assert_eq!(io_error.kind(), std::io::ErrorKind::ConnectionRefused),
        _ => panic!("expected a refused connection, got: {err}"),
    }
    assert!(
        err.to_string().contains("refused"),
        "the driver's message should reach the test output: {err}"
    );
    Ok(())
}
