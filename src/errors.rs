// errors.rs - Error taxonomy for the test harness
//
// Nothing in here is retried or recovered. Every variant ends up as a
// failed test, so each one carries enough context to diagnose the failure
// from the test output alone.

use std::path::PathBuf;

/// Everything that can go wrong between connecting and asserting
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection parameters are missing or malformed
    #[error("invalid database configuration: {0}")]
    Config(String),

    /// The database is unreachable or rejected the credentials
    #[error("could not connect to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// The fixture path does not resolve to a readable file
    #[error("fixture not found: {}", path.display())]
    FixtureNotFound { path: PathBuf },

    /// A statement failed, either while loading a fixture or running a query
    #[error("query failed ({context}): {source}")]
    QueryExecution {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    /// A result column has a Postgres type we have no `Value` for
    #[error("column `{column}` has unsupported type {type_name}")]
    UnsupportedColumnType { column: String, type_name: String },

    /// The actual result set differs from the expected one
    #[error("{reason}\nexpected: {expected}\n  actual: {actual}")]
    AssertionMismatch {
        reason: String,
        expected: String,
        actual: String,
    },

    /// The per-test schema could not be dropped
    #[error("teardown of schema `{schema}` failed: {source}")]
    Teardown {
        schema: String,
        #[source]
        source: sqlx::Error,
    },
}

impl Error {
    /// Wraps a driver error raised while running `context`
    pub fn query(context: impl Into<String>, source: sqlx::Error) -> Self {
        Error::QueryExecution {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
