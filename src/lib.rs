// lib.rs - Root module for the spatial_db_tests library
//
// A small harness for database tests against PostgreSQL with PostGIS:
// connect, load SQL fixtures into an isolated schema, run a query and
// compare the rows with literal expectations.

pub mod assertions;
pub mod config;
pub mod connection;
pub mod errors;
/// The fixtures module contains the SQL fixture loader and fixture tables
pub mod fixtures;
pub mod harness;
pub mod logging;
pub mod row;

pub use assertions::{assert_row_count, assert_rows, assert_rows_with, DEFAULT_FLOAT_TOLERANCE};
pub use config::DbConfig;
pub use errors::{Error, Result};
pub use fixtures::{FixtureDir, FixtureTable};
pub use harness::{generate_test_schema_name, DbTest, TestConnection};
pub use row::{Row, Value};
