// fixtures/tables/japan_segments.rs
//
// Rectangular map segments around Kagoshima, seeded by
// `sql/japan_segments.sql`. Geometry is not decoded on the Rust side:
// queries select `ST_AsEWKT(bounds) AS bounds` to get it as text.

use crate::fixtures::FixtureTable;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of `japan_segments`, with `bounds` rendered as EWKT
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct JapanSegment {
    pub id: String,
    pub bounds: String,
}

impl JapanSegment {
    /// Query returning every segment in a shape `JapanSegment` can decode
    pub const SELECT_ALL: &'static str =
        "SELECT id, ST_AsEWKT(bounds) AS bounds FROM japan_segments ORDER BY id";
}

pub struct JapanSegmentsTable;

impl FixtureTable for JapanSegmentsTable {
    const TABLE: &'static str = "japan_segments";
    const FIXTURE: &'static str = "japan_segments.sql";
}
