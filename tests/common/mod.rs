// common/mod.rs - Shared setup for the database integration tests
//
// Every integration test needs a running PostgreSQL with PostGIS, reached
// through DATABASE_URL (or the PG* variables). Each test gets its own
// schema through `DbTest::dbconnect`, so tests can run in parallel.

#![allow(dead_code)]

use spatial_db_tests::{logging, DbTest};

/// Harness configured from the environment, with logging initialised
pub fn harness() -> DbTest {
    logging::init();
    DbTest::from_env().expect("database test configuration")
}

/// Subordinate count per organization, ordered by organization id
pub const SUBORDINATES_SQL: &str = r#"
    SELECT COUNT(enterprise_sales_enterprise_customers.sales_organization_id) as subordinates_count, organizations."id" from organizations
    LEFT JOIN enterprise_sales_enterprise_customers ON organizations.id=enterprise_sales_enterprise_customers.sales_organization_id
    GROUP BY enterprise_sales_enterprise_customers.sales_organization_id, organizations."id" ORDER BY organizations."id";
"#;

/// Centroid of every segment
pub const CENTROIDS_SQL: &str = r#"
    SELECT sub_query.id, ST_X(sub_query.bounds_center) as longitude, ST_Y(sub_query.bounds_center) as latitude
    FROM (SELECT japan_segments.id as id, st_centroid(bounds) as bounds_center FROM japan_segments) as sub_query;
"#;

/// Segments fully inside a boundary around the southern Kagoshima coast
pub const CONTAINED_SEGMENTS_SQL: &str = r#"
    SELECT sub.id from (SELECT * from japan_segments, (SELECT ST_GeomFromEWKT('SRID=4326;POLYGON((130.27313232421875 30.519681272749402,131.02020263671875 30.519681272749402,
    131.02020263671875 30.80909017893796,130.27313232421875 30.80909017893796,130.27313232421875 30.519681272749402))') as boundary) as sub_query) as sub where ST_Contains(sub.boundary, sub.bounds)
"#;
