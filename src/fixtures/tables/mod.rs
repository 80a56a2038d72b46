// fixtures/tables/mod.rs
//
// Each fixture table is a marker struct implementing `FixtureTable`, plus a
// row struct that `sqlx::FromRow` can decode for typed queries.

pub mod japan_segments;
pub mod organizations;

pub use japan_segments::{JapanSegment, JapanSegmentsTable};
pub use organizations::{
    EnterpriseCustomer, EnterpriseCustomersTable, Organization, OrganizationsTable,
};
