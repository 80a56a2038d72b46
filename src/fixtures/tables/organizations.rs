// fixtures/tables/organizations.rs
//
// Organizations and the sales relationships between them, both seeded by
// `sql/organizations.sql`. Organization 2 sells to four enterprise
// customers and organization 6 to one.

use crate::fixtures::FixtureTable;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of `organizations`
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Organization {
    pub id: i32,
    pub name: String,
    pub organization_type: String,
}

/// A row of `enterprise_sales_enterprise_customers`
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct EnterpriseCustomer {
    pub id: i32,
    pub sales_organization_id: i32,
    pub customer_organization_id: i32,
}

pub struct OrganizationsTable;

impl FixtureTable for OrganizationsTable {
    const TABLE: &'static str = "organizations";
    const FIXTURE: &'static str = "organizations.sql";
}

pub struct EnterpriseCustomersTable;

impl FixtureTable for EnterpriseCustomersTable {
    const TABLE: &'static str = "enterprise_sales_enterprise_customers";
    const FIXTURE: &'static str = "organizations.sql";
}
