//! Table-level query gate.
//!
//! Answers "may this caller query this table at all". Row ownership is the
//! query layer's job, and PII field exposure within `user_profiles` is
//! decided separately by [`can_access_pii`](crate::enforcement::can_access_pii).
//!
//! | Table           | Access      | Requirement                       |
//! |-----------------|-------------|-----------------------------------|
//! | `equipment`     | Public      | none                              |
//! | `labour_profiles` | Public    | none                              |
//! | `reviews`       | Public      | none                              |
//! | `user_profiles` | Identity    | authenticated                     |
//! | `bookings`      | OwnRecords  | authenticated + caller id         |
//! | `payments`      | OwnRecords  | authenticated + caller id         |
//! | `earnings`      | OwnRecords  | authenticated + caller id         |
//! | `notifications` | OwnRecords  | authenticated + caller id         |
//! | `audit_logs`    | AdminOnly   | admin role                        |
//!
//! Any other table name is denied for every caller, admins included.

use crate::context::RequestContext;
use crate::decision::Decision;
use crate::enforcement::{can_access_admin_data, known_role};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Tables the assistant may be asked to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Equipment,
    LabourProfiles,
    Reviews,
    UserProfiles,
    Bookings,
    Payments,
    Earnings,
    Notifications,
    AuditLogs,
}

/// Coarse access class of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TableAccess {
    /// Catalog data, readable by anyone.
    Public,
    /// The user-identity table. Needs authentication.
    Identity,
    /// Per-user records. Needs authentication and a caller id.
    OwnRecords,
    /// Operator data. Needs the admin role.
    AdminOnly,
}

impl Table {
    pub const ALL: [Table; 9] = [
        Table::Equipment,
        Table::LabourProfiles,
        Table::Reviews,
        Table::UserProfiles,
        Table::Bookings,
        Table::Payments,
        Table::Earnings,
        Table::Notifications,
        Table::AuditLogs,
    ];

    /// Returns the database name of this table.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Equipment => "equipment",
            Table::LabourProfiles => "labour_profiles",
            Table::Reviews => "reviews",
            Table::UserProfiles => "user_profiles",
            Table::Bookings => "bookings",
            Table::Payments => "payments",
            Table::Earnings => "earnings",
            Table::Notifications => "notifications",
            Table::AuditLogs => "audit_logs",
        }
    }

    /// Looks up a table by its exact database name.
    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|table| table.name() == name)
    }

    pub fn access(&self) -> TableAccess {
        match self {
            Table::Equipment | Table::LabourProfiles | Table::Reviews => TableAccess::Public,
            Table::UserProfiles => TableAccess::Identity,
            Table::Bookings | Table::Payments | Table::Earnings | Table::Notifications => {
                TableAccess::OwnRecords
            }
            Table::AuditLogs => TableAccess::AdminOnly,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decides whether the caller may query `table_name`.
pub fn can_query_table(ctx: &RequestContext, table_name: &str) -> Decision {
    if let Err(denied) = known_role(ctx) {
        return Decision::deny(format!("{}: table access denied: {table_name}", denied.reason));
    }

    let Some(table) = Table::from_name(table_name) else {
        debug!(table = %table_name, "Query against unmapped table denied");
        return Decision::deny(format!("unknown table: access denied: {table_name}"));
    };

    authorize(ctx, table)
}

/// Applies the policy of an already-resolved table.
pub fn authorize(ctx: &RequestContext, table: Table) -> Decision {
    if let Err(denied) = known_role(ctx) {
        return denied;
    }

    match table.access() {
        TableAccess::Public => Decision::allow(format!("{table} is public")),
        TableAccess::Identity => {
            if ctx.is_authenticated {
                Decision::allow(format!(
                    "authenticated user may query {table} (PII fields enforced separately)"
                ))
            } else {
                Decision::deny(format!("must be authenticated to query {table}"))
            }
        }
        TableAccess::OwnRecords => {
            if ctx.is_authenticated && ctx.caller_id().is_some() {
                Decision::allow(format!("authenticated user may query own {table}"))
            } else {
                Decision::deny(format!("must be authenticated to query {table}"))
            }
        }
        TableAccess::AdminOnly => can_access_admin_data(ctx),
    }
}
