use std::fmt;

use serde::{Deserialize, Serialize};

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// An (organization, project) pair; the scoping unit for all notification
/// configuration, templates and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tenant {
    pub org_id: DbId,
    pub project_id: DbId,
}

impl Tenant {
    pub fn new(org_id: DbId, project_id: DbId) -> Self {
        Self { org_id, project_id }
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org_id, self.project_id)
    }
}
