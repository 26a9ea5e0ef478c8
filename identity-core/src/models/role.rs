//! Role and permission models - passive records only.
//!
//! These mirror the role/permission tables carried by the wider system.
//! No policy evaluation happens in this crate; the records exist so tenant
//! administration tooling has typed rows to work with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tenant-scoped role.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub role_id: Uuid,
    pub tenant_id: Uuid,
    pub role_label: String,
    pub created_utc: DateTime<Utc>,
}

impl Role {
    pub fn new(tenant_id: Uuid, role_label: impl Into<String>) -> Self {
        Self {
            role_id: Uuid::new_v4(),
            tenant_id,
            role_label: role_label.into(),
            created_utc: Utc::now(),
        }
    }
}

/// Global permission key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub permission_id: Uuid,
    pub permission_key: String,
    pub created_utc: DateTime<Utc>,
}

/// Role-to-permission link row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RolePermission {
    pub role_id: Uuid,
    pub permission_id: Uuid,
}

/// Identity-to-role link row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IdentityRole {
    pub identity_id: Uuid,
    pub role_id: Uuid,
}
