//! Tenant model - the company owning zero or more identities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant entity. Classification fields are plaintext here; the store
/// encrypts them at rest (zipcode excepted) and decodes them on read.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub name: String,
    pub tenant_type: String,
    pub sector: String,
    pub employees_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    pub country: String,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

impl Tenant {
    pub fn summary(&self) -> TenantSummary {
        TenantSummary {
            id: self.tenant_id,
            name: self.name.clone(),
            tenant_type: self.tenant_type.clone(),
            sector: self.sector.clone(),
            employees_number: self.employees_number.clone(),
            country: self.country.clone(),
        }
    }
}

/// Fields for creating a tenant.
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub tenant_type: String,
    pub sector: String,
    pub employees_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    pub country: String,
}

impl NewTenant {
    pub fn into_tenant(self) -> Tenant {
        Tenant {
            tenant_id: Uuid::new_v4(),
            name: self.name,
            tenant_type: self.tenant_type,
            sector: self.sector,
            employees_number: self.employees_number,
            address: self.address,
            city: self.city,
            zipcode: self.zipcode,
            country: self.country,
            is_active: true,
            created_utc: Utc::now(),
        }
    }
}

/// Tenant view for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub tenant_type: String,
    pub sector: String,
    pub employees_number: Option<String>,
    pub country: String,
}
