//! Read-only views of the user and tenant directories.
//!
//! The directories themselves live outside this core; these entities are the
//! shape in which their answers arrive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role assigned to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Instructor,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Student => write!(f, "student"),
            UserRole::Instructor => write!(f, "instructor"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(UserRole::Student),
            "instructor" => Ok(UserRole::Instructor),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Account status of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Suspended,
    Deleted,
}

/// User record returned by the user directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User UUID
    pub id: Uuid,

    /// Email address
    pub email: String,

    /// Assigned role
    pub role: UserRole,

    /// Tenant the user belongs to, None for B2C users
    pub tenant_id: Option<Uuid>,

    /// Account status
    pub status: UserStatus,

    /// Timestamp when the account was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user view
    pub fn new(email: String, role: UserRole, tenant_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            role,
            tenant_id,
            status: UserStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Whether tokens may be issued for this user
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Subscription plan of a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantPlan {
    Standard,
    Premium,
}

/// Status of a tenant account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Suspended,
}

/// Tenant record returned by the tenant directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Tenant UUID
    pub id: Uuid,

    /// Tenant status
    pub status: TenantStatus,

    /// Subscription plan, drives the rate-limit tier
    pub plan: TenantPlan,

    /// Number of seats the tenant has purchased
    pub seats: u32,
}

impl Tenant {
    /// Creates a new tenant view
    pub fn new(plan: TenantPlan, seats: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: TenantStatus::Active,
            plan,
            seats,
        }
    }

    /// Whether members of this tenant may authenticate
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}
