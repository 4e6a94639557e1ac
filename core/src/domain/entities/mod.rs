//! Domain entities for the authentication core.

pub mod token;
pub mod user;

pub use token::{Claims, OneTimePurpose, OneTimeToken, TokenFamily, TokenPair, TokenType};
pub use user::{Tenant, TenantPlan, TenantStatus, User, UserRole, UserStatus};
