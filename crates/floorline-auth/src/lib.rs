pub mod entities;
pub mod error;
pub mod migration;
pub mod password;
pub mod principal;
pub mod rate_limit;
pub mod service;
pub mod token;

pub use error::{AuthError, AuthResult};
pub use migration::AuthMigration;
pub use principal::{Principal, StaffRole};
pub use rate_limit::LoginRateLimiter;
pub use service::{AuthService, SessionTtl, StaffLoginOutcome};
