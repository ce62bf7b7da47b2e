//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod auth;
mod doctor;
mod ledger;
pub mod migration;
mod password;
mod status;
mod token;

pub use auth::AuthService;
pub use doctor::{CheckResult, CheckStatus, DoctorResult, DoctorService, DoctorSummary};
pub use ledger::TransactionService;
pub use migration::{MigrationResult, MigrationService};
pub use password::PasswordService;
pub use status::{StatusService, StatusSummary};
pub use token::{TokenSigner, MIN_SECRET_LEN};
