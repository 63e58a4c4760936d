//! Repository layer: one zero-sized struct per table family.
//!
//! Every method is generic over [`sqlx::PgExecutor`] so it can run against
//! the pool or inside a caller-owned transaction (`&mut *tx`).

pub mod attribution_repo;
pub mod blacklist_repo;
pub mod eligibility_repo;
pub mod event_repo;
pub mod professional_repo;
pub mod response_repo;
pub mod update_repo;

pub use attribution_repo::AttributionRepo;
pub use blacklist_repo::{BlacklistRepo, NewBlacklistEntry, StrikeRepo};
pub use eligibility_repo::EligibilityRepo;
pub use event_repo::EventRepo;
pub use professional_repo::ProfessionalRepo;
pub use response_repo::ResponseRepo;
pub use update_repo::UpdateRepo;
