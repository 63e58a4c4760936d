//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for inserts and patches where the API writes rows

pub mod attribution;
pub mod blacklist;
pub mod eligibility;
pub mod event;
pub mod professional;
pub mod response;
pub mod status;
pub mod update;
