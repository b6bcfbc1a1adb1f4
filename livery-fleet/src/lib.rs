pub mod location;
pub mod roster;
pub mod user;
pub mod vehicle;

pub use location::LocationUpdate;
pub use roster::{DriverProfile, DriverUpdate, NewDriver, RosterEntry};
pub use user::{User, UserRole};
pub use vehicle::Vehicle;

#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

pub type FleetResult<T> = Result<T, FleetError>;
