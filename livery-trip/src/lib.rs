pub mod earnings;
pub mod lifecycle;
pub mod models;
pub mod views;

pub use earnings::{EarningsFilter, EarningsSummary, WalletStatement, WalletWindow};
pub use lifecycle::{check, Outcome, TripAction, TripError};
pub use models::{Trip, TripDraft, TripEvent, TripEventType, TripStatus};
