use uuid::Uuid;

use crate::models::{Trip, TripEventType, TripStatus};

/// A mutation requested against a trip. Dispatcher actions come from the
/// office; driver actions carry the acting driver's id and are checked
/// against the assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripAction {
    Confirm,
    AssignDriver(Uuid),
    Start { driver_id: Uuid },
    RecordPickup { driver_id: Uuid },
    Complete { driver_id: Uuid },
    Cancel,
}

impl TripAction {
    fn target(&self) -> &'static str {
        match self {
            TripAction::Confirm => "Confirmed",
            TripAction::AssignDriver(_) => "Confirmed",
            TripAction::Start { .. } => "En Route",
            TripAction::RecordPickup { .. } => "En Route",
            TripAction::Complete { .. } => "Completed",
            TripAction::Cancel => "Cancelled",
        }
    }
}

/// What a legal action does: the status to persist, the driver to attach,
/// and the event to append. Persistence applies all of it in one
/// transaction or none of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub new_status: Option<TripStatus>,
    pub assign_driver_id: Option<Uuid>,
    pub event_type: Option<TripEventType>,
}

/// Pure legality check over a freshly loaded trip. `pickup_recorded`
/// reflects whether a passenger_picked event already exists in the log;
/// it only matters for [`TripAction::RecordPickup`].
pub fn check(trip: &Trip, action: &TripAction, pickup_recorded: bool) -> Result<Outcome, TripError> {
    let invalid = || TripError::InvalidTransition {
        from: trip.status.as_str().to_string(),
        to: action.target().to_string(),
    };

    match action {
        TripAction::Confirm => {
            if trip.status != TripStatus::Pending {
                return Err(invalid());
            }
            Ok(Outcome {
                new_status: Some(TripStatus::Confirmed),
                assign_driver_id: None,
                event_type: None,
            })
        }

        TripAction::AssignDriver(driver_id) => {
            if !matches!(trip.status, TripStatus::Pending | TripStatus::Confirmed) {
                return Err(invalid());
            }
            Ok(Outcome {
                new_status: None,
                assign_driver_id: Some(*driver_id),
                event_type: None,
            })
        }

        TripAction::Start { driver_id } => {
            if trip.status == TripStatus::EnRoute {
                return Err(TripError::AlreadyStarted);
            }
            if trip.status != TripStatus::Confirmed {
                return Err(invalid());
            }
            check_driver(trip, *driver_id)?;
            Ok(Outcome {
                new_status: Some(TripStatus::EnRoute),
                assign_driver_id: None,
                event_type: Some(TripEventType::EnRoute),
            })
        }

        TripAction::RecordPickup { driver_id } => {
            if trip.status != TripStatus::EnRoute {
                return Err(invalid());
            }
            check_driver(trip, *driver_id)?;
            if pickup_recorded {
                return Err(TripError::PickupAlreadyRecorded);
            }
            Ok(Outcome {
                new_status: None,
                assign_driver_id: None,
                event_type: Some(TripEventType::PassengerPicked),
            })
        }

        TripAction::Complete { driver_id } => {
            if trip.status != TripStatus::EnRoute {
                return Err(invalid());
            }
            check_driver(trip, *driver_id)?;
            Ok(Outcome {
                new_status: Some(TripStatus::Completed),
                assign_driver_id: None,
                event_type: Some(TripEventType::Completed),
            })
        }

        TripAction::Cancel => {
            if !matches!(trip.status, TripStatus::Pending | TripStatus::Confirmed) {
                return Err(invalid());
            }
            Ok(Outcome {
                new_status: Some(TripStatus::Cancelled),
                assign_driver_id: None,
                event_type: None,
            })
        }
    }
}

fn check_driver(trip: &Trip, acting_driver: Uuid) -> Result<(), TripError> {
    match trip.driver_id {
        None => Err(TripError::NoDriverAssigned),
        Some(assigned) if assigned != acting_driver => Err(TripError::WrongDriver(acting_driver)),
        Some(_) => Ok(()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TripError {
    #[error("Trip not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Trip already started")]
    AlreadyStarted,

    #[error("Passenger pickup already recorded")]
    PickupAlreadyRecorded,

    #[error("Trip has no assigned driver")]
    NoDriverAssigned,

    #[error("Driver {0} is not assigned to this trip")]
    WrongDriver(Uuid),

    #[error("Invalid trip request: {0}")]
    InvalidDraft(String),

    #[error("Unknown trip status: {0}")]
    UnknownStatus(String),

    #[error("Unknown trip event type: {0}")]
    UnknownEventType(String),
}
