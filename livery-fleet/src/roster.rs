use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::User;
use crate::{FleetError, FleetResult};

/// Link row tying a driver account to the boss whose roster it is on.
/// Removing a driver deletes this link, never the user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: Uuid,
    pub driver_user_id: Uuid,
    pub boss_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl RosterEntry {
    pub fn new(driver_user_id: Uuid, boss_user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver_user_id,
            boss_user_id,
            created_at: Utc::now(),
        }
    }
}

/// Roster row joined with the driver's user record, as the admin
/// screens consume it.
#[derive(Debug, Clone, Serialize)]
pub struct DriverProfile {
    pub roster_id: Uuid,
    pub user: User,
}

/// Payload for adding a driver to a boss's roster. Creates the Driver
/// user and the roster link in one step.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDriver {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub hourly_rate: f64,
}

impl NewDriver {
    pub fn validate(&self) -> FleetResult<()> {
        if self.name.trim().is_empty() {
            return Err(FleetError::ValidationError("Name is required".to_string()));
        }
        if self.email.trim().is_empty() {
            return Err(FleetError::ValidationError("Email is required".to_string()));
        }
        if self.phone.trim().is_empty() {
            return Err(FleetError::ValidationError("Phone is required".to_string()));
        }
        if self.hourly_rate <= 0.0 {
            return Err(FleetError::ValidationError(
                "Valid hourly rate is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_user(self) -> User {
        User::new_driver(self.name, self.email, self.phone, self.hourly_rate)
    }
}

/// Partial update for an existing roster driver.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub hourly_rate: Option<f64>,
}

impl DriverUpdate {
    pub fn validate(&self) -> FleetResult<()> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err(FleetError::ValidationError("Name is required".to_string()));
        }
        if matches!(&self.email, Some(e) if e.trim().is_empty()) {
            return Err(FleetError::ValidationError("Email is required".to_string()));
        }
        if matches!(&self.phone, Some(p) if p.trim().is_empty()) {
            return Err(FleetError::ValidationError("Phone is required".to_string()));
        }
        if matches!(self.hourly_rate, Some(r) if r <= 0.0) {
            return Err(FleetError::ValidationError(
                "Valid hourly rate is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = livery_shared::pii::Masked(email.clone());
        }
        if let Some(phone) = &self.phone {
            user.phone = livery_shared::pii::Masked(phone.clone());
        }
        if let Some(rate) = self.hourly_rate {
            user.hourly_rate = Some(rate);
        }
    }
}
