use chrono::{DateTime, Utc};
use livery_shared::pii::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::FleetError;

/// Account roles exactly as the store persists them
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserRole {
    Driver,
    Boss,
    #[serde(rename = "Normal Rider")]
    NormalRider,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Driver => "Driver",
            UserRole::Boss => "Boss",
            UserRole::NormalRider => "Normal Rider",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Driver" => Ok(UserRole::Driver),
            "Boss" => Ok(UserRole::Boss),
            "Normal Rider" => Ok(UserRole::NormalRider),
            other => Err(FleetError::UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispatcher, driver or rider account. Contact fields are wrapped in
/// [`Masked`] so a stray `{:?}` in a log line never prints them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Masked<String>,
    pub phone: Masked<String>,
    pub role: UserRole,
    /// Set for drivers only; payout math treats a missing rate as zero.
    pub hourly_rate: Option<f64>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, phone: String, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email: Masked(email),
            phone: Masked(phone),
            role,
            hourly_rate: None,
            avatar_url: None,
            created_at: Utc::now(),
        }
    }

    /// Rider profile created inline while booking for an unknown phone number.
    pub fn new_rider(name: String, email: String, phone: String) -> Self {
        Self::new(name, email, phone, UserRole::NormalRider)
    }

    pub fn new_driver(name: String, email: String, phone: String, hourly_rate: f64) -> Self {
        let mut user = Self::new(name, email, phone, UserRole::Driver);
        user.hourly_rate = Some(hourly_rate);
        user
    }

    /// Hourly rate with the missing-rate default applied.
    pub fn rate(&self) -> f64 {
        self.hourly_rate.unwrap_or(0.0)
    }

    pub fn is_driver(&self) -> bool {
        self.role == UserRole::Driver
    }

    pub fn is_boss(&self) -> bool {
        self.role == UserRole::Boss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_store_strings() {
        for (role, s) in [
            (UserRole::Driver, "Driver"),
            (UserRole::Boss, "Boss"),
            (UserRole::NormalRider, "Normal Rider"),
        ] {
            assert_eq!(role.as_str(), s);
            assert_eq!(UserRole::from_str(s).unwrap(), role);
        }
        assert!(UserRole::from_str("Admin").is_err());
    }

    #[test]
    fn role_serializes_with_space() {
        let json = serde_json::to_string(&UserRole::NormalRider).unwrap();
        assert_eq!(json, "\"Normal Rider\"");
    }

    #[test]
    fn missing_rate_defaults_to_zero() {
        let rider = User::new_rider(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "5550001111".to_string(),
        );
        assert_eq!(rider.rate(), 0.0);

        let driver = User::new_driver(
            "Sam".to_string(),
            "sam@example.com".to_string(),
            "5550002222".to_string(),
            40.0,
        );
        assert_eq!(driver.rate(), 40.0);
        assert!(driver.is_driver());
    }

    #[test]
    fn debug_output_hides_contact_fields() {
        let user = User::new_rider(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "5550001111".to_string(),
        );
        let printed = format!("{:?}", user);
        assert!(!printed.contains("ada@example.com"));
        assert!(!printed.contains("5550001111"));
    }
}
