use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{FleetError, FleetResult};

/// A car in the fleet catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub name: String,
    /// Body class shown to dispatchers ("Sedan", "SUV", "Stretch").
    #[serde(rename = "type")]
    pub vehicle_type: String,
    pub capacity: i32,
    pub price_per_mile: f64,
    pub amenities: Vec<String>,
    pub image_url: Option<String>,
}

impl Vehicle {
    pub fn new(
        name: String,
        vehicle_type: String,
        capacity: i32,
        price_per_mile: f64,
        amenities: Vec<String>,
        image_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            vehicle_type,
            capacity,
            price_per_mile,
            amenities,
            image_url,
        }
    }

    pub fn validate(&self) -> FleetResult<()> {
        if self.name.trim().is_empty() {
            return Err(FleetError::ValidationError(
                "Vehicle name is required".to_string(),
            ));
        }
        if self.capacity < 1 {
            return Err(FleetError::ValidationError(
                "Capacity must be at least 1".to_string(),
            ));
        }
        if self.price_per_mile < 0.0 {
            return Err(FleetError::ValidationError(
                "Price per mile cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sedan() -> Vehicle {
        Vehicle::new(
            "Lincoln Town Car".to_string(),
            "Sedan".to_string(),
            4,
            2.5,
            vec!["WiFi".to_string(), "Water".to_string()],
            None,
        )
    }

    #[test]
    fn valid_vehicle_passes() {
        assert!(sedan().validate().is_ok());
    }

    #[test]
    fn rejects_blank_name_and_bad_capacity() {
        let mut v = sedan();
        v.name = "   ".to_string();
        assert!(v.validate().is_err());

        let mut v = sedan();
        v.capacity = 0;
        assert!(v.validate().is_err());

        let mut v = sedan();
        v.price_per_mile = -0.5;
        assert!(v.validate().is_err());
    }

    #[test]
    fn type_field_uses_store_column_name() {
        let json = serde_json::to_string(&sedan()).unwrap();
        assert!(json.contains("\"type\":\"Sedan\""));
    }
}
