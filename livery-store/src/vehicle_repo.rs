use async_trait::async_trait;
use livery_core::repository::VehicleRepository;
use livery_fleet::Vehicle;
use sqlx::PgPool;
use uuid::Uuid;

const INSERT_VEHICLE: &str = r#"
INSERT INTO vehicles (id, name, vehicle_type, capacity, price_per_mile, amenities, image_url)
VALUES ($1, $2, $3, $4, $5, $6, $7);
"#;

const SELECT_VEHICLE: &str = "SELECT * FROM vehicles WHERE id = $1;";

const SELECT_ALL_VEHICLES: &str = "SELECT * FROM vehicles ORDER BY name ASC;";

const UPDATE_VEHICLE: &str = r#"
UPDATE vehicles SET name = $2, vehicle_type = $3, capacity = $4, price_per_mile = $5,
                    amenities = $6, image_url = $7
WHERE id = $1;
"#;

const DELETE_VEHICLE: &str = "DELETE FROM vehicles WHERE id = $1;";

pub struct PgVehicleRepository {
    pool: PgPool,
}

impl PgVehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: Uuid,
    name: String,
    vehicle_type: String,
    capacity: i32,
    price_per_mile: f64,
    amenities: Vec<String>,
    image_url: Option<String>,
}

impl VehicleRow {
    fn into_vehicle(self) -> Vehicle {
        Vehicle {
            id: self.id,
            name: self.name,
            vehicle_type: self.vehicle_type,
            capacity: self.capacity,
            price_per_mile: self.price_per_mile,
            amenities: self.amenities,
            image_url: self.image_url,
        }
    }
}

#[async_trait]
impl VehicleRepository for PgVehicleRepository {
    async fn create_vehicle(
        &self,
        vehicle: &Vehicle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(INSERT_VEHICLE)
            .bind(vehicle.id)
            .bind(&vehicle.name)
            .bind(&vehicle.vehicle_type)
            .bind(vehicle.capacity)
            .bind(vehicle.price_per_mile)
            .bind(&vehicle.amenities)
            .bind(&vehicle.image_url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_vehicle(
        &self,
        id: Uuid,
    ) -> Result<Option<Vehicle>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, VehicleRow>(SELECT_VEHICLE)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(VehicleRow::into_vehicle))
    }

    async fn list_vehicles(
        &self,
    ) -> Result<Vec<Vehicle>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, VehicleRow>(SELECT_ALL_VEHICLES)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(VehicleRow::into_vehicle).collect())
    }

    async fn update_vehicle(
        &self,
        id: Uuid,
        vehicle: &Vehicle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(UPDATE_VEHICLE)
            .bind(id)
            .bind(&vehicle.name)
            .bind(&vehicle.vehicle_type)
            .bind(vehicle.capacity)
            .bind(vehicle.price_per_mile)
            .bind(&vehicle.amenities)
            .bind(&vehicle.image_url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_vehicle(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(DELETE_VEHICLE)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
