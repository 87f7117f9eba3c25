use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::gliders::NewGlider;
use crate::pilots::NewPilot;
use crate::takeoffs::NewTakeoff;

/// A flight as read from one listing row, with its sub-entities still embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedFlight {
    /// Site-assigned flight id (FLID), always positive
    pub id: i64,
    pub pilot: NewPilot,
    pub takeoff: NewTakeoff,
    pub start_time: DateTime<Utc>,
    pub start_point: GeoPoint,
    /// Discipline label as shown by the site ("free flight", "FAI triangle", ...)
    pub category: String,
    pub distance_km: f64,
    pub score: f64,
    pub airtime_minutes: i32,
    pub glider: NewGlider,
    pub url: String,
}

impl ScrapedFlight {
    /// Build the row to persist once the sub-entities have been resolved
    pub fn to_record(&self, pilot_id: i64, takeoff_id: Option<i64>, glider_id: i64) -> FlightRecord {
        FlightRecord {
            id: self.id,
            pilot_id,
            takeoff_id,
            glider_id,
            start_time: self.start_time,
            start_point: self.start_point,
            category: self.category.clone(),
            distance_km: self.distance_km,
            score: self.score,
            airtime_minutes: self.airtime_minutes,
            url: self.url.clone(),
        }
    }
}

/// A flight row with resolved references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub id: i64,
    pub pilot_id: i64,
    pub takeoff_id: Option<i64>,
    pub glider_id: i64,
    pub start_time: DateTime<Utc>,
    pub start_point: GeoPoint,
    pub category: String,
    pub distance_km: f64,
    pub score: f64,
    pub airtime_minutes: i32,
    pub url: String,
}

/// Diesel model for the flights table - used for database operations
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::flights)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FlightModel {
    pub id: i64,
    pub pilot_id: i64,
    pub takeoff_id: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub start_point: postgis_diesel::types::Point,
    pub category: String,
    pub distance_km: f64,
    pub score: f64,
    pub airtime_minutes: i32,
    pub glider_id: i64,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Insert model for new flights
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::flights)]
pub struct NewFlightModel {
    pub id: i64,
    pub pilot_id: i64,
    pub takeoff_id: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub start_point: postgis_diesel::types::Point,
    pub category: String,
    pub distance_km: f64,
    pub score: f64,
    pub airtime_minutes: i32,
    pub glider_id: i64,
    pub url: String,
}

impl From<&FlightRecord> for NewFlightModel {
    fn from(flight: &FlightRecord) -> Self {
        Self {
            id: flight.id,
            pilot_id: flight.pilot_id,
            takeoff_id: flight.takeoff_id,
            start_time: flight.start_time,
            start_point: flight.start_point.to_postgis(),
            category: flight.category.clone(),
            distance_km: flight.distance_km,
            score: flight.score,
            airtime_minutes: flight.airtime_minutes,
            glider_id: flight.glider_id,
            url: flight.url.clone(),
        }
    }
}

impl From<FlightModel> for FlightRecord {
    fn from(model: FlightModel) -> Self {
        Self {
            id: model.id,
            pilot_id: model.pilot_id,
            takeoff_id: model.takeoff_id,
            glider_id: model.glider_id,
            start_time: model.start_time,
            start_point: model.start_point.into(),
            category: model.category,
            distance_km: model.distance_km,
            score: model.score,
            airtime_minutes: model.airtime_minutes,
            url: model.url,
        }
    }
}
