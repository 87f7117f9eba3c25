use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Name the site shows when it could not match a flight to a known takeoff.
/// Flights with this takeoff are stored without a takeoff reference.
pub const UNKNOWN_TAKEOFF: &str = "?";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTakeoff {
    pub name: String,
    pub centroid: GeoPoint,
}

impl NewTakeoff {
    pub fn is_unknown(&self) -> bool {
        self.name.trim() == UNKNOWN_TAKEOFF
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Takeoff {
    pub id: i64,
    pub name: String,
    pub centroid: GeoPoint,
}

/// Diesel model for the takeoffs table - used for database operations
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::takeoffs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TakeoffModel {
    pub id: i64,
    pub name: String,
    pub centroid: postgis_diesel::types::Point,
    pub created_at: DateTime<Utc>,
}

/// Insert model for new takeoffs
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::takeoffs)]
pub struct NewTakeoffModel {
    pub name: String,
    pub centroid: postgis_diesel::types::Point,
}

impl From<&NewTakeoff> for NewTakeoffModel {
    fn from(takeoff: &NewTakeoff) -> Self {
        Self {
            name: takeoff.name.clone(),
            centroid: takeoff.centroid.to_postgis(),
        }
    }
}

impl From<TakeoffModel> for Takeoff {
    fn from(model: TakeoffModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            centroid: model.centroid.into(),
        }
    }
}
