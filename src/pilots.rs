use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// A pilot as listed on the site; the username is the stable key
#[derive(Debug, Clone, PartialEq, Eq, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::pilots)]
pub struct NewPilot {
    /// Display name, e.g. "Flavius Ionita"
    pub name: String,
    /// Username from the pilot's profile link, e.g. "flaviusionita"
    pub username: String,
}

/// Stored pilot row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pilot {
    pub id: i64,
    pub name: String,
    pub username: String,
}

/// Diesel model for the pilots table - used for database operations
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::pilots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PilotModel {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<PilotModel> for Pilot {
    fn from(model: PilotModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            username: model.username,
        }
    }
}
