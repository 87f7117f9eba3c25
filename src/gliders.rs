use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Glider model and its certification class ("A".."D", "CCC", ...)
#[derive(Debug, Clone, PartialEq, Eq, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::gliders)]
pub struct NewGlider {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glider {
    pub id: i64,
    pub name: String,
    pub category: String,
}

/// Diesel model for the gliders table
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::gliders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GliderModel {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl From<GliderModel> for Glider {
    fn from(model: GliderModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            category: model.category,
        }
    }
}
