use serde::{Deserialize, Serialize};

/// SRID for WGS84 coordinates
pub const WGS84_SRID: u32 = 4326;

/// Simple Point struct for WGS84 coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Rejects NaN and out-of-range coordinates
    pub fn is_valid(&self) -> bool {
        (-180.0..=180.0).contains(&self.longitude) && (-90.0..=90.0).contains(&self.latitude)
    }

    pub fn to_postgis(self) -> postgis_diesel::types::Point {
        postgis_diesel::types::Point {
            x: self.longitude,
            y: self.latitude,
            srid: Some(WGS84_SRID),
        }
    }
}

impl From<postgis_diesel::types::Point> for GeoPoint {
    fn from(point: postgis_diesel::types::Point) -> Self {
        Self::new(point.x, point.y)
    }
}
