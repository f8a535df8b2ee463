// src/models/transaction.rs - Immutable payment transaction record

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse geolocation attached to a transaction when the caller knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country: String,
    pub city: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl GeoLocation {
    /// Great-circle distance to another location in kilometers (haversine).
    pub fn distance_km(&self, other: &GeoLocation) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

/// A single payment transaction as observed by the engine. Immutable once
/// created; all rolling state lives on the user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub amount: BigDecimal,
    pub timestamp: DateTime<Utc>,
    pub from_address: String,
    pub to_address: String,
    pub chain: String,
    pub ip_address: Option<String>,
    pub geo: Option<GeoLocation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_new_york_to_tokyo() {
        let new_york = GeoLocation {
            country: "USA".to_string(),
            city: Some("New York".to_string()),
            lat: 40.7128,
            lon: -74.0060,
        };
        let tokyo = GeoLocation {
            country: "JPN".to_string(),
            city: Some("Tokyo".to_string()),
            lat: 35.6762,
            lon: 139.6503,
        };

        let distance = new_york.distance_km(&tokyo);
        assert!((distance - 10_850.0).abs() < 100.0, "got {distance}");
    }

    #[test]
    fn test_haversine_zero_distance() {
        let here = GeoLocation {
            country: "DEU".to_string(),
            city: None,
            lat: 52.52,
            lon: 13.405,
        };
        assert!(here.distance_km(&here) < 1e-9);
    }
}
