use super::model::Dataset;
use crate::error::{CleaningError, Result};

// ---------------------------------------------------------------------------
// FilterRange – a closed numeric interval
// ---------------------------------------------------------------------------

/// Inclusive `[min, max]` bounds. Only constructible with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterRange {
    min: f64,
    max: f64,
}

impl FilterRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        // Written so that NaN bounds are rejected as well.
        if !(min <= max) {
            return Err(CleaningError::Config(format!(
                "invalid range: min ({min}) must not exceed max ({max})"
            )));
        }
        Ok(FilterRange { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

// ---------------------------------------------------------------------------
// GeoBoundingBox – a longitude/latitude rectangle
// ---------------------------------------------------------------------------

/// Rectangle in degrees; edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBoundingBox {
    lon_min: f64,
    lon_max: f64,
    lat_min: f64,
    lat_max: f64,
}

impl GeoBoundingBox {
    /// New York City metro area.
    pub const NYC: GeoBoundingBox = GeoBoundingBox {
        lon_min: -74.25,
        lon_max: -73.50,
        lat_min: 40.5,
        lat_max: 41.2,
    };

    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Result<Self> {
        let lon = FilterRange::new(lon_min, lon_max)?;
        let lat = FilterRange::new(lat_min, lat_max)?;
        Ok(GeoBoundingBox {
            lon_min: lon.min,
            lon_max: lon.max,
            lat_min: lat.min,
            lat_max: lat.max,
        })
    }

    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        (self.lon_min..=self.lon_max).contains(&longitude)
            && (self.lat_min..=self.lat_max).contains(&latitude)
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Keep the rows whose `column` value lies inside `range`.
///
/// Nulls and non-numeric values never pass. Row order is preserved and the
/// input is left as it was.
pub fn filter_range(dataset: &Dataset, column: &str, range: &FilterRange) -> Result<Dataset> {
    let idx = dataset.column_index(column)?;
    Ok(dataset.select(|row| row.get(idx).as_f64().is_some_and(|v| range.contains(v))))
}

/// Keep the rows whose (`longitude`, `latitude`) pair falls inside `bbox`.
///
/// A row with either coordinate null or non-numeric is dropped.
pub fn filter_bounding_box(dataset: &Dataset, bbox: &GeoBoundingBox) -> Result<Dataset> {
    let lon_idx = dataset.column_index("longitude")?;
    let lat_idx = dataset.column_index("latitude")?;
    Ok(dataset.select(|row| {
        match (row.get(lon_idx).as_f64(), row.get(lat_idx).as_f64()) {
            (Some(lon), Some(lat)) => bbox.contains(lon, lat),
            _ => false,
        }
    }))
}
