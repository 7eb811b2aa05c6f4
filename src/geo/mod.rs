use crate::error::AppError;
use crate::models::courier::GeoPoint;
use crate::models::zone::ZoneShape;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Tolerance, in degrees, for treating a point as lying on a zone edge.
const BOUNDARY_EPSILON: f64 = 1e-9;

pub fn validate(point: &GeoPoint) -> Result<(), AppError> {
    if !point.lat.is_finite() || !(-90.0..=90.0).contains(&point.lat) {
        return Err(AppError::InvalidCoordinate(format!(
            "latitude {} is outside [-90, 90]",
            point.lat
        )));
    }
    if !point.lng.is_finite() || !(-180.0..=180.0).contains(&point.lng) {
        return Err(AppError::InvalidCoordinate(format!(
            "longitude {} is outside [-180, 180]",
            point.lng
        )));
    }
    Ok(())
}

/// Great-circle distance between two validated points.
pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> Result<f64, AppError> {
    validate(a)?;
    validate(b)?;
    Ok(haversine_km(a, b))
}

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.min(1.0).sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

/// Checks that a zone shape is well formed before it is stored.
pub fn validate_shape(shape: &ZoneShape) -> Result<(), AppError> {
    match shape {
        ZoneShape::Polygon { vertices } => {
            if vertices.len() < 3 {
                return Err(AppError::Validation(
                    "a polygon zone needs at least 3 vertices".to_string(),
                ));
            }
            vertices.iter().try_for_each(validate)
        }
        ZoneShape::Rectangle {
            south_west,
            north_east,
        } => {
            validate(south_west)?;
            validate(north_east)?;
            if south_west.lat > north_east.lat || south_west.lng > north_east.lng {
                return Err(AppError::Validation(
                    "rectangle south_west must be below and left of north_east".to_string(),
                ));
            }
            Ok(())
        }
    }
}

/// Whether `point` lies inside the zone. Points on the boundary count as inside.
pub fn point_in_zone(point: &GeoPoint, shape: &ZoneShape) -> Result<bool, AppError> {
    validate(point)?;

    let inside = match shape {
        ZoneShape::Rectangle {
            south_west,
            north_east,
        } => {
            (south_west.lat..=north_east.lat).contains(&point.lat)
                && (south_west.lng..=north_east.lng).contains(&point.lng)
        }
        ZoneShape::Polygon { vertices } => point_in_polygon(point, vertices),
    };

    Ok(inside)
}

fn point_in_polygon(point: &GeoPoint, vertices: &[GeoPoint]) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let (x, y) = (point.lng, point.lat);
    let mut inside = false;
    let mut j = vertices.len() - 1;

    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].lng, vertices[i].lat);
        let (xj, yj) = (vertices[j].lng, vertices[j].lat);

        if on_segment(x, y, xi, yi, xj, yj) {
            return true;
        }

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

fn on_segment(x: f64, y: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> bool {
    let cross = (x - x1) * (y2 - y1) - (y - y1) * (x2 - x1);
    if cross.abs() > BOUNDARY_EPSILON {
        return false;
    }

    x >= x1.min(x2) - BOUNDARY_EPSILON
        && x <= x1.max(x2) + BOUNDARY_EPSILON
        && y >= y1.min(y2) - BOUNDARY_EPSILON
        && y <= y1.max(y2) + BOUNDARY_EPSILON
}
