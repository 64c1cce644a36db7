use std::f64::consts::PI;

use itertools::izip;

/// Maps any longitude into [-180, 180), remapping 0-360 grid extents
pub fn normalize_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Calculates the scalar magnitude from uv vector components
pub fn uv_to_magnitude(u: f64, v: f64) -> f64 {
    (u.powi(2) + v.powi(2)).sqrt()
}

/// Calculates the compass direction the vector is coming from, in degrees
/// clockwise from north. Total over all inputs; the zero vector maps to 270.
pub fn uv_to_direction(u: f64, v: f64) -> f64 {
    (270.0 - (v.atan2(u) * (180.0 / PI))).rem_euclid(360.0)
}

/// Calculates the u component from a magnitude and a compass direction
pub fn mag_dir_to_u(magnitude: f64, direction: f64) -> f64 {
    -magnitude * (direction * PI / 180.0).sin()
}

/// Calculates the v component from a magnitude and a compass direction
pub fn mag_dir_to_v(magnitude: f64, direction: f64) -> f64 {
    -magnitude * (direction * PI / 180.0).cos()
}

/// Normalizes a whole longitude column in place
pub fn normalize_longitudes(lons: &mut [f64]) {
    for lon in lons.iter_mut() {
        *lon = normalize_longitude(*lon);
    }
}

pub fn uv_to_magnitudes(u: &[f64], v: &[f64]) -> Vec<f64> {
    izip!(u, v).map(|(u, v)| uv_to_magnitude(*u, *v)).collect()
}

pub fn uv_to_directions(u: &[f64], v: &[f64]) -> Vec<f64> {
    izip!(u, v).map(|(u, v)| uv_to_direction(*u, *v)).collect()
}

pub fn mag_dir_to_us(magnitudes: &[f64], directions: &[f64]) -> Vec<f64> {
    izip!(magnitudes, directions)
        .map(|(m, d)| mag_dir_to_u(*m, *d))
        .collect()
}

pub fn mag_dir_to_vs(magnitudes: &[f64], directions: &[f64]) -> Vec<f64> {
    izip!(magnitudes, directions)
        .map(|(m, d)| mag_dir_to_v(*m, *d))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_longitude() {
        let cases = vec![
            (190.0, -170.0),
            (0.0, 0.0),
            (359.5, -0.5),
            (360.0, 0.0),
            (-190.0, 170.0),
            (540.0, -180.0),
            (-180.0, -180.0),
        ];

        for (input, expected) in cases {
            let normalized = normalize_longitude(input);
            assert!(
                (normalized - expected).abs() < 1e-9,
                "normalize_longitude({}) = {}, expected {}",
                input,
                normalized,
                expected
            );
        }
    }

    #[test]
    fn test_normalize_longitude_idempotent_and_in_range() {
        let samples = vec![
            -720.5, -360.0, -185.0, -180.0, -1.0, 0.0, 179.99, 180.0, 359.0, 723.25,
        ];

        for lon in samples {
            let once = normalize_longitude(lon);
            let twice = normalize_longitude(once);
            assert!((once - twice).abs() < 1e-12);
            assert!(once >= -180.0 && once < 180.0, "{} out of range", once);
        }
    }

    #[test]
    fn test_uv_to_direction_known_values() {
        // Northward vector comes from the south, westward from the east
        assert!((uv_to_direction(0.0, 1.0) - 180.0).abs() < 1e-9);
        assert!((uv_to_direction(0.0, -1.0) - 0.0).abs() < 1e-9);
        assert!((uv_to_direction(1.0, 0.0) - 270.0).abs() < 1e-9);
        assert!((uv_to_direction(-1.0, 0.0) - 90.0).abs() < 1e-9);
        assert!((uv_to_direction(3.0, 4.0) - 216.86989764584402).abs() < 1e-9);
    }

    #[test]
    fn test_uv_to_direction_zero_vector() {
        assert_eq!(uv_to_direction(0.0, 0.0), 270.0);
    }

    #[test]
    fn test_uv_to_magnitude() {
        assert!((uv_to_magnitude(3.0, 4.0) - 5.0).abs() < 1e-12);
        assert!((uv_to_magnitude(-3.0, -4.0) - 5.0).abs() < 1e-12);
        assert_eq!(uv_to_magnitude(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_uv_round_trip() {
        let components = vec![
            (3.0, 4.0),
            (-3.79485, 0.55966),
            (12.5, -8.25),
            (-0.001, -0.002),
            (1.0e6, 1.0),
        ];

        for (u, v) in components {
            let magnitude = uv_to_magnitude(u, v);
            let direction = uv_to_direction(u, v);
            let u_back = mag_dir_to_u(magnitude, direction);
            let v_back = mag_dir_to_v(magnitude, direction);

            assert!(
                (u_back - u).abs() <= 1e-9 * magnitude,
                "u round trip failed for ({}, {}): {}",
                u,
                v,
                u_back
            );
            assert!(
                (v_back - v).abs() <= 1e-9 * magnitude,
                "v round trip failed for ({}, {}): {}",
                u,
                v,
                v_back
            );
        }
    }

    #[test]
    fn test_elementwise_columns() {
        let u = vec![3.0, 0.0];
        let v = vec![4.0, 0.0];

        let magnitudes = uv_to_magnitudes(&u, &v);
        let directions = uv_to_directions(&u, &v);
        assert_eq!(magnitudes, vec![5.0, 0.0]);
        assert_eq!(directions[1], 270.0);

        let u_back = mag_dir_to_us(&magnitudes, &directions);
        let v_back = mag_dir_to_vs(&magnitudes, &directions);
        assert!((u_back[0] - 3.0).abs() < 1e-9);
        assert!((v_back[0] - 4.0).abs() < 1e-9);

        let mut lons = vec![190.0, 10.0];
        normalize_longitudes(&mut lons);
        assert_eq!(lons, vec![-170.0, 10.0]);
    }
}
