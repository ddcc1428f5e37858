//! Trigonometry and ratio helpers shared by the space builder and the search.

/// Computes sine and cosine for an angle in degrees.
pub(crate) fn sin_cos_deg(angle_deg: f32) -> (f32, f32) {
    angle_deg.to_radians().sin_cos()
}

/// Returns `num / den`, or 0 when the denominator is zero.
pub(crate) fn safe_ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        return 0.0;
    }
    num as f32 / den as f32
}

#[cfg(test)]
mod tests {
    use super::{safe_ratio, sin_cos_deg};

    #[test]
    fn sin_cos_deg_matches_quadrants() {
        let (sin, cos) = sin_cos_deg(90.0);
        assert!(sin > 0.999);
        assert!(cos.abs() < 1e-6);
    }

    #[test]
    fn safe_ratio_guards_zero() {
        assert_eq!(safe_ratio(3, 0), 0.0);
        assert!((safe_ratio(1, 4) - 0.25).abs() < 1e-6);
    }
}
