//! Distance-field unions.
//!
//! Pairwise operators combine two distance values; the `_list` variants fold
//! a slice strictly left to right. The smooth, chamfer and stairs operators
//! are not associative, so the fold order is part of the result.

/// Smooth minimum with a quadratic kernel of radius `r`.
///
/// `min(a, b) - max(r - |a - b|, 0)² · 0.25 / r`
pub fn blend_union(a: f64, b: f64, r: f64) -> f64 {
    if r <= 0.0 {
        return a.min(b);
    }
    let e = (r - (a - b).abs()).max(0.0);
    a.min(b) - e * e * 0.25 / r
}

/// Chamfered minimum with chamfer size `r`.
pub fn chamfer_union(a: f64, b: f64, r: f64) -> f64 {
    a.min(b).min((a - r + b) * std::f64::consts::FRAC_1_SQRT_2)
}

/// Stepped minimum with radius `r` and `n` steps.
pub fn stairs_union(a: f64, b: f64, r: f64, n: u32) -> f64 {
    if n == 0 || r <= 0.0 {
        return a.min(b);
    }
    let s = r / f64::from(n);
    let u = b - r;
    a.min(b)
        .min(0.5 * (u + a + ((u - a + s).rem_euclid(2.0 * s) - s).abs()))
}

/// Left fold of [`blend_union`]. Returns `f64::INFINITY` for an empty slice.
pub fn blend_union_list(values: &[f64], r: f64) -> f64 {
    fold(values, |acc, d| blend_union(acc, d, r))
}

/// Left fold of [`chamfer_union`].
pub fn chamfer_union_list(values: &[f64], r: f64) -> f64 {
    fold(values, |acc, d| chamfer_union(acc, d, r))
}

/// Left fold of [`stairs_union`].
pub fn stairs_union_list(values: &[f64], r: f64, n: u32) -> f64 {
    fold(values, |acc, d| stairs_union(acc, d, r, n))
}

fn fold(values: &[f64], op: impl Fn(f64, f64) -> f64) -> f64 {
    values
        .iter()
        .copied()
        .reduce(op)
        .unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_blend_union_far_apart_is_min() {
        assert_relative_eq!(blend_union(1.0, 20.0, 5.0), 1.0);
    }

    #[test]
    fn test_blend_union_equal_values() {
        // e = r, so the result dips by r/4 below the minimum
        assert_relative_eq!(blend_union(3.0, 3.0, 4.0), 3.0 - 1.0);
    }

    #[test]
    fn test_blend_union_partial_overlap() {
        // |a-b| = 1, r = 3 -> e = 2 -> 4 * 0.25 / 3
        assert_relative_eq!(blend_union(2.0, 3.0, 3.0), 2.0 - 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_list_fold_is_left_to_right() {
        let values = [5.0, 5.5, 6.0];
        let r = 2.0;
        let expected = blend_union(blend_union(5.0, 5.5, r), 6.0, r);
        assert_relative_eq!(blend_union_list(&values, r), expected);
        assert!(blend_union_list(&[], r).is_infinite());
    }

    #[test]
    fn test_chamfer_and_stairs_never_exceed_min() {
        for (a, b) in [(1.0, 2.0), (4.0, 4.0), (10.0, 0.5)] {
            assert!(chamfer_union(a, b, 1.5) <= a.min(b) + 1e-12);
            assert!(stairs_union(a, b, 1.5, 3) <= a.min(b) + 1e-12);
        }
    }
}
