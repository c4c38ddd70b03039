//! Ray and box geometry for detector intersection tests.
//!
//! Contains helper functions for:
//! - Slab-method ray vs. axis-aligned box intersection
//! - Squared distance (avoids a sqrt in hot paths)
//!
//! All edge cases are encoded as `Option`/values; no function here panics or
//! returns an error for ordinary geometric rejection.

use nalgebra::Vector3;

/// Below this magnitude a direction component is treated as parallel to the
/// slab axis and produces no finite clipping interval.
pub const PARALLEL_AXIS_EPSILON: f64 = 1e-12;

/// Squared Euclidean distance (avoids a sqrt in hot paths).
///
/// Comparisons against a radius are done as d² vs r² throughout the spatial
/// index, so the square root is never taken in the candidate scan.
pub fn distance2(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (a - b).norm_squared()
}

/// Slab-method intersection of a ray with an axis-aligned box.
///
/// Clips the ray's parametric interval against each axis pair of box faces:
/// for axis `i`, `t1 = (box_min[i] - origin[i]) / direction[i]` and
/// `t2 = (box_max[i] - origin[i]) / direction[i]`, keeping
/// `t_near = max(min(t1, t2))` and `t_far = min(max(t1, t2))`.
///
/// ## Degenerate case handling
///
/// A ray parallel to a slab axis (`|direction[i]| < PARALLEL_AXIS_EPSILON`)
/// intersects only if the origin already lies within that slab; otherwise the
/// test fails immediately regardless of the other axes.
///
/// A box entirely behind the ray origin (`t_far < 0`) is rejected, never
/// mirrored. An origin inside the box clips `t_near` to 0 so the track
/// starts at the current position.
///
/// # Returns
///
/// `Some((t_near, t_far))` with `0 <= t_near <= t_far` when the ray crosses
/// the box ahead of its origin, `None` otherwise.
pub fn ray_box_intersection(
    origin: &Vector3<f64>,
    direction: &Vector3<f64>,
    box_min: &Vector3<f64>,
    box_max: &Vector3<f64>,
) -> Option<(f64, f64)> {
    let mut t_near = f64::NEG_INFINITY;
    let mut t_far = f64::INFINITY;

    for i in 0..3 {
        if direction[i].abs() < PARALLEL_AXIS_EPSILON {
            // Parallel to this slab: the origin must already be inside it.
            if origin[i] < box_min[i] || origin[i] > box_max[i] {
                return None;
            }
            continue;
        }
        let t1 = (box_min[i] - origin[i]) / direction[i];
        let t2 = (box_max[i] - origin[i]) / direction[i];
        t_near = t_near.max(t1.min(t2));
        t_far = t_far.min(t1.max(t2));
    }

    if t_near > t_far {
        return None;
    }
    if t_far < 0.0 {
        // Box entirely behind the ray origin.
        return None;
    }

    Some((t_near.max(0.0), t_far))
}
