use glam::Vec3;

use crate::config;
use crate::core::shape::GjkProxy;
use crate::core::transform::Transform;

use super::gjk::{gjk_distance, SimplexCache};

const MAX_ITERATIONS: u32 = 24;

/// Outcome of a time-of-impact query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToiState {
    /// No touch within `[0, t_max]`.
    Separated,
    /// Earliest touch found at `t`.
    Touching,
    /// Already intersecting at `t = 0`.
    Overlapped,
    /// The root finder hit its iteration cap. Callers treat this as
    /// "no hit" and may fall back to a linear cast.
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct ToiOutput {
    pub state: ToiState,
    pub t: f32,
}

/// Conservative advancement: earliest `t ∈ [0, t_max]` at which the two
/// proxies touch under linear displacements `d_a` and `d_b`.
///
/// Alternates GJK distance queries at the candidate time with advancement
/// steps bounded by the closing speed along the current separating axis.
/// Rotation is not swept; this primitive backs shape-cast queries where
/// the cast shape translates only.
pub fn time_of_impact(
    xf_a: &Transform,
    proxy_a: &GjkProxy,
    d_a: Vec3,
    xf_b: &Transform,
    proxy_b: &GjkProxy,
    d_b: Vec3,
    t_max: f32,
) -> ToiOutput {
    let tolerance = config::LINEAR_SLOP;
    let mut cache = SimplexCache::default();
    let mut t = 0.0_f32;

    for iteration in 0..MAX_ITERATIONS {
        let at = Transform::new(xf_a.position + t * d_a, xf_a.rotation);
        let bt = Transform::new(xf_b.position + t * d_b, xf_b.rotation);

        let query = gjk_distance(&at, proxy_a, &bt, proxy_b, true, Some(&mut cache));

        if query.distance <= tolerance {
            if iteration == 0 && query.distance <= 0.0 {
                return ToiOutput {
                    state: ToiState::Overlapped,
                    t: 0.0,
                };
            }
            return ToiOutput {
                state: ToiState::Touching,
                t,
            };
        }

        let normal = (query.point_b - query.point_a) / query.distance;
        let closing_speed = (d_a - d_b).dot(normal);
        if closing_speed <= f32::EPSILON {
            return ToiOutput {
                state: ToiState::Separated,
                t: t_max,
            };
        }

        // Separation along a fixed axis changes linearly, so this step
        // cannot overshoot the surface.
        t += (query.distance - 0.5 * tolerance) / closing_speed;
        if t > t_max {
            return ToiOutput {
                state: ToiState::Separated,
                t: t_max,
            };
        }
    }

    log::debug!("time_of_impact: iteration cap reached at t={t}");
    ToiOutput {
        state: ToiState::Failed,
        t,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shape::Shape;
    use approx::assert_relative_eq;

    #[test]
    fn sphere_cast_hits_static_sphere() {
        let a = Shape::sphere(0.5);
        let b = Shape::sphere(0.5);
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(5.0, 0.0, 0.0));

        let out = time_of_impact(
            &xf_a,
            &a.gjk_proxy(0),
            Vec3::new(8.0, 0.0, 0.0),
            &xf_b,
            &b.gjk_proxy(0),
            Vec3::ZERO,
            1.0,
        );
        assert_eq!(out.state, ToiState::Touching);
        // Touch when centers are 1.0 apart: t = 4/8.
        assert_relative_eq!(out.t, 0.5, epsilon = 0.01);
    }

    #[test]
    fn miss_reports_separated() {
        let a = Shape::sphere(0.5);
        let b = Shape::sphere(0.5);
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(5.0, 3.0, 0.0));

        let out = time_of_impact(
            &xf_a,
            &a.gjk_proxy(0),
            Vec3::new(8.0, 0.0, 0.0),
            &xf_b,
            &b.gjk_proxy(0),
            Vec3::ZERO,
            1.0,
        );
        assert_eq!(out.state, ToiState::Separated);
    }

    #[test]
    fn initial_overlap_detected() {
        let a = Shape::cuboid(Vec3::splat(0.5));
        let b = Shape::cuboid(Vec3::splat(0.5));
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.25, 0.0, 0.0));

        let out = time_of_impact(
            &xf_a,
            &a.gjk_proxy(0),
            Vec3::X,
            &xf_b,
            &b.gjk_proxy(0),
            Vec3::ZERO,
            1.0,
        );
        assert_eq!(out.state, ToiState::Overlapped);
    }
}
