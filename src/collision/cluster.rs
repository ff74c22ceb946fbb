use arrayvec::ArrayVec;
use glam::Vec3;

use crate::config::{MAX_MANIFOLDS, MAX_MANIFOLD_POINTS};

use super::clip::{reduce_points, ContactCandidate};
use super::manifold::{FeatureKey, Manifold, ManifoldPoint};

const MAX_ITERATIONS: u32 = 20;

/// One raw contact point from a per-triangle manifold, before clustering.
#[derive(Debug, Clone, Copy)]
pub struct ClusterObservation {
    pub local_point_a: Vec3,
    pub local_point_b: Vec3,
    /// Contact normal in the mesh fixture's frame.
    pub normal: Vec3,
    pub depth: f32,
    pub key: FeatureKey,
}

/// Groups raw mesh-contact points into at most [`MAX_MANIFOLDS`] manifolds
/// of at most [`MAX_MANIFOLD_POINTS`] well-separated points each.
///
/// Clustering runs k-means in normal space with deterministic
/// farthest-point seeding; each cluster is then reduced by the
/// area-maximising point selection.
pub fn cluster_manifolds(observations: &[ClusterObservation]) -> ArrayVec<Manifold, MAX_MANIFOLDS> {
    let mut out = ArrayVec::new();
    if observations.is_empty() {
        return out;
    }

    // Farthest-point seeding: first seed is the first observation's
    // normal, each next seed maximises distance to the chosen set.
    let k = MAX_MANIFOLDS.min(observations.len());
    let mut centroids: Vec<Vec3> = Vec::with_capacity(k);
    centroids.push(observations[0].normal);
    while centroids.len() < k {
        let mut best = None;
        let mut best_dist = -1.0_f32;
        for (i, obs) in observations.iter().enumerate() {
            let nearest = centroids
                .iter()
                .map(|c| (obs.normal - *c).length_squared())
                .fold(f32::INFINITY, f32::min);
            if nearest > best_dist {
                best_dist = nearest;
                best = Some(i);
            }
        }
        match best {
            // Stop early if every normal already coincides with a seed.
            Some(i) if best_dist > 1e-4 => centroids.push(observations[i].normal),
            _ => break,
        }
    }

    let mut assignment = vec![0usize; observations.len()];
    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;

        for (i, obs) in observations.iter().enumerate() {
            let mut best = 0usize;
            let mut best_dist = f32::INFINITY;
            for (j, centroid) in centroids.iter().enumerate() {
                let dist = (obs.normal - *centroid).length_squared();
                if dist < best_dist {
                    best_dist = dist;
                    best = j;
                }
            }
            if assignment[i] != best {
                assignment[i] = best;
                changed = true;
            }
        }

        for (j, centroid) in centroids.iter_mut().enumerate() {
            let mut sum = Vec3::ZERO;
            let mut count = 0;
            for (i, obs) in observations.iter().enumerate() {
                if assignment[i] == j {
                    sum += obs.normal;
                    count += 1;
                }
            }
            if count > 0 {
                *centroid = (sum / count as f32).normalize_or_zero();
            }
        }

        if !changed {
            break;
        }
    }

    for (j, centroid) in centroids.iter().enumerate() {
        let members: Vec<&ClusterObservation> = observations
            .iter()
            .enumerate()
            .filter(|(i, _)| assignment[*i] == j)
            .map(|(_, obs)| obs)
            .collect();
        if members.is_empty() {
            continue;
        }

        let candidates: Vec<ContactCandidate> = members
            .iter()
            .enumerate()
            .map(|(i, obs)| ContactCandidate {
                point: obs.local_point_a,
                depth: obs.depth,
                id: i as u32,
            })
            .collect();
        let reduced = if candidates.len() > MAX_MANIFOLD_POINTS {
            reduce_points(&candidates, *centroid)
        } else {
            candidates
        };

        let mut manifold = Manifold {
            local_normal: *centroid,
            ..Default::default()
        };
        for candidate in reduced.iter().take(MAX_MANIFOLD_POINTS) {
            let obs = members[candidate.id as usize];
            manifold.points.push(ManifoldPoint::new(
                obs.local_point_a,
                obs.local_point_b,
                obs.key,
            ));
        }
        if !manifold.points.is_empty() {
            out.push(manifold);
        }
        if out.is_full() {
            break;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(point: Vec3, normal: Vec3, depth: f32, triangle: u32) -> ClusterObservation {
        ClusterObservation {
            local_point_a: point,
            local_point_b: point,
            normal,
            depth,
            key: FeatureKey {
                key_a: 0,
                key_b: 0,
                triangle,
            },
        }
    }

    #[test]
    fn coplanar_points_collapse_to_one_manifold() {
        // Sphere resting on four flat triangles: one cluster, ≤4 points.
        let mut obs = Vec::new();
        for i in 0..6 {
            let angle = i as f32;
            obs.push(observation(
                Vec3::new(angle.cos() * 0.1, 0.0, angle.sin() * 0.1),
                Vec3::Y,
                0.01 * i as f32,
                i,
            ));
        }
        let clusters = cluster_manifolds(&obs);
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].points.len() <= MAX_MANIFOLD_POINTS);
        assert!(clusters[0].local_normal.y > 0.99);
    }

    #[test]
    fn distinct_normals_split_clusters() {
        // A corner: floor and wall normals must not merge.
        let obs = vec![
            observation(Vec3::ZERO, Vec3::Y, 0.01, 0),
            observation(Vec3::new(0.1, 0.0, 0.0), Vec3::Y, 0.01, 1),
            observation(Vec3::new(0.0, 0.1, 0.0), Vec3::X, 0.01, 2),
            observation(Vec3::new(0.0, 0.2, 0.0), Vec3::X, 0.01, 3),
        ];
        let clusters = cluster_manifolds(&obs);
        assert_eq!(clusters.len(), 2);

        let mut normals: Vec<Vec3> = clusters.iter().map(|m| m.local_normal).collect();
        normals.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap());
        assert!(normals[0].y > 0.99);
        assert!(normals[1].x > 0.99);
    }

    #[test]
    fn keys_carry_triangle_indices() {
        let obs = vec![
            observation(Vec3::ZERO, Vec3::Y, 0.01, 7),
            observation(Vec3::X, Vec3::Y, 0.01, 9),
        ];
        let clusters = cluster_manifolds(&obs);
        let triangles: Vec<u32> = clusters[0].points.iter().map(|p| p.key.triangle).collect();
        assert!(triangles.contains(&7));
        assert!(triangles.contains(&9));
    }

    #[test]
    fn output_is_bounded() {
        // Many wildly varying normals still produce at most 3 manifolds.
        let mut obs = Vec::new();
        for i in 0..24 {
            let a = i as f32 * 0.7;
            obs.push(observation(
                Vec3::new(a.cos(), 0.0, a.sin()),
                Vec3::new(a.cos(), a.sin().abs(), a.sin()).normalize(),
                0.01,
                i,
            ));
        }
        let clusters = cluster_manifolds(&obs);
        assert!(clusters.len() <= MAX_MANIFOLDS);
        for cluster in &clusters {
            assert!(cluster.points.len() <= MAX_MANIFOLD_POINTS);
        }
    }
}
