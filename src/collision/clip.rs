use glam::Vec3;

use crate::core::hull::Plane;

/// Polygon vertex tagged with the feature id that produced it, so clipped
/// manifold points keep stable identities across frames.
#[derive(Debug, Clone, Copy)]
pub struct ClipVertex {
    pub point: Vec3,
    pub id: u32,
}

/// Deterministic id for a vertex created by a clip plane cutting an edge.
fn clip_id(plane_id: u32, edge_id: u32) -> u32 {
    0x8000_0000 | (plane_id << 16) ^ (edge_id & 0xFFFF)
}

/// Sutherland–Hodgman step: keeps the polygon parts behind `plane`
/// (distance ≤ 0). Intersection vertices inherit an id derived from the
/// clip plane and the cut edge.
pub fn clip_polygon(input: &[ClipVertex], plane: &Plane, plane_id: u32) -> Vec<ClipVertex> {
    let mut output = Vec::with_capacity(input.len() + 2);
    if input.is_empty() {
        return output;
    }

    let mut prev = input[input.len() - 1];
    let mut prev_dist = plane.distance(prev.point);

    for &current in input {
        let dist = plane.distance(current.point);

        if prev_dist <= 0.0 && dist <= 0.0 {
            output.push(current);
        } else if prev_dist <= 0.0 && dist > 0.0 {
            let t = prev_dist / (prev_dist - dist);
            output.push(ClipVertex {
                point: prev.point + t * (current.point - prev.point),
                id: clip_id(plane_id, current.id),
            });
        } else if prev_dist > 0.0 && dist <= 0.0 {
            let t = prev_dist / (prev_dist - dist);
            output.push(ClipVertex {
                point: prev.point + t * (current.point - prev.point),
                id: clip_id(plane_id, prev.id),
            });
            output.push(current);
        }

        prev = current;
        prev_dist = dist;
    }

    output
}

/// Clips a segment against one plane, keeping the part behind it.
pub fn clip_segment(
    segment: &[ClipVertex; 2],
    plane: &Plane,
    plane_id: u32,
) -> Option<[ClipVertex; 2]> {
    let d1 = plane.distance(segment[0].point);
    let d2 = plane.distance(segment[1].point);

    if d1 > 0.0 && d2 > 0.0 {
        return None;
    }
    if d1 <= 0.0 && d2 <= 0.0 {
        return Some(*segment);
    }

    let t = d1 / (d1 - d2);
    let cut = ClipVertex {
        point: segment[0].point + t * (segment[1].point - segment[0].point),
        id: clip_id(plane_id, if d1 > 0.0 { segment[0].id } else { segment[1].id }),
    };
    if d1 > 0.0 {
        Some([cut, segment[1]])
    } else {
        Some([segment[0], cut])
    }
}

/// Candidate contact point before manifold reduction.
#[derive(Debug, Clone, Copy)]
pub struct ContactCandidate {
    pub point: Vec3,
    pub depth: f32,
    pub id: u32,
}

/// Reduces a clipped point set to at most four by the area-maximising
/// heuristic: the deepest point, the point farthest from it, then the two
/// that grow the polygon area the most.
pub fn reduce_points(candidates: &[ContactCandidate], normal: Vec3) -> Vec<ContactCandidate> {
    if candidates.len() <= 4 {
        return candidates.to_vec();
    }

    let mut selected: Vec<ContactCandidate> = Vec::with_capacity(4);

    // 1. Deepest point.
    let first = candidates
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.depth.partial_cmp(&b.depth).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap();
    selected.push(candidates[first]);

    // 2. Farthest from the first.
    let second = candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != first)
        .max_by(|(_, a), (_, b)| {
            let da = (a.point - selected[0].point).length_squared();
            let db = (b.point - selected[0].point).length_squared();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap();
    selected.push(candidates[second]);

    // 3. Largest signed triangle area on either side of the base edge.
    let mut third = None;
    let mut best_area = 0.0_f32;
    for (i, c) in candidates.iter().enumerate() {
        if i == first || i == second {
            continue;
        }
        let area = 0.5
            * (selected[1].point - selected[0].point)
                .cross(c.point - selected[0].point)
                .dot(normal);
        if area.abs() > best_area.abs() {
            best_area = area;
            third = Some(i);
        }
    }
    let third = match third {
        Some(i) => i,
        None => return selected,
    };
    selected.push(candidates[third]);

    // 4. The point adding the most area to the triangle.
    let mut fourth = None;
    let mut best_gain = 0.0_f32;
    for (i, c) in candidates.iter().enumerate() {
        if i == first || i == second || i == third {
            continue;
        }
        // Gain against each triangle edge, keeping the winding opposite
        // to the third point's side.
        for (a, b) in [(0usize, 1usize), (1, 2), (2, 0)] {
            let area = 0.5
                * (selected[b].point - selected[a].point)
                    .cross(c.point - selected[a].point)
                    .dot(normal);
            let gain = if best_area >= 0.0 { -area } else { area };
            if gain > best_gain {
                best_gain = gain;
                fourth = Some(i);
            }
        }
    }
    if let Some(i) = fourth {
        selected.push(candidates[i]);
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn square(size: f32) -> Vec<ClipVertex> {
        vec![
            ClipVertex { point: Vec3::new(-size, 0.0, -size), id: 0 },
            ClipVertex { point: Vec3::new(size, 0.0, -size), id: 1 },
            ClipVertex { point: Vec3::new(size, 0.0, size), id: 2 },
            ClipVertex { point: Vec3::new(-size, 0.0, size), id: 3 },
        ]
    }

    #[test]
    fn clip_keeps_back_side() {
        let plane = Plane::new(Vec3::X, Vec3::ZERO);
        let clipped = clip_polygon(&square(1.0), &plane, 42);
        assert_eq!(clipped.len(), 4);
        for v in &clipped {
            assert!(v.point.x <= 1e-6);
        }
        // Two vertices are synthesized on the cut.
        let synthesized = clipped.iter().filter(|v| v.id & 0x8000_0000 != 0).count();
        assert_eq!(synthesized, 2);
    }

    #[test]
    fn fully_behind_polygon_is_unchanged() {
        let plane = Plane::new(Vec3::X, Vec3::new(5.0, 0.0, 0.0));
        let clipped = clip_polygon(&square(1.0), &plane, 0);
        assert_eq!(clipped.len(), 4);
    }

    #[test]
    fn fully_in_front_polygon_vanishes() {
        let plane = Plane::new(Vec3::X, Vec3::new(-5.0, 0.0, 0.0));
        let clipped = clip_polygon(&square(1.0), &plane, 0);
        assert!(clipped.is_empty());
    }

    #[test]
    fn reduction_keeps_spread_points() {
        // A dense ring of 8 candidates: the reduction should keep 4 that
        // span the ring, always including the deepest.
        let mut candidates = Vec::new();
        for i in 0..8 {
            let angle = i as f32 * std::f32::consts::TAU / 8.0;
            candidates.push(ContactCandidate {
                point: Vec3::new(angle.cos(), 0.0, angle.sin()),
                depth: if i == 2 { 0.3 } else { 0.1 },
                id: i,
            });
        }
        let reduced = reduce_points(&candidates, Vec3::Y);
        assert_eq!(reduced.len(), 4);
        assert!(reduced.iter().any(|c| c.id == 2));

        // The kept quad should cover a substantial share of the ring.
        let quad_extent = reduced
            .iter()
            .flat_map(|a| reduced.iter().map(move |b| (a.point - b.point).length()))
            .fold(0.0, f32::max);
        assert!(quad_extent > 1.5);
    }
}
