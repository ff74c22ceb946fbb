use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::aabb::Aabb;

const NULL_NODE: u32 = u32::MAX;
/// Marks a boundary edge with no coplanar neighbor vertex.
pub const NO_WING: u32 = u32::MAX;

/// Node of the immutable triangle-mesh AABB tree. Leaves reference one
/// triangle; internal nodes reference two children.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BvhNode {
    pub bounds: Aabb,
    pub left: u32,
    pub right: u32,
    pub triangle: u32,
}

impl BvhNode {
    pub fn is_leaf(&self) -> bool {
        self.left == NULL_NODE
    }
}

/// Static median-split AABB tree over mesh triangles. Built once with the
/// mesh and never refitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticBvh {
    nodes: Vec<BvhNode>,
    root: u32,
}

impl StaticBvh {
    fn build(bounds: &[Aabb]) -> Self {
        let mut nodes = Vec::with_capacity(2 * bounds.len().max(1));
        let mut order: Vec<u32> = (0..bounds.len() as u32).collect();
        let root = if bounds.is_empty() {
            NULL_NODE
        } else {
            Self::build_recursive(&mut nodes, bounds, &mut order)
        };
        Self { nodes, root }
    }

    fn build_recursive(nodes: &mut Vec<BvhNode>, bounds: &[Aabb], range: &mut [u32]) -> u32 {
        let mut node_bounds = Aabb::empty();
        for &t in range.iter() {
            node_bounds.combine_with(&bounds[t as usize]);
        }

        if range.len() == 1 {
            let index = nodes.len() as u32;
            nodes.push(BvhNode {
                bounds: node_bounds,
                left: NULL_NODE,
                right: NULL_NODE,
                triangle: range[0],
            });
            return index;
        }

        // Median split along the widest axis of the centroid bounds.
        let mut centroid_bounds = Aabb::empty();
        for &t in range.iter() {
            let c = bounds[t as usize].center();
            centroid_bounds.min = centroid_bounds.min.min(c);
            centroid_bounds.max = centroid_bounds.max.max(c);
        }
        let size = centroid_bounds.max - centroid_bounds.min;
        let axis = if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        };

        range.sort_unstable_by(|&a, &b| {
            let ca = bounds[a as usize].center()[axis];
            let cb = bounds[b as usize].center()[axis];
            ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mid = range.len() / 2;
        let index = nodes.len() as u32;
        nodes.push(BvhNode {
            bounds: node_bounds,
            left: NULL_NODE,
            right: NULL_NODE,
            triangle: NULL_NODE,
        });

        let (left_range, right_range) = range.split_at_mut(mid);
        let left = Self::build_recursive(nodes, bounds, left_range);
        let right = Self::build_recursive(nodes, bounds, right_range);
        nodes[index as usize].left = left;
        nodes[index as usize].right = right;
        index
    }

    /// Visits every leaf whose bounds overlap `aabb`. The callback returns
    /// `false` to stop the traversal early.
    pub fn query(&self, aabb: &Aabb, mut callback: impl FnMut(u32) -> bool) {
        if self.root == NULL_NODE {
            return;
        }
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if !node.bounds.overlaps(aabb) {
                continue;
            }
            if node.is_leaf() {
                if !callback(node.triangle) {
                    return;
                }
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
    }

    /// Visits every leaf whose bounds the segment `p1 → p2` touches.
    /// The callback returns an updated max fraction to shorten the ray, or
    /// a non-positive value to stop.
    pub fn ray_cast(&self, p1: Vec3, p2: Vec3, mut callback: impl FnMut(u32, f32) -> f32) {
        if self.root == NULL_NODE {
            return;
        }
        let mut max_fraction = 1.0_f32;
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if node.bounds.ray_cast(p1, p2, max_fraction).is_none() {
                continue;
            }
            if node.is_leaf() {
                let new_fraction = callback(node.triangle, max_fraction);
                if new_fraction <= 0.0 {
                    return;
                }
                max_fraction = max_fraction.min(new_fraction);
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Mesh triangle: three vertex indices plus the wing vertex across each
/// edge. `wings[i]` is the neighbor triangle's vertex opposite the edge
/// `(verts[i], verts[(i + 1) % 3])`, or [`NO_WING`] on the boundary. Wing
/// vertices classify concave internal edges during collision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MeshTriangle {
    pub verts: [u32; 3],
    pub wings: [u32; 3],
}

/// Immutable triangle mesh collider data with its AABB tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<MeshTriangle>,
    pub bounds: Aabb,
    bvh: StaticBvh,
}

impl TriangleMesh {
    pub fn builder(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> MeshBuilder {
        MeshBuilder { vertices, indices }
    }

    /// Flat terrain-style grid in the XZ plane: `(nx + 1) × (nz + 1)`
    /// vertices spaced by `spacing`, centered at the origin, with heights
    /// from `height`.
    pub fn grid(nx: usize, nz: usize, spacing: f32, mut height: impl FnMut(usize, usize) -> f32) -> Self {
        let mut vertices = Vec::with_capacity((nx + 1) * (nz + 1));
        for iz in 0..=nz {
            for ix in 0..=nx {
                vertices.push(Vec3::new(
                    (ix as f32 - nx as f32 * 0.5) * spacing,
                    height(ix, iz),
                    (iz as f32 - nz as f32 * 0.5) * spacing,
                ));
            }
        }
        let stride = (nx + 1) as u32;
        let mut indices = Vec::with_capacity(nx * nz * 2);
        for iz in 0..nz as u32 {
            for ix in 0..nx as u32 {
                let v00 = iz * stride + ix;
                let v10 = v00 + 1;
                let v01 = v00 + stride;
                let v11 = v01 + 1;
                indices.push([v00, v11, v10]);
                indices.push([v00, v01, v11]);
            }
        }
        Self::builder(vertices, indices).build()
    }

    pub fn bvh(&self) -> &StaticBvh {
        &self.bvh
    }

    pub fn triangle_vertices(&self, index: u32) -> (Vec3, Vec3, Vec3) {
        let tri = &self.triangles[index as usize];
        (
            self.vertices[tri.verts[0] as usize],
            self.vertices[tri.verts[1] as usize],
            self.vertices[tri.verts[2] as usize],
        )
    }

    pub fn triangle_bounds(&self, index: u32) -> Aabb {
        let (a, b, c) = self.triangle_vertices(index);
        Aabb::from_points(&[a, b, c])
    }
}

/// Cooks triangle meshes from raw vertex/index buffers.
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    vertices: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
}

impl MeshBuilder {
    /// Deduplicates vertices on a quantized grid so shared edges actually
    /// share indices; wing vertices depend on that.
    pub fn weld_vertices(mut self, epsilon: f32) -> Self {
        if epsilon <= 0.0 || self.vertices.is_empty() {
            return self;
        }

        let inv = 1.0 / epsilon;
        let mut map: HashMap<(i32, i32, i32), u32> = HashMap::new();
        let mut welded: Vec<Vec3> = Vec::new();
        let mut remap: Vec<u32> = Vec::with_capacity(self.vertices.len());

        for v in &self.vertices {
            let key = (
                (v.x * inv).round() as i32,
                (v.y * inv).round() as i32,
                (v.z * inv).round() as i32,
            );
            let index = *map.entry(key).or_insert_with(|| {
                let idx = welded.len() as u32;
                welded.push(*v);
                idx
            });
            remap.push(index);
        }

        for tri in &mut self.indices {
            for v in tri.iter_mut() {
                *v = remap[*v as usize];
            }
        }
        self.vertices = welded;
        self
    }

    pub fn build(self) -> TriangleMesh {
        // Directed-edge map: edge (a, b) of a triangle pairs with (b, a) of
        // its neighbor; the neighbor's opposite vertex is the wing.
        let mut opposite: HashMap<(u32, u32), u32> = HashMap::new();
        for tri in &self.indices {
            for i in 0..3 {
                let a = tri[i];
                let b = tri[(i + 1) % 3];
                let c = tri[(i + 2) % 3];
                opposite.insert((a, b), c);
            }
        }

        let triangles: Vec<MeshTriangle> = self
            .indices
            .iter()
            .map(|tri| {
                let mut wings = [NO_WING; 3];
                for i in 0..3 {
                    let a = tri[i];
                    let b = tri[(i + 1) % 3];
                    if let Some(&w) = opposite.get(&(b, a)) {
                        wings[i] = w;
                    }
                }
                MeshTriangle { verts: *tri, wings }
            })
            .collect();

        let triangle_bounds: Vec<Aabb> = triangles
            .iter()
            .map(|tri| {
                Aabb::from_points(&[
                    self.vertices[tri.verts[0] as usize],
                    self.vertices[tri.verts[1] as usize],
                    self.vertices[tri.verts[2] as usize],
                ])
            })
            .collect();

        let bvh = StaticBvh::build(&triangle_bounds);
        let bounds = Aabb::from_points(&self.vertices);

        TriangleMesh {
            vertices: self.vertices,
            triangles,
            bounds,
            bvh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_builds_connected_triangles() {
        let mesh = TriangleMesh::grid(4, 4, 1.0, |_, _| 0.0);
        assert_eq!(mesh.triangles.len(), 32);

        // Interior edges carry wing vertices, the outer rim does not.
        let wings: usize = mesh
            .triangles
            .iter()
            .flat_map(|t| t.wings.iter())
            .filter(|&&w| w != NO_WING)
            .count();
        assert!(wings > 0);
        let boundary: usize = mesh
            .triangles
            .iter()
            .flat_map(|t| t.wings.iter())
            .filter(|&&w| w == NO_WING)
            .count();
        assert!(boundary > 0);
    }

    #[test]
    fn bvh_query_finds_overlapping_triangles() {
        let mesh = TriangleMesh::grid(10, 10, 1.0, |_, _| 0.0);
        let probe = Aabb::from_center(Vec3::ZERO, Vec3::new(0.6, 0.5, 0.6));
        let mut hits = Vec::new();
        mesh.bvh().query(&probe, |tri| {
            hits.push(tri);
            true
        });
        assert!(!hits.is_empty());
        for tri in hits {
            assert!(mesh.triangle_bounds(tri).overlaps(&probe));
        }
    }

    #[test]
    fn bvh_ray_cast_prunes_far_leaves() {
        let mesh = TriangleMesh::grid(10, 10, 1.0, |_, _| 0.0);
        let mut visited = 0;
        mesh.bvh()
            .ray_cast(Vec3::new(0.1, 5.0, 0.1), Vec3::new(0.1, -5.0, 0.1), |_, max| {
                visited += 1;
                max
            });
        assert!(visited >= 1);
        assert!(visited < mesh.triangles.len());
    }

    #[test]
    fn weld_merges_duplicate_vertices() {
        let vertices = vec![
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0000001, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0000001),
            Vec3::new(1.0, 0.0, 1.0),
        ];
        let indices = vec![[0, 2, 1], [3, 4, 5]];
        let mesh = TriangleMesh::builder(vertices, indices)
            .weld_vertices(1e-4)
            .build();
        assert_eq!(mesh.vertices.len(), 4);
        // The shared diagonal now carries wings on both triangles.
        let wings: usize = mesh
            .triangles
            .iter()
            .flat_map(|t| t.wings.iter())
            .filter(|&&w| w != NO_WING)
            .count();
        assert_eq!(wings, 2);
    }
}
