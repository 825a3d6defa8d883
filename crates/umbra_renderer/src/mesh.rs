//! Triangle meshes.
//!
//! Triangles are tested with the Möller-Trumbore algorithm through a BVH
//! built over the triangle bounds. Vertex normals and UVs are optional and
//! interpolated with the barycentric coordinates of the hit.

use crate::{Bvh, BvhSettings, Intersect, MaterialId, MeshError, Primitive};
use std::f32::consts::PI;
use umbra_math::{Aabb, Ray, Vec2, Vec3};

/// Determinant threshold below which a ray is parallel to a triangle.
const EPSILON: f32 = 1e-6;

/// Raw mesh attributes.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    /// Per-vertex normals, empty for flat shading
    pub normals: Vec<Vec3>,
    /// Per-vertex UVs, empty to use barycentric coordinates
    pub uvs: Vec<Vec2>,
    /// Three indices per triangle
    pub indices: Vec<u32>,
}

/// Barycentric hit on a single triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
    /// Ray arrived from the back side
    pub backface: bool,
}

/// Möller-Trumbore ray-triangle intersection.
///
/// Accepts parameters inside the ray's interval; degenerate triangles and
/// parallel rays miss.
pub fn intersect_triangle(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let det = edge1.dot(h);

    // Ray is parallel to triangle
    if det.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / det;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if !ray.contains(t) {
        return None;
    }

    Some(TriangleHit {
        t,
        u,
        v,
        backface: det < 0.0,
    })
}

/// An indexed triangle mesh with its own BVH.
#[derive(Debug, Clone)]
pub struct Mesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<[u32; 3]>,
    bvh: Bvh,
    bounds: Aabb,
    material: MaterialId,
}

impl Mesh {
    pub fn new(data: MeshData, material: MaterialId) -> Result<Self, MeshError> {
        Self::with_settings(data, material, &BvhSettings::MESH)
    }

    pub fn with_settings(
        data: MeshData,
        material: MaterialId,
        settings: &BvhSettings,
    ) -> Result<Self, MeshError> {
        let MeshData {
            positions,
            normals,
            uvs,
            indices,
        } = data;

        if indices.len() % 3 != 0 {
            return Err(MeshError::IndexCount(indices.len()));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: positions.len(),
            });
        }
        for (attribute, found) in [("normal", normals.len()), ("uv", uvs.len())] {
            if found != 0 && found != positions.len() {
                return Err(MeshError::AttributeCount {
                    attribute,
                    expected: positions.len(),
                    found,
                });
            }
        }

        let triangles: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();

        let triangle_bounds: Vec<Aabb> = triangles
            .iter()
            .map(|tri| {
                let [a, b, c] = tri.map(|i| positions[i as usize]);
                Aabb::from_points(a.min(b).min(c), a.max(b).max(c))
            })
            .collect();

        let bvh = Bvh::build(&triangle_bounds, settings);
        log::debug!(
            "Mesh BVH: {} triangles, {} nodes, depth {}",
            triangles.len(),
            bvh.node_count(),
            bvh.depth()
        );

        Ok(Self {
            bounds: bvh.bounds(),
            positions,
            normals: normals.into_iter().map(|n| n.normalize_or_zero()).collect(),
            uvs,
            triangles,
            bvh,
            material,
        })
    }

    /// Tessellated sphere with smooth normals and spherical UVs.
    pub fn uv_sphere(
        radius: f32,
        segments: u32,
        rings: u32,
        material: MaterialId,
    ) -> Result<Self, MeshError> {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut data = MeshData::default();

        for ring in 0..=rings {
            let v = ring as f32 / rings as f32;
            let theta = v * PI;
            for segment in 0..=segments {
                let u = segment as f32 / segments as f32;
                let phi = u * 2.0 * PI;
                let n = Vec3::new(theta.sin() * phi.cos(), -theta.cos(), theta.sin() * phi.sin());
                data.positions.push(n * radius);
                data.normals.push(n);
                data.uvs.push(Vec2::new(u, v));
            }
        }

        let stride = segments + 1;
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * stride + segment;
                let b = a + stride;
                // Counter-clockwise seen from outside. Pole rows collapse to
                // degenerate triangles; skip them
                if ring != 0 {
                    data.indices.extend_from_slice(&[a, b, a + 1]);
                }
                if ring != rings - 1 {
                    data.indices.extend_from_slice(&[a + 1, b, b + 1]);
                }
            }
        }

        Self::new(data, material)
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn vertices(&self, triangle: u32) -> [Vec3; 3] {
        self.triangles[triangle as usize].map(|i| self.positions[i as usize])
    }
}

impl Primitive for Mesh {
    fn bounds(&self) -> Aabb {
        self.bounds
    }

    fn hit(&self, hit: &mut Intersect<'_>) -> bool {
        let ray = hit.local_ray;
        let mut best: Option<(usize, TriangleHit)> = None;

        let result = self.bvh.hit(&ray, |index, closest| {
            let [v0, v1, v2] = self.vertices(index as u32);
            match intersect_triangle(&ray.with_max(closest), v0, v1, v2) {
                Some(tri) if tri.t < closest => {
                    best = Some((index, tri));
                    tri.t
                }
                _ => -1.0,
            }
        });

        match (result.item, best) {
            (Some(_), Some((index, tri))) => {
                hit.t = tri.t;
                hit.inside = tri.backface;
                hit.triangle = Some(index as u32);
                hit.barycentric = Vec2::new(tri.u, tri.v);
                true
            }
            _ => false,
        }
    }

    fn intersect(&self, hit: &mut Intersect<'_>) {
        let Some(triangle) = hit.triangle else {
            return;
        };
        let [i0, i1, i2] = self.triangles[triangle as usize].map(|i| i as usize);
        let (u, v) = (hit.barycentric.x, hit.barycentric.y);
        let w = 1.0 - u - v;

        let face = {
            let [v0, v1, v2] = self.vertices(triangle);
            (v1 - v0).cross(v2 - v0).normalize_or_zero()
        };
        hit.normal = if self.normals.is_empty() {
            face
        } else {
            let n = self.normals[i0] * w + self.normals[i1] * u + self.normals[i2] * v;
            let n = n.normalize_or_zero();
            if n == Vec3::ZERO {
                face
            } else {
                n
            }
        };

        hit.uv = if self.uvs.is_empty() {
            Vec2::new(u, v)
        } else {
            self.uvs[i0] * w + self.uvs[i1] * u + self.uvs[i2] * v
        };
    }

    fn material(&self) -> MaterialId {
        self.material
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshData {
        MeshData {
            positions: vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
            ..Default::default()
        }
    }

    fn local_hit(mesh: &Mesh, ray: Ray) -> Option<Intersect<'static>> {
        let mut hit = Intersect::new(ray);
        if mesh.hit(&mut hit) {
            hit.position = hit.local_ray.at(hit.t);
            mesh.intersect(&mut hit);
            Some(hit)
        } else {
            None
        }
    }

    #[test]
    fn test_triangle_hit() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), -Vec3::Z);
        let hit = intersect_triangle(
            &ray,
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -1.0),
        )
        .expect("ray at triangle centre must hit");

        assert!((hit.t - 2.0).abs() < 1e-5);
        assert!(hit.u >= 0.0 && hit.v >= 0.0 && hit.u + hit.v <= 1.0);
    }

    #[test]
    fn test_triangle_miss_and_parallel() {
        let v0 = Vec3::new(-1.0, -1.0, -1.0);
        let v1 = Vec3::new(1.0, -1.0, -1.0);
        let v2 = Vec3::new(0.0, 1.0, -1.0);

        assert!(intersect_triangle(&Ray::new(Vec3::ZERO, Vec3::Z), v0, v1, v2).is_none());
        let parallel = Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::X);
        assert!(intersect_triangle(&parallel, v0, v1, v2).is_none());
    }

    #[test]
    fn test_degenerate_triangle_misses() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), -Vec3::Z);
        assert!(intersect_triangle(&ray, Vec3::ZERO, Vec3::X, Vec3::X * 2.0).is_none());
    }

    #[test]
    fn test_mesh_validation() {
        let mut bad = quad();
        bad.indices.push(0);
        assert_eq!(Mesh::new(bad, MaterialId::default()).err(), Some(MeshError::IndexCount(7)));

        let mut bad = quad();
        bad.indices[4] = 9;
        assert_eq!(
            Mesh::new(bad, MaterialId::default()).err(),
            Some(MeshError::IndexOutOfRange {
                index: 9,
                vertex_count: 4
            })
        );

        let mut bad = quad();
        bad.normals = vec![Vec3::Z];
        assert!(matches!(
            Mesh::new(bad, MaterialId::default()),
            Err(MeshError::AttributeCount { attribute: "normal", .. })
        ));
    }

    #[test]
    fn test_mesh_quad_hit() {
        let mesh = Mesh::new(quad(), MaterialId::default()).expect("valid quad");
        let hit = local_hit(&mesh, Ray::new(Vec3::new(0.5, 0.25, 3.0), -Vec3::Z))
            .expect("quad hit");

        assert!((hit.t - 3.0).abs() < 1e-5);
        assert!(hit.triangle.is_some());
        assert!(!hit.inside);
        assert!((hit.normal - Vec3::Z).length() < 1e-5);

        let back = local_hit(&mesh, Ray::new(Vec3::new(0.5, 0.25, -3.0), Vec3::Z))
            .expect("back hit");
        assert!(back.inside);

        assert!(local_hit(&mesh, Ray::new(Vec3::new(2.0, 0.0, 3.0), -Vec3::Z)).is_none());
    }

    #[test]
    fn test_uv_sphere_approximates_sphere() {
        let mesh = Mesh::uv_sphere(1.0, 32, 16, MaterialId::default()).expect("generated sphere");
        assert!(mesh.triangle_count() > 0);

        let hit = local_hit(&mesh, Ray::new(Vec3::new(0.1, 0.2, 5.0), -Vec3::Z))
            .expect("sphere hit");
        assert!((hit.t - 4.0).abs() < 0.05, "t = {}", hit.t);
        assert!(!hit.inside, "outside rays hit front faces");
        assert!((hit.normal.length() - 1.0).abs() < 1e-4);
        assert!(hit.normal.z > 0.9);
        assert!((0.0..=1.0).contains(&hit.uv.x) && (0.0..=1.0).contains(&hit.uv.y));
    }
}
