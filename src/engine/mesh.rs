// Mesh types, unit primitives and triangulation.
//
// Two-layer architecture:
//   PolyMesh (n-gon faces, CPU-side editing) → triangulate_smooth() → RenderMesh → GPU
//
// Procedural anatomy is drawn by instancing four unit primitives (box, sphere,
// cone, cylinder), each centered on the origin and spanning [-0.5, 0.5] on every
// axis, so an instance scale equals the part's full size.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

// ============================================================================
// GPU VERTEX
// ============================================================================

/// GPU-ready vertex with position and normal.
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
}

impl GpuVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

// ============================================================================
// POLY MESH
// ============================================================================

/// Intermediate polygon mesh. Faces are CCW when viewed from outside.
/// Not GPU-ready; triangulate into a `RenderMesh` first.
#[derive(Clone, Debug, Default)]
pub struct PolyMesh {
    pub positions: Vec<Vec3>,
    pub faces:     Vec<Vec<usize>>,
}

impl PolyMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, pos: Vec3) -> usize {
        let idx = self.positions.len();
        self.positions.push(pos);
        idx
    }

    /// Add a face by vertex indices (CCW order).
    pub fn add_face(&mut self, indices: Vec<usize>) {
        debug_assert!(indices.len() >= 3, "Face must have at least 3 vertices");
        self.faces.push(indices);
    }

    pub fn vertex_count(&self) -> usize { self.positions.len() }
}

// ============================================================================
// RENDER MESH
// ============================================================================

/// GPU-ready triangulated mesh with per-vertex normals.
/// Upload vertex_bytes() to a VERTEX buffer, index_bytes() to an INDEX buffer.
#[derive(Clone, Debug, Default)]
pub struct RenderMesh {
    pub vertices: Vec<GpuVertex>,
    pub indices:  Vec<u32>,
}

impl RenderMesh {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn index_count(&self) -> usize  { self.indices.len() }

    pub fn triangle_count(&self) -> usize { self.indices.len() / 3 }

    pub fn is_empty(&self) -> bool { self.indices.is_empty() }
}

// ============================================================================
// BOUNDS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Bounds of a point set, `None` when empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Aabb { min: first, max: first }, |b, p| Aabb {
            min: b.min.min(*p),
            max: b.max.max(*p),
        }))
    }

    pub fn center(&self) -> Vec3 { (self.min + self.max) * 0.5 }

    pub fn size(&self) -> Vec3 { self.max - self.min }
}

// ============================================================================
// TRIANGULATION + SMOOTH NORMALS
// ============================================================================

/// Convert a PolyMesh to a RenderMesh with smooth (area-weighted) normals.
///
///   1. Accumulate area-weighted face normals per vertex (cross product
///      magnitude = 2×triangle area).
///   2. Normalize each accumulated normal.
///   3. Fan-triangulate each face from vertex 0.
pub fn triangulate_smooth(poly: &PolyMesh) -> RenderMesh {
    let mut normal_accum: Vec<Vec3> = vec![Vec3::ZERO; poly.vertex_count()];

    for face in &poly.faces {
        for i in 1..(face.len() - 1) {
            let a = poly.positions[face[0]];
            let b = poly.positions[face[i]];
            let c = poly.positions[face[i + 1]];
            let weighted_normal = (b - a).cross(c - a);
            normal_accum[face[0]]     += weighted_normal;
            normal_accum[face[i]]     += weighted_normal;
            normal_accum[face[i + 1]] += weighted_normal;
        }
    }

    let vertices: Vec<GpuVertex> = poly.positions.iter()
        .zip(normal_accum.iter())
        .map(|(pos, n)| GpuVertex {
            position: pos.to_array(),
            normal:   n.normalize_or_zero().to_array(),
        })
        .collect();

    let mut indices: Vec<u32> = Vec::new();
    for face in &poly.faces {
        for i in 1..(face.len() - 1) {
            indices.push(face[0]     as u32);
            indices.push(face[i]     as u32);
            indices.push(face[i + 1] as u32);
        }
    }

    RenderMesh { vertices, indices }
}

// ============================================================================
// UNIT PRIMITIVES
// ============================================================================

/// Segment count around the circumference of round primitives.
const ROUND_SEGMENTS: usize = 24;
/// Latitude rings of the UV sphere.
const SPHERE_RINGS: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveShape {
    Box,
    Sphere,
    Cone,
    Cylinder,
}

impl PrimitiveShape {
    pub const ALL: [PrimitiveShape; 4] = [
        PrimitiveShape::Box,
        PrimitiveShape::Sphere,
        PrimitiveShape::Cone,
        PrimitiveShape::Cylinder,
    ];

    pub fn poly_mesh(self) -> PolyMesh {
        match self {
            PrimitiveShape::Box => unit_box(),
            PrimitiveShape::Sphere => unit_sphere(ROUND_SEGMENTS, SPHERE_RINGS),
            PrimitiveShape::Cone => unit_cone(ROUND_SEGMENTS),
            PrimitiveShape::Cylinder => unit_cylinder(ROUND_SEGMENTS),
        }
    }

    pub fn render_mesh(self) -> RenderMesh {
        triangulate_smooth(&self.poly_mesh())
    }
}

/// Axis-aligned unit cube, half-extent 0.5.
///
/// Vertex layout:
///   0: (-r, -r, +r)  front-bottom-left
///   1: (+r, -r, +r)  front-bottom-right
///   2: (+r, +r, +r)  front-top-right
///   3: (-r, +r, +r)  front-top-left
///   4: (+r, -r, -r)  back-bottom-right
///   5: (-r, -r, -r)  back-bottom-left
///   6: (-r, +r, -r)  back-top-left
///   7: (+r, +r, -r)  back-top-right
pub fn unit_box() -> PolyMesh {
    let r = 0.5;
    let mut mesh = PolyMesh::new();
    mesh.add_vertex(Vec3::new(-r, -r,  r));
    mesh.add_vertex(Vec3::new( r, -r,  r));
    mesh.add_vertex(Vec3::new( r,  r,  r));
    mesh.add_vertex(Vec3::new(-r,  r,  r));
    mesh.add_vertex(Vec3::new( r, -r, -r));
    mesh.add_vertex(Vec3::new(-r, -r, -r));
    mesh.add_vertex(Vec3::new(-r,  r, -r));
    mesh.add_vertex(Vec3::new( r,  r, -r));

    mesh.add_face(vec![0, 1, 2, 3]); // front  (+Z)
    mesh.add_face(vec![4, 5, 6, 7]); // back   (-Z)
    mesh.add_face(vec![5, 0, 3, 6]); // left   (-X)
    mesh.add_face(vec![1, 4, 7, 2]); // right  (+X)
    mesh.add_face(vec![3, 2, 7, 6]); // top    (+Y)
    mesh.add_face(vec![5, 4, 1, 0]); // bottom (-Y)
    mesh
}

/// UV sphere of radius 0.5. Ring 0 is the north pole; pole rows produce
/// one degenerate triangle per quad, which contributes a zero normal.
pub fn unit_sphere(segments: usize, rings: usize) -> PolyMesh {
    let mut mesh = PolyMesh::new();
    let row = segments + 1;

    for r in 0..=rings {
        let theta = PI * r as f32 / rings as f32;
        for s in 0..=segments {
            let phi = TAU * s as f32 / segments as f32;
            mesh.add_vertex(0.5 * Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()));
        }
    }

    // (r, s) → (r, s+1) → (r+1, s+1) → (r+1, s) winds outward.
    for r in 0..rings {
        for s in 0..segments {
            let a = r * row + s;
            let b = a + row;
            mesh.add_face(vec![a, a + 1, b + 1, b]);
        }
    }
    mesh
}

/// Cone with a base of radius 0.5 at y = -0.5 and its apex at y = +0.5.
/// Each side triangle gets its own apex vertex so normals stay conical.
pub fn unit_cone(segments: usize) -> PolyMesh {
    let mut mesh = PolyMesh::new();
    let ring = circle(segments, -0.5);

    let side: Vec<usize> = ring.iter().map(|&p| mesh.add_vertex(p)).collect();
    for s in 0..segments {
        let next = (s + 1) % segments;
        let apex = mesh.add_vertex(Vec3::new(0.0, 0.5, 0.0));
        mesh.add_face(vec![side[s], apex, side[next]]);
    }

    let base: Vec<usize> = ring.iter().map(|&p| mesh.add_vertex(p)).collect();
    mesh.add_face(base);
    mesh
}

/// Cylinder of radius 0.5 along Y, from y = -0.5 to y = +0.5.
/// Caps use their own vertices so side normals are not bent toward the axis.
pub fn unit_cylinder(segments: usize) -> PolyMesh {
    let mut mesh = PolyMesh::new();
    let bottom_ring = circle(segments, -0.5);
    let top_ring = circle(segments, 0.5);

    let bottom: Vec<usize> = bottom_ring.iter().map(|&p| mesh.add_vertex(p)).collect();
    let top: Vec<usize> = top_ring.iter().map(|&p| mesh.add_vertex(p)).collect();
    for s in 0..segments {
        let next = (s + 1) % segments;
        mesh.add_face(vec![bottom[s], top[s], top[next], bottom[next]]);
    }

    let bottom_cap: Vec<usize> = bottom_ring.iter().map(|&p| mesh.add_vertex(p)).collect();
    mesh.add_face(bottom_cap);
    let top_cap: Vec<usize> = top_ring.iter().rev().map(|&p| mesh.add_vertex(p)).collect();
    mesh.add_face(top_cap);
    mesh
}

/// Points on a radius-0.5 circle in the XZ plane, angle increasing from +X toward +Z.
/// Viewed from below this order is CCW, so it is the correct winding for a bottom cap.
fn circle(segments: usize, y: f32) -> Vec<Vec3> {
    (0..segments)
        .map(|s| {
            let phi = TAU * s as f32 / segments as f32;
            Vec3::new(0.5 * phi.cos(), y, 0.5 * phi.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every non-degenerate triangle of a convex shape centered on the origin
    /// must face away from the origin.
    fn assert_outward(mesh: &RenderMesh, name: &str) {
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(mesh.vertices[i as usize].position));
            let normal = (b - a).cross(c - a);
            if normal.length() < 1e-6 {
                continue;
            }
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0, "{name}: inward triangle at {centroid:?}");
        }
    }

    #[test]
    fn unit_primitives_wind_outward() {
        for shape in PrimitiveShape::ALL {
            let mesh = shape.render_mesh();
            assert!(!mesh.is_empty(), "{shape:?}");
            assert_outward(&mesh, &format!("{shape:?}"));
        }
    }

    #[test]
    fn unit_primitives_fit_the_unit_cube() {
        for shape in PrimitiveShape::ALL {
            let poly = shape.poly_mesh();
            let bounds = Aabb::from_points(&poly.positions).unwrap();
            assert!(bounds.min.cmpge(Vec3::splat(-0.5 - 1e-5)).all(), "{shape:?}");
            assert!(bounds.max.cmple(Vec3::splat(0.5 + 1e-5)).all(), "{shape:?}");
            assert!((bounds.size().y - 1.0).abs() < 1e-5, "{shape:?}");
        }
    }

    #[test]
    fn cube_triangulation_counts() {
        let mesh = triangulate_smooth(&unit_box());
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        for v in &mesh.vertices {
            let n = Vec3::from(v.normal);
            assert!((n.length() - 1.0).abs() < 1e-5);
            // Corner normals point along the corner diagonal.
            assert!(n.dot(Vec3::from(v.position)) > 0.0);
        }
    }

    #[test]
    fn aabb_of_points() {
        let pts = [Vec3::new(1.0, -2.0, 0.5), Vec3::new(-1.0, 4.0, 0.0)];
        let b = Aabb::from_points(&pts).unwrap();
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 4.0, 0.5));
        assert_eq!(b.center(), Vec3::new(0.0, 1.0, 0.25));
        assert!(Aabb::from_points(&[]).is_none());
    }
}
