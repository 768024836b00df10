// mesh.rs - CPU-side geometry for planes and (partial) UV spheres

use crate::scene::SphereSpec;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Vertex layout matches three.js `SphereGeometry`: u runs along phi, v from
/// the top pole (v = 1) to the bottom (v = 0).
pub fn build_sphere(spec: &SphereSpec) -> MeshData {
    let w = spec.segments_width.max(3) as usize;
    let h = spec.segments_height.max(2) as usize;
    let phi_start = spec.phi_start.to_radians();
    let phi_len = spec.phi_length.to_radians();
    let theta_start = spec.theta_start.to_radians();
    let theta_len = spec.theta_length.to_radians();

    let mut vertices = Vec::with_capacity((w + 1) * (h + 1));
    for iy in 0..=h {
        let v = iy as f32 / h as f32;
        let theta = theta_start + v * theta_len;
        let (sin_t, cos_t) = theta.sin_cos();

        for ix in 0..=w {
            let u = ix as f32 / w as f32;
            let phi = phi_start + u * phi_len;
            let (sin_p, cos_p) = phi.sin_cos();

            vertices.push(Vertex {
                position: [
                    -spec.radius * cos_p * sin_t,
                    spec.radius * cos_t,
                    spec.radius * sin_p * sin_t,
                ],
                uv: [u, 1.0 - v],
            });
        }
    }

    let row = w + 1;
    let mut indices = Vec::with_capacity(w * h * 6);
    for iy in 0..h {
        for ix in 0..w {
            let a = (iy * row + ix + 1) as u32;
            let b = (iy * row + ix) as u32;
            let c = ((iy + 1) * row + ix) as u32;
            let d = ((iy + 1) * row + ix + 1) as u32;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    MeshData { vertices, indices }
}

/// Plane in the XY plane facing +Z, centred on the origin.
pub fn build_plane(width: f32, height: f32) -> MeshData {
    let (hw, hh) = (width / 2.0, height / 2.0);
    let vertices = vec![
        Vertex { position: [-hw, hh, 0.0], uv: [0.0, 1.0] },
        Vertex { position: [hw, hh, 0.0], uv: [1.0, 1.0] },
        Vertex { position: [-hw, -hh, 0.0], uv: [0.0, 0.0] },
        Vertex { position: [hw, -hh, 0.0], uv: [1.0, 0.0] },
    ];
    MeshData {
        vertices,
        indices: vec![0, 2, 1, 2, 3, 1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn full_sphere_counts_and_radius() {
        let mesh = build_sphere(&SphereSpec::full(500.0, 100, 50));
        assert_eq!(mesh.vertices.len(), 101 * 51);
        assert_eq!(mesh.indices.len(), 100 * 50 * 6);
        for v in &mesh.vertices {
            let [x, y, z] = v.position;
            assert!(close((x * x + y * y + z * z).sqrt(), 500.0));
        }
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn hemisphere_stays_on_one_side() {
        let spec = SphereSpec {
            radius: 20.0,
            segments_width: 100,
            segments_height: 50,
            phi_start: 0.0,
            phi_length: 180.0,
            theta_start: 0.0,
            theta_length: 180.0,
        };
        let mesh = build_sphere(&spec);
        // z = r sin(phi) sin(theta) is never negative for phi in [0, pi]
        assert!(mesh.vertices.iter().all(|v| v.position[2] > -1e-3));
        assert_eq!(mesh.vertices[0].uv, [0.0, 1.0]);
        assert_eq!(mesh.vertices.last().unwrap().uv, [1.0, 0.0]);
    }

    #[test]
    fn plane_extent() {
        let mesh = build_plane(4.0, 3.0);
        assert_eq!(mesh.vertices[0].position, [-2.0, 1.5, 0.0]);
        assert_eq!(mesh.vertices[3].position, [2.0, -1.5, 0.0]);
        assert_eq!(mesh.indices.len(), 6);
    }
}
