//! Procedural shapes used by the drawables.
//!
//! All shapes are triangle lists with outward normals and UVs in `[0, 1]`.
//! Cubes and quads span `[-0.5, 0.5]`, spheres and tori are centred on the origin.

use std::f32::consts::PI;

use crate::data_structures::mesh::{MeshData, Vertex};

/// A unit cube centred at the origin, four vertices per face.
pub fn cube() -> MeshData {
    let mut data = MeshData::new("cube");
    // (normal, tangent u, tangent v) per face
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];
    for (n, u, v) in faces {
        let base = data.vertices.len() as u32;
        for (su, sv) in [(-0.5f32, -0.5f32), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            let position = [
                n[0] * 0.5 + u[0] * su + v[0] * sv,
                n[1] * 0.5 + u[1] * su + v[1] * sv,
                n[2] * 0.5 + u[2] * su + v[2] * sv,
            ];
            data.vertices
                .push(Vertex::new(position, n, [su + 0.5, 0.5 - sv]));
        }
        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    data
}

/// A UV sphere of radius 1.
pub fn sphere(x_segments: u32, y_segments: u32) -> MeshData {
    let mut data = MeshData::new("sphere");
    let x_segments = x_segments.max(3);
    let y_segments = y_segments.max(2);
    for y in 0..=y_segments {
        for x in 0..=x_segments {
            let x_segment = x as f32 / x_segments as f32;
            let y_segment = y as f32 / y_segments as f32;
            let x_pos = (x_segment * 2.0 * PI).cos() * (y_segment * PI).sin();
            let y_pos = (y_segment * PI).cos();
            let z_pos = (x_segment * 2.0 * PI).sin() * (y_segment * PI).sin();
            let p = [x_pos, y_pos, z_pos];
            data.vertices.push(Vertex::new(p, p, [x_segment, y_segment]));
        }
    }
    let row = x_segments + 1;
    for y in 0..y_segments {
        for x in 0..x_segments {
            let a = y * row + x;
            let b = (y + 1) * row + x;
            data.indices
                .extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
        }
    }
    data
}

/// A unit quad in the XY plane facing +Z.
pub fn quad() -> MeshData {
    let mut data = MeshData::new("quad");
    let n = [0.0, 0.0, 1.0];
    data.vertices = vec![
        Vertex::new([-0.5, -0.5, 0.0], n, [0.0, 1.0]),
        Vertex::new([0.5, -0.5, 0.0], n, [1.0, 1.0]),
        Vertex::new([0.5, 0.5, 0.0], n, [1.0, 0.0]),
        Vertex::new([-0.5, 0.5, 0.0], n, [0.0, 0.0]),
    ];
    data.indices = vec![0, 1, 2, 2, 3, 0];
    data
}

/// A unit quad with a different colour in each corner for the vertex-colour shader.
pub fn colored_quad() -> MeshData {
    let mut data = quad();
    data.name = "colored quad".to_string();
    let corners = [
        [1.0, 0.0, 0.0, 1.0],
        [0.0, 1.0, 0.0, 1.0],
        [0.0, 0.0, 1.0, 1.0],
        [1.0, 1.0, 0.0, 1.0],
    ];
    for (vertex, colour) in data.vertices.iter_mut().zip(corners) {
        vertex.color = colour;
    }
    data
}

/// A torus around the Y axis.
pub fn torus(inner_radius: f32, outer_radius: f32, precision: u32) -> MeshData {
    let mut data = MeshData::new("torus");
    let precision = precision.max(3);
    let tube = (outer_radius - inner_radius) / 2.0;
    let ring = inner_radius + tube;
    for i in 0..=precision {
        let around = i as f32 / precision as f32 * 2.0 * PI;
        for j in 0..=precision {
            let tube_angle = j as f32 / precision as f32 * 2.0 * PI;
            let normal = [
                tube_angle.cos() * around.cos(),
                tube_angle.sin(),
                tube_angle.cos() * around.sin(),
            ];
            let position = [
                (ring + tube * tube_angle.cos()) * around.cos(),
                tube * tube_angle.sin(),
                (ring + tube * tube_angle.cos()) * around.sin(),
            ];
            data.vertices.push(Vertex::new(
                position,
                normal,
                [i as f32 / precision as f32, j as f32 / precision as f32],
            ));
        }
    }
    let row = precision + 1;
    for i in 0..precision {
        for j in 0..precision {
            let a = i * row + j;
            let b = (i + 1) * row + j;
            data.indices
                .extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    data
}

/// A cube with corners at ±1 viewed from the inside; the sky shader uses positions as directions.
pub fn skybox() -> MeshData {
    let mut data = cube();
    data.name = "skybox".to_string();
    for vertex in data.vertices.iter_mut() {
        vertex.position = vertex.position.map(|c| c * 2.0);
        vertex.normal = vertex.normal.map(|c| -c);
    }
    data
}

/// Two triangles covering normalized device coordinates.
pub fn fullscreen_quad() -> MeshData {
    let mut data = MeshData::new("fullscreen quad");
    let n = [0.0, 0.0, 1.0];
    data.vertices = vec![
        Vertex::new([-1.0, -1.0, 0.0], n, [0.0, 1.0]),
        Vertex::new([1.0, -1.0, 0.0], n, [1.0, 1.0]),
        Vertex::new([1.0, 1.0, 0.0], n, [1.0, 0.0]),
        Vertex::new([-1.0, 1.0, 0.0], n, [0.0, 0.0]),
    ];
    data.indices = vec![0, 1, 2, 2, 3, 0];
    data
}
