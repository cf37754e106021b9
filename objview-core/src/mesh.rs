/// Expansion of indexed OBJ data into flat, centered draw buffers
use log::{debug, info};
use nalgebra::Vector3;

use crate::error::{IndexKind, MeshError, Result};
use crate::geometry::{Triangle, Vertex};
use crate::obj::ObjData;

/// Target extent of the largest axis at the default zoom
pub const ZOOM_LEVEL_FAR: f32 = 4.0;

/// Axis-aligned bounds of the raw positions (normals are not included)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingExtent {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl BoundingExtent {
    /// Single pass over the points, seeded from the first one.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_points(points: &[Vector3<f32>]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut extent = Self {
            min: *first,
            max: *first,
        };
        for point in rest {
            extent.min = extent.min.inf(point);
            extent.max = extent.max.sup(point);
        }
        Some(extent)
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) / 2.0
    }

    /// Per-axis size of the box
    pub fn spans(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn max_span(&self) -> f32 {
        let spans = self.spans();
        spans.x.max(spans.y).max(spans.z)
    }
}

/// Non-indexed vertex and normal buffers ready for a triangle-list draw
///
/// Both buffers hold 3 floats per vertex and 3 vertices per face, in face
/// order, so index `k` of one always pairs with index `k` of the other.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatMesh {
    vertices: Vec<f32>,
    normals: Vec<f32>,
    extent: BoundingExtent,
    scale: f32,
}

impl FlatMesh {
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    /// Uniform scale that makes the largest axis span [`ZOOM_LEVEL_FAR`] units.
    /// Not baked into the buffers.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Bounds of the source positions before centering
    pub fn extent(&self) -> &BoundingExtent {
        &self.extent
    }

    /// The point that was subtracted from every position
    pub fn center(&self) -> Vector3<f32> {
        self.extent.center()
    }

    /// Number of draw vertices (three per face)
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn face_count(&self) -> usize {
        self.vertices.len() / 9
    }

    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.vertices
            .chunks_exact(9)
            .zip(self.normals.chunks_exact(9))
            .map(|(p, n)| {
                Triangle::new(
                    Vertex::from_slices(&p[0..3], &n[0..3]),
                    Vertex::from_slices(&p[3..6], &n[3..6]),
                    Vertex::from_slices(&p[6..9], &n[6..9]),
                )
            })
    }
}

pub struct MeshBuilder;

impl MeshBuilder {
    /// Expand every face into its own three (position, normal) pairs.
    ///
    /// Positions are shifted so the bounding box center sits at the origin;
    /// normals are copied unchanged.
    pub fn build(data: &ObjData) -> Result<FlatMesh> {
        let extent =
            BoundingExtent::from_points(&data.vertices).ok_or(MeshError::EmptyMesh("vertices"))?;
        if data.faces.is_empty() {
            return Err(MeshError::EmptyMesh("faces"));
        }

        let span = extent.max_span();
        if !(span > 0.0 && span.is_finite()) {
            return Err(MeshError::DegenerateGeometry { span });
        }
        let scale = ZOOM_LEVEL_FAR / span;
        let center = extent.center();
        debug!(
            "Extent min {:?} max {:?}, center {:?}, scale {}",
            extent.min.as_slice(),
            extent.max.as_slice(),
            center.as_slice(),
            scale
        );

        let len = data.faces.len() * 9;
        let mut vertices = Vec::with_capacity(len);
        let mut normals = Vec::with_capacity(len);

        for (face_number, face) in data.faces.iter().enumerate() {
            for corner in &face.corners {
                let position = lookup(&data.vertices, corner.vertex, face_number, IndexKind::Vertex)?;
                let normal = lookup(&data.normals, corner.normal, face_number, IndexKind::Normal)?;
                vertices.extend((position - center).iter());
                normals.extend(normal.iter());
            }
        }

        info!(
            "Built {} faces ({} draw vertices), scale {:.4}",
            data.faces.len(),
            vertices.len() / 3,
            scale
        );

        Ok(FlatMesh {
            vertices,
            normals,
            extent,
            scale,
        })
    }
}

fn lookup(
    list: &[Vector3<f32>],
    index: usize,
    face: usize,
    kind: IndexKind,
) -> Result<Vector3<f32>> {
    list.get(index).copied().ok_or(MeshError::IndexOutOfRange {
        face,
        kind,
        index: index + 1,
        len: list.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obj::ObjParser;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    const CUBE: &str = "\
v -1.0 -1.0  1.0
v  1.0 -1.0  1.0
v  1.0  1.0  1.0
v -1.0  1.0  1.0
v -1.0 -1.0 -1.0
v  1.0 -1.0 -1.0
v  1.0  1.0 -1.0
v -1.0  1.0 -1.0
vn 0 0 1
vn 0 0 -1
vn 0 1 0
vn 0 -1 0
vn 1 0 0
vn -1 0 0
f 1//1 2//1 3//1
f 1//1 3//1 4//1
f 6//2 5//2 8//2
f 6//2 8//2 7//2
f 4//3 3//3 7//3
f 4//3 7//3 8//3
f 5//4 6//4 2//4
f 5//4 2//4 1//4
f 2//5 6//5 7//5
f 2//5 7//5 3//5
f 5//6 1//6 4//6
f 5//6 4//6 8//6
";

    fn build_str(text: &str) -> Result<FlatMesh> {
        let data = ObjParser::parse(Cursor::new(text.as_bytes()))?;
        MeshBuilder::build(&data)
    }

    #[test]
    fn test_buffer_lengths() {
        let mesh = build_str(CUBE).unwrap();
        assert_eq!(mesh.face_count(), 12);
        assert_eq!(mesh.vertices().len(), 9 * 12);
        assert_eq!(mesh.normals().len(), mesh.vertices().len());
        assert_eq!(mesh.vertex_count(), 3 * 12);
        assert_eq!(mesh.triangles().count(), 12);
    }

    #[test]
    fn test_cube_scale() {
        let mesh = build_str(CUBE).unwrap();
        assert_relative_eq!(mesh.scale(), 2.0);
        assert_relative_eq!(mesh.center(), Vector3::zeros());
    }

    #[test]
    fn test_buffers_are_centered() {
        let offset = CUBE
            .lines()
            .map(|line| match line.strip_prefix("v ") {
                Some(rest) => {
                    let coords: Vec<f32> = rest
                        .split_whitespace()
                        .map(|c| c.parse::<f32>().unwrap())
                        .collect();
                    format!("v {} {} {}", coords[0] + 10.0, coords[1] + 3.0, coords[2] - 7.0)
                }
                None => line.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n");
        let mesh = build_str(&offset).unwrap();
        assert_relative_eq!(mesh.center(), Vector3::new(10.0, 3.0, -7.0), epsilon = 1e-5);

        let points: Vec<Vector3<f32>> = mesh
            .vertices()
            .chunks_exact(3)
            .map(|p| Vector3::new(p[0], p[1], p[2]))
            .collect();
        let centered = BoundingExtent::from_points(&points).unwrap();
        assert_relative_eq!(centered.center(), Vector3::zeros(), epsilon = 1e-5);
        assert_relative_eq!(mesh.scale(), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_extent_is_seeded_from_first_vertex() {
        // Entirely in positive space: the minimum is the true minimum, not 0.
        let mesh = build_str("v 1 1 1\nv 3 2 2\nv 2 3 1\nvn 0 0 1\nf 1//1 2//1 3//1\n").unwrap();
        let extent = mesh.extent();
        assert_eq!(extent.min, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(extent.max, Vector3::new(3.0, 3.0, 2.0));
        assert_relative_eq!(mesh.center(), Vector3::new(2.0, 2.0, 1.5));
        assert_relative_eq!(mesh.scale(), 2.0);
    }

    #[test]
    fn test_single_face_end_to_end() {
        let text = "\
v 0.0 0.0 0.0
v 2.0 0.0 0.0
v 0.0 4.0 0.0
vn 0.1 0.2 0.3
vn 0.4 0.5 0.6
vn 0.7 0.8 0.9
f 3/1/1 1/1/2 2/1/3
";
        let mesh = build_str(text).unwrap();
        // center is (1, 2, 0)
        let expected_vertices: [f32; 9] = [-1.0, 2.0, 0.0, -1.0, -2.0, 0.0, 1.0, -2.0, 0.0];
        let expected_normals: [f32; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];
        assert_eq!(mesh.vertices(), &expected_vertices);
        assert_eq!(mesh.normals(), &expected_normals);
        assert_relative_eq!(mesh.scale(), 1.0);

        let triangle = mesh.triangles().next().unwrap();
        assert_eq!(triangle.vertices[0], Vertex::new(-1.0, 2.0, 0.0, 0.1, 0.2, 0.3));
    }

    #[test]
    fn test_vertices_are_not_shared_between_faces() {
        let mesh = build_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\nf 1//1 2//1 3//1\n")
            .unwrap();
        assert_eq!(mesh.vertices().len(), 18);
        assert_eq!(&mesh.vertices()[0..9], &mesh.vertices()[9..18]);
    }

    #[test]
    fn test_degenerate_geometry() {
        let err = build_str("v 1 1 1\nv 1 1 1\nv 1 1 1\nvn 0 0 1\nf 1//1 2//1 3//1\n").unwrap_err();
        assert!(matches!(err, MeshError::DegenerateGeometry { .. }));
    }

    #[test]
    fn test_empty_inputs() {
        let err = build_str("vn 0 0 1\n").unwrap_err();
        assert!(matches!(err, MeshError::EmptyMesh("vertices")));

        let err = build_str("v 0 0 0\nv 1 1 1\n").unwrap_err();
        assert!(matches!(err, MeshError::EmptyMesh("faces")));
    }

    #[test]
    fn test_index_out_of_range() {
        let err = build_str("v 0 0 0\nv 1 1 1\nvn 0 0 1\nf 1//1 2//1 3//1\n").unwrap_err();
        assert!(matches!(
            err,
            MeshError::IndexOutOfRange {
                face: 0,
                kind: IndexKind::Vertex,
                index: 3,
                len: 2
            }
        ));

        let err = build_str("v 0 0 0\nv 1 1 1\nvn 0 0 1\nf 1//1 2//2 1//1\n").unwrap_err();
        assert!(matches!(
            err,
            MeshError::IndexOutOfRange {
                kind: IndexKind::Normal,
                ..
            }
        ));
    }
}
