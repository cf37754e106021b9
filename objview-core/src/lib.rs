/// objview core library - OBJ loading and arcball orientation
///
/// Turns a triangulated OBJ file into flat, centered vertex/normal buffers
/// for a non-indexed draw, and turns mouse drags into a model orientation.
/// Nothing in here touches a window or a terminal.

pub mod arcball;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod obj;
pub mod projection;
pub mod transform;

use std::path::Path;

// Re-export commonly used types
pub use arcball::{arcball_rotation, project_to_sphere, ArcballRotator, DragState, Viewport};
pub use error::{IndexKind, MeshError, Result};
pub use geometry::{Triangle, Vertex};
pub use mesh::{BoundingExtent, FlatMesh, MeshBuilder, ZOOM_LEVEL_FAR};
pub use obj::{FaceCorner, FaceIndex, ObjData, ObjParser};
pub use projection::{Camera, ProjectionMode};
pub use transform::Transform;

/// Parse an OBJ file and expand it into draw buffers
pub fn load_mesh<P: AsRef<Path>>(path: P) -> Result<FlatMesh> {
    let data = ObjParser::load(path)?;
    MeshBuilder::build(&data)
}
