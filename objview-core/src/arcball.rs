/// Arcball rotation (Ken Shoemake, "ARCBALL: a user interface for specifying
/// three-dimensional orientation using a mouse").
///
/// Cursor positions are mapped onto a unit hemisphere centered in the
/// viewport, continued past its rim by a hyperbolic sheet so every pixel has
/// a well defined surface point. A drag between two pixels becomes the
/// quaternion rotating one surface point onto the other.
use log::trace;
use nalgebra::{Matrix4, Point2, Quaternion, UnitQuaternion, Vector3};

use crate::transform::{Transform, ZOOM_IN_FACTOR, ZOOM_OUT_FACTOR};

/// `nx² + ny²` at which the sphere hands over to the hyperbolic sheet
const SPHERE_LIMIT: f32 = 0.5;
/// Rotation speed divisors: the drag angle is scaled by
/// `width / SPEED_DIVISOR_X + height / SPEED_DIVISOR_Y`
pub const SPEED_DIVISOR_X: f32 = 80.0;
pub const SPEED_DIVISOR_Y: f32 = 60.0;

/// Viewport size in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Inclusive bounds check, matching the windowing layer's drag filter
    pub fn contains(&self, pixel: &Point2<f32>) -> bool {
        pixel.x >= 0.0 && pixel.y >= 0.0 && pixel.x <= self.width && pixel.y <= self.height
    }

    fn rotation_speed(&self) -> f32 {
        self.width / SPEED_DIVISOR_X + self.height / SPEED_DIVISOR_Y
    }
}

/// Cursor positions of an ongoing drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub previous: Point2<f32>,
    pub current: Point2<f32>,
}

impl DragState {
    pub fn at(pixel: Point2<f32>) -> Self {
        Self {
            previous: pixel,
            current: pixel,
        }
    }

    pub fn reset(&mut self, pixel: Point2<f32>) {
        *self = Self::at(pixel);
    }
}

/// Map a pixel onto the arcball surface.
///
/// The shorter viewport side (minus one pixel) spans [-1, 1]. Inside
/// `nx² + ny² <= 0.5` the point lies on the unit sphere, outside on the
/// hyperbola `z = 0.5 / r`; both give `z = sqrt(0.5)` on the boundary.
pub fn project_to_sphere(pixel: &Point2<f32>, viewport: &Viewport) -> Vector3<f32> {
    let m = (viewport.width.min(viewport.height) - 1.0).max(1.0);
    let nx = (2.0 * pixel.x - viewport.width) / m;
    let ny = (viewport.height - 2.0 * pixel.y) / m;

    let r2 = nx * nx + ny * ny;
    let z = if r2 <= SPHERE_LIMIT {
        (1.0 - r2).sqrt()
    } else {
        SPHERE_LIMIT / r2.sqrt()
    };
    Vector3::new(nx, ny, z)
}

/// Rotation for a drag from `previous` to `current`.
///
/// The axis is the (unnormalized) cross product of the two surface points,
/// the angle between them is multiplied by the viewport's speed factor, and
/// the resulting `(sin(a/2)·axis, cos(a/2))` is normalized.
pub fn arcball_rotation(
    previous: &Point2<f32>,
    current: &Point2<f32>,
    viewport: &Viewport,
) -> UnitQuaternion<f32> {
    let from = project_to_sphere(previous, viewport).normalize();
    let to = project_to_sphere(current, viewport).normalize();

    let axis = from.cross(&to);
    let angle = from.dot(&to).clamp(-1.0, 1.0).acos() * viewport.rotation_speed();

    let half = angle / 2.0;
    let raw = Quaternion::from_parts(half.cos(), axis * half.sin());
    UnitQuaternion::try_new(raw, f32::EPSILON).unwrap_or_else(UnitQuaternion::identity)
}

/// Owns the model orientation and the drag that is updating it
#[derive(Debug, Clone)]
pub struct ArcballRotator {
    orientation: Matrix4<f32>,
    drag: DragState,
    viewport: Viewport,
}

impl ArcballRotator {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            orientation: Matrix4::identity(),
            drag: DragState::at(Point2::origin()),
            viewport,
        }
    }

    /// Start from a given model matrix, e.g. the mesh's uniform scale
    pub fn with_orientation(mut self, orientation: Matrix4<f32>) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn orientation(&self) -> &Matrix4<f32> {
        &self.orientation
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Current uniform scale of the orientation matrix
    pub fn scale_factor(&self) -> f32 {
        Transform::scale_factor(&self.orientation)
    }

    /// Forget the drag history; the next drag starts at `pixel`
    pub fn release(&mut self, pixel: Point2<f32>) {
        self.drag.reset(pixel);
    }

    /// Cursor callback: rotates while the primary button is held, otherwise
    /// only tracks the cursor so the next drag starts where it is.
    pub fn cursor_moved(
        &mut self,
        pixel: Point2<f32>,
        primary_held: bool,
    ) -> Option<UnitQuaternion<f32>> {
        if !primary_held {
            self.release(pixel);
            return None;
        }
        self.drag_to(pixel)
    }

    /// Rotate by the drag from the previous position to `pixel`.
    ///
    /// The rotation is applied in view space before the existing
    /// orientation (`orientation = R * orientation`) and `pixel` becomes the
    /// previous position. Positions outside the viewport are dropped.
    pub fn drag_to(&mut self, pixel: Point2<f32>) -> Option<UnitQuaternion<f32>> {
        if !self.viewport.contains(&pixel) {
            trace!("Ignoring drag outside viewport at ({}, {})", pixel.x, pixel.y);
            return None;
        }

        self.drag.current = pixel;
        let rotation = arcball_rotation(&self.drag.previous, &self.drag.current, &self.viewport);
        self.orientation = rotation.to_homogeneous() * self.orientation;
        self.drag.previous = self.drag.current;
        Some(rotation)
    }

    /// Zoom by a vertical scroll offset: positive grows the model by
    /// [`ZOOM_IN_FACTOR`], negative shrinks it by [`ZOOM_OUT_FACTOR`].
    pub fn scroll(&mut self, offset: f32) {
        let factor = if offset > 0.0 {
            ZOOM_IN_FACTOR
        } else if offset < 0.0 {
            ZOOM_OUT_FACTOR
        } else {
            return;
        };
        self.orientation *= Transform::uniform_scale(factor);
    }
}
