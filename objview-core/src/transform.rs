/// Model matrix helpers shared by the rotator and the renderer
use nalgebra::{Matrix3, Matrix4};

/// Multiplier applied to the model matrix per positive scroll step
pub const ZOOM_IN_FACTOR: f32 = 1.05;
/// Multiplier applied to the model matrix per negative scroll step
pub const ZOOM_OUT_FACTOR: f32 = 0.95;

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Uniform scale matrix
    pub fn uniform_scale(factor: f32) -> Matrix4<f32> {
        Matrix4::new_scaling(factor)
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(
        model: &Matrix4<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        projection * view * model
    }

    /// Inverse transpose of the model's upper 3x3, for carrying normals into
    /// world space. Falls back to identity for a singular model.
    pub fn normal_matrix(model: &Matrix4<f32>) -> Matrix3<f32> {
        let linear: Matrix3<f32> = model.fixed_view::<3, 3>(0, 0).into_owned();
        linear
            .try_inverse()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix3::identity)
    }

    /// Length of the first basis column, i.e. the uniform scale of a
    /// rotation-and-scale matrix
    pub fn scale_factor(model: &Matrix4<f32>) -> f32 {
        model.fixed_view::<3, 1>(0, 0).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector3};

    #[test]
    fn test_scale_factor_ignores_rotation() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.7).to_homogeneous();
        let model = rotation * Transform::uniform_scale(3.0);
        assert_relative_eq!(Transform::scale_factor(&model), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_normal_matrix_of_rotation_is_rotation() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 1.2);
        let model = rotation.to_homogeneous() * Transform::uniform_scale(2.0);
        let normal = Transform::normal_matrix(&model) * Vector3::new(0.0, 1.0, 0.0);
        let expected = rotation * Vector3::new(0.0, 1.0, 0.0);
        assert_relative_eq!(normal.normalize(), expected, epsilon = 1e-5);
    }

    #[test]
    fn test_singular_model_normal_matrix() {
        let normal = Transform::normal_matrix(&Matrix4::zeros());
        assert_eq!(normal, Matrix3::identity());
    }

    #[test]
    fn test_mvp_identity() {
        let id = Matrix4::identity();
        assert!((Transform::mvp_matrix(&id, &id, &id) - Matrix4::identity()).norm() < 1e-6);
    }
}
