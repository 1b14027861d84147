//! Math utilities and types
//!
//! Provides the vector, quaternion and TRS transform types used by the scene
//! hierarchy. Conventions are Y-up right-handed with `-Z` as forward.

use approx::{AbsDiffEq, RelativeEq};

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
///
/// Composition follows `T * R * S`: a point is scaled, then rotated, then
/// translated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform from all three parts
    pub const fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Create a transform from a position, Euler angles in degrees (XYZ) and scale
    pub fn from_euler_degrees(position: Vec3, euler_degrees: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation: quat_from_euler_degrees(euler_degrees),
            scale,
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Create a transform from a transformation matrix (decompose TRS)
    ///
    /// Shear cannot be expressed as TRS; the rotation is the closest one to
    /// the matrix's linear part. A zero scale axis decomposes with an
    /// identity rotation on that axis.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let position = Vec3::new(matrix.m14, matrix.m24, matrix.m34);
        let linear: Mat3 = matrix.fixed_view::<3, 3>(0, 0).into_owned();

        let mut scale = Vec3::new(
            linear.column(0).magnitude(),
            linear.column(1).magnitude(),
            linear.column(2).magnitude(),
        );
        if linear.determinant() < 0.0 {
            scale.x = -scale.x;
        }

        let mut rotation_matrix = linear;
        for (axis, &factor) in scale.iter().enumerate() {
            if factor.abs() > f32::EPSILON {
                rotation_matrix.column_mut(axis).unscale_mut(factor);
            } else {
                rotation_matrix.set_column(axis, &Vec3::ith(axis, 1.0));
            }
        }
        let rotation = Quat::from_matrix(&rotation_matrix);

        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * self.scale.component_mul(&point)
    }

    /// Apply only the rotation of this transform to a direction
    pub fn transform_direction(&self, direction: Vec3) -> Vec3 {
        self.rotation * direction
    }

    /// Combine this transform (as parent) with a child-local transform
    ///
    /// Composed as matrices, so a non-uniformly scaled parent skews a
    /// rotated child exactly as the world matrix does.
    pub fn combine(&self, other: &Self) -> Self {
        Self::from_matrix(self.to_matrix() * other.to_matrix())
    }

    /// Express this transform relative to `parent`
    ///
    /// `parent.combine(&self.relative_to(parent)) == self` whenever the
    /// relative pose has no shear. A singular parent leaves `self` unchanged.
    pub fn relative_to(&self, parent: &Self) -> Self {
        parent
            .to_matrix()
            .try_inverse()
            .map_or(*self, |inverse| Self::from_matrix(inverse * self.to_matrix()))
    }

    /// Get the inverse transform
    pub fn inverse(&self) -> Self {
        Self::identity().relative_to(self)
    }

    /// Forward direction (`-Z` rotated into this transform's frame)
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::new(0.0, 0.0, -1.0)
    }

    /// Up direction (`+Y` rotated into this transform's frame)
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::new(0.0, 1.0, 0.0)
    }

    /// Left direction (`-X` rotated into this transform's frame)
    pub fn left(&self) -> Vec3 {
        self.rotation * Vec3::new(-1.0, 0.0, 0.0)
    }

    /// Rotation as Euler angles in degrees (XYZ)
    pub fn euler_degrees(&self) -> Vec3 {
        let (x, y, z) = self.rotation.euler_angles();
        Vec3::new(x, y, z) * constants::RAD_TO_DEG
    }
}

impl AbsDiffEq for Transform {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        1e-5
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.position.abs_diff_eq(&other.position, epsilon)
            && self.scale.abs_diff_eq(&other.scale, epsilon)
            && same_rotation(&self.rotation, &other.rotation, epsilon)
    }
}

impl RelativeEq for Transform {
    fn default_max_relative() -> f32 {
        1e-5
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.position.relative_eq(&other.position, epsilon, max_relative)
            && self.scale.relative_eq(&other.scale, epsilon, max_relative)
            && same_rotation(&self.rotation, &other.rotation, epsilon.max(max_relative))
    }
}

// q and -q encode the same rotation.
fn same_rotation(a: &Quat, b: &Quat, epsilon: f32) -> bool {
    1.0 - a.coords.dot(&b.coords).abs() <= epsilon
}

/// Build a rotation from Euler angles in degrees (XYZ)
pub fn quat_from_euler_degrees(euler_degrees: Vec3) -> Quat {
    let radians = euler_degrees * constants::DEG_TO_RAD;
    Quat::from_euler_angles(radians.x, radians.y, radians.z)
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}
