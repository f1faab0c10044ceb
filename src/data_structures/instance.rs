//! Node transformation data.
//!
//! Every scene node carries a local [`Instance`] (relative to its parent) and a
//! derived world [`Instance`]. Composition follows the usual parent * child
//! order so that children inherit their parent's animated transform.

use std::ops::Mul;

use cgmath::{One, Rad, Rotation3};

/// Rotation order for [`Instance::set_rotation_from_euler`], named after the axis sequence the
/// angles are applied in (intrinsic, matching the web engines' `Euler.order`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EulerOrder {
    #[default]
    XYZ,
    YZX,
    ZXY,
    XZY,
    YXZ,
    ZYX,
}

/// Local transformation: position, rotation (as quaternion), and scale.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn set_scalar_scale(&mut self, scale: f32) {
        self.scale = cgmath::Vector3::new(scale, scale, scale);
    }

    /// Rotates around the local X axis, on top of the current rotation.
    pub fn rotate_x(&mut self, angle: impl Into<Rad<f32>>) {
        self.rotation = self.rotation * cgmath::Quaternion::from_angle_x(angle);
    }

    /// Rotates around the local Y axis, on top of the current rotation.
    pub fn rotate_y(&mut self, angle: impl Into<Rad<f32>>) {
        self.rotation = self.rotation * cgmath::Quaternion::from_angle_y(angle);
    }

    /// Rotates around the local Z axis, on top of the current rotation.
    pub fn rotate_z(&mut self, angle: impl Into<Rad<f32>>) {
        self.rotation = self.rotation * cgmath::Quaternion::from_angle_z(angle);
    }

    /**
     * Replaces the rotation with the one described by three Euler angles.
     *
     * The angles are always given as (x, y, z); `order` only decides in which
     * sequence they are applied. `YZX` means the matrix is `Ry * Rz * Rx`.
     */
    pub fn set_rotation_from_euler(&mut self, x: impl Into<Rad<f32>>, y: impl Into<Rad<f32>>, z: impl Into<Rad<f32>>, order: EulerOrder) {
        self.rotation = euler_to_quaternion(x.into(), y.into(), z.into(), order);
    }
}

pub fn euler_to_quaternion(x: Rad<f32>, y: Rad<f32>, z: Rad<f32>, order: EulerOrder) -> cgmath::Quaternion<f32> {
    let qx = cgmath::Quaternion::from_angle_x(x);
    let qy = cgmath::Quaternion::from_angle_y(y);
    let qz = cgmath::Quaternion::from_angle_z(z);
    match order {
        EulerOrder::XYZ => qx * qy * qz,
        EulerOrder::YZX => qy * qz * qx,
        EulerOrder::ZXY => qz * qx * qy,
        EulerOrder::XZY => qx * qz * qy,
        EulerOrder::YXZ => qy * qx * qz,
        EulerOrder::ZYX => qz * qy * qx,
    }
}

impl Mul<Instance> for Instance {
    type Output = Self;

    fn mul(self, rhs: Instance) -> Self::Output {
        &self * &rhs
    }
}

impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    fn mul(self, rhs: &'b Instance) -> Self::Output {
        let new_rotation = self.rotation * rhs.rotation;

        let new_scale = cgmath::Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = cgmath::Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let new_position = self.position + (self.rotation * scaled_rhs_pos);

        Instance {
            position: new_position,
            rotation: new_rotation,
            scale: new_scale,
        }
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, InnerSpace, Matrix4, Vector3};

    use super::*;

    fn assert_mat_eq(a: Matrix4<f32>, b: Matrix4<f32>) {
        let a: [[f32; 4]; 4] = a.into();
        let b: [[f32; 4]; 4] = b.into();
        for c in 0..4 {
            for r in 0..4 {
                assert!((a[c][r] - b[c][r]).abs() < 1e-4, "{a:?} != {b:?}");
            }
        }
    }

    #[test]
    fn composition_matches_matrix_product() {
        let mut parent = Instance::new();
        parent.position = Vector3::new(1.0, 2.0, 3.0);
        parent.rotate_y(Deg(90.0));
        parent.set_scalar_scale(2.0);

        let mut child = Instance::new();
        child.position = Vector3::new(0.5, 0.0, -1.0);
        child.rotate_z(Deg(30.0));
        child.set_scalar_scale(0.25);

        let world = &parent * &child;
        assert_mat_eq(world.to_matrix(), parent.to_matrix() * child.to_matrix());
    }

    #[test]
    fn rotate_composes_onto_existing_rotation() {
        let mut instance = Instance::new();
        instance.rotate_y(Deg(90.0));
        instance.rotate_y(Deg(90.0));
        let forward = instance.rotation * Vector3::new(0.0, 0.0, 1.0);
        assert!((forward - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-5);
    }

    #[test]
    fn yzx_order_applies_x_first() {
        let q = euler_to_quaternion(Deg(90.0).into(), Deg(90.0).into(), Rad(0.0), EulerOrder::YZX);
        // Rx maps +y to +z, then Ry maps +z to +x.
        let v = q * Vector3::new(0.0, 1.0, 0.0);
        assert!((v - Vector3::new(1.0, 0.0, 0.0)).magnitude() < 1e-5, "{v:?}");
    }
}
