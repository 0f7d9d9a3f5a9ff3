pub mod mesh;

pub use mesh::{Aabb, TriMesh};

use na::{Matrix4, Point3, UnitQuaternion, Vector3};

/// Position, orientation and (non-uniform) scaling of something placed in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineTransform {
    pub pos: Vector3<f32>,
    pub ori: UnitQuaternion<f32>,
    pub scaling: Vector3<f32>,
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self {
            pos: Vector3::zeros(),
            ori: UnitQuaternion::identity(),
            scaling: Vector3::new(1., 1., 1.),
        }
    }

    pub fn new(pos: Vector3<f32>, ori: UnitQuaternion<f32>, scaling: Vector3<f32>) -> Self {
        Self { pos, ori, scaling }
    }

    /// Scale, then rotate, then translate.
    pub fn mat(&self) -> Matrix4<f32> {
        let mut t_mat = self.ori.to_homogeneous() * Matrix4::new_nonuniform_scaling(&self.scaling);
        t_mat.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.pos);
        t_mat
    }

    pub fn transform_point(&self, p: &Point3<f32>) -> Point3<f32> {
        Point3::from(self.ori * p.coords.component_mul(&self.scaling) + self.pos)
    }

    /// Product of the scale factors, i.e. how much a volume grows under this transform.
    pub fn volume_scale(&self) -> f32 {
        (self.scaling.x * self.scaling.y * self.scaling.z).abs()
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Generates the mesh of an axis aligned cube with edge length `size`, centered on the origin.
pub fn unit_cube(size: f32) -> TriMesh {
    let h = size * 0.5;
    TriMesh::new(
        vec![
            Point3::new(-h, -h, -h), // left bottom rear
            Point3::new(-h, -h,  h), // left bottom front
            Point3::new(-h,  h, -h), // left top rear
            Point3::new(-h,  h,  h), // left top front
            Point3::new( h, -h, -h), // right bottom rear
            Point3::new( h, -h,  h), // right bottom front
            Point3::new( h,  h, -h), // right top rear
            Point3::new( h,  h,  h), // right top front
        ],
        vec![
            1, 0, 4, 5, 1, 4, // bottom
            6, 2, 3, 6, 3, 7, // top
            0, 1, 2, 3, 2, 1, // left
            4, 6, 7, 4, 7, 5, // right
            0, 2, 6, 0, 6, 4, // back
            5, 7, 3, 3, 1, 5, // front
        ],
    )
}
