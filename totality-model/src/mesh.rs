use na::{Point3, Vector3};

/// Axis aligned bounding box.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// `None` when there are no points.
    pub fn from_points<'a, I: IntoIterator<Item = &'a Point3<f32>>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Self::new(first, first), |b, p| Self {
            min: b.min.inf(p),
            max: b.max.sup(p),
        }))
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f32> {
        na::center(&self.min, &self.max)
    }

    pub fn padded(&self, amount: f32) -> Self {
        let pad = Vector3::repeat(amount);
        Self::new(self.min - pad, self.max + pad)
    }

    pub fn contains(&self, p: &Point3<f32>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    pub fn clamp(&self, p: &Point3<f32>) -> Point3<f32> {
        p.sup(&self.min).inf(&self.max)
    }

    /// The eight corners, bit `i` of the index selecting `max` on axis `i`.
    pub fn corners(&self) -> [Point3<f32>; 8] {
        let mut out = [self.min; 8];
        for (bits, corner) in out.iter_mut().enumerate() {
            for axis in 0..3 {
                if bits & (1 << axis) != 0 {
                    corner[axis] = self.max[axis];
                }
            }
        }
        out
    }
}

/// Indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    pub vertices: Vec<Point3<f32>>,
    pub indices: Vec<u32>,
}

impl TriMesh {
    pub fn new(vertices: Vec<Point3<f32>>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
