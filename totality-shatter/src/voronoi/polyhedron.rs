use std::collections::HashMap;

use na::{Point3, Vector3};

use model::{Aabb, TriMesh};

/// A convex polyhedron as a vertex pool plus faces. Face loops wind counter-clockwise seen from
/// outside.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolyhedron {
    pub vertices: Vec<Point3<f32>>,
    pub faces: Vec<Vec<u32>>,
}

/// Which side of a plane a clip left.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClipOutcome {
    Untouched,
    Clipped,
    /// Fewer than four vertices survived.
    Degenerate,
}

impl ConvexPolyhedron {
    pub fn from_aabb(bounds: &Aabb) -> Self {
        Self {
            vertices: bounds.corners().to_vec(),
            faces: vec![
                vec![0, 4, 6, 2], // -x
                vec![1, 3, 7, 5], // +x
                vec![0, 1, 5, 4], // -y
                vec![2, 6, 7, 3], // +y
                vec![0, 2, 3, 1], // -z
                vec![4, 5, 7, 6], // +z
            ],
        }
    }

    /// Keeps the part of the polyhedron where `dot(v - on_plane, normal) <= eps`, capping the cut
    /// with a new face.
    pub fn clip(&mut self, on_plane: &Point3<f32>, normal: &Vector3<f32>, eps: f32) -> ClipOutcome {
        let dist: Vec<f32> = self.vertices.iter().map(|v| (v - on_plane).dot(normal)).collect();
        if dist.iter().all(|d| *d <= eps) {
            return ClipOutcome::Untouched;
        }

        let mut vertices = Vec::with_capacity(self.vertices.len() + 4);
        let mut remap = vec![None; self.vertices.len()];
        let mut on_cut = Vec::new();
        for (i, v) in self.vertices.iter().enumerate() {
            if dist[i] <= eps {
                remap[i] = Some(vertices.len() as u32);
                if dist[i] >= -eps {
                    on_cut.push(vertices.len() as u32);
                }
                vertices.push(*v);
            }
        }

        let mut crossings: HashMap<(u32, u32), u32> = HashMap::new();
        let mut faces = Vec::with_capacity(self.faces.len() + 1);
        for face in self.faces.iter() {
            let mut clipped = Vec::with_capacity(face.len() + 1);
            for (k, &a) in face.iter().enumerate() {
                let b = face[(k + 1) % face.len()];
                let (ia, ib) = (a as usize, b as usize);
                if let Some(kept) = remap[ia] {
                    clipped.push(kept);
                }
                if remap[ia].is_some() != remap[ib].is_some() {
                    let inner = if remap[ia].is_some() { ia } else { ib };
                    if dist[inner] >= -eps {
                        // the edge only touches the plane at its kept end
                        clipped.extend(remap[inner]);
                        continue;
                    }
                    let key = (a.min(b), a.max(b));
                    let idx = *crossings.entry(key).or_insert_with(|| {
                        let t = (dist[ia] / (dist[ia] - dist[ib])).clamp(0., 1.);
                        let p = self.vertices[ia] + (self.vertices[ib] - self.vertices[ia]) * t;
                        vertices.push(p);
                        on_cut.push(vertices.len() as u32 - 1);
                        vertices.len() as u32 - 1
                    });
                    clipped.push(idx);
                }
            }
            clipped.dedup();
            if clipped.len() > 1 && clipped.first() == clipped.last() {
                clipped.pop();
            }
            if clipped.len() >= 3 {
                faces.push(clipped);
            }
        }

        if let Some(cap) = Self::cap_face(&vertices, on_cut, normal) {
            faces.push(cap);
        }

        *self = Self::compact(vertices, faces);
        if self.vertices.len() < 4 {
            ClipOutcome::Degenerate
        } else {
            ClipOutcome::Clipped
        }
    }

    /// Orders the cut vertices counter-clockwise about `normal`.
    fn cap_face(vertices: &[Point3<f32>], mut ring: Vec<u32>, normal: &Vector3<f32>) -> Option<Vec<u32>> {
        ring.sort_unstable();
        ring.dedup();
        if ring.len() < 3 {
            return None;
        }
        let mid = ring.iter().fold(Vector3::zeros(), |acc, &i| acc + vertices[i as usize].coords) / ring.len() as f32;
        let mid = Point3::from(mid);
        let u = ring
            .iter()
            .map(|&i| vertices[i as usize] - mid)
            .find(|d| d.norm_squared() > f32::EPSILON)?
            .normalize();
        let v = normal.cross(&u);
        let angle = |i: &u32| {
            let d = vertices[*i as usize] - mid;
            d.dot(&v).atan2(d.dot(&u))
        };
        ring.sort_by(|a, b| angle(a).total_cmp(&angle(b)));
        Some(ring)
    }

    /// Drops vertices no face references.
    fn compact(vertices: Vec<Point3<f32>>, mut faces: Vec<Vec<u32>>) -> Self {
        let mut remap = vec![u32::MAX; vertices.len()];
        let mut kept = Vec::with_capacity(vertices.len());
        for face in faces.iter_mut() {
            for idx in face.iter_mut() {
                let old = *idx as usize;
                if remap[old] == u32::MAX {
                    remap[old] = kept.len() as u32;
                    kept.push(vertices[old]);
                }
                *idx = remap[old];
            }
        }
        Self { vertices: kept, faces }
    }

    pub fn vertex_mean(&self) -> Option<Point3<f32>> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum = self.vertices.iter().fold(Vector3::zeros(), |acc, v| acc + v.coords);
        Some(Point3::from(sum / self.vertices.len() as f32))
    }

    /// Volume and centroid, from tetrahedra fanned out of the vertex mean.
    pub fn volume_and_centroid(&self) -> (f32, Option<Point3<f32>>) {
        let apex = match self.vertex_mean() {
            Some(apex) => apex,
            None => return (0., None),
        };
        let mut volume = 0.;
        let mut moment = Vector3::zeros();
        for [a, b, c] in self.fan_triangles() {
            let tet = (a - apex).dot(&(b - apex).cross(&(c - apex))) / 6.;
            volume += tet;
            moment += (apex.coords + a.coords + b.coords + c.coords) * (tet * 0.25);
        }
        if volume.abs() <= f32::EPSILON {
            (0., Some(apex))
        } else {
            (volume.abs(), Some(Point3::from(moment / volume)))
        }
    }

    fn fan_triangles(&self) -> impl Iterator<Item = [Point3<f32>; 3]> + '_ {
        self.faces.iter().flat_map(move |face| {
            (1..face.len().saturating_sub(1)).map(move |k| {
                [
                    self.vertices[face[0] as usize],
                    self.vertices[face[k] as usize],
                    self.vertices[face[k + 1] as usize],
                ]
            })
        })
    }

    pub fn triangulate(&self) -> TriMesh {
        let mut indices = Vec::new();
        for face in self.faces.iter() {
            for k in 1..face.len().saturating_sub(1) {
                indices.extend_from_slice(&[face[0], face[k], face[k + 1]]);
            }
        }
        TriMesh::new(self.vertices.clone(), indices)
    }
}
