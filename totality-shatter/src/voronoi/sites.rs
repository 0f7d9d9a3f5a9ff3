use na::{Point3, Vector3};

use model::Aabb;

use crate::rng::FractureRng;

pub const LLOYD_ITERATIONS: usize = 5;
pub const LLOYD_RESOLUTION: usize = 32;
/// Attempts per site at honouring the minimum spacing before settling for the last candidate.
const SPACING_RETRIES: usize = 16;

/// `count` uniform sites, re-rolling candidates that land within `min_spacing` of an earlier site.
pub fn uniform_sites(bounds: &Aabb, count: usize, min_spacing: f32, rng: &mut FractureRng) -> Vec<Point3<f32>> {
    let min_sq = min_spacing.max(0.) * min_spacing.max(0.);
    let mut sites: Vec<Point3<f32>> = Vec::with_capacity(count);
    for _ in 0..count {
        let mut candidate = rng.point_in(bounds);
        for _ in 0..SPACING_RETRIES {
            if sites.iter().all(|s| (s - candidate).norm_squared() >= min_sq) {
                break;
            }
            candidate = rng.point_in(bounds);
        }
        sites.push(candidate);
    }
    sites
}

/// `max(1, count / 8)` uniform cluster centers with `count` sites scattered around them.
pub fn clustered_sites(bounds: &Aabb, count: usize, variance: f32, rng: &mut FractureRng) -> Vec<Point3<f32>> {
    if count == 0 {
        return vec![];
    }
    let centers: Vec<_> = (0..(count / 8).max(1)).map(|_| rng.point_in(bounds)).collect();
    let sigma = bounds.extent() * 0.25 * variance.max(0.05);
    (0..count)
        .map(|_| {
            let center = centers[rng.index(centers.len())];
            bounds.clamp(&(center + rng.gaussian_vector(&sigma)))
        })
        .collect()
}

/// Moves every site to the centroid of the grid samples nearest to it. Sites that own no
/// samples stay put.
pub fn lloyd_relax(sites: &mut [Point3<f32>], bounds: &Aabb, iterations: usize, resolution: usize) {
    if sites.is_empty() || resolution == 0 {
        return;
    }
    let step = bounds.extent() / resolution as f32;
    let mut sums = vec![Vector3::zeros(); sites.len()];
    let mut counts = vec![0usize; sites.len()];
    for _ in 0..iterations {
        sums.iter_mut().for_each(|s| *s = Vector3::zeros());
        counts.iter_mut().for_each(|c| *c = 0);
        for x in 0..resolution {
            for y in 0..resolution {
                for z in 0..resolution {
                    let sample = bounds.min
                        + Vector3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5).component_mul(&step);
                    let nearest = nearest_site(sites, &sample);
                    sums[nearest] += sample.coords;
                    counts[nearest] += 1;
                }
            }
        }
        for (i, site) in sites.iter_mut().enumerate() {
            if counts[i] > 0 {
                *site = Point3::from(sums[i] / counts[i] as f32);
            }
        }
    }
}

fn nearest_site(sites: &[Point3<f32>], p: &Point3<f32>) -> usize {
    let mut best = 0;
    let mut best_sq = f32::INFINITY;
    for (i, s) in sites.iter().enumerate() {
        let d = (s - p).norm_squared();
        if d < best_sq {
            best = i;
            best_sq = d;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Aabb {
        Aabb::new(Point3::new(-1., -1., -1.), Point3::new(1., 1., 1.))
    }

    #[test]
    fn uniform_sites_respect_spacing() {
        let mut rng = FractureRng::new(Some(3));
        let sites = uniform_sites(&bounds(), 20, 0.3, &mut rng);
        assert_eq!(sites.len(), 20);
        assert!(sites.iter().all(|s| bounds().contains(s)));
        let close = sites
            .iter()
            .enumerate()
            .flat_map(|(i, a)| sites[i + 1..].iter().map(move |b| (a - b).norm()))
            .filter(|d| *d < 0.3)
            .count();
        // 20 sites in a 2x2x2 box leave plenty of room, retries should always succeed
        assert_eq!(close, 0);
    }

    #[test]
    fn clustered_sites_stay_in_bounds() {
        let mut rng = FractureRng::new(Some(5));
        let sites = clustered_sites(&bounds(), 40, 1.0, &mut rng);
        assert_eq!(sites.len(), 40);
        assert!(sites.iter().all(|s| bounds().contains(s)));
        assert!(clustered_sites(&bounds(), 0, 1.0, &mut rng).is_empty());
    }

    #[test]
    fn relaxation_spreads_coincident_sites() {
        let mut sites = vec![Point3::new(0.1, 0., 0.), Point3::new(-0.1, 0., 0.)];
        lloyd_relax(&mut sites, &bounds(), LLOYD_ITERATIONS, 8);
        // each site ends up near the centroid of its half of the box
        assert!((sites[0].x - 0.5).abs() < 0.05);
        assert!((sites[1].x + 0.5).abs() < 0.05);
    }

    #[test]
    fn starved_site_stays_put() {
        let far = Point3::new(50., 50., 50.);
        let mut sites = vec![Point3::origin(), far];
        lloyd_relax(&mut sites, &bounds(), 1, 4);
        assert_eq!(sites[1], far);
    }
}
