use na::{Point3, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use model::Aabb;

/// `StdRng` plus the few distributions fracture needs.
pub struct FractureRng(StdRng);

impl FractureRng {
    pub fn new(seed: Option<u64>) -> Self {
        Self(match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        })
    }

    pub fn uniform(&mut self, lo: f32, hi: f32) -> f32 {
        if hi > lo {
            self.0.gen_range(lo..hi)
        } else {
            lo
        }
    }

    pub fn index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }

    pub fn point_in(&mut self, bounds: &Aabb) -> Point3<f32> {
        Point3::new(
            self.uniform(bounds.min.x, bounds.max.x),
            self.uniform(bounds.min.y, bounds.max.y),
            self.uniform(bounds.min.z, bounds.max.z),
        )
    }

    /// Standard normal sample (Box-Muller).
    pub fn gaussian(&mut self) -> f32 {
        let u1: f32 = self.0.gen_range(f32::EPSILON..1.);
        let u2: f32 = self.0.gen();
        (-2. * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
    }

    pub fn gaussian_vector(&mut self, sigma: &Vector3<f32>) -> Vector3<f32> {
        Vector3::new(self.gaussian(), self.gaussian(), self.gaussian()).component_mul(sigma)
    }

    /// `base * (1 + uniform(-0.5, 0.5) * variance)`
    pub fn threshold(&mut self, base: f32, variance: f32) -> f32 {
        base * (1. + self.uniform(-0.5, 0.5) * variance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_is_reproducible() {
        let mut a = FractureRng::new(Some(7));
        let mut b = FractureRng::new(Some(7));
        for _ in 0..10 {
            assert_eq!(a.uniform(0., 1.), b.uniform(0., 1.));
        }
    }

    #[test]
    fn thresholds_stay_in_band() {
        let mut rng = FractureRng::new(Some(1));
        for _ in 0..1000 {
            let t = rng.threshold(100., 0.2);
            assert!((90. ..=110.).contains(&t));
        }
    }

    #[test]
    fn degenerate_range_returns_low_end() {
        let mut rng = FractureRng::new(Some(1));
        assert_eq!(rng.uniform(3., 3.), 3.);
    }
}
