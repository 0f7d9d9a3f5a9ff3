//! Turns impacts into per-piece strain.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Point3, Vector3};

use crate::{breaking::PendingBreak, config::CollisionSettings, instance::DestructibleInstance};

/// Outward velocity per unit of strain given to pieces an explosion breaks.
const EXPLOSION_IMPULSE_SCALE: f32 = 0.01;

pub fn impact_radius(magnitude: f32) -> f32 {
    magnitude.max(0.).sqrt() * 0.1
}

/// Linear falloff, zero at and beyond `radius`.
pub fn point_falloff(dist: f32, radius: f32) -> f32 {
    if radius <= 0. || dist >= radius {
        0.
    } else {
        1. - dist / radius
    }
}

/// Quadratic falloff, zero at and beyond `radius`.
pub fn explosion_falloff(dist: f32, radius: f32) -> f32 {
    let f = point_falloff(dist, radius);
    f * f
}

/// Strains every unreleased piece near `point`. The direction only marks the hit as a point source.
/// Returns whether any piece went over its threshold.
pub fn apply_point(
    instance: &mut DestructibleInstance,
    point: &Point3<f32>,
    _direction: &Vector3<f32>,
    magnitude: f32,
    pending: &mut Vec<PendingBreak>,
) -> bool {
    let radius = impact_radius(magnitude);
    let multiplier = instance.fracture.config.impact_multiplier;
    let hits: Vec<_> = instance
        .attached_pieces()
        .filter_map(|p| {
            let f = point_falloff((p.position - point).norm(), radius);
            (f > 0.).then(|| (p.id, magnitude * f * multiplier))
        })
        .collect();
    let mut crossed = false;
    for (id, delta) in hits {
        crossed |= instance.accumulate_strain(id, delta, pending);
    }
    crossed
}

/// Strains every unreleased piece within `radius` of `center` and pushes the ones now over
/// their threshold away from it.
pub fn apply_explosion(
    instance: &mut DestructibleInstance,
    center: &Point3<f32>,
    radius: f32,
    force: f32,
    pending: &mut Vec<PendingBreak>,
) -> bool {
    let hits: Vec<_> = instance
        .attached_pieces()
        .filter_map(|p| {
            let f = explosion_falloff((p.position - center).norm(), radius);
            (f > 0.).then(|| (p.id, force * f))
        })
        .collect();
    let mut crossed = false;
    for (id, delta) in hits {
        crossed |= instance.accumulate_strain(id, delta, pending);
        if let Some(p) = instance.piece_mut(id).filter(|p| p.strain >= p.strain_threshold) {
            let outward = p.position - center;
            let dir = if outward.norm_squared() > f32::EPSILON {
                outward.normalize()
            } else {
                Vector3::y()
            };
            p.velocity += dir * p.strain * EXPLOSION_IMPULSE_SCALE;
        }
    }
    crossed
}

/// Where and how hard a character moving at `velocity` hits an instance, or `None` when too slow
/// or nothing is left to hit. The impact point is the nearest unreleased piece.
pub fn high_speed_impact(
    instance: &DestructibleInstance,
    character: &Point3<f32>,
    velocity: &Vector3<f32>,
    settings: &CollisionSettings,
) -> Option<(Point3<f32>, f32)> {
    let speed = velocity.norm();
    if speed < settings.min_speed {
        return None;
    }
    let nearest = instance
        .attached_pieces()
        .min_by(|a, b| (a.position - character).norm_squared().total_cmp(&(b.position - character).norm_squared()))?;
    Some((nearest.position, 0.5 * settings.character_mass * speed * speed))
}
