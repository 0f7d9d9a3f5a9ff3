#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use totality_sim::{BodyDesc, BodyShape, PhysicsAdapter};

use crate::{
    debris::DebrisManager,
    ids::{InstanceId, PieceId},
    instance::{DestructibleInstance, PieceState},
};

/// A piece over its threshold, waiting for `process`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PendingBreak {
    pub instance: InstanceId,
    pub piece: PieceId,
    pub strain: f32,
}

/// Resolves this tick's pending breaks, highest strain first: severs the piece's bonds, hands it
/// to physics and starts its debris clock. Returns the pieces released, in release order.
pub fn process(
    instance: &mut DestructibleInstance,
    mut pending: Vec<PendingBreak>,
    physics: &mut dyn PhysicsAdapter,
    debris: &mut DebrisManager,
) -> Vec<PieceId> {
    pending.sort_by(|a, b| b.strain.total_cmp(&a.strain));
    let collides = instance.fracture.config.enable_debris_collision;
    let mut broken = Vec::with_capacity(pending.len());
    for pb in pending {
        if pb.instance != instance.id {
            trace!("Dropping pending break of {} queued against {}.", pb.instance, instance.id);
            continue;
        }
        let piece = match instance.pieces.get_mut(pb.piece.index()) {
            Some(p) if !p.is_released() => p,
            _ => continue,
        };
        let severed: Vec<PieceId> = instance
            .edges
            .iter_mut()
            .filter_map(|e| {
                let neighbor = e.other(pb.piece)?;
                e.sever().then_some(neighbor)
            })
            .collect();

        let mut desc = BodyDesc::new(
            BodyShape::ConvexHull(piece.local_points.clone()),
            piece.position,
            piece.rotation,
            piece.velocity,
            true,
        );
        desc.angular_velocity = piece.angular_velocity;
        desc.mass = piece.mass;
        desc.inertia = piece.inertia;
        desc.collides = collides;
        piece.body = Some(physics.create_body(desc));
        piece.state = PieceState::Released;

        debris.register(instance.id, piece.id, &instance.fracture.config, piece.mass, piece.position);
        trace!("Instance {}: released piece {} at strain {}, severed bonds to {:?}.", instance.id, pb.piece, pb.strain, severed);
        broken.push(pb.piece);
    }
    let was_destroyed = instance.is_destroyed;
    instance.is_destroyed = instance.all_released();
    if instance.is_destroyed && !was_destroyed {
        info!("Instance {} destroyed.", instance.id);
    }
    broken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{DebrisSettings, DestructibleConfig},
        ids::{FractureId, MeshId},
        rng::FractureRng,
        store::FractureData,
    };
    use model::AffineTransform;
    use std::sync::{Arc, Mutex};
    use totality_sim::{LocalPhysics, World};

    fn setup(count: usize) -> (DestructibleInstance, Arc<Mutex<World>>, LocalPhysics, DebrisManager) {
        let cube = model::unit_cube(4.);
        let config = DestructibleConfig {
            voronoi_cell_count: count,
            seed: Some(8),
            ..Default::default()
        };
        let data = Arc::new(FractureData::build(FractureId(1), MeshId(1), &cube.vertices, &cube.indices, config));
        let inst = DestructibleInstance::new(InstanceId(1), data, AffineTransform::identity(), &mut FractureRng::new(Some(3)));
        let world = Arc::new(Mutex::new(World::new()));
        let physics = LocalPhysics::new(Arc::clone(&world));
        (inst, world, physics, DebrisManager::new(DebrisSettings::default()))
    }

    fn pb(piece: u32, strain: f32) -> PendingBreak {
        PendingBreak { instance: InstanceId(1), piece: PieceId(piece), strain }
    }

    #[test]
    fn highest_strain_goes_first() {
        let (mut inst, world, mut physics, mut debris) = setup(6);
        let broken = process(&mut inst, vec![pb(1, 120.), pb(4, 300.), pb(2, 150.)], &mut physics, &mut debris);
        assert_eq!(broken, vec![PieceId(4), PieceId(2), PieceId(1)]);
        assert_eq!(world.lock().unwrap().len(), 3);
        assert_eq!(debris.len(), 3);
        for id in broken {
            let piece = inst.piece(id).unwrap();
            assert!(piece.is_released());
            assert!(piece.body.is_some());
            assert!(inst.edges.iter().filter(|e| e.other(id).is_some()).all(|e| e.broken));
        }
        assert!(!inst.is_destroyed);
    }

    #[test]
    fn released_pieces_are_not_released_twice() {
        let (mut inst, world, mut physics, mut debris) = setup(4);
        process(&mut inst, vec![pb(0, 200.)], &mut physics, &mut debris);
        let body = inst.pieces[0].body;
        let again = process(&mut inst, vec![pb(0, 200.), pb(0, 250.)], &mut physics, &mut debris);
        assert!(again.is_empty());
        assert_eq!(inst.pieces[0].body, body);
        assert_eq!(world.lock().unwrap().len(), 1);
        assert_eq!(debris.len(), 1);
    }

    #[test]
    fn releasing_everything_destroys() {
        let (mut inst, _world, mut physics, mut debris) = setup(4);
        let all = (0..4).map(|i| pb(i, 200.)).collect();
        let broken = process(&mut inst, all, &mut physics, &mut debris);
        assert_eq!(broken.len(), 4);
        assert!(inst.is_destroyed);
        assert!(inst.edges.iter().all(|e| e.broken));
    }

    #[test]
    fn unknown_pieces_and_foreign_breaks_are_ignored() {
        let (mut inst, _world, mut physics, mut debris) = setup(4);
        let foreign = PendingBreak { instance: InstanceId(9), piece: PieceId(0), strain: 500. };
        let broken = process(&mut inst, vec![pb(77, 500.), foreign], &mut physics, &mut debris);
        assert!(broken.is_empty());
        assert!(debris.is_empty());
    }
}
