extern crate nalgebra as na;
extern crate totality_shatter as shatter;

use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use na::{Point3, UnitQuaternion, Vector3};
use shatter::{
    ClusterHierarchy, DestructibleConfig, EngineSettings, FractureEngine, FractureId, InstanceId, MeshId, PieceId,
    PieceState,
};
use totality_sim::{LocalPhysics, World};

type Broken = Arc<Mutex<Vec<(InstanceId, Vec<PieceId>)>>>;

struct Harness {
    engine: FractureEngine,
    world: Arc<Mutex<World>>,
    broken: Broken,
}

fn harness() -> Harness {
    let world = Arc::new(Mutex::new(World::new()));
    let settings = EngineSettings {
        seed: Some(99),
        ..Default::default()
    };
    let mut engine = FractureEngine::new(settings, Box::new(LocalPhysics::new(Arc::clone(&world))));
    let broken: Broken = Arc::new(Mutex::new(vec![]));
    let sink = Arc::clone(&broken);
    engine.set_destruction_callback(move |id: InstanceId, pieces: &[PieceId]| {
        sink.lock().unwrap().push((id, pieces.to_vec()))
    });
    Harness { engine, world, broken }
}

fn config(count: usize) -> DestructibleConfig {
    DestructibleConfig {
        voronoi_cell_count: count,
        seed: Some(42),
        ..Default::default()
    }
}

fn fracture_cube(h: &mut Harness, size: f32, config: DestructibleConfig) -> FractureId {
    let cube = totality_model::unit_cube(size);
    h.engine.pre_fracture(MeshId(1), &cube.vertices, &cube.indices, config)
}

fn place_at_origin(h: &mut Harness, fracture: FractureId) -> InstanceId {
    h.engine
        .create_instance(fracture, Point3::origin(), UnitQuaternion::identity(), Vector3::repeat(1.))
}

#[test]
fn cube_with_eight_sites_has_eight_cells() {
    let mut h = harness();
    let fracture = fracture_cube(&mut h, 1., config(8));
    assert_eq!(h.engine.fracture_data(fracture).unwrap().diagram.cells.len(), 8);
}

#[test]
fn instance_has_a_piece_per_cell() {
    let mut h = harness();
    let fracture = fracture_cube(&mut h, 1., config(8));
    let id = place_at_origin(&mut h, fracture);
    let instance = h.engine.instance(id).unwrap();
    let cells = h.engine.fracture_data(fracture).unwrap().diagram.cells.len();
    assert_eq!(instance.pieces.len(), cells);
    assert!(!instance.is_destroyed);
}

#[test]
fn double_threshold_hit_releases_the_piece() {
    let mut h = harness();
    let fracture = fracture_cube(&mut h, 20., config(8));
    let id = place_at_origin(&mut h, fracture);
    let (target, threshold) = {
        let p = &h.engine.instance(id).unwrap().pieces[0];
        (p.position, p.strain_threshold)
    };
    assert!(h.engine.apply_damage(id, target, Vector3::x(), threshold * 2.));

    let instance = h.engine.instance(id).unwrap();
    assert!(instance.pieces[0].is_released());
    assert!(instance.pieces[1..].iter().all(|p| p.state == PieceState::Intact));
    assert_eq!(h.broken.lock().unwrap().as_slice(), &[(id, vec![PieceId(0)])]);
    assert_eq!(h.world.lock().unwrap().len(), 1);

    // the same hit again lands on a released piece
    let strain = instance.pieces[0].strain;
    assert!(!h.engine.apply_damage(id, target, Vector3::x(), threshold * 2.));
    assert!(h.engine.pending_breaks(id).is_empty());
    assert_eq!(h.broken.lock().unwrap().len(), 1);
    assert_eq!(h.engine.instance(id).unwrap().pieces[0].strain, strain);
}

#[test]
fn weak_explosion_strains_by_quadratic_falloff() {
    let mut h = harness();
    let fracture = fracture_cube(&mut h, 10., config(12));
    let id = place_at_origin(&mut h, fracture);
    let center = h.engine.instance(id).unwrap().bounding_center;
    assert!(h.engine.instance(id).unwrap().pieces.iter().all(|p| (p.position - center).norm() <= 10.));

    assert!(!h.engine.apply_explosion(center, 100., 1.));
    let instance = h.engine.instance(id).unwrap();
    for p in instance.pieces.iter() {
        let d = (p.position - center).norm();
        assert_relative_eq!(p.strain, (1. - d / 100.).powi(2), epsilon = 1e-5);
    }
    let closest = instance
        .pieces
        .iter()
        .min_by(|a, b| (a.position - center).norm().total_cmp(&(b.position - center).norm()))
        .unwrap();
    assert!(instance.pieces.iter().all(|p| p.strain <= closest.strain));
}

#[test]
fn debris_expires_after_its_lifetime() {
    let mut h = harness();
    let fracture = fracture_cube(&mut h, 20., DestructibleConfig { debris_lifetime: 2., ..config(8) });
    let id = place_at_origin(&mut h, fracture);
    let (target, threshold) = {
        let p = &h.engine.instance(id).unwrap().pieces[0];
        (p.position, p.strain_threshold)
    };
    assert!(h.engine.apply_damage(id, target, Vector3::y(), threshold * 2.));
    let debris = h.engine.debris().get(id, PieceId(0)).unwrap();
    assert_eq!(debris.lifetime, 2.);

    h.engine.update(1.);
    assert!(h.engine.debris().get(id, PieceId(0)).is_some());
    assert!(h.engine.instance(id).unwrap().pieces[0].is_active);

    h.engine.update(1.);
    assert!(h.engine.debris().get(id, PieceId(0)).is_none());
    let piece = &h.engine.instance(id).unwrap().pieces[0];
    assert!(!piece.is_active);
    assert!(piece.body.is_none());
    assert!(h.world.lock().unwrap().is_empty());
}

#[test]
fn leaves_partition_cells_for_any_pattern() {
    let mut h = harness();
    for (seed, count, clustered) in [(1, 5, false), (2, 30, false), (3, 24, true), (4, 1, false)] {
        let config = DestructibleConfig {
            voronoi_cell_count: count,
            use_clustered_sites: clustered,
            seed: Some(seed),
            ..Default::default()
        };
        let cube = totality_model::unit_cube(6.);
        let fracture = h.engine.pre_fracture(MeshId(seed), &cube.vertices, &cube.indices, config);
        let data = h.engine.fracture_data(fracture).unwrap();
        let hierarchy: &ClusterHierarchy = &data.hierarchy;
        let mut covered: Vec<_> = hierarchy.leaves().flat_map(|l| l.cells.iter().copied()).collect();
        covered.sort_unstable();
        let all: Vec<_> = data.diagram.cells.iter().map(|c| c.id).collect();
        assert_eq!(covered, all);
    }
}

#[test]
fn strain_never_decreases_and_freezes_on_release() {
    let mut h = harness();
    let fracture = fracture_cube(&mut h, 8., config(20));
    let id = place_at_origin(&mut h, fracture);
    let mut last: Vec<f32> = vec![0.; 20];
    let mut frozen: Vec<Option<f32>> = vec![None; 20];
    for step in 0..40 {
        let angle = step as f32 * 0.7;
        let point = if step % 10 == 9 {
            // straight onto whichever piece is still attached
            match h.engine.instance(id).unwrap().attached_pieces().next() {
                Some(p) => p.position,
                None => break,
            }
        } else {
            Point3::new(angle.cos() * 3., (step % 5) as f32 - 2., angle.sin() * 3.)
        };
        h.engine.apply_damage(id, point, Vector3::x(), 60. + step as f32 * 10.);
        for p in h.engine.instance(id).unwrap().pieces.iter() {
            let i = p.id.index();
            assert!(p.strain >= last[i]);
            if let Some(f) = frozen[i] {
                assert_eq!(p.strain, f);
            }
            if p.is_released() && frozen[i].is_none() {
                frozen[i] = Some(p.strain);
            }
            last[i] = p.strain;
        }
    }
    assert!(frozen.iter().any(Option::is_some));
}

#[test]
fn breaking_is_one_way() {
    let mut h = harness();
    let fracture = fracture_cube(&mut h, 4., config(10));
    let id = place_at_origin(&mut h, fracture);
    h.engine.apply_explosion(Point3::new(2., 0., 0.), 3., 500.);
    let before = h.engine.instance(id).unwrap().clone();
    let bodies = h.world.lock().unwrap().len();
    assert!(h.engine.process_breaking(id).is_empty());
    assert!(h.engine.process_breaking(id).is_empty());
    let after = h.engine.instance(id).unwrap();
    assert_eq!(before.edges, after.edges);
    assert_eq!(before.pieces, after.pieces);
    assert_eq!(h.world.lock().unwrap().len(), bodies);
    for e in after.edges.iter() {
        let a = &after.pieces[e.a.index()];
        let b = &after.pieces[e.b.index()];
        assert_eq!(e.broken, a.is_released() || b.is_released());
    }
}

#[test]
fn destroyed_exactly_when_everything_is_released() {
    let mut h = harness();
    let fracture = fracture_cube(&mut h, 4., config(10));
    let id = place_at_origin(&mut h, fracture);
    let check = |h: &Harness| {
        let i = h.engine.instance(id).unwrap();
        assert_eq!(i.is_destroyed, i.pieces.iter().all(|p| p.is_released()));
    };
    check(&h);
    h.engine.apply_explosion(Point3::new(2., 2., 2.), 2., 400.);
    check(&h);
    h.engine.apply_explosion(Point3::origin(), 50., 1e7);
    check(&h);
    assert!(h.engine.instance(id).unwrap().is_destroyed);
    assert_eq!(h.broken.lock().unwrap().iter().map(|(_, p)| p.len()).sum::<usize>(), 10);
}

#[test]
fn explosion_strain_falls_off_with_distance() {
    let mut h = harness();
    let fracture = fracture_cube(&mut h, 10., config(16));
    let id = place_at_origin(&mut h, fracture);
    let center = Point3::new(-5., 0., 0.);
    let radius = 7.;
    h.engine.apply_explosion(center, radius, 1.);
    let instance = h.engine.instance(id).unwrap();
    let mut by_distance: Vec<(f32, f32)> = instance
        .pieces
        .iter()
        .map(|p| ((p.position - center).norm(), p.strain))
        .collect();
    by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));
    assert!(by_distance.iter().any(|(d, _)| *d >= radius));
    for (d, s) in by_distance.iter() {
        if *d >= radius {
            assert_eq!(*s, 0.);
        }
    }
    for w in by_distance.windows(2) {
        if w[1].0 < radius && w[0].0 < w[1].0 {
            assert!(w[0].1 > w[1].1);
        }
    }
}

#[test]
fn two_instances_of_one_template_break_differently() {
    let mut h = harness();
    let fracture = fracture_cube(&mut h, 4., config(10));
    let a = place_at_origin(&mut h, fracture);
    let b = h
        .engine
        .create_instance(fracture, Point3::new(50., 0., 0.), UnitQuaternion::identity(), Vector3::repeat(1.));
    let ta: Vec<_> = h.engine.instance(a).unwrap().pieces.iter().map(|p| p.strain_threshold).collect();
    let tb: Vec<_> = h.engine.instance(b).unwrap().pieces.iter().map(|p| p.strain_threshold).collect();
    assert_ne!(ta, tb);
    assert!(Arc::ptr_eq(&h.engine.instance(a).unwrap().fracture, &h.engine.instance(b).unwrap().fracture));
}
