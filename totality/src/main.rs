extern crate nalgebra as na;
extern crate totality_model as geom;
extern crate totality_shatter as shatter;
extern crate totality_sim as sim;

mod config;

use std::{
    env::args,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use geom::TriMesh;
use log::LevelFilter;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Point3, UnitQuaternion, Vector3};
use shatter::{FractureEngine, FractureId, InstanceId, MeshId, PieceId};
use sim::{command_queue, PhysicsThread, QueuedPhysics, World};

use config::{Config, DEFAULT_CONFIGURATION_PATHS};

const CUBE_MESH: MeshId = MeshId(1);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Action {
    Continue,
    Exit,
}

struct State {
    c: Config,
    engine: FractureEngine,
    physics: Option<PhysicsThread>,
    instances: Vec<InstanceId>,
    frame: u64,
}
impl State {
    fn new(cfg: Config) -> Result<State, std::io::Error> {
        let world = World::new().with_ground(Some(0.));
        let allocator = world.allocator();
        let world = Arc::new(Mutex::new(world));
        let (queue, rx) = command_queue();
        let step = Duration::from_secs(1)
            .checked_div(cfg.scene.physics_steps_per_second.max(1))
            .unwrap_or(Duration::from_millis(4));
        let physics = PhysicsThread::spawn(world, rx, step)?;

        let mut engine = FractureEngine::new(cfg.engine.clone(), Box::new(QueuedPhysics::new(queue, allocator)));
        engine.set_destruction_callback(|id: InstanceId, pieces: &[PieceId]| {
            info!("{:?} shed {} pieces.", id, pieces.len());
        });
        engine.set_high_speed_collision_callback(|id: InstanceId, at: Point3<f32>, force: f32| {
            info!("Something crashed through {:?} at {:?} with force {}.", id, at, force);
        });

        let cube = geom::unit_cube(cfg.scene.cube_size);
        let fracture: FractureId = engine.pre_fracture(CUBE_MESH, &cube.vertices, &cube.indices, cfg.destructible.clone());
        if let Some(data) = engine.fracture_data(fracture) {
            info!(
                "Fractured the cube into {} cells ({} triangles), {} bonds and {} clusters.",
                data.cell_count(),
                data.cell_meshes.iter().map(TriMesh::triangle_count).sum::<usize>(),
                data.diagram.edges.len(),
                data.hierarchy.len()
            );
        }
        let half = cfg.scene.cube_size / 2.;
        let instances = (0..cfg.scene.instance_count)
            .map(|i| {
                engine.create_instance(
                    fracture,
                    Point3::new(i as f32 * cfg.scene.spacing, half, 0.),
                    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), i as f32 * 0.3),
                    Vector3::repeat(1.),
                )
            })
            .collect();
        engine.set_viewer_position(Point3::new(0., half, -cfg.scene.spacing));

        info!("Finished initial setup.");
        Ok(State {
            c: cfg,
            engine,
            physics: Some(physics),
            instances,
            frame: 0,
        })
    }

    /// Where the next hit on an instance lands: the first piece still holding on.
    fn attached_point(&self, id: InstanceId) -> Option<Point3<f32>> {
        self.engine
            .instance(id)?
            .attached_pieces()
            .next()
            .map(|p| p.position)
    }

    fn drive(&mut self) {
        let scene = &self.c.scene;
        let frame = self.frame;
        if scene.damage_interval != 0 && frame % scene.damage_interval == 0 && !self.instances.is_empty() {
            let id = self.instances[(frame / scene.damage_interval) as usize % self.instances.len()];
            if let Some(at) = self.attached_point(id) {
                let dir = Vector3::new(0., -1., 1.);
                if self.engine.apply_damage(id, at, dir, scene.damage) {
                    debug!("Chip at {:?} broke something off {:?}.", at, id);
                }
            }
        }
        if frame == scene.explosion_frame {
            let center = Point3::new(scene.spacing, 0., 0.);
            info!("Detonating at {:?}.", center);
            self.engine
                .apply_explosion(center, scene.explosion_radius, scene.explosion_force);
        }
        if frame == scene.crash_frame {
            if let Some(&id) = self.instances.last() {
                if let Some(at) = self.attached_point(id) {
                    let velocity = Vector3::new(-scene.crash_speed, 0., 0.);
                    self.engine.apply_high_speed_collision(id, at, velocity);
                }
            }
        }
    }

    /// Pulls simulated state back into released pieces.
    fn sync(&mut self) {
        let states = {
            let world = match self.physics.as_ref().map(|p| p.world().lock()) {
                Some(Ok(w)) => w,
                Some(Err(_)) => {
                    error!("World is poisoned.");
                    return;
                }
                None => return,
            };
            self.engine
                .released_bodies()
                .into_iter()
                .filter_map(|(id, piece, body)| world.body_state(body).map(|s| (id, piece, s)))
                .collect::<Vec<_>>()
        };
        for (id, piece, state) in states.iter() {
            self.engine.sync_piece_state(*id, *piece, state);
        }
    }

    fn step(&mut self, delta: Duration) -> Action {
        if self.frame >= self.c.scene.frames {
            return Action::Exit;
        }
        if !self.physics.as_ref().map_or(false, PhysicsThread::is_running) {
            error!("Physics thread is gone, stopping.");
            return Action::Exit;
        }
        self.drive();
        self.sync();
        self.engine.update(delta.as_secs_f32());
        self.frame += 1;
        if self.frame % 60 == 0 {
            let destroyed = self
                .instances
                .iter()
                .filter(|id| self.engine.instance(**id).map_or(false, |i| i.is_destroyed))
                .count();
            debug!(
                "Frame {}: {} debris alive, {}/{} instances destroyed.",
                self.frame,
                self.engine.debris().len(),
                destroyed,
                self.instances.len()
            );
        }
        Action::Continue
    }

    fn cleanup(mut self) -> Option<std::thread::Result<()>> {
        for id in self.instances.drain(..) {
            self.engine.remove_instance(id);
        }
        info!("Shutting down physics.");
        self.physics.take().and_then(|mut p| p.finish())
    }
}

fn main() {
    let cfg = match Config::new(DEFAULT_CONFIGURATION_PATHS, args()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let level = cfg.scene.log_level.parse().unwrap_or(LevelFilter::Info);
    if let Err(e) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("Could not install logger: {}", e);
    }
    info!("Starting at {:?}.", std::path::Path::new(".").canonicalize());
    info!("Constructing + starting up.");
    let mut s = match State::new(cfg) {
        Ok(s) => s,
        Err(e) => {
            error!("Could not start the physics thread: {}", e);
            return;
        }
    };
    info!("Beginning Loop!");
    let target_per_frame = Duration::from_secs(1)
        .checked_div(s.c.scene.frames_per_second.max(1))
        .unwrap_or(Duration::from_millis(8));
    let mut last_frame = Instant::now();
    loop {
        let curr_frame = Instant::now();
        let time_step = curr_frame - last_frame;
        trace!("Frame begin. {:?} since last frame.", time_step);
        if s.step(time_step) == Action::Exit {
            break;
        }
        last_frame = curr_frame;
        let sim_duration = Instant::now() - curr_frame;
        if target_per_frame > sim_duration {
            std::thread::sleep(target_per_frame - sim_duration);
        }
    }
    info!("Beginning Cleanup!");
    if let Some(Err(_)) = s.cleanup() {
        error!("Physics thread panicked.");
    }
    info!("And that's all for today, folks!")
}
