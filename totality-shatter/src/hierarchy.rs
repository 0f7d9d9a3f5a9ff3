//! Bottom-up clustering of cells into a break hierarchy.
//!
//! Leaf `i` always covers cell `i` alone, so leaf, cell and piece indices coincide. Parents are
//! appended after the leaves, level by level.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Point3, Vector3};

use crate::{
    config::DestructibleConfig,
    ids::{CellId, ClusterId},
    rng::FractureRng,
    voronoi::VoronoiCell,
};

/// Parent thresholds are `base * covered cells * PARENT_THRESHOLD_SCALE`. The count is every cell
/// under the node, not its direct children, so thresholds keep growing level over level.
const PARENT_THRESHOLD_SCALE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterNode {
    pub id: ClusterId,
    pub parent: Option<ClusterId>,
    pub children: Vec<ClusterId>,
    /// Every cell under this node.
    pub cells: Vec<CellId>,
    pub center: Point3<f32>,
    pub radius: f32,
    pub break_threshold: f32,
    pub total_strain: f32,
    pub is_leaf: bool,
    pub is_broken: bool,
    /// 0 for leaves.
    pub level: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterHierarchy {
    pub nodes: Vec<ClusterNode>,
    pub roots: Vec<ClusterId>,
}

impl ClusterHierarchy {
    pub fn build(cells: &[VoronoiCell], config: &DestructibleConfig, rng: &mut FractureRng) -> Self {
        let mut nodes: Vec<ClusterNode> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| ClusterNode {
                id: ClusterId(i as u32),
                parent: None,
                children: vec![],
                cells: vec![cell.id],
                center: cell.centroid,
                radius: cell.volume.cbrt(),
                break_threshold: rng.threshold(config.base_strain_threshold, config.strain_variance),
                total_strain: 0.,
                is_leaf: true,
                is_broken: false,
                level: 0,
            })
            .collect();

        let mut current: Vec<ClusterId> = nodes.iter().map(|n| n.id).collect();
        let mut radius = config.cluster_radius;
        for level in 1..=config.hierarchy_levels {
            if current.len() <= 1 {
                break;
            }
            let mut next = Vec::with_capacity(current.len());
            let mut assigned = vec![false; current.len()];
            for s in 0..current.len() {
                if assigned[s] {
                    continue;
                }
                assigned[s] = true;
                let seed_center = nodes[current[s].index()].center;
                let mut group = vec![current[s]];
                for o in s + 1..current.len() {
                    if !assigned[o] && (nodes[current[o].index()].center - seed_center).norm() <= radius {
                        assigned[o] = true;
                        group.push(current[o]);
                    }
                }
                if group.len() == 1 {
                    next.push(current[s]);
                    continue;
                }
                let parent = Self::parent_of(&mut nodes, group, level, config.base_strain_threshold);
                next.push(parent);
            }
            trace!("Cluster level {}: {} -> {} nodes at radius {}.", level, current.len(), next.len(), radius);
            current = next;
            radius *= 2.;
        }
        Self { nodes, roots: current }
    }

    fn parent_of(nodes: &mut Vec<ClusterNode>, children: Vec<ClusterId>, level: usize, base: f32) -> ClusterId {
        let id = ClusterId(nodes.len() as u32);
        let center = Point3::from(
            children.iter().fold(Vector3::zeros(), |acc, c| acc + nodes[c.index()].center.coords) / children.len() as f32,
        );
        let radius = children
            .iter()
            .map(|c| (nodes[c.index()].center - center).norm() + nodes[c.index()].radius)
            .fold(0., f32::max);
        let mut cells: Vec<CellId> = children.iter().flat_map(|c| nodes[c.index()].cells.iter().copied()).collect();
        cells.sort_unstable();
        for c in children.iter() {
            nodes[c.index()].parent = Some(id);
        }
        nodes.push(ClusterNode {
            id,
            parent: None,
            break_threshold: base * cells.len() as f32 * PARENT_THRESHOLD_SCALE,
            children,
            cells,
            center,
            radius,
            total_strain: 0.,
            is_leaf: false,
            is_broken: false,
            level,
        });
        id
    }

    pub fn get(&self, id: ClusterId) -> Option<&ClusterNode> {
        self.nodes.get(id.index())
    }

    pub fn leaves(&self) -> impl Iterator<Item = &ClusterNode> {
        self.nodes.iter().filter(|n| n.is_leaf)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(nodes: &[ClusterNode], id: ClusterId) -> impl Iterator<Item = ClusterId> + '_ {
        std::iter::successors(nodes.get(id.index()).and_then(|n| n.parent), move |p| {
            nodes.get(p.index()).and_then(|n| n.parent)
        })
    }
}
