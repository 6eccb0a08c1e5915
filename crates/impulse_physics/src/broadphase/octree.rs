//! Octree broadphase
//!
//! All proxies are bounded by one cube, which is split by its three
//! midplanes. Each proxy is copied into every child its bounds overlap, and
//! children split again until they hold few enough proxies, hit the depth
//! limit, or get too small. Leaves holding more than one proxy then run the
//! pairwise scan over their own proxies only.
//!
//! Nodes and proxy index lists live in bump arenas reset every step. When an
//! arena runs out mid-split, both arenas roll back to where the split began
//! and the node stays a leaf.

use core::ops::Range;

use impulse_math::AABB;
use impulse_memory::{Arena, FrameStorage};

use super::{Broadphase, BroadphaseKind, BroadphaseProxy, CollisionPair, PairSink};

/// Depth limit applied whatever the configured maximum
pub const OCTREE_DEPTH_CEILING: u32 = 32;

/// Nodes narrower than this are not split further
pub const MIN_NODE_EXTENT: f32 = 1e-3;

/// Padding around the root cube
const ROOT_MARGIN: f32 = 1e-3;

#[derive(Debug, Clone)]
struct OctreeNode {
    bounds: AABB,
    items: Range<usize>,
    depth: u32,
    first_child: Option<usize>,
}

pub struct OctreeBroadphase {
    max_objects_per_node: usize,
    max_depth: u32,
    nodes: Arena<OctreeNode>,
    indices: Arena<u32>,
    scratch: Vec<u32>,
    stack: Vec<usize>,
    partitions: Vec<AABB>,
    sink: PairSink,
    degraded_nodes: usize,
}

impl OctreeBroadphase {
    pub fn new(
        max_objects_per_node: usize,
        max_depth: u32,
        node_capacity: usize,
        index_capacity: usize,
    ) -> Self {
        Self {
            max_objects_per_node: max_objects_per_node.max(1),
            max_depth,
            nodes: Arena::new(node_capacity),
            indices: Arena::new(index_capacity),
            scratch: Vec::new(),
            stack: Vec::new(),
            partitions: Vec::new(),
            sink: PairSink::default(),
            degraded_nodes: 0,
        }
    }

    /// Nodes built by the last run
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes that could not split for lack of arena space in the last run
    pub fn degraded_nodes(&self) -> usize {
        self.degraded_nodes
    }

    fn depth_limit(&self) -> u32 {
        self.max_depth.min(OCTREE_DEPTH_CEILING)
    }

    fn build(&mut self, proxies: &[BroadphaseProxy]) -> bool {
        let root_bounds = proxies
            .iter()
            .fold(AABB::EMPTY, |acc, p| acc.union(&p.aabb))
            .to_cube()
            .expand(ROOT_MARGIN);

        let Some(items) = self.indices.alloc_extend(0..proxies.len() as u32) else {
            return false;
        };
        let Some(root) = self.nodes.alloc(OctreeNode {
            bounds: root_bounds,
            items,
            depth: 0,
            first_child: None,
        }) else {
            return false;
        };

        self.stack.clear();
        self.stack.push(root);
        while let Some(node_index) = self.stack.pop() {
            if self.split(node_index, proxies) {
                if let Some(first) = self.nodes[node_index].first_child {
                    self.stack.extend(first..first + 8);
                }
            }
        }
        true
    }

    /// Split one node into eight children. Returns false if it stays a leaf.
    fn split(&mut self, node_index: usize, proxies: &[BroadphaseProxy]) -> bool {
        let node = self.nodes[node_index].clone();
        let count = node.items.len();
        if count <= self.max_objects_per_node
            || node.depth >= self.depth_limit()
            || node.bounds.size().max_element() < MIN_NODE_EXTENT
        {
            return false;
        }

        let node_state = self.nodes.save();
        let index_state = self.indices.save();

        let mut child_items: [Range<usize>; 8] = Default::default();
        for (octant, slot) in child_items.iter_mut().enumerate() {
            let bounds = node.bounds.octant(octant);
            self.scratch.clear();
            for k in node.items.clone() {
                let proxy = self.indices[k];
                if proxies[proxy as usize].aabb.intersects(&bounds) {
                    self.scratch.push(proxy);
                }
            }
            match self.indices.alloc_extend(self.scratch.iter().copied()) {
                Some(range) => *slot = range,
                None => {
                    self.indices.restore(index_state);
                    self.degraded_nodes += 1;
                    return false;
                }
            }
        }

        let children = child_items.into_iter().enumerate().map(|(octant, items)| OctreeNode {
            bounds: node.bounds.octant(octant),
            items,
            depth: node.depth + 1,
            first_child: None,
        });
        match self.nodes.alloc_extend(children) {
            Some(range) => {
                self.nodes[node_index].first_child = Some(range.start);
                true
            }
            None => {
                self.nodes.restore(node_state);
                self.indices.restore(index_state);
                self.degraded_nodes += 1;
                false
            }
        }
    }

    fn scan(
        sink: &mut PairSink,
        members: impl Iterator<Item = u32> + Clone,
        proxies: &[BroadphaseProxy],
        out: &mut Arena<CollisionPair>,
    ) {
        let mut rest = members;
        while let Some(i) = rest.next() {
            let a = &proxies[i as usize];
            for j in rest.clone() {
                let b = &proxies[j as usize];
                if a.aabb.intersects(&b.aabb) {
                    sink.offer(a, b, out);
                }
            }
        }
    }
}

impl Broadphase for OctreeBroadphase {
    fn kind(&self) -> BroadphaseKind {
        BroadphaseKind::Octree {
            max_objects_per_node: self.max_objects_per_node,
            max_depth: self.max_depth,
        }
    }

    fn find_potential_collision_pairs(
        &mut self,
        proxies: &[BroadphaseProxy],
        out: &mut Arena<CollisionPair>,
    ) {
        self.nodes.reset();
        self.indices.reset();
        self.partitions.clear();
        self.degraded_nodes = 0;
        self.sink.begin();

        if proxies.len() < 2 {
            return;
        }

        if !self.build(proxies) {
            log::warn!(
                "Octree scratch too small for {} bodies, scanning them as one leaf",
                proxies.len()
            );
            Self::scan(&mut self.sink, 0..proxies.len() as u32, proxies, out);
            self.sink.finish("octree");
            return;
        }
        if self.degraded_nodes > 0 {
            log::debug!("Octree: {} nodes left unsplit (arena full)", self.degraded_nodes);
        }

        for node in self.nodes.iter() {
            self.partitions.push(node.bounds);
            if node.first_child.is_none() && node.items.len() > 1 {
                let members = self.indices.slice(node.items.clone()).iter().copied();
                Self::scan(&mut self.sink, members, proxies, out);
            }
        }
        self.sink.finish("octree");
    }

    fn debug_partitions(&self) -> &[AABB] {
        &self.partitions
    }
}
