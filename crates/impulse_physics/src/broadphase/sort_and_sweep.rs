//! Sort-and-sweep broadphase
//!
//! Proxies are sorted by their AABB minimum along the axis with the widest
//! spread of centers; each proxy is then compared only with the proxies
//! whose interval starts before its own ends.

use impulse_math::{Vec3, AABB};
use impulse_memory::Arena;

use super::{Broadphase, BroadphaseKind, BroadphaseProxy, CollisionPair, PairSink};

#[derive(Debug, Default)]
pub struct SortAndSweepBroadphase {
    order: Vec<u32>,
    sink: PairSink,
}

impl SortAndSweepBroadphase {
    pub fn new() -> Self {
        Self::default()
    }

    fn choose_sweep_axis(proxies: &[BroadphaseProxy]) -> usize {
        let spread = proxies
            .iter()
            .fold(AABB::EMPTY, |acc, p| acc.expand_to_include(p.aabb.center()));
        if spread.is_empty() {
            return 0;
        }
        let size = spread.size();
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }
}

#[inline]
fn component(v: Vec3, axis: usize) -> f32 {
    v[axis]
}

impl Broadphase for SortAndSweepBroadphase {
    fn kind(&self) -> BroadphaseKind {
        BroadphaseKind::SortAndSweep
    }

    fn find_potential_collision_pairs(
        &mut self,
        proxies: &[BroadphaseProxy],
        out: &mut Arena<CollisionPair>,
    ) {
        self.sink.begin();
        let axis = Self::choose_sweep_axis(proxies);

        self.order.clear();
        self.order.extend(0..proxies.len() as u32);
        self.order.sort_unstable_by(|&i, &j| {
            let a = component(proxies[i as usize].aabb.min, axis);
            let b = component(proxies[j as usize].aabb.min, axis);
            a.total_cmp(&b)
        });

        for (n, &i) in self.order.iter().enumerate() {
            let a = &proxies[i as usize];
            let end = component(a.aabb.max, axis);
            for &j in &self.order[n + 1..] {
                let b = &proxies[j as usize];
                if component(b.aabb.min, axis) > end {
                    break;
                }
                if a.aabb.intersects(&b.aabb) {
                    self.sink.offer(a, b, out);
                }
            }
        }
        self.sink.finish("sort-and-sweep");
    }
}
