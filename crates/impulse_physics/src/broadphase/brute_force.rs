//! O(n²) broadphase

use impulse_memory::Arena;

use super::{Broadphase, BroadphaseKind, BroadphaseProxy, CollisionPair, PairSink};

#[derive(Debug, Default)]
pub struct BruteForceBroadphase {
    sink: PairSink,
}

impl BruteForceBroadphase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Broadphase for BruteForceBroadphase {
    fn kind(&self) -> BroadphaseKind {
        BroadphaseKind::BruteForce
    }

    fn find_potential_collision_pairs(
        &mut self,
        proxies: &[BroadphaseProxy],
        out: &mut Arena<CollisionPair>,
    ) {
        self.sink.begin();
        for (i, a) in proxies.iter().enumerate() {
            for b in &proxies[i + 1..] {
                // Bounds pre-check keeps the pair arena for plausible pairs only.
                if a.aabb.intersects(&b.aabb) {
                    self.sink.offer(a, b, out);
                }
            }
        }
        self.sink.finish("brute-force");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadphase::test_support::{proxy, sorted_keys};
    use impulse_math::Vec3;

    #[test]
    fn test_brute_force_finds_overlaps() {
        let proxies = [
            proxy(0, Vec3::ZERO, 1.0),
            proxy(1, Vec3::new(1.5, 0.0, 0.0), 1.0),
            proxy(2, Vec3::new(10.0, 0.0, 0.0), 1.0),
        ];
        let mut out = Arena::new(16);
        let mut broadphase = BruteForceBroadphase::new();
        broadphase.find_potential_collision_pairs(&proxies, &mut out);

        assert_eq!(sorted_keys(&out), vec![1]);
    }

    #[test]
    fn test_brute_force_skips_static_pairs() {
        let mut a = proxy(0, Vec3::ZERO, 1.0);
        let mut b = proxy(1, Vec3::ZERO, 1.0);
        a.is_static = true;
        b.is_static = true;
        let mut out = Arena::new(16);
        BruteForceBroadphase::new().find_potential_collision_pairs(&[a, b], &mut out);
        assert!(out.is_empty());
    }
}
