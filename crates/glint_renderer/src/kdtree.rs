//! kd-tree over photons with bounded k-nearest-neighbour search.
//!
//! Nodes live in a flat arena and refer to their children by index. Both
//! construction and queries use explicit stacks, so a degenerate photon set
//! (every photon on the same coordinate) cannot overflow the call stack.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::ops::Range;

use crate::photon::{Photon, PhotonMapError, PhotonMapResult};
use glint_math::{Aabb, Axis, Vec3};
use rand::{Rng, RngCore};

/// Index of a node in the tree arena.
pub type NodeId = usize;

/// A tree node: one photon, the axis it splits on and two optional subtrees.
///
/// Every photon in `left` has a split-axis coordinate <= this photon's, every
/// photon in `right` a strictly greater one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdNode {
    pub photon: Photon,
    pub axis: Axis,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

/// Balanced kd-tree owning its photons.
#[derive(Debug, Clone, Default)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    root: Option<NodeId>,
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl KdTree {
    /// A tree with no photons.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a tree from a photon set.
    ///
    /// Each node splits on the axis of largest extent of its photons and holds
    /// the exact median along that axis, found by randomized selection.
    pub fn build(mut photons: Vec<Photon>, rng: &mut dyn RngCore) -> PhotonMapResult<Self> {
        let count = photons.len();
        let mut nodes = Vec::new();
        nodes
            .try_reserve_exact(count)
            .map_err(|source| PhotonMapError::Allocation { count, source })?;

        let mut root = None;
        let mut pending: Vec<(Range<usize>, Option<(NodeId, Side)>)> = Vec::new();
        if count > 0 {
            pending.push((0..count, None));
        }

        while let Some((range, parent)) = pending.pop() {
            let slice = &mut photons[range.clone()];
            let (axis, split) = partition_at_median(slice, rng);

            let id = nodes.len();
            nodes.push(KdNode {
                photon: slice[split],
                axis,
                left: None,
                right: None,
            });
            match parent {
                None => root = Some(id),
                Some((parent, Side::Left)) => nodes[parent].left = Some(id),
                Some((parent, Side::Right)) => nodes[parent].right = Some(id),
            }

            let median = range.start + split;
            if median > range.start {
                pending.push((range.start..median, Some((id, Side::Left))));
            }
            if median + 1 < range.end {
                pending.push((median + 1..range.end, Some((id, Side::Right))));
            }
        }

        Ok(Self { nodes, root })
    }

    /// Number of photons in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &KdNode {
        &self.nodes[id]
    }

    /// Photons in left-node-right order.
    pub fn in_order(&self) -> Vec<Photon> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::new();
        let mut current = self.root;
        loop {
            while let Some(id) = current {
                stack.push(id);
                current = self.nodes[id].left;
            }
            let Some(id) = stack.pop() else {
                break;
            };
            out.push(self.nodes[id].photon);
            current = self.nodes[id].right;
        }
        out
    }

    /// Find up to `nearest.capacity()` photons closest to `target` whose
    /// squared distance is below `max_distance_squared`.
    ///
    /// Previous contents of `nearest` are discarded. Returns the number of
    /// photons found.
    pub fn k_nearest(&self, target: Vec3, max_distance_squared: f32, nearest: &mut NearestPhotons) -> usize {
        nearest.clear();
        let Some(root) = self.root else {
            return 0;
        };
        if nearest.capacity() == 0 {
            return 0;
        }

        let mut stack = std::mem::take(&mut nearest.stack);
        stack.push(Visit::Node(root));

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Node(id) => {
                    let node = &self.nodes[id];
                    let distance_squared = node.photon.position.distance_squared(target);
                    if distance_squared < max_distance_squared {
                        nearest.offer(distance_squared, node.photon);
                    }

                    let delta = node.axis.of(target) - node.axis.of(node.photon.position);
                    let (near, far) = if delta <= 0.0 {
                        (node.left, node.right)
                    } else {
                        (node.right, node.left)
                    };
                    // The far side is checked only after the near side is done
                    if let Some(far) = far {
                        stack.push(Visit::Far {
                            node: far,
                            plane_distance_squared: delta * delta,
                        });
                    }
                    if let Some(near) = near {
                        stack.push(Visit::Node(near));
                    }
                }
                Visit::Far {
                    node,
                    plane_distance_squared,
                } => {
                    let reachable = plane_distance_squared < max_distance_squared
                        && nearest
                            .max_distance_squared()
                            .map_or(true, |worst| !nearest.is_full() || plane_distance_squared < worst);
                    if reachable {
                        stack.push(Visit::Node(node));
                    }
                }
            }
        }

        nearest.stack = stack;
        nearest.len()
    }
}

/// Pending work for the query traversal.
#[derive(Debug, Clone, Copy)]
enum Visit {
    Node(NodeId),
    Far {
        node: NodeId,
        plane_distance_squared: f32,
    },
}

/// Reorder `photons` around their median and return `(axis, median index)`.
///
/// Afterwards everything before the median index is <= the median on `axis`
/// and everything after it is strictly greater.
fn partition_at_median(photons: &mut [Photon], rng: &mut dyn RngCore) -> (Axis, usize) {
    let axis = Aabb::enclosing(photons.iter().map(|p| p.position)).longest_axis();
    let k = photons.len() / 2;
    select_nth(photons, k, axis, rng);

    // Values equal to the median may still sit on the right; pull them left
    let median = axis.of(photons[k].position);
    let mut boundary = k + 1;
    for i in k + 1..photons.len() {
        if axis.of(photons[i].position) <= median {
            photons.swap(i, boundary);
            boundary += 1;
        }
    }
    let split = boundary - 1;
    photons.swap(k, split);
    (axis, split)
}

/// Randomized quickselect with a three-way partition.
///
/// Places the k-th smallest photon (on `axis`) at index `k`, with smaller or
/// equal values before it and greater or equal values after it.
fn select_nth(photons: &mut [Photon], k: usize, axis: Axis, rng: &mut dyn RngCore) {
    let mut lo = 0;
    let mut hi = photons.len();
    while hi - lo > 1 {
        let pivot = axis.of(photons[rng.gen_range(lo..hi)].position);

        // [lo, lt) < pivot, [lt, i) == pivot, [gt, hi) > pivot
        let mut lt = lo;
        let mut i = lo;
        let mut gt = hi;
        while i < gt {
            let value = axis.of(photons[i].position);
            if value < pivot {
                photons.swap(lt, i);
                lt += 1;
                i += 1;
            } else if value > pivot {
                gt -= 1;
                photons.swap(i, gt);
            } else {
                i += 1;
            }
        }

        if k < lt {
            hi = lt;
        } else if k >= gt {
            lo = gt;
        } else {
            return;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_squared: f32,
    photon: Photon,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_squared.total_cmp(&other.distance_squared)
    }
}

/// Bounded result set for [`KdTree::k_nearest`].
///
/// A max-heap keyed by squared distance, so the farthest accepted photon is
/// always on top. Reuse one per thread to avoid reallocating per query.
#[derive(Debug, Clone)]
pub struct NearestPhotons {
    capacity: usize,
    heap: BinaryHeap<Candidate>,
    stack: Vec<Visit>,
}

impl NearestPhotons {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity),
            stack: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Squared distance of the farthest accepted photon.
    pub fn max_distance_squared(&self) -> Option<f32> {
        self.heap.peek().map(|c| c.distance_squared)
    }

    /// Accepted photons with their squared distances, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Photon, f32)> {
        self.heap.iter().map(|c| (&c.photon, c.distance_squared))
    }

    /// Squared distances sorted nearest first.
    pub fn sorted_distances(&self) -> Vec<f32> {
        let mut distances: Vec<f32> = self.heap.iter().map(|c| c.distance_squared).collect();
        distances.sort_by(f32::total_cmp);
        distances
    }

    fn offer(&mut self, distance_squared: f32, photon: Photon) {
        if self.capacity == 0 {
            return;
        }
        let candidate = Candidate {
            distance_squared,
            photon,
        };
        if !self.is_full() {
            self.heap.push(candidate);
        } else if self
            .max_distance_squared()
            .is_some_and(|worst| distance_squared < worst)
        {
            // Evict the current farthest
            self.heap.pop();
            self.heap.push(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn photon_at(position: Vec3) -> Photon {
        Photon {
            position,
            direction: Vec3::NEG_Y,
            power: [255, 255, 255, 255],
            bounce: 1,
        }
    }

    fn random_photons(count: usize, seed: u64) -> Vec<Photon> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                photon_at(Vec3::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(0.0..10.0),
                ))
            })
            .collect()
    }

    fn sort_key(p: &Photon) -> [u32; 3] {
        [
            p.position.x.to_bits(),
            p.position.y.to_bits(),
            p.position.z.to_bits(),
        ]
    }

    fn assert_same_set(mut a: Vec<Photon>, mut b: Vec<Photon>) {
        a.sort_by_key(sort_key);
        b.sort_by_key(sort_key);
        assert_eq!(a, b);
    }

    /// Walk every node and check the split invariant against its whole subtree.
    fn assert_split_invariant(tree: &KdTree) {
        for id in 0..tree.len() {
            let node = tree.node(id);
            let split = node.axis.of(node.photon.position);
            let mut stack: Vec<(NodeId, bool)> = Vec::new();
            stack.extend(node.left.map(|l| (l, true)));
            stack.extend(node.right.map(|r| (r, false)));
            while let Some((child, is_left)) = stack.pop() {
                let value = node.axis.of(tree.node(child).photon.position);
                if is_left {
                    assert!(value <= split, "left value {value} > split {split}");
                } else {
                    assert!(value > split, "right value {value} <= split {split}");
                }
                let c = tree.node(child);
                stack.extend(c.left.map(|l| (l, is_left)));
                stack.extend(c.right.map(|r| (r, is_left)));
            }
        }
    }

    fn brute_force(photons: &[Photon], target: Vec3, k: usize, max_distance_squared: f32) -> Vec<f32> {
        let mut distances: Vec<f32> = photons
            .iter()
            .map(|p| p.position.distance_squared(target))
            .filter(|d| *d < max_distance_squared)
            .collect();
        distances.sort_by(f32::total_cmp);
        distances.truncate(k);
        distances
    }

    #[test]
    fn test_empty_tree() {
        let mut rng = StdRng::seed_from_u64(0);
        let tree = KdTree::build(Vec::new(), &mut rng).unwrap();
        assert!(tree.is_empty());
        assert!(tree.root().is_none());

        let mut nearest = NearestPhotons::new(8);
        assert_eq!(tree.k_nearest(Vec3::ZERO, 100.0, &mut nearest), 0);
    }

    #[test]
    fn test_build_keeps_every_photon() {
        for (count, seed) in [(1, 1), (2, 2), (7, 3), (100, 4), (1000, 5)] {
            let photons = random_photons(count, seed);
            let mut rng = StdRng::seed_from_u64(seed);
            let tree = KdTree::build(photons.clone(), &mut rng).unwrap();

            assert_eq!(tree.len(), count);
            assert_same_set(tree.in_order(), photons);
            assert_split_invariant(&tree);
        }
    }

    #[test]
    fn test_root_holds_median() {
        // Spread along X only, so X is the split axis
        let photons: Vec<Photon> = (0..9)
            .map(|i| photon_at(Vec3::new(i as f32, 0.0, 0.0)))
            .collect();
        let mut rng = StdRng::seed_from_u64(9);
        let tree = KdTree::build(photons, &mut rng).unwrap();

        let root = tree.node(tree.root().unwrap());
        assert_eq!(root.axis, Axis::X);
        assert_eq!(root.photon.position.x, 4.0);
    }

    #[test]
    fn test_in_order_is_sorted_along_single_axis() {
        let photons: Vec<Photon> = (0..64)
            .rev()
            .map(|i| photon_at(Vec3::new(0.0, 0.0, i as f32 * 0.5)))
            .collect();
        let mut rng = StdRng::seed_from_u64(10);
        let tree = KdTree::build(photons, &mut rng).unwrap();

        let z: Vec<f32> = tree.in_order().iter().map(|p| p.position.z).collect();
        assert!(z.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_coincident_photons() {
        let photons = vec![photon_at(Vec3::splat(1.5)); 5000];
        let mut rng = StdRng::seed_from_u64(11);
        let tree = KdTree::build(photons.clone(), &mut rng).unwrap();

        assert_eq!(tree.len(), 5000);
        assert_same_set(tree.in_order(), photons);
        assert_split_invariant(&tree);

        let mut nearest = NearestPhotons::new(63);
        assert_eq!(tree.k_nearest(Vec3::splat(1.5), 1.0, &mut nearest), 63);
        assert_eq!(nearest.max_distance_squared(), Some(0.0));
    }

    #[test]
    fn test_duplicates_go_left() {
        let mut photons = vec![photon_at(Vec3::new(1.0, 0.0, 0.0)); 4];
        photons.push(photon_at(Vec3::new(2.0, 0.0, 0.0)));
        photons.push(photon_at(Vec3::new(0.0, 0.0, 0.0)));
        let mut rng = StdRng::seed_from_u64(12);
        let tree = KdTree::build(photons.clone(), &mut rng).unwrap();

        assert_same_set(tree.in_order(), photons);
        assert_split_invariant(&tree);
    }

    #[test]
    fn test_k_nearest_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(13);
        for (count, k, max_distance_squared) in [
            (1, 1, 100.0),
            (10, 3, 100.0),
            (200, 63, 4.0),
            (500, 10, 1.0),
            (1000, 63, 100.0),
            (1000, 1, 0.25),
        ] {
            let photons = random_photons(count, count as u64 + k as u64);
            let tree = KdTree::build(photons.clone(), &mut rng).unwrap();
            let mut nearest = NearestPhotons::new(k);

            for _ in 0..50 {
                let target = Vec3::new(
                    rng.gen_range(-6.0..6.0),
                    rng.gen_range(-6.0..6.0),
                    rng.gen_range(-1.0..11.0),
                );
                let found = tree.k_nearest(target, max_distance_squared, &mut nearest);
                let expected = brute_force(&photons, target, k, max_distance_squared);

                assert!(found <= k);
                assert_eq!(found, nearest.len());
                assert!(nearest.iter().all(|(_, d)| d < max_distance_squared));
                assert!(nearest
                    .iter()
                    .all(|(p, d)| p.position.distance_squared(target) == d));
                assert_eq!(nearest.sorted_distances(), expected);
            }
        }
    }

    #[test]
    fn test_k_nearest_respects_radius() {
        let photons: Vec<Photon> = (0..10)
            .map(|i| photon_at(Vec3::new(i as f32, 0.0, 0.0)))
            .collect();
        let mut rng = StdRng::seed_from_u64(14);
        let tree = KdTree::build(photons, &mut rng).unwrap();

        let mut nearest = NearestPhotons::new(10);
        // Squared radius 4.5 admits x = 0, 1, 2
        assert_eq!(tree.k_nearest(Vec3::ZERO, 4.5, &mut nearest), 3);
        assert_eq!(nearest.max_distance_squared(), Some(4.0));

        // Reuse drops the previous results
        assert_eq!(tree.k_nearest(Vec3::new(100.0, 0.0, 0.0), 4.5, &mut nearest), 0);
        assert!(nearest.is_empty());
    }

    #[test]
    fn test_zero_capacity() {
        let photons = random_photons(20, 15);
        let mut rng = StdRng::seed_from_u64(15);
        let tree = KdTree::build(photons, &mut rng).unwrap();
        let mut nearest = NearestPhotons::new(0);
        assert_eq!(tree.k_nearest(Vec3::ZERO, 100.0, &mut nearest), 0);
    }
}
