//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! The tree is stored as a flat node array with leaves referencing ranges of
//! an item index array. It knows nothing about what the items are: the
//! caller supplies item bounds at build time and a per-item test closure at
//! query time. The scene uses it over primitive instances, meshes over their
//! triangles.

use crate::BvhSettings;
use umbra_math::{Aabb, Ray};

/// Traversal stack capacity. The build never exceeds [`Bvh::MAX_DEPTH`],
/// and traversal holds at most one pending node per level plus the root.
const STACK_SIZE: usize = 64;

/// BVH node - either a branch with two children or a leaf with items.
#[derive(Debug, Clone, Copy)]
pub enum BvhNode {
    /// Internal node with two children (indices into the node array).
    Branch { bounds: Aabb, left: u32, right: u32 },
    /// Leaf node covering `items[start..start + count]`.
    Leaf { bounds: Aabb, start: u32, count: u32 },
}

impl BvhNode {
    #[inline]
    pub fn bounds(&self) -> &Aabb {
        match self {
            BvhNode::Branch { bounds, .. } | BvhNode::Leaf { bounds, .. } => bounds,
        }
    }
}

/// Result of a BVH query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhHit {
    /// Closest accepted item, if any.
    pub item: Option<usize>,
    /// Ray parameter of the closest item, negative when nothing was hit.
    pub t: f32,
    /// Nodes popped during traversal.
    pub nodes_visited: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    items: Vec<u32>,
    depth: u32,
}

impl Bvh {
    /// Hard cap on tree depth regardless of settings.
    pub const MAX_DEPTH: u32 = 48;

    /// Build a hierarchy over items with the given bounds.
    ///
    /// An empty slice yields an empty tree whose queries always miss.
    pub fn build(item_bounds: &[Aabb], settings: &BvhSettings) -> Self {
        let mut bvh = Bvh {
            nodes: Vec::with_capacity(item_bounds.len().max(1) * 2),
            items: Vec::with_capacity(item_bounds.len()),
            depth: 0,
        };

        if item_bounds.is_empty() {
            return bvh;
        }

        let items: Vec<u32> = (0..item_bounds.len() as u32).collect();
        let split_box: Aabb = item_bounds.iter().copied().collect();
        let builder = Builder {
            item_bounds,
            min_leaf_size: settings.min_leaf_size.max(1),
            max_depth: settings.max_depth.min(Self::MAX_DEPTH),
        };
        builder.build_node(&mut bvh, items, split_box, 0);
        bvh
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Bounds of everything in the tree.
    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map_or(Aabb::EMPTY, |n| *n.bounds())
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, BvhNode::Leaf { .. }))
            .count()
    }

    /// Deepest leaf level (root is 0).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Find the closest item along `ray`.
    ///
    /// `test(item, closest)` returns the item's hit parameter, or a negative
    /// value for a miss. `closest` is the best parameter found so far; a hit
    /// only counts when it is non-negative and below it. Nodes whose box lower
    /// bound cannot beat the current best are skipped and the nearer child of
    /// a branch is visited first.
    pub fn hit<F>(&self, ray: &Ray, mut test: F) -> BvhHit
    where
        F: FnMut(usize, f32) -> f32,
    {
        let mut result = BvhHit {
            item: None,
            t: -1.0,
            nodes_visited: 0,
        };
        let Some(root) = self.nodes.first() else {
            return result;
        };

        let mut closest = ray.interval.max;
        let root_t = root.bounds().hit_distance(ray);
        if root_t < 0.0 {
            return result;
        }

        let mut stack = [(0u32, 0.0f32); STACK_SIZE];
        stack[0] = (0, root_t);
        let mut sp = 1;

        while sp > 0 {
            sp -= 1;
            let (index, entry_t) = stack[sp];
            if entry_t > closest {
                continue;
            }
            result.nodes_visited += 1;

            match self.nodes[index as usize] {
                BvhNode::Leaf { start, count, .. } => {
                    let range = start as usize..(start + count) as usize;
                    for &item in &self.items[range] {
                        let t = test(item as usize, closest);
                        if t >= 0.0 && t < closest {
                            closest = t;
                            result.item = Some(item as usize);
                            result.t = t;
                        }
                    }
                }
                BvhNode::Branch { left, right, .. } => {
                    let left_t = self.nodes[left as usize].bounds().hit_distance(ray);
                    let right_t = self.nodes[right as usize].bounds().hit_distance(ray);

                    let (near, far) = if left_t <= right_t || right_t < 0.0 {
                        ((left, left_t), (right, right_t))
                    } else {
                        ((right, right_t), (left, left_t))
                    };

                    // Far first so the near child is popped next
                    for (child, t) in [far, near] {
                        if t >= 0.0 && t <= closest && sp < STACK_SIZE {
                            stack[sp] = (child, t);
                            sp += 1;
                        }
                    }
                }
            }
        }

        result
    }
}

struct Builder<'a> {
    item_bounds: &'a [Aabb],
    min_leaf_size: usize,
    max_depth: u32,
}

impl Builder<'_> {
    fn content_bounds(&self, items: &[u32]) -> Aabb {
        items.iter().map(|&i| self.item_bounds[i as usize]).collect()
    }

    /// Recursive construction; returns the index of the created node.
    fn build_node(&self, bvh: &mut Bvh, items: Vec<u32>, split_box: Aabb, depth: u32) -> u32 {
        let bounds = self.content_bounds(&items);
        let index = bvh.nodes.len() as u32;
        bvh.depth = bvh.depth.max(depth);

        if items.len() <= self.min_leaf_size || depth >= self.max_depth {
            bvh.nodes.push(BvhNode::Leaf {
                bounds,
                start: bvh.items.len() as u32,
                count: items.len() as u32,
            });
            bvh.items.extend_from_slice(&items);
            return index;
        }

        // Reserve the slot; children follow it in the array
        bvh.nodes.push(BvhNode::Leaf {
            bounds,
            start: 0,
            count: 0,
        });

        let (left, right, left_box, right_box) = self.partition(items, &split_box, &bounds);
        let left = self.build_node(bvh, left, left_box, depth + 1);
        let right = self.build_node(bvh, right, right_box, depth + 1);

        bvh.nodes[index as usize] = BvhNode::Branch {
            bounds,
            left,
            right,
        };
        index
    }

    /// Split items between the two halves of `split_box`.
    ///
    /// Falls back to the content bounds, then to an even split by index, when
    /// one side ends up empty.
    fn partition(
        &self,
        items: Vec<u32>,
        split_box: &Aabb,
        content: &Aabb,
    ) -> (Vec<u32>, Vec<u32>, Aabb, Aabb) {
        for candidate in [split_box, content] {
            let (left_box, right_box) = candidate.split();
            let (left, right): (Vec<u32>, Vec<u32>) = items.iter().partition(|&&i| {
                let b = &self.item_bounds[i as usize];
                b.overlaps(&left_box) || !b.overlaps(&right_box)
            });
            if !left.is_empty() && !right.is_empty() {
                return (left, right, left_box, right_box);
            }
        }

        let mut left = items;
        let right = left.split_off(left.len() / 2);
        let left_box = self.content_bounds(&left);
        let right_box = self.content_bounds(&right);
        (left, right, left_box, right_box)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use umbra_math::Vec3;

    #[derive(Clone, Copy)]
    struct Ball {
        center: Vec3,
        radius: f32,
    }

    impl Ball {
        fn bounds(&self) -> Aabb {
            Aabb::from_points(self.center - self.radius, self.center + self.radius)
        }

        fn hit(&self, ray: &Ray, max: f32) -> f32 {
            let oc = self.center - ray.origin;
            let a = ray.direction.length_squared();
            let h = ray.direction.dot(oc);
            let c = oc.length_squared() - self.radius * self.radius;
            let disc = h * h - a * c;
            if disc < 0.0 {
                return -1.0;
            }
            let sq = disc.sqrt();
            [(h - sq) / a, (h + sq) / a]
                .into_iter()
                .find(|&t| t >= ray.interval.min && t <= max)
                .unwrap_or(-1.0)
        }
    }

    fn random_balls(rng: &mut StdRng, n: usize) -> Vec<Ball> {
        (0..n)
            .map(|_| Ball {
                center: Vec3::new(
                    rng.gen_range(-20.0..20.0),
                    rng.gen_range(-20.0..20.0),
                    rng.gen_range(-20.0..20.0),
                ),
                radius: rng.gen_range(0.1..2.0),
            })
            .collect()
    }

    fn brute_force(balls: &[Ball], ray: &Ray) -> f32 {
        balls
            .iter()
            .map(|b| b.hit(ray, ray.interval.max))
            .filter(|&t| t >= 0.0)
            .fold(-1.0, |best, t| if best < 0.0 || t < best { t } else { best })
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = Bvh::build(&[], &BvhSettings::default());

        assert!(bvh.is_empty());
        let hit = bvh.hit(&Ray::new(Vec3::ZERO, Vec3::Z), |_, _| 0.0);
        assert_eq!(hit.item, None);
        assert!(hit.t < 0.0);
    }

    #[test]
    fn test_bvh_single_item_is_leaf() {
        let ball = Ball {
            center: Vec3::new(0.0, 0.0, -1.0),
            radius: 0.5,
        };
        let bvh = Bvh::build(&[ball.bounds()], &BvhSettings::default());

        assert!(matches!(bvh.nodes()[0], BvhNode::Leaf { count: 1, .. }));

        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let hit = bvh.hit(&ray, |_, max| ball.hit(&ray, max));
        assert_eq!(hit.item, Some(0));
        assert!((hit.t - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        let balls = random_balls(&mut rng, 200);
        let bounds: Vec<Aabb> = balls.iter().map(Ball::bounds).collect();
        let bvh = Bvh::build(&bounds, &BvhSettings::default());

        for _ in 0..500 {
            let origin = Vec3::new(
                rng.gen_range(-30.0..30.0),
                rng.gen_range(-30.0..30.0),
                rng.gen_range(-30.0..30.0),
            );
            let dir = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if dir.length_squared() < 1e-4 {
                continue;
            }
            let ray = Ray::new(origin, dir);

            let expected = brute_force(&balls, &ray);
            let hit = bvh.hit(&ray, |i, max| balls[i].hit(&ray, max));

            if expected < 0.0 {
                assert!(hit.item.is_none(), "bvh hit {:?} where brute force missed", hit);
            } else {
                assert!(
                    (hit.t - expected).abs() < 1e-3,
                    "bvh t={} brute force t={}",
                    hit.t,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_bvh_structure_limits() {
        let mut rng = StdRng::seed_from_u64(7);
        let balls = random_balls(&mut rng, 100);
        let bounds: Vec<Aabb> = balls.iter().map(Ball::bounds).collect();
        let settings = BvhSettings {
            min_leaf_size: 2,
            max_depth: 5,
        };
        let bvh = Bvh::build(&bounds, &settings);

        assert!(bvh.depth() <= 5);
        assert!(bvh.leaf_count() >= 2);

        let mut seen = vec![false; balls.len()];
        for node in bvh.nodes() {
            if let BvhNode::Leaf { start, count, .. } = node {
                for &item in &bvh.items[*start as usize..(*start + *count) as usize] {
                    seen[item as usize] = true;
                    assert!(node.bounds().contains_box(&bounds[item as usize]));
                }
            }
        }
        assert!(seen.iter().all(|&s| s), "every item must land in a leaf");
    }

    #[test]
    fn test_bvh_identical_items_fall_back_to_index_split() {
        let b = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let bvh = Bvh::build(&[b; 9], &BvhSettings::default());

        assert!(bvh.node_count() > 1);
        assert_eq!(bvh.items.len(), 9);
    }

    #[test]
    fn test_bvh_prunes_far_nodes() {
        // A row of balls along -Z; the first one occludes the rest
        let balls: Vec<Ball> = (0..64)
            .map(|i| Ball {
                center: Vec3::new(0.0, 0.0, -2.0 - 3.0 * i as f32),
                radius: 1.0,
            })
            .collect();
        let bounds: Vec<Aabb> = balls.iter().map(Ball::bounds).collect();
        let bvh = Bvh::build(&bounds, &BvhSettings::default());

        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let hit = bvh.hit(&ray, |i, max| balls[i].hit(&ray, max));

        assert_eq!(hit.item, Some(0));
        assert!((hit.t - 1.0).abs() < 1e-4);
        assert!((hit.nodes_visited as usize) < bvh.node_count());
    }
}
