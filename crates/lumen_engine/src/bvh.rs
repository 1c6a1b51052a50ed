//! Bounding Volume Hierarchy over scene primitives
//!
//! A binary tree with one primitive per leaf, split at the median centroid
//! along the longest axis. Rebuilt from scratch every time a model is
//! finalized.

use lumen_math::{ray_aabb_interval, Ray, Vec3, AABB};

/// BVH node internal representation
#[derive(Clone, Debug)]
struct BvhNode {
    /// Bounding box for this node
    bounds: AABB,
    /// Primitive index (only for leaf nodes)
    primitive: Option<u32>,
    left: Option<usize>,
    right: Option<usize>,
}

/// Bounding Volume Hierarchy for ray queries
#[derive(Clone, Debug, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    root: Option<usize>,
}

impl Bvh {
    /// Create a new empty BVH
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from per-primitive bounds; leaf `i` refers to `bounds[i]`
    pub fn build(bounds: &[AABB]) -> Self {
        let mut bvh = Self::new();
        if bounds.is_empty() {
            return bvh;
        }

        let mut items: Vec<(u32, AABB, Vec3)> = bounds
            .iter()
            .enumerate()
            .map(|(i, b)| (i as u32, *b, b.center()))
            .collect();

        bvh.nodes.reserve(2 * items.len());
        bvh.root = Some(bvh.build_recursive(&mut items));
        bvh
    }

    fn build_recursive(&mut self, items: &mut [(u32, AABB, Vec3)]) -> usize {
        let node_index = self.nodes.len();

        if let [(primitive, bounds, _)] = items {
            self.nodes.push(BvhNode {
                bounds: *bounds,
                primitive: Some(*primitive),
                left: None,
                right: None,
            });
            return node_index;
        }

        let bounds = items
            .iter()
            .fold(AABB::EMPTY, |acc, (_, b, _)| acc.union(b));

        // Split along the axis where centroids spread the most
        let centroid_bounds = items
            .iter()
            .fold(AABB::EMPTY, |acc, (_, _, c)| acc.expand_to_include(*c));
        let axis = centroid_bounds.largest_axis();
        items.sort_by(|a, b| a.2[axis].total_cmp(&b.2[axis]));

        let mid = items.len() / 2;
        let (left_items, right_items) = items.split_at_mut(mid);

        // Reserve the node before the children
        self.nodes.push(BvhNode {
            bounds,
            primitive: None,
            left: None,
            right: None,
        });

        let left = self.build_recursive(left_items);
        let right = self.build_recursive(right_items);
        self.nodes[node_index].left = Some(left);
        self.nodes[node_index].right = Some(right);

        node_index
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Bounds of the whole tree
    pub fn bounds(&self) -> AABB {
        self.root.map_or(AABB::EMPTY, |root| self.nodes[root].bounds)
    }

    /// Nearest primitive hit in `[t_min, t_max)`
    ///
    /// `test` intersects the ray with one primitive and returns the hit
    /// distance.
    pub fn closest_hit<F>(&self, ray: &Ray, t_min: f32, t_max: f32, mut test: F) -> Option<(u32, f32)>
    where
        F: FnMut(u32) -> Option<f32>,
    {
        let mut closest = t_max;
        let mut best = None;
        let mut stack: Vec<usize> = self.root.into_iter().collect();

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if ray_aabb_interval(ray, &node.bounds, t_min, closest).is_none() {
                continue;
            }
            if let Some(primitive) = node.primitive {
                if let Some(t) = test(primitive).filter(|t| *t >= t_min && *t < closest) {
                    closest = t;
                    best = Some((primitive, t));
                }
                continue;
            }
            stack.extend(node.left);
            stack.extend(node.right);
        }

        best
    }

    /// Whether any primitive is hit in `[t_min, t_max)`
    pub fn any_hit<F>(&self, ray: &Ray, t_min: f32, t_max: f32, mut test: F) -> bool
    where
        F: FnMut(u32) -> Option<f32>,
    {
        let mut stack: Vec<usize> = self.root.into_iter().collect();

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if ray_aabb_interval(ray, &node.bounds, t_min, t_max).is_none() {
                continue;
            }
            match node.primitive {
                Some(primitive) => {
                    if test(primitive).is_some_and(|t| t >= t_min && t < t_max) {
                        return true;
                    }
                }
                None => {
                    stack.extend(node.left);
                    stack.extend(node.right);
                }
            }
        }

        false
    }
}
