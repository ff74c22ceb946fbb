use glam::Vec3;

use crate::config;
use crate::core::aabb::Aabb;

pub const NULL_PROXY: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct TreeNode {
    aabb: Aabb,
    user_data: u64,
    parent: u32,
    child1: u32,
    child2: u32,
    /// Leaf height is 0; free nodes carry -1.
    height: i32,
    next_free: u32,
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.child1 == NULL_PROXY
    }
}

impl Default for TreeNode {
    fn default() -> Self {
        Self {
            aabb: Aabb::empty(),
            user_data: 0,
            parent: NULL_PROXY,
            child1: NULL_PROXY,
            child2: NULL_PROXY,
            height: -1,
            next_free: NULL_PROXY,
        }
    }
}

/// Balanced dynamic AABB tree over fat proxy boxes.
///
/// Leaves hold proxies; internal nodes always have two children and a box
/// enclosing both. Insertion descends by surface-area cost and single
/// rotations keep sibling heights within one of each other.
pub struct DynamicTree {
    nodes: Vec<TreeNode>,
    root: u32,
    free_list: u32,
    node_count: usize,
}

impl Default for DynamicTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicTree {
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NULL_PROXY,
            free_list: NULL_PROXY,
            node_count: 0,
        };
        tree.grow(32);
        tree
    }

    fn grow(&mut self, new_capacity: usize) {
        let old = self.nodes.len();
        self.nodes.resize_with(new_capacity, TreeNode::default);
        for i in old..new_capacity - 1 {
            self.nodes[i].next_free = (i + 1) as u32;
        }
        self.nodes[new_capacity - 1].next_free = self.free_list;
        self.free_list = old as u32;
    }

    fn allocate_node(&mut self) -> u32 {
        if self.free_list == NULL_PROXY {
            let capacity = self.nodes.len();
            self.grow(capacity * 2);
        }
        let index = self.free_list;
        self.free_list = self.nodes[index as usize].next_free;
        let node = &mut self.nodes[index as usize];
        node.parent = NULL_PROXY;
        node.child1 = NULL_PROXY;
        node.child2 = NULL_PROXY;
        node.height = 0;
        node.user_data = 0;
        self.node_count += 1;
        index
    }

    fn free_node(&mut self, index: u32) {
        let node = &mut self.nodes[index as usize];
        node.height = -1;
        node.next_free = self.free_list;
        self.free_list = index;
        self.node_count -= 1;
    }

    /// Inserts a leaf with the AABB fattened by the broad-phase slack.
    pub fn create_proxy(&mut self, aabb: &Aabb, user_data: u64) -> u32 {
        let proxy = self.allocate_node();
        self.nodes[proxy as usize].aabb = aabb.extended(config::AABB_EXTENSION);
        self.nodes[proxy as usize].user_data = user_data;
        self.insert_leaf(proxy);
        proxy
    }

    pub fn destroy_proxy(&mut self, proxy: u32) {
        debug_assert!(self.nodes[proxy as usize].is_leaf());
        self.remove_leaf(proxy);
        self.free_node(proxy);
    }

    /// Updates a proxy after motion. Returns true when the leaf had to be
    /// reinserted, meaning the proxy must be re-paired.
    pub fn move_proxy(&mut self, proxy: u32, aabb: &Aabb, displacement: Vec3) -> bool {
        debug_assert!(self.nodes[proxy as usize].is_leaf());

        let mut fat = aabb.extended(config::AABB_EXTENSION);
        fat.extend_towards(config::AABB_MULTIPLIER * displacement);

        let tree_aabb = self.nodes[proxy as usize].aabb;
        if tree_aabb.contains(aabb) {
            // Still inside, but the stored box may be stale motion
            // prediction far larger than needed.
            let huge = fat.extended(4.0 * config::AABB_EXTENSION);
            if huge.contains(&tree_aabb) {
                return false;
            }
        }

        self.remove_leaf(proxy);
        self.nodes[proxy as usize].aabb = fat;
        self.insert_leaf(proxy);
        true
    }

    pub fn fat_aabb(&self, proxy: u32) -> &Aabb {
        &self.nodes[proxy as usize].aabb
    }

    pub fn user_data(&self, proxy: u32) -> u64 {
        self.nodes[proxy as usize].user_data
    }

    pub fn test_overlap(&self, a: u32, b: u32) -> bool {
        self.nodes[a as usize].aabb.overlaps(&self.nodes[b as usize].aabb)
    }

    /// Yields every leaf overlapping `aabb`. The callback returns `false`
    /// to stop early.
    pub fn query(&self, aabb: &Aabb, mut callback: impl FnMut(u32) -> bool) {
        if self.root == NULL_PROXY {
            return;
        }
        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if !node.aabb.overlaps(aabb) {
                continue;
            }
            if node.is_leaf() {
                if !callback(index) {
                    return;
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    /// Casts the segment `p1 → p2` through the tree. The callback receives
    /// the leaf and the current max fraction and returns a new max fraction
    /// (0 stops the traversal, the input value keeps it unchanged).
    pub fn ray_cast(&self, p1: Vec3, p2: Vec3, mut callback: impl FnMut(u32, f32) -> f32) {
        if self.root == NULL_PROXY {
            return;
        }
        let mut max_fraction = 1.0_f32;
        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if node.aabb.ray_cast(p1, p2, max_fraction).is_none() {
                continue;
            }
            if node.is_leaf() {
                let value = callback(index, max_fraction);
                if value == 0.0 {
                    return;
                }
                max_fraction = max_fraction.min(value);
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    /// SAH-style descent: picks the sibling for a new leaf by comparing the
    /// cost of pairing with the branch against descending into a child.
    fn pick_best(&self, leaf_aabb: &Aabb) -> u32 {
        let mut index = self.root;
        while !self.nodes[index as usize].is_leaf() {
            let node = &self.nodes[index as usize];
            let branch_area = node.aabb.surface_area();
            let combined_area = Aabb::combine(leaf_aabb, &node.aabb).surface_area();

            let branch_cost = 2.0 * combined_area;
            let inheritance_cost = 2.0 * (combined_area - branch_area);

            let child_cost = |child: u32| {
                let child_node = &self.nodes[child as usize];
                let combined = Aabb::combine(leaf_aabb, &child_node.aabb);
                if child_node.is_leaf() {
                    combined.surface_area() + inheritance_cost
                } else {
                    (combined.surface_area() - child_node.aabb.surface_area()) + inheritance_cost
                }
            };

            let cost1 = child_cost(node.child1);
            let cost2 = child_cost(node.child2);

            if branch_cost < cost1 && branch_cost < cost2 {
                break;
            }
            index = if cost1 < cost2 { node.child1 } else { node.child2 };
        }
        index
    }

    fn insert_leaf(&mut self, leaf: u32) {
        if self.root == NULL_PROXY {
            self.root = leaf;
            self.nodes[leaf as usize].parent = NULL_PROXY;
            return;
        }

        let leaf_aabb = self.nodes[leaf as usize].aabb;
        let sibling = self.pick_best(&leaf_aabb);
        let old_parent = self.nodes[sibling as usize].parent;

        let new_parent = self.allocate_node();
        self.nodes[new_parent as usize].parent = old_parent;
        self.nodes[new_parent as usize].child1 = sibling;
        self.nodes[new_parent as usize].child2 = leaf;
        self.nodes[new_parent as usize].aabb =
            Aabb::combine(&leaf_aabb, &self.nodes[sibling as usize].aabb);
        self.nodes[new_parent as usize].height = self.nodes[sibling as usize].height + 1;
        self.nodes[sibling as usize].parent = new_parent;
        self.nodes[leaf as usize].parent = new_parent;

        if old_parent != NULL_PROXY {
            if self.nodes[old_parent as usize].child1 == sibling {
                self.nodes[old_parent as usize].child1 = new_parent;
            } else {
                self.nodes[old_parent as usize].child2 = new_parent;
            }
        } else {
            self.root = new_parent;
        }

        self.refit(new_parent);
    }

    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL_PROXY;
            return;
        }

        let parent = self.nodes[leaf as usize].parent;
        let grand_parent = self.nodes[parent as usize].parent;
        let sibling = if self.nodes[parent as usize].child1 == leaf {
            self.nodes[parent as usize].child2
        } else {
            self.nodes[parent as usize].child1
        };

        if grand_parent != NULL_PROXY {
            if self.nodes[grand_parent as usize].child1 == parent {
                self.nodes[grand_parent as usize].child1 = sibling;
            } else {
                self.nodes[grand_parent as usize].child2 = sibling;
            }
            self.nodes[sibling as usize].parent = grand_parent;
            self.free_node(parent);
            self.refit(grand_parent);
        } else {
            self.root = sibling;
            self.nodes[sibling as usize].parent = NULL_PROXY;
            self.free_node(parent);
        }
    }

    /// Walks ancestors refreshing heights and boxes, balancing on the way.
    fn refit(&mut self, start: u32) {
        let mut index = start;
        while index != NULL_PROXY {
            index = self.balance(index);

            let child1 = self.nodes[index as usize].child1;
            let child2 = self.nodes[index as usize].child2;
            debug_assert!(child1 != NULL_PROXY && child2 != NULL_PROXY);

            self.nodes[index as usize].height = 1 + self.nodes[child1 as usize]
                .height
                .max(self.nodes[child2 as usize].height);
            self.nodes[index as usize].aabb = Aabb::combine(
                &self.nodes[child1 as usize].aabb,
                &self.nodes[child2 as usize].aabb,
            );

            index = self.nodes[index as usize].parent;
        }
    }

    /// Single left/right rotation when the children of `a` differ in height
    /// by more than one. Returns the subtree's new root.
    fn balance(&mut self, a: u32) -> u32 {
        if self.nodes[a as usize].is_leaf() || self.nodes[a as usize].height < 2 {
            return a;
        }

        let b = self.nodes[a as usize].child1;
        let c = self.nodes[a as usize].child2;
        let balance = self.nodes[c as usize].height - self.nodes[b as usize].height;

        if balance > 1 {
            return self.rotate_up(a, c, b);
        }
        if balance < -1 {
            return self.rotate_up(a, b, c);
        }
        a
    }

    /// Promotes `up` above `a`; `keep` is a's other child.
    fn rotate_up(&mut self, a: u32, up: u32, keep: u32) -> u32 {
        let f = self.nodes[up as usize].child1;
        let g = self.nodes[up as usize].child2;

        // Swap a and up.
        self.nodes[up as usize].child1 = a;
        self.nodes[up as usize].parent = self.nodes[a as usize].parent;
        self.nodes[a as usize].parent = up;

        let up_parent = self.nodes[up as usize].parent;
        if up_parent != NULL_PROXY {
            if self.nodes[up_parent as usize].child1 == a {
                self.nodes[up_parent as usize].child1 = up;
            } else {
                debug_assert!(self.nodes[up_parent as usize].child2 == a);
                self.nodes[up_parent as usize].child2 = up;
            }
        } else {
            self.root = up;
        }

        let (tall, short) = if self.nodes[f as usize].height > self.nodes[g as usize].height {
            (f, g)
        } else {
            (g, f)
        };

        self.nodes[up as usize].child2 = tall;
        let a_child_slot = if self.nodes[a as usize].child1 == up {
            1
        } else {
            2
        };
        if a_child_slot == 1 {
            self.nodes[a as usize].child1 = short;
        } else {
            self.nodes[a as usize].child2 = short;
        }
        self.nodes[short as usize].parent = a;

        self.nodes[a as usize].aabb = Aabb::combine(
            &self.nodes[keep as usize].aabb,
            &self.nodes[short as usize].aabb,
        );
        self.nodes[up as usize].aabb = Aabb::combine(
            &self.nodes[a as usize].aabb,
            &self.nodes[tall as usize].aabb,
        );
        self.nodes[a as usize].height = 1 + self.nodes[keep as usize]
            .height
            .max(self.nodes[short as usize].height);
        self.nodes[up as usize].height = 1 + self.nodes[a as usize]
            .height
            .max(self.nodes[tall as usize].height);

        up
    }

    pub fn height(&self) -> i32 {
        if self.root == NULL_PROXY {
            0
        } else {
            self.nodes[self.root as usize].height
        }
    }

    pub fn proxy_count(&self) -> usize {
        (self.node_count + 1) / 2
    }

    /// Checks the structural invariants. Debug builds only.
    #[cfg(debug_assertions)]
    pub fn validate(&self) {
        if self.root == NULL_PROXY {
            return;
        }
        debug_assert!(self.nodes[self.root as usize].parent == NULL_PROXY);
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if node.is_leaf() {
                debug_assert!(node.child2 == NULL_PROXY);
                debug_assert!(node.height == 0);
                continue;
            }
            let c1 = node.child1 as usize;
            let c2 = node.child2 as usize;
            debug_assert!(self.nodes[c1].parent == index);
            debug_assert!(self.nodes[c2].parent == index);
            debug_assert!(node.aabb.contains(&self.nodes[c1].aabb));
            debug_assert!(node.aabb.contains(&self.nodes[c2].aabb));
            stack.push(node.child1);
            stack.push(node.child2);
        }
    }
}

/// Broad phase: dynamic tree plus the buffer of proxies that moved since
/// the last pair search.
pub struct BroadPhase {
    pub tree: DynamicTree,
    move_buffer: Vec<u32>,
}

impl Default for BroadPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadPhase {
    pub fn new() -> Self {
        Self {
            tree: DynamicTree::new(),
            move_buffer: Vec::with_capacity(16),
        }
    }

    pub fn create_proxy(&mut self, aabb: &Aabb, user_data: u64) -> u32 {
        let proxy = self.tree.create_proxy(aabb, user_data);
        self.buffer_move(proxy);
        proxy
    }

    pub fn destroy_proxy(&mut self, proxy: u32) {
        self.move_buffer.retain(|&p| p != proxy);
        self.tree.destroy_proxy(proxy);
    }

    pub fn move_proxy(&mut self, proxy: u32, aabb: &Aabb, displacement: Vec3) {
        if self.tree.move_proxy(proxy, aabb, displacement) {
            self.buffer_move(proxy);
        }
    }

    /// Forces re-pairing of a proxy that did not move.
    pub fn touch_proxy(&mut self, proxy: u32) {
        self.buffer_move(proxy);
    }

    fn buffer_move(&mut self, proxy: u32) {
        self.move_buffer.push(proxy);
    }

    pub fn test_overlap(&self, a: u32, b: u32) -> bool {
        self.tree.test_overlap(a, b)
    }

    pub fn user_data(&self, proxy: u32) -> u64 {
        self.tree.user_data(proxy)
    }

    pub fn fat_aabb(&self, proxy: u32) -> &Aabb {
        self.tree.fat_aabb(proxy)
    }

    /// Queries the tree with every buffered proxy's fat AABB and emits the
    /// overlapping `(min, max)` leaf pairs, deduplicated, then clears the
    /// buffer. Pair order is unspecified.
    pub fn find_pairs(&mut self) -> Vec<(u32, u32)> {
        let mut pairs: Vec<(u32, u32)> = Vec::new();

        for &proxy in &self.move_buffer {
            let fat = *self.tree.fat_aabb(proxy);
            self.tree.query(&fat, |other| {
                if other != proxy {
                    pairs.push((proxy.min(other), proxy.max(other)));
                }
                true
            });
        }
        self.move_buffer.clear();

        // Two proxies that both moved report their pair twice.
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_aabb_at(x: f32, y: f32, z: f32) -> Aabb {
        Aabb::from_center(Vec3::new(x, y, z), Vec3::splat(0.5))
    }

    #[test]
    fn pairs_are_unique_and_unordered() {
        let mut bp = BroadPhase::new();
        let a = bp.create_proxy(&unit_aabb_at(0.0, 0.0, 0.0), 0);
        let b = bp.create_proxy(&unit_aabb_at(0.4, 0.0, 0.0), 1);
        let _far = bp.create_proxy(&unit_aabb_at(50.0, 0.0, 0.0), 2);

        let pairs = bp.find_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0], (a.min(b), a.max(b)));

        // Nothing moved: no pairs on the second sweep.
        assert!(bp.find_pairs().is_empty());
    }

    #[test]
    fn small_moves_keep_the_tree_unchanged() {
        let mut bp = BroadPhase::new();
        let a = bp.create_proxy(&unit_aabb_at(0.0, 0.0, 0.0), 0);
        bp.find_pairs();

        // Inside the fat box: no re-pairing buffered.
        let nudged = unit_aabb_at(0.05, 0.0, 0.0);
        bp.move_proxy(a, &nudged, Vec3::new(0.05, 0.0, 0.0));
        assert!(bp.find_pairs().is_empty());

        // A long jump forces reinsertion.
        let jumped = unit_aabb_at(10.0, 0.0, 0.0);
        bp.move_proxy(a, &jumped, Vec3::new(10.0, 0.0, 0.0));
        assert!(bp.tree.fat_aabb(a).contains(&jumped));
    }

    #[test]
    fn tree_stays_balanced_under_load() {
        let mut tree = DynamicTree::new();
        for i in 0..256 {
            let x = (i % 16) as f32 * 2.0;
            let z = (i / 16) as f32 * 2.0;
            tree.create_proxy(&unit_aabb_at(x, 0.0, z), i as u64);
        }
        #[cfg(debug_assertions)]
        tree.validate();
        // A balanced tree over 256 leaves stays near log2 depth.
        assert!(tree.height() <= 16, "height {}", tree.height());
    }

    #[test]
    fn ray_cast_visits_hit_leaves() {
        let mut tree = DynamicTree::new();
        let a = tree.create_proxy(&unit_aabb_at(-5.0, 0.0, 0.0), 1);
        let _b = tree.create_proxy(&unit_aabb_at(0.0, 5.0, 0.0), 2);

        let mut hits = Vec::new();
        tree.ray_cast(
            Vec3::new(-10.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            |leaf, max| {
                hits.push(leaf);
                max
            },
        );
        assert_eq!(hits, vec![a]);
    }

    #[test]
    fn destroy_removes_from_pairs() {
        let mut bp = BroadPhase::new();
        let a = bp.create_proxy(&unit_aabb_at(0.0, 0.0, 0.0), 0);
        let b = bp.create_proxy(&unit_aabb_at(0.2, 0.0, 0.0), 1);
        bp.find_pairs();

        bp.destroy_proxy(b);
        bp.touch_proxy(a);
        assert!(bp.find_pairs().is_empty());
    }
}
