//! Transform hierarchy
//!
//! Follows Game Engine Architecture 11.2.7 / 15.5 (scene graphs and
//! hierarchical pose):
//! - Each node owns a local TRS pose relative to its parent
//! - World matrices are derived lazily and cached per node; world
//!   position, rotation and scale are read back from that matrix
//! - Local writes invalidate eagerly: the node and its whole subtree are
//!   marked dirty, and the next world read recomputes only the dirty chain
//!
//! Invariant kept by every mutation: a dirty node only has dirty
//! descendants, so invalidation can stop at the first already-dirty node.

use std::cell::Cell;

use slotmap::SlotMap;
use thiserror::Error;

use crate::foundation::logging::TRANSFORM;
use crate::foundation::math::{Mat4, Point3, Quat, Transform, Vec3};

slotmap::new_key_type! {
    /// Handle to a node of a [`TransformTree`]
    pub struct NodeId;
}

/// Transform hierarchy errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformError {
    /// Node was removed or never existed
    #[error("Transform node {0:?} no longer exists")]
    StaleNode(NodeId),

    /// Reparenting would make a node its own ancestor
    #[error("Cannot parent transform {node:?} under {parent:?}: it is the node itself or one of its descendants")]
    Cycle {
        /// Node being reparented
        node: NodeId,
        /// Requested parent
        parent: NodeId,
    },
}

#[derive(Debug)]
struct TransformNode {
    local: Transform,
    world: Cell<Mat4>,
    dirty: Cell<bool>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Forest of transform nodes with lazily derived world matrices
///
/// World reads take `&self`; the cache lives in `Cell`s so repeated reads
/// between writes are O(1).
#[derive(Debug, Default)]
pub struct TransformTree {
    nodes: SlotMap<NodeId, TransformNode>,
    roots: Vec<NodeId>,
}

impl TransformTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tree with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: SlotMap::with_capacity_and_key(capacity),
            roots: Vec::new(),
        }
    }

    /// Insert a new root node with the given local pose
    pub fn insert(&mut self, local: Transform) -> NodeId {
        let id = self.nodes.insert(TransformNode {
            local,
            world: Cell::new(local.to_matrix()),
            dirty: Cell::new(true),
            parent: None,
            children: Vec::new(),
        });
        self.roots.push(id);
        id
    }

    /// Whether the node exists
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root nodes in insertion order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    fn node(&self, id: NodeId) -> Result<&TransformNode, TransformError> {
        self.nodes.get(id).ok_or(TransformError::StaleNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut TransformNode, TransformError> {
        self.nodes.get_mut(id).ok_or(TransformError::StaleNode(id))
    }

    // ---------------------------------------------------------------------
    // Relationships
    // ---------------------------------------------------------------------

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, TransformError> {
        Ok(self.node(id)?.parent)
    }

    /// Children of a node in attachment order
    pub fn children(&self, id: NodeId) -> Result<&[NodeId], TransformError> {
        Ok(&self.node(id)?.children)
    }

    /// Number of ancestors above a node
    pub fn depth(&self, id: NodeId) -> Result<usize, TransformError> {
        Ok(self.ancestors(id)?.count())
    }

    /// Iterate over the ancestors of a node, nearest first
    pub fn ancestors(&self, id: NodeId) -> Result<impl Iterator<Item = NodeId> + '_, TransformError> {
        let mut cursor = self.node(id)?.parent;
        Ok(std::iter::from_fn(move || {
            let current = cursor?;
            cursor = self.nodes.get(current).and_then(|node| node.parent);
            Some(current)
        }))
    }

    /// Whether `ancestor` is `id` or one of its ancestors
    pub fn is_self_or_ancestor(&self, ancestor: NodeId, id: NodeId) -> Result<bool, TransformError> {
        Ok(ancestor == id || self.ancestors(id)?.any(|node| node == ancestor))
    }

    /// A node followed by its descendants, parents before children
    pub fn subtree(&self, id: NodeId) -> Result<Vec<NodeId>, TransformError> {
        self.node(id)?;
        let mut order = Vec::new();
        self.collect_preorder(id, &mut order);
        Ok(order)
    }

    /// Every node, depth-first: roots in insertion order, children in attachment order
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            self.collect_preorder(root, &mut order);
        }
        order
    }

    fn collect_preorder(&self, id: NodeId, order: &mut Vec<NodeId>) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    /// Reparent a node
    ///
    /// With `preserve_world` the local pose is recomputed so the world pose
    /// is unchanged; otherwise the local pose is kept and the world pose
    /// follows the new parent. Parenting under the node itself or one of its
    /// descendants fails and leaves the tree untouched.
    pub(crate) fn set_parent(
        &mut self,
        id: NodeId,
        new_parent: Option<NodeId>,
        preserve_world: bool,
    ) -> Result<(), TransformError> {
        let old_parent = self.node(id)?.parent;
        if let Some(parent) = new_parent {
            if self.is_self_or_ancestor(id, parent)? {
                log::warn!(target: TRANSFORM, "Rejected reparent of {id:?} under {parent:?}: cycle");
                return Err(TransformError::Cycle { node: id, parent });
            }
        }
        if old_parent == new_parent {
            return Ok(());
        }

        let world = preserve_world.then(|| self.resolve(id));

        match old_parent {
            Some(parent) => self.node_mut(parent)?.children.retain(|&child| child != id),
            None => self.roots.retain(|&root| root != id),
        }
        match new_parent {
            Some(parent) => self.node_mut(parent)?.children.push(id),
            None => self.roots.push(id),
        }

        if let Some(world) = world {
            let parent_world = self.parent_world(new_parent);
            match parent_world.try_inverse() {
                Some(inverse) => self.node_mut(id)?.local = Transform::from_matrix(inverse * world),
                None => log::warn!(target: TRANSFORM, "Parent of {id:?} is degenerate; keeping its local pose"),
            }
        }
        self.node_mut(id)?.parent = new_parent;
        self.force_invalidate(id);
        Ok(())
    }

    /// Remove a node and its whole subtree, children before parents
    ///
    /// Returns the removed nodes in removal order.
    pub(crate) fn remove(&mut self, id: NodeId) -> Result<Vec<NodeId>, TransformError> {
        let mut removal = self.subtree(id)?;
        removal.reverse();

        match self.node(id)?.parent {
            Some(parent) => self.node_mut(parent)?.children.retain(|&child| child != id),
            None => self.roots.retain(|&root| root != id),
        }
        for &node in &removal {
            self.nodes.remove(node);
        }
        Ok(removal)
    }

    // ---------------------------------------------------------------------
    // Local space
    // ---------------------------------------------------------------------

    /// Local pose of a node
    pub fn local(&self, id: NodeId) -> Result<Transform, TransformError> {
        Ok(self.node(id)?.local)
    }

    /// Local position of a node
    pub fn local_position(&self, id: NodeId) -> Result<Vec3, TransformError> {
        Ok(self.node(id)?.local.position)
    }

    /// Local rotation of a node
    pub fn local_rotation(&self, id: NodeId) -> Result<Quat, TransformError> {
        Ok(self.node(id)?.local.rotation)
    }

    /// Local scale of a node
    pub fn local_scale(&self, id: NodeId) -> Result<Vec3, TransformError> {
        Ok(self.node(id)?.local.scale)
    }

    /// Replace the whole local pose
    pub fn set_local(&mut self, id: NodeId, local: Transform) -> Result<(), TransformError> {
        self.node_mut(id)?.local = local;
        self.invalidate(id);
        Ok(())
    }

    /// Set local position
    pub fn set_local_position(&mut self, id: NodeId, position: Vec3) -> Result<(), TransformError> {
        self.node_mut(id)?.local.position = position;
        self.invalidate(id);
        Ok(())
    }

    /// Set local rotation
    pub fn set_local_rotation(&mut self, id: NodeId, rotation: Quat) -> Result<(), TransformError> {
        self.node_mut(id)?.local.rotation = rotation;
        self.invalidate(id);
        Ok(())
    }

    /// Set local scale
    pub fn set_local_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), TransformError> {
        self.node_mut(id)?.local.scale = scale;
        self.invalidate(id);
        Ok(())
    }

    /// Move a node by `delta` in its local (parent-relative) space
    pub fn translate_local(&mut self, id: NodeId, delta: Vec3) -> Result<(), TransformError> {
        let position = self.local_position(id)?;
        self.set_local_position(id, position + delta)
    }

    /// Move a node by `delta` in world space
    pub fn translate_world(&mut self, id: NodeId, delta: Vec3) -> Result<(), TransformError> {
        let position = self.world_position(id)?;
        self.set_world_position(id, position + delta)
    }

    /// Apply an additional rotation in the node's own frame
    pub fn rotate_local(&mut self, id: NodeId, rotation: Quat) -> Result<(), TransformError> {
        let current = self.local_rotation(id)?;
        self.set_local_rotation(id, current * rotation)
    }

    // ---------------------------------------------------------------------
    // World space
    // ---------------------------------------------------------------------

    /// World pose of a node, decomposed from its world matrix
    pub fn world(&self, id: NodeId) -> Result<Transform, TransformError> {
        Ok(Transform::from_matrix(self.world_matrix(id)?))
    }

    /// World position of a node
    pub fn world_position(&self, id: NodeId) -> Result<Vec3, TransformError> {
        Ok(self.world_matrix(id)?.fixed_view::<3, 1>(0, 3).into_owned())
    }

    /// World rotation of a node
    pub fn world_rotation(&self, id: NodeId) -> Result<Quat, TransformError> {
        Ok(self.world(id)?.rotation)
    }

    /// World scale of a node
    pub fn world_scale(&self, id: NodeId) -> Result<Vec3, TransformError> {
        Ok(self.world(id)?.scale)
    }

    /// World transformation matrix of a node, recomputing the dirty chain if needed
    pub fn world_matrix(&self, id: NodeId) -> Result<Mat4, TransformError> {
        self.node(id)?;
        Ok(self.resolve(id))
    }

    /// Move a node so its world position becomes `position`
    ///
    /// Does nothing under a degenerate (zero-scale) parent.
    pub fn set_world_position(&mut self, id: NodeId, position: Vec3) -> Result<(), TransformError> {
        let parent_world = self.parent_world(self.node(id)?.parent);
        let Some(inverse) = parent_world.try_inverse() else {
            return Ok(());
        };
        let local = inverse.transform_point(&Point3::from(position));
        self.set_local_position(id, local.coords)
    }

    /// Rotate a node so its world rotation becomes `rotation`
    pub fn set_world_rotation(&mut self, id: NodeId, rotation: Quat) -> Result<(), TransformError> {
        let parent = Transform::from_matrix(self.parent_world(self.node(id)?.parent));
        self.set_local_rotation(id, parent.rotation.inverse() * rotation)
    }

    /// Scale a node so its world scale becomes `scale`
    pub fn set_world_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), TransformError> {
        let parent = Transform::from_matrix(self.parent_world(self.node(id)?.parent));
        self.set_local_scale(id, scale.component_div(&parent.scale))
    }

    /// Turn a node so its forward axis points at a world-space target
    ///
    /// Does nothing when the target coincides with the node's position.
    pub fn look_at(&mut self, id: NodeId, target: Vec3, up: Vec3) -> Result<(), TransformError> {
        let direction = target - self.world_position(id)?;
        if direction.magnitude_squared() <= f32::EPSILON {
            return Ok(());
        }
        // face_towards aligns +Z; forward is -Z
        let rotation = Quat::face_towards(&-direction, &up);
        self.set_world_rotation(id, rotation)
    }

    /// World-space forward direction
    pub fn forward(&self, id: NodeId) -> Result<Vec3, TransformError> {
        Ok(self.world(id)?.forward())
    }

    /// World-space up direction
    pub fn up(&self, id: NodeId) -> Result<Vec3, TransformError> {
        Ok(self.world(id)?.up())
    }

    /// World-space left direction
    pub fn left(&self, id: NodeId) -> Result<Vec3, TransformError> {
        Ok(self.world(id)?.left())
    }

    /// Rotate a direction from the node's local frame into world space
    pub fn local_to_world_direction(&self, id: NodeId, direction: Vec3) -> Result<Vec3, TransformError> {
        Ok(self.world(id)?.transform_direction(direction))
    }

    /// Map a point from the node's local frame into world space
    pub fn local_to_world_point(&self, id: NodeId, point: Vec3) -> Result<Vec3, TransformError> {
        Ok(self.world_matrix(id)?.transform_point(&Point3::from(point)).coords)
    }

    /// Whether the cached world pose of a node is stale
    pub fn is_dirty(&self, id: NodeId) -> Result<bool, TransformError> {
        Ok(self.node(id)?.dirty.get())
    }

    /// Recompute every stale world pose
    ///
    /// Returns the number of nodes that were dirty.
    pub fn commit(&self) -> usize {
        let mut recomputed = 0;
        for id in self.depth_first() {
            if self.nodes[id].dirty.get() {
                recomputed += 1;
                self.resolve(id);
            }
        }
        recomputed
    }

    // ---------------------------------------------------------------------
    // Cache maintenance
    // ---------------------------------------------------------------------

    fn parent_world(&self, parent: Option<NodeId>) -> Mat4 {
        parent.map_or_else(Mat4::identity, |parent| self.resolve(parent))
    }

    /// Walk up to the first clean ancestor, then fold the dirty chain downwards.
    fn resolve(&self, id: NodeId) -> Mat4 {
        let mut chain = Vec::new();
        let mut base = Mat4::identity();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current];
            if !node.dirty.get() {
                base = node.world.get();
                break;
            }
            chain.push(current);
            cursor = node.parent;
        }

        for &current in chain.iter().rev() {
            let node = &self.nodes[current];
            base *= node.local.to_matrix();
            node.world.set(base);
            node.dirty.set(false);
        }
        base
    }

    fn invalidate(&self, id: NodeId) {
        if self.nodes[id].dirty.get() {
            return;
        }
        self.force_invalidate(id);
    }

    fn force_invalidate(&self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current];
            if current != id && node.dirty.get() {
                continue;
            }
            node.dirty.set(true);
            stack.extend(node.children.iter().copied());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants::HALF_PI;
    use crate::foundation::math::Unit;
    use approx::assert_relative_eq;

    fn chain(tree: &mut TransformTree) -> (NodeId, NodeId, NodeId) {
        let root = tree.insert(Transform::new(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), HALF_PI),
            Vec3::new(2.0, 2.0, 2.0),
        ));
        let child = tree.insert(Transform::from_position(Vec3::new(0.0, 0.0, 1.0)));
        let grandchild = tree.insert(Transform::from_position(Vec3::new(0.0, 1.0, 0.0)));
        tree.set_parent(child, Some(root), false).unwrap();
        tree.set_parent(grandchild, Some(child), false).unwrap();
        (root, child, grandchild)
    }

    #[test]
    fn test_root_world_equals_local() {
        let mut tree = TransformTree::new();
        let local = Transform::from_euler_degrees(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, 45.0, 0.0),
            Vec3::new(1.0, 3.0, 1.0),
        );
        let root = tree.insert(local);

        assert_relative_eq!(tree.world(root).unwrap(), local);
    }

    #[test]
    fn test_world_composes_ancestor_chain() {
        let mut tree = TransformTree::new();
        let (root, child, grandchild) = chain(&mut tree);

        let expected_child = tree.world_matrix(root).unwrap() * tree.local(child).unwrap().to_matrix();
        let expected_grandchild = expected_child * tree.local(grandchild).unwrap().to_matrix();

        assert_relative_eq!(tree.world_matrix(child).unwrap(), expected_child, epsilon = 1e-5);
        assert_relative_eq!(tree.world_matrix(grandchild).unwrap(), expected_grandchild, epsilon = 1e-5);
        // Scaled by 2 and rotated a quarter turn: (0,0,1) lands on (2,0,0)
        assert_relative_eq!(tree.world_position(child).unwrap(), Vec3::new(12.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(tree.world_position(grandchild).unwrap(), Vec3::new(12.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_local_write_invalidates_descendants_only() {
        let mut tree = TransformTree::new();
        let (root, child, grandchild) = chain(&mut tree);
        let sibling_root = tree.insert(Transform::identity());
        tree.commit();

        tree.set_local_position(child, Vec3::new(0.0, 0.0, 3.0)).unwrap();

        assert!(!tree.is_dirty(root).unwrap());
        assert!(tree.is_dirty(child).unwrap());
        assert!(tree.is_dirty(grandchild).unwrap());
        assert!(!tree.is_dirty(sibling_root).unwrap());

        // Reading the grandchild cleans the chain lazily
        let world = tree.world(grandchild).unwrap();
        assert!(!tree.is_dirty(child).unwrap());
        assert!(!tree.is_dirty(grandchild).unwrap());
        assert_relative_eq!(world.position, Vec3::new(16.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_invariant_after_mutation_sequence() {
        let mut tree = TransformTree::new();
        let (root, child, grandchild) = chain(&mut tree);

        tree.world(grandchild).unwrap();
        tree.set_local_rotation(root, Quat::from_axis_angle(&Vec3::x_axis(), 0.3)).unwrap();
        tree.world(child).unwrap();
        tree.set_local_scale(grandchild, Vec3::new(0.5, 0.5, 0.5)).unwrap();
        tree.translate_local(root, Vec3::new(-1.0, 4.0, 2.0)).unwrap();
        tree.rotate_local(child, Quat::from_axis_angle(&Vec3::z_axis(), 1.2)).unwrap();

        for (parent, node) in [(root, child), (child, grandchild)] {
            let expected = tree.world_matrix(parent).unwrap() * tree.local(node).unwrap().to_matrix();
            assert_relative_eq!(tree.world_matrix(node).unwrap(), expected, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_reparent_preserving_world() {
        let mut tree = TransformTree::new();
        let (root, _child, grandchild) = chain(&mut tree);
        let other = tree.insert(Transform::new(
            Vec3::new(-3.0, 1.0, 7.0),
            Quat::from_axis_angle(&Unit::new_normalize(Vec3::new(1.0, 1.0, 0.0)), 0.9),
            Vec3::new(0.5, 0.5, 0.5),
        ));

        let before = tree.world(grandchild).unwrap();
        tree.set_parent(grandchild, Some(other), true).unwrap();
        assert_relative_eq!(tree.world(grandchild).unwrap(), before, epsilon = 1e-4);
        assert_eq!(tree.parent(grandchild).unwrap(), Some(other));

        tree.set_parent(grandchild, None, true).unwrap();
        assert_relative_eq!(tree.world(grandchild).unwrap(), before, epsilon = 1e-4);
        assert_relative_eq!(tree.local(grandchild).unwrap(), before, epsilon = 1e-4);
        assert!(tree.roots().contains(&grandchild));
        assert!(tree.children(root).unwrap().iter().all(|&c| c != grandchild));
    }

    #[test]
    fn test_nonuniform_parent_scale_skews_grandchildren() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(Transform::new(Vec3::zeros(), Quat::identity(), Vec3::new(2.0, 1.0, 1.0)));
        let child = tree.insert(Transform::from_position_rotation(
            Vec3::zeros(),
            Quat::from_axis_angle(&Vec3::z_axis(), HALF_PI),
        ));
        let grandchild = tree.insert(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        tree.set_parent(child, Some(parent), false).unwrap();
        tree.set_parent(grandchild, Some(child), false).unwrap();

        // The quarter turn maps X onto Y before the parent's X stretch applies
        assert_relative_eq!(tree.world_position(grandchild).unwrap(), Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
        let expected = tree.local(parent).unwrap().to_matrix()
            * tree.local(child).unwrap().to_matrix()
            * tree.local(grandchild).unwrap().to_matrix();
        assert_relative_eq!(tree.world_matrix(grandchild).unwrap(), expected, epsilon = 1e-5);
        assert_relative_eq!(
            tree.local_to_world_point(child, Vec3::new(0.0, 1.0, 0.0)).unwrap(),
            Vec3::new(-2.0, 0.0, 0.0),
            epsilon = 1e-5
        );

        // Detaching keeps the world matrix, and so does reattaching
        let before = tree.world_matrix(grandchild).unwrap();
        tree.set_parent(grandchild, None, true).unwrap();
        assert_relative_eq!(tree.world_matrix(grandchild).unwrap(), before, epsilon = 1e-4);
        tree.set_parent(grandchild, Some(child), true).unwrap();
        assert_relative_eq!(tree.world_matrix(grandchild).unwrap(), before, epsilon = 1e-4);
        assert_relative_eq!(tree.local_position(grandchild).unwrap(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-4);
    }

    #[test]
    fn test_reparent_keeping_local() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(Transform::from_position(Vec3::new(5.0, 0.0, 0.0)));
        let node = tree.insert(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));

        tree.set_parent(node, Some(parent), false).unwrap();

        assert_relative_eq!(tree.local_position(node).unwrap(), Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(tree.world_position(node).unwrap(), Vec3::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn test_cycle_rejected_and_tree_unchanged() {
        let mut tree = TransformTree::new();
        let (root, child, grandchild) = chain(&mut tree);
        let before = tree.world(root).unwrap();

        assert_eq!(
            tree.set_parent(root, Some(grandchild), true),
            Err(TransformError::Cycle { node: root, parent: grandchild })
        );
        assert_eq!(
            tree.set_parent(child, Some(child), false),
            Err(TransformError::Cycle { node: child, parent: child })
        );

        assert_eq!(tree.parent(root).unwrap(), None);
        assert_eq!(tree.children(child).unwrap(), &[grandchild]);
        assert_eq!(tree.roots(), &[root]);
        assert_relative_eq!(tree.world(root).unwrap(), before);
    }

    #[test]
    fn test_children_keep_attachment_order() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(Transform::identity());
        let kids: Vec<_> = (0..3).map(|_| tree.insert(Transform::identity())).collect();
        for &kid in kids.iter().rev() {
            tree.set_parent(kid, Some(parent), false).unwrap();
        }

        let expected: Vec<_> = kids.iter().rev().copied().collect();
        assert_eq!(tree.children(parent).unwrap(), expected.as_slice());
        assert_eq!(tree.depth(kids[0]).unwrap(), 1);
    }

    #[test]
    fn test_remove_subtree_children_first() {
        let mut tree = TransformTree::new();
        let (root, child, grandchild) = chain(&mut tree);
        let keeper = tree.insert(Transform::identity());

        let removed = tree.remove(child).unwrap();

        assert_eq!(removed, vec![grandchild, child]);
        assert!(!tree.contains(child));
        assert!(!tree.contains(grandchild));
        assert!(tree.children(root).unwrap().is_empty());
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.world(child), Err(TransformError::StaleNode(child)));
        assert!(tree.contains(keeper));
    }

    #[test]
    fn test_world_setters() {
        let mut tree = TransformTree::new();
        let (_root, child, _grandchild) = chain(&mut tree);

        let rotation = Quat::from_axis_angle(&Vec3::x_axis(), 0.4);
        tree.set_world_position(child, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        tree.set_world_rotation(child, rotation).unwrap();
        tree.set_world_scale(child, Vec3::new(0.1, 0.1, 0.1)).unwrap();

        let world = tree.world(child).unwrap();
        assert_relative_eq!(world.position, Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-4);
        assert_relative_eq!(world.scale, Vec3::new(0.1, 0.1, 0.1), epsilon = 1e-5);
        assert_relative_eq!(world, Transform::new(world.position, rotation, world.scale), epsilon = 1e-4);

        tree.translate_world(child, Vec3::new(0.0, -2.0, 0.0)).unwrap();
        assert_relative_eq!(tree.world_position(child).unwrap(), Vec3::new(1.0, 0.0, 3.0), epsilon = 1e-4);
    }

    #[test]
    fn test_look_at_points_forward_at_target() {
        let mut tree = TransformTree::new();
        let (_root, child, _grandchild) = chain(&mut tree);
        let target = Vec3::new(0.0, 5.0, -20.0);

        tree.look_at(child, target, Vec3::y()).unwrap();

        let expected = (target - tree.world_position(child).unwrap()).normalize();
        assert_relative_eq!(tree.forward(child).unwrap(), expected, epsilon = 1e-4);
    }

    #[test]
    fn test_commit_cleans_everything() {
        let mut tree = TransformTree::new();
        let (root, child, grandchild) = chain(&mut tree);

        assert_eq!(tree.commit(), 3);
        assert_eq!(tree.commit(), 0);
        for node in [root, child, grandchild] {
            assert!(!tree.is_dirty(node).unwrap());
        }

        tree.set_local_position(root, Vec3::zeros()).unwrap();
        assert_eq!(tree.commit(), 3);
    }

    #[test]
    fn test_depth_first_order() {
        let mut tree = TransformTree::new();
        let a = tree.insert(Transform::identity());
        let b = tree.insert(Transform::identity());
        let a1 = tree.insert(Transform::identity());
        let a2 = tree.insert(Transform::identity());
        let a1x = tree.insert(Transform::identity());
        tree.set_parent(a1, Some(a), false).unwrap();
        tree.set_parent(a2, Some(a), false).unwrap();
        tree.set_parent(a1x, Some(a1), false).unwrap();

        assert_eq!(tree.depth_first(), vec![a, a1, a1x, a2, b]);
        assert_eq!(tree.subtree(a1).unwrap(), vec![a1, a1x]);
    }
}
