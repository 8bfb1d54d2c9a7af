//! Transform hierarchy access.
//!
//! The rig code never talks to a concrete scene graph. Everything it needs is
//! expressed through [`TransformAccess`], which hosts implement against their
//! own representation. [`Hierarchy`] is a self-contained implementation used
//! when no external scene graph exists.

use {nalgebra as na, std::fmt::Debug};

/// Read/write access to a tree of transforms addressed by handles.
pub trait TransformAccess {
    /// Handle to a node in the hierarchy.
    type Node: Copy + Eq + Debug;

    fn name(&self, node: Self::Node) -> &str;

    fn world_position(&self, node: Self::Node) -> na::Vector3<f32>;

    /// Moves node in world space, keeping its parent where it is.
    fn set_world_position(
        &mut self,
        node: Self::Node,
        position: na::Vector3<f32>,
    );

    fn local_position(&self, node: Self::Node) -> na::Vector3<f32>;

    fn set_local_position(
        &mut self,
        node: Self::Node,
        position: na::Vector3<f32>,
    );

    fn local_scale(&self, node: Self::Node) -> na::Vector3<f32>;

    fn set_local_scale(&mut self, node: Self::Node, scale: na::Vector3<f32>);

    /// Transforms a world space direction into node's local space.
    /// Unaffected by scale.
    fn inverse_transform_direction(
        &self,
        node: Self::Node,
        direction: na::Vector3<f32>,
    ) -> na::Vector3<f32>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Children in sibling order.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Finds node by slash-delimited path of names relative to `root`.
    /// Empty path resolves to `root` itself.
    fn find_by_path(&self, root: Self::Node, path: &str) -> Option<Self::Node> {
        let mut node = root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = self
                .children(node)
                .into_iter()
                .find(|&child| self.name(child) == segment)?;
        }
        Some(node)
    }

    /// Returns path of `node` relative to `root`.
    /// `None` if `root` is not an ancestor of `node`.
    fn path_of(&self, root: Self::Node, node: Self::Node) -> Option<String> {
        let mut names = Vec::new();
        let mut current = node;

        while current != root {
            names.push(self.name(current));
            current = self.parent(current)?;
        }

        names.reverse();
        Some(names.join("/"))
    }

    /// Pre-order search starting at `root`.
    /// Parents are visited before children and children in sibling order.
    fn find(
        &self,
        root: Self::Node,
        predicate: &mut dyn FnMut(Self::Node) -> bool,
    ) -> Option<Self::Node> {
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            if predicate(node) {
                return Some(node);
            }
            stack.extend(self.children(node).into_iter().rev());
        }

        None
    }
}

/// Index of a node inside a [`Hierarchy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Transform relative to parent node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Local3 {
    pub iso: na::Isometry3<f32>,
    pub scale: na::Vector3<f32>,
}

impl Local3 {
    pub fn identity() -> Self {
        Local3 {
            iso: na::Isometry3::identity(),
            scale: na::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_iso(iso: na::Isometry3<f32>) -> Self {
        Local3 {
            iso,
            scale: na::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_translation(tr: na::Vector3<f32>) -> Self {
        Local3 {
            iso: na::Isometry3::from_parts(
                na::Translation3::from(tr),
                na::UnitQuaternion::identity(),
            ),
            scale: na::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_rotation(mut self, rot: na::UnitQuaternion<f32>) -> Self {
        self.iso.rotation = rot;
        self
    }

    pub fn with_scale(mut self, scale: na::Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }
}

/// World transform. Rotation and translation are kept in `iso`,
/// any scale and shear accumulated along the chain ends up in `skew`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Global3 {
    pub iso: na::Isometry3<f32>,
    pub skew: na::Matrix3<f32>,
}

impl Global3 {
    pub fn identity() -> Self {
        Global3 {
            iso: na::Isometry3::identity(),
            skew: na::Matrix3::identity(),
        }
    }

    pub fn append_local(&self, local: &Local3) -> Self {
        let total = self.to_homogeneous()
            * local.iso.to_homogeneous()
            * na::Matrix4::new_nonuniform_scaling(&local.scale);
        let rotation = self.iso.rotation * local.iso.rotation;
        let inv_rotation = rotation.inverse().to_rotation_matrix();
        let translation = total.column(3).xyz();
        let rotskew = total.remove_column(3).remove_row(3);
        let skew = inv_rotation * rotskew;

        Global3 {
            iso: na::Isometry3 {
                translation: na::Translation3 {
                    vector: translation,
                },
                rotation,
            },
            skew,
        }
    }

    pub fn position(&self) -> na::Vector3<f32> {
        self.iso.translation.vector
    }

    pub fn to_homogeneous(&self) -> na::Matrix4<f32> {
        self.iso.to_homogeneous() * self.skew.to_homogeneous()
    }

    /// Maps world space point into the space this transform defines.
    pub fn inverse_transform_point(
        &self,
        point: &na::Vector3<f32>,
    ) -> Option<na::Vector3<f32>> {
        let inverse = self.to_homogeneous().try_inverse()?;
        Some(inverse.transform_point(&na::Point3::from(*point)).coords)
    }
}

#[derive(Clone, Debug)]
struct Entry {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Local3,
}

/// Arena-backed transform tree.
#[derive(Clone, Debug, Default)]
pub struct Hierarchy {
    nodes: Vec<Entry>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Hierarchy { nodes: Vec::new() }
    }

    pub fn add_root(&mut self, name: impl Into<String>, local: Local3) -> NodeId {
        self.push(name.into(), None, local)
    }

    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        local: Local3,
    ) -> NodeId {
        let id = self.push(name.into(), Some(parent), local);
        self.nodes[parent.0].children.push(id);
        id
    }

    fn push(
        &mut self,
        name: String,
        parent: Option<NodeId>,
        local: Local3,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Entry {
            name,
            parent,
            children: Vec::new(),
            local,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn local(&self, node: NodeId) -> &Local3 {
        &self.nodes[node.0].local
    }

    pub fn local_mut(&mut self, node: NodeId) -> &mut Local3 {
        &mut self.nodes[node.0].local
    }

    pub fn global(&self, node: NodeId) -> Global3 {
        let entry = &self.nodes[node.0];
        match entry.parent {
            None => Global3::identity().append_local(&entry.local),
            Some(parent) => self.global(parent).append_local(&entry.local),
        }
    }

    /// `root` and all its descendants in pre-order.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }

        result
    }
}

impl TransformAccess for Hierarchy {
    type Node = NodeId;

    fn name(&self, node: NodeId) -> &str {
        &self.nodes[node.0].name
    }

    fn world_position(&self, node: NodeId) -> na::Vector3<f32> {
        self.global(node).position()
    }

    fn set_world_position(
        &mut self,
        node: NodeId,
        position: na::Vector3<f32>,
    ) {
        let local = match self.nodes[node.0].parent {
            None => Some(position),
            Some(parent) => self.global(parent).inverse_transform_point(&position),
        };

        match local {
            Some(local) => self.set_local_position(node, local),
            None => tracing::warn!(
                "Node `{}` has singular parent transform and cannot be moved",
                self.nodes[node.0].name
            ),
        }
    }

    fn local_position(&self, node: NodeId) -> na::Vector3<f32> {
        self.nodes[node.0].local.iso.translation.vector
    }

    fn set_local_position(
        &mut self,
        node: NodeId,
        position: na::Vector3<f32>,
    ) {
        self.nodes[node.0].local.iso.translation.vector = position;
    }

    fn local_scale(&self, node: NodeId) -> na::Vector3<f32> {
        self.nodes[node.0].local.scale
    }

    fn set_local_scale(&mut self, node: NodeId, scale: na::Vector3<f32>) {
        self.nodes[node.0].local.scale = scale;
    }

    fn inverse_transform_direction(
        &self,
        node: NodeId,
        direction: na::Vector3<f32>,
    ) -> na::Vector3<f32> {
        self.global(node)
            .iso
            .rotation
            .inverse_transform_vector(&direction)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node.0].children.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn close(a: na::Vector3<f32>, b: na::Vector3<f32>) -> bool {
        (a - b).norm() < EPSILON
    }

    fn arm() -> (Hierarchy, NodeId, NodeId, NodeId) {
        let mut scene = Hierarchy::new();
        let root = scene.add_root("Root", Local3::identity());
        let shoulder = scene.add_child(
            root,
            "Shoulder",
            Local3::from_translation(na::Vector3::new(0.0, 1.0, 0.0))
                .with_rotation(na::UnitQuaternion::from_axis_angle(
                    &na::Vector3::z_axis(),
                    std::f32::consts::FRAC_PI_2,
                )),
        );
        let elbow = scene.add_child(
            shoulder,
            "Elbow",
            Local3::from_translation(na::Vector3::new(1.0, 0.0, 0.0)),
        );
        (scene, root, shoulder, elbow)
    }

    #[test]
    fn world_positions_compose_parent_rotation() {
        let (scene, _, _, elbow) = arm();
        assert!(close(
            scene.world_position(elbow),
            na::Vector3::new(0.0, 2.0, 0.0)
        ));
    }

    #[test]
    fn parent_scale_affects_child_world_position() {
        let (mut scene, _, shoulder, elbow) = arm();
        scene.set_local_scale(shoulder, na::Vector3::new(2.0, 2.0, 2.0));
        assert!(close(
            scene.world_position(elbow),
            na::Vector3::new(0.0, 3.0, 0.0)
        ));
    }

    #[test]
    fn set_world_position_round_trips() {
        let (mut scene, _, _, elbow) = arm();
        let target = na::Vector3::new(0.5, -1.0, 2.0);
        scene.set_world_position(elbow, target);
        assert!(close(scene.world_position(elbow), target));
    }

    #[test]
    fn inverse_transform_direction_ignores_scale() {
        let (mut scene, _, shoulder, _) = arm();
        scene.set_local_scale(shoulder, na::Vector3::new(3.0, 3.0, 3.0));
        let local = scene
            .inverse_transform_direction(shoulder, na::Vector3::new(0.0, 1.0, 0.0));
        assert!(close(local, na::Vector3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn paths_resolve_both_ways() {
        let (scene, root, shoulder, elbow) = arm();
        assert_eq!(scene.path_of(root, elbow).as_deref(), Some("Shoulder/Elbow"));
        assert_eq!(scene.path_of(root, root).as_deref(), Some(""));
        assert_eq!(scene.path_of(elbow, shoulder), None);
        assert_eq!(scene.find_by_path(root, "Shoulder/Elbow"), Some(elbow));
        assert_eq!(scene.find_by_path(root, ""), Some(root));
        assert_eq!(scene.find_by_path(root, "Shoulder/Wrist"), None);
    }

    #[test]
    fn find_visits_parents_first_and_siblings_in_order() {
        let mut scene = Hierarchy::new();
        let root = scene.add_root("Root", Local3::identity());
        let a = scene.add_child(root, "A", Local3::identity());
        let b = scene.add_child(root, "B", Local3::identity());
        let deep = scene.add_child(a, "Target", Local3::identity());
        let shallow = scene.add_child(b, "Target", Local3::identity());

        let mut visited = Vec::new();
        let found = scene.find(root, &mut |node| {
            visited.push(node);
            scene.name(node) == "Target"
        });

        assert_eq!(found, Some(deep));
        assert_ne!(found, Some(shallow));
        assert_eq!(visited, vec![root, a, deep]);
    }
}
