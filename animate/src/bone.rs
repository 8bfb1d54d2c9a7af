use {
    lookdev::scene::TransformAccess,
    nalgebra as na,
    std::fmt::{self, Debug},
};

/// How a bone is located in the hierarchy.
pub enum NodeMatcher<'a> {
    /// Slash-delimited path relative to skeleton root.
    Path(&'a str),

    /// First node in pre-order whose name satisfies the predicate.
    Predicate(&'a dyn Fn(&str) -> bool),
}

impl NodeMatcher<'_> {
    pub fn resolve<A>(&self, access: &A, root: A::Node) -> Option<A::Node>
    where
        A: TransformAccess + ?Sized,
    {
        match self {
            NodeMatcher::Path(path) => access.find_by_path(root, path),
            NodeMatcher::Predicate(predicate) => {
                access.find(root, &mut |node| predicate(access.name(node)))
            }
        }
    }
}

impl Debug for NodeMatcher<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeMatcher::Path(path) => f.debug_tuple("Path").field(path).finish(),
            NodeMatcher::Predicate(_) => f.write_str("Predicate(<function>)"),
        }
    }
}

/// Bind pose captured when a node is resolved.
#[derive(Clone, Copy, Debug)]
pub struct Binding<N> {
    pub node: N,
    pub original_local_position: na::Vector3<f32>,
    pub original_local_scale: na::Vector3<f32>,
    pub original_world_position: na::Vector3<f32>,

    /// Unit direction from parent to node in parent's local space.
    /// Zero for roots and nodes coincident with their parent.
    pub direction: na::Vector3<f32>,
}

/// One modifiable bone.
///
/// An unbound node remembers its settings but ignores every modification
/// until it is bound again.
#[derive(Clone, Debug)]
pub struct SkeletonNode<N> {
    path: String,
    display_name: String,
    parent_path: Option<String>,
    binding: Option<Binding<N>>,

    stretch: f32,
    scale: f32,
    pub is_symmetrical: bool,
    pub is_leg: bool,

    /// Path of the node last coupled by symmetry.
    pub(crate) paired: Option<String>,
    pelvis_offset_contribution: f32,
}

impl<N> SkeletonNode<N>
where
    N: Copy + Eq + Debug,
{
    /// Resolves `matcher` under `root` and captures its bind pose.
    pub fn bind<A>(
        access: &A,
        root: N,
        matcher: NodeMatcher<'_>,
    ) -> Option<Self>
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let node = matcher.resolve(access, root)?;
        let path = access.path_of(root, node)?;
        Some(Self::from_handle(access, root, node, path))
    }

    pub(crate) fn from_handle<A>(
        access: &A,
        root: N,
        node: N,
        path: String,
    ) -> Self
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let parent = access.parent(node);
        let mut skeleton_node = SkeletonNode {
            path,
            display_name: access.name(node).to_owned(),
            parent_path: parent.and_then(|parent| access.path_of(root, parent)),
            binding: None,
            stretch: 0.0,
            scale: 1.0,
            is_symmetrical: false,
            is_leg: false,
            paired: None,
            pelvis_offset_contribution: 0.0,
        };
        skeleton_node.rebind(access, node);
        skeleton_node
    }

    /// Node that could not be resolved.
    pub fn unbound(path: impl Into<String>) -> Self {
        let path = path.into();
        let display_name = path.rsplit('/').next().unwrap_or("").to_owned();

        SkeletonNode {
            path,
            display_name,
            parent_path: None,
            binding: None,
            stretch: 0.0,
            scale: 1.0,
            is_symmetrical: false,
            is_leg: false,
            paired: None,
            pelvis_offset_contribution: 0.0,
        }
    }

    /// Captures bind pose of `node`, replacing any previous binding.
    pub(crate) fn rebind<A>(&mut self, access: &A, node: N)
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let world = access.world_position(node);
        let direction = match access.parent(node) {
            Some(parent) => {
                match (world - access.world_position(parent))
                    .try_normalize(f32::EPSILON)
                {
                    Some(dir) => {
                        access.inverse_transform_direction(parent, dir)
                    }
                    None => na::Vector3::zeros(),
                }
            }
            None => na::Vector3::zeros(),
        };

        self.binding = Some(Binding {
            node,
            original_local_position: access.local_position(node),
            original_local_scale: access.local_scale(node),
            original_world_position: world,
            direction,
        });
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn parent_path(&self) -> Option<&str> {
        self.parent_path.as_deref()
    }

    pub fn binding(&self) -> Option<&Binding<N>> {
        self.binding.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn stretch(&self) -> f32 {
        self.stretch
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn paired(&self) -> Option<&str> {
        self.paired.as_deref()
    }

    pub fn pelvis_offset_contribution(&self) -> f32 {
        self.pelvis_offset_contribution
    }

    /// Stores new values. Nothing moves until the node is applied.
    /// Non-finite values are stored as neutral. Ignored while unbound.
    pub fn set_modification(&mut self, stretch: f32, scale: f32) {
        if self.is_bound() {
            self.stretch = finite_or(stretch, 0.0);
            self.scale = finite_or(scale, 1.0);
        }
    }

    /// Restores settings loaded from a document, bound or not.
    pub(crate) fn restore(
        &mut self,
        stretch: f32,
        scale: f32,
        is_symmetrical: bool,
        is_leg: bool,
    ) {
        self.stretch = finite_or(stretch, 0.0);
        self.scale = finite_or(scale, 1.0);
        self.is_symmetrical = is_symmetrical;
        self.is_leg = is_leg;
    }

    /// Returns node to its bind pose.
    pub fn reset<A>(&mut self, access: &mut A)
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        self.set_modification(0.0, 1.0);
        self.apply_transform(access, false);
    }

    /// Writes stretched position and scale into the hierarchy and updates
    /// the pelvis contribution. Symmetry is handled by the owning set.
    pub fn apply_transform<A>(&mut self, access: &mut A, use_current_as_base: bool)
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let binding = match &self.binding {
            Some(binding) => *binding,
            None => return,
        };

        let base = if use_current_as_base {
            access.local_position(binding.node)
        } else {
            binding.original_local_position
        };

        let offset = binding
            .direction
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(na::Vector3::zeros)
            * self.stretch;

        access.set_local_position(binding.node, base + offset);
        access.set_local_scale(
            binding.node,
            binding.original_local_scale * self.scale,
        );

        self.refresh_contribution(&*access);

        tracing::trace!(
            "Applied stretch {} scale {} to `{}`",
            self.stretch,
            self.scale,
            self.path
        );
    }

    /// Measures how far a leg node dropped below its bind height.
    /// Must be called again once ancestors have moved.
    pub(crate) fn refresh_contribution<A>(&mut self, access: &A)
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        self.pelvis_offset_contribution = match &self.binding {
            Some(binding) if self.is_leg => {
                (binding.original_world_position
                    - access.world_position(binding.node))
                .y
            }
            _ => 0.0,
        };
    }

    /// Whether `other` lies below this node in the hierarchy.
    pub(crate) fn is_ancestor_of(&self, other: &SkeletonNode<N>) -> bool {
        other.path.len() > self.path.len()
            && other.path.starts_with(self.path.as_str())
            && other.path[self.path.len()..].starts_with('/')
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        lookdev::scene::{Hierarchy, Local3, NodeId},
    };

    const EPSILON: f32 = 1e-5;

    fn chain() -> (Hierarchy, NodeId, NodeId) {
        let mut scene = Hierarchy::new();
        let root = scene.add_root("Root", Local3::identity());
        let upper = scene.add_child(
            root,
            "UpperArm_L",
            Local3::from_translation(na::Vector3::new(0.2, 1.5, 0.0))
                .with_rotation(na::UnitQuaternion::from_axis_angle(
                    &na::Vector3::z_axis(),
                    -std::f32::consts::FRAC_PI_2,
                )),
        );
        scene.add_child(
            upper,
            "LowerArm_L",
            Local3::from_translation(na::Vector3::new(0.0, 0.3, 0.0))
                .with_scale(na::Vector3::new(1.0, 1.2, 0.9)),
        );
        (scene, root, upper)
    }

    #[test]
    fn binding_captures_direction_in_parent_space() {
        let (scene, root, _) = chain();
        let node =
            SkeletonNode::bind(&scene, root, NodeMatcher::Path("UpperArm_L/LowerArm_L"))
                .unwrap();

        let binding = node.binding().unwrap();
        assert!(
            (binding.direction - na::Vector3::new(0.0, 1.0, 0.0)).norm()
                < EPSILON
        );
        assert_eq!(node.display_name(), "LowerArm_L");
        assert_eq!(node.parent_path(), Some("UpperArm_L"));
    }

    #[test]
    fn predicate_matcher_finds_first_in_order() {
        let (scene, root, upper) = chain();
        let node = SkeletonNode::bind(
            &scene,
            root,
            NodeMatcher::Predicate(&|name| name.ends_with("_L")),
        )
        .unwrap();

        assert_eq!(node.binding().unwrap().node, upper);
        assert_eq!(node.path(), "UpperArm_L");
    }

    #[test]
    fn missing_node_does_not_bind() {
        let (scene, root, _) = chain();
        assert!(SkeletonNode::bind(&scene, root, NodeMatcher::Path("Tail")).is_none());
    }

    #[test]
    fn stretch_moves_along_bind_direction() {
        let (mut scene, root, _) = chain();
        let mut node =
            SkeletonNode::bind(&scene, root, NodeMatcher::Path("UpperArm_L/LowerArm_L"))
                .unwrap();
        let handle = node.binding().unwrap().node;

        node.set_modification(0.25, 2.0);
        node.apply_transform(&mut scene, false);

        assert!(
            (scene.local_position(handle) - na::Vector3::new(0.0, 0.55, 0.0))
                .norm()
                < EPSILON
        );
        assert!(
            (scene.local_scale(handle) - na::Vector3::new(2.0, 2.4, 1.8)).norm()
                < EPSILON
        );
    }

    #[test]
    fn reset_restores_bind_pose_exactly() {
        let (mut scene, root, _) = chain();
        let mut node =
            SkeletonNode::bind(&scene, root, NodeMatcher::Path("UpperArm_L/LowerArm_L"))
                .unwrap();
        let handle = node.binding().unwrap().node;
        let position = scene.local_position(handle);
        let scale = scene.local_scale(handle);

        for &(stretch, factor) in &[(0.3, 1.5), (-0.7, 0.2), (12.0, 3.0)] {
            node.set_modification(stretch, factor);
            node.apply_transform(&mut scene, false);
        }

        node.reset(&mut scene);

        assert_eq!(scene.local_position(handle), position);
        assert_eq!(scene.local_scale(handle), scale);
    }

    #[test]
    fn unbound_node_ignores_modifications() {
        let (mut scene, _, _) = chain();
        let mut node = SkeletonNode::<NodeId>::unbound("Spine/Missing");
        node.set_modification(1.0, 2.0);
        node.apply_transform(&mut scene, false);

        assert!(!node.is_bound());
        assert_eq!(node.stretch(), 0.0);
        assert_eq!(node.scale(), 1.0);
        assert_eq!(node.display_name(), "Missing");
    }

    #[test]
    fn non_finite_modification_is_neutral() {
        let (mut scene, root, _) = chain();
        let mut node =
            SkeletonNode::bind(&scene, root, NodeMatcher::Path("UpperArm_L/LowerArm_L"))
                .unwrap();
        let handle = node.binding().unwrap().node;
        let position = scene.local_position(handle);

        node.set_modification(f32::NAN, f32::INFINITY);
        node.apply_transform(&mut scene, false);

        assert_eq!(node.stretch(), 0.0);
        assert_eq!(node.scale(), 1.0);
        assert_eq!(scene.local_position(handle), position);
        assert!(scene.local_scale(handle).iter().all(|c| c.is_finite()));
    }

    #[test]
    fn ancestry_follows_path_segments() {
        let upper = SkeletonNode::<NodeId>::unbound("Hips/UpLeg_L");
        let lower = SkeletonNode::<NodeId>::unbound("Hips/UpLeg_L/Leg_L");
        let sibling = SkeletonNode::<NodeId>::unbound("Hips/UpLeg_Long");

        assert!(upper.is_ancestor_of(&lower));
        assert!(!lower.is_ancestor_of(&upper));
        assert!(!upper.is_ancestor_of(&sibling));
        assert!(!upper.is_ancestor_of(&upper));
    }
}
