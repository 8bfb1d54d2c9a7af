use {
    crate::{
        bone::{NodeMatcher, SkeletonNode},
        record::BoneRecord,
        symmetry,
    },
    lookdev::{
        config::{name_matches, RigConfig},
        persist,
        scene::TransformAccess,
        Error,
    },
    nalgebra as na,
    std::{fmt::Debug, path::Path},
};

/// Share of leg offset applied on top of an animated pose.
const ANIMATED_PELVIS_DAMPING: f32 = 0.5;

/// Node whose world position is tracked but never modified directly.
#[derive(Clone, Debug)]
pub struct Anchor<N> {
    pub node: N,
    pub path: String,
    pub original_world_position: na::Vector3<f32>,
}

impl<N> Anchor<N>
where
    N: Copy + Eq + Debug,
{
    fn capture<A>(access: &A, root: N, node: N) -> Option<Self>
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        Some(Anchor {
            node,
            path: access.path_of(root, node)?,
            original_world_position: access.world_position(node),
        })
    }
}

/// Bone length modifications of one skeleton.
///
/// Nodes are modified in list order. Symmetry partners resolved during
/// [`apply`] are appended to the list when not present yet.
///
/// Adding or removing nodes requires exclusive access, so the list cannot
/// change while it is being applied.
///
/// [`apply`]: BoneModifierSet::apply
#[derive(Clone, Debug)]
pub struct BoneModifierSet<N> {
    root: N,
    nodes: Vec<SkeletonNode<N>>,
    pelvis: Option<Anchor<N>>,
    foot: Option<Anchor<N>>,
    leg_tokens: Vec<String>,
}

impl<N> BoneModifierSet<N>
where
    N: Copy + Eq + Debug,
{
    pub fn new(root: N) -> Self {
        BoneModifierSet {
            root,
            nodes: Vec::new(),
            pelvis: None,
            foot: None,
            leg_tokens: Vec::new(),
        }
    }

    /// Creates set with leg detection and pelvis/foot anchors found by the
    /// configured names.
    pub fn with_config<A>(access: &A, root: N, config: &RigConfig) -> Self
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let mut set = BoneModifierSet::new(root);
        set.leg_tokens = config.leg_tokens.clone();

        set.pelvis = access
            .find(root, &mut |node| {
                name_matches(access.name(node), &config.pelvis_names)
            })
            .and_then(|node| Anchor::capture(access, root, node));

        set.foot = access
            .find(root, &mut |node| {
                name_matches(access.name(node), &config.foot_names)
            })
            .and_then(|node| Anchor::capture(access, root, node));

        if set.pelvis.is_none() {
            tracing::debug!("No pelvis found, height compensation disabled");
        }

        set
    }

    pub fn root(&self) -> N {
        self.root
    }

    pub fn nodes(&self) -> &[SkeletonNode<N>] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&SkeletonNode<N>> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of the node with given path.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.path() == path)
    }

    pub fn pelvis(&self) -> Option<&Anchor<N>> {
        self.pelvis.as_ref()
    }

    pub fn foot(&self) -> Option<&Anchor<N>> {
        self.foot.as_ref()
    }

    /// Uses matched node for height compensation.
    /// Returns `false` and keeps previous pelvis if nothing matches.
    pub fn set_pelvis<A>(&mut self, access: &A, matcher: NodeMatcher<'_>) -> bool
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        match self.resolve_anchor(access, matcher) {
            Some(anchor) => {
                self.pelvis = Some(anchor);
                true
            }
            None => false,
        }
    }

    /// Uses matched node to report height drift.
    pub fn set_foot<A>(&mut self, access: &A, matcher: NodeMatcher<'_>) -> bool
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        match self.resolve_anchor(access, matcher) {
            Some(anchor) => {
                self.foot = Some(anchor);
                true
            }
            None => false,
        }
    }

    fn resolve_anchor<A>(
        &self,
        access: &A,
        matcher: NodeMatcher<'_>,
    ) -> Option<Anchor<N>>
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let anchor = matcher
            .resolve(access, self.root)
            .and_then(|node| Anchor::capture(access, self.root, node));

        if anchor.is_none() {
            tracing::warn!("Anchor {:?} not found", matcher);
        }
        anchor
    }

    /// Binds matched node and returns its index.
    /// Existing entry with the same path is reused.
    pub fn try_bind_node<A>(
        &mut self,
        access: &A,
        matcher: NodeMatcher<'_>,
    ) -> Result<usize, Error>
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let not_found = || Error::NodeNotFound {
            path: match &matcher {
                NodeMatcher::Path(path) => (*path).to_owned(),
                NodeMatcher::Predicate(_) => format!("{:?}", matcher),
            },
        };

        let node = matcher.resolve(access, self.root).ok_or_else(not_found)?;
        let path = access.path_of(self.root, node).ok_or_else(not_found)?;
        Ok(self.insert(access, node, path))
    }

    /// Same as [`try_bind_node`], logging failure.
    ///
    /// [`try_bind_node`]: BoneModifierSet::try_bind_node
    pub fn bind_node<A>(
        &mut self,
        access: &A,
        matcher: NodeMatcher<'_>,
    ) -> Option<usize>
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        match self.try_bind_node(access, matcher) {
            Ok(index) => Some(index),
            Err(err) => {
                tracing::warn!("{}", err);
                None
            }
        }
    }

    fn insert<A>(&mut self, access: &A, node: N, path: String) -> usize
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        match self.position(&path) {
            Some(index) => {
                let existing = &mut self.nodes[index];
                if !existing.is_bound() {
                    existing.rebind(access, node);
                }
                index
            }
            None => {
                let mut bone =
                    SkeletonNode::from_handle(access, self.root, node, path);
                bone.is_leg = name_matches(bone.display_name(), &self.leg_tokens);
                self.nodes.push(bone);
                self.nodes.len() - 1
            }
        }
    }

    pub fn set_modification(&mut self, index: usize, stretch: f32, scale: f32) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.set_modification(stretch, scale);
        }
    }

    pub fn set_symmetrical(&mut self, index: usize, symmetrical: bool) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.is_symmetrical = symmetrical;
        }
    }

    pub fn set_leg(&mut self, index: usize, leg: bool) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.is_leg = leg;
        }
    }

    /// Finds mirrored counterpart of the node by name.
    pub fn find_symmetrical_node<A>(
        &self,
        access: &A,
        index: usize,
    ) -> Result<(String, N), Error>
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let node = self.nodes.get(index).ok_or_else(|| Error::NodeNotFound {
            path: format!("#{}", index),
        })?;

        symmetry::find_symmetrical_node(access, self.root, node.path())
            .ok_or_else(|| Error::SymmetryPairNotFound {
                path: node.path().to_owned(),
            })
    }

    /// Applies node modification and its symmetry coupling.
    ///
    /// With `use_current_as_base` the stretch is layered over the node's
    /// current local position, as needed when an animation drives the pose.
    /// Without it the node is rebuilt from its bind pose and the pelvis
    /// compensation is refreshed right away. In animated mode call
    /// [`apply_pelvis_offset`] once after all nodes are applied.
    ///
    /// [`apply_pelvis_offset`]: BoneModifierSet::apply_pelvis_offset
    pub fn apply<A>(
        &mut self,
        access: &mut A,
        index: usize,
        use_current_as_base: bool,
    ) where
        A: TransformAccess<Node = N> + ?Sized,
    {
        if use_current_as_base {
            self.apply_node(access, index, true);
        } else {
            self.restore_pelvis(access);
            self.apply_node(access, index, false);
            self.refresh_contributions(&*access);
            self.apply_pelvis_offset(access, false);
        }
    }

    fn apply_node<A>(
        &mut self,
        access: &mut A,
        index: usize,
        use_current_as_base: bool,
    ) where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let (stretch, scale, is_leg, is_symmetrical) =
            match self.nodes.get_mut(index) {
                Some(node) if node.is_bound() => {
                    node.apply_transform(access, use_current_as_base);
                    (node.stretch(), node.scale(), node.is_leg, node.is_symmetrical)
                }
                _ => return,
            };

        if is_symmetrical {
            // Retried on every call so pairs appearing later get picked up.
            let pair = match self.resolve_pair(&*access, index) {
                Some(pair) => pair,
                None => return,
            };

            let pair_path = self.nodes[pair].path().to_owned();
            if let Some(previous) = self.nodes[index].paired.replace(pair_path)
            {
                if self.nodes[pair].path() != previous {
                    self.reset_coupled(access, &previous, use_current_as_base);
                }
            }

            let mirrored = &mut self.nodes[pair];
            mirrored.set_modification(stretch, scale);
            mirrored.is_leg = is_leg;
            mirrored.apply_transform(access, use_current_as_base);
        } else if let Some(previous) = self.nodes[index].paired.take() {
            self.reset_coupled(access, &previous, use_current_as_base);
        }
    }

    fn resolve_pair<A>(&mut self, access: &A, index: usize) -> Option<usize>
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        match self.find_symmetrical_node(access, index) {
            Ok((path, node)) => Some(self.insert(access, node, path)),
            Err(err) => {
                tracing::debug!("{}", err);
                None
            }
        }
    }

    /// Undoes modification previously copied onto a symmetry partner.
    fn reset_coupled<A>(
        &mut self,
        access: &mut A,
        path: &str,
        use_current_as_base: bool,
    ) where
        A: TransformAccess<Node = N> + ?Sized,
    {
        if let Some(index) = self.position(path) {
            let node = &mut self.nodes[index];
            node.set_modification(0.0, 1.0);
            node.apply_transform(access, use_current_as_base);
        }
    }

    /// Restores node (and its symmetry partner) to bind pose.
    pub fn reset<A>(&mut self, access: &mut A, index: usize)
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        self.set_modification(index, 0.0, 1.0);
        self.apply(access, index, false);
    }

    pub fn reset_all<A>(&mut self, access: &mut A)
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        self.restore_pelvis(access);
        for index in 0..self.nodes.len() {
            self.set_modification(index, 0.0, 1.0);
            self.apply_node(access, index, false);
        }
        self.refresh_contributions(&*access);
        self.restore_pelvis(access);
    }

    /// Applies every node in order followed by the pelvis compensation.
    pub fn apply_all<A>(&mut self, access: &mut A, use_current_as_base: bool)
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        if !use_current_as_base {
            self.restore_pelvis(access);
        }

        // Symmetry may append partners while walking.
        let mut index = 0;
        while index < self.nodes.len() {
            self.apply_node(access, index, use_current_as_base);
            index += 1;
        }

        self.refresh_contributions(&*access);
        self.apply_pelvis_offset(access, use_current_as_base);
    }

    /// Remeasures leg nodes after all of their ancestors have settled.
    fn refresh_contributions<A>(&mut self, access: &A)
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        for node in &mut self.nodes {
            node.refresh_contribution(access);
        }
    }

    /// Sum of leg contributions from the last apply.
    ///
    /// Only the lowest bound leg node of each chain counts, since its drop
    /// already includes every stretched leg bone above it.
    pub fn pelvis_offset(&self) -> f32 {
        let is_counted_leg =
            |node: &SkeletonNode<N>| node.is_bound() && node.is_leg;

        self.nodes
            .iter()
            .filter(|node| is_counted_leg(*node))
            .filter(|node| {
                !self.nodes.iter().any(|other| {
                    is_counted_leg(other) && node.is_ancestor_of(other)
                })
            })
            .map(|node| node.pelvis_offset_contribution())
            .sum()
    }

    /// Moves pelvis vertically to keep feet on the ground after leg
    /// stretching. Over an animated pose only half of the offset is added to
    /// the current height.
    ///
    /// A static [`apply`] refreshes the pelvis itself. An animated [`apply`]
    /// leaves it alone, so the host calls this once per frame after every
    /// node is applied; [`apply_all`] does so already. Calling it per node
    /// would stack the damped offset onto an already lifted pelvis.
    ///
    /// [`apply`]: BoneModifierSet::apply
    /// [`apply_all`]: BoneModifierSet::apply_all
    pub fn apply_pelvis_offset<A>(
        &self,
        access: &mut A,
        use_current_as_base: bool,
    ) where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let pelvis = match &self.pelvis {
            Some(pelvis) => pelvis,
            None => return,
        };

        let offset = self.pelvis_offset();
        let mut position = if use_current_as_base {
            access.world_position(pelvis.node)
        } else {
            pelvis.original_world_position
        };

        position.y += if use_current_as_base {
            offset * ANIMATED_PELVIS_DAMPING
        } else {
            offset
        };

        access.set_world_position(pelvis.node, position);
    }

    fn restore_pelvis<A>(&self, access: &mut A)
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        if let Some(pelvis) = &self.pelvis {
            access.set_world_position(pelvis.node, pelvis.original_world_position);
        }
    }

    /// Vertical distance the foot moved away from its bind position.
    pub fn foot_height_drift<A>(&self, access: &A) -> Option<f32>
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let foot = self.foot.as_ref()?;
        Some(access.world_position(foot.node).y - foot.original_world_position.y)
    }

    /// Resets node and removes it from the set.
    pub fn remove<A>(
        &mut self,
        access: &mut A,
        index: usize,
    ) -> Option<SkeletonNode<N>>
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        if index >= self.nodes.len() {
            return None;
        }

        self.reset(access, index);
        let removed = self.nodes.remove(index);

        for node in &mut self.nodes {
            if node.paired.as_deref() == Some(removed.path()) {
                node.paired = None;
            }
        }

        Some(removed)
    }

    pub fn records(&self) -> Vec<BoneRecord> {
        self.nodes.iter().map(BoneRecord::from).collect()
    }

    /// Builds set from records, resolving paths against the hierarchy.
    /// Anchors and leg detection come from `config` as in [`with_config`].
    /// Records that don't resolve are kept as unbound nodes.
    ///
    /// [`with_config`]: BoneModifierSet::with_config
    pub fn from_records<A>(
        access: &A,
        root: N,
        config: &RigConfig,
        records: &[BoneRecord],
    ) -> Self
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let mut set = BoneModifierSet::with_config(access, root, config);
        set.restore_records(access, records);
        set
    }

    /// Adds or updates nodes from records. Nothing is applied.
    pub fn restore_records<A>(&mut self, access: &A, records: &[BoneRecord])
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        for record in records {
            let index = match access.find_by_path(self.root, &record.path) {
                Some(node) => self.insert(access, node, record.path.clone()),
                None => match self.position(&record.path) {
                    Some(index) => index,
                    None => {
                        tracing::warn!(
                            "Bone `{}` not found, keeping it unbound",
                            record.path
                        );
                        self.nodes.push(SkeletonNode::unbound(record.path.clone()));
                        self.nodes.len() - 1
                    }
                },
            };

            self.nodes[index].restore(
                record.stretch,
                record.scale,
                record.is_symmetrical,
                record.is_leg,
            );
        }
    }

    pub fn to_ron(&self) -> Result<String, Error> {
        persist::to_ron(&self.records())
    }

    pub fn from_ron<A>(
        access: &A,
        root: N,
        config: &RigConfig,
        text: &str,
    ) -> Result<Self, Error>
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let records: Vec<BoneRecord> = persist::from_ron(text)?;
        Ok(Self::from_records(access, root, config, &records))
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        persist::save(path, &self.records())
    }

    pub fn load<A>(
        access: &A,
        root: N,
        config: &RigConfig,
        path: &Path,
    ) -> Result<Self, Error>
    where
        A: TransformAccess<Node = N> + ?Sized,
    {
        let records: Vec<BoneRecord> = persist::load(path)?;
        Ok(Self::from_records(access, root, config, &records))
    }
}
