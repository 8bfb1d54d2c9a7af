use crate::bone::SkeletonNode;

/// Persistent settings of one bone.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoneRecord {
    pub path: String,

    #[serde(default)]
    pub stretch: f32,

    #[serde(default = "default_scale")]
    pub scale: f32,

    #[serde(default)]
    pub is_symmetrical: bool,

    #[serde(default)]
    pub is_leg: bool,
}

impl<N> From<&SkeletonNode<N>> for BoneRecord
where
    N: Copy + Eq + std::fmt::Debug,
{
    fn from(node: &SkeletonNode<N>) -> Self {
        BoneRecord {
            path: node.path().to_owned(),
            stretch: node.stretch(),
            scale: node.scale(),
            is_symmetrical: node.is_symmetrical,
            is_leg: node.is_leg,
        }
    }
}

fn default_scale() -> f32 {
    1.0
}
