//! Runtime bone length adjustment for humanoid rigs.
//!
//! Bones are stretched along their bind direction and scaled relative to
//! their bind scale. Left/right pairs can be coupled by name and leg
//! stretching lifts the pelvis to keep feet on the ground.

pub mod bone;
pub mod modifier;
pub mod record;
pub mod symmetry;

pub use self::{
    bone::{Binding, NodeMatcher, SkeletonNode},
    modifier::{Anchor, BoneModifierSet},
    record::BoneRecord,
    symmetry::{find_symmetrical_node, mirrored_paths, MIRROR_TOKENS},
};
