//! Core of a 3D asset look-dev viewer: transform hierarchy access,
//! bounds framing and a smoothed orbit camera rig.

pub mod bounds;
pub mod camera;
pub mod config;
pub mod error;
pub mod persist;
pub mod scene;

pub use self::{
    bounds::{BoundingVolume, BoundsProvider},
    camera::{CameraView, OrbitAngles, OrbitCameraRig, ViewSlots},
    config::{Config, OrbitConfig, RigConfig},
    error::Error,
    scene::{Global3, Hierarchy, Local3, NodeId, TransformAccess},
};
