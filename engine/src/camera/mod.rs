pub mod orbit;
pub mod view;

pub use self::{
    orbit::OrbitCameraRig,
    view::{CameraView, OrbitAngles, ViewSlots},
};
