use {
    crate::{error::Error, persist},
    nalgebra as na,
    std::path::Path,
};

/// Orbit orientation in degrees.
/// Stored as `[yaw, pitch]` in documents.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct OrbitAngles {
    pub yaw: f32,
    pub pitch: f32,
}

impl OrbitAngles {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        OrbitAngles { yaw, pitch }
    }

    /// Rotation about Y by yaw, then about X by pitch.
    pub fn to_rotation(&self) -> na::UnitQuaternion<f32> {
        na::UnitQuaternion::from_axis_angle(
            &na::Vector3::y_axis(),
            self.yaw.to_radians(),
        ) * na::UnitQuaternion::from_axis_angle(
            &na::Vector3::x_axis(),
            self.pitch.to_radians(),
        )
    }
}

impl From<[f32; 2]> for OrbitAngles {
    fn from([yaw, pitch]: [f32; 2]) -> Self {
        OrbitAngles { yaw, pitch }
    }
}

impl From<OrbitAngles> for [f32; 2] {
    fn from(angles: OrbitAngles) -> Self {
        [angles.yaw, angles.pitch]
    }
}

/// Snapshot of orbit camera destination state.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraView {
    pub name: String,
    pub rotation: OrbitAngles,
    pub distance: f32,
    pub pivot: na::Vector3<f32>,
    pub field_of_view: f32,
}

/// Ordered list of saved views. Slot index is insertion order.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ViewSlots {
    views: Vec<CameraView>,
}

impl ViewSlots {
    pub fn new() -> Self {
        ViewSlots { views: Vec::new() }
    }

    /// Appends view and returns its slot index.
    pub fn push(&mut self, view: CameraView) -> usize {
        self.views.push(view);
        self.views.len() - 1
    }

    /// Removes slot, shifting later slots down.
    pub fn remove(&mut self, index: usize) -> Option<CameraView> {
        if index < self.views.len() {
            Some(self.views.remove(index))
        } else {
            None
        }
    }

    pub fn get(&self, index: usize) -> Option<&CameraView> {
        self.views.get(index)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CameraView> + '_ {
        self.views.iter()
    }

    pub fn to_ron(&self) -> Result<String, Error> {
        persist::to_ron(self)
    }

    pub fn from_ron(text: &str) -> Result<Self, Error> {
        persist::from_ron(text)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        persist::save(path, self)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        persist::load(path)
    }
}
