use {
    eyre::{Report, WrapErr},
    std::path::{Path, PathBuf},
};

/// Host-owned viewer configuration.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: OrbitConfig,

    #[serde(default)]
    pub rig: RigConfig,
}

impl Config {
    pub fn load_default() -> Result<Self, Report> {
        let path = std::env::var("LOOKDEV_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./lookdev.ron"));

        if !path.exists() {
            tracing::debug!(
                "Config file `{}` not found, using defaults",
                path.display()
            );
            return Ok(Config::default());
        }

        Self::load(&path)
    }

    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<Self, Report> {
        let text = std::fs::read_to_string(path).wrap_err_with(|| {
            format!("Failed to read config `{}`", path.display())
        })?;
        Self::from_ron_str(&text)
            .wrap_err_with(|| format!("Invalid config `{}`", path.display()))
    }

    pub fn from_ron_str(text: &str) -> Result<Self, Report> {
        Ok(ron::de::from_str(text)?)
    }
}

/// Orbit camera speeds and behaviour.
#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct OrbitConfig {
    #[serde(default = "default_speed")]
    pub rotate_speed: f32,

    #[serde(default = "default_speed")]
    pub zoom_speed: f32,

    #[serde(default = "default_speed")]
    pub pan_speed: f32,

    /// In `[0, 5]`. Higher is slower to follow input.
    #[serde(default = "default_smoothness")]
    pub smoothness: f32,

    /// Vertical field of view in degrees.
    #[serde(default = "default_field_of_view")]
    pub field_of_view: f32,

    #[serde(default)]
    pub auto_rotate: bool,

    /// Degrees per second.
    #[serde(default = "default_auto_rotate_speed")]
    pub auto_rotate_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        OrbitConfig {
            rotate_speed: default_speed(),
            zoom_speed: default_speed(),
            pan_speed: default_speed(),
            smoothness: default_smoothness(),
            field_of_view: default_field_of_view(),
            auto_rotate: false,
            auto_rotate_speed: default_auto_rotate_speed(),
        }
    }
}

/// Bone name conventions used to set up a modifier set.
/// All names are matched case-insensitively as substrings.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct RigConfig {
    #[serde(default = "default_pelvis_names")]
    pub pelvis_names: Vec<String>,

    #[serde(default = "default_foot_names")]
    pub foot_names: Vec<String>,

    /// Bones whose names contain any of these are marked as legs when bound.
    #[serde(default = "default_leg_tokens")]
    pub leg_tokens: Vec<String>,
}

impl Default for RigConfig {
    fn default() -> Self {
        RigConfig {
            pelvis_names: default_pelvis_names(),
            foot_names: default_foot_names(),
            leg_tokens: default_leg_tokens(),
        }
    }
}

/// Case-insensitive substring match against any of `tokens`.
pub fn name_matches(name: &str, tokens: &[String]) -> bool {
    let name = name.to_lowercase();
    tokens
        .iter()
        .any(|token| name.contains(token.to_lowercase().as_str()))
}

fn default_speed() -> f32 {
    1.0
}

fn default_smoothness() -> f32 {
    1.0
}

fn default_field_of_view() -> f32 {
    30.0
}

fn default_auto_rotate_speed() -> f32 {
    10.0
}

fn default_pelvis_names() -> Vec<String> {
    vec!["Hips".to_owned(), "Pelvis".to_owned()]
}

fn default_foot_names() -> Vec<String> {
    vec!["Foot".to_owned()]
}

fn default_leg_tokens() -> Vec<String> {
    ["leg", "thigh", "knee", "calf", "shin", "foot", "ankle"]
        .iter()
        .map(|&token| token.to_owned())
        .collect()
}
