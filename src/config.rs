// Viewer configuration, read once at startup from an optional TOML file.
//
// Every field has a default, so an absent file or a partial file is fine:
//
//     measurements = "10.5, 12.3, 0.85"
//
//     [camera]
//     min_distance = 2.5
//     auto_rotate = false
//
//     [render]
//     backend = "flat"

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Environment variable that points at a config file when `--config` is not given.
pub const CONFIG_ENV: &str = "MANDIBLE_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Comma-separated M1..M15 values, overridden by `--measurements`.
    pub measurements: Option<String>,
    pub camera: CameraConfig,
    pub morph: MorphConfig,
    pub asset: AssetConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub home_distance: f32,
    /// Radians. Positive looks down on the model.
    pub home_pitch: f32,
    /// Radians. PI/2 faces the chin.
    pub home_yaw: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians per dragged pixel.
    pub sensitivity: f32,
    pub zoom_in_factor: f32,
    pub zoom_out_factor: f32,
    /// Distance change per zoom button press.
    pub zoom_step: f32,
    pub auto_rotate: bool,
    /// Radians of yaw per frame.
    pub auto_rotate_speed: f32,
    /// Fraction of the remaining difference covered per frame during fly-to.
    pub fly_rate: f32,
    pub fly_epsilon: f32,
    pub reset_secs: f32,
    pub intro_secs: f32,
    pub fov_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            home_distance: 5.5,
            home_pitch: 0.25,
            home_yaw: 1.2,
            min_distance: 2.0,
            max_distance: 15.0,
            sensitivity: 0.008,
            zoom_in_factor: 0.92,
            zoom_out_factor: 1.08,
            zoom_step: 0.8,
            auto_rotate: true,
            auto_rotate_speed: 0.003,
            fly_rate: 0.1,
            fly_epsilon: 1e-3,
            reset_secs: 2.0,
            intro_secs: 2.5,
            fov_degrees: 45.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MorphConfig {
    pub duration_secs: f32,
    /// Exponent of the ease-out curve: 3 (cubic) or 4 (quartic).
    pub ease_power: u32,
    /// Start fully male-typical when the loaded prediction says male.
    pub follow_prediction: bool,
}

impl Default for MorphConfig {
    fn default() -> Self {
        Self {
            duration_secs: 3.0,
            ease_power: 4,
            follow_prediction: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// OBJ file to load. `None` skips straight to procedural geometry.
    pub path: Option<PathBuf>,
    /// When false, a failed load shows the placeholder box instead of
    /// procedural parts.
    pub procedural_fallback: bool,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from("assets/models/mandible.obj")),
            procedural_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Hardware 3D when available, flat diagram otherwise.
    #[default]
    Auto,
    /// Always draw the flat diagram.
    Flat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub backend: Backend,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Auto,
            window_width: 1280,
            window_height: 720,
        }
    }
}

impl ViewerConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: ViewerConfig = toml::from_str(text)?;
        Ok(config.sanitized())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Load `path` if given, else the file named by `MANDIBLE_CONFIG`, else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match path.map(Path::to_path_buf).or(env_path) {
            Some(p) => {
                log::info!("Loading config from {}", p.display());
                Self::load(&p)
            }
            None => Ok(Self::default()),
        }
    }

    /// Repair values that would break the camera or animation math.
    fn sanitized(mut self) -> Self {
        let defaults = CameraConfig::default();
        let cam = &mut self.camera;
        if !(cam.min_distance > 0.0) {
            cam.min_distance = defaults.min_distance;
        }
        if !(cam.max_distance >= cam.min_distance) {
            cam.max_distance = cam.min_distance.max(defaults.max_distance);
        }
        cam.home_distance = cam.home_distance.clamp(cam.min_distance, cam.max_distance);
        if !(cam.zoom_in_factor > 0.0 && cam.zoom_in_factor < 1.0) {
            cam.zoom_in_factor = defaults.zoom_in_factor;
        }
        if !(cam.zoom_out_factor > 1.0) {
            cam.zoom_out_factor = defaults.zoom_out_factor;
        }
        // NaN slips through clamp, so replace it first.
        if cam.fly_rate.is_nan() {
            cam.fly_rate = defaults.fly_rate;
        }
        cam.fly_rate = cam.fly_rate.clamp(0.01, 1.0);
        // A zero threshold never lets fly-to finish.
        if !(cam.fly_epsilon > 0.0) {
            cam.fly_epsilon = defaults.fly_epsilon;
        }
        if !(cam.sensitivity >= 0.0 && cam.sensitivity.is_finite()) {
            cam.sensitivity = defaults.sensitivity;
        }
        if !(cam.auto_rotate_speed >= 0.0 && cam.auto_rotate_speed.is_finite()) {
            cam.auto_rotate_speed = defaults.auto_rotate_speed;
        }
        if !(self.morph.duration_secs >= 0.0) {
            self.morph.duration_secs = MorphConfig::default().duration_secs;
        }
        if self.morph.ease_power != 3 && self.morph.ease_power != 4 {
            log::warn!("ease_power {} not supported, using 4", self.morph.ease_power);
            self.morph.ease_power = 4;
        }
        self
    }
}

impl CameraConfig {
    pub fn reset_duration(&self) -> Duration {
        secs(self.reset_secs)
    }

    pub fn intro_duration(&self) -> Duration {
        secs(self.intro_secs)
    }
}

impl MorphConfig {
    pub fn duration(&self) -> Duration {
        secs(self.duration_secs)
    }
}

fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ViewerConfig::from_toml("").unwrap();
        assert_eq!(config.camera.home_distance, 5.5);
        assert_eq!(config.morph.ease_power, 4);
        assert_eq!(config.render.backend, Backend::Auto);
        assert!(config.asset.procedural_fallback);
    }

    #[test]
    fn partial_sections_override_fields() {
        let config = ViewerConfig::from_toml(
            r#"
            [camera]
            min_distance = 2.5
            auto_rotate = false

            [render]
            backend = "flat"

            [asset]
            path = "models/other.obj"
            "#,
        )
        .unwrap();
        assert_eq!(config.camera.min_distance, 2.5);
        assert!(!config.camera.auto_rotate);
        assert_eq!(config.camera.max_distance, 15.0);
        assert_eq!(config.render.backend, Backend::Flat);
        assert_eq!(config.asset.path, Some(PathBuf::from("models/other.obj")));
        assert!(config.measurements.is_none());
    }

    #[test]
    fn measurements_key_sits_above_the_sections() {
        let config = ViewerConfig::from_toml(
            r#"
            measurements = "10.5, , 0.85"

            [morph]
            duration_secs = 1.5
            "#,
        )
        .unwrap();
        assert_eq!(config.measurements.as_deref(), Some("10.5, , 0.85"));
        assert_eq!(config.morph.duration(), Duration::from_millis(1_500));
    }

    #[test]
    fn broken_bounds_are_repaired() {
        let config = ViewerConfig::from_toml(
            r#"
            [camera]
            min_distance = 8.0
            max_distance = 3.0
            home_distance = 1.0
            zoom_in_factor = 1.5

            [morph]
            ease_power = 7
            "#,
        )
        .unwrap();
        assert!(config.camera.max_distance >= config.camera.min_distance);
        assert_eq!(config.camera.home_distance, 8.0);
        assert_eq!(config.camera.zoom_in_factor, 0.92);
        assert_eq!(config.morph.ease_power, 4);
    }

    #[test]
    fn camera_rates_are_repaired() {
        let config = ViewerConfig::from_toml(
            r#"
            [camera]
            fly_rate = nan
            fly_epsilon = 0.0
            sensitivity = -0.01
            auto_rotate_speed = -1.0
            "#,
        )
        .unwrap();
        let defaults = CameraConfig::default();
        assert_eq!(config.camera.fly_rate, defaults.fly_rate);
        assert_eq!(config.camera.fly_epsilon, defaults.fly_epsilon);
        assert_eq!(config.camera.sensitivity, defaults.sensitivity);
        assert_eq!(config.camera.auto_rotate_speed, defaults.auto_rotate_speed);

        let tiny = ViewerConfig::from_toml("[camera]\nfly_rate = 0.0\nfly_epsilon = -1.0").unwrap();
        assert_eq!(tiny.camera.fly_rate, 0.01);
        assert!(tiny.camera.fly_epsilon > 0.0);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(ViewerConfig::from_toml("[camera\nmin_distance = ").is_err());
    }
}
