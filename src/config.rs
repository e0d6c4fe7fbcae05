use std::{
	fs,
	path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
	core::camera::CameraSettings,
	scene::{description::load_scene, presets::ScenePreset, Scene},
};

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// Everything a run needs to know, read from a RON file. Every field has a
/// default, so `()` is a valid config.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
	pub width: u32,
	pub height: u32,
	pub samples_per_pixel: u32,
	/// Bounces before a path is cut off
	pub max_depth: u32,
	/// Side of the square compute workgroups
	pub workgroup_size: u32,
	pub mode: RenderMode,
	pub camera: CameraSettings,
	pub scene: SceneSource,
	/// Overrides the background of the scene
	pub background: Option<Vec3>,
}

impl Default for RenderConfig {
	fn default() -> Self {
		Self {
			width: 640,
			height: 480,
			samples_per_pixel: 1,
			max_depth: 8,
			workgroup_size: 8,
			mode: RenderMode::default(),
			camera: CameraSettings::default(),
			scene: SceneSource::default(),
			background: None,
		}
	}
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum RenderMode {
	/// Renders a fixed number of frames into numbered PNG files
	Offline {
		#[serde(default = "default_frames")]
		frames: u32,
		#[serde(default = "default_output_dir")]
		output_dir: PathBuf,
	},
	/// Renders into a window until it's closed; screenshots go to `output_dir`
	Window {
		#[serde(default = "default_title")]
		title: String,
		#[serde(default = "default_output_dir")]
		output_dir: PathBuf,
	},
}

impl Default for RenderMode {
	fn default() -> Self {
		RenderMode::Offline {
			frames: default_frames(),
			output_dir: default_output_dir(),
		}
	}
}

fn default_frames() -> u32 {
	1
}

fn default_output_dir() -> PathBuf {
	PathBuf::from("output")
}

fn default_title() -> String {
	"Portracer".to_string()
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum SceneSource {
	Preset(ScenePreset),
	/// A RON scene description
	File(PathBuf),
}

impl Default for SceneSource {
	fn default() -> Self {
		SceneSource::Preset(ScenePreset::default())
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

impl RenderConfig {
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();

		let source = fs::read_to_string(path).with_context(|| format!("Couldn't read config {}", path.display()))?;

		Self::from_ron(&source).with_context(|| format!("Malformed config {}", path.display()))
	}

	pub fn from_ron(source: &str) -> Result<Self> {
		let config: Self = ron::from_str(source)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.width == 0 || self.height == 0 {
			bail!("Resolution must not be empty, got {}x{}", self.width, self.height);
		}
		if self.workgroup_size == 0 {
			bail!("Workgroup size must be at least 1");
		}
		if self.max_depth == 0 {
			bail!("Max depth must be at least 1");
		}
		if let RenderMode::Offline { frames: 0, .. } = self.mode {
			bail!("Offline mode needs at least one frame");
		}
		Ok(())
	}

	pub fn aspect(&self) -> f32 {
		self.width as f32 / self.height as f32
	}

	/// Builds the configured scene. Scene files are resolved from the working
	/// directory.
	pub fn build_scene(&self) -> Result<Scene> {
		let scene = match &self.scene {
			SceneSource::Preset(preset) => preset.build(self.background),
			SceneSource::File(path) => {
				let mut scene = load_scene(path)?;
				if let Some(background) = self.background {
					scene.background = background;
				}
				scene
			}
		};

		Ok(scene)
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[cfg(test)]
mod tests {
	use glam::vec3;

	use super::*;
	use crate::core::camera::CameraAnimation;

	#[test]
	fn empty_config_is_all_defaults() {
		let config = RenderConfig::from_ron("()").unwrap();

		assert_eq!(config, RenderConfig::default());
		assert_eq!((config.width, config.height), (640, 480));
		assert_eq!(
			config.mode,
			RenderMode::Offline {
				frames: 1,
				output_dir: PathBuf::from("output")
			}
		);
		assert_eq!(config.scene, SceneSource::Preset(ScenePreset::Showcase));
	}

	#[test]
	fn full_config() {
		let config = RenderConfig::from_ron(
			r#"(
				width: 320,
				height: 240,
				samples_per_pixel: 4,
				mode: Offline(frames: 60, output_dir: "frames"),
				camera: (fovy: 50.0, animation: FlyThrough),
				scene: Preset(Triangles),
				background: Some((0.0, 0.0, 0.0)),
			)"#,
		)
		.unwrap();

		assert_eq!(config.samples_per_pixel, 4);
		assert_eq!(config.max_depth, 8);
		assert_eq!(
			config.mode,
			RenderMode::Offline {
				frames: 60,
				output_dir: PathBuf::from("frames")
			}
		);
		assert_eq!(config.camera.animation, CameraAnimation::FlyThrough);
		assert_eq!(config.camera.fovy, 50.0);
		assert_eq!(config.camera.origin, vec3(0.0, 0.0, 0.01));

		let scene = config.build_scene().unwrap();
		assert_eq!(scene.background, Vec3::ZERO);
		assert_eq!(scene.triangles.len(), 2);
	}

	#[test]
	fn window_mode_defaults() {
		let config = RenderConfig::from_ron("(mode: Window())").unwrap();

		assert_eq!(
			config.mode,
			RenderMode::Window {
				title: "Portracer".to_string(),
				output_dir: PathBuf::from("output")
			}
		);
	}

	#[test]
	fn invalid_values_are_rejected() {
		assert!(RenderConfig::from_ron("(width: 0)").is_err());
		assert!(RenderConfig::from_ron("(workgroup_size: 0)").is_err());
		assert!(RenderConfig::from_ron("(mode: Offline(frames: 0))").is_err());
		assert!(RenderConfig::from_ron("(width: 20").is_err());
	}

	#[test]
	fn loads_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("portracer.ron");
		fs::write(&path, "(width: 100, height: 50)").unwrap();

		let config = RenderConfig::load(&path).unwrap();
		assert_eq!(config.aspect(), 2.0);

		assert!(RenderConfig::load(dir.path().join("missing.ron")).is_err());
	}
}
