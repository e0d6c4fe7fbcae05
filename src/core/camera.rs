use anyhow::Result;
use bevy_ecs::{
	change_detection::DetectChangesMut,
	system::{Res, ResMut, Resource},
};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use portracer_derive::ShaderType;
use serde::{Deserialize, Serialize};
use wgpu::ShaderStages;

use super::{
	app::{App, Plugin, Stage},
	buffer::{BindGroupBundle, Declaration, UniformBuffer},
	gameloop::{Progress, Time},
	gpu::Gpu,
};
use crate::util::easing::{ease_in_quart, ease_out_cubic, lerp};

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

pub const CAMERA_GROUP: u32 = 0;
pub const CAMERA_VAR: &str = "camera";

pub struct CameraPlugin {
	pub settings: CameraSettings,
	/// Width over height of the rendered image
	pub aspect: f32,
}

impl Plugin for CameraPlugin {
	fn build(&self, app: &mut App) -> Result<()> {
		let camera = Camera::animated(&self.settings, 0.0);
		let gpu = app.world.resource::<Gpu>();

		let params = camera.params(self.aspect, 0.0, 0);
		let uniform = UniformBuffer::new(gpu, CAMERA_VAR, &params);
		let bundle = BindGroupBundle::new(gpu, "Camera", CAMERA_GROUP, ShaderStages::COMPUTE, &[&uniform]);

		app.world.insert_resource(self.settings);
		app.world.insert_resource(camera);
		app.world.insert_resource(CameraBuffer {
			uniform,
			bundle,
			aspect: self.aspect,
		});

		app.add_systems(Stage::Update, animate_camera);
		app.add_systems(Stage::PreRender, upload_camera);

		Ok(())
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// The camera uniform as the shader sees it.
#[repr(C)]
#[derive(ShaderType, Pod, Zeroable, Copy, Clone, Debug, Default, PartialEq)]
pub struct CameraParams {
	pub origin: Vec3,
	pub aspect: f32,
	/// The point the camera looks at
	pub look_at: Vec3,
	/// Vertical field of view, in degrees
	pub fovy: f32,
	pub time: f32,
	pub seed: u32,
	pub padding0: u32,
	pub padding1: u32,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CameraAnimation {
	#[default]
	Static,
	/// Accelerates into the scene while widening the field of view, then
	/// narrows it again at the very end
	FlyThrough,
}

/// The camera as configured, before any animation.
#[derive(Resource, Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CameraSettings {
	pub origin: Vec3,
	/// The point the camera looks at
	pub target: Vec3,
	pub fovy: f32,
	pub animation: CameraAnimation,
}

impl Default for CameraSettings {
	fn default() -> Self {
		Self {
			// An origin exactly at 0 makes far-away quads render wrong
			origin: Vec3::new(0.0, 0.0, 0.01),
			target: Vec3::new(0.0, 0.0, -15.0),
			fovy: 40.0,
			animation: CameraAnimation::Static,
		}
	}
}

/// The current camera, after animation.
#[derive(Resource, Copy, Clone, Debug, PartialEq)]
pub struct Camera {
	pub origin: Vec3,
	pub target: Vec3,
	pub fovy: f32,
}

#[derive(Resource)]
pub struct CameraBuffer {
	pub uniform: UniformBuffer<CameraParams>,
	pub bundle: BindGroupBundle,
	pub aspect: f32,
}

impl CameraBuffer {
	pub fn declarations() -> Vec<Declaration> {
		vec![Declaration::uniform::<CameraParams>(CAMERA_VAR)]
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

const FLY_DISTANCE: f32 = 8.0;
const FLY_ACCELERATION_END: f32 = 0.2;
const FLY_END: f32 = 0.95;
const FOVY_WIDEN_END: f32 = 0.15;
const FOVY_WIDE: f32 = 65.0;

impl Camera {
	/// The camera at animation progress `t`, from 0 to 1.
	pub fn animated(settings: &CameraSettings, t: f32) -> Self {
		match settings.animation {
			CameraAnimation::Static => Self {
				origin: settings.origin,
				target: settings.target,
				fovy: settings.fovy,
			},
			CameraAnimation::FlyThrough => {
				let distance = fly_distance(t);
				let offset = Vec3::new(0.0, 0.0, -distance);

				Self {
					origin: settings.origin + offset,
					target: settings.target + offset,
					fovy: fly_fovy(settings.fovy, t),
				}
			}
		}
	}

	pub fn params(&self, aspect: f32, time: f32, seed: u32) -> CameraParams {
		CameraParams {
			origin: self.origin,
			aspect,
			look_at: self.target,
			fovy: self.fovy,
			time,
			seed,
			..Default::default()
		}
	}
}

fn fly_distance(t: f32) -> f32 {
	// Ease in up to the first stretch, then keep going on the same curve
	let curve = |t: f32| {
		if t < FLY_ACCELERATION_END {
			ease_in_quart(t / FLY_ACCELERATION_END)
		} else {
			ease_in_quart((t - FLY_ACCELERATION_END) / (1.0 - FLY_ACCELERATION_END) + 1.0)
		}
	};

	FLY_DISTANCE * curve(t.min(FLY_END))
}

/// Widens from the configured `fovy` to 65° and back to it, rather than
/// from a fixed 40°.
fn fly_fovy(base: f32, t: f32) -> f32 {
	if t < FOVY_WIDEN_END {
		lerp(base, FOVY_WIDE, t / FOVY_WIDEN_END)
	} else if t < FLY_END {
		FOVY_WIDE
	} else {
		lerp(FOVY_WIDE, base, ease_out_cubic((t - FLY_END) / (1.0 - FLY_END)))
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

fn animate_camera(settings: Res<CameraSettings>, progress: Res<Progress>, mut camera: ResMut<Camera>) {
	// Only mark the camera as changed when it actually moved, so accumulation keeps
	// going for static cameras
	camera.set_if_neq(Camera::animated(&settings, progress.0));
}

fn upload_camera(gpu: Res<Gpu>, camera: Res<Camera>, buffer: Res<CameraBuffer>, time: Res<Time>) {
	// Fresh seed every frame so consecutive frames sample different paths
	let params = camera.params(buffer.aspect, time.elapsed.as_secs_f32(), rand::random());
	buffer.uniform.upload(&gpu, &params);
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[cfg(test)]
mod tests {
	use std::mem;

	use super::*;
	use crate::core::buffer::ShaderType;

	const EPSILON: f32 = 1e-4;

	fn fly_through() -> CameraSettings {
		CameraSettings {
			animation: CameraAnimation::FlyThrough,
			..Default::default()
		}
	}

	#[test]
	fn params_layout() {
		assert_eq!(mem::size_of::<CameraParams>(), 48);

		let definition = CameraParams::struct_definition().unwrap();
		assert!(definition.starts_with("struct CameraParams {"));
		assert!(definition.contains("\torigin: vec3<f32>,"));
		assert!(definition.contains("\tlook_at: vec3<f32>,"));
		assert!(definition.contains("\tseed: u32,"));
	}

	#[test]
	fn static_camera_never_moves() {
		let settings = CameraSettings::default();

		assert_eq!(Camera::animated(&settings, 0.0), Camera::animated(&settings, 0.7));
		assert_eq!(Camera::animated(&settings, 1.0).fovy, 40.0);
	}

	#[test]
	fn fly_through_start() {
		let camera = Camera::animated(&fly_through(), 0.0);

		assert!((camera.origin - Vec3::new(0.0, 0.0, 0.01)).length() < EPSILON);
		assert!((camera.target - Vec3::new(0.0, 0.0, -15.0)).length() < EPSILON);
		assert!((camera.fovy - 40.0).abs() < EPSILON);
	}

	#[test]
	fn fly_through_middle() {
		let camera = Camera::animated(&fly_through(), 0.5);

		// (0.3 / 0.8 + 1)^4 * 8
		let distance = 8.0 * 1.375_f32.powi(4);
		assert!((camera.origin.z - (0.01 - distance)).abs() < EPSILON);
		assert!((camera.target.z - (-15.0 - distance)).abs() < EPSILON);
		assert!((camera.fovy - 65.0).abs() < EPSILON);
	}

	#[test]
	fn fly_through_end() {
		let settings = fly_through();
		let end = Camera::animated(&settings, 1.0);
		let stop = Camera::animated(&settings, 0.95);

		// The camera stops moving for the last stretch while the fov narrows back
		assert!((end.origin - stop.origin).length() < EPSILON);
		assert!((end.fovy - 40.0).abs() < EPSILON);
		assert!((stop.fovy - 65.0).abs() < EPSILON);
	}

	#[test]
	fn fly_through_keeps_the_configured_fovy() {
		let settings = CameraSettings {
			fovy: 30.0,
			..fly_through()
		};

		assert!((Camera::animated(&settings, 0.0).fovy - 30.0).abs() < EPSILON);
		assert!((Camera::animated(&settings, 0.5).fovy - 65.0).abs() < EPSILON);
		assert!((Camera::animated(&settings, 1.0).fovy - 30.0).abs() < EPSILON);
	}

	#[test]
	fn fly_through_is_continuous() {
		let settings = fly_through();
		let before = Camera::animated(&settings, 0.2 - 1e-4);
		let after = Camera::animated(&settings, 0.2 + 1e-4);

		assert!((before.origin - after.origin).length() < 0.05);
	}
}
