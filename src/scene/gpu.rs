use anyhow::Result;
use bevy_ecs::system::Resource;
use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use log::info;
use portracer_derive::ShaderType;
use wgpu::ShaderStages;

use super::{
	primitives::{Quad, Sphere, Triangle},
	Scene,
};
use crate::core::{
	app::{App, Plugin},
	buffer::{BindGroupBundle, Declaration, StorageBuffer, UniformBuffer},
	gpu::Gpu,
};

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

pub const SCENE_GROUP: u32 = 1;

/// Uploads a scene into storage buffers, once.
pub struct ScenePlugin {
	pub scene: Scene,
}

impl Plugin for ScenePlugin {
	fn build(&self, app: &mut App) -> Result<()> {
		let gpu = app.world.resource::<Gpu>();
		let buffers = SceneBuffers::new(gpu, &self.scene);

		info!(
			"Uploaded scene: {} quads, {} spheres, {} triangles",
			self.scene.quads.len(),
			self.scene.spheres.len(),
			self.scene.triangles.len()
		);

		app.world.insert_resource(buffers);

		Ok(())
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

// The fourth component of points and directions is unused by the shader and
// always set to 1
const PAD: f32 = 1.0;

fn flag(emissive: bool) -> f32 {
	if emissive {
		1.0
	} else {
		0.0
	}
}

#[repr(C)]
#[derive(ShaderType, Pod, Zeroable, Copy, Clone, Debug, Default, PartialEq)]
pub struct GpuQuad {
	pub corner: Vec4,
	pub right: Vec4,
	pub up: Vec4,
	pub normal: Vec4,
	/// `w` in xyz, `d` in w
	pub w_d: Vec4,
	/// Emissive flag in w
	pub color: Vec4,
}

impl From<&Quad> for GpuQuad {
	fn from(quad: &Quad) -> Self {
		Self {
			corner: quad.corner.extend(PAD),
			right: quad.right.extend(PAD),
			up: quad.up.extend(PAD),
			normal: quad.normal.extend(PAD),
			w_d: quad.w.extend(quad.d),
			color: quad.color.extend(flag(quad.emissive)),
		}
	}
}

#[repr(C)]
#[derive(ShaderType, Pod, Zeroable, Copy, Clone, Debug, Default, PartialEq)]
pub struct GpuTriangle {
	pub v0: Vec4,
	pub e1: Vec4,
	pub e2: Vec4,
	pub normal: Vec4,
	pub color: Vec4,
}

impl From<&Triangle> for GpuTriangle {
	fn from(triangle: &Triangle) -> Self {
		Self {
			v0: triangle.vertices[0].point.extend(PAD),
			e1: triangle.e1.extend(PAD),
			e2: triangle.e2.extend(PAD),
			normal: triangle.face_normal.extend(PAD),
			color: triangle.color.extend(flag(triangle.emissive)),
		}
	}
}

#[repr(C)]
#[derive(ShaderType, Pod, Zeroable, Copy, Clone, Debug, Default, PartialEq)]
pub struct GpuSphere {
	pub center_radius: Vec4,
	pub color_emissive: Vec4,
}

impl From<&Sphere> for GpuSphere {
	fn from(sphere: &Sphere) -> Self {
		Self {
			center_radius: sphere.center.extend(sphere.radius),
			color_emissive: sphere.color.extend(sphere.emissive),
		}
	}
}

/// Counts of the primitive buffers, which can't be trusted to know their own
/// length since empty lists are uploaded as one zeroed record.
#[repr(C)]
#[derive(ShaderType, Pod, Zeroable, Copy, Clone, Debug, Default, PartialEq)]
pub struct SceneInfo {
	pub background: Vec3,
	pub quad_count: u32,
	pub sphere_count: u32,
	pub triangle_count: u32,
	pub padding0: u32,
	pub padding1: u32,
}

impl From<&Scene> for SceneInfo {
	fn from(scene: &Scene) -> Self {
		Self {
			background: scene.background,
			quad_count: scene.quads.len() as u32,
			sphere_count: scene.spheres.len() as u32,
			triangle_count: scene.triangles.len() as u32,
			..Default::default()
		}
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[derive(Resource)]
pub struct SceneBuffers {
	pub quads: StorageBuffer<GpuQuad>,
	pub spheres: StorageBuffer<GpuSphere>,
	pub triangles: StorageBuffer<GpuTriangle>,
	pub info: UniformBuffer<SceneInfo>,
	pub bundle: BindGroupBundle,
}

impl SceneBuffers {
	pub fn new(gpu: &Gpu, scene: &Scene) -> Self {
		let packed = PackedScene::from(scene);

		let quads = StorageBuffer::from_slice(gpu, "quads", true, &packed.quads);
		let spheres = StorageBuffer::from_slice(gpu, "spheres", true, &packed.spheres);
		let triangles = StorageBuffer::from_slice(gpu, "triangles", true, &packed.triangles);
		let info = UniformBuffer::new(gpu, "scene", &packed.info);

		let bundle = BindGroupBundle::new(
			gpu,
			"Scene",
			SCENE_GROUP,
			ShaderStages::COMPUTE,
			&[&quads, &spheres, &triangles, &info],
		);

		Self {
			quads,
			spheres,
			triangles,
			info,
			bundle,
		}
	}

	/// The declarations of the scene bind group, in binding order
	pub fn declarations() -> Vec<Declaration> {
		vec![
			Declaration::storage::<GpuQuad>("quads", true),
			Declaration::storage::<GpuSphere>("spheres", true),
			Declaration::storage::<GpuTriangle>("triangles", true),
			Declaration::uniform::<SceneInfo>("scene"),
		]
	}
}

/// A scene flattened into its GPU records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedScene {
	pub quads: Vec<GpuQuad>,
	pub spheres: Vec<GpuSphere>,
	pub triangles: Vec<GpuTriangle>,
	pub info: SceneInfo,
}

impl From<&Scene> for PackedScene {
	fn from(scene: &Scene) -> Self {
		Self {
			quads: scene.quads.iter().map(GpuQuad::from).collect(),
			spheres: scene.spheres.iter().map(GpuSphere::from).collect(),
			triangles: scene.triangles.iter().map(GpuTriangle::from).collect(),
			info: SceneInfo::from(scene),
		}
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[cfg(test)]
mod tests {
	use std::mem;

	use glam::{vec3, vec4};

	use super::*;
	use crate::{
		core::buffer::ShaderType,
		scene::primitives::Vertex,
		util::color,
	};

	#[test]
	fn record_sizes() {
		assert_eq!(mem::size_of::<GpuQuad>(), 96);
		assert_eq!(mem::size_of::<GpuTriangle>(), 80);
		assert_eq!(mem::size_of::<GpuSphere>(), 32);
		assert_eq!(mem::size_of::<SceneInfo>(), 32);
	}

	#[test]
	fn quad_packing() {
		let quad = Quad::new(
			vec3(-2.0, -2.0, -10.0),
			vec3(4.0, 0.0, 0.0),
			vec3(0.0, 4.0, 0.0),
			color::WHITE,
			true,
		);
		let packed = GpuQuad::from(&quad);

		assert_eq!(packed.corner, vec4(-2.0, -2.0, -10.0, 1.0));
		assert_eq!(packed.right.w, 1.0);
		assert_eq!(packed.normal, vec4(0.0, 0.0, 1.0, 1.0));
		assert_eq!(packed.w_d.w, quad.d);
		assert_eq!(packed.color, color::WHITE.extend(1.0));
	}

	#[test]
	fn triangle_packing() {
		let triangle = Triangle::new(
			Vertex::new(vec3(0.0, 1.0, -9.0), Vec3::Z, 0.0, 0.0),
			Vertex::new(vec3(-1.0, 0.0, -9.0), Vec3::Z, 0.0, 0.0),
			Vertex::new(vec3(1.0, 0.0, -9.0), Vec3::Z, 0.0, 0.0),
			color::RED,
			false,
		);
		let packed = GpuTriangle::from(&triangle);

		assert_eq!(packed.v0, vec4(0.0, 1.0, -9.0, 1.0));
		assert_eq!(packed.e1, vec4(-1.0, -1.0, 0.0, 1.0));
		assert_eq!(packed.e2, vec4(1.0, -1.0, 0.0, 1.0));
		assert_eq!(packed.color.w, 0.0);
	}

	#[test]
	fn sphere_keeps_its_emission_strength() {
		let sphere = Sphere::new(vec3(0.0, 0.0, -9.0), 0.5, color::LIGHT, 0.25);
		let packed = GpuSphere::from(&sphere);

		assert_eq!(packed.center_radius, vec4(0.0, 0.0, -9.0, 0.5));
		assert_eq!(packed.color_emissive.w, 0.25);
	}

	#[test]
	fn info_counts_primitives() {
		let mut scene = Scene::new(vec3(0.1, 0.2, 0.3));
		scene
			.push_sphere(Sphere::new(Vec3::ZERO, 1.0, Vec3::ONE, 0.0))
			.push_sphere(Sphere::new(Vec3::ONE, 1.0, Vec3::ONE, 0.0));

		let packed = PackedScene::from(&scene);

		assert_eq!(packed.info.background, vec3(0.1, 0.2, 0.3));
		assert_eq!(packed.info.quad_count, 0);
		assert_eq!(packed.info.sphere_count, 2);
		assert_eq!(packed.info.triangle_count, 0);
		assert!(packed.quads.is_empty());
	}

	#[test]
	fn wgsl_definitions() {
		let definition = GpuQuad::struct_definition().unwrap();
		assert!(definition.contains("\tw_d: vec4<f32>,"));

		let source = BindGroupBundle::source_code(
			SCENE_GROUP,
			&SceneBuffers::declarations().iter().collect::<Vec<_>>(),
		);
		assert!(source.contains("@group(1) @binding(0) var<storage, read> quads: array<GpuQuad>;"));
		assert!(source.contains("@group(1) @binding(3) var<uniform> scene: SceneInfo;"));
	}
}
