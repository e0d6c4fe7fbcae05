use glam::{vec3, Vec3};
use serde::{Deserialize, Serialize};

use super::{
	cornell_box::CornellBox,
	cuboid::Cuboid,
	primitives::{Quad, Sphere, Triangle, Vertex},
	Scene,
};
use crate::util::color;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// Scenes built into the binary, all framed for the default camera.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ScenePreset {
	/// A Cornell box lit by a bright sphere, with two extra quads
	#[default]
	Showcase,
	/// The classic box with its two white blocks
	CornellBox,
	/// Two overlapping triangles in front of an emissive quad
	Triangles,
}

const BOX_POSITION: Vec3 = vec3(0.0, 0.0, -9.0);
const BOX_SCALE: Vec3 = Vec3::splat(6.0);

impl ScenePreset {
	/// Rays that escape these scenes return this, unless configured otherwise.
	pub fn default_background(&self) -> Vec3 {
		match self {
			ScenePreset::Showcase | ScenePreset::CornellBox => Vec3::ZERO,
			ScenePreset::Triangles => vec3(0.5, 0.7, 1.0),
		}
	}

	pub fn build(&self, background: Option<Vec3>) -> Scene {
		let mut scene = Scene::new(background.unwrap_or_else(|| self.default_background()));

		match self {
			ScenePreset::Showcase => showcase(&mut scene),
			ScenePreset::CornellBox => cornell_box(&mut scene),
			ScenePreset::Triangles => triangles(&mut scene),
		}

		scene
	}
}

fn showcase(scene: &mut Scene) {
	// A thin vertical panel on the right, and a wall behind the box
	let (width, height) = (1.0, 2.0);
	let center = vec3(2.0, 0.0, -9.0);

	scene
		.push_quad(Quad::new(
			vec3(center.x, center.y - height / 2.0, center.z + width / 2.0),
			vec3(0.0, 0.0, -width),
			vec3(0.0, height, 0.0),
			vec3(0.0, 0.2, 0.5),
			false,
		))
		.push_quad(Quad::new(
			vec3(-2.0, -2.0, -10.0),
			vec3(4.0, 0.0, 0.0),
			vec3(0.0, 4.0, 0.0),
			vec3(0.0, 0.2, 0.05),
			false,
		))
		.push_cornell_box(&CornellBox::new(BOX_POSITION, BOX_SCALE))
		.push_sphere(Sphere::new(BOX_POSITION, 0.5, vec3(20.0, 20.0, 20.0), 1.0))
		.push_sphere(Sphere::new(vec3(-1.0, 0.0, -9.0), 0.3, vec3(0.0, 0.2, 0.5), 0.0));
}

fn cornell_box(scene: &mut Scene) {
	let cornell = CornellBox::new(BOX_POSITION, BOX_SCALE);

	// Block corners in the classic measurements, mapped into the box
	let short_block = Cuboid::new(
		cornell.point(vec3(130.0, 0.0, 65.0)),
		cornell.point(vec3(295.0, 165.0, 230.0)),
		color::WHITE,
		-18.0,
		false,
	);
	let tall_block = Cuboid::new(
		cornell.point(vec3(265.0, 0.0, 295.0)),
		cornell.point(vec3(430.0, 330.0, 460.0)),
		color::WHITE,
		15.0,
		false,
	);

	scene
		.push_cornell_box(&cornell)
		.push_cuboid(&short_block)
		.push_cuboid(&tall_block);
}

fn triangles(scene: &mut Scene) {
	let vertex = |x: f32, y: f32, z: f32, u: f32, v: f32| Vertex::new(vec3(x, y, z), -Vec3::Z, u, v);

	scene
		.push_triangle(Triangle::new(
			vertex(0.0, 1.0, -9.0, 0.0, 1.0),
			vertex(-3.0, -1.0, -9.0, 1.0, 0.0),
			vertex(3.0, -1.0, -9.0, 1.0, 1.0),
			vec3(0.0, 0.0, 1.0),
			false,
		))
		.push_triangle(Triangle::new(
			vertex(2.0, 1.0, -10.0, 0.0, 1.0),
			vertex(-3.0, -1.0, -10.0, 1.0, 0.0),
			vertex(3.0, -1.0, -10.0, 1.0, 1.0),
			vec3(0.0, 1.0, 0.0),
			false,
		))
		.push_quad(Quad::new(
			vec3(0.0, 0.0, -10.0),
			Vec3::X,
			Vec3::Y,
			vec3(1.0, 0.0, 0.0),
			true,
		));
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn showcase_contents() {
		let scene = ScenePreset::Showcase.build(None);

		assert_eq!(scene.quads.len(), 2 + 6);
		assert_eq!(scene.spheres.len(), 2);
		assert!(scene.triangles.is_empty());
		assert_eq!(scene.background, Vec3::ZERO);

		assert_eq!(scene.quads[0].corner, vec3(2.0, -1.0, -8.5));
		assert_eq!(scene.spheres[0].emissive, 1.0);
		assert_eq!(scene.spheres[1].emissive, 0.0);
	}

	#[test]
	fn cornell_blocks_sit_on_the_floor() {
		let scene = ScenePreset::CornellBox.build(None);
		assert_eq!(scene.quads.len(), 6 + 6 + 6);

		let floor_y = BOX_POSITION.y - BOX_SCALE.y / 2.0;

		// Bottom faces of both blocks
		for bottom in [&scene.quads[11], &scene.quads[17]] {
			assert!((bottom.corner.y - floor_y).abs() < 1e-4);
		}

		// Everything stays inside the box
		let min = BOX_POSITION - BOX_SCALE / 2.0 - 1e-3;
		let max = BOX_POSITION + BOX_SCALE / 2.0 + 1e-3;
		for quad in &scene.quads {
			assert!(quad.corner.cmpge(min).all() && quad.corner.cmple(max).all());
		}
	}

	#[test]
	fn triangles_and_background() {
		let scene = ScenePreset::Triangles.build(None);

		assert_eq!(scene.triangles.len(), 2);
		assert_eq!(scene.quads.len(), 1);
		assert!(scene.quads[0].emissive);
		assert_eq!(scene.background, vec3(0.5, 0.7, 1.0));

		// Pure primaries
		assert_eq!(scene.triangles[0].color, vec3(0.0, 0.0, 1.0));
		assert_eq!(scene.triangles[1].color, vec3(0.0, 1.0, 0.0));
		assert_eq!(scene.quads[0].color, vec3(1.0, 0.0, 0.0));

		let overridden = ScenePreset::Triangles.build(Some(Vec3::ZERO));
		assert_eq!(overridden.background, Vec3::ZERO);
	}
}
