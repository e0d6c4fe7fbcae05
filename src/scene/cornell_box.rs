use glam::Vec3;

use super::primitives::Quad;
use crate::util::color;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// Edge length of the classic Cornell box measurements
const CORNELL_SIZE: f32 = 555.0;

/// The classic Cornell box: five walls and an emissive ceiling lamp, with the
/// open side facing a camera that looks down -Z.
#[derive(Clone, Debug, PartialEq)]
pub struct CornellBox {
	pub position: Vec3,
	pub scale: Vec3,
	quads: Vec<Quad>,
}

impl CornellBox {
	/// The box is centered on `position` and spans `scale` along each axis.
	pub fn new(position: Vec3, scale: Vec3) -> Self {
		let point = |x: f32, y: f32, z: f32| Self::map_point(position, scale, Vec3::new(x, y, z));
		let vector = |x: f32, y: f32, z: f32| Self::map_vector(scale, Vec3::new(x, y, z));

		let quads = vec![
			// Walls. The turn around Y swaps the sides, so the wall at x = 555 is
			// the left one seen from the open side
			Quad::new(
				point(555.0, 0.0, 0.0),
				vector(0.0, 0.0, 555.0),
				vector(0.0, 555.0, 0.0),
				color::RED,
				false,
			),
			Quad::new(
				point(0.0, 0.0, 555.0),
				vector(0.0, 0.0, -555.0),
				vector(0.0, 555.0, 0.0),
				color::GREEN,
				false,
			),
			Quad::new(
				point(0.0, 555.0, 0.0),
				vector(555.0, 0.0, 0.0),
				vector(0.0, 0.0, 555.0),
				color::WHITE,
				false,
			),
			Quad::new(
				point(0.0, 0.0, 555.0),
				vector(555.0, 0.0, 0.0),
				vector(0.0, 0.0, -555.0),
				color::WHITE,
				false,
			),
			Quad::new(
				point(555.0, 0.0, 555.0),
				vector(-555.0, 0.0, 0.0),
				vector(0.0, 555.0, 0.0),
				color::WHITE,
				false,
			),
			// Light
			Quad::new(
				point(213.0, 554.0, 227.0),
				vector(130.0, 0.0, 0.0),
				vector(0.0, 0.0, 105.0),
				color::CORNELL_LIGHT,
				true,
			),
		];

		Self {
			position,
			scale,
			quads,
		}
	}

	/// Maps a point given in the classic 555-unit measurements into the box
	/// centered on `position` with extent `scale`. The classic space is turned
	/// by 180° around Y so that its back wall ends up on the far side of a
	/// camera looking down -Z.
	pub fn map_point(position: Vec3, scale: Vec3, point: Vec3) -> Vec3 {
		let local = Vec3::new(CORNELL_SIZE - point.x, point.y, CORNELL_SIZE - point.z) / CORNELL_SIZE - 0.5;
		position + local * scale
	}

	pub fn map_vector(scale: Vec3, vector: Vec3) -> Vec3 {
		Vec3::new(-vector.x, vector.y, -vector.z) / CORNELL_SIZE * scale
	}

	/// Maps a point of the classic measurements into this box
	pub fn point(&self, point: Vec3) -> Vec3 {
		Self::map_point(self.position, self.scale, point)
	}

	pub fn push_quads(&self, quads: &mut Vec<Quad>) {
		quads.extend_from_slice(&self.quads);
	}
}

impl Default for CornellBox {
	/// The box in its classic 555-unit measurements
	fn default() -> Self {
		Self::new(Vec3::splat(CORNELL_SIZE / 2.0), Vec3::splat(CORNELL_SIZE))
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

	#[test]
	fn five_walls_and_one_light() {
		let cornell = CornellBox::default();

		assert_eq!(cornell.quads.len(), 6);
		assert_eq!(cornell.quads.iter().filter(|q| q.emissive).count(), 1);

		let light = cornell.quads.last().unwrap();
		assert_eq!(light.color, color::CORNELL_LIGHT);
		assert!((light.right.length() - 130.0).abs() < 1e-3);
		assert!((light.up.length() - 105.0).abs() < 1e-3);
	}

	#[test]
	fn fits_inside_the_requested_bounds() {
		let position = vec3(0.0, 0.0, -9.0);
		let scale = Vec3::splat(6.0);
		let cornell = CornellBox::new(position, scale);

		let min = position - scale / 2.0 - 1e-4;
		let max = position + scale / 2.0 + 1e-4;

		for quad in &cornell.quads {
			for p in [quad.corner, quad.corner + quad.right, quad.corner + quad.up] {
				assert!(p.cmpge(min).all() && p.cmple(max).all(), "{p} out of bounds");
			}
		}
	}

	#[test]
	fn walls_face_a_camera_looking_down_z() {
		let cornell = CornellBox::new(vec3(0.0, 0.0, -9.0), Vec3::splat(6.0));

		// The white wall spanned by X and Y is the far one
		let back = &cornell.quads[4];
		assert!((back.corner.z - -12.0).abs() < 1e-4);

		// Red on the left (-X), green on the right (+X)
		let left = cornell.quads.iter().find(|q| q.color == color::RED).unwrap();
		let right = cornell.quads.iter().find(|q| q.color == color::GREEN).unwrap();
		assert!((left.corner.x - -3.0).abs() < 1e-4);
		assert!((right.corner.x - 3.0).abs() < 1e-4);
	}
}
