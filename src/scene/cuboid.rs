use glam::Vec3;

use super::primitives::Quad;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// An axis-aligned box made of six quads, optionally rotated around its
/// vertical axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Cuboid {
	pub min: Vec3,
	pub max: Vec3,
	pub center: Vec3,
	pub rotation_y: f32,
	pub color: Vec3,
	pub emissive: bool,
	quads: Vec<Quad>,
}

impl Cuboid {
	/// `a` and `b` are two opposite corners, in any order.
	pub fn new(a: Vec3, b: Vec3, color: Vec3, rotation_y: f32, emissive: bool) -> Self {
		let min = a.min(b);
		let max = a.max(b);
		let center = (min + max) / 2.0;

		let dx = Vec3::new(max.x - min.x, 0.0, 0.0);
		let dy = Vec3::new(0.0, max.y - min.y, 0.0);
		let dz = Vec3::new(0.0, 0.0, max.z - min.z);

		let faces = [
			// Front
			(Vec3::new(min.x, min.y, max.z), dx, dy),
			// Right
			(Vec3::new(max.x, min.y, max.z), -dz, dy),
			// Back
			(Vec3::new(max.x, min.y, min.z), -dx, dy),
			// Left
			(Vec3::new(min.x, min.y, min.z), dz, dy),
			// Top
			(Vec3::new(min.x, max.y, max.z), dx, -dz),
			// Bottom
			(Vec3::new(min.x, min.y, min.z), dx, dz),
		];

		let quads = faces
			.into_iter()
			.map(|(corner, right, up)| {
				let quad = Quad::new(corner, right, up, color, emissive);
				if rotation_y != 0.0 {
					quad.rotate_y(center, rotation_y)
				} else {
					quad
				}
			})
			.collect();

		Self {
			min,
			max,
			center,
			rotation_y,
			color,
			emissive,
			quads,
		}
	}

	pub fn push_quads(&self, quads: &mut Vec<Quad>) {
		quads.extend_from_slice(&self.quads);
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
	fn corners_are_sorted() {
		let cuboid = Cuboid::new(vec3(1.0, -1.0, 2.0), vec3(-1.0, 1.0, 0.0), Vec3::ONE, 0.0, false);

		assert_eq!(cuboid.min, vec3(-1.0, -1.0, 0.0));
		assert_eq!(cuboid.max, vec3(1.0, 1.0, 2.0));
		assert_eq!(cuboid.center, vec3(0.0, 0.0, 1.0));
	}

	#[test]
	fn emits_six_faces_on_the_boundary() {
		let cuboid = Cuboid::new(Vec3::ZERO, vec3(2.0, 3.0, 4.0), Vec3::ONE, 0.0, false);
		let mut quads = Vec::new();
		cuboid.push_quads(&mut quads);

		assert_eq!(quads.len(), 6);

		// Every face plane goes through either the min or the max corner
		for quad in &quads {
			let on_min = (quad.normal.dot(cuboid.min) - quad.d).abs() < 1e-5;
			let on_max = (quad.normal.dot(cuboid.max) - quad.d).abs() < 1e-5;
			assert!(on_min || on_max, "{quad:?} is not on the box boundary");
		}
	}

	#[test]
	fn rotation_keeps_center() {
		let straight = Cuboid::new(Vec3::ZERO, Vec3::ONE, Vec3::ONE, 0.0, false);
		let rotated = Cuboid::new(Vec3::ZERO, Vec3::ONE, Vec3::ONE, 45.0, false);

		let centroid = |quads: &[Quad]| {
			quads
				.iter()
				.map(|q| q.corner + (q.right + q.up) / 2.0)
				.sum::<Vec3>()
				/ quads.len() as f32
		};

		assert!((centroid(&straight.quads) - centroid(&rotated.quads)).length() < 1e-5);
		assert_ne!(straight.quads[0], rotated.quads[0]);
	}
}
