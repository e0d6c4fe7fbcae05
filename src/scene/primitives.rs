use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
	pub point: Vec3,
	pub normal: Vec3,
	#[serde(default)]
	pub u: f32,
	#[serde(default)]
	pub v: f32,
}

impl Vertex {
	pub fn new(point: Vec3, normal: Vec3, u: f32, v: f32) -> Self {
		Self { point, normal, u, v }
	}

	#[must_use]
	pub fn translate(self, offset: Vec3) -> Self {
		Self {
			point: self.point + offset,
			..self
		}
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
	pub vertices: [Vertex; 3],
	pub e1: Vec3,
	pub e2: Vec3,
	pub face_normal: Vec3,
	pub color: Vec3,
	pub emissive: bool,
}

impl Triangle {
	pub fn new(v0: Vertex, v1: Vertex, v2: Vertex, color: Vec3, emissive: bool) -> Self {
		let e1 = v1.point - v0.point;
		let e2 = v2.point - v0.point;

		Self {
			vertices: [v0, v1, v2],
			e1,
			e2,
			face_normal: e1.cross(e2).normalize_or_zero(),
			color,
			emissive,
		}
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// A parallelogram spanned by `right` and `up`, starting at its lower-left
/// `corner`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quad {
	pub corner: Vec3,
	pub right: Vec3,
	pub up: Vec3,
	pub normal: Vec3,
	/// `n / (n . n)` with the unnormalized normal `n`, used to get the planar
	/// coordinates of a hit point
	pub w: Vec3,
	/// Plane offset along the unit normal
	pub d: f32,
	pub color: Vec3,
	pub emissive: bool,
}

impl Quad {
	pub fn new(corner: Vec3, right: Vec3, up: Vec3, color: Vec3, emissive: bool) -> Self {
		let n = right.cross(up);
		let normal = n.normalize_or_zero();
		let n_len_sq = n.length_squared();

		Self {
			corner,
			right,
			up,
			normal,
			w: if n_len_sq > 0.0 { n / n_len_sq } else { Vec3::ZERO },
			d: normal.dot(corner),
			color,
			emissive,
		}
	}

	/// Rotates the quad around the vertical axis going through `pivot`
	#[must_use]
	pub fn rotate_y(&self, pivot: Vec3, degrees: f32) -> Self {
		let rotation = Quat::from_rotation_y(degrees.to_radians());

		Self::new(
			pivot + rotation * (self.corner - pivot),
			rotation * self.right,
			rotation * self.up,
			self.color,
			self.emissive,
		)
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sphere {
	pub center: Vec3,
	pub radius: f32,
	pub color: Vec3,
	/// Scales the color into emitted light; 0 for surfaces that only reflect
	pub emissive: f32,
}

impl Sphere {
	pub fn new(center: Vec3, radius: f32, color: Vec3, emissive: f32) -> Self {
		Self {
			center,
			radius,
			color,
			emissive,
		}
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/
