pub mod cornell_box;
pub mod cuboid;
pub mod description;
pub mod gpu;
pub mod obj;
pub mod presets;
pub mod primitives;

use std::path::Path;

use glam::Vec3;
use log::debug;

use self::{
	cornell_box::CornellBox,
	cuboid::Cuboid,
	primitives::{Quad, Sphere, Triangle},
};
use crate::error::SceneError;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// Everything the path tracer intersects, in world space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
	pub quads: Vec<Quad>,
	pub spheres: Vec<Sphere>,
	pub triangles: Vec<Triangle>,
	/// Radiance returned by rays that escape the scene
	pub background: Vec3,
}

impl Scene {
	pub fn new(background: Vec3) -> Self {
		Self {
			background,
			..Default::default()
		}
	}

	pub fn push_quad(&mut self, quad: Quad) -> &mut Self {
		self.quads.push(quad);
		self
	}

	pub fn push_sphere(&mut self, sphere: Sphere) -> &mut Self {
		self.spheres.push(sphere);
		self
	}

	pub fn push_triangle(&mut self, triangle: Triangle) -> &mut Self {
		self.triangles.push(triangle);
		self
	}

	pub fn extend_quads<I>(&mut self, quads: I) -> &mut Self
	where
		I: IntoIterator<Item = Quad>,
	{
		self.quads.extend(quads);
		self
	}

	pub fn push_cuboid(&mut self, cuboid: &Cuboid) -> &mut Self {
		cuboid.push_quads(&mut self.quads);
		self
	}

	pub fn push_cornell_box(&mut self, cornell_box: &CornellBox) -> &mut Self {
		cornell_box.push_quads(&mut self.quads);
		self
	}

	/// Loads every face of an OBJ file as a triangle of the given color, moved
	/// by `translation`. Returns the number of triangles added.
	pub fn load_obj(
		&mut self,
		path: impl AsRef<Path>,
		color: Vec3,
		translation: Vec3,
		emissive: bool,
	) -> Result<usize, SceneError> {
		let path = path.as_ref();
		let vertices = obj::load_vertices(path)?;

		let triangles = vertices.chunks_exact(3).map(|face| {
			Triangle::new(
				face[0].translate(translation),
				face[1].translate(translation),
				face[2].translate(translation),
				color,
				emissive,
			)
		});

		let before = self.triangles.len();
		self.triangles.extend(triangles);
		let added = self.triangles.len() - before;

		debug!("Loaded {} triangles from {}", added, path.display());

		Ok(added)
	}

	pub fn is_empty(&self) -> bool {
		self.quads.is_empty() && self.spheres.is_empty() && self.triangles.is_empty()
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[cfg(test)]
mod tests {
	use std::io::Write;

	use glam::vec3;

	use super::*;
	use crate::util::color;

	#[test]
	fn builders_chain() {
		let mut scene = Scene::new(Vec3::ZERO);
		assert!(scene.is_empty());

		scene
			.push_sphere(Sphere::new(vec3(0.0, 0.0, -9.0), 0.5, color::LIGHT, 1.0))
			.push_cuboid(&Cuboid::new(Vec3::ZERO, Vec3::ONE, color::WHITE, 15.0, false))
			.push_cornell_box(&CornellBox::default());

		assert_eq!(scene.spheres.len(), 1);
		assert_eq!(scene.quads.len(), 12);
		assert!(!scene.is_empty());
	}

	#[test]
	fn load_obj_translates_and_triangulates() {
		let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
		writeln!(
			file,
			"v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 -1\nf 1//1 2//1 3//1 4//1"
		)
		.unwrap();

		let mut scene = Scene::default();
		let added = scene
			.load_obj(file.path(), color::BLUE, vec3(0.0, 0.0, -5.0), false)
			.unwrap();

		assert_eq!(added, 2);
		assert_eq!(scene.triangles.len(), 2);

		for triangle in &scene.triangles {
			assert_eq!(triangle.color, color::BLUE);
			for vertex in triangle.vertices {
				assert_eq!(vertex.point.z, -5.0);
				assert_eq!(vertex.normal, vec3(0.0, 0.0, -1.0));
			}
		}
	}

	#[test]
	fn load_obj_reports_missing_file() {
		let mut scene = Scene::default();
		let result = scene.load_obj("does/not/exist.obj", Vec3::ONE, Vec3::ZERO, false);

		assert!(matches!(result, Err(SceneError::Io { .. })));
		assert!(scene.triangles.is_empty());
	}
}
