use std::{
	fs,
	path::{Path, PathBuf},
};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{
	cornell_box::CornellBox,
	cuboid::Cuboid,
	primitives::{Quad, Sphere, Triangle, Vertex},
	Scene,
};
use crate::error::SceneError;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// A scene written out as a list of objects, loaded from a RON file.
///
/// ```ron
/// (
///     background: (0.0, 0.0, 0.0),
///     objects: [
///         CornellBox(position: (0.0, 0.0, -9.0), scale: (6.0, 6.0, 6.0)),
///         Sphere(center: (0.0, 0.0, -9.0), radius: 0.5, color: (20.0, 20.0, 20.0), emissive: 1.0),
///     ],
/// )
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SceneDescription {
	#[serde(default)]
	pub background: Vec3,
	#[serde(default)]
	pub objects: Vec<SceneObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum SceneObject {
	Quad {
		corner: Vec3,
		right: Vec3,
		up: Vec3,
		color: Vec3,
		#[serde(default)]
		emissive: bool,
	},
	Sphere {
		center: Vec3,
		radius: f32,
		color: Vec3,
		#[serde(default)]
		emissive: f32,
	},
	Triangle {
		vertices: [Vertex; 3],
		color: Vec3,
		#[serde(default)]
		emissive: bool,
	},
	Cuboid {
		a: Vec3,
		b: Vec3,
		color: Vec3,
		#[serde(default)]
		rotation_y: f32,
		#[serde(default)]
		emissive: bool,
	},
	CornellBox {
		position: Vec3,
		scale: Vec3,
	},
	/// Relative paths are resolved from the directory of the description file
	Obj {
		path: PathBuf,
		color: Vec3,
		#[serde(default)]
		translation: Vec3,
		#[serde(default)]
		emissive: bool,
	},
}

impl SceneDescription {
	pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
		let path = path.as_ref();

		let source = fs::read_to_string(path).map_err(|source| SceneError::Io {
			path: path.to_owned(),
			source,
		})?;

		Self::from_str(&source, path)
	}

	/// Parses a description; `origin` is only used to report errors.
	pub fn from_str(source: &str, origin: impl AsRef<Path>) -> Result<Self, SceneError> {
		ron::from_str(source).map_err(|source| SceneError::Parse {
			path: origin.as_ref().to_owned(),
			source,
		})
	}

	/// Builds the scene, loading OBJ files relative to `base_dir`.
	pub fn build(&self, base_dir: impl AsRef<Path>) -> Result<Scene, SceneError> {
		let base_dir = base_dir.as_ref();
		let mut scene = Scene::new(self.background);

		for object in &self.objects {
			match object {
				&SceneObject::Quad {
					corner,
					right,
					up,
					color,
					emissive,
				} => {
					scene.push_quad(Quad::new(corner, right, up, color, emissive));
				}
				&SceneObject::Sphere {
					center,
					radius,
					color,
					emissive,
				} => {
					scene.push_sphere(Sphere::new(center, radius, color, emissive));
				}
				&SceneObject::Triangle {
					vertices: [v0, v1, v2],
					color,
					emissive,
				} => {
					scene.push_triangle(Triangle::new(v0, v1, v2, color, emissive));
				}
				&SceneObject::Cuboid {
					a,
					b,
					color,
					rotation_y,
					emissive,
				} => {
					scene.push_cuboid(&Cuboid::new(a, b, color, rotation_y, emissive));
				}
				&SceneObject::CornellBox { position, scale } => {
					scene.push_cornell_box(&CornellBox::new(position, scale));
				}
				SceneObject::Obj {
					path,
					color,
					translation,
					emissive,
				} => {
					scene.load_obj(base_dir.join(path), *color, *translation, *emissive)?;
				}
			}
		}

		Ok(scene)
	}
}

/// Loads and builds the scene described in the file at `path`.
pub fn load_scene(path: impl AsRef<Path>) -> Result<Scene, SceneError> {
	let path = path.as_ref();
	let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

	SceneDescription::load(path)?.build(base_dir)
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

	#[test]
	fn parses_every_object_kind() {
		let description = SceneDescription::from_str(
			r#"(
				background: (0.5, 0.7, 1.0),
				objects: [
					Quad(corner: (-2.0, -2.0, -10.0), right: (4.0, 0.0, 0.0), up: (0.0, 4.0, 0.0), color: (1.0, 1.0, 1.0)),
					Sphere(center: (0.0, 0.0, -9.0), radius: 0.5, color: (20.0, 20.0, 20.0), emissive: 1.0),
					Triangle(
						vertices: [
							(point: (0.0, 1.0, -9.0), normal: (0.0, 0.0, 1.0)),
							(point: (-1.0, 0.0, -9.0), normal: (0.0, 0.0, 1.0)),
							(point: (1.0, 0.0, -9.0), normal: (0.0, 0.0, 1.0)),
						],
						color: (0.65, 0.05, 0.05),
					),
					Cuboid(a: (0.0, 0.0, 0.0), b: (1.0, 1.0, 1.0), color: (0.73, 0.73, 0.73), rotation_y: 15.0),
					CornellBox(position: (0.0, 0.0, -9.0), scale: (6.0, 6.0, 6.0)),
				],
			)"#,
			"inline.ron",
		)
		.unwrap();

		assert_eq!(description.background, vec3(0.5, 0.7, 1.0));
		assert_eq!(description.objects.len(), 5);

		let scene = description.build(".").unwrap();
		assert_eq!(scene.quads.len(), 1 + 6 + 6);
		assert_eq!(scene.spheres.len(), 1);
		assert_eq!(scene.triangles.len(), 1);
		assert_eq!(scene.spheres[0].emissive, 1.0);
		assert!(!scene.quads[0].emissive);
	}

	#[test]
	fn empty_description_is_an_empty_scene() {
		let scene = SceneDescription::from_str("()", "empty.ron").unwrap().build(".").unwrap();

		assert!(scene.is_empty());
		assert_eq!(scene.background, Vec3::ZERO);
	}

	#[test]
	fn malformed_description_reports_its_file() {
		let result = SceneDescription::from_str("(objects: [Teapot()])", "broken.ron");

		match result {
			Err(SceneError::Parse { path, .. }) => assert_eq!(path, PathBuf::from("broken.ron")),
			other => panic!("expected a parse error, got {other:?}"),
		}
	}

	#[test]
	fn obj_paths_are_relative_to_the_description() {
		let dir = tempfile::tempdir().unwrap();

		let mut obj = fs::File::create(dir.path().join("tri.obj")).unwrap();
		writeln!(obj, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3").unwrap();

		let description_path = dir.path().join("scene.ron");
		fs::write(
			&description_path,
			r#"(objects: [Obj(path: "tri.obj", color: (1.0, 1.0, 1.0), translation: (0.0, 0.0, -3.0))])"#,
		)
		.unwrap();

		let scene = load_scene(&description_path).unwrap();

		assert_eq!(scene.triangles.len(), 1);
		assert_eq!(scene.triangles[0].vertices[0].point, vec3(0.0, 0.0, -3.0));
	}

	#[test]
	fn missing_file_is_an_io_error() {
		assert!(matches!(load_scene("nowhere/scene.ron"), Err(SceneError::Io { .. })));
	}
}
