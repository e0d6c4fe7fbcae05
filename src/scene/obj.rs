use std::{
	fs::File,
	io::{BufRead, BufReader},
	path::Path,
};

use glam::{Vec2, Vec3};

use super::primitives::Vertex;
use crate::error::SceneError;

/// Normal given to vertices that don't specify one
const DEFAULT_NORMAL: Vec3 = Vec3::Z;

/// One `v/vt/vn` corner of a face. Indices are as written in the file, 1-based
/// or negative (relative to the end), 0 when missing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Corner {
	position: i64,
	texcoord: i64,
	normal: i64,
}

impl Corner {
	fn parse(token: &str) -> Self {
		let mut parts = token.split('/').map(|s| s.parse::<i64>().unwrap_or(0));

		Self {
			position: parts.next().unwrap_or(0),
			texcoord: parts.next().unwrap_or(0),
			normal: parts.next().unwrap_or(0),
		}
	}
}

/// Resolves an OBJ index into a 0-based one, if it's in range.
fn resolve(index: i64, len: usize) -> Option<usize> {
	let resolved = match index {
		i if i > 0 => i - 1,
		i if i < 0 => len as i64 + i,
		_ => return None,
	};

	usize::try_from(resolved).ok().filter(|&i| i < len)
}

fn parse_floats<const N: usize>(tokens: std::str::SplitWhitespace) -> [f32; N] {
	let mut values = [0.0; N];
	for (value, token) in values.iter_mut().zip(tokens) {
		*value = token.parse().unwrap_or(0.0);
	}
	values
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// Reads all faces of an OBJ file as a flat list of vertices, three per
/// triangle. Polygons with more than three corners are split into a fan.
/// Anything but `v`, `vt`, `vn` and `f` is ignored, materials included.
pub fn load_vertices(path: &Path) -> Result<Vec<Vertex>, SceneError> {
	let file = File::open(path).map_err(|source| SceneError::Io {
		path: path.to_owned(),
		source,
	})?;

	let mut positions: Vec<Vec3> = Vec::new();
	let mut texcoords: Vec<Vec2> = Vec::new();
	let mut normals: Vec<Vec3> = Vec::new();
	let mut vertices = Vec::new();

	for (line_index, line) in BufReader::new(file).lines().enumerate() {
		let line = line.map_err(|source| SceneError::Io {
			path: path.to_owned(),
			source,
		})?;

		let malformed = |message: String| SceneError::Obj {
			path: path.to_owned(),
			line: line_index + 1,
			message,
		};

		let mut tokens = line.split_whitespace();

		match tokens.next() {
			Some("v") => positions.push(Vec3::from_array(parse_floats(tokens))),
			Some("vt") => texcoords.push(Vec2::from_array(parse_floats(tokens))),
			Some("vn") => normals.push(Vec3::from_array(parse_floats(tokens))),

			Some("f") => {
				let corners = tokens.map(Corner::parse).collect::<Vec<_>>();
				if corners.len() < 3 {
					return Err(malformed(format!("face has {} corners", corners.len())));
				}

				let mut face = Vec::with_capacity(corners.len());
				for corner in corners {
					let point = resolve(corner.position, positions.len())
						.map(|i| positions[i])
						.ok_or_else(|| malformed(format!("position index {} out of range", corner.position)))?;

					let normal = match corner.normal {
						0 => DEFAULT_NORMAL,
						n => resolve(n, normals.len())
							.map(|i| normals[i])
							.ok_or_else(|| malformed(format!("normal index {} out of range", n)))?,
					};

					let uv = match corner.texcoord {
						0 => Vec2::ZERO,
						t => resolve(t, texcoords.len())
							.map(|i| texcoords[i])
							.ok_or_else(|| malformed(format!("texcoord index {} out of range", t)))?,
					};

					face.push(Vertex::new(point, normal, uv.x, uv.y));
				}

				for i in 1..face.len() - 1 {
					vertices.extend([face[0], face[i], face[i + 1]]);
				}
			}

			_ => {}
		}
	}

	Ok(vertices)
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

	fn obj_file(contents: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
		file.write_all(contents.as_bytes()).unwrap();
		file
	}

	#[test]
	fn missing_attributes_get_defaults() {
		let file = obj_file("v 0 1 -9\nv -3 -1 -9\nv 3 -1 -9\nf 1 2 3\n");
		let vertices = load_vertices(file.path()).unwrap();

		assert_eq!(vertices.len(), 3);
		assert_eq!(vertices[1].point, vec3(-3.0, -1.0, -9.0));
		for vertex in &vertices {
			assert_eq!(vertex.normal, Vec3::Z);
			assert_eq!((vertex.u, vertex.v), (0.0, 0.0));
		}
	}

	#[test]
	fn texcoords_are_read() {
		let file = obj_file("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.25\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n");
		let vertices = load_vertices(file.path()).unwrap();

		assert_eq!((vertices[0].u, vertices[0].v), (0.5, 0.25));
		assert_eq!((vertices[2].u, vertices[2].v), (0.0, 1.0));
	}

	#[test]
	fn polygons_become_fans() {
		let file = obj_file(
			"# quad\nmtllib box.mtl\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nusemtl white\nf -4//1 -3//1 -2//1 -1//1\n",
		);
		let vertices = load_vertices(file.path()).unwrap();

		let points = vertices.iter().map(|v| v.point).collect::<Vec<_>>();
		assert_eq!(
			points,
			vec![
				vec3(0.0, 0.0, 0.0),
				vec3(1.0, 0.0, 0.0),
				vec3(1.0, 1.0, 0.0),
				vec3(0.0, 0.0, 0.0),
				vec3(1.0, 1.0, 0.0),
				vec3(0.0, 1.0, 0.0),
			]
		);
	}

	#[test]
	fn bad_faces_report_their_line() {
		let file = obj_file("v 0 0 0\nv 1 0 0\nf 1 2\n");
		assert!(matches!(load_vertices(file.path()), Err(SceneError::Obj { line: 3, .. })));

		let file = obj_file("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 7\n");
		assert!(matches!(load_vertices(file.path()), Err(SceneError::Obj { line: 4, .. })));
	}
}
