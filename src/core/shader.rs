use std::{borrow::Cow, cmp::Reverse, collections::HashSet, mem, ops::Range};

use anyhow::{anyhow, Result};
use hashlink::{LinkedHashMap, LinkedHashSet};
use log::debug;
use regex::Regex;
use rust_embed::Embed;
use typed_path::{Utf8UnixPath, Utf8UnixPathBuf};
use wgpu::{Device, ShaderModule, ShaderModuleDescriptor, ShaderSource};

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[derive(Hash, Debug, Clone, Eq, PartialEq)]
pub enum Shader {
	/// Source code given directly; includes in it resolve from the asset root
	Source(String),
	/// A file of the embedded assets
	Path(Utf8UnixPathBuf),
}

impl Shader {
	fn parent(&self) -> Utf8UnixPathBuf {
		match self {
			Shader::Source(_) => Utf8UnixPathBuf::from("/"),
			Shader::Path(path) => path
				.parent()
				.map(|parent| parent.to_owned())
				.unwrap_or_else(|| Utf8UnixPathBuf::from("/")),
		}
	}

	fn source<Assets: Embed>(&self) -> Result<String> {
		match self {
			Shader::Source(source) => Ok(source.clone()),
			Shader::Path(path) => {
				let file = Assets::get(path.as_str()).ok_or(anyhow!("Shader file not found: {}", path))?;
				String::from_utf8(file.data.into_owned()).or(Err(anyhow!("Invalid UTF8 shader file: {}", path)))
			}
		}
	}

	/// Returns the source with every `#include "path/to/file.wgsl"` replaced by
	/// the processed content of that file. Files in `blacklist` were already
	/// included somewhere and expand to nothing.
	fn process_source<Assets: Embed>(self, blacklist: &mut HashSet<Shader>) -> Result<String> {
		if blacklist.contains(&self) {
			return Ok(String::new());
		}
		blacklist.insert(self.clone());

		let parent_path = self.parent();
		let mut source = self.source::<Assets>()?;

		let re = Regex::new(r#"(?m)^#include "(.+?)"\s*$"#).unwrap();

		let includes = re
			.captures_iter(&source)
			.filter_map(|caps| Some((caps.get(1)?.as_str().to_owned(), caps.get(0)?.range())))
			.collect::<Vec<(String, Range<usize>)>>();

		let mut byte_offset: isize = 0;

		for (path_str, range) in includes {
			// Earlier replacements shifted the rest of the source
			let range = (range.start as isize + byte_offset) as usize..(range.end as isize + byte_offset) as usize;

			let path = rooted(&parent_path.join(path_str.as_str()));
			let included = Self::process_source::<Assets>(Shader::Path(path), blacklist)?;

			byte_offset += included.len() as isize - range.len() as isize;
			source.replace_range(range, &included);
		}

		Ok(source)
	}
}

impl From<String> for Shader {
	fn from(value: String) -> Self {
		Self::Source(value)
	}
}

impl From<&str> for Shader {
	fn from(value: &str) -> Self {
		Self::Source(value.to_owned())
	}
}

/// Makes a path absolute and resolves its `.` and `..` components.
fn rooted(path: &Utf8UnixPath) -> Utf8UnixPathBuf {
	Utf8UnixPath::new("/").join(path).normalize()
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// Assembles a WGSL module from sources and embedded files, resolving
/// `#include` and `#define` directives.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ShaderBuilder {
	include_directives: LinkedHashSet<Shader>,
	define_directives: LinkedHashMap<String, String>,
}

impl ShaderBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn include<S>(&mut self, shader: S) -> &mut Self
	where
		S: Into<Shader>,
	{
		self.include_directives.insert(shader.into());
		self
	}

	pub fn include_path<P>(&mut self, path: P) -> &mut Self
	where
		P: AsRef<str>,
	{
		self.include(Shader::Path(rooted(Utf8UnixPath::new(path.as_ref()))))
	}

	pub fn define<K, V>(&mut self, key: K, value: V) -> &mut Self
	where
		K: Into<String>,
		V: ToString,
	{
		self.define_directives.insert(key.into(), value.to_string());
		self
	}

	pub fn build<Assets: Embed>(&mut self, device: &Device, label: &str) -> Result<ShaderModule> {
		let source = self.build_source::<Assets>()?;

		debug!("Compiling shader '{}' ({} bytes)", label, source.len());

		Ok(device.create_shader_module(ShaderModuleDescriptor {
			label: Some(label),
			source: ShaderSource::Wgsl(Cow::Owned(source)),
		}))
	}

	pub fn build_source<Assets: Embed>(&mut self) -> Result<String> {
		let mut builder = mem::take(self);

		let mut include_blacklist = HashSet::new();
		let mut source = String::new();

		for shader in builder.include_directives.drain() {
			let included = shader.process_source::<Assets>(&mut include_blacklist)?;
			source.push_str(&included);
			source.push('\n');
		}

		// Directives given to the builder win over the ones found in the files
		let mut define_directives = Self::process_define_directives(&mut source);
		define_directives.extend(builder.define_directives.drain());

		Ok(Self::apply_define_directives(&define_directives, source))
	}

	fn process_define_directives(source: &mut String) -> LinkedHashMap<String, String> {
		let mut define_directives = LinkedHashMap::<String, String>::new();

		// Find all `#define KEY value` in the source
		let re = Regex::new(r#"(?m)^#define (\S+?) (.+?)\s*$"#).unwrap();

		let mut ranges = Vec::<Range<usize>>::new();
		for caps in re.captures_iter(source) {
			let (Some(all), Some(key), Some(value)) = (caps.get(0), caps.get(1), caps.get(2)) else {
				continue;
			};

			ranges.push(all.range());
			define_directives.insert(key.as_str().to_owned(), value.as_str().to_owned());
		}

		// Delete the directives from the source string
		let mut offset: isize = 0;
		for range in ranges {
			let range = (range.start as isize + offset) as usize..(range.end as isize + offset) as usize;
			offset -= range.len() as isize;
			source.replace_range(range, "");
		}

		define_directives
	}

	fn apply_define_directives(define_directives: &LinkedHashMap<String, String>, mut source: String) -> String {
		// Longest key first, so that a key that is a prefix of another one doesn't
		// clobber it
		let mut directives = define_directives.iter().collect::<Vec<_>>();
		directives.sort_by_key(|(key, _)| Reverse(key.len()));

		for (key, value) in directives {
			source = source.replace(key.as_str(), value);
		}
		source
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/
