use std::{marker::PhantomData, mem, num::NonZeroU32};

use hashlink::LinkedHashSet;
use log::debug;
use wgpu::{
	util::{BufferInitDescriptor, DeviceExt},
	BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
	BindingResource, BindingType, Buffer, BufferBindingType, BufferDescriptor, BufferUsages, ShaderStages,
};

use super::gpu::Gpu;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// A host type with a WGSL counterpart.
pub trait ShaderType {
	fn type_name() -> String;
	fn struct_definition() -> Option<String> {
		None
	}
}

#[rustfmt::skip] impl ShaderType for i32        {fn type_name() -> String {"i32".to_string()}}
#[rustfmt::skip] impl ShaderType for u32        {fn type_name() -> String {"u32".to_string()}}
#[rustfmt::skip] impl ShaderType for f32        {fn type_name() -> String {"f32".to_string()}}
#[rustfmt::skip] impl ShaderType for glam::Vec2  {fn type_name() -> String {"vec2<f32>".to_string()}}
#[rustfmt::skip] impl ShaderType for glam::Vec3  {fn type_name() -> String {"vec3<f32>".to_string()}}
#[rustfmt::skip] impl ShaderType for glam::Vec4  {fn type_name() -> String {"vec4<f32>".to_string()}}
#[rustfmt::skip] impl ShaderType for glam::UVec2 {fn type_name() -> String {"vec2<u32>".to_string()}}
#[rustfmt::skip] impl ShaderType for glam::UVec4 {fn type_name() -> String {"vec4<u32>".to_string()}}
#[rustfmt::skip] impl ShaderType for glam::Mat4  {fn type_name() -> String {"mat4x4<f32>".to_string()}}

#[rustfmt::skip] impl<E: ShaderType, const N: usize> ShaderType for [E; N] {fn type_name() -> String {format!("array<{},{}>", E::type_name(), N)}}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// A [`BindGroupLayoutEntry`] without its binding index and visibility, which
/// are only known once the resource is placed in a bind group.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PartialLayoutEntry {
	pub ty: BindingType,
	pub count: Option<NonZeroU32>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclarationKind {
	Uniform,
	Storage { read_only: bool },
	StorageTexture { format: &'static str, access: &'static str },
}

/// How a resource shows up in WGSL: its variable, its type and the struct
/// definition the type needs, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
	pub var_name: String,
	pub kind: DeclarationKind,
	pub type_name: String,
	pub struct_definition: Option<String>,
}

impl Declaration {
	pub fn uniform<T: ShaderType>(var_name: impl Into<String>) -> Self {
		Self {
			var_name: var_name.into(),
			kind: DeclarationKind::Uniform,
			type_name: T::type_name(),
			struct_definition: T::struct_definition(),
		}
	}

	/// A runtime-sized `array<T>`
	pub fn storage<T: ShaderType>(var_name: impl Into<String>, read_only: bool) -> Self {
		Self {
			var_name: var_name.into(),
			kind: DeclarationKind::Storage { read_only },
			type_name: format!("array<{}>", T::type_name()),
			struct_definition: T::struct_definition(),
		}
	}

	pub fn source_code(&self, group: u32, binding: u32) -> String {
		match self.kind {
			DeclarationKind::Uniform => format!(
				"@group({}) @binding({}) var<uniform> {}: {};",
				group, binding, self.var_name, self.type_name
			),
			DeclarationKind::Storage { read_only } => format!(
				"@group({}) @binding({}) var<storage, {}> {}: {};",
				group,
				binding,
				if read_only { "read" } else { "read_write" },
				self.var_name,
				self.type_name
			),
			DeclarationKind::StorageTexture { format, access } => format!(
				"@group({}) @binding({}) var {}: texture_storage_2d<{}, {}>;",
				group, binding, self.var_name, format, access
			),
		}
	}
}

/// Anything that can be bound to a shader and knows how to declare itself in
/// WGSL.
pub trait ShaderBufferResource: Send + Sync {
	fn declaration(&self) -> &Declaration;
	fn layout(&self) -> PartialLayoutEntry;
	fn binding_resource(&self) -> BindingResource;
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[derive(Debug)]
pub struct UniformBuffer<T>
where
	T: ShaderType + bytemuck::Pod,
{
	pub buffer: Buffer,
	pub declaration: Declaration,
	_marker: PhantomData<fn() -> T>,
}

impl<T> UniformBuffer<T>
where
	T: ShaderType + bytemuck::Pod,
{
	pub fn new(gpu: &Gpu, var_name: impl Into<String>, data: &T) -> Self {
		let declaration = Declaration::uniform::<T>(var_name);

		// In wgpu, uniforms need to be explicitly created as buffers
		let buffer = gpu.device.create_buffer_init(&BufferInitDescriptor {
			label: Some(&format!("UniformBuffer<{}> '{}'", declaration.type_name, declaration.var_name)),
			contents: bytemuck::bytes_of(data),
			usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
		});

		debug!(
			"Created uniform buffer '{}' ({} bytes)",
			declaration.var_name,
			mem::size_of::<T>()
		);

		Self {
			buffer,
			declaration,
			_marker: PhantomData,
		}
	}

	pub fn upload(&self, gpu: &Gpu, data: &T) {
		gpu.queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(data));
	}
}

impl<T> ShaderBufferResource for UniformBuffer<T>
where
	T: ShaderType + bytemuck::Pod,
{
	fn declaration(&self) -> &Declaration {
		&self.declaration
	}

	fn layout(&self) -> PartialLayoutEntry {
		PartialLayoutEntry {
			ty: BindingType::Buffer {
				ty: BufferBindingType::Uniform,
				has_dynamic_offset: false,
				min_binding_size: None,
			},
			count: None,
		}
	}

	fn binding_resource(&self) -> BindingResource {
		self.buffer.as_entire_binding()
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// A runtime-sized `array<T>` in storage memory.
#[derive(Debug)]
pub struct StorageBuffer<T>
where
	T: ShaderType + bytemuck::Pod,
{
	pub buffer: Buffer,
	pub declaration: Declaration,
	pub read_only: bool,
	_marker: PhantomData<fn() -> T>,
}

impl<T> StorageBuffer<T>
where
	T: ShaderType + bytemuck::Pod,
{
	pub fn from_slice(gpu: &Gpu, var_name: impl Into<String>, read_only: bool, data: &[T]) -> Self {
		let declaration = Declaration::storage::<T>(var_name, read_only);

		// Zero-sized bindings are invalid, so an empty list is uploaded as one zeroed
		// element
		let padding = [T::zeroed()];
		let contents = if data.is_empty() { &padding[..] } else { data };

		let buffer = gpu.device.create_buffer_init(&BufferInitDescriptor {
			label: Some(&format!("StorageBuffer<{}> '{}'", declaration.type_name, declaration.var_name)),
			contents: bytemuck::cast_slice(contents),
			usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
		});

		debug!(
			"Created storage buffer '{}' with {} elements ({} bytes)",
			declaration.var_name,
			data.len(),
			mem::size_of_val(contents)
		);

		Self {
			buffer,
			declaration,
			read_only,
			_marker: PhantomData,
		}
	}

	/// Creates a buffer of `len` elements, zeroed by wgpu.
	pub fn zeroed(gpu: &Gpu, var_name: impl Into<String>, read_only: bool, len: usize) -> Self {
		let declaration = Declaration::storage::<T>(var_name, read_only);
		let size = (mem::size_of::<T>() * len.max(1)) as u64;

		let buffer = gpu.device.create_buffer(&BufferDescriptor {
			label: Some(&format!("StorageBuffer<{}> '{}'", declaration.type_name, declaration.var_name)),
			size,
			usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
			mapped_at_creation: false,
		});

		debug!("Created storage buffer '{}' ({} bytes)", declaration.var_name, size);

		Self {
			buffer,
			declaration,
			read_only,
			_marker: PhantomData,
		}
	}
}

impl<T> ShaderBufferResource for StorageBuffer<T>
where
	T: ShaderType + bytemuck::Pod,
{
	fn declaration(&self) -> &Declaration {
		&self.declaration
	}

	fn layout(&self) -> PartialLayoutEntry {
		PartialLayoutEntry {
			ty: BindingType::Buffer {
				ty: BufferBindingType::Storage {
					read_only: self.read_only,
				},
				has_dynamic_offset: false,
				min_binding_size: None,
			},
			count: None,
		}
	}

	fn binding_resource(&self) -> BindingResource {
		self.buffer.as_entire_binding()
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// A bind group together with its layout and the WGSL that declares it.
#[derive(Debug)]
pub struct BindGroupBundle {
	pub group: u32,
	pub layout: BindGroupLayout,
	pub bind_group: BindGroup,
	pub source: String,
}

impl BindGroupBundle {
	/// Binds `resources` in order, starting at binding 0.
	pub fn new(
		gpu: &Gpu,
		label: &str,
		group: u32,
		visibility: ShaderStages,
		resources: &[&dyn ShaderBufferResource],
	) -> Self {
		let layout_entries = resources
			.iter()
			.enumerate()
			.map(|(binding, resource)| {
				let partial = resource.layout();
				BindGroupLayoutEntry {
					binding: binding as u32,
					visibility,
					ty: partial.ty,
					count: partial.count,
				}
			})
			.collect::<Vec<_>>();

		let layout = gpu.device.create_bind_group_layout(&BindGroupLayoutDescriptor {
			label: Some(&format!("{label} Bind Group Layout")),
			entries: &layout_entries,
		});

		let entries = resources
			.iter()
			.enumerate()
			.map(|(binding, resource)| BindGroupEntry {
				binding: binding as u32,
				resource: resource.binding_resource(),
			})
			.collect::<Vec<_>>();

		let bind_group = gpu.device.create_bind_group(&BindGroupDescriptor {
			label: Some(&format!("{label} Bind Group")),
			layout: &layout,
			entries: &entries,
		});

		debug!("Created bind group '{}' at group {} with {} bindings", label, group, resources.len());

		let declarations = resources.iter().map(|resource| resource.declaration()).collect::<Vec<_>>();

		Self {
			group,
			layout,
			bind_group,
			source: Self::source_code(group, &declarations),
		}
	}

	/// The WGSL for `declarations` bound at `group`, preceded by the struct
	/// definitions they need. A struct shared by several bindings is only
	/// defined once.
	pub fn source_code(group: u32, declarations: &[&Declaration]) -> String {
		let definitions = declarations
			.iter()
			.filter_map(|declaration| declaration.struct_definition.as_deref())
			.collect::<LinkedHashSet<_>>();

		let mut source = String::new();
		for definition in definitions {
			source.push_str(definition);
			source.push('\n');
		}
		for (binding, declaration) in declarations.iter().enumerate() {
			source.push_str(&declaration.source_code(group, binding as u32));
			source.push('\n');
		}
		source
	}
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
	fn scalar_and_array_names() {
		assert_eq!(f32::type_name(), "f32");
		assert_eq!(glam::Vec4::type_name(), "vec4<f32>");
		assert_eq!(<[u32; 4]>::type_name(), "array<u32,4>");
		assert_eq!(<[glam::Vec3; 2]>::type_name(), "array<vec3<f32>,2>");
		assert_eq!(u32::struct_definition(), None);
	}

	#[test]
	fn declarations() {
		assert_eq!(
			Declaration::uniform::<f32>("time").source_code(0, 3),
			"@group(0) @binding(3) var<uniform> time: f32;"
		);
		assert_eq!(
			Declaration::storage::<glam::Vec4>("accumulation", false).source_code(2, 1),
			"@group(2) @binding(1) var<storage, read_write> accumulation: array<vec4<f32>>;"
		);
		assert_eq!(
			Declaration::storage::<u32>("ids", true).source_code(1, 0),
			"@group(1) @binding(0) var<storage, read> ids: array<u32>;"
		);
	}

	#[test]
	fn bundle_source_deduplicates_structs() {
		let foo = Some("struct Foo {\n\tx: f32,\n}\n".to_string());
		let a = Declaration {
			struct_definition: foo.clone(),
			type_name: "array<Foo>".to_string(),
			..Declaration::storage::<f32>("a", true)
		};
		let b = Declaration {
			struct_definition: foo,
			type_name: "array<Foo>".to_string(),
			..Declaration::storage::<f32>("b", true)
		};
		let c = Declaration::uniform::<u32>("c");

		let source = BindGroupBundle::source_code(2, &[&a, &b, &c]);

		assert_eq!(source.matches("struct Foo").count(), 1);
		assert!(source.find("struct Foo").unwrap() < source.find("@binding(0)").unwrap());
		assert!(source.contains("@group(2) @binding(0) var<storage, read> a: array<Foo>;"));
		assert!(source.contains("@group(2) @binding(1) var<storage, read> b: array<Foo>;"));
		assert!(source.contains("@group(2) @binding(2) var<uniform> c: u32;"));
	}
}
