use anyhow::{anyhow, Result};
use log::debug;
use wgpu::{
	BindingResource, BindingType, Extent3d, StorageTextureAccess, Texture, TextureDescriptor, TextureDimension,
	TextureFormat, TextureUsages, TextureView, TextureViewDescriptor, TextureViewDimension,
};

use super::{
	buffer::{Declaration, DeclarationKind, PartialLayoutEntry, ShaderBufferResource},
	gpu::Gpu,
};

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// A 2D texture bound as `texture_storage_2d` in a shader.
#[derive(Debug)]
pub struct StorageTexture {
	pub texture: Texture,
	pub view: TextureView,
	pub declaration: Declaration,
	pub access: StorageTextureAccess,
	pub format: TextureFormat,
}

impl StorageTexture {
	pub fn new(
		gpu: &Gpu,
		var_name: impl Into<String>,
		(width, height): (u32, u32),
		format: TextureFormat,
		access: StorageTextureAccess,
		extra_usage: TextureUsages,
	) -> Result<Self> {
		let declaration = Declaration::storage_texture(var_name, format, access)?;

		let texture = gpu.device.create_texture(&TextureDescriptor {
			label: Some(&format!("StorageTexture '{}'", declaration.var_name)),
			size: Extent3d {
				width,
				height,
				depth_or_array_layers: 1,
			},
			mip_level_count: 1,
			sample_count: 1,
			dimension: TextureDimension::D2,
			format,
			usage: TextureUsages::STORAGE_BINDING | extra_usage,
			view_formats: &[],
		});

		let view = texture.create_view(&TextureViewDescriptor::default());

		debug!(
			"Created storage texture '{}' ({}x{}, {:?})",
			declaration.var_name, width, height, format
		);

		Ok(Self {
			texture,
			view,
			declaration,
			access,
			format,
		})
	}
}

impl ShaderBufferResource for StorageTexture {
	fn declaration(&self) -> &Declaration {
		&self.declaration
	}

	fn layout(&self) -> PartialLayoutEntry {
		PartialLayoutEntry {
			ty: BindingType::StorageTexture {
				access: self.access,
				format: self.format,
				view_dimension: TextureViewDimension::D2,
			},
			count: None,
		}
	}

	fn binding_resource(&self) -> BindingResource {
		BindingResource::TextureView(&self.view)
	}
}

impl Declaration {
	/// Fails for formats that WGSL doesn't allow in storage textures.
	pub fn storage_texture(
		var_name: impl Into<String>,
		format: TextureFormat,
		access: StorageTextureAccess,
	) -> Result<Self> {
		let format_name =
			format_to_string(format).ok_or(anyhow!("{format:?} can't be used as a storage texture format"))?;

		Ok(Self {
			var_name: var_name.into(),
			kind: DeclarationKind::StorageTexture {
				format: format_name,
				access: access_to_string(access),
			},
			type_name: format!("texture_storage_2d<{}, {}>", format_name, access_to_string(access)),
			struct_definition: None,
		})
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

pub fn access_to_string(access: StorageTextureAccess) -> &'static str {
	match access {
		StorageTextureAccess::WriteOnly => "write",
		StorageTextureAccess::ReadOnly => "read",
		StorageTextureAccess::ReadWrite => "read_write",
	}
}

/// The WGSL texel format name, for the formats WGSL allows in storage textures
#[rustfmt::skip]
pub fn format_to_string(format: TextureFormat) -> Option<&'static str> {
	match format {
		TextureFormat::Rgba8Unorm  => Some("rgba8unorm"),
		TextureFormat::Rgba8Snorm  => Some("rgba8snorm"),
		TextureFormat::Rgba8Uint   => Some("rgba8uint"),
		TextureFormat::Rgba8Sint   => Some("rgba8sint"),
		TextureFormat::Bgra8Unorm  => Some("bgra8unorm"),
		TextureFormat::Rgba16Uint  => Some("rgba16uint"),
		TextureFormat::Rgba16Sint  => Some("rgba16sint"),
		TextureFormat::Rgba16Float => Some("rgba16float"),
		TextureFormat::R32Uint     => Some("r32uint"),
		TextureFormat::R32Sint     => Some("r32sint"),
		TextureFormat::R32Float    => Some("r32float"),
		TextureFormat::Rg32Uint    => Some("rg32uint"),
		TextureFormat::Rg32Sint    => Some("rg32sint"),
		TextureFormat::Rg32Float   => Some("rg32float"),
		TextureFormat::Rgba32Uint  => Some("rgba32uint"),
		TextureFormat::Rgba32Sint  => Some("rgba32sint"),
		TextureFormat::Rgba32Float => Some("rgba32float"),
		_ => None,
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
	fn storage_formats() {
		assert_eq!(format_to_string(TextureFormat::Rgba8Unorm), Some("rgba8unorm"));
		assert_eq!(format_to_string(TextureFormat::Rgba32Float), Some("rgba32float"));
		assert_eq!(format_to_string(TextureFormat::Rgba8UnormSrgb), None);
		assert_eq!(format_to_string(TextureFormat::Depth32Float), None);
	}

	#[test]
	fn output_texture_declaration() {
		let declaration =
			Declaration::storage_texture("output", TextureFormat::Rgba8Unorm, StorageTextureAccess::WriteOnly).unwrap();

		assert_eq!(
			declaration.source_code(2, 2),
			"@group(2) @binding(2) var output: texture_storage_2d<rgba8unorm, write>;"
		);
		assert!(
			Declaration::storage_texture("output", TextureFormat::Bgra8UnormSrgb, StorageTextureAccess::WriteOnly)
				.is_err()
		);
	}

	#[test]
	fn access_modes() {
		assert_eq!(access_to_string(StorageTextureAccess::WriteOnly), "write");
		assert_eq!(access_to_string(StorageTextureAccess::ReadWrite), "read_write");
	}
}
