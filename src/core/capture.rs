use std::{
	fs,
	path::{Path, PathBuf},
	sync::mpsc,
};

use anyhow::{anyhow, Context, Result};
use bevy_ecs::{
	event::EventReader,
	schedule::IntoSystemConfigs,
	system::{Res, ResMut, Resource},
};
use image::{ImageFormat, RgbaImage};
use log::{error, info};
use wgpu::{
	BufferDescriptor, BufferUsages, CommandEncoderDescriptor, Extent3d, ImageCopyBuffer, ImageCopyTexture,
	ImageDataLayout, Maintain, MapMode, Origin3d, Texture, TextureAspect, COPY_BYTES_PER_ROW_ALIGNMENT,
};

use super::{
	app::{App, Plugin, Stage},
	events::ScreenshotRequested,
	gameloop::{submit_commands, PostRenderPass},
	gpu::Gpu,
	rendering::compute::ComputeRenderer,
};
use crate::error::GpuError;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// Saves the output texture when a screenshot is requested.
pub struct CapturePlugin {
	pub output_dir: PathBuf,
}

impl Plugin for CapturePlugin {
	fn build(&self, app: &mut App) -> Result<()> {
		app.world.insert_resource(CaptureSettings {
			output_dir: self.output_dir.clone(),
			screenshot_counter: 0,
		});

		app.add_event::<ScreenshotRequested>();
		app.add_systems(Stage::Render, take_screenshots.in_set(PostRenderPass).after(submit_commands));

		Ok(())
	}
}

#[derive(Resource, Clone, Debug)]
pub struct CaptureSettings {
	pub output_dir: PathBuf,
	pub screenshot_counter: u32,
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

const BYTES_PER_PIXEL: u32 = 4;

/// Texture-to-buffer copies need every row to start on a multiple of
/// [`COPY_BYTES_PER_ROW_ALIGNMENT`].
pub fn padded_bytes_per_row(width: u32) -> u32 {
	let unpadded = width * BYTES_PER_PIXEL;
	unpadded.div_ceil(COPY_BYTES_PER_ROW_ALIGNMENT) * COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Removes the row padding of a readback, leaving tightly packed RGBA rows.
pub fn strip_padding(padded: &[u8], width: u32, height: u32) -> Vec<u8> {
	let padded_row = padded_bytes_per_row(width) as usize;
	let row = (width * BYTES_PER_PIXEL) as usize;

	padded
		.chunks(padded_row)
		.take(height as usize)
		.flat_map(|chunk| &chunk[..row])
		.copied()
		.collect()
}

pub fn frame_path(output_dir: &Path, frame: u32) -> PathBuf {
	output_dir.join(format!("{:03}.png", frame))
}

pub fn screenshot_path(output_dir: &Path, index: u32) -> PathBuf {
	output_dir.join(format!("screenshot_{:03}.png", index))
}

/// Copies an `Rgba8Unorm` texture back to the host. Blocks until the GPU is
/// done with everything submitted so far.
pub fn read_texture(gpu: &Gpu, texture: &Texture) -> Result<RgbaImage> {
	let (width, height) = (texture.width(), texture.height());
	let padded_row = padded_bytes_per_row(width);

	let buffer = gpu.device.create_buffer(&BufferDescriptor {
		label: Some("Readback Buffer"),
		size: u64::from(padded_row) * u64::from(height),
		usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
		mapped_at_creation: false,
	});

	let mut encoder = gpu.device.create_command_encoder(&CommandEncoderDescriptor {
		label: Some("Readback Command Encoder"),
	});

	encoder.copy_texture_to_buffer(
		ImageCopyTexture {
			texture,
			mip_level: 0,
			origin: Origin3d::ZERO,
			aspect: TextureAspect::All,
		},
		ImageCopyBuffer {
			buffer: &buffer,
			layout: ImageDataLayout {
				offset: 0,
				bytes_per_row: Some(padded_row),
				rows_per_image: Some(height),
			},
		},
		Extent3d {
			width,
			height,
			depth_or_array_layers: 1,
		},
	);

	gpu.queue.submit(Some(encoder.finish()));

	let slice = buffer.slice(..);
	let (sender, receiver) = mpsc::channel();
	slice.map_async(MapMode::Read, move |result| {
		// The receiver only goes away if we already bailed out
		let _ = sender.send(result);
	});

	gpu.device.poll(Maintain::Wait);
	receiver.recv().map_err(|_| GpuError::ReadbackChannel)?.map_err(GpuError::from)?;

	let pixels = {
		let mapped = slice.get_mapped_range();
		strip_padding(&mapped, width, height)
	};
	buffer.unmap();

	RgbaImage::from_raw(width, height, pixels).ok_or(anyhow!("Readback has the wrong size"))
}

/// Reads the texture back and writes it as a PNG, creating the parent
/// directory if needed.
pub fn save_png(gpu: &Gpu, texture: &Texture, path: &Path) -> Result<()> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).with_context(|| format!("Couldn't create directory {}", parent.display()))?;
	}

	let image = read_texture(gpu, texture)?;
	image
		.save_with_format(path, ImageFormat::Png)
		.with_context(|| format!("Couldn't write {}", path.display()))?;

	Ok(())
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

fn take_screenshots(
	mut requests: EventReader<ScreenshotRequested>,
	mut settings: ResMut<CaptureSettings>,
	gpu: Res<Gpu>,
	renderer: Res<ComputeRenderer>,
) {
	// Several presses within one frame give the same image
	if requests.read().count() == 0 {
		return;
	}

	let path = screenshot_path(&settings.output_dir, settings.screenshot_counter);
	settings.screenshot_counter += 1;

	match save_png(&gpu, renderer.output_texture(), &path) {
		Ok(()) => info!("Saved screenshot {}", path.display()),
		Err(err) => error!("Image output failed: {err:#}"),
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
	fn rows_are_padded_to_the_copy_alignment() {
		assert_eq!(padded_bytes_per_row(64), 256);
		assert_eq!(padded_bytes_per_row(65), 512);
		assert_eq!(padded_bytes_per_row(640), 2560);
		assert_eq!(padded_bytes_per_row(1), 256);
	}

	#[test]
	fn padding_is_stripped() {
		// 2x2 image: 8 meaningful bytes per row, 256 with padding
		let mut padded = vec![0xAA; 512];
		padded[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
		padded[256..264].copy_from_slice(&[9, 10, 11, 12, 13, 14, 15, 16]);

		let pixels = strip_padding(&padded, 2, 2);

		assert_eq!(pixels, (1..=16).collect::<Vec<u8>>());
	}

	#[test]
	fn file_names() {
		let dir = Path::new("output");

		assert_eq!(frame_path(dir, 0), Path::new("output/000.png"));
		assert_eq!(frame_path(dir, 42), Path::new("output/042.png"));
		assert_eq!(frame_path(dir, 1234), Path::new("output/1234.png"));
		assert_eq!(screenshot_path(dir, 3), Path::new("output/screenshot_003.png"));
	}
}
