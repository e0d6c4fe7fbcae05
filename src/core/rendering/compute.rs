use std::mem;

use anyhow::Result;
use bevy_ecs::{
	change_detection::DetectChanges,
	schedule::IntoSystemConfigs,
	system::{Res, ResMut, Resource},
};
use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use log::debug;
use portracer_derive::ShaderType;
use velcro::vec;
use wgpu::{
	BindGroupLayout, CommandEncoderDescriptor, ComputePassDescriptor, ComputePipeline, ComputePipelineDescriptor,
	Limits, PipelineLayoutDescriptor, ShaderModule, ShaderStages, StorageTextureAccess, Texture, TextureFormat,
	TextureUsages,
};

use crate::{
	core::{
		app::{App, Plugin, Stage},
		buffer::{BindGroupBundle, Declaration, StorageBuffer, UniformBuffer},
		camera::{Camera, CameraBuffer},
		gameloop::{CommandQueue, ComputeRenderPass},
		gpu::Gpu,
		shader::ShaderBuilder,
		texture::StorageTexture,
	},
	error::GpuError,
	scene::gpu::SceneBuffers,
	ShaderAssets,
};

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

pub const OUTPUT_GROUP: u32 = 2;
pub const OUTPUT_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// Runs the path tracer over every pixel of the output, once per frame.
/// Needs the camera and scene buffers to exist already.
pub struct ComputeRendererPlugin {
	pub resolution: (u32, u32),
	pub workgroup_size: u32,
	pub samples_per_pixel: u32,
	pub max_depth: u32,
}

impl Plugin for ComputeRendererPlugin {
	fn build(&self, app: &mut App) -> Result<()> {
		let gpu = app.world.resource::<Gpu>();
		let camera = app.world.resource::<CameraBuffer>();
		let scene = app.world.resource::<SceneBuffers>();

		let output = RenderOutput::new(gpu, self.resolution, self.samples_per_pixel, self.max_depth)?;

		let shader = path_tracer_shader(
			self.workgroup_size,
			&[
				camera.bundle.source.as_str(),
				scene.bundle.source.as_str(),
				output.bundle.source.as_str(),
			],
		)
		.build::<ShaderAssets>(&gpu.device, "Path Tracer")?;

		let compute_renderer = ComputeRenderer::new(
			gpu,
			&shader,
			&[&camera.bundle.layout, &scene.bundle.layout],
			output,
			self.workgroup_size,
		);

		app.world.insert_resource(compute_renderer);

		app.add_systems(Stage::PreRender, update_frame_info);
		app.add_systems(Stage::Render, render.in_set(ComputeRenderPass));

		Ok(())
	}
}

/// The path tracer with the given WGSL binding declarations in front of it.
pub fn path_tracer_shader(workgroup_size: u32, declarations: &[&str]) -> ShaderBuilder {
	let mut builder = ShaderBuilder::new();

	for source in declarations {
		builder.include(*source);
	}

	builder
		.include_path("path_tracer.wgsl")
		.define("WORKGROUP_SIZE", workgroup_size);

	builder
}

/// Number of workgroups needed to cover `size` pixels
pub fn workgroup_count(size: u32, workgroup_size: u32) -> u32 {
	size.div_ceil(workgroup_size.max(1))
}

/// Fails if the output texture or the accumulation buffer of a `width` x
/// `height` image wouldn't fit within `limits`.
pub fn check_resolution(limits: &Limits, (width, height): (u32, u32)) -> Result<(), GpuError> {
	let too_large = |reason: String| GpuError::ResolutionTooLarge { width, height, reason };

	let max_side = limits.max_texture_dimension_2d;
	if width > max_side || height > max_side {
		return Err(too_large(format!("textures are limited to {max_side} pixels per side")));
	}

	let accumulation_size = u64::from(width) * u64::from(height) * mem::size_of::<Vec4>() as u64;
	let max_binding = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
	if accumulation_size > max_binding {
		return Err(too_large(format!(
			"the accumulation buffer needs {accumulation_size} bytes, storage bindings are limited to {max_binding}"
		)));
	}

	Ok(())
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[repr(C)]
#[derive(ShaderType, Pod, Zeroable, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameInfo {
	pub width: u32,
	pub height: u32,
	/// Frames already summed into the accumulation buffer; 0 starts over
	pub accumulated_frames: u32,
	pub samples_per_pixel: u32,
	pub max_depth: u32,
	pub padding0: u32,
	pub padding1: u32,
	pub padding2: u32,
}

/// Everything the path tracer writes to.
pub struct RenderOutput {
	pub frame: UniformBuffer<FrameInfo>,
	pub frame_info: FrameInfo,
	/// Running sum of the radiance of every pixel, alpha counts the frames
	pub accumulation: StorageBuffer<Vec4>,
	pub image: StorageTexture,
	pub bundle: BindGroupBundle,
}

impl RenderOutput {
	pub fn new(gpu: &Gpu, (width, height): (u32, u32), samples_per_pixel: u32, max_depth: u32) -> Result<Self> {
		check_resolution(&gpu.device.limits(), (width, height))?;

		let frame_info = FrameInfo {
			width,
			height,
			accumulated_frames: 0,
			samples_per_pixel: samples_per_pixel.max(1),
			max_depth,
			..Default::default()
		};

		let frame = UniformBuffer::new(gpu, "frame", &frame_info);
		let accumulation = StorageBuffer::zeroed(gpu, "accumulation", false, width as usize * height as usize);
		let image = StorageTexture::new(
			gpu,
			"output",
			(width, height),
			OUTPUT_FORMAT,
			StorageTextureAccess::WriteOnly,
			// Copied out for PNGs, sampled for the window
			TextureUsages::COPY_SRC | TextureUsages::TEXTURE_BINDING,
		)?;

		let bundle = BindGroupBundle::new(
			gpu,
			"Output",
			OUTPUT_GROUP,
			ShaderStages::COMPUTE,
			&[&frame, &accumulation, &image],
		);

		Ok(Self {
			frame,
			frame_info,
			accumulation,
			image,
			bundle,
		})
	}

	pub fn declarations() -> Result<Vec<Declaration>> {
		Ok(vec![
			Declaration::uniform::<FrameInfo>("frame"),
			Declaration::storage::<Vec4>("accumulation", false),
			Declaration::storage_texture("output", OUTPUT_FORMAT, StorageTextureAccess::WriteOnly)?,
		])
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[derive(Resource)]
pub struct ComputeRenderer {
	pipeline: ComputePipeline,
	pub output: RenderOutput,
	pub workgroup_size: u32,
}

impl ComputeRenderer {
	/// `input_layouts` are the groups in front of the output group, in order.
	pub fn new(
		gpu: &Gpu,
		shader: &ShaderModule,
		input_layouts: &[&BindGroupLayout],
		output: RenderOutput,
		workgroup_size: u32,
	) -> Self {
		let bind_group_layouts = &vec![..input_layouts.iter().copied(), &output.bundle.layout];

		let pipeline_layout = gpu.device.create_pipeline_layout(&PipelineLayoutDescriptor {
			label: Some("Compute Pipeline Layout"),
			bind_group_layouts,
			push_constant_ranges: &[],
		});

		let pipeline = gpu.device.create_compute_pipeline(&ComputePipelineDescriptor {
			label: Some("Compute Pipeline"),
			layout: Some(&pipeline_layout),
			module: shader,
			entry_point: "main",
		});

		debug!("Created compute pipeline with {} bind groups", bind_group_layouts.len());

		Self {
			pipeline,
			output,
			workgroup_size,
		}
	}

	pub fn output_texture(&self) -> &Texture {
		&self.output.image.texture
	}

	pub fn workgroups(&self) -> (u32, u32) {
		(
			workgroup_count(self.output.frame_info.width, self.workgroup_size),
			workgroup_count(self.output.frame_info.height, self.workgroup_size),
		)
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

fn update_frame_info(gpu: Res<Gpu>, camera: Res<Camera>, mut renderer: ResMut<ComputeRenderer>) {
	// Samples from another viewpoint can't be mixed in
	if camera.is_changed() {
		renderer.output.frame_info.accumulated_frames = 0;
	}

	renderer.output.frame.upload(&gpu, &renderer.output.frame_info);
}

fn render(
	gpu: Res<Gpu>,
	camera: Res<CameraBuffer>,
	scene: Res<SceneBuffers>,
	mut renderer: ResMut<ComputeRenderer>,
	mut queue: ResMut<CommandQueue>,
) {
	let mut encoder = gpu.device.create_command_encoder(&CommandEncoderDescriptor {
		label: Some("ComputeRenderer Command Encoder"),
	});

	{
		let mut compute_pass = encoder.begin_compute_pass(&ComputePassDescriptor {
			label: Some("ComputeRenderer Compute Pass"),
			timestamp_writes: None,
		});

		compute_pass.set_pipeline(&renderer.pipeline);

		compute_pass.set_bind_group(camera.bundle.group, &camera.bundle.bind_group, &[]);
		compute_pass.set_bind_group(scene.bundle.group, &scene.bundle.bind_group, &[]);
		compute_pass.set_bind_group(renderer.output.bundle.group, &renderer.output.bundle.bind_group, &[]);

		let (x, y) = renderer.workgroups();
		compute_pass.dispatch_workgroups(x, y, 1);
	}

	queue.0.push(encoder.finish());

	renderer.output.frame_info.accumulated_frames += 1;
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[cfg(test)]
mod tests {
	use std::mem;

	use super::*;
	use crate::core::buffer::ShaderType;

	#[test]
	fn workgroups_cover_every_pixel() {
		assert_eq!(workgroup_count(640, 8), 80);
		assert_eq!(workgroup_count(641, 8), 81);
		assert_eq!(workgroup_count(1, 8), 1);
		assert_eq!(workgroup_count(0, 8), 0);
		assert_eq!(workgroup_count(10, 0), 10);
	}

	#[test]
	fn resolution_must_fit_the_device() {
		// What the device is requested with on an adapter allowing 8192x8192 textures
		let limits = Limits::downlevel_defaults().using_resolution(Limits::default());

		assert!(check_resolution(&limits, (640, 480)).is_ok());
		assert!(check_resolution(&limits, (2048, 2048)).is_ok());

		// 4096 * 2160 * 16 bytes of accumulation is more than a 128 MiB binding
		assert!(matches!(
			check_resolution(&limits, (4096, 2160)),
			Err(GpuError::ResolutionTooLarge {
				width: 4096,
				height: 2160,
				..
			})
		));

		assert!(check_resolution(&limits, (9000, 16)).is_err());
		assert!(check_resolution(&limits, (16, 9000)).is_err());
		// Doesn't overflow in u32
		assert!(check_resolution(&Limits::default(), (u32::MAX, u32::MAX)).is_err());
	}

	#[test]
	fn frame_info_layout() {
		assert_eq!(mem::size_of::<FrameInfo>(), 32);
		assert!(FrameInfo::struct_definition()
			.unwrap()
			.contains("\taccumulated_frames: u32,"));
	}

	#[test]
	fn output_declarations() {
		let declarations = RenderOutput::declarations().unwrap();
		let source = BindGroupBundle::source_code(OUTPUT_GROUP, &declarations.iter().collect::<Vec<_>>());

		assert!(source.contains("@group(2) @binding(0) var<uniform> frame: FrameInfo;"));
		assert!(source.contains("@group(2) @binding(1) var<storage, read_write> accumulation: array<vec4<f32>>;"));
		assert!(source.contains("@group(2) @binding(2) var output: texture_storage_2d<rgba8unorm, write>;"));
	}

	fn validate(source: &str) {
		let module = naga::front::wgsl::parse_str(source).unwrap_or_else(|err| panic!("{}", err.emit_to_string(source)));

		naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::empty())
			.validate(&module)
			.unwrap_or_else(|err| panic!("{err:?}"));
	}

	#[test]
	fn path_tracer_is_valid_wgsl() {
		let camera = CameraBuffer::declarations();
		let scene = SceneBuffers::declarations();
		let output = RenderOutput::declarations().unwrap();

		let declarations = [
			BindGroupBundle::source_code(0, &camera.iter().collect::<Vec<_>>()),
			BindGroupBundle::source_code(1, &scene.iter().collect::<Vec<_>>()),
			BindGroupBundle::source_code(OUTPUT_GROUP, &output.iter().collect::<Vec<_>>()),
		];

		let source = path_tracer_shader(8, &declarations.iter().map(String::as_str).collect::<Vec<_>>())
			.build_source::<ShaderAssets>()
			.unwrap();

		validate(&source);
	}

	#[test]
	fn composite_is_valid_wgsl() {
		let source = ShaderBuilder::new()
			.include_path("composite.wgsl")
			.build_source::<ShaderAssets>()
			.unwrap();

		validate(&source);
	}

	#[test]
	fn workgroup_size_is_substituted() {
		let source = path_tracer_shader(16, &[]).build_source::<ShaderAssets>().unwrap();

		assert!(source.contains("@workgroup_size(16, 16, 1)"));
		assert!(!source.contains("WORKGROUP_SIZE"));
	}
}
