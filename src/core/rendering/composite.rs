use anyhow::Result;
use bevy_ecs::{
	schedule::IntoSystemConfigs,
	system::{Res, ResMut, Resource},
};
use wgpu::{
	AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
	BindingResource, BindingType, BlendState, Color, ColorTargetState, ColorWrites, CommandEncoderDescriptor,
	FilterMode, FragmentState, FrontFace, LoadOp, MultisampleState, Operations, PipelineLayoutDescriptor,
	PolygonMode, PrimitiveState, PrimitiveTopology, RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline,
	RenderPipelineDescriptor, SamplerBindingType, SamplerDescriptor, ShaderStages, StoreOp, TextureFormat,
	TextureSampleType, TextureViewDimension, VertexState,
};

use super::compute::ComputeRenderer;
use crate::{
	core::{
		app::{App, Plugin, Stage},
		gameloop::{CommandQueue, CompositeRenderPass},
		gpu::Gpu,
		render_target::{has_render_view, RenderTarget},
		shader::ShaderBuilder,
	},
	ShaderAssets,
};

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// Draws the output of the path tracer into the window.
pub struct CompositeRendererPlugin;

impl Plugin for CompositeRendererPlugin {
	fn build(&self, app: &mut App) -> Result<()> {
		let gpu = app.world.resource::<Gpu>();
		let render_target = app.world.resource::<RenderTarget>();
		let compute_renderer = app.world.resource::<ComputeRenderer>();

		let composite_renderer = CompositeRenderer::new(gpu, render_target.config.format, compute_renderer)?;

		app.world.insert_resource(composite_renderer);

		app.add_systems(
			Stage::Render,
			render.in_set(CompositeRenderPass).run_if(has_render_view),
		);

		Ok(())
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[derive(Resource)]
pub struct CompositeRenderer {
	pipeline: RenderPipeline,
	texture_bind_group: BindGroup,
}

impl CompositeRenderer {
	pub fn new(gpu: &Gpu, target_format: TextureFormat, compute_renderer: &ComputeRenderer) -> Result<Self> {
		let shader = ShaderBuilder::new()
			.include_path("composite.wgsl")
			.build::<ShaderAssets>(&gpu.device, "Composite")?;

		// The output has the window's resolution, so there's nothing to filter
		let sampler = gpu.device.create_sampler(&SamplerDescriptor {
			label: Some("Composite Sampler"),
			address_mode_u: AddressMode::ClampToEdge,
			address_mode_v: AddressMode::ClampToEdge,
			mag_filter: FilterMode::Nearest,
			min_filter: FilterMode::Nearest,
			..Default::default()
		});

		let texture_bind_group_layout = gpu.device.create_bind_group_layout(&BindGroupLayoutDescriptor {
			label: Some("Composite Bind Group Layout"),
			entries: &[
				BindGroupLayoutEntry {
					binding: 0,
					visibility: ShaderStages::FRAGMENT,
					ty: BindingType::Texture {
						multisampled: false,
						view_dimension: TextureViewDimension::D2,
						sample_type: TextureSampleType::Float { filterable: true },
					},
					count: None,
				},
				BindGroupLayoutEntry {
					binding: 1,
					visibility: ShaderStages::FRAGMENT,
					// Has to match the filterable field of the texture entry above
					ty: BindingType::Sampler(SamplerBindingType::Filtering),
					count: None,
				},
			],
		});

		let texture_bind_group = gpu.device.create_bind_group(&BindGroupDescriptor {
			label: Some("Composite Bind Group"),
			layout: &texture_bind_group_layout,
			entries: &[
				BindGroupEntry {
					binding: 0,
					resource: BindingResource::TextureView(&compute_renderer.output.image.view),
				},
				BindGroupEntry {
					binding: 1,
					resource: BindingResource::Sampler(&sampler),
				},
			],
		});

		let pipeline_layout = gpu.device.create_pipeline_layout(&PipelineLayoutDescriptor {
			label: Some("Composite Pipeline Layout"),
			bind_group_layouts: &[&texture_bind_group_layout],
			push_constant_ranges: &[],
		});

		let pipeline = gpu.device.create_render_pipeline(&RenderPipelineDescriptor {
			label: Some("Composite Pipeline"),
			layout: Some(&pipeline_layout),
			// No vertex buffers, the shader places the vertices itself
			vertex: VertexState {
				module: &shader,
				entry_point: "vs_main",
				buffers: &[],
			},
			fragment: Some(FragmentState {
				module: &shader,
				entry_point: "fs_main",
				targets: &[Some(ColorTargetState {
					format: target_format,
					blend: Some(BlendState::REPLACE),
					write_mask: ColorWrites::ALL,
				})],
			}),
			// 2 triangles from 4 vertices
			// 2 - 3
			// | \ |
			// 0 - 1
			primitive: PrimitiveState {
				topology: PrimitiveTopology::TriangleStrip,
				strip_index_format: None,
				front_face: FrontFace::Ccw,
				cull_mode: None,
				polygon_mode: PolygonMode::Fill,
				unclipped_depth: false,
				conservative: false,
			},
			depth_stencil: None,
			multisample: MultisampleState {
				count: 1,
				mask: !0,
				alpha_to_coverage_enabled: false,
			},
			multiview: None,
		});

		Ok(Self {
			pipeline,
			texture_bind_group,
		})
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

fn render(
	composite_renderer: Res<CompositeRenderer>,
	render_target: Res<RenderTarget>,
	gpu: Res<Gpu>,
	mut queue: ResMut<CommandQueue>,
) {
	let Some(render_view) = render_target.current_view.as_ref() else {
		return;
	};

	let mut encoder = gpu.device.create_command_encoder(&CommandEncoderDescriptor {
		label: Some("CompositeRenderer Command Encoder"),
	});

	{
		let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
			label: Some("CompositeRenderer Render Pass"),
			color_attachments: &[Some(RenderPassColorAttachment {
				view: render_view,
				resolve_target: None,
				ops: Operations {
					load: LoadOp::Clear(Color::BLACK),
					store: StoreOp::Store,
				},
			})],
			depth_stencil_attachment: None,
			occlusion_query_set: None,
			timestamp_writes: None,
		});

		render_pass.set_pipeline(&composite_renderer.pipeline);
		render_pass.set_bind_group(0, &composite_renderer.texture_bind_group, &[]);
		render_pass.draw(0..4, 0..1);
	}

	queue.0.push(encoder.finish());
}
