use anyhow::{anyhow, Result};
use bevy_ecs::{
	schedule::IntoSystemConfigs,
	system::{Res, ResMut, Resource},
};
use log::{debug, warn};
use wgpu::{
	PresentMode, Surface, SurfaceConfiguration, SurfaceError, SurfaceTexture, TextureFormat, TextureUsages,
	TextureView, TextureViewDescriptor,
};

use super::{
	app::{App, Plugin, Stage},
	display::AppWindow,
	gameloop::{submit_commands, PostRenderPass, PreRenderPass},
	gpu::Gpu,
};

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// Presents frames into the window. The surface has to be created before the
/// device, so it's handed to the plugin rather than created by it.
pub struct WindowRenderTargetPlugin;

impl Plugin for WindowRenderTargetPlugin {
	fn build(&self, app: &mut App) -> Result<()> {
		let surface = app
			.world
			.remove_resource::<PendingSurface>()
			.ok_or(anyhow!("No surface was created for the window"))?;

		let size = app.world.resource::<AppWindow>().size();
		let render_target = RenderTarget::new(surface.0, app.world.resource::<Gpu>(), size)?;

		app.world.insert_resource(render_target);

		app.add_systems(
			Stage::Render,
			(
				prepare_render_pass.in_set(PreRenderPass),
				present.in_set(PostRenderPass).after(submit_commands),
			),
		);

		Ok(())
	}
}

/// A surface waiting for the device to exist
#[derive(Resource)]
pub struct PendingSurface(pub Surface<'static>);

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[derive(Resource)]
pub struct RenderTarget {
	pub surface: Surface<'static>,
	pub config: SurfaceConfiguration,

	current_texture: Option<SurfaceTexture>,
	pub current_view: Option<TextureView>,
}

impl RenderTarget {
	pub fn new(surface: Surface<'static>, gpu: &Gpu, (width, height): (u32, u32)) -> Result<Self> {
		// Describes what the surface is compatible with on the given adapter
		let capabilities = surface.get_capabilities(&gpu.adapter);

		let format = preferred_format(&capabilities.formats)
			.ok_or(anyhow!("The surface isn't compatible with the adapter"))?;

		let present_mode = if capabilities.present_modes.contains(&PresentMode::Mailbox) {
			PresentMode::Mailbox
		} else {
			PresentMode::Fifo
		};

		let config = SurfaceConfiguration {
			usage: TextureUsages::RENDER_ATTACHMENT,
			format,
			width,
			height,
			present_mode,
			desired_maximum_frame_latency: 2,
			alpha_mode: capabilities.alpha_modes[0],
			view_formats: vec![],
		};

		surface.configure(&gpu.device, &config);

		debug!("Configured surface: {:?}, {:?}, {}x{}", format, present_mode, width, height);

		Ok(Self {
			surface,
			config,
			current_texture: None,
			current_view: None,
		})
	}
}

/// The output texture already holds display-ready values, so a linear surface
/// format is preferred to avoid encoding them twice.
pub fn preferred_format(formats: &[TextureFormat]) -> Option<TextureFormat> {
	formats
		.iter()
		.copied()
		.find(|format| !format.is_srgb())
		.or_else(|| formats.first().copied())
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

pub fn has_render_view(render_target: Res<RenderTarget>) -> bool {
	render_target.current_view.is_some()
}

fn prepare_render_pass(mut render_target: ResMut<RenderTarget>, gpu: Res<Gpu>) {
	let output = match render_target.surface.get_current_texture() {
		Ok(output) => Some(output),
		Err(SurfaceError::Lost | SurfaceError::Outdated) => {
			// Reconfigure and skip this frame
			render_target.surface.configure(&gpu.device, &render_target.config);
			None
		}
		Err(err) => {
			warn!("Couldn't acquire the next surface texture: {err}");
			None
		}
	};

	let view = output
		.as_ref()
		.map(|output| output.texture.create_view(&TextureViewDescriptor::default()));

	render_target.current_texture = output;
	render_target.current_view = view;
}

fn present(mut render_target: ResMut<RenderTarget>) {
	render_target.current_view = None;

	if let Some(output) = render_target.current_texture.take() {
		output.present();
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/
