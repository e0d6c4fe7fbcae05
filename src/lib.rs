pub mod config;
pub mod core;
pub mod error;
pub mod scene;
pub mod util;

use core::{
	app::App,
	camera::CameraPlugin,
	capture::CapturePlugin,
	display::{AppWindow, WindowSettings},
	events::EventsPlugin,
	gameloop::{run_offline, run_windowed, GameloopPlugin},
	gpu::Gpu,
	render_target::{PendingSurface, WindowRenderTargetPlugin},
	rendering::{composite::CompositeRendererPlugin, compute::ComputeRendererPlugin},
};

use anyhow::Result;
use config::{RenderConfig, RenderMode};
use log::info;
use rust_embed::Embed;
use scene::gpu::ScenePlugin;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[derive(Embed)]
#[folder = "src/shader/"]
#[prefix = "/"]
pub struct ShaderAssets;

/// The default `EventLoop` type to avoid having to add the extra unit type
type EventLoop = winit::event_loop::EventLoop<()>;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

pub fn run(config: RenderConfig) -> Result<()> {
	config.validate()?;

	let scene = config.build_scene()?;
	if scene.is_empty() {
		info!("The scene is empty, only the background will be rendered");
	}

	match &config.mode {
		RenderMode::Offline { frames, output_dir } => {
			let gpu = pollster::block_on(Gpu::new())?;

			let mut app = App::new();
			app.world.insert_resource(gpu);

			build_validated(&mut app, |app| add_render_plugins(app, &config, scene))?;

			run_offline(app, *frames, output_dir)
		}

		RenderMode::Window { title, output_dir } => {
			let event_loop = EventLoop::new()?;

			let window = AppWindow::new(
				&event_loop,
				&WindowSettings {
					title: title.clone(),
					width: config.width,
					height: config.height,
				},
			)?;

			// The adapter has to be compatible with the window's surface
			let instance = Gpu::create_instance();
			let surface = instance.create_surface(window.winit_window.clone())?;
			let gpu = pollster::block_on(Gpu::with_instance(instance, Some(&surface)))?;

			let mut app = App::new();
			app.world.insert_resource(gpu);
			app.world.insert_resource(window);
			app.world.insert_resource(PendingSurface(surface));

			build_validated(&mut app, |app| {
				add_render_plugins(app, &config, scene)?;

				app.add_plugin(EventsPlugin)?
					.add_plugin(WindowRenderTargetPlugin)?
					.add_plugin(CompositeRendererPlugin)?
					.add_plugin(CapturePlugin {
						output_dir: output_dir.clone(),
					})?;

				Ok(())
			})?;

			run_windowed(app, event_loop)
		}
	}
}

/// The plugins shared by both modes, in dependency order.
fn add_render_plugins(app: &mut App, config: &RenderConfig, scene: scene::Scene) -> Result<()> {
	app.add_plugin(GameloopPlugin)?
		.add_plugin(CameraPlugin {
			settings: config.camera,
			aspect: config.aspect(),
		})?
		.add_plugin(ScenePlugin { scene })?
		.add_plugin(ComputeRendererPlugin {
			resolution: (config.width, config.height),
			workgroup_size: config.workgroup_size,
			samples_per_pixel: config.samples_per_pixel,
			max_depth: config.max_depth,
		})?;

	Ok(())
}

/// Runs `build`, failing if the device rejected anything it created.
fn build_validated(app: &mut App, build: impl FnOnce(&mut App) -> Result<()>) -> Result<()> {
	app.world.resource::<Gpu>().push_validation_scope();
	let built = build(app);
	let validated = app.world.resource::<Gpu>().pop_validation_scope();

	built?;
	validated?;
	Ok(())
}
