use std::sync::Arc;

use anyhow::Result;
use bevy_ecs::system::Resource;
use log::debug;
use winit::{
	dpi::{PhysicalPosition, PhysicalSize},
	event_loop::EventLoop,
	window::{Window, WindowBuilder},
};

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowSettings {
	pub title: String,
	pub width: u32,
	pub height: u32,
}

#[derive(Resource)]
pub struct AppWindow {
	// Window needs to be an arc so that a surface can be created from it safely
	pub winit_window: Arc<Window>,
}

impl AppWindow {
	/// Opens a window of exactly the rendered resolution. It can't be resized
	/// since the output texture has a fixed size.
	pub fn new(event_loop: &EventLoop<()>, settings: &WindowSettings) -> Result<Self> {
		let window = WindowBuilder::new()
			.with_title(settings.title.as_str())
			.with_inner_size(PhysicalSize::new(settings.width, settings.height))
			.with_resizable(false)
			.build(event_loop)?;

		// Center the window
		if let Some(monitor) = window.current_monitor() {
			let screen_size = monitor.size();
			let window_size = window.outer_size();

			window.set_outer_position(PhysicalPosition {
				x: f64::from(screen_size.width.saturating_sub(window_size.width)) / 2.
					+ f64::from(monitor.position().x),
				y: f64::from(screen_size.height.saturating_sub(window_size.height)) / 2.
					+ f64::from(monitor.position().y),
			});
		}

		debug!(
			"Opened window '{}' ({}x{})",
			settings.title, settings.width, settings.height
		);

		Ok(Self {
			winit_window: Arc::new(window),
		})
	}

	/// The size of the drawable area, in pixels
	pub fn size(&self) -> (u32, u32) {
		let size = self.winit_window.inner_size();
		(size.width, size.height)
	}
}
