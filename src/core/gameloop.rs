use std::{
	path::Path,
	time::{Duration, Instant},
};

use anyhow::Result;
use bevy_ecs::{
	event::Events,
	schedule::{IntoSystemConfigs, IntoSystemSetConfigs, SystemSet},
	system::{Res, ResMut, Resource},
};
use derive_more::{Deref, Display, From};
use log::{error, info, trace};
use wgpu::CommandBuffer;
use winit::{
	event::{Event, KeyEvent, WindowEvent},
	event_loop::EventLoop,
};

use super::{
	app::{App, Plugin, Stage},
	capture,
	display::AppWindow,
	events::{ExitRequested, KeyboardInputEvent},
	gpu::Gpu,
	rendering::compute::ComputeRenderer,
};

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

pub struct GameloopPlugin;

impl Plugin for GameloopPlugin {
	fn build(&self, app: &mut App) -> Result<()> {
		app.world.insert_resource(Time::default());
		app.world.init_resource::<Progress>();
		app.world.init_resource::<CommandQueue>();

		app.configure_sets(
			Stage::Render,
			(PreRenderPass, ComputeRenderPass, CompositeRenderPass, PostRenderPass).chain(),
		);
		app.add_systems(Stage::Render, submit_commands.in_set(PostRenderPass));

		Ok(())
	}
}

/// Acquiring whatever the frame renders into
#[derive(SystemSet, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PreRenderPass;

#[derive(SystemSet, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComputeRenderPass;

#[derive(SystemSet, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CompositeRenderPass;

/// Submitting the recorded commands, then presenting or reading back
#[derive(SystemSet, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PostRenderPass;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// How far along the camera animation is, from 0 to 1.
#[derive(Resource, Deref, From, Display, Copy, Clone, Debug, Default, PartialEq)]
pub struct Progress(pub f32);

/// Command buffers recorded during the render stage, submitted together.
#[derive(Resource, Default)]
pub struct CommandQueue(pub Vec<CommandBuffer>);

#[derive(Resource, Debug, Copy, Clone)]
pub struct Time {
	start_time: Instant,
	last_frame_time: Instant,

	/// Time since the start of the run
	pub elapsed: Duration,
	pub dt: Duration,

	pub counter_frame: u64,
	pub fps: f32,
	pub smooth_fps: f32,
}

impl Time {
	const SMOOTH_RESPONSIVENESS: f32 = 0.05;

	pub fn tick(&mut self, now: Instant) {
		self.dt = now.saturating_duration_since(self.last_frame_time);
		self.elapsed = now.saturating_duration_since(self.start_time);
		self.last_frame_time = now;
		self.counter_frame += 1;

		if self.dt > Duration::ZERO {
			self.fps = 1.0 / self.dt.as_secs_f32();
			self.smooth_fps = if self.counter_frame == 1 {
				self.fps
			} else {
				self.smoothed(self.smooth_fps, self.fps)
			};
		}
	}

	pub fn smoothed(&self, smoothed: f32, raw: f32) -> f32 {
		(1.0 - Self::SMOOTH_RESPONSIVENESS) * smoothed + Self::SMOOTH_RESPONSIVENESS * raw
	}
}

impl Default for Time {
	fn default() -> Self {
		let now = Instant::now();
		Self {
			start_time: now,
			last_frame_time: now,
			elapsed: Duration::ZERO,
			dt: Duration::ZERO,
			counter_frame: 0,
			fps: 0.0,
			smooth_fps: 0.0,
		}
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

pub fn submit_commands(gpu: Res<Gpu>, mut queue: ResMut<CommandQueue>) {
	gpu.queue.submit(queue.0.drain(..));
}

/// Animation progress of frame `frame` out of `frames`, spread so that the
/// first frame is at 0 and the last one at 1.
pub fn offline_progress(frame: u32, frames: u32) -> f32 {
	if frames <= 1 {
		0.0
	} else {
		frame as f32 / (frames - 1) as f32
	}
}

/// Animation progress of the windowed mode, which loops every `period`.
pub fn looping_progress(elapsed: Duration, period: Duration) -> f32 {
	if period.is_zero() {
		return 0.0;
	}
	(elapsed.as_secs_f32() % period.as_secs_f32()) / period.as_secs_f32()
}

fn advance(app: &mut App, progress: f32) {
	app.world.insert_resource(Progress(progress));
	app.world.resource_mut::<Time>().tick(Instant::now());
	app.iterate();
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// Renders `frames` frames and saves each one as a PNG in `output_dir`.
pub fn run_offline(mut app: App, frames: u32, output_dir: &Path) -> Result<()> {
	info!("Rendering {} frame(s) into {}", frames, output_dir.display());

	let start = Instant::now();

	for frame in 0..frames {
		let frame_start = Instant::now();

		advance(&mut app, offline_progress(frame, frames));

		let gpu = app.world.resource::<Gpu>();
		let renderer = app.world.resource::<ComputeRenderer>();
		let path = capture::frame_path(output_dir, frame);

		if let Err(err) = capture::save_png(gpu, renderer.output_texture(), &path) {
			error!("Image output failed.");
			return Err(err);
		}

		info!("[{:03}]: {}s", frame, frame_start.elapsed().as_secs_f32());
	}

	info!("Finished: {}s", start.elapsed().as_secs_f32());

	Ok(())
}

/// How long one loop of the camera animation takes in the window
const ANIMATION_PERIOD: Duration = Duration::from_secs(10);

/// Runs the app in its window until it's closed.
pub fn run_windowed(mut app: App, event_loop: EventLoop<()>) -> Result<()> {
	trace!("Starting event loop");

	app.world.resource::<AppWindow>().winit_window.request_redraw();

	event_loop.run(move |event, target| {
		let Event::WindowEvent { event, .. } = event else {
			return;
		};

		match event {
			WindowEvent::CloseRequested => {
				trace!("Winit event: Event::WindowEvent::CloseRequested");
				target.exit();
			}

			WindowEvent::KeyboardInput {
				event: KeyEvent {
					state,
					logical_key,
					physical_key,
					..
				},
				..
			} => {
				let event_out = KeyboardInputEvent {
					state,
					logical_key,
					physical_key,
				};
				trace!("Event out: {event_out:?}");
				app.world.send_event(event_out);
			}

			WindowEvent::RedrawRequested => {
				let elapsed = app.world.resource::<Time>().elapsed;
				advance(&mut app, looping_progress(elapsed, ANIMATION_PERIOD));

				if !app.world.resource::<Events<ExitRequested>>().is_empty() {
					target.exit();
					return;
				}

				let time = app.world.resource::<Time>();
				if time.counter_frame % 100 == 0 {
					info!("Frame {}: {:.1} fps", time.counter_frame, time.smooth_fps);
				}

				app.world.resource::<AppWindow>().winit_window.request_redraw();
			}

			_ => {}
		}
	})?;

	Ok(())
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
	fn offline_progress_spans_the_animation() {
		assert_eq!(offline_progress(0, 1), 0.0);
		assert_eq!(offline_progress(0, 5), 0.0);
		assert_eq!(offline_progress(2, 5), 0.5);
		assert_eq!(offline_progress(4, 5), 1.0);
	}

	#[test]
	fn windowed_progress_loops() {
		let period = Duration::from_secs(10);

		assert_eq!(looping_progress(Duration::ZERO, period), 0.0);
		assert!((looping_progress(Duration::from_millis(2500), period) - 0.25).abs() < 1e-5);
		assert!((looping_progress(Duration::from_millis(12500), period) - 0.25).abs() < 1e-5);
		assert_eq!(looping_progress(Duration::from_secs(3), Duration::ZERO), 0.0);
	}

	#[test]
	fn time_ticks() {
		let mut time = Time::default();
		let start = time.start_time;

		time.tick(start + Duration::from_millis(20));
		assert_eq!(time.counter_frame, 1);
		assert_eq!(time.elapsed, Duration::from_millis(20));
		assert!((time.fps - 50.0).abs() < 1e-3);
		assert_eq!(time.smooth_fps, time.fps);

		time.tick(start + Duration::from_millis(30));
		assert_eq!(time.dt, Duration::from_millis(10));
		assert!(time.smooth_fps > 50.0 && time.smooth_fps < 100.0);
	}
}
