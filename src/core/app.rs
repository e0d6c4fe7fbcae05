use anyhow::Result;
use bevy_ecs::{
	event::{Event, Events},
	schedule::{IntoSystemConfigs, IntoSystemSetConfigs, Schedule, ScheduleLabel},
	system::ResMut,
	world::World,
};
use log::trace;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

pub trait Plugin {
	fn build(&self, app: &mut App) -> Result<()>;
}

/// The schedules of one iteration, in the order they run.
#[derive(ScheduleLabel, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Clears the event queues, so events sent in the previous iteration are
	/// readable exactly once
	Events,
	/// Animation and other state changes
	Update,
	/// Uploads of host state to the GPU
	PreRender,
	/// Recording and submitting GPU work
	Render,
}

impl Stage {
	pub const ALL: [Stage; 4] = [Stage::Events, Stage::Update, Stage::PreRender, Stage::Render];
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// The ECS world and the schedules that run over it, assembled from plugins.
pub struct App {
	pub world: World,
	schedules: Vec<(Stage, Schedule)>,
}

impl Default for App {
	fn default() -> Self {
		Self::new()
	}
}

impl App {
	pub fn new() -> Self {
		Self {
			world: World::new(),
			schedules: Stage::ALL
				.into_iter()
				.map(|stage| (stage, Schedule::new(stage)))
				.collect(),
		}
	}

	pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> Result<&mut Self> {
		trace!("Building plugin {}", std::any::type_name::<P>());
		plugin.build(self)?;
		Ok(self)
	}

	pub fn add_systems<M>(&mut self, stage: Stage, systems: impl IntoSystemConfigs<M>) -> &mut Self {
		self.schedule_mut(stage).add_systems(systems);
		self
	}

	pub fn configure_sets(&mut self, stage: Stage, sets: impl IntoSystemSetConfigs) -> &mut Self {
		self.schedule_mut(stage).configure_sets(sets);
		self
	}

	/// Registers an event type whose queue is cleared at the start of every
	/// iteration.
	pub fn add_event<T: Event>(&mut self) -> &mut Self {
		if !self.world.contains_resource::<Events<T>>() {
			self.world.init_resource::<Events<T>>();
			self.add_systems(Stage::Events, clear_events::<T>);
		}
		self
	}

	pub fn run_stage(&mut self, stage: Stage) {
		let world = &mut self.world;
		if let Some((_, schedule)) = self.schedules.iter_mut().find(|(s, _)| *s == stage) {
			schedule.run(world);
		}
	}

	/// Runs every stage once, in order.
	pub fn iterate(&mut self) {
		for stage in Stage::ALL {
			self.run_stage(stage);
		}
	}

	fn schedule_mut(&mut self, stage: Stage) -> &mut Schedule {
		let index = Stage::ALL
			.iter()
			.position(|s| *s == stage)
			.unwrap_or_default();
		&mut self.schedules[index].1
	}
}

fn clear_events<T: Event>(mut events: ResMut<Events<T>>) {
	events.update();
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[cfg(test)]
mod tests {
	use bevy_ecs::{event::EventReader, system::Resource};

	use super::*;

	#[derive(Resource, Default)]
	struct Log(Vec<&'static str>);

	#[derive(Event)]
	struct Ping;

	struct LogPlugin;

	impl Plugin for LogPlugin {
		fn build(&self, app: &mut App) -> Result<()> {
			app.world.init_resource::<Log>();
			app.add_systems(Stage::Render, |mut log: ResMut<Log>| log.0.push("render"));
			app.add_systems(Stage::Update, |mut log: ResMut<Log>| log.0.push("update"));
			app.add_systems(Stage::PreRender, |mut log: ResMut<Log>| log.0.push("pre-render"));
			Ok(())
		}
	}

	#[test]
	fn stages_run_in_order() {
		let mut app = App::new();
		app.add_plugin(LogPlugin).unwrap();

		app.iterate();
		app.iterate();

		assert_eq!(
			app.world.resource::<Log>().0,
			vec!["update", "pre-render", "render", "update", "pre-render", "render"]
		);
	}

	#[test]
	fn events_are_read_once() {
		#[derive(Resource, Default)]
		struct Count(usize);

		let mut app = App::new();
		app.add_event::<Ping>();
		app.world.init_resource::<Count>();
		app.add_systems(Stage::Update, |mut pings: EventReader<Ping>, mut count: ResMut<Count>| {
			count.0 += pings.read().count();
		});

		app.world.send_event(Ping);
		app.iterate();
		app.iterate();

		assert_eq!(app.world.resource::<Count>().0, 1);
	}

	#[test]
	fn failing_plugin_propagates() {
		struct Broken;
		impl Plugin for Broken {
			fn build(&self, _app: &mut App) -> Result<()> {
				anyhow::bail!("nope")
			}
		}

		assert!(App::new().add_plugin(Broken).is_err());
	}
}
