use anyhow::Result;
use bevy_ecs::event::{Event, EventReader, EventWriter};
use winit::{
	event::ElementState,
	keyboard::{KeyCode, PhysicalKey},
};

use super::app::{App, Plugin, Stage};

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

pub struct EventsPlugin;

impl Plugin for EventsPlugin {
	fn build(&self, app: &mut App) -> Result<()> {
		app.add_event::<KeyboardInputEvent>()
			.add_event::<ScreenshotRequested>()
			.add_event::<ExitRequested>();

		app.add_systems(Stage::Update, keyboard_shortcuts);

		Ok(())
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// Event for keyboard inputs.
///
/// The fields are taken directly from the corresponding [`winit::event::WindowEvent::KeyboardInput`].
/// [`Self::logical_key`] is how the OS interprets the key, with the keyboard layout applied.
/// [`Self::physical_key`] is the key's position on a US keyboard layout.
#[derive(Event, Clone, Debug, PartialEq, Eq)]
pub struct KeyboardInputEvent {
	pub state: ElementState,
	pub logical_key: winit::keyboard::Key,
	pub physical_key: PhysicalKey,
}

impl KeyboardInputEvent {
	pub fn is_pressed(&self, key: KeyCode) -> bool {
		self.state == ElementState::Pressed && self.physical_key == PhysicalKey::Code(key)
	}
}

/// Save the current output texture next to the offline frames
#[derive(Event, Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScreenshotRequested;

#[derive(Event, Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExitRequested;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

fn keyboard_shortcuts(
	mut keyboard_events: EventReader<KeyboardInputEvent>,
	mut screenshots: EventWriter<ScreenshotRequested>,
	mut exits: EventWriter<ExitRequested>,
) {
	for event in keyboard_events.read() {
		if event.is_pressed(KeyCode::Escape) {
			exits.send(ExitRequested);
		}
		if event.is_pressed(KeyCode::KeyP) {
			screenshots.send(ScreenshotRequested);
		}
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/
