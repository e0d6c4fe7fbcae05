use bevy_ecs::system::Resource;
use log::{debug, error, info};
use wgpu::{
	Adapter, Backends, Device, DeviceDescriptor, DeviceLostReason, ErrorFilter, Features, Instance,
	InstanceDescriptor, InstanceFlags, Limits, PowerPreference, Queue, RequestAdapterOptions, Surface,
};

use crate::error::GpuError;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[derive(Resource)]
pub struct Gpu {
	pub instance: Instance,
	pub adapter: Adapter,
	pub device: Device,
	pub queue: Queue,
}

impl Gpu {
	/// Creates a fresh instance, then an adapter and device on it.
	pub async fn new() -> Result<Self, GpuError> {
		Self::with_instance(Self::create_instance(), None).await
	}

	/// Creates a wgpu instance; validation and debug info are only turned on
	/// in debug builds.
	pub fn create_instance() -> Instance {
		// Instance is the instance of wgpu which serves as entrypoint for everything
		// wgpu-related
		#[cfg(debug_assertions)]
		let instance = Instance::new(InstanceDescriptor {
			backends: Backends::PRIMARY,
			flags: InstanceFlags::VALIDATION | InstanceFlags::DEBUG,
			..Default::default()
		});

		#[cfg(not(debug_assertions))]
		let instance = Instance::new(InstanceDescriptor {
			backends: Backends::PRIMARY,
			..Default::default()
		});

		info!("Created wgpu instance");

		instance
	}

	/// Requests an adapter and device from an existing instance. When a surface
	/// is given, the adapter has to be able to present to it.
	pub async fn with_instance(instance: Instance, compatible_surface: Option<&Surface<'_>>) -> Result<Self, GpuError> {
		// Adapter essentially represents the physical GPU + the Backend, e.g.
		// GTX1080_VK; GTX1080_DX12; etc
		let adapter = instance
			.request_adapter(&RequestAdapterOptions {
				power_preference: PowerPreference::HighPerformance,
				compatible_surface,
				force_fallback_adapter: false,
			})
			.await
			.ok_or(GpuError::NoAdapter)?;

		let adapter_info = adapter.get_info();
		info!(
			"Using adapter {} ({:?}, {:?})",
			adapter_info.name, adapter_info.backend, adapter_info.device_type
		);

		// Device esentially acts like a logical connection to the selected adapter in
		// an application-isolated way. Queue is the command queue for the GPU,
		// anything that the GPU needs to do goes through it
		let (device, queue) = adapter
			.request_device(
				&DeviceDescriptor {
					label: Some("Portracer Device"),
					required_features: Features::empty(),
					required_limits: Limits::downlevel_defaults().using_resolution(adapter.limits()),
				},
				None,
			)
			.await?;

		info!("Created device");

		device.on_uncaptured_error(Box::new(|err| {
			error!("Uncaptured wgpu error: {}", err);
		}));

		device.set_device_lost_callback(|reason, message| match reason {
			// Also called when the device is dropped at the end of a run
			DeviceLostReason::Dropped | DeviceLostReason::ReplacedCallback => {
				debug!("Device released ({:?})", reason)
			}
			_ => error!("Device lost ({:?}): {}", reason, message),
		});

		Ok(Self {
			instance,
			adapter,
			device,
			queue,
		})
	}

	/// Validation errors raised until the matching
	/// [`Gpu::pop_validation_scope`] are caught instead of only logged.
	pub fn push_validation_scope(&self) {
		self.device.push_error_scope(ErrorFilter::Validation);
	}

	pub fn pop_validation_scope(&self) -> Result<(), GpuError> {
		match pollster::block_on(self.device.pop_error_scope()) {
			Some(err) => Err(GpuError::Validation(err.to_string())),
			None => Ok(()),
		}
	}
}
