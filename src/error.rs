use std::path::PathBuf;

use thiserror::Error;

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

#[derive(Error, Debug)]
pub enum GpuError {
	#[error("couldn't find a compatible adapter")]
	NoAdapter,

	#[error("couldn't request device: {0}")]
	RequestDevice(#[from] wgpu::RequestDeviceError),

	#[error("couldn't map readback buffer: {0}")]
	Readback(#[from] wgpu::BufferAsyncError),

	#[error("readback channel closed before the buffer was mapped")]
	ReadbackChannel,

	#[error("{width}x{height} is too large for the device: {reason}")]
	ResolutionTooLarge { width: u32, height: u32, reason: String },

	#[error("GPU validation failed during setup: {0}")]
	Validation(String),
}

#[derive(Error, Debug)]
pub enum SceneError {
	#[error("malformed OBJ file `{path}` at line {line}: {message}")]
	Obj {
		path: PathBuf,
		line: usize,
		message: String,
	},

	#[error("couldn't read scene file `{path}`: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("malformed scene description `{path}`: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: ron::error::SpannedError,
	},
}
