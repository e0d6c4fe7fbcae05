use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::Parser;
use log::{error, warn, LevelFilter};
use portracer::config::{RenderConfig, RenderMode};

/// Looked up in the working directory when no config is given
const DEFAULT_CONFIG: &str = "portracer.ron";

#[derive(Parser, Debug)]
#[command(author, version, about = "GPU path tracer, offline or in a window")]
struct Cli {
	/// RON config file
	config: Option<PathBuf>,

	#[arg(long)]
	width: Option<u32>,

	#[arg(long)]
	height: Option<u32>,

	/// Number of frames to render offline
	#[arg(long, conflicts_with = "window")]
	frames: Option<u32>,

	/// Where frames and screenshots are written
	#[arg(long)]
	output: Option<PathBuf>,

	/// Render into a window instead of into files
	#[arg(long, default_value_t = false)]
	window: bool,
}

impl Cli {
	fn into_config(self) -> Result<RenderConfig> {
		let mut config = match &self.config {
			Some(path) => RenderConfig::load(path)?,
			None if PathBuf::from(DEFAULT_CONFIG).exists() => RenderConfig::load(DEFAULT_CONFIG)?,
			None => RenderConfig::default(),
		};

		if let Some(width) = self.width {
			config.width = width;
		}
		if let Some(height) = self.height {
			config.height = height;
		}

		if self.window {
			if let RenderMode::Offline { output_dir, .. } = &config.mode {
				config.mode = RenderMode::Window {
					title: "Portracer".to_string(),
					output_dir: output_dir.clone(),
				};
			}
		}

		match &mut config.mode {
			RenderMode::Offline { frames, output_dir } => {
				if let Some(f) = self.frames {
					*frames = f;
				}
				if let Some(output) = self.output {
					*output_dir = output;
				}
			}
			RenderMode::Window { output_dir, .. } => {
				if self.frames.is_some() {
					warn!("--frames only applies to offline rendering, ignoring it in window mode");
				}
				if let Some(output) = self.output {
					*output_dir = output;
				}
			}
		}

		Ok(config)
	}
}

fn main() -> ExitCode {
	env_logger::Builder::new()
		.filter_level(LevelFilter::Error)
		.filter_module("portracer", LevelFilter::Debug)
		.parse_default_env()
		.init();

	let result = Cli::parse().into_config().and_then(portracer::run);

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			error!("{err:#}");
			ExitCode::FAILURE
		}
	}
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/
