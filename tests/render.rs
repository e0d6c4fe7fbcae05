use std::path::PathBuf;

use portracer::{
	config::{RenderConfig, RenderMode, SceneSource},
	scene::description::load_scene,
};

fn manifest_path(relative: &str) -> PathBuf {
	PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

#[test]
fn shipped_config_is_valid() {
	let config = RenderConfig::load(manifest_path("portracer.ron")).unwrap();

	assert_eq!((config.width, config.height), (640, 480));
	assert!(matches!(config.mode, RenderMode::Offline { frames: 1, .. }));
	assert!(!config.build_scene().unwrap().is_empty());
}

#[test]
fn shipped_scenes_load() {
	let spheres = load_scene(manifest_path("assets/scenes/spheres.ron")).unwrap();
	assert_eq!(spheres.spheres.len(), 3);
	assert_eq!(spheres.quads.len(), 1);

	let cornell = load_scene(manifest_path("assets/scenes/cornell_box.ron")).unwrap();
	assert_eq!(cornell.triangles.len(), 1);
	// 5 walls, the lamp and 6 faces of the cuboid
	assert_eq!(cornell.quads.len(), 12);
}

/// Needs a GPU adapter, run with `--ignored`.
#[test]
#[ignore]
fn offline_render_writes_frames() {
	let output = tempfile::tempdir().unwrap();

	let config = RenderConfig {
		width: 64,
		height: 48,
		mode: RenderMode::Offline {
			frames: 2,
			output_dir: output.path().to_owned(),
		},
		scene: SceneSource::File(manifest_path("assets/scenes/spheres.ron")),
		..Default::default()
	};

	portracer::run(config).unwrap();

	for name in ["000.png", "001.png"] {
		let image = image::open(output.path().join(name)).unwrap();
		assert_eq!((image.width(), image.height()), (64, 48));
	}
}

/// Needs a GPU adapter, run with `--ignored`.
#[test]
#[ignore]
fn oversized_resolution_fails_setup() {
	let output = tempfile::tempdir().unwrap();

	let config = RenderConfig {
		width: 4096,
		height: 2160,
		mode: RenderMode::Offline {
			frames: 1,
			output_dir: output.path().to_owned(),
		},
		..Default::default()
	};

	let err = portracer::run(config).unwrap_err();

	assert!(format!("{err:#}").contains("4096x2160"));
	assert!(!output.path().join("000.png").exists());
}
