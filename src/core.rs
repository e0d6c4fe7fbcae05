pub mod app;
pub mod buffer;
pub mod camera;
pub mod capture;
pub mod display;
pub mod events;
pub mod gameloop;
pub mod gpu;
pub mod render_target;
pub mod rendering;
pub mod shader;
pub mod texture;
