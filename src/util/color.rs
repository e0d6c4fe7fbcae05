use glam::Vec3;

pub const RED: Vec3 = Vec3::new(0.65, 0.05, 0.05);
pub const GREEN: Vec3 = Vec3::new(0.12, 0.45, 0.15);
pub const BLUE: Vec3 = Vec3::new(0.1, 0.2, 0.5);
pub const WHITE: Vec3 = Vec3::new(0.73, 0.73, 0.73);
pub const LIGHT: Vec3 = Vec3::new(35.0, 35.0, 35.0);
pub const ZERO: Vec3 = Vec3::ZERO;

/// Light colour of the classic Cornell box ceiling lamp
pub const CORNELL_LIGHT: Vec3 = Vec3::new(15.0, 15.0, 15.0);
