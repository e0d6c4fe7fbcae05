/// Linear interpolation between `a` and `b`
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
	a + t * (b - a)
}

pub fn ease_in_quart(t: f32) -> f32 {
	t * t * t * t
}

pub fn ease_out_cubic(t: f32) -> f32 {
	1.0 - (1.0 - t).powi(3)
}

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/
