pub mod composite;
pub mod compute;
