pub mod log;
pub mod movement;
