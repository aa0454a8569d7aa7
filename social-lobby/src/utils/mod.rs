pub mod arena;
pub mod time;
pub mod wait;
