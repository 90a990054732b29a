pub mod adjust;
pub mod buffer;
pub mod loader;
pub mod resize;
