pub mod loader;
pub mod render;
pub mod tui;
