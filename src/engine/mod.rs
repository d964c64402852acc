// Engine module - scene, camera, animation and overlay for the mandible viewer
// The viewer owns all state; main.rs only renders what it hands out.

pub mod builder;
pub mod camera;
pub mod catalog;
pub mod components;
pub mod diagram;
pub mod hud;
pub mod input;
pub mod loader;
pub mod mesh;
pub mod morph;
pub mod overlay;
pub mod systems;
pub mod tween;
pub mod viewer;

// Re-export commonly used items
pub use components::*;
