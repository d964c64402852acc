// Mandible morph viewer core: everything except the window and the GPU.

pub mod config;
pub mod engine;
pub mod error;
pub mod prediction;
