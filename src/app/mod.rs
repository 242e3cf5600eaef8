// Application layer - session orchestration and wiring

pub mod container;
pub mod controller;

pub use container::{AppContainer, DefaultAppContainer};
pub use controller::CompressionController;
