//! The application layer: the engine façade and what it exchanges with a display.

pub mod engine;
pub mod events;
pub mod navigation;
pub mod proxy;
pub mod view_model;

pub use engine::{Engine, GenerateRequest};
pub use events::EngineEvent;
pub use proxy::EventProxy;
