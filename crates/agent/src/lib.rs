#![forbid(unsafe_code)]

//! Display agent: fetches content and prayer schedules, drives the rotation
//! and prayer overlay from a single event loop, and reports what to render.

pub mod config;
pub mod controller;
pub mod overlay;
pub mod repository;
pub mod runtime;
pub mod sink;

pub use controller::DisplayController;
pub use repository::{ContentRepository, StatusReporter};
pub use runtime::{DisplayRuntime, MountedDisplay};
