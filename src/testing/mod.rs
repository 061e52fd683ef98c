//! Testing utilities for unio-meet
//!
//! Deterministic stand-ins for the external collaborators: the conferencing
//! engine, the device capture API and the two preference stores. They let
//! the controllers run offline in unit tests, integration tests and the CLI
//! simulation.

pub mod devices;
pub mod engine;
pub mod stores;

pub use devices::FakeDeviceCapture;
pub use engine::FakeEngine;
pub use stores::{MemoryEphemeralStore, MemoryProfileStore};
