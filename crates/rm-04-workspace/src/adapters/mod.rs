//! Adapters between repositories and the shared bus.

pub mod messenger;

pub use messenger::Messenger;
