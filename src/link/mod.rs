//! Access link management.
//!
//! The access link is the stable path consumers use. After bootstrap it
//! always resolves to either the primary or the secondary directory, and
//! only [`LinkController`] writes it.

pub mod controller;

pub use controller::{LinkController, LinkError, Resolution, Role};
