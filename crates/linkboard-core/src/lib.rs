//! # Linkboard Core
//!
//! Shared, WASM-safe logic for Linkboard: data models, folder-tree
//! construction, reordering, device-local caches (favorites and recent),
//! the backend and image-storage abstractions, dashboard operations, and
//! JSON import/export.
//!
//! This crate contains no tokio, reqwest, or filesystem I/O. The hosted
//! backend is reached through the [`store::Backend`] trait; the native
//! implementation lives in the `linkboard` crate.

pub mod error;
pub mod images;
pub mod local;
pub mod models;
pub mod ops;
pub mod reorder;
pub mod search;
pub mod store;
pub mod transfer;
pub mod tree;

pub use error::DashboardError;
