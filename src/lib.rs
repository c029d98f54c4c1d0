//! # Linkboard
//!
//! A personal bookmark dashboard backed by Supabase.
//!
//! Links live as cards inside sections and nested folders. Favorites and
//! recently opened cards are kept on the device. The whole dashboard can be
//! exported to JSON and restored from it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌─────────────────┐
//! │  CLI (lb)    │──▶│ linkboard-core │──▶│ Supabase        │
//! │  HTTP API    │   │ ops/tree/search│   │ PostgREST+Store │
//! └──────────────┘   └───────┬────────┘   └─────────────────┘
//!                            ▼
//!                    ┌────────────────┐
//!                    │ local.json     │
//!                    │ favorites/recent│
//!                    └────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`app`] | Wiring of backend, storage and local store |
//! | [`supabase`] | PostgREST implementation of the backend |
//! | [`storage`] | Supabase Storage image bucket |
//! | [`local_store`] | JSON file for favorites and recent |
//! | [`sections`], [`folders`], [`cards`] | Entity commands |
//! | [`images`] | Image upload commands |
//! | [`search`] | One-shot and debounced interactive search |
//! | [`history`] | Favorites and recent commands |
//! | [`transfer`] | Export and import commands |
//! | [`server`] | JSON HTTP API |
//! | [`prompt`] | Confirmation prompts |

pub mod app;
pub mod cards;
pub mod config;
pub mod folders;
pub mod history;
pub mod images;
pub mod local_store;
pub mod prompt;
pub mod search;
pub mod sections;
pub mod server;
pub mod storage;
pub mod supabase;
pub mod transfer;
