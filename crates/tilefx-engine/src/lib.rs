//! # tilefx-engine
//!
//! Filter application and invalidation engine for tiled image viewers.
//!
//! The engine owns the live filter configuration and decides, for every tile
//! the viewer loads and draws, which processors apply, whether a previously
//! computed result can be reused, and when in-flight asynchronous work has
//! gone stale and must be dropped.
//!
//! # Architecture
//!
//! ```text
//! ViewerHost (collaborator, supplied by the viewer)
//!     ^ force_full_redraw / reset_item / items
//!     |
//! FilterEngine
//!     ├── Configuration snapshot + monotonic version counter
//!     ├── TileFilterCache per tile (engine-owned, ephemeral)
//!     └── ChainRun queue (version-stamped continuation chains)
//! ```
//!
//! # Concurrency model
//!
//! Single-threaded cooperative: the engine never spawns threads.
//! "Asynchronous" means deferred continuation execution - pending chains
//! advance one step per [`FilterEngine::pump`] call, and the configuration
//! version captured at chain start is re-checked at every continuation
//! boundary. A mismatch aborts the chain silently: no error, no completion
//! call, no cache write. That version stamp is the sole ordering and
//! cancellation primitive; no locks exist anywhere in the engine.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tilefx_engine::{FilterEngine, FilterSpec, ItemId, LoadMode, ViewerHost};
//!
//! struct Viewer;
//! impl ViewerHost for Viewer {
//!     fn force_full_redraw(&mut self) {}
//!     fn reset_item(&mut self, _item: ItemId) {}
//!     fn items(&self) -> Vec<ItemId> { vec![] }
//! }
//!
//! let mut engine = FilterEngine::new(Viewer);
//! let spec = FilterSpec::global(vec![Arc::new(tilefx_ops::invert())]);
//! engine.install(vec![spec], LoadMode::Sync).unwrap();
//! assert_eq!(engine.version(), 1);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod chain;
mod config;
mod engine;
mod error;
mod region;

pub use chain::Completion;
pub use config::{FilterSpec, ItemId, LoadMode, Scope, TileId, TileProcessor};
pub use engine::{FilterEngine, ViewerHost};
pub use error::{ConfigError, ConfigResult};
pub use region::{RenderedRegion, TileFilterCache};
