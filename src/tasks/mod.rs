//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a cache.
//!
//! # Tasks
//! - Prune: Removes expired cache entries at a configured interval

mod prune;

pub use prune::spawn_prune_task;
