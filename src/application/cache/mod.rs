//! Read-side caches kept fresh by post-commit events.
//!
//! - [`pool_view::PoolViewCache`]: pool summaries, invalidated whenever a
//!   committed event touches the pool

pub mod pool_view;
