//! Convenience hooks on top of a small component runtime.
//!
//! - Dependency lists are written as named sets ([`Deps`], [`deps!`]) instead of positional arrays.
//! - Effects can skip their first invocation and see the previous dependency snapshot.
//! - Callbacks can be delayed or debounced, and never fire after their component is torn down.
//! - Services provide a value to a subtree and fail loudly when injected without a provider.

pub mod core;

mod cell;
mod context;
mod deps;
mod effect;
mod error;
mod gate;
mod invoker;
mod memo;
mod service;
mod snapshot;
mod state;

pub use cell::*;
pub use context::*;
pub use deps::*;
pub use effect::*;
pub use error::*;
pub use gate::*;
pub use invoker::*;
pub use memo::*;
pub use service::*;
pub use snapshot::*;
pub use state::*;

pub use crate::core::{Cleanup, Component, EffectPhase, HookContext, Runtime};
