//! Resource-cleanup registry.
//!
//! A [`Janitor`] accumulates heterogeneous resources (callbacks, subscription
//! handles, tweens, cooperative tasks, nested janitors, generic disposable
//! objects) and releases all of them on one explicit [`Janitor::destroy`]
//! call. Entries are released exactly once, in the order they were added,
//! each with the release procedure of its [`ResourceKind`]. A failing
//! resource is logged and never stops the rest of the pass.
//!
//! ```
//! use tidy_janitor::{Callback, Janitor};
//!
//! let janitor = Janitor::new();
//! let cb = janitor.add(Callback::new(|| println!("released"))).unwrap();
//! assert_eq!(janitor.len(), 1);
//! janitor.destroy().unwrap();
//! assert!(janitor.is_empty());
//! # drop(cb);
//! ```
//!
//! Janitors nest: [`Janitor::extend`] creates a child whose release follows
//! the parent's, either once or on every future pass.

mod config;
mod entry;
mod error;
mod janitor;
mod link;
mod resource;

pub use config::{DEFAULT_LINK_ATTEMPTS, JanitorConfig, UnreleasedPolicy};
pub use entry::{Entry, EntryInfo, EntryKey, ResourceKind};
pub use error::{JanitorError, Result};
pub use janitor::Janitor;
pub use resource::{Callback, Dispose, Resource, Subscription, Tracked, Tween, TweenHandle, Unsubscribe};
pub use tidy_worker::{Deferred, RuntimeScheduler, ScheduleError, Scheduler, TaskHandle, TurnQueue};
