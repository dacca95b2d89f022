//! Error types for janitor operations.

use thiserror::Error;

use crate::entry::ResourceKind;

/// Errors raised or logged by a [`Janitor`](crate::Janitor).
///
/// Only [`JanitorError::Reentrant`] is ever returned from janitor methods.
/// The other variants describe failures that are logged at the release
/// boundary, or returned from [`Entry::release`](crate::Entry::release) when
/// the caller releases a removed entry by hand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JanitorError {
	/// An operation that is forbidden during a release pass was attempted.
	#[error("janitor is releasing: {operation} is not allowed until the pass completes")]
	Reentrant {
		/// The rejected operation.
		operation: &'static str,
	},

	/// A resource's own release procedure failed or panicked.
	#[error("failed to release {kind} resource: {message}")]
	ReleaseFailed {
		/// Kind of the resource that failed.
		kind: ResourceKind,
		/// Error or panic message.
		message: String,
	},

	/// A repeatable link could not be re-established after a release pass.
	#[error("gave up re-linking child janitor after {attempts} attempts")]
	LinkRetryExhausted {
		/// Attempts made before giving up.
		attempts: u32,
	},
}

/// Result type for janitor operations.
pub type Result<T> = std::result::Result<T, JanitorError>;
