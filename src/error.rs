use core::fmt::Debug;
use thiserror::Error;

/// Errors surfaced by the reconciliation entry points.
///
/// `E` is the [`Host::Error`](`crate::Host::Error`) of the adapter in use.
/// Host failures are passed through unchanged as [`Error::Host`].
#[derive(Debug, Error)]
pub enum Error<E: Debug> {
	#[error("host adapter failure: {0:?}")]
	Host(E),

	/// A node that was never mounted (or was already unmounted) was handed to patch or unmount.
	#[error("{kind} node has no host binding")]
	Unbound { kind: &'static str },
}

impl<E: Debug> From<E> for Error<E> {
	fn from(error: E) -> Self {
		Self::Host(error)
	}
}

pub type Result<T, E> = core::result::Result<T, Error<E>>;
