#![doc(html_root_url = "https://docs.rs/xylem/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A reconciling virtual DOM runtime.
//!
//! Views produce abstract [`Node`] trees, which are [`mount`]ed into a [`Host`] tree once
//! and then [`patch`]ed in place on every change, so that host nodes of unchanged or moved subtrees survive.
//! [`App`] ties this to state, reducers and a [`Dispatcher`].

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod app;
pub mod dispatcher;
mod error;
mod host;
pub mod keys;
pub mod memory;
mod mount;
pub mod node;
mod patch;
mod rc_hash_map;
pub mod sequence;
mod unmount;
pub mod web;

pub use crate::{
	app::{reducer, App, Emitter, Reducer},
	dispatcher::{Dispatcher, Subscription},
	error::{Error, Result},
	host::Host,
	keys::{diff_keys, KeyDiff},
	mount::mount,
	node::{element, flatten_children, fragment, text, Child, Class, Listener, Node, PropValue, Props},
	patch::patch,
	sequence::{diff_sequence, DiffOp},
	unmount::unmount,
};

/// Text and attribute values only show up in logs with the `dangerous-logging` feature.
pub(crate) fn redact(value: &str) -> &str {
	if cfg!(feature = "dangerous-logging") {
		value
	} else {
		"<redacted>"
	}
}
