use crate::{Class, Listener, PropValue};
use core::fmt::Debug;

/// The live host tree (for example a browser DOM) that abstract trees are reconciled into.
///
/// Implementations are consumed by [`mount`](`crate::mount`), [`unmount`](`crate::unmount`) and [`patch`](`crate::patch`),
/// which never inspect host nodes beyond what this trait exposes.
/// Failures are passed through to the caller as [`Error::Host`](`crate::Error::Host`).
pub trait Host {
	/// A handle to one host node. Clones refer to the same node and compare equal.
	type Node: Clone + PartialEq + Debug;
	type Error: Debug;

	fn create_text_node(&self, value: &str) -> Result<Self::Node, Self::Error>;
	fn create_element(&self, tag: &str) -> Result<Self::Node, Self::Error>;
	/// Detaches `node` from its parent, if any.
	fn remove_node(&self, node: &Self::Node) -> Result<(), Self::Error>;

	fn child_nodes(&self, parent: &Self::Node) -> Vec<Self::Node>;
	/// Inserts (or moves) `node` into `parent` right before `reference`, or appends it if `reference` is [`None`].
	fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>) -> Result<(), Self::Error>;
	fn append_child(&self, parent: &Self::Node, node: &Self::Node) -> Result<(), Self::Error> {
		self.insert_before(parent, node, None)
	}

	fn set_text(&self, node: &Self::Node, value: &str) -> Result<(), Self::Error>;

	fn set_attribute(&self, element: &Self::Node, key: &str, value: &str) -> Result<(), Self::Error>;
	/// Removes both the attribute and any same-named property value.
	fn remove_attribute(&self, element: &Self::Node, key: &str) -> Result<(), Self::Error>;
	/// Direct property assignment, used for all attributes without a `data-` prefix.
	fn set_property(&self, element: &Self::Node, key: &str, value: &PropValue) -> Result<(), Self::Error>;

	/// Replaces the element's class list.
	fn set_class(&self, element: &Self::Node, class: &Class) -> Result<(), Self::Error>;
	fn add_classes(&self, element: &Self::Node, tokens: &[&str]) -> Result<(), Self::Error>;
	fn remove_classes(&self, element: &Self::Node, tokens: &[&str]) -> Result<(), Self::Error>;

	fn set_style(&self, element: &Self::Node, key: &str, value: &str) -> Result<(), Self::Error>;
	fn remove_style(&self, element: &Self::Node, key: &str) -> Result<(), Self::Error>;

	fn add_event_listener(&self, element: &Self::Node, event: &str, listener: &Listener) -> Result<(), Self::Error>;
	/// Must detach exactly the `listener` previously attached for `event`.
	fn remove_event_listener(&self, element: &Self::Node, event: &str, listener: &Listener) -> Result<(), Self::Error>;
}
