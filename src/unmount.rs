use crate::{
	node::{ElementNode, FragmentNode, Node, TextNode},
	Error, Host, Result,
};
use tracing::{instrument, trace, trace_span, warn};

/// Detaches `node`'s host nodes, unregisters its listeners and clears all host bindings in the subtree.
///
/// Fragments own no host node, so only their children are detached.
///
/// # Errors
///
/// [`Error::Unbound`] if a text or element node in the subtree isn't mounted.
/// Calling this twice on the same tree is therefore an error.
#[instrument(skip(host, node), fields(kind = node.kind()))]
pub fn unmount<H: Host>(host: &H, node: &mut Node<H::Node>) -> Result<(), H::Error> {
	match node {
		Node::Text(TextNode { binding, .. }) => {
			let text = binding.take().ok_or(Error::<H::Error>::Unbound { kind: "text" })?;
			host.remove_node(&text)?;
		}

		Node::Element(ElementNode {
			tag,
			children,
			binding,
			listeners,
			..
		}) => {
			let span = trace_span!("Unmounting element", %tag);
			let _enter = span.enter();

			let element = binding.take().ok_or(Error::<H::Error>::Unbound { kind: "element" })?;
			host.remove_node(&element)?;

			for child in children {
				unmount(host, child)?;
			}

			if let Some(listeners) = listeners.take() {
				for (event, listener) in &listeners {
					trace!(%event, "Removing event listener.");
					host.remove_event_listener(&element, event, listener)?;
				}
			}
		}

		Node::Fragment(FragmentNode { children, binding }) => {
			for child in children {
				unmount(host, child)?;
			}
			*binding = None;
		}
	}
	Ok(())
}

/// Best-effort teardown of a tree that may be only partially bound, as left behind by a failed [`patch`](`crate::patch`).
///
/// Removes every host node and listener still bound anywhere in `node`, skipping unbound parts and logging host failures instead of stopping.
pub(crate) fn discard<H: Host>(host: &H, node: &mut Node<H::Node>) {
	match node {
		Node::Text(TextNode { binding, .. }) => {
			if let Some(text) = binding.take() {
				if let Err(error) = host.remove_node(&text) {
					warn!(?error, "Failed to remove text node while discarding.");
				}
			}
		}

		Node::Element(ElementNode {
			children,
			binding,
			listeners,
			..
		}) => {
			let element = binding.take();
			if let Some(element) = &element {
				if let Err(error) = host.remove_node(element) {
					warn!(?error, "Failed to remove element while discarding.");
				}
			}

			for child in children {
				discard(host, child);
			}

			if let (Some(element), Some(listeners)) = (&element, listeners.take()) {
				for (event, listener) in &listeners {
					if let Err(error) = host.remove_event_listener(element, event, listener) {
						warn!(?error, %event, "Failed to remove event listener while discarding.");
					}
				}
			}
		}

		Node::Fragment(FragmentNode { children, binding }) => {
			for child in children {
				discard(host, child);
			}
			*binding = None;
		}
	}
}
