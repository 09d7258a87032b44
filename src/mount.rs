use crate::{
	node::{ElementNode, FragmentNode, Listener, Node, PropValue, TextNode},
	redact, Host, Result,
};
use std::collections::BTreeMap;
use tracing::{instrument, trace, trace_span};

/// Creates host nodes for `node` and its descendants and inserts them into `parent`.
///
/// With `index`, the new host node is inserted before the child currently at that position,
/// or appended if there is none. Without, it is appended.
/// A fragment mounted at `k` places its host nodes at `k`, `k + 1`, and so on.
///
/// Each node's host binding is recorded on it, as is each element's listener table.
///
/// # Errors
///
/// Host failures are returned as they occur, which may leave the tree partially mounted.
#[instrument(skip(host, node, parent), fields(kind = node.kind()))]
pub fn mount<H: Host>(host: &H, node: &mut Node<H::Node>, parent: &H::Node, index: Option<usize>) -> Result<(), H::Error> {
	mount_counted(host, node, parent, index).map(drop)
}

/// Returns how many host nodes were inserted directly into `parent`.
fn mount_counted<H: Host>(host: &H, node: &mut Node<H::Node>, parent: &H::Node, index: Option<usize>) -> Result<usize, H::Error> {
	match node {
		Node::Text(TextNode { value, binding }) => {
			let span = trace_span!("Mounting text node", value = redact(value), ?index);
			let _enter = span.enter();
			let text = host.create_text_node(value)?;
			*binding = Some(text.clone());
			insert_at(host, parent, &text, index)?;
			Ok(1)
		}

		Node::Element(ElementNode {
			tag,
			props,
			children,
			binding,
			listeners,
		}) => {
			let span = trace_span!("Mounting element", %tag, ?index);
			let _enter = span.enter();
			let element = host.create_element(tag)?;

			*listeners = Some(add_event_listeners(host, &element, &props.on)?);

			if let Some(class) = &props.class {
				if !class.tokens().is_empty() {
					host.set_class(&element, class)?;
				}
			}

			for (key, value) in &props.style {
				trace!(key = %key, value = redact(value), "Setting style.");
				host.set_style(&element, key, value)?;
			}

			for (key, value) in &props.attributes {
				set_attribute(host, &element, key, value)?;
			}

			*binding = Some(element.clone());

			for child in children {
				mount_counted(host, child, &element, None)?;
			}

			insert_at(host, parent, &element, index)?;
			Ok(1)
		}

		Node::Fragment(FragmentNode { children, binding }) => {
			let span = trace_span!("Mounting fragment", children = children.len(), ?index);
			let _enter = span.enter();
			*binding = Some(parent.clone());

			let mut inserted = 0;
			for child in children {
				inserted += mount_counted(host, child, parent, index.map(|index| index + inserted))?;
			}
			Ok(inserted)
		}
	}
}

fn add_event_listeners<H: Host>(host: &H, element: &H::Node, on: &BTreeMap<String, Listener>) -> Result<BTreeMap<String, Listener>, H::Error> {
	let mut added = BTreeMap::new();
	for (event, listener) in on {
		trace!(%event, "Adding event listener.");
		host.add_event_listener(element, event, listener)?;
		added.insert(event.clone(), listener.clone());
	}
	Ok(added)
}

/// Applies one plain attribute: [`PropValue::Null`] removes it, `data-` keys use the attribute path, everything else is assigned as property.
pub(crate) fn set_attribute<H: Host>(host: &H, element: &H::Node, key: &str, value: &PropValue) -> Result<(), H::Error> {
	match value {
		PropValue::Null => {
			trace!(key, "Removing attribute.");
			host.remove_attribute(element, key)?;
		}
		value if key.starts_with("data-") => {
			trace!(key, value = redact(&value.to_string()), "Setting data attribute.");
			host.set_attribute(element, key, &value.to_string())?;
		}
		value => {
			trace!(key, value = redact(&value.to_string()), "Setting property.");
			host.set_property(element, key, value)?;
		}
	}
	Ok(())
}

/// Inserts `node` before `parent`'s child at `index`, or appends it if `index` is [`None`] or past the end.
pub(crate) fn insert_at<H: Host>(host: &H, parent: &H::Node, node: &H::Node, index: Option<usize>) -> Result<(), H::Error> {
	let reference = index.and_then(|index| host.child_nodes(parent).into_iter().nth(index));
	host.insert_before(parent, node, reference.as_ref())?;
	Ok(())
}
