use crate::{
	keys::diff_keys,
	mount::{mount, set_attribute},
	node::{flatten_children, Class, ElementNode, Node},
	redact,
	sequence::{diff_sequence, DiffOp},
	unmount::unmount,
	Error, Host, Result,
};
use tracing::{instrument, trace, trace_span};

/// Reconciles the live host tree from `old` (which must be mounted) to `new`.
///
/// Compatible nodes (see [`Node::is_compatible`]) keep their host node:
/// its binding moves from `old` to `new`, and only text, attributes, classes, styles and listeners that differ are touched.
/// Children are matched after inlining fragments, using [`diff_sequence`], so unchanged or moved children are patched rather than recreated.
/// An incompatible `new` replaces `old` at the same position in `parent`.
///
/// `old` is left partially unbound afterwards and should be discarded.
///
/// # Errors
///
/// [`Error::Unbound`] if `old` (or a reused descendant) isn't mounted, and any host failure.
#[instrument(skip(host, old, new, parent), fields(old.kind = old.kind(), new.kind = new.kind()))]
pub fn patch<H: Host>(host: &H, old: &mut Node<H::Node>, new: &mut Node<H::Node>, parent: &H::Node) -> Result<(), H::Error> {
	if !old.is_compatible(new) {
		let span = trace_span!("Replacing incompatible node");
		let _enter = span.enter();
		let index = old.binding().and_then(|bound| host.child_nodes(parent).iter().position(|child| child == bound));
		unmount(host, old)?;
		return mount(host, new, parent, index);
	}

	let kind = old.kind();
	let binding = old.binding_mut().take().ok_or(Error::<H::Error>::Unbound { kind })?;
	*new.binding_mut() = Some(binding.clone());

	match (&mut *old, &mut *new) {
		(Node::Text(old), Node::Text(new)) => {
			if old.value != new.value {
				trace!(old = redact(&old.value), new = redact(&new.value), "Updating text.");
				host.set_text(&binding, &new.value)?;
			}
			return Ok(());
		}
		(Node::Element(old), Node::Element(new)) => patch_element(host, &binding, old, new)?,
		_ => (),
	}

	patch_children(host, old, new, &binding)
}

#[allow(clippy::similar_names)]
fn patch_element<H: Host>(host: &H, element: &H::Node, old: &mut ElementNode<H::Node>, new: &mut ElementNode<H::Node>) -> Result<(), H::Error> {
	let span = trace_span!("Patching element", tag = %new.tag);
	let _enter = span.enter();

	let attributes = diff_keys(Some(&old.props.attributes), Some(&new.props.attributes));
	for key in &attributes.removed {
		trace!(%key, "Removing attribute.");
		host.remove_attribute(element, key)?;
	}
	for key in attributes.to_set() {
		set_attribute(host, element, key, &new.props.attributes[key])?;
	}

	let old_tokens = old.props.class.as_ref().map_or_else(Vec::new, Class::tokens);
	let new_tokens = new.props.class.as_ref().map_or_else(Vec::new, Class::tokens);
	let mut added = Vec::new();
	let mut removed = Vec::new();
	for op in diff_sequence(&old_tokens, &new_tokens, |a, b| a == b) {
		match op {
			DiffOp::Add { item, .. } if !old_tokens.contains(&item) => added.push(item),
			DiffOp::Remove { item, .. } if !new_tokens.contains(&item) => removed.push(item),
			_ => (),
		}
	}
	if !added.is_empty() {
		trace!(?added, "Adding classes.");
		host.add_classes(element, &added)?;
	}
	if !removed.is_empty() {
		trace!(?removed, "Removing classes.");
		host.remove_classes(element, &removed)?;
	}

	let style = diff_keys(Some(&old.props.style), Some(&new.props.style));
	for key in &style.removed {
		trace!(%key, "Removing style.");
		host.remove_style(element, key)?;
	}
	for key in style.to_set() {
		let value = &new.props.style[key];
		trace!(%key, value = redact(value), "Setting style.");
		host.set_style(element, key, value)?;
	}

	let events = diff_keys(Some(&old.props.on), Some(&new.props.on));
	let mut listeners = old.listeners.take().unwrap_or_default();
	for event in events.to_unset() {
		if let Some(listener) = listeners.remove(event) {
			trace!(%event, "Removing event listener.");
			host.remove_event_listener(element, event, &listener)?;
		}
	}
	for event in events.to_set() {
		let listener = &new.props.on[event];
		trace!(%event, "Adding event listener.");
		host.add_event_listener(element, event, listener)?;
		listeners.insert(event.clone(), listener.clone());
	}
	new.listeners = Some(listeners);

	Ok(())
}

/// Identifies a child on either side of a children diff.
#[derive(Debug, Clone, Copy)]
enum Slot {
	Old(usize),
	New(usize),
}

fn resolve<'a, N>(old: &'a [&mut Node<N>], new: &'a [&mut Node<N>], slot: Slot) -> &'a Node<N> {
	match slot {
		Slot::Old(i) => &*old[i],
		Slot::New(i) => &*new[i],
	}
}

fn patch_children<H: Host>(host: &H, old: &mut Node<H::Node>, new: &mut Node<H::Node>, parent: &H::Node) -> Result<(), H::Error> {
	bind_fragments(new.children_mut(), parent);
	let mut old_children = flatten_children(old.children_mut());
	let mut new_children = flatten_children(new.children_mut());

	let ops = {
		let old_slots: Vec<_> = (0..old_children.len()).map(Slot::Old).collect();
		let new_slots: Vec<_> = (0..new_children.len()).map(Slot::New).collect();
		diff_sequence(&old_slots, &new_slots, |a, b| {
			resolve(&old_children, &new_children, *a).is_compatible(resolve(&old_children, &new_children, *b))
		})
	};

	let span = trace_span!("Patching children", old = old_children.len(), new = new_children.len(), ops = ops.len());
	let _enter = span.enter();

	for op in ops {
		match op {
			DiffOp::Add { index, .. } => {
				mount(host, &mut *new_children[index], parent, Some(index))?;
			}
			DiffOp::Remove { item: Slot::Old(i), .. } => {
				unmount(host, &mut *old_children[i])?;
			}
			DiffOp::Remove { item: Slot::New(_), .. } => unreachable!("Only old children are ever removed."),
			DiffOp::Move { original_index, index, .. } => {
				let moved = old_children[original_index]
					.binding()
					.cloned()
					.ok_or(Error::<H::Error>::Unbound { kind: old_children[original_index].kind() })?;
				let reference = host.child_nodes(parent).into_iter().nth(index);
				if reference.as_ref() != Some(&moved) {
					trace!(original_index, index, "Moving child.");
					host.insert_before(parent, &moved, reference.as_ref())?;
				}
				patch(host, &mut *old_children[original_index], &mut *new_children[index], parent)?;
			}
			DiffOp::Noop { original_index, index, .. } => {
				patch(host, &mut *old_children[original_index], &mut *new_children[index], parent)?;
			}
		}
	}
	Ok(())
}

/// Fragments are inlined for diffing and never mounted themselves, so they are bound to the host parent here.
fn bind_fragments<N: Clone>(children: &mut [Node<N>], parent: &N) {
	for child in children {
		if let Node::Fragment(fragment) = child {
			fragment.binding = Some(parent.clone());
			bind_fragments(&mut fragment.children, parent);
		}
	}
}
