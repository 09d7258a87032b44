//! A headless [`Host`] tree kept in memory, with HTML serialization and synthetic events.
//!
//! Useful for tests and anywhere a browser DOM isn't available.

use crate::{Class, Host, Listener, PropValue};
use core::{any::Any, cell::Cell, fmt};
use std::{
	cell::RefCell,
	collections::BTreeMap,
	rc::{Rc, Weak},
};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
	#[error("the reference node is not a child of the parent")]
	NotAChild,
	#[error("expected an element, found a text node")]
	NotAnElement,
	#[error("expected a text node, found an element")]
	NotText,
	#[error("a node can't be inserted into itself or its descendants")]
	Cycle,
}

enum Kind {
	Text(String),
	Element(ElementData),
}

struct ElementData {
	tag: String,
	attributes: BTreeMap<String, String>,
	classes: Vec<String>,
	style: BTreeMap<String, String>,
	listeners: Vec<(String, Listener)>,
}

struct Data {
	kind: Kind,
	children: Vec<NodeRef>,
	parent: Weak<RefCell<Data>>,
}

/// A handle to a node in a [`MemoryHost`] tree. Clones refer to the same node.
#[derive(Clone)]
pub struct NodeRef(Rc<RefCell<Data>>);

impl PartialEq for NodeRef {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Eq for NodeRef {}

impl fmt::Debug for NodeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0.borrow().kind {
			Kind::Text(_) => write!(f, "#text@{:p}", Rc::as_ptr(&self.0)),
			Kind::Element(element) => write!(f, "<{}>@{:p}", element.tag, Rc::as_ptr(&self.0)),
		}
	}
}

/// A synthetic event as passed to listeners by [`NodeRef::dispatch_event`].
#[derive(Debug, Clone)]
pub struct Event {
	pub name: String,
	pub target: NodeRef,
}

impl NodeRef {
	fn new(kind: Kind) -> Self {
		Self(Rc::new(RefCell::new(Data {
			kind,
			children: Vec::new(),
			parent: Weak::new(),
		})))
	}

	fn with_element<R>(&self, f: impl FnOnce(&mut ElementData) -> R) -> Result<R, MemoryError> {
		match &mut self.0.borrow_mut().kind {
			Kind::Element(element) => Ok(f(element)),
			Kind::Text(_) => Err(MemoryError::NotAnElement),
		}
	}

	#[must_use]
	pub fn parent(&self) -> Option<NodeRef> {
		self.0.borrow().parent.upgrade().map(NodeRef)
	}

	#[must_use]
	pub fn children(&self) -> Vec<NodeRef> {
		self.0.borrow().children.clone()
	}

	#[must_use]
	pub fn tag(&self) -> Option<String> {
		match &self.0.borrow().kind {
			Kind::Element(element) => Some(element.tag.clone()),
			Kind::Text(_) => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, key: &str) -> Option<String> {
		match &self.0.borrow().kind {
			Kind::Element(element) => element.attributes.get(key).cloned(),
			Kind::Text(_) => None,
		}
	}

	#[must_use]
	pub fn classes(&self) -> Vec<String> {
		match &self.0.borrow().kind {
			Kind::Element(element) => element.classes.clone(),
			Kind::Text(_) => Vec::new(),
		}
	}

	#[must_use]
	pub fn style(&self, key: &str) -> Option<String> {
		match &self.0.borrow().kind {
			Kind::Element(element) => element.style.get(key).cloned(),
			Kind::Text(_) => None,
		}
	}

	#[must_use]
	pub fn listener_count(&self, event: &str) -> usize {
		match &self.0.borrow().kind {
			Kind::Element(element) => element.listeners.iter().filter(|(name, _)| name == event).count(),
			Kind::Text(_) => 0,
		}
	}

	#[must_use]
	pub fn text_content(&self) -> String {
		let data = self.0.borrow();
		match &data.kind {
			Kind::Text(text) => text.clone(),
			Kind::Element(_) => data.children.iter().map(NodeRef::text_content).collect(),
		}
	}

	/// The first element with the given tag in this subtree (including this node), in document order.
	#[must_use]
	pub fn find(&self, tag: &str) -> Option<NodeRef> {
		if self.tag().as_deref() == Some(tag) {
			return Some(self.clone());
		}
		self.children().iter().find_map(|child| child.find(tag))
	}

	/// Runs the listeners currently attached for `name`, in attachment order.
	///
	/// Listeners added or removed by a running listener take effect for the next dispatch.
	pub fn dispatch_event(&self, name: &str) {
		let listeners: Vec<Listener> = match &self.0.borrow().kind {
			Kind::Element(element) => element.listeners.iter().filter(|(event, _)| event == name).map(|(_, listener)| listener.clone()).collect(),
			Kind::Text(_) => Vec::new(),
		};
		trace!(event = name, listeners = listeners.len(), "Dispatching synthetic event.");

		let event = Event {
			name: name.to_owned(),
			target: self.clone(),
		};
		for listener in listeners {
			listener.call(&event as &dyn Any);
		}
	}

	pub fn click(&self) {
		self.dispatch_event("click");
	}

	#[must_use]
	pub fn inner_html(&self) -> String {
		let mut html = String::new();
		for child in self.children() {
			child.write_html(&mut html);
		}
		html
	}

	#[must_use]
	pub fn outer_html(&self) -> String {
		let mut html = String::new();
		self.write_html(&mut html);
		html
	}

	fn write_html(&self, html: &mut String) {
		let data = self.0.borrow();
		match &data.kind {
			Kind::Text(text) => html.push_str(&escape(text, false)),
			Kind::Element(element) => {
				let mut attributes = element.attributes.clone();
				if !element.classes.is_empty() {
					attributes.insert("class".to_owned(), element.classes.join(" "));
				}
				if !element.style.is_empty() {
					let style: Vec<_> = element.style.iter().map(|(key, value)| format!("{}: {};", key, value)).collect();
					attributes.insert("style".to_owned(), style.join(" "));
				}

				html.push('<');
				html.push_str(&element.tag);
				for (key, value) in &attributes {
					html.push_str(&format!(" {}=\"{}\"", key, escape(value, true)));
				}
				html.push('>');
				for child in &data.children {
					child.write_html(html);
				}
				html.push_str("</");
				html.push_str(&element.tag);
				html.push('>');
			}
		}
	}

	fn is_inclusive_ancestor_of(&self, other: &NodeRef) -> bool {
		let mut current = Some(other.clone());
		while let Some(node) = current {
			if node == *self {
				return true;
			}
			current = node.parent();
		}
		false
	}

	fn detach(&self) {
		if let Some(parent) = self.parent() {
			parent.0.borrow_mut().children.retain(|child| child != self);
		}
		self.0.borrow_mut().parent = Weak::new();
	}
}

fn escape(text: &str, attribute: bool) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' if attribute => escaped.push_str("&quot;"),
			c => escaped.push(c),
		}
	}
	escaped
}

/// Creates [`NodeRef`]s and counts how many it created.
#[derive(Debug, Default)]
pub struct MemoryHost {
	created: Cell<usize>,
}

impl MemoryHost {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// A detached element to mount into, not counted by [`created`](`MemoryHost::created`).
	#[must_use]
	pub fn root(&self, tag: &str) -> NodeRef {
		NodeRef::new(Kind::Element(ElementData {
			tag: tag.to_owned(),
			attributes: BTreeMap::new(),
			classes: Vec::new(),
			style: BTreeMap::new(),
			listeners: Vec::new(),
		}))
	}

	/// How many text nodes and elements were created through [`Host`] so far.
	#[must_use]
	pub fn created(&self) -> usize {
		self.created.get()
	}
}

impl Host for MemoryHost {
	type Node = NodeRef;
	type Error = MemoryError;

	fn create_text_node(&self, value: &str) -> Result<NodeRef, MemoryError> {
		self.created.set(self.created.get() + 1);
		Ok(NodeRef::new(Kind::Text(value.to_owned())))
	}

	fn create_element(&self, tag: &str) -> Result<NodeRef, MemoryError> {
		self.created.set(self.created.get() + 1);
		Ok(self.root(tag))
	}

	fn remove_node(&self, node: &NodeRef) -> Result<(), MemoryError> {
		node.detach();
		Ok(())
	}

	fn child_nodes(&self, parent: &NodeRef) -> Vec<NodeRef> {
		parent.children()
	}

	fn insert_before(&self, parent: &NodeRef, node: &NodeRef, reference: Option<&NodeRef>) -> Result<(), MemoryError> {
		if reference == Some(node) {
			return Ok(());
		}
		if node.is_inclusive_ancestor_of(parent) {
			return Err(MemoryError::Cycle);
		}
		if let Some(reference) = reference {
			if reference.parent().as_ref() != Some(parent) {
				return Err(MemoryError::NotAChild);
			}
		}

		node.detach();
		let mut parent_data = parent.0.borrow_mut();
		let index = match reference {
			Some(reference) => parent_data.children.iter().position(|child| child == reference).ok_or(MemoryError::NotAChild)?,
			None => parent_data.children.len(),
		};
		parent_data.children.insert(index, node.clone());
		node.0.borrow_mut().parent = Rc::downgrade(&parent.0);
		Ok(())
	}

	fn set_text(&self, node: &NodeRef, value: &str) -> Result<(), MemoryError> {
		match &mut node.0.borrow_mut().kind {
			Kind::Text(text) => {
				*text = value.to_owned();
				Ok(())
			}
			Kind::Element(_) => Err(MemoryError::NotText),
		}
	}

	fn set_attribute(&self, element: &NodeRef, key: &str, value: &str) -> Result<(), MemoryError> {
		element.with_element(|element| {
			element.attributes.insert(key.to_owned(), value.to_owned());
		})
	}

	fn remove_attribute(&self, element: &NodeRef, key: &str) -> Result<(), MemoryError> {
		element.with_element(|element| {
			element.attributes.remove(key);
		})
	}

	/// Properties are reflected as attributes. `false` and [`PropValue::Null`] remove the attribute.
	fn set_property(&self, element: &NodeRef, key: &str, value: &PropValue) -> Result<(), MemoryError> {
		element.with_element(|element| match value {
			PropValue::Text(text) => {
				element.attributes.insert(key.to_owned(), text.clone());
			}
			PropValue::Number(number) => {
				element.attributes.insert(key.to_owned(), number.to_string());
			}
			PropValue::Bool(true) => {
				element.attributes.insert(key.to_owned(), String::new());
			}
			PropValue::Bool(false) | PropValue::Null => {
				element.attributes.remove(key);
			}
		})
	}

	fn set_class(&self, element: &NodeRef, class: &Class) -> Result<(), MemoryError> {
		element.with_element(|element| element.classes = class.tokens().into_iter().map(str::to_owned).collect())
	}

	fn add_classes(&self, element: &NodeRef, tokens: &[&str]) -> Result<(), MemoryError> {
		element.with_element(|element| {
			for &token in tokens {
				if !element.classes.iter().any(|class| class == token) {
					element.classes.push(token.to_owned());
				}
			}
		})
	}

	fn remove_classes(&self, element: &NodeRef, tokens: &[&str]) -> Result<(), MemoryError> {
		element.with_element(|element| element.classes.retain(|class| !tokens.contains(&class.as_str())))
	}

	fn set_style(&self, element: &NodeRef, key: &str, value: &str) -> Result<(), MemoryError> {
		element.with_element(|element| {
			element.style.insert(key.to_owned(), value.to_owned());
		})
	}

	fn remove_style(&self, element: &NodeRef, key: &str) -> Result<(), MemoryError> {
		element.with_element(|element| {
			element.style.remove(key);
		})
	}

	/// Like the DOM, attaching the same listener for the same event twice has no effect.
	fn add_event_listener(&self, element: &NodeRef, event: &str, listener: &Listener) -> Result<(), MemoryError> {
		element.with_element(|element| {
			if !element.listeners.iter().any(|(name, existing)| name == event && existing == listener) {
				element.listeners.push((event.to_owned(), listener.clone()));
			}
		})
	}

	fn remove_event_listener(&self, element: &NodeRef, event: &str, listener: &Listener) -> Result<(), MemoryError> {
		element.with_element(|element| element.listeners.retain(|(name, existing)| !(name == event && existing == listener)))
	}
}
