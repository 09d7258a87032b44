//! The abstract tree: [`Node`]s, their [`Props`] and the normalizing constructors [`element`], [`text`] and [`fragment`].

use core::{any::Any, fmt, ptr};
use std::{collections::BTreeMap, rc::Rc};

/// An abstract UI node, bound to host nodes of type `N` once mounted.
#[derive(Debug)]
pub enum Node<N> {
	Text(TextNode<N>),
	Element(ElementNode<N>),
	Fragment(FragmentNode<N>),
}

#[derive(Debug)]
pub struct TextNode<N> {
	pub value: String,
	pub(crate) binding: Option<N>,
}

#[derive(Debug)]
pub struct ElementNode<N> {
	pub tag: String,
	pub props: Props,
	pub children: Vec<Node<N>>,
	pub(crate) binding: Option<N>,
	/// The handlers currently attached to the host element, by event name.
	pub(crate) listeners: Option<BTreeMap<String, Listener>>,
}

/// Fragments own no host node. Their binding is the host parent they were mounted into.
#[derive(Debug)]
pub struct FragmentNode<N> {
	pub children: Vec<Node<N>>,
	pub(crate) binding: Option<N>,
}

impl<N> Node<N> {
	#[must_use]
	pub fn kind(&self) -> &'static str {
		match self {
			Node::Text(_) => "text",
			Node::Element(_) => "element",
			Node::Fragment(_) => "fragment",
		}
	}

	/// The host node this node is bound to, or the host parent for fragments.
	#[must_use]
	pub fn binding(&self) -> Option<&N> {
		match self {
			Node::Text(TextNode { binding, .. }) | Node::Element(ElementNode { binding, .. }) | Node::Fragment(FragmentNode { binding, .. }) => binding.as_ref(),
		}
	}

	pub(crate) fn binding_mut(&mut self) -> &mut Option<N> {
		match self {
			Node::Text(TextNode { binding, .. }) | Node::Element(ElementNode { binding, .. }) | Node::Fragment(FragmentNode { binding, .. }) => binding,
		}
	}

	/// The listener table of a mounted element.
	#[must_use]
	pub fn listeners(&self) -> Option<&BTreeMap<String, Listener>> {
		match self {
			Node::Element(element) => element.listeners.as_ref(),
			Node::Text(_) | Node::Fragment(_) => None,
		}
	}

	#[must_use]
	pub fn children(&self) -> &[Node<N>] {
		match self {
			Node::Text(_) => &[],
			Node::Element(ElementNode { children, .. }) | Node::Fragment(FragmentNode { children, .. }) => children,
		}
	}

	pub(crate) fn children_mut(&mut self) -> &mut [Node<N>] {
		match self {
			Node::Text(_) => &mut [],
			Node::Element(ElementNode { children, .. }) | Node::Fragment(FragmentNode { children, .. }) => children,
		}
	}

	/// Whether a host node mounted for `self` can be reused for `other`.
	///
	/// Texts are always compatible with each other, as are fragments.
	/// Elements are compatible if their tags match exactly.
	#[must_use]
	pub fn is_compatible<M>(&self, other: &Node<M>) -> bool {
		match (self, other) {
			(Node::Text(_), Node::Text(_)) | (Node::Fragment(_), Node::Fragment(_)) => true,
			(Node::Element(a), Node::Element(b)) => a.tag == b.tag,
			_ => false,
		}
	}

	/// `true` iff neither this node nor any of its descendants holds a host binding.
	#[must_use]
	pub fn is_unbound(&self) -> bool {
		self.binding().is_none() && self.listeners().is_none() && self.children().iter().all(Node::is_unbound)
	}
}

/// Inlines fragment children (transitively) into a flat child list.
///
/// Fragments are transparent for diffing: a fragment child contributes its own children directly.
pub fn flatten_children<N>(children: &mut [Node<N>]) -> Vec<&mut Node<N>> {
	let mut flat = Vec::with_capacity(children.len());
	flatten_into(children, &mut flat);
	flat
}

fn flatten_into<'a, N>(children: &'a mut [Node<N>], flat: &mut Vec<&'a mut Node<N>>) {
	for child in children {
		match child {
			Node::Fragment(FragmentNode { children, .. }) => flatten_into(children, flat),
			other => flat.push(other),
		}
	}
}

/// An element property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
	Text(String),
	Bool(bool),
	Number(f64),
	/// Removes the attribute when applied.
	Null,
}

impl fmt::Display for PropValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PropValue::Text(text) => f.write_str(text),
			PropValue::Bool(value) => write!(f, "{}", value),
			PropValue::Number(value) => write!(f, "{}", value),
			PropValue::Null => Ok(()),
		}
	}
}

impl From<&str> for PropValue {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}
impl From<String> for PropValue {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}
impl From<bool> for PropValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<f64> for PropValue {
	fn from(number: f64) -> Self {
		Self::Number(number)
	}
}
impl From<i32> for PropValue {
	fn from(number: i32) -> Self {
		Self::Number(number.into())
	}
}
impl<T: Into<PropValue>> From<Option<T>> for PropValue {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

/// The `class` prop, either as one whitespace-separated string or as a list of tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Class {
	Str(String),
	List(Vec<String>),
}

impl Class {
	/// The non-blank class tokens, in order.
	#[must_use]
	pub fn tokens(&self) -> Vec<&str> {
		match self {
			Class::Str(class) => class.split_whitespace().collect(),
			Class::List(list) => list.iter().map(String::as_str).filter(|token| !token.trim().is_empty()).collect(),
		}
	}
}

impl From<&str> for Class {
	fn from(class: &str) -> Self {
		Self::Str(class.to_owned())
	}
}
impl From<String> for Class {
	fn from(class: String) -> Self {
		Self::Str(class)
	}
}
impl From<Vec<String>> for Class {
	fn from(list: Vec<String>) -> Self {
		Self::List(list)
	}
}
impl<const L: usize> From<[&str; L]> for Class {
	fn from(list: [&str; L]) -> Self {
		Self::List(list.iter().map(|&token| token.to_owned()).collect())
	}
}

/// An event handler.
///
/// Listeners compare by identity: two clones of the same [`Listener`] are equal, two separately created ones never are.
/// The host passes its native event object as `&dyn Any`.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&dyn Any)>);

impl Listener {
	pub fn new(handler: impl 'static + Fn(&dyn Any)) -> Self {
		Self(Rc::new(handler))
	}

	pub fn call(&self, event: &dyn Any) {
		(self.0)(event)
	}

	/// An address identifying this handler, stable for as long as any clone is alive.
	#[must_use]
	pub fn id(&self) -> *const () {
		Rc::as_ptr(&self.0).cast::<()>()
	}
}

impl PartialEq for Listener {
	fn eq(&self, other: &Self) -> bool {
		ptr::eq(self.id(), other.id())
	}
}
impl Eq for Listener {}

impl fmt::Debug for Listener {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Listener").field(&self.id()).finish()
	}
}

/// Element props, split by how they are applied to the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
	/// Plain attributes. Keys with a `data-` prefix go through the host's attribute path, all others are assigned as properties.
	pub attributes: BTreeMap<String, PropValue>,
	pub class: Option<Class>,
	pub style: BTreeMap<String, String>,
	pub on: BTreeMap<String, Listener>,
}

impl Props {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn attr(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
		self.attributes.insert(key.into(), value.into());
		self
	}

	#[must_use]
	pub fn class(mut self, class: impl Into<Class>) -> Self {
		self.class = Some(class.into());
		self
	}

	#[must_use]
	pub fn style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.style.insert(key.into(), value.into());
		self
	}

	#[must_use]
	pub fn on(mut self, event: impl Into<String>, listener: Listener) -> Self {
		self.on.insert(event.into(), listener);
		self
	}
}

/// A raw child as accepted by [`element`] and [`fragment`].
#[derive(Debug)]
pub enum Child<N> {
	Node(Node<N>),
	/// Lifted to a [`Node::Text`].
	Text(String),
	/// Dropped.
	Nothing,
}

impl<N> From<Node<N>> for Child<N> {
	fn from(node: Node<N>) -> Self {
		Self::Node(node)
	}
}
impl<N> From<&str> for Child<N> {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}
impl<N> From<String> for Child<N> {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}
impl<N, T: Into<Child<N>>> From<Option<T>> for Child<N> {
	fn from(child: Option<T>) -> Self {
		child.map_or(Self::Nothing, Into::into)
	}
}

fn normalize<N>(children: impl IntoIterator<Item = Child<N>>) -> Vec<Node<N>> {
	children
		.into_iter()
		.filter_map(|child| match child {
			Child::Node(node) => Some(node),
			Child::Text(value) => Some(text(value)),
			Child::Nothing => None,
		})
		.collect()
}

pub fn element<N>(tag: impl Into<String>, props: Props, children: impl IntoIterator<Item = Child<N>>) -> Node<N> {
	Node::Element(ElementNode {
		tag: tag.into(),
		props,
		children: normalize(children),
		binding: None,
		listeners: None,
	})
}

pub fn text<N>(value: impl Into<String>) -> Node<N> {
	Node::Text(TextNode { value: value.into(), binding: None })
}

pub fn fragment<N>(children: impl IntoIterator<Item = Child<N>>) -> Node<N> {
	Node::Fragment(FragmentNode {
		children: normalize(children),
		binding: None,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	type TestNode = Node<()>;

	#[test]
	fn children_are_normalized() {
		let child: TestNode = element("span", Props::new(), []);
		let node: TestNode = element("div", Props::new(), [Child::Nothing, "x".into(), None::<&str>.into(), child.into()]);

		let children = node.children();
		assert_eq!(children.len(), 2);
		assert!(matches!(&children[0], Node::Text(TextNode { value, .. }) if value == "x"));
		assert!(matches!(&children[1], Node::Element(ElementNode { tag, .. }) if tag == "span"));
	}

	#[test]
	fn fragment_children_are_normalized() {
		let node: TestNode = fragment([Child::Nothing, "a".into(), "b".into()]);
		assert_eq!(node.children().len(), 2);
		assert!(node.children().iter().all(|child| matches!(child, Node::Text(_))));
	}

	#[test]
	fn compatibility() {
		let a: TestNode = text("test");
		let b: TestNode = text("hallo");
		assert!(a.is_compatible(&b));

		let f1: TestNode = fragment(["hallo".into()]);
		let f2: TestNode = fragment(["hola".into()]);
		assert!(f1.is_compatible(&f2));
		assert!(!a.is_compatible(&f1));

		let p1: TestNode = element("p", Props::new(), ["Paragraph 1".into()]);
		let p2: TestNode = element("p", Props::new(), ["Paragraph 2".into()]);
		let span: TestNode = element("span", Props::new(), ["Paragraph 2".into()]);
		assert!(p2.is_compatible(&p1));
		assert!(!span.is_compatible(&p1));
	}

	#[test]
	fn flattening_inlines_nested_fragments() {
		let mut children: Vec<TestNode> = vec![
			text("a"),
			fragment(["b".into(), fragment::<()>(["c".into()]).into()]),
			element("p", Props::new(), ["d".into()]),
		];
		let flat = flatten_children(&mut children);
		let kinds: Vec<_> = flat.iter().map(|node| node.kind()).collect();
		assert_eq!(kinds, ["text", "text", "text", "element"]);
	}

	#[test]
	fn class_tokens() {
		assert_eq!(Class::from(" foo  bar ").tokens(), ["foo", "bar"]);
		assert_eq!(Class::from(["foo", "", " ", "bar"]).tokens(), ["foo", "bar"]);
	}

	#[test]
	fn listeners_compare_by_identity() {
		let a = Listener::new(|_| ());
		let b = Listener::new(|_| ());
		assert_eq!(a, a.clone());
		assert_ne!(a, b);
	}
}
