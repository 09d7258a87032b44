use std::{cell::Cell, rc::Rc};
use xylem::{
	element, fragment,
	memory::{MemoryHost, NodeRef},
	mount, text, unmount, Error, Listener, Node, Props,
};

type VNode = Node<NodeRef>;

#[test]
fn leaves_an_empty_parent() {
	let host = MemoryHost::new();
	let root = host.root("body");
	let mut node: VNode = element(
		"div",
		Props::new().class("a"),
		vec![
			"text".into(),
			fragment::<NodeRef>(vec![element("span", Props::new(), vec!["inner".into()]).into()]).into(),
		],
	);
	mount(&host, &mut node, &root, None).unwrap();
	assert_eq!(root.inner_html(), r#"<div class="a">text<span>inner</span></div>"#);

	unmount(&host, &mut node).unwrap();
	assert_eq!(root.inner_html(), "");
	assert!(node.is_unbound());
}

#[test]
fn fragment_siblings_stay() {
	let host = MemoryHost::new();
	let root = host.root("body");
	let mut before: VNode = text("before");
	let mut node: VNode = fragment(vec!["a".into(), "b".into()]);
	let mut after: VNode = text("after");
	mount(&host, &mut before, &root, None).unwrap();
	mount(&host, &mut node, &root, None).unwrap();
	mount(&host, &mut after, &root, None).unwrap();

	unmount(&host, &mut node).unwrap();
	assert_eq!(root.inner_html(), "beforeafter");
	assert!(node.is_unbound());
}

#[test]
fn listeners_are_detached() {
	let host = MemoryHost::new();
	let root = host.root("body");
	let clicks = Rc::new(Cell::new(0));
	let listener = {
		let clicks = Rc::clone(&clicks);
		Listener::new(move |_| clicks.set(clicks.get() + 1))
	};
	let mut node: VNode = element("button", Props::new().on("click", listener), vec![]);
	mount(&host, &mut node, &root, None).unwrap();
	let button = root.find("button").unwrap();

	unmount(&host, &mut node).unwrap();
	assert_eq!(button.listener_count("click"), 0);
	button.click();
	assert_eq!(clicks.get(), 0);
	assert!(node.listeners().is_none());
}

#[test]
fn unbound_nodes_are_rejected() {
	let host = MemoryHost::new();
	let root = host.root("body");

	let mut never_mounted: VNode = text("x");
	assert!(matches!(unmount(&host, &mut never_mounted), Err(Error::Unbound { kind: "text" })));

	let mut node: VNode = element("p", Props::new(), vec![]);
	mount(&host, &mut node, &root, None).unwrap();
	unmount(&host, &mut node).unwrap();
	assert!(matches!(unmount(&host, &mut node), Err(Error::Unbound { kind: "element" })));
}
