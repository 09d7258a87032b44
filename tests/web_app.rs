#![cfg(target_arch = "wasm32")]

use std::sync::Once;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{HtmlElement, MouseEvent};
use xylem::{element, mount, patch, reducer, text, unmount, web::WebHost, App, Emitter, Listener, Node, Props};

wasm_bindgen_test_configure!(run_in_browser);

static LOG_INIT: Once = Once::new();

fn container(host: &WebHost) -> web_sys::Node {
	LOG_INIT.call_once(tracing_wasm::set_as_global_default);

	let document = host.document();
	let container = document.create_element("div").unwrap();
	document.body().unwrap().append_child(&container).unwrap();
	container.into()
}

fn inner_html(node: &web_sys::Node) -> String {
	node.dyn_ref::<web_sys::Element>().unwrap().inner_html()
}

#[wasm_bindgen_test]
fn create_and_remove() {
	let host = WebHost::from_window().unwrap();
	let parent = container(&host);

	let mut vdom: Node<web_sys::Node> = element(
		"div",
		Props::new().attr("id", "created").attr("data-kind", "test").class("a b").style("color", "red"),
		vec![text("Hello xylem!").into()],
	);
	mount(&host, &mut vdom, &parent, None).unwrap();
	assert_eq!(
		inner_html(&parent),
		r#"<div class="a b" style="color: red;" data-kind="test" id="created">Hello xylem!</div>"#
	);

	unmount(&host, &mut vdom).unwrap();
	assert_eq!(inner_html(&parent), "");
}

#[wasm_bindgen_test]
fn patch_keeps_elements() {
	let host = WebHost::from_window().unwrap();
	let parent = container(&host);

	let mut old: Node<web_sys::Node> = element("p", Props::new().class("old"), vec!["before".into()]);
	mount(&host, &mut old, &parent, None).unwrap();
	let p = parent.first_child().unwrap();

	let mut new: Node<web_sys::Node> = element("p", Props::new().class("new"), vec!["after".into()]);
	patch(&host, &mut old, &mut new, &parent).unwrap();
	assert_eq!(inner_html(&parent), r#"<p class="new">after</p>"#);
	assert_eq!(parent.first_child(), Some(p));
}

#[wasm_bindgen_test]
fn click() {
	let host = WebHost::from_window().unwrap();
	let parent = container(&host);

	let app = App::new(
		host,
		|count: &u32, emitter: &Emitter<()>| -> Node<web_sys::Node> {
			let emitter = emitter.clone();
			element(
				"button",
				Props::new().on(
					"click",
					Listener::new(move |event| {
						assert!(event.downcast_ref::<web_sys::Event>().is_some());
						emitter.emit("increment", ());
					}),
				),
				vec![count.to_string().into()],
			)
		},
		0,
		vec![("increment", reducer(|count: &u32, _: &()| count + 1))],
	);
	app.mount(parent.clone()).unwrap();

	let button: HtmlElement = parent.first_child().unwrap().dyn_into().unwrap();
	button.click();
	button.click();
	assert_eq!(inner_html(&parent), "<button>2</button>");

	let event = MouseEvent::new("click").unwrap();
	button.dispatch_event(&event).unwrap();
	assert_eq!(app.with_state(|count| *count), 3);

	app.unmount().unwrap();
	button.click();
	assert_eq!(app.with_state(|count| *count), 3);
}
