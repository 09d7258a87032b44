//! The browser DOM as [`Host`], through [`web_sys`].

use crate::{rc_hash_map::RcHashMap, Class, Host, Listener, PropValue};
use core::{cell::RefCell, fmt};
use js_sys::Reflect;
use tracing::{instrument, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

type ListenerClosure = Closure<dyn Fn(web_sys::Event)>;

/// Creates DOM nodes in one [`web_sys::Document`].
///
/// Each distinct [`Listener`] is wrapped into exactly one JavaScript function, shared by all elements and events it's attached to
/// and dropped once it isn't attached anywhere anymore.
/// Listeners still attached when the [`WebHost`] is dropped will throw into JavaScript when called.
pub struct WebHost {
	document: web_sys::Document,
	listeners: RefCell<RcHashMap<*const (), u16, ListenerClosure>>,
}

impl fmt::Debug for WebHost {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebHost")
			.field("document", &self.document)
			.field("listeners", &self.listeners.borrow().len())
			.finish()
	}
}

impl WebHost {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			listeners: RefCell::default(),
		}
	}

	/// The current window's document, if there is one.
	#[must_use]
	pub fn from_window() -> Option<Self> {
		web_sys::window()?.document().map(Self::new)
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}
}

fn as_element(node: &web_sys::Node) -> Result<&web_sys::Element, JsValue> {
	node.dyn_ref().ok_or_else(|| JsValue::from_str("expected an element"))
}

fn as_html_element(node: &web_sys::Node) -> Result<&web_sys::HtmlElement, JsValue> {
	node.dyn_ref().ok_or_else(|| JsValue::from_str("expected an HTML element"))
}

fn to_js(value: &PropValue) -> JsValue {
	match value {
		PropValue::Text(text) => JsValue::from_str(text),
		PropValue::Bool(bool_value) => JsValue::from_bool(*bool_value),
		PropValue::Number(number) => JsValue::from_f64(*number),
		PropValue::Null => JsValue::NULL,
	}
}

impl Host for WebHost {
	type Node = web_sys::Node;
	type Error = JsValue;

	fn create_text_node(&self, value: &str) -> Result<web_sys::Node, JsValue> {
		Ok(self.document.create_text_node(value).into())
	}

	fn create_element(&self, tag: &str) -> Result<web_sys::Node, JsValue> {
		self.document.create_element(tag).map(Into::into)
	}

	fn remove_node(&self, node: &web_sys::Node) -> Result<(), JsValue> {
		if let Some(parent) = node.parent_node() {
			parent.remove_child(node)?;
		}
		Ok(())
	}

	fn child_nodes(&self, parent: &web_sys::Node) -> Vec<web_sys::Node> {
		let list = parent.child_nodes();
		(0..list.length()).filter_map(|i| list.item(i)).collect()
	}

	fn insert_before(&self, parent: &web_sys::Node, node: &web_sys::Node, reference: Option<&web_sys::Node>) -> Result<(), JsValue> {
		if reference == Some(node) {
			return Ok(());
		}
		parent.insert_before(node, reference).map(drop)
	}

	fn set_text(&self, node: &web_sys::Node, value: &str) -> Result<(), JsValue> {
		node.set_node_value(Some(value));
		Ok(())
	}

	fn set_attribute(&self, element: &web_sys::Node, key: &str, value: &str) -> Result<(), JsValue> {
		as_element(element)?.set_attribute(key, value)
	}

	/// Boolean properties are reset to `false` and string properties to `""` before the attribute is removed.
	fn remove_attribute(&self, element: &web_sys::Node, key: &str) -> Result<(), JsValue> {
		let element = as_element(element)?;
		let js_key = JsValue::from_str(key);
		let current = Reflect::get(element, &js_key)?;
		if current.as_bool().is_some() {
			Reflect::set(element, &js_key, &JsValue::FALSE)?;
		} else if current.is_string() {
			Reflect::set(element, &js_key, &JsValue::from_str(""))?;
		}
		element.remove_attribute(key)
	}

	fn set_property(&self, element: &web_sys::Node, key: &str, value: &PropValue) -> Result<(), JsValue> {
		Reflect::set(as_element(element)?, &JsValue::from_str(key), &to_js(value)).map(drop)
	}

	fn set_class(&self, element: &web_sys::Node, class: &Class) -> Result<(), JsValue> {
		as_element(element)?.set_class_name(&class.tokens().join(" "));
		Ok(())
	}

	fn add_classes(&self, element: &web_sys::Node, tokens: &[&str]) -> Result<(), JsValue> {
		let class_list = as_element(element)?.class_list();
		for token in tokens {
			class_list.add_1(token)?;
		}
		Ok(())
	}

	fn remove_classes(&self, element: &web_sys::Node, tokens: &[&str]) -> Result<(), JsValue> {
		let class_list = as_element(element)?.class_list();
		for token in tokens {
			class_list.remove_1(token)?;
		}
		Ok(())
	}

	fn set_style(&self, element: &web_sys::Node, key: &str, value: &str) -> Result<(), JsValue> {
		as_html_element(element)?.style().set_property(key, value)
	}

	fn remove_style(&self, element: &web_sys::Node, key: &str) -> Result<(), JsValue> {
		as_html_element(element)?.style().remove_property(key).map(drop)
	}

	#[instrument(skip(self, element, listener))]
	fn add_event_listener(&self, element: &web_sys::Node, event: &str, listener: &Listener) -> Result<(), JsValue> {
		let mut listeners = self.listeners.borrow_mut();
		let closure = listeners
			.increment_or_insert_with(listener.id(), || {
				trace!("Wrapping listener.");
				let listener = listener.clone();
				Closure::wrap(Box::new(move |event: web_sys::Event| listener.call(&event)) as Box<dyn Fn(web_sys::Event)>)
			})
			.map_err(|error| JsValue::from_str(&error.to_string()))?;
		element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
	}

	#[instrument(skip(self, element, listener))]
	fn remove_event_listener(&self, element: &web_sys::Node, event: &str, listener: &Listener) -> Result<(), JsValue> {
		let mut listeners = self.listeners.borrow_mut();
		if let Some(closure) = listeners.weak_decrement(&listener.id()).map_err(|error| JsValue::from_str(&error.to_string()))? {
			element.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
		} else {
			trace!("Listener was never attached.");
		}
		let purged = listeners.purge();
		if purged > 0 {
			trace!(purged, "Dropped unused listener closures.");
		}
		Ok(())
	}
}
