//! The application loop: state, a view function and reducers, re-rendered after every command.

use crate::{
	dispatcher::{Dispatcher, Subscription},
	mount, patch, unmount,
	unmount::discard,
	Host, Node, Result,
};
use core::{cell::Cell, fmt};
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};
use tracing::{error, instrument, trace};

/// Computes the next state from the current one and a command payload.
pub type Reducer<S, P> = Rc<dyn Fn(&S, &P) -> S>;

pub fn reducer<S, P>(reducer: impl 'static + Fn(&S, &P) -> S) -> Reducer<S, P> {
	Rc::new(reducer)
}

/// The only channel through which a view can affect state: each [`emit`](`Emitter::emit`) dispatches one command.
pub struct Emitter<P> {
	dispatcher: Dispatcher<P>,
}

impl<P> Clone for Emitter<P> {
	fn clone(&self) -> Self {
		Self {
			dispatcher: self.dispatcher.clone(),
		}
	}
}

impl<P> fmt::Debug for Emitter<P> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Emitter").field("dispatcher", &self.dispatcher).finish()
	}
}

impl<P: 'static> Emitter<P> {
	/// Dispatches `command` synchronously. Reducers and the re-render have run by the time this returns.
	pub fn emit(&self, command: &str, payload: P) {
		self.dispatcher.dispatch(command, &payload);
	}
}

type View<S, P, N> = dyn Fn(&S, &Emitter<P>) -> Node<N>;

struct Loop<S, P, H: Host> {
	host: H,
	view: Box<View<S, P, H::Node>>,
	reducers: Vec<(String, Reducer<S, P>)>,
	state: RefCell<Rc<S>>,
	parent: RefCell<Option<H::Node>>,
	vdom: RefCell<Option<Node<H::Node>>>,
	dispatcher: Dispatcher<P>,
	subscriptions: RefCell<Vec<Subscription>>,
	rendering: Cell<bool>,
	render_requested: Cell<bool>,
}

/// A mounted-or-not application.
///
/// State is owned here exclusively and replaced wholesale by each reducer.
/// After every dispatched command (whether it had a reducer or not), the view is re-run and patched into the host.
///
/// Commands emitted while a render is in progress (by the view itself, or by listeners the host fires while being patched)
/// run their reducers right away, but their re-render is deferred until the current one has finished.
/// A view that emits on every render therefore never settles.
///
/// If a render fails, everything it had mounted so far is torn down and logged, and the next command mounts the view from scratch.
pub struct App<S, P, H: Host> {
	inner: Rc<Loop<S, P, H>>,
}

impl<S, P, H> App<S, P, H>
where
	S: 'static,
	P: 'static,
	H: 'static + Host,
{
	/// Registers each reducer under its command name, plus the re-render hook.
	pub fn new<K: Into<String>>(
		host: H,
		view: impl 'static + Fn(&S, &Emitter<P>) -> Node<H::Node>,
		initial_state: S,
		reducers: impl IntoIterator<Item = (K, Reducer<S, P>)>,
	) -> Self {
		let app = Self {
			inner: Rc::new(Loop {
				host,
				view: Box::new(view),
				reducers: reducers.into_iter().map(|(command, reducer)| (command.into(), reducer)).collect(),
				state: RefCell::new(Rc::new(initial_state)),
				parent: RefCell::new(None),
				vdom: RefCell::new(None),
				dispatcher: Dispatcher::new(),
				subscriptions: RefCell::new(Vec::new()),
				rendering: Cell::new(false),
				render_requested: Cell::new(false),
			}),
		};
		app.subscribe();
		app
	}

	fn subscribe(&self) {
		let dispatcher = &self.inner.dispatcher;
		let mut subscriptions = self.inner.subscriptions.borrow_mut();

		let this = Rc::downgrade(&self.inner);
		subscriptions.push(dispatcher.after_every_command(Rc::new(move |command: &str, _: &P| {
			if let Some(this) = Weak::upgrade(&this) {
				trace!(command, "Re-rendering after command.");
				if let Err(error) = this.render() {
					error!(?error, command, "Re-render failed.");
				}
			}
		})));

		for (command, reducer) in &self.inner.reducers {
			let this = Rc::downgrade(&self.inner);
			let reducer = Rc::clone(reducer);
			subscriptions.push(dispatcher.subscribe(
				command.clone(),
				Rc::new(move |payload: &P| {
					if let Some(this) = Weak::upgrade(&this) {
						let current = Rc::clone(&this.state.borrow());
						let next = reducer(&current, payload);
						this.state.replace(Rc::new(next));
					}
				}),
			));
		}
	}

	/// Renders the view into `parent`. Does nothing if already mounted.
	///
	/// # Errors
	///
	/// Host failures while mounting. The partially mounted tree is removed again and the app stays unmounted.
	#[instrument(skip(self, parent))]
	pub fn mount(&self, parent: H::Node) -> Result<(), H::Error> {
		if self.is_mounted() {
			trace!("Already mounted.");
			return Ok(());
		}
		if self.inner.subscriptions.borrow().is_empty() {
			self.subscribe();
		}
		*self.inner.parent.borrow_mut() = Some(parent);
		let result = self.inner.render();
		if result.is_err() {
			self.inner.parent.replace(None);
		}
		result
	}

	/// Unmounts the current tree and drops every subscription, reducers included.
	/// [`mount`](`App::mount`) may be called again afterwards.
	///
	/// # Errors
	///
	/// Failures while unmounting. Subscriptions are dropped regardless.
	#[instrument(skip(self))]
	pub fn unmount(&self) -> Result<(), H::Error> {
		self.inner.parent.replace(None);
		let vdom = self.inner.vdom.borrow_mut().take();
		let result = match vdom {
			Some(mut vdom) => unmount(&self.inner.host, &mut vdom),
			None => Ok(()),
		};
		for subscription in self.inner.subscriptions.borrow_mut().drain(..) {
			subscription.unsubscribe();
		}
		result
	}

	/// Whether the app has a host parent, even if its last render failed.
	#[must_use]
	pub fn is_mounted(&self) -> bool {
		self.inner.parent.borrow().is_some()
	}

	#[must_use]
	pub fn emitter(&self) -> Emitter<P> {
		self.inner.emitter()
	}

	/// Dispatches `command` as if emitted from the view.
	pub fn emit(&self, command: &str, payload: P) {
		self.emitter().emit(command, payload);
	}

	/// Lends the current state to `f`, which may emit commands.
	pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
		let state = Rc::clone(&self.inner.state.borrow());
		f(&state)
	}

	#[must_use]
	pub fn host(&self) -> &H {
		&self.inner.host
	}
}

impl<S, P, H> Loop<S, P, H>
where
	S: 'static,
	P: 'static,
	H: 'static + Host,
{
	fn emitter(&self) -> Emitter<P> {
		Emitter {
			dispatcher: self.dispatcher.clone(),
		}
	}

	/// Renders until no further render was requested during the last pass.
	///
	/// A nested call while rendering only requests another pass.
	fn render(&self) -> Result<(), H::Error> {
		if self.rendering.replace(true) {
			trace!("Already rendering. Deferring re-render.");
			self.render_requested.set(true);
			return Ok(());
		}

		let result = loop {
			self.render_requested.set(false);
			if let Err(error) = self.render_once() {
				break Err(error);
			}
			if !self.render_requested.get() {
				break Ok(());
			}
		};
		self.rendering.set(false);
		result
	}

	/// Mounts a fresh tree or patches the previous one. Without a host parent there is nothing to render into.
	///
	/// Neither the state nor the stored tree stays borrowed while the view or the host runs.
	fn render_once(&self) -> Result<(), H::Error> {
		let parent = match self.parent.borrow().clone() {
			Some(parent) => parent,
			None => {
				trace!("Not mounted. Skipping render.");
				return Ok(());
			}
		};

		let state = Rc::clone(&self.state.borrow());
		let mut next = (self.view)(&state, &self.emitter());

		let previous = self.vdom.borrow_mut().take();
		let result = match previous {
			Some(mut previous) => {
				let result = patch(&self.host, &mut previous, &mut next, &parent);
				if result.is_err() {
					discard(&self.host, &mut previous);
				}
				result
			}
			None => mount(&self.host, &mut next, &parent, None),
		};

		match result {
			Ok(()) => {
				*self.vdom.borrow_mut() = Some(next);
				Ok(())
			}
			Err(error) => {
				trace!("Render failed. Discarding the partially reconciled tree.");
				discard(&self.host, &mut next);
				Err(error)
			}
		}
	}
}

impl<S, P, H: Host> fmt::Debug for App<S, P, H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("App")
			.field("parent", &self.inner.parent)
			.field("vdom", &self.inner.vdom)
			.field("subscriptions", &self.inner.subscriptions.borrow().len())
			.finish()
	}
}
