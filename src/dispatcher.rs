//! A synchronous command bus.

use core::{cell::Cell, fmt, ptr};
use hashbrown::HashMap;
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};
use tracing::{instrument, trace, warn};

pub type Handler<P> = Rc<dyn Fn(&P)>;
pub type AfterCommandHandler<P> = Rc<dyn Fn(&str, &P)>;

struct Subscribers<P> {
	commands: HashMap<String, Vec<Handler<P>>>,
	after_every_command: Vec<AfterCommandHandler<P>>,
}

fn same_handler<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
	ptr::eq(Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>())
}

/// Fans named commands out to subscribed handlers, then runs every after-command hook.
///
/// Clones share their subscriber lists.
/// Handlers run synchronously and may (un)subscribe or dispatch re-entrantly:
/// [`dispatch`](`Dispatcher::dispatch`) works on a snapshot of the lists taken when it starts.
pub struct Dispatcher<P> {
	subscribers: Rc<RefCell<Subscribers<P>>>,
}

impl<P> Clone for Dispatcher<P> {
	fn clone(&self) -> Self {
		Self {
			subscribers: Rc::clone(&self.subscribers),
		}
	}
}

impl<P: 'static> Default for Dispatcher<P> {
	fn default() -> Self {
		Self::new()
	}
}

impl<P> fmt::Debug for Dispatcher<P> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let subscribers = self.subscribers.borrow();
		f.debug_struct("Dispatcher")
			.field("commands", &subscribers.commands.keys().collect::<Vec<_>>())
			.field("after_every_command", &subscribers.after_every_command.len())
			.finish()
	}
}

impl<P: 'static> Dispatcher<P> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			subscribers: Rc::new(RefCell::new(Subscribers {
				commands: HashMap::new(),
				after_every_command: Vec::new(),
			})),
		}
	}

	/// Subscribes `handler` to `command`.
	///
	/// Subscribing the same handler (by identity) to the same command again does nothing
	/// and returns a [`Subscription`] that does nothing either.
	pub fn subscribe(&self, command: impl Into<String>, handler: Handler<P>) -> Subscription {
		let command = command.into();
		{
			let mut subscribers = self.subscribers.borrow_mut();
			let handlers = subscribers.commands.entry(command.clone()).or_default();
			if handlers.iter().any(|existing| same_handler(existing, &handler)) {
				trace!(%command, "Handler already subscribed.");
				return Subscription::noop();
			}
			handlers.push(Rc::clone(&handler));
		}

		let subscribers = Rc::downgrade(&self.subscribers);
		Subscription::new(move || {
			if let Some(subscribers) = Weak::upgrade(&subscribers) {
				if let Some(handlers) = subscribers.borrow_mut().commands.get_mut(&command) {
					handlers.retain(|existing| !same_handler(existing, &handler));
				}
			}
		})
	}

	/// Registers a hook that runs after every dispatched command, whether or not it had subscribers.
	pub fn after_every_command(&self, handler: AfterCommandHandler<P>) -> Subscription {
		self.subscribers.borrow_mut().after_every_command.push(Rc::clone(&handler));

		let subscribers = Rc::downgrade(&self.subscribers);
		Subscription::new(move || {
			if let Some(subscribers) = Weak::upgrade(&subscribers) {
				let mut subscribers = subscribers.borrow_mut();
				if let Some(i) = subscribers.after_every_command.iter().position(|existing| same_handler(existing, &handler)) {
					subscribers.after_every_command.remove(i);
				}
			}
		})
	}

	#[must_use]
	pub fn has_handlers(&self, command: &str) -> bool {
		self.subscribers.borrow().commands.get(command).map_or(false, |handlers| !handlers.is_empty())
	}

	/// Runs `command`'s handlers in subscription order, then all after-command hooks in registration order.
	///
	/// A command without handlers is logged as a warning; the hooks still run.
	#[instrument(skip(self, payload))]
	pub fn dispatch(&self, command: &str, payload: &P) {
		let (handlers, after_every_command) = {
			let subscribers = self.subscribers.borrow();
			(
				subscribers.commands.get(command).cloned().unwrap_or_default(),
				subscribers.after_every_command.clone(),
			)
		};

		if handlers.is_empty() {
			warn!(command, "No handlers for command.");
		}
		for handler in handlers {
			handler(payload);
		}

		for handler in after_every_command {
			handler(command, payload);
		}
	}
}

/// Undoes one subscription. Unsubscribing more than once is a no-op.
///
/// Dropping a [`Subscription`] does *not* unsubscribe.
pub struct Subscription(Cell<Option<Box<dyn FnOnce()>>>);

impl Subscription {
	fn new(unsubscribe: impl 'static + FnOnce()) -> Self {
		Self(Cell::new(Some(Box::new(unsubscribe))))
	}

	fn noop() -> Self {
		Self(Cell::new(None))
	}

	pub fn unsubscribe(&self) {
		if let Some(unsubscribe) = self.0.take() {
			unsubscribe()
		}
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Subscription")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	type Calls = Rc<RefCell<Vec<String>>>;

	fn recorder(calls: &Calls, name: &'static str) -> Handler<&'static str> {
		let calls = Rc::clone(calls);
		Rc::new(move |payload: &&'static str| calls.borrow_mut().push(format!("{}({})", name, payload)))
	}

	fn after_recorder(calls: &Calls, name: &'static str) -> AfterCommandHandler<&'static str> {
		let calls = Rc::clone(calls);
		Rc::new(move |command: &str, payload: &&'static str| calls.borrow_mut().push(format!("{}({}, {})", name, command, payload)))
	}

	#[test]
	fn no_handlers_is_fine() {
		Dispatcher::<&str>::new().dispatch("foo", &"bar");
	}

	#[test]
	fn default_is_empty() {
		let dispatcher = Dispatcher::<&str>::default();
		assert!(!dispatcher.has_handlers("foo"));
		dispatcher.dispatch("foo", &"bar");
	}

	#[test]
	fn nested_dispatch_completes_before_outer_hooks() {
		let calls = Calls::default();
		let dispatcher = Dispatcher::new();
		let nested = dispatcher.clone();
		dispatcher.subscribe("outer", Rc::new(move |_: &&'static str| nested.dispatch("inner", &"nested")));
		dispatcher.subscribe("inner", recorder(&calls, "inner"));
		dispatcher.after_every_command(after_recorder(&calls, "after"));

		dispatcher.dispatch("outer", &"x");
		assert_eq!(*calls.borrow(), ["inner(nested)", "after(inner, nested)", "after(outer, x)"]);
	}

	#[test]
	fn dispatches_to_all_handlers_of_the_command_only() {
		let calls = Calls::default();
		let dispatcher = Dispatcher::new();
		dispatcher.subscribe("foo", recorder(&calls, "one"));
		dispatcher.subscribe("foo", recorder(&calls, "two"));
		dispatcher.subscribe("baz", recorder(&calls, "three"));

		dispatcher.dispatch("foo", &"bar");
		assert_eq!(*calls.borrow(), ["one(bar)", "two(bar)"]);
	}

	#[test]
	fn after_every_command_runs_after_handlers_even_without_subscribers() {
		let calls = Calls::default();
		let dispatcher = Dispatcher::new();
		dispatcher.subscribe("foo", recorder(&calls, "handler"));
		dispatcher.after_every_command(after_recorder(&calls, "after1"));
		dispatcher.after_every_command(after_recorder(&calls, "after2"));

		dispatcher.dispatch("foo", &"bar");
		dispatcher.dispatch("nobody", &"qux");
		assert_eq!(
			*calls.borrow(),
			["handler(bar)", "after1(foo, bar)", "after2(foo, bar)", "after1(nobody, qux)", "after2(nobody, qux)"]
		);
	}

	#[test]
	fn unsubscribe() {
		let calls = Calls::default();
		let dispatcher = Dispatcher::new();
		let one = dispatcher.subscribe("foo", recorder(&calls, "one"));
		dispatcher.subscribe("foo", recorder(&calls, "two"));
		let after = dispatcher.after_every_command(after_recorder(&calls, "after"));

		one.unsubscribe();
		after.unsubscribe();
		dispatcher.dispatch("foo", &"bar");
		assert_eq!(*calls.borrow(), ["two(bar)"]);
		assert!(dispatcher.has_handlers("foo"));
	}

	#[test]
	fn unsubscribing_twice_is_a_noop() {
		let calls = Calls::default();
		let dispatcher = Dispatcher::new();
		let first = dispatcher.subscribe("foo", recorder(&calls, "first"));
		dispatcher.subscribe("foo", recorder(&calls, "second"));

		first.unsubscribe();
		first.unsubscribe();
		dispatcher.dispatch("foo", &"bar");
		assert_eq!(*calls.borrow(), ["second(bar)"]);
	}

	#[test]
	fn duplicate_subscription_is_ignored() {
		let calls = Calls::default();
		let dispatcher = Dispatcher::new();
		let handler = recorder(&calls, "handler");
		dispatcher.subscribe("foo", Rc::clone(&handler));
		let second = dispatcher.subscribe("foo", handler);

		dispatcher.dispatch("foo", &"bar");
		assert_eq!(*calls.borrow(), ["handler(bar)"]);

		second.unsubscribe();
		dispatcher.dispatch("foo", &"baz");
		assert_eq!(*calls.borrow(), ["handler(bar)", "handler(baz)"]);
	}

	#[test]
	fn handler_may_unsubscribe_itself_mid_dispatch() {
		let calls = Calls::default();
		let dispatcher = Dispatcher::new();
		let subscription: Rc<RefCell<Option<Subscription>>> = Rc::default();

		let handler: Handler<&'static str> = {
			let calls = Rc::clone(&calls);
			let subscription = Rc::clone(&subscription);
			Rc::new(move |payload: &&'static str| {
				calls.borrow_mut().push(format!("once({})", payload));
				if let Some(subscription) = subscription.borrow_mut().take() {
					subscription.unsubscribe();
				}
			})
		};
		*subscription.borrow_mut() = Some(dispatcher.subscribe("foo", handler));
		dispatcher.subscribe("foo", recorder(&calls, "other"));

		dispatcher.dispatch("foo", &"1");
		dispatcher.dispatch("foo", &"2");
		assert_eq!(*calls.borrow(), ["once(1)", "other(1)", "other(2)"]);
	}
}
