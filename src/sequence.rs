//! Order-sensitive sequence diff.
//!
//! [`diff_sequence`] walks the new sequence once while keeping a working copy of the old one,
//! so that the emitted operations can be applied to a live host child list in order:
//! every `index` refers to the position in the sequence *as it is being rebuilt*,
//! every `original_index` to the untouched old sequence.

use tracing::{instrument, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOp<T> {
	/// Insert `item` (from the new sequence) at `index`.
	Add { item: T, index: usize },
	/// Remove `item` currently at `index`.
	Remove { item: T, index: usize },
	/// Relocate the old `item` from its current position `from` to `index`.
	Move { item: T, original_index: usize, from: usize, index: usize },
	/// The old `item` stays where it is, which is `index` in the new sequence.
	Noop { item: T, original_index: usize, index: usize },
}

impl<T> DiffOp<T> {
	pub fn item(&self) -> &T {
		match self {
			DiffOp::Add { item, .. } | DiffOp::Remove { item, .. } | DiffOp::Move { item, .. } | DiffOp::Noop { item, .. } => item,
		}
	}
}

/// The old sequence under reconstruction, with each item's original index (`None` for additions).
struct Working<T> {
	items: Vec<(T, Option<usize>)>,
}

impl<T: Clone> Working<T> {
	fn find_from(&self, item: &T, start: usize, eq: &mut impl FnMut(&T, &T) -> bool) -> Option<usize> {
		self.items.iter().skip(start).position(|(candidate, _)| eq(candidate, item)).map(|offset| start + offset)
	}

	fn remove(&mut self, index: usize) -> DiffOp<T> {
		let (item, _) = self.items.remove(index);
		DiffOp::Remove { item, index }
	}
}

/// Computes the operations turning `old` into `new`.
///
/// `eq` decides whether two items occupy "the same logical slot" and must be an equivalence relation.
/// Items are compared as `eq(old_side, new_side)`.
///
/// At each position, in priority order: the old item is removed if it appears nowhere in `new`,
/// kept if it matches the new item at this position,
/// the new item is added if no match remains at or after this position,
/// and otherwise the first remaining match is moved here.
/// Leftover old items are removed at the end.
///
/// # Panics
///
/// Iff `eq` gives different answers for the same pair of items during one diff.
#[instrument(skip(old, new, eq), fields(old.len = old.len(), new.len = new.len()))]
pub fn diff_sequence<T: Clone>(old: &[T], new: &[T], mut eq: impl FnMut(&T, &T) -> bool) -> Vec<DiffOp<T>> {
	let mut ops = Vec::new();
	let mut working = Working {
		items: old.iter().cloned().enumerate().map(|(i, item)| (item, Some(i))).collect(),
	};

	// Each step either shrinks `working` or advances `index`.
	let step_limit = old.len() + new.len();
	let mut steps = 0;

	let mut index = 0;
	while index < new.len() {
		steps += 1;
		debug_assert!(steps <= step_limit, "sequence diff exceeded its step bound");

		let target = &new[index];

		if let Some((current, _)) = working.items.get(index) {
			if !new.iter().any(|candidate| eq(current, candidate)) {
				ops.push(working.remove(index));
				continue;
			}
		}

		match working.items.get(index) {
			Some((current, Some(original_index))) if eq(current, target) => {
				ops.push(DiffOp::Noop {
					item: current.clone(),
					original_index: *original_index,
					index,
				});
			}
			_ => match working.find_from(target, index, &mut eq) {
				None => {
					working.items.insert(index, (target.clone(), None));
					ops.push(DiffOp::Add { item: target.clone(), index });
				}
				Some(from) => {
					let (item, original_index) = working.items.remove(from);
					let original_index = original_index.unwrap_or_else(|| panic!("sequence diff: item at {} was matched after being added; the equality function is inconsistent", from));
					working.items.insert(index, (item.clone(), Some(original_index)));
					ops.push(DiffOp::Move { item, original_index, from, index });
				}
			},
		}

		index += 1;
	}

	while working.items.len() > index {
		ops.push(working.remove(index));
	}

	trace!(ops = ops.len(), "Sequence diffed.");
	ops
}
