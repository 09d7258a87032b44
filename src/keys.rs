//! Key-set diff between two flat maps (attributes, styles, listener tables).

use core::hash::Hash;
use hashbrown::HashSet;
use std::collections::BTreeMap;

/// Which keys changed between two maps. Keys with equal values on both sides appear in none of the sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDiff<'a, K: Hash + Eq> {
	pub added: HashSet<&'a K>,
	pub removed: HashSet<&'a K>,
	pub updated: HashSet<&'a K>,
}

impl<'a, K: Hash + Eq> KeyDiff<'a, K> {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
	}

	/// Keys that need a (new) value: `added ∪ updated`.
	pub fn to_set(&self) -> impl '_ + Iterator<Item = &'a K> {
		self.added.iter().chain(self.updated.iter()).copied()
	}

	/// Keys whose previous value must be undone: `removed ∪ updated`.
	pub fn to_unset(&self) -> impl '_ + Iterator<Item = &'a K> {
		self.removed.iter().chain(self.updated.iter()).copied()
	}
}

/// Absent maps count as empty.
/// `updated` uses the values' [`PartialEq`], which for [`Listener`](`crate::Listener`)s is identity.
pub fn diff_keys<'a, K, V>(old: Option<&'a BTreeMap<K, V>>, new: Option<&'a BTreeMap<K, V>>) -> KeyDiff<'a, K>
where
	K: Ord + Hash + Eq,
	V: PartialEq,
{
	let mut diff = KeyDiff {
		added: HashSet::new(),
		removed: HashSet::new(),
		updated: HashSet::new(),
	};

	if let Some(old) = old {
		for (key, old_value) in old {
			match new.and_then(|new| new.get(key)) {
				None => {
					diff.removed.insert(key);
				}
				Some(new_value) if new_value != old_value => {
					diff.updated.insert(key);
				}
				Some(_) => (),
			}
		}
	}

	if let Some(new) = new {
		for key in new.keys() {
			if !old.map_or(false, |old| old.contains_key(key)) {
				diff.added.insert(key);
			}
		}
	}

	diff
}

#[cfg(test)]
mod tests {
	use super::*;

	fn map(entries: &[(&'static str, i32)]) -> BTreeMap<&'static str, i32> {
		entries.iter().copied().collect()
	}

	fn set<'a>(keys: &[&'a &'static str]) -> HashSet<&'a &'static str> {
		keys.iter().copied().collect()
	}

	#[test]
	fn same_object() {
		let a = map(&[("a", 1), ("b", 2)]);
		assert!(diff_keys(Some(&a), Some(&a)).is_empty());
	}

	#[test]
	fn added_removed_updated() {
		let old = map(&[("a", 1), ("b", 2), ("c", 3)]);
		let new = map(&[("a", 1), ("c", 4), ("d", 5)]);
		let diff = diff_keys(Some(&old), Some(&new));
		assert_eq!(diff.added, set(&[&"d"]));
		assert_eq!(diff.removed, set(&[&"b"]));
		assert_eq!(diff.updated, set(&[&"c"]));
	}

	#[test]
	fn absent_maps_are_empty() {
		let new = map(&[("a", 1)]);
		let diff = diff_keys(None, Some(&new));
		assert_eq!(diff.added, set(&[&"a"]));
		assert!(diff.removed.is_empty() && diff.updated.is_empty());

		let diff = diff_keys(Some(&new), None);
		assert_eq!(diff.removed, set(&[&"a"]));

		assert!(diff_keys::<&str, i32>(None, None).is_empty());
	}

	#[test]
	fn sets_partition_the_union_of_keys() {
		let old = map(&[("a", 1), ("b", 2), ("c", 3), ("e", 0)]);
		let new = map(&[("b", 2), ("c", 30), ("d", 4), ("e", 1)]);
		let diff = diff_keys(Some(&old), Some(&new));

		let unchanged: Vec<_> = old.keys().filter(|key| new.get(*key) == old.get(*key)).collect();
		let mut all: Vec<&&str> = diff.added.iter().chain(&diff.removed).chain(&diff.updated).copied().chain(unchanged).collect();
		all.sort();
		let mut expected: Vec<&&str> = old.keys().chain(new.keys()).collect();
		expected.sort();
		expected.dedup();
		assert_eq!(all, expected);
	}
}
