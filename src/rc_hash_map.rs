use core::{
	borrow::Borrow,
	hash::{BuildHasher, Hash},
};
use hashbrown::{
	hash_map::{DefaultHashBuilder, Entry},
	HashMap,
};
use num_traits::{CheckedAdd, CheckedSub, One, Zero};
use thiserror::Error;

/// A map whose entries carry a use count and are only dropped once it reaches zero.
pub struct RcHashMap<K, C, V, S = DefaultHashBuilder>(HashMap<K, (C, V), S>)
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher;
impl<K, C, V, S> Default for RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: Default + BuildHasher,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<K, C, V, S> RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher,
{
	#[must_use]
	pub fn new() -> Self
	where
		S: Default,
	{
		Self(HashMap::with_hasher(S::default()))
	}

	pub fn increment_or_insert_with<F: FnOnce() -> V>(&mut self, k: K, v: F) -> Result<&mut V, CountSaturatedError> {
		match self.0.entry(k) {
			Entry::Occupied(occupied) => {
				let (c, v) = occupied.into_mut();
				*c = c.checked_add(&C::one()).ok_or(CountSaturatedError)?;
				Ok(v)
			}
			Entry::Vacant(vacant) => {
				let (_, v) = vacant.insert((C::one(), v()));
				Ok(v)
			}
		}
	}

	/// Decrements the count of `k`, keeping the entry around even at zero until [`purge`](`RcHashMap::purge`).
	pub fn weak_decrement<Q: ?Sized>(&mut self, k: &Q) -> Result<Option<&mut V>, CountSaturatedError>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		match self.0.get_mut(k) {
			Some((c, v)) => {
				*c = c.checked_sub(&C::one()).ok_or(CountSaturatedError)?;
				Ok(Some(v))
			}
			None => Ok(None),
		}
	}

	/// Drops all entries with a count of zero and returns how many there were.
	pub fn purge(&mut self) -> usize {
		let before = self.0.len();
		self.0.retain(|_, (c, _)| !c.is_zero());
		before - self.0.len()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}
}

#[derive(Debug, Error)]
#[error("use count saturated")]
pub struct CountSaturatedError;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn entries_survive_until_purged_at_zero() {
		let mut map = RcHashMap::<&str, u8, u32>::new();
		map.increment_or_insert_with("a", || 1).unwrap();
		map.increment_or_insert_with("a", || unreachable!()).unwrap();
		map.increment_or_insert_with("b", || 2).unwrap();

		assert_eq!(map.weak_decrement("a").unwrap().copied(), Some(1));
		assert_eq!(map.purge(), 0);
		assert_eq!(map.weak_decrement("a").unwrap().copied(), Some(1));
		assert_eq!(map.purge(), 1);
		assert!(map.weak_decrement("a").unwrap().is_none());
		assert_eq!(map.len(), 1);
	}

	#[test]
	fn saturation_is_reported() {
		let mut map = RcHashMap::<&str, u8, ()>::new();
		map.increment_or_insert_with("a", || ()).unwrap();
		map.weak_decrement("a").unwrap();
		assert!(map.weak_decrement("a").is_err());
		assert!(map.weak_decrement("missing").unwrap().is_none());
	}
}
