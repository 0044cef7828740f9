use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    io::{Read, Write},
    marker::PhantomData,
};

use serdes::{SerdeResult, WireSerde};

/// Location-aware, non-owning handle of an entity that may live on another rank.
///
/// The pointer is the pair `(rank, index)`: the rank owning the entity and the position of the
/// entity in that rank's `EntityStore`. It can only be dereferenced on the owning rank.
/// Equality, hashing and ordering use the pair and nothing else, so `T` needs no bounds.
pub struct GlobalPointer<T> {
    rank: usize,
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> GlobalPointer<T> {
    #[inline]
    pub const fn new(rank: usize, index: usize) -> Self {
        Self {
            rank,
            index,
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub const fn rank(&self) -> usize {
        self.rank
    }

    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[inline(always)]
    pub const fn is_local(&self, current_rank: usize) -> bool {
        self.rank == current_rank
    }

    /// Resolve the pointer in the store of the owning rank.
    ///
    /// Dereferencing a pointer owned by another rank is a programming error, caught in debug
    /// builds only.
    #[inline]
    pub fn dereference<'s, S: EntityStore<T> + ?Sized>(
        &self,
        store: &'s S,
        current_rank: usize,
    ) -> &'s T {
        debug_assert_eq!(
            self.rank, current_rank,
            "dereferencing non-local {} on rank {}",
            self, current_rank
        );
        store.entity(self.index)
    }
}

impl<T> Clone for GlobalPointer<T> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for GlobalPointer<T> {}

impl<T> PartialEq for GlobalPointer<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank && self.index == other.index
    }
}

impl<T> Eq for GlobalPointer<T> {}

impl<T> Hash for GlobalPointer<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank.hash(state);
        self.index.hash(state);
    }
}

impl<T> PartialOrd for GlobalPointer<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for GlobalPointer<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.rank, self.index).cmp(&(other.rank, other.index))
    }
}

impl<T> fmt::Debug for GlobalPointer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalPointer")
            .field("rank", &self.rank)
            .field("index", &self.index)
            .finish()
    }
}

impl<T> fmt::Display for GlobalPointer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalPointer(rank={}, index={})", self.rank, self.index)
    }
}

impl<T> WireSerde for GlobalPointer<T> {
    fn serialize_into<W: Write>(&self, mut writer: W) -> SerdeResult<()> {
        self.rank.serialize_into(&mut writer)?;
        self.index.serialize_into(&mut writer)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> SerdeResult<Self> {
        let rank = usize::deserialize_from(&mut reader)?;
        let index = usize::deserialize_from(&mut reader)?;
        Ok(Self::new(rank, index))
    }
}

/// Map from global pointers to the value to apply to each of them.
pub type GlobalPointersMap<T, V> = HashMap<GlobalPointer<T>, V>;

/// Local storage of the entities a rank owns, indexed the way its global pointers are.
///
/// Entities are handed out as shared references to concurrently running apply functors, so
/// any mutation has to go through interior mutability (atomics, locks).
pub trait EntityStore<T>: Sync {
    fn entity(&self, index: usize) -> &T;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Sync> EntityStore<T> for [T] {
    #[inline(always)]
    fn entity(&self, index: usize) -> &T {
        &self[index]
    }

    #[inline(always)]
    fn len(&self) -> usize {
        <[T]>::len(self)
    }
}

impl<T: Sync> EntityStore<T> for Vec<T> {
    #[inline(always)]
    fn entity(&self, index: usize) -> &T {
        &self[index]
    }

    #[inline(always)]
    fn len(&self) -> usize {
        Vec::len(self)
    }
}

/// Global pointers to every entity of a local store.
pub fn global_pointers<T, S: EntityStore<T> + ?Sized>(
    store: &S,
    current_rank: usize,
) -> Vec<GlobalPointer<T>> {
    (0..store.len())
        .map(|index| GlobalPointer::new(current_rank, index))
        .collect()
}
