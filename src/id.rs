//! Code for handling IDs
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use std::marker::PhantomData;

/// A trait alias for ID types
pub trait IDLike:
    Eq + std::hash::Hash + Copy + Ord + std::fmt::Display + From<u32> + Into<u32>
{
}
impl<T> IDLike for T where
    T: Eq + std::hash::Hash + Copy + Ord + std::fmt::Display + From<u32> + Into<u32>
{
}

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Clone,
            Copy,
            std::hash::Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Debug,
            serde::Deserialize,
            serde::Serialize,
        )]
        /// A numeric ID type (e.g. `CellID`, `NodeID`, etc.)
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                $name(id)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl $name {
            /// The ID as an index into a zero-based sequence
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}
pub(crate) use define_id_type;

#[cfg(test)]
define_id_type!(GenericID);

/// Indicates that the struct has an ID field
pub trait HasID<ID: IDLike> {
    /// Get the struct's ID
    fn get_id(&self) -> ID;
}

/// Implement the `HasID` trait for the given type, assuming it has a field called `id`
macro_rules! define_id_getter {
    ($t:ty, $id_ty:ty) => {
        impl crate::id::HasID<$id_ty> for $t {
            fn get_id(&self) -> $id_ty {
                self.id
            }
        }
    };
}
pub(crate) use define_id_getter;

/// Hands out consecutive IDs from a running counter.
///
/// Counters are never rewound, so every ID handed out by one counter is unique and larger than
/// the ones before it.
#[derive(Debug)]
pub struct IDCounter<ID> {
    next: u32,
    _marker: PhantomData<ID>,
}

impl<ID: IDLike> IDCounter<ID> {
    /// Create a counter whose first ID is `first`
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: first,
            _marker: PhantomData,
        }
    }

    /// Take the next ID from the counter
    pub fn next_id(&mut self) -> ID {
        let id = ID::from(self.next);
        self.next += 1;
        id
    }

    /// The value the next call to [`IDCounter::next_id`] will return
    pub fn peek(&self) -> u32 {
        self.next
    }
}

/// Insert an entity into a map keyed by its ID, failing if the ID is already taken
pub fn insert_unique<ID, T>(map: &mut IndexMap<ID, T>, entity: T) -> Result<()>
where
    ID: IDLike,
    T: HasID<ID>,
{
    let id = entity.get_id();
    ensure!(!map.contains_key(&id), "Duplicate ID {id}");
    map.insert(id, entity);

    Ok(())
}
