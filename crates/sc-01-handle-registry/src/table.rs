//! Slot arena keyed by [`RefId`].

use crate::{HandleError, RefId};
use std::fmt;
use tracing::trace;

/// Objects that carry a class tag.
///
/// The bridge stores heterogeneous objects in one table and checks the class
/// claimed by the caller against the stored object before dispatching.
pub trait Tagged {
    /// Class tag type.
    type Tag: Copy + PartialEq + fmt::Display;

    /// Class of this object.
    fn tag(&self) -> Self::Tag;
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generation-checked arena of owned objects.
pub struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Store an object and return its reference.
    pub fn insert(&mut self, value: T) -> RefId {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].value = Some(value);
                index
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                });
                index
            }
        };
        self.live += 1;
        let id = RefId::from_parts(index, self.slots[index as usize].generation);
        trace!(ref_id = %id, live = self.live, "Handle allocated");
        id
    }

    fn locate(&self, id: RefId) -> Result<usize, HandleError> {
        if !id.is_live() {
            return Err(HandleError::Dead);
        }
        let index = id.index().ok_or(HandleError::Dead)? as usize;
        let slot = self.slots.get(index).ok_or(HandleError::Unknown(id))?;
        if slot.generation != id.generation() || slot.value.is_none() {
            return Err(HandleError::Stale(id));
        }
        Ok(index)
    }

    /// Borrow the object named by `id`.
    pub fn get(&self, id: RefId) -> Result<&T, HandleError> {
        let index = self.locate(id)?;
        self.slots[index].value.as_ref().ok_or(HandleError::Stale(id))
    }

    /// Mutably borrow the object named by `id`.
    pub fn get_mut(&mut self, id: RefId) -> Result<&mut T, HandleError> {
        let index = self.locate(id)?;
        self.slots[index].value.as_mut().ok_or(HandleError::Stale(id))
    }

    /// Take the object out of the table. The id is stale afterwards.
    pub fn remove(&mut self, id: RefId) -> Result<T, HandleError> {
        let index = self.locate(id)?;
        let slot = &mut self.slots[index];
        let value = slot.value.take().ok_or(HandleError::Stale(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index as u32);
        self.live -= 1;
        trace!(ref_id = %id, live = self.live, "Handle released");
        Ok(value)
    }

    /// Whether `id` names a live object.
    pub fn contains(&self, id: RefId) -> bool {
        self.locate(id).is_ok()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no object is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl<T: Tagged> HandleTable<T> {
    /// Borrow the object named by `id`, requiring it to be of class `expected`.
    pub fn get_tagged(&self, id: RefId, expected: T::Tag) -> Result<&T, HandleError> {
        let value = self.get(id)?;
        let found = value.tag();
        if found != expected {
            return Err(HandleError::ClassMismatch {
                ref_id: id,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(value)
    }
}
