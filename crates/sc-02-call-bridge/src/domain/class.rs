//! Closed set of native classes and the tag lookup table.

use crate::domain::fault::BridgeFault;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// A class of objects the computation module can return.
///
/// Implemented by a fieldless enum listing every class the module knows.
pub trait NativeClass:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Tag carried on the wire.
    fn name(self) -> &'static str;

    /// Every class.
    fn all() -> &'static [Self];
}

/// Tag -> class lookup, built once per bridge endpoint.
#[derive(Debug, Clone)]
pub struct ClassTable<C: NativeClass> {
    by_tag: HashMap<&'static str, C>,
}

impl<C: NativeClass> ClassTable<C> {
    pub fn build() -> Self {
        let by_tag = C::all().iter().map(|class| (class.name(), *class)).collect();
        Self { by_tag }
    }

    /// Resolve a wire tag. Unknown tags are an error naming the tag.
    pub fn resolve(&self, tag: &str) -> Result<C, BridgeFault> {
        self.by_tag
            .get(tag)
            .copied()
            .ok_or_else(|| BridgeFault::unknown_class(tag))
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}
