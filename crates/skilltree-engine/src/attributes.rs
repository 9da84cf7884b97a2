//! Live gameplay attribute lookup.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use skilltree_types::AttributeId;

/// Read access to the owner's live attribute values.
pub trait AttributeSource {
    /// Current value of an attribute, or `None` if the owner has no such
    /// attribute.
    fn attribute(&self, id: &AttributeId) -> Option<Decimal>;
}

impl AttributeSource for BTreeMap<AttributeId, Decimal> {
    fn attribute(&self, id: &AttributeId) -> Option<Decimal> {
        self.get(id).copied()
    }
}

impl<S: std::hash::BuildHasher> AttributeSource for HashMap<AttributeId, Decimal, S> {
    fn attribute(&self, id: &AttributeId) -> Option<Decimal> {
        self.get(id).copied()
    }
}

/// An owner with no attributes at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAttributes;

impl AttributeSource for NoAttributes {
    fn attribute(&self, _id: &AttributeId) -> Option<Decimal> {
        None
    }
}
