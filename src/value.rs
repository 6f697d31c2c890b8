//! The structured value tree produced by `Parser::parse` and consumed by
//! `Builder::build`.
//!
//! Generalizes `dlms-core::datatypes::DataObject` — a closed `Debug +
//! Clone + PartialEq` dynamic value enum for a fixed COSEM type catalogue
//! — to an open set of leaf types, since this codec's primitive leaves are
//! whatever a caller's `decode` callback returns (spec.md §3, §9 "User
//! codecs as injected callbacks").

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type DynLeaf = dyn Any + Send + Sync;

/// A decoded primitive leaf value, holding a caller's concrete type behind
/// a hand-rolled vtable of monomorphized function pointers rather than a
/// downcast-through-trait-object blanket impl.
#[derive(Clone)]
pub struct Leaf {
    value: Arc<DynLeaf>,
    debug_fmt: fn(&DynLeaf, &mut fmt::Formatter<'_>) -> fmt::Result,
    eq: fn(&DynLeaf, &DynLeaf) -> bool,
}

impl Leaf {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + fmt::Debug + PartialEq + Send + Sync + 'static,
    {
        Self {
            value: Arc::new(value),
            debug_fmt: |a, f| write!(f, "{:?}", a.downcast_ref::<T>().expect("vtable/value type mismatch")),
            eq: |a, b| match b.downcast_ref::<T>() {
                Some(b) => a.downcast_ref::<T>().expect("vtable/value type mismatch") == b,
                None => false,
            },
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.debug_fmt)(self.value.as_ref(), f)
    }
}

impl PartialEq for Leaf {
    fn eq(&self, other: &Self) -> bool {
        (self.eq)(self.value.as_ref(), other.value.as_ref())
    }
}

/// The structured tree mirroring a `Schema` (spec.md §3 `ParsedValue`).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A decoded (or, pre-build, not-yet-encoded) primitive.
    Leaf(Leaf),
    /// A Constructed field: one entry per child name.
    Record(HashMap<String, Value>),
    /// A Repeated field: an ordered list of element values.
    List(Vec<Value>),
    /// A Choice field: the selected alternative's name and value.
    Choice { variant: String, value: Box<Value> },
}

impl Value {
    pub fn leaf<T>(v: T) -> Self
    where
        T: Any + fmt::Debug + PartialEq + Send + Sync + 'static,
    {
        Value::Leaf(Leaf::new(v))
    }

    pub fn bytes(v: impl Into<Vec<u8>>) -> Self {
        Value::leaf(v.into())
    }

    pub fn record(fields: HashMap<String, Value>) -> Self {
        Value::Record(fields)
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(items)
    }

    pub fn choice(variant: impl Into<String>, value: Value) -> Self {
        Value::Choice {
            variant: variant.into(),
            value: Box::new(value),
        }
    }

    /// Downcast a leaf value to a concrete type, if this is a `Leaf` of
    /// that type.
    pub fn as_leaf<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Leaf(leaf) => leaf.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Record(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_round_trip_downcast() {
        let v = Value::leaf(30i64);
        assert_eq!(v.as_leaf::<i64>(), Some(&30));
        assert_eq!(v.as_leaf::<String>(), None);
    }

    #[test]
    fn leaf_equality_is_by_concrete_value() {
        assert_eq!(Value::leaf(30i64), Value::leaf(30i64));
        assert_ne!(Value::leaf(30i64), Value::leaf(31i64));
    }

    #[test]
    fn bytes_helper() {
        let v = Value::bytes(vec![0x41u8, 0x42, 0x43]);
        assert_eq!(v.as_leaf::<Vec<u8>>(), Some(&vec![0x41, 0x42, 0x43]));
    }
}
