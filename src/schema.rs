//! The schema model: immutable Primitive / Constructed / Repeated / Choice
//! descriptors (spec.md §3 `Schema`, §4.2, §6 factory functions).
//!
//! Where `dlms-asn1::iso_acse::pdu` hand-writes one `encode`/`decode` pair
//! per ASN.1 PDU type, with each field's context tag and optionality
//! spelled out inline (see `AARQApdu::encode`), this module turns that
//! per-field tag/optional/constructed bookkeeping into a declarative tree
//! that `parser`/`builder` walk generically instead of re-deriving it once
//! per message type.

use std::sync::Arc;

use crate::error::{TlvError, TlvResult};
use crate::tag::{Tag, TagClass};
use crate::value::Value;

/// A primitive's decode callback: raw content bytes to a `Value::Leaf`.
pub type DecodeFn = Arc<dyn Fn(&[u8]) -> TlvResult<Value> + Send + Sync>;
/// A primitive's encode callback: a `Value` to raw content bytes.
pub type EncodeFn = Arc<dyn Fn(&Value) -> TlvResult<Vec<u8>> + Send + Sync>;

/// The default codec: raw bytes in, raw bytes out (spec.md §4.2).
fn identity_decode() -> DecodeFn {
    Arc::new(|bytes: &[u8]| Ok(Value::bytes(bytes.to_vec())))
}

fn identity_encode() -> EncodeFn {
    Arc::new(|value: &Value| {
        value
            .as_leaf::<Vec<u8>>()
            .cloned()
            .ok_or_else(|| TlvError::EncodeFailed("expected a Vec<u8> leaf for identity codec".into()))
    })
}

/// A caller-supplied decode/encode pair for a primitive field.
#[derive(Clone)]
pub struct Codec {
    pub decode: DecodeFn,
    pub encode: EncodeFn,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            decode: identity_decode(),
            encode: identity_encode(),
        }
    }
}

#[derive(Clone)]
pub struct PrimitiveSchema {
    pub name: String,
    pub tag: Tag,
    pub optional: bool,
    pub default_value: Option<Value>,
    pub codec: Codec,
}

#[derive(Clone)]
pub struct ConstructedSchema {
    pub name: String,
    pub tag: Tag,
    pub optional: bool,
    pub is_set: bool,
    pub children: Vec<Schema>,
}

#[derive(Clone)]
pub struct RepeatedSchema {
    pub name: String,
    pub optional: bool,
    pub element: Box<Schema>,
}

#[derive(Clone)]
pub struct ChoiceSchema {
    pub name: String,
    pub optional: bool,
    pub alternatives: Vec<(String, Schema)>,
}

/// A tagged-variant schema descriptor (spec.md §3, §9 "Tagged variants
/// over inheritance").
#[derive(Clone)]
pub enum Schema {
    Primitive(PrimitiveSchema),
    Constructed(ConstructedSchema),
    Repeated(RepeatedSchema),
    Choice(ChoiceSchema),
}

impl Schema {
    pub fn name(&self) -> &str {
        match self {
            Schema::Primitive(s) => &s.name,
            Schema::Constructed(s) => &s.name,
            Schema::Repeated(s) => &s.name,
            Schema::Choice(s) => &s.name,
        }
    }

    pub fn is_optional(&self) -> bool {
        match self {
            Schema::Primitive(s) => s.optional,
            Schema::Constructed(s) => s.optional,
            Schema::Repeated(s) => s.optional,
            Schema::Choice(s) => s.optional,
        }
    }

    pub fn is_repeated(&self) -> bool {
        matches!(self, Schema::Repeated(_))
    }

    /// The tags this schema matches against a wire child (spec.md §4.5
    /// `match_field_tag`): a single tag for Primitive/Constructed, the
    /// element's tags for Repeated, and the union of alternative tags for
    /// Choice.
    pub fn matching_tags(&self) -> Vec<Tag> {
        match self {
            Schema::Primitive(s) => vec![s.tag],
            Schema::Constructed(s) => vec![s.tag],
            Schema::Repeated(s) => s.element.matching_tags(),
            Schema::Choice(s) => s.alternatives.iter().flat_map(|(_, alt)| alt.matching_tags()).collect(),
        }
    }

    /// Does this field (or, for Repeated, its element) match `tag`?
    pub fn matches_tag(&self, tag: &Tag) -> bool {
        self.matching_tags().iter().any(|t| t == tag)
    }
}

/// Options shared by a primitive field.
pub struct PrimitiveOptions {
    pub tag_class: TagClass,
    pub tag_number: u64,
    pub optional: bool,
    pub default_value: Option<Value>,
}

impl PrimitiveOptions {
    pub fn new(tag_class: TagClass, tag_number: u64) -> Self {
        Self {
            tag_class,
            tag_number,
            optional: false,
            default_value: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Invariant 1 (spec.md §3): a primitive schema without a tag is malformed.
/// Enforced by `PrimitiveOptions` always carrying one, so this factory
/// cannot construct a tagless primitive.
pub fn primitive(name: impl Into<String>, options: PrimitiveOptions) -> Schema {
    primitive_with_codec(name, options, Codec::default())
}

pub fn primitive_with_codec(name: impl Into<String>, options: PrimitiveOptions, codec: Codec) -> Schema {
    Schema::Primitive(PrimitiveSchema {
        name: name.into(),
        tag: Tag::new(options.tag_class, options.tag_number, false),
        optional: options.optional,
        default_value: options.default_value,
        codec,
    })
}

pub struct ConstructedOptions {
    pub tag_class: TagClass,
    pub tag_number: u64,
    pub optional: bool,
    pub is_set: Option<bool>,
}

impl ConstructedOptions {
    pub fn new(tag_class: TagClass, tag_number: u64) -> Self {
        Self {
            tag_class,
            tag_number,
            optional: false,
            is_set: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn is_set(mut self, is_set: bool) -> Self {
        self.is_set = Some(is_set);
        self
    }
}

/// SET/SEQUENCE inference (spec.md §4.2): Universal 17 defaults to SET,
/// Universal 16 to SEQUENCE, everything else to SEQUENCE-style ordering
/// unless the caller overrides `is_set`.
fn infer_is_set(tag_class: TagClass, tag_number: u64, override_is_set: Option<bool>) -> bool {
    if let Some(v) = override_is_set {
        return v;
    }
    matches!(tag_class, TagClass::Universal) && tag_number == 17
}

/// Builds a Constructed schema. Panics if two children share a name
/// (invariant 2, spec.md §3) — a schema-construction-time programmer
/// error, not a runtime/wire condition.
pub fn constructed(name: impl Into<String>, options: ConstructedOptions, children: Vec<Schema>) -> Schema {
    let mut seen = std::collections::HashSet::new();
    for child in &children {
        if !seen.insert(child.name().to_string()) {
            panic!("duplicate child name `{}` in constructed schema", child.name());
        }
    }

    let is_set = infer_is_set(options.tag_class, options.tag_number, options.is_set);
    Schema::Constructed(ConstructedSchema {
        name: name.into(),
        tag: Tag::new(options.tag_class, options.tag_number, true),
        optional: options.optional,
        is_set,
        children,
    })
}

pub fn repeated(name: impl Into<String>, optional: bool, element: Schema) -> Schema {
    Schema::Repeated(RepeatedSchema {
        name: name.into(),
        optional,
        element: Box::new(element),
    })
}

/// Builds a Choice schema. Panics if `alternatives` is empty or if two
/// alternatives' tag sets overlap (invariant 3, spec.md §3).
pub fn choice(name: impl Into<String>, optional: bool, alternatives: Vec<(String, Schema)>) -> Schema {
    assert!(!alternatives.is_empty(), "a choice schema needs at least one alternative");

    for i in 0..alternatives.len() {
        for j in (i + 1)..alternatives.len() {
            let a_tags = alternatives[i].1.matching_tags();
            let b_tags = alternatives[j].1.matching_tags();
            if a_tags.iter().any(|a| b_tags.contains(a)) {
                panic!(
                    "choice alternatives `{}` and `{}` have overlapping tags",
                    alternatives[i].0, alternatives[j].0
                );
            }
        }
    }

    Schema::Choice(ChoiceSchema {
        name: name.into(),
        optional,
        alternatives,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructed_infers_set_from_universal_17() {
        let s = constructed(
            "s",
            ConstructedOptions::new(TagClass::Universal, 17),
            vec![],
        );
        match s {
            Schema::Constructed(c) => assert!(c.is_set),
            _ => panic!("expected Constructed"),
        }
    }

    #[test]
    fn constructed_infers_sequence_from_universal_16() {
        let s = constructed(
            "s",
            ConstructedOptions::new(TagClass::Universal, 16),
            vec![],
        );
        match s {
            Schema::Constructed(c) => assert!(!c.is_set),
            _ => panic!("expected Constructed"),
        }
    }

    #[test]
    fn constructed_is_set_override_wins() {
        let s = constructed(
            "s",
            ConstructedOptions::new(TagClass::Universal, 16).is_set(true),
            vec![],
        );
        match s {
            Schema::Constructed(c) => assert!(c.is_set),
            _ => panic!("expected Constructed"),
        }
    }

    #[test]
    #[should_panic(expected = "duplicate child name")]
    fn constructed_rejects_duplicate_child_names() {
        constructed(
            "s",
            ConstructedOptions::new(TagClass::Universal, 16),
            vec![
                primitive("x", PrimitiveOptions::new(TagClass::Universal, 2)),
                primitive("x", PrimitiveOptions::new(TagClass::Universal, 4)),
            ],
        );
    }

    #[test]
    #[should_panic(expected = "overlapping tags")]
    fn choice_rejects_ambiguous_alternatives() {
        choice(
            "c",
            false,
            vec![
                ("a".into(), primitive("a", PrimitiveOptions::new(TagClass::Universal, 2))),
                ("b".into(), primitive("b", PrimitiveOptions::new(TagClass::Universal, 2))),
            ],
        );
    }

    #[test]
    fn repeated_matches_element_tag() {
        let r = repeated(
            "items",
            false,
            primitive("item", PrimitiveOptions::new(TagClass::Universal, 12)),
        );
        assert!(r.matches_tag(&Tag::universal(12, false)));
        assert!(!r.matches_tag(&Tag::universal(4, false)));
    }
}
