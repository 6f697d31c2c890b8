//! The schema-driven build engine (spec.md §4.4): the inverse of `parser`.
//!
//! Grounded on `dlms-asn1::ber::encoder::BerEncoder` and the per-PDU
//! `encode` methods in `dlms-asn1::iso_acse::pdu` (each of which builds a
//! tag, collects child bytes, then wraps them in a length-prefixed TLV),
//! generalized the same way `parser.rs` generalizes the decode side: one
//! recursive dispatcher driven by `Schema` instead of one method per type.

use std::collections::HashMap;

use crate::error::{TlvError, TlvResult};
use crate::header::encode_tlv;
use crate::schema::Schema;
use crate::util::compare_unsigned_lex;
use crate::value::Value;

/// `Builder` construction options (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct BuilderOptions {
    pub strict: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

pub struct Builder {
    schema: Schema,
    options: BuilderOptions,
}

impl Builder {
    pub fn new(schema: Schema, options: BuilderOptions) -> Self {
        Self { schema, options }
    }

    /// Build the wire encoding of `value` against the schema given at
    /// construction (spec.md §4.4 "Top-level build").
    pub fn build(&self, value: &Value) -> TlvResult<Vec<u8>> {
        if self.schema.is_repeated() {
            return Err(TlvError::InvalidTag(
                "a top-level schema cannot be Repeated: there is no enclosing tag".into(),
            ));
        }
        self.build_field(&self.schema, value)
    }

    fn build_field(&self, schema: &Schema, value: &Value) -> TlvResult<Vec<u8>> {
        log::trace!("building field `{}`", schema.name());

        match schema {
            Schema::Primitive(p) => {
                let content = (p.codec.encode)(value)
                    .map_err(|e| TlvError::EncodeFailed(format!("field `{}`: {e}", p.name)))?;
                encode_tlv(&p.tag, &content)
            }

            Schema::Constructed(c) => {
                if c.children.is_empty() {
                    return encode_tlv(&c.tag, &[]);
                }
                let fields = value.as_record().ok_or_else(|| {
                    TlvError::EncodeFailed(format!("field `{}`: expected a Record value", c.name))
                })?;
                let content = self.build_constructed_content(&c.children, fields, c.is_set)?;
                encode_tlv(&c.tag, &content)
            }

            Schema::Repeated(r) => Err(TlvError::InvalidTag(format!(
                "field `{}`: a Repeated schema cannot be built as a single TLV",
                r.name
            ))),

            Schema::Choice(ch) => match value {
                Value::Choice { variant, value: inner } => {
                    let alt = ch.alternatives.iter().find(|(name, _)| name == variant).ok_or_else(|| {
                        TlvError::EncodeFailed(format!(
                            "choice `{}`: no alternative named `{variant}`",
                            ch.name
                        ))
                    })?;
                    self.build_field(&alt.1, inner)
                }
                _ => Err(TlvError::EncodeFailed(format!(
                    "choice `{}`: expected a Value::Choice",
                    ch.name
                ))),
            },
        }
    }

    /// Builds the concatenated child TLVs for a Constructed field, sorting
    /// them into DER canonical order when the field is a SET under strict
    /// options (spec.md §4.4).
    fn build_constructed_content(&self, children: &[Schema], fields: &HashMap<String, Value>, is_set: bool) -> TlvResult<Vec<u8>> {
        let mut blobs: Vec<Vec<u8>> = Vec::new();

        for schema in children {
            if schema.is_repeated() {
                let element = match schema {
                    Schema::Repeated(r) => r.element.as_ref(),
                    _ => unreachable!(),
                };
                match fields.get(schema.name()) {
                    Some(Value::List(items)) => {
                        if items.is_empty() && !schema.is_optional() {
                            return Err(TlvError::MissingRequiredBuild(format!(
                                "required repeated field `{}` has zero elements",
                                schema.name()
                            )));
                        }
                        for item in items {
                            blobs.push(self.build_field(element, item)?);
                        }
                    }
                    Some(_) => {
                        return Err(TlvError::NonArrayForRepeated(format!(
                            "field `{}` is Repeated but its value is not a List",
                            schema.name()
                        )))
                    }
                    None if schema.is_optional() => {}
                    None => {
                        return Err(TlvError::MissingRequiredBuild(format!(
                            "required repeated field `{}` is absent",
                            schema.name()
                        )))
                    }
                }
                continue;
            }

            match fields.get(schema.name()) {
                Some(v) => blobs.push(self.build_field(schema, v)?),
                None if schema.is_optional() => {}
                None if matches!(schema, Schema::Primitive(p) if p.default_value.is_some()) => {
                    // A default-valued field elides the DER encoding for its
                    // default on the wire; the decoder re-derives it.
                }
                None => {
                    return Err(TlvError::MissingRequiredBuild(format!(
                        "required field `{}` is absent",
                        schema.name()
                    )))
                }
            }
        }

        if is_set && self.options.strict {
            blobs.sort_by(|a, b| compare_unsigned_lex(a, b));
        }

        Ok(blobs.concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{constructed, primitive, ConstructedOptions, PrimitiveOptions};
    use crate::tag::TagClass;

    #[test]
    fn builds_primitive_octet_string() {
        let schema = primitive("s", PrimitiveOptions::new(TagClass::Universal, 4));
        let builder = Builder::new(schema, BuilderOptions { strict: true });
        let encoded = builder.build(&Value::bytes(vec![0x41, 0x42, 0x43])).unwrap();
        assert_eq!(encoded, vec![0x04, 0x03, 0x41, 0x42, 0x43]);
    }

    #[test]
    fn builds_set_in_der_canonical_order_regardless_of_map_order() {
        let schema = constructed(
            "s",
            ConstructedOptions::new(TagClass::Universal, 17),
            vec![
                primitive("a", PrimitiveOptions::new(TagClass::Universal, 4)),
                primitive("b", PrimitiveOptions::new(TagClass::Universal, 2)),
            ],
        );
        let builder = Builder::new(schema, BuilderOptions { strict: true });

        let mut fields = HashMap::new();
        fields.insert("a".to_string(), Value::bytes(vec![0xFF]));
        fields.insert("b".to_string(), Value::bytes(vec![0x01]));
        let encoded = builder.build(&Value::record(fields)).unwrap();

        // tag 2's TLV (02 01 01) sorts before tag 4's TLV (04 01 FF).
        assert_eq!(encoded, vec![0x31, 0x06, 0x02, 0x01, 0x01, 0x04, 0x01, 0xFF]);
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let schema = constructed(
            "s",
            ConstructedOptions::new(TagClass::Universal, 16),
            vec![primitive("a", PrimitiveOptions::new(TagClass::Universal, 4))],
        );
        let builder = Builder::new(schema, BuilderOptions::default());
        let result = builder.build(&Value::record(HashMap::new()));
        assert!(matches!(result, Err(TlvError::MissingRequiredBuild(_))));
    }
}
