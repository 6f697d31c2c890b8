//! The schema-driven parse engine (spec.md §4.3).
//!
//! Grounded on `dlms-asn1::ber::decoder::BerDecoder` for the low-level TLV
//! walk (peek tag, read content, advance), generalized from one
//! hand-written `decode_*` method per ASN.1 type into a single recursive
//! dispatcher driven by a `Schema` tree.

use std::collections::HashMap;

use crate::error::{TlvError, TlvResult};
use crate::header::decode_header;
use crate::schema::Schema;
use crate::tag::Tag;
use crate::util::{compare_unsigned_lex, DepthGuard};
use crate::value::Value;

/// `Parser` construction options (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    pub strict: bool,
    pub max_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            strict: true,
            max_depth: 100,
        }
    }
}

pub struct Parser {
    schema: Schema,
    options: ParserOptions,
}

impl Parser {
    pub fn new(schema: Schema, options: ParserOptions) -> Self {
        Self { schema, options }
    }

    /// Parse `data` against the schema given at construction (spec.md
    /// §4.3 "Top-level parse").
    pub fn parse(&self, data: &[u8]) -> TlvResult<Value> {
        if self.schema.is_repeated() {
            return Err(TlvError::InvalidTag(
                "a top-level schema cannot be Repeated: there is no enclosing tag".into(),
            ));
        }

        let guard = DepthGuard::new(self.options.max_depth);
        let (value, consumed) = self.parse_field(&self.schema, data, &guard)?;

        if self.options.strict && consumed != data.len() {
            log::warn!(
                "strict parse left {} trailing byte(s) after consuming {consumed}",
                data.len() - consumed
            );
            return Err(TlvError::TrailingBytes(format!(
                "{} trailing byte(s) after a {consumed}-byte value",
                data.len() - consumed
            )));
        }

        Ok(value)
    }

    /// Parse one field's TLV at the start of `data`. Returns the value and
    /// the number of bytes consumed (header + content).
    fn parse_field(&self, schema: &Schema, data: &[u8], guard: &DepthGuard) -> TlvResult<(Value, usize)> {
        let _token = guard.enter(schema.name())?;
        log::trace!("parsing field `{}`", schema.name());

        match schema {
            Schema::Primitive(p) => {
                let header = decode_header(data)?;
                if header.tag.class != p.tag.class || header.tag.number != p.tag.number || header.tag.constructed {
                    return Err(TlvError::TagMismatch(format!(
                        "field `{}`: expected {:?}, found {:?}",
                        p.name, p.tag, header.tag
                    )));
                }
                let content = &data[header.header_byte_count..header.header_byte_count + header.length];
                let value = (p.codec.decode)(content)
                    .map_err(|e| TlvError::DecodeFailed(format!("field `{}`: {e}", p.name)))?;
                Ok((value, header.header_byte_count + header.length))
            }

            Schema::Constructed(c) => {
                let header = decode_header(data)?;
                if header.tag.class != c.tag.class || header.tag.number != c.tag.number || !header.tag.constructed {
                    return Err(TlvError::TagMismatch(format!(
                        "field `{}`: expected {:?}, found {:?}",
                        c.name, c.tag, header.tag
                    )));
                }
                let content = &data[header.header_byte_count..header.header_byte_count + header.length];
                let total = header.header_byte_count + header.length;

                if c.children.is_empty() {
                    // Opaque placeholder (spec.md §3 invariant 7, §9 "empty
                    // constructed containers"): accept and discard.
                    return Ok((Value::Record(HashMap::new()), total));
                }

                let fields = if c.is_set {
                    self.parse_set(&c.children, content, guard, &c.name)?
                } else {
                    self.parse_sequence(&c.children, content, guard)?
                };
                Ok((Value::Record(fields), total))
            }

            Schema::Repeated(r) => Err(TlvError::InvalidTag(format!(
                "field `{}`: a Repeated schema cannot be parsed as a single TLV",
                r.name
            ))),

            Schema::Choice(ch) => {
                let peeked = peek_tag(data)?;
                let alt = ch.alternatives.iter().find(|(_, sub)| sub.matches_tag(&peeked));
                match alt {
                    Some((variant, sub_schema)) => {
                        let (value, consumed) = self.parse_field(sub_schema, data, guard)?;
                        Ok((Value::choice(variant.clone(), value), consumed))
                    }
                    None => Err(TlvError::NoChoiceMatch(format!(
                        "choice `{}`: no alternative matches tag {:?}",
                        ch.name, peeked
                    ))),
                }
            }
        }
    }

    /// SEQUENCE matching: linear, order-preserving (spec.md §4.3).
    fn parse_sequence(&self, children: &[Schema], content: &[u8], guard: &DepthGuard) -> TlvResult<HashMap<String, Value>> {
        let mut offset = 0usize;
        let end = content.len();
        let mut fields = HashMap::new();

        for schema in children {
            if schema.is_repeated() {
                let element = match schema {
                    Schema::Repeated(r) => r.element.as_ref(),
                    _ => unreachable!(),
                };
                let mut items = Vec::new();
                while offset < end {
                    let tag = peek_tag(&content[offset..])?;
                    if !element.matches_tag(&tag) {
                        break;
                    }
                    let (value, consumed) = self.parse_field(element, &content[offset..], guard)?;
                    items.push(value);
                    offset += consumed;
                }
                fields.insert(schema.name().to_string(), Value::List(items));
                continue;
            }

            let matched = offset < end && schema.matches_tag(&peek_tag(&content[offset..])?);
            if matched {
                let (value, consumed) = self.parse_field(schema, &content[offset..], guard)?;
                fields.insert(schema.name().to_string(), value);
                offset += consumed;
                continue;
            }

            if let Schema::Primitive(p) = schema
                && let Some(default) = &p.default_value
            {
                fields.insert(schema.name().to_string(), default.clone());
                continue;
            }

            if schema.is_optional() {
                continue;
            }

            if offset >= end {
                return Err(TlvError::MissingRequired(format!(
                    "required field `{}` is absent",
                    schema.name()
                )));
            } else {
                return Err(TlvError::SequenceMismatch(format!(
                    "expected field `{}` ({:?}), found {:?}",
                    schema.name(),
                    schema.matching_tags(),
                    peek_tag(&content[offset..])?
                )));
            }
        }

        if offset != end {
            return Err(TlvError::UnexpectedExtraChild(format!(
                "{} byte(s) remain after all SEQUENCE fields were matched",
                end - offset
            )));
        }

        Ok(fields)
    }

    /// SET matching: order-independent, with unknown-child rejection
    /// always on and DER canonical-order checking in strict mode (spec.md
    /// §4.3).
    fn parse_set(
        &self,
        children: &[Schema],
        content: &[u8],
        guard: &DepthGuard,
        set_name: &str,
    ) -> TlvResult<HashMap<String, Value>> {
        let mut entries: Vec<(Tag, &[u8])> = Vec::new();
        let mut offset = 0usize;
        while offset < content.len() {
            let header = decode_header(&content[offset..])?;
            let total = header.header_byte_count + header.length;
            entries.push((header.tag, &content[offset..offset + total]));
            offset += total;
        }

        for (tag, _) in &entries {
            if !children.iter().any(|s| s.matches_tag(tag)) {
                return Err(TlvError::UnknownChild(format!(
                    "SET `{set_name}`: child tag {tag:?} matches no declared field"
                )));
            }
        }

        if self.options.strict {
            for window in entries.windows(2) {
                if compare_unsigned_lex(window[0].1, window[1].1) == std::cmp::Ordering::Greater {
                    log::warn!("SET `{set_name}` children are not in DER canonical order");
                    return Err(TlvError::DerOrder(format!(
                        "SET `{set_name}`: children are not in ascending canonical order"
                    )));
                }
            }
        }

        let mut consumed = vec![false; entries.len()];
        let mut fields = HashMap::new();

        for schema in children {
            if schema.is_repeated() {
                let element = match schema {
                    Schema::Repeated(r) => r.element.as_ref(),
                    _ => unreachable!(),
                };
                let mut items = Vec::new();
                for (i, (tag, raw)) in entries.iter().enumerate() {
                    if consumed[i] || !element.matches_tag(tag) {
                        continue;
                    }
                    let (value, _) = self.parse_field(element, raw, guard)?;
                    items.push(value);
                    consumed[i] = true;
                }
                if items.is_empty() && !schema.is_optional() {
                    return Err(TlvError::MissingRequired(format!(
                        "required repeated field `{}` matched zero children",
                        schema.name()
                    )));
                }
                fields.insert(schema.name().to_string(), Value::List(items));
                continue;
            }

            let found = entries
                .iter()
                .enumerate()
                .find(|(i, (tag, _))| !consumed[*i] && schema.matches_tag(tag));

            match found {
                Some((i, (_, raw))) => {
                    let (value, _) = self.parse_field(schema, raw, guard)?;
                    fields.insert(schema.name().to_string(), value);
                    consumed[i] = true;
                }
                None => {
                    if let Schema::Primitive(p) = schema
                        && let Some(default) = &p.default_value
                    {
                        fields.insert(schema.name().to_string(), default.clone());
                        continue;
                    }
                    if schema.is_optional() {
                        continue;
                    }
                    return Err(TlvError::MissingRequired(format!(
                        "required field `{}` is absent from SET `{set_name}`",
                        schema.name()
                    )));
                }
            }
        }

        if consumed.iter().any(|&c| !c) {
            return Err(TlvError::UnexpectedExtraChild(format!(
                "SET `{set_name}`: one or more children were not claimed by any field"
            )));
        }

        Ok(fields)
    }
}

fn peek_tag(data: &[u8]) -> TlvResult<Tag> {
    Ok(decode_header(data)?.tag)
}
