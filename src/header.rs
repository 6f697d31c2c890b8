//! The full TLV header: tag + length, plus content-slice extraction.
//!
//! Grounded on `dlms-asn1::ber::decoder::BerDecoder::decode_tlv` and
//! `dlms-asn1::ber::encoder::BerEncoder::encode_tlv`, generalized from a
//! single encoder/decoder pair with a private cursor into two free
//! functions the schema-driven engine (`parser`/`builder`) calls directly
//! against borrowed slices.

use crate::error::{TlvError, TlvResult};
use crate::length::Length;
use crate::tag::Tag;

/// A decoded TLV header: the tag, the declared content length, and how
/// many header bytes (tag + length octets) were consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvHeader {
    pub tag: Tag,
    pub length: usize,
    pub header_byte_count: usize,
}

/// Decode a TLV header at the start of `data`. Returns the header; the
/// content occupies `data[header.header_byte_count..][..header.length]`.
pub fn decode_header(data: &[u8]) -> TlvResult<TlvHeader> {
    let (tag, tag_bytes) = Tag::decode(data)?;
    let (length, length_bytes) = Length::decode(&data[tag_bytes..])?;
    let header_byte_count = tag_bytes + length_bytes;

    if data.len() < header_byte_count + length.value() {
        return Err(TlvError::Truncated(format!(
            "content extends past buffer end: need {} bytes, have {}",
            length.value(),
            data.len().saturating_sub(header_byte_count)
        )));
    }

    Ok(TlvHeader {
        tag,
        length: length.value(),
        header_byte_count,
    })
}

/// Decode a full TLV unit. Returns `(tag, content_slice, total_bytes)`.
pub fn decode_tlv(data: &[u8]) -> TlvResult<(Tag, &[u8], usize)> {
    let header = decode_header(data)?;
    let content = &data[header.header_byte_count..header.header_byte_count + header.length];
    let total = header.header_byte_count + header.length;
    Ok((header.tag, content, total))
}

/// Encode a TLV header + content into one buffer.
pub fn encode_tlv(tag: &Tag, content: &[u8]) -> TlvResult<Vec<u8>> {
    let mut out = tag.encode()?;
    out.extend(Length::minimal(content.len()).encode()?);
    out.extend_from_slice(content);
    Ok(out)
}
