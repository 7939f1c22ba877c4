//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Shared machinery for the binary wire format (spec §4.K/§6.5): the
//! chunked-subtree writer/reader, the value-payload tag byte, and the
//! sibling-hash-table collision resolution scheme. [`crate::parse::binary`]
//! and [`crate::print::binary`] are thin drivers over what lives here.

use crate::error::{Error, Result};
use crate::schema::{SchemaNode, Type};
use crate::value::{DataValueType, Value};
use std::cell::Cell;
use std::rc::Rc;

pub const MAGIC: [u8; 3] = *b"lyb";
pub const VERSION: u8 = 0;

/// Maximum bytes in a single chunk body before the writer injects another
/// chunk-header and daisy-chains (§6.5: "when a body exceeds 255 bytes").
pub const MAX_CHUNK_BYTES: usize = 255;

/// Tracks in-progress chunk headers reserved via a write-skip: two bytes
/// are reserved at the start of a subtree and patched with
/// `(bytes-in-chunk, inner-chunk-count)` once the subtree body is known.
#[derive(Default)]
pub struct ChunkWriter {
    /// Byte offset into the output buffer of each currently open chunk's
    /// reserved 2-byte header.
    stack: Vec<usize>,
}

impl ChunkWriter {
    pub fn new() -> ChunkWriter {
        ChunkWriter::default()
    }

    /// Reserve a chunk header at the current end of `buf`, to be patched
    /// by a matching `end_chunk`.
    pub fn start_chunk(&mut self, buf: &mut Vec<u8>) {
        self.stack.push(buf.len());
        buf.extend_from_slice(&[0u8, 0u8]);
    }

    /// Close the most recently opened chunk, splitting its body into
    /// `MAX_CHUNK_BYTES`-sized segments if needed and patching every
    /// resulting chunk header in place.
    pub fn end_chunk(&mut self, buf: &mut Vec<u8>) {
        let header_pos = self.stack.pop().expect("end_chunk without start_chunk");
        let body_start = header_pos + 2;
        let body_len = buf.len() - body_start;

        if body_len <= MAX_CHUNK_BYTES {
            buf[header_pos] = body_len as u8;
            buf[header_pos + 1] = 0;
            return;
        }

        // Daisy-chain: split the body into MAX_CHUNK_BYTES pieces. The
        // first piece reuses the header already reserved at `header_pos`;
        // every later piece gets its own `[len, inner_count]` header
        // inserted right before it, so the whole thing reads back as one
        // flat sequence of `[len, inner_count] + len bytes` records ending
        // in `inner_count == 0` (§6.5).
        let body: Vec<u8> = buf.split_off(body_start);
        let pieces: Vec<&[u8]> = body.chunks(MAX_CHUNK_BYTES).collect();
        let total = pieces.len();
        for (i, piece) in pieces.iter().enumerate() {
            let remaining = (total - 1 - i) as u8;
            if i == 0 {
                buf[header_pos] = piece.len() as u8;
                buf[header_pos + 1] = remaining;
            } else {
                buf.push(piece.len() as u8);
                buf.push(remaining);
            }
            buf.extend_from_slice(piece);
        }
    }
}

/// Reassembles a chunked subtree body back into a contiguous byte buffer.
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> ChunkReader<'a> {
        ChunkReader { data, pos: 0 }
    }

    /// Read one chunked subtree body (a sequence of `[len, inner_count]`
    /// headers each followed by `len` bytes, `inner_count` extra chained
    /// chunks) and return the reassembled bytes plus the reader position
    /// just past it.
    pub fn read_chunked(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let len = *self
                .data
                .get(self.pos)
                .ok_or_else(|| Error::InputSyntax {
                    format: "binary",
                    path: None,
                })? as usize;
            let inner_count = *self
                .data
                .get(self.pos + 1)
                .ok_or_else(|| Error::InputSyntax {
                    format: "binary",
                    path: None,
                })?;
            self.pos += 2;
            let end = self.pos + len;
            if end > self.data.len() {
                return Err(Error::InputSyntax {
                    format: "binary",
                    path: None,
                });
            }
            out.extend_from_slice(&self.data[self.pos..end]);
            self.pos = end;
            if inner_count == 0 {
                break;
            }
        }
        Ok(out)
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

/// 5-bit type tags for the value-payload byte, independent of
/// `DataValueType`'s libyang-compatible numbering (§6.5 only promises 5
/// bits, so this is its own compact space).
fn type_tag(ty: DataValueType) -> u8 {
    ty as u8 & 0x1f
}

pub fn type_from_tag(tag: u8) -> Option<DataValueType> {
    use DataValueType::*;
    let all = [
        Unknown, Binary, Uint8, Uint16, Uint32, Uint64, String, Bits, Bool, Dec64,
        Empty, Enum, IdentityRef, InstanceId, LeafRef, Union, Int8, Int16, Int32,
        Int64,
    ];
    all.into_iter().find(|t| type_tag(*t) == tag)
}

/// Build the `ABCD_DDDD` value-payload tag byte.
pub fn encode_tag(default: bool, user_plugin: bool, unresolved: bool, ty: DataValueType) -> u8 {
    let mut b = type_tag(ty);
    if default {
        b |= 0x80;
    }
    if user_plugin {
        b |= 0x40;
    }
    if unresolved {
        b |= 0x20;
    }
    b
}

pub fn decode_tag(byte: u8) -> (bool, bool, bool, u8) {
    let default = byte & 0x80 != 0;
    let user_plugin = byte & 0x40 != 0;
    let unresolved = byte & 0x20 != 0;
    (default, user_plugin, unresolved, byte & 0x1f)
}

/// Serialize a resolved value's type-specific payload (§6.5). Unresolved
/// leafref/instance-identifier/union values are serialized by their raw
/// canonical string regardless of declared type, since the payload must
/// round-trip even before resolution runs.
pub fn encode_value_payload(value: &Value) -> Vec<u8> {
    match value {
        Value::Uint8(v) => vec![*v],
        Value::Int8(v) => vec![*v as u8],
        Value::Uint16(v) => v.to_le_bytes().to_vec(),
        Value::Int16(v) => v.to_le_bytes().to_vec(),
        Value::Uint32(v) => v.to_le_bytes().to_vec(),
        Value::Int32(v) => v.to_le_bytes().to_vec(),
        Value::Uint64(v) => v.to_le_bytes().to_vec(),
        Value::Int64(v) => v.to_le_bytes().to_vec(),
        Value::Bool(v) => vec![*v as u8],
        Value::Empty => Vec::new(),
        Value::Decimal64 { unscaled, .. } => unscaled.to_le_bytes().to_vec(),
        Value::Bits(flags) => {
            let mut out = vec![0u8; flags.len().div_ceil(8)];
            for (i, set) in flags.iter().enumerate() {
                if *set {
                    out[i / 8] |= 1 << (i % 8);
                }
            }
            out
        }
        Value::Enum(_, ordinal) => encode_min_width(*ordinal),
        Value::String(s) => encode_length_prefixed(s.as_bytes()),
        Value::Binary(b) => encode_length_prefixed(b),
        Value::IdentityRef(s) => encode_length_prefixed(s.as_bytes()),
        Value::InstanceIdentifier { canonical, .. } => {
            encode_length_prefixed(canonical.as_bytes())
        }
        Value::Leafref { path, .. } => encode_length_prefixed(path.as_bytes()),
        Value::Union { value, .. } => encode_value_payload(value),
    }
}

fn encode_length_prefixed(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + bytes.len());
    out.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
    out.extend_from_slice(bytes);
    out
}

fn encode_min_width(ordinal: i64) -> Vec<u8> {
    if let Ok(v) = i8::try_from(ordinal) {
        vec![v as u8]
    } else if let Ok(v) = i16::try_from(ordinal) {
        v.to_le_bytes().to_vec()
    } else if let Ok(v) = i32::try_from(ordinal) {
        v.to_le_bytes().to_vec()
    } else {
        ordinal.to_le_bytes().to_vec()
    }
}

fn payload_err() -> Error {
    Error::InputSyntax {
        format: "binary",
        path: None,
    }
}

fn decode_length_prefixed(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.len() < 2 {
        return Err(payload_err());
    }
    let len = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
    let end = 2 + len;
    if bytes.len() < end {
        return Err(payload_err());
    }
    Ok(bytes[2..end].to_vec())
}

fn decode_length_prefixed_string(bytes: &[u8]) -> Result<String> {
    String::from_utf8(decode_length_prefixed(bytes)?).map_err(|_| payload_err())
}

fn decode_min_width(bytes: &[u8]) -> Result<i64> {
    match bytes.len() {
        1 => Ok(bytes[0] as i8 as i64),
        2 => Ok(i16::from_le_bytes(bytes.try_into().map_err(|_| payload_err())?) as i64),
        4 => Ok(i32::from_le_bytes(bytes.try_into().map_err(|_| payload_err())?) as i64),
        8 => Ok(i64::from_le_bytes(bytes.try_into().map_err(|_| payload_err())?)),
        _ => Err(payload_err()),
    }
}

/// Inverse of [`encode_value_payload`]. Needs the declared `Type` (for
/// `bits`/`enum`/`decimal64`'s schema-dependent shape) and the tag's
/// `unresolved` bit (leafref/instance-identifier/union values written
/// before resolution are always a raw canonical string, regardless of
/// declared type).
pub fn decode_value_payload(ty: &Type, unresolved: bool, bytes: &[u8]) -> Result<Value> {
    use DataValueType::*;

    if unresolved {
        let s = decode_length_prefixed_string(bytes)?;
        return match ty.base_type() {
            LeafRef => Ok(Value::Leafref {
                path: s,
                cached: Rc::new(Cell::new(None)),
            }),
            InstanceId => Ok(Value::InstanceIdentifier {
                canonical: s,
                resolved: Rc::new(Cell::new(None)),
            }),
            _ => crate::value::parse_value(ty, &s),
        };
    }

    match ty.base_type() {
        Uint8 => Ok(Value::Uint8(*bytes.first().ok_or_else(payload_err)?)),
        Int8 => Ok(Value::Int8(*bytes.first().ok_or_else(payload_err)? as i8)),
        Uint16 => Ok(Value::Uint16(u16::from_le_bytes(
            bytes.get(0..2).and_then(|s| s.try_into().ok()).ok_or_else(payload_err)?,
        ))),
        Int16 => Ok(Value::Int16(i16::from_le_bytes(
            bytes.get(0..2).and_then(|s| s.try_into().ok()).ok_or_else(payload_err)?,
        ))),
        Uint32 => Ok(Value::Uint32(u32::from_le_bytes(
            bytes.get(0..4).and_then(|s| s.try_into().ok()).ok_or_else(payload_err)?,
        ))),
        Int32 => Ok(Value::Int32(i32::from_le_bytes(
            bytes.get(0..4).and_then(|s| s.try_into().ok()).ok_or_else(payload_err)?,
        ))),
        Uint64 => Ok(Value::Uint64(u64::from_le_bytes(
            bytes.get(0..8).and_then(|s| s.try_into().ok()).ok_or_else(payload_err)?,
        ))),
        Int64 => Ok(Value::Int64(i64::from_le_bytes(
            bytes.get(0..8).and_then(|s| s.try_into().ok()).ok_or_else(payload_err)?,
        ))),
        Bool => Ok(Value::Bool(*bytes.first().ok_or_else(payload_err)? != 0)),
        Empty => Ok(Value::Empty),
        Dec64 => {
            let unscaled = i64::from_le_bytes(
                bytes.get(0..8).and_then(|s| s.try_into().ok()).ok_or_else(payload_err)?,
            );
            Ok(Value::Decimal64 {
                unscaled,
                fraction_digits: ty.fraction_digits(),
            })
        }
        Bits => {
            let names = ty.bit_names();
            let mut flags = vec![false; names.len()];
            for (i, flag) in flags.iter_mut().enumerate() {
                if bytes.get(i / 8).map(|b| b & (1 << (i % 8)) != 0).unwrap_or(false) {
                    *flag = true;
                }
            }
            Ok(Value::Bits(flags))
        }
        Enum => {
            let ordinal = decode_min_width(bytes)?;
            ty.enum_values()
                .iter()
                .find(|(_, o)| *o == ordinal)
                .map(|(name, _)| Value::Enum(name.clone(), ordinal))
                .ok_or_else(payload_err)
        }
        String => Ok(Value::String(decode_length_prefixed_string(bytes)?)),
        Binary => Ok(Value::Binary(decode_length_prefixed(bytes)?)),
        IdentityRef => Ok(Value::IdentityRef(decode_length_prefixed_string(bytes)?)),
        InstanceId => Ok(Value::InstanceIdentifier {
            canonical: decode_length_prefixed_string(bytes)?,
            resolved: Rc::new(Cell::new(None)),
        }),
        LeafRef => Ok(Value::Leafref {
            path: decode_length_prefixed_string(bytes)?,
            cached: Rc::new(Cell::new(None)),
        }),
        Union => {
            for (i, member) in ty.union_members().iter().enumerate() {
                if let Ok(v) = decode_value_payload(member, false, bytes) {
                    return Ok(Value::Union {
                        member_index: i,
                        value: Box::new(v),
                    });
                }
            }
            Err(payload_err())
        }
        Unknown => Err(payload_err()),
    }
}

/// Lay out a schema node's children in declaration order, annotating each
/// with its precomputed sibling-hash bytes; this is the "sibling hash
/// table" the reader iterates when matching an incoming hash sequence.
pub fn sibling_hash_table(children: &[SchemaNode]) -> Vec<([u8; 8], SchemaNode)> {
    children
        .iter()
        .map(|c| (c.sibling_hash_bytes(), c.clone()))
        .collect()
}

/// Pick the byte index (0..8) to use for `schema` within `siblings`: the
/// lowest index at which no other candidate sibling's byte collides,
/// following §4.F's "subsequent hash lookups try bytes 0…7 in order".
pub fn resolve_hash_byte_index(schema: &SchemaNode, siblings: &[SchemaNode]) -> Result<u8> {
    let table = sibling_hash_table(siblings);
    let target = schema.sibling_hash_bytes();
    'byte: for i in 0..8usize {
        for (other_hash, other) in &table {
            if other == schema {
                continue;
            }
            if other_hash[i] == target[i] {
                continue 'byte;
            }
        }
        return Ok(i as u8);
    }
    Err(Error::internal("sibling hash collision across all 8 bytes"))
}

/// Given an emitted `(byte_index, byte_value)` pair, find the matching
/// child schema node among `siblings`.
pub fn find_schema_child_by_hash(
    siblings: &[SchemaNode],
    byte_index: u8,
    byte_value: u8,
) -> Option<SchemaNode> {
    siblings
        .iter()
        .find(|s| s.sibling_hash_bytes()[byte_index as usize] == byte_value)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_roundtrip_small_body() {
        let mut buf = Vec::new();
        let mut w = ChunkWriter::new();
        w.start_chunk(&mut buf);
        buf.extend_from_slice(b"hello");
        w.end_chunk(&mut buf);

        let mut r = ChunkReader::new(&buf);
        let body = r.read_chunked().unwrap();
        assert_eq!(body, b"hello");
    }

    #[test]
    fn chunk_roundtrip_large_body_chains() {
        let mut buf = Vec::new();
        let mut w = ChunkWriter::new();
        w.start_chunk(&mut buf);
        let body: Vec<u8> = (0..600u32).map(|i| (i % 251) as u8).collect();
        buf.extend_from_slice(&body);
        w.end_chunk(&mut buf);

        let mut r = ChunkReader::new(&buf);
        let read_back = r.read_chunked().unwrap();
        assert_eq!(read_back, body);
    }

    #[test]
    fn value_tag_roundtrip() {
        let tag = encode_tag(true, false, true, DataValueType::Uint32);
        let (default, user_plugin, unresolved, ty) = decode_tag(tag);
        assert!(default);
        assert!(!user_plugin);
        assert!(unresolved);
        assert_eq!(type_from_tag(ty), Some(DataValueType::Uint32));
    }

    #[test]
    fn string_payload_is_length_prefixed() {
        let payload = encode_value_payload(&Value::String("hi".into()));
        assert_eq!(&payload[..2], &2u16.to_le_bytes());
        assert_eq!(&payload[2..], b"hi");
    }
}
