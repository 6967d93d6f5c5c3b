//! Value encoding for cached results
//!
//! Results are stored as MessagePack (`rmp-serde`), which keeps floats bit
//! for bit. MessagePack still folds some values together (`Some(None)` and
//! `None` both become nil), so before a blob is stored it is decoded once and
//! the serde data-model shape of both sides is compared. A value that would
//! come back different is refused instead of cached.

use crate::errors::CacheError;
use serde::de::DeserializeOwned;
use serde::{Serialize, ser};
use thiserror::Error;

/// Encode a value for storage
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CacheError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Decode the blob stored under `key`
pub fn decode<T: DeserializeOwned>(key: &str, blob: &[u8]) -> Result<T, CacheError> {
    rmp_serde::from_slice(blob).map_err(|source| CacheError::CorruptEntry {
        key: key.to_string(),
        source,
    })
}

/// Encode a value, failing unless decoding the blob gives the same value back
pub fn encode_exact<T: Serialize + DeserializeOwned>(value: &T) -> Result<Vec<u8>, CacheError> {
    let blob = encode(value)?;
    let decoded: T = rmp_serde::from_slice(&blob)
        .map_err(|err| CacheError::LossyEncoding(err.to_string()))?;

    if shape_of(value)? != shape_of(&decoded)? {
        return Err(CacheError::LossyEncoding(
            "decoded value differs from the computed one".to_string(),
        ));
    }
    Ok(blob)
}

fn shape_of<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CacheError> {
    let mut shape = Shape::default();
    value
        .serialize(&mut shape)
        .map_err(|err| CacheError::LossyEncoding(err.0))?;
    Ok(shape.out)
}

#[derive(Debug, Error)]
#[error("{0}")]
struct ShapeError(String);

impl ser::Error for ShapeError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        ShapeError(msg.to_string())
    }
}

/// Flattened record of everything a value tells its serializer
///
/// Sequence and map entries are sorted, so two hash maps holding the same
/// entries in different iteration order still compare equal.
#[derive(Default)]
struct Shape {
    out: Vec<u8>,
}

impl Shape {
    fn write(&mut self, tag: u8, payload: &[u8]) {
        self.out.push(tag);
        self.out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        self.out.extend_from_slice(payload);
    }

    fn variant(&mut self, tag: u8, index: u32, name: &str) {
        let mut payload = index.to_le_bytes().to_vec();
        payload.extend_from_slice(name.as_bytes());
        self.write(tag, &payload);
    }

    fn compound(&mut self, tag: u8, sorted: bool) -> Compound<'_> {
        Compound {
            parent: self,
            tag,
            sorted,
            items: Vec::new(),
            pending_key: None,
        }
    }
}

fn child<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ShapeError> {
    let mut shape = Shape::default();
    value.serialize(&mut shape)?;
    Ok(shape.out)
}

struct Compound<'a> {
    parent: &'a mut Shape,
    tag: u8,
    sorted: bool,
    items: Vec<Vec<u8>>,
    pending_key: Option<Vec<u8>>,
}

impl Compound<'_> {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ShapeError> {
        self.items.push(child(value)?);
        Ok(())
    }

    fn finish(mut self) -> Result<(), ShapeError> {
        if self.sorted {
            self.items.sort();
        }
        let mut payload = Vec::new();
        for item in &self.items {
            payload.extend_from_slice(&(item.len() as u64).to_le_bytes());
            payload.extend_from_slice(item);
        }
        self.parent.write(self.tag, &payload);
        Ok(())
    }
}

impl<'a> ser::Serializer for &'a mut Shape {
    type Ok = ();
    type Error = ShapeError;
    type SerializeSeq = Compound<'a>;
    type SerializeTuple = Compound<'a>;
    type SerializeTupleStruct = Compound<'a>;
    type SerializeTupleVariant = Compound<'a>;
    type SerializeMap = Compound<'a>;
    type SerializeStruct = Compound<'a>;
    type SerializeStructVariant = Compound<'a>;

    fn serialize_bool(self, v: bool) -> Result<(), ShapeError> {
        self.write(1, &[u8::from(v)]);
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<(), ShapeError> {
        self.serialize_i128(i128::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<(), ShapeError> {
        self.serialize_i128(i128::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<(), ShapeError> {
        self.serialize_i128(i128::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<(), ShapeError> {
        self.serialize_i128(i128::from(v))
    }

    fn serialize_i128(self, v: i128) -> Result<(), ShapeError> {
        self.write(2, &v.to_le_bytes());
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<(), ShapeError> {
        self.serialize_i128(i128::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<(), ShapeError> {
        self.serialize_i128(i128::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<(), ShapeError> {
        self.serialize_i128(i128::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<(), ShapeError> {
        self.serialize_i128(i128::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<(), ShapeError> {
        self.write(3, &v.to_le_bytes());
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<(), ShapeError> {
        self.write(4, &v.to_bits().to_le_bytes());
        Ok(())
    }

    fn serialize_f64(self, v: f64) -> Result<(), ShapeError> {
        self.write(5, &v.to_bits().to_le_bytes());
        Ok(())
    }

    fn serialize_char(self, v: char) -> Result<(), ShapeError> {
        self.write(6, &u32::from(v).to_le_bytes());
        Ok(())
    }

    fn serialize_str(self, v: &str) -> Result<(), ShapeError> {
        self.write(7, v.as_bytes());
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<(), ShapeError> {
        self.write(8, v);
        Ok(())
    }

    fn serialize_none(self) -> Result<(), ShapeError> {
        self.write(9, &[]);
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), ShapeError> {
        let inner = child(value)?;
        self.write(10, &inner);
        Ok(())
    }

    fn serialize_unit(self) -> Result<(), ShapeError> {
        self.write(11, &[]);
        Ok(())
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<(), ShapeError> {
        self.write(12, name.as_bytes());
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        variant: &'static str,
    ) -> Result<(), ShapeError> {
        self.variant(13, variant_index, variant);
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), ShapeError> {
        let inner = child(value)?;
        self.write(14, &inner);
        Ok(())
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<(), ShapeError> {
        self.variant(15, variant_index, variant);
        let inner = child(value)?;
        self.write(16, &inner);
        Ok(())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Compound<'a>, ShapeError> {
        Ok(self.compound(17, true))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Compound<'a>, ShapeError> {
        Ok(self.compound(18, false))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Compound<'a>, ShapeError> {
        Ok(self.compound(18, false))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Compound<'a>, ShapeError> {
        self.variant(15, variant_index, variant);
        Ok(self.compound(18, false))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Compound<'a>, ShapeError> {
        Ok(self.compound(19, true))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Compound<'a>, ShapeError> {
        Ok(self.compound(19, true))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Compound<'a>, ShapeError> {
        self.variant(15, variant_index, variant);
        Ok(self.compound(19, true))
    }
}

impl ser::SerializeSeq for Compound<'_> {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ShapeError> {
        self.push(value)
    }

    fn end(self) -> Result<(), ShapeError> {
        self.finish()
    }
}

impl ser::SerializeTuple for Compound<'_> {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ShapeError> {
        self.push(value)
    }

    fn end(self) -> Result<(), ShapeError> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for Compound<'_> {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ShapeError> {
        self.push(value)
    }

    fn end(self) -> Result<(), ShapeError> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for Compound<'_> {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ShapeError> {
        self.push(value)
    }

    fn end(self) -> Result<(), ShapeError> {
        self.finish()
    }
}

impl ser::SerializeMap for Compound<'_> {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), ShapeError> {
        self.pending_key = Some(child(key)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ShapeError> {
        let mut entry = self
            .pending_key
            .take()
            .ok_or_else(|| ShapeError("map value without a key".to_string()))?;
        entry.extend_from_slice(&child(value)?);
        self.items.push(entry);
        Ok(())
    }

    fn end(self) -> Result<(), ShapeError> {
        self.finish()
    }
}

impl ser::SerializeStruct for Compound<'_> {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ShapeError> {
        let mut entry = child(key)?;
        entry.extend_from_slice(&child(value)?);
        self.items.push(entry);
        Ok(())
    }

    fn end(self) -> Result<(), ShapeError> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for Compound<'_> {
    type Ok = ();
    type Error = ShapeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ShapeError> {
        let mut entry = child(key)?;
        entry.extend_from_slice(&child(value)?);
        self.items.push(entry);
        Ok(())
    }

    fn end(self) -> Result<(), ShapeError> {
        self.finish()
    }
}
