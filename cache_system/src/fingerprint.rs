//! Key fingerprinting
//!
//! Derives the store key of a cached call from the computation identity and
//! a hash of every argument. Layout:
//! `<prefix>:<identity>(<h1>,<h2>,...):(<name>=<h>,...)`.

use crate::args::{ArgValue, Args};
use crate::errors::CacheError;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Builds store keys for cached calls under one key prefix
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    key_prefix: String,
}

impl Fingerprinter {
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
        }
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Generate the store key for a call of `identity` with `args`
    pub fn fingerprint(&self, identity: &str, args: &Args) -> Result<String, CacheError> {
        let positional = args
            .positional()
            .iter()
            .enumerate()
            .map(|(index, value)| {
                hash_arg(value)
                    .map(|hash| format!("{:016x}", hash))
                    .map_err(|kind| unhashable(format!("positional argument {}", index), kind))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Sorted by name so keyword order at the call site does not matter
        let mut keyword = args.keyword().iter().collect::<Vec<_>>();
        keyword.sort_by(|a, b| a.0.cmp(&b.0));
        let keyword = keyword
            .into_iter()
            .map(|(name, value)| {
                hash_arg(value)
                    .map(|hash| format!("{}={:016x}", name, hash))
                    .map_err(|kind| unhashable(format!("keyword argument '{}'", name), kind))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(format!(
            "{}:{}({}):({})",
            self.key_prefix,
            identity,
            positional.join(","),
            keyword.join(",")
        ))
    }
}

fn unhashable(argument: String, kind: &'static str) -> CacheError {
    CacheError::ArgumentsUnhashable { argument, kind }
}

/// Hash one argument, or name the shape that made it unhashable
pub fn hash_arg(value: &ArgValue) -> Result<u64, &'static str> {
    let mut hasher = DefaultHasher::new();
    write_arg(value, &mut hasher)?;
    Ok(hasher.finish())
}

fn write_arg<H: Hasher>(value: &ArgValue, state: &mut H) -> Result<(), &'static str> {
    match value {
        ArgValue::Unit => 0u8.hash(state),
        ArgValue::Bool(v) => {
            1u8.hash(state);
            v.hash(state);
        }
        ArgValue::Int(v) => {
            2u8.hash(state);
            v.hash(state);
        }
        ArgValue::UInt(v) => {
            3u8.hash(state);
            v.hash(state);
        }
        ArgValue::Float(v) => {
            4u8.hash(state);
            canonical_float_bits(*v).hash(state);
        }
        ArgValue::Char(v) => {
            5u8.hash(state);
            v.hash(state);
        }
        ArgValue::Str(v) => {
            6u8.hash(state);
            v.hash(state);
        }
        ArgValue::Bytes(v) => {
            7u8.hash(state);
            v.hash(state);
        }
        ArgValue::Tuple(items) => {
            8u8.hash(state);
            items.len().hash(state);
            for item in items {
                write_arg(item, state)?;
            }
        }
        ArgValue::Optional(inner) => {
            9u8.hash(state);
            match inner {
                None => 0u8.hash(state),
                Some(value) => {
                    1u8.hash(state);
                    write_arg(value, state)?;
                }
            }
        }
        ArgValue::List(_) | ArgValue::Set(_) | ArgValue::Map(_) => return Err(value.kind()),
    }
    Ok(())
}

fn canonical_float_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}
