//! Call arguments as seen by the fingerprinter
//!
//! Rust has no variadic keyword calls, so a cached call presents its
//! arguments as an [`Args`] bundle: ordered positional values plus named
//! keyword values, each converted into the closed [`ArgValue`] shape set.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// A single argument value in one of the shapes the fingerprinter understands
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Unit,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(String),
    Bytes(Vec<u8>),
    /// Present or absent value, distinct from both unit and the bare value
    Optional(Option<Box<ArgValue>>),
    /// Fixed-size immutable sequence, hashable when all elements are
    Tuple(Vec<ArgValue>),
    /// Growable sequence, never hashable
    List(Vec<ArgValue>),
    /// Unordered collection, never hashable
    Set(Vec<ArgValue>),
    /// Key-value mapping, never hashable
    Map(Vec<(ArgValue, ArgValue)>),
}

impl ArgValue {
    /// Shape name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ArgValue::Unit => "unit",
            ArgValue::Bool(_) => "bool",
            ArgValue::Int(_) => "int",
            ArgValue::UInt(_) => "uint",
            ArgValue::Float(_) => "float",
            ArgValue::Char(_) => "char",
            ArgValue::Str(_) => "str",
            ArgValue::Bytes(_) => "bytes",
            ArgValue::Optional(_) => "option",
            ArgValue::Tuple(_) => "tuple",
            ArgValue::List(_) => "list",
            ArgValue::Set(_) => "set",
            ArgValue::Map(_) => "map",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Int(v) => Some(*v),
            ArgValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ArgValue::UInt(v) => Some(*v),
            ArgValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// Conversion of a Rust value into an [`ArgValue`]
pub trait ToArgValue {
    fn to_arg_value(&self) -> ArgValue;
}

impl ToArgValue for ArgValue {
    fn to_arg_value(&self) -> ArgValue {
        self.clone()
    }
}

impl<T: ToArgValue + ?Sized> ToArgValue for &T {
    fn to_arg_value(&self) -> ArgValue {
        (**self).to_arg_value()
    }
}

macro_rules! impl_signed {
    ($($ty:ty),*) => {
        $(impl ToArgValue for $ty {
            fn to_arg_value(&self) -> ArgValue {
                ArgValue::Int(*self as i64)
            }
        })*
    };
}

macro_rules! impl_unsigned {
    ($($ty:ty),*) => {
        $(impl ToArgValue for $ty {
            fn to_arg_value(&self) -> ArgValue {
                ArgValue::UInt(*self as u64)
            }
        })*
    };
}

impl_signed!(i8, i16, i32, i64, isize);
impl_unsigned!(u8, u16, u32, u64, usize);

impl ToArgValue for () {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::Unit
    }
}

impl ToArgValue for bool {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::Bool(*self)
    }
}

impl ToArgValue for f32 {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::Float(f64::from(*self))
    }
}

impl ToArgValue for f64 {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::Float(*self)
    }
}

impl ToArgValue for char {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::Char(*self)
    }
}

impl ToArgValue for str {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::Str(self.to_string())
    }
}

impl ToArgValue for String {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::Str(self.clone())
    }
}

impl<T: ToArgValue> ToArgValue for Option<T> {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::Optional(self.as_ref().map(|value| Box::new(value.to_arg_value())))
    }
}

impl<T: ToArgValue, const N: usize> ToArgValue for [T; N] {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::Tuple(self.iter().map(ToArgValue::to_arg_value).collect())
    }
}

impl<T: ToArgValue> ToArgValue for Vec<T> {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::List(self.iter().map(ToArgValue::to_arg_value).collect())
    }
}

impl<T: ToArgValue> ToArgValue for VecDeque<T> {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::List(self.iter().map(ToArgValue::to_arg_value).collect())
    }
}

impl<T: ToArgValue, S> ToArgValue for HashSet<T, S> {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::Set(self.iter().map(ToArgValue::to_arg_value).collect())
    }
}

impl<T: ToArgValue> ToArgValue for BTreeSet<T> {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::Set(self.iter().map(ToArgValue::to_arg_value).collect())
    }
}

impl<K: ToArgValue, V: ToArgValue, S> ToArgValue for HashMap<K, V, S> {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::Map(
            self.iter()
                .map(|(k, v)| (k.to_arg_value(), v.to_arg_value()))
                .collect(),
        )
    }
}

impl<K: ToArgValue, V: ToArgValue> ToArgValue for BTreeMap<K, V> {
    fn to_arg_value(&self) -> ArgValue {
        ArgValue::Map(
            self.iter()
                .map(|(k, v)| (k.to_arg_value(), v.to_arg_value()))
                .collect(),
        )
    }
}

/// Positional and keyword arguments of one call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<ArgValue>,
    keyword: Vec<(String, ArgValue)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg<T: ToArgValue + ?Sized>(mut self, value: &T) -> Self {
        self.positional.push(value.to_arg_value());
        self
    }

    /// Set a keyword argument, replacing an earlier value under the same name
    pub fn kwarg<T: ToArgValue + ?Sized>(mut self, name: &str, value: &T) -> Self {
        let value = value.to_arg_value();
        match self.keyword.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.keyword.push((name.to_string(), value)),
        }
        self
    }

    pub fn positional(&self) -> &[ArgValue] {
        &self.positional
    }

    /// Keyword arguments in insertion order
    pub fn keyword(&self) -> &[(String, ArgValue)] {
        &self.keyword
    }

    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.positional.get(index)
    }

    pub fn get_kwarg(&self, name: &str) -> Option<&ArgValue> {
        self.keyword
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }
}

/// Anything that can present itself as the arguments of a cached call
pub trait CallArgs {
    fn to_args(&self) -> Args;
}

impl CallArgs for Args {
    fn to_args(&self) -> Args {
        self.clone()
    }
}

impl CallArgs for () {
    fn to_args(&self) -> Args {
        Args::new()
    }
}

macro_rules! impl_tuple_args {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: ToArgValue),+> CallArgs for ($($name,)+) {
            fn to_args(&self) -> Args {
                Args::new()$(.arg(&self.$idx))+
            }
        }

        impl<$($name: ToArgValue),+> ToArgValue for ($($name,)+) {
            fn to_arg_value(&self) -> ArgValue {
                ArgValue::Tuple(vec![$(self.$idx.to_arg_value()),+])
            }
        }
    };
}

impl_tuple_args!(A: 0);
impl_tuple_args!(A: 0, B: 1);
impl_tuple_args!(A: 0, B: 1, C: 2);
impl_tuple_args!(A: 0, B: 1, C: 2, D: 3);
impl_tuple_args!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_tuple_args!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_tuple_args!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_tuple_args!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
