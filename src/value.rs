// This file is part of the terraform-provider-juju project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! [`Value`] module

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
    marker::PhantomData,
};

use serde::{de::Visitor, Deserialize, Serialize};

/// Encode either a known value, a null value, or an unknown value as specified by the Terraform protocol.
///
/// [`Value`] is closely modeled after [`Option`] where:
/// - [`Value::Value`] is equivalent to [`Option::Some`],
/// - [`Value::Null`] is equivalent to [`Option::None`] (the attribute is explicitly unset),
/// - [`Value::Unknown`] has no option counterpart and represent a value that will only be known after apply.
///
/// An absent entry is not a [`Value`]: it is represented by the key missing from its map.
#[derive(Clone, PartialEq, PartialOrd, Eq, Ord, Hash, Default, Serialize)]
#[serde(untagged)]
pub enum Value<T> {
    /// Value is present
    Value(T),
    /// No value is present
    #[default]
    Null,
    /// Value is unknown
    #[serde(serialize_with = "serde_unknown::serialize")]
    Unknown,
}

pub type ValueString = Value<String>;
pub type ValueNumber = Value<i64>;
pub type ValueBool = Value<bool>;
pub type ValueList<T> = Value<Vec<T>>;
pub type ValueSet<T> = Value<BTreeSet<T>>;
pub type ValueMap<T> = Value<BTreeMap<String, T>>;

impl<T> Value<T> {
    /// Check if the value is known and present
    #[inline]
    pub const fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Check if the value is null
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if the value is unknown
    #[inline]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Converts from `&Value<T>` to `Value<&T>`
    #[inline]
    pub const fn as_ref(&self) -> Value<&T> {
        match *self {
            Self::Value(ref x) => Value::Value(x),
            Self::Null => Value::Null,
            Self::Unknown => Value::Unknown,
        }
    }

    /// Converts from `&mut Value<T>` to `Value<&mut T>`
    #[inline]
    pub fn as_mut(&mut self) -> Value<&mut T> {
        match *self {
            Self::Value(ref mut x) => Value::Value(x),
            Self::Null => Value::Null,
            Self::Unknown => Value::Unknown,
        }
    }

    /// Converts into an [`Option`], both null and unknown becoming [`None`]
    #[inline]
    pub fn as_option(self) -> Option<T> {
        match self {
            Self::Value(x) => Some(x),
            _ => None,
        }
    }

    /// Converts from `&Value<T>` to `Option<&T>`
    #[inline]
    pub fn as_ref_option(&self) -> Option<&T> {
        match self {
            Self::Value(x) => Some(x),
            _ => None,
        }
    }

    /// Converts from `&Value<T>` to `Option<&T::Target>`
    #[inline]
    pub fn as_deref_option(&self) -> Option<&T::Target>
    where
        T: std::ops::Deref,
    {
        self.as_ref_option().map(std::ops::Deref::deref)
    }

    /// Returns the contained value or a provided default
    #[inline]
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Self::Value(x) => x,
            _ => default,
        }
    }

    /// Returns the contained value or the default of `T`
    #[inline]
    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        self.unwrap_or(T::default())
    }

    /// Maps a `Value<T>` to `Value<U>`, leaving null and unknown untouched
    #[inline]
    pub fn map<U, F>(self, f: F) -> Value<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Value(x) => Value::Value(f(x)),
            Self::Null => Value::Null,
            Self::Unknown => Value::Unknown,
        }
    }

    /// Returns the provided default (if null or unknown), or applies a function to the contained value
    #[inline]
    pub fn map_or<U, F>(self, default: U, f: F) -> U
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Value(x) => f(x),
            _ => default,
        }
    }

    /// Returns `self` if it is not null, `rhs` otherwise
    ///
    /// Unknown is kept as is: an unknown value will be known later.
    #[inline]
    pub fn or(self, rhs: Self) -> Self {
        match self {
            Self::Null => rhs,
            x => x,
        }
    }

    /// Iterator over the contained value, if any
    #[inline]
    pub fn iter(&self) -> std::option::IntoIter<&T> {
        self.as_ref_option().into_iter()
    }
}

impl<T: Clone> Value<&T> {
    /// Maps a `Value<&T>` to a `Value<T>` by cloning the contents
    #[inline]
    pub fn cloned(self) -> Value<T> {
        self.map(Clone::clone)
    }
}

impl Value<String> {
    /// Maps a `&Value<String>` to `&str`
    ///
    /// If the value is null or unknown, returns "".
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Value(x) => x.as_str(),
            _ => "",
        }
    }
}

impl<'a, T> IntoIterator for &'a Value<T> {
    type Item = &'a T;
    type IntoIter = std::option::IntoIter<&'a T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Debug> Debug for Value<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => Debug::fmt(value, f),
            Self::Null => f.write_str("Null"),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

impl<T> From<T> for Value<T> {
    #[inline]
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T> From<Option<T>> for Value<T> {
    #[inline]
    fn from(value: Option<T>) -> Self {
        match value {
            Some(x) => Self::Value(x),
            None => Self::Null,
        }
    }
}

impl From<&str> for Value<String> {
    #[inline]
    fn from(value: &str) -> Self {
        Self::Value(value.to_owned())
    }
}

macro_rules! forward_visit {
    ([ -> ]) => {
        serde::de::IntoDeserializer::into_deserializer
    };
    ([ -> $de:ident]) => {
        serde::de::value::$de::new
    };
    ($($visit:ident($value:ty)$(-> $de:ident)?),*$(,)?) => {
        $(
            fn $visit<E>(self, v: $value) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                T::deserialize(forward_visit!([-> $($de)?])(v)).map(Value::Value)
            }
        )*
    };
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Value<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ValueVisitor<T>(PhantomData<T>);
        impl<'de, T: Deserialize<'de>> Visitor<'de> for ValueVisitor<T> {
            type Value = Value<T>;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "any value")
            }

            forward_visit!(
                visit_bool(bool),
                visit_borrowed_str(&'de str) -> BorrowedStrDeserializer,
                visit_borrowed_bytes(&'de [u8]) -> BorrowedBytesDeserializer,
                visit_bytes(&[u8]),
                visit_byte_buf(Vec<u8>),
                visit_char(char),
                visit_f32(f32),
                visit_f64(f64),
                visit_i8(i8),
                visit_i16(i16),
                visit_i32(i32),
                visit_i64(i64),
                visit_u8(u8),
                visit_u16(u16),
                visit_u32(u32),
                visit_u64(u64),
                visit_str(&str),
                visit_string(String),
            );

            fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                T::deserialize(serde::de::value::MapAccessDeserializer::new(map)).map(Value::Value)
            }
            fn visit_seq<A>(self, seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                T::deserialize(serde::de::value::SeqAccessDeserializer::new(seq)).map(Value::Value)
            }
            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                T::deserialize(deserializer).map(Value::Value)
            }
            // Terraform encodes unknown values as a MessagePack extension
            fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                serde::de::IgnoredAny::deserialize(deserializer).and(Ok(Value::Unknown))
            }
            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Value::Null)
            }
            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Value::Null)
            }
        }
        deserializer.deserialize_any(ValueVisitor(PhantomData))
    }
}

mod serde_unknown {
    const EXT_STRUCT_NAME: &str = "_ExtStruct";

    pub fn serialize<S>(serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_newtype_struct(EXT_STRUCT_NAME, &(0i8, serde_bytes::Bytes::new(&[0])))
    }
}

/// Serde codec to encode a nullable as a vec that has either zero or one element
///
/// Optional nested blocks (like `expose`) are lists of at most one element on the wire.
pub mod serde_as_vec {
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Serialize};

    use super::Value;

    /// Serialize a nullable Value into a Vec of Values with 0 or 1 element
    pub fn serialize<T, S>(value: &Value<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: Serialize,
    {
        match value {
            Value::Unknown => value.serialize(serializer),
            _ => {
                let mut seq = serializer.serialize_seq(Some(value.is_value() as usize))?;
                if let Value::Value(value) = value {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }

    /// Deserialize a Vec of values into a single, nullable, Value
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Value<T>, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: Deserialize<'de>,
    {
        match Value::<Vec<T>>::deserialize(deserializer)? {
            Value::Value(vec) => {
                let len = vec.len();
                let mut iter = vec.into_iter();
                match (iter.next(), len) {
                    (None, _) => Ok(Value::Null),
                    (Some(value), 1) => Ok(Value::Value(value)),
                    (Some(_), len) => Err(D::Error::invalid_length(len, &"at most one element")),
                }
            }
            Value::Null => Ok(Value::Null),
            Value::Unknown => Ok(Value::Unknown),
        }
    }
}
