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

//! [`RawValue`] module

use serde::{de::DeserializeOwned, Serialize};

use crate::diagnostics::Diagnostics;

/// Encode a dynamic value with either Message Pack or JSON encoding
///
/// Plans and states travel as Message Pack; states persisted by an older schema version
/// are handed back as JSON.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RawValue {
    /// Message Pack encoded value
    MessagePack(Vec<u8>),
    /// JSON encoded value
    Json(Vec<u8>),
}

const NULL_MESSAGE_PACK: [u8; 1] = [0xc0_u8];
const NULL_JSON: &str = "null";

impl RawValue {
    /// Check if the encoded value is null
    pub fn is_null(&self) -> bool {
        match self {
            RawValue::MessagePack(mp) => mp.is_empty() || mp.as_slice() == NULL_MESSAGE_PACK,
            RawValue::Json(json) => json.is_empty() || json.as_slice() == NULL_JSON.as_bytes(),
        }
    }

    /// Deserialize a [`RawValue`] into a concrete type
    ///
    /// Returns [`None`] iff there is an error reported in diagnostics: a malformed plan or state
    /// never reaches the reconciliation code.
    pub fn deserialize<T>(&self, diags: &mut Diagnostics) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let decoded = match self {
            Self::MessagePack(mp) => {
                let slice = if mp.is_empty() {
                    &NULL_MESSAGE_PACK
                } else {
                    mp.as_slice()
                };
                rmp_serde::from_slice::<T>(slice).map_err(|err| err.to_string())
            }
            Self::Json(json) => {
                let slice = if json.is_empty() {
                    NULL_JSON.as_bytes()
                } else {
                    json.as_slice()
                };
                serde_json::from_slice::<T>(slice).map_err(|err| err.to_string())
            }
        };
        match decoded {
            Ok(value) => Some(value),
            Err(err) => {
                diags.root_error("Failed to decode value", err);
                None
            }
        }
    }

    /// Serialize `value` into a Message Pack encoded [`RawValue`]
    ///
    /// Returns [`None`] iff there is an error reported in diagnostics
    pub fn serialize<T>(diags: &mut Diagnostics, value: &T) -> Option<RawValue>
    where
        T: Serialize,
    {
        match rmp_serde::to_vec_named(value) {
            Ok(value) => Some(Self::MessagePack(value)),
            Err(err) => {
                diags.root_error("Failed to encode value", err.to_string());
                None
            }
        }
    }

    /// Serialize `value` into a JSON encoded [`RawValue`]
    pub fn json<T>(diags: &mut Diagnostics, value: &T) -> Option<RawValue>
    where
        T: Serialize,
    {
        match serde_json::to_vec(value) {
            Ok(value) => Some(Self::Json(value)),
            Err(err) => {
                diags.root_error("Failed to encode value", err.to_string());
                None
            }
        }
    }
}

impl Default for RawValue {
    fn default() -> Self {
        RawValue::MessagePack(NULL_MESSAGE_PACK.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::RawValue;
    use crate::{value::ValueString, Diagnostics};

    #[test]
    fn malformed_json_is_a_diagnostic() {
        let mut diags = Diagnostics::default();
        let raw = RawValue::Json(b"{\"config\": ".to_vec());
        let decoded = raw.deserialize::<BTreeMap<String, ValueString>>(&mut diags);
        assert!(decoded.is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn message_pack_round_trip() {
        let mut diags = Diagnostics::default();
        let mut map = BTreeMap::new();
        map.insert("a".to_owned(), ValueString::from("1"));
        map.insert("b".to_owned(), ValueString::Null);

        let raw = RawValue::serialize(&mut diags, &map).unwrap();
        assert!(!raw.is_null());
        let back = raw
            .deserialize::<BTreeMap<String, ValueString>>(&mut diags)
            .unwrap();
        assert_eq!(back, map);
        assert!(!diags.has_errors());
    }

    #[test]
    fn empty_payload_is_null() {
        assert!(RawValue::Json(Vec::new()).is_null());
        assert!(RawValue::default().is_null());
    }
}
