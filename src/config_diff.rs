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

//! Free-form configuration maps
//!
//! A configuration key is either absent from its map, explicitly unset ([`Value::Null`]),
//! or set to a string. Absent and null keys both ask for the key to be removed from the
//! controller; only user-declared keys ever reach the state.

use std::collections::BTreeMap;

use crate::{
    client::ConfigEntry,
    value::{Value, ValueString},
};

/// Keep only the keys holding a value
pub fn normalize_config(raw: &BTreeMap<String, ValueString>) -> BTreeMap<String, String> {
    raw.iter()
        .filter_map(|(key, value)| Some((key.clone(), value.as_ref_option()?.clone())))
        .collect()
}

/// Restrict the configuration read from the controller to the keys declared in `prior`
///
/// Returns [`None`] when `prior` has no key at all, so that a configuration never
/// declared stays null instead of becoming an empty map.
pub fn reconcile_from_remote(
    remote: &BTreeMap<String, ConfigEntry>,
    prior: &BTreeMap<String, ValueString>,
) -> Option<BTreeMap<String, ValueString>> {
    if prior.is_empty() {
        return None;
    }
    let mut reconciled = BTreeMap::new();
    for (key, value) in prior {
        if value.is_null() {
            reconciled.insert(key.clone(), Value::Null);
        } else if let Some(entry) = remote.get(key) {
            reconciled.insert(key.clone(), Value::Value(entry.value.to_string()));
        }
    }
    Some(reconciled)
}

/// Keys to set and keys to unset to turn `state` into `plan`
///
/// A key holding an empty string is set, not unset. The keys to unset are sorted.
pub fn compute_diff(
    state: &BTreeMap<String, ValueString>,
    plan: &BTreeMap<String, ValueString>,
) -> (BTreeMap<String, String>, Vec<String>) {
    let to_set = normalize_config(plan);
    let to_unset = state
        .iter()
        .filter(|(_, value)| value.is_value())
        .filter(|(key, _)| matches!(plan.get(*key), None | Some(Value::Null)))
        .map(|(key, _)| key.clone())
        .collect();
    (to_set, to_unset)
}

/// Absorb the configuration read from the controller into the one previously stored
///
/// Changed values overwrite the stored ones; keys unknown so far are added unless they
/// hold a default. Stored keys missing from `remote` are kept.
pub fn reconcile_application_config(
    remote: &BTreeMap<String, ConfigEntry>,
    previous: BTreeMap<String, String>,
) -> (BTreeMap<String, String>, bool) {
    let mut updated = previous;
    let mut changed = false;
    for (key, entry) in remote {
        let value = entry.value.to_string();
        match updated.get_mut(key) {
            Some(stored) => {
                if *stored != value {
                    *stored = value;
                    changed = true;
                }
            }
            None => {
                if !entry.is_default {
                    updated.insert(key.clone(), value);
                    changed = true;
                }
            }
        }
    }
    (updated, changed)
}
