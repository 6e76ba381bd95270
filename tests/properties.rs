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

//! Property-based tests of the reconciliation primitives

use std::collections::BTreeMap;

use proptest::prelude::*;
use terraform_provider_juju::{
    client::ConfigEntry,
    config_diff::{compute_diff, normalize_config, reconcile_from_remote},
    equality::comma_list_equals,
    value::{Value, ValueString},
};

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,12}".prop_map(String::from)
}

/// Values include the empty string, which is a value and not an unset
fn value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-zA-Z0-9:/._-]{1,16}".prop_map(String::from)]
}

fn config_strategy() -> impl Strategy<Value = BTreeMap<String, Option<String>>> {
    prop::collection::btree_map(key_strategy(), prop::option::of(value_strategy()), 0..12)
}

fn to_config(raw: &BTreeMap<String, Option<String>>) -> BTreeMap<String, ValueString> {
    raw.iter()
        .map(|(key, value)| (key.clone(), value.clone().into()))
        .collect()
}

fn element_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9./]{1,8}".prop_map(String::from)
}

proptest! {
    #[test]
    fn normalize_keeps_exactly_the_values(raw in config_strategy()) {
        let normalized = normalize_config(&to_config(&raw));
        let expected = raw
            .iter()
            .filter_map(|(key, value)| Some((key.clone(), value.clone()?)))
            .collect::<BTreeMap<_, _>>();
        prop_assert_eq!(normalized, expected);
    }

    #[test]
    fn diff_against_itself_unsets_nothing(
        raw in prop::collection::btree_map(key_strategy(), value_strategy(), 0..12)
    ) {
        let state = raw
            .iter()
            .map(|(key, value)| (key.clone(), Value::Value(value.clone())))
            .collect::<BTreeMap<_, _>>();
        let (to_set, to_unset) = compute_diff(&state, &state);
        prop_assert_eq!(to_set, raw);
        prop_assert!(to_unset.is_empty());
    }

    #[test]
    fn set_and_unset_are_disjoint(state in config_strategy(), plan in config_strategy()) {
        let (to_set, to_unset) = compute_diff(&to_config(&state), &to_config(&plan));
        for key in &to_unset {
            prop_assert!(!to_set.contains_key(key));
            prop_assert!(matches!(state.get(key), Some(Some(_))));
        }
    }

    #[test]
    fn remote_never_adds_undeclared_keys(
        prior in config_strategy(),
        remote in prop::collection::btree_map(key_strategy(), (value_strategy(), any::<bool>()), 0..12),
    ) {
        let remote = remote
            .into_iter()
            .map(|(key, (value, is_default))| (key, ConfigEntry::new(value.as_str(), is_default)))
            .collect::<BTreeMap<_, _>>();
        match reconcile_from_remote(&remote, &to_config(&prior)) {
            None => prop_assert!(prior.is_empty()),
            Some(reconciled) => {
                for (key, value) in &reconciled {
                    prop_assert!(prior.contains_key(key));
                    if prior[key].is_none() {
                        prop_assert!(value.is_null());
                    }
                }
            }
        }
    }

    #[test]
    fn comma_lists_ignore_order(
        (list, shuffled) in prop::collection::vec(element_strategy(), 1..8)
            .prop_flat_map(|list| (Just(list.clone()), Just(list).prop_shuffle()))
    ) {
        prop_assert!(comma_list_equals(&list.join(","), &shuffled.join(",")));
    }

    #[test]
    fn comma_lists_of_different_lengths_differ(
        list in prop::collection::vec(element_strategy(), 1..8),
        extra in element_strategy(),
    ) {
        let longer = format!("{},{}", list.join(","), extra);
        prop_assert!(!comma_list_equals(&list.join(","), &longer));
    }
}

#[test]
fn comma_list_examples() {
    assert!(comma_list_equals("a,b,c", "c,b,a"));
    assert!(!comma_list_equals("a,b", "a,b,c"));
    assert!(!comma_list_equals("a,a,b", "a,b,b"));
}
