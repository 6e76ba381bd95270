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

//! Merge of an application read from the controller into its state

use std::collections::BTreeMap;

use crate::{
    client::ApplicationInfo,
    config_diff::{normalize_config, reconcile_application_config},
    delta::ExposeRule,
    equality::comma_list_equals,
    utils::{config_entries, string_map},
    value::{Value, ValueString},
};

use super::state::{Binding, Charm, Expose, State};

/// Keep the stored string when the controller reports the same list in another order
fn expose_field(stored: &ValueString, remote: Option<&str>) -> ValueString {
    let remote = remote.unwrap_or_default();
    match stored {
        Value::Value(stored) if comma_list_equals(stored, remote) => Value::Value(stored.clone()),
        _ if remote.is_empty() => Value::Null,
        _ => Value::Value(remote.to_owned()),
    }
}

fn expose(stored: &Value<Expose>, remote: Option<&ExposeRule>) -> Value<Expose> {
    let Some(remote) = remote else {
        return Value::Null;
    };
    let stored = stored.as_ref_option().cloned().unwrap_or_default();
    Value::Value(Expose {
        endpoints: expose_field(&stored.endpoints, remote.endpoints.as_deref()),
        spaces: expose_field(&stored.spaces, remote.spaces.as_deref()),
        cidrs: expose_field(&stored.cidrs, remote.cidrs.as_deref()),
    })
}

/// Absorb the remote configuration; explicitly unset keys stay in the state
fn config(stored: &Value<BTreeMap<String, ValueString>>, info: &ApplicationInfo) -> Value<BTreeMap<String, ValueString>> {
    let entries = config_entries(stored);
    let (updated, changed) = reconcile_application_config(&info.config, normalize_config(&entries));
    if !changed {
        return stored.clone();
    }
    let mut config = string_map(updated).unwrap_or_default();
    for (key, value) in entries {
        if value.is_null() {
            config.entry(key).or_insert(Value::Null);
        }
    }
    Value::Value(config)
}

/// Restrict `remote` to the keys declared in `stored`
fn declared(
    stored: &Value<BTreeMap<String, ValueString>>,
    remote: &BTreeMap<String, String>,
) -> Value<BTreeMap<String, ValueString>> {
    stored.as_ref().map(|stored| {
        stored
            .keys()
            .filter_map(|key| Some((key.clone(), Value::Value(remote.get(key)?.clone()))))
            .collect()
    })
}

impl State {
    /// Update the state with what the controller reports
    pub(super) fn merge_remote(&mut self, info: &ApplicationInfo) {
        self.charm = Value::Value(Charm {
            name: Value::Value(info.charm.name.clone()),
            channel: Value::Value(info.charm.channel.clone()),
            revision: Value::Value(info.charm.revision),
            base: Value::Value(info.charm.base.clone()),
        });
        self.units = Value::Value(info.units);
        self.config = config(&self.config, info);
        if self.constraints.is_value() || !info.constraints.is_empty() {
            self.constraints = Value::Value(info.constraints.clone());
        }
        self.trust = Value::Value(info.trust);
        self.expose = expose(&self.expose, info.expose.as_ref());

        if let Value::Value(bindings) = &mut self.endpoint_bindings {
            *bindings = bindings
                .iter()
                .filter_map(Value::as_ref_option)
                .filter_map(|binding| {
                    let endpoint = binding.endpoint.as_ref_option().cloned().unwrap_or_default();
                    Some(Value::Value(Binding {
                        endpoint: binding.endpoint.clone(),
                        space: Value::Value(info.endpoint_bindings.get(&endpoint)?.clone()),
                    }))
                })
                .collect();
        }
        if self.machines.is_value() {
            self.machines = Value::Value(info.machines.iter().cloned().map(Value::Value).collect());
        }
        self.resources = declared(&self.resources, &info.resources);
        self.storage_directives = declared(&self.storage_directives, &info.storage);
    }

    /// Resolve the computed attributes left unknown by the plan
    ///
    /// Without `info`, they are set to null.
    pub(super) fn fill_computed(&mut self, info: Option<&ApplicationInfo>) {
        if let Value::Value(charm) = &mut self.charm {
            if charm.channel.is_unknown() {
                charm.channel = info.map(|info| info.charm.channel.clone()).into();
            }
            if charm.revision.is_unknown() {
                charm.revision = info.map(|info| info.charm.revision).into();
            }
            if charm.base.is_unknown() {
                charm.base = info.map(|info| info.charm.base.clone()).into();
            }
        }
        if self.units.is_unknown() {
            self.units = info.map(|info| info.units).into();
        }
        if self.constraints.is_unknown() {
            self.constraints = info.map(|info| info.constraints.clone()).into();
        }
        if self.trust.is_unknown() {
            self.trust = info.map(|info| info.trust).into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{CharmInfo, ConfigEntry};

    fn info() -> ApplicationInfo {
        ApplicationInfo {
            model_uuid: "uuid".into(),
            name: "db".into(),
            charm: CharmInfo {
                name: "postgresql".into(),
                channel: "14/stable".into(),
                revision: 42,
                base: "ubuntu@22.04".into(),
            },
            units: 3,
            config: BTreeMap::from([
                ("profile".to_owned(), ConfigEntry::new("production", false)),
                ("port".to_owned(), ConfigEntry::new("5432", true)),
            ]),
            expose: Some(ExposeRule {
                endpoints: Some("db,admin".into()),
                ..Default::default()
            }),
            endpoint_bindings: BTreeMap::from([
                (String::new(), "alpha".to_owned()),
                ("db".to_owned(), "beta".to_owned()),
                ("admin".to_owned(), "alpha".to_owned()),
            ]),
            storage: BTreeMap::from([
                ("pgdata".to_owned(), "10G".to_owned()),
                ("logs".to_owned(), "1G".to_owned()),
            ]),
            ..Default::default()
        }
    }

    #[test]
    fn reordered_expose_list_is_kept() {
        let mut state = State {
            expose: Value::Value(Expose {
                endpoints: "admin,db".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        state.merge_remote(&info());
        assert_eq!(
            state.expose,
            Value::Value(Expose {
                endpoints: "admin,db".into(),
                ..Default::default()
            })
        );
    }

    #[test]
    fn bindings_are_restricted_to_declared_endpoints() {
        let mut state = State {
            endpoint_bindings: Value::Value(
                [Value::Value(Binding {
                    endpoint: "db".into(),
                    space: "alpha".into(),
                })]
                .into(),
            ),
            ..Default::default()
        };
        state.merge_remote(&info());
        assert_eq!(
            state.endpoint_bindings,
            Value::Value(
                [Value::Value(Binding {
                    endpoint: "db".into(),
                    space: "beta".into(),
                })]
                .into()
            )
        );
    }

    #[test]
    fn non_default_config_is_absorbed() {
        let mut state = State {
            config: Value::Value(BTreeMap::from([("debug".to_owned(), Value::Null)])),
            ..Default::default()
        };
        state.merge_remote(&info());
        assert_eq!(
            state.config,
            Value::Value(BTreeMap::from([
                ("debug".to_owned(), Value::Null),
                ("profile".to_owned(), "production".into()),
            ]))
        );
    }

    #[test]
    fn undeclared_storage_is_ignored() {
        let mut state = State {
            storage_directives: Value::Value(BTreeMap::from([(
                "pgdata".to_owned(),
                "10G".into(),
            )])),
            ..Default::default()
        };
        state.merge_remote(&info());
        assert_eq!(
            state.storage_directives,
            Value::Value(BTreeMap::from([("pgdata".to_owned(), "10G".into())]))
        );
        assert!(state.resources.is_null());
        assert!(state.machines.is_null());
    }

    #[test]
    fn unknown_computed_attributes_are_filled() {
        let mut state = State {
            charm: Value::Value(Charm {
                name: "postgresql".into(),
                channel: "14/stable".into(),
                revision: Value::Unknown,
                base: Value::Unknown,
            }),
            units: Value::Unknown,
            ..Default::default()
        };
        state.fill_computed(Some(&info()));
        let charm = state.charm.as_ref_option().unwrap();
        assert_eq!(charm.revision, Value::Value(42));
        assert_eq!(charm.base, ValueString::from("ubuntu@22.04"));
        assert_eq!(state.units, Value::Value(3));

        let mut state = State {
            units: Value::Unknown,
            ..Default::default()
        };
        state.fill_computed(None);
        assert!(state.units.is_null());
    }
}
