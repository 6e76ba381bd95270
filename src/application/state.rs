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

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    attribute_path::AttributePath,
    delta::ExposeRule,
    diagnostics::Diagnostics,
    utils::config_entries,
    value::{serde_as_vec, Value, ValueBool, ValueMap, ValueNumber, ValueSet, ValueString},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct State {
    /// `<model_uuid>:<name>`
    pub id: ValueString,
    pub model_uuid: ValueString,
    pub name: ValueString,
    #[serde(with = "serde_as_vec")]
    pub charm: Value<Charm>,
    pub units: ValueNumber,
    pub config: ValueMap<ValueString>,
    pub constraints: ValueString,
    pub trust: ValueBool,
    #[serde(with = "serde_as_vec")]
    pub expose: Value<Expose>,
    pub endpoint_bindings: ValueSet<Value<Binding>>,
    pub machines: ValueSet<ValueString>,
    /// resource name -> pinned revision
    pub resources: ValueMap<ValueString>,
    /// storage name -> directive
    pub storage_directives: ValueMap<ValueString>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Charm {
    pub name: ValueString,
    pub channel: ValueString,
    pub revision: ValueNumber,
    pub base: ValueString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Expose {
    pub endpoints: ValueString,
    pub spaces: ValueString,
    pub cidrs: ValueString,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Binding {
    /// Null for the default binding
    pub endpoint: ValueString,
    pub space: ValueString,
}

impl Expose {
    pub(super) fn to_rule(&self) -> ExposeRule {
        ExposeRule {
            endpoints: self.endpoints.as_ref_option().cloned(),
            spaces: self.spaces.as_ref_option().cloned(),
            cidrs: self.cidrs.as_ref_option().cloned(),
        }
    }
}

impl State {
    pub(super) fn charm_name(&self) -> &str {
        self.charm.as_ref_option().map_or("", |charm| charm.name.as_str())
    }

    pub(super) fn expose_rule(&self) -> Option<ExposeRule> {
        self.expose.as_ref_option().map(Expose::to_rule)
    }

    /// Bindings as `endpoint -> space`, the default binding under ""
    pub(super) fn bindings(&self) -> BTreeMap<String, String> {
        self.endpoint_bindings
            .iter()
            .flatten()
            .filter_map(Value::as_ref_option)
            .filter_map(|binding| {
                Some((
                    binding.endpoint.as_ref_option().cloned().unwrap_or_default(),
                    binding.space.as_ref_option()?.clone(),
                ))
            })
            .collect()
    }

    pub(super) fn resource_revisions(&self) -> BTreeMap<String, String> {
        crate::config_diff::normalize_config(&config_entries(&self.resources))
    }

    pub(super) fn storage(&self) -> BTreeMap<String, String> {
        crate::config_diff::normalize_config(&config_entries(&self.storage_directives))
    }

    pub(super) fn validate(&self, diags: &mut Diagnostics) {
        match &self.name {
            Value::Value(name) if name.is_empty() => {
                diags.error_short("`name` cannot be empty", AttributePath::new("name"))
            }
            Value::Null => diags.error_short("`name` is required", AttributePath::new("name")),
            _ => (),
        }
        if self.model_uuid.is_null() {
            diags.error_short("`model_uuid` is required", AttributePath::new("model_uuid"));
        }

        match &self.charm {
            Value::Value(charm) => {
                if let Value::Value(name) = &charm.name {
                    if name.is_empty() {
                        diags.error_short(
                            "The charm name cannot be empty",
                            AttributePath::new("charm").index(0).attribute("name"),
                        );
                    }
                }
                if let Value::Value(revision) = charm.revision {
                    if revision < 0 {
                        diags.error_short(
                            "The charm revision cannot be negative",
                            AttributePath::new("charm").index(0).attribute("revision"),
                        );
                    }
                }
            }
            Value::Null => diags.error_short("A `charm` block is required", AttributePath::new("charm")),
            Value::Unknown => (),
        }

        if let Value::Value(units) = self.units {
            if units < 0 {
                diags.error_short("`units` cannot be negative", AttributePath::new("units"));
            }
        }
        if self.units.is_value() && self.machines.is_value() {
            diags.error_short(
                "`units` and `machines` are mutually exclusive",
                AttributePath::new("machines"),
            );
        }

        for (i, binding) in self.endpoint_bindings.iter().flatten().enumerate() {
            if let Value::Value(binding) = binding {
                if binding.space.is_null() {
                    diags.error_short(
                        "A binding requires a space",
                        AttributePath::new("endpoint_bindings")
                            .index(i as i64)
                            .attribute("space"),
                    );
                }
            }
        }

        for (attribute, map) in [
            ("config", &self.config),
            ("resources", &self.resources),
            ("storage_directives", &self.storage_directives),
        ] {
            if map.iter().flat_map(|map| map.keys()).any(String::is_empty) {
                diags.error_short("Keys cannot be empty", AttributePath::new(attribute));
            }
        }
        for (name, revision) in self.resource_revisions() {
            if revision.parse::<i64>().is_err() {
                diags.error(
                    "Invalid resource revision",
                    format!("`{}` is not a revision number", revision),
                    AttributePath::new("resources").key(name),
                );
            }
        }
    }
}
