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

//! Desired versus current reconciliation of multi-valued attributes
//!
//! Every function here reduces two snapshots to the changes the controller has to apply.

use std::collections::{BTreeMap, BTreeSet};

use crate::equality::comma_list_equals;

/// Revision sentinel making a charm resource float to its latest revision
pub const LATEST_REVISION: &str = "-1";

/// Expose field names, as understood by the controller
pub const EXPOSE_ENDPOINTS: &str = "endpoints";
pub const EXPOSE_SPACES: &str = "spaces";
pub const EXPOSE_CIDRS: &str = "cidrs";

/// Sentinel of [`ExposeDelta::to_unexpose`] clearing the whole rule
pub const UNEXPOSE_ALL: &str = "";

/// Expose rule of an application
///
/// Each field is a comma-separated list. A rule with every field empty still exposes
/// the application, without restriction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ExposeRule {
    pub endpoints: Option<String>,
    pub spaces: Option<String>,
    pub cidrs: Option<String>,
}

impl ExposeRule {
    fn fields(&self) -> [(&'static str, Option<&str>); 3] {
        [
            (EXPOSE_ENDPOINTS, self.endpoints.as_deref()),
            (EXPOSE_SPACES, self.spaces.as_deref()),
            (EXPOSE_CIDRS, self.cidrs.as_deref()),
        ]
    }

    /// Non-empty fields of the rule
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.fields()
            .into_iter()
            .filter_map(|(key, value)| match value {
                Some(value) if !value.is_empty() => Some((key.to_owned(), value.to_owned())),
                _ => None,
            })
            .collect()
    }
}

/// Changes to apply to the expose rule of an application
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExposeDelta {
    /// Fields to (re-)expose, [`None`] when nothing has to be exposed
    pub to_expose: Option<BTreeMap<String, String>>,
    /// Fields to clear before exposing, [`UNEXPOSE_ALL`] clears the whole rule
    pub to_unexpose: Vec<String>,
}

impl ExposeDelta {
    pub fn is_empty(&self) -> bool {
        self.to_expose.is_none() && self.to_unexpose.is_empty()
    }
}

/// Compute the expose and unexpose operations turning `prior` into `planned`
///
/// The controller does not support partial updates of a field: a field that changes is
/// unexposed first and then exposed again with its planned value.
pub fn expose_delta(prior: Option<&ExposeRule>, planned: Option<&ExposeRule>) -> ExposeDelta {
    match (prior, planned) {
        (None, None) => ExposeDelta::default(),
        (None, Some(planned)) => ExposeDelta {
            to_expose: Some(planned.to_map()),
            to_unexpose: Vec::new(),
        },
        (Some(_), None) => ExposeDelta {
            to_expose: None,
            to_unexpose: vec![UNEXPOSE_ALL.to_owned()],
        },
        (Some(prior), Some(planned)) => {
            let mut to_expose = BTreeMap::new();
            let mut to_unexpose = Vec::new();
            for ((key, prior), (_, planned)) in prior.fields().into_iter().zip(planned.fields()) {
                let prior = prior.filter(|p| !p.is_empty());
                let planned = planned.filter(|p| !p.is_empty());
                match (prior, planned) {
                    (Some(prior), Some(planned)) if comma_list_equals(prior, planned) => (),
                    (prior, Some(planned)) => {
                        if prior.is_some() {
                            to_unexpose.push(key.to_owned());
                        }
                        to_expose.insert(key.to_owned(), planned.to_owned());
                    }
                    // cleared in the plan
                    (Some(_), None) => to_unexpose.push(key.to_owned()),
                    (None, None) => (),
                }
            }
            ExposeDelta {
                to_expose: (!to_expose.is_empty()).then_some(to_expose),
                to_unexpose,
            }
        }
    }
}

/// Endpoint bindings to send so that the application ends up with `planned`
///
/// Endpoints bound in `prior` but no longer in `planned` are rebound to the default
/// space, represented by an empty space name.
pub fn endpoint_binding_delta(
    prior: &BTreeMap<String, String>,
    planned: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut delta = planned.clone();
    for endpoint in prior.keys() {
        delta
            .entry(endpoint.clone())
            .or_insert_with(String::new);
    }
    delta
}

/// Elements to add and to remove to turn `prior` into `planned`
pub fn set_delta<T: Ord + Clone>(prior: &BTreeSet<T>, planned: &BTreeSet<T>) -> (Vec<T>, Vec<T>) {
    (
        planned.difference(prior).cloned().collect(),
        prior.difference(planned).cloned().collect(),
    )
}

/// Machines to add and to remove for a placed application
pub fn machine_set_delta(prior: &[String], planned: &[String]) -> (Vec<String>, Vec<String>) {
    let prior = prior.iter().cloned().collect::<BTreeSet<_>>();
    let planned = planned.iter().cloned().collect::<BTreeSet<_>>();
    set_delta(&prior, &planned)
}

/// Charm resource revisions to send on refresh
///
/// Identical maps pin the resources as declared. Otherwise only the changed pins are
/// sent, and a pin removed from the plan floats the resource back to its latest revision.
pub fn resource_revision_delta(
    planned: &BTreeMap<String, String>,
    state: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    if planned == state {
        return planned.clone();
    }
    let mut delta = planned
        .iter()
        .filter(|(name, revision)| state.get(*name) != Some(*revision))
        .map(|(name, revision)| (name.clone(), revision.clone()))
        .collect::<BTreeMap<_, _>>();
    for name in state.keys() {
        if !planned.contains_key(name) {
            delta.insert(name.clone(), LATEST_REVISION.to_owned());
        }
    }
    delta
}

/// Changes of storage directives
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageDelta {
    /// New storage, attached in place
    pub to_add: BTreeMap<String, String>,
    /// Changed or removed storage: the application has to be replaced
    pub to_replace: Vec<String>,
}

pub fn storage_directive_delta(
    prior: &BTreeMap<String, String>,
    planned: &BTreeMap<String, String>,
) -> StorageDelta {
    let mut delta = StorageDelta::default();
    for (name, directive) in planned {
        match prior.get(name) {
            None => {
                delta.to_add.insert(name.clone(), directive.clone());
            }
            Some(previous) if previous != directive => delta.to_replace.push(name.clone()),
            Some(_) => (),
        }
    }
    delta.to_replace.extend(
        prior
            .keys()
            .filter(|name| !planned.contains_key(*name))
            .cloned(),
    );
    delta.to_replace.sort();
    delta
}
