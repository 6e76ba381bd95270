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

//! `juju_model` resource

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    attribute_path::AttributePath,
    client::{
        retry, wait_for_deletion, ClientError, CreateModelRequest, JujuClient, RetryPolicy,
        UpdateModelRequest,
    },
    config_diff::{compute_diff, normalize_config, reconcile_from_remote},
    diagnostics::Diagnostics,
    raw::RawValue,
    resource::Resource,
    upgrade::StateUpgrader,
    utils::{config_entries, ExtractDiagnostics},
    value::Value,
};

mod state;

pub use state::State;

pub struct ModelResource {
    client: Arc<dyn JujuClient>,
    retry: RetryPolicy,
    upgrader: StateUpgrader,
}

impl ModelResource {
    pub fn new(client: Arc<dyn JujuClient>, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            upgrader: StateUpgrader::new(1),
        }
    }

    /// Refresh `state` from the controller, [`None`] if the model is gone
    async fn refresh(
        &self,
        diags: &mut Diagnostics,
        mut state: State,
    ) -> Option<Value<State>> {
        let uuid = state.id.as_str().to_owned();
        let info = match self.client.read_model(&uuid).await {
            Ok(info) => info,
            Err(ClientError::NotFound(_)) => {
                info!(uuid, "model not found, removing it from the state");
                return Some(Value::Null);
            }
            Err(err) => {
                diags.root_error("Failed to read the model", err.to_string());
                return None;
            }
        };
        let remote = self
            .client
            .read_model_config(&uuid)
            .await
            .extract_diagnostics(diags, "Failed to read the model configuration", AttributePath::new("config"))?;

        state.name = Value::Value(info.name);
        state.cloud = Value::Value(info.cloud);
        state.region = Value::Value(info.region);
        if state.constraints.is_value() || !info.constraints.is_empty() {
            state.constraints = Value::Value(info.constraints);
        }
        if let Some(config) = reconcile_from_remote(&remote, &config_entries(&state.config)) {
            state.config = Value::Value(config);
        }
        Some(Value::Value(state))
    }
}

#[async_trait]
impl Resource for ModelResource {
    type State = State;

    fn schema_version(&self) -> i64 {
        self.upgrader.current_version()
    }

    async fn validate(&self, diags: &mut Diagnostics, config: Self::State) -> Option<()> {
        config.validate(diags);
        diags.status()
    }

    async fn read(&self, diags: &mut Diagnostics, state: Self::State) -> Option<Value<Self::State>> {
        self.refresh(diags, state).await
    }

    async fn plan_create(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State,
        _config_state: Self::State,
    ) -> Option<Self::State> {
        let mut state = proposed_state;
        state.id = Value::Unknown;
        state.cloud = state.cloud.or(Value::Unknown);
        state.region = state.region.or(Value::Unknown);
        Some(state)
    }

    async fn plan_update(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State,
        proposed_state: Self::State,
        _config_state: Self::State,
    ) -> Option<(Self::State, Vec<AttributePath>)> {
        let mut state = proposed_state;
        state.id = prior_state.id;
        state.cloud = state.cloud.or(prior_state.cloud.clone());
        state.region = state.region.or(prior_state.region.clone());

        let mut trigger_replace = Vec::new();
        for (name, prior, planned) in [
            ("name", &prior_state.name, &state.name),
            ("cloud", &prior_state.cloud, &state.cloud),
            ("region", &prior_state.region, &state.region),
        ] {
            if prior != planned {
                trigger_replace.push(AttributePath::new(name));
            }
        }
        Some((state, trigger_replace))
    }

    async fn create(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State,
        _config_state: Self::State,
    ) -> Option<Self::State> {
        let mut state = planned_state;
        let request = CreateModelRequest {
            name: state.name.as_str().to_owned(),
            cloud: state.cloud.as_ref_option().cloned(),
            region: state.region.as_ref_option().cloned(),
            config: normalize_config(&config_entries(&state.config)),
            constraints: state.constraints.as_ref_option().cloned(),
        };
        let info = match self.client.create_model(request).await {
            Ok(info) => info,
            Err(ClientError::PartiallyCreated { id, reason }) => {
                state.id = Value::Value(id);
                diags.root_error("The model has been partially created", reason);
                return Some(state);
            }
            Err(err) => {
                diags.root_error("Failed to create the model", err.to_string());
                return None;
            }
        };
        info!(name = info.name, uuid = info.uuid, "model created");

        // The model may take a while to be visible
        let info = retry(
            &self.retry,
            |err| err.is_not_found() || err.is_retryable(),
            || self.client.read_model(&info.uuid),
        )
        .await
        .extract_diagnostics(diags, "Failed to read the created model", AttributePath::default())?;

        state.id = Value::Value(info.uuid);
        state.cloud = Value::Value(info.cloud);
        state.region = Value::Value(info.region);
        Some(state)
    }

    async fn update(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State,
        planned_state: Self::State,
        _config_state: Self::State,
    ) -> Option<Self::State> {
        let (to_set, to_unset) = compute_diff(
            &config_entries(&prior_state.config),
            &config_entries(&planned_state.config),
        );
        let constraints = (planned_state.constraints != prior_state.constraints)
            .then(|| planned_state.constraints.as_str().to_owned());

        if to_set.is_empty() && to_unset.is_empty() && constraints.is_none() {
            return Some(planned_state);
        }
        debug!(?to_set, ?to_unset, "updating model configuration");
        self.client
            .update_model(UpdateModelRequest {
                uuid: planned_state.id.as_str().to_owned(),
                config_to_set: to_set,
                config_to_unset: to_unset,
                constraints,
            })
            .await
            .extract_diagnostics(diags, "Failed to update the model", AttributePath::default())?;
        Some(planned_state)
    }

    async fn destroy(&self, diags: &mut Diagnostics, prior_state: Self::State) -> Option<()> {
        let uuid = prior_state.id.as_str();
        match self.client.destroy_model(uuid).await {
            Ok(()) | Err(ClientError::NotFound(_)) => (),
            Err(err) => {
                diags.root_error("Failed to destroy the model", err.to_string());
                return None;
            }
        }
        wait_for_deletion(&self.retry, || self.client.read_model(uuid))
            .await
            .extract_diagnostics(diags, "The model has not been destroyed", AttributePath::default())
    }

    async fn import(&self, diags: &mut Diagnostics, id: String) -> Option<Self::State> {
        let state = State {
            id: Value::Value(id),
            ..Default::default()
        };
        match self.refresh(diags, state).await? {
            Value::Value(state) => Some(state),
            _ => {
                diags.root_error_short("The model to import does not exist");
                None
            }
        }
    }

    async fn upgrade(
        &self,
        diags: &mut Diagnostics,
        version: i64,
        prior_state: RawValue,
    ) -> Option<Self::State> {
        self.upgrader
            .upgrade_raw(diags, self.client.as_ref(), version, prior_state)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, time::Duration};

    use super::*;
    use crate::{
        client::{ConfigValue, InMemoryController},
        value::ValueString,
    };

    const FAST: RetryPolicy = RetryPolicy {
        attempts: 5,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    };

    fn config(entries: &[(&str, Option<&str>)]) -> Value<BTreeMap<String, ValueString>> {
        Value::Value(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.map(str::to_owned).into()))
                .collect(),
        )
    }

    fn setup() -> (InMemoryController, ModelResource) {
        let controller = InMemoryController::new()
            .with_model_default("logging-config", "<root>=INFO")
            .with_model_default("update-status-hook-interval", ConfigValue::Int(5));
        let resource = ModelResource::new(Arc::new(controller.clone()), FAST);
        (controller, resource)
    }

    async fn create(resource: &ModelResource, proposed: State) -> State {
        let mut diags = Diagnostics::default();
        let planned = resource
            .plan_create(&mut diags, proposed.clone(), proposed.clone())
            .await
            .unwrap();
        let state = resource.create(&mut diags, planned, proposed).await.unwrap();
        assert!(!diags.has_errors(), "{:?}", diags);
        state
    }

    #[tokio::test]
    async fn create_then_read_keeps_declared_keys() {
        let (_, resource) = setup();
        let state = create(
            &resource,
            State {
                name: "dev".into(),
                config: config(&[("juju-http-proxy", Some("http://proxy:3128")), ("ftp-proxy", None)]),
                ..Default::default()
            },
        )
        .await;
        assert!(state.id.is_value());
        assert_eq!(state.cloud, ValueString::from("localhost"));

        let mut diags = Diagnostics::default();
        let read = resource.read(&mut diags, state.clone()).await.unwrap();
        assert_eq!(read, Value::Value(state));
    }

    #[tokio::test]
    async fn undeclared_config_stays_null() {
        let (_, resource) = setup();
        let state = create(
            &resource,
            State {
                name: "dev".into(),
                ..Default::default()
            },
        )
        .await;

        let mut diags = Diagnostics::default();
        let read = resource.read(&mut diags, state).await.unwrap();
        assert!(read.as_ref_option().unwrap().config.is_null());
    }

    #[tokio::test]
    async fn update_sets_and_unsets_keys() {
        let (controller, resource) = setup();
        let prior = create(
            &resource,
            State {
                name: "dev".into(),
                config: config(&[("a", Some("1")), ("b", Some("2")), ("c", Some("3"))]),
                ..Default::default()
            },
        )
        .await;

        let mut diags = Diagnostics::default();
        let proposed = State {
            config: config(&[("a", Some("1new")), ("c", None)]),
            ..prior.clone()
        };
        let (planned, trigger_replace) = resource
            .plan_update(&mut diags, prior.clone(), proposed.clone(), proposed.clone())
            .await
            .unwrap();
        assert!(trigger_replace.is_empty());
        let state = resource
            .update(&mut diags, prior, planned, proposed)
            .await
            .unwrap();

        let remote = controller.read_model_config(state.id.as_str()).await.unwrap();
        assert_eq!(remote["a"].value, ConfigValue::from("1new"));
        assert!(!remote.contains_key("b"));
        assert!(!remote.contains_key("c"));

        let read = resource.read(&mut diags, state).await.unwrap();
        assert_eq!(
            read.as_ref_option().unwrap().config,
            config(&[("a", Some("1new")), ("c", None)])
        );
    }

    #[tokio::test]
    async fn renaming_replaces_the_model() {
        let (_, resource) = setup();
        let prior = create(
            &resource,
            State {
                name: "dev".into(),
                ..Default::default()
            },
        )
        .await;
        let proposed = State {
            name: "prod".into(),
            ..prior.clone()
        };
        let mut diags = Diagnostics::default();
        let (_, trigger_replace) = resource
            .plan_update(&mut diags, prior, proposed.clone(), proposed)
            .await
            .unwrap();
        assert_eq!(trigger_replace, vec![AttributePath::new("name")]);
    }

    #[tokio::test]
    async fn destroyed_model_reads_as_null() {
        let (controller, resource) = setup();
        let state = create(
            &resource,
            State {
                name: "dev".into(),
                ..Default::default()
            },
        )
        .await;
        controller.set_deletion_delay(2);

        let mut diags = Diagnostics::default();
        resource.destroy(&mut diags, state.clone()).await.unwrap();
        assert_eq!(resource.read(&mut diags, state).await, Some(Value::Null));
    }

    #[tokio::test]
    async fn partially_created_model_is_recorded() {
        let (controller, resource) = setup();
        controller.inject_failure(
            "create_model",
            ClientError::PartiallyCreated {
                id: String::new(),
                reason: "credential rejected".into(),
            },
        );
        let proposed = State {
            name: "dev".into(),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let state = resource
            .create(&mut diags, proposed.clone(), proposed)
            .await
            .unwrap();
        assert!(state.id.is_value());
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn eventually_visible_model() {
        let (controller, resource) = setup();
        controller.set_visibility_delay(2);
        let state = create(
            &resource,
            State {
                name: "dev".into(),
                ..Default::default()
            },
        )
        .await;
        assert!(state.id.is_value());
    }
}
