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

//! `juju_application` resource

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    attribute_path::AttributePath,
    client::{
        retry, wait_for_deletion, ApplicationInfo, ClientError, CreateApplicationRequest,
        JujuClient, RefreshCharmRequest, RetryPolicy, UpdateApplicationRequest,
    },
    config_diff::{compute_diff, normalize_config},
    delta::{
        endpoint_binding_delta, expose_delta, machine_set_delta, resource_revision_delta,
        storage_directive_delta,
    },
    diagnostics::Diagnostics,
    equality::comma_list_equals,
    raw::RawValue,
    resource::Resource,
    upgrade::{model_prefixed_v0, StateUpgrader},
    utils::{config_entries, string_set, ExtractDiagnostics},
    value::{Value, ValueString},
};

mod read;
mod state;

pub use state::{Binding, Charm, Expose, State};

pub struct ApplicationResource {
    client: Arc<dyn JujuClient>,
    retry: RetryPolicy,
    upgrader: StateUpgrader,
}

impl ApplicationResource {
    pub fn new(client: Arc<dyn JujuClient>, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            upgrader: StateUpgrader::new(1).with_migration(0, model_prefixed_v0),
        }
    }

    async fn read_info(
        &self,
        diags: &mut Diagnostics,
        state: &State,
    ) -> Option<Option<ApplicationInfo>> {
        match self
            .client
            .read_application(state.model_uuid.as_str(), state.name.as_str())
            .await
        {
            Ok(info) => Some(Some(info)),
            Err(ClientError::NotFound(_)) => Some(None),
            Err(err) => {
                diags.root_error("Failed to read the application", err.to_string());
                None
            }
        }
    }
}

/// Keep the prior expose string when the planned one lists the same elements
fn keep_equal_list(planned: &mut ValueString, prior: &ValueString) {
    if let (Value::Value(planned_list), Value::Value(prior_list)) = (&*planned, prior) {
        if comma_list_equals(planned_list, prior_list) {
            *planned = prior.clone();
        }
    }
}

fn changed<T: PartialEq>(prior: &Value<T>, planned: &Value<T>) -> bool {
    planned.is_value() && prior != planned
}

#[async_trait]
impl Resource for ApplicationResource {
    type State = State;

    fn schema_version(&self) -> i64 {
        self.upgrader.current_version()
    }

    async fn validate(&self, diags: &mut Diagnostics, config: Self::State) -> Option<()> {
        config.validate(diags);
        diags.status()
    }

    async fn read(&self, diags: &mut Diagnostics, state: Self::State) -> Option<Value<Self::State>> {
        let Some(info) = self.read_info(diags, &state).await? else {
            info!(
                model = state.model_uuid.as_str(),
                name = state.name.as_str(),
                "application not found, removing it from the state"
            );
            return Some(Value::Null);
        };
        let mut state = state;
        state.merge_remote(&info);
        Some(Value::Value(state))
    }

    async fn plan_create(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State,
        _config_state: Self::State,
    ) -> Option<Self::State> {
        let mut state = proposed_state;
        state.id = Value::Unknown;
        if let Value::Value(charm) = &mut state.charm {
            charm.channel = charm.channel.clone().or(Value::Unknown);
            charm.revision = charm.revision.clone().or(Value::Unknown);
            charm.base = charm.base.clone().or(Value::Unknown);
        }
        state.units = match &state.machines {
            Value::Value(machines) => Value::Value(machines.len() as i64),
            Value::Unknown => Value::Unknown,
            Value::Null => state.units.or(Value::Value(1)),
        };
        state.trust = state.trust.or(Value::Value(false));
        state.constraints = state.constraints.or(Value::Unknown);
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
        let mut trigger_replace = Vec::new();
        state.id = prior_state.id.clone();

        for (name, prior, planned) in [
            ("model_uuid", &prior_state.model_uuid, &state.model_uuid),
            ("name", &prior_state.name, &state.name),
        ] {
            if prior != planned {
                trigger_replace.push(AttributePath::new(name));
            }
        }
        if prior_state.charm_name() != state.charm_name() {
            trigger_replace.push(AttributePath::new("charm").index(0).attribute("name"));
        }

        if let (Value::Value(charm), Value::Value(prior_charm)) =
            (&mut state.charm, &prior_state.charm)
        {
            charm.channel = charm.channel.clone().or(prior_charm.channel.clone());
            charm.revision = if charm.channel == prior_charm.channel {
                charm.revision.clone().or(prior_charm.revision.clone())
            } else {
                // A new channel brings a new revision
                charm.revision.clone().or(Value::Unknown)
            };
            charm.base = charm.base.clone().or(prior_charm.base.clone());
        }
        state.units = match &state.machines {
            Value::Value(machines) => Value::Value(machines.len() as i64),
            Value::Unknown => Value::Unknown,
            Value::Null => state.units.or(prior_state.units.clone()),
        };
        state.trust = state.trust.or(Value::Value(false));
        state.constraints = state.constraints.or(prior_state.constraints.clone());

        if let (Value::Value(expose), Value::Value(prior_expose)) =
            (&mut state.expose, &prior_state.expose)
        {
            keep_equal_list(&mut expose.endpoints, &prior_expose.endpoints);
            keep_equal_list(&mut expose.spaces, &prior_expose.spaces);
            keep_equal_list(&mut expose.cidrs, &prior_expose.cidrs);
        }

        let storage = storage_directive_delta(&prior_state.storage(), &state.storage());
        for name in storage.to_replace {
            trigger_replace.push(AttributePath::new("storage_directives").key(name));
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
        let model_uuid = state.model_uuid.as_str().to_owned();
        let name = state.name.as_str().to_owned();
        let charm = state.charm.as_ref_option().cloned().unwrap_or_default();

        let request = CreateApplicationRequest {
            model_uuid: model_uuid.clone(),
            name: name.clone(),
            charm: charm.name.as_str().to_owned(),
            channel: charm.channel.as_ref_option().cloned(),
            revision: charm.revision.as_option(),
            base: charm.base.as_ref_option().cloned(),
            units: state.units.clone().unwrap_or(1),
            config: normalize_config(&config_entries(&state.config)),
            constraints: state.constraints.as_ref_option().cloned(),
            trust: state.trust.clone().unwrap_or(false),
            expose: state.expose_rule(),
            endpoint_bindings: state.bindings(),
            machines: string_set(&state.machines),
            storage: state.storage(),
            resources: state.resource_revisions(),
        };
        match self.client.create_application(request).await {
            Ok(()) => (),
            Err(ClientError::PartiallyCreated { id, reason }) => {
                state.id = Value::Value(id);
                let info = self.client.read_application(&model_uuid, &name).await.ok();
                state.fill_computed(info.as_ref());
                diags.root_error("The application has been partially deployed", reason);
                return Some(state);
            }
            Err(err) => {
                diags.root_error("Failed to deploy the application", err.to_string());
                return None;
            }
        }
        info!(model = model_uuid, name, charm = charm.name.as_str(), "application deployed");

        let info = retry(
            &self.retry,
            |err| err.is_not_found() || err.is_retryable(),
            || self.client.read_application(&model_uuid, &name),
        )
        .await
        .extract_diagnostics(diags, "Failed to read the deployed application", AttributePath::default())?;

        state.id = Value::Value(format!("{}:{}", model_uuid, name));
        state.fill_computed(Some(&info));
        Some(state)
    }

    async fn update(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State,
        planned_state: Self::State,
        _config_state: Self::State,
    ) -> Option<Self::State> {
        let mut state = planned_state;
        let model_uuid = state.model_uuid.as_str().to_owned();
        let name = state.name.as_str().to_owned();
        let charm = state.charm.as_ref_option().cloned().unwrap_or_default();
        let prior_charm = prior_state.charm.as_ref_option().cloned().unwrap_or_default();

        // The charm must be refreshed before the configuration is changed
        let mut refresh = RefreshCharmRequest {
            model_uuid: model_uuid.clone(),
            name: name.clone(),
            channel: changed(&prior_charm.channel, &charm.channel)
                .then(|| charm.channel.as_str().to_owned()),
            revision: changed(&prior_charm.revision, &charm.revision)
                .then(|| charm.revision.clone().unwrap_or_default()),
            ..Default::default()
        };
        let (planned_resources, prior_resources) =
            (state.resource_revisions(), prior_state.resource_revisions());
        if refresh.channel.is_some()
            || refresh.revision.is_some()
            || planned_resources != prior_resources
        {
            refresh.resources = resource_revision_delta(&planned_resources, &prior_resources);
        }
        if !refresh.is_empty() {
            debug!(?refresh, "refreshing charm");
            self.client
                .refresh_charm(refresh)
                .await
                .extract_diagnostics(diags, "Failed to refresh the charm", AttributePath::new("charm"))?;
        }

        let (config_to_set, config_to_unset) = compute_diff(
            &config_entries(&prior_state.config),
            &config_entries(&state.config),
        );
        let expose = expose_delta(
            prior_state.expose_rule().as_ref(),
            state.expose_rule().as_ref(),
        );
        let (prior_bindings, planned_bindings) = (prior_state.bindings(), state.bindings());
        let endpoint_bindings = if prior_bindings != planned_bindings {
            endpoint_binding_delta(&prior_bindings, &planned_bindings)
        } else {
            Default::default()
        };
        let (machines_to_add, machines_to_remove) = if state.machines.is_value() {
            machine_set_delta(
                &string_set(&prior_state.machines).into_iter().collect::<Vec<_>>(),
                &string_set(&state.machines).into_iter().collect::<Vec<_>>(),
            )
        } else {
            Default::default()
        };
        let units = (state.machines.is_null() && changed(&prior_state.units, &state.units))
            .then(|| state.units.clone().unwrap_or_default());
        let storage = storage_directive_delta(&prior_state.storage(), &state.storage());

        let request = UpdateApplicationRequest {
            model_uuid: model_uuid.clone(),
            name: name.clone(),
            config_to_set,
            config_to_unset,
            expose: expose.to_expose,
            unexpose: expose.to_unexpose,
            endpoint_bindings,
            units,
            machines_to_add,
            machines_to_remove,
            constraints: changed(&prior_state.constraints, &state.constraints)
                .then(|| state.constraints.as_str().to_owned()),
            trust: changed(&prior_state.trust, &state.trust).then(|| state.trust.clone().unwrap_or(false)),
            storage_to_add: storage.to_add,
        };
        if !request.is_empty() {
            debug!(?request, "updating application");
            self.client
                .update_application(request)
                .await
                .extract_diagnostics(diags, "Failed to update the application", AttributePath::default())?;
        }

        if state.charm.as_ref_option().is_some_and(|charm| charm.revision.is_unknown()) {
            let info = self
                .client
                .read_application(&model_uuid, &name)
                .await
                .extract_diagnostics(diags, "Failed to read the updated application", AttributePath::default())?;
            state.fill_computed(Some(&info));
        }
        Some(state)
    }

    async fn destroy(&self, diags: &mut Diagnostics, prior_state: Self::State) -> Option<()> {
        let model_uuid = prior_state.model_uuid.as_str();
        let name = prior_state.name.as_str();
        match self.client.destroy_application(model_uuid, name).await {
            Ok(()) | Err(ClientError::NotFound(_)) => (),
            Err(err) => {
                diags.root_error("Failed to destroy the application", err.to_string());
                return None;
            }
        }
        wait_for_deletion(&self.retry, || self.client.read_application(model_uuid, name))
            .await
            .extract_diagnostics(diags, "The application has not been destroyed", AttributePath::default())
    }

    async fn import(&self, diags: &mut Diagnostics, id: String) -> Option<Self::State> {
        let Some((model_uuid, name)) = id.split_once(':') else {
            diags.root_error(
                "Invalid application identifier",
                format!("`{}` is not of the form <model_uuid>:<name>", id),
            );
            return None;
        };
        let mut state = State {
            model_uuid: model_uuid.into(),
            name: name.into(),
            ..Default::default()
        };
        state.id = Value::Value(id);
        match self.read_info(diags, &state).await? {
            Some(info) => {
                state.merge_remote(&info);
                Some(state)
            }
            None => {
                diags.root_error_short("The application to import does not exist");
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
    use std::{
        collections::{BTreeMap, BTreeSet},
        time::Duration,
    };

    use serde_json::json;

    use super::*;
    use crate::{
        client::{CharmDefinition, ConfigValue, CreateModelRequest, InMemoryController},
        delta::ExposeRule,
        value::ValueMap,
    };

    const FAST: RetryPolicy = RetryPolicy {
        attempts: 5,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    };

    fn strings(entries: &[(&str, &str)]) -> ValueMap<ValueString> {
        Value::Value(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), Value::Value(v.to_string())))
                .collect(),
        )
    }

    async fn setup() -> (InMemoryController, ApplicationResource, String) {
        let controller = InMemoryController::new().with_charm(
            "postgresql",
            CharmDefinition {
                revision: 42,
                config: BTreeMap::from([
                    ("port".to_owned(), ConfigValue::Int(5432)),
                    ("profile".to_owned(), ConfigValue::from("testing")),
                ]),
                endpoints: vec!["db".to_owned(), "admin".to_owned()],
            },
        );
        let model = controller
            .create_model(CreateModelRequest {
                name: "dev".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let resource = ApplicationResource::new(Arc::new(controller.clone()), FAST);
        (controller, resource, model.uuid)
    }

    fn proposed(model_uuid: &str) -> State {
        State {
            model_uuid: model_uuid.into(),
            name: "db".into(),
            charm: Value::Value(Charm {
                name: "postgresql".into(),
                ..Default::default()
            }),
            config: strings(&[("profile", "production")]),
            ..Default::default()
        }
    }

    async fn create(resource: &ApplicationResource, proposed: State) -> State {
        let mut diags = Diagnostics::default();
        let planned = resource
            .plan_create(&mut diags, proposed.clone(), proposed.clone())
            .await
            .unwrap();
        let state = resource.create(&mut diags, planned, proposed).await.unwrap();
        assert!(!diags.has_errors(), "{:?}", diags);
        state
    }

    async fn apply(resource: &ApplicationResource, prior: State, proposed: State) -> State {
        let mut diags = Diagnostics::default();
        let (planned, trigger_replace) = resource
            .plan_update(&mut diags, prior.clone(), proposed.clone(), proposed.clone())
            .await
            .unwrap();
        assert!(trigger_replace.is_empty(), "{:?}", trigger_replace);
        let state = resource
            .update(&mut diags, prior, planned, proposed)
            .await
            .unwrap();
        assert!(!diags.has_errors(), "{:?}", diags);
        state
    }

    #[tokio::test]
    async fn deploy_fills_computed_attributes() {
        let (_, resource, model_uuid) = setup().await;
        let state = create(&resource, proposed(&model_uuid)).await;

        assert_eq!(state.id, Value::Value(format!("{}:db", model_uuid)));
        let charm = state.charm.as_ref_option().unwrap();
        assert_eq!(charm.revision, Value::Value(42));
        assert_eq!(charm.channel, ValueString::from("latest/stable"));
        assert_eq!(state.units, Value::Value(1));
        assert_eq!(state.constraints, ValueString::from(""));

        // Charm defaults never reach the state
        let mut diags = Diagnostics::default();
        let read = resource.read(&mut diags, state.clone()).await.unwrap();
        assert_eq!(read, Value::Value(state));
    }

    #[tokio::test]
    async fn config_drift_is_detected() {
        let (controller, resource, model_uuid) = setup().await;
        let state = create(&resource, proposed(&model_uuid)).await;
        controller.set_application_config(&model_uuid, "db", "port", "6432");

        let mut diags = Diagnostics::default();
        let read = resource.read(&mut diags, state).await.unwrap();
        assert_eq!(
            read.as_ref_option().unwrap().config,
            strings(&[("port", "6432"), ("profile", "production")])
        );
    }

    #[tokio::test]
    async fn charm_is_refreshed_before_config_update() {
        let (controller, resource, model_uuid) = setup().await;
        let prior = create(&resource, proposed(&model_uuid)).await;

        let mut proposed = prior.clone();
        if let Value::Value(charm) = &mut proposed.charm {
            charm.revision = Value::Value(40);
        }
        proposed.config = strings(&[("profile", "staging")]);
        let state = apply(&resource, prior, proposed).await;
        assert_eq!(state.charm.as_ref_option().unwrap().revision, Value::Value(40));

        let operations = controller.operations();
        let refresh = operations.iter().position(|op| op == "refresh_charm db");
        let update = operations.iter().position(|op| op == "update_application db");
        assert!(refresh.is_some() && update.is_some());
        assert!(refresh < update);
    }

    #[tokio::test]
    async fn changing_channel_recomputes_revision() {
        let (_, resource, model_uuid) = setup().await;
        let prior = create(&resource, proposed(&model_uuid)).await;

        let mut proposed = prior.clone();
        if let Value::Value(charm) = &mut proposed.charm {
            charm.channel = "14/edge".into();
            charm.revision = Value::Null;
        }
        let mut diags = Diagnostics::default();
        let (planned, _) = resource
            .plan_update(&mut diags, prior.clone(), proposed.clone(), proposed.clone())
            .await
            .unwrap();
        assert!(planned.charm.as_ref_option().unwrap().revision.is_unknown());

        let state = resource
            .update(&mut diags, prior, planned, proposed)
            .await
            .unwrap();
        let charm = state.charm.as_ref_option().unwrap();
        assert_eq!(charm.channel, ValueString::from("14/edge"));
        assert_eq!(charm.revision, Value::Value(42));
    }

    #[tokio::test]
    async fn expose_is_updated_field_by_field() {
        let (controller, resource, model_uuid) = setup().await;
        let prior = create(
            &resource,
            State {
                expose: Value::Value(Expose {
                    endpoints: "db,admin".into(),
                    spaces: "alpha".into(),
                    ..Default::default()
                }),
                ..proposed(&model_uuid)
            },
        )
        .await;

        let proposed = State {
            expose: Value::Value(Expose {
                endpoints: "admin,db".into(),
                cidrs: "10.0.0.0/24".into(),
                ..Default::default()
            }),
            ..prior.clone()
        };
        let state = apply(&resource, prior, proposed).await;
        assert_eq!(
            state.expose.as_ref_option().unwrap().endpoints,
            ValueString::from("db,admin")
        );

        let info = controller.read_application(&model_uuid, "db").await.unwrap();
        assert_eq!(
            info.expose,
            Some(ExposeRule {
                endpoints: Some("db,admin".into()),
                spaces: None,
                cidrs: Some("10.0.0.0/24".into()),
            })
        );

        let unexposed = apply(
            &resource,
            state.clone(),
            State {
                expose: Value::Null,
                ..state
            },
        )
        .await;
        assert!(unexposed.expose.is_null());
        let info = controller.read_application(&model_uuid, "db").await.unwrap();
        assert_eq!(info.expose, None);
    }

    #[tokio::test]
    async fn removed_binding_returns_to_default_space() {
        let (controller, resource, model_uuid) = setup().await;
        let prior = create(
            &resource,
            State {
                endpoint_bindings: Value::Value(BTreeSet::from([Value::Value(Binding {
                    endpoint: "db".into(),
                    space: "beta".into(),
                })])),
                ..proposed(&model_uuid)
            },
        )
        .await;
        let info = controller.read_application(&model_uuid, "db").await.unwrap();
        assert_eq!(info.endpoint_bindings["db"], "beta");

        apply(
            &resource,
            prior.clone(),
            State {
                endpoint_bindings: Value::Value(BTreeSet::new()),
                ..prior
            },
        )
        .await;
        let info = controller.read_application(&model_uuid, "db").await.unwrap();
        assert_eq!(info.endpoint_bindings["db"], "alpha");
    }

    #[tokio::test]
    async fn machines_drive_units() {
        let (controller, resource, model_uuid) = setup().await;
        let machines = |ids: &[&str]| {
            Value::Value(
                ids.iter()
                    .map(|id| Value::Value(id.to_string()))
                    .collect::<BTreeSet<_>>(),
            )
        };
        let prior = create(
            &resource,
            State {
                machines: machines(&["0", "1"]),
                ..proposed(&model_uuid)
            },
        )
        .await;
        assert_eq!(prior.units, Value::Value(2));

        let state = apply(
            &resource,
            prior.clone(),
            State {
                machines: machines(&["1", "2", "3"]),
                ..prior
            },
        )
        .await;
        assert_eq!(state.units, Value::Value(3));
        let info = controller.read_application(&model_uuid, "db").await.unwrap();
        assert_eq!(
            info.machines,
            BTreeSet::from(["1".to_owned(), "2".to_owned(), "3".to_owned()])
        );
    }

    #[tokio::test]
    async fn removed_resource_pin_floats_to_latest() {
        let (controller, resource, model_uuid) = setup().await;
        let prior = create(
            &resource,
            State {
                resources: strings(&[("image", "3")]),
                ..proposed(&model_uuid)
            },
        )
        .await;

        let state = apply(
            &resource,
            prior.clone(),
            State {
                resources: Value::Null,
                ..prior
            },
        )
        .await;
        assert!(state.resources.is_null());
        let info = controller.read_application(&model_uuid, "db").await.unwrap();
        assert!(info.resources.is_empty());
    }

    #[tokio::test]
    async fn storage_changes() {
        let (_, resource, model_uuid) = setup().await;
        let prior = State {
            id: "uuid:db".into(),
            storage_directives: strings(&[("pgdata", "10G")]),
            ..proposed(&model_uuid)
        };
        let mut diags = Diagnostics::default();

        let added = State {
            storage_directives: strings(&[("pgdata", "10G"), ("logs", "1G")]),
            ..prior.clone()
        };
        let (_, trigger_replace) = resource
            .plan_update(&mut diags, prior.clone(), added.clone(), added)
            .await
            .unwrap();
        assert!(trigger_replace.is_empty());

        let resized = State {
            storage_directives: strings(&[("pgdata", "20G")]),
            ..prior.clone()
        };
        let (_, trigger_replace) = resource
            .plan_update(&mut diags, prior.clone(), resized.clone(), resized)
            .await
            .unwrap();
        assert_eq!(
            trigger_replace,
            vec![AttributePath::new("storage_directives").key("pgdata")]
        );
    }

    #[tokio::test]
    async fn new_charm_replaces_the_application() {
        let (_, resource, model_uuid) = setup().await;
        let prior = State {
            id: "uuid:db".into(),
            ..proposed(&model_uuid)
        };
        let proposed = State {
            charm: Value::Value(Charm {
                name: "mysql".into(),
                ..Default::default()
            }),
            ..prior.clone()
        };
        let mut diags = Diagnostics::default();
        let (_, trigger_replace) = resource
            .plan_update(&mut diags, prior, proposed.clone(), proposed)
            .await
            .unwrap();
        assert_eq!(
            trigger_replace,
            vec![AttributePath::new("charm").index(0).attribute("name")]
        );
    }

    #[tokio::test]
    async fn destroyed_application_reads_as_null() {
        let (controller, resource, model_uuid) = setup().await;
        let state = create(&resource, proposed(&model_uuid)).await;
        controller.set_deletion_delay(1);

        let mut diags = Diagnostics::default();
        resource.destroy(&mut diags, state.clone()).await.unwrap();
        assert_eq!(resource.read(&mut diags, state).await, Some(Value::Null));
    }

    #[tokio::test]
    async fn partially_deployed_application_is_recorded() {
        let (controller, resource, model_uuid) = setup().await;
        controller.inject_failure(
            "create_application",
            ClientError::PartiallyCreated {
                id: String::new(),
                reason: "unit placement failed".into(),
            },
        );
        let mut diags = Diagnostics::default();
        let proposed = proposed(&model_uuid);
        let planned = resource
            .plan_create(&mut diags, proposed.clone(), proposed.clone())
            .await
            .unwrap();
        let state = resource.create(&mut diags, planned, proposed).await.unwrap();
        assert_eq!(state.id, Value::Value(format!("{}:db", model_uuid)));
        assert_eq!(state.charm.as_ref_option().unwrap().revision, Value::Value(42));
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn import_reads_user_config() {
        let (_, resource, model_uuid) = setup().await;
        create(&resource, proposed(&model_uuid)).await;

        let mut diags = Diagnostics::default();
        let imported = resource
            .import(&mut diags, format!("{}:db", model_uuid))
            .await
            .unwrap();
        assert_eq!(imported.config, strings(&[("profile", "production")]));
        assert_eq!(imported.charm_name(), "postgresql");
    }

    #[tokio::test]
    async fn upgrade_resolves_model_name() {
        let (_, resource, model_uuid) = setup().await;
        let mut diags = Diagnostics::default();
        let prior = RawValue::Json(
            json!({
                "id": "dev:db",
                "model": "dev",
                "name": "db",
                "charm": [{"name": "postgresql", "revision": 42}],
                "units": 1
            })
            .to_string()
            .into_bytes(),
        );
        let state = resource.upgrade(&mut diags, 0, prior).await.unwrap();
        assert_eq!(state.id, Value::Value(format!("{}:db", model_uuid)));
        assert_eq!(state.model_uuid, Value::Value(model_uuid));
        assert_eq!(state.units, Value::Value(1));
    }
}
