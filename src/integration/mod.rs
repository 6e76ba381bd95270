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

//! `juju_integration` resource

use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    attribute_path::AttributePath,
    client::{ClientError, CreateIntegrationRequest, Endpoint, JujuClient, RetryPolicy},
    diagnostics::Diagnostics,
    raw::RawValue,
    resource::Resource,
    upgrade::{model_prefixed_v0, StateUpgrader},
    utils::ExtractDiagnostics,
    value::{Value, ValueSet, ValueString},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct State {
    /// `<model_uuid>:<app>:<endpoint>:<app>:<endpoint>`
    pub id: ValueString,
    pub model_uuid: ValueString,
    pub application: ValueSet<Value<Application>>,
    /// Comma separated CIDRs of a cross-model integration
    pub via: ValueString,
    pub interface: ValueString,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Application {
    pub name: ValueString,
    pub endpoint: ValueString,
}

impl State {
    /// Endpoints of the integration, in a stable order
    fn endpoints(&self) -> Vec<Endpoint> {
        self.application
            .iter()
            .flatten()
            .filter_map(Value::as_ref_option)
            .map(|app| Endpoint {
                application: app.name.as_str().to_owned(),
                endpoint: app.endpoint.as_str().to_owned(),
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn make_id(model_uuid: &str, endpoints: &[Endpoint]) -> String {
        let mut id = model_uuid.to_owned();
        for endpoint in endpoints {
            id.push(':');
            id.push_str(&endpoint.application);
            id.push(':');
            id.push_str(&endpoint.endpoint);
        }
        id
    }
}

pub struct IntegrationResource {
    client: Arc<dyn JujuClient>,
    retry: RetryPolicy,
    upgrader: StateUpgrader,
}

impl IntegrationResource {
    pub fn new(client: Arc<dyn JujuClient>, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            upgrader: StateUpgrader::new(1).with_migration(0, model_prefixed_v0),
        }
    }
}

#[async_trait]
impl Resource for IntegrationResource {
    type State = State;

    fn schema_version(&self) -> i64 {
        self.upgrader.current_version()
    }

    async fn validate(&self, diags: &mut Diagnostics, config: Self::State) -> Option<()> {
        if let Value::Value(applications) = &config.application {
            if applications.len() != 2 {
                diags.error(
                    "Invalid integration",
                    format!(
                        "An integration links exactly two applications, got {}",
                        applications.len()
                    ),
                    AttributePath::new("application"),
                );
            }
            for (i, app) in applications.iter().enumerate() {
                let Value::Value(app) = app else {
                    continue;
                };
                for (name, value) in [("name", &app.name), ("endpoint", &app.endpoint)] {
                    if value.is_null() || value.as_ref_option().is_some_and(String::is_empty) {
                        diags.error_short(
                            format!("`{}` is required", name),
                            AttributePath::new("application")
                                .index(i as i64)
                                .attribute(name),
                        );
                    }
                }
            }
        }
        diags.status()
    }

    async fn read(&self, diags: &mut Diagnostics, state: Self::State) -> Option<Value<Self::State>> {
        let model_uuid = state.model_uuid.as_str();
        let info = match self
            .client
            .read_integration(model_uuid, &state.endpoints())
            .await
        {
            Ok(info) => info,
            Err(ClientError::NotFound(_)) => {
                info!(id = state.id.as_str(), "integration not found, removing it from the state");
                return Some(Value::Null);
            }
            Err(err) => {
                diags.root_error("Failed to read the integration", err.to_string());
                return None;
            }
        };
        let mut state = state;
        state.via = info.via.into();
        state.interface = Value::Value(info.interface);
        Some(Value::Value(state))
    }

    async fn plan_create(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State,
        _config_state: Self::State,
    ) -> Option<Self::State> {
        Some(State {
            id: Value::Unknown,
            interface: Value::Unknown,
            ..proposed_state
        })
    }

    async fn plan_update(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State,
        proposed_state: Self::State,
        _config_state: Self::State,
    ) -> Option<(Self::State, Vec<AttributePath>)> {
        let mut trigger_replace = Vec::new();
        for (name, prior, planned) in [
            ("model_uuid", &prior_state.model_uuid, &proposed_state.model_uuid),
            ("via", &prior_state.via, &proposed_state.via),
        ] {
            if prior != planned {
                trigger_replace.push(AttributePath::new(name));
            }
        }
        if prior_state.application != proposed_state.application {
            trigger_replace.push(AttributePath::new("application"));
        }
        let state = State {
            id: prior_state.id,
            interface: prior_state.interface,
            ..proposed_state
        };
        Some((state, trigger_replace))
    }

    async fn create(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State,
        _config_state: Self::State,
    ) -> Option<Self::State> {
        let model_uuid = planned_state.model_uuid.as_str().to_owned();
        let endpoints = planned_state.endpoints();
        let info = self
            .client
            .create_integration(CreateIntegrationRequest {
                model_uuid: model_uuid.clone(),
                endpoints: endpoints.clone(),
                via: planned_state.via.as_ref_option().cloned(),
            })
            .await
            .extract_diagnostics(diags, "Failed to create the integration", AttributePath::new("application"))?;

        let id = State::make_id(&model_uuid, &endpoints);
        info!(id, interface = info.interface, "integration created");
        Some(State {
            id: Value::Value(id),
            interface: Value::Value(info.interface),
            ..planned_state
        })
    }

    async fn update(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State,
        planned_state: Self::State,
        _config_state: Self::State,
    ) -> Option<Self::State> {
        // Every attribute change replaces the integration
        Some(planned_state)
    }

    async fn destroy(&self, diags: &mut Diagnostics, prior_state: Self::State) -> Option<()> {
        let model_uuid = prior_state.model_uuid.as_str();
        let endpoints = prior_state.endpoints();
        match crate::client::retry(&self.retry, ClientError::is_retryable, || {
            self.client.destroy_integration(model_uuid, &endpoints)
        })
        .await
        {
            Ok(()) | Err(ClientError::NotFound(_)) => Some(()),
            Err(err) => {
                diags.root_error("Failed to destroy the integration", err.to_string());
                None
            }
        }
    }

    async fn import(&self, diags: &mut Diagnostics, id: String) -> Option<Self::State> {
        let segments = id.split(':').collect::<Vec<_>>();
        let [model_uuid, app1, ep1, app2, ep2] = segments[..] else {
            diags.root_error(
                "Invalid integration identifier",
                format!(
                    "`{}` is not of the form <model_uuid>:<app>:<endpoint>:<app>:<endpoint>",
                    id
                ),
            );
            return None;
        };
        let application = [(app1, ep1), (app2, ep2)]
            .into_iter()
            .map(|(name, endpoint)| {
                Value::Value(Application {
                    name: name.into(),
                    endpoint: endpoint.into(),
                })
            })
            .collect();
        let state = State {
            id: Value::Value(id.clone()),
            model_uuid: model_uuid.into(),
            application: Value::Value(application),
            ..Default::default()
        };
        match self.read(diags, state).await? {
            Value::Value(state) => Some(state),
            _ => {
                diags.root_error_short("The integration to import does not exist");
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
