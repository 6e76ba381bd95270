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

//! `juju_access_model` resource

use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    attribute_path::AttributePath,
    client::{ClientError, JujuClient},
    delta::set_delta,
    diagnostics::Diagnostics,
    raw::RawValue,
    resource::Resource,
    upgrade::{model_prefixed_v0, StateUpgrader},
    utils::{string_set, ExtractDiagnostics},
    value::{Value, ValueSet, ValueString},
};

const ACCESS_LEVELS: [&str; 3] = ["read", "write", "admin"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct State {
    /// `<model_uuid>:<access>`
    pub id: ValueString,
    pub model_uuid: ValueString,
    pub access: ValueString,
    pub users: ValueSet<ValueString>,
}

pub struct AccessModelResource {
    client: Arc<dyn JujuClient>,
    upgrader: StateUpgrader,
}

impl AccessModelResource {
    pub fn new(client: Arc<dyn JujuClient>) -> Self {
        Self {
            client,
            upgrader: StateUpgrader::new(1).with_migration(0, model_prefixed_v0),
        }
    }

    async fn users_with_access(
        &self,
        diags: &mut Diagnostics,
        model_uuid: &str,
        access: &str,
    ) -> Option<Option<BTreeSet<String>>> {
        match self.client.read_model_access(model_uuid).await {
            Ok(grants) => Some(Some(
                grants
                    .into_iter()
                    .filter(|(_, granted)| granted == access)
                    .map(|(user, _)| user)
                    .collect(),
            )),
            Err(ClientError::NotFound(_)) => Some(None),
            Err(err) => {
                diags.root_error("Failed to read the model access", err.to_string());
                None
            }
        }
    }

    async fn apply(
        &self,
        diags: &mut Diagnostics,
        model_uuid: &str,
        access: &str,
        to_grant: &[String],
        to_revoke: &[String],
    ) -> Option<()> {
        if !to_revoke.is_empty() {
            debug!(access, users = ?to_revoke, "revoking model access");
            self.client
                .revoke_model_access(model_uuid, access, to_revoke)
                .await
                .extract_diagnostics(diags, "Failed to revoke the model access", AttributePath::new("users"))?;
        }
        if !to_grant.is_empty() {
            debug!(access, users = ?to_grant, "granting model access");
            self.client
                .grant_model_access(model_uuid, access, to_grant)
                .await
                .extract_diagnostics(diags, "Failed to grant the model access", AttributePath::new("users"))?;
        }
        Some(())
    }
}

#[async_trait]
impl Resource for AccessModelResource {
    type State = State;

    fn schema_version(&self) -> i64 {
        self.upgrader.current_version()
    }

    async fn validate(&self, diags: &mut Diagnostics, config: Self::State) -> Option<()> {
        if let Value::Value(access) = &config.access {
            if !ACCESS_LEVELS.contains(&access.as_str()) {
                diags.error(
                    "Invalid access level",
                    format!("`{}` is not one of {}", access, ACCESS_LEVELS.join(", ")),
                    AttributePath::new("access"),
                );
            }
        }
        if let Value::Value(users) = &config.users {
            if users.is_empty() {
                diags.error_short("At least one user is required", AttributePath::new("users"));
            }
        }
        diags.status()
    }

    async fn read(&self, diags: &mut Diagnostics, state: Self::State) -> Option<Value<Self::State>> {
        let users = self
            .users_with_access(diags, state.model_uuid.as_str(), state.access.as_str())
            .await?;
        match users {
            Some(users) if !users.is_empty() => {
                let mut state = state;
                state.users = Value::Value(users.into_iter().map(Value::Value).collect());
                Some(Value::Value(state))
            }
            _ => {
                info!(id = state.id.as_str(), "no user holds the access anymore");
                Some(Value::Null)
            }
        }
    }

    async fn plan_create(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State,
        _config_state: Self::State,
    ) -> Option<Self::State> {
        Some(State {
            id: Value::Unknown,
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
            ("access", &prior_state.access, &proposed_state.access),
        ] {
            if prior != planned {
                trigger_replace.push(AttributePath::new(name));
            }
        }
        Some((
            State {
                id: prior_state.id,
                ..proposed_state
            },
            trigger_replace,
        ))
    }

    async fn create(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State,
        _config_state: Self::State,
    ) -> Option<Self::State> {
        let model_uuid = planned_state.model_uuid.as_str();
        let access = planned_state.access.as_str();
        let users = string_set(&planned_state.users)
            .into_iter()
            .collect::<Vec<_>>();
        self.apply(diags, model_uuid, access, &users, &[]).await?;
        info!(model = model_uuid, access, "model access granted");

        let id = format!("{}:{}", model_uuid, access);
        Some(State {
            id: Value::Value(id),
            ..planned_state
        })
    }

    async fn update(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State,
        planned_state: Self::State,
        _config_state: Self::State,
    ) -> Option<Self::State> {
        let (to_grant, to_revoke) = set_delta(
            &string_set(&prior_state.users),
            &string_set(&planned_state.users),
        );
        self.apply(
            diags,
            planned_state.model_uuid.as_str(),
            planned_state.access.as_str(),
            &to_grant,
            &to_revoke,
        )
        .await?;
        Some(planned_state)
    }

    async fn destroy(&self, diags: &mut Diagnostics, prior_state: Self::State) -> Option<()> {
        let users = string_set(&prior_state.users)
            .into_iter()
            .collect::<Vec<_>>();
        if users.is_empty() {
            return Some(());
        }
        match self
            .client
            .revoke_model_access(prior_state.model_uuid.as_str(), prior_state.access.as_str(), &users)
            .await
        {
            Ok(()) | Err(ClientError::NotFound(_)) => Some(()),
            Err(err) => {
                diags.root_error("Failed to revoke the model access", err.to_string());
                None
            }
        }
    }

    async fn import(&self, diags: &mut Diagnostics, id: String) -> Option<Self::State> {
        let Some((model_uuid, access)) = id.rsplit_once(':') else {
            diags.root_error(
                "Invalid model access identifier",
                format!("`{}` is not of the form <model_uuid>:<access>", id),
            );
            return None;
        };
        let state = State {
            id: Value::Value(id.clone()),
            model_uuid: model_uuid.into(),
            access: access.into(),
            ..Default::default()
        };
        match self.read(diags, state).await? {
            Value::Value(state) => Some(state),
            _ => {
                diags.root_error_short("No user holds this access on the model");
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
