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

//! `juju_ssh_key` resource
//!
//! A key is identified on the controller by its comment.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{future::BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    attribute_path::AttributePath,
    client::{ClientError, JujuClient},
    diagnostics::Diagnostics,
    equality::{ssh_key_equals, SshPublicKey},
    raw::RawValue,
    resource::Resource,
    upgrade::{model_name_to_uuid, JsonMap, StateUpgrader, UpgradeError},
    utils::ExtractDiagnostics,
    value::{Value, ValueString},
};

const ID_PREFIX: &str = "sshkey";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct State {
    /// `sshkey:<model_uuid>:<comment>`
    pub id: ValueString,
    pub model_uuid: ValueString,
    pub payload: ValueString,
}

impl State {
    fn comment(&self) -> Option<&str> {
        SshPublicKey::parse(self.payload.as_ref_option()?)?.comment
    }
}

/// The model is the second segment of the identifier
fn model_name_v0(
    client: &dyn JujuClient,
    state: JsonMap,
) -> BoxFuture<'_, Result<JsonMap, UpgradeError>> {
    model_name_to_uuid(client, state, 1).boxed()
}

pub struct SshKeyResource {
    client: Arc<dyn JujuClient>,
    upgrader: StateUpgrader,
}

impl SshKeyResource {
    pub fn new(client: Arc<dyn JujuClient>) -> Self {
        Self {
            client,
            upgrader: StateUpgrader::new(1).with_migration(0, model_name_v0),
        }
    }
}

#[async_trait]
impl Resource for SshKeyResource {
    type State = State;

    fn schema_version(&self) -> i64 {
        self.upgrader.current_version()
    }

    async fn validate(&self, diags: &mut Diagnostics, config: Self::State) -> Option<()> {
        if let Value::Value(payload) = &config.payload {
            match SshPublicKey::parse(payload) {
                Some(SshPublicKey { comment: Some(_), .. }) => (),
                Some(_) => diags.error_short(
                    "The SSH public key needs a comment to be identified",
                    AttributePath::new("payload"),
                ),
                None => diags.error_short("Invalid SSH public key", AttributePath::new("payload")),
            }
        }
        diags.status()
    }

    async fn read(&self, diags: &mut Diagnostics, state: Self::State) -> Option<Value<Self::State>> {
        let Some(comment) = state.comment() else {
            diags.error_short("Invalid SSH public key", AttributePath::new("payload"));
            return None;
        };
        let remote = match self
            .client
            .read_ssh_key(state.model_uuid.as_str(), comment)
            .await
        {
            Ok(remote) => remote,
            Err(ClientError::NotFound(_)) => {
                info!(comment, "ssh key not found, removing it from the state");
                return Some(Value::Null);
            }
            Err(err) => {
                diags.root_error("Failed to read the SSH key", err.to_string());
                return None;
            }
        };
        let mut state = state;
        if !ssh_key_equals(state.payload.as_str(), &remote) {
            state.payload = Value::Value(remote);
        }
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
        let mut state = proposed_state;
        let mut trigger_replace = Vec::new();
        if state.model_uuid != prior_state.model_uuid {
            trigger_replace.push(AttributePath::new("model_uuid"));
        }
        if ssh_key_equals(state.payload.as_str(), prior_state.payload.as_str()) {
            state.payload = prior_state.payload;
        } else if state.payload != prior_state.payload {
            trigger_replace.push(AttributePath::new("payload"));
        }
        state.id = if trigger_replace.is_empty() {
            prior_state.id
        } else {
            Value::Unknown
        };
        Some((state, trigger_replace))
    }

    async fn create(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State,
        _config_state: Self::State,
    ) -> Option<Self::State> {
        let model_uuid = planned_state.model_uuid.as_str();
        let Some(comment) = planned_state.comment() else {
            diags.error_short("Invalid SSH public key", AttributePath::new("payload"));
            return None;
        };
        self.client
            .add_ssh_key(model_uuid, planned_state.payload.as_str())
            .await
            .extract_diagnostics(diags, "Failed to add the SSH key", AttributePath::new("payload"))?;
        info!(model = model_uuid, comment, "ssh key added");

        let id = format!("{}:{}:{}", ID_PREFIX, model_uuid, comment);
        Some(State {
            id: Value::Value(id),
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
        Some(planned_state)
    }

    async fn destroy(&self, diags: &mut Diagnostics, prior_state: Self::State) -> Option<()> {
        let Some(comment) = prior_state.comment() else {
            return Some(());
        };
        match self
            .client
            .remove_ssh_key(prior_state.model_uuid.as_str(), comment)
            .await
        {
            Ok(()) | Err(ClientError::NotFound(_)) => Some(()),
            Err(err) => {
                diags.root_error("Failed to remove the SSH key", err.to_string());
                None
            }
        }
    }

    async fn import(&self, diags: &mut Diagnostics, id: String) -> Option<Self::State> {
        let parsed = id
            .strip_prefix(ID_PREFIX)
            .and_then(|rest| rest.strip_prefix(':'))
            .and_then(|rest| rest.split_once(':'));
        let Some((model_uuid, comment)) = parsed else {
            diags.root_error(
                "Invalid SSH key identifier",
                format!("`{}` is not of the form sshkey:<model_uuid>:<comment>", id),
            );
            return None;
        };
        let payload = self
            .client
            .read_ssh_key(model_uuid, comment)
            .await
            .extract_diagnostics(diags, "Failed to read the SSH key to import", AttributePath::default())?;
        Some(State {
            id: Value::Value(id.clone()),
            model_uuid: model_uuid.into(),
            payload: Value::Value(payload),
        })
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
    use super::*;
    use crate::client::{CreateModelRequest, InMemoryController};

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIL0d4SIs4oO5QijUje1c6Vy1RGusPTlwJbUdYeeZE3aS";
    const OTHER_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIBgdhEKnSu1BvcgwR9lMmD3zn9gVLpVvn5drg5QHArAx";

    async fn setup() -> (SshKeyResource, String) {
        let controller = InMemoryController::new();
        let model = controller
            .create_model(CreateModelRequest {
                name: "dev".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        (SshKeyResource::new(Arc::new(controller)), model.uuid)
    }

    fn key(model_uuid: &str, payload: &str) -> State {
        State {
            model_uuid: model_uuid.into(),
            payload: payload.into(),
            ..Default::default()
        }
    }

    async fn create(resource: &SshKeyResource, proposed: State) -> State {
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
    async fn keys_need_a_comment() {
        let (resource, model_uuid) = setup().await;
        let mut diags = Diagnostics::default();
        assert!(resource
            .validate(&mut diags, key(&model_uuid, &format!("{} alice@laptop", KEY)))
            .await
            .is_some());
        assert!(resource
            .validate(&mut diags, key(&model_uuid, KEY))
            .await
            .is_none());
        let mut diags = Diagnostics::default();
        assert!(resource
            .validate(&mut diags, key(&model_uuid, "ssh-ed25519 not-base64 bob"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn stored_payload_survives_reformatting() {
        let (resource, model_uuid) = setup().await;
        let payload = format!("{}   alice@laptop\n", KEY);
        let state = create(&resource, key(&model_uuid, &payload)).await;
        assert_eq!(
            state.id,
            Value::Value(format!("sshkey:{}:alice@laptop", model_uuid))
        );

        let mut diags = Diagnostics::default();
        let read = resource.read(&mut diags, state.clone()).await.unwrap();
        assert_eq!(read, Value::Value(state));
    }

    #[tokio::test]
    async fn replacing_the_key() {
        let (resource, model_uuid) = setup().await;
        let prior = create(&resource, key(&model_uuid, &format!("{} alice@laptop", KEY))).await;
        let mut diags = Diagnostics::default();

        let same = key(&model_uuid, &format!("{}  alice@laptop", KEY));
        let (planned, trigger_replace) = resource
            .plan_update(&mut diags, prior.clone(), same.clone(), same)
            .await
            .unwrap();
        assert!(trigger_replace.is_empty());
        assert_eq!(planned, prior);

        let other = key(&model_uuid, &format!("{} alice@laptop", OTHER_KEY));
        let (planned, trigger_replace) = resource
            .plan_update(&mut diags, prior.clone(), other.clone(), other)
            .await
            .unwrap();
        assert_eq!(trigger_replace, vec![AttributePath::new("payload")]);
        assert!(planned.id.is_unknown());
    }

    #[tokio::test]
    async fn removed_key_reads_as_null() {
        let (resource, model_uuid) = setup().await;
        let state = create(&resource, key(&model_uuid, &format!("{} alice@laptop", KEY))).await;

        let mut diags = Diagnostics::default();
        resource.destroy(&mut diags, state.clone()).await.unwrap();
        assert_eq!(resource.read(&mut diags, state).await, Some(Value::Null));
    }

    #[tokio::test]
    async fn import_by_comment() {
        let (resource, model_uuid) = setup().await;
        create(&resource, key(&model_uuid, &format!("{} alice@laptop", KEY))).await;

        let mut diags = Diagnostics::default();
        let imported = resource
            .import(&mut diags, format!("sshkey:{}:alice@laptop", model_uuid))
            .await
            .unwrap();
        assert!(ssh_key_equals(imported.payload.as_str(), KEY));
        assert_eq!(imported.model_uuid, Value::Value(model_uuid));
    }

    #[tokio::test]
    async fn upgrade_rewrites_the_model_segment() {
        let (resource, model_uuid) = setup().await;
        let prior = RawValue::Json(
            format!(
                r#"{{"id": "sshkey:dev:alice@laptop", "model": "dev", "payload": "{} alice@laptop"}}"#,
                KEY
            )
            .into_bytes(),
        );
        let mut diags = Diagnostics::default();
        let state = resource.upgrade(&mut diags, 0, prior).await.unwrap();
        assert_eq!(
            state.id,
            Value::Value(format!("sshkey:{}:alice@laptop", model_uuid))
        );
        assert_eq!(state.model_uuid, Value::Value(model_uuid));
    }
}
