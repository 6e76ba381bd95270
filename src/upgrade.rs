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

//! Versioned state migrations
//!
//! A persisted state is tagged with the schema version it was written with. The
//! [`StateUpgrader`] walks the migration table from that version up to the current one.
//! Migrations consume the old state and return a new one: on error, the state handed
//! over by Terraform stays as it was.

use std::collections::BTreeMap;

use futures::{future::BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    client::{ClientError, JujuClient},
    diagnostics::Diagnostics,
    raw::RawValue,
};

/// State in its untyped form
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Migration of a state from one version to the next
pub type MigrationFn =
    for<'a> fn(&'a dyn JujuClient, JsonMap) -> BoxFuture<'a, Result<JsonMap, UpgradeError>>;

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("failed to resolve model {model}: {source}")]
    Lookup {
        model: String,
        #[source]
        source: ClientError,
    },

    #[error("field {0} is missing from the prior state")]
    MissingField(&'static str),

    #[error("no upgrade path from schema version {0}")]
    UnsupportedVersion(i64),

    #[error("prior state cannot be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Table of migrations, indexed by the version they upgrade from
#[derive(Clone)]
pub struct StateUpgrader {
    current: i64,
    migrations: BTreeMap<i64, MigrationFn>,
}

impl StateUpgrader {
    pub fn new(current: i64) -> Self {
        Self {
            current,
            migrations: BTreeMap::new(),
        }
    }

    /// Register the migration from `from` to `from + 1`
    pub fn with_migration(mut self, from: i64, migration: MigrationFn) -> Self {
        self.migrations.insert(from, migration);
        self
    }

    pub fn current_version(&self) -> i64 {
        self.current
    }

    /// Upgrade `state`, written with schema `version`, to the current version
    pub async fn upgrade(
        &self,
        client: &dyn JujuClient,
        mut state: JsonMap,
        version: i64,
    ) -> Result<JsonMap, UpgradeError> {
        if version > self.current || version < 0 {
            return Err(UpgradeError::UnsupportedVersion(version));
        }
        for from in version..self.current {
            let migration = self
                .migrations
                .get(&from)
                .ok_or(UpgradeError::UnsupportedVersion(from))?;
            debug!(from, to = from + 1, "migrating state");
            state = migration(client, state).await?;
        }
        Ok(state)
    }

    /// Decode a prior state, upgrade it, and decode the result as `T`
    ///
    /// Returns [`None`] iff there is an error reported in diagnostics
    pub async fn upgrade_raw<T>(
        &self,
        diags: &mut Diagnostics,
        client: &dyn JujuClient,
        version: i64,
        prior_state: RawValue,
    ) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let state = prior_state.deserialize::<JsonMap>(diags)?;
        let upgraded = self
            .upgrade(client, state, version)
            .await
            .and_then(|state| Ok(serde_json::from_value(serde_json::Value::Object(state))?));
        match upgraded {
            Ok(state) => {
                if version != self.current {
                    info!(from = version, to = self.current, "state upgraded");
                }
                Some(state)
            }
            Err(err) => {
                diags.root_error("Failed to upgrade the prior state", err.to_string());
                None
            }
        }
    }
}

/// Replace the `model` name of a state by the `model_uuid` it resolves to
///
/// The identifier embeds the model: its `id_segment`-th `:`-separated segment is
/// rewritten too. Every other field is carried over untouched.
pub async fn model_name_to_uuid(
    client: &dyn JujuClient,
    mut state: JsonMap,
    id_segment: usize,
) -> Result<JsonMap, UpgradeError> {
    let model = match state.remove("model") {
        Some(serde_json::Value::String(model)) if !model.is_empty() => model,
        _ => return Err(UpgradeError::MissingField("model")),
    };
    let uuid = client
        .resolve_model_uuid(&model)
        .await
        .map_err(|source| UpgradeError::Lookup {
            model: model.clone(),
            source,
        })?;

    let id = match state.get("id") {
        Some(serde_json::Value::String(id)) => id,
        _ => return Err(UpgradeError::MissingField("id")),
    };
    let mut segments = id.split(':').collect::<Vec<_>>();
    match segments.get_mut(id_segment) {
        Some(segment) => *segment = uuid.as_str(),
        None => return Err(UpgradeError::MissingField("id")),
    }
    let id = segments.join(":");

    state.insert("id".to_owned(), serde_json::Value::String(id));
    state.insert("model_uuid".to_owned(), serde_json::Value::String(uuid));
    Ok(state)
}

/// Migration of states whose identifier starts with the model
pub fn model_prefixed_v0(
    client: &dyn JujuClient,
    state: JsonMap,
) -> BoxFuture<'_, Result<JsonMap, UpgradeError>> {
    model_name_to_uuid(client, state, 0).boxed()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::{
        client::{CreateModelRequest, InMemoryController},
        value::ValueString,
    };

    fn object(value: serde_json::Value) -> JsonMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    async fn controller_with_model(name: &str) -> (InMemoryController, String) {
        let controller = InMemoryController::new();
        let model = controller
            .create_model(CreateModelRequest {
                name: name.to_owned(),
                ..Default::default()
            })
            .await
            .unwrap();
        (controller, model.uuid)
    }

    #[tokio::test]
    async fn model_name_is_replaced_by_uuid() {
        let (controller, uuid) = controller_with_model("dev").await;
        let upgrader = StateUpgrader::new(1).with_migration(0, model_prefixed_v0);
        let state = object(json!({
            "id": "dev:postgresql",
            "model": "dev",
            "name": "postgresql",
            "units": 3,
            "config": {"a": "1", "b": null},
        }));

        let upgraded = upgrader.upgrade(&controller, state, 0).await.unwrap();
        assert_eq!(
            serde_json::Value::Object(upgraded),
            json!({
                "id": format!("{}:postgresql", uuid),
                "model_uuid": uuid,
                "name": "postgresql",
                "units": 3,
                "config": {"a": "1", "b": null},
            })
        );
    }

    #[tokio::test]
    async fn lookup_failure_is_surfaced() {
        let controller = InMemoryController::new();
        let upgrader = StateUpgrader::new(1).with_migration(0, model_prefixed_v0);
        let state = object(json!({"id": "missing:app", "model": "missing"}));

        let err = upgrader.upgrade(&controller, state, 0).await.unwrap_err();
        assert!(matches!(
            err,
            UpgradeError::Lookup {
                source: ClientError::NotFound(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn current_version_is_passed_through() {
        let controller = InMemoryController::new();
        let upgrader = StateUpgrader::new(1).with_migration(0, model_prefixed_v0);
        let state = object(json!({"id": "uuid:app", "model_uuid": "uuid"}));

        let upgraded = upgrader.upgrade(&controller, state.clone(), 1).await.unwrap();
        assert_eq!(upgraded, state);
    }

    #[tokio::test]
    async fn unknown_versions_are_rejected() {
        let controller = InMemoryController::new();
        let upgrader = StateUpgrader::new(2).with_migration(1, model_prefixed_v0);

        let err = upgrader
            .upgrade(&controller, JsonMap::new(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, UpgradeError::UnsupportedVersion(0)));

        let err = upgrader
            .upgrade(&controller, JsonMap::new(), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, UpgradeError::UnsupportedVersion(3)));
    }

    #[tokio::test]
    async fn missing_model_is_reported() {
        let controller = InMemoryController::new();
        let err = model_name_to_uuid(&controller, object(json!({"id": "x:y"})), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, UpgradeError::MissingField("model")));
    }

    #[derive(Debug, Deserialize)]
    struct Upgraded {
        id: ValueString,
        model_uuid: ValueString,
        name: ValueString,
    }

    #[tokio::test]
    async fn raw_upgrade_reports_diagnostics() {
        let (controller, uuid) = controller_with_model("prod").await;
        let upgrader = StateUpgrader::new(1).with_migration(0, model_prefixed_v0);

        let mut diags = Diagnostics::default();
        let raw = RawValue::Json(br#"{"id": "prod:app", "model": "prod", "name": "app"}"#.to_vec());
        let upgraded: Upgraded = upgrader
            .upgrade_raw(&mut diags, &controller, 0, raw)
            .await
            .unwrap();
        assert_eq!(upgraded.id, ValueString::from(format!("{}:app", uuid)));
        assert_eq!(upgraded.model_uuid, ValueString::from(uuid));
        assert_eq!(upgraded.name, ValueString::from("app"));

        let raw = RawValue::Json(br#"{"id": "staging:app", "model": "staging"}"#.to_vec());
        let failed = upgrader
            .upgrade_raw::<Upgraded>(&mut diags, &controller, 0, raw)
            .await;
        assert!(failed.is_none());
        assert_eq!(diags.errors.len(), 1);
    }
}
