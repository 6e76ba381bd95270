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

//! Juju controller API collaborator
//!
//! The resources never talk to a controller directly: they go through a [`JujuClient`]
//! handed to them by the provider. The transport is supplied by the host process.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::delta::ExposeRule;

mod error;
mod memory;
mod retry;

pub use error::{ClientError, ErrorKind};
pub use memory::{CharmDefinition, InMemoryController};
pub use retry::{retry, wait_for_deletion, RetryPolicy};

/// Value of a configuration key, as reported by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Int(i) => write!(f, "{}", i),
            // Juju stringifies floats without any fractional digit
            ConfigValue::Float(x) => write!(f, "{:.0}", x),
            ConfigValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_owned())
    }
}

/// Remote definition of a configuration key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub value: ConfigValue,
    /// The key currently holds the value supplied by the controller or the charm
    pub is_default: bool,
}

impl ConfigEntry {
    pub fn new<V: Into<ConfigValue>>(value: V, is_default: bool) -> Self {
        Self {
            value: value.into(),
            is_default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelInfo {
    pub name: String,
    pub uuid: String,
    pub cloud: String,
    pub region: String,
    pub constraints: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateModelRequest {
    pub name: String,
    pub cloud: Option<String>,
    pub region: Option<String>,
    pub config: BTreeMap<String, String>,
    pub constraints: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateModelRequest {
    pub uuid: String,
    pub config_to_set: BTreeMap<String, String>,
    pub config_to_unset: Vec<String>,
    pub constraints: Option<String>,
}

/// Charm deployed by an application
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharmInfo {
    pub name: String,
    pub channel: String,
    pub revision: i64,
    pub base: String,
}

/// Read-back of an application
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplicationInfo {
    pub model_uuid: String,
    pub name: String,
    pub charm: CharmInfo,
    pub units: i64,
    pub config: BTreeMap<String, ConfigEntry>,
    pub constraints: String,
    pub trust: bool,
    pub expose: Option<ExposeRule>,
    /// endpoint -> space, the default binding has the endpoint ""
    pub endpoint_bindings: BTreeMap<String, String>,
    pub machines: BTreeSet<String>,
    /// storage name -> directive
    pub storage: BTreeMap<String, String>,
    /// resource name -> revision
    pub resources: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateApplicationRequest {
    pub model_uuid: String,
    pub name: String,
    pub charm: String,
    pub channel: Option<String>,
    pub revision: Option<i64>,
    pub base: Option<String>,
    pub units: i64,
    pub config: BTreeMap<String, String>,
    pub constraints: Option<String>,
    pub trust: bool,
    pub expose: Option<ExposeRule>,
    pub endpoint_bindings: BTreeMap<String, String>,
    pub machines: BTreeSet<String>,
    pub storage: BTreeMap<String, String>,
    pub resources: BTreeMap<String, String>,
}

/// Charm revision change, applied before any other application change
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefreshCharmRequest {
    pub model_uuid: String,
    pub name: String,
    pub channel: Option<String>,
    pub revision: Option<i64>,
    /// resource name -> revision, "-1" floats to the latest revision
    pub resources: BTreeMap<String, String>,
}

impl RefreshCharmRequest {
    pub fn is_empty(&self) -> bool {
        self.channel.is_none() && self.revision.is_none() && self.resources.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateApplicationRequest {
    pub model_uuid: String,
    pub name: String,
    pub config_to_set: BTreeMap<String, String>,
    pub config_to_unset: Vec<String>,
    /// expose field -> value
    pub expose: Option<BTreeMap<String, String>>,
    /// expose fields to clear, "" clears the whole rule
    pub unexpose: Vec<String>,
    pub endpoint_bindings: BTreeMap<String, String>,
    pub units: Option<i64>,
    pub machines_to_add: Vec<String>,
    pub machines_to_remove: Vec<String>,
    pub constraints: Option<String>,
    pub trust: Option<bool>,
    pub storage_to_add: BTreeMap<String, String>,
}

impl UpdateApplicationRequest {
    pub fn is_empty(&self) -> bool {
        self.config_to_set.is_empty()
            && self.config_to_unset.is_empty()
            && self.expose.is_none()
            && self.unexpose.is_empty()
            && self.endpoint_bindings.is_empty()
            && self.units.is_none()
            && self.machines_to_add.is_empty()
            && self.machines_to_remove.is_empty()
            && self.constraints.is_none()
            && self.trust.is_none()
            && self.storage_to_add.is_empty()
    }
}

/// Application endpoint taking part in an integration
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Endpoint {
    pub application: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntegrationInfo {
    pub model_uuid: String,
    pub endpoints: Vec<Endpoint>,
    pub interface: String,
    pub via: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateIntegrationRequest {
    pub model_uuid: String,
    pub endpoints: Vec<Endpoint>,
    pub via: Option<String>,
}

/// Juju controller API
#[async_trait]
pub trait JujuClient: Send + Sync {
    /// Find the UUID of the model named `name`
    async fn resolve_model_uuid(&self, name: &str) -> Result<String, ClientError>;

    async fn create_model(&self, request: CreateModelRequest) -> Result<ModelInfo, ClientError>;
    async fn read_model(&self, uuid: &str) -> Result<ModelInfo, ClientError>;
    async fn read_model_config(
        &self,
        uuid: &str,
    ) -> Result<BTreeMap<String, ConfigEntry>, ClientError>;
    async fn update_model(&self, request: UpdateModelRequest) -> Result<(), ClientError>;
    async fn destroy_model(&self, uuid: &str) -> Result<(), ClientError>;

    async fn create_application(
        &self,
        request: CreateApplicationRequest,
    ) -> Result<(), ClientError>;
    async fn read_application(
        &self,
        model_uuid: &str,
        name: &str,
    ) -> Result<ApplicationInfo, ClientError>;
    async fn refresh_charm(&self, request: RefreshCharmRequest) -> Result<(), ClientError>;
    async fn update_application(
        &self,
        request: UpdateApplicationRequest,
    ) -> Result<(), ClientError>;
    async fn destroy_application(&self, model_uuid: &str, name: &str) -> Result<(), ClientError>;

    async fn create_integration(
        &self,
        request: CreateIntegrationRequest,
    ) -> Result<IntegrationInfo, ClientError>;
    async fn read_integration(
        &self,
        model_uuid: &str,
        endpoints: &[Endpoint],
    ) -> Result<IntegrationInfo, ClientError>;
    async fn destroy_integration(
        &self,
        model_uuid: &str,
        endpoints: &[Endpoint],
    ) -> Result<(), ClientError>;

    /// Authorize `payload` on the model, the key is then identified by its comment
    async fn add_ssh_key(&self, model_uuid: &str, payload: &str) -> Result<(), ClientError>;
    /// Read the key identified by its comment
    async fn read_ssh_key(&self, model_uuid: &str, comment: &str) -> Result<String, ClientError>;
    async fn remove_ssh_key(&self, model_uuid: &str, comment: &str) -> Result<(), ClientError>;

    /// user -> access level
    async fn read_model_access(
        &self,
        model_uuid: &str,
    ) -> Result<BTreeMap<String, String>, ClientError>;
    async fn grant_model_access(
        &self,
        model_uuid: &str,
        access: &str,
        users: &[String],
    ) -> Result<(), ClientError>;
    async fn revoke_model_access(
        &self,
        model_uuid: &str,
        access: &str,
        users: &[String],
    ) -> Result<(), ClientError>;
}

#[cfg(test)]
mod tests {
    use super::{ConfigEntry, ConfigValue};

    #[test]
    fn config_values_stringify_like_juju() {
        assert_eq!(ConfigValue::Bool(true).to_string(), "true");
        assert_eq!(ConfigValue::Int(-42).to_string(), "-42");
        assert_eq!(ConfigValue::Float(3.0).to_string(), "3");
        assert_eq!(ConfigValue::from("debug").to_string(), "debug");
    }

    #[test]
    fn config_entries_decode_from_json() {
        let entries: Vec<ConfigEntry> = serde_json::from_str(
            r#"[
                {"value": true, "is_default": true},
                {"value": 8080, "is_default": false},
                {"value": 0.5, "is_default": true},
                {"value": "info", "is_default": false}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries[0].value, ConfigValue::Bool(true));
        assert_eq!(entries[1].value, ConfigValue::Int(8080));
        assert_eq!(entries[2].value, ConfigValue::Float(0.5));
        assert_eq!(entries[3], ConfigEntry::new("info", false));
    }
}
