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

use std::{collections::HashMap, env, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    access_model::AccessModelResource,
    application::ApplicationResource,
    attribute_path::AttributePath,
    client::{JujuClient, RetryPolicy},
    diagnostics::Diagnostics,
    integration::IntegrationResource,
    logging, map,
    model::ModelResource,
    resource::DynamicResource,
    ssh_key::SshKeyResource,
    value::{Value, ValueString},
};

pub const ENV_CONTROLLER_ADDRESSES: &str = "JUJU_CONTROLLER_ADDRESSES";
pub const ENV_USERNAME: &str = "JUJU_USERNAME";
pub const ENV_PASSWORD: &str = "JUJU_PASSWORD";
pub const ENV_CA_CERT: &str = "JUJU_CA_CERT";

/// Configuration block of the provider
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Comma separated list of `host:port`
    pub controller_addresses: ValueString,
    pub username: ValueString,
    pub password: ValueString,
    /// PEM encoded CA certificate of the controller
    pub ca_certificate: ValueString,
}

/// Resolved connection settings of a controller
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub addresses: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ca_certificate: Option<String>,
}

/// Open connections to a controller
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ControllerConfig) -> anyhow::Result<Arc<dyn JujuClient>>;
}

fn validate_address(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

impl ProviderConfig {
    /// Fill the attributes left null from the environment
    pub fn with_env(self) -> Self {
        self.with_lookup(|name| env::var(name).ok())
    }

    fn with_lookup<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fallback = |value: ValueString, name: &str| value.or(lookup(name).into());
        Self {
            controller_addresses: fallback(self.controller_addresses, ENV_CONTROLLER_ADDRESSES),
            username: fallback(self.username, ENV_USERNAME),
            password: fallback(self.password, ENV_PASSWORD),
            ca_certificate: fallback(self.ca_certificate, ENV_CA_CERT),
        }
    }

    /// Check the known attributes
    ///
    /// Returns [`None`] iff there is an error reported in diagnostics
    pub fn validate(&self, diags: &mut Diagnostics) -> Option<()> {
        let errors = diags.errors.len();

        if let Value::Value(addresses) = &self.controller_addresses {
            let addresses = addresses
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .collect::<Vec<_>>();
            if addresses.is_empty() {
                diags.error_short(
                    "At least one controller address is required",
                    AttributePath::new("controller_addresses"),
                );
            }
            for address in addresses {
                if !validate_address(address) {
                    diags.error(
                        "Invalid controller address",
                        format!("`{}` is not of the form host:port", address),
                        AttributePath::new("controller_addresses"),
                    );
                }
            }
        }

        match (&self.username, &self.password) {
            (Value::Value(_), Value::Null) => diags.error_short(
                "A password is required along with the username",
                AttributePath::new("password"),
            ),
            (Value::Null, Value::Value(_)) => diags.error_short(
                "A username is required along with the password",
                AttributePath::new("username"),
            ),
            _ => (),
        }

        if let Value::Value(ca_certificate) = &self.ca_certificate {
            match pem::parse_many(ca_certificate.as_bytes()) {
                Ok(blocks) if blocks.iter().any(|block| block.tag() == "CERTIFICATE") => (),
                Ok(_) => diags.error_short(
                    "The CA certificate contains no CERTIFICATE block",
                    AttributePath::new("ca_certificate"),
                ),
                Err(err) => diags.error(
                    "The CA certificate is not valid PEM",
                    err.to_string(),
                    AttributePath::new("ca_certificate"),
                ),
            }
        }

        if diags.errors.len() == errors {
            Some(())
        } else {
            None
        }
    }

    /// Validate the configuration and turn it into connection settings
    pub fn resolve(&self, diags: &mut Diagnostics) -> Option<ControllerConfig> {
        if self.controller_addresses.is_null() {
            diags.error(
                "Missing controller addresses",
                format!(
                    "Set `controller_addresses` or the {} environment variable",
                    ENV_CONTROLLER_ADDRESSES
                ),
                AttributePath::new("controller_addresses"),
            );
        }
        self.validate(diags)?;
        if diags.has_errors() {
            return None;
        }
        Some(ControllerConfig {
            addresses: self
                .controller_addresses
                .as_str()
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_owned)
                .collect(),
            username: self.username.as_ref_option().cloned(),
            password: self.password.as_ref_option().cloned(),
            ca_certificate: self.ca_certificate.as_ref_option().cloned(),
        })
    }
}

/// Juju provider
///
/// The controller client is created by [`JujuProvider::configure`] and injected into every
/// resource returned by [`JujuProvider::get_resources`].
pub struct JujuProvider {
    connector: Arc<dyn Connector>,
    retry: RetryPolicy,
}

impl JujuProvider {
    pub fn new<C: Connector + 'static>(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the backoff used while waiting for the controller
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validate the provider block
    pub async fn validate(&self, diags: &mut Diagnostics, config: ProviderConfig) -> Option<()> {
        config.validate(diags)
    }

    /// Connect to the controller described by `config`, completed by the environment
    pub async fn configure(
        &self,
        diags: &mut Diagnostics,
        config: ProviderConfig,
    ) -> Option<Arc<dyn JujuClient>> {
        if let Err(err) = logging::init_from_env() {
            diags.root_warning("Failed to open the plugin log file", err.to_string());
        }

        let config = config.with_env().resolve(diags)?;
        match self.connector.connect(&config).await {
            Ok(client) => {
                info!(addresses = ?config.addresses, "provider configured");
                Some(client)
            }
            Err(err) => {
                warn!(error = %err, "controller connection failed");
                diags.root_error("Failed to connect to the Juju controller", format!("{:#}", err));
                None
            }
        }
    }

    pub fn get_resources(
        &self,
        _diags: &mut Diagnostics,
        client: Arc<dyn JujuClient>,
    ) -> Option<HashMap<String, Box<dyn DynamicResource>>> {
        Some(map! {
            "juju_model"        => ModelResource::new(client.clone(), self.retry),
            "juju_application"  => ApplicationResource::new(client.clone(), self.retry),
            "juju_integration"  => IntegrationResource::new(client.clone(), self.retry),
            "juju_ssh_key"      => SshKeyResource::new(client.clone()),
            "juju_access_model" => AccessModelResource::new(client),
        })
    }
}
