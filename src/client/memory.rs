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

//! Simulated controller
//!
//! [`InMemoryController`] behaves like a Juju controller from the point of view of the
//! provider: objects get UUIDs, charm defaults show up in the configuration, and the
//! operations are recorded in order. Failures and eventual consistency can be injected.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    ApplicationInfo, CharmInfo, ClientError, ConfigEntry, ConfigValue, CreateApplicationRequest,
    CreateIntegrationRequest, CreateModelRequest, Endpoint, IntegrationInfo, JujuClient,
    ModelInfo, RefreshCharmRequest, UpdateApplicationRequest, UpdateModelRequest,
};
use crate::{
    delta::{ExposeRule, EXPOSE_CIDRS, EXPOSE_ENDPOINTS, EXPOSE_SPACES, UNEXPOSE_ALL},
    equality::SshPublicKey,
    provider::{Connector, ControllerConfig},
};

const DEFAULT_SPACE: &str = "alpha";
const DEFAULT_CLOUD: &str = "localhost";
const DEFAULT_REGION: &str = "default";
const DEFAULT_CHANNEL: &str = "latest/stable";
const DEFAULT_BASE: &str = "ubuntu@22.04";

/// Charm published to the simulated charm store
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CharmDefinition {
    /// Latest revision
    pub revision: i64,
    /// Default configuration
    pub config: BTreeMap<String, ConfigValue>,
    pub endpoints: Vec<String>,
}

/// Juju controller kept in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryController {
    inner: Arc<Mutex<Controller>>,
}

#[derive(Debug, Default)]
struct Controller {
    models: BTreeMap<String, ModelRecord>,
    applications: BTreeMap<(String, String), ApplicationRecord>,
    integrations: Vec<IntegrationInfo>,
    /// model -> comment -> key
    ssh_keys: BTreeMap<String, BTreeMap<String, String>>,
    /// model -> user -> access
    access: BTreeMap<String, BTreeMap<String, String>>,
    charms: BTreeMap<String, CharmDefinition>,
    model_defaults: BTreeMap<String, ConfigValue>,
    operations: Vec<String>,
    failures: Vec<(String, ClientError)>,
    visibility_delay: u32,
    deletion_delay: u32,
    /// objects not visible yet, with the number of reads before they appear
    hidden: BTreeMap<String, u32>,
    /// destroyed objects still visible, with the number of reads before they vanish
    dying: BTreeMap<String, u32>,
}

#[derive(Debug)]
struct ModelRecord {
    info: ModelInfo,
    config: BTreeMap<String, String>,
}

#[derive(Debug)]
struct ApplicationRecord {
    info: ApplicationInfo,
    charm_config: BTreeMap<String, ConfigValue>,
    user_config: BTreeMap<String, String>,
}

impl ApplicationRecord {
    fn config(&self) -> BTreeMap<String, ConfigEntry> {
        let mut config = self
            .charm_config
            .iter()
            .map(|(key, value)| (key.clone(), ConfigEntry::new(value.clone(), true)))
            .collect::<BTreeMap<_, _>>();
        for (key, value) in &self.user_config {
            config.insert(key.clone(), ConfigEntry::new(value.as_str(), false));
        }
        config
    }
}

/// Fate of an object on read
enum Liveness {
    Alive,
    Hidden,
    Gone,
}

/// Apply an expose request on top of `rule` without touching the application
fn exposed(
    rule: Option<&ExposeRule>,
    unexpose: &[String],
    expose: Option<&BTreeMap<String, String>>,
) -> Result<Option<ExposeRule>, ClientError> {
    fn field<'a>(rule: &'a mut ExposeRule, name: &str) -> Result<&'a mut Option<String>, ClientError> {
        match name {
            EXPOSE_ENDPOINTS => Ok(&mut rule.endpoints),
            EXPOSE_SPACES => Ok(&mut rule.spaces),
            EXPOSE_CIDRS => Ok(&mut rule.cidrs),
            _ => Err(ClientError::Api(format!("unknown expose field {}", name))),
        }
    }

    let mut rule = rule.cloned();
    if unexpose.iter().any(|name| name == UNEXPOSE_ALL) {
        rule = None;
    } else if let Some(rule) = rule.as_mut() {
        for name in unexpose {
            *field(rule, name)? = None;
        }
    }
    if let Some(expose) = expose {
        let rule = rule.get_or_insert_with(ExposeRule::default);
        for (name, value) in expose {
            *field(rule, name)? = Some(value.clone());
        }
    }
    Ok(rule)
}

fn model_key(uuid: &str) -> String {
    format!("model:{}", uuid)
}

fn application_key(model_uuid: &str, name: &str) -> String {
    format!("application:{}:{}", model_uuid, name)
}

fn same_endpoints(a: &[Endpoint], b: &[Endpoint]) -> bool {
    a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

impl Controller {
    /// Record `operation` and pop the first failure injected for it
    fn check(&mut self, operation: &str, target: &str) -> Result<(), ClientError> {
        self.operations.push(format!("{} {}", operation, target));
        match self.failures.iter().position(|(op, _)| op == operation) {
            Some(index) => {
                let (_, err) = self.failures.remove(index);
                debug!(operation, target, error = %err, "injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn created(&mut self, key: String) {
        if self.visibility_delay > 0 {
            self.hidden.insert(key, self.visibility_delay);
        }
    }

    /// Mark an object as destroyed, returns true if it must be removed right away
    fn destroyed(&mut self, key: String) -> bool {
        if self.deletion_delay > 0 {
            self.dying.entry(key).or_insert(self.deletion_delay);
            false
        } else {
            true
        }
    }

    fn liveness(&mut self, key: &str) -> Liveness {
        if let Some(remaining) = self.hidden.get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Liveness::Hidden;
            }
            self.hidden.remove(key);
        }
        if let Some(remaining) = self.dying.get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Liveness::Alive;
            }
            self.dying.remove(key);
            return Liveness::Gone;
        }
        Liveness::Alive
    }

    fn model(&mut self, uuid: &str) -> Result<&mut ModelRecord, ClientError> {
        match self.liveness(&model_key(uuid)) {
            Liveness::Alive => (),
            Liveness::Hidden => return Err(ClientError::NotFound(format!("model {}", uuid))),
            Liveness::Gone => {
                self.models.remove(uuid);
            }
        }
        self.models
            .get_mut(uuid)
            .ok_or_else(|| ClientError::NotFound(format!("model {}", uuid)))
    }

    fn application(
        &mut self,
        model_uuid: &str,
        name: &str,
    ) -> Result<&mut ApplicationRecord, ClientError> {
        let key = (model_uuid.to_owned(), name.to_owned());
        match self.liveness(&application_key(model_uuid, name)) {
            Liveness::Alive => (),
            Liveness::Hidden => return Err(ClientError::NotFound(format!("application {}", name))),
            Liveness::Gone => {
                self.applications.remove(&key);
            }
        }
        self.applications
            .get_mut(&key)
            .ok_or_else(|| ClientError::NotFound(format!("application {}", name)))
    }

    fn model_exists(&self, uuid: &str) -> Result<(), ClientError> {
        if self.models.contains_key(uuid) {
            Ok(())
        } else {
            Err(ClientError::NotFound(format!("model {}", uuid)))
        }
    }
}

impl InMemoryController {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Controller> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a charm
    pub fn with_charm(self, name: &str, charm: CharmDefinition) -> Self {
        self.lock().charms.insert(name.to_owned(), charm);
        self
    }

    /// Add a controller-wide default to the configuration of every model
    pub fn with_model_default<V: Into<ConfigValue>>(self, key: &str, value: V) -> Self {
        self.lock()
            .model_defaults
            .insert(key.to_owned(), value.into());
        self
    }

    /// Make the next call to `operation` fail with `error`
    pub fn inject_failure(&self, operation: &str, error: ClientError) {
        self.lock().failures.push((operation.to_owned(), error));
    }

    /// Objects created from now on stay invisible for `reads` reads
    pub fn set_visibility_delay(&self, reads: u32) {
        self.lock().visibility_delay = reads;
    }

    /// Objects destroyed from now on stay visible for `reads` reads
    pub fn set_deletion_delay(&self, reads: u32) {
        self.lock().deletion_delay = reads;
    }

    /// Operations received so far, as `<operation> <target>`
    pub fn operations(&self) -> Vec<String> {
        self.lock().operations.clone()
    }

    /// Change a configuration key behind the provider's back
    pub fn set_application_config(&self, model_uuid: &str, name: &str, key: &str, value: &str) {
        let mut controller = self.lock();
        if let Some(app) = controller
            .applications
            .get_mut(&(model_uuid.to_owned(), name.to_owned()))
        {
            app.user_config.insert(key.to_owned(), value.to_owned());
        }
    }

    /// Remove an application behind the provider's back
    pub fn forget_application(&self, model_uuid: &str, name: &str) {
        self.lock()
            .applications
            .remove(&(model_uuid.to_owned(), name.to_owned()));
    }
}

#[async_trait]
impl JujuClient for InMemoryController {
    async fn resolve_model_uuid(&self, name: &str) -> Result<String, ClientError> {
        let mut controller = self.lock();
        controller.check("resolve_model_uuid", name)?;
        controller
            .models
            .values()
            .find(|model| model.info.name == name)
            .map(|model| model.info.uuid.clone())
            .ok_or_else(|| ClientError::NotFound(format!("model {}", name)))
    }

    async fn create_model(&self, request: CreateModelRequest) -> Result<ModelInfo, ClientError> {
        let mut controller = self.lock();
        let partial = match controller.check("create_model", &request.name) {
            Ok(()) => None,
            Err(ClientError::PartiallyCreated { reason, .. }) => Some(reason),
            Err(err) => return Err(err),
        };
        if controller
            .models
            .values()
            .any(|model| model.info.name == request.name)
        {
            return Err(ClientError::Api(format!(
                "model {} already exists",
                request.name
            )));
        }

        let info = ModelInfo {
            name: request.name,
            uuid: Uuid::new_v4().to_string(),
            cloud: request.cloud.unwrap_or_else(|| DEFAULT_CLOUD.to_owned()),
            region: request.region.unwrap_or_else(|| DEFAULT_REGION.to_owned()),
            constraints: request.constraints.unwrap_or_default(),
        };
        info!(name = info.name, uuid = info.uuid, "model created");
        controller.models.insert(
            info.uuid.clone(),
            ModelRecord {
                info: info.clone(),
                config: request.config,
            },
        );
        controller.created(model_key(&info.uuid));

        match partial {
            Some(reason) => Err(ClientError::PartiallyCreated {
                id: info.uuid,
                reason,
            }),
            None => Ok(info),
        }
    }

    async fn read_model(&self, uuid: &str) -> Result<ModelInfo, ClientError> {
        let mut controller = self.lock();
        controller.check("read_model", uuid)?;
        Ok(controller.model(uuid)?.info.clone())
    }

    async fn read_model_config(
        &self,
        uuid: &str,
    ) -> Result<BTreeMap<String, ConfigEntry>, ClientError> {
        let mut controller = self.lock();
        controller.check("read_model_config", uuid)?;
        let mut config = controller
            .model_defaults
            .iter()
            .map(|(key, value)| (key.clone(), ConfigEntry::new(value.clone(), true)))
            .collect::<BTreeMap<_, _>>();
        let model = controller.model(uuid)?;
        config.insert(
            "name".to_owned(),
            ConfigEntry::new(model.info.name.as_str(), false),
        );
        config.insert(
            "uuid".to_owned(),
            ConfigEntry::new(model.info.uuid.as_str(), false),
        );
        for (key, value) in &model.config {
            config.insert(key.clone(), ConfigEntry::new(value.as_str(), false));
        }
        Ok(config)
    }

    async fn update_model(&self, request: UpdateModelRequest) -> Result<(), ClientError> {
        let mut controller = self.lock();
        controller.check("update_model", &request.uuid)?;
        let model = controller.model(&request.uuid)?;
        for key in &request.config_to_unset {
            model.config.remove(key);
        }
        model.config.extend(request.config_to_set);
        if let Some(constraints) = request.constraints {
            model.info.constraints = constraints;
        }
        Ok(())
    }

    async fn destroy_model(&self, uuid: &str) -> Result<(), ClientError> {
        let mut controller = self.lock();
        controller.check("destroy_model", uuid)?;
        controller.model(uuid)?;
        if controller.destroyed(model_key(uuid)) {
            controller.models.remove(uuid);
        }
        controller
            .applications
            .retain(|(model_uuid, _), _| model_uuid != uuid);
        controller
            .integrations
            .retain(|integration| integration.model_uuid != uuid);
        controller.ssh_keys.remove(uuid);
        controller.access.remove(uuid);
        info!(uuid, "model destroyed");
        Ok(())
    }

    async fn create_application(
        &self,
        request: CreateApplicationRequest,
    ) -> Result<(), ClientError> {
        let mut controller = self.lock();
        let partial = match controller.check("create_application", &request.name) {
            Ok(()) => None,
            Err(ClientError::PartiallyCreated { reason, .. }) => Some(reason),
            Err(err) => return Err(err),
        };
        controller.model_exists(&request.model_uuid)?;
        let key = (request.model_uuid.clone(), request.name.clone());
        if controller.applications.contains_key(&key) {
            return Err(ClientError::Api(format!(
                "application {} already exists",
                request.name
            )));
        }

        let charm = controller
            .charms
            .get(&request.charm)
            .cloned()
            .unwrap_or_else(|| CharmDefinition {
                revision: 1,
                ..Default::default()
            });
        let mut endpoint_bindings = charm
            .endpoints
            .iter()
            .map(|endpoint| (endpoint.clone(), DEFAULT_SPACE.to_owned()))
            .collect::<BTreeMap<_, _>>();
        endpoint_bindings.insert(String::new(), DEFAULT_SPACE.to_owned());
        for (endpoint, space) in request.endpoint_bindings {
            if !space.is_empty() {
                endpoint_bindings.insert(endpoint, space);
            }
        }
        let units = if request.machines.is_empty() {
            request.units
        } else {
            request.machines.len() as i64
        };

        let info = ApplicationInfo {
            model_uuid: request.model_uuid.clone(),
            name: request.name.clone(),
            charm: CharmInfo {
                name: request.charm,
                channel: request
                    .channel
                    .unwrap_or_else(|| DEFAULT_CHANNEL.to_owned()),
                revision: request.revision.unwrap_or(charm.revision),
                base: request.base.unwrap_or_else(|| DEFAULT_BASE.to_owned()),
            },
            units,
            config: BTreeMap::new(),
            constraints: request.constraints.unwrap_or_default(),
            trust: request.trust,
            expose: request.expose,
            endpoint_bindings,
            machines: request.machines,
            storage: request.storage,
            resources: request.resources,
        };
        info!(
            model = request.model_uuid,
            name = request.name,
            charm = info.charm.name,
            "application deployed"
        );
        controller.applications.insert(
            key,
            ApplicationRecord {
                info,
                charm_config: charm.config,
                user_config: request.config,
            },
        );
        controller.created(application_key(&request.model_uuid, &request.name));

        match partial {
            Some(reason) => Err(ClientError::PartiallyCreated {
                id: format!("{}:{}", request.model_uuid, request.name),
                reason,
            }),
            None => Ok(()),
        }
    }

    async fn read_application(
        &self,
        model_uuid: &str,
        name: &str,
    ) -> Result<ApplicationInfo, ClientError> {
        let mut controller = self.lock();
        controller.check("read_application", name)?;
        let app = controller.application(model_uuid, name)?;
        Ok(ApplicationInfo {
            config: app.config(),
            ..app.info.clone()
        })
    }

    async fn refresh_charm(&self, request: RefreshCharmRequest) -> Result<(), ClientError> {
        let mut controller = self.lock();
        controller.check("refresh_charm", &request.name)?;
        let charm = controller
            .application(&request.model_uuid, &request.name)?
            .info
            .charm
            .name
            .clone();
        let charm_config = controller
            .charms
            .get(&charm)
            .map(|charm| charm.config.clone());
        let Some(app) = controller
            .applications
            .get_mut(&(request.model_uuid.clone(), request.name.clone()))
        else {
            return Err(ClientError::NotFound(format!("application {}", request.name)));
        };
        if let Some(channel) = request.channel {
            app.info.charm.channel = channel;
        }
        if let Some(revision) = request.revision {
            app.info.charm.revision = revision;
        }
        for (resource, revision) in request.resources {
            if revision == crate::delta::LATEST_REVISION {
                app.info.resources.remove(&resource);
            } else {
                app.info.resources.insert(resource, revision);
            }
        }
        if let Some(config) = charm_config {
            app.charm_config = config;
        }
        debug!(
            name = request.name,
            revision = app.info.charm.revision,
            "charm refreshed"
        );
        Ok(())
    }

    async fn update_application(
        &self,
        request: UpdateApplicationRequest,
    ) -> Result<(), ClientError> {
        let mut controller = self.lock();
        controller.check("update_application", &request.name)?;
        let app = controller.application(&request.model_uuid, &request.name)?;
        // rejected requests leave the application untouched
        let expose = exposed(
            app.info.expose.as_ref(),
            &request.unexpose,
            request.expose.as_ref(),
        )?;

        for key in &request.config_to_unset {
            app.user_config.remove(key);
        }
        app.user_config.extend(request.config_to_set);
        app.info.expose = expose;

        for (endpoint, space) in request.endpoint_bindings {
            let space = if space.is_empty() {
                DEFAULT_SPACE.to_owned()
            } else {
                space
            };
            app.info.endpoint_bindings.insert(endpoint, space);
        }

        for machine in request.machines_to_remove {
            app.info.machines.remove(&machine);
        }
        app.info.machines.extend(request.machines_to_add);
        if !app.info.machines.is_empty() {
            app.info.units = app.info.machines.len() as i64;
        } else if let Some(units) = request.units {
            app.info.units = units;
        }

        if let Some(constraints) = request.constraints {
            app.info.constraints = constraints;
        }
        if let Some(trust) = request.trust {
            app.info.trust = trust;
        }
        app.info.storage.extend(request.storage_to_add);
        Ok(())
    }

    async fn destroy_application(&self, model_uuid: &str, name: &str) -> Result<(), ClientError> {
        let mut controller = self.lock();
        controller.check("destroy_application", name)?;
        controller.application(model_uuid, name)?;
        if controller.destroyed(application_key(model_uuid, name)) {
            controller
                .applications
                .remove(&(model_uuid.to_owned(), name.to_owned()));
        }
        controller.integrations.retain(|integration| {
            integration.model_uuid != model_uuid
                || integration
                    .endpoints
                    .iter()
                    .all(|endpoint| endpoint.application != name)
        });
        info!(model = model_uuid, name, "application destroyed");
        Ok(())
    }

    async fn create_integration(
        &self,
        request: CreateIntegrationRequest,
    ) -> Result<IntegrationInfo, ClientError> {
        let mut controller = self.lock();
        let target = request
            .endpoints
            .iter()
            .map(|endpoint| format!("{}:{}", endpoint.application, endpoint.endpoint))
            .collect::<Vec<_>>()
            .join(",");
        controller.check("create_integration", &target)?;
        controller.model_exists(&request.model_uuid)?;
        if request.endpoints.len() != 2 {
            return Err(ClientError::Api(format!(
                "an integration needs two endpoints, got {}",
                request.endpoints.len()
            )));
        }
        for endpoint in &request.endpoints {
            controller.application(&request.model_uuid, &endpoint.application)?;
        }
        if controller.integrations.iter().any(|integration| {
            integration.model_uuid == request.model_uuid
                && same_endpoints(&integration.endpoints, &request.endpoints)
        }) {
            return Err(ClientError::Api(format!(
                "integration {} already exists",
                target
            )));
        }

        let info = IntegrationInfo {
            model_uuid: request.model_uuid,
            interface: request.endpoints[0].endpoint.clone(),
            endpoints: request.endpoints,
            via: request.via,
        };
        controller.integrations.push(info.clone());
        Ok(info)
    }

    async fn read_integration(
        &self,
        model_uuid: &str,
        endpoints: &[Endpoint],
    ) -> Result<IntegrationInfo, ClientError> {
        let mut controller = self.lock();
        controller.check("read_integration", model_uuid)?;
        controller
            .integrations
            .iter()
            .find(|integration| {
                integration.model_uuid == model_uuid
                    && same_endpoints(&integration.endpoints, endpoints)
            })
            .cloned()
            .ok_or_else(|| ClientError::NotFound("integration".to_owned()))
    }

    async fn destroy_integration(
        &self,
        model_uuid: &str,
        endpoints: &[Endpoint],
    ) -> Result<(), ClientError> {
        let mut controller = self.lock();
        controller.check("destroy_integration", model_uuid)?;
        let before = controller.integrations.len();
        controller.integrations.retain(|integration| {
            integration.model_uuid != model_uuid
                || !same_endpoints(&integration.endpoints, endpoints)
        });
        if controller.integrations.len() == before {
            return Err(ClientError::NotFound("integration".to_owned()));
        }
        Ok(())
    }

    async fn add_ssh_key(&self, model_uuid: &str, payload: &str) -> Result<(), ClientError> {
        let mut controller = self.lock();
        controller.check("add_ssh_key", model_uuid)?;
        controller.model_exists(model_uuid)?;
        let key = SshPublicKey::parse(payload)
            .ok_or_else(|| ClientError::Api("invalid ssh public key".to_owned()))?;
        let comment = key
            .comment
            .ok_or_else(|| ClientError::Api("ssh public key has no comment".to_owned()))?;
        let keys = controller.ssh_keys.entry(model_uuid.to_owned()).or_default();
        if keys.contains_key(comment) {
            return Err(ClientError::Api(format!(
                "ssh key {} already exists",
                comment
            )));
        }
        keys.insert(
            comment.to_owned(),
            format!("{} {}", key.canonical(), comment),
        );
        Ok(())
    }

    async fn read_ssh_key(&self, model_uuid: &str, comment: &str) -> Result<String, ClientError> {
        let mut controller = self.lock();
        controller.check("read_ssh_key", comment)?;
        controller
            .ssh_keys
            .get(model_uuid)
            .and_then(|keys| keys.get(comment))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("ssh key {}", comment)))
    }

    async fn remove_ssh_key(&self, model_uuid: &str, comment: &str) -> Result<(), ClientError> {
        let mut controller = self.lock();
        controller.check("remove_ssh_key", comment)?;
        controller
            .ssh_keys
            .get_mut(model_uuid)
            .and_then(|keys| keys.remove(comment))
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(format!("ssh key {}", comment)))
    }

    async fn read_model_access(
        &self,
        model_uuid: &str,
    ) -> Result<BTreeMap<String, String>, ClientError> {
        let mut controller = self.lock();
        controller.check("read_model_access", model_uuid)?;
        controller.model_exists(model_uuid)?;
        Ok(controller
            .access
            .get(model_uuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn grant_model_access(
        &self,
        model_uuid: &str,
        access: &str,
        users: &[String],
    ) -> Result<(), ClientError> {
        let mut controller = self.lock();
        controller.check("grant_model_access", &users.join(","))?;
        controller.model_exists(model_uuid)?;
        let grants = controller.access.entry(model_uuid.to_owned()).or_default();
        for user in users {
            grants.insert(user.clone(), access.to_owned());
        }
        Ok(())
    }

    async fn revoke_model_access(
        &self,
        model_uuid: &str,
        access: &str,
        users: &[String],
    ) -> Result<(), ClientError> {
        let mut controller = self.lock();
        controller.check("revoke_model_access", &users.join(","))?;
        controller.model_exists(model_uuid)?;
        if let Some(grants) = controller.access.get_mut(model_uuid) {
            grants.retain(|user, granted| !(users.contains(user) && *granted == access));
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for InMemoryController {
    async fn connect(&self, config: &ControllerConfig) -> anyhow::Result<Arc<dyn JujuClient>> {
        info!(addresses = ?config.addresses, "connected to in-memory controller");
        Ok(Arc::new(self.clone()))
    }
}
