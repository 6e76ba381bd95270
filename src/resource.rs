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

use crate::attribute_path::AttributePath;
use crate::diagnostics::Diagnostics;
use crate::raw::RawValue;
use crate::utils::OptionFactor;
use crate::value::Value;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Trait for implementing a resource
///
/// Every method returns [`None`] iff an error has been reported in `diags`, except
/// [`Resource::create`] which may return a partial state alongside an error.
#[async_trait]
pub trait Resource: Send + Sync {
    /// State of the resource
    type State: Serialize + DeserializeOwned + Send;

    /// Version of the schema of the state
    fn schema_version(&self) -> i64;
    /// Validate the configuration of the resource
    async fn validate(&self, diags: &mut Diagnostics, config: Self::State) -> Option<()> {
        _ = diags;
        _ = config;
        Some(())
    }
    /// Read the new state of the resource, [`Value::Null`] if it does not exist anymore
    async fn read(
        &self,
        diags: &mut Diagnostics,
        state: Self::State,
    ) -> Option<Value<Self::State>>;
    /// Plan the creation of a new resource
    async fn plan_create(
        &self,
        diags: &mut Diagnostics,
        proposed_state: Self::State,
        config_state: Self::State,
    ) -> Option<Self::State>;
    /// Plan the changes on the resource, along with the attributes forcing a replacement
    async fn plan_update(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State,
        proposed_state: Self::State,
        config_state: Self::State,
    ) -> Option<(Self::State, Vec<AttributePath>)>;
    /// Create a new resource
    async fn create(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State,
        config_state: Self::State,
    ) -> Option<Self::State>;
    /// Apply the changes on the resource
    async fn update(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State,
        planned_state: Self::State,
        config_state: Self::State,
    ) -> Option<Self::State>;
    /// Destroy the resource
    async fn destroy(&self, diags: &mut Diagnostics, prior_state: Self::State) -> Option<()>;
    /// Import an existing resource
    async fn import(&self, diags: &mut Diagnostics, id: String) -> Option<Self::State> {
        _ = id;
        diags.root_error_short("Import is not supported");
        None
    }
    /// Upgrade a state written with an older schema `version`
    async fn upgrade(
        &self,
        diags: &mut Diagnostics,
        version: i64,
        prior_state: RawValue,
    ) -> Option<Self::State> {
        _ = version;
        _ = prior_state;
        diags.root_error_short("Upgrade is not supported");
        None
    }
}

/// [`Resource`] working on encoded values
#[async_trait]
pub trait DynamicResource: Send + Sync {
    /// Version of the schema of the state
    fn schema_version(&self) -> i64;
    /// Validate the configuration of the resource
    async fn validate(&self, diags: &mut Diagnostics, config: RawValue) -> Option<()>;
    /// Read the new state of the resource
    async fn read(&self, diags: &mut Diagnostics, state: RawValue) -> Option<RawValue>;
    /// Plan the creation of a new resource
    async fn plan_create(
        &self,
        diags: &mut Diagnostics,
        proposed_state: RawValue,
        config_state: RawValue,
    ) -> Option<RawValue>;
    /// Plan the changes on the resource
    async fn plan_update(
        &self,
        diags: &mut Diagnostics,
        prior_state: RawValue,
        proposed_state: RawValue,
        config_state: RawValue,
    ) -> Option<(RawValue, Vec<AttributePath>)>;
    /// Create a new resource
    async fn create(
        &self,
        diags: &mut Diagnostics,
        planned_state: RawValue,
        config_state: RawValue,
    ) -> Option<RawValue>;
    /// Apply the changes on the resource
    async fn update(
        &self,
        diags: &mut Diagnostics,
        prior_state: RawValue,
        planned_state: RawValue,
        config_state: RawValue,
    ) -> Option<RawValue>;
    /// Destroy the resource
    async fn destroy(&self, diags: &mut Diagnostics, prior_state: RawValue) -> Option<()>;
    /// Import an existing resource
    async fn import(&self, diags: &mut Diagnostics, id: String) -> Option<RawValue>;
    /// Upgrade the resource
    async fn upgrade(
        &self,
        diags: &mut Diagnostics,
        version: i64,
        prior_state: RawValue,
    ) -> Option<RawValue>;
}

#[async_trait]
impl<T: Resource> DynamicResource for T {
    fn schema_version(&self) -> i64 {
        <T as Resource>::schema_version(self)
    }
    async fn validate(&self, diags: &mut Diagnostics, config: RawValue) -> Option<()> {
        let config = config.deserialize(diags)?;
        <T as Resource>::validate(self, diags, config).await
    }
    async fn read(&self, diags: &mut Diagnostics, state: RawValue) -> Option<RawValue> {
        let state = state.deserialize(diags)?;
        let state = <T as Resource>::read(self, diags, state).await?;
        RawValue::serialize(diags, &state)
    }
    async fn plan_create(
        &self,
        diags: &mut Diagnostics,
        proposed_state: RawValue,
        config_state: RawValue,
    ) -> Option<RawValue> {
        let (proposed_state, config_state) = (
            proposed_state.deserialize(diags),
            config_state.deserialize(diags),
        )
            .factor()?;
        let state = <T as Resource>::plan_create(self, diags, proposed_state, config_state).await?;
        RawValue::serialize(diags, &state)
    }
    async fn plan_update(
        &self,
        diags: &mut Diagnostics,
        prior_state: RawValue,
        proposed_state: RawValue,
        config_state: RawValue,
    ) -> Option<(RawValue, Vec<AttributePath>)> {
        let (prior_state, proposed_state, config_state) = (
            prior_state.deserialize(diags),
            proposed_state.deserialize(diags),
            config_state.deserialize(diags),
        )
            .factor()?;
        let (state, trigger_replace) =
            <T as Resource>::plan_update(self, diags, prior_state, proposed_state, config_state)
                .await?;
        (RawValue::serialize(diags, &state), Some(trigger_replace)).factor()
    }
    async fn create(
        &self,
        diags: &mut Diagnostics,
        planned_state: RawValue,
        config_state: RawValue,
    ) -> Option<RawValue> {
        let (planned_state, config_state) = (
            planned_state.deserialize(diags),
            config_state.deserialize(diags),
        )
            .factor()?;
        let state = <T as Resource>::create(self, diags, planned_state, config_state).await?;
        RawValue::serialize(diags, &state)
    }
    async fn update(
        &self,
        diags: &mut Diagnostics,
        prior_state: RawValue,
        planned_state: RawValue,
        config_state: RawValue,
    ) -> Option<RawValue> {
        let (prior_state, planned_state, config_state) = (
            prior_state.deserialize(diags),
            planned_state.deserialize(diags),
            config_state.deserialize(diags),
        )
            .factor()?;
        let state =
            <T as Resource>::update(self, diags, prior_state, planned_state, config_state).await?;
        RawValue::serialize(diags, &state)
    }
    async fn destroy(&self, diags: &mut Diagnostics, prior_state: RawValue) -> Option<()> {
        let prior_state = prior_state.deserialize(diags)?;
        <T as Resource>::destroy(self, diags, prior_state).await
    }
    async fn import(&self, diags: &mut Diagnostics, id: String) -> Option<RawValue> {
        let state = <T as Resource>::import(self, diags, id).await?;
        RawValue::serialize(diags, &state)
    }
    async fn upgrade(
        &self,
        diags: &mut Diagnostics,
        version: i64,
        prior_state: RawValue,
    ) -> Option<RawValue> {
        let state = <T as Resource>::upgrade(self, diags, version, prior_state).await?;
        RawValue::serialize(diags, &state)
    }
}

impl<T: Resource + 'static> From<T> for Box<dyn DynamicResource> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}
