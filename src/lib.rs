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

//! Terraform provider for Juju
//!
//! The provider reconciles Juju models, applications, integrations, SSH keys and model access
//! with the configuration declared in Terraform or OpenTofu.
//!
//! The reconciliation primitives are pure functions:
//! - [`config_diff`] computes configuration diffs with null/absent/default semantics,
//! - [`delta`] computes add/remove deltas for multi-valued blocks,
//! - [`equality`] suppresses diffs caused only by reordering or comments,
//! - [`upgrade`] migrates persisted state across schema versions.
//!
//! The resources in [`application`], [`model`], [`integration`], [`ssh_key`] and [`access_model`]
//! drive those primitives against a [`JujuClient`] injected through the [`JujuProvider`].

mod attribute_path;
mod diagnostics;
mod logging;
mod raw;
mod resource;
mod utils;

pub mod access_model;
pub mod application;
pub mod client;
pub mod config_diff;
pub mod delta;
pub mod equality;
pub mod integration;
pub mod model;
pub mod provider;
pub mod ssh_key;
pub mod upgrade;
pub mod value;

pub use attribute_path::{AttributePath, AttributePathStep};
pub use client::{ClientError, JujuClient};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use logging::init_from_env as init_logging;
pub use provider::{Connector, ControllerConfig, JujuProvider, ProviderConfig};
pub use raw::RawValue;
pub use resource::{DynamicResource, Resource};

#[macro_export]
/// Build a hash map
///
/// # Examples
///
/// ```
/// # use terraform_provider_juju::map;
/// # use std::collections::HashMap;
/// let m: HashMap<String, String> = map!{
///     "key1" => "value1",
///     "key2" => "value2",
/// };
/// ```
///
/// # Remarks
///
/// Keys and Values are converted with [`Into::into`] to build the map.
/// Because of that, type annotations are usually required.
macro_rules! map {
    {$($key:expr => $value:expr),*} => {
        {
            let mut map = std::collections::HashMap::default();
            $(
                map.insert($key.into(), $value.into());
            )*
            map
        }
    };

    {$($key:expr => $value:expr),+ ,} => { map!{$($key => $value),+} };
}
