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

use serde::{Deserialize, Serialize};

use crate::{
    attribute_path::AttributePath,
    diagnostics::Diagnostics,
    value::{Value, ValueMap, ValueString},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct State {
    /// UUID of the model
    pub id: ValueString,
    pub name: ValueString,
    pub cloud: ValueString,
    pub region: ValueString,
    /// Model configuration, a null entry unsets the key
    pub config: ValueMap<ValueString>,
    pub constraints: ValueString,
}

impl State {
    pub(super) fn validate(&self, diags: &mut Diagnostics) {
        match &self.name {
            Value::Value(name) if name.is_empty() => {
                diags.error_short("`name` cannot be empty", AttributePath::new("name"))
            }
            Value::Null => diags.error_short("`name` is required", AttributePath::new("name")),
            _ => (),
        }
        for key in self.config.iter().flat_map(|config| config.keys()) {
            if key.is_empty() {
                diags.error_short(
                    "Configuration keys cannot be empty",
                    AttributePath::new("config"),
                );
            }
        }
    }
}
