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

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    attribute_path::AttributePath,
    client::ClientError,
    diagnostics::Diagnostics,
    value::{Value, ValueMap, ValueSet, ValueString},
};

/// Turn a tuple of options into an option of tuple
pub(crate) trait OptionFactor {
    type Output;
    fn factor(self) -> Self::Output;
}

macro_rules! impl_factor {
    ($($e:ident)+) => {
        impl<$($e),+> OptionFactor for ($(Option<$e>,)+) {
            type Output = Option<($($e,)+)>;
            #[allow(non_snake_case)]
            fn factor(self) -> Self::Output {
                let ($($e,)+) = self;
                Some(($($e?,)+))
            }
        }
    };
}

impl_factor!(A B);
impl_factor!(A B C);

/// Report a failed controller call as a diagnostic
pub(crate) trait ExtractDiagnostics {
    type Output;
    fn extract_diagnostics(
        self,
        diags: &mut Diagnostics,
        summary: &'static str,
        attr_path: AttributePath,
    ) -> Self::Output;
}

impl<T> ExtractDiagnostics for Result<T, ClientError> {
    type Output = Option<T>;
    fn extract_diagnostics(
        self,
        diags: &mut Diagnostics,
        summary: &'static str,
        attr_path: AttributePath,
    ) -> Self::Output {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                diags.client_error(summary, &err, attr_path);
                None
            }
        }
    }
}

/// View a map attribute as the `key -> optional string` map used by the config diff
pub(crate) fn config_entries(map: &ValueMap<ValueString>) -> BTreeMap<String, ValueString> {
    map.as_ref_option().cloned().unwrap_or_default()
}

/// Known elements of a set attribute of strings
pub(crate) fn string_set(set: &ValueSet<ValueString>) -> BTreeSet<String> {
    set.iter()
        .flatten()
        .filter_map(|element| element.as_ref_option().cloned())
        .collect()
}

/// Map attribute from a list of owned strings
pub(crate) fn string_map<I>(entries: I) -> ValueMap<ValueString>
where
    I: IntoIterator<Item = (String, String)>,
{
    Value::Value(
        entries
            .into_iter()
            .map(|(k, v)| (k, Value::Value(v)))
            .collect(),
    )
}
