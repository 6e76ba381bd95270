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

use std::{borrow::Cow, fmt::Display};

use crate::{attribute_path::AttributePath, client::ClientError};

/// Errors and warnings reported back to Terraform
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Add an error
    pub fn error<S: Into<Cow<'static, str>>, D: Into<Cow<'static, str>>>(
        &mut self,
        summary: S,
        detail: D,
        attribute: AttributePath,
    ) {
        self.errors.push(Diagnostic::new(summary, detail, attribute))
    }
    /// Add an error on the whole resource
    pub fn root_error<S: Into<Cow<'static, str>>, D: Into<Cow<'static, str>>>(
        &mut self,
        summary: S,
        detail: D,
    ) {
        self.error(summary, detail, AttributePath::default())
    }
    /// Add an error without details
    pub fn error_short<S: Into<Cow<'static, str>>>(&mut self, summary: S, attribute: AttributePath) {
        self.error(summary, "", attribute)
    }
    /// Add an error on the whole resource, without details
    pub fn root_error_short<S: Into<Cow<'static, str>>>(&mut self, summary: S) {
        self.error(summary, "", AttributePath::default())
    }
    /// Add the error returned by the controller
    ///
    /// Transient failures are flagged so that the user knows that applying again may succeed.
    pub fn client_error(
        &mut self,
        summary: &'static str,
        err: &ClientError,
        attribute: AttributePath,
    ) {
        let detail = if err.is_retryable() {
            format!("{} (the controller may be temporarily unreachable)", err)
        } else {
            err.to_string()
        };
        self.error(summary, detail, attribute)
    }

    /// Add a warning on the whole resource
    pub fn root_warning<S: Into<Cow<'static, str>>, D: Into<Cow<'static, str>>>(
        &mut self,
        summary: S,
        detail: D,
    ) {
        self.warnings
            .push(Diagnostic::new(summary, detail, AttributePath::default()))
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// [`None`] iff an error has been recorded
    pub fn status(&self) -> Option<()> {
        if self.has_errors() {
            None
        } else {
            Some(())
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Diagnostic {
    pub summary: Cow<'static, str>,
    pub detail: Cow<'static, str>,
    pub attribute: AttributePath,
}

impl Diagnostic {
    pub fn new<S: Into<Cow<'static, str>>, D: Into<Cow<'static, str>>>(
        summary: S,
        detail: D,
        attribute: AttributePath,
    ) -> Self {
        Self {
            summary: summary.into(),
            detail: detail.into(),
            attribute,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary)?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        if !self.attribute.steps.is_empty() {
            write!(f, " (at {})", self.attribute)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_errors() {
        let mut diags = Diagnostics::default();
        diags.root_warning("Deprecated attribute", "use `model_uuid`");
        assert_eq!(diags.status(), Some(()));
        diags.error_short("`name` is required", AttributePath::new("name"));
        assert_eq!(diags.status(), None);
        assert_eq!(diags.errors[0].to_string(), "`name` is required (at name)");
    }

    #[test]
    fn transient_client_errors_are_flagged() {
        let mut diags = Diagnostics::default();
        diags.client_error(
            "Failed to read the model",
            &ClientError::Connection("connection refused".into()),
            AttributePath::default(),
        );
        diags.client_error(
            "Failed to read the model",
            &ClientError::Api("permission denied".into()),
            AttributePath::default(),
        );
        assert!(diags.errors[0].detail.contains("temporarily unreachable"));
        assert!(!diags.errors[1].detail.contains("temporarily unreachable"));
    }
}
