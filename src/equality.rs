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

//! Semantic equality of attribute values
//!
//! When two values are semantically equal, the plan keeps the stored value and no
//! update is sent, even though the literal strings differ.

use russh_keys::{key::PublicKey, parse_public_key_base64, PublicKeyBase64};

/// Compare two comma-separated lists regardless of the order of their elements
///
/// Duplicates are significant: `"a,a,b"` and `"a,b,b"` are different.
pub fn comma_list_equals(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let mut a = a.split(',').collect::<Vec<_>>();
    let mut b = b.split(',').collect::<Vec<_>>();
    if a.len() != b.len() {
        return false;
    }
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// Public key in the `authorized_keys` format
pub(crate) struct SshPublicKey<'a> {
    pub key_type: &'a str,
    pub key: PublicKey,
    pub comment: Option<&'a str>,
}

impl<'a> SshPublicKey<'a> {
    /// Parse `<type> <base64 blob> [comment]`
    pub fn parse(key: &'a str) -> Option<Self> {
        let mut fields = key.trim().splitn(3, char::is_whitespace);
        let key_type = fields.next().filter(|t| !t.is_empty())?;
        let key = parse_public_key_base64(fields.next()?).ok()?;
        let comment = fields.next().map(str::trim).filter(|c| !c.is_empty());
        Some(Self {
            key_type,
            key,
            comment,
        })
    }

    /// Key without its comment
    pub fn canonical(&self) -> String {
        format!("{} {}", self.key_type, self.key.public_key_base64())
    }
}

/// Compare two public keys ignoring their comment
///
/// A key that cannot be parsed is never equal to anything.
pub fn ssh_key_equals(a: &str, b: &str) -> bool {
    match (SshPublicKey::parse(a), SshPublicKey::parse(b)) {
        (Some(a), Some(b)) => a.canonical() == b.canonical(),
        _ => false,
    }
}
