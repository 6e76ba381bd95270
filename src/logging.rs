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

use std::{env, fs::File, sync::Mutex};

/// Send the traces of the provider to the file named by `PLUGIN_LOG_FILE`
///
/// Terraform owns stdout and stderr of the plugin, so nothing is logged when the
/// variable is not set. Set `PLUGIN_LOG_FORMAT=json` for structured output.
/// Only the first successful call installs a subscriber.
pub fn init_from_env() -> anyhow::Result<()> {
    let Ok(path) = env::var("PLUGIN_LOG_FILE") else {
        return Ok(());
    };
    let log_file = File::options().create(true).append(true).open(path)?;
    let builder = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file));

    // A subscriber may already be installed by the host or a previous call
    let installed = match env::var("PLUGIN_LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().try_init(),
        _ => builder.try_init(),
    };
    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }
    Ok(())
}
