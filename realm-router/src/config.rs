/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! JSON5 router configuration.

use crate::data_plane::local_peer::DEFAULT_OUT_QUEUE_SIZE;
use crate::observability::events;
use crate::routing::uri::Uri;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::error;

const COMPONENT: &str = "config";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    pub realms: Vec<RealmConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RealmConfig {
    pub uri: Uri,
    /// Bound of each session's router → session queue.
    #[serde(default = "default_outbound_queue_size")]
    pub outbound_queue_size: usize,
}

fn default_outbound_queue_size() -> usize {
    DEFAULT_OUT_QUEUE_SIZE
}

impl RealmConfig {
    pub fn new(uri: impl Into<Uri>) -> Self {
        Self {
            uri: uri.into(),
            outbound_queue_size: DEFAULT_OUT_QUEUE_SIZE,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(json5::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "unable to read configuration: {err}"),
            ConfigError::Parse(err) => write!(f, "unable to parse configuration: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
        }
    }
}

impl RouterConfig {
    pub fn from_json5(contents: &str) -> Result<Self, ConfigError> {
        json5::from_str(contents).map_err(|err| {
            error!(
                event = events::CONFIG_LOAD_FAILED,
                component = COMPONENT,
                err = %err,
                "unable to parse configuration"
            );
            ConfigError::Parse(err)
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            error!(
                event = events::CONFIG_LOAD_FAILED,
                component = COMPONENT,
                path = %path.display(),
                err = %err,
                "unable to read configuration file"
            );
            ConfigError::Io(err)
        })?;
        Self::from_json5(&contents)
    }
}
