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

use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::metrics::MessageMetrics;
use crate::realm::Realm;
use crate::routing::uri::Uri;
use std::collections::HashMap;
use std::sync::Arc;

/// The set of realms configured for this process.
pub struct Router {
    realms: HashMap<Uri, Realm>,
}

impl Router {
    /// Starts one realm per configured entry.
    ///
    /// Realm URIs must be valid and unique.
    pub fn from_config(config: &RouterConfig) -> Result<Self, RouterError> {
        Self::build(config, None)
    }

    /// Like [`Router::from_config`], reporting traffic of every realm to `metrics`.
    pub fn from_config_with_metrics(
        config: &RouterConfig,
        metrics: Arc<dyn MessageMetrics>,
    ) -> Result<Self, RouterError> {
        Self::build(config, Some(metrics))
    }

    fn build(
        config: &RouterConfig,
        metrics: Option<Arc<dyn MessageMetrics>>,
    ) -> Result<Self, RouterError> {
        let mut realms = HashMap::new();
        for realm_config in &config.realms {
            if !realm_config.uri.is_valid(false) {
                return Err(RouterError::InvalidArgument(format!(
                    "invalid realm uri `{}`",
                    realm_config.uri
                )));
            }
            if realms.contains_key(&realm_config.uri) {
                return Err(RouterError::DuplicateRealm(realm_config.uri.clone()));
            }

            let realm = match metrics.as_ref() {
                Some(metrics) => Realm::with_metrics(realm_config.clone(), metrics.clone())?,
                None => Realm::new(realm_config.clone())?,
            };
            realms.insert(realm_config.uri.clone(), realm);
        }
        Ok(Self { realms })
    }

    pub fn realm(&self, uri: &Uri) -> Result<&Realm, RouterError> {
        self.realms
            .get(uri)
            .ok_or_else(|| RouterError::NoSuchRealm(uri.clone()))
    }

    pub fn realm_uris(&self) -> impl Iterator<Item = &Uri> {
        self.realms.keys()
    }
}
