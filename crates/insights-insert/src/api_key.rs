// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;
use std::sync::{Arc, OnceLock};

pub type ApiKeyResolverFn = Arc<dyn Fn() -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub enum ApiKeyFactory {
    Static(String),
    Dynamic {
        resolver_fn: ApiKeyResolverFn,
        api_key: Arc<OnceLock<Option<String>>>,
    },
}

impl ApiKeyFactory {
    pub fn new_from_resolver(resolver_fn: ApiKeyResolverFn) -> Self {
        Self::Dynamic {
            resolver_fn,
            api_key: Arc::new(OnceLock::new()),
        }
    }

    pub fn new_from_static_key(api_key: &str) -> Self {
        Self::Static(api_key.to_string())
    }

    /// Returns the insert key, resolving it on first use.
    ///
    /// The resolver runs at most once; a failed resolution is remembered.
    pub fn get_api_key(&self) -> Option<&str> {
        match self {
            Self::Static(api_key) => Some(api_key),
            Self::Dynamic {
                resolver_fn,
                api_key,
            } => api_key.get_or_init(|| (resolver_fn)()).as_deref(),
        }
    }
}

impl Debug for ApiKeyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKeyFactory")
    }
}
