//! Fixed-value strategy for testing without a host page.

use async_trait::async_trait;
use dermachat_config::FixedContextConfig;
use dermachat_core::context::{ContextSource, PatientContext, ResolvedContext};

use super::query::QueryParamSource;
use super::{FORMULARIO_PARAM, TRATAMIENTO_PARAM};

/// Always resolves to the same configured values, ignoring caller input.
#[derive(Debug, Clone)]
pub struct StaticSource {
    inner: QueryParamSource,
}

impl StaticSource {
    /// Values in `[context.fixed]` are percent-encoded, exactly as they
    /// would appear in the page URL.
    pub fn from_config(fixed: &FixedContextConfig) -> Self {
        let pairs = [
            (FORMULARIO_PARAM, &fixed.formulario),
            (TRATAMIENTO_PARAM, &fixed.tratamiento),
        ];
        let query = pairs
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}={v}")))
            .collect::<Vec<_>>()
            .join("&");
        Self {
            inner: QueryParamSource::from_query(&query),
        }
    }

    pub fn context(&self) -> PatientContext {
        self.inner.context()
    }
}

#[async_trait]
impl ContextSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn resolve(&self) -> ResolvedContext {
        ResolvedContext::new(self.context())
    }
}
