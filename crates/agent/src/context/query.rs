//! Query-parameter strategy.

use async_trait::async_trait;
use dermachat_core::context::{ContextSource, PatientContext, ResolvedContext};
use tracing::debug;
use url::form_urlencoded;

use super::{FORMULARIO_PARAM, TRATAMIENTO_PARAM};

/// Patient context carried in the page URL.
///
/// Values are form-decoded; a missing or empty parameter resolves to its
/// placeholder sentinel.
#[derive(Debug, Clone, Default)]
pub struct QueryParamSource {
    formulario: Option<String>,
    tratamiento: Option<String>,
}

impl QueryParamSource {
    /// Parse a raw (still encoded) query string such as
    /// `formulario=psoriasis%20leve&tratamiento=...`. A leading `?` is allowed.
    /// The first occurrence of each key wins.
    pub fn from_query(raw: &str) -> Self {
        let mut source = Self::default();
        let raw = raw.strip_prefix('?').unwrap_or(raw);

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            let slot = match key.as_ref() {
                FORMULARIO_PARAM => &mut source.formulario,
                TRATAMIENTO_PARAM => &mut source.tratamiento,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        source
    }

    /// Decoded values with the gaps filled by placeholders.
    pub fn context(&self) -> PatientContext {
        let present = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        PatientContext::or_placeholders(present(&self.formulario), present(&self.tratamiento))
    }
}

#[async_trait]
impl ContextSource for QueryParamSource {
    fn name(&self) -> &str {
        "query"
    }

    async fn resolve(&self) -> ResolvedContext {
        let context = self.context();
        debug!(
            formulario_chars = context.formulario.len(),
            tratamiento_chars = context.tratamiento.len(),
            "Patient context resolved from query string"
        );
        ResolvedContext::new(context)
    }
}
