//! Patient context: the intake form and the prescribed treatment.
//!
//! Resolved once when a session starts and never changed afterwards.
//! Where the text comes from (query string, fixed test values, remote files)
//! is a [`ContextSource`] strategy chosen by configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Substituted when no intake form was supplied.
pub const FORMULARIO_PLACEHOLDER: &str = "No se ha proporcionado formulario.";

/// Substituted when no treatment was supplied.
pub const TRATAMIENTO_PLACEHOLDER: &str = "No se ha proporcionado tratamiento.";

/// The two text blobs describing the patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContext {
    /// Patient intake form.
    pub formulario: String,
    /// Treatment generated for the patient.
    pub tratamiento: String,
}

impl PatientContext {
    pub fn new(formulario: impl Into<String>, tratamiento: impl Into<String>) -> Self {
        Self {
            formulario: formulario.into(),
            tratamiento: tratamiento.into(),
        }
    }

    /// Build a context from optional values, filling absent ones with the
    /// placeholder sentinels.
    pub fn or_placeholders(formulario: Option<String>, tratamiento: Option<String>) -> Self {
        Self {
            formulario: formulario.unwrap_or_else(|| FORMULARIO_PLACEHOLDER.to_string()),
            tratamiento: tratamiento.unwrap_or_else(|| TRATAMIENTO_PLACEHOLDER.to_string()),
        }
    }
}

impl Default for PatientContext {
    fn default() -> Self {
        Self::or_placeholders(None, None)
    }
}

/// A resolved context together with any warnings raised while resolving it.
///
/// Resolution never fails: degraded sources fall back to default text and
/// report what happened here so the shell can show it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedContext {
    pub context: PatientContext,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ResolvedContext {
    pub fn new(context: PatientContext) -> Self {
        Self {
            context,
            warnings: Vec::new(),
        }
    }
}

/// Produces the patient context for a session.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Short strategy name for logs ("query", "static", "remote").
    fn name(&self) -> &str;

    /// Resolve both text blobs. Called exactly once per session.
    async fn resolve(&self) -> ResolvedContext;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_fill_missing_fields() {
        let ctx = PatientContext::or_placeholders(Some("leve".into()), None);
        assert_eq!(ctx.formulario, "leve");
        assert_eq!(ctx.tratamiento, TRATAMIENTO_PLACEHOLDER);
    }

    #[test]
    fn default_is_both_placeholders() {
        let ctx = PatientContext::default();
        assert_eq!(ctx.formulario, FORMULARIO_PLACEHOLDER);
        assert_eq!(ctx.tratamiento, TRATAMIENTO_PLACEHOLDER);
    }

    #[test]
    fn warnings_omitted_when_empty() {
        let json = serde_json::to_string(&ResolvedContext::default()).unwrap();
        assert!(!json.contains("warnings"));
    }
}
