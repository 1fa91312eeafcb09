//! Remote-file strategy: both texts are downloaded once per session.

use async_trait::async_trait;
use dermachat_core::context::{ContextSource, PatientContext, ResolvedContext};
use tracing::{debug, warn};

/// Fetches the intake form and the treatment from two URLs.
///
/// A failed fetch never aborts the session. Each field is resolved on its own:
/// a `200` body is used verbatim, anything else resolves that field to the
/// empty string and attaches a warning.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    formulario_url: String,
    tratamiento_url: String,
    client: reqwest::Client,
}

impl RemoteSource {
    pub fn new(
        formulario_url: impl Into<String>,
        tratamiento_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            formulario_url: formulario_url.into(),
            tratamiento_url: tratamiento_url.into(),
            client,
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, String> {
        if url.is_empty() {
            return Err("URL not configured".into());
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        response.text().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl ContextSource for RemoteSource {
    fn name(&self) -> &str {
        "remote"
    }

    async fn resolve(&self) -> ResolvedContext {
        let (formulario, tratamiento) = tokio::join!(
            self.fetch(&self.formulario_url),
            self.fetch(&self.tratamiento_url)
        );

        let mut warnings = Vec::new();
        let mut settle = |name: &str, url: &str, fetched: Result<String, String>| match fetched {
            Ok(body) => body,
            Err(e) => {
                warn!(field = name, url = %url, error = %e, "Failed to download patient context");
                warnings.push(format!("No se pudo descargar el {name}: {e}"));
                String::new()
            }
        };
        let formulario = settle("formulario", &self.formulario_url, formulario);
        let tratamiento = settle("tratamiento", &self.tratamiento_url, tratamiento);

        debug!(
            formulario_chars = formulario.len(),
            tratamiento_chars = tratamiento.len(),
            failures = warnings.len(),
            "Patient context downloaded"
        );
        ResolvedContext {
            context: PatientContext::new(formulario, tratamiento),
            warnings,
        }
    }
}
