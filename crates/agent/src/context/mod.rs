//! Patient context resolution strategies.
//!
//! Three interchangeable [`ContextSource`] implementations:
//!
//! - [`QueryParamSource`] reads `formulario` / `tratamiento` from a raw query string
//! - [`StaticSource`] uses fixed percent-encoded values from configuration
//! - [`RemoteSource`] downloads both texts from configured URLs
//!
//! [`source_for`] picks one according to `[context] source`.

pub mod query;
pub mod remote;
pub mod static_source;

pub use query::QueryParamSource;
pub use remote::RemoteSource;
pub use static_source::StaticSource;

use dermachat_config::{AppConfig, ContextSourceKind};
use dermachat_core::context::ContextSource;

/// Query-string key for the intake form.
pub const FORMULARIO_PARAM: &str = "formulario";
/// Query-string key for the treatment.
pub const TRATAMIENTO_PARAM: &str = "tratamiento";

/// Build the configured strategy.
///
/// `raw_query` is the incoming request's query string and only matters to
/// the query strategy; the others ignore caller input.
pub fn source_for(
    config: &AppConfig,
    raw_query: Option<&str>,
    client: reqwest::Client,
) -> Box<dyn ContextSource> {
    match config.context.source {
        ContextSourceKind::Query => Box::new(QueryParamSource::from_query(raw_query.unwrap_or(""))),
        ContextSourceKind::Static => Box::new(StaticSource::from_config(&config.context.fixed)),
        ContextSourceKind::Remote => Box::new(RemoteSource::new(
            config.context.formulario_url.clone().unwrap_or_default(),
            config.context.tratamiento_url.clone().unwrap_or_default(),
            client,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dermachat_core::context::TRATAMIENTO_PLACEHOLDER;

    fn client() -> reqwest::Client {
        dermachat_providers::http_client(5)
    }

    #[tokio::test]
    async fn query_strategy_uses_caller_query() {
        let config = AppConfig::default();
        let source = source_for(&config, Some("formulario=leve"), client());
        assert_eq!(source.name(), "query");

        let resolved = source.resolve().await;
        assert_eq!(resolved.context.formulario, "leve");
        assert_eq!(resolved.context.tratamiento, TRATAMIENTO_PLACEHOLDER);
    }

    #[tokio::test]
    async fn static_strategy_ignores_caller_query() {
        let mut config = AppConfig::default();
        config.context.source = ContextSourceKind::Static;
        config.context.fixed.formulario = Some("placas%20extensas".into());
        config.context.fixed.tratamiento = Some("secukinumab".into());

        let source = source_for(&config, Some("formulario=ignorado"), client());
        assert_eq!(source.name(), "static");

        let resolved = source.resolve().await;
        assert_eq!(resolved.context.formulario, "placas extensas");
        assert_eq!(resolved.context.tratamiento, "secukinumab");
    }

    #[test]
    fn remote_strategy_selected() {
        let mut config = AppConfig::default();
        config.context.source = ContextSourceKind::Remote;
        config.context.formulario_url = Some("http://127.0.0.1:9/f".into());
        config.context.tratamiento_url = Some("http://127.0.0.1:9/t".into());
        assert_eq!(source_for(&config, None, client()).name(), "remote");
    }
}
