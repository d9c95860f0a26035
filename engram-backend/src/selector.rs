//! Runtime backend selection: env override, then remote if the bolt
//! endpoint is reachable and credentialed, then embedded.

use std::sync::Arc;

use engram_core::config::{BackendKind, GraphConfig};
use engram_core::errors::{ConfigError, EngramResult};
use engram_core::traits::GraphBackend;

use crate::embedded::EmbeddedBackend;
use crate::remote::RemoteBackend;

/// The resolved backend and why it was chosen.
#[derive(Debug, Clone)]
pub struct BackendChoice {
    pub kind: BackendKind,
    pub reason: String,
}

/// Probe the remote bolt endpoint with the configured timeout.
async fn remote_reachable(config: &GraphConfig) -> bool {
    let address = (config.bolt_host(), config.bolt_port);
    matches!(
        tokio::time::timeout(config.probe_timeout, tokio::net::TcpStream::connect(address)).await,
        Ok(Ok(_))
    )
}

/// Resolve which backend to use without opening it.
pub async fn select_backend(config: &GraphConfig) -> EngramResult<BackendChoice> {
    if let Some(forced) = config.forced_backend {
        return Ok(BackendChoice {
            kind: forced,
            reason: "forced via GRAPH_BACKEND".to_string(),
        });
    }

    if config.password.is_some() && remote_reachable(config).await {
        return Ok(BackendChoice {
            kind: BackendKind::Remote,
            reason: format!("graph server reachable at {}", config.uri),
        });
    }

    // The embedded library is compiled in, so it is always available.
    Ok(BackendChoice {
        kind: BackendKind::Embedded,
        reason: "embedded store, zero infrastructure".to_string(),
    })
}

/// Resolve and open a backend.
pub async fn open_backend(config: &GraphConfig) -> EngramResult<Arc<dyn GraphBackend>> {
    let choice = select_backend(config).await?;
    tracing::info!(backend = %choice.kind, reason = %choice.reason, "selected graph backend");

    match choice.kind {
        BackendKind::Remote => {
            if config.password.is_none() {
                return Err(ConfigError::MissingVar {
                    name: "GRAPH_PASSWORD".to_string(),
                }
                .into());
            }
            let backend = RemoteBackend::new(config.clone());
            backend.connect().await.map_err(|e| {
                ConfigError::NoBackendAvailable {
                    details: format!(
                        "remote backend selected but unreachable: {e}\n\
                         Options:\n\
                         \x20 1. Start the graph server at {} (or set GRAPH_URI)\n\
                         \x20 2. Set GRAPH_BACKEND=embedded for the zero-infrastructure store",
                        config.uri
                    ),
                }
            })?;
            Ok(Arc::new(backend))
        }
        BackendKind::Embedded => {
            let backend = EmbeddedBackend::open(&config.embedded_path).map_err(|e| {
                ConfigError::NoBackendAvailable {
                    details: format!(
                        "embedded store could not be opened at {}: {e}\n\
                         Options:\n\
                         \x20 1. Ensure the directory is writable\n\
                         \x20 2. Set GRAPH_BACKEND=remote with GRAPH_URI/GRAPH_PASSWORD",
                        config.embedded_path.display()
                    ),
                }
            })?;
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forced_backend_wins() {
        let mut config = GraphConfig::default();
        config.forced_backend = Some(BackendKind::Embedded);
        let choice = select_backend(&config).await.unwrap();
        assert_eq!(choice.kind, BackendKind::Embedded);
        assert!(choice.reason.contains("GRAPH_BACKEND"));
    }

    #[tokio::test]
    async fn falls_back_to_embedded_without_credentials() {
        let config = GraphConfig::default();
        let choice = select_backend(&config).await.unwrap();
        assert_eq!(choice.kind, BackendKind::Embedded);
    }
}
