use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::config::{AppConfig, GraphBackend};
use crate::deadline::Deadline;
use crate::graph::{memory::MemoryGraph, neo4j::Neo4jGraph, GraphClient};
use crate::storage::{FsMediaStore, MediaStore};

#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<dyn GraphClient>,
    pub media: Arc<dyn MediaStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let graph: Arc<dyn GraphClient> = match (config.graph_backend, &config.neo4j) {
            (GraphBackend::Neo4j, Some(neo)) => {
                tracing::info!(uri = %neo.uri, "connecting to neo4j");
                Arc::new(Neo4jGraph::connect(&neo.uri, &neo.user, &neo.password).await?)
            }
            (GraphBackend::Neo4j, None) => anyhow::bail!("neo4j backend selected without settings"),
            (GraphBackend::Memory, _) => {
                tracing::warn!("using the in-memory graph; data is lost on restart");
                Arc::new(MemoryGraph::new())
            }
        };

        let media = Arc::new(
            FsMediaStore::new(config.media_root.clone())
                .await
                .context("init media store")?,
        ) as Arc<dyn MediaStore>;

        Ok(Self::from_parts(graph, media, Arc::new(config)))
    }

    pub fn from_parts(
        graph: Arc<dyn GraphClient>,
        media: Arc<dyn MediaStore>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            graph,
            media,
            config,
        }
    }

    /// Fresh in-memory graph with media under `media_root`.
    pub async fn in_memory(media_root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        Self::from_config(AppConfig::for_tests(media_root)).await
    }

    /// Deadline for the request being served.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.config.request_timeout)
    }
}
