use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Which graph client the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphBackend {
    Neo4j,
    Memory,
}

impl FromStr for GraphBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "neo4j" => Ok(GraphBackend::Neo4j),
            "memory" => Ok(GraphBackend::Memory),
            other => anyhow::bail!("unknown GRAPH_BACKEND `{other}` (expected neo4j or memory)"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jConfig {
    /// bolt URI, e.g. bolt://localhost:7687
    pub uri: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub graph_backend: GraphBackend,
    pub neo4j: Option<Neo4jConfig>,
    /// Directory the `imgs/` tree lives under.
    pub media_root: PathBuf,
    /// Budget for every graph or filesystem call made while serving a request.
    pub request_timeout: Duration,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let graph_backend = std::env::var("GRAPH_BACKEND")
            .ok()
            .map(|v| v.parse::<GraphBackend>())
            .transpose()?
            .unwrap_or(GraphBackend::Neo4j);

        let neo4j = match graph_backend {
            GraphBackend::Neo4j => Some(Neo4jConfig {
                uri: std::env::var("NEO4J_URI")
                    .unwrap_or_else(|_| "bolt://localhost:7687".into()),
                user: std::env::var("NEO4J_USER").unwrap_or_else(|_| "neo4j".into()),
                password: std::env::var("NEO4J_PASSWORD")
                    .context("NEO4J_PASSWORD must be set when GRAPH_BACKEND=neo4j")?,
            }),
            GraphBackend::Memory => None,
        };

        let media_root = std::env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let request_timeout = Duration::from_millis(
            std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10_000),
        );

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "social-graph".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "social-graph-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };

        Ok(Self {
            graph_backend,
            neo4j,
            media_root,
            request_timeout,
            jwt,
        })
    }

    /// In-memory graph, media under `media_root`, short deadline.
    pub fn for_tests(media_root: impl Into<PathBuf>) -> Self {
        Self {
            graph_backend: GraphBackend::Memory,
            neo4j: None,
            media_root: media_root.into(),
            request_timeout: Duration::from_secs(5),
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 5,
            },
        }
    }
}
