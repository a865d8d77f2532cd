//! Bolt connection client.

use anyhow::{Context, Result};
use neo4rs::{ConfigBuilder, Graph, Query, Row};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use cymap_core::MapContext;

use crate::translate;

/// Configuration for connecting over Bolt.
#[derive(Debug, Clone, Deserialize)]
pub struct BoltConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub db: String,
}

impl Default for BoltConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            db: "neo4j".to_string(),
        }
    }
}

/// Client facade over the driver's connection pool.
#[derive(Clone)]
pub struct BoltClient {
    graph: Graph,
}

impl BoltClient {
    /// Create a client from config.
    ///
    /// Note: neo4rs uses a lazy deadpool — `Graph::connect` only creates
    /// the pool object and does NOT establish a real bolt connection yet.
    /// We run a cheap `RETURN 1` ping immediately so that callers can
    /// wrap this in a timeout and get a fast failure when the server is
    /// unreachable instead of hanging silently.
    pub async fn connect(config: &BoltConfig) -> Result<Self> {
        let bolt_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.db.as_str())
            .max_connections(4)
            .fetch_size(200)
            .build()
            .context("Failed to build Bolt config")?;

        let graph = Graph::connect(bolt_config)
            .await
            .context("Failed to create Bolt connection pool")?;

        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .context("Graph database is not responding to queries")?;

        Ok(Self { graph })
    }

    /// Create a client with default configuration.
    pub async fn connect_default() -> Result<Self> {
        Self::connect(&BoltConfig::default()).await
    }

    /// Execute a query that returns no results.
    pub async fn execute(&self, query: Query) -> Result<()> {
        self.graph.run(query).await.context("Query execution failed")?;
        Ok(())
    }

    /// Execute a query and return the raw driver rows.
    pub async fn query(&self, query: Query) -> Result<Vec<Row>> {
        let mut result = self.graph.execute(query).await.context("Query failed")?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().await.context("Failed to fetch result row")? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a query and map the rows onto `T` under the given
    /// context. `columns` are the RETURN clause aliases, in order.
    pub async fn query_as<T: DeserializeOwned>(
        &self,
        query: Query,
        columns: &[&str],
        ctx: &MapContext,
    ) -> Result<Vec<T>> {
        let rows = self.query(query).await?;
        debug!(rows = rows.len(), "translating bolt rows");
        let set = translate::rows_to_result_set(&rows, columns)?;
        set.map_rows(ctx).context("Failed to map result rows")
    }

    /// Get a reference to the underlying neo4rs Graph.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}
