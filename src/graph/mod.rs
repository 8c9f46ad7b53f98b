//! Graph store access: the `GraphClient` seam, the value model records are
//! expressed in, and the statement catalogue every operation runs through.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::deadline::Deadline;
use crate::error::SocialResult;

pub mod codec;
pub mod memory;
pub mod neo4j;
pub mod statements;

pub use statements::Statement;

/// Dynamically typed value carried by a record field or a query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<GraphValue>),
    Map(BTreeMap<String, GraphValue>),
    Node(NodeValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeValue {
    pub id: i64,
    pub labels: Vec<String>,
    pub props: BTreeMap<String, GraphValue>,
}

impl GraphValue {
    pub fn kind(&self) -> &'static str {
        match self {
            GraphValue::Null => "null",
            GraphValue::Bool(_) => "bool",
            GraphValue::Int(_) => "int",
            GraphValue::Float(_) => "float",
            GraphValue::String(_) => "string",
            GraphValue::List(_) => "list",
            GraphValue::Map(_) => "map",
            GraphValue::Node(_) => "node",
        }
    }
}

impl From<i64> for GraphValue {
    fn from(v: i64) -> Self {
        GraphValue::Int(v)
    }
}

impl From<i32> for GraphValue {
    fn from(v: i32) -> Self {
        GraphValue::Int(v.into())
    }
}

impl From<bool> for GraphValue {
    fn from(v: bool) -> Self {
        GraphValue::Bool(v)
    }
}

impl From<&str> for GraphValue {
    fn from(v: &str) -> Self {
        GraphValue::String(v.to_string())
    }
}

impl From<String> for GraphValue {
    fn from(v: String) -> Self {
        GraphValue::String(v)
    }
}

impl<T: Into<GraphValue>> From<Vec<T>> for GraphValue {
    fn from(v: Vec<T>) -> Self {
        GraphValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<GraphValue>> From<Option<T>> for GraphValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(GraphValue::Null)
    }
}

/// One result row: column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, GraphValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<GraphValue>) -> Self {
        self.fields.insert(column.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, column: &str, value: GraphValue) {
        self.fields.insert(column.to_string(), value);
    }

    pub fn get(&self, column: &str) -> Option<&GraphValue> {
        self.fields.get(column)
    }
}

/// A statement bound to its parameters.
#[derive(Debug, Clone)]
pub struct Query {
    statement: &'static Statement,
    params: BTreeMap<&'static str, GraphValue>,
}

impl Query {
    pub fn new(statement: &'static Statement) -> Self {
        Self {
            statement,
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, key: &'static str, value: impl Into<GraphValue>) -> Self {
        self.params.insert(key, value.into());
        self
    }

    pub fn statement(&self) -> &'static Statement {
        self.statement
    }

    pub fn params(&self) -> impl Iterator<Item = (&'static str, &GraphValue)> {
        self.params.iter().map(|(k, v)| (*k, v))
    }

    pub fn get(&self, key: &str) -> Option<&GraphValue> {
        self.params.get(key)
    }
}

#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Runs one statement and collects every row it returns.
    async fn execute(&self, query: Query) -> SocialResult<Vec<Record>>;
}

/// Executes `query` against `graph`, bounded by `deadline`.
pub async fn run(
    graph: &dyn GraphClient,
    deadline: Deadline,
    query: Query,
) -> SocialResult<Vec<Record>> {
    let name = query.statement().name;
    tracing::debug!(statement = name, "graph execute");
    deadline.bound(name, graph.execute(query)).await
}

/// Like [`run`], keeping only the first row.
pub async fn run_one(
    graph: &dyn GraphClient,
    deadline: Deadline,
    query: Query,
) -> SocialResult<Option<Record>> {
    Ok(run(graph, deadline, query).await?.into_iter().next())
}

/// Store liveness probe.
pub async fn health_check(graph: &dyn GraphClient, deadline: Deadline) -> SocialResult<bool> {
    let row = run_one(graph, deadline, Query::new(&statements::HEALTH)).await?;
    Ok(match row {
        Some(r) => codec::int(&r, "ok")? == 1,
        None => false,
    })
}
