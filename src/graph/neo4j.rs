use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use neo4rs::{BoltNull, BoltType, Graph};

use super::{GraphClient, GraphValue, NodeValue, Query, Record};
use crate::error::{SocialError, SocialResult};

/// Graph client backed by a Neo4j server over bolt. The driver pools
/// connections internally, so one instance is shared by every request.
#[derive(Clone)]
pub struct Neo4jGraph {
    graph: Arc<Graph>,
}

impl Neo4jGraph {
    pub async fn connect(uri: &str, user: &str, password: &str) -> anyhow::Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .context("Failed to connect to Neo4j")?;

        Ok(Self {
            graph: Arc::new(graph),
        })
    }
}

#[async_trait]
impl GraphClient for Neo4jGraph {
    async fn execute(&self, query: Query) -> SocialResult<Vec<Record>> {
        let statement = query.statement();
        let mut q = neo4rs::query(statement.cypher);
        for (key, value) in query.params() {
            q = q.param(key, to_bolt(key, value)?);
        }

        let mut stream = self.graph.execute(q).await?;

        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            let mut record = Record::new();
            for col in statement.columns {
                let value: BoltType = row.get(col).map_err(|e| {
                    SocialError::encoding(format!("{}: column `{col}`: {e}", statement.name))
                })?;
                record.insert(col, from_bolt(value)?);
            }
            rows.push(record);
        }
        Ok(rows)
    }
}

fn to_bolt(key: &str, value: &GraphValue) -> SocialResult<BoltType> {
    Ok(match value {
        GraphValue::Null => BoltType::Null(BoltNull),
        GraphValue::Bool(b) => (*b).into(),
        GraphValue::Int(i) => (*i).into(),
        GraphValue::Float(f) => (*f).into(),
        GraphValue::String(s) => s.clone().into(),
        GraphValue::List(items) => items
            .iter()
            .map(|v| to_bolt(key, v))
            .collect::<SocialResult<Vec<BoltType>>>()?
            .into(),
        GraphValue::Map(_) | GraphValue::Node(_) => {
            return Err(SocialError::encoding(format!(
                "parameter `{key}`: {} values cannot be sent",
                value.kind()
            )))
        }
    })
}

fn from_bolt(value: BoltType) -> SocialResult<GraphValue> {
    Ok(match value {
        BoltType::Null(_) => GraphValue::Null,
        BoltType::Boolean(b) => GraphValue::Bool(b.value),
        BoltType::Integer(i) => GraphValue::Int(i.value),
        BoltType::Float(f) => GraphValue::Float(f.value),
        BoltType::String(s) => GraphValue::String(s.value),
        BoltType::List(list) => GraphValue::List(
            list.value
                .into_iter()
                .map(from_bolt)
                .collect::<SocialResult<_>>()?,
        ),
        BoltType::Map(map) => GraphValue::Map(
            map.value
                .into_iter()
                .map(|(k, v)| Ok((k.value, from_bolt(v)?)))
                .collect::<SocialResult<_>>()?,
        ),
        BoltType::Node(node) => GraphValue::Node(NodeValue {
            id: node.id.value,
            labels: node
                .labels
                .value
                .into_iter()
                .map(|l| match l {
                    BoltType::String(s) => Ok(s.value),
                    other => Err(SocialError::encoding(format!("node label {other:?}"))),
                })
                .collect::<SocialResult<_>>()?,
            props: node
                .properties
                .value
                .into_iter()
                .map(|(k, v)| Ok((k.value, from_bolt(v)?)))
                .collect::<SocialResult<_>>()?,
        }),
        other => {
            return Err(SocialError::encoding(format!(
                "unsupported bolt value {other:?}"
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_convert_to_bolt() {
        let list = GraphValue::from(vec!["a", "b"]);
        match to_bolt("images", &list).unwrap() {
            BoltType::List(l) => assert_eq!(l.value.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
        assert!(to_bolt("m", &GraphValue::Map(Default::default())).is_err());
    }

    #[test]
    fn scalars_convert_back() {
        assert_eq!(from_bolt(BoltType::from(42i64)).unwrap(), GraphValue::Int(42));
        assert_eq!(
            from_bolt(BoltType::from("x".to_string())).unwrap(),
            GraphValue::from("x")
        );
        assert_eq!(from_bolt(BoltType::from(true)).unwrap(), GraphValue::Bool(true));
    }
}
