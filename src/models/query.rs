//! The minimal query model: enough to filter aliases and drive cursors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document filter.
///
/// `field` is a dotted path into the source (`customer.region`).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    #[default]
    MatchAll,
    Term { field: String, value: Value },
    All(Vec<Query>),
}

impl Query {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_match_all(&self) -> bool {
        match self {
            Query::MatchAll => true,
            Query::All(clauses) => clauses.iter().all(Query::is_match_all),
            Query::Term { .. } => false,
        }
    }

    /// Evaluate the query against a document source.
    pub fn matches(&self, source: &Value) -> bool {
        match self {
            Query::MatchAll => true,
            Query::Term { field, value } => lookup(source, field) == Some(value),
            Query::All(clauses) => clauses.iter().all(|clause| clause.matches(source)),
        }
    }
}

fn lookup<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(source, |current, segment| current.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn term_follows_dotted_paths() {
        let doc = json!({"customer": {"region": "eu"}, "total": 12});
        assert!(Query::term("customer.region", "eu").matches(&doc));
        assert!(!Query::term("customer.region", "us").matches(&doc));
        assert!(!Query::term("customer.name", "eu").matches(&doc));
        assert!(Query::All(vec![Query::term("total", 12), Query::MatchAll]).matches(&doc));
    }

    #[test]
    fn filter_survives_persistence() {
        let query = Query::All(vec![Query::term("kind", "b2b"), Query::MatchAll]);
        let text = serde_json::to_string(&query).unwrap();
        assert_eq!(serde_json::from_str::<Query>(&text).unwrap(), query);
        assert!(!query.is_match_all());
        assert!(Query::All(vec![]).is_match_all());
    }
}
