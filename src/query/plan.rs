use serde::{Deserialize, Serialize};

/// Tokenized field a text clause searches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Title,
    Body,
}

/// Stored field an exact clause filters on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExactField {
    ContainerKey,
}

/// Index-native form of a filter query
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryPlan {
    /// Documents containing every token of the phrase in the field
    Text { field: TextField, phrase: String },
    /// Documents whose stored field equals the value
    Exact { field: ExactField, value: String },
    MatchAll,
    And { children: Vec<QueryPlan> },
    Or { children: Vec<QueryPlan> },
}

impl QueryPlan {
    pub fn text(field: TextField, phrase: impl Into<String>) -> Self {
        QueryPlan::Text {
            field,
            phrase: phrase.into(),
        }
    }

    pub fn container(value: impl Into<String>) -> Self {
        QueryPlan::Exact {
            field: ExactField::ContainerKey,
            value: value.into(),
        }
    }

    /// Combine with `AND`, flattening into an existing `And`
    pub fn and(self, other: QueryPlan) -> Self {
        match self {
            QueryPlan::And { mut children } => {
                children.push(other);
                QueryPlan::And { children }
            }
            left => QueryPlan::And {
                children: vec![left, other],
            },
        }
    }

    /// Combine with `OR`, flattening into an existing `Or`
    pub fn or(self, other: QueryPlan) -> Self {
        match self {
            QueryPlan::Or { mut children } => {
                children.push(other);
                QueryPlan::Or { children }
            }
            left => QueryPlan::Or {
                children: vec![left, other],
            },
        }
    }

    /// Number of leaf clauses
    pub fn clause_count(&self) -> usize {
        match self {
            QueryPlan::And { children } | QueryPlan::Or { children } => {
                children.iter().map(QueryPlan::clause_count).sum()
            }
            _ => 1,
        }
    }
}
