//! Portfolio domain models.

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named portfolio. Regular portfolios own transactions; aggregate
/// portfolios own no transactions of their own, only a set of member
/// portfolio references, and are valued purely from member snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_aggregate: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Payload for creating a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPortfolio {
    /// Optional caller-supplied id; generated when absent.
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub is_aggregate: bool,
}

impl From<NewPortfolio> for Portfolio {
    fn from(new: NewPortfolio) -> Self {
        let now = Utc::now().naive_utc();
        Portfolio {
            id: new.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: new.name,
            is_aggregate: new.is_aggregate,
            created_at: now,
            updated_at: now,
        }
    }
}
