//! Repository trait for portfolios and aggregate membership.

use async_trait::async_trait;

use super::{NewPortfolio, Portfolio};
use crate::errors::Result;

/// Repository trait for portfolio records and the aggregate membership
/// relation. Membership is stable across member re-imports: it references
/// portfolio ids, never transaction state.
#[async_trait]
pub trait PortfolioRepositoryTrait: Send + Sync {
    async fn create(&self, new_portfolio: NewPortfolio) -> Result<Portfolio>;

    fn get_by_id(&self, portfolio_id: &str) -> Result<Portfolio>;

    fn list(&self) -> Result<Vec<Portfolio>>;

    async fn delete(&self, portfolio_id: &str) -> Result<()>;

    /// Member portfolio ids of an aggregate portfolio.
    fn get_members(&self, aggregate_id: &str) -> Result<Vec<String>>;

    /// Replace the member set of an aggregate portfolio.
    async fn set_members(&self, aggregate_id: &str, member_ids: &[String]) -> Result<()>;
}
