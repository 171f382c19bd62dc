pub use super::price_history::Entity as PriceHistory;
pub use super::price_snapshots::Entity as PriceSnapshots;
