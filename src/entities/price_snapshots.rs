//! `SeaORM` Entity for the current price snapshot (one row per tracked asset)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "price_snapshots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Catalog asset identifier (CoinGecko coin id)
    pub asset: String,
    pub price_usd: f64,
    pub market_cap_usd: f64,
    /// Signed 24 hour change, in percent
    pub day_change_pct: f64,
    pub observed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
