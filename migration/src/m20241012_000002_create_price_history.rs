use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only samples used for rolling volatility
        manager
            .create_table(
                Table::create()
                    .table(PriceHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PriceHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PriceHistory::Asset)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PriceHistory::PriceUsd).double().not_null())
                    .col(
                        ColumnDef::new(PriceHistory::MarketCapUsd)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceHistory::DayChangePct)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceHistory::ObservedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // (asset, observed_at DESC) serves the 100-sample window lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_price_history_asset_time")
                    .table(PriceHistory::Table)
                    .col(PriceHistory::Asset)
                    .col((PriceHistory::ObservedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PriceHistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PriceHistory {
    Table,
    Id,
    Asset,
    PriceUsd,
    MarketCapUsd,
    DayChangePct,
    ObservedAt,
}
