use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Current view: cleared and re-filled by every refresh
        manager
            .create_table(
                Table::create()
                    .table(PriceSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PriceSnapshots::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PriceSnapshots::Asset)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PriceSnapshots::PriceUsd).double().not_null())
                    .col(
                        ColumnDef::new(PriceSnapshots::MarketCapUsd)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceSnapshots::DayChangePct)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceSnapshots::ObservedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_price_snapshots_asset")
                    .table(PriceSnapshots::Table)
                    .col(PriceSnapshots::Asset)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PriceSnapshots::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PriceSnapshots {
    Table,
    Id,
    Asset,
    PriceUsd,
    MarketCapUsd,
    DayChangePct,
    ObservedAt,
}
