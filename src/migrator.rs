use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_reference_tables::Migration),
            Box::new(m20240301_000002_create_procurement_tables::Migration),
            Box::new(m20240301_000003_create_asset_tables::Migration),
        ]
    }
}

mod m20240301_000001_create_reference_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Categories::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Categories::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Categories::IsConsumable)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Categories::GeneratesAssets)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Categories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Projects::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Projects::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Projects::Name).string().not_null())
                        .col(ColumnDef::new(Projects::Code).string().not_null())
                        .col(ColumnDef::new(Projects::ProjectManagerId).uuid().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProjectAssignments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProjectAssignments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProjectAssignments::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(ProjectAssignments::ProjectId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProjectAssignments::Role).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_project_assignments_project")
                                .from(ProjectAssignments::Table, ProjectAssignments::ProjectId)
                                .to(Projects::Table, Projects::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_project_assignments_user_id")
                        .table(ProjectAssignments::Table)
                        .col(ProjectAssignments::UserId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProjectAssignments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Projects::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Categories {
        Table,
        Id,
        Name,
        IsConsumable,
        GeneratesAssets,
        CreatedAt,
    }

    #[derive(Iden)]
    pub enum Projects {
        Table,
        Id,
        Name,
        Code,
        ProjectManagerId,
    }

    #[derive(Iden)]
    enum ProjectAssignments {
        Table,
        Id,
        UserId,
        ProjectId,
        Role,
    }
}

mod m20240301_000002_create_procurement_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_procurement_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProcurementOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProcurementOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::PoNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ProcurementOrders::Title).string().not_null())
                        .col(ColumnDef::new(ProcurementOrders::VendorId).uuid().null())
                        .col(ColumnDef::new(ProcurementOrders::ProjectId).uuid().null())
                        .col(
                            ColumnDef::new(ProcurementOrders::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::VatAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::EwtAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::Discount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::NetTotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ProcurementOrders::Status).string().not_null())
                        .col(
                            ColumnDef::new(ProcurementOrders::DeliveryStatus)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::IsRetroactive)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::RetroactiveReason)
                                .text()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::RequestedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProcurementOrders::ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(ProcurementOrders::ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ProcurementOrders::ReceivedBy).uuid().null())
                        .col(
                            ColumnDef::new(ProcurementOrders::ReceivedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ProcurementOrders::QuoteFile).string().null())
                        .col(ColumnDef::new(ProcurementOrders::ReceiptFile).string().null())
                        .col(ColumnDef::new(ProcurementOrders::EvidenceFile).string().null())
                        .col(
                            ColumnDef::new(ProcurementOrders::ScheduledDeliveryDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::ActualDeliveryDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::DeliveryMethod)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::DeliveryLocation)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::TrackingNumber)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(ProcurementOrders::DeliveryNotes).text().null())
                        .col(
                            ColumnDef::new(ProcurementOrders::HasDiscrepancy)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::DiscrepancyType)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::DiscrepancyDetails)
                                .text()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::DiscrepancyResolvedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::DiscrepancyResolvedBy)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::DiscrepancyResolutionNotes)
                                .text()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::DiscrepancyResolutionAction)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::CancellationReason)
                                .text()
                                .null(),
                        )
                        .col(ColumnDef::new(ProcurementOrders::CanceledBy).uuid().null())
                        .col(
                            ColumnDef::new(ProcurementOrders::CanceledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ProcurementOrders::Notes).text().null())
                        .col(
                            ColumnDef::new(ProcurementOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_procurement_orders_project_id")
                        .table(ProcurementOrders::Table)
                        .col(ProcurementOrders::ProjectId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_procurement_orders_status")
                        .table(ProcurementOrders::Table)
                        .col(ProcurementOrders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProcurementItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProcurementItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementItems::ProcurementOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProcurementItems::ItemName).string().not_null())
                        .col(ColumnDef::new(ProcurementItems::Description).text().null())
                        .col(ColumnDef::new(ProcurementItems::Specifications).text().null())
                        .col(ColumnDef::new(ProcurementItems::Unit).string().null())
                        .col(ColumnDef::new(ProcurementItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(ProcurementItems::QuantityReceived)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProcurementItems::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProcurementItems::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ProcurementItems::CategoryId).uuid().null())
                        .col(
                            ColumnDef::new(ProcurementItems::DeliveryComplete)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(ProcurementItems::QualityNotes).text().null())
                        .col(
                            ColumnDef::new(ProcurementItems::ExcessQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProcurementItems::DiscrepancyStatus)
                                .string()
                                .not_null()
                                .default("none"),
                        )
                        .col(
                            ColumnDef::new(ProcurementItems::DiscrepancyResolutionNotes)
                                .text()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementItems::DiscrepancyResolutionAction)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementItems::DiscrepancyResolvedBy)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementItems::DiscrepancyResolvedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_procurement_items_order")
                                .from(ProcurementItems::Table, ProcurementItems::ProcurementOrderId)
                                .to(ProcurementOrders::Table, ProcurementOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_procurement_items_order_id")
                        .table(ProcurementItems::Table)
                        .col(ProcurementItems::ProcurementOrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProcurementActivityLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProcurementActivityLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementActivityLogs::ProcurementOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementActivityLogs::UserId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementActivityLogs::Action)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProcurementActivityLogs::OldValue).text().null())
                        .col(ColumnDef::new(ProcurementActivityLogs::NewValue).text().null())
                        .col(ColumnDef::new(ProcurementActivityLogs::Notes).text().null())
                        .col(
                            ColumnDef::new(ProcurementActivityLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_procurement_activity_logs_order")
                                .from(
                                    ProcurementActivityLogs::Table,
                                    ProcurementActivityLogs::ProcurementOrderId,
                                )
                                .to(ProcurementOrders::Table, ProcurementOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_procurement_activity_logs_order_id")
                        .table(ProcurementActivityLogs::Table)
                        .col(ProcurementActivityLogs::ProcurementOrderId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProcurementActivityLogs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProcurementItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProcurementOrders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum ProcurementOrders {
        Table,
        Id,
        PoNumber,
        Title,
        VendorId,
        ProjectId,
        Subtotal,
        VatAmount,
        EwtAmount,
        Discount,
        NetTotal,
        Status,
        DeliveryStatus,
        IsRetroactive,
        RetroactiveReason,
        RequestedBy,
        ApprovedBy,
        ApprovedAt,
        ReceivedBy,
        ReceivedAt,
        QuoteFile,
        ReceiptFile,
        EvidenceFile,
        ScheduledDeliveryDate,
        ActualDeliveryDate,
        DeliveryMethod,
        DeliveryLocation,
        TrackingNumber,
        DeliveryNotes,
        HasDiscrepancy,
        DiscrepancyType,
        DiscrepancyDetails,
        DiscrepancyResolvedAt,
        DiscrepancyResolvedBy,
        DiscrepancyResolutionNotes,
        DiscrepancyResolutionAction,
        CancellationReason,
        CanceledBy,
        CanceledAt,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum ProcurementItems {
        Table,
        Id,
        ProcurementOrderId,
        ItemName,
        Description,
        Specifications,
        Unit,
        Quantity,
        QuantityReceived,
        UnitPrice,
        Subtotal,
        CategoryId,
        DeliveryComplete,
        QualityNotes,
        ExcessQuantity,
        DiscrepancyStatus,
        DiscrepancyResolutionNotes,
        DiscrepancyResolutionAction,
        DiscrepancyResolvedBy,
        DiscrepancyResolvedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum ProcurementActivityLogs {
        Table,
        Id,
        ProcurementOrderId,
        UserId,
        Action,
        OldValue,
        NewValue,
        Notes,
        CreatedAt,
    }
}

mod m20240301_000003_create_asset_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_asset_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Assets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Assets::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Assets::Reference)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Assets::Name).string().not_null())
                        .col(ColumnDef::new(Assets::Description).text().null())
                        .col(ColumnDef::new(Assets::CategoryId).uuid().null())
                        .col(ColumnDef::new(Assets::ProjectId).uuid().null())
                        .col(ColumnDef::new(Assets::VendorId).uuid().null())
                        .col(ColumnDef::new(Assets::ProcurementOrderId).uuid().null())
                        .col(ColumnDef::new(Assets::ProcurementItemId).uuid().null())
                        .col(
                            ColumnDef::new(Assets::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Assets::AvailableQuantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Assets::Unit).string().null())
                        .col(
                            ColumnDef::new(Assets::UnitCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Assets::AcquisitionCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Assets::WorkflowStatus)
                                .string()
                                .not_null()
                                .default("draft"),
                        )
                        .col(ColumnDef::new(Assets::MadeBy).uuid().null())
                        .col(ColumnDef::new(Assets::VerifiedBy).uuid().null())
                        .col(
                            ColumnDef::new(Assets::VerifiedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Assets::AuthorizedBy).uuid().null())
                        .col(
                            ColumnDef::new(Assets::AuthorizedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Assets::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Assets::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_assets_procurement_item_id")
                        .table(Assets::Table)
                        .col(Assets::ProcurementItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProcurementAssets::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProcurementAssets::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementAssets::AssetId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ProcurementAssets::ProcurementOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementAssets::ProcurementItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProcurementAssets::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_procurement_assets_asset")
                                .from(ProcurementAssets::Table, ProcurementAssets::AssetId)
                                .to(Assets::Table, Assets::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_procurement_assets_item_id")
                        .table(ProcurementAssets::Table)
                        .col(ProcurementAssets::ProcurementItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ActivityLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ActivityLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ActivityLogs::UserId).uuid().null())
                        .col(ColumnDef::new(ActivityLogs::Action).string().not_null())
                        .col(ColumnDef::new(ActivityLogs::Description).text().not_null())
                        .col(ColumnDef::new(ActivityLogs::TableName).string().not_null())
                        .col(ColumnDef::new(ActivityLogs::RecordId).uuid().null())
                        .col(
                            ColumnDef::new(ActivityLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ActivityLogs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProcurementAssets::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Assets::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Assets {
        Table,
        Id,
        Reference,
        Name,
        Description,
        CategoryId,
        ProjectId,
        VendorId,
        ProcurementOrderId,
        ProcurementItemId,
        Quantity,
        AvailableQuantity,
        Unit,
        UnitCost,
        AcquisitionCost,
        WorkflowStatus,
        MadeBy,
        VerifiedBy,
        VerifiedAt,
        AuthorizedBy,
        AuthorizedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum ProcurementAssets {
        Table,
        Id,
        AssetId,
        ProcurementOrderId,
        ProcurementItemId,
        CreatedAt,
    }

    #[derive(Iden)]
    enum ActivityLogs {
        Table,
        Id,
        UserId,
        Action,
        Description,
        TableName,
        RecordId,
        CreatedAt,
    }
}
