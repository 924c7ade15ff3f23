use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Compania {
    Table,
    Id,
    Nombre,
}

#[derive(DeriveIden)]
enum Empleado {
    Table,
    Id,
    Nombres,
    Apellidos,
    Cargo,
    CompaniaId,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Compania::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Compania::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Compania::Nombre).string_len(256).not_null())
                    .to_owned(),
            )
            .await?;

        // compania_id is NOT NULL: an employee without a company is refused on commit.
        manager
            .create_table(
                Table::create()
                    .table(Empleado::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Empleado::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Empleado::Nombres).string_len(128).not_null())
                    .col(ColumnDef::new(Empleado::Apellidos).string_len(128).not_null())
                    .col(ColumnDef::new(Empleado::Cargo).string_len(128).not_null())
                    .col(ColumnDef::new(Empleado::CompaniaId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_empleado_compania")
                            .from(Empleado::Table, Empleado::CompaniaId)
                            .to(Compania::Table, Compania::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_empleado_compania")
                    .table(Empleado::Table)
                    .col(Empleado::CompaniaId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Empleado::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Compania::Table).to_owned())
            .await?;
        Ok(())
    }
}
