use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_settings_table::Migration),
            Box::new(m20240301_000002_create_categories_table::Migration),
            Box::new(m20240301_000003_create_brands_tables::Migration),
            Box::new(m20240301_000004_create_products_tables::Migration),
            Box::new(m20240301_000005_create_users_tables::Migration),
        ]
    }
}

mod m20240301_000001_create_settings_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_settings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Settings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Settings::Key)
                                .string_len(128)
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Settings::Value).string_len(1024).not_null())
                        .col(ColumnDef::new(Settings::Category).string_len(45).not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_settings_category")
                        .table(Settings::Table)
                        .col(Settings::Category)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Settings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Settings {
        Table,
        Key,
        Value,
        Category,
    }
}

mod m20240301_000002_create_categories_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_categories_table"
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
                        .col(
                            ColumnDef::new(Categories::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Categories::Name)
                                .string_len(128)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Categories::Alias).string_len(64).not_null())
                        .col(ColumnDef::new(Categories::Image).string_len(128).null())
                        .col(
                            ColumnDef::new(Categories::Enabled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Categories::ParentId).integer().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_categories_parent_id")
                                .from(Categories::Table, Categories::ParentId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_categories_parent_id")
                        .table(Categories::Table)
                        .col(Categories::ParentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
        Name,
        Alias,
        Image,
        Enabled,
        ParentId,
    }
}

mod m20240301_000003_create_brands_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_brands_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Brands::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Brands::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Brands::Name)
                                .string_len(45)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Brands::Logo).string_len(128).null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BrandsCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BrandsCategories::BrandId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BrandsCategories::CategoryId)
                                .integer()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(BrandsCategories::BrandId)
                                .col(BrandsCategories::CategoryId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_brands_categories_brand_id")
                                .from(BrandsCategories::Table, BrandsCategories::BrandId)
                                .to(Brands::Table, Brands::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_brands_categories_category_id")
                                .from(BrandsCategories::Table, BrandsCategories::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BrandsCategories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Brands::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Brands {
        Table,
        Id,
        Name,
        Logo,
    }

    #[derive(DeriveIden)]
    enum BrandsCategories {
        Table,
        BrandId,
        CategoryId,
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
    }
}

mod m20240301_000004_create_products_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_products_tables"
        }
    }

    fn money(col: Products) -> ColumnDef {
        ColumnDef::new(col)
            .decimal_len(10, 2)
            .not_null()
            .default(0)
            .to_owned()
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Products::Name)
                                .string_len(256)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Products::Alias)
                                .string_len(256)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Products::ShortDescription)
                                .string_len(512)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::FullDescription)
                                .string_len(4096)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedTime)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedTime)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::Enabled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Products::InStock)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(&mut money(Products::Cost))
                        .col(&mut money(Products::Price))
                        .col(&mut money(Products::DiscountPercent))
                        .col(&mut money(Products::Length))
                        .col(&mut money(Products::Width))
                        .col(&mut money(Products::Height))
                        .col(&mut money(Products::Weight))
                        .col(ColumnDef::new(Products::MainImage).string_len(256).null())
                        .col(ColumnDef::new(Products::CategoryId).integer().null())
                        .col(ColumnDef::new(Products::BrandId).integer().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_category_id")
                                .from(Products::Table, Products::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_brand_id")
                                .from(Products::Table, Products::BrandId)
                                .to(Brands::Table, Brands::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductImages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductImages::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProductImages::Name).string_len(256).not_null())
                        .col(ColumnDef::new(ProductImages::ProductId).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_images_product_id")
                                .from(ProductImages::Table, ProductImages::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductDetails::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductDetails::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProductDetails::Name).string_len(256).not_null())
                        .col(ColumnDef::new(ProductDetails::Value).string_len(256).not_null())
                        .col(ColumnDef::new(ProductDetails::ProductId).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_details_product_id")
                                .from(ProductDetails::Table, ProductDetails::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_images_product_id")
                        .table(ProductImages::Table)
                        .col(ProductImages::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_details_product_id")
                        .table(ProductDetails::Table)
                        .col(ProductDetails::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductDetails::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductImages::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum Products {
        Table,
        Id,
        Name,
        Alias,
        ShortDescription,
        FullDescription,
        CreatedTime,
        UpdatedTime,
        Enabled,
        InStock,
        Cost,
        Price,
        DiscountPercent,
        Length,
        Width,
        Height,
        Weight,
        MainImage,
        CategoryId,
        BrandId,
    }

    #[derive(DeriveIden)]
    enum ProductImages {
        Table,
        Id,
        Name,
        ProductId,
    }

    #[derive(DeriveIden)]
    enum ProductDetails {
        Table,
        Id,
        Name,
        Value,
        ProductId,
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Brands {
        Table,
        Id,
    }
}

mod m20240301_000005_create_users_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_users_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Roles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Roles::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Roles::Name)
                                .string_len(40)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Roles::Description).string_len(150).not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Email)
                                .string_len(128)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Password).string_len(64).not_null())
                        .col(ColumnDef::new(Users::FirstName).string_len(45).not_null())
                        .col(ColumnDef::new(Users::LastName).string_len(45).not_null())
                        .col(ColumnDef::new(Users::Photos).string_len(64).null())
                        .col(
                            ColumnDef::new(Users::Enabled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UsersRoles::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(UsersRoles::UserId).integer().not_null())
                        .col(ColumnDef::new(UsersRoles::RoleId).integer().not_null())
                        .primary_key(
                            Index::create()
                                .col(UsersRoles::UserId)
                                .col(UsersRoles::RoleId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_users_roles_user_id")
                                .from(UsersRoles::Table, UsersRoles::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_users_roles_role_id")
                                .from(UsersRoles::Table, UsersRoles::RoleId)
                                .to(Roles::Table, Roles::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(UsersRoles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Roles::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Roles {
        Table,
        Id,
        Name,
        Description,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Email,
        Password,
        FirstName,
        LastName,
        Photos,
        Enabled,
    }

    #[derive(DeriveIden)]
    enum UsersRoles {
        Table,
        UserId,
        RoleId,
    }
}

pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(4)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    match Migrator::up(&db, None).await {
        Ok(()) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

    #[tokio::test]
    async fn migrations_create_every_table() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        for table in [
            "settings",
            "categories",
            "brands",
            "brands_categories",
            "products",
            "product_images",
            "product_details",
            "roles",
            "users",
            "users_roles",
        ] {
            let row = db
                .query_one(Statement::from_string(
                    DatabaseBackend::Sqlite,
                    format!(
                        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '{}'",
                        table
                    ),
                ))
                .await
                .unwrap();
            assert!(row.is_some(), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn users_reach_their_roles_through_the_join_table() {
        use crate::entities::{role, user, user_role};
        use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, Set};

        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let editor = role::ActiveModel {
            name: Set("Editor".to_string()),
            description: Set("Manage categories, brands and products".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        let user = user::ActiveModel {
            email: Set("editor@shopme.test".to_string()),
            password: Set("not-a-real-hash".to_string()),
            first_name: Set("Ada".to_string()),
            last_name: Set("Lovelace".to_string()),
            photos: Set(None),
            enabled: Set(true),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        user_role::ActiveModel {
            user_id: Set(user.id),
            role_id: Set(editor.id),
        }
        .insert(&db)
        .await
        .unwrap();

        let roles = user.find_related(role::Entity).all(&db).await.unwrap();
        assert_eq!(roles, vec![editor.clone()]);
        assert_eq!(user.full_name(), "Ada Lovelace");

        let holders = editor.find_related(user::Entity).all(&db).await.unwrap();
        assert_eq!(holders, vec![user.clone()]);

        let links = user_role::Entity::find()
            .find_also_related(user::Entity)
            .all(&db)
            .await
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].1.as_ref(), Some(&user));
        let link_roles = links[0].0.find_related(role::Entity).all(&db).await.unwrap();
        assert_eq!(link_roles, vec![editor]);
    }

    #[tokio::test]
    async fn brand_links_resolve_to_both_sides() {
        use crate::entities::{brand, brand_category, category};
        use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, Set};

        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let cameras = category::ActiveModel {
            name: Set("Cameras".to_string()),
            alias: Set("cameras".to_string()),
            enabled: Set(true),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        let canon = brand::ActiveModel {
            name: Set("Canon".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        brand_category::ActiveModel {
            brand_id: Set(canon.id),
            category_id: Set(cameras.id),
        }
        .insert(&db)
        .await
        .unwrap();

        let links = brand_category::Entity::find()
            .find_also_related(category::Entity)
            .all(&db)
            .await
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].1.as_ref(), Some(&cameras));
        let owners = links[0].0.find_related(brand::Entity).all(&db).await.unwrap();
        assert_eq!(owners, vec![canon.clone()]);

        assert_eq!(
            cameras.find_related(brand::Entity).all(&db).await.unwrap(),
            vec![canon]
        );
    }
}
