use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub object_key: String,
    #[sea_orm(column_type = "Text")]
    pub url: String,
    pub mime_type: String,
    pub file_name: String,
    /// Whole megabytes, rounded up
    pub size: i32,
    /// MB of `size` counted against the creator's usage. Zero for items
    /// uploaded by an admin.
    pub charged_mb: i32,
    pub creator_id: String,
    pub creator_username: String,
    pub created_at: DateTimeUtc,
    pub last_access: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatorId",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(has_many = "super::item_groups::Entity")]
    ItemGroups,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::item_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ItemGroups.def()
    }
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        super::item_groups::Relation::Groups.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::item_groups::Relation::Items.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
