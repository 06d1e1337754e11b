use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub group_name: String,
    pub is_active: bool,
    /// Maximum number of items that may reference this group
    pub group_limit: i32,
    /// Number of items currently referencing this group
    pub current_usage: i32,
    pub created_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_members::Entity")]
    GroupMembers,
    #[sea_orm(has_many = "super::item_groups::Entity")]
    ItemGroups,
}

impl Related<super::group_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupMembers.def()
    }
}

impl Related<super::item_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ItemGroups.def()
    }
}

impl Related<super::items::Entity> for Entity {
    fn to() -> RelationDef {
        super::item_groups::Relation::Items.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::item_groups::Relation::Groups.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
