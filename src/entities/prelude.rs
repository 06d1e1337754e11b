pub use super::admin_settings::Entity as AdminSettings;
pub use super::group_members::Entity as GroupMembers;
pub use super::groups::Entity as Groups;
pub use super::item_groups::Entity as ItemGroups;
pub use super::items::Entity as Items;
pub use super::sessions::Entity as Sessions;
pub use super::users::Entity as Users;
