pub mod prelude;

pub mod admin_settings;
pub mod group_members;
pub mod groups;
pub mod item_groups;
pub mod items;
pub mod sessions;
pub mod users;
