use crate::api::error::AppError;
use crate::config::DEFAULT_GROUP_NAME;
use crate::entities::{group_members, groups, prelude::*, users};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};

pub struct MembershipService;

impl MembershipService {
    /// Validates requested group ids against the catalog and appends the
    /// default group. Duplicates are dropped, request order is kept.
    pub async fn resolve_selection<C: ConnectionTrait>(
        conn: &C,
        requested: &[String],
    ) -> Result<Vec<groups::Model>, AppError> {
        let mut ids: Vec<&String> = Vec::new();
        for id in requested.iter().filter(|id| !id.is_empty()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        let found = if ids.is_empty() {
            Vec::new()
        } else {
            Groups::find()
                .filter(groups::Column::Id.is_in(ids.iter().map(|id| id.as_str())))
                .all(conn)
                .await?
        };

        let mut selection = Vec::with_capacity(ids.len() + 1);
        for id in ids {
            match found.iter().find(|g| &g.id == id) {
                Some(group) => selection.push(group.clone()),
                None => {
                    return Err(AppError::Validation(
                        "One of the selected groups does not exist.".to_string(),
                    ));
                }
            }
        }

        if let Some(default) = Self::default_group(conn).await? {
            if !selection.iter().any(|g| g.id == default.id) {
                selection.push(default);
            }
        }

        Ok(selection)
    }

    pub async fn default_group<C: ConnectionTrait>(conn: &C) -> Result<Option<groups::Model>, DbErr> {
        Groups::find()
            .filter(groups::Column::GroupName.eq(DEFAULT_GROUP_NAME))
            .one(conn)
            .await
    }

    /// Replaces a user's memberships with exactly `group_ids`.
    pub async fn replace_memberships<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
        group_ids: &[String],
    ) -> Result<(), DbErr> {
        GroupMembers::delete_many()
            .filter(group_members::Column::UserId.eq(user_id))
            .exec(conn)
            .await?;

        if group_ids.is_empty() {
            return Ok(());
        }

        let rows = group_ids.iter().map(|group_id| group_members::ActiveModel {
            user_id: Set(user_id.to_string()),
            group_id: Set(group_id.clone()),
        });
        GroupMembers::insert_many(rows)
            .exec_without_returning(conn)
            .await?;
        Ok(())
    }

    pub async fn groups_of<C: ConnectionTrait>(
        conn: &C,
        user: &users::Model,
    ) -> Result<Vec<groups::Model>, DbErr> {
        user.find_related(Groups)
            .order_by_asc(groups::Column::GroupName)
            .all(conn)
            .await
    }

    /// Makes every admin a member of exactly the active groups.
    pub async fn sync_admin_groups<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
        let active_ids: Vec<String> = Groups::find()
            .filter(groups::Column::IsActive.eq(true))
            .all(conn)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();

        let admins = Users::find()
            .filter(users::Column::IsAdmin.eq(true))
            .all(conn)
            .await?;

        for admin in &admins {
            Self::replace_memberships(conn, &admin.id, &active_ids).await?;
        }

        tracing::debug!(
            "Synced {} admin(s) into {} active group(s)",
            admins.len(),
            active_ids.len()
        );
        Ok(())
    }
}
