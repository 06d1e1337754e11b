//! Usage bookkeeping for users (MB) and groups (item count).
//!
//! Every change is a single conditional `UPDATE` whose guard is the ceiling,
//! so two writers racing for the last unit of a quota cannot both succeed:
//! the affected-row count is the admissibility verdict.

use crate::entities::{groups, prelude::*, users};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

/// Moves a user's usage by `delta` MB if the result stays within
/// `[0, user_limit]`. Returns whether the change was applied.
pub async fn reserve_user_usage<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    delta: i32,
) -> Result<bool, DbErr> {
    let candidate = Expr::col(users::Column::CurrentUsage).add(delta);

    let result = Users::update_many()
        .col_expr(
            users::Column::CurrentUsage,
            Expr::col(users::Column::CurrentUsage).add(delta),
        )
        .filter(users::Column::Id.eq(user_id))
        .filter(Expr::expr(candidate.clone()).lte(Expr::col(users::Column::UserLimit)))
        .filter(Expr::expr(candidate).gte(0))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Gives back `amount` MB of a user's usage, never going below zero.
pub async fn release_user_usage<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    amount: i32,
) -> Result<(), DbErr> {
    let result = Users::update_many()
        .col_expr(
            users::Column::CurrentUsage,
            Expr::col(users::Column::CurrentUsage).sub(amount),
        )
        .filter(users::Column::Id.eq(user_id))
        .filter(users::Column::CurrentUsage.gte(amount))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        Users::update_many()
            .col_expr(users::Column::CurrentUsage, Expr::value(0))
            .filter(users::Column::Id.eq(user_id))
            .exec(conn)
            .await?;
    }

    Ok(())
}

/// Takes one slot of a group if `current_usage + 1 <= group_limit`.
pub async fn reserve_group_slot<C: ConnectionTrait>(
    conn: &C,
    group_id: &str,
) -> Result<bool, DbErr> {
    let result = Groups::update_many()
        .col_expr(
            groups::Column::CurrentUsage,
            Expr::col(groups::Column::CurrentUsage).add(1),
        )
        .filter(groups::Column::Id.eq(group_id))
        .filter(
            Expr::expr(Expr::col(groups::Column::CurrentUsage).add(1))
                .lte(Expr::col(groups::Column::GroupLimit)),
        )
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Frees one slot of a group, never going below zero.
pub async fn release_group_slot<C: ConnectionTrait>(
    conn: &C,
    group_id: &str,
) -> Result<(), DbErr> {
    Groups::update_many()
        .col_expr(
            groups::Column::CurrentUsage,
            Expr::col(groups::Column::CurrentUsage).sub(1),
        )
        .filter(groups::Column::Id.eq(group_id))
        .filter(groups::Column::CurrentUsage.gt(0))
        .exec(conn)
        .await?;
    Ok(())
}

/// Outcome of evaluating each requested group independently.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupPlacement {
    /// Groups whose slot was taken
    pub admitted: Vec<String>,
    /// Groups already at their ceiling
    pub full: Vec<String>,
}

impl GroupPlacement {
    pub fn is_partial(&self) -> bool {
        !self.full.is_empty()
    }
}

pub async fn place_in_groups<C: ConnectionTrait>(
    conn: &C,
    group_ids: &[String],
) -> Result<GroupPlacement, DbErr> {
    let mut placement = GroupPlacement::default();
    for group_id in group_ids {
        if reserve_group_slot(conn, group_id).await? {
            placement.admitted.push(group_id.clone());
        } else {
            placement.full.push(group_id.clone());
        }
    }
    Ok(placement)
}
