use crate::AppState;
use crate::api::error::{AppError, OrRedirect};
use crate::api::flash::{self, FlashRedirect, Page};
use crate::api::middleware::auth::{CurrentUser, OwnedItem};
use crate::entities::{groups, prelude::*};
use crate::services::item_service::{
    ItemDetails, ItemSubmission, ItemView, ItemWriteOutcome, UploadedFile, too_large,
};
use crate::services::membership::MembershipService;
use axum::{
    Extension,
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use bytes::BytesMut;
use sea_orm::{EntityTrait, ModelTrait, QueryOrder};
use serde::Serialize;
use utoipa::ToSchema;

const FILE_FIELD: &str = "userFile";

#[derive(Serialize, ToSchema)]
pub struct ItemIndexView {
    pub items: Vec<ItemView>,
    /// Groups the current user may place items in
    #[schema(value_type = Vec<Object>)]
    pub groups: Vec<groups::Model>,
    pub item_size_limit_mb: i32,
}

#[derive(Serialize, ToSchema)]
pub struct ItemFormView {
    #[schema(value_type = Option<Object>)]
    pub item: Option<crate::entities::items::Model>,
    pub selected_groups: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub groups: Vec<groups::Model>,
    pub item_size_limit_mb: i32,
}

/// Buffers an item form. A file over `limit_mb` is reported as such; a
/// missing or empty file leaves `file` unset.
async fn read_item_form(
    multipart: &mut Multipart,
    limit_mb: i32,
) -> Result<ItemSubmission, AppError> {
    let limit_bytes = limit_mb as usize * 1024 * 1024;
    let mut name = String::new();
    let mut description = String::new();
    let mut group_ids = Vec::new();
    let mut file = None;
    let mut oversized = false;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = field.text().await.map_err(|e| AppError::Validation(e.body_text()))?,
            "description" => {
                description = field.text().await.map_err(|e| AppError::Validation(e.body_text()))?
            }
            "groups" => {
                let id = field.text().await.map_err(|e| AppError::Validation(e.body_text()))?;
                if !id.trim().is_empty() {
                    group_ids.push(id.trim().to_string());
                }
            }
            FILE_FIELD => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let declared_type = field.content_type().map(|s| s.to_string());
                let mut data = BytesMut::new();

                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?
                {
                    if oversized {
                        continue;
                    }
                    if data.len() + chunk.len() > limit_bytes {
                        oversized = true;
                        data.clear();
                        continue;
                    }
                    data.extend_from_slice(&chunk);
                }

                if !oversized && !file_name.is_empty() && !data.is_empty() {
                    let data = data.freeze();
                    let content_type = declared_type
                        .filter(|t| t != mime::APPLICATION_OCTET_STREAM.as_ref())
                        .or_else(|| infer::get(&data).map(|t| t.mime_type().to_string()))
                        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());
                    file = Some(UploadedFile {
                        file_name,
                        content_type,
                        data,
                    });
                }
            }
            other => tracing::debug!("Ignoring unexpected form field '{}'", other),
        }
    }

    if oversized {
        return Err(too_large(limit_mb));
    }

    Ok(ItemSubmission {
        details: ItemDetails::new(&name, &description),
        group_ids,
        file,
    })
}

fn write_flash(outcome: &ItemWriteOutcome, to: String, success: &str, partial: &str) -> Response {
    if outcome.is_partial() {
        FlashRedirect::success(to, partial).into_response()
    } else {
        FlashRedirect::success(to, success).into_response()
    }
}

#[utoipa::path(
    get,
    path = "/home",
    responses(
        (status = 200, description = "All items with their groups", body = ItemIndexView),
        (status = 303, description = "Not logged in")
    ),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Page<ItemIndexView>, Response> {
    if user.is_admin {
        MembershipService::sync_admin_groups(&state.db)
            .await
            .map_err(AppError::from)
            .or_redirect("/")?;
    }

    let items = state.items.list_items().await.or_redirect("/")?;
    let groups = MembershipService::groups_of(&state.db, &user)
        .await
        .map_err(AppError::from)
        .or_redirect("/")?;
    let item_size_limit_mb = state.items.item_size_limit_mb().await.or_redirect("/")?;

    Ok(Page::new(
        "items/index",
        flash::take(&jar),
        ItemIndexView {
            items,
            groups,
            item_size_limit_mb,
        },
    ))
}

pub async fn new_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Page<ItemFormView>, AppError> {
    let groups = MembershipService::groups_of(&state.db, &user).await?;
    Ok(Page::new(
        "items/new",
        flash::take(&jar),
        ItemFormView {
            item: None,
            selected_groups: Vec::new(),
            groups,
            item_size_limit_mb: state.items.item_size_limit_mb().await?,
        },
    ))
}

#[utoipa::path(
    post,
    path = "/home",
    request_body(content = Multipart, description = "name, description, repeated groups, userFile"),
    responses(
        (status = 303, description = "Redirect with a flash message describing the outcome")
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Response, Response> {
    let limit_mb = state.items.item_size_limit_mb().await.or_redirect("/home/new")?;
    let submission = read_item_form(&mut multipart, limit_mb)
        .await
        .or_redirect("/home/new")?;

    let outcome = state
        .items
        .create_item(&user, submission)
        .await
        .or_redirect("/home/new")?;

    Ok(write_flash(
        &outcome,
        "/home".to_string(),
        "Item successfully added.",
        "Item added, however one or more groups exceeded limit.",
    ))
}

#[utoipa::path(
    get,
    path = "/home/{id}",
    params(("id" = String, Path, description = "Item id")),
    responses(
        (status = 200, description = "The item and its groups", body = ItemView),
        (status = 303, description = "Item not found")
    ),
    tag = "items"
)]
pub async fn show_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Page<ItemView>, AppError> {
    let view = state.items.show_item(&id).await?;
    Ok(Page::new("items/show", flash::take(&jar), view))
}

pub async fn edit_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Extension(OwnedItem(item)): Extension<OwnedItem>,
    jar: CookieJar,
) -> Result<Page<ItemFormView>, AppError> {
    let groups = if user.is_admin {
        Groups::find()
            .order_by_asc(groups::Column::GroupName)
            .all(&state.db)
            .await?
    } else {
        MembershipService::groups_of(&state.db, &user).await?
    };
    let selected_groups = item
        .find_related(Groups)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|g| g.id)
        .collect();

    Ok(Page::new(
        "items/edit",
        flash::take(&jar),
        ItemFormView {
            item: Some(item),
            selected_groups,
            groups,
            item_size_limit_mb: state.items.item_size_limit_mb().await?,
        },
    ))
}

#[utoipa::path(
    put,
    path = "/home/{id}",
    params(("id" = String, Path, description = "Item id")),
    request_body(content = Multipart, description = "name, description, repeated groups, userFile"),
    responses(
        (status = 303, description = "Redirect with a flash message describing the outcome")
    ),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Extension(OwnedItem(item)): Extension<OwnedItem>,
    mut multipart: Multipart,
) -> Result<Response, Response> {
    let back = format!("/home/{}/edit", item.id);
    let limit_mb = state.items.item_size_limit_mb().await.or_redirect(&back)?;
    let submission = read_item_form(&mut multipart, limit_mb)
        .await
        .or_redirect(&back)?;

    let outcome = state
        .items
        .update_item(&user, &item, submission)
        .await
        .or_redirect(&back)?;

    if user.is_admin {
        MembershipService::sync_admin_groups(&state.db)
            .await
            .map_err(AppError::from)
            .or_redirect(&back)?;
    }

    Ok(write_flash(
        &outcome,
        format!("/home/{}", outcome.item.id),
        "Item updated successfully.",
        "Item updated, however one or more groups exceeded limit.",
    ))
}

#[utoipa::path(
    delete,
    path = "/home/{id}",
    params(("id" = String, Path, description = "Item id")),
    responses(
        (status = 303, description = "Redirect to /home")
    ),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Extension(OwnedItem(item)): Extension<OwnedItem>,
) -> Result<FlashRedirect, AppError> {
    state.items.delete_item(&user, &item.id).await?;
    Ok(FlashRedirect::success("/home", "Successfully deleted item"))
}
