//! Handlers for generation history: grouped listing, deletion, and bulk
//! archive export.

use std::io::{Cursor, Write};

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use zip::write::SimpleFileOptions;

use fotogen_core::grouping::{group_by_key, group_key, parse_group_key, GroupKey};
use fotogen_core::result_encoding::decode_result_urls;
use fotogen_core::types::{DbId, Timestamp};
use fotogen_db::models::generation::Generation;
use fotogen_db::repositories::GenerationRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

/// One displayable result image with its before/after counterpart.
#[derive(Debug, Serialize)]
pub struct GroupImage {
    pub url: String,
    pub input_image_url: Option<String>,
}

/// One logical batch in the history view.
#[derive(Debug, Serialize)]
pub struct GroupView {
    /// Batch id, or the synthetic single-record key.
    pub id: String,
    /// Creation time of the first-seen member.
    pub date: Timestamp,
    /// Member records in scan order.
    pub items: Vec<Generation>,
    /// Expanded result images across all members.
    pub images: Vec<GroupImage>,
}

/// Expand one record's stored result into displayable images.
fn expand_images(record: &Generation) -> Vec<GroupImage> {
    let stored = record.result_image_url.as_deref().unwrap_or_default();
    decode_result_urls(stored)
        .into_iter()
        .filter(|url| !url.is_empty())
        .map(|url| GroupImage {
            url,
            input_image_url: record.input_image_url.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// GET /generations
// ---------------------------------------------------------------------------

/// The caller's full history, partitioned into batch groups, newest first.
pub async fn list_generations(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let records = GenerationRepo::list_by_user(&state.pool, user.user_id).await?;

    let groups: Vec<GroupView> = group_by_key(records, |g| group_key(g.batch_id.as_ref(), g.id))
        .into_iter()
        .map(|group| {
            let images = group.items.iter().flat_map(expand_images).collect();
            GroupView {
                id: group.key,
                date: group.items[0].created_at,
                items: group.items,
                images,
            }
        })
        .collect();

    Ok(Json(DataResponse { data: groups }))
}

// ---------------------------------------------------------------------------
// DELETE /generations/{id}
// ---------------------------------------------------------------------------

/// Delete one record, scoped to the caller.
pub async fn delete_generation(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = GenerationRepo::delete_for_user(&state.pool, user.user_id, id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Generation {id} not found")));
    }

    tracing::info!(generation_id = id, user_id = user.user_id, "Generation deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// DELETE /generations/groups/{key}
// ---------------------------------------------------------------------------

/// Delete every member of a group, scoped to the caller.
pub async fn delete_group(
    user: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let deleted = match parse_group_key(&key) {
        Some(GroupKey::Single(id)) => {
            GenerationRepo::delete_for_user(&state.pool, user.user_id, id).await? as u64
        }
        Some(GroupKey::Batch(batch_id)) => {
            GenerationRepo::delete_batch_for_user(&state.pool, user.user_id, &batch_id).await?
        }
        None => 0,
    };

    if deleted == 0 {
        return Err(AppError::NotFound(format!("Group {key} not found")));
    }

    tracing::info!(
        group = %key,
        records = deleted,
        user_id = user.user_id,
        "Generation group deleted",
    );
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// GET /generations/groups/{key}/archive
// ---------------------------------------------------------------------------

/// Name of the downloaded archive.
const ARCHIVE_FILENAME: &str = "batch-export.zip";

/// Bundle every result image of a group into one zip download.
///
/// Images are numbered sequentially across the whole group under a
/// date-stamped folder. Input images are not included. Any single fetch
/// failure aborts the export — no partial archives.
pub async fn export_group(
    user: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let records = match parse_group_key(&key) {
        Some(GroupKey::Single(id)) => {
            GenerationRepo::find_for_user(&state.pool, user.user_id, id)
                .await?
                .map(|g| vec![g])
                .unwrap_or_default()
        }
        Some(GroupKey::Batch(batch_id)) => {
            GenerationRepo::list_batch_for_user(&state.pool, user.user_id, &batch_id).await?
        }
        None => Vec::new(),
    };

    if records.is_empty() {
        return Err(AppError::NotFound(format!("Group {key} not found")));
    }

    let urls: Vec<String> = records
        .iter()
        .flat_map(expand_images)
        .map(|img| img.url)
        .collect();
    if urls.is_empty() {
        return Err(AppError::NotFound(format!(
            "Group {key} has no downloadable images"
        )));
    }

    let folder = format!("batch-{}", records[0].created_at.format("%Y-%m-%d"));
    let client = reqwest::Client::new();

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (i, url) in urls.iter().enumerate() {
        let bytes = fetch_image(&client, url).await?;
        writer
            .start_file(format!("{folder}/image_{}.png", i + 1), options)
            .map_err(|e| AppError::InternalError(format!("Archive write failed: {e}")))?;
        writer
            .write_all(&bytes)
            .map_err(|e| AppError::InternalError(format!("Archive write failed: {e}")))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| AppError::InternalError(format!("Archive finalize failed: {e}")))?;
    let archive = cursor.into_inner();

    tracing::info!(
        group = %key,
        images = urls.len(),
        bytes = archive.len(),
        user_id = user.user_id,
        "Group archive exported",
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{ARCHIVE_FILENAME}\""),
            ),
        ],
        archive,
    ))
}

/// Fetch one result image, mapping any failure to an export-aborting error.
async fn fetch_image(client: &reqwest::Client, url: &str) -> AppResult<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to fetch {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "Failed to fetch {url}: HTTP {}",
            response.status()
        )));
    }

    Ok(response
        .bytes()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to read {url}: {e}")))?
        .to_vec())
}
