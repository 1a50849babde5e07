use axum::{
    extract::Path,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use skatuve_dal::{
    gallery::{CreateGallery, GalleryRepository},
    update::UpdateDocument,
};
use tracing::debug;

use super::method_not_allowed;
use crate::{
    error::{ApiJson, ApiResult},
    repository_from_request,
    state::AppState,
};

repository_from_request!(GalleryRepository);

pub const COLLECTION_METHODS: &[Method] = &[Method::GET, Method::POST];
pub const ITEM_METHODS: &[Method] = &[Method::GET, Method::PUT, Method::DELETE];

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

pub async fn list(repository: GalleryRepository) -> ApiResult<impl IntoResponse> {
    let galleries = repository.list().await?;
    Ok((StatusCode::OK, Json(galleries)))
}

pub async fn create(
    repository: GalleryRepository,
    ApiJson(payload): ApiJson<CreateGallery>,
) -> ApiResult<impl IntoResponse> {
    let gallery = repository.create(payload).await?;
    Ok((StatusCode::CREATED, Json(gallery)))
}

pub async fn get_one(
    Path(id): Path<String>,
    repository: GalleryRepository,
) -> ApiResult<impl IntoResponse> {
    let gallery = repository.get(&id).await?;
    Ok((StatusCode::OK, Json(gallery)))
}

pub async fn update(
    Path(id): Path<String>,
    repository: GalleryRepository,
    ApiJson(update): ApiJson<UpdateDocument>,
) -> ApiResult<impl IntoResponse> {
    debug!("Updating gallery {id} with {update:?}");
    let gallery = repository.update(&id, &update).await?;
    Ok((StatusCode::OK, Json(gallery)))
}

pub async fn delete(
    Path(id): Path<String>,
    repository: GalleryRepository,
) -> ApiResult<impl IntoResponse> {
    repository.delete(&id).await?;
    Ok((
        StatusCode::OK,
        Json(DeleteResponse {
            message: format!("Gallery {id} deleted"),
        }),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list)
                .post(create)
                .fallback(|method: Method| async move {
                    method_not_allowed(method, COLLECTION_METHODS)
                }),
        )
        .route(
            "/{id}",
            get(get_one)
                .put(update)
                .delete(delete)
                .fallback(|method: Method| async move {
                    method_not_allowed(method, ITEM_METHODS)
                }),
        )
}
