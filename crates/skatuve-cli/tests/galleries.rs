use reqwest::{Client, StatusCode};
use serde_json::json;
use skatuve_app::{
    api_router,
    state::{AppConfig, AppState},
};
use skatuve_cli::{galleries::GalleryClient, ClientError};
use skatuve_dal::{gallery::CreateGallery, ConnectionCache, DbConfig};
use tracing_test::traced_test;
use url::Url;

async fn start_api() -> GalleryClient {
    let state = AppState::new(
        ConnectionCache::new(DbConfig::new("sqlite::memory:")),
        AppConfig::default(),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, api_router(state)).await.unwrap();
    });
    let url = Url::parse(&format!("http://{addr}")).unwrap();
    GalleryClient::new(Client::new(), &url)
}

fn new_gallery(name: &str, event_date: &str) -> CreateGallery {
    CreateGallery {
        name: Some(name.to_string()),
        description: Some("Photos".to_string()),
        event_date: Some(event_date.to_string()),
    }
}

#[tokio::test]
#[traced_test]
async fn test_gallery_lifecycle() {
    let client = start_api().await;

    let gallery = client.create(&new_gallery("Premiere", "2024-04-04")).await.unwrap();
    client.create(&new_gallery("Older", "2023-04-04")).await.unwrap();

    let list = client.list().await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, gallery.id);

    let updated = client
        .add_image(&gallery.id, "https://cdn/a.jpg", Some("a.jpg"))
        .await
        .unwrap();
    assert_eq!(updated.images.len(), 1);
    assert_eq!(updated.images[0].filename, "a.jpg");

    let image_id = updated.images[0].id.clone();
    let updated = client.remove_image(&gallery.id, &image_id).await.unwrap();
    assert!(updated.images.is_empty());

    let update = serde_json::from_value(json!({"description": "Changed"})).unwrap();
    let updated = client.update(&gallery.id, &update).await.unwrap();
    assert_eq!(updated.description, "Changed");
    assert_eq!(client.get(&gallery.id).await.unwrap(), updated);

    let message = client.delete(&gallery.id).await.unwrap();
    assert!(message.contains(&gallery.id));
    let err = client.get(&gallery.id).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_validation_error_is_reported() {
    let client = start_api().await;
    let err = client
        .create(&new_gallery("Bad", "not a date"))
        .await
        .unwrap_err();
    match err {
        ClientError::Api { status, error, .. } => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(error, "ValidationError");
        }
        other => panic!("Unexpected error {other:?}"),
    }
}
