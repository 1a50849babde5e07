use serde_json::json;
use skatuve_dal::{
    gallery::{CreateGallery, GalleryRepository},
    update::UpdateDocument,
    Error,
};
use tracing_test::traced_test;

async fn init_db() -> skatuve_dal::Pool {
    let pool = skatuve_dal::new_pool("sqlite::memory:").await.unwrap();
    skatuve_dal::migrate(&pool).await.unwrap();
    pool
}

fn create(name: &str, event_date: &str) -> CreateGallery {
    CreateGallery {
        name: Some(name.to_string()),
        description: Some(format!("{name} description")),
        event_date: Some(event_date.to_string()),
    }
}

fn update(body: serde_json::Value) -> UpdateDocument {
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
#[traced_test]
async fn test_create_and_list_sorted() {
    let repo = GalleryRepository::new(init_db().await);

    let old = repo.create(create("Old", "2022-01-10")).await.unwrap();
    let newest = repo.create(create("Newest", "2024-06-01T20:00:00Z")).await.unwrap();
    let middle = repo.create(create("Middle", "2023-03-03")).await.unwrap();

    assert!(old.images.is_empty());
    assert_ne!(old.id, newest.id);
    assert_ne!(newest.id, middle.id);
    assert_eq!(old.created_at, old.updated_at);

    let list = repo.list().await.unwrap();
    let names: Vec<_> = list.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, ["Newest", "Middle", "Old"]);
}

#[tokio::test]
async fn test_invalid_create_writes_nothing() {
    let repo = GalleryRepository::new(init_db().await);
    let res = repo
        .create(CreateGallery {
            name: Some("No date".into()),
            description: Some("x".into()),
            event_date: None,
        })
        .await;
    assert!(matches!(res, Err(Error::ValidationError(_))));
    let res = repo.create(create("Bad date", "32.13.2024")).await;
    assert!(matches!(res, Err(Error::ValidationError(_))));
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_field_patch_keeps_other_fields() {
    let repo = GalleryRepository::new(init_db().await);
    let gallery = repo.create(create("Show", "2024-01-01")).await.unwrap();

    let updated = repo
        .update(&gallery.id, &update(json!({"name": "Renamed"})))
        .await
        .unwrap();
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.description, gallery.description);
    assert_eq!(updated.event_date, gallery.event_date);
    assert!(updated.updated_at >= gallery.updated_at);

    let fetched = repo.get(&gallery.id).await.unwrap();
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn test_push_and_pull_images() {
    let repo = GalleryRepository::new(init_db().await);
    let gallery = repo.create(create("Show", "2024-01-01")).await.unwrap();

    let img = json!({"id": "img-1", "url": "https://cdn/1.jpg", "filename": "1.jpg"});
    let updated = repo
        .update(&gallery.id, &update(json!({"$push": {"images": img}})))
        .await
        .unwrap();
    assert_eq!(updated.images.len(), 1);
    assert_eq!(updated.images[0].url, "https://cdn/1.jpg");
    assert_eq!(updated.name, "Show");

    let updated = repo
        .update(
            &gallery.id,
            &update(json!({"$push": {"images": {"url": "https://cdn/2.jpg"}}})),
        )
        .await
        .unwrap();
    assert_eq!(updated.images.len(), 2);
    assert!(!updated.images[1].id.is_empty());

    let updated = repo
        .update(&gallery.id, &update(json!({"$pull": {"images": {"id": "img-1"}}})))
        .await
        .unwrap();
    assert_eq!(updated.images.len(), 1);
    assert_eq!(updated.images[0].url, "https://cdn/2.jpg");
}

#[tokio::test]
async fn test_update_event_date_resorts() {
    let repo = GalleryRepository::new(init_db().await);
    let a = repo.create(create("A", "2024-01-01")).await.unwrap();
    repo.create(create("B", "2023-01-01")).await.unwrap();

    repo.update(&a.id, &update(json!({"eventDate": "2020-01-01"})))
        .await
        .unwrap();
    let names: Vec<_> = repo
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(names, ["B", "A"]);
}

#[tokio::test]
async fn test_rejected_updates_leave_document() {
    let repo = GalleryRepository::new(init_db().await);
    let gallery = repo.create(create("Show", "2024-01-01")).await.unwrap();

    let res = repo
        .update(&gallery.id, &update(json!({"id": "hijacked"})))
        .await;
    assert!(matches!(res, Err(Error::ImmutableField(_))));

    let res = repo
        .update(&gallery.id, &update(json!({"eventDate": "garbage"})))
        .await;
    assert!(matches!(res, Err(Error::InvalidDocument(_))));

    let res = repo
        .update(&gallery.id, &update(json!({"$push": {"name": "x"}})))
        .await;
    assert!(matches!(res, Err(Error::InvalidUpdate(_))));

    let stored = repo.get(&gallery.id).await.unwrap();
    assert_eq!(stored, gallery);
}

#[tokio::test]
async fn test_missing_records() {
    let repo = GalleryRepository::new(init_db().await);
    let gallery = repo.create(create("Show", "2024-01-01")).await.unwrap();

    assert!(matches!(repo.get("nope").await, Err(Error::RecordNotFound(_))));
    assert!(matches!(
        repo.update("nope", &update(json!({"name": "x"}))).await,
        Err(Error::RecordNotFound(_))
    ));

    repo.delete(&gallery.id).await.unwrap();
    assert!(matches!(
        repo.delete(&gallery.id).await,
        Err(Error::RecordNotFound(_))
    ));
    assert!(matches!(
        repo.get(&gallery.id).await,
        Err(Error::RecordNotFound(_))
    ));
}
