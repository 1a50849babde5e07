use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skatuve_types::date::{self, flexible};
use time::OffsetDateTime;
use tracing::debug;

use crate::{
    error::{Error, Result},
    update::UpdateDocument,
    Pool,
};

/// Fields that keep their value for the whole life of a gallery.
pub const IMMUTABLE_FIELDS: &[&str] = &["id", "createdAt"];

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default = "new_id")]
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default = "date::now", with = "flexible")]
    pub uploaded_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gallery {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(with = "flexible")]
    pub event_date: OffsetDateTime,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(with = "flexible")]
    pub created_at: OffsetDateTime,
    #[serde(with = "flexible")]
    pub updated_at: OffsetDateTime,
}

/// Creation payload as received, all fields are checked in [`CreateGallery::validated`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGallery {
    #[garde(required, length(min = 1, max = 255))]
    pub name: Option<String>,
    #[garde(required, length(min = 1))]
    pub description: Option<String>,
    #[garde(required, length(min = 1))]
    pub event_date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewGallery {
    pub name: String,
    pub description: String,
    pub event_date: OffsetDateTime,
}

impl CreateGallery {
    pub fn validated(self) -> Result<NewGallery> {
        self.validate()?;
        let (Some(name), Some(description), Some(event_date)) =
            (self.name, self.description, self.event_date)
        else {
            return Err(Error::ValidationError(
                "name, description and eventDate are required".to_string(),
            ));
        };
        let event_date = date::parse_date(&event_date).map_err(|e| {
            debug!("Rejected event date {event_date:?}");
            Error::ValidationError(format!("eventDate: {e}"))
        })?;
        Ok(NewGallery {
            name,
            description,
            event_date,
        })
    }
}

fn timestamp_millis(dt: OffsetDateTime) -> i64 {
    (dt.unix_timestamp_nanos() / 1_000_000) as i64
}

#[derive(Debug, sqlx::FromRow)]
struct GalleryRow {
    document: String,
}

impl GalleryRow {
    fn into_gallery(self) -> Result<Gallery> {
        Ok(serde_json::from_str(&self.document)?)
    }
}

pub struct GalleryRepository {
    pool: Pool,
}

impl GalleryRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// All galleries, most recent event first.
    pub async fn list(&self) -> Result<Vec<Gallery>> {
        let rows: Vec<GalleryRow> = sqlx::query_as(
            "SELECT document FROM gallery ORDER BY event_date DESC, internal_id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(GalleryRow::into_gallery).collect()
    }

    pub async fn create(&self, payload: CreateGallery) -> Result<Gallery> {
        let new_gallery = payload.validated()?;
        let now = date::now();
        let gallery = Gallery {
            id: new_id(),
            name: new_gallery.name,
            description: new_gallery.description,
            event_date: new_gallery.event_date,
            images: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let document = serde_json::to_string(&gallery)?;
        sqlx::query("INSERT INTO gallery (id, event_date, created, document) VALUES (?, ?, ?, ?)")
            .bind(&gallery.id)
            .bind(timestamp_millis(gallery.event_date))
            .bind(timestamp_millis(gallery.created_at))
            .bind(&document)
            .execute(&self.pool)
            .await?;
        debug!("Created gallery {}", gallery.id);
        Ok(gallery)
    }

    pub async fn get(&self, id: &str) -> Result<Gallery> {
        let row: Option<GalleryRow> = sqlx::query_as("SELECT document FROM gallery WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or_else(|| Error::RecordNotFound(format!("Gallery {id}")))?
            .into_gallery()
    }

    /// Applies `update` to the stored document and returns the result.
    ///
    /// The updated document must still be a valid gallery and must keep its
    /// [immutable fields](IMMUTABLE_FIELDS); `updatedAt` is refreshed.
    pub async fn update(&self, id: &str, update: &UpdateDocument) -> Result<Gallery> {
        let mut transaction = self.pool.begin().await?;
        let row: Option<GalleryRow> = sqlx::query_as("SELECT document FROM gallery WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *transaction)
            .await?;
        let row = row.ok_or_else(|| Error::RecordNotFound(format!("Gallery {id}")))?;

        let original: Value = serde_json::from_str(&row.document)?;
        let mut document = original.clone();
        update.apply(&mut document)?;
        for field in IMMUTABLE_FIELDS {
            if document.get(field) != original.get(field) {
                return Err(Error::ImmutableField(field.to_string()));
            }
        }
        let mut gallery: Gallery =
            serde_json::from_value(document).map_err(|e| Error::InvalidDocument(e.to_string()))?;
        gallery.updated_at = date::now();

        sqlx::query("UPDATE gallery SET document = ?, event_date = ? WHERE id = ?")
            .bind(serde_json::to_string(&gallery)?)
            .bind(timestamp_millis(gallery.event_date))
            .bind(id)
            .execute(&mut *transaction)
            .await?;
        transaction.commit().await?;
        debug!("Updated gallery {id}, raw expression: {}", update.is_raw());
        Ok(gallery)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let res = sqlx::query("DELETE FROM gallery WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound(format!("Gallery {id}")))
        } else {
            Ok(())
        }
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM gallery")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_validation() {
        let ok = CreateGallery {
            name: Some("Show".into()),
            description: Some("Photos".into()),
            event_date: Some("2024-05-01".into()),
        };
        assert!(ok.validated().is_ok());

        let missing = CreateGallery {
            name: Some("Show".into()),
            description: None,
            event_date: Some("2024-05-01".into()),
        };
        assert!(matches!(missing.validated(), Err(Error::ValidationError(_))));

        let empty = CreateGallery {
            name: Some("".into()),
            description: Some("Photos".into()),
            event_date: Some("2024-05-01".into()),
        };
        assert!(matches!(empty.validated(), Err(Error::ValidationError(_))));

        let bad_date = CreateGallery {
            name: Some("Show".into()),
            description: Some("Photos".into()),
            event_date: Some("not a date".into()),
        };
        assert!(matches!(bad_date.validated(), Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_image_defaults() {
        let image: Image = serde_json::from_str(r#"{"url": "https://img/1.jpg"}"#).unwrap();
        assert!(!image.id.is_empty());
        assert_eq!(image.filename, "");
        assert!(serde_json::from_str::<Image>(r#"{"filename": "x.jpg"}"#).is_err());
    }

    #[test]
    fn test_gallery_json_shape() {
        let now = date::now();
        let gallery = Gallery {
            id: "g1".into(),
            name: "Show".into(),
            description: "Photos".into(),
            event_date: now,
            images: vec![],
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&gallery).unwrap();
        for key in ["id", "name", "description", "eventDate", "images", "createdAt", "updatedAt"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value["eventDate"].as_str().unwrap().ends_with('Z'));
    }
}
