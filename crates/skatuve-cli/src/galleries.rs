use reqwest::Client;
use serde_json::json;
use skatuve_app::rest_api::gallery::DeleteResponse;
use skatuve_dal::{
    gallery::{CreateGallery, Gallery},
    update::{Operator, UpdateDocument},
};
use url::Url;

use crate::{
    error::{check_response, Result},
    remote::normalize_base,
};

const GALLERIES_PATH: &str = "api/galleries";

pub struct GalleryClient {
    client: Client,
    base_url: Url,
}

impl GalleryClient {
    pub fn new(client: Client, base_url: &Url) -> Self {
        GalleryClient {
            client,
            base_url: normalize_base(base_url),
        }
    }

    fn collection_url(&self) -> Result<Url> {
        Ok(self.base_url.join(GALLERIES_PATH)?)
    }

    fn item_url(&self, id: &str) -> Result<Url> {
        Ok(self.base_url.join(&format!("{GALLERIES_PATH}/{id}"))?)
    }

    pub async fn list(&self) -> Result<Vec<Gallery>> {
        let response = self.client.get(self.collection_url()?).send().await?;
        Ok(check_response(response).await?.json().await?)
    }

    pub async fn get(&self, id: &str) -> Result<Gallery> {
        let response = self.client.get(self.item_url(id)?).send().await?;
        Ok(check_response(response).await?.json().await?)
    }

    pub async fn create(&self, gallery: &CreateGallery) -> Result<Gallery> {
        let response = self
            .client
            .post(self.collection_url()?)
            .json(gallery)
            .send()
            .await?;
        Ok(check_response(response).await?.json().await?)
    }

    pub async fn update(&self, id: &str, update: &UpdateDocument) -> Result<Gallery> {
        let response = self
            .client
            .put(self.item_url(id)?)
            .json(update)
            .send()
            .await?;
        Ok(check_response(response).await?.json().await?)
    }

    pub async fn delete(&self, id: &str) -> Result<String> {
        let response = self.client.delete(self.item_url(id)?).send().await?;
        let body: DeleteResponse = check_response(response).await?.json().await?;
        Ok(body.message)
    }

    /// Appends an already hosted image to the gallery.
    pub async fn add_image(&self, id: &str, url: &str, filename: Option<&str>) -> Result<Gallery> {
        let mut image = json!({ "url": url });
        if let Some(filename) = filename {
            image["filename"] = json!(filename);
        }
        let update = UpdateDocument::operation(Operator::Push, "images", image);
        self.update(id, &update).await
    }

    pub async fn remove_image(&self, id: &str, image_id: &str) -> Result<Gallery> {
        let update = UpdateDocument::operation(Operator::Pull, "images", json!({ "id": image_id }));
        self.update(id, &update).await
    }
}
