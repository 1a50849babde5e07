//! Client side view of resources kept by the external content service.

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use skatuve_dal::update::UpdateDocument;
use skatuve_types::content::{
    AboutText, Partner, PiedavajumiHeader, PiedavajumsSection, TeamMember, Testimonial,
};
use tracing::debug;
use url::Url;

use crate::error::{check_response, Result};

pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection path relative to the service base URL.
    const PATH: &'static str;

    fn id(&self) -> &str;
}

macro_rules! resource {
    ($ty:ty, $path:literal) => {
        impl Resource for $ty {
            const PATH: &'static str = $path;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

resource!(TeamMember, "team");
resource!(Testimonial, "testimonials");
resource!(Partner, "partners");
resource!(AboutText, "about");
resource!(PiedavajumiHeader, "piedavajumi-header");
resource!(PiedavajumsSection, "piedavajumi");

/// Base URL with a trailing slash, so relative joins append instead of replace.
pub(crate) fn normalize_base(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Remote collection with a local copy of the last known state.
///
/// The copy is refreshed by [`CachedRepository::list`] and kept in step with
/// every successful mutation made through this repository.
pub struct CachedRepository<R> {
    client: Client,
    base_url: Url,
    cache: Vec<R>,
}

impl<R: Resource> CachedRepository<R> {
    pub fn new(client: Client, base_url: &Url) -> Self {
        CachedRepository {
            client,
            base_url: normalize_base(base_url),
            cache: Vec::new(),
        }
    }

    fn collection_url(&self) -> Result<Url> {
        Ok(self.base_url.join(R::PATH)?)
    }

    fn item_url(&self, id: &str) -> Result<Url> {
        Ok(self.base_url.join(&format!("{}/{}", R::PATH, id))?)
    }

    pub async fn list(&mut self) -> Result<&[R]> {
        let url = self.collection_url()?;
        debug!("Fetching {url}");
        let response = check_response(self.client.get(url).send().await?).await?;
        self.cache = response.json().await?;
        Ok(&self.cache)
    }

    pub fn cached(&self) -> &[R] {
        &self.cache
    }

    pub(crate) fn cached_mut(&mut self) -> &mut Vec<R> {
        &mut self.cache
    }

    pub async fn create<B: Serialize + ?Sized>(&mut self, body: &B) -> Result<R> {
        let response = self
            .client
            .post(self.collection_url()?)
            .json(body)
            .send()
            .await?;
        let created: R = check_response(response).await?.json().await?;
        self.cache.push(created.clone());
        Ok(created)
    }

    /// Sends the update without touching the local copy.
    pub async fn send_update(&self, id: &str, update: &UpdateDocument) -> Result<R> {
        let response = self
            .client
            .put(self.item_url(id)?)
            .json(update)
            .send()
            .await?;
        Ok(check_response(response).await?.json().await?)
    }

    pub async fn update(&mut self, id: &str, update: &UpdateDocument) -> Result<R> {
        let updated = self.send_update(id, update).await?;
        match self.cache.iter_mut().find(|r| r.id() == id) {
            Some(slot) => *slot = updated.clone(),
            None => self.cache.push(updated.clone()),
        }
        Ok(updated)
    }

    pub async fn delete(&mut self, id: &str) -> Result<()> {
        let response = self.client.delete(self.item_url(id)?).send().await?;
        check_response(response).await?;
        self.cache.retain(|r| r.id() != id);
        Ok(())
    }
}
