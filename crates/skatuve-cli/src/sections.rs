//! Offerings ("piedavajumi") sections and their manual ordering.
//!
//! The content service only stores an `order` number per section, so every
//! move rewrites the whole sequence: one `PUT {"order": n}` per section, sent
//! concurrently, followed by a fresh fetch. If any write fails the reorder
//! fails as a whole; writes that already went through are not undone.

use futures::future::try_join_all;
use reqwest::Client;
use skatuve_dal::update::UpdateDocument;
use skatuve_types::{
    content::{NewPiedavajumsSection, PiedavajumsSection},
    ordering::{self, Direction},
};
use tracing::{debug, info};
use url::Url;

use crate::{error::Result, remote::CachedRepository};

pub struct SectionBoard {
    repository: CachedRepository<PiedavajumsSection>,
}

impl SectionBoard {
    pub fn new(client: Client, base_url: &Url) -> Self {
        SectionBoard {
            repository: CachedRepository::new(client, base_url),
        }
    }

    /// Sections in display order, as last fetched.
    pub fn sections(&self) -> &[PiedavajumsSection] {
        self.repository.cached()
    }

    pub async fn refresh(&mut self) -> Result<&[PiedavajumsSection]> {
        self.repository.list().await?;
        ordering::sort_items(self.repository.cached_mut());
        Ok(self.repository.cached())
    }

    /// Creates a section, placed last unless it carries an explicit order.
    pub async fn add(&mut self, mut section: NewPiedavajumsSection) -> Result<PiedavajumsSection> {
        if section.order.is_none() {
            section.order = Some(ordering::next_order(self.sections()));
        }
        let created = self.repository.create(&section).await?;
        ordering::sort_items(self.repository.cached_mut());
        Ok(created)
    }

    pub async fn move_section(&mut self, id: &str, direction: Direction) -> Result<()> {
        let sequence = ordering::moved_sequence(self.sections(), id, direction)?;
        debug!("Moving section {id} {direction:?}");
        self.reorder(&sequence).await
    }

    /// Assigns every section its position in `ids`, then re-fetches.
    pub async fn reorder(&mut self, ids: &[String]) -> Result<()> {
        let assignments = ordering::reorder_assignments(self.sections(), ids)?;
        let repository = &self.repository;
        let writes = assignments.into_iter().map(|(id, order)| async move {
            let update = UpdateDocument::set("order", order);
            repository.send_update(&id, &update).await
        });
        try_join_all(writes).await?;
        info!("Reordered {} sections", ids.len());
        self.refresh().await?;
        Ok(())
    }
}
