use clap::{Parser, Subcommand};
use reqwest::Client;
use skatuve_dal::{gallery::CreateGallery, update::UpdateDocument};

use super::{print_json, Executor};
use crate::{config::ApiArgs, galleries::GalleryClient};

#[derive(Parser, Debug)]
pub struct GalleryCmd {
    #[command(flatten)]
    api: ApiArgs,
    #[command(subcommand)]
    action: GalleryAction,
}

#[derive(Subcommand, Debug)]
pub enum GalleryAction {
    /// List galleries, most recent event first
    List,
    Show {
        id: String,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long, help = "Event date, e.g. 2024-05-01 or 2024-05-01T19:00:00Z")]
        event_date: String,
    },
    /// Update with a JSON body, either plain fields or an operator expression
    Update {
        id: String,
        #[arg(help = r#"e.g. '{"name": "New name"}' or '{"$pop": {"images": 1}}'"#)]
        body: String,
    },
    Delete {
        id: String,
    },
    AddImage {
        id: String,
        #[arg(long, help = "Public URL of an already uploaded image")]
        url: String,
        #[arg(long)]
        filename: Option<String>,
    },
    RemoveImage {
        id: String,
        image_id: String,
    },
}

impl Executor for GalleryCmd {
    async fn run(self) -> anyhow::Result<()> {
        let client = GalleryClient::new(Client::new(), &self.api.api_url);
        match self.action {
            GalleryAction::List => {
                for gallery in client.list().await? {
                    println!(
                        "{}\t{}\t{} ({} images)",
                        gallery.id,
                        gallery.event_date.date(),
                        gallery.name,
                        gallery.images.len()
                    );
                }
            }
            GalleryAction::Show { id } => print_json(&client.get(&id).await?)?,
            GalleryAction::Create {
                name,
                description,
                event_date,
            } => {
                let payload = CreateGallery {
                    name: Some(name),
                    description: Some(description),
                    event_date: Some(event_date),
                };
                print_json(&client.create(&payload).await?)?
            }
            GalleryAction::Update { id, body } => {
                let update: UpdateDocument = serde_json::from_str(&body)?;
                print_json(&client.update(&id, &update).await?)?
            }
            GalleryAction::Delete { id } => println!("{}", client.delete(&id).await?),
            GalleryAction::AddImage { id, url, filename } => {
                let gallery = client.add_image(&id, &url, filename.as_deref()).await?;
                print_json(&gallery.images)?
            }
            GalleryAction::RemoveImage { id, image_id } => {
                let gallery = client.remove_image(&id, &image_id).await?;
                print_json(&gallery.images)?
            }
        }
        Ok(())
    }
}
