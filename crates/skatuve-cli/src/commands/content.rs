use clap::{Parser, Subcommand, ValueEnum};
use reqwest::Client;
use skatuve_types::content::{AboutText, Partner, PiedavajumiHeader, TeamMember, Testimonial};

use super::{print_json, Executor};
use crate::{
    config::ContentArgs,
    remote::{CachedRepository, Resource},
};

#[derive(Parser, Debug)]
pub struct ContentCmd {
    #[command(flatten)]
    content: ContentArgs,
    #[command(subcommand)]
    action: ContentAction,
}

#[derive(Subcommand, Debug)]
pub enum ContentAction {
    /// Print all records of one kind as JSON
    List {
        #[arg(value_enum)]
        kind: ContentKind,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ContentKind {
    Team,
    Testimonials,
    Partners,
    About,
    Header,
}

async fn print_all<R: Resource>(content: &ContentArgs) -> anyhow::Result<()> {
    let mut repository: CachedRepository<R> =
        CachedRepository::new(Client::new(), &content.content_url);
    print_json(repository.list().await?)
}

impl Executor for ContentCmd {
    async fn run(self) -> anyhow::Result<()> {
        let ContentAction::List { kind } = self.action;
        match kind {
            ContentKind::Team => print_all::<TeamMember>(&self.content).await,
            ContentKind::Testimonials => print_all::<Testimonial>(&self.content).await,
            ContentKind::Partners => print_all::<Partner>(&self.content).await,
            ContentKind::About => print_all::<AboutText>(&self.content).await,
            ContentKind::Header => print_all::<PiedavajumiHeader>(&self.content).await,
        }
    }
}
