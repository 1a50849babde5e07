use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::commands::{content::ContentCmd, gallery::GalleryCmd, section::SectionCmd};

#[derive(Parser)]
#[command(
    version,
    about,
    long_about = "CLI for skatuve - manages galleries and the site content kept by the content service."
)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Galleries stored by skatuve-server
    Gallery(GalleryCmd),
    /// Offerings sections and their order
    Section(SectionCmd),
    /// Read only listing of other site content
    Content(ContentCmd),
}

impl crate::commands::Executor for Command {
    async fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Gallery(cmd) => cmd.run().await,
            Command::Section(cmd) => cmd.run().await,
            Command::Content(cmd) => cmd.run().await,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ApiArgs {
    #[arg(
        long,
        env = "SKATUVE_API_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of skatuve-server"
    )]
    pub api_url: Url,
}

#[derive(Args, Debug, Clone)]
pub struct ContentArgs {
    #[arg(
        long,
        env = "SKATUVE_CONTENT_URL",
        help = "Base URL of the content service REST API"
    )]
    pub content_url: Url,
}
