use clap::{Args, Parser, Subcommand};
use reqwest::Client;
use skatuve_types::{content::NewPiedavajumsSection, ordering::Direction};

use super::Executor;
use crate::{config::ContentArgs, sections::SectionBoard};

#[derive(Parser, Debug)]
pub struct SectionCmd {
    #[command(flatten)]
    content: ContentArgs,
    #[command(subcommand)]
    action: SectionAction,
}

#[derive(Subcommand, Debug)]
pub enum SectionAction {
    /// List sections in display order
    List,
    Add(NewSectionArgs),
    MoveUp {
        id: String,
    },
    MoveDown {
        id: String,
    },
    /// Move a section one position in the given direction
    Move {
        id: String,
        #[arg(help = "up or down")]
        direction: Direction,
    },
    /// Set a complete new order, all section ids must be given exactly once
    Reorder {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct NewSectionArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    duration: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    additional_title: String,
    #[arg(long, default_value = "")]
    additional_description: String,
    #[arg(long)]
    image: Option<String>,
    #[arg(long, help = "Position in the list, appended at the end if not given")]
    order: Option<i64>,
}

impl From<NewSectionArgs> for NewPiedavajumsSection {
    fn from(args: NewSectionArgs) -> Self {
        NewPiedavajumsSection {
            title: args.title,
            duration: args.duration,
            description: args.description,
            additional_title: args.additional_title,
            additional_description: args.additional_description,
            image: args.image,
            order: args.order,
        }
    }
}

impl Executor for SectionCmd {
    async fn run(self) -> anyhow::Result<()> {
        let mut board = SectionBoard::new(Client::new(), &self.content.content_url);
        board.refresh().await?;
        match self.action {
            SectionAction::List => {}
            SectionAction::Add(args) => {
                let created = board.add(args.into()).await?;
                println!("Created section {}", created.id);
            }
            SectionAction::MoveUp { id } => board.move_section(&id, Direction::Up).await?,
            SectionAction::MoveDown { id } => board.move_section(&id, Direction::Down).await?,
            SectionAction::Move { id, direction } => board.move_section(&id, direction).await?,
            SectionAction::Reorder { ids } => board.reorder(&ids).await?,
        }
        for section in board.sections() {
            println!("{}\t{}\t{}", section.order, section.id, section.title);
        }
        Ok(())
    }
}
