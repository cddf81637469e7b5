use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::fs::LocalFs;
use crate::query::{GroupQueryService, GroupView};
use crate::store::GroupStore;

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// 分组下标
    pub idx: usize,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for ShowCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let store = GroupStore::load(&opts.duplicates)?;
        let service = GroupQueryService::new(Arc::new(store), Arc::new(LocalFs), opts.image_root()?);

        let view = block_in_place(|| service.query_group(self.idx))?;
        print_result(&view, self.output_format)
    }
}

fn print_result(view: &GroupView, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(view)?)
        }
        OutputFormat::Table => {
            println!("similarity\t{:.2}", view.group_similarity_score);
            for image in &view.images {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    image.score,
                    image.path,
                    image.metadata.date_taken,
                    image.metadata.camera_model,
                    image.metadata.subject
                );
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}
