use clap::Parser;
use dupe_review::Opts;
use dupe_review::cli::SubCommandExtend;
use dupe_review::config::SubCommand;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();
    match &opts.subcmd {
        SubCommand::Server(cmd) => cmd.run(&opts).await,
        SubCommand::Show(cmd) => cmd.run(&opts).await,
        SubCommand::Stats(cmd) => cmd.run(&opts).await,
    }
}
