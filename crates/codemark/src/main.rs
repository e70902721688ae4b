use clap::Parser;

fn main() -> anyhow::Result<()> {
    codemark::init();

    let cli = codemark::cli::Cli::parse();
    codemark::cli::run(cli)
}
