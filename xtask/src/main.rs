use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about = "Project automation commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cargo nextest with default configuration
    Nextest {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        release: bool,
    },
    /// Build a small sample tree and bundle it with codemark
    Demo {
        /// Where to create the sample tree and bundle
        #[arg(long, default_value = "target/demo")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Nextest { profile, release } => run_nextest(profile, release)?,
        Commands::Demo { dir } => run_demo(dir)?,
    }
    Ok(())
}

fn run_nextest(profile: Option<String>, release: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("nextest").arg("run");
    if let Some(profile) = profile {
        cmd.arg("--profile").arg(profile);
    }
    if release {
        cmd.arg("--release");
    }
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("cargo nextest run failed");
    }
    Ok(())
}

fn run_demo(dir: PathBuf) -> Result<()> {
    let src = dir.join("src");
    fs::create_dir_all(&src)?;
    fs::write(src.join("main.py"), "print(\"hello\")\n")?;
    fs::write(
        src.join("util.py"),
        "def add(a, b):\n    return a + b\n",
    )?;
    fs::write(dir.join("README.txt"), "not bundled\n")?;

    let output = dir.join("bundle.md");
    let status = Command::new("cargo")
        .args(["run", "-p", "codemark", "--"])
        .arg(&src)
        .arg("--output")
        .arg(&output)
        .args(["--ext", "py"])
        .arg("--tree-root")
        .arg(&dir)
        .status()?;
    if !status.success() {
        anyhow::bail!("codemark demo run failed");
    }
    println!("demo bundle written to {}", output.display());
    Ok(())
}
