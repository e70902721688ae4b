//! Command-line surface.

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use crate::app::bundle::{BundleOptions, Bundler};
use crate::app::discover::Discovery;
use crate::domain::errors::DomainError;
use crate::domain::model::BundleRequest;
use crate::infra::config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "codemark",
    version,
    about = "Bundle source trees into one Markdown document"
)]
pub struct Cli {
    /// Directories or files to scan. Defaults come from configuration.
    #[arg(value_name = "PATH")]
    pub roots: Vec<PathBuf>,

    /// Output document path.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Accepted file extension (repeatable). A missing leading dot is added.
    #[arg(short = 'e', long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Header template: a built-in name or a path to a template file.
    #[arg(long, value_name = "TEMPLATE")]
    pub template: Option<String>,

    /// Directory rendered as the tree snapshot inside the header.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub tree_root: PathBuf,

    /// Emit a shell completion script and exit.
    #[arg(long, value_name = "SHELL", value_enum)]
    pub completions: Option<Shell>,
}

/// Run one bundle invocation.
pub fn run(cli: Cli) -> Result<()> {
    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        let name = command.get_name().to_string();
        clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
        return Ok(());
    }

    let config = Config::load()?;
    let request = resolve_request(cli, &config);

    // Every declared root must exist before any file is opened.
    for root in &request.roots {
        if !root.exists() {
            tracing::error!(path = %root.display(), "declared root path does not exist");
            return Err(DomainError::MissingRoot(root.clone()).into());
        }
    }

    let discovery = Discovery::new(&config, request.extensions.clone())?;
    let bundler = Bundler::new()?;
    let options = BundleOptions {
        output: request.output.clone(),
        template: request.template.clone(),
        tree_root: request.tree_root.clone(),
    };

    bundler.write_header(&options, discovery.ignore())?;

    let records = discovery.collect(&request.roots);
    if records.is_empty() {
        tracing::warn!("no relevant files found, leaving header-only document");
        return Ok(());
    }

    let report = bundler.write_sections(&options, &records)?;
    tracing::info!(
        written = report.written,
        skipped = report.skipped,
        output = %report.output.display(),
        "bundle complete"
    );
    Ok(())
}

fn resolve_request(cli: Cli, config: &Config) -> BundleRequest {
    let roots = if cli.roots.is_empty() {
        config.defaults.roots.iter().map(PathBuf::from).collect()
    } else {
        cli.roots
    };

    let extensions = if cli.extensions.is_empty() {
        config.defaults.extensions.clone()
    } else {
        cli.extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .collect()
    };

    BundleRequest {
        roots,
        output: cli
            .output
            .unwrap_or_else(|| PathBuf::from(&config.defaults.output)),
        extensions,
        tree_root: cli.tree_root,
        template: cli.template.unwrap_or_else(|| config.header.template()),
    }
}

/// Accept `rs` and `.rs` alike on the command line; matching always uses the
/// dotted form.
fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim();
    if trimmed.starts_with('.') {
        trimmed.to_string()
    } else {
        format!(".{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).expect("valid arguments")
    }

    #[test]
    fn normalizes_missing_leading_dot() {
        assert_eq!(normalize_extension("py"), ".py");
        assert_eq!(normalize_extension(".py"), ".py");
        assert_eq!(normalize_extension(" tsx "), ".tsx");
    }

    #[test]
    fn resolve_falls_back_to_config_defaults() {
        let cli = parse(&["codemark"]);
        let config = Config::default();
        let request = resolve_request(cli, &config);

        assert_eq!(request.roots, vec![PathBuf::from("src")]);
        assert_eq!(request.output, PathBuf::from("module_code.md"));
        assert_eq!(request.extensions, vec![".py", ".tsx", ".ts"]);
        assert_eq!(request.template, "project_header");
    }

    #[test]
    fn cli_arguments_override_config_defaults() {
        let cli = parse(&[
            "codemark",
            "lib",
            "docs",
            "-o",
            "bundle.md",
            "-e",
            "rs",
            "-e",
            ".toml",
            "--template",
            "custom.md",
        ]);
        let config = Config::default();
        let request = resolve_request(cli, &config);

        assert_eq!(
            request.roots,
            vec![PathBuf::from("lib"), PathBuf::from("docs")]
        );
        assert_eq!(request.output, PathBuf::from("bundle.md"));
        assert_eq!(request.extensions, vec![".rs", ".toml"]);
        assert_eq!(request.template, "custom.md");
    }
}
