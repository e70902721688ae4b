//! Writing the combined Markdown document.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use minijinja::Environment;
use tracing::{info, warn};

use crate::app::tree;
use crate::domain::model::{FileRecord, IgnoreSet};

/// Name of the built-in header template.
pub const BUILTIN_HEADER: &str = "project_header";

/// Separator line between document sections.
const SEPARATOR: &str = "-----------------------------------";

/// Marker closing each file section.
const SECTION_END: &str = "===";

const DEFAULT_HEADER_TEMPLATE: &str = include_str!("../../assets/header.md");

/// Options controlling a single bundle run.
#[derive(Debug, Clone)]
pub struct BundleOptions {
    pub output: PathBuf,
    /// Header template: a built-in name or a filesystem path.
    pub template: String,
    /// Directory rendered as the tree snapshot inside the header.
    pub tree_root: PathBuf,
}

/// Counts reported after the section pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleReport {
    pub output: PathBuf,
    pub written: usize,
    pub skipped: usize,
}

/// Renders the header and appends file sections to the output document.
///
/// The document is truncated once, then every subsequent write is a separate
/// scoped open/append/close. An interrupted run leaves a prefix of the
/// intended document behind; nothing guards against that.
pub struct Bundler {
    env: Environment<'static>,
}

impl Bundler {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template(BUILTIN_HEADER, DEFAULT_HEADER_TEMPLATE)
            .map_err(|err| anyhow!("failed to register built-in header template: {err}"))?;
        Ok(Self { env })
    }

    /// Truncate the output document, then append the header: a separator
    /// line followed by the rendered header template, which receives a tree
    /// snapshot of `tree_root` bound as `tree`.
    pub fn write_header(&self, options: &BundleOptions, ignore: &IgnoreSet) -> Result<()> {
        fs::write(&options.output, "").with_context(|| {
            format!(
                "failed to create output document {}",
                options.output.display()
            )
        })?;

        let tree_block = tree::render_tree_block(&options.tree_root, ignore)?;
        let rendered = self.render_header(&options.template, &tree_block)?;
        append(&options.output, &format!("{SEPARATOR}\n{rendered}\n"))
    }

    /// Append one section per readable file, in discovery order.
    ///
    /// A file that cannot be read as text is reported with its reason and
    /// omitted; it never aborts the run.
    pub fn write_sections(
        &self,
        options: &BundleOptions,
        records: &[FileRecord],
    ) -> Result<BundleReport> {
        let mut written = 0;
        let mut skipped = 0;
        for record in records {
            let content = match fs::read_to_string(&record.path) {
                Ok(content) => content,
                Err(err) => {
                    warn!(
                        path = %record.path.display(),
                        reason = %err,
                        "could not read file, skipping"
                    );
                    skipped += 1;
                    continue;
                }
            };

            let section = format!(
                "{SEPARATOR}\n# {path}\n{SEPARATOR}\n```{tag}\n{content}\n```\n{SECTION_END}\n",
                path = record.path.display(),
                tag = record.fence_tag(),
            );
            append(&options.output, &section)?;
            written += 1;
            info!(
                path = %record.path.display(),
                output = %options.output.display(),
                "section written"
            );
        }

        Ok(BundleReport {
            output: options.output.clone(),
            written,
            skipped,
        })
    }

    fn render_header(&self, template: &str, tree_block: &str) -> Result<String> {
        let context = minijinja::context! { tree => tree_block };

        if let Ok(template) = self.env.get_template(template) {
            return template
                .render(&context)
                .map_err(|err| anyhow!("failed to render header template: {err}"));
        }

        let template_path = Path::new(template);
        if template_path.exists() {
            let source = fs::read_to_string(template_path).with_context(|| {
                format!(
                    "failed to load header template from {}",
                    template_path.display()
                )
            })?;
            let mut env = Environment::new();
            env.set_trim_blocks(true);
            env.set_lstrip_blocks(true);
            env.add_template("external", &source)
                .map_err(|err| anyhow!("invalid header template '{template}': {err}"))?;
            return env
                .get_template("external")
                .unwrap()
                .render(&context)
                .map_err(|err| anyhow!("failed to render header template '{template}': {err}"));
        }

        Err(anyhow!(
            "header template '{template}' not found (built-in or filesystem)"
        ))
    }
}

/// One scoped append per write: open, write, close.
fn append(path: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("failed to open output document {}", path.display()))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("failed to append to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn options(dir: &Path) -> BundleOptions {
        BundleOptions {
            output: dir.join("out.md"),
            template: BUILTIN_HEADER.into(),
            tree_root: dir.join("tree"),
        }
    }

    fn setup(dir: &Path) {
        fs::create_dir(dir.join("tree")).unwrap();
        fs::write(dir.join("tree/a.py"), b"pass\n").unwrap();
    }

    #[test]
    fn section_layout_matches_contract() -> Result<()> {
        let temp = tempfile::tempdir()?;
        setup(temp.path());
        let widget = temp.path().join("widget.tsx");
        fs::write(&widget, "const x = 1;")?;

        let bundler = Bundler::new()?;
        let options = options(temp.path());
        bundler.write_header(&options, &IgnoreSet::default())?;
        let report =
            bundler.write_sections(&options, &[FileRecord::new(widget.clone())])?;

        assert_eq!(report.written, 1);
        let document = fs::read_to_string(&options.output)?;
        let expected = format!(
            "{SEPARATOR}\n# {}\n{SEPARATOR}\n```tsx\nconst x = 1;\n```\n===\n",
            widget.display()
        );
        assert!(document.ends_with(&expected));
        Ok(())
    }

    #[test]
    fn header_embeds_tree_snapshot_and_truncates() -> Result<()> {
        let temp = tempfile::tempdir()?;
        setup(temp.path());

        let bundler = Bundler::new()?;
        let options = options(temp.path());
        fs::write(&options.output, "stale content from a previous run")?;

        bundler.write_header(&options, &IgnoreSet::default())?;
        let document = fs::read_to_string(&options.output)?;

        assert!(document.starts_with(SEPARATOR));
        assert!(document.contains("VoiceScribeApp"));
        assert!(document.contains("```markdown\n└── a.py\n```"));
        assert!(!document.contains("stale content"));
        Ok(())
    }

    #[test]
    fn unreadable_file_is_skipped_but_later_files_are_written() -> Result<()> {
        let temp = tempfile::tempdir()?;
        setup(temp.path());
        let binary = temp.path().join("broken.py");
        let good = temp.path().join("good.py");
        fs::write(&binary, [0xff, 0xfe, 0x00, 0x9f])?;
        fs::write(&good, "print('ok')\n")?;

        let bundler = Bundler::new()?;
        let options = options(temp.path());
        bundler.write_header(&options, &IgnoreSet::default())?;
        let report = bundler.write_sections(
            &options,
            &[FileRecord::new(binary.clone()), FileRecord::new(good.clone())],
        )?;

        assert_eq!(report.written, 1);
        assert_eq!(report.skipped, 1);
        let document = fs::read_to_string(&options.output)?;
        assert!(!document.contains(&format!("# {}", binary.display())));
        assert!(document.contains(&format!("# {}", good.display())));
        assert!(document.contains("print('ok')"));
        Ok(())
    }

    #[test]
    fn repeated_runs_are_byte_identical() -> Result<()> {
        let temp = tempfile::tempdir()?;
        setup(temp.path());
        let record = FileRecord::new(temp.path().join("tree/a.py"));

        let bundler = Bundler::new()?;
        let options = options(temp.path());

        bundler.write_header(&options, &IgnoreSet::default())?;
        bundler.write_sections(&options, &[record.clone()])?;
        let first = fs::read(&options.output)?;

        bundler.write_header(&options, &IgnoreSet::default())?;
        bundler.write_sections(&options, &[record])?;
        let second = fs::read(&options.output)?;

        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn filesystem_template_replaces_builtin_header() -> Result<()> {
        let temp = tempfile::tempdir()?;
        setup(temp.path());
        let template = temp.path().join("custom.md");
        fs::write(&template, "CUSTOM HEADER\n\n{{ tree }}\n")?;

        let bundler = Bundler::new()?;
        let mut options = options(temp.path());
        options.template = template.display().to_string();

        bundler.write_header(&options, &IgnoreSet::default())?;
        let document = fs::read_to_string(&options.output)?;
        assert!(document.contains("CUSTOM HEADER"));
        assert!(document.contains("└── a.py"));
        assert!(!document.contains("VoiceScribeApp"));
        Ok(())
    }

    #[test]
    fn unknown_template_is_an_error() -> Result<()> {
        let temp = tempfile::tempdir()?;
        setup(temp.path());

        let bundler = Bundler::new()?;
        let mut options = options(temp.path());
        options.template = "no_such_template".into();

        assert!(bundler.write_header(&options, &IgnoreSet::default()).is_err());
        Ok(())
    }
}
