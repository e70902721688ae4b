//! Directory tree rendering.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::model::IgnoreSet;

const TEE: &str = "├── ";
const ELBOW: &str = "└── ";
const PIPE: &str = "│   ";
const SPACER: &str = "    ";

/// Fence tag used when embedding the rendered tree in a document.
const TREE_FENCE_TAG: &str = "markdown";

/// Render the tree beneath `root` as display lines, one per retained entry.
///
/// Siblings are visited in ascending name order. Directories whose name is
/// in the ignore set are pruned before descent, so their subtrees are never
/// listed. A directory that cannot be listed fails the whole render; there
/// is no partial-tree fallback.
pub fn render_tree(root: &Path, ignore: &IgnoreSet) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    render_level(root, "", ignore, &mut lines)?;
    Ok(lines)
}

/// Render the tree wrapped in a fenced markup block, ready for embedding.
pub fn render_tree_block(root: &Path, ignore: &IgnoreSet) -> Result<String> {
    let lines = render_tree(root, ignore)?;
    Ok(format!("```{TREE_FENCE_TAG}\n{}\n```", lines.join("\n")))
}

fn render_level(
    dir: &Path,
    prefix: &str,
    ignore: &IgnoreSet,
    lines: &mut Vec<String>,
) -> Result<()> {
    let children = list_children(dir, ignore)?;
    let last = children.len().saturating_sub(1);
    for (index, child) in children.iter().enumerate() {
        let connector = if index == last { ELBOW } else { TEE };
        lines.push(format!("{prefix}{connector}{}", child.name));
        if child.is_dir {
            let extension = if index == last { SPACER } else { PIPE };
            render_level(&child.path, &format!("{prefix}{extension}"), ignore, lines)?;
        }
    }
    Ok(())
}

struct Child {
    path: PathBuf,
    name: String,
    is_dir: bool,
}

fn list_children(dir: &Path, ignore: &IgnoreSet) -> Result<Vec<Child>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to list directory {}", dir.display()))?;

    let mut children = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = path.is_dir();
        children.push(Child { path, name, is_dir });
    }
    children.sort_by(|a, b| a.name.cmp(&b.name));
    // Only directories are subject to the ignore set; a file that happens to
    // share an ignored name stays visible.
    children.retain(|child| !(child.is_dir && ignore.matches(&child.name)));
    Ok(children)
}
