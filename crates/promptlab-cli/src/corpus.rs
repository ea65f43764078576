//! Prompt and test-case corpus loading: sorted `*.md` files from a
//! directory, file name as identifier, file text as the rendered message.

use anyhow::{bail, Context};
use promptlab_core::model::{CaseSpec, PromptSpec};
use std::path::{Path, PathBuf};

pub fn load_prompts(dir: &Path) -> anyhow::Result<Vec<PromptSpec>> {
    Ok(load_dir(dir, "prompt")?
        .into_iter()
        .map(|(id, content)| PromptSpec::new(id, content))
        .collect())
}

pub fn load_cases(dir: &Path) -> anyhow::Result<Vec<CaseSpec>> {
    Ok(load_dir(dir, "test case")?
        .into_iter()
        .map(|(id, content)| CaseSpec::new(id, content))
        .collect())
}

fn load_dir(dir: &Path, what: &str) -> anyhow::Result<Vec<(String, String)>> {
    if !dir.is_dir() {
        bail!("{what} directory not found: {}", dir.display());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("read {what} directory {}", dir.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();
    if files.is_empty() {
        bail!("no {what} files (*.md) found in {}", dir.display());
    }

    let mut out = Vec::with_capacity(files.len());
    for path in files {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?;
        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        out.push((id, content.trim().to_string()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_sorted_markdown_files_with_trimmed_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("b_second.md"), "beta\n").expect("write");
        fs::write(dir.path().join("a_first.md"), "  alpha  \n").expect("write");
        fs::write(dir.path().join("ignored.txt"), "not markdown").expect("write");

        let prompts = load_prompts(dir.path()).expect("load");
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].id, "a_first.md");
        assert_eq!(prompts[0].content, "alpha");
        assert_eq!(prompts[1].id, "b_second.md");
        assert_eq!(prompts[1].content, "beta");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        assert!(load_prompts(&missing).is_err());
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_cases(dir.path()).is_err());
    }
}
