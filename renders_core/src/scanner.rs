use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use crate::Options;
use crate::RendersError;
use crate::RendersResult;

/// Collect every top-level template file below `root`, sorted by path.
///
/// Directories are walked recursively and never returned themselves. A file
/// is accepted when its final extension is one of `options.extensions`.
/// Symlinked directories are followed; one that leads back to its own
/// ancestor is a [`RendersError::SymlinkCycle`].
pub fn collect_template_files(root: &Path, options: &Options) -> RendersResult<Vec<PathBuf>> {
	let mut files = Vec::new();
	let mut ancestors = HashSet::new();
	walk_dir(root, options, &mut files, &mut ancestors)?;
	files.sort();

	tracing::debug!(
		root = %root.display(),
		count = files.len(),
		"collected template files"
	);

	Ok(files)
}

fn walk_dir(
	dir: &Path,
	options: &Options,
	files: &mut Vec<PathBuf>,
	ancestors: &mut HashSet<PathBuf>,
) -> RendersResult<()> {
	// Only the current chain of parents, so aliases of a directory are fine.
	let canonical = dir.canonicalize().map_err(|e| read_dir_error(dir, &e))?;
	if !ancestors.insert(canonical.clone()) {
		return Err(RendersError::SymlinkCycle {
			path: dir.display().to_string(),
		});
	}

	let entries = std::fs::read_dir(dir).map_err(|e| read_dir_error(dir, &e))?;

	for entry in entries {
		let entry = entry.map_err(|e| read_dir_error(dir, &e))?;
		let path = entry.path();

		if path.is_dir() {
			walk_dir(&path, options, files, ancestors)?;
		} else if options.matches_extension(&path) {
			files.push(path);
		}
	}

	ancestors.remove(&canonical);
	Ok(())
}

fn read_dir_error(dir: &Path, error: &std::io::Error) -> RendersError {
	RendersError::ReadDir {
		path: dir.display().to_string(),
		reason: error.to_string(),
	}
}

/// Read a template file. Empty files are rejected.
pub fn read_source(path: &Path) -> RendersResult<String> {
	let src = std::fs::read_to_string(path).map_err(|e| {
		RendersError::ReadTemplate {
			path: path.display().to_string(),
			reason: e.to_string(),
		}
	})?;

	if src.is_empty() {
		return Err(RendersError::EmptyTemplate(path.display().to_string()));
	}

	Ok(src)
}

/// The name of `path` relative to `root`, using `/` as the separator.
pub fn template_name(root: &Path, path: &Path) -> String {
	let relative = path.strip_prefix(root).unwrap_or(path);
	align_name(&relative.to_string_lossy())
}

/// Normalize the separators of a template name so that `admin\home.html`
/// and `admin\\home.html` both address `admin/home.html`.
pub fn align_name(name: &str) -> String {
	name.replace("\\\\", "/").replace('\\', "/")
}
