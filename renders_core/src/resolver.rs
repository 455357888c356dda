use std::path::Path;
use std::path::PathBuf;

use regex::Captures;
use regex::Regex;

use crate::Delims;
use crate::Options;
use crate::RendersError;
use crate::RendersResult;
use crate::scanner::read_source;
use crate::scanner::template_name;

/// A template source read during a scan pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTemplate {
	/// Slash-separated path relative to the template root, or a define name.
	pub name: String,
	/// Raw source text.
	pub src: String,
}

/// Regular expressions for the composition tags, built for one pair of
/// delimiters.
#[derive(Debug, Clone)]
pub struct TagPatterns {
	pub delims: Delims,
	pub block_delims: Delims,
	/// `<left> define "<name>" <right>`
	pub define: Regex,
	/// `<left> end <right>`
	pub end: Regex,
	/// `<left> template "<reference>" ... <right>`
	///
	/// Every pattern accepts the `-` whitespace trim markers. The `ltrim` and
	/// `rtrim` groups of this one capture them so includes keep them.
	pub template: Regex,
}

impl TagPatterns {
	pub fn new(options: &Options) -> RendersResult<Self> {
		let delims = options.delims.clone();
		let block_delims = options.block_delims.clone();
		if delims.left.is_empty() || delims.right.is_empty() {
			return Err(RendersError::InvalidDelimiters(
				"tag delimiters must not be empty".to_string(),
			));
		}
		if delims.left == block_delims.left {
			return Err(RendersError::InvalidDelimiters(format!(
				"tag and statement delimiters both start with `{}`",
				delims.left
			)));
		}

		let left = regex::escape(&delims.left);
		let right = regex::escape(&delims.right);
		let define = build_regex(&format!(
			r#"{left}-?\s*define\s+"(?P<name>[^"]+)"\s*-?{right}"#
		))?;
		let end = build_regex(&format!(r"{left}-?\s*end\s*-?{right}"))?;
		let template = build_regex(&format!(
			r#"{left}(?P<ltrim>-?)\s*template\s+"(?P<name>[^"]+)".*?(?P<rtrim>-?){right}"#
		))?;

		Ok(Self {
			delims,
			block_delims,
			define,
			end,
			template,
		})
	}

	/// Every `template` reference in `src`, in source order.
	pub fn references<'s>(&self, src: &'s str) -> impl Iterator<Item = &'s str> {
		self.template
			.captures_iter(src)
			.filter_map(|caps| caps.name("name"))
			.map(|m| m.as_str())
	}

	/// The rewritten define tag for `name`.
	pub fn define_tag(&self, name: &str) -> String {
		format!("{} define \"{name}\" {}", self.delims.left, self.delims.right)
	}

	/// The include statement a `template` tag is lowered to, keeping its trim
	/// markers.
	pub fn include_tag(&self, reference: &str, ltrim: &str, rtrim: &str) -> String {
		format!(
			"{}{ltrim} include \"{reference}\" {rtrim}{}",
			self.block_delims.left, self.block_delims.right
		)
	}
}

fn build_regex(pattern: &str) -> RendersResult<Regex> {
	Regex::new(pattern).map_err(|e| RendersError::InvalidDelimiters(e.to_string()))
}

/// True when `reference` names a file rather than a define block.
pub fn is_file_reference(reference: &str) -> bool {
	Path::new(reference).extension().is_some()
}

/// Lexically normalize a file reference relative to the template root.
/// Returns `None` when the reference climbs above the root.
pub fn normalize_reference(reference: &str) -> Option<String> {
	let mut parts: Vec<&str> = Vec::new();
	for part in reference.split(['/', '\\']) {
		match part {
			"" | "." => {}
			".." => {
				parts.pop()?;
			}
			part => parts.push(part),
		}
	}

	Some(parts.join("/"))
}

/// Scan state for one top-level template file.
///
/// Holds every source reachable from the top-level file through `template`
/// tags, in resolution order, and the names of the define blocks referenced
/// along the way.
#[derive(Debug)]
pub struct ScanContext {
	root: PathBuf,
	pub templates: Vec<NamedTemplate>,
	pub block_names: Vec<String>,
}

impl ScanContext {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			templates: Vec::new(),
			block_names: Vec::new(),
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Read `path` and every file it references, depth first, in source
	/// order. Files already cached are not read again.
	pub fn resolve(&mut self, path: &Path, patterns: &TagPatterns) -> RendersResult<()> {
		let mut worklist = vec![template_name(&self.root, path)];

		while let Some(name) = worklist.pop() {
			if self.contains(&name) {
				continue;
			}

			let src = read_source(&self.root.join(&name))?;
			tracing::debug!(template = %name, "scanned template source");

			let mut children = Vec::new();
			for reference in patterns.references(&src) {
				if is_file_reference(reference) {
					let Some(child) = normalize_reference(reference) else {
						return Err(RendersError::OutsideRoot {
							reference: reference.to_string(),
							from: name.clone(),
						});
					};
					children.push(child);
				} else if !self.block_names.iter().any(|b| b == reference) {
					self.block_names.push(reference.to_string());
				}
			}

			worklist.extend(children.into_iter().rev());
			self.templates.push(NamedTemplate { name, src });
		}

		Ok(())
	}

	/// Whether a template called `name` has already been read.
	pub fn contains(&self, name: &str) -> bool {
		self.templates.iter().any(|t| t.name == name)
	}

	/// Rename every define of a referenced block after the first one to
	/// `<name>_invalidated_#<k>`.
	pub fn invalidate_duplicate_defines(&mut self, patterns: &TagPatterns) {
		let Self {
			templates,
			block_names,
			..
		} = self;

		for block in block_names.iter() {
			let mut seen = false;
			let mut count = 0usize;

			for template in templates.iter_mut() {
				let source_name = &template.name;
				let src = patterns
					.define
					.replace_all(&template.src, |caps: &Captures<'_>| {
						if &caps["name"] != block.as_str() {
							return caps[0].to_string();
						}
						if !seen {
							seen = true;
							return caps[0].to_string();
						}

						count += 1;
						let renamed = format!("{block}_invalidated_#{count}");
						tracing::debug!(
							template = %source_name,
							define = %block,
							renamed = %renamed,
							"invalidated duplicate define"
						);
						patterns.define_tag(&renamed)
					})
					.into_owned();
				template.src = src;
			}
		}
	}
}
