use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use minijinja::Value;
use serde::Deserialize;

use crate::RendersError;
use crate::RendersResult;
use crate::Vars;

/// Default directory to load templates from.
pub const DEFAULT_DIRECTORY: &str = "templates";

/// Default extension of top-level template files.
pub const DEFAULT_EXTENSION: &str = ".html";

/// Default value of the `Content-Type` header.
pub const CONTENT_HTML: &str = "text/html";

/// `Content-Type` for XHTML output.
pub const CONTENT_XHTML: &str = "application/xhtml+xml";

/// Default charset appended to the `Content-Type` header.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"renders.toml",
	".renders.toml",
	".config/renders.toml",
];

/// Functions exposed to template expressions, keyed by the name they are
/// called with. Values are built with [`Value::from_function`].
pub type FuncMap = BTreeMap<String, Value>;

/// A left/right delimiter pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Delims {
	pub left: String,
	pub right: String,
}

impl Delims {
	pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
		Self {
			left: left.into(),
			right: right.into(),
		}
	}

	/// Delimiters for variables and for the `define`, `template` and `end`
	/// tags.
	pub fn tags() -> Self {
		Self::new("{{", "}}")
	}

	/// Delimiters for control flow statements.
	pub fn statements() -> Self {
		Self::new("{%", "%}")
	}

	fn is_empty(&self) -> bool {
		self.left.is_empty() || self.right.is_empty()
	}
}

impl Default for Delims {
	fn default() -> Self {
		Self::tags()
	}
}

/// Configuration for [`Renders`](crate::Renders).
///
/// Every field is optional in `renders.toml`:
///
/// ```toml
/// directory = "templates"
/// extensions = [".html", ".tmpl"]
/// charset = "UTF-8"
/// content_type = "text/html"
/// reload = true
///
/// [delims]
/// left = "[["
/// right = "]]"
///
/// [vars]
/// site_name = "Example"
/// ```
///
/// Functions cannot be described in TOML; add them with
/// [`Options::with_func`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
	/// Rebuild every template set before each render.
	pub reload: bool,
	/// Directory to load templates from.
	pub directory: PathBuf,
	/// Extensions (with the leading dot) of top-level template files.
	pub extensions: Vec<String>,
	/// Delimiters for variables and for the `define`, `template` and `end`
	/// tags.
	pub delims: Delims,
	/// Delimiters for control flow statements. Include tags are lowered to
	/// statements using these.
	pub block_delims: Delims,
	/// Functions made available to every template.
	#[serde(skip)]
	pub funcs: FuncMap,
	/// Global variables merged into every [`Vars`] binding.
	pub vars: Vars,
	/// Charset appended to the `Content-Type` header.
	pub charset: String,
	/// Value of the `Content-Type` header, without the charset.
	pub content_type: String,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			reload: false,
			directory: PathBuf::from(DEFAULT_DIRECTORY),
			extensions: vec![DEFAULT_EXTENSION.to_string()],
			delims: Delims::tags(),
			block_delims: Delims::statements(),
			funcs: FuncMap::new(),
			vars: Vars::new(),
			charset: DEFAULT_CHARSET.to_string(),
			content_type: CONTENT_HTML.to_string(),
		}
	}
}

impl Options {
	/// Options for the given template directory with every other field at its
	/// default.
	pub fn new(directory: impl Into<PathBuf>) -> Self {
		Self {
			directory: directory.into(),
			..Self::default()
		}
	}

	/// Find the config file for `root`, if one exists.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load options from the first config file found in `root`. A relative
	/// `directory` is resolved against `root`.
	pub fn load(root: &Path) -> RendersResult<Option<Options>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let mut options = Self::from_toml_str(&content)?;
		if options.directory.is_relative() {
			options.directory = root.join(&options.directory);
		}

		Ok(Some(options))
	}

	/// Parse options from TOML. Missing keys keep their defaults.
	pub fn from_toml_str(content: &str) -> RendersResult<Options> {
		let options: Options =
			toml::from_str(content).map_err(|e| RendersError::ConfigParse(e.to_string()))?;
		Ok(options.prepared())
	}

	/// Fill empty fields with their defaults.
	pub fn prepared(mut self) -> Self {
		if self.directory.as_os_str().is_empty() {
			self.directory = PathBuf::from(DEFAULT_DIRECTORY);
		}
		if self.extensions.is_empty() {
			self.extensions = vec![DEFAULT_EXTENSION.to_string()];
		}
		if self.content_type.is_empty() {
			self.content_type = CONTENT_HTML.to_string();
		}
		if self.charset.is_empty() {
			self.charset = DEFAULT_CHARSET.to_string();
		}
		if self.delims.left.is_empty() {
			self.delims.left = Delims::tags().left;
		}
		if self.delims.right.is_empty() {
			self.delims.right = Delims::tags().right;
		}
		if self.block_delims.is_empty() {
			self.block_delims = Delims::statements();
		}
		self
	}

	pub fn with_reload(mut self, reload: bool) -> Self {
		self.reload = reload;
		self
	}

	pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.extensions = extensions.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_delims(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
		self.delims = Delims::new(left, right);
		self
	}

	pub fn with_block_delims(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
		self.block_delims = Delims::new(left, right);
		self
	}

	/// Register a template function, e.g.
	/// `options.with_func("upper", Value::from_function(|s: String| s.to_uppercase()))`.
	pub fn with_func(mut self, name: impl Into<String>, func: Value) -> Self {
		self.funcs.insert(name.into(), func);
		self
	}

	pub fn with_funcs(mut self, funcs: FuncMap) -> Self {
		self.funcs.extend(funcs);
		self
	}

	pub fn with_vars(mut self, vars: Vars) -> Self {
		self.vars = vars;
		self
	}

	pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
		self.charset = charset.into();
		self
	}

	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = content_type.into();
		self
	}

	/// Whether `path` has one of the configured extensions.
	pub fn matches_extension(&self, path: &Path) -> bool {
		let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
			return false;
		};

		self.extensions
			.iter()
			.any(|accepted| accepted.strip_prefix('.').unwrap_or(accepted) == ext)
	}

	/// The full `Content-Type` header value for `charset`, falling back to the
	/// configured charset when `charset` is empty.
	pub fn content_type_header(&self, charset: Option<&str>) -> String {
		let charset = match charset {
			Some(charset) if !charset.is_empty() => charset,
			_ => self.charset.as_str(),
		};

		format!("{}; charset={charset}", self.content_type)
	}
}
