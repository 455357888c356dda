use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum RendersError {
	#[error(transparent)]
	#[diagnostic(code(renders::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to read template directory `{path}`: {reason}")]
	#[diagnostic(
		code(renders::read_dir),
		help("check that the configured `directory` exists and is readable")
	)]
	ReadDir { path: String, reason: String },

	#[error("failed to read template file `{path}`: {reason}")]
	#[diagnostic(code(renders::read_template))]
	ReadTemplate { path: String, reason: String },

	#[error("template file is empty: `{0}`")]
	#[diagnostic(
		code(renders::empty_template),
		help("remove the file or give it some content")
	)]
	EmptyTemplate(String),

	#[error("symlink cycle detected at: `{path}`")]
	#[diagnostic(
		code(renders::symlink_cycle),
		help("remove the circular symlink from the template directory")
	)]
	SymlinkCycle { path: String },

	#[error("template `{reference}` referenced from `{from}` is outside the template root")]
	#[diagnostic(code(renders::outside_root))]
	OutsideRoot { reference: String, from: String },

	#[error("missing `end` tag for define `{name}` in `{template}`")]
	#[diagnostic(
		code(renders::unclosed_define),
		help("close the block with an `end` tag using the configured delimiters")
	)]
	UnclosedDefine { template: String, name: String },

	#[error("define `{inner}` is nested inside define `{outer}` in `{template}`")]
	#[diagnostic(
		code(renders::nested_define),
		help("move `{inner}` out of `{outer}`; defines can only appear at the top level")
	)]
	NestedDefine {
		template: String,
		outer: String,
		inner: String,
	},

	#[error("invalid delimiters: {0}")]
	#[diagnostic(
		code(renders::invalid_delimiters),
		help("delimiters must be non-empty and must not overlap with the statement delimiters")
	)]
	InvalidDelimiters(String),

	#[error("failed to parse template `{name}`: {message}")]
	#[diagnostic(code(renders::parse))]
	Parse { name: String, message: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(renders::config_parse),
		help("check that renders.toml is valid TOML")
	)]
	ConfigParse(String),

	#[error("template `{0}` does not exist")]
	#[diagnostic(
		code(renders::template_not_found),
		help("template names are paths relative to the template directory, e.g. `admin/home.html`")
	)]
	TemplateNotFound(String),

	#[error("failed to render template `{name}`: {message}")]
	#[diagnostic(code(renders::render))]
	Render { name: String, message: String },

	#[error("invalid content type header `{0}`")]
	#[diagnostic(
		code(renders::invalid_header),
		help("`content_type` and `charset` may only contain visible ASCII characters")
	)]
	InvalidHeader(String),
}

impl RendersError {
	/// Returns true when the error is a lookup miss rather than a broken
	/// template. Callers can still produce an alternative response.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::TemplateNotFound(_))
	}
}

pub type RendersResult<T> = Result<T, RendersError>;
