use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;

use crate::Binding;
use crate::BufferPool;
use crate::FuncMap;
use crate::Options;
use crate::PooledBuffer;
use crate::Renderer;
use crate::RendersError;
use crate::RendersResult;
use crate::ResponseWriter;
use crate::compiler::TemplateSet;
use crate::compiler::compile_set;
use crate::resolver::ScanContext;
use crate::resolver::TagPatterns;
use crate::scanner::align_name;
use crate::scanner::collect_template_files;

/// Compiled template sets keyed by the name of their top-level file.
pub type TemplateMap = BTreeMap<String, Arc<TemplateSet>>;

/// Load every top-level template under `options.directory`.
pub fn load(options: &Options) -> RendersResult<TemplateMap> {
	load_templates(options, None)
}

/// Like [`load`], with `options.funcs` available to every template.
pub fn load_with_func_map(options: &Options) -> RendersResult<TemplateMap> {
	load_templates(options, Some(&options.funcs))
}

/// [`load_with_func_map`] when functions are configured, [`load`] otherwise.
pub fn compile(options: &Options) -> RendersResult<TemplateMap> {
	if options.funcs.is_empty() {
		load(options)
	} else {
		load_with_func_map(options)
	}
}

#[tracing::instrument(skip_all, fields(directory = %options.directory.display()))]
fn load_templates(options: &Options, funcs: Option<&FuncMap>) -> RendersResult<TemplateMap> {
	let root = options.directory.canonicalize().map_err(|e| {
		RendersError::ReadDir {
			path: options.directory.display().to_string(),
			reason: e.to_string(),
		}
	})?;
	let patterns = TagPatterns::new(options)?;
	let mut templates = TemplateMap::new();

	for path in collect_template_files(&root, options)? {
		let mut ctx = ScanContext::new(&root);
		ctx.resolve(&path, &patterns)?;
		ctx.invalidate_duplicate_defines(&patterns);
		let set = compile_set(ctx, &patterns, funcs)?;
		templates.insert(set.name().to_string(), Arc::new(set));
	}

	tracing::debug!(count = templates.len(), "loaded templates");
	Ok(templates)
}

/// The template registry.
///
/// Holds the compiled templates for one directory and renders them. Share it
/// between request handlers with an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct Renders {
	options: Options,
	content_type: String,
	pool: BufferPool,
	templates: RwLock<Arc<TemplateMap>>,
	reload_lock: Mutex<()>,
}

impl Renders {
	/// Compile every template described by `options`.
	pub fn new(options: Options) -> RendersResult<Self> {
		let options = options.prepared();
		let templates = compile(&options)?;
		let content_type = options.content_type_header(None);

		tracing::info!(
			directory = %options.directory.display(),
			count = templates.len(),
			"templates compiled"
		);

		Ok(Self {
			options,
			content_type,
			pool: BufferPool::default(),
			templates: RwLock::new(Arc::new(templates)),
			reload_lock: Mutex::new(()),
		})
	}

	pub fn options(&self) -> &Options {
		&self.options
	}

	/// The `Content-Type` header value used when no charset override is set.
	pub fn content_type(&self) -> &str {
		&self.content_type
	}

	/// Recompile every template and replace the registry. The current
	/// templates stay in place when compilation fails.
	pub fn reload(&self) -> RendersResult<()> {
		let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);
		let templates = compile(&self.options)?;

		tracing::info!(count = templates.len(), "templates reloaded");
		*self.templates.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(templates);

		Ok(())
	}

	/// A snapshot of the current registry.
	pub fn templates(&self) -> Arc<TemplateMap> {
		let templates = self.templates.read().unwrap_or_else(PoisonError::into_inner);
		Arc::clone(&*templates)
	}

	/// Look up the compiled set for `name`. `\` separators are accepted.
	pub fn template(&self, name: &str) -> Option<Arc<TemplateSet>> {
		self.templates().get(&align_name(name)).cloned()
	}

	/// Names of every top-level template, sorted.
	pub fn names(&self) -> Vec<String> {
		self.templates().keys().cloned().collect()
	}

	/// A renderer bound to one response.
	pub fn renderer<'a, W>(&'a self, response: &'a mut W) -> Renderer<'a, W>
	where
		W: ResponseWriter + ?Sized,
	{
		Renderer::new(self, response)
	}

	/// Render `name` into `writer`, outside of any request.
	pub fn render<W: Write + ?Sized>(
		&self,
		writer: &mut W,
		name: &str,
		binding: impl Into<Binding>,
	) -> RendersResult<()> {
		if self.options.reload {
			self.reload()?;
		}

		let buffer = self.execute(name, binding.into())?;
		writer.write_all(&buffer)?;

		Ok(())
	}

	/// Render `name` and return the output.
	pub fn render_bytes(&self, name: &str, binding: impl Into<Binding>) -> RendersResult<Vec<u8>> {
		let mut out = Vec::new();
		self.render(&mut out, name, binding)?;
		Ok(out)
	}

	/// Execute `name` into a pooled buffer, merging the global variables into
	/// a [`Binding::Vars`].
	pub(crate) fn execute(&self, name: &str, binding: Binding) -> RendersResult<PooledBuffer<'_>> {
		let name = align_name(name);
		let Some(set) = self.templates().get(&name).cloned() else {
			return Err(RendersError::TemplateNotFound(name));
		};

		let mut buffer = self.pool.get();
		set.render_to(binding.into_context(&self.options.vars), &mut buffer)?;

		Ok(buffer)
	}
}
