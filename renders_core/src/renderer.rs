use std::io;
use std::sync::Arc;

use http::HeaderName;
use http::HeaderValue;
use http::Response;
use http::StatusCode;
use http::header::CONTENT_TYPE;

use crate::Binding;
use crate::Renders;
use crate::RendersError;
use crate::RendersResult;
use crate::compiler::TemplateSet;

/// The response side of a request, as seen by a [`Renderer`].
pub trait ResponseWriter {
	fn set_header(&mut self, name: HeaderName, value: HeaderValue);
	fn write_status(&mut self, status: StatusCode);
	fn write_body(&mut self, body: &[u8]) -> io::Result<()>;
}

impl ResponseWriter for Response<Vec<u8>> {
	fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
		self.headers_mut().insert(name, value);
	}

	fn write_status(&mut self, status: StatusCode) {
		*self.status_mut() = status;
	}

	fn write_body(&mut self, body: &[u8]) -> io::Result<()> {
		self.body_mut().extend_from_slice(body);
		Ok(())
	}
}

/// Callbacks run around every [`Renderer::status_render`]. Both receive the
/// template name as passed by the caller.
pub trait RenderHooks {
	fn before_render(&self, _name: &str) {}

	/// Runs after execution, whether it succeeded or not.
	fn after_render(&self, _name: &str) {}
}

/// Renders templates into one response.
pub struct Renderer<'a, W: ResponseWriter + ?Sized> {
	renders: &'a Renders,
	response: &'a mut W,
	hooks: Option<&'a dyn RenderHooks>,
	charset: Option<String>,
}

impl<'a, W: ResponseWriter + ?Sized> Renderer<'a, W> {
	pub fn new(renders: &'a Renders, response: &'a mut W) -> Self {
		Self {
			renders,
			response,
			hooks: None,
			charset: None,
		}
	}

	#[must_use]
	pub fn with_hooks(mut self, hooks: &'a dyn RenderHooks) -> Self {
		self.hooks = Some(hooks);
		self
	}

	/// Use `charset` instead of the configured one for this response.
	pub fn set_charset(&mut self, charset: impl Into<String>) {
		self.charset = Some(charset.into());
	}

	pub fn charset(&self) -> &str {
		match self.charset.as_deref() {
			Some(charset) if !charset.is_empty() => charset,
			_ => self.renders.options().charset.as_str(),
		}
	}

	/// Look up a compiled template set.
	pub fn template(&self, name: &str) -> Option<Arc<TemplateSet>> {
		self.renders.template(name)
	}

	/// Render with status `200 OK`.
	pub fn render(&mut self, name: &str, binding: impl Into<Binding>) -> RendersResult<()> {
		self.status_render(StatusCode::OK, name, binding)
	}

	/// Render `name` and write it to the response with `status`.
	///
	/// Nothing is written to the response unless the template executes
	/// successfully.
	pub fn status_render(
		&mut self,
		status: StatusCode,
		name: &str,
		binding: impl Into<Binding>,
	) -> RendersResult<()> {
		if self.renders.options().reload {
			self.renders.reload()?;
		}

		if let Some(hooks) = self.hooks {
			hooks.before_render(name);
		}
		let result = self.renders.execute(name, binding.into());
		if let Some(hooks) = self.hooks {
			hooks.after_render(name);
		}
		let buffer = result?;

		let content_type = self.content_type()?;
		self.response.set_header(CONTENT_TYPE, content_type);
		self.response.write_status(status);
		self.response.write_body(&buffer)?;

		Ok(())
	}

	/// Render `name` without running hooks or touching the response.
	pub fn render_bytes(&self, name: &str, binding: impl Into<Binding>) -> RendersResult<Vec<u8>> {
		self.renders.render_bytes(name, binding)
	}

	fn content_type(&self) -> RendersResult<HeaderValue> {
		let value = match self.charset.as_deref() {
			Some(charset) if !charset.is_empty() => {
				self.renders.options().content_type_header(Some(charset))
			}
			_ => self.renders.content_type().to_string(),
		};

		HeaderValue::from_str(&value).map_err(|_| RendersError::InvalidHeader(value))
	}
}
