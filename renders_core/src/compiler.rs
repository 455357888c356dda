use std::fmt;

use minijinja::AutoEscape;
use minijinja::Environment;
use minijinja::Value;
use minijinja::syntax::SyntaxConfig;
use regex::Captures;

use crate::FuncMap;
use crate::RendersError;
use crate::RendersResult;
use crate::is_nil;
use crate::resolver::NamedTemplate;
use crate::resolver::ScanContext;
use crate::resolver::TagPatterns;
use crate::resolver::is_file_reference;
use crate::resolver::normalize_reference;

/// The compiled templates of one top-level file: the file itself plus every
/// file and define block reachable from it.
pub struct TemplateSet {
	name: String,
	names: Vec<String>,
	env: Environment<'static>,
}

impl fmt::Debug for TemplateSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TemplateSet")
			.field("name", &self.name)
			.field("names", &self.names)
			.finish_non_exhaustive()
	}
}

impl TemplateSet {
	/// Name of the top-level file this set was built for.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Every member of the set in registration order.
	pub fn names(&self) -> &[String] {
		&self.names
	}

	pub fn contains(&self, member: &str) -> bool {
		self.names.iter().any(|n| n == member)
	}

	/// Execute the top-level template into `out`.
	pub fn render_to(&self, context: Value, out: &mut Vec<u8>) -> RendersResult<()> {
		self.render_member_to(&self.name, context, out)
	}

	/// Execute any member of the set into `out`.
	pub fn render_member_to(
		&self,
		member: &str,
		context: Value,
		out: &mut Vec<u8>,
	) -> RendersResult<()> {
		let render_error = |e: minijinja::Error| {
			RendersError::Render {
				name: member.to_string(),
				message: e.to_string(),
			}
		};

		let template = self.env.get_template(member).map_err(|e| {
			if matches!(e.kind(), minijinja::ErrorKind::TemplateNotFound) {
				RendersError::TemplateNotFound(member.to_string())
			} else {
				render_error(e)
			}
		})?;
		let rendered = template.render(context).map_err(render_error)?;
		out.extend_from_slice(rendered.as_bytes());

		Ok(())
	}
}

/// Compile everything collected in `ctx` into one [`TemplateSet`].
///
/// Each source is split into its body, registered under the source name, and
/// one member per `define` section. `template` tags are lowered to include
/// statements. The first registration of a member name wins.
pub fn compile_set(
	ctx: ScanContext,
	patterns: &TagPatterns,
	funcs: Option<&FuncMap>,
) -> RendersResult<TemplateSet> {
	let Some(name) = ctx.templates.first().map(|t| t.name.clone()) else {
		return Err(RendersError::TemplateNotFound(
			ctx.root().display().to_string(),
		));
	};

	let mut env = new_environment(patterns, funcs)?;
	let mut names: Vec<String> = Vec::new();

	for template in ctx.templates {
		let (body, defines) = split_defines(&template, patterns)?;
		let members = std::iter::once(NamedTemplate {
			name: template.name.clone(),
			src: body,
		})
		.chain(defines);

		for member in members {
			if names.contains(&member.name) {
				tracing::warn!(
					set = %name,
					member = %member.name,
					source = %template.name,
					"template already defined, keeping the first definition"
				);
				continue;
			}

			let src = lower_template_tags(&member.src, patterns);
			env.add_template_owned(member.name.clone(), src)
				.map_err(|e| {
					RendersError::Parse {
						name: member.name.clone(),
						message: e.to_string(),
					}
				})?;
			tracing::debug!(set = %name, member = %member.name, "compiled template");
			names.push(member.name);
		}
	}

	Ok(TemplateSet { name, names, env })
}

fn new_environment(
	patterns: &TagPatterns,
	funcs: Option<&FuncMap>,
) -> RendersResult<Environment<'static>> {
	let syntax = SyntaxConfig::builder()
		.block_delimiters(
			patterns.block_delims.left.clone(),
			patterns.block_delims.right.clone(),
		)
		.variable_delimiters(patterns.delims.left.clone(), patterns.delims.right.clone())
		.build()
		.map_err(|e| RendersError::InvalidDelimiters(e.to_string()))?;

	let mut env = Environment::new();
	env.set_syntax(syntax);
	env.set_keep_trailing_newline(true);
	env.set_auto_escape_callback(|_| AutoEscape::Html);
	env.add_test("nil", |value: Value| is_nil(&value));

	for (name, func) in funcs.into_iter().flatten() {
		env.add_global(name.clone(), func.clone());
	}

	Ok(env)
}

/// Separate the `define` sections of `template` from its body.
fn split_defines(
	template: &NamedTemplate,
	patterns: &TagPatterns,
) -> RendersResult<(String, Vec<NamedTemplate>)> {
	let src = template.src.as_str();
	let mut body = String::with_capacity(src.len());
	let mut defines = Vec::new();
	let mut pos = 0;

	while let Some(open) = patterns.define.captures_at(src, pos) {
		let (Some(tag), Some(define_name)) = (open.get(0), open.name("name")) else {
			break;
		};
		body.push_str(&src[pos..tag.start()]);

		let Some(close) = patterns.end.find_at(src, tag.end()) else {
			return Err(RendersError::UnclosedDefine {
				template: template.name.clone(),
				name: define_name.as_str().to_string(),
			});
		};

		let nested = patterns
			.define
			.captures_at(src, tag.end())
			.filter(|inner| inner.get(0).is_some_and(|m| m.start() < close.start()));
		if let Some(inner) = nested {
			return Err(RendersError::NestedDefine {
				template: template.name.clone(),
				outer: define_name.as_str().to_string(),
				inner: inner["name"].to_string(),
			});
		}

		defines.push(NamedTemplate {
			name: define_name.as_str().to_string(),
			src: src[tag.end()..close.start()].to_string(),
		});
		pos = close.end();
	}

	body.push_str(&src[pos..]);
	Ok((body, defines))
}

/// Rewrite every `template` tag to an include statement.
fn lower_template_tags(src: &str, patterns: &TagPatterns) -> String {
	patterns
		.template
		.replace_all(src, |caps: &Captures<'_>| {
			let reference = &caps["name"];
			let (ltrim, rtrim) = (&caps["ltrim"], &caps["rtrim"]);
			if is_file_reference(reference) {
				let normalized =
					normalize_reference(reference).unwrap_or_else(|| reference.to_string());
				patterns.include_tag(&normalized, ltrim, rtrim)
			} else {
				patterns.include_tag(reference, ltrim, rtrim)
			}
		})
		.into_owned()
}
