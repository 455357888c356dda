//! `renders_core` loads HTML templates from a directory tree, compiles them into named template sets and renders them into HTTP responses.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Template directory
//!   → Scanner (walks the tree, keeps files with an accepted extension)
//!   → Resolver (follows `template` tags, records referenced define blocks)
//!   → Resolver (renames duplicate defines to `<name>_invalidated_#<k>`)
//!   → Compiler (splits defines out, lowers `template` tags to includes)
//!   → Renders (registry keyed by top-level file, swapped on reload)
//!   → Renderer (one response: hooks, headers, status, body)
//! ```
//!
//! ## Templates
//!
//! Templates use the [`minijinja`](https://docs.rs/minijinja) expression
//! language. Composition uses three tags written with the variable
//! delimiters (`{{ }}` by default):
//!
//! ```text
//! {{ template "partials/header.html" }}   include another file
//! {{ template "footer" }}                 include a define block
//! {{ define "footer" }}...{{ end }}       declare a define block
//! ```
//!
//! Every template set registers the `nil` test (`{% if user is nil %}`).
//! Output is always HTML escaped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use renders_core::Options;
//! use renders_core::Renders;
//! use renders_core::Vars;
//!
//! let renders = Renders::new(Options::new("templates")).unwrap();
//!
//! let mut response = http::Response::new(Vec::new());
//! renders
//! 	.renderer(&mut response)
//! 	.render("index.html", Vars::new().with("name", "tango"))
//! 	.unwrap();
//! ```

pub use binding::*;
pub use compiler::TemplateSet;
pub use config::*;
pub use error::*;
pub use funcs::*;
pub use pool::*;
pub use registry::*;
pub use renderer::*;

mod binding;
pub mod compiler;
pub mod config;
#[allow(unused_assignments)]
mod error;
mod funcs;
mod pool;
mod registry;
mod renderer;
pub mod resolver;
pub mod scanner;
