use minijinja::Value;

use crate::FuncMap;

/// Version of this crate.
pub fn version() -> &'static str {
	env!("CARGO_PKG_VERSION")
}

/// `add(left, right)`
pub fn add(left: i64, right: i64) -> i64 {
	left.saturating_add(right)
}

/// A function table with the helpers shipped by this crate. Pass it to
/// [`Options::with_funcs`](crate::Options::with_funcs).
pub fn helper_funcs() -> FuncMap {
	let mut funcs = FuncMap::new();
	funcs.insert("add".to_string(), Value::from_function(add));
	funcs
}
