use std::collections::BTreeMap;

use derive_more::Deref;
use derive_more::DerefMut;
use minijinja::Value;
use serde::Deserialize;
use serde::Serialize;

/// String-keyed template variables.
///
/// A [`Vars`] binding is the only kind of binding that receives the global
/// [`Options::vars`](crate::Options::vars) at render time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Deref, DerefMut)]
#[serde(transparent)]
pub struct Vars(
	#[deref]
	#[deref_mut]
	BTreeMap<String, Value>,
);

impl Vars {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style insert.
	#[must_use]
	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.0.insert(key.into(), value.into());
		self
	}

	/// Copy every entry of `other` into `self`. Entries of `other` replace
	/// entries of `self` with the same key.
	#[must_use]
	pub fn merge(mut self, other: &Vars) -> Self {
		for (key, value) in other.iter() {
			self.0.insert(key.clone(), value.clone());
		}
		self
	}
}

impl<K, V> FromIterator<(K, V)> for Vars
where
	K: Into<String>,
	V: Into<Value>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(
			iter.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		)
	}
}

impl From<BTreeMap<String, Value>> for Vars {
	fn from(map: BTreeMap<String, Value>) -> Self {
		Self(map)
	}
}

/// The data a template is executed against.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub enum Binding {
	/// No data.
	#[default]
	Empty,
	/// Named variables, merged with the global variables before rendering.
	Vars(Vars),
	/// Any other value, passed through untouched.
	Value(Value),
}

impl Binding {
	/// Wrap any serializable value.
	///
	/// Unit structs serialize to none; they are bound as an empty map so
	/// that they stay non-nil like any other struct.
	pub fn from_serialize<T: Serialize>(value: &T) -> Self {
		let value = Value::from_serialize(value);
		if size_of::<T>() == 0 && value.is_none() {
			return Self::Value(minijinja::context! {});
		}

		Self::Value(value)
	}

	/// True when there is nothing to bind: [`Binding::Empty`] or a nil
	/// [`Value`].
	pub fn is_nil(&self) -> bool {
		match self {
			Self::Empty => true,
			Self::Vars(_) => false,
			Self::Value(value) => is_nil(value),
		}
	}

	/// Build the render context, merging `globals` into a [`Binding::Vars`].
	pub(crate) fn into_context(self, globals: &Vars) -> Value {
		match self {
			Self::Vars(vars) => Value::from_serialize(vars.merge(globals)),
			Self::Value(value) if !is_nil(&value) => value,
			Self::Empty | Self::Value(_) => minijinja::context! {},
		}
	}
}

impl From<Vars> for Binding {
	fn from(vars: Vars) -> Self {
		Self::Vars(vars)
	}
}

impl From<Value> for Binding {
	fn from(value: Value) -> Self {
		Self::Value(value)
	}
}

impl From<()> for Binding {
	fn from((): ()) -> Self {
		Self::Empty
	}
}

impl<T: Into<Binding>> From<Option<T>> for Binding {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Empty, Into::into)
	}
}

impl From<serde_json::Value> for Binding {
	fn from(value: serde_json::Value) -> Self {
		Self::Value(Value::from_serialize(&value))
	}
}

/// True for an absent value: undefined or none. Empty maps, lists and
/// braced structs are not nil. A unit struct passed through
/// [`Value::from_serialize`] is none, and so is nil; bind it with
/// [`Binding::from_serialize`] to keep it non-nil.
pub fn is_nil(value: &Value) -> bool {
	value.is_undefined() || value.is_none()
}
