//! Schema validation contract.
//!
//! A [`Schema`] turns sanitized JSON input into the handler's input type or a
//! [`ValidationError`] listing the `{ path, message }` pairs that failed.
//!
//! Request types are plain serde DTOs. [`Dto`] deserializes them, reporting
//! the path of the field serde rejected, then runs the DTO's own [`Validate`]
//! checks. [`AnyInput`] hands the raw JSON through and [`schema_fn`] wraps a
//! closure.

use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ValidationError;

/// Validates and converts pipeline input.
pub trait Schema: Send + Sync {
    type Output: Send + 'static;

    fn parse(&self, input: Value) -> Result<Self::Output, ValidationError>;
}

/// Schema that accepts any input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyInput;

impl Schema for AnyInput {
    type Output = Value;

    fn parse(&self, input: Value) -> Result<Value, ValidationError> {
        Ok(input)
    }
}

/// Schema backed by a closure.
pub struct FnSchema<F, O> {
    f: F,
    _out: PhantomData<fn() -> O>,
}

/// Wrap a validation closure as a [`Schema`].
pub fn schema_fn<F, O>(f: F) -> FnSchema<F, O>
where
    F: Fn(Value) -> Result<O, ValidationError> + Send + Sync,
    O: Send + 'static,
{
    FnSchema {
        f,
        _out: PhantomData,
    }
}

impl<F, O> Schema for FnSchema<F, O>
where
    F: Fn(Value) -> Result<O, ValidationError> + Send + Sync,
    O: Send + 'static,
{
    type Output = O;

    fn parse(&self, input: Value) -> Result<O, ValidationError> {
        (self.f)(input)
    }
}

/// Rules a DTO enforces after deserialization (ranges, lengths, formats).
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Schema for a serde request type `T`.
pub struct Dto<T>(PhantomData<fn() -> T>);

/// Shorthand for [`Dto::new`].
pub fn dto<T>() -> Dto<T> {
    Dto::new()
}

impl<T> Dto<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Dto<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Dto<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Dto<T> {}

impl<T> core::fmt::Debug for Dto<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Dto<{}>", core::any::type_name::<T>())
    }
}

impl<T> Schema for Dto<T>
where
    T: DeserializeOwned + Validate + Send + 'static,
{
    type Output = T;

    fn parse(&self, input: Value) -> Result<T, ValidationError> {
        let value: T = serde_path_to_error::deserialize(input).map_err(|e| {
            let path = match e.path().to_string() {
                root if root == "." => String::new(),
                path => path,
            };
            ValidationError::single(path, e.into_inner().to_string())
        })?;
        value.validate()?;
        Ok(value)
    }
}

/// `deserialize_with` helper for fields that may arrive as strings.
///
/// Query-string values are always text; this accepts `"42"` as well as `42`
/// for any `T: FromStr`.
pub fn from_str_or_value<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Text(String),
        Value(T),
    }

    match Raw::<T>::deserialize(deserializer)? {
        Raw::Value(v) => Ok(v),
        Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

/// Issue collector for [`Validate`] implementations.
#[derive(Debug, Default)]
pub struct Checks {
    issues: Vec<crate::ValidationIssue>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` at `path` unless `ok` holds.
    pub fn ensure(&mut self, ok: bool, path: &str, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.issues.push(crate::ValidationIssue::new(path, message));
        }
        self
    }

    /// Character-count bounds for a string field.
    pub fn length(&mut self, value: &str, path: &str, min: usize, max: usize) -> &mut Self {
        let len = value.chars().count();
        self.ensure(
            len >= min,
            path,
            format!("String must contain at least {min} character(s)"),
        );
        self.ensure(
            len <= max,
            path,
            format!("String must contain at most {max} character(s)"),
        )
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.issues))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Listing {
        #[serde(default = "first_page", deserialize_with = "from_str_or_value")]
        page: u32,
        category: Option<String>,
    }

    fn first_page() -> u32 {
        1
    }

    impl Validate for Listing {
        fn validate(&self) -> Result<(), ValidationError> {
            let mut checks = Checks::new();
            checks.ensure(self.page >= 1, "page", "Number must be greater than or equal to 1");
            if let Some(category) = &self.category {
                checks.length(category, "category", 1, 40);
            }
            checks.finish()
        }
    }

    #[derive(Debug, Deserialize)]
    struct Line {
        #[allow(dead_code)]
        quantity: u32,
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Order {
        #[allow(dead_code)]
        lines: Vec<Line>,
    }

    impl Validate for Order {}

    #[test]
    fn any_input_passes_through() {
        let v = json!({"anything": [1, 2, 3]});
        assert_eq!(AnyInput.parse(v.clone()).unwrap(), v);
    }

    #[test]
    fn query_strings_are_coerced() {
        let listing = dto::<Listing>().parse(json!({"page": "3"})).unwrap();
        assert_eq!(listing, Listing { page: 3, category: None });
        assert_eq!(dto::<Listing>().parse(json!({"page": 2})).unwrap().page, 2);
        assert_eq!(dto::<Listing>().parse(json!({})).unwrap().page, 1);
    }

    #[test]
    fn rejected_field_is_reported_by_path() {
        let err = dto::<Listing>().parse(json!({"page": "abc"})).unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].path, "page");
    }

    #[test]
    fn nested_paths_and_unknown_fields() {
        let err = dto::<Order>()
            .parse(json!({"lines": [{"quantity": 1}, {"quantity": -2}]}))
            .unwrap_err();
        assert_eq!(err.issues()[0].path, "lines[1].quantity");

        let err = dto::<Order>()
            .parse(json!({"lines": [], "role": "admin"}))
            .unwrap_err();
        assert!(err.issues()[0].message.contains("unknown field `role`"));
    }

    #[test]
    fn missing_fields_are_reported_at_the_root() {
        let err = dto::<Order>().parse(json!({})).unwrap_err();
        assert_eq!(err.issues()[0].path, "");
        assert_eq!(err.issues()[0].message, "missing field `lines`");
    }

    #[test]
    fn validate_collects_every_failing_rule() {
        let err = dto::<Listing>()
            .parse(json!({"page": 0, "category": ""}))
            .unwrap_err();
        assert_eq!(
            err.messages_for("page"),
            vec!["Number must be greater than or equal to 1"]
        );
        assert_eq!(
            err.messages_for("category"),
            vec!["String must contain at least 1 character(s)"]
        );
    }

    #[test]
    fn closures_can_act_as_schemas() {
        let schema = schema_fn(|v: Value| match v.as_str() {
            Some(s) if !s.is_empty() => Ok(s.to_uppercase()),
            _ => Err(ValidationError::single("", "Expected a non-empty string")),
        });
        assert_eq!(schema.parse(json!("sku-1")).unwrap(), "SKU-1");
        assert!(schema.parse(json!(1)).is_err());
    }
}
