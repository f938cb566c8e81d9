//! Coercion vocabulary shared by `Links` and `Embedded`
//!
//! Both containers accept the same input shape ([`Member`]), run it through the
//! single [`classify`] function and act on the resulting [`Classified`] tag.
//! What happens to values that cannot be coerced is decided by an
//! [`InvalidMemberPolicy`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ErrorReporter, HalError};

/// A value handed to a container's `set_one` / `set_many`
///
/// `T` is the container's typed member kind. Raw JSON and typed members can be
/// mixed freely, including inside [`Member::Array`].
#[derive(Debug, Clone)]
pub enum Member<T> {
    /// An already typed member, stored without re-wrapping
    Typed(T),
    /// A raw JSON fragment to coerce
    Json(Value),
    /// An ordered list whose elements are coerced one by one
    Array(Vec<Member<T>>),
    /// Explicit absence of the relation
    Absent,
}

impl<T> Member<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Member::Absent | Member::Json(Value::Null))
    }
}

impl<T> From<Value> for Member<T> {
    fn from(value: Value) -> Self {
        Member::Json(value)
    }
}

impl<T> From<Map<String, Value>> for Member<T> {
    fn from(map: Map<String, Value>) -> Self {
        Member::Json(Value::Object(map))
    }
}

impl<T> From<Vec<Member<T>>> for Member<T> {
    fn from(members: Vec<Member<T>>) -> Self {
        Member::Array(members)
    }
}

impl<T, U: Into<Member<T>>> From<Option<U>> for Member<T> {
    fn from(value: Option<U>) -> Self {
        value.map_or(Member::Absent, Into::into)
    }
}

/// Outcome of classifying a [`Member`] by shape
#[derive(Debug, Clone)]
pub enum Classified<T> {
    AlreadyTyped(T),
    ArrayPayload(Vec<Member<T>>),
    ObjectPayload(Map<String, Value>),
    Absent,
    Invalid(Value),
}

/// Classify a member by shape
///
/// JSON arrays are unfolded into element members so both raw and typed array
/// payloads reach the containers in the same form.
pub fn classify<T>(member: Member<T>) -> Classified<T> {
    match member {
        Member::Typed(typed) => Classified::AlreadyTyped(typed),
        Member::Array(elements) => Classified::ArrayPayload(elements),
        Member::Absent => Classified::Absent,
        Member::Json(Value::Null) => Classified::Absent,
        Member::Json(Value::Array(values)) => {
            Classified::ArrayPayload(values.into_iter().map(Member::Json).collect())
        }
        Member::Json(Value::Object(map)) => Classified::ObjectPayload(map),
        Member::Json(other) => Classified::Invalid(other),
    }
}

/// What a container does with a value it cannot coerce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidMemberPolicy {
    /// Send a diagnostic to the error reporter, skip the relation and go on
    Report,
    /// Fail the whole call; relations stored earlier in the batch stay stored
    Raise,
}

impl InvalidMemberPolicy {
    /// Apply the policy to a coercion failure
    ///
    /// Returns `Ok(())` when the failure was reported and processing may continue.
    pub(crate) fn handle(
        self,
        error: HalError,
        origin: &str,
        context: Value,
        reporter: &dyn ErrorReporter,
    ) -> Result<(), HalError> {
        match self {
            InvalidMemberPolicy::Report => {
                reporter.capture(&error.to_string(), origin, &context);
                Ok(())
            }
            InvalidMemberPolicy::Raise => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectingReporter;
    use serde_json::json;

    #[test]
    fn test_classify_shapes() {
        assert!(matches!(
            classify::<u8>(Member::Typed(7)),
            Classified::AlreadyTyped(7)
        ));
        assert!(matches!(
            classify::<u8>(json!({"href": "/x"}).into()),
            Classified::ObjectPayload(_)
        ));
        assert!(matches!(classify::<u8>(json!(null).into()), Classified::Absent));
        assert!(matches!(classify::<u8>(Member::Absent), Classified::Absent));
        assert!(matches!(
            classify::<u8>(json!(42).into()),
            Classified::Invalid(Value::Number(_))
        ));
        assert!(matches!(
            classify::<u8>(json!("text").into()),
            Classified::Invalid(Value::String(_))
        ));
        assert!(matches!(
            classify::<u8>(json!(true).into()),
            Classified::Invalid(Value::Bool(true))
        ));
    }

    #[test]
    fn test_classify_unfolds_json_arrays() {
        match classify::<u8>(json!([{"a": 1}, null, 3]).into()) {
            Classified::ArrayPayload(elements) => {
                assert_eq!(elements.len(), 3);
                assert!(matches!(elements[0], Member::Json(Value::Object(_))));
                assert!(elements[1].is_absent());
                assert!(matches!(elements[2], Member::Json(Value::Number(_))));
            }
            other => panic!("expected array payload, got {:?}", other),
        }
    }

    #[test]
    fn test_option_conversion() {
        let none: Member<u8> = Option::<Value>::None.into();
        assert!(none.is_absent());
        let some: Member<u8> = Some(json!({})).into();
        assert!(matches!(some, Member::Json(_)));
    }

    #[test]
    fn test_policy_handle() {
        let reporter = CollectingReporter::new();
        let error = HalError::InvalidMember {
            relation: "bad".to_string(),
            found: "number".to_string(),
        };

        assert!(
            InvalidMemberPolicy::Report
                .handle(error.clone(), "test", json!({}), &reporter)
                .is_ok()
        );
        assert_eq!(reporter.len(), 1);

        assert_eq!(
            InvalidMemberPolicy::Raise.handle(error.clone(), "test", json!({}), &reporter),
            Err(error)
        );
        assert_eq!(reporter.len(), 1);
    }
}
