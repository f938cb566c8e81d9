//! The `_links` section of a HAL resource

use std::fmt;

use serde_json::{Map, Value, json};

use crate::config::{HalContext, JsonOptions, SetOptions};
use crate::error::{HalError, json_type_name};
use crate::link::{Link, LinkArray};
use crate::member::{Classified, Member, classify};
use crate::store::{AttributeStore, ChangeEvent, ListenerId, Notifications};

const ORIGIN: &str = "Links::set";

/// Typed value of one `_links` relation
#[derive(Debug, Clone)]
pub enum LinkMember {
    Link(Link),
    Array(LinkArray),
}

impl LinkMember {
    pub fn as_link(&self) -> Option<&Link> {
        match self {
            LinkMember::Link(link) => Some(link),
            LinkMember::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&LinkArray> {
        match self {
            LinkMember::Array(links) => Some(links),
            LinkMember::Link(_) => None,
        }
    }

    /// True if both members are handles onto the same link or link array
    pub fn ptr_eq(&self, other: &LinkMember) -> bool {
        match (self, other) {
            (LinkMember::Link(a), LinkMember::Link(b)) => a.ptr_eq(b),
            (LinkMember::Array(a), LinkMember::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn to_json(&self, options: &JsonOptions) -> Value {
        match self {
            LinkMember::Link(link) => link.to_json(options),
            LinkMember::Array(links) => links.to_json(options),
        }
    }
}

impl From<Link> for LinkMember {
    fn from(link: Link) -> Self {
        LinkMember::Link(link)
    }
}

impl From<LinkArray> for LinkMember {
    fn from(links: LinkArray) -> Self {
        LinkMember::Array(links)
    }
}

impl From<LinkMember> for Member<LinkMember> {
    fn from(member: LinkMember) -> Self {
        Member::Typed(member)
    }
}

impl From<Link> for Member<LinkMember> {
    fn from(link: Link) -> Self {
        Member::Typed(LinkMember::Link(link))
    }
}

impl From<LinkArray> for Member<LinkMember> {
    fn from(links: LinkArray) -> Self {
        Member::Typed(LinkMember::Array(links))
    }
}

/// Relation-keyed hyperlinks of a resource
///
/// Values that cannot be coerced are handled by the context's `links_policy`;
/// by default they are reported and skipped while the rest of the batch is
/// still stored. An array payload must hold only links or link objects: a
/// `null`, scalar or nested array element makes the whole relation invalid,
/// and it is reported or raised like any other invalid value instead of being
/// stored with gaps. Typed members passed in are stored as shared handles, so
/// later changes made through the caller's handle are visible here.
///
/// Diagnostics carry the relation (`rel`), the offending value (`value`), the
/// argument the caller passed to `set` (`key`: the relation name, the list of
/// relation names, or the raw mapping) and the `options`.
pub struct Links {
    store: AttributeStore<LinkMember>,
    context: HalContext,
}

impl Default for Links {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Links {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links").field("store", &self.store).finish()
    }
}

impl Links {
    pub fn new() -> Self {
        Self::with_context(HalContext::default())
    }

    pub fn with_context(context: HalContext) -> Self {
        Self {
            store: AttributeStore::new(),
            context,
        }
    }

    /// Build from a raw `_links` mapping
    pub fn from_value(value: Value, context: HalContext) -> Result<Self, HalError> {
        let mut links = Self::with_context(context);
        links.set_json(value, &SetOptions::default())?;
        Ok(links)
    }

    pub fn context(&self) -> &HalContext {
        &self.context
    }

    /// Coerce and store a single relation
    pub fn set_one(
        &mut self,
        relation: &str,
        value: impl Into<Member<LinkMember>>,
        options: &SetOptions,
    ) -> Result<&mut Self, HalError> {
        let key = Value::String(relation.to_string());
        self.store_member(relation, value.into(), &key, options)?;
        Ok(self)
    }

    /// Coerce and store every relation of a mapping, in iteration order
    pub fn set_many<I, K, M>(&mut self, mapping: I, options: &SetOptions) -> Result<&mut Self, HalError>
    where
        I: IntoIterator<Item = (K, M)>,
        K: AsRef<str>,
        M: Into<Member<LinkMember>>,
    {
        let entries: Vec<(String, Member<LinkMember>)> = mapping
            .into_iter()
            .map(|(relation, value)| (relation.as_ref().to_string(), value.into()))
            .collect();
        let key = Value::Array(
            entries
                .iter()
                .map(|(relation, _)| Value::String(relation.clone()))
                .collect(),
        );
        self.store_batch(entries, &key, options)
    }

    /// Store a raw JSON mapping; `null` leaves the links untouched
    pub fn set_json(&mut self, mapping: Value, options: &SetOptions) -> Result<&mut Self, HalError> {
        match mapping {
            Value::Null => Ok(self),
            Value::Object(map) => {
                let key = Value::Object(map.clone());
                let entries = map
                    .into_iter()
                    .map(|(relation, value)| (relation, Member::from(value)))
                    .collect();
                self.store_batch(entries, &key, options)
            }
            other => {
                let error = HalError::InvalidDocument(format!(
                    "_links must be an object, found {}",
                    json_type_name(&other)
                ));
                let context = json!({ "value": other, "options": options });
                self.context
                    .config
                    .links_policy
                    .handle(error, ORIGIN, context, self.context.reporter.as_ref())?;
                Ok(self)
            }
        }
    }

    fn store_batch(
        &mut self,
        entries: Vec<(String, Member<LinkMember>)>,
        key: &Value,
        options: &SetOptions,
    ) -> Result<&mut Self, HalError> {
        for (relation, member) in entries {
            self.store_member(&relation, member, key, options)?;
        }
        Ok(self)
    }

    /// `key` is what the caller passed to `set`, kept for diagnostics
    fn store_member(
        &mut self,
        relation: &str,
        member: Member<LinkMember>,
        key: &Value,
        options: &SetOptions,
    ) -> Result<(), HalError> {
        let coerced = match classify(member) {
            Classified::AlreadyTyped(typed) => Some(typed),
            Classified::ArrayPayload(elements) => match coerce_link_array(relation, elements) {
                Ok(links) => Some(LinkMember::Array(links)),
                Err((error, value)) => return self.invalid(relation, key, error, value, options),
            },
            Classified::ObjectPayload(map) => Some(LinkMember::Link(Link::new(map))),
            Classified::Absent => None,
            Classified::Invalid(value) => {
                let error = HalError::InvalidMember {
                    relation: relation.to_string(),
                    found: json_type_name(&value).to_string(),
                };
                return self.invalid(relation, key, error, value, options);
            }
        };

        tracing::debug!(relation, present = coerced.is_some(), "storing link relation");
        self.store.set(relation, coerced, options);
        Ok(())
    }

    fn invalid(
        &self,
        relation: &str,
        key: &Value,
        error: HalError,
        value: Value,
        options: &SetOptions,
    ) -> Result<(), HalError> {
        let context = json!({
            "rel": relation,
            "key": key,
            "value": value,
            "options": options,
        });
        self.context
            .config
            .links_policy
            .handle(error, ORIGIN, context, self.context.reporter.as_ref())
    }

    /// Remove a relation
    pub fn unset(&mut self, relation: &str, options: &SetOptions) -> &mut Self {
        self.store.unset(relation, options);
        self
    }

    pub fn get(&self, relation: &str) -> Option<&LinkMember> {
        self.store.get(relation)
    }

    /// The relation's link when it holds exactly one
    pub fn get_link(&self, relation: &str) -> Option<Link> {
        self.get(relation).and_then(LinkMember::as_link).cloned()
    }

    /// The `self` relation, which may be a single link or a link array
    pub fn get_self(&self) -> Option<&LinkMember> {
        self.get("self")
    }

    pub fn has_self(&self) -> bool {
        self.get_self().is_some()
    }

    pub fn contains(&self, relation: &str) -> bool {
        self.store.contains(relation)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.store.relations()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&LinkMember>)> {
        self.store.iter()
    }

    pub fn on_change<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ChangeEvent<'_, LinkMember>) + 'static,
    {
        self.store.on_change(listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.store.off(id)
    }

    pub(crate) fn hold_notifications(&mut self) {
        self.store.hold();
    }

    pub(crate) fn release_notifications(&mut self) -> Notifications<LinkMember> {
        self.store.release()
    }

    /// Plain JSON form of the section
    ///
    /// Absent relations serialize as `null`; `options` is forwarded to every link.
    pub fn to_json(&self, options: &JsonOptions) -> Value {
        let content_type = self.context.config.resolve_content_type(options);
        tracing::debug!(%content_type, relations = self.store.len(), "serializing links");

        let mut json = Map::new();
        for (relation, member) in self.store.iter() {
            let value = member.map_or(Value::Null, |member| member.to_json(options));
            json.insert(relation.to_string(), value);
        }
        Value::Object(json)
    }
}

/// Build a link array; on failure returns the error and the offending element
fn coerce_link_array(
    relation: &str,
    elements: Vec<Member<LinkMember>>,
) -> Result<LinkArray, (HalError, Value)> {
    let mut links = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        let (found, value) = match element {
            Member::Typed(LinkMember::Link(link)) => {
                links.push(link);
                continue;
            }
            Member::Json(Value::Object(map)) => {
                links.push(Link::new(map));
                continue;
            }
            Member::Typed(LinkMember::Array(nested)) => {
                ("link array", nested.to_json(&JsonOptions::default()))
            }
            Member::Array(_) => ("array", Value::Null),
            Member::Absent => ("null", Value::Null),
            Member::Json(other) => (json_type_name(&other), other),
        };
        let error = HalError::InvalidElement {
            relation: relation.to_string(),
            index,
            found: found.to_string(),
        };
        return Err((error, value));
    }
    Ok(LinkArray::new(links))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HalConfig;
    use crate::error::CollectingReporter;
    use crate::member::InvalidMemberPolicy;
    use std::rc::Rc;

    fn collecting(policy: InvalidMemberPolicy) -> (Links, Rc<CollectingReporter>) {
        let reporter = Rc::new(CollectingReporter::new());
        let config = HalConfig::builder().links_policy(policy).build();
        let links = Links::with_context(HalContext::new(config, reporter.clone()));
        (links, reporter)
    }

    #[test]
    fn test_object_becomes_link() {
        let mut links = Links::new();
        links
            .set_one("self", json!({"href": "/x"}), &SetOptions::default())
            .unwrap();

        assert!(links.has_self());
        assert_eq!(
            links.get_link("self").and_then(|l| l.href()).as_deref(),
            Some("/x")
        );
        assert_eq!(
            links.to_json(&JsonOptions::default()),
            json!({"self": {"href": "/x"}})
        );
    }

    #[test]
    fn test_array_becomes_link_array() {
        let mut links = Links::new();
        links
            .set_one(
                "item",
                json!([{"href": "/1"}, {"href": "/2"}]),
                &SetOptions::default(),
            )
            .unwrap();

        let member = links.get("item").unwrap();
        assert_eq!(member.as_array().map(LinkArray::len), Some(2));
        assert!(links.get_link("item").is_none());
    }

    #[test]
    fn test_self_may_be_array() {
        let mut links = Links::new();
        assert!(!links.has_self());
        links
            .set_one("self", json!([{"href": "/a"}]), &SetOptions::default())
            .unwrap();
        assert!(links.has_self());
        assert!(links.get_self().unwrap().as_array().is_some());
    }

    #[test]
    fn test_null_is_stored() {
        let mut links = Links::new();
        links
            .set_one("self", Value::Null, &SetOptions::default())
            .unwrap();

        assert!(links.contains("self"));
        assert!(!links.has_self());
        assert_eq!(links.to_json(&JsonOptions::default()), json!({"self": null}));
    }

    #[test]
    fn test_invalid_value_reported_by_default() {
        let (mut links, reporter) = collecting(InvalidMemberPolicy::Report);
        links
            .set_json(json!({"self": {"href": "/x"}, "bad": 42}), &SetOptions::default())
            .unwrap();

        assert!(links.has_self());
        assert!(!links.contains("bad"));

        let diagnostics = reporter.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].origin, "Links::set");
        assert!(diagnostics[0].message.contains("'rel'='bad'"));
        assert_eq!(diagnostics[0].context["rel"], json!("bad"));
        assert_eq!(diagnostics[0].context["value"], json!(42));
    }

    #[test]
    fn test_invalid_array_element_skips_relation() {
        let (mut links, reporter) = collecting(InvalidMemberPolicy::Report);
        links
            .set_one("item", json!([{"href": "/1"}, "nope"]), &SetOptions::default())
            .unwrap();

        assert!(!links.contains("item"));
        assert_eq!(reporter.len(), 1);
        assert_eq!(reporter.diagnostics()[0].context["value"], json!("nope"));
    }

    #[test]
    fn test_diagnostic_carries_key_and_options() {
        let (mut links, reporter) = collecting(InvalidMemberPolicy::Report);
        let mapping = json!({"self": {"href": "/x"}, "bad": 42});
        links.set_json(mapping.clone(), &SetOptions::silent()).unwrap();
        links
            .set_one("one", json!("x"), &SetOptions::default())
            .unwrap();
        links
            .set_many(
                vec![("a", json!({"href": "/a"})), ("b", json!([null]))],
                &SetOptions::default(),
            )
            .unwrap();

        let diagnostics = reporter.diagnostics();
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics[0].context["key"], mapping);
        assert_eq!(diagnostics[0].context["options"], json!({"silent": true}));
        assert_eq!(diagnostics[1].context["key"], json!("one"));
        assert_eq!(diagnostics[2].context["key"], json!(["a", "b"]));
        assert_eq!(diagnostics[2].context["options"], json!({"silent": false}));
        assert!(links.contains("a"));
        assert!(!links.contains("b"));
    }

    #[test]
    fn test_null_array_element_rejects_relation() {
        let (mut links, _) = collecting(InvalidMemberPolicy::Raise);
        let err = links
            .set_one("item", json!([{"href": "/1"}, null]), &SetOptions::default())
            .unwrap_err();

        assert!(matches!(
            err,
            HalError::InvalidElement { index: 1, ref found, .. } if found == "null"
        ));
        assert!(!links.contains("item"));
    }

    #[test]
    fn test_raise_policy() {
        let (mut links, reporter) = collecting(InvalidMemberPolicy::Raise);
        let err = links
            .set_one("bad", json!(true), &SetOptions::default())
            .unwrap_err();

        assert!(matches!(err, HalError::InvalidMember { ref relation, .. } if relation == "bad"));
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_null_mapping_is_noop() {
        let mut links = Links::new();
        links.set_json(Value::Null, &SetOptions::default()).unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_typed_link_shared() {
        let link = Link::from_href("/before");
        let mut links = Links::new();
        links
            .set_one("self", link.clone(), &SetOptions::default())
            .unwrap();

        link.set_href("/after");
        assert!(links.get_link("self").unwrap().ptr_eq(&link));
        assert_eq!(
            links.to_json(&JsonOptions::default()),
            json!({"self": {"href": "/after"}})
        );
    }

    #[test]
    fn test_unset() {
        let mut links = Links::new();
        links
            .set_one("self", json!({"href": "/x"}), &SetOptions::default())
            .unwrap();
        links.unset("self", &SetOptions::default());

        assert!(!links.has_self());
        assert!(links.is_empty());
    }
}
