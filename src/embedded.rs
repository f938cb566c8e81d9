//! The `_embedded` section of a HAL resource

use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Value, json};

use crate::config::{HalContext, JsonOptions, SetOptions};
use crate::error::{HalError, json_type_name};
use crate::member::{Classified, Member, classify};
use crate::resource::{Resource, ResourceCollection};
use crate::store::{AttributeStore, ChangeEvent, ListenerId, Notifications};

const ORIGIN: &str = "Embedded::set";

/// A typed embedded resource or collection
#[derive(Debug, Clone)]
pub enum EmbeddedResource {
    Resource(Resource),
    Collection(ResourceCollection),
}

impl EmbeddedResource {
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            EmbeddedResource::Resource(resource) => Some(resource),
            EmbeddedResource::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&ResourceCollection> {
        match self {
            EmbeddedResource::Collection(collection) => Some(collection),
            EmbeddedResource::Resource(_) => None,
        }
    }

    pub fn ptr_eq(&self, other: &EmbeddedResource) -> bool {
        match (self, other) {
            (EmbeddedResource::Resource(a), EmbeddedResource::Resource(b)) => a.ptr_eq(b),
            (EmbeddedResource::Collection(a), EmbeddedResource::Collection(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn to_json(&self, options: &JsonOptions) -> Value {
        match self {
            EmbeddedResource::Resource(resource) => resource.to_json(options),
            EmbeddedResource::Collection(collection) => collection.to_json(options),
        }
    }
}

/// Typed value of one `_embedded` relation
#[derive(Debug, Clone)]
pub enum EmbeddedMember {
    One(EmbeddedResource),
    /// Element-wise coerced array; `None` marks a null element
    Many(Vec<Option<EmbeddedResource>>),
}

impl EmbeddedMember {
    pub fn to_json(&self, options: &JsonOptions) -> Value {
        match self {
            EmbeddedMember::One(resource) => resource.to_json(options),
            EmbeddedMember::Many(elements) => Value::Array(
                elements
                    .iter()
                    .map(|element| element.as_ref().map_or(Value::Null, |r| r.to_json(options)))
                    .collect(),
            ),
        }
    }
}

impl From<Resource> for Member<EmbeddedResource> {
    fn from(resource: Resource) -> Self {
        Member::Typed(EmbeddedResource::Resource(resource))
    }
}

impl From<ResourceCollection> for Member<EmbeddedResource> {
    fn from(collection: ResourceCollection) -> Self {
        Member::Typed(EmbeddedResource::Collection(collection))
    }
}

impl From<EmbeddedResource> for Member<EmbeddedResource> {
    fn from(resource: EmbeddedResource) -> Self {
        Member::Typed(resource)
    }
}

impl From<EmbeddedMember> for Member<EmbeddedResource> {
    fn from(member: EmbeddedMember) -> Self {
        match member {
            EmbeddedMember::One(resource) => Member::Typed(resource),
            EmbeddedMember::Many(elements) => {
                Member::Array(elements.into_iter().map(Member::from).collect())
            }
        }
    }
}

/// Relation-keyed sub-resources of a resource
///
/// Values that cannot be coerced are handled by the context's
/// `embedded_policy`; by default the call fails at the first one and relations
/// stored earlier in the same batch are kept. Typed members passed in are
/// stored as shared handles.
pub struct Embedded {
    store: AttributeStore<EmbeddedMember>,
    collections: HashSet<String>,
    context: HalContext,
}

impl Default for Embedded {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Embedded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embedded")
            .field("store", &self.store)
            .field("collections", &self.collections)
            .finish()
    }
}

impl Embedded {
    pub fn new() -> Self {
        Self::with_context(HalContext::default())
    }

    pub fn with_context(context: HalContext) -> Self {
        Self {
            store: AttributeStore::new(),
            collections: HashSet::new(),
            context,
        }
    }

    /// Build from a raw `_embedded` mapping
    pub fn from_value(value: Value, context: HalContext) -> Result<Self, HalError> {
        let mut embedded = Self::with_context(context);
        embedded.set_json(value, &SetOptions::default())?;
        Ok(embedded)
    }

    pub fn context(&self) -> &HalContext {
        &self.context
    }

    /// Coerce array payloads of this relation into a [`ResourceCollection`]
    ///
    /// Applies to later `set` calls only.
    pub fn declare_collection(&mut self, relation: impl Into<String>) -> &mut Self {
        self.collections.insert(relation.into());
        self
    }

    pub fn is_collection(&self, relation: &str) -> bool {
        self.collections.contains(relation)
    }

    /// Coerce and store a single relation
    pub fn set_one(
        &mut self,
        relation: &str,
        value: impl Into<Member<EmbeddedResource>>,
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
        M: Into<Member<EmbeddedResource>>,
    {
        let entries: Vec<(String, Member<EmbeddedResource>)> = mapping
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

    /// Store a raw JSON mapping; `null` leaves the section untouched
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
                    "_embedded must be an object, found {}",
                    json_type_name(&other)
                ));
                let context = json!({ "value": other, "options": options });
                self.context.config.embedded_policy.handle(
                    error,
                    ORIGIN,
                    context,
                    self.context.reporter.as_ref(),
                )?;
                Ok(self)
            }
        }
    }

    fn store_batch(
        &mut self,
        entries: Vec<(String, Member<EmbeddedResource>)>,
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
        member: Member<EmbeddedResource>,
        key: &Value,
        options: &SetOptions,
    ) -> Result<(), HalError> {
        let coerced = match classify(member) {
            Classified::AlreadyTyped(typed) => Some(EmbeddedMember::One(typed)),
            Classified::ArrayPayload(elements) => {
                let coerced = if self.is_collection(relation) {
                    self.coerce_collection(relation, elements, key, options)?
                        .map(|c| EmbeddedMember::One(EmbeddedResource::Collection(c)))
                } else {
                    self.coerce_elements(relation, elements, key, options)?
                        .map(EmbeddedMember::Many)
                };
                match coerced {
                    Some(member) => Some(member),
                    None => return Ok(()),
                }
            }
            Classified::ObjectPayload(map) => {
                let resource = Resource::from_map(map, self.context.clone())?;
                Some(EmbeddedMember::One(EmbeddedResource::Resource(resource)))
            }
            Classified::Absent => None,
            Classified::Invalid(value) => {
                let error = HalError::InvalidMember {
                    relation: relation.to_string(),
                    found: json_type_name(&value).to_string(),
                };
                return self.invalid(relation, key, error, value, options);
            }
        };

        tracing::debug!(relation, present = coerced.is_some(), "storing embedded relation");
        self.store.set(relation, coerced, options);
        Ok(())
    }

    /// Element-wise coercion; `Ok(None)` when an invalid element was reported
    fn coerce_elements(
        &self,
        relation: &str,
        elements: Vec<Member<EmbeddedResource>>,
        key: &Value,
        options: &SetOptions,
    ) -> Result<Option<Vec<Option<EmbeddedResource>>>, HalError> {
        let mut coerced = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            let (found, value) = match element {
                Member::Typed(typed) => {
                    coerced.push(Some(typed));
                    continue;
                }
                Member::Absent | Member::Json(Value::Null) => {
                    coerced.push(None);
                    continue;
                }
                Member::Json(Value::Object(map)) => {
                    let resource = Resource::from_map(map, self.context.clone())?;
                    coerced.push(Some(EmbeddedResource::Resource(resource)));
                    continue;
                }
                Member::Array(_) => ("array", Value::Null),
                Member::Json(other) => (json_type_name(&other), other),
            };
            self.invalid_element(relation, index, found, value, key, options)?;
            return Ok(None);
        }
        Ok(Some(coerced))
    }

    /// Collection coercion for declared relations; every element must be a resource
    fn coerce_collection(
        &self,
        relation: &str,
        elements: Vec<Member<EmbeddedResource>>,
        key: &Value,
        options: &SetOptions,
    ) -> Result<Option<ResourceCollection>, HalError> {
        let collection = ResourceCollection::default();
        for (index, element) in elements.into_iter().enumerate() {
            let (found, value) = match element {
                Member::Typed(EmbeddedResource::Resource(resource)) => {
                    collection.push(resource);
                    continue;
                }
                Member::Json(Value::Object(map)) => {
                    collection.push(Resource::from_map(map, self.context.clone())?);
                    continue;
                }
                Member::Typed(EmbeddedResource::Collection(nested)) => {
                    ("collection", nested.to_json(&JsonOptions::default()))
                }
                Member::Absent => ("null", Value::Null),
                Member::Array(_) => ("array", Value::Null),
                Member::Json(other) => (json_type_name(&other), other),
            };
            self.invalid_element(relation, index, found, value, key, options)?;
            return Ok(None);
        }
        Ok(Some(collection))
    }

    fn invalid_element(
        &self,
        relation: &str,
        index: usize,
        found: &str,
        value: Value,
        key: &Value,
        options: &SetOptions,
    ) -> Result<(), HalError> {
        let error = HalError::InvalidElement {
            relation: relation.to_string(),
            index,
            found: found.to_string(),
        };
        self.invalid(relation, key, error, value, options)
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
        self.context.config.embedded_policy.handle(
            error,
            ORIGIN,
            context,
            self.context.reporter.as_ref(),
        )
    }

    /// Remove a relation
    pub fn unset(&mut self, relation: &str, options: &SetOptions) -> &mut Self {
        self.store.unset(relation, options);
        self
    }

    pub fn get(&self, relation: &str) -> Option<&EmbeddedMember> {
        self.store.get(relation)
    }

    /// The relation's resource when it holds a single one
    pub fn get_resource(&self, relation: &str) -> Option<Resource> {
        match self.get(relation)? {
            EmbeddedMember::One(EmbeddedResource::Resource(resource)) => Some(resource.clone()),
            _ => None,
        }
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

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&EmbeddedMember>)> {
        self.store.iter()
    }

    pub fn on_change<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ChangeEvent<'_, EmbeddedMember>) + 'static,
    {
        self.store.on_change(listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.store.off(id)
    }

    pub(crate) fn hold_notifications(&mut self) {
        self.store.hold();
    }

    pub(crate) fn release_notifications(&mut self) -> Notifications<EmbeddedMember> {
        self.store.release()
    }

    /// Plain JSON form of the section
    ///
    /// Absent relations and null array elements serialize as `null`; `options`
    /// is forwarded to every resource.
    pub fn to_json(&self, options: &JsonOptions) -> Value {
        let content_type = self.context.config.resolve_content_type(options);
        tracing::debug!(%content_type, relations = self.store.len(), "serializing embedded");

        let mut json = Map::new();
        for (relation, member) in self.store.iter() {
            let value = member.map_or(Value::Null, |member| member.to_json(options));
            json.insert(relation.to_string(), value);
        }
        Value::Object(json)
    }
}
