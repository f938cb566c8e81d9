//! HAL resources and resource collections
//!
//! A [`Resource`] holds its plain attributes plus its own `_links` and
//! `_embedded` sections; parsing a document splits the reserved keys out into
//! typed containers, recursively.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::config::{ContentType, HalContext, JsonOptions, SetOptions};
use crate::embedded::{Embedded, EmbeddedMember};
use crate::error::{HalError, json_type_name};
use crate::links::{LinkMember, Links};
use crate::store::Notifications;

pub const LINKS_KEY: &str = "_links";
pub const EMBEDDED_KEY: &str = "_embedded";

#[derive(Debug)]
struct ResourceState {
    attributes: Map<String, Value>,
    links: Links,
    embedded: Embedded,
}

/// A single HAL resource
///
/// Cloning yields another handle onto the same resource.
#[derive(Debug, Clone)]
pub struct Resource {
    state: Rc<RefCell<ResourceState>>,
    context: HalContext,
}

impl Default for Resource {
    fn default() -> Self {
        Self::new(HalContext::default())
    }
}

impl Resource {
    /// Empty resource
    pub fn new(context: HalContext) -> Self {
        let state = ResourceState {
            attributes: Map::new(),
            links: Links::with_context(context.clone()),
            embedded: Embedded::with_context(context.clone()),
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            context,
        }
    }

    /// Build a resource from a parsed JSON object
    pub fn from_map(mut map: Map<String, Value>, context: HalContext) -> Result<Self, HalError> {
        let links = map.remove(LINKS_KEY);
        let embedded = map.remove(EMBEDDED_KEY);

        let resource = Self::new(context);
        resource.state.borrow_mut().attributes = map;

        let options = SetOptions::default();
        if let Some(links) = links {
            resource.links_mut().set_json(links, &options)?;
        }
        if let Some(embedded) = embedded {
            resource.embedded_mut().set_json(embedded, &options)?;
        }
        Ok(resource)
    }

    pub fn from_value(value: Value, context: HalContext) -> Result<Self, HalError> {
        match value {
            Value::Object(map) => Self::from_map(map, context),
            other => Err(HalError::InvalidDocument(format!(
                "a resource must be an object, found {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Parse a HAL document
    pub fn from_json_str(json: &str, context: HalContext) -> Result<Self, HalError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value, context)
    }

    pub fn context(&self) -> &HalContext {
        &self.context
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.borrow().attributes.get(key).cloned()
    }

    /// Set a plain attribute
    ///
    /// The reserved `_links` and `_embedded` keys are routed to their sections.
    pub fn set(&self, key: &str, value: Value) -> Result<(), HalError> {
        let options = SetOptions::default();
        match key {
            LINKS_KEY => {
                self.links_mut().set_json(value, &options)?;
            }
            EMBEDDED_KEY => {
                self.embedded_mut().set_json(value, &options)?;
            }
            _ => {
                self.state
                    .borrow_mut()
                    .attributes
                    .insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Copy of the plain attributes
    pub fn attributes(&self) -> Map<String, Value> {
        self.state.borrow().attributes.clone()
    }

    pub fn links(&self) -> Ref<'_, Links> {
        Ref::map(self.state.borrow(), |state| &state.links)
    }

    /// Mutable access to `_links`; listeners run when the guard is dropped
    pub fn links_mut(&self) -> LinksMut<'_> {
        SectionMut::new(
            RefMut::map(self.state.borrow_mut(), |state| &mut state.links),
            Links::hold_notifications,
            Links::release_notifications,
        )
    }

    pub fn embedded(&self) -> Ref<'_, Embedded> {
        Ref::map(self.state.borrow(), |state| &state.embedded)
    }

    /// Mutable access to `_embedded`; listeners run when the guard is dropped
    pub fn embedded_mut(&self) -> EmbeddedMut<'_> {
        SectionMut::new(
            RefMut::map(self.state.borrow_mut(), |state| &mut state.embedded),
            Embedded::hold_notifications,
            Embedded::release_notifications,
        )
    }

    pub fn ptr_eq(&self, other: &Resource) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Plain JSON form
    ///
    /// `application/hal+json` adds the non-empty `_links` and `_embedded`
    /// sections to the attributes; `application/json` emits attributes only.
    pub fn to_json(&self, options: &JsonOptions) -> Value {
        let state = self.state.borrow();
        let mut json = state.attributes.clone();

        if self.context.config.resolve_content_type(options) == ContentType::HalJson {
            if !state.links.is_empty() {
                json.insert(LINKS_KEY.to_string(), state.links.to_json(options));
            }
            if !state.embedded.is_empty() {
                json.insert(EMBEDDED_KEY.to_string(), state.embedded.to_json(options));
            }
        }
        Value::Object(json)
    }

    pub fn to_json_string(&self, options: &JsonOptions) -> Result<String, HalError> {
        Ok(serde_json::to_string(&self.to_json(options))?)
    }
}

/// Mutable borrow of one section of a [`Resource`]
///
/// Change notifications of the section are queued while the guard is alive.
/// They are delivered on drop, after the resource borrow has been released,
/// so listeners may read the resource that owns the section.
pub struct SectionMut<'a, S, V> {
    section: Option<RefMut<'a, S>>,
    release: fn(&mut S) -> Notifications<V>,
}

pub type LinksMut<'a> = SectionMut<'a, Links, LinkMember>;
pub type EmbeddedMut<'a> = SectionMut<'a, Embedded, EmbeddedMember>;

impl<'a, S, V> SectionMut<'a, S, V> {
    fn new(
        mut section: RefMut<'a, S>,
        hold: fn(&mut S),
        release: fn(&mut S) -> Notifications<V>,
    ) -> Self {
        hold(&mut *section);
        Self {
            section: Some(section),
            release,
        }
    }
}

impl<S, V> Deref for SectionMut<'_, S, V> {
    type Target = S;

    fn deref(&self) -> &S {
        self.section
            .as_deref()
            .expect("section is only taken when the guard drops")
    }
}

impl<S, V> DerefMut for SectionMut<'_, S, V> {
    fn deref_mut(&mut self) -> &mut S {
        self.section
            .as_deref_mut()
            .expect("section is only taken when the guard drops")
    }
}

impl<S, V> Drop for SectionMut<'_, S, V> {
    fn drop(&mut self) {
        if let Some(mut section) = self.section.take() {
            let notifications = (self.release)(&mut *section);
            drop(section);
            notifications.dispatch();
        }
    }
}

impl<S: fmt::Debug, V> fmt::Debug for SectionMut<'_, S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SectionMut").field(&self.section).finish()
    }
}

/// Ordered collection of resources
#[derive(Debug, Clone, Default)]
pub struct ResourceCollection {
    resources: Rc<RefCell<Vec<Resource>>>,
}

impl ResourceCollection {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self {
            resources: Rc::new(RefCell::new(resources)),
        }
    }

    /// Build a collection where every value must be a resource object
    pub fn from_values(values: Vec<Value>, context: &HalContext) -> Result<Self, HalError> {
        let resources = values
            .into_iter()
            .map(|value| Resource::from_value(value, context.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(resources))
    }

    pub fn push(&self, resource: Resource) {
        self.resources.borrow_mut().push(resource);
    }

    pub fn get(&self, index: usize) -> Option<Resource> {
        self.resources.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.resources.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.borrow().is_empty()
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.resources.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &ResourceCollection) -> bool {
        Rc::ptr_eq(&self.resources, &other.resources)
    }

    pub fn to_json(&self, options: &JsonOptions) -> Value {
        Value::Array(
            self.resources
                .borrow()
                .iter()
                .map(|resource| resource.to_json(options))
                .collect(),
        )
    }
}

impl FromIterator<Resource> for ResourceCollection {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
