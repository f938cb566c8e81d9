//! HAL link objects
//!
//! A [`Link`] keeps its JSON attributes as given, so registered properties
//! (`href`, `templated`, `type`, ...) and extension keys survive a round trip.
//! Both [`Link`] and [`LinkArray`] are shared handles: cloning one yields a
//! second handle onto the same link.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::config::JsonOptions;
use crate::error::{HalError, json_type_name};

/// A single hyperlink
#[derive(Debug, Clone, Default)]
pub struct Link {
    attributes: Rc<RefCell<Map<String, Value>>>,
}

impl Link {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self {
            attributes: Rc::new(RefCell::new(attributes)),
        }
    }

    /// Link with only an `href`
    pub fn from_href(href: impl Into<String>) -> Self {
        let link = Self::default();
        link.set_href(href);
        link
    }

    /// Build a link from a JSON object
    pub fn from_value(value: Value) -> Result<Self, HalError> {
        match value {
            Value::Object(map) => Ok(Self::new(map)),
            other => Err(HalError::InvalidDocument(format!(
                "a link must be an object, found {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.attributes.borrow().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.attributes.borrow_mut().insert(key.into(), value);
    }

    fn string_attribute(&self, key: &str) -> Option<String> {
        self.attributes
            .borrow()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn href(&self) -> Option<String> {
        self.string_attribute("href")
    }

    pub fn set_href(&self, href: impl Into<String>) {
        self.set("href", Value::String(href.into()));
    }

    /// True when `href` is a URI template
    pub fn templated(&self) -> bool {
        self.attributes
            .borrow()
            .get("templated")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Media type hint (`type`)
    pub fn media_type(&self) -> Option<String> {
        self.string_attribute("type")
    }

    pub fn deprecation(&self) -> Option<String> {
        self.string_attribute("deprecation")
    }

    pub fn name(&self) -> Option<String> {
        self.string_attribute("name")
    }

    pub fn profile(&self) -> Option<String> {
        self.string_attribute("profile")
    }

    pub fn title(&self) -> Option<String> {
        self.string_attribute("title")
    }

    pub fn hreflang(&self) -> Option<String> {
        self.string_attribute("hreflang")
    }

    /// Copy of the attribute map
    pub fn attributes(&self) -> Map<String, Value> {
        self.attributes.borrow().clone()
    }

    /// True if both handles point at the same link
    pub fn ptr_eq(&self, other: &Link) -> bool {
        Rc::ptr_eq(&self.attributes, &other.attributes)
    }

    /// Link objects have the same shape in every representation
    pub fn to_json(&self, _options: &JsonOptions) -> Value {
        Value::Object(self.attributes())
    }
}

/// Ordered list of links sharing one relation
#[derive(Debug, Clone, Default)]
pub struct LinkArray {
    links: Rc<RefCell<Vec<Link>>>,
}

impl LinkArray {
    pub fn new(links: Vec<Link>) -> Self {
        Self {
            links: Rc::new(RefCell::new(links)),
        }
    }

    pub fn push(&self, link: Link) {
        self.links.borrow_mut().push(link);
    }

    pub fn get(&self, index: usize) -> Option<Link> {
        self.links.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.links.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.borrow().is_empty()
    }

    /// Handles onto every link, in order
    pub fn links(&self) -> Vec<Link> {
        self.links.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &LinkArray) -> bool {
        Rc::ptr_eq(&self.links, &other.links)
    }

    pub fn to_json(&self, options: &JsonOptions) -> Value {
        Value::Array(
            self.links
                .borrow()
                .iter()
                .map(|link| link.to_json(options))
                .collect(),
        )
    }
}

impl FromIterator<Link> for LinkArray {
    fn from_iter<I: IntoIterator<Item = Link>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_link_accessors() {
        let link = Link::from_value(json!({
            "href": "/orders{?id}",
            "templated": true,
            "type": "application/hal+json",
            "title": "Orders",
            "x-extra": 1
        }))
        .unwrap();

        assert_eq!(link.href().as_deref(), Some("/orders{?id}"));
        assert!(link.templated());
        assert_eq!(link.media_type().as_deref(), Some("application/hal+json"));
        assert_eq!(link.title().as_deref(), Some("Orders"));
        assert_eq!(link.name(), None);
        assert_eq!(link.get("x-extra"), Some(json!(1)));
    }

    #[test]
    fn test_link_from_non_object() {
        assert!(matches!(
            Link::from_value(json!("/x")),
            Err(HalError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_link_handles_share_state() {
        let link = Link::from_href("/a");
        let other = link.clone();
        other.set_href("/b");

        assert!(link.ptr_eq(&other));
        assert_eq!(link.href().as_deref(), Some("/b"));
        assert!(!link.ptr_eq(&Link::from_href("/b")));
    }

    #[test]
    fn test_link_array_to_json() {
        let links: LinkArray = vec![Link::from_href("/1"), Link::from_href("/2")]
            .into_iter()
            .collect();
        links.push(Link::from_href("/3"));

        assert_eq!(links.len(), 3);
        assert_eq!(
            links.to_json(&JsonOptions::default()),
            json!([{"href": "/1"}, {"href": "/2"}, {"href": "/3"}])
        );
        assert_eq!(links.get(1).and_then(|l| l.href()).as_deref(), Some("/2"));
        assert!(links.get(3).is_none());
    }
}
