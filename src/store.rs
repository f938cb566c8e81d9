//! Insertion-ordered attribute storage with change notification

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::config::SetOptions;

/// Handle returned by [`AttributeStore::on_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

/// Kind of change applied to a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A value (possibly an explicit absence) was written
    Stored,
    /// The relation was removed
    Unset,
}

/// Notification delivered to change listeners
///
/// `value` is the member stored by the change; it is `None` for an explicit
/// absence and for [`ChangeKind::Unset`].
#[derive(Debug)]
pub struct ChangeEvent<'a, V> {
    pub relation: &'a str,
    pub kind: ChangeKind,
    pub value: Option<&'a V>,
}

type Listener<V> = Rc<RefCell<dyn FnMut(&ChangeEvent<'_, V>)>>;

#[derive(Debug)]
struct PendingChange<V> {
    relation: String,
    kind: ChangeKind,
    value: Option<V>,
}

/// Changes waiting to be delivered, with the listeners registered when they
/// were taken from the store
///
/// Dispatching does not borrow the store, so listeners are free to read
/// whatever owns it.
#[must_use = "notifications are only delivered by `dispatch`"]
pub struct Notifications<V> {
    changes: Vec<PendingChange<V>>,
    listeners: Vec<Listener<V>>,
}

impl<V> Notifications<V> {
    fn empty() -> Self {
        Self {
            changes: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Deliver every change, in order, to every listener
    pub fn dispatch(self) {
        for change in &self.changes {
            let event = ChangeEvent {
                relation: &change.relation,
                kind: change.kind,
                value: change.value.as_ref(),
            };
            for listener in &self.listeners {
                // A listener that is already running (it wrote to the store
                // itself) does not see its own nested changes.
                if let Ok(mut listener) = listener.try_borrow_mut() {
                    (&mut *listener)(&event);
                }
            }
        }
    }
}

impl<V> fmt::Debug for Notifications<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifications")
            .field("changes", &self.changes.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Relation-keyed storage
///
/// `None` is a stored explicit absence, distinct from a relation that was never
/// set. Iteration follows first insertion order; overwriting a relation keeps
/// its position.
///
/// Listeners run after the write has been applied. While the store is held
/// (see [`AttributeStore::hold`]) changes are queued instead and handed out by
/// [`AttributeStore::release`], which lets an owner drop its own borrows
/// before any listener runs.
pub struct AttributeStore<V> {
    attributes: IndexMap<String, Option<V>>,
    listeners: Vec<(ListenerId, Listener<V>)>,
    next_listener: usize,
    pending: Vec<PendingChange<V>>,
    holds: usize,
}

impl<V> Default for AttributeStore<V> {
    fn default() -> Self {
        Self {
            attributes: IndexMap::new(),
            listeners: Vec::new(),
            next_listener: 0,
            pending: Vec::new(),
            holds: 0,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for AttributeStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeStore")
            .field("attributes", &self.attributes)
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<V> AttributeStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value for a relation; `None` both when unset and when absent
    pub fn get(&self, relation: &str) -> Option<&V> {
        self.attributes.get(relation).and_then(Option::as_ref)
    }

    /// True if the relation has been set, even to an explicit absence
    pub fn contains(&self, relation: &str) -> bool {
        self.attributes.contains_key(relation)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Relations in storage order
    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Stored entries in storage order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&V>)> {
        self.attributes
            .iter()
            .map(|(relation, value)| (relation.as_str(), value.as_ref()))
    }

    /// Register a change listener
    pub fn on_change<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ChangeEvent<'_, V>) + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        let listener: Listener<V> = Rc::new(RefCell::new(listener));
        self.listeners.push((id, listener));
        id
    }

    /// Remove a change listener; returns false if it was not registered
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Queue notifications until the matching [`AttributeStore::release`]
    ///
    /// Holds nest.
    pub fn hold(&mut self) {
        self.holds += 1;
    }

    /// End one hold and hand out the queued changes once no hold remains
    pub fn release(&mut self) -> Notifications<V> {
        self.holds = self.holds.saturating_sub(1);
        self.take_notifications()
    }

    pub fn is_held(&self) -> bool {
        self.holds > 0
    }

    fn take_notifications(&mut self) -> Notifications<V> {
        if self.holds > 0 || self.pending.is_empty() {
            return Notifications::empty();
        }
        Notifications {
            changes: mem::take(&mut self.pending),
            listeners: self
                .listeners
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect(),
        }
    }

    fn flush(&mut self) {
        self.take_notifications().dispatch();
    }
}

impl<V: Clone> AttributeStore<V> {
    /// Store a value under a relation and notify listeners unless silent
    pub fn set(&mut self, relation: &str, value: Option<V>, options: &SetOptions) {
        if !options.silent {
            self.pending.push(PendingChange {
                relation: relation.to_string(),
                kind: ChangeKind::Stored,
                value: value.clone(),
            });
        }
        self.attributes.insert(relation.to_string(), value);
        self.flush();
    }

    /// Remove a relation, returning what was stored under it
    pub fn unset(&mut self, relation: &str, options: &SetOptions) -> Option<Option<V>> {
        let previous = self.attributes.shift_remove(relation);
        if previous.is_some() && !options.silent {
            self.pending.push(PendingChange {
                relation: relation.to_string(),
                kind: ChangeKind::Unset,
                value: None,
            });
        }
        self.flush();
        previous
    }

    /// Remove every relation
    pub fn clear(&mut self, options: &SetOptions) {
        let relations: Vec<String> = self.attributes.keys().cloned().collect();
        self.hold();
        for relation in relations {
            self.unset(&relation, options);
        }
        self.release().dispatch();
    }
}
