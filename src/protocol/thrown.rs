//! Rejection values and their wire snapshot.
//!
//! A handler fails with a [`Thrown`] value, which may be plain JSON data, a
//! function, or an identity-bearing object graph that can contain function
//! properties and cycles. None of that can cross the bus as-is, so the
//! responder sends [`Thrown::serialize`]'s structural snapshot instead:
//!
//! - objects copy their own properties recursively, error-like objects
//!   carrying `name` and `message` among them
//! - function-valued properties are omitted
//! - a property pointing back at an object on the current descent path
//!   becomes `"[Circular]"`
//! - a bare function becomes `"[Function: anonymous]"`, whatever it is
//!   called
//! - primitives and plain JSON pass through unchanged
//! - nesting stops at [`MAX_DEPTH`]; anything deeper becomes `"[Object]"`

use crate::{lock_ignore_poison, RemoteError, RpcError};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

/// Stand-in for a property that refers back to one of its ancestors.
pub const CIRCULAR_SENTINEL: &str = "[Circular]";

/// Stand-in for a bare function rejection value.
pub const FUNCTION_SENTINEL: &str = "[Function: anonymous]";

/// Stand-in for an object or array nested deeper than [`MAX_DEPTH`].
pub const DEPTH_SENTINEL: &str = "[Object]";

/// Deepest object or array nesting kept in a snapshot.
///
/// Leaves room under serde_json's 128-level decode limit for the reply
/// envelope around the payload.
pub const MAX_DEPTH: usize = 100;

/// A live value a handler can fail with.
#[derive(Clone, Debug)]
pub enum Thrown {
    /// Primitive or plain JSON data.
    Value(Value),

    /// A function. It has no wire form of its own.
    Function,

    /// An object with identity, error-like or plain.
    Object(ObjectRef),

    /// An array whose elements may be live values.
    Array(Vec<Thrown>),

    /// A non-owning reference to an object, for building cycles.
    BackRef(WeakObjectRef),
}

impl Thrown {
    /// An error-like object named `Error` with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Thrown::Object(ObjectRef::error(message))
    }

    /// A bare function value.
    pub fn function() -> Self {
        Thrown::Function
    }

    /// Produce the wire snapshot sent in a `failure` reply.
    pub fn serialize(&self) -> Value {
        // ---
        match self {
            Thrown::Function => Value::String(FUNCTION_SENTINEL.to_string()),
            other => snapshot(other, &mut Vec::new(), 0).unwrap_or(Value::Null),
        }
    }
}

// Ancestor identities on the current descent path.
type Path = Vec<usize>;

// `None` means "omit": only functions produce it. `depth` counts the
// objects and arrays already entered.
fn snapshot(value: &Thrown, path: &mut Path, depth: usize) -> Option<Value> {
    // ---
    match value {
        Thrown::Value(v) => Some(v.clone()),
        Thrown::Function => None,
        Thrown::Array(_) | Thrown::Object(_) | Thrown::BackRef(_) if depth >= MAX_DEPTH => {
            Some(Value::String(DEPTH_SENTINEL.to_string()))
        }
        Thrown::Array(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| snapshot(item, path, depth + 1).unwrap_or(Value::Null))
                .collect(),
        )),
        Thrown::Object(obj) => Some(snapshot_object(obj, path, depth)),
        Thrown::BackRef(weak) => Some(match weak.upgrade() {
            Some(obj) => snapshot_object(&obj, path, depth),
            None => Value::Null,
        }),
    }
}

fn snapshot_object(obj: &ObjectRef, path: &mut Path, depth: usize) -> Value {
    // ---
    let id = obj.identity();
    if path.contains(&id) {
        return Value::String(CIRCULAR_SENTINEL.to_string());
    }

    // Copy the entries out: a self-referencing object would otherwise try to
    // re-lock itself while recursing.
    let entries = obj.entries();

    path.push(id);
    let mut map = Map::new();
    for (key, value) in &entries {
        if let Some(snap) = snapshot(value, path, depth + 1) {
            map.insert(key.clone(), snap);
        }
    }
    path.pop();

    Value::Object(map)
}

struct ObjectData {
    error_like: bool,
    // Own enumerable properties, in insertion order.
    props: Vec<(String, Thrown)>,
}

/// Shared handle to a rejection object.
///
/// Clones share one object, so setting a property through any clone is
/// visible through all of them, and a property can point back at its own
/// object. Prefer [`ObjectRef::backref`] for such self-references: a strong
/// [`Thrown::Object`] cycle is serialized correctly but is never freed.
#[derive(Clone)]
pub struct ObjectRef(Arc<Mutex<ObjectData>>);

/// Non-owning handle to a rejection object.
#[derive(Clone)]
pub struct WeakObjectRef(Weak<Mutex<ObjectData>>);


impl ObjectRef {
    fn with(error_like: bool, props: Vec<(String, Thrown)>) -> Self {
        Self(Arc::new(Mutex::new(ObjectData { error_like, props })))
    }

    /// An error-like object named `Error`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::named_error("Error", message)
    }

    /// An error-like object with an explicit name (`TypeError`, ...).
    pub fn named_error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with(
            true,
            vec![
                ("name".to_string(), Thrown::Value(Value::String(name.into()))),
                (
                    "message".to_string(),
                    Thrown::Value(Value::String(message.into())),
                ),
            ],
        )
    }

    /// An empty plain object.
    pub fn plain() -> Self {
        Self::with(false, Vec::new())
    }

    /// Set a property, replacing any earlier value under the same key.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Thrown>) -> &Self {
        // ---
        let key = key.into();
        let value = value.into();
        let mut data = lock_ignore_poison(&self.0);
        match data.props.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => data.props.push((key, value)),
        }
        self
    }

    /// Read a property.
    pub fn get(&self, key: &str) -> Option<Thrown> {
        let data = lock_ignore_poison(&self.0);
        data.props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Whether this object was created as an error.
    pub fn is_error(&self) -> bool {
        lock_ignore_poison(&self.0).error_like
    }

    /// A weak reference to this object, usable as one of its own properties.
    pub fn backref(&self) -> Thrown {
        Thrown::BackRef(WeakObjectRef(Arc::downgrade(&self.0)))
    }

    /// Whether two handles point at the same object.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    fn entries(&self) -> Vec<(String, Thrown)> {
        lock_ignore_poison(&self.0).props.clone()
    }
}

impl WeakObjectRef {
    /// The object, if it is still alive.
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }
}

// Property values may point back at the object, so Debug stays shallow.
impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = lock_ignore_poison(&self.0);
        let keys: Vec<&str> = data.props.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("ObjectRef")
            .field("error_like", &data.error_like)
            .field("keys", &keys)
            .finish()
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakObjectRef")
    }
}

impl From<Value> for Thrown {
    fn from(value: Value) -> Self {
        Thrown::Value(value)
    }
}

impl From<&str> for Thrown {
    fn from(value: &str) -> Self {
        Thrown::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Thrown {
    fn from(value: String) -> Self {
        Thrown::Value(Value::String(value))
    }
}

impl From<ObjectRef> for Thrown {
    fn from(obj: ObjectRef) -> Self {
        Thrown::Object(obj)
    }
}

impl From<Vec<Thrown>> for Thrown {
    fn from(items: Vec<Thrown>) -> Self {
        Thrown::Array(items)
    }
}

impl From<RemoteError> for Thrown {
    fn from(remote: RemoteError) -> Self {
        // ---
        let obj = ObjectRef::named_error(remote.name(), remote.message());
        for (key, value) in remote.properties() {
            obj.set(key.clone(), value.clone());
        }
        Thrown::Object(obj)
    }
}

/// Forwarding a nested call's failure re-emits what that call received.
impl From<RpcError> for Thrown {
    fn from(err: RpcError) -> Self {
        // ---
        match err {
            RpcError::Remote(remote) => remote.into(),
            RpcError::Rejected(value) => Thrown::Value(value),
            other => Thrown::error(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Thrown {
    fn from(err: serde_json::Error) -> Self {
        Thrown::Object(ObjectRef::named_error("SerializationError", err.to_string()))
    }
}
