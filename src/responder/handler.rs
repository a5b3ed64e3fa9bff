use crate::{ObjectRef, Thrown};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

/// What a registered handler settles with, after serialization.
pub type HandlerResult = std::result::Result<Value, Thrown>;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Positional arguments of one call, as the caller passed them.
///
/// # Example
///
/// ```
/// use promise_ipc::Args;
/// use serde_json::json;
///
/// let args = Args::from(vec![json!("foo"), json!(2)]);
/// let name: String = args.parse(0).unwrap();
/// let count: u32 = args.parse(1).unwrap();
/// assert_eq!((name.as_str(), count), ("foo", 2));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw argument at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Deserialize the argument at `index`.
    ///
    /// A missing or mistyped argument fails with a `TypeError`, ready to be
    /// returned from the handler with `?`.
    pub fn parse<T>(&self, index: usize) -> std::result::Result<T, Thrown>
    where
        T: DeserializeOwned,
    {
        // ---
        let value = self.0.get(index).cloned().ok_or_else(|| {
            Thrown::from(ObjectRef::named_error(
                "TypeError",
                format!("missing argument {index}"),
            ))
        })?;

        serde_json::from_value(value).map_err(|err| {
            Thrown::from(ObjectRef::named_error(
                "TypeError",
                format!("argument {index}: {err}"),
            ))
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl IntoIterator for Args {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Args {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// Handler trait for type-erased route handlers
pub(crate) trait HandlerFn: Send + Sync {
    fn call(&self, args: Args) -> BoxFuture<'static, HandlerResult>;
}

// Handler returning a future
pub(crate) struct AsyncHandler<F, Fut, R> {
    func: F,
    _phantom: PhantomData<fn(Fut, R)>,
}

impl<F, Fut, R> AsyncHandler<F, Fut, R> {
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut, R> HandlerFn for AsyncHandler<F, Fut, R>
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<R, Thrown>> + Send + 'static,
    R: Serialize + Send + 'static,
{
    fn call(&self, args: Args) -> BoxFuture<'static, HandlerResult> {
        // ---
        let fut = (self.func)(args);

        Box::pin(async move {
            let value = fut.await?;
            Ok(serde_json::to_value(value)?)
        })
    }
}

// Handler returning its outcome directly
pub(crate) struct SyncHandler<F, R> {
    func: F,
    _phantom: PhantomData<fn(R)>,
}

impl<F, R> SyncHandler<F, R> {
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

impl<F, R> HandlerFn for SyncHandler<F, R>
where
    F: Fn(Args) -> std::result::Result<R, Thrown> + Send + Sync + 'static,
    R: Serialize + Send + 'static,
{
    fn call(&self, args: Args) -> BoxFuture<'static, HandlerResult> {
        // ---
        let outcome = (self.func)(args)
            .and_then(|value| serde_json::to_value(value).map_err(Thrown::from));

        Box::pin(std::future::ready(outcome))
    }
}
