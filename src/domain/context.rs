//! Immutable context carrier and the log prefix chain.
//!
//! A [`Context`] is a persistent linked list of typed values. Attaching a
//! value returns a new context that shares every existing node with its
//! parent, so a context handed to another thread or stored elsewhere is
//! never changed by later extensions.
//!
//! The prefix chain stores one extra value under a private key:
//!
//! ```
//! use throttle_log::{extend_prefix, prefix_of, with_prefix, Context};
//!
//! let request = with_prefix(&Context::background(), "req=42");
//! let step = extend_prefix(&request, "step=load");
//!
//! assert_eq!(prefix_of(&request), "req=42");
//! assert_eq!(prefix_of(&step), "req=42 step=load");
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Typed key for values stored in a [`Context`].
///
/// Keys are usually zero-sized private types, which keeps values attached by
/// different modules from colliding.
pub trait ContextKey: 'static {
    /// Type of the value stored under this key.
    type Value: Send + Sync + 'static;
}

struct Node {
    key: TypeId,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Node>>,
}

/// Immutable, cheaply clonable value carrier.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Node>>,
}

impl Context {
    /// An empty context.
    pub fn background() -> Self {
        Self::default()
    }

    /// Return a child context with `value` attached under `K`.
    ///
    /// A value already stored under `K` is shadowed in the child but stays
    /// visible through `self`.
    pub fn with_value<K: ContextKey>(&self, value: K::Value) -> Self {
        Self {
            head: Some(Arc::new(Node {
                key: TypeId::of::<K>(),
                value: Arc::new(value),
                parent: self.head.clone(),
            })),
        }
    }

    /// The nearest value stored under `K`, if any.
    pub fn value<K: ContextKey>(&self) -> Option<&K::Value> {
        let wanted = TypeId::of::<K>();
        let mut node = self.head.as_deref();
        while let Some(current) = node {
            if current.key == wanted {
                return current.value.downcast_ref::<K::Value>();
            }
            node = current.parent.as_deref();
        }
        None
    }

    /// Number of values attached along this chain, shadowed ones included.
    pub fn depth(&self) -> usize {
        let mut count = 0;
        let mut node = self.head.as_deref();
        while let Some(current) = node {
            count += 1;
            node = current.parent.as_deref();
        }
        count
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("depth", &self.depth())
            .field("prefix", &prefix_of(self))
            .finish()
    }
}

struct LogPrefixKey;

impl ContextKey for LogPrefixKey {
    type Value = Arc<str>;
}

/// Start a new prefix chain, discarding any prefix already on `ctx`.
pub fn with_prefix(ctx: &Context, text: impl Into<String>) -> Context {
    let text: String = text.into();
    ctx.with_value::<LogPrefixKey>(Arc::from(text))
}

/// Append `text` to the prefix on `ctx`, joined by a single space.
///
/// Behaves like [`with_prefix`] when `ctx` carries no prefix yet.
pub fn extend_prefix(ctx: &Context, text: impl Into<String>) -> Context {
    let text: String = text.into();
    match ctx.value::<LogPrefixKey>() {
        Some(existing) => {
            ctx.with_value::<LogPrefixKey>(Arc::from(format!("{} {}", existing, text)))
        }
        None => with_prefix(ctx, text),
    }
}

/// The prefix stored on `ctx`, or the empty string.
pub fn prefix_of(ctx: &Context) -> &str {
    ctx.value::<LogPrefixKey>().map(|p| p.as_ref()).unwrap_or("")
}

impl Context {
    /// Method form of [`with_prefix`].
    pub fn with_prefix(&self, text: impl Into<String>) -> Context {
        with_prefix(self, text)
    }

    /// Method form of [`extend_prefix`].
    pub fn extend_prefix(&self, text: impl Into<String>) -> Context {
        extend_prefix(self, text)
    }

    /// Method form of [`prefix_of`].
    pub fn prefix(&self) -> &str {
        prefix_of(self)
    }
}
