use std::{any::Any, borrow::Cow, fmt, rc::Rc};

use parse_display::Display;


/// Key of an entry in [`Deps`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum DepKey {
    #[display("{0}")]
    Name(Cow<'static, str>),
    #[display("{0}")]
    Index(i64),
}

impl From<&'static str> for DepKey {
    fn from(name: &'static str) -> Self {
        DepKey::Name(Cow::Borrowed(name))
    }
}
impl From<String> for DepKey {
    fn from(name: String) -> Self {
        DepKey::Name(Cow::Owned(name))
    }
}
impl From<i64> for DepKey {
    fn from(index: i64) -> Self {
        DepKey::Index(index)
    }
}
impl From<i32> for DepKey {
    fn from(index: i32) -> Self {
        DepKey::Index(index.into())
    }
}
impl From<usize> for DepKey {
    fn from(index: usize) -> Self {
        DepKey::Index(index as i64)
    }
}

trait DynDep: Any + fmt::Debug {
    fn dyn_eq(&self, other: &dyn DynDep) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T: PartialEq + fmt::Debug + 'static> DynDep for T {
    fn dyn_eq(&self, other: &dyn DynDep) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A type-erased dependency value.
///
/// Two values are equal when they have the same type and compare equal with [`PartialEq`].
#[derive(Clone)]
pub struct DepValue(Rc<dyn DynDep>);

impl DepValue {
    pub fn new<T: PartialEq + fmt::Debug + 'static>(value: T) -> Self {
        Self(Rc::new(value))
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        (*self.0).as_any().downcast_ref()
    }
}

impl PartialEq for DepValue {
    fn eq(&self, other: &Self) -> bool {
        (*self.0).dyn_eq(&*other.0)
    }
}

impl fmt::Debug for DepValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// A named set of dependencies, enumerated in insertion order.
///
/// Re-inserting an existing key replaces its value without moving it.
#[derive(Clone, Default, PartialEq)]
pub struct Deps {
    entries: Vec<(DepKey, DepValue)>,
}

impl Deps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: PartialEq + fmt::Debug + 'static>(
        mut self,
        key: impl Into<DepKey>,
        value: T,
    ) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<T: PartialEq + fmt::Debug + 'static>(&mut self, key: impl Into<DepKey>, value: T) {
        self.insert_value(key, DepValue::new(value));
    }

    pub fn insert_value(&mut self, key: impl Into<DepKey>, value: DepValue) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Gets the value of `key` if it exists and has type `T`.
    pub fn get<T: 'static>(&self, key: impl Into<DepKey>) -> Option<&T> {
        self.value(key)?.downcast_ref()
    }

    pub fn value(&self, key: impl Into<DepKey>) -> Option<&DepValue> {
        let key = key.into();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &DepKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DepKey, &DepValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Project the values into the sequence used for change detection.
    pub fn to_seq(&self) -> DepSeq {
        DepSeq(self.entries.iter().map(|(_, v)| v.clone()).collect())
    }
}

impl fmt::Debug for Deps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Ordered values compared position by position to decide whether a hook re-runs.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct DepSeq(Vec<DepValue>);

impl DepSeq {
    pub fn new(values: Vec<DepValue>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[DepValue] {
        &self.0
    }

    /// Returns `true` if `self` differs from the sequence of the previous cycle.
    ///
    /// No previous sequence, or a sequence of a different length, counts as a change.
    pub fn is_changed_from(&self, prev: Option<&DepSeq>) -> bool {
        let Some(prev) = prev else {
            return true;
        };
        if prev.len() != self.len() {
            tracing::warn!(
                prev = prev.len(),
                next = self.len(),
                "dependency count changed between cycles"
            );
            return true;
        }
        self != prev
    }
}

/// Build [`Deps`] from `key: value` pairs.
///
/// A bare `key` clones the variable of the same name.
///
/// ```
/// use fine_hooks::deps;
///
/// let id = 10;
/// let d = deps! { id, name: "x" };
/// assert_eq!(d.get::<i32>("id"), Some(&10));
/// assert_eq!(d.get::<&str>("name"), Some(&"x"));
/// ```
#[macro_export]
macro_rules! deps {
    (@value $key:ident) => {
        ::core::clone::Clone::clone(&$key)
    };
    (@value $key:ident : $value:expr) => {
        $value
    };
    () => {
        $crate::Deps::new()
    };
    ($($key:ident $(: $value:expr)?),+ $(,)?) => {{
        let mut deps = $crate::Deps::new();
        $(deps.insert(stringify!($key), $crate::deps!(@value $key $(: $value)?));)+
        deps
    }};
}
