//! Key-value state shared between contextual participants of one build.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use crate::session::RemoteRepository;

/// Key under which downloaded files are recorded.
pub const DOWNLOADS_KEY: &str = "downloads";

/// Files fetched during bootstrap dependency resolution, with their origin.
pub type Downloads = BTreeMap<PathBuf, RemoteRepository>;

/// Typed store handed to every contextual hook of one orchestrated build.
///
/// The store is owned by a single build and passed by `&mut`, so it is not
/// synchronised; participants of concurrent builds never share one.
#[derive(Default)]
pub struct SharedBootContext {
    values: HashMap<String, Box<dyn Any + Send>>,
}

impl SharedBootContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, returning whether a previous value was replaced.
    pub fn insert<T: Any + Send>(&mut self, key: impl Into<String>, value: T) -> bool {
        self.values.insert(key.into(), Box::new(value)).is_some()
    }

    /// Borrows the value under `key` if it has type `T`.
    #[must_use]
    pub fn get<T: Any + Send>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref::<T>()
    }

    /// Mutably borrows the value under `key` if it has type `T`.
    pub fn get_mut<T: Any + Send>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key)?.downcast_mut::<T>()
    }

    /// Borrows the value under `key`, inserting `init()` when absent.
    ///
    /// Returns `None` when the key holds a value of another type.
    pub fn get_or_insert_with<T, F>(&mut self, key: &str, init: F) -> Option<&mut T>
    where
        T: Any + Send,
        F: FnOnce() -> T,
    {
        self.values
            .entry(key.to_owned())
            .or_insert_with(|| Box::new(init()) as Box<dyn Any + Send>)
            .downcast_mut::<T>()
    }

    /// Removes and returns the value under `key` if it has type `T`.
    ///
    /// A value of another type is left in place.
    pub fn remove<T: Any + Send>(&mut self, key: &str) -> Option<T> {
        if !self.values.get(key)?.is::<T>() {
            return None;
        }
        let boxed = self.values.remove(key)?;
        boxed.downcast::<T>().ok().map(|value| *value)
    }

    /// Whether any value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the context is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Records a downloaded file under [`DOWNLOADS_KEY`].
    ///
    /// Returns `false` when the key is occupied by a value of another type.
    pub fn record_download(&mut self, file: PathBuf, repository: RemoteRepository) -> bool {
        match self.get_or_insert_with(DOWNLOADS_KEY, Downloads::new) {
            Some(downloads) => {
                downloads.insert(file, repository);
                true
            }
            None => false,
        }
    }

    /// Files downloaded so far.
    #[must_use]
    pub fn downloads(&self) -> Option<&Downloads> {
        self.get::<Downloads>(DOWNLOADS_KEY)
    }
}

impl fmt::Debug for SharedBootContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("SharedBootContext")
            .field("keys", &keys)
            .finish()
    }
}
