//! Read-only view over the metadata attached to a call.
//!
//! Keys are case-insensitive and may carry several values. A key is
//! normalized once when it is inserted: ASCII-lowercased, with a single
//! leading `:` pseudo-header prefix removed. Lookups apply the same rule,
//! so `":authorization"`, `"Authorization"` and `"authorization"` all
//! address one entry.

use http::HeaderMap;

/// Suffix marking binary-valued metadata keys.
const BINARY_SUFFIX: &str = "-bin";

/// Ordered, multi-valued call metadata.
///
/// Entries keep the order in which their key was first seen. Every entry
/// holds at least one value. A value that arrived as bytes which are not
/// valid UTF-8 is kept as an unreadable slot: it still counts towards the
/// values of its key but is never handed out as text.
///
/// # Example
///
/// ```
/// use rpc_interceptors_core::Metadata;
///
/// let md = Metadata::pairs([
///     (":authorization", "Basic login:passwd"),
///     ("Authorization", "bearer some_token"),
/// ]);
/// assert_eq!(md.get_all("authorization").len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, Vec<Option<String>>)>,
}

impl Metadata {
    /// Create an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a view from key/value pairs. Repeated keys accumulate values.
    pub fn pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        pairs.into_iter().collect()
    }

    /// Build a view from transport headers.
    ///
    /// All values of a repeated header are kept. Values that are not valid
    /// UTF-8 are kept as unreadable slots, so the number of values per key
    /// always matches the transport. Binary (`-bin`) headers are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut md = Self::new();
        for name in headers.keys() {
            if name.as_str().ends_with(BINARY_SUFFIX) {
                continue;
            }
            for value in headers.get_all(name) {
                md.push(name.as_str(), value.to_str().ok().map(str::to_owned));
            }
        }
        md
    }

    /// Append a value under `key`.
    pub fn append<K, V>(&mut self, key: K, value: V)
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        self.push(key.as_ref(), Some(value.into()));
    }

    fn push(&mut self, key: &str, value: Option<String>) {
        let key = normalize_key(key);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Every value slot stored under `key`, in insertion order.
    ///
    /// `None` marks a value that was not valid UTF-8. Returns an empty slice
    /// when the key is absent.
    pub fn values(&self, key: &str) -> &[Option<String>] {
        let key = strip_pseudo_prefix(key);
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// The readable values stored under `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.values(key).iter().flatten().map(String::as_str).collect()
    }

    /// The first value stored under `key`, if it is readable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values(key).first()?.as_deref()
    }

    /// Returns `true` if at least one value is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        !self.values(key).is_empty()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, values)` entries with normalized keys.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<String>])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut md = Self::new();
        for (k, v) in iter {
            md.append(k, v);
        }
        md
    }
}

impl From<&HeaderMap> for Metadata {
    fn from(headers: &HeaderMap) -> Self {
        Self::from_headers(headers)
    }
}

fn strip_pseudo_prefix(key: &str) -> &str {
    key.strip_prefix(':').unwrap_or(key)
}

/// Normalize a metadata key the way [`Metadata`] stores it.
pub fn normalize_key(key: &str) -> String {
    strip_pseudo_prefix(key).to_ascii_lowercase()
}
