//! Typed cache keys
//!
//! A key is an operation name plus, for parameterized operations, an encoded
//! parameter list. The value type travels with the key so a lookup can only
//! ever produce what the matching `put` stored.

use std::fmt;
use std::marker::PhantomData;

/// Key of a cached listing or lookup producing a `T`
pub struct CacheKey<T> {
    name: String,
    _value: PhantomData<fn() -> T>,
}

impl<T> CacheKey<T> {
    /// Key of an operation without parameters
    pub fn new(operation: &str) -> Self {
        Self {
            name: urlencoding::encode(operation).into_owned(),
            _value: PhantomData,
        }
    }

    /// Key of a parameterized operation, e.g. the bindings of one bucket.
    ///
    /// Names and values are percent-encoded, so `?`, `&` and `=` inside a
    /// parameter cannot make two parameterizations look alike. Parameter
    /// order is significant.
    pub fn with_params(operation: &str, params: &[(&str, &str)]) -> Self {
        let mut name = urlencoding::encode(operation).into_owned();
        for (i, (key, value)) in params.iter().enumerate() {
            name.push(if i == 0 { '?' } else { '&' });
            name.push_str(&urlencoding::encode(key));
            name.push('=');
            name.push_str(&urlencoding::encode(value));
        }
        Self {
            name,
            _value: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for CacheKey<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _value: PhantomData,
        }
    }
}

impl<T> PartialEq for CacheKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for CacheKey<T> {}

impl<T> fmt::Debug for CacheKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CacheKey").field(&self.name).finish()
    }
}

impl<T> fmt::Display for CacheKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
