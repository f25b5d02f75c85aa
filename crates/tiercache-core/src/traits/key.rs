use std::borrow::Cow;
use std::fmt::Display;

/// Anything that names a cache entry
///
/// The returned string is the logical key; the cache adds its namespace
/// prefix before anything reaches the remote tier. Tuples join their parts
/// with `:`, so `("user", 7)` and `"user:7"` name the same entry.
pub trait CacheKey: Send + Sync {
    fn cache_key(&self) -> String;
}

impl CacheKey for str {
    fn cache_key(&self) -> String {
        self.to_owned()
    }
}

impl CacheKey for String {
    fn cache_key(&self) -> String {
        self.clone()
    }
}

impl CacheKey for Cow<'_, str> {
    fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl<K: CacheKey + ?Sized> CacheKey for &K {
    fn cache_key(&self) -> String {
        (**self).cache_key()
    }
}

macro_rules! display_keys {
    ($($ty:ty),*) => {
        $(
            impl CacheKey for $ty {
                fn cache_key(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_keys!(u16, u32, u64, u128, usize, i16, i32, i64, i128, isize, char);

macro_rules! tuple_keys {
    ($($name:ident),+) => {
        impl<$($name: Display + Send + Sync),+> CacheKey for ($($name,)+) {
            #[allow(non_snake_case)]
            fn cache_key(&self) -> String {
                let ($($name,)+) = self;
                [$($name.to_string()),+].join(":")
            }
        }
    };
}

tuple_keys!(A);
tuple_keys!(A, B);
tuple_keys!(A, B, C);
tuple_keys!(A, B, C, D);
