//! Certificate retrieval.
//!
//! The validator depends only on [`CertificateFetcher`]. Anything that can
//! turn a URL into certificate bytes plugs in here: the bundled HTTP fetcher,
//! a caching wrapper, or a closure wrapped with [`fetcher_fn`].

use std::sync::Arc;

use crate::error::FetchError;

mod cache;
#[cfg(feature = "http")]
mod http;

pub use cache::{CacheConfig, CachingFetcher};
#[cfg(feature = "http")]
pub use http::{HttpCertificateFetcher, HttpFetcherConfig, FETCHER_USER_AGENT};

/// Resolves a certificate URL to its raw bytes.
///
/// Implementations must be safe to call from several threads at once; the
/// validator adds no locking of its own.
pub trait CertificateFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher backed by a closure.
#[derive(Clone)]
pub struct FnFetcher<F>(F);

/// Wrap a closure as a [`CertificateFetcher`].
pub fn fetcher_fn<F>(f: F) -> FnFetcher<F>
where
    F: Fn(&str) -> Result<Vec<u8>, FetchError> + Send + Sync,
{
    FnFetcher(f)
}

impl<F> CertificateFetcher for FnFetcher<F>
where
    F: Fn(&str) -> Result<Vec<u8>, FetchError> + Send + Sync,
{
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        (self.0)(url)
    }
}

impl<F> std::fmt::Debug for FnFetcher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFetcher").finish_non_exhaustive()
    }
}

impl<T: CertificateFetcher + ?Sized> CertificateFetcher for Arc<T> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(url)
    }
}

impl<T: CertificateFetcher + ?Sized> CertificateFetcher for Box<T> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(url)
    }
}
