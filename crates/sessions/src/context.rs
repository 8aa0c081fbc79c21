//! Read-only view of a request's named parameters.

use std::collections::HashMap;

/// The named parameters of an inbound request, as seen by the repository.
///
/// The repository only ever reads the configured subsession parameter from
/// it; building one is the web layer's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    params: HashMap<String, String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from `(name, value)` pairs.  Later duplicates win.
    pub fn from_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Look up a named parameter.
    ///
    /// Empty values read as absent, so `?subsession_id=` selects the
    /// `no_subsession` record (and gets a fresh id from the middleware)
    /// rather than a key ending in a bare `:`.  A framework that treats the
    /// empty string as a present value would key it `_session_id:<sid>:`
    /// instead.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}
