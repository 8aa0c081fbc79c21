//! Subsession assignment middleware.
//!
//! Runs before the session layer.  A request that arrives without a
//! subsession parameter, on a path that is not excluded, gets one injected
//! into its query string so every downstream reader (the session layer,
//! `Query` extractors, link builders) sees the same id:
//!
//! 1. the configured header, when present and well-formed;
//! 2. otherwise a fresh random 32-hex id.
//!
//! The effective id is also recorded as a [`SubsessionId`] extension.

use std::sync::Arc;

use anyhow::Context;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::HeaderName;
use axum::http::uri::{PathAndQuery, Uri};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use regex::Regex;

use ms_domain::config::{is_url_safe_token, ExcludePath, SubsessionConfig};
use ms_domain::trace::TraceEvent;
use ms_sessions::{IdGenerator, RandomHexId};

use crate::session_layer::request_context;

/// Longest subsession id accepted from a request header.
const MAX_HEADER_ID_LEN: usize = 128;

/// The subsession id in effect for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsessionId(pub String);

/// A compiled path exclusion.
#[derive(Debug, Clone)]
pub enum PathMatcher {
    /// Exact path match.
    Literal(String),
    /// Regex matched anywhere in the path.
    Pattern(Regex),
}

impl PathMatcher {
    pub fn compile(exclude: &ExcludePath) -> Result<Self, regex::Error> {
        Ok(match exclude {
            ExcludePath::Literal(path) => Self::Literal(path.clone()),
            ExcludePath::Pattern { pattern } => Self::Pattern(Regex::new(pattern)?),
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == path,
            Self::Pattern(re) => re.is_match(path),
        }
    }
}

/// Decides whether a request needs a subsession id and supplies one.
pub struct SubsessionPolicy {
    enabled: bool,
    param_name: String,
    header: Option<HeaderName>,
    exclude: Vec<PathMatcher>,
    ids: Arc<dyn IdGenerator>,
}

impl SubsessionPolicy {
    /// Build the policy from the `[subsession]` section.  `param_name` is the
    /// repository's subsession parameter (`store.param_name`).
    pub fn from_config(cfg: &SubsessionConfig, param_name: &str) -> anyhow::Result<Self> {
        let header = match cfg.header.as_deref() {
            Some(name) if !name.is_empty() => Some(
                HeaderName::from_bytes(name.as_bytes())
                    .with_context(|| format!("invalid subsession header name {name:?}"))?,
            ),
            _ => None,
        };
        let exclude = cfg
            .exclude_paths
            .iter()
            .map(PathMatcher::compile)
            .collect::<Result<Vec<_>, _>>()
            .context("compiling subsession.exclude_paths")?;

        Ok(Self {
            enabled: cfg.enabled,
            param_name: param_name.to_owned(),
            header,
            exclude,
            ids: Arc::new(RandomHexId),
        })
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn param_name(&self) -> &str {
        &self.param_name
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.iter().any(|m| m.matches(path))
    }

    /// Ensure `req` carries a subsession id unless its path is excluded.
    ///
    /// Returns the id that was injected, or `None` when the request already
    /// had one, was excluded, or assignment is disabled.
    pub fn assign<B>(&self, req: &mut Request<B>) -> Option<String> {
        if !self.enabled {
            return None;
        }

        if let Some(existing) = request_context(req.uri()).param(&self.param_name) {
            let existing = SubsessionId(existing.to_owned());
            req.extensions_mut().insert(existing);
            return None;
        }

        let path = req.uri().path().to_owned();
        if self.is_excluded(&path) {
            return None;
        }

        let (id, from_header) = match self.header_id(req.headers()) {
            Some(id) => (id, true),
            None => (self.ids.generate(), false),
        };

        let Some(uri) = with_query_param(req.uri(), &self.param_name, &id) else {
            tracing::warn!(path = %path, "could not rewrite request URI with subsession id");
            return None;
        };
        *req.uri_mut() = uri;
        req.extensions_mut().insert(SubsessionId(id.clone()));

        TraceEvent::SubsessionAssigned {
            path,
            subsession_id: id.clone(),
            from_header,
        }
        .emit();

        Some(id)
    }

    fn header_id(&self, headers: &HeaderMap) -> Option<String> {
        let name = self.header.as_ref()?;
        let value = headers.get(name)?.to_str().ok()?.trim();
        if value.len() <= MAX_HEADER_ID_LEN && is_url_safe_token(value) {
            Some(value.to_owned())
        } else {
            tracing::debug!(header = %name, "ignoring malformed subsession header");
            None
        }
    }
}

/// Axum middleware that applies [`SubsessionPolicy::assign`].  Attach via
/// `axum::middleware::from_fn_with_state`, outside the session layer.
pub async fn assign_subsession(
    State(policy): State<Arc<SubsessionPolicy>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    policy.assign(&mut req);
    next.run(req).await
}

/// `uri` with `name=value` appended to its query string.  Both parts must
/// already be URL-safe.
fn with_query_param(uri: &Uri, name: &str, value: &str) -> Option<Uri> {
    let query = match uri.query() {
        Some(q) if !q.is_empty() => format!("{q}&{name}={value}"),
        _ => format!("{name}={value}"),
    };
    let path_and_query = PathAndQuery::try_from(format!("{}?{query}", uri.path())).ok()?;
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    Uri::from_parts(parts).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ms_sessions::FixedId;

    fn policy(cfg: SubsessionConfig) -> SubsessionPolicy {
        SubsessionPolicy::from_config(&cfg, "subsession_id")
            .unwrap()
            .with_id_generator(Arc::new(FixedId("subsession_ID_hash".into())))
    }

    fn request(uri: &str) -> Request<()> {
        Request::builder().uri(uri).body(()).unwrap()
    }

    fn param(req: &Request<()>) -> Option<String> {
        request_context(req.uri())
            .param("subsession_id")
            .map(str::to_owned)
    }

    #[test]
    fn generates_an_id_into_the_request() {
        let mut req = request("/healthcheck");
        let assigned = policy(SubsessionConfig::default()).assign(&mut req);

        assert_eq!(assigned.as_deref(), Some("subsession_ID_hash"));
        assert_eq!(param(&req).as_deref(), Some("subsession_ID_hash"));
        assert_eq!(req.uri().path(), "/healthcheck");
        assert_eq!(
            req.extensions().get::<SubsessionId>(),
            Some(&SubsessionId("subsession_ID_hash".into()))
        );
    }

    #[test]
    fn keeps_existing_query_parameters() {
        let mut req = request("/search?q=rust&page=2");
        policy(SubsessionConfig::default()).assign(&mut req);

        let ctx = request_context(req.uri());
        assert_eq!(ctx.param("q"), Some("rust"));
        assert_eq!(ctx.param("page"), Some("2"));
        assert_eq!(ctx.param("subsession_id"), Some("subsession_ID_hash"));
    }

    #[test]
    fn does_not_overwrite_an_existing_id() {
        let mut req = request("/healthcheck?subsession_id=original");
        let assigned = policy(SubsessionConfig::default()).assign(&mut req);

        assert!(assigned.is_none());
        assert_eq!(param(&req).as_deref(), Some("original"));
        assert_eq!(
            req.extensions().get::<SubsessionId>(),
            Some(&SubsessionId("original".into()))
        );
    }

    #[test]
    fn skips_excluded_literal_paths() {
        let cfg = SubsessionConfig {
            exclude_paths: vec![
                ExcludePath::Literal("/some_path".into()),
                ExcludePath::Literal("/healthcheck".into()),
            ],
            ..SubsessionConfig::default()
        };
        let mut req = request("/healthcheck");
        assert!(policy(cfg).assign(&mut req).is_none());
        assert!(param(&req).is_none());
        assert!(req.extensions().get::<SubsessionId>().is_none());
    }

    #[test]
    fn skips_excluded_regex_paths() {
        let cfg = SubsessionConfig {
            exclude_paths: vec![ExcludePath::Pattern {
                pattern: "/health.*".into(),
            }],
            ..SubsessionConfig::default()
        };
        let policy = policy(cfg);
        let mut req = request("/healthcheck");
        assert!(policy.assign(&mut req).is_none());
        assert!(param(&req).is_none());

        let mut other = request("/orders");
        assert!(policy.assign(&mut other).is_some());
    }

    #[test]
    fn literal_exclusion_is_exact() {
        let cfg = SubsessionConfig {
            exclude_paths: vec![ExcludePath::Literal("/health".into())],
            ..SubsessionConfig::default()
        };
        let mut req = request("/healthcheck");
        assert!(policy(cfg).assign(&mut req).is_some());
    }

    #[test]
    fn header_takes_precedence_over_generation() {
        let mut req = Request::builder()
            .uri("/orders")
            .header("x-subsession-id", "tab-7")
            .body(())
            .unwrap();
        let assigned = policy(SubsessionConfig::default()).assign(&mut req);

        assert_eq!(assigned.as_deref(), Some("tab-7"));
        assert_eq!(param(&req).as_deref(), Some("tab-7"));
    }

    #[test]
    fn malformed_header_falls_back_to_generation() {
        let mut req = Request::builder()
            .uri("/orders")
            .header("x-subsession-id", "a&b=c")
            .body(())
            .unwrap();
        let assigned = policy(SubsessionConfig::default()).assign(&mut req);
        assert_eq!(assigned.as_deref(), Some("subsession_ID_hash"));
    }

    #[test]
    fn disabled_policy_does_nothing() {
        let cfg = SubsessionConfig {
            enabled: false,
            ..SubsessionConfig::default()
        };
        let mut req = request("/orders");
        assert!(policy(cfg).assign(&mut req).is_none());
        assert!(param(&req).is_none());
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let cfg = SubsessionConfig {
            exclude_paths: vec![ExcludePath::Pattern {
                pattern: "(".into(),
            }],
            ..SubsessionConfig::default()
        };
        assert!(SubsessionPolicy::from_config(&cfg, "subsession_id").is_err());
    }

    #[test]
    fn random_ids_by_default() {
        let policy = SubsessionPolicy::from_config(&SubsessionConfig::default(), "subsession_id")
            .unwrap();
        let mut a = request("/a");
        let mut b = request("/b");
        let id_a = policy.assign(&mut a).unwrap();
        let id_b = policy.assign(&mut b).unwrap();
        assert_eq!(id_a.len(), 32);
        assert_ne!(id_a, id_b);
    }
}
