//! Pattern-routing handler.
//!
//! # Responsibilities
//! - Compile selector patterns anchored to the whole selector
//! - Keep routes in registration order
//! - Hand named capture groups to the matched view
//!
//! # Design Decisions
//! - First registered match wins; order is never changed
//! - Routes are added by a consuming builder, so the registry is frozen once
//!   the handler is moved into an application
//! - Views are async; a synchronous view is one that never suspends

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use thiserror::Error;

use crate::gopher::{Request, Response};
use crate::handlers::{Handler, HandlerError};

/// A pattern that failed to compile.
#[derive(Debug, Error)]
#[error("invalid selector pattern `{pattern}`: {source}")]
pub struct PatternError {
    pattern: String,
    #[source]
    source: regex::Error,
}

/// Named capture groups of a matched selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(HashMap<String, String>);

impl Params {
    /// Value of a named group, if it took part in the match.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Renders the response for a matched route.
///
/// Implemented for every `Fn(Request, Params) -> impl Future` closure whose
/// output converts into a [`Response`].
#[async_trait]
pub trait View: Send + Sync {
    async fn render(&self, request: &Request, params: Params) -> Result<Response, HandlerError>;
}

#[async_trait]
impl<F, Fut, R> View for F
where
    F: Fn(Request, Params) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    R: Into<Response> + 'static,
{
    async fn render(&self, request: &Request, params: Params) -> Result<Response, HandlerError> {
        (self)(request.clone(), params).await.map(Into::into)
    }
}

/// Adapter for views that return immediately.
struct SyncView<F>(F);

#[async_trait]
impl<F, R> View for SyncView<F>
where
    F: Fn(&Request, &Params) -> Result<R, HandlerError> + Send + Sync,
    R: Into<Response> + 'static,
{
    async fn render(&self, request: &Request, params: Params) -> Result<Response, HandlerError> {
        (self.0)(request, &params).map(Into::into)
    }
}

struct Route {
    pattern: Regex,
    view: Box<dyn View>,
}

/// Routes selectors to views by regular expression.
#[derive(Default)]
pub struct PatternHandler {
    routes: Vec<Route>,
}

impl PatternHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `view` for selectors fully matching `pattern`.
    pub fn register(mut self, pattern: &str, view: impl View + 'static) -> Result<Self, PatternError> {
        let compiled = Regex::new(&format!(r"\A(?:{})\z", pattern)).map_err(|source| PatternError {
            pattern: pattern.to_owned(),
            source,
        })?;
        tracing::debug!(pattern = %pattern, position = self.routes.len(), "Route registered");
        self.routes.push(Route {
            pattern: compiled,
            view: Box::new(view),
        });
        Ok(self)
    }

    /// Register a view that never suspends.
    pub fn register_sync<F, R>(self, pattern: &str, view: F) -> Result<Self, PatternError>
    where
        F: Fn(&Request, &Params) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Response> + 'static,
    {
        self.register(pattern, SyncView(view))
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for PatternHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternHandler")
            .field(
                "routes",
                &self.routes.iter().map(|r| r.pattern.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[async_trait]
impl Handler for PatternHandler {
    async fn handle(&self, request: &Request) -> Result<Response, HandlerError> {
        for route in &self.routes {
            let Some(captures) = route.pattern.captures(request.selector()) else {
                continue;
            };
            let params = route
                .pattern
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|m| (name.to_owned(), m.as_str().to_owned()))
                })
                .collect();
            tracing::trace!(pattern = %route.pattern.as_str(), selector = %request.selector(), "Route matched");
            return route.view.render(request, params).await;
        }
        Err(HandlerError::NotFound)
    }
}
