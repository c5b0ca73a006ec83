//! Route table and request dispatch.
//!
//! # Responsibilities
//! - Store compiled routes per method, in registration order
//! - Look up the first route whose template matches a path
//! - Drive a request through the matched handler chain
//!
//! # Design Decisions
//! - Immutable after startup; shared via `Arc` without locks
//! - First registered, first tried: overlapping templates are allowed and
//!   resolved by order, so register specific templates before general ones
//! - Unknown method, empty method table and no match are the same outcome

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use axum::http::StatusCode;

use crate::http::{target, Request, Response};
use crate::observability::metrics;
use crate::routing::chain::{self, BoxedHandler};
use crate::routing::template::PathTemplate;
use crate::routing::RouteError;

pub const NOT_FOUND_MESSAGE: &str = "Route not found";
const NO_RESPONSE_MESSAGE: &str = "Handler chain completed without a response";

/// Methods a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| RouteError::UnsupportedMethod(s.to_string()))
    }
}

impl TryFrom<&axum::http::Method> for Method {
    type Error = RouteError;

    fn try_from(method: &axum::http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

/// A registered route.
pub struct Route {
    method: Method,
    template: PathTemplate,
    handlers: Vec<BoxedHandler>,
}

impl Route {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn template(&self) -> &str {
        self.template.source()
    }

    pub fn param_names(&self) -> &[String] {
        self.template.param_names()
    }

    pub fn handlers(&self) -> &[BoxedHandler] {
        &self.handlers
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.template.source())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'r> {
    pub route: &'r Route,
    pub params: HashMap<String, String>,
}

impl<'r> RouteMatch<'r> {
    pub fn handlers(&self) -> &'r [BoxedHandler] {
        self.route.handlers()
    }
}

#[derive(Debug, Default)]
pub struct Router {
    routes: HashMap<Method, Vec<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler chain for `method` and `template`.
    pub fn register(
        &mut self,
        method: Method,
        template: &str,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<&mut Self, RouteError> {
        let handlers: Vec<BoxedHandler> = handlers.into_iter().collect();
        if handlers.is_empty() {
            return Err(RouteError::EmptyChain {
                method,
                template: template.to_string(),
            });
        }

        let template = PathTemplate::compile(template)?;
        tracing::debug!(
            method = %method,
            template = template.source(),
            pattern = template.pattern(),
            handlers = handlers.len(),
            "Route registered"
        );

        self.routes.entry(method).or_default().push(Route {
            method,
            template,
            handlers,
        });
        Ok(self)
    }

    pub fn get(
        &mut self,
        template: &str,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<&mut Self, RouteError> {
        self.register(Method::Get, template, handlers)
    }

    pub fn post(
        &mut self,
        template: &str,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<&mut Self, RouteError> {
        self.register(Method::Post, template, handlers)
    }

    pub fn put(
        &mut self,
        template: &str,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<&mut Self, RouteError> {
        self.register(Method::Put, template, handlers)
    }

    pub fn patch(
        &mut self,
        template: &str,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<&mut Self, RouteError> {
        self.register(Method::Patch, template, handlers)
    }

    pub fn delete(
        &mut self,
        template: &str,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<&mut Self, RouteError> {
        self.register(Method::Delete, template, handlers)
    }

    /// Append every route of `other` under `prefix`.
    ///
    /// `other`'s root template `/` is served at both `prefix` and `prefix/`.
    /// Routes keep their relative order and come after routes already
    /// registered here.
    pub fn nest(&mut self, prefix: &str, mut other: Router) -> Result<&mut Self, RouteError> {
        let prefix = prefix.trim_end_matches('/');

        for method in Method::ALL {
            for route in other.routes.remove(&method).unwrap_or_default() {
                match route.template() {
                    "/" if !prefix.is_empty() => {
                        self.register(method, prefix, route.handlers.clone())?;
                        self.register(method, &format!("{prefix}/"), route.handlers)?;
                    }
                    inner => {
                        let template = format!("{prefix}{inner}");
                        self.register(method, &template, route.handlers)?;
                    }
                }
            }
        }
        Ok(self)
    }

    /// All routes, grouped by method in `Method::ALL` order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        Method::ALL
            .into_iter()
            .filter_map(move |method| self.routes.get(&method))
            .flatten()
    }

    /// Find the first route for `method` whose template matches `path`.
    pub fn dispatch(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .get(&method)?
            .iter()
            .find_map(|route| {
                route.template.captures(path).map(|bound| RouteMatch {
                    route,
                    params: bound.into_iter().collect(),
                })
            })
    }

    /// Run one request through extraction, dispatch and the handler chain.
    ///
    /// Always yields a written response: 404 when nothing matches, 500 when
    /// a handler fails or the chain ends without writing.
    pub async fn handle(&self, mut request: Request) -> Response {
        let start = Instant::now();
        let mut response = Response::new();
        let extracted = target::extract(request.target());

        let matched = Method::try_from(request.method())
            .ok()
            .and_then(|method| self.dispatch(method, &extracted.path));

        let Some(matched) = matched else {
            tracing::debug!(
                method = %request.method(),
                path = %extracted.path,
                "No route matched"
            );
            response.error(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE);
            metrics::record_request(request.method().as_str(), response.status().as_u16(), "none", start);
            return response;
        };

        let route = matched.route;
        request.params = matched.params;
        request.query = extracted.query;

        match chain::run(route.handlers(), &mut request, &mut response).await {
            Ok(_) if response.is_sent() => {}
            Ok(completion) => {
                tracing::warn!(
                    method = %route.method(),
                    template = route.template(),
                    ?completion,
                    "Handler chain ended without a response"
                );
                response.fail(NO_RESPONSE_MESSAGE);
            }
            Err(e) => {
                tracing::error!(
                    method = %route.method(),
                    template = route.template(),
                    request_id = request.request_id().unwrap_or("unknown"),
                    error = %e,
                    "Handler chain failed"
                );
                response.fail(e.message());
            }
        }

        metrics::record_request(
            route.method().as_str(),
            response.status().as_u16(),
            route.template(),
            start,
        );
        response
    }
}
