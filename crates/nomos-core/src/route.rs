//! The resolved route handed over by a router.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;

use crate::document::{Document, Operation, PathItem, Server};

/// An operation matched to a request, with its raw path parameters.
///
/// Nomos performs no path matching; a router produces this value. Path
/// parameter values are kept exactly as they appeared in the request path
/// (still percent-encoded, prefixes included).
#[derive(Debug, Clone)]
pub struct Route {
    /// The document the operation belongs to.
    pub document: Arc<Document>,
    /// Path template, e.g. `/pets/{petId}`.
    pub template: String,
    /// HTTP method of the operation.
    pub method: Method,
    /// The path item.
    pub path_item: Arc<PathItem>,
    /// The operation.
    pub operation: Arc<Operation>,
    /// Raw path parameter values by name.
    pub path_params: HashMap<String, String>,
    /// The server the request was addressed to, if the router knows.
    pub server: Option<Server>,
}

impl Route {
    /// Builds a route from parts a router already holds.
    pub fn new(
        document: Arc<Document>,
        template: impl Into<String>,
        method: Method,
        path_item: Arc<PathItem>,
        operation: Arc<Operation>,
    ) -> Self {
        Self {
            document,
            template: template.into(),
            method,
            path_item,
            operation,
            path_params: HashMap::new(),
            server: None,
        }
    }

    /// Looks up a route by path template and method.
    pub fn resolve(document: &Arc<Document>, method: &Method, template: &str) -> Option<Self> {
        let path_item = document.paths.get(template)?;
        let operation = path_item.get(method)?;
        Some(Self::new(
            Arc::clone(document),
            template,
            method.clone(),
            Arc::clone(path_item),
            Arc::clone(operation),
        ))
    }

    /// Adds a raw path parameter value.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), raw.into());
        self
    }

    /// Sets the server.
    #[must_use]
    pub fn with_server(mut self, server: Server) -> Self {
        self.server = Some(server);
        self
    }

    /// The operation id, or the method and template when none is declared.
    pub fn operation_name(&self) -> String {
        self.operation
            .operation_id
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.method, self.template))
    }
}
