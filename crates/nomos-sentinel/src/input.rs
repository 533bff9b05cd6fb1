//! Validation inputs.

use bytes::Bytes;
use http::{Method, Request, Response};
use nomos_core::Route;

/// A request and the route a router matched it to.
///
/// The request is borrowed mutably: defaults are written into its query
/// string, headers and body, and a decoded body is replaced by its
/// re-encoded form when defaults changed it.
#[derive(Debug)]
pub struct RequestValidationInput<'a> {
    /// The request.
    pub request: &'a mut Request<Bytes>,
    /// The matched route.
    pub route: &'a Route,
}

impl<'a> RequestValidationInput<'a> {
    /// Creates an input.
    pub fn new(request: &'a mut Request<Bytes>, route: &'a Route) -> Self {
        Self { request, route }
    }
}

/// A response, the route that produced it and the request method.
#[derive(Debug, Clone, Copy)]
pub struct ResponseValidationInput<'a> {
    /// The response.
    pub response: &'a Response<Bytes>,
    /// The matched route.
    pub route: &'a Route,
    /// Method of the request that was answered. Differs from the route's
    /// when a router serves `HEAD` with a `GET` operation.
    pub request_method: &'a Method,
}

impl<'a> ResponseValidationInput<'a> {
    /// Creates an input for a request made with the route's method.
    pub fn new(response: &'a Response<Bytes>, route: &'a Route) -> Self {
        Self {
            response,
            route,
            request_method: &route.method,
        }
    }

    /// Sets the method of the answered request.
    #[must_use]
    pub fn request_method(mut self, method: &'a Method) -> Self {
        self.request_method = method;
        self
    }
}
