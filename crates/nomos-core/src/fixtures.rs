//! Test fixtures shared across nomos crates.
//!
//! [`pet_store`] returns a resolved document that exercises every parameter
//! location, the interesting serialization styles, discriminated
//! compositions, readOnly/writeOnly properties, multipart and urlencoded
//! bodies, and security alternatives.
//!
//! # Example
//!
//! ```
//! use http::Method;
//! use nomos_core::fixtures;
//!
//! let route = fixtures::route(&Method::GET, "/pets").unwrap();
//! assert_eq!(route.operation.operation_id.as_deref(), Some("listPets"));
//! ```

use std::sync::Arc;

use http::Method;
use serde_json::{json, Value};

use crate::document::Document;
use crate::route::Route;

/// The pet store document as resolved JSON.
#[must_use]
pub fn pet_store_json() -> Value {
    let pet = json!({
        "type": "object",
        "x-component-name": "Pet",
        "required": ["name"],
        "properties": {
            "id": { "type": "integer", "format": "int64", "readOnly": true },
            "name": { "type": "string", "minLength": 1 },
            "tag": { "type": "string", "default": "untagged" },
            "secret": { "type": "string", "writeOnly": true },
            "status": { "type": "string", "enum": ["available", "pending", "sold"] }
        }
    });
    let cat = json!({
        "type": "object",
        "x-component-name": "Cat",
        "required": ["petType", "indoor"],
        "properties": {
            "petType": { "type": "string" },
            "indoor": { "type": "boolean" }
        }
    });
    let dog = json!({
        "type": "object",
        "x-component-name": "Dog",
        "required": ["petType", "barks"],
        "properties": {
            "petType": { "type": "string" },
            "barks": { "type": "boolean" },
            "indoor": { "type": "boolean" }
        }
    });
    let error = json!({
        "type": "object",
        "required": ["code", "message"],
        "properties": {
            "code": { "type": "integer", "format": "int32" },
            "message": { "type": "string" }
        }
    });

    let pets = json!({
        "parameters": [
            { "name": "X-Request-Id", "in": "header",
              "schema": { "type": "string", "format": "uuid" } }
        ],
        "get": {
            "operationId": "listPets",
            "security": [{ "api_key": [] }, { "bearer": ["pets:read"] }],
            "parameters": [
                { "name": "status", "in": "query",
                  "schema": { "type": "array",
                              "items": { "type": "string",
                                         "enum": ["available", "pending", "sold"] } } },
                { "name": "limit", "in": "query",
                  "schema": { "type": "integer", "format": "int32",
                              "minimum": 1, "maximum": 100, "default": 20 } },
                { "name": "session", "in": "cookie", "schema": { "type": "string" } }
            ],
            "responses": {
                "200": {
                    "description": "pets",
                    "headers": {
                        "X-Rate-Limit": { "required": true, "schema": { "type": "integer" } }
                    },
                    "content": { "application/json": {
                        "schema": { "type": "array", "items": pet } } }
                },
                "default": {
                    "description": "error",
                    "content": { "application/json": { "schema": error } }
                }
            }
        },
        "post": {
            "operationId": "createPet",
            "requestBody": {
                "required": true,
                "content": { "application/json": { "schema": pet } }
            },
            "responses": {
                "201": {
                    "description": "created",
                    "content": { "application/json": { "schema": pet } }
                }
            }
        }
    });
    let pet_by_id = json!({
        "get": {
            "operationId": "getPet",
            "parameters": [
                { "name": "petId", "in": "path", "required": true,
                  "schema": { "type": "integer", "format": "int64" } }
            ],
            "responses": {
                "200": {
                    "description": "pet",
                    "content": { "application/json": { "schema": pet } }
                },
                "304": {
                    "description": "not modified",
                    "content": { "application/json": { "schema": pet } }
                }
            }
        }
    });
    let pet_kind = json!({
        "put": {
            "operationId": "updatePetKind",
            "parameters": [
                { "name": "petId", "in": "path", "required": true,
                  "schema": { "type": "integer" } }
            ],
            "requestBody": {
                "required": true,
                "content": { "application/json": { "schema": {
                    "oneOf": [cat, dog],
                    "discriminator": { "propertyName": "petType" }
                } } }
            },
            "responses": { "204": { "description": "updated" } }
        }
    });
    let tags = json!({
        "get": {
            "operationId": "getTags",
            "parameters": [
                { "name": "tags", "in": "path", "required": true,
                  "style": "label", "explode": false,
                  "schema": { "type": "array", "items": { "type": "string" } } }
            ],
            "responses": { "200": { "description": "ok" } }
        }
    });
    let filter = json!({
        "type": "object",
        "properties": {
            "id": { "oneOf": [
                { "type": "string" },
                { "type": "object", "properties": { "eq": { "type": "string" } } }
            ] }
        }
    });
    let search = json!({
        "get": {
            "operationId": "search",
            "parameters": [
                { "name": "filter", "in": "query", "style": "deepObject", "explode": true,
                  "schema": filter }
            ],
            "responses": { "200": { "description": "ok" } }
        }
    });
    let numbers = json!({
        "post": {
            "operationId": "postNumbers",
            "requestBody": {
                "required": true,
                "content": { "application/json": { "schema": {
                    "type": "object",
                    "properties": {
                        "testInteger": { "type": "integer", "format": "int64" }
                    }
                } } }
            },
            "responses": { "200": { "description": "ok" } }
        }
    });
    let multipart = json!({
        "schema": {
            "type": "object",
            "additionalProperties": false,
            "required": ["file"],
            "properties": {
                "file": { "type": "string", "format": "binary" },
                "metadata": { "type": "object",
                              "properties": { "title": { "type": "string" } } }
            }
        },
        "encoding": { "metadata": { "contentType": "application/json" } }
    });
    let urlencoded = json!({
        "schema": {
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "ids": { "type": "array", "items": { "type": "integer" } }
            }
        }
    });
    let uploads = json!({
        "post": {
            "operationId": "upload",
            "requestBody": {
                "required": true,
                "content": {
                    "multipart/form-data": multipart,
                    "application/x-www-form-urlencoded": urlencoded
                }
            },
            "responses": { "201": { "description": "uploaded" } }
        }
    });
    let health = json!({
        "head": {
            "operationId": "healthHead",
            "responses": { "200": {
                "description": "ok",
                "content": { "application/json": {
                    "schema": { "type": "object", "required": ["status"] } } }
            } }
        },
        "delete": {
            "operationId": "resetHealth",
            "responses": { "204": { "description": "reset" } }
        }
    });

    json!({
        "openapi": "3.0.3",
        "servers": [{ "url": "https://pets.example.com/v1" }],
        "components": {
            "securitySchemes": {
                "api_key": { "type": "apiKey", "name": "X-API-Key", "in": "header" },
                "bearer": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            }
        },
        "paths": {
            "/pets": pets,
            "/pets/{petId}": pet_by_id,
            "/pets/{petId}/kind": pet_kind,
            "/tags/{tags}": tags,
            "/search": search,
            "/numbers": numbers,
            "/uploads": uploads,
            "/health": health
        }
    })
}

/// The pet store document.
pub fn pet_store() -> Result<Arc<Document>, serde_json::Error> {
    serde_json::from_value(pet_store_json()).map(Arc::new)
}

/// A route into the pet store document, without path parameters.
pub fn route(method: &Method, template: &str) -> Option<Route> {
    let document = pet_store().ok()?;
    Route::resolve(&document, method, template)
}
