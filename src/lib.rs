//! books-api: CRUD and search over a single book resource.
//!
//! Layers: `domain` (model, validation, repository port), `application`
//! (use cases), `infra` (SQLite adapter), `interface` (HTTP and the error
//! translator).

pub mod config;
pub mod telemetry;

pub mod domain {
    pub mod error;
    pub mod model {
        pub mod book;
        pub mod id;
        pub mod page;
        pub mod price;
    }
    pub mod repository;
    pub mod validation;
}

pub mod application {
    pub mod error;
    pub mod service;
}

pub mod infra {
    pub mod sqlite_store;
}

pub mod interface {
    pub mod failure;
    pub mod http;
}
