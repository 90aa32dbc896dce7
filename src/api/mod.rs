//! HTTP API for inspecting and changing the peer registry.
//!
//! The API is bound to [`Config::api_bind_addr`][`crate::config::Config::api_bind_addr`], which
//! must be a loopback or private address.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/peers` (GET)
//!
//!   Returns HTTP 200 (OK) and a JSON array with every registered peer, in registry order:
//!
//!   ```json
//!   [
//!     {
//!       "host": "ns1.example.org.",
//!       "role": "primary",
//!       "protocol": "http",
//!       "path": "/health",
//!       "port": 8080,
//!       "ipv4": "10.0.0.1",
//!       "ipv6": null,
//!       "healthy": true,
//!       "labels": []
//!     }
//!   ]
//!   ```
//!
//! ## `/peers` (POST)
//!
//!   Registers a new peer. Expects a JSON request body of the same form as a peer in the
//!   config file; only `host` is required:
//!
//!   ```json
//!   { "host": "ns2.example.org", "role": "secondary", "ipv4": "10.0.0.2" }
//!   ```
//!
//!   The peer starts out unhealthy and is probed from the next health-check tick on. Returns
//!   HTTP 200 (OK) with the registered peer, HTTP 409 (Conflict) if the host is already
//!   registered, or HTTP 400 (Bad Request) if the host isn't a valid domain name.
//!
//! ## `/peers/:host` (DELETE)
//!
//!   Removes the peer with the given host. Returns HTTP 200 (OK) and a JSON body of the form
//!   `{"removed":"ns2.example.org."}`, or HTTP 404 (Not Found) for an unknown host.

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::new;
