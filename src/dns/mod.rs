//! DNS server.
//!
//! zonecrab answers every query whose name falls within one of the configured
//! [`Config::zones`][`crate::config::Config::zones`] with the peers currently picked by the
//! [registry][crate::registry]: healthy primaries if any, else healthy secondaries, else every
//! peer. The peer list is rotated by one position per query, so successive queries spread
//! across peers. Responses are always authoritative and every record carries the configured
//! [`Config::ttl`][`crate::config::Config::ttl`].
//!
//! Queries for other names are handed to the next handler. The server built by [`new`] takes
//! it as an argument; the binary uses [`Refuse`], which answers REFUSED.
//!
//! # Delegation answers
//!
//! With the default `"answer": "delegation"` each selected peer contributes an `NS` record in
//! the answer section, named after the query's subdomain under the peer host, and `A`/`AAAA`
//! glue records for the peer host in the additional section.
//!
//! E.g. with config:
//! ```json
//! {
//!   "zones": [ "example.org" ],
//!   "peers": [ { "host": "ns1.example.org", "ipv4": "10.0.0.1" } ],
//!   ...
//! }
//! ```
//!
//! A query for `api.example.org` would return:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 api.example.org NS
//! ;; ANSWER SECTION:
//! api.ns1.example.org.    300     IN      NS      ns1.example.org.
//!
//! ;; ADDITIONAL SECTION:
//! ns1.example.org.        300     IN      A       10.0.0.1
//! ```
//!
//! # CNAME answers
//!
//! With `"answer": "cname"` each selected peer contributes a `CNAME` record from the query
//! name to the query's subdomain under the peer host:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 +short api.example.org CNAME
//! api.ns1.example.org.
//! ```
//!
//! # Fallthrough
//!
//! When no peer is registered at all, queries within one of the
//! [`Config::fallthrough`][`crate::config::Config::fallthrough`] zones are handed to the next
//! handler instead of getting an empty answer.

mod handlers;
pub mod next;
pub mod server;
pub mod zones;

pub use handlers::Handler;
pub use next::Refuse;
pub use server::new;
