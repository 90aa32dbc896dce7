//! Zone matching.

use crate::error::Error;
use trust_dns_server::client::rr::Name;

/// The zones answered authoritatively, plus the zones whose queries may be handed to the next
/// handler when there is no peer to answer with.
///
/// Names are compared label by label, case-insensitively.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Zones {
    zones: Vec<Name>,
    fallthrough: Vec<Name>,
}

impl Zones {
    pub fn new(zones: Vec<Name>, fallthrough: Vec<Name>) -> Self {
        Zones { zones, fallthrough }
    }

    /// Parse zone names as produced by [`normalize_fqdn`][crate::config::normalize_fqdn].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for a malformed name.
    pub fn parse(zones: &[String], fallthrough: &[String]) -> Result<Self, Error> {
        Ok(Zones::new(parse_names(zones)?, parse_names(fallthrough)?))
    }

    pub fn configured(&self) -> &[Name] {
        &self.zones
    }

    /// The configured zone with the most labels that contains `qname`.
    pub fn matches(&self, qname: &Name) -> Option<&Name> {
        longest_match(&self.zones, qname)
    }

    /// Whether `qname` lies within one of the fallthrough zones.
    pub fn falls_through(&self, qname: &Name) -> bool {
        longest_match(&self.fallthrough, qname).is_some()
    }
}

fn parse_names(names: &[String]) -> Result<Vec<Name>, Error> {
    names
        .iter()
        .map(|name| Name::from_ascii(name).map_err(|_| Error::InvalidName(name.clone())))
        .collect()
}

// NB: `Name::num_labels` doesn't count a leading `*`.
fn label_count(name: &Name) -> usize {
    name.iter().count()
}

fn longest_match<'z>(zones: &'z [Name], qname: &Name) -> Option<&'z Name> {
    zones
        .iter()
        .filter(|zone| zone.zone_of(qname))
        .max_by_key(|zone| label_count(zone))
}

/// The labels of `qname` in front of `zone`, in the query's original case.
///
/// Has no labels for a query at the zone apex. `zone` must have been matched against `qname`.
///
/// # Errors
///
/// Returns [`Error::DNSError`] if the labels can't form a name.
pub fn subdomain(qname: &Name, zone: &Name) -> Result<Name, Error> {
    let keep = label_count(qname).saturating_sub(label_count(zone));
    Ok(Name::from_labels(qname.iter().take(keep))?)
}
