//! Static domain-to-IP exception table

use crate::{Error, Result};
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::{debug, warn};

/// Domains whose connections bypass name resolution and dial a fixed IP
///
/// Built once at tunnel start from two index-aligned lists and never mutated
/// afterwards, so lookups need no locking.
#[derive(Debug, Clone, Default)]
pub struct ExceptionTable {
    entries: HashMap<String, IpAddr>,
}

impl ExceptionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from comma-separated domain and IP lists
    ///
    /// Two empty lists produce an empty table. Lists of different length, an
    /// empty domain or an IP that fails to parse are configuration errors.
    pub fn from_lists(domains: &str, ips: &str) -> Result<Self> {
        if domains.trim().is_empty() && ips.trim().is_empty() {
            return Ok(Self::new());
        }

        let domains: Vec<&str> = domains.split(',').map(str::trim).collect();
        let ips: Vec<&str> = ips.split(',').map(str::trim).collect();
        Self::from_pairs(&domains, &ips)
    }

    /// Build from already split sequences
    pub fn from_pairs<D, I>(domains: &[D], ips: &[I]) -> Result<Self>
    where
        D: AsRef<str>,
        I: AsRef<str>,
    {
        if domains.len() != ips.len() {
            return Err(Error::config(format!(
                "exception lists differ in length: {} domains, {} ips",
                domains.len(),
                ips.len()
            )));
        }

        let mut entries = HashMap::with_capacity(domains.len());
        for (idx, (domain, ip)) in domains.iter().zip(ips).enumerate() {
            let domain = domain.as_ref();
            let ip = ip.as_ref();

            if domain.is_empty() {
                return Err(Error::config(format!("exception domain #{} is empty", idx)));
            }

            let parsed: IpAddr = ip.parse().map_err(|_| {
                Error::config(format!("invalid exception IP for {}: {:?}", domain, ip))
            })?;

            if let Some(previous) = entries.insert(domain.to_string(), parsed) {
                warn!(
                    "Duplicate exception domain {} ({} replaced by {})",
                    domain, previous, parsed
                );
            }
        }

        debug!("Exception table built with {} entries", entries.len());
        Ok(ExceptionTable { entries })
    }

    /// Exact-match lookup
    pub fn get(&self, domain: &str) -> Option<IpAddr> {
        self.entries.get(domain).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
