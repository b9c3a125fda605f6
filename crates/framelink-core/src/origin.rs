//! Origin acceptance policy.
//!
//! Every inbound frame is checked against the receiving side's policy before
//! it is decoded. A wildcard must be configured explicitly as `"*"`.

use crate::error::{FrameLinkError, Result};

/// Which sender origins a peer accepts frames from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Any origin (`"*"`).
    Any,
    /// Exact-match allowlist.
    AllowList(Vec<String>),
}

impl OriginPolicy {
    /// Compile configured entries. `"*"` anywhere means `Any`.
    pub fn compile(raw: &[String]) -> Result<Self> {
        if raw.is_empty() {
            return Err(FrameLinkError::BadConfig(
                "origin allowlist must not be empty (use \"*\" to accept any origin)".into(),
            ));
        }
        if raw.iter().any(|o| o == "*") {
            return Ok(OriginPolicy::Any);
        }
        let mut out = Vec::with_capacity(raw.len());
        for o in raw {
            let o = o.trim().trim_end_matches('/');
            if o.is_empty() {
                return Err(FrameLinkError::BadConfig("empty origin entry".into()));
            }
            out.push(o.to_string());
        }
        Ok(OriginPolicy::AllowList(out))
    }

    pub fn allows(&self, origin: &str) -> bool {
        match self {
            OriginPolicy::Any => true,
            OriginPolicy::AllowList(list) => {
                let origin = origin.trim_end_matches('/');
                list.iter().any(|o| o == origin)
            }
        }
    }

    pub fn check(&self, origin: &str) -> Result<()> {
        if self.allows(origin) {
            Ok(())
        } else {
            Err(FrameLinkError::OriginRejected(origin.to_string()))
        }
    }
}
