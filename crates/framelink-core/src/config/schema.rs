use std::time::Duration;

use serde::Deserialize;

use crate::error::{FrameLinkError, Result};
use crate::origin::OriginPolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    pub version: u32,

    #[serde(default)]
    pub channel: ChannelSection,

    #[serde(default)]
    pub host: HostSection,

    #[serde(default)]
    pub embed: EmbedSection,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            version: 1,
            channel: ChannelSection::default(),
            host: HostSection::default(),
            embed: EmbedSection::default(),
        }
    }
}

impl LinkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(FrameLinkError::UnsupportedVersion);
        }
        self.channel.validate()?;
        self.host.validate()?;
        self.embed.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSection {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl ChannelSection {
    pub fn validate(&self) -> Result<()> {
        if !(16..=65536).contains(&self.capacity) {
            return Err(FrameLinkError::BadConfig(
                "channel.capacity must be between 16 and 65536".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostSection {
    #[serde(default = "default_host_origin")]
    pub origin: String,

    #[serde(default = "default_wildcard")]
    pub allowed_frame_origins: Vec<String>,

    /// 0 disables expiry of pending requests.
    #[serde(default)]
    pub pending_ttl_ms: u64,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            origin: default_host_origin(),
            allowed_frame_origins: default_wildcard(),
            pending_ttl_ms: 0,
            history_limit: default_history_limit(),
        }
    }
}

impl HostSection {
    pub fn validate(&self) -> Result<()> {
        if self.origin.trim().is_empty() {
            return Err(FrameLinkError::BadConfig("host.origin must not be empty".into()));
        }
        OriginPolicy::compile(&self.allowed_frame_origins)?;
        if self.pending_ttl_ms != 0 && !(1000..=86_400_000).contains(&self.pending_ttl_ms) {
            return Err(FrameLinkError::BadConfig(
                "host.pending_ttl_ms must be 0 or between 1000 and 86400000".into(),
            ));
        }
        if !(1..=10_000).contains(&self.history_limit) {
            return Err(FrameLinkError::BadConfig(
                "host.history_limit must be between 1 and 10000".into(),
            ));
        }
        Ok(())
    }

    pub fn origin_policy(&self) -> Result<OriginPolicy> {
        OriginPolicy::compile(&self.allowed_frame_origins)
    }

    pub fn pending_ttl(&self) -> Option<Duration> {
        (self.pending_ttl_ms > 0).then(|| Duration::from_millis(self.pending_ttl_ms))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbedSection {
    #[serde(default = "default_frame_origin")]
    pub origin: String,

    #[serde(default = "default_wildcard")]
    pub allowed_parent_origins: Vec<String>,

    /// 0 means requests wait until answered or cancelled.
    #[serde(default)]
    pub request_timeout_ms: u64,
}

impl Default for EmbedSection {
    fn default() -> Self {
        Self {
            origin: default_frame_origin(),
            allowed_parent_origins: default_wildcard(),
            request_timeout_ms: 0,
        }
    }
}

impl EmbedSection {
    pub fn validate(&self) -> Result<()> {
        if self.origin.trim().is_empty() {
            return Err(FrameLinkError::BadConfig("embed.origin must not be empty".into()));
        }
        OriginPolicy::compile(&self.allowed_parent_origins)?;
        if self.request_timeout_ms > 86_400_000 {
            return Err(FrameLinkError::BadConfig(
                "embed.request_timeout_ms must not exceed 86400000".into(),
            ));
        }
        Ok(())
    }

    pub fn origin_policy(&self) -> Result<OriginPolicy> {
        OriginPolicy::compile(&self.allowed_parent_origins)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

fn default_capacity() -> usize {
    256
}
fn default_host_origin() -> String {
    "https://host.local".into()
}
fn default_frame_origin() -> String {
    "https://frame.local".into()
}
fn default_wildcard() -> Vec<String> {
    vec!["*".into()]
}
fn default_history_limit() -> usize {
    256
}
