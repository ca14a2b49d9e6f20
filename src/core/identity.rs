use crate::domain::ports::IdentityNormalizer;
use std::collections::HashMap;

/// Uses the display name exactly as git reports it.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawName;

impl IdentityNormalizer for RawName {
    fn canonical(&self, raw: &str) -> String {
        raw.to_string()
    }
}

/// Maps known name variants onto one canonical contributor name.
#[derive(Debug, Default, Clone)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl IdentityNormalizer for AliasTable {
    fn canonical(&self, raw: &str) -> String {
        self.aliases
            .get(raw)
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }
}
