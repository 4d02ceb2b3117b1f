/// Account ID domain type. Wraps ULID for non-sequential, sortable identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId(ulid::Ulid);

impl AccountId {
    /// Generate a new random ULID.
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Get as string for storage/display.
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }

    /// Parse from string.
    pub fn from_string(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_new_id() {
        let id1 = AccountId::new();
        let id2 = AccountId::new();
        assert_ne!(id1.as_str(), id2.as_str());
    }

    #[test]
    fn parse_round_trip() {
        let original = AccountId::new();
        let parsed = AccountId::from_string(&original.as_str()).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn parse_invalid() {
        assert!(AccountId::from_string("not-a-ulid").is_err());
    }
}
