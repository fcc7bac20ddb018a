use uuid::{Uuid, Variant, Version};

use super::errors::DomainError;
use super::order::{CreateOutcome, OrderIntent, OrderView};

/// Client-supplied token naming one order intent. Only canonical,
/// hyphenated UUIDv4 strings are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::validation("idempotency key must be a valid UUID v4");

        // Uuid::parse_str also accepts the simple, braced and urn forms.
        if raw.len() != 36 {
            return Err(invalid());
        }
        let uuid = Uuid::parse_str(raw).map_err(|_| invalid())?;
        if uuid.get_version() != Some(Version::Random) || uuid.get_variant() != Variant::RFC4122 {
            return Err(invalid());
        }
        Ok(IdempotencyKey(uuid))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

/// Same table, same order type, same number of lines.
pub fn intent_matches(existing: &OrderView, intent: &OrderIntent) -> bool {
    existing.table_reference == intent.table_reference
        && existing.order_type.as_str() == intent.requested_order_type()
        && existing.lines.len() == intent.items.len()
}

/// Decide what a request whose key already names `existing` gets back.
pub fn resolve_replay(existing: OrderView, intent: &OrderIntent) -> Result<CreateOutcome, DomainError> {
    if intent_matches(&existing, intent) {
        Ok(CreateOutcome::Duplicate(existing))
    } else {
        Err(DomainError::IdempotencyKeyMismatch)
    }
}
