//! Account number generation
//!
//! Produces unique, unpredictable externally-facing account numbers.

use uuid::Uuid;

/// Source of fresh account numbers. Injected into the lifecycle handler so
/// tests can substitute a deterministic sequence.
pub trait AccountNumberGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Derives numbers from random UUIDs: `ACC-` followed by 20 uppercase hex
/// characters.
#[derive(Debug, Default)]
pub struct UuidAccountNumberGenerator;

impl AccountNumberGenerator for UuidAccountNumberGenerator {
    fn generate(&self) -> String {
        let hex = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("ACC-{}", &hex[..20])
    }
}
