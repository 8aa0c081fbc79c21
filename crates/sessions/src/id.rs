//! Session id generation.

/// Source of fresh, unguessable session ids.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// 128 bits from the OS CSPRNG (UUIDv4), rendered as 32 lowercase hex
/// characters with no delimiters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomHexId;

impl IdGenerator for RandomHexId {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Always returns the same id.  Intended for tests.
#[derive(Debug, Clone)]
pub struct FixedId(pub String);

impl IdGenerator for FixedId {
    fn generate(&self) -> String {
        self.0.clone()
    }
}
