use thiserror::Error;

/// Errors that can arise inside the world storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Password hashing or verification plumbing failed.
    #[error("credential error: {0}")]
    Credential(String),
}

/// Authentication and session-lifecycle failures. Surfaced to the
/// originating connection as an `authError` payload, never fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Registration attempted with a username that already has an account.
    #[error("username is already taken")]
    UsernameTaken,

    /// Login with an unknown username or a wrong password. The two cases are
    /// deliberately indistinguishable on the wire.
    #[error("invalid username or password")]
    BadCredentials,

    /// The account already has a live session on another connection.
    #[error("account is already logged in")]
    AlreadyLoggedIn,

    /// Username or password failed shape validation.
    #[error("{0}")]
    InvalidInput(String),

    /// The storage layer failed while authenticating. The detail stays in
    /// the server log; clients get a generic line.
    #[error("account service unavailable")]
    Unavailable,
}

/// Economy failures: the mutation was rejected and no state changed.
/// Surfaced to the originating connection as a failure payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// Buying a plot that already has an owner.
    #[error("plot already owned")]
    AlreadyOwned,

    /// Balance does not cover the price.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Placing furniture in a plot the actor does not own.
    #[error("not the owner of this plot")]
    NotOwner,

    /// Referencing a plot id that does not exist.
    #[error("unknown plot: {0}")]
    UnknownPlot(String),

    /// Referencing a catalog item that does not exist.
    #[error("unknown item: {0}")]
    UnknownItem(String),
}
