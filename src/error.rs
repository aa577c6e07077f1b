//! Error types for ZapFlow.

use uuid::Uuid;

use crate::orders::model::OrderStatus;

/// Top-level error type for the console.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Receipt error: {0}")]
    Receipt(#[from] ReceiptError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Order lifecycle and store errors.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order {id} not found")]
    NotFound { id: Uuid },

    #[error("Order {id} is {from}, cannot transition to {to}")]
    InvalidTransition {
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Order {id} cannot be marked delivered without receipt data")]
    ReceiptRequired { id: Uuid },

    #[error("An order must contain at least one item")]
    NoItems,

    #[error("Invalid quantity for item {material}: must be positive")]
    InvalidQuantity { material: String },

    #[error("Unknown contact: {id}")]
    UnknownContact { id: String },

    #[error("Unknown material: {name}")]
    UnknownMaterial { name: String },
}

/// Receipt capture validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("Receiver name is required")]
    MissingReceiverName,

    #[error("Signature data is required")]
    MissingSignature,
}

/// Message dispatch errors, one per failure mode of the gateway contract.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    #[error("Dispatch configuration incomplete: {reason}")]
    ConfigIncomplete { reason: String },

    #[error("Cloud API rejected the message: {message}")]
    Provider { message: String },

    #[error("Message gateway error: {message}")]
    Gateway { message: String },

    #[error("Network failure during dispatch: {message}")]
    Network { message: String },
}

/// Snapshot persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Broadcast scheduling errors.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("Unknown group: {id}")]
    UnknownGroup { id: String },

    #[error("Scheduled message {id} not found")]
    MessageNotFound { id: String },

    #[error("Broadcast content must not be empty")]
    EmptyContent,
}

/// Result type alias for the console.
pub type Result<T> = std::result::Result<T, Error>;
