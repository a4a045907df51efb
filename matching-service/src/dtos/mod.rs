//! Request/response bodies for the HTTP API.

pub mod admin;
pub mod documents;
pub mod suggestions;
pub mod transactions;

pub use admin::{ExpireRequest, ExpireResponse, RescoreRequest, RescoreResponse};
pub use documents::{DocumentResponse, RegisterDocumentRequest};
pub use suggestions::{
    ConfirmRequest, DeclineRequest, SuggestionListResponse, SuggestionResponse,
};
pub use transactions::{RegisterTransactionRequest, TransactionResponse};
