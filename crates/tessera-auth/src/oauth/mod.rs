//! OAuth 2.0 / OpenID Connect protocol logic: request validation, the
//! authorization flow state machine and token exchange.

pub mod authorize;
pub mod exchange;
pub mod flow;
pub mod prompt;
pub mod redirect;
pub mod token;

pub use authorize::{
    AuthorizationRequest, AuthorizationValidator, AuthorizeRejection, ValidatedRequest,
};
pub use exchange::TokenExchange;
pub use flow::AuthorizationFlow;
pub use prompt::{LAST_SEEN_COOKIE, REPROMPT, should_reprompt};
pub use redirect::resolve_redirect_url;
pub use token::{GrantType, TokenErrorBody, TokenRequest, TokenResponse};
