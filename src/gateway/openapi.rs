//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::card::{CardSummary, IssuedCard};
use crate::central_bank::KeyRate;
use crate::gateway::handlers::{
    AmountRequest, HealthResponse, OpenAccountRequest, TransferRequest, TransferResponse,
};
use crate::ledger::{Account, Transaction, TransactionKind};
use crate::user_auth::models::{AuthResponse, LoginRequest, RegisterRequest, RegisterResponse};

/// JWT bearer security scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by POST /login"))
                        .build(),
                ),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Corebank API",
        version = "1.0.0",
        description = "Minimal banking API: accounts, deposits, withdrawals and atomic transfers.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::login,
        crate::gateway::handlers::create_account,
        crate::gateway::handlers::list_accounts,
        crate::gateway::handlers::get_account,
        crate::gateway::handlers::get_transactions,
        crate::gateway::handlers::deposit,
        crate::gateway::handlers::withdraw,
        crate::gateway::handlers::create_transfer,
        crate::gateway::handlers::issue_card,
        crate::gateway::handlers::list_cards,
        crate::gateway::handlers::get_key_rate,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            AuthResponse,
            OpenAccountRequest,
            AmountRequest,
            Account,
            Transaction,
            TransactionKind,
            TransferRequest,
            TransferResponse,
            IssuedCard,
            CardSummary,
            KeyRate,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Accounts", description = "Account management, deposits and withdrawals (JWT)"),
        (name = "Transfer", description = "Funds transfer between accounts (JWT)"),
        (name = "Cards", description = "Card issuing (JWT)"),
        (name = "Rates", description = "Central-bank key rate (JWT)"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Corebank API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_openapi_json_serializable() {
        let json_str = ApiDoc::openapi().to_json().unwrap();
        assert!(json_str.contains("Corebank API"));
        assert!(json_str.contains("/accounts/{id}/transactions"));
    }

    #[test]
    fn test_endpoints_registered() {
        let paths = ApiDoc::openapi().paths;
        for path in [
            "/health",
            "/register",
            "/login",
            "/accounts",
            "/accounts/{id}",
            "/accounts/{id}/deposit",
            "/accounts/{id}/withdraw",
            "/transfer",
            "/cards",
            "/rates/key",
        ] {
            assert!(paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_security_scheme_registered() {
        let components = ApiDoc::openapi().components.expect("should have components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
