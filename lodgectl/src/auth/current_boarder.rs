use crate::{
    AppState,
    access::normalize_access_code,
    db::{errors::DbError, handlers::Boarders, models::boarders::Boarder},
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, trace};

/// Header carrying a boarder's portal access code
pub const ACCESS_CODE_HEADER: &str = "x-access-code";

/// The active boarder identified by the `X-Access-Code` header.
///
/// Codes are matched case-insensitively and ignoring surrounding whitespace. Boarders who have
/// moved out are rejected.
#[derive(Debug, Clone)]
pub struct CurrentBoarder(pub Boarder);

fn access_code(parts: &Parts) -> Option<String> {
    let raw = parts.headers.get(ACCESS_CODE_HEADER)?.to_str().ok()?;
    let code = normalize_access_code(raw);
    (!code.is_empty()).then_some(code)
}

impl FromRequestParts<AppState> for CurrentBoarder {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(code) = access_code(parts) else {
            trace!("No access code header present");
            return Err(Error::Unauthenticated { message: None });
        };

        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(DbError::from(e)))?;
        match Boarders::new(&mut conn).get_by_access_code(&code).await? {
            Some(boarder) => {
                debug!("Authenticated boarder {}", boarder.id);
                Ok(CurrentBoarder(boarder))
            }
            None => Err(Error::Unauthenticated {
                message: Some("Invalid access code".to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/portal/me");
        if let Some(value) = header {
            builder = builder.header("X-Access-Code", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_access_code_is_normalized() {
        assert_eq!(access_code(&parts_with(Some("  abcd2345 "))), Some("ABCD2345".to_string()));
    }

    #[test]
    fn test_missing_or_blank_code() {
        assert_eq!(access_code(&parts_with(None)), None);
        assert_eq!(access_code(&parts_with(Some("   "))), None);
    }
}
