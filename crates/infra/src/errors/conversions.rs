//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use sitecap_domain::SitecapError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SitecapError);

impl From<InfraError> for SitecapError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SitecapError> for InfraError {
    fn from(value: SitecapError) -> Self {
        InfraError(value)
    }
}

trait IntoSitecapError {
    fn into_sitecap(self) -> SitecapError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → SitecapError */
/* -------------------------------------------------------------------------- */

impl IntoSitecapError for SqlError {
    fn into_sitecap(self) -> SitecapError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => SitecapError::Storage("database is busy".into()),
                    ErrorCode::DatabaseLocked => SitecapError::Storage("database is locked".into()),
                    ErrorCode::DiskFull => SitecapError::Storage("disk is full".into()),
                    ErrorCode::ReadOnly => SitecapError::Storage("database is read-only".into()),
                    ErrorCode::NotADatabase => {
                        SitecapError::Storage("file is not a sqlite database".into())
                    }
                    ErrorCode::CannotOpen => {
                        SitecapError::Storage(format!("unable to open database: {message}"))
                    }
                    _ => SitecapError::Storage(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => SitecapError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                SitecapError::Storage(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                SitecapError::Storage(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => SitecapError::Config(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => SitecapError::Storage(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_sitecap())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → SitecapError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(SitecapError::Storage(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error / serde_json::Error → SitecapError */
/* -------------------------------------------------------------------------- */

impl IntoSitecapError for std::io::Error {
    fn into_sitecap(self) -> SitecapError {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::NotFound => SitecapError::NotFound(self.to_string()),
            ErrorKind::PermissionDenied => {
                SitecapError::Storage(format!("permission denied: {self}"))
            }
            _ => SitecapError::Storage(format!("I/O error: {self}")),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_sitecap())
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(SitecapError::Storage(format!("queue blob is not valid JSON: {value}")))
    }
}

impl From<tokio::task::JoinError> for InfraError {
    fn from(value: tokio::task::JoinError) -> Self {
        InfraError(SitecapError::Internal(format!("blocking task failed: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SitecapError */
/* -------------------------------------------------------------------------- */

impl IntoSitecapError for HttpError {
    fn into_sitecap(self) -> SitecapError {
        if self.is_timeout() {
            return SitecapError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SitecapError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
            return match code {
                404 => SitecapError::NotFound(message),
                400..=499 if code != 429 => SitecapError::InvalidInput(message),
                _ => SitecapError::Network(message),
            };
        }

        if self.is_builder() {
            return SitecapError::Config(format!("invalid HTTP client configuration: {self}"));
        }

        SitecapError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_sitecap())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_storage_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: SitecapError = InfraError::from(err).into();
        match mapped {
            SitecapError::Storage(msg) => assert!(msg.contains("busy")),
            other => panic!("expected storage error, got {:?}", other),
        }
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "queue file missing");
        let mapped: SitecapError = InfraError::from(err).into();
        assert!(matches!(mapped, SitecapError::NotFound(_)));
    }

    #[test]
    fn invalid_json_maps_to_storage_error() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let mapped: SitecapError = InfraError::from(err).into();
        match mapped {
            SitecapError::Storage(msg) => assert!(msg.contains("JSON")),
            other => panic!("expected storage error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn http_status_503_maps_to_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::SERVICE_UNAVAILABLE))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: SitecapError = InfraError::from(error).into();
        match mapped {
            SitecapError::Network(msg) => assert!(msg.contains("503")),
            other => panic!("expected network error, got {:?}", other),
        }
    }
}
