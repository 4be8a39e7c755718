pub mod admin;
pub mod auth;
pub mod documents;
pub mod health;
pub mod subjects;

use service_core::error::AppError;

use crate::tree::Snapshot;
use crate::AppState;

/// Latest snapshot for a read handler. Before the first tree arrives the
/// caller is asked to retry; a feed that failed without ever delivering data
/// is reported as a gateway error.
pub(crate) fn current_snapshot(state: &AppState) -> Result<Snapshot, AppError> {
    let data = state.repository.state();
    if data.loading {
        return Err(AppError::ServiceUnavailable(
            "Data is still loading. Please try again.".to_string(),
        ));
    }
    match data.error {
        Some(error) if data.snapshot.is_empty() => Err(AppError::BadGateway(error)),
        _ => Ok(data.snapshot),
    }
}
