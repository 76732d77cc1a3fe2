use std::future::Future;

use log::*;

use crate::errors::ServerError;

/// Runs `fut` on its own task and waits for the result.
///
/// If the client disconnects, actix drops the handler future. Work that has been handed to this function carries on
/// regardless, so a state change that has started always finishes.
pub async fn run_to_completion<F, T>(fut: F) -> Result<T, ServerError>
where
    F: Future<Output = T> + 'static,
    T: 'static,
{
    actix_web::rt::spawn(fut).await.map_err(|e| {
        error!("💻️ A request task did not complete. {e}");
        ServerError::Unspecified(format!("Request task failed. {e}"))
    })
}
