use uuid::Uuid;

use crate::error::DispatchError;
use crate::state::AppState;

pub async fn enqueue_ready(state: &AppState, order_id: Uuid) -> Result<(), DispatchError> {
    state
        .ready_tx
        .send(order_id)
        .await
        .map_err(|err| DispatchError::Internal(format!("ready queue send failed: {err}")))?;

    state.metrics.orders_in_queue.inc();
    Ok(())
}
