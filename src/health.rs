use crate::error::AppResult;
use crate::store::MessageStore;

pub async fn health_check(store: &dyn MessageStore) -> AppResult<()> {
    // Check the message store
    store.ping().await?;

    Ok(())
}
