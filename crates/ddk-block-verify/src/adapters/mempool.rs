//! Mempool adapter: wires the block pipeline's feedback edge onto the
//! running [`MempoolService`].

use crate::ports::MempoolPort;
use async_trait::async_trait;
use ddk_mempool::MempoolService;
use shared_types::entities::TransactionId;
use std::sync::Arc;

/// [`MempoolPort`] implementation backed by the admission service.
pub struct MempoolGateway {
    service: Arc<MempoolService>,
}

impl MempoolGateway {
    /// Wrap the running admission service.
    #[must_use]
    pub fn new(service: Arc<MempoolService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl MempoolPort for MempoolGateway {
    fn lock(&self) {
        self.service.lock_pool_and_queue();
    }

    fn unlock(&self) {
        self.service.unlock_pool_and_queue();
        self.service.trigger();
    }

    async fn remove_transaction(&self, id: TransactionId) -> bool {
        self.service.remove_transaction(id).await
    }

    fn reshuffle(&self) {
        self.service.reshuffle();
    }
}
