use crate::processor::processor::Processor;
use crate::storage::storage::ImageStorage;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppStateDyn {
    pub storage: Arc<dyn ImageStorage + Send + Sync>,
    pub processor: Arc<Processor>,
}
