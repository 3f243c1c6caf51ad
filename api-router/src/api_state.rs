use std::sync::Arc;

use generation_pipeline::AnswerService;

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<AnswerService>,
}

impl ApiState {
    pub fn new(service: Arc<AnswerService>) -> Self {
        Self { service }
    }
}
