use std::sync::Arc;

use crate::workflow::Workflow;

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<Workflow>,
}

impl AppState {
    pub fn new(workflow: Arc<Workflow>) -> Self {
        Self { workflow }
    }
}
