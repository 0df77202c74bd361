use std::sync::Arc;

use crate::config;
use crate::workflow::WorkflowEngine;

#[derive(Clone)]
pub struct AppState {
    pub env: config::Config,
    pub engine: Arc<WorkflowEngine>,
}

impl AppState {
    pub fn new(env: config::Config, engine: Arc<WorkflowEngine>) -> Self {
        Self { env, engine }
    }
}
