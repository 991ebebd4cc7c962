use std::sync::Arc;
use crate::orchestrator::Orchestrator;

pub struct MeshState {
    pub orchestrator: Arc<Orchestrator>,
}

impl MeshState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}
