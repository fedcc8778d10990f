// App state for the control surface
use std::sync::Arc;

use crate::orchestrator::RunQueue;
use crate::schedule::RunSchedule;

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<RunQueue>,
    pub schedule: Arc<RunSchedule>,
}
