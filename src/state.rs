use crate::config::AppConfig;
use crate::services::workflow::BookingWorkflow;

pub struct AppState {
    pub workflow: BookingWorkflow,
    pub config: AppConfig,
}
