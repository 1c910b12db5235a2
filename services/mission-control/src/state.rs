use missionctl_core::Config;
use missionctl_missions::{MissionLog, MissionLogError};
use missionctl_stream::PointCloudService;
use std::sync::Arc;

use crate::error::ApiError;

pub struct AppState {
    pub missions: Arc<MissionLog>,
    pub pointcloud: Arc<PointCloudService>,
}

impl AppState {
    /// Open the mission store and build the point cloud service from `config`.
    pub fn new(config: &Config) -> Result<Self, MissionLogError> {
        let missions = Arc::new(MissionLog::open(&config.database.path)?);
        let pointcloud = Arc::new(PointCloudService::new(
            config.stream.subscriber_queue_capacity,
        ));

        Ok(Self::with_components(missions, pointcloud))
    }

    pub fn with_components(missions: Arc<MissionLog>, pointcloud: Arc<PointCloudService>) -> Self {
        AppState {
            missions,
            pointcloud,
        }
    }

    /// Run a mission store call on the blocking pool.
    pub async fn with_missions<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&MissionLog) -> missionctl_missions::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let missions = Arc::clone(&self.missions);

        tokio::task::spawn_blocking(move || f(&missions))
            .await
            .map_err(|e| ApiError::Internal(format!("mission store task failed: {}", e)))?
            .map_err(ApiError::from)
    }
}
