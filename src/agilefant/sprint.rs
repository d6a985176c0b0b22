use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::agilefant::{AgilefantError, AgilefantSession};

/// Minutes east of UTC used when drawing burndown charts (NZST).
const TIME_ZONE_OFFSET: i32 = 720;

/// A person assigned to a sprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Responsible {
    pub id: i64,
    #[serde(default)]
    pub initials: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// An Agilefant iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub start_date: i64,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub end_date: i64,
    #[serde(default)]
    pub backlog_size: Option<i64>,
    #[serde(default)]
    pub schedule_status: Option<String>,
    #[serde(default)]
    pub stand_alone: bool,
    #[serde(default)]
    pub product: bool,
    #[serde(default)]
    pub assignees: Vec<Responsible>,
}

fn epoch_millis(ms: i64) -> SystemTime {
    if ms >= 0 {
        UNIX_EPOCH + Duration::from_millis(ms as u64)
    } else {
        UNIX_EPOCH - Duration::from_millis(ms.unsigned_abs())
    }
}

impl Sprint {
    /// Gets details about the sprint with the given id.
    pub async fn fetch(session: &AgilefantSession, sprint_id: i64) -> Result<Sprint, AgilefantError> {
        let path = format!("ajax/iterationData.action?iterationId={sprint_id}");
        let sprint = session
            .get(&path)
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(sprint)
    }

    /// Gets every sprint of a project.
    pub async fn fetch_for_project(
        session: &AgilefantSession,
        project_id: i64,
    ) -> Result<Vec<Sprint>, AgilefantError> {
        let project_id = project_id.to_string();
        let sprints = session
            .post_form("ajax/projectIterations.action", &[("projectId", &project_id)])
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(sprints)
    }

    pub fn start_time(&self) -> SystemTime {
        epoch_millis(self.start_date)
    }

    pub fn end_time(&self) -> SystemTime {
        epoch_millis(self.end_date)
    }

    pub async fn burndown_image(&self, session: &AgilefantSession) -> Result<Bytes, AgilefantError> {
        burndown_image(session, self.id).await
    }
}

/// Path of the burndown chart image for a sprint.
pub fn burndown_path(sprint_id: i64) -> String {
    format!("drawIterationBurndown.action?backlogId={sprint_id}&timeZoneOffset={TIME_ZONE_OFFSET}")
}

/// Downloads the burndown chart for a sprint as raw image bytes.
pub async fn burndown_image(session: &AgilefantSession, sprint_id: i64) -> Result<Bytes, AgilefantError> {
    let image = session
        .get(&burndown_path(sprint_id))
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    Ok(image)
}
