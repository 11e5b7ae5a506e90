use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::db::models::requests::{NewServiceRequest, ServiceRequest, TransitionCommand};
use crate::db::store::SharedStore;
use crate::error::ServiceError;
use crate::workflow;

/// Create, transition and read service requests.
#[derive(Clone)]
pub struct RequestRepository {
    store: Arc<SharedStore>,
}

fn next_request_id(requests: &[ServiceRequest]) -> i32 {
    requests.iter().map(|r| r.id).max().map_or(1, |max| max + 1)
}

fn not_found(id: i32) -> ServiceError {
    ServiceError::NotFound(format!("Service request {id} not found"))
}

impl RequestRepository {
    pub fn new(store: Arc<SharedStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, submission: NewServiceRequest) -> Result<ServiceRequest, ServiceError> {
        let request = self
            .store
            .update(move |db| {
                let id = next_request_id(&db.requests);
                let request = ServiceRequest::open(id, submission, Utc::now());
                db.requests.push(request.clone());
                Ok(request)
            })
            .await?;

        info!(
            request_id = request.id,
            requester_id = request.requester_id,
            "service request created"
        );
        Ok(request)
    }

    /// Applies `command` to request `id` if the workflow allows it.
    ///
    /// The check and the write happen under the same store update, so the
    /// decision is always made against the status being overwritten.
    pub async fn apply_transition(
        &self,
        id: i32,
        command: TransitionCommand,
    ) -> Result<ServiceRequest, ServiceError> {
        let TransitionCommand {
            status,
            actor_name,
            actor_role,
            final_photo,
            expected_version,
        } = command;
        let final_photo = final_photo.filter(|photo| !photo.trim().is_empty());

        let outcome = self
            .store
            .update(|db| {
                let request = db
                    .requests
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or_else(|| not_found(id))?;

                if let Some(expected) = expected_version {
                    if expected != request.version {
                        return Err(ServiceError::Conflict(format!(
                            "Service request {id} is at version {}, not {expected}",
                            request.version
                        )));
                    }
                }

                let from = request.status;
                workflow::authorize(from, actor_role, status, final_photo.is_some())?;

                request.record_transition(status, &actor_name, final_photo, Utc::now());
                Ok((from, request.clone()))
            })
            .await;

        match outcome {
            Ok((from, request)) => {
                info!(
                    request_id = id,
                    %from,
                    to = %status,
                    actor = %actor_name,
                    role = %actor_role,
                    "transition applied"
                );
                Ok(request)
            }
            Err(err) => {
                warn!(request_id = id, to = %status, role = %actor_role, "transition refused: {err}");
                Err(err)
            }
        }
    }

    /// Every stored request, unfiltered, in storage order.
    pub async fn list(&self) -> Result<Vec<ServiceRequest>, ServiceError> {
        Ok(self.store.read().await?.requests)
    }

    pub async fn get(&self, id: i32) -> Result<ServiceRequest, ServiceError> {
        self.store
            .read()
            .await?
            .requests
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(id))
    }
}
