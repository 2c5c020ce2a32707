use std::sync::Arc;

use crate::appointment::AppointmentService;
use crate::config::CollectionIds;
use crate::db::RecordStore;
use crate::patient::PatientService;

/// Shared state for every route.
#[derive(Clone)]
pub struct ApiContext {
    pub appointments: AppointmentService,
    pub patients: PatientService,
}

impl ApiContext {
    pub fn new(store: Arc<dyn RecordStore>, ids: &CollectionIds) -> Self {
        Self {
            appointments: AppointmentService::new(store.clone(), ids),
            patients: PatientService::new(store, ids),
        }
    }
}
