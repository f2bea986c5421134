use crate::{
    error::PortalError,
    portal_source::{PortalSource, Row, UploadTable},
    types::{CalendarEvent, CarouselImage, CurriculumSubject, DocumentItem, Student},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

const BUNDLED_DATASET: &str = include_str!("../data/portal_fallback.json");

#[derive(Debug, Deserialize)]
struct Dataset {
    student: Student,
    carousel_images: Vec<CarouselImage>,
    documents: Vec<DocumentItem>,
    events: Vec<CalendarEvent>,
    curriculum: Vec<CurriculumSubject>,
}

/// Portal data shipped with the binary. Used when no remote tables are
/// configured and as the fallback for failed remote reads.
///
/// Every read ignores its key and answers with the whole bundled set, the
/// single demo student included.
#[derive(Debug, Clone)]
pub struct StaticPortalData {
    dataset: Arc<Dataset>,
}

impl StaticPortalData {
    pub fn bundled() -> Result<Self, serde_json::Error> {
        let dataset: Dataset = serde_json::from_str(BUNDLED_DATASET)?;
        Ok(Self {
            dataset: Arc::new(dataset),
        })
    }

    pub fn student(&self) -> Student {
        self.dataset.student.clone()
    }

    pub fn all_documents(&self) -> Vec<DocumentItem> {
        self.dataset.documents.clone()
    }

    pub fn all_events(&self) -> Vec<CalendarEvent> {
        self.dataset.events.clone()
    }

    pub fn all_curriculum(&self) -> Vec<CurriculumSubject> {
        self.dataset.curriculum.clone()
    }

    pub fn all_carousel_images(&self) -> Vec<CarouselImage> {
        self.dataset.carousel_images.clone()
    }
}

impl PortalSource for StaticPortalData {
    async fn student_profile(&self, _login_id: &str) -> Result<Student, PortalError> {
        Ok(self.student())
    }

    async fn documents(&self, _student_id: &str) -> Result<Vec<DocumentItem>, PortalError> {
        Ok(self.all_documents())
    }

    async fn events(&self) -> Result<Vec<CalendarEvent>, PortalError> {
        Ok(self.all_events())
    }

    async fn curriculum(&self, _class_grade: &str) -> Result<Vec<CurriculumSubject>, PortalError> {
        Ok(self.all_curriculum())
    }

    async fn carousel_images(&self) -> Result<Vec<CarouselImage>, PortalError> {
        Ok(self.all_carousel_images())
    }

    async fn insert_rows(&self, table: UploadTable, rows: Vec<Row>) -> Result<usize, PortalError> {
        info!(%table, rows = rows.len(), "No remote tables configured, upload only logged");
        Ok(rows.len())
    }
}
