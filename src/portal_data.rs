use crate::{
    error::PortalError,
    portal_source::{PortalSource, Row, UploadTable},
    static_data::StaticPortalData,
    types::{CalendarEvent, CarouselImage, CurriculumSubject, DocumentItem, Student},
};
use tracing::warn;

/// Reads from `source` and silently answers with the bundled dataset when a
/// read fails. Uploads are passed through untouched.
#[derive(Debug, Clone)]
pub struct PortalData<S: PortalSource> {
    source: S,
    fallback: StaticPortalData,
}

impl<S: PortalSource> PortalData<S> {
    pub fn new(source: S, fallback: StaticPortalData) -> Self {
        Self { source, fallback }
    }

    pub async fn student_profile(&self, login_id: &str) -> Student {
        match self.source.student_profile(login_id).await {
            Ok(student) => student,
            Err(err) => {
                warn!(%err, login_id, "Student fetch failed, using bundled data");
                self.fallback.student()
            }
        }
    }

    pub async fn documents(&self, student_id: &str) -> Vec<DocumentItem> {
        match self.source.documents(student_id).await {
            Ok(documents) => documents,
            Err(err) => {
                warn!(%err, student_id, "Documents fetch failed, using bundled data");
                self.fallback.all_documents()
            }
        }
    }

    pub async fn events(&self) -> Vec<CalendarEvent> {
        match self.source.events().await {
            Ok(events) => events,
            Err(err) => {
                warn!(%err, "Events fetch failed, using bundled data");
                self.fallback.all_events()
            }
        }
    }

    pub async fn curriculum(&self, class_grade: &str) -> Vec<CurriculumSubject> {
        match self.source.curriculum(class_grade).await {
            Ok(subjects) => subjects,
            Err(err) => {
                warn!(%err, class_grade, "Curriculum fetch failed, using bundled data");
                self.fallback.all_curriculum()
            }
        }
    }

    pub async fn carousel_images(&self) -> Vec<CarouselImage> {
        match self.source.carousel_images().await {
            Ok(images) => images,
            Err(err) => {
                warn!(%err, "Carousel fetch failed, using bundled data");
                self.fallback.all_carousel_images()
            }
        }
    }

    pub async fn insert_rows(&self, table: UploadTable, rows: Vec<Row>) -> Result<usize, PortalError> {
        self.source.insert_rows(table, rows).await
    }
}
