use crate::{
    error::PortalError,
    types::{CalendarEvent, CarouselImage, CurriculumSubject, DocumentItem, Student},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, future::Future};

pub type Row = Map<String, Value>;

/// Tables that accept bulk uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadTable {
    Events,
    Students,
}

impl UploadTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadTable::Events => "events",
            UploadTable::Students => "students",
        }
    }
}

impl fmt::Display for UploadTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait PortalSource: Clone + Send + Sync + 'static {
    /// Matches the login id against admission number and father's phone.
    fn student_profile(
        &self,
        login_id: &str,
    ) -> impl Future<Output = Result<Student, PortalError>> + Send;
    /// The student's own documents plus every newsletter, newest first.
    fn documents(
        &self,
        student_id: &str,
    ) -> impl Future<Output = Result<Vec<DocumentItem>, PortalError>> + Send;
    fn events(&self) -> impl Future<Output = Result<Vec<CalendarEvent>, PortalError>> + Send;
    fn curriculum(
        &self,
        class_grade: &str,
    ) -> impl Future<Output = Result<Vec<CurriculumSubject>, PortalError>> + Send;
    fn carousel_images(
        &self,
    ) -> impl Future<Output = Result<Vec<CarouselImage>, PortalError>> + Send;
    fn insert_rows(
        &self,
        table: UploadTable,
        rows: Vec<Row>,
    ) -> impl Future<Output = Result<usize, PortalError>> + Send;
}
