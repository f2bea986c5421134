use crate::{
    error::PortalError,
    portal_source::{PortalSource, Row, UploadTable},
    types::{CalendarEvent, CarouselImage, CurriculumSubject, DocumentItem, Student},
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

/// Client for the hosted table API (PostgREST dialect).
#[derive(Debug, Clone)]
pub struct RestTables {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestTables {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, PortalError> {
        debug!(table, ?filters, "Querying remote table");

        let response = self
            .client
            .get(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("select", "*")])
            .query(filters)
            .send()
            .await
            .map_err(|source| PortalError::Request {
                table: table.into(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::Status {
                table: table.into(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|source| PortalError::Decode {
                table: table.into(),
                source,
            })
    }
}

/// Quotes a filter value so reserved characters like `,` `.` `(` `)` are
/// taken literally.
fn quoted(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

impl PortalSource for RestTables {
    async fn student_profile(&self, login_id: &str) -> Result<Student, PortalError> {
        let login_id_value = quoted(login_id);
        let filter = format!("(admissionNo.eq.{login_id_value},fatherPhone.eq.{login_id_value})");
        let students: Vec<Student> = self.select("students", &[("or", filter)]).await?;
        students
            .into_iter()
            .next()
            .ok_or_else(|| PortalError::NotFound {
                table: "students".into(),
                key: login_id.into(),
            })
    }

    async fn documents(&self, student_id: &str) -> Result<Vec<DocumentItem>, PortalError> {
        let filter = format!("(student_id.eq.{},type.eq.newsletter)", quoted(student_id));
        self.select("documents", &[("or", filter), ("order", "date.desc".into())])
            .await
    }

    async fn events(&self) -> Result<Vec<CalendarEvent>, PortalError> {
        self.select("events", &[]).await
    }

    async fn curriculum(&self, class_grade: &str) -> Result<Vec<CurriculumSubject>, PortalError> {
        self.select("curriculum", &[("class_grade", format!("eq.{}", quoted(class_grade)))])
            .await
    }

    async fn carousel_images(&self) -> Result<Vec<CarouselImage>, PortalError> {
        self.select("carousel_images", &[]).await
    }

    async fn insert_rows(&self, table: UploadTable, rows: Vec<Row>) -> Result<usize, PortalError> {
        let response = self
            .client
            .post(self.table_url(table.as_str()))
            .header("apikey", &self.api_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(&self.api_key)
            .json(&rows)
            .send()
            .await
            .map_err(|source| PortalError::Request {
                table: table.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(%table, status = status.as_u16(), "Insert rejected by remote table");
            return Err(PortalError::Status {
                table: table.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(rows.len())
    }
}
