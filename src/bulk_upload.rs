use crate::{
    error::PortalError,
    portal_data::PortalData,
    portal_source::{PortalSource, Row, UploadTable},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerKind {
    Success,
    Error,
}

/// Message shown to the admin after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadBanner {
    pub kind: BannerKind,
    pub text: String,
}

/// Splits simple comma separated text into rows keyed by the header line.
///
/// Quoted commas are not supported. Values missing at the end of a line are
/// left out of the row.
pub fn parse_csv(text: &str) -> Result<Vec<Row>, PortalError> {
    let mut lines = text.split('\n').filter(|line| !line.trim().is_empty());
    let headers: Vec<&str> = match lines.next() {
        Some(header_line) => header_line.split(',').map(str::trim).collect(),
        None => return Err(PortalError::EmptyUpload("CSV file is empty".into())),
    };

    let rows: Vec<Row> = lines
        .map(|line| {
            let values: Vec<&str> = line.split(',').collect();
            headers
                .iter()
                .enumerate()
                .filter_map(|(index, header)| {
                    values
                        .get(index)
                        .map(|value| (header.to_string(), Value::String(unquote(value.trim()).into())))
                })
                .collect()
        })
        .collect();

    if rows.is_empty() {
        return Err(PortalError::EmptyUpload("CSV file has no data rows".into()));
    }
    Ok(rows)
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

pub async fn upload_csv<S: PortalSource>(
    data: &PortalData<S>,
    table: UploadTable,
    text: &str,
) -> UploadBanner {
    let result = match parse_csv(text) {
        Ok(rows) => {
            info!(%table, rows = rows.len(), "Uploading rows");
            data.insert_rows(table, rows).await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(count) => UploadBanner {
            kind: BannerKind::Success,
            text: format!("Successfully uploaded {count} records to {table}."),
        },
        Err(err) => {
            error!(%err, %table, "Upload failed");
            UploadBanner {
                kind: BannerKind::Error,
                text: format!("Upload failed: {err}"),
            }
        }
    }
}
