use db::models::paper::PaperExportRow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Render the chair's paper export as CSV.
pub fn papers_csv(rows: &[PaperExportRow]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "id", "title", "author", "track", "status", "accepts", "rejects", "decided", "paid",
    ])?;

    for row in rows {
        writer.write_record([
            row.id.to_string(),
            row.title.clone(),
            row.author.clone(),
            row.track.clone().unwrap_or_default(),
            row.status.to_string(),
            row.accepts.to_string(),
            row.rejects.to_string(),
            row.decided.to_string(),
            if row.is_paid { "yes" } else { "no" }.to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::models::paper::PaperStatus;
    use uuid::Uuid;

    #[test]
    fn csv_includes_header_and_tallies() {
        let rows = vec![PaperExportRow {
            id: Uuid::nil(),
            title: "Fast Things, Slowly".into(),
            author: "ada".into(),
            track: Some("Systems".into()),
            status: PaperStatus::Accepted,
            accepts: 2,
            rejects: 1,
            decided: 3,
            is_paid: false,
        }];

        let csv = papers_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,title,author,track,status,accepts,rejects,decided,paid"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("Fast Things, Slowly") || row.contains("\"Fast Things, Slowly\""));
        assert!(row.contains("accepted"));
        assert!(row.ends_with("2,1,3,no"));
    }

    #[test]
    fn empty_export_is_just_the_header() {
        let csv = papers_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
