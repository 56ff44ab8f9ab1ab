use serde::Serialize;
use validator::ValidationError;

text_enum! {
    pub enum BulkStatus {
        Success => "success",
        Partial => "partial",
        Failed => "failed",
    }
}

impl BulkStatus {
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => BulkStatus::Success,
            (0, _) => BulkStatus::Failed,
            _ => BulkStatus::Partial,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BulkRow<T> {
    /// Zero-based position in the submitted rows.
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BulkReport<T> {
    pub status: BulkStatus,
    pub succeeded: usize,
    pub failed: usize,
    pub rows: Vec<BulkRow<T>>,
}

impl<T> Default for BulkReport<T> {
    fn default() -> Self {
        Self {
            status: BulkStatus::Success,
            succeeded: 0,
            failed: 0,
            rows: Vec::new(),
        }
    }
}

impl<T> BulkReport<T> {
    pub fn record(&mut self, index: usize, outcome: Result<T, String>) {
        let row = match outcome {
            Ok(data) => {
                self.succeeded += 1;
                BulkRow {
                    index,
                    success: true,
                    data: Some(data),
                    error: None,
                }
            }
            Err(error) => {
                self.failed += 1;
                BulkRow {
                    index,
                    success: false,
                    data: None,
                    error: Some(error),
                }
            }
        };
        self.rows.push(row);
        self.status = BulkStatus::from_counts(self.succeeded, self.failed);
    }
}

/// `length(min = 1)` counts whitespace, so trimmed emptiness is checked separately.
#[allow(clippy::ptr_arg)]
pub fn non_blank(value: &String) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}
