use arrow::record_batch::RecordBatch;

/// Ordered rows sharing one schema. Every pipeline stage returns a new one.
pub type RowSet = RecordBatch;

/// Two-way split of a [`RowSet`]: each input row lands in exactly one side.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub valid: RowSet,
    pub rejected: RowSet,
}

impl ValidationOutcome {
    pub fn total_rows(&self) -> usize {
        self.valid.num_rows() + self.rejected.num_rows()
    }
}
