/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identifier assigned by the external workflow service.
pub type InvocationId = String;

/// Identifier of an input dataset owned by the dataset catalog.
pub type DatasetId = String;
