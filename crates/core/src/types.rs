/// Generation ids are opaque strings of the form `gen_<millis>_<suffix>`.
pub type GenerationId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
