pub mod json;
pub mod markdown;
pub mod text;

/// Questions to settle before history is collapsed to one row per key.
pub const ADVISORY: [&str; 3] = [
    "Does the business need the per-date history, or only the latest row per key?",
    "Can every consumer of this table work from the latest job date alone?",
    "Is the volume of rows that would be removed acceptable?",
];
