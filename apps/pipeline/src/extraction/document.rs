//! Record shape for ingested PDF documents (certificates, CVs).

use crate::extraction::{blank_fields, FieldSpec, RecordShape};
use crate::models::document::DocumentMetadata;

impl RecordShape for DocumentMetadata {
    const NAME: &'static str = "document";

    const INSTRUCTIONS: &'static str = "\
        The text was extracted from a PDF and may contain broken lines, stray characters and \
        layout artefacts. Clean it up and correct it so it reads naturally. Remove empty lines, \
        tabs and other formatting so the content can be stored as clean text. All certificates \
        and information belong to the document owner; correct any that are assigned to \
        someone else.";

    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("title", "title of the document"),
        FieldSpec::text("content", "the cleaned text of the document"),
        FieldSpec::text("category", "type of the document: certificate, cv, reference, ..."),
        FieldSpec::integer("size", "word count of the cleaned content"),
    ];

    fn conformance(&self) -> Result<(), String> {
        let blank = blank_fields([
            ("title", self.title.as_str()),
            ("content", self.content.as_str()),
            ("category", self.category.as_str()),
        ]);
        if blank.is_empty() {
            Ok(())
        } else {
            Err(format!("empty fields: {}", blank.join(", ")))
        }
    }
}

impl DocumentMetadata {
    /// Replaces the model's word count with the actual word count of `content`.
    pub fn with_measured_size(mut self) -> Self {
        self.size = self.content.split_whitespace().count() as u32;
        self
    }
}
