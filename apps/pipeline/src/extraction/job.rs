//! Record shape for job postings.

use crate::errors::PipelineError;
use crate::extraction::{blank_fields, FieldSpec, RecordShape, StructuredExtractor};
use crate::models::job::StructuredJob;

impl RecordShape for StructuredJob {
    const NAME: &'static str = "job description";

    const INSTRUCTIONS: &'static str = "\
        Read the job posting from the perspective of an applicant. The location of the job \
        may differ from the location of the company offering it. Requirements, nice-to-haves \
        and experience level are comma-separated lists of short search phrases.";

    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("company_name", "name of the company offering the job"),
        FieldSpec::text("contact_person", "contact person for the application, if available"),
        FieldSpec::text("employment_type", "full-time, part-time, contract, ..."),
        FieldSpec::text("requirements", "required skills and qualifications, comma-separated"),
        FieldSpec::text("nice_to_haves", "preferred or nice-to-have skills, comma-separated"),
        FieldSpec::text("experience_level", "junior, mid or senior plus years of experience, comma-separated"),
        FieldSpec::text("education_level", "required education, e.g. Bachelors, Masters"),
        FieldSpec::text("compensation", "salary and benefits"),
        FieldSpec::text("company_culture", "values and mission of the company"),
        FieldSpec::text("location", "location of the job itself and work type (remote, on-site, hybrid)"),
        FieldSpec::text("company_size", "number of employees"),
        FieldSpec::text("company_industry", "industry of the company"),
        FieldSpec::text("work_hours", "working hours, e.g. 9-5, flexible"),
        FieldSpec::text("summary", "short summary of the role"),
    ];

    fn conformance(&self) -> Result<(), String> {
        let blank = blank_fields(self.fields());
        if blank.is_empty() {
            Ok(())
        } else {
            Err(format!("empty fields: {}", blank.join(", ")))
        }
    }
}

/// Extracts structured job metadata from a posting's raw description.
pub async fn extract_job(
    extractor: &StructuredExtractor,
    description: &str,
) -> Result<StructuredJob, PipelineError> {
    extractor.extract::<StructuredJob>(description).await
}
