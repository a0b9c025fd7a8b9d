use crate::model::{Category, ValidationReport};

/// Render a deterministic markdown report grouped by category.
pub fn render_markdown(report: &ValidationReport) -> String {
    let mut lines = Vec::new();

    lines.push("# Data Quality Validation Report".to_string());
    lines.push(String::new());
    lines.push(format!("- reference date: {}", report.today));
    if let Some(fingerprint) = &report.fingerprint {
        lines.push(format!("- fingerprint: {fingerprint}"));
    }
    lines.push(format!("- **Total Validations:** {}", report.total));
    lines.push(format!("- **Passed:** {}", report.passed));
    lines.push(format!("- **Failed:** {}", report.failed));
    lines.push(String::new());

    lines.push("| category | passed | failed |".to_string());
    lines.push("| --- | --- | --- |".to_string());
    for (category, findings) in report.grouped() {
        let passed = findings.iter().filter(|finding| finding.passed).count();
        lines.push(format!(
            "| {category} | {passed} | {} |",
            findings.len() - passed
        ));
    }
    lines.push(String::new());

    for (category, findings) in report.grouped() {
        lines.push(format!("## {category}"));
        lines.push(String::new());
        for finding in findings {
            let status = if finding.passed { "PASS" } else { "FAIL" };
            lines.push(format!("- **{status}** - {}", finding.rule));
            if !finding.detail.is_empty() {
                lines.push(format!("  - {}", finding.detail));
            }
        }
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    lines.extend(recommendations(report));
    lines.push(String::new());
    lines.join("\n")
}

fn recommendations(report: &ValidationReport) -> Vec<String> {
    let failing = |category| !report.category_passed(category);
    let mut lines = Vec::new();
    if failing(Category::ForeignKeyIntegrity) {
        lines.push("- ensure parent tables are generated before children.".to_string());
    }
    if failing(Category::ColumnCompleteness) {
        lines.push("- revise generators for NOT NULL columns and column lengths.".to_string());
    }
    if failing(Category::BusinessLogic) || failing(Category::TemporalConsistency) {
        lines.push("- rerun generation so the business rule pass repairs the data.".to_string());
    }
    if failing(Category::Uniqueness) {
        lines.push("- increase unique key space for the failing columns.".to_string());
    }
    if failing(Category::RealisticDistribution) {
        lines.push("- raise row targets; small datasets cannot show enough variety.".to_string());
    }
    if failing(Category::Reproducibility) {
        lines.push(
            "- compare seed, row targets and reference date with the earlier run.".to_string(),
        );
    }
    if report.is_clean() {
        lines.push("- no failed checks; compare fingerprints across runs for drift.".to_string());
    }
    lines
}
