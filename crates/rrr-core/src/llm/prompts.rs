//! Prompt templates

use rrr_metrics::{CLIENT_METRIC, FLAT_METRICS, REQUIRED_CLIENTS, SPLIT_METRICS};
use std::fmt::Write;

/// Structuring prompt: release tables in, strict metrics JSON out
pub(crate) fn structure_prompt(source_text: &str, versions: &[String]) -> String {
    let mut prompt = String::from(
        "Convert this release data to STRICT JSON.\n\
         RULES:\n\
         1. Output MUST be valid JSON only.\n\
         2. Use the EXACT structure below.\n\
         3. No text, explanations or code fences outside the JSON.\n\
         4. Use double quotes only.\n\
         5. Include one entry per release version for every series.\n\
         6. status is one of ON_TRACK, MEDIUM_RISK, RISK, NEEDS_REVIEW.\n\n",
    );

    let _ = writeln!(prompt, "Release versions: {}", versions.join(", "));
    prompt.push_str("\nSTRUCTURE:\n{\n  \"metrics\": {\n");
    for name in SPLIT_METRICS {
        let _ = writeln!(
            prompt,
            "    \"{name}\": {{\"ATLS\": [{{\"version\": \"<v>\", \"value\": <number>, \"status\": \"<STATUS>\"}}], \"BTLS\": [...]}},"
        );
    }
    let _ = write!(prompt, "    \"{CLIENT_METRIC}\": {{");
    for (i, client) in REQUIRED_CLIENTS.iter().enumerate() {
        if i > 0 {
            prompt.push_str(", ");
        }
        let _ = write!(
            prompt,
            "\"{client}\": [{{\"version\": \"<v>\", \"pass_count\": <int>, \"fail_count\": <int>, \"status\": \"<STATUS>\"}}]"
        );
    }
    prompt.push_str("},\n");
    for (i, name) in FLAT_METRICS.iter().enumerate() {
        let sep = if i + 1 == FLAT_METRICS.len() { "" } else { "," };
        let _ = writeln!(
            prompt,
            "    \"{name}\": [{{\"version\": \"<v>\", \"value\": <number>, \"status\": \"<STATUS>\"}}]{sep}"
        );
    }
    prompt.push_str("  }\n}\n\nSOURCE DATA:\n");
    prompt.push_str(source_text);
    prompt
}

/// Report prompt over validated metrics JSON
pub(crate) fn report_prompt(metrics_json: &str) -> String {
    format!(
        "Create a markdown release readiness report from this data:\n\
         {metrics_json}\n\n\
         Include:\n\
         1. Tables with trends, one row per reading: | Release | Metric | Status | Trend |\n\
         2. Highlight RISK and MEDIUM_RISK statuses.\n\
         3. A 'Key findings' section.\n\
         4. A 'Recommendations' section.\n\
         Output markdown only."
    )
}

/// Judge prompt; the reply must follow the `Score:` / `Evaluation:` format
pub(crate) fn judge_prompt(source_text: &str, report: &str) -> String {
    format!(
        "Act as an impartial judge evaluating report quality.\n\
         You will be given:\n\
         1. ORIGINAL SOURCE TEXT (extracted from PDF)\n\
         2. GENERATED REPORT (created by AI)\n\n\
         Evaluate based on:\n\
         - Data accuracy (50% weight): are the numbers, versions and statuses faithful to the source?\n\
         - Analysis depth (30% weight): are trends and risks interpreted, not just restated?\n\
         - Clarity (20% weight): is the report well organized and readable?\n\n\
         ORIGINAL SOURCE:\n{source_text}\n\n\
         GENERATED REPORT:\n{report}\n\n\
         INSTRUCTIONS:\n\
         1. Provide a score from 0-100\n\
         2. Give a brief 2-3 sentence evaluation\n\
         3. Use EXACTLY this format:\n\
         Score: [0-100]\n\
         Evaluation: [your evaluation]\n\n\
         Your evaluation:"
    )
}
