//! SVG chart rendering
//!
//! One line chart per metric, written as a standalone SVG file. Each analysis
//! renders into its own chart set, a sub-directory of the output directory,
//! so cached results keep pointing at their own charts. Output is a pure
//! function of the metrics, so re-rendering the same document yields
//! byte-identical files.

use crate::collaborator::Renderer;
use crate::error::CollaboratorError;
use crate::types::Visualization;
use async_trait::async_trait;
use rrr_metrics::{compare_versions, pass_rate, MetricSeries, MetricsDocument};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 360.0;
const MARGIN_LEFT: f64 = 56.0;
const MARGIN_RIGHT: f64 = 120.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 40.0;
const PALETTE: [&str; 6] = ["#1f77b4", "#d62728", "#2ca02c", "#ff7f0e", "#9467bd", "#8c564b"];

/// One labelled line
#[derive(Debug, Clone, PartialEq)]
struct Line {
    label: String,
    points: Vec<(String, f64)>,
}

/// Writes `<chart set>/<slug>.svg` per metric under a directory
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    dir: PathBuf,
    url_prefix: String,
}

impl SvgRenderer {
    /// Renderer writing into `dir`, publishing files under `url_prefix`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Output directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn clear_previous(set_dir: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(set_dir).await?;
        let mut entries = tokio::fs::read_dir(set_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "svg") {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Renderer for SvgRenderer {
    async fn render(
        &self,
        chart_set: &str,
        metrics: &MetricsDocument,
    ) -> Result<Vec<Visualization>, CollaboratorError> {
        let set = slug(chart_set);
        let set_dir = self.dir.join(&set);
        Self::clear_previous(&set_dir).await?;

        let mut charts = Vec::with_capacity(metrics.metrics.len());
        for (name, series) in &metrics.metrics {
            let file = format!("{}.svg", slug(name));
            let svg = chart_svg(name, &lines_for(series));
            tokio::fs::write(set_dir.join(&file), svg).await?;
            let file_name = format!("{set}/{file}");
            tracing::debug!(metric = %name, file = %file_name, "rendered chart");
            charts.push(Visualization {
                metric: name.clone(),
                url: format!("{}/{file_name}", self.url_prefix),
                file_name,
            });
        }
        Ok(charts)
    }
}

/// Lowercase ASCII slug: `"Load/Performance"` → `"load_performance"`
#[must_use]
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "metric".to_string()
    } else {
        trimmed.to_string()
    }
}

fn lines_for(series: &MetricSeries) -> Vec<Line> {
    let values = |points: &[rrr_metrics::MetricPoint]| {
        points.iter().map(|p| (p.version.clone(), p.value)).collect()
    };
    match series {
        MetricSeries::Split(split) => vec![
            Line {
                label: "ATLS".into(),
                points: values(&split.atls),
            },
            Line {
                label: "BTLS".into(),
                points: values(&split.btls),
            },
        ],
        MetricSeries::Client(clients) => clients
            .iter()
            .map(|(client, points)| Line {
                label: format!("{client} pass %"),
                points: points
                    .iter()
                    .map(|p| (p.version.clone(), pass_rate(p.pass_count, p.fail_count)))
                    .collect(),
            })
            .collect(),
        MetricSeries::Flat(points) => vec![Line {
            label: "value".into(),
            points: values(points),
        }],
    }
}

#[allow(clippy::cast_precision_loss)]
fn chart_svg(title: &str, lines: &[Line]) -> String {
    let mut versions: Vec<&str> = Vec::new();
    for (version, _) in lines.iter().flat_map(|l| &l.points) {
        if !versions.contains(&version.as_str()) {
            versions.push(version);
        }
    }
    versions.sort_by(|a, b| compare_versions(a, b));

    let max = lines
        .iter()
        .flat_map(|l| l.points.iter().map(|(_, v)| *v))
        .fold(0.0_f64, f64::max);
    let y_max = if max > 0.0 { max * 1.1 } else { 1.0 };

    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let step = if versions.len() > 1 {
        plot_w / (versions.len() - 1) as f64
    } else {
        0.0
    };
    let x_of = |version: &str| {
        let index = versions.iter().position(|v| *v == version).unwrap_or(0);
        MARGIN_LEFT + step * index as f64
    };
    let y_of = |value: f64| MARGIN_TOP + plot_h - value / y_max * plot_h;
    let bottom = MARGIN_TOP + plot_h;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="12">"#
    );
    let _ = writeln!(svg, r#"<rect width="{WIDTH}" height="{HEIGHT}" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="24" text-anchor="middle" font-size="15">{}</text>"#,
        WIDTH / 2.0,
        escape(title)
    );

    // Axes
    let right = MARGIN_LEFT + plot_w;
    let _ = writeln!(
        svg,
        r##"<path d="M{MARGIN_LEFT},{MARGIN_TOP} V{bottom} H{right}" fill="none" stroke="#444"/>"##
    );
    for tick in 0..=4 {
        let value = y_max * f64::from(tick) / 4.0;
        let y = y_of(value);
        let _ = writeln!(
            svg,
            r##"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{right}" y2="{y:.1}" stroke="#eee"/><text x="{}" y="{:.1}" text-anchor="end">{value:.1}</text>"##,
            MARGIN_LEFT - 6.0,
            y + 4.0
        );
    }
    for version in &versions {
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{}" text-anchor="middle">{}</text>"#,
            x_of(version),
            bottom + 18.0,
            escape(version)
        );
    }

    for (i, line) in lines.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let coords: Vec<String> = line
            .points
            .iter()
            .map(|(v, value)| format!("{:.1},{:.1}", x_of(v), y_of(*value)))
            .collect();
        let _ = writeln!(
            svg,
            r#"<polyline points="{}" fill="none" stroke="{color}" stroke-width="2"/>"#,
            coords.join(" ")
        );
        for coord in &coords {
            if let Some((x, y)) = coord.split_once(',') {
                let _ = writeln!(svg, r#"<circle cx="{x}" cy="{y}" r="3" fill="{color}"/>"#);
            }
        }
        let legend_y = MARGIN_TOP + 16.0 * i as f64;
        let _ = writeln!(
            svg,
            r#"<rect x="{}" y="{:.1}" width="10" height="10" fill="{color}"/><text x="{}" y="{:.1}">{}</text>"#,
            right + 12.0,
            legend_y,
            right + 26.0,
            legend_y + 9.0,
            escape(&line.label)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(label: &str, points: &[(&str, f64)]) -> Line {
        Line {
            label: label.into(),
            points: points.iter().map(|(v, x)| ((*v).to_string(), *x)).collect(),
        }
    }

    #[test]
    fn slugs() {
        assert_eq!(slug("Load/Performance"), "load_performance");
        assert_eq!(slug("All Open Defects (T-1)"), "all_open_defects_t_1");
        assert_eq!(slug("Customer Specific Testing (UAT)"), "customer_specific_testing_uat");
        assert_eq!(slug("///"), "metric");
    }

    #[test]
    fn chart_is_deterministic_and_escaped() {
        let lines = vec![
            line("ATLS", &[("25.1", 10.0), ("25.2", 8.0)]),
            line("BTLS", &[("25.1", 3.0), ("25.2", 4.0)]),
        ];
        let a = chart_svg("R&D <Defects>", &lines);
        let b = chart_svg("R&D <Defects>", &lines);
        assert_eq!(a, b);
        assert!(a.contains("R&amp;D &lt;Defects&gt;"));
        assert_eq!(a.matches("<polyline").count(), 2);
        assert!(a.contains(">25.1<") && a.contains(">25.2<"));
        assert!(a.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn all_zero_and_single_point_charts_render() {
        let svg = chart_svg("Empty", &[line("value", &[("1.0", 0.0)])]);
        assert!(svg.contains("<polyline"));
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn versions_on_axis_are_ordered() {
        let svg = chart_svg("X", &[line("value", &[("25.10", 1.0), ("25.2", 2.0)])]);
        let first = svg.find(">25.2<").unwrap();
        let second = svg.find(">25.10<").unwrap();
        assert!(first < second);
    }

    fn coverage_doc(previous: f64, current: f64) -> MetricsDocument {
        let point = |version: &str, value: f64| rrr_metrics::MetricPoint {
            version: version.into(),
            value,
            status: rrr_metrics::Status::OnTrack,
            trend: None,
        };
        MetricsDocument {
            metrics: [(
                "Unit Test Coverage".to_string(),
                MetricSeries::Flat(vec![point("1.0", previous), point("1.1", current)]),
            )]
            .into_iter()
            .collect(),
        }
    }

    #[tokio::test]
    async fn render_replaces_previous_charts_of_its_set() {
        let dir = tempfile::tempdir().unwrap();
        let set_dir = dir.path().join("abc_123");
        std::fs::create_dir_all(&set_dir).unwrap();
        std::fs::write(set_dir.join("stale.svg"), "<svg/>").unwrap();
        std::fs::write(set_dir.join("keep.txt"), "x").unwrap();
        std::fs::write(dir.path().join("top.svg"), "<svg/>").unwrap();

        let renderer = SvgRenderer::new(dir.path(), "/visualizations/");
        let charts = renderer.render("abc_123", &coverage_doc(70.0, 75.0)).await.unwrap();

        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].file_name, "abc_123/unit_test_coverage.svg");
        assert_eq!(charts[0].url, "/visualizations/abc_123/unit_test_coverage.svg");
        assert!(set_dir.join("unit_test_coverage.svg").exists());
        assert!(!set_dir.join("stale.svg").exists());
        assert!(set_dir.join("keep.txt").exists());
        assert!(dir.path().join("top.svg").exists());
    }

    #[tokio::test]
    async fn another_set_leaves_earlier_charts_intact() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SvgRenderer::new(dir.path(), "/visualizations");

        let first = renderer.render("aaaa_1111", &coverage_doc(10.0, 8.0)).await.unwrap();
        let first_path = dir.path().join(&first[0].file_name);
        let before = std::fs::read_to_string(&first_path).unwrap();

        let second = renderer.render("bbbb_2222", &coverage_doc(500.0, 900.0)).await.unwrap();
        assert_ne!(second[0].file_name, first[0].file_name);
        assert_ne!(second[0].url, first[0].url);

        assert_eq!(std::fs::read_to_string(&first_path).unwrap(), before);
        let other = std::fs::read_to_string(dir.path().join(&second[0].file_name)).unwrap();
        assert_ne!(other, before);
    }

    #[tokio::test]
    async fn chart_set_names_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SvgRenderer::new(dir.path().join("charts"), "/visualizations");
        let charts = renderer.render("../outside", &coverage_doc(1.0, 2.0)).await.unwrap();
        assert_eq!(charts[0].file_name, "outside/unit_test_coverage.svg");
        assert!(dir.path().join("charts/outside/unit_test_coverage.svg").exists());
    }
}
