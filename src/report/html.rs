//! Single-file HTML chart report.
//!
//! Produces a standalone HTML file with embedded CSS and JS that renders, per
//! claimed security level:
//! - a grouped bar chart of mean operation times (log scale, stddev error bars)
//! - a grouped bar chart of key and artifact sizes
//!
//! The chart data is embedded as JSON in a non-executing script tag.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::BenchError;
use crate::core::{OperationKind, PrimitiveKind};
use crate::pipeline::{EvaluationReport, ResultSink, RunMeta, VariantFailure};

/// Escape JSON for safe embedding inside an HTML `<script type="application/json">` tag.
///
/// `<` becomes `\u003c`, so `</script>` and `<!--` cannot terminate the tag.
/// The output remains valid JSON.
fn escape_json_for_html_script(json: &str) -> String {
    json.replace('<', "\\u003c")
}

#[derive(Debug, Serialize)]
struct ChartPayload<'a> {
    meta: &'a RunMeta,
    levels: Vec<LevelCharts>,
    failures: &'a [VariantFailure],
    aborted: Option<&'a VariantFailure>,
    correctness_failures: usize,
}

#[derive(Debug, Serialize)]
struct LevelCharts {
    level: u8,
    times: Vec<TimeSeries>,
    sizes: Vec<SizeSeries>,
}

#[derive(Debug, Serialize)]
struct TimeSeries {
    variant: String,
    family: String,
    kind: PrimitiveKind,
    bars: Vec<TimeBar>,
}

#[derive(Debug, Serialize)]
struct TimeBar {
    operation: &'static str,
    mean_ms: f64,
    stddev_ms: Option<f64>,
}

#[derive(Debug, Serialize)]
struct SizeSeries {
    variant: String,
    bars: Vec<SizeBar>,
}

#[derive(Debug, Serialize)]
struct SizeBar {
    label: &'static str,
    bytes: usize,
}

fn build_payload<'a>(report: &EvaluationReport<'a>) -> ChartPayload<'a> {
    let eval = report.evaluation;
    let levels = eval
        .by_level()
        .into_iter()
        .map(|(level, runs)| {
            let times = runs
                .iter()
                .map(|run| TimeSeries {
                    variant: run.variant.clone(),
                    family: run.family.clone(),
                    kind: run.kind,
                    bars: OperationKind::ALL
                        .iter()
                        .filter_map(|op| {
                            eval.aggregates
                                .iter()
                                .find(|a| a.variant == run.variant && a.operation == *op)
                                .map(|a| TimeBar {
                                    operation: op.label(run.kind),
                                    mean_ms: a.mean_ms,
                                    stddev_ms: a.stddev_ms,
                                })
                        })
                        .collect(),
                })
                .collect();

            let sizes = runs
                .iter()
                .filter_map(|run| eval.sizes.iter().find(|s| s.variant == run.variant))
                .map(|s| {
                    let mut bars = vec![
                        SizeBar {
                            label: "public key",
                            bytes: s.public_key,
                        },
                        SizeBar {
                            label: "secret key",
                            bytes: s.secret_key,
                        },
                    ];
                    if let Some(ct) = s.ciphertext {
                        bars.push(SizeBar {
                            label: "ciphertext",
                            bytes: ct,
                        });
                    }
                    if let Some(sig) = s.signature {
                        bars.push(SizeBar {
                            label: "signature",
                            bytes: sig,
                        });
                    }
                    SizeSeries {
                        variant: s.variant.clone(),
                        bars,
                    }
                })
                .collect();

            LevelCharts {
                level,
                times,
                sizes,
            }
        })
        .collect();

    ChartPayload {
        meta: report.meta,
        levels,
        failures: &eval.failures,
        aborted: eval.aborted.as_ref(),
        correctness_failures: eval.correctness_failures(),
    }
}

/// Render an evaluation as a standalone HTML string.
///
/// Levels ascend and variants keep run order, so equal inputs give equal output.
pub fn render_html(report: &EvaluationReport<'_>) -> String {
    let payload = build_payload(report);
    let payload_json =
        serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string());
    let escaped_json = escape_json_for_html_script(&payload_json);

    let mut html = String::with_capacity(16 * 1024 + escaped_json.len());

    html.push_str(r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>pqc-bench report</title>
<style>
:root {
  --bg: #1a1a2e;
  --surface: #16213e;
  --text: #e8e8e8;
  --text-muted: #9a9a9a;
  --accent: #4f8cff;
  --red: #ff6b6b;
  --green: #4ecdc4;
  --yellow: #ffd93d;
  --border: #2d3a5c;
}
* { box-sizing: border-box; margin: 0; padding: 0; }
body {
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, sans-serif;
  background: var(--bg);
  color: var(--text);
  line-height: 1.5;
  padding: 24px;
}
.container { max-width: 1400px; margin: 0 auto; }
h1 { font-size: 1.75rem; margin-bottom: 8px; }
h2 { font-size: 1.25rem; margin: 24px 0 12px; color: var(--text-muted); }
.meta-table { display: grid; grid-template-columns: auto 1fr; gap: 4px 16px; font-size: 0.875rem; }
.meta-label { color: var(--text-muted); }
.meta-value { font-family: monospace; }
.warnings-section {
  background: rgba(255, 217, 61, 0.1);
  border: 1px solid var(--yellow);
  border-radius: 8px;
  padding: 16px;
  margin: 16px 0;
}
.warning-item { font-size: 0.875rem; margin: 4px 0; font-family: monospace; }
.charts { display: grid; grid-template-columns: repeat(auto-fit, minmax(560px, 1fr)); gap: 16px; }
.chart {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: 8px;
  padding: 12px;
}
.chart h3 { font-size: 0.95rem; margin-bottom: 8px; }
svg text { fill: var(--text-muted); font-size: 11px; }
.axis { stroke: var(--border); }
.errbar { stroke: var(--text); stroke-width: 1; }
.legend { display: flex; flex-wrap: wrap; gap: 12px; font-size: 0.75rem; margin-top: 6px; }
.swatch { display: inline-block; width: 10px; height: 10px; margin-right: 4px; border-radius: 2px; }
.footer { margin-top: 32px; font-size: 0.75rem; color: var(--text-muted); }
</style>
</head>
<body>
<div class="container" id="app"></div>
<script type="application/json" id="report-data">"#);

    html.push_str(&escaped_json);

    html.push_str(r#"</script>
<script>
// Parse report data from non-executing JSON container
const REPORT = JSON.parse(document.getElementById('report-data').textContent);
const COLORS = ['#4f8cff', '#4ecdc4', '#ffd93d', '#ff6b6b', '#c77dff'];

// Escape HTML (including single quotes for attribute contexts)
function esc(s) {
  return String(s)
    .replace(/&/g, '&amp;')
    .replace(/</g, '&lt;')
    .replace(/>/g, '&gt;')
    .replace(/"/g, '&quot;')
    .replace(/'/g, '&#x27;');
}

function fmtMs(v) {
  if (v >= 1000) return (v / 1000).toFixed(2) + 's';
  if (v >= 1) return v.toFixed(2) + 'ms';
  return (v * 1000).toFixed(1) + 'µs';
}

function fmtBytes(v) {
  if (v >= 1e6) return (v / 1e6).toFixed(1) + ' MB';
  if (v >= 1e3) return (v / 1e3).toFixed(1) + ' KB';
  return v + ' B';
}

// groups: [{name, bars: [{label, value, err}]}]
function barChart(title, groups, logScale, fmt) {
  const labels = [];
  groups.forEach(g => g.bars.forEach(b => { if (!labels.includes(b.label)) labels.push(b.label); }));
  const values = [];
  groups.forEach(g => g.bars.forEach(b => {
    values.push(b.value + (b.err || 0));
    if (b.value > 0) values.push(Math.max(b.value - (b.err || 0), b.value / 10));
  }));
  const positive = values.filter(v => v > 0);
  if (positive.length === 0) return '';

  const W = 640, H = 280, left = 64, bottom = 56, top = 12;
  const plotH = H - bottom - top;
  let lo = logScale ? Math.floor(Math.log10(Math.min(...positive))) : 0;
  let hi = logScale ? Math.ceil(Math.log10(Math.max(...positive))) : Math.max(...positive);
  if (hi <= lo) hi = lo + 1;
  const scale = v => {
    const t = logScale ? (Math.log10(Math.max(v, Math.pow(10, lo))) - lo) / (hi - lo) : v / hi;
    return top + plotH - t * plotH;
  };

  const groupW = (W - left - 8) / Math.max(groups.length, 1);
  const barW = Math.max(4, (groupW - 12) / Math.max(labels.length, 1));
  let svg = `<svg viewBox="0 0 ${W} ${H}" width="100%" role="img">`;
  svg += `<line class="axis" x1="${left}" y1="${top}" x2="${left}" y2="${top + plotH}"/>`;
  svg += `<line class="axis" x1="${left}" y1="${top + plotH}" x2="${W - 8}" y2="${top + plotH}"/>`;

  const ticks = [];
  if (logScale) {
    for (let e = lo; e <= hi; e++) ticks.push(Math.pow(10, e));
  } else {
    for (let i = 0; i <= 4; i++) ticks.push(hi * i / 4);
  }
  ticks.forEach(t => {
    const y = scale(t);
    svg += `<line class="axis" x1="${left - 4}" y1="${y}" x2="${left}" y2="${y}"/>`;
    svg += `<text x="${left - 6}" y="${y + 4}" text-anchor="end">${esc(fmt(t))}</text>`;
  });

  groups.forEach((g, gi) => {
    const gx = left + 6 + gi * groupW;
    g.bars.forEach(b => {
      const li = labels.indexOf(b.label);
      const x = gx + li * barW;
      const y = scale(b.value);
      const h = top + plotH - y;
      svg += `<rect x="${x}" y="${y}" width="${barW - 2}" height="${Math.max(h, 0)}" fill="${COLORS[li % COLORS.length]}">`;
      svg += `<title>${esc(g.name)} ${esc(b.label)}: ${esc(fmt(b.value))}${b.err != null ? ' ± ' + esc(fmt(b.err)) : ''}</title></rect>`;
      if (b.err != null && b.err > 0) {
        const cx = x + (barW - 2) / 2;
        const y1 = scale(b.value + b.err);
        const y2 = scale(Math.max(b.value - b.err, Math.pow(10, lo)));
        svg += `<line class="errbar" x1="${cx}" y1="${y1}" x2="${cx}" y2="${y2}"/>`;
        svg += `<line class="errbar" x1="${cx - 3}" y1="${y1}" x2="${cx + 3}" y2="${y1}"/>`;
        svg += `<line class="errbar" x1="${cx - 3}" y1="${y2}" x2="${cx + 3}" y2="${y2}"/>`;
      }
    });
    svg += `<text x="${gx + groupW / 2 - 6}" y="${top + plotH + 16}" text-anchor="middle">${esc(g.name)}</text>`;
  });
  svg += '</svg>';

  let legend = '<div class="legend">';
  labels.forEach((l, i) => {
    legend += `<span><span class="swatch" style="background:${COLORS[i % COLORS.length]}"></span>${esc(l)}</span>`;
  });
  legend += '</div>';

  return `<div class="chart"><h3>${esc(title)}</h3>${svg}${legend}</div>`;
}

function render() {
  const m = REPORT.meta;
  let html = '<h1>pqc-bench report</h1>';
  html += '<div class="meta-table">';
  const rows = [
    ['Record', m.record_id],
    ['Timestamp', m.timestamp],
    ['Provider', m.provider + (m.provider_version ? ' ' + m.provider_version : '')],
    ['Families', m.families.join(', ')],
    ['Levels', m.levels.join(', ')],
    ['Runs', m.config.measured_runs + ' measured, ' + m.config.warmup_runs + ' warm-up'],
    ['Rules', m.rules_sha256.slice(0, 12)],
  ];
  rows.forEach(([k, v]) => {
    html += `<span class="meta-label">${esc(k)}</span><span class="meta-value">${esc(v)}</span>`;
  });
  html += '</div>';

  const warnings = [];
  if (REPORT.aborted) {
    warnings.push(`aborted at ${REPORT.aborted.variant} (level ${REPORT.aborted.level}): ${REPORT.aborted.error}`);
  }
  REPORT.failures.forEach(f => warnings.push(`skipped ${f.variant} (level ${f.level}): ${f.error}`));
  if (REPORT.correctness_failures > 0) {
    warnings.push(`${REPORT.correctness_failures} iteration(s) failed verification`);
  }
  if (warnings.length > 0) {
    html += '<div class="warnings-section">';
    warnings.forEach(w => { html += `<div class="warning-item">${esc(w)}</div>`; });
    html += '</div>';
  }

  REPORT.levels.forEach(lvl => {
    html += `<h2>Security level ${esc(lvl.level)}</h2><div class="charts">`;
    html += barChart(
      'Mean time per operation (log scale, error bars = stddev)',
      lvl.times.map(t => ({
        name: t.variant,
        bars: t.bars.map(b => ({ label: b.operation, value: b.mean_ms, err: b.stddev_ms })),
      })),
      true,
      fmtMs,
    );
    html += barChart(
      'Sizes',
      lvl.sizes.map(s => ({
        name: s.variant,
        bars: s.bars.map(b => ({ label: b.label, value: b.bytes, err: null })),
      })),
      false,
      fmtBytes,
    );
    html += '</div>';
  });

  html += `<div class="footer">Generated by pqc-bench | ${esc(m.timestamp)}</div>`;
  document.getElementById('app').innerHTML = html;
}

render();
</script>
</body>
</html>"#);

    html
}

/// Write an evaluation as a standalone HTML file.
pub fn write_html(path: &Path, report: &EvaluationReport<'_>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let html = render_html(report);
    std::fs::write(path, html)?;
    Ok(())
}

/// Writes one HTML chart page per delivered evaluation.
#[derive(Debug, Clone)]
pub struct HtmlSink {
    path: PathBuf,
}

impl HtmlSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        HtmlSink {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for HtmlSink {
    fn name(&self) -> &str {
        "html"
    }

    fn deliver(&self, report: &EvaluationReport<'_>) -> Result<(), BenchError> {
        write_html(&self.path, report)?;
        info!(path = %self.path.display(), "wrote HTML report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BenchmarkConfig, SizeRecord, TimingAggregate};
    use crate::pipeline::{Evaluation, VariantRun};

    fn make_meta() -> RunMeta {
        RunMeta {
            record_id: "rec-1".to_string(),
            timestamp: "2026-10-17T08:09:10Z".to_string(),
            provider: "mock".to_string(),
            provider_version: None,
            config: BenchmarkConfig::new(3, 0),
            families: vec!["kyber".to_string(), "falcon".to_string()],
            levels: vec![1, 5],
            rules_sha256: "0".repeat(64),
        }
    }

    fn run(family: &str, kind: PrimitiveKind, level: u8, variant: &str) -> VariantRun {
        VariantRun {
            family: family.to_string(),
            kind,
            level,
            variant: variant.to_string(),
            correctness_failures: 0,
        }
    }

    fn make_eval() -> Evaluation {
        let mut aggregates = Vec::new();
        for v in ["Kyber512", "Falcon-1024"] {
            for op in OperationKind::ALL {
                aggregates.push(TimingAggregate::from_samples(v, op, &[0.5, 1.5, 1.0]));
            }
        }
        Evaluation {
            runs: vec![
                run("falcon", PrimitiveKind::Sig, 5, "Falcon-1024"),
                run("kyber", PrimitiveKind::Kem, 1, "Kyber512"),
            ],
            aggregates,
            sizes: vec![SizeRecord {
                variant: "Kyber512".to_string(),
                kind: PrimitiveKind::Kem,
                level: Some(1),
                public_key: 800,
                secret_key: 1632,
                ciphertext: Some(768),
                shared_secret: Some(32),
                signature: None,
                ind_cca2: Some(true),
                euf_cma: None,
            }],
            ..Default::default()
        }
    }

    fn extract_json(html: &str) -> serde_json::Value {
        let start_marker = r#"<script type="application/json" id="report-data">"#;
        let start = html.find(start_marker).unwrap() + start_marker.len();
        let end = start + html[start..].find("</script>").unwrap();
        serde_json::from_str(&html[start..end]).unwrap()
    }

    #[test]
    fn test_escape_json_for_html_script() {
        let escaped = escape_json_for_html_script(r#"{"a":"</script><!--"}"#);
        assert!(!escaped.contains('<'));
        let v: serde_json::Value = serde_json::from_str(&escaped).unwrap();
        assert_eq!(v["a"], "</script><!--");
    }

    #[test]
    fn test_render_html_contains_structure() {
        let meta = make_meta();
        let eval = make_eval();
        let html = render_html(&EvaluationReport {
            meta: &meta,
            evaluation: &eval,
        });
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<script type="application/json" id="report-data">"#));
        assert!(html.contains("function barChart"));
        assert!(html.ends_with("</html>"));
    }

    #[test]
    fn test_levels_ascending_with_operation_labels() {
        let meta = make_meta();
        let eval = make_eval();
        let data = extract_json(&render_html(&EvaluationReport {
            meta: &meta,
            evaluation: &eval,
        }));
        let levels = data["levels"].as_array().unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0]["level"], 1);
        assert_eq!(levels[1]["level"], 5);

        let kyber = &levels[0]["times"][0];
        assert_eq!(kyber["variant"], "Kyber512");
        let ops: Vec<&str> = kyber["bars"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["operation"].as_str().unwrap())
            .collect();
        assert_eq!(ops, vec!["keypair", "encapsulate", "decapsulate"]);
        assert_eq!(kyber["bars"][0]["stddev_ms"], 0.5);

        assert_eq!(levels[0]["sizes"][0]["bars"].as_array().unwrap().len(), 3);
        // no size record for the falcon variant
        assert!(levels[1]["sizes"].as_array().unwrap().is_empty());
        assert_eq!(levels[1]["times"][0]["bars"][1]["operation"], "sign");
    }

    #[test]
    fn test_render_html_deterministic() {
        let meta = make_meta();
        let eval = make_eval();
        let report = EvaluationReport {
            meta: &meta,
            evaluation: &eval,
        };
        assert_eq!(render_html(&report), render_html(&report));
    }

    #[test]
    fn test_xss_script_injection_in_variant_name() {
        let meta = make_meta();
        let mut eval = make_eval();
        let evil = "</script><script>alert(1)</script>";
        eval.runs[1].variant = evil.to_string();
        eval.aborted = Some(VariantFailure {
            family: "kyber".to_string(),
            level: 3,
            variant: evil.to_string(),
            error: "<img src=x onerror=alert(1)>".to_string(),
        });
        let html = render_html(&EvaluationReport {
            meta: &meta,
            evaluation: &eval,
        });
        assert!(!html.contains("<script>alert"));
        assert!(!html.contains("<img src=x"));
        let data = extract_json(&html);
        assert_eq!(data["aborted"]["variant"], evil);
    }

    #[test]
    fn test_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = HtmlSink::new(dir.path().join("out/report.html"));
        let meta = make_meta();
        let eval = make_eval();
        sink.deliver(&EvaluationReport {
            meta: &meta,
            evaluation: &eval,
        })
        .unwrap();
        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert!(content.contains("pqc-bench report"));
    }
}
