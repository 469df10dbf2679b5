//! Plot sessions: chart state owned by one value and written out once.

use crate::Result;
use crate::model::stats::percentile;

use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Line,
    Points,
}

#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub label: String,
    pub style: Style,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub x: f64,
    pub label: String,
}

/// Five-number summary with 1.5 IQR whiskers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub low: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub high: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = percentile(&sorted, 25.0);
        let median = percentile(&sorted, 50.0);
        let q3 = percentile(&sorted, 75.0);
        let reach = 1.5 * (q3 - q1);
        let (lo_fence, hi_fence) = (q1 - reach, q3 + reach);

        let inside: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|v| *v >= lo_fence && *v <= hi_fence)
            .collect();
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < lo_fence || *v > hi_fence)
            .collect();

        Some(BoxStats {
            low: inside.first().copied().unwrap_or(q1),
            q1,
            median,
            q3,
            high: inside.last().copied().unwrap_or(q3),
            outliers,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoxGroup {
    pub label: String,
    pub stats: BoxStats,
}

/// One chart under construction. Every drawing call goes through the
/// session; `finalize` consumes it and writes the file.
#[derive(Debug, Clone, Serialize)]
pub struct PlotSession {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
    pub markers: Vec<Marker>,
    pub boxes: Vec<BoxGroup>,
    pub x_range: Option<(f64, f64)>,
    pub y_range: Option<(f64, f64)>,
}

impl PlotSession {
    pub fn new(title: impl Into<String>, x_label: &str, y_label: &str) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            series: Vec::new(),
            markers: Vec::new(),
            boxes: Vec::new(),
            x_range: None,
            y_range: None,
        }
    }

    pub fn add_series(&mut self, label: impl Into<String>, style: Style, points: Vec<(f64, f64)>) {
        self.series.push(Series {
            label: label.into(),
            style,
            points,
        });
    }

    /// Vertical marker at `elapsed_ms`, drawn in seconds like the series.
    pub fn add_failure_marker(&mut self, elapsed_ms: f64) {
        self.markers.push(Marker {
            x: elapsed_ms / 1000.0,
            label: "FAILURE".to_string(),
        });
    }

    pub fn add_box(&mut self, label: impl Into<String>, values: &[f64]) {
        if let Some(stats) = BoxStats::of(values) {
            self.boxes.push(BoxGroup {
                label: label.into(),
                stats,
            });
        }
    }

    pub fn set_x_range(&mut self, lo: f64, hi: f64) {
        self.x_range = Some((lo, hi));
    }

    pub fn set_y_range(&mut self, lo: f64, hi: f64) {
        self.y_range = Some((lo, hi));
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty()) && self.boxes.is_empty()
    }

    /// Render and write to `path`, closing the session.
    pub fn finalize(self, path: &Path) -> Result<PathBuf> {
        let html = self.render_html()?;
        fs::write(path, html).with_context(|| format!("write plot {}", path.display()))?;
        Ok(path.to_path_buf())
    }

    /// Self-contained HTML page; the session is embedded as JSON and drawn
    /// as SVG in the browser.
    ///
    /// The template is filled with `replace` rather than `format!()` since
    /// the script is full of braces.
    pub fn render_html(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;

        const TEMPLATE: &str = r##"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>plot</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 16px; }
  svg { background: white; }
  .axis line, .axis path { stroke: #333; }
  .grid { stroke: #e5e5e5; }
  .legend { font-size: 12px; }
  text { font-size: 12px; fill: #333; }
</style>
</head>
<body>
<svg id="plot" width="1200" height="675"></svg>
<script>
const DATA = __DATA__;
const W = 1200, H = 675, M = { l: 70, r: 160, t: 40, b: 50 };
const COLORS = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
                "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf"];
const NS = "http://www.w3.org/2000/svg";
const svg = document.getElementById("plot");
document.title = DATA.title;

function el(name, attrs, text) {
  const e = document.createElementNS(NS, name);
  for (const [k, v] of Object.entries(attrs)) e.setAttribute(k, v);
  if (text !== undefined) e.textContent = text;
  svg.appendChild(e);
  return e;
}

function extent(values, fallback) {
  if (!values.length) return fallback;
  let lo = Math.min(...values), hi = Math.max(...values);
  if (lo === hi) { lo -= 1; hi += 1; }
  return [lo, hi];
}

function ticks(lo, hi, n) {
  const step = (hi - lo) / n;
  return Array.from({ length: n + 1 }, (_, i) => lo + i * step);
}

const isBox = DATA.boxes.length > 0;
const xs = [], ys = [];
for (const s of DATA.series) for (const [x, y] of s.points) { xs.push(x); ys.push(y); }
for (const m of DATA.markers) xs.push(m.x);
for (const b of DATA.boxes) { ys.push(b.stats.low, b.stats.high, ...b.stats.outliers); }

const [x0, x1] = DATA.x_range || (isBox ? [0, DATA.boxes.length + 1] : extent(xs, [0, 1]));
const [y0, y1] = DATA.y_range || extent(ys.concat(isBox ? [] : [0]), [0, 1]);
const sx = x => M.l + (x - x0) / (x1 - x0) * (W - M.l - M.r);
const sy = y => H - M.b - (y - y0) / (y1 - y0) * (H - M.t - M.b);

for (const t of ticks(y0, y1, 5)) {
  el("line", { x1: M.l, x2: W - M.r, y1: sy(t), y2: sy(t), class: "grid" });
  el("text", { x: M.l - 8, y: sy(t) + 4, "text-anchor": "end" }, t.toFixed(1));
}
if (!isBox) {
  for (const t of ticks(x0, x1, 8)) {
    el("text", { x: sx(t), y: H - M.b + 18, "text-anchor": "middle" }, t.toFixed(0));
  }
}
el("line", { x1: M.l, x2: W - M.r, y1: H - M.b, y2: H - M.b, stroke: "#333" });
el("line", { x1: M.l, x2: M.l, y1: M.t, y2: H - M.b, stroke: "#333" });
el("text", { x: (M.l + W - M.r) / 2, y: H - 10, "text-anchor": "middle" }, DATA.x_label);
el("text", { x: 16, y: (M.t + H - M.b) / 2, transform: `rotate(-90 16 ${(M.t + H - M.b) / 2})`, "text-anchor": "middle" }, DATA.y_label);
el("text", { x: M.l, y: 24, style: "font-size: 15px" }, DATA.title);

DATA.series.forEach((s, i) => {
  const color = COLORS[i % COLORS.length];
  const pts = s.points.filter(([x, y]) => x >= x0 && x <= x1);
  if (s.style === "line" && pts.length > 1) {
    el("polyline", { points: pts.map(([x, y]) => `${sx(x)},${sy(y)}`).join(" "),
                     fill: "none", stroke: color, "stroke-width": 1, opacity: 0.8 });
  }
  for (const [x, y] of pts) el("circle", { cx: sx(x), cy: sy(y), r: 2, fill: color, opacity: 0.8 });
  el("rect", { x: W - M.r + 12, y: M.t + i * 18 - 9, width: 10, height: 10, fill: color });
  el("text", { x: W - M.r + 28, y: M.t + i * 18, class: "legend" }, s.label);
});

for (const m of DATA.markers) {
  if (m.x < x0 || m.x > x1) continue;
  el("line", { x1: sx(m.x), x2: sx(m.x), y1: M.t, y2: H - M.b,
               stroke: "red", "stroke-dasharray": "6,4" });
}

DATA.boxes.forEach((b, i) => {
  const c = sx(i + 1), half = 20, st = b.stats;
  el("line", { x1: c, x2: c, y1: sy(st.low), y2: sy(st.q1), stroke: "#333" });
  el("line", { x1: c, x2: c, y1: sy(st.q3), y2: sy(st.high), stroke: "#333" });
  el("rect", { x: c - half, y: sy(st.q3), width: 2 * half, height: Math.max(1, sy(st.q1) - sy(st.q3)),
               fill: "#cfe3ff", stroke: "#333" });
  el("line", { x1: c - half, x2: c + half, y1: sy(st.median), y2: sy(st.median), stroke: "#d62728" });
  for (const o of st.outliers) el("circle", { cx: c, cy: sy(o), r: 3, fill: "none", stroke: "#333" });
  el("text", { x: c, y: H - M.b + 18, "text-anchor": "middle" }, b.label);
});
</script>
</body>
</html>
"##;

        Ok(TEMPLATE.replace("__DATA__", &json))
    }
}
