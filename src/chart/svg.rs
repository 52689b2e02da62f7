//! SVG output for rendered charts

use super::{Chart, Geometry, LinearScale};
use crate::config::ChartConfig;
use std::io::{self, Write};

/// Write `chart` as a standalone `<svg>` element.
pub fn write_svg<W: Write>(out: &mut W, chart: &Chart, frame: &ChartConfig) -> io::Result<()> {
    let inner_w = (frame.width - frame.margin_left - frame.margin_right).max(1.0);
    let inner_h = (frame.height - frame.margin_top - frame.margin_bottom).max(1.0);

    let x = LinearScale::new(chart.x_domain, (0.0, inner_w));
    let y = LinearScale::new(chart.y_domain, (inner_h, 0.0));
    let color = escape_xml(&chart.color);

    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" class="feature-chart" data-kind="{}">"#,
        frame.width, frame.height, chart.kind
    )?;
    writeln!(
        out,
        r#"<g transform="translate({:.1},{:.1})">"#,
        frame.margin_left, frame.margin_top
    )?;

    // X axis along the bottom of the plot area
    writeln!(out, r#"<g class="x-axis" transform="translate(0,{:.1})">"#, inner_h)?;
    writeln!(
        out,
        r#"<line x1="0" x2="{:.1}" y1="0" y2="0" stroke="currentColor"/>"#,
        inner_w
    )?;
    for t in tick_values(chart.x_domain.min, chart.x_domain.max, frame.ticks) {
        writeln!(
            out,
            r#"<g class="tick" transform="translate({:.2},0)"><line y2="6" stroke="currentColor"/><text y="9" dy="0.71em" text-anchor="middle">{:.2}</text></g>"#,
            x.map(t),
            t
        )?;
    }
    writeln!(
        out,
        r#"<text class="axis-label" x="{:.1}" y="{:.1}" text-anchor="middle">Time (s)</text>"#,
        inner_w / 2.0,
        frame.margin_bottom - 10.0
    )?;
    writeln!(out, "</g>")?;

    match &chart.geometry {
        Geometry::Line { points } => {
            if !points.is_empty() {
                write!(out, r#"<path class="line" fill="none" stroke="{}" d=""#, color)?;
                for (i, &(t, v)) in points.iter().enumerate() {
                    let cmd = if i == 0 { 'M' } else { 'L' };
                    write!(out, "{}{:.2},{:.2}", cmd, x.map(t), y.map(v))?;
                }
                writeln!(out, r#""/>"#)?;
            }
        }
        Geometry::Markers { times } => {
            for &t in times {
                let px = x.map(t);
                writeln!(
                    out,
                    r#"<line class="onset-line" x1="{:.2}" x2="{:.2}" y1="0" y2="{:.1}" stroke="{}"/>"#,
                    px, px, inner_h, color
                )?;
            }
        }
    }

    writeln!(out, "</g>")?;
    writeln!(out, "</svg>")
}

pub fn to_svg_string(chart: &Chart, frame: &ChartConfig) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec can't fail
    let _ = write_svg(&mut buf, chart, frame);
    String::from_utf8_lossy(&buf).into_owned()
}

/// `ticks + 1` evenly spaced values covering `[min, max]`.
pub fn tick_values(min: f64, max: f64, ticks: usize) -> Vec<f64> {
    if ticks == 0 || max <= min {
        return vec![min];
    }
    let step = (max - min) / ticks as f64;
    (0..=ticks).map(|i| min + step * i as f64).collect()
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
