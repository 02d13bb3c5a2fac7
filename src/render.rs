//! Static SVG output of both views as they stand on a [`RetainedSurface`].

use crate::config::LayoutConfig;
use crate::session::Session;
use crate::surface::{ElementState, RetainedSurface};
use crate::types::CountryShape;
use anyhow::{anyhow, Context, Result};
use geo::{LineString, Polygon};
use std::f64::consts::PI;
use std::fmt::Write;
use std::fs;
use std::path::Path;

// Web Mercator is undefined at the poles.
const MAX_LATITUDE: f64 = 85.051_128_78;
const GRID_COLOR: &str = "lightgray";
const Y_TICK_COUNT: usize = 10;

pub fn write_svg(path: &Path, session: &Session<RetainedSurface>, boundaries: &[CountryShape], layout: &LayoutConfig) -> Result<()> {
    let svg = render_svg(session, boundaries, layout)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }
    fs::write(path, svg).with_context(|| format!("Failed to write SVG: {:?}", path))?;
    tracing::info!("Wrote {:?}", path);
    Ok(())
}

/// `boundaries` must be the slice the session's map view was built from.
pub fn render_svg(session: &Session<RetainedSurface>, boundaries: &[CountryShape], layout: &LayoutConfig) -> Result<String> {
    check_alignment(session, boundaries)?;
    let scatter_height = layout.scatter_width / layout.aspect_ratio;
    let width = layout.map_width + layout.scatter_width;
    let height = layout.map_height().max(scatter_height);

    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        num(width), num(height), num(width), num(height)
    );
    let _ = writeln!(out, r#"<title>{}</title>"#, session.time().year());

    write_map(&mut out, session, boundaries, layout);
    write_scatter(&mut out, session, layout);

    out.push_str("</svg>\n");
    Ok(out)
}

fn check_alignment(session: &Session<RetainedSurface>, boundaries: &[CountryShape]) -> Result<()> {
    let map = &session.views().map;
    if map.len() != boundaries.len() {
        return Err(anyhow!("Map view has {} shapes but {} boundaries were given", map.len(), boundaries.len()));
    }
    if let Some(((id, code), shape)) = map.iter().zip(boundaries).find(|((_, code), shape)| **code != shape.code) {
        return Err(anyhow!("Boundary {} is {} but map shape {} is {}", id.0, shape.code, id.0, code));
    }
    Ok(())
}

fn write_map(out: &mut String, session: &Session<RetainedSurface>, boundaries: &[CountryShape], layout: &LayoutConfig) {
    let (w, h) = (layout.map_width, layout.map_height());
    out.push_str("<g class=\"map\">\n");

    for ((id, code), shape) in session.views().map.iter().zip(boundaries) {
        let state = session.surface().shape(id).copied().unwrap_or_default();
        let mut d = String::new();
        for polygon in &shape.geometry.0 {
            polygon_path(&mut d, polygon, w, h);
        }
        let _ = writeln!(
            out,
            r#"<path class="country" id="country-{}" d="{}"{}/>"#,
            escape(code.as_str()), d.trim_end(), style(&state)
        );
    }

    out.push_str("</g>\n");
}

fn write_scatter(out: &mut String, session: &Session<RetainedSurface>, layout: &LayoutConfig) {
    let margin = layout.margin;
    let (pw, ph) = (layout.plot_width(), layout.plot_height());
    let encoder = session.encoder();

    let _ = writeln!(out, r#"<g class="scatter" transform="translate({},{})">"#, num(layout.map_width + margin.left), num(margin.top));

    out.push_str("<g class=\"axis x\">\n");
    for tick in encoder.x_scale().ticks() {
        let x = encoder.x_scale().apply(tick);
        let _ = writeln!(out, r#"<line x1="{x}" x2="{x}" y1="0" y2="{}" stroke="{GRID_COLOR}"/>"#, num(ph), x = num(x));
        let _ = writeln!(out, r#"<text x="{}" y="{}" text-anchor="middle" font-size="10">{}</text>"#, num(x), num(ph + 14.0), num(tick));
    }
    out.push_str("</g>\n<g class=\"axis y\">\n");
    for tick in encoder.y_scale().ticks(Y_TICK_COUNT) {
        let y = encoder.y_scale().apply(tick);
        let _ = writeln!(out, r#"<line x1="0" x2="{}" y1="{y}" y2="{y}" stroke="{GRID_COLOR}"/>"#, num(pw), y = num(y));
        let _ = writeln!(out, r#"<text x="-4" y="{}" text-anchor="end" font-size="10">{}</text>"#, num(y + 3.0), num(tick));
    }
    out.push_str("</g>\n");

    for (id, code) in session.views().scatter.iter() {
        let state = session.surface().point(id).copied().unwrap_or_default();
        let _ = writeln!(
            out,
            r#"<circle class="scatter-circle" id="scatter-circle-{}" cx="{}" cy="{}" r="{}"{}/>"#,
            escape(code.as_str()),
            num(state.cx.unwrap_or(0.0)),
            num(state.cy.unwrap_or(0.0)),
            num(state.r.unwrap_or(0.0)),
            style(&state)
        );
    }

    out.push_str("</g>\n");
}

fn style(state: &ElementState) -> String {
    let mut s = String::new();
    if let Some(fill) = state.fill {
        let _ = write!(s, r#" fill="{}""#, fill);
    }
    if let Some(stroke) = state.stroke {
        let _ = write!(s, r#" stroke="{}""#, stroke);
    }
    if let Some(width) = state.stroke_width {
        let _ = write!(s, r#" stroke-width="{}""#, num(width));
    }
    if let Some(opacity) = state.opacity {
        let _ = write!(s, r#" opacity="{}""#, num(opacity));
    }
    s
}

fn polygon_path(d: &mut String, polygon: &Polygon<f64>, width: f64, height: f64) {
    ring_path(d, polygon.exterior(), width, height);
    for interior in polygon.interiors() {
        ring_path(d, interior, width, height);
    }
}

fn ring_path(d: &mut String, ring: &LineString<f64>, width: f64, height: f64) {
    for (i, coord) in ring.coords().enumerate() {
        let (x, y) = project(coord.x, coord.y, width, height);
        let _ = write!(d, "{}{},{}", if i == 0 { "M" } else { "L" }, num(x), num(y));
    }
    if !ring.0.is_empty() {
        d.push_str("Z ");
    }
}

/// Web Mercator onto a `width` x `height` box.
fn project(lon: f64, lat: f64, width: f64, height: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0 * width;
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let y = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * height;
    (x, y)
}

/// Compact number formatting: at most two decimals, no trailing zeros.
fn num(v: f64) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
