// Chart composition on the plotters SVG backend
use crate::domain::panel::{BandPlan, LinePattern, PanelPlan, Rgb, SeriesPlan};
use crate::domain::source::MarkerShape;
use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;

const CANVAS_SIZE: (u32, u32) = (1600, 1200);

type PanelChart<'a, DB> =
    ChartContext<'a, DB, Cartesian2d<RangedDateTime<NaiveDateTime>, RangedCoordf64>>;

// Style parameters applied to every panel of one build. Rebuilt per call;
// nothing is carried over from previous figures.
struct ChartTheme {
    font_family: &'static str,
    caption_px: u32,
    label_px: u32,
    x_labels: usize,
}

impl ChartTheme {
    fn new() -> Self {
        Self {
            font_family: "sans-serif",
            caption_px: 16,
            label_px: 11,
            x_labels: 10,
        }
    }
}

/// Render the panel grid into an SVG document.
///
/// An empty plan list or a grid whose capacity does not match the panel
/// count yields no figure; both are logged and left to the caller.
pub fn render_report(plans: &[PanelPlan], rows: usize, cols: usize) -> Result<Option<String>> {
    if plans.is_empty() {
        tracing::warn!("no panels to draw, skipping figure");
        return Ok(None);
    }
    if rows * cols != plans.len() {
        tracing::warn!(
            rows,
            cols,
            panels = plans.len(),
            "grid shape does not match panel count, skipping figure"
        );
        return Ok(None);
    }

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CANVAS_SIZE).into_drawing_area();
        draw_grid(&root, plans, rows, cols)?;
    }
    Ok(Some(svg))
}

fn draw_grid<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    plans: &[PanelPlan],
    rows: usize,
    cols: usize,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let theme = ChartTheme::new();
    root.fill(&WHITE)?;
    let areas = root.split_evenly((rows, cols));
    for (panel, plan) in plans.iter().enumerate() {
        draw_panel(&areas[area_index(panel, rows, cols)], plan, &theme)?;
    }
    root.present()?;
    Ok(())
}

// Plans arrive column by column, split_evenly hands areas out row by row.
fn area_index(panel: usize, rows: usize, cols: usize) -> usize {
    (panel % rows) * cols + panel / rows
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    plan: &PanelPlan,
    theme: &ChartTheme,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    if !plan.has_content() {
        tracing::warn!(title = plan.title.as_str(), "panel has no content, leaving it blank");
        return Ok(());
    }
    let Some((x_range, y_range)) = panel_bounds(plan) else {
        tracing::warn!(title = plan.title.as_str(), "panel holds no finite values, leaving it blank");
        return Ok(());
    };

    let mut chart = ChartBuilder::on(area)
        .caption(&plan.title, (theme.font_family, theme.caption_px).into_font())
        .margin(10)
        .x_label_area_size(70)
        .y_label_area_size(70)
        .build_cartesian_2d(RangedDateTime::from(x_range), y_range)?;

    let x_label_formatter = |t: &NaiveDateTime| t.format("%d-%m %H:%M").to_string();
    chart
        .configure_mesh()
        .x_labels(theme.x_labels)
        .x_label_style(
            (theme.font_family, theme.label_px)
                .into_font()
                .transform(FontTransform::Rotate270)
                .with_anchor::<RGBColor>(Pos::new(HPos::Right, VPos::Top)),
        )
        .x_label_formatter(&x_label_formatter)
        .x_desc(plan.x_label.as_str())
        .y_desc(plan.y_label.as_str())
        .draw()?;

    if let Some(band) = &plan.band {
        draw_band(&mut chart, band)?;
    }

    let mut any_label = draw_series_plan(&mut chart, &plan.primary)?;
    for overlay in &plan.overlays {
        any_label |= draw_series_plan(&mut chart, overlay)?;
    }

    if any_label {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.7))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperLeft)
            .draw()?;
    }
    Ok(())
}

/// Draw one series, splitting it at NaN cells so gaps stay gaps. Returns
/// whether a legend entry was attached.
fn draw_series_plan<DB: DrawingBackend>(
    chart: &mut PanelChart<DB>,
    series: &SeriesPlan,
) -> Result<bool>
where
    DB::ErrorType: 'static,
{
    let style = line_style(series);
    let runs = finite_runs(&series.points);
    let mut labeled = false;

    for run in &runs {
        let annotated = match series.style.pattern {
            LinePattern::Solid => {
                chart.draw_series(LineSeries::new(run.iter().copied(), style))?
            }
            LinePattern::Dashed => {
                chart.draw_series(DashedLineSeries::new(run.iter().copied(), 6, 4, style))?
            }
        };
        // Label only the first run so the legend lists the series once.
        if !labeled {
            annotated
                .label(series.style.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
            labeled = true;
        }
    }

    if let Some(marker) = series.style.marker {
        let size = series.style.marker_size;
        for run in &runs {
            match marker {
                MarkerShape::Circle => {
                    chart.draw_series(
                        run.iter()
                            .map(|&(t, v)| Circle::new((t, v), size, style.filled())),
                    )?;
                }
                MarkerShape::Square => {
                    let half = size as i32;
                    chart.draw_series(run.iter().map(|&(t, v)| {
                        EmptyElement::at((t, v))
                            + Rectangle::new([(-half, -half), (half, half)], style.filled())
                    }))?;
                }
            }
        }
    }
    Ok(labeled)
}

fn draw_band<DB: DrawingBackend>(chart: &mut PanelChart<DB>, band: &BandPlan) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let style = color(band.color).mix(band.alpha).filled();
    for run in finite_band_runs(band) {
        if run.len() < 2 {
            continue;
        }
        let mut polygon: Vec<(NaiveDateTime, f64)> =
            run.iter().map(|&(t, lower, _)| (t, lower)).collect();
        polygon.extend(run.iter().rev().map(|&(t, _, upper)| (t, upper)));
        chart.draw_series(std::iter::once(Polygon::new(polygon, style)))?;
    }
    Ok(())
}

fn color(rgb: Rgb) -> RGBColor {
    RGBColor(rgb.0, rgb.1, rgb.2)
}

fn line_style(series: &SeriesPlan) -> ShapeStyle {
    color(series.style.color)
        .mix(series.style.alpha)
        .stroke_width(series.style.width)
}

/// Maximal stretches of consecutive finite points.
fn finite_runs(points: &[(DateTime<Utc>, f64)]) -> Vec<Vec<(NaiveDateTime, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (t, v) in points {
        if v.is_finite() {
            current.push((t.naive_utc(), *v));
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn finite_band_runs(band: &BandPlan) -> Vec<Vec<(NaiveDateTime, f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for ((t, lower), upper) in band
        .timestamps
        .iter()
        .zip(band.lower.iter())
        .zip(band.upper.iter())
    {
        if lower.is_finite() && upper.is_finite() {
            current.push((t.naive_utc(), *lower, *upper));
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn panel_bounds(plan: &PanelPlan) -> Option<(Range<NaiveDateTime>, Range<f64>)> {
    let mut time_bounds: Option<(NaiveDateTime, NaiveDateTime)> = None;
    let mut value_bounds: Option<(f64, f64)> = None;

    let series_points = std::iter::once(&plan.primary)
        .chain(plan.overlays.iter())
        .flat_map(|series| series.points.iter().copied());
    let band_points = plan.band.iter().flat_map(|band| {
        let lower = band
            .timestamps
            .iter()
            .copied()
            .zip(band.lower.iter().copied());
        let upper = band
            .timestamps
            .iter()
            .copied()
            .zip(band.upper.iter().copied());
        lower.chain(upper)
    });

    for (t, v) in series_points.chain(band_points) {
        if !v.is_finite() {
            continue;
        }
        let t = t.naive_utc();
        time_bounds = Some(match time_bounds {
            None => (t, t),
            Some((lo, hi)) => (lo.min(t), hi.max(t)),
        });
        value_bounds = Some(match value_bounds {
            None => (v, v),
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
        });
    }

    let (t_lo, t_hi) = time_bounds?;
    let (v_lo, v_hi) = value_bounds?;
    // Degenerate ranges get padding so the axes stay drawable.
    let (t_lo, t_hi) = if t_lo == t_hi {
        (t_lo - Duration::minutes(30), t_hi + Duration::minutes(30))
    } else {
        (t_lo, t_hi)
    };
    let value_pad = if v_hi > v_lo { (v_hi - v_lo) * 0.05 } else { 1.0 };
    Some((t_lo..t_hi, (v_lo - value_pad)..(v_hi + value_pad)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::panel::{RenderMode, SeriesStyle, LIGHT_BLUE, PALETTE};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, hour, 0, 0).unwrap()
    }

    fn plan(title: &str, points: Vec<(DateTime<Utc>, f64)>) -> PanelPlan {
        PanelPlan {
            title: title.to_string(),
            x_label: "Time".to_string(),
            y_label: "Temp (°C)".to_string(),
            mode: RenderMode::Distinct,
            primary: SeriesPlan {
                style: SeriesStyle::line("Home", PALETTE[0]),
                points,
            },
            overlays: Vec::new(),
            band: None,
        }
    }

    fn points() -> Vec<(DateTime<Utc>, f64)> {
        vec![(at(10), 21.0), (at(11), 21.5), (at(12), 22.0)]
    }

    #[test]
    fn test_render_report_produces_svg() {
        let plans = vec![
            plan("Temperature Over Time", points()),
            plan("Temperature Last 24 Hours", points()),
            plan("Humidity Over Time", points()),
            plan("Humidity Last 24 Hours", points()),
        ];
        let svg = render_report(&plans, 2, 2).unwrap().unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains("Temperature Over Time"));
        assert!(svg.contains("Humidity Last 24 Hours"));
        assert!(svg.contains("Home"));
        // Ticks on the datetime axis come out through the day-month formatter.
        assert!(svg.contains("10-03 "));
    }

    #[test]
    fn test_zero_panels_yield_no_figure() {
        assert!(render_report(&[], 2, 2).unwrap().is_none());
    }

    #[test]
    fn test_grid_mismatch_yields_no_figure() {
        let plans = vec![plan("a", points()), plan("b", points()), plan("c", points())];
        assert!(render_report(&plans, 2, 2).unwrap().is_none());
    }

    #[test]
    fn test_empty_panels_render_blank() {
        let plans = vec![
            plan("Temperature Over Time", Vec::new()),
            plan("Temperature Last 24 Hours", Vec::new()),
            plan("Humidity Over Time", Vec::new()),
            plan("Humidity Last 24 Hours", Vec::new()),
        ];
        let svg = render_report(&plans, 2, 2).unwrap().unwrap();
        assert!(!svg.contains("Temperature Over Time"));
    }

    #[test]
    fn test_band_renders_polygon() {
        let mut merged = plan("Merged", points());
        merged.mode = RenderMode::Merged;
        merged.band = Some(BandPlan {
            color: LIGHT_BLUE,
            alpha: 0.4,
            timestamps: vec![at(10), at(11), at(12)],
            lower: vec![14.0, 14.5, 15.0],
            upper: vec![16.0, 16.5, 17.0],
        });
        let svg = render_report(&[merged], 1, 1).unwrap().unwrap();
        assert!(svg.contains("<polygon"));
    }

    #[test]
    fn test_panels_fill_columns_before_rows() {
        assert_eq!(area_index(0, 2, 2), 0);
        assert_eq!(area_index(1, 2, 2), 2);
        assert_eq!(area_index(2, 2, 2), 1);
        assert_eq!(area_index(3, 2, 2), 3);
    }

    #[test]
    fn test_finite_runs_split_on_nan() {
        let points = vec![
            (at(10), 21.0),
            (at(11), f64::NAN),
            (at(12), 22.0),
            (at(13), 22.5),
        ];
        let runs = finite_runs(&points);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].len(), 1);
        assert_eq!(runs[1].len(), 2);
    }

    #[test]
    fn test_bounds_cover_band_and_ignore_nan() {
        let mut p = plan("t", vec![(at(11), 21.0), (at(12), f64::NAN)]);
        p.band = Some(BandPlan {
            color: LIGHT_BLUE,
            alpha: 0.4,
            timestamps: vec![at(10), at(11)],
            lower: vec![14.0, f64::NAN],
            upper: vec![30.0, f64::NAN],
        });
        let (x_range, y_range) = panel_bounds(&p).unwrap();
        assert_eq!(x_range.start, at(10).naive_utc());
        assert_eq!(x_range.end, at(11).naive_utc());
        assert!(y_range.start < 14.0);
        assert!(y_range.end > 30.0);
    }

    #[test]
    fn test_single_point_gets_padded_axes() {
        let (x_range, y_range) = panel_bounds(&plan("t", vec![(at(10), 21.0)])).unwrap();
        assert!(x_range.start < x_range.end);
        assert!(y_range.start < 21.0 && y_range.end > 21.0);
    }
}
