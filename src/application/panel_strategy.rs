// Panel preparation strategy
use crate::application::align::align;
use crate::application::window::last_day;
use crate::domain::panel::{
    BandPlan, Measure, PanelMode, PanelPlan, SeriesPlan, SeriesStyle, LIGHT_BLUE, PALETTE, PURPLE,
};
use crate::domain::series::SeriesTable;
use crate::domain::source::MarkerShape;
use chrono::{DateTime, Utc};

const PRIMARY_LABEL: &str = "Home";
const X_LABEL: &str = "Time";
const OVERLAY_ALPHA_ALL_TIME: f64 = 0.6;
const MARKER_SIZE: u32 = 3;

/// Build the data and styles for one panel.
///
/// DISTINCT panels overlay each source's raw series; MERGED panels draw
/// the aligned min/max/mean envelope against the primary. Humidity only
/// supports DISTINCT (a single source besides the baseline reports
/// humidity), so a merged request for it falls back.
pub fn build_panel(
    measure: Measure,
    mode: PanelMode,
    primary: &SeriesTable,
    secondaries: &[SeriesTable],
    reference: DateTime<Utc>,
    tolerance_minutes: f64,
) -> PanelPlan {
    let mode = match (measure, mode) {
        (Measure::Humidity, m) if m.is_merged() => {
            tracing::warn!("merged mode is defined for temperature only, drawing humidity distinct");
            if m.is_day() {
                PanelMode::DistinctDay
            } else {
                PanelMode::Distinct
            }
        }
        (_, m) => m,
    };

    if mode.is_merged() {
        merged_panel(mode, primary, secondaries, reference, tolerance_minutes)
    } else {
        distinct_panel(measure, mode, primary, secondaries, reference)
    }
}

fn distinct_panel(
    measure: Measure,
    mode: PanelMode,
    primary: &SeriesTable,
    secondaries: &[SeriesTable],
    reference: DateTime<Utc>,
) -> PanelPlan {
    let day = mode.is_day();
    let primary_points = primary_points(measure, primary, reference, day);

    let mut style = SeriesStyle::line(PRIMARY_LABEL, primary_color(measure));
    if day {
        style = style.with_marker(MarkerShape::Circle, MARKER_SIZE);
    }
    let primary_plan = SeriesPlan {
        style,
        points: primary_points,
    };

    let mut overlays = Vec::new();
    if primary_plan.points.is_empty() {
        tracing::debug!(title = panel_title(measure, day), "no primary rows, panel left empty");
    } else {
        // The baseline consumed the first palette slot only when it used a
        // palette color; the explicit purple for humidity did not.
        let palette_start = match measure {
            Measure::Temperature => 1,
            Measure::Humidity => 0,
        };
        overlays = overlay_plans(measure, secondaries, reference, day, palette_start);
    }

    PanelPlan {
        title: panel_title(measure, day),
        x_label: X_LABEL.to_string(),
        y_label: y_label(measure).to_string(),
        mode: mode.render_mode(),
        primary: primary_plan,
        overlays,
        band: None,
    }
}

fn overlay_plans(
    measure: Measure,
    secondaries: &[SeriesTable],
    reference: DateTime<Utc>,
    day: bool,
    palette_start: usize,
) -> Vec<SeriesPlan> {
    let mut overlays = Vec::new();
    let mut slot = palette_start;

    for table in secondaries {
        if table.is_primary {
            continue;
        }
        let windowed;
        let visible = if day {
            windowed = last_day(table, reference);
            &windowed
        } else {
            table
        };
        if visible.is_empty() {
            tracing::debug!(source = table.source.id, "no rows to overlay, skipping");
            continue;
        }

        match measure {
            Measure::Temperature => {
                for column in visible.source.value_columns {
                    let points = visible.points(column.column);
                    if !has_finite_values(&points) {
                        tracing::debug!(
                            source = table.source.id,
                            column = column.column,
                            "no finite values, skipping overlay"
                        );
                        continue;
                    }
                    let color = PALETTE[slot % PALETTE.len()];
                    slot += 1;
                    let mut style = SeriesStyle::line(visible.source.column_label(column), color);
                    if day {
                        style = style.with_marker(column.marker, MARKER_SIZE);
                    } else {
                        style = style.with_alpha(OVERLAY_ALPHA_ALL_TIME);
                    }
                    overlays.push(SeriesPlan { style, points });
                }
            }
            Measure::Humidity => {
                let Some(humidity) = visible.source.humidity_column else {
                    continue;
                };
                let points = visible.points(humidity);
                if !has_finite_values(&points) {
                    continue;
                }
                let color = PALETTE[slot % PALETTE.len()];
                slot += 1;
                let mut style =
                    SeriesStyle::line(visible.source.display_name.to_string(), color);
                if day {
                    style = style.with_marker(MarkerShape::Circle, MARKER_SIZE);
                } else {
                    style = style.with_alpha(OVERLAY_ALPHA_ALL_TIME);
                }
                overlays.push(SeriesPlan { style, points });
            }
        }
    }

    overlays
}

fn merged_panel(
    mode: PanelMode,
    primary: &SeriesTable,
    secondaries: &[SeriesTable],
    reference: DateTime<Utc>,
    tolerance_minutes: f64,
) -> PanelPlan {
    let day = mode.is_day();
    let windowed_primary;
    let primary = if day {
        windowed_primary = last_day(primary, reference);
        &windowed_primary
    } else {
        primary
    };

    // Only the primary is windowed. Envelope rows key off the primary's
    // timestamps, so a secondary sample just outside the cutoff still
    // counts when it sits within tolerance of the first kept row.
    let envelope = align(primary, secondaries, tolerance_minutes);
    let timestamps = envelope.timestamps();

    let mut inside_style = SeriesStyle::line("Room Temp Inside", PALETTE[0]);
    if day {
        inside_style = inside_style.with_marker(MarkerShape::Circle, MARKER_SIZE);
    }

    let (overlays, band) = if envelope.is_empty() {
        tracing::debug!("no aligned rows, merged panel left empty");
        (Vec::new(), None)
    } else {
        let overlays = vec![
            SeriesPlan {
                style: SeriesStyle::line("Min Outside Temp", LIGHT_BLUE)
                    .with_width(2)
                    .dashed(),
                points: timestamps.iter().copied().zip(envelope.outside_min()).collect(),
            },
            SeriesPlan {
                style: SeriesStyle::line("Max Outside Temp", LIGHT_BLUE)
                    .with_width(2)
                    .dashed(),
                points: timestamps.iter().copied().zip(envelope.outside_max()).collect(),
            },
            SeriesPlan {
                style: SeriesStyle::line("Mean Outside Temp", PURPLE)
                    .with_alpha(0.4)
                    .with_width(2)
                    .dashed(),
                points: timestamps.iter().copied().zip(envelope.outside_mean()).collect(),
            },
        ];
        let band = BandPlan {
            color: LIGHT_BLUE,
            alpha: 0.4,
            timestamps: timestamps.clone(),
            lower: envelope.outside_min(),
            upper: envelope.outside_max(),
        };
        (overlays, Some(band))
    };

    PanelPlan {
        title: panel_title(Measure::Temperature, day),
        x_label: X_LABEL.to_string(),
        y_label: y_label(Measure::Temperature).to_string(),
        mode: mode.render_mode(),
        primary: SeriesPlan {
            style: inside_style,
            points: timestamps.iter().copied().zip(envelope.inside()).collect(),
        },
        overlays,
        band,
    }
}

fn primary_points(
    measure: Measure,
    primary: &SeriesTable,
    reference: DateTime<Utc>,
    day: bool,
) -> Vec<(DateTime<Utc>, f64)> {
    let windowed;
    let visible = if day {
        windowed = last_day(primary, reference);
        &windowed
    } else {
        primary
    };
    let column = match measure {
        Measure::Temperature => visible.primary_value_column().map(|c| c.column),
        Measure::Humidity => visible.source.humidity_column,
    };
    column.map_or_else(Vec::new, |name| visible.points(name))
}

fn primary_color(measure: Measure) -> crate::domain::panel::Rgb {
    match measure {
        Measure::Temperature => PALETTE[0],
        Measure::Humidity => PURPLE,
    }
}

fn panel_title(measure: Measure, day: bool) -> String {
    match (measure, day) {
        (Measure::Temperature, false) => "Temperature Over Time".to_string(),
        (Measure::Temperature, true) => "Temperature Last 24 Hours".to_string(),
        (Measure::Humidity, false) => "Humidity Over Time".to_string(),
        (Measure::Humidity, true) => "Humidity Last 24 Hours".to_string(),
    }
}

fn y_label(measure: Measure) -> &'static str {
    match measure {
        Measure::Temperature => "Temp (°C)",
        Measure::Humidity => "Humidity (%)",
    }
}

fn has_finite_values(points: &[(DateTime<Utc>, f64)]) -> bool {
    points.iter().any(|(_, v)| v.is_finite())
}
