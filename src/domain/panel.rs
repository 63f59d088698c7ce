// Panel plan domain model
use crate::domain::source::MarkerShape;
use chrono::{DateTime, Utc};

/// Plain RGB triple; the rendering adapter converts to backend colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Default palette, cycled through in order for distinct overlays. The
/// first entry doubles as the baseline series color.
pub const PALETTE: [Rgb; 8] = [
    Rgb(31, 119, 180),
    Rgb(255, 127, 14),
    Rgb(44, 160, 44),
    Rgb(214, 39, 40),
    Rgb(148, 103, 189),
    Rgb(140, 86, 75),
    Rgb(227, 119, 194),
    Rgb(127, 127, 127),
];

pub const PURPLE: Rgb = Rgb(128, 0, 128);
pub const LIGHT_BLUE: Rgb = Rgb(173, 216, 230);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePattern {
    Solid,
    Dashed,
}

/// Direct style parameters for one drawn series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStyle {
    pub label: String,
    pub color: Rgb,
    pub alpha: f64,
    pub width: u32,
    pub pattern: LinePattern,
    pub marker: Option<MarkerShape>,
    pub marker_size: u32,
}

impl SeriesStyle {
    /// Solid unmarked line, full opacity.
    pub fn line(label: impl Into<String>, color: Rgb) -> Self {
        Self {
            label: label.into(),
            color,
            alpha: 1.0,
            width: 1,
            pattern: LinePattern::Solid,
            marker: None,
            marker_size: 0,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_marker(mut self, marker: MarkerShape, size: u32) -> Self {
        self.marker = Some(marker);
        self.marker_size = size;
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn dashed(mut self) -> Self {
        self.pattern = LinePattern::Dashed;
        self
    }
}

/// Prepared data plus style for one series in a panel.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPlan {
    pub style: SeriesStyle,
    pub points: Vec<(DateTime<Utc>, f64)>,
}

/// Shaded fill between the envelope's min and max lines.
#[derive(Debug, Clone, PartialEq)]
pub struct BandPlan {
    pub color: Rgb,
    pub alpha: f64,
    pub timestamps: Vec<DateTime<Utc>>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Distinct,
    Merged,
}

/// The panel variants the strategy dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMode {
    Distinct,
    DistinctDay,
    Merged,
    MergedDay,
}

impl PanelMode {
    pub fn is_day(self) -> bool {
        matches!(self, PanelMode::DistinctDay | PanelMode::MergedDay)
    }

    pub fn is_merged(self) -> bool {
        matches!(self, PanelMode::Merged | PanelMode::MergedDay)
    }

    pub fn render_mode(self) -> RenderMode {
        if self.is_merged() {
            RenderMode::Merged
        } else {
            RenderMode::Distinct
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Temperature,
    Humidity,
}

/// Everything the composer needs to draw one panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelPlan {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub mode: RenderMode,
    pub primary: SeriesPlan,
    pub overlays: Vec<SeriesPlan>,
    pub band: Option<BandPlan>,
}

impl PanelPlan {
    /// A panel with no primary rows renders as an empty frame.
    pub fn has_content(&self) -> bool {
        !self.primary.points.is_empty()
    }
}
