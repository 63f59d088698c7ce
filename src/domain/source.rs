// Data source registry domain model

/// Marker shape used when a panel draws point markers (24h variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    Circle,
    Square,
}

/// One named numeric column a source reports, with an optional label
/// qualifier ("Forecast"/"Live") appended to the source's display name.
#[derive(Debug, Clone)]
pub struct ValueColumn {
    pub column: &'static str,
    pub qualifier: Option<&'static str>,
    pub marker: MarkerShape,
}

impl ValueColumn {
    pub const fn plain(column: &'static str) -> Self {
        Self {
            column,
            qualifier: None,
            marker: MarkerShape::Circle,
        }
    }

    pub const fn qualified(
        column: &'static str,
        qualifier: &'static str,
        marker: MarkerShape,
    ) -> Self {
        Self {
            column,
            qualifier: Some(qualifier),
            marker,
        }
    }
}

/// Static description of one data source: where its rows live and which
/// columns it contributes to the panels. `extra_columns` are stored and
/// summarized but never drawn (CPU temperature, precipitation, wind).
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub table_name: &'static str,
    pub value_columns: &'static [ValueColumn],
    pub humidity_column: Option<&'static str>,
    pub extra_columns: &'static [&'static str],
}

impl SourceDescriptor {
    /// Overlay label for one of this source's value columns.
    pub fn column_label(&self, column: &ValueColumn) -> String {
        match column.qualifier {
            Some(qualifier) => format!("{} {}", self.display_name, qualifier),
            None => self.display_name.to_string(),
        }
    }

    /// All column names this source stores, humidity and extras included.
    pub fn column_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> =
            self.value_columns.iter().map(|c| c.column).collect();
        if let Some(humidity) = self.humidity_column {
            names.push(humidity);
        }
        names.extend_from_slice(self.extra_columns);
        names
    }
}

pub const ROOM: SourceDescriptor = SourceDescriptor {
    id: "Room",
    display_name: "Room",
    table_name: "sensor_data",
    value_columns: &[ValueColumn::plain("room_temp")],
    humidity_column: Some("humidity"),
    extra_columns: &["cpu_temp"],
};

pub const DWD: SourceDescriptor = SourceDescriptor {
    id: "DWD",
    display_name: "DWD",
    table_name: "dwd_data",
    value_columns: &[ValueColumn::qualified("temp", "Forecast", MarkerShape::Circle)],
    humidity_column: None,
    extra_columns: &["temp_dev"],
};

pub const GOOGLE: SourceDescriptor = SourceDescriptor {
    id: "Google.de",
    display_name: "Google.de",
    table_name: "google_data",
    value_columns: &[ValueColumn::qualified("temp", "Forecast", MarkerShape::Circle)],
    humidity_column: Some("humidity"),
    extra_columns: &["precipitation", "wind"],
};

pub const WETTER_COM: SourceDescriptor = SourceDescriptor {
    id: "Wetter.com",
    display_name: "Wetter.com",
    table_name: "wettercom_data",
    value_columns: &[
        ValueColumn::qualified("temp_stat", "Forecast", MarkerShape::Circle),
        ValueColumn::qualified("temp_dyn", "Live", MarkerShape::Square),
    ],
    humidity_column: None,
    extra_columns: &[],
};

pub const ULM_DE: SourceDescriptor = SourceDescriptor {
    id: "Ulm.de",
    display_name: "Ulm.de",
    table_name: "ulmde_data",
    value_columns: &[ValueColumn::qualified("temp", "Forecast", MarkerShape::Circle)],
    humidity_column: None,
    extra_columns: &[],
};

/// Every known source, the indoor baseline first.
pub const ALL_SOURCES: [&SourceDescriptor; 5] = [&ROOM, &DWD, &GOOGLE, &WETTER_COM, &ULM_DE];

/// The secondary (outdoor) sources in registry order.
pub const SECONDARY_SOURCES: [&SourceDescriptor; 4] = [&DWD, &GOOGLE, &WETTER_COM, &ULM_DE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_label_uses_qualifier() {
        let forecast = &WETTER_COM.value_columns[0];
        let live = &WETTER_COM.value_columns[1];
        assert_eq!(WETTER_COM.column_label(forecast), "Wetter.com Forecast");
        assert_eq!(WETTER_COM.column_label(live), "Wetter.com Live");
        assert_eq!(ROOM.column_label(&ROOM.value_columns[0]), "Room");
    }

    #[test]
    fn test_outdoor_temperature_columns_carry_forecast_qualifier() {
        for source in [&DWD, &GOOGLE, &ULM_DE] {
            assert_eq!(
                source.column_label(&source.value_columns[0]),
                format!("{} Forecast", source.display_name)
            );
        }
    }

    #[test]
    fn test_column_names_include_humidity() {
        assert_eq!(ROOM.column_names(), vec!["room_temp", "humidity", "cpu_temp"]);
        assert_eq!(ULM_DE.column_names(), vec!["temp"]);
    }
}
