// Metrics context
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters and gauges for the service, created once in main and passed
/// into the services that feed it. Gauges for the last sensor reading
/// start as NaN until the first ingest.
pub struct Metrics {
    started: Instant,
    reports_generated: AtomicU64,
    report_failures: AtomicU64,
    forecast_fetches: AtomicU64,
    forecast_fetch_failures: AtomicU64,
    forecast_fetch_duration_ms: AtomicU64,
    measurements_ingested: AtomicU64,
    room_temperature_bits: AtomicU64,
    room_humidity_bits: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            reports_generated: AtomicU64::new(0),
            report_failures: AtomicU64::new(0),
            forecast_fetches: AtomicU64::new(0),
            forecast_fetch_failures: AtomicU64::new(0),
            forecast_fetch_duration_ms: AtomicU64::new(0),
            measurements_ingested: AtomicU64::new(0),
            room_temperature_bits: AtomicU64::new(f64::NAN.to_bits()),
            room_humidity_bits: AtomicU64::new(f64::NAN.to_bits()),
        }
    }

    pub fn report_generated(&self) {
        self.reports_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report_failed(&self) {
        self.report_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn forecast_fetched(&self, duration: Duration) {
        self.forecast_fetches.fetch_add(1, Ordering::Relaxed);
        self.forecast_fetch_duration_ms
            .store(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn forecast_fetch_failed(&self) {
        self.forecast_fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn measurement_ingested(&self, room_temp: f64, humidity: f64) {
        self.measurements_ingested.fetch_add(1, Ordering::Relaxed);
        self.room_temperature_bits
            .store(room_temp.to_bits(), Ordering::Relaxed);
        self.room_humidity_bits
            .store(humidity.to_bits(), Ordering::Relaxed);
    }

    /// Prometheus text exposition of every metric.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();
        gauge(&mut out, "app_uptime_seconds", self.started.elapsed().as_secs_f64());
        counter(
            &mut out,
            "reports_generated_total",
            self.reports_generated.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "report_failures_total",
            self.report_failures.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "forecast_fetches_total",
            self.forecast_fetches.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "forecast_fetch_failures_total",
            self.forecast_fetch_failures.load(Ordering::Relaxed),
        );
        gauge(
            &mut out,
            "forecast_fetch_duration_seconds",
            self.forecast_fetch_duration_ms.load(Ordering::Relaxed) as f64 / 1000.0,
        );
        counter(
            &mut out,
            "measurements_ingested_total",
            self.measurements_ingested.load(Ordering::Relaxed),
        );
        gauge(
            &mut out,
            "temperature_room",
            f64::from_bits(self.room_temperature_bits.load(Ordering::Relaxed)),
        );
        gauge(
            &mut out,
            "humidity_room",
            f64::from_bits(self.room_humidity_bits.load(Ordering::Relaxed)),
        );
        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn counter(out: &mut String, name: &str, value: u64) {
    out.push_str(&format!("# TYPE {name} counter\n{name} {value}\n"));
}

fn gauge(out: &mut String, name: &str, value: f64) {
    out.push_str(&format!("# TYPE {name} gauge\n{name} {value}\n"));
}
