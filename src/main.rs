// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod config;
mod status;

use std::error::Error;
use std::sync::{Arc, Mutex, PoisonError};

use clap::Parser;
use log::{debug, info, warn, LevelFilter};
use skywatch_feed::presentation::{track_hint, VerticalTrend};
use skywatch_feed::weather::ATTRIBUTION;
use skywatch_feed::{
    Client, DetailState, DisplaySettings, FilterCriteria, MapView, Telemetry, UnitSystem,
    WeatherLayer, WeatherView,
};

use config::AppConfig;
use status::{SharedSystemStatus, SystemStatus};

#[derive(Parser, Debug)]
#[command(version, about = "Live flight tracker with weather overlay")]
struct Args {
    /// Print the configuration file path and exit
    #[arg(long)]
    config_path: bool,
    /// Debug logging for skywatch modules
    #[arg(short, long)]
    verbose: bool,
    /// Select an aircraft by ICAO24 once the first poll arrives
    #[arg(short, long)]
    select: Option<String>,
    /// Weather overlay: none, radar or cloud
    #[arg(short, long)]
    weather: Option<WeatherLayer>,
    /// Show metric units
    #[arg(long)]
    metric: bool,
    /// Hide aircraft below this altitude (meters)
    #[arg(long)]
    min_altitude: Option<f64>,
    /// Only show callsigns containing this text
    #[arg(short, long)]
    airline: Option<String>,
    /// Stop after this many map updates, 0 runs until interrupted
    #[arg(short, long, default_value_t = 0)]
    cycles: u32,
    /// Store the display overrides in the configuration file
    #[arg(long)]
    save: bool,
}

impl Args {
    fn apply(&self, settings: DisplaySettings) -> DisplaySettings {
        let mut settings = settings;
        if let Some(layer) = self.weather {
            settings = settings.with_weather_layer(layer);
        }
        if self.metric {
            settings = settings.with_units(UnitSystem::Metric);
        }
        if self.min_altitude.is_some() || self.airline.is_some() {
            let current = &settings.filters;
            let filters = FilterCriteria::new(
                self.min_altitude.unwrap_or(current.min_altitude),
                self.airline.clone().unwrap_or_else(|| current.airline.clone()),
            );
            settings = settings.with_filters(filters);
        }
        settings
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder
            .filter_module("skywatch", LevelFilter::Debug)
            .filter_module("skywatch_feed", LevelFilter::Debug);
    }
    builder.init();
}

fn with_status<R>(status: &SharedSystemStatus, f: impl FnOnce(&mut SystemStatus) -> R) -> R {
    let mut guard = status.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.config_path {
        println!("{}", AppConfig::get_config_path()?.display());
        return Ok(());
    }

    let mut app_config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    });
    app_config.display = args.apply(app_config.display);
    if args.save {
        app_config.save()?;
        info!("Configuration saved");
    }

    info!("Starting skywatch...");
    let style = app_config.display.map_style;
    info!("Map style {} ({}), {}", style, style.tile_url(), style.attribution());
    let client = Client::spawn(app_config.to_client_config())?;
    let status: SharedSystemStatus = Arc::new(Mutex::new(SystemStatus::new()));

    let mut demo_rx = client.demo_mode();
    let demo_status = Arc::clone(&status);
    tokio::spawn(async move {
        loop {
            let demo = *demo_rx.borrow_and_update();
            with_status(&demo_status, |s| s.set_demo_mode(demo));
            if demo_rx.changed().await.is_err() {
                break;
            }
        }
    });

    run(&client, &status, &args).await;
    client.shutdown().await;

    for d in with_status(&status, |s| s.diagnostics.clone()) {
        println!("{} [{}] {}", d.timestamp.format("%H:%M:%S"), d.level, d.message);
    }
    Ok(())
}

async fn run(client: &Client, status: &SharedSystemStatus, args: &Args) {
    let mut map_rx = client.subscribe_map();
    let mut weather_rx = client.subscribe_weather();
    let mut detail_rx = client.subscribe_detail();
    let mut pending_select = args.select.clone();
    let mut updates = 0u32;

    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            biased;
            _ = &mut interrupted => {
                info!("Interrupted, shutting down");
                break;
            }
            changed = map_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = map_rx.borrow_and_update().clone();
                if let Some(icao24) = pending_select.take() {
                    client.select(&icao24);
                }
                with_status(status, |s| s.record_view(&view));
                print_view(client, &view, &with_status(status, |s| s.summary()));

                updates += 1;
                if args.cycles > 0 && updates >= args.cycles {
                    debug!("Stopping after {} updates", updates);
                    break;
                }
            }
            changed = weather_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = weather_rx.borrow_and_update().clone();
                with_status(status, |s| s.record_weather(&view));
                print_weather(&view);
            }
            changed = detail_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = detail_rx.borrow_and_update().clone();
                with_status(status, |s| s.record_detail(&state));
                print_detail(&state, client.settings().units);
            }
        }
    }
}

fn print_view(client: &Client, view: &MapView, summary: &str) {
    let settings = client.settings();
    let filters = &settings.filters;
    if filters.is_active() {
        println!(
            "== {summary} (min alt {:.0} m, airline \"{}\")",
            filters.min_altitude, filters.airline
        );
    } else {
        println!("== {summary}");
    }
    for marker in client.markers() {
        println!(
            "{}{} {:>9.4} {:>9.4} {:>5.0}°{}",
            if marker.selected { '>' } else { ' ' },
            marker.icao24,
            marker.latitude,
            marker.longitude,
            marker.rotation_deg,
            if marker.emergency { "  EMERGENCY" } else { "" },
        );
    }
    for airport in client.airport_markers() {
        println!(
            "{}{:<6} {:>9.4} {:>9.4} {}",
            if airport.on_route { '*' } else { ' ' },
            airport.code,
            airport.latitude,
            airport.longitude,
            airport.city,
        );
    }

    let detail = client.detail();
    let Some(icao24) = detail.icao24() else {
        return;
    };
    let Some(selected) = view.visible.iter().find(|a| a.icao24 == icao24) else {
        return;
    };
    if let Some(points) = track_hint(selected) {
        let trail: Vec<String> = points
            .iter()
            .map(|(lat, lon)| format!("{lat:.2},{lon:.2}"))
            .collect();
        println!("   track {}", trail.join(" -> "));
    }
}

fn print_weather(view: &WeatherView) {
    match (&view.tile_url, view.frame_index) {
        (Some(url), Some(index)) => {
            let captured = view
                .captured_at
                .map(|t| t.format("%H:%M UTC").to_string())
                .unwrap_or_default();
            println!(
                "-- {} frame {}/{} {} {} ({})",
                view.layer.display_name(),
                index + 1,
                view.frame_count,
                captured,
                url,
                ATTRIBUTION
            );
        }
        _ => debug!("Weather overlay {:?} ({})", view.state, view.layer),
    }
}

fn print_detail(state: &DetailState, units: UnitSystem) {
    match state {
        DetailState::Empty => println!("-- selection cleared"),
        DetailState::Loading { icao24 } => println!("-- loading {icao24}..."),
        DetailState::Failed { icao24, .. } => println!("-- no details for {icao24}"),
        DetailState::Ready(view) => {
            let telemetry = Telemetry::new(&view.detail.state, units);
            println!(
                "-- {} alt {} spd {} {} vs {} hdg {} sqk {}",
                telemetry.callsign,
                telemetry.altitude,
                telemetry.speed,
                telemetry.trend.map_or("", VerticalTrend::symbol),
                telemetry.vertical_rate,
                telemetry.heading,
                telemetry.squawk,
            );
            if let Some(schedule) = &view.detail.schedule {
                println!(
                    "   {} ({}) -> {} ({})  {}  {}%",
                    schedule.origin.code,
                    schedule.origin.city,
                    schedule.destination.code,
                    schedule.destination.city,
                    schedule.status_badge(),
                    schedule.progress(),
                );
            }
            let weather: Vec<String> = [&view.origin_weather, &view.destination_weather]
                .into_iter()
                .flatten()
                .map(|w| format!("{} {}", w.label(), w.description()))
                .collect();
            if !weather.is_empty() {
                println!("   {}", weather.join(" | "));
            }
            if let Some(url) = view.detail.photo_url() {
                println!("   photo {url}");
            }
        }
    }
}
