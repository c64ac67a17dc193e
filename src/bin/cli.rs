//! Structural Takeoff - interactive command-line front end
//!
//! Run with: cargo run --bin structural-takeoff -- plan.pdf [page]
//! Pages are numbered from 1.

use std::env;
use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::Context;
use structural_takeoff::calibration::COMMON_SCALES;
use structural_takeoff::{
    AppSettings, Axis, InteractionMode, Notice, PageUnit, Point, Session, TakeoffClient,
};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
Commands:
  calibrate X1 Y1 X2 Y2 DIST   two-point calibration (image pixels, real distance)
  manual VALUE [x|y]           one page unit equals VALUE real units
  preset N                     apply a common scale (see `presets`)
  presets                      list common scales
  unit LABEL                   set the real-world unit label
  pageunit in|mm               set the page unit for manual entry
  separate on|off              separate X/Y factors
  precision N                  display digits (0-4)
  select X1 Y1 X2 Y2           drag a rectangle (image pixels)
  extract                      extract the pending rectangle
  measure X1 Y1 X2 Y2          real distance between two points
  results                      aggregated totals
  history                      recorded selections
  delete ID                    delete a selection and retract it
  clear                        delete all selections
  next | prev | page N         change page (numbered from 1)
  zoom in|out|reset            display scale
  scale                        show the current calibration
  help                         this text
  quit                         save settings and exit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("Usage: structural-takeoff <file.pdf> [page]");
        std::process::exit(2);
    };
    let start_page = match args.get(2) {
        Some(page) => page_index_from_number(page)?,
        None => 0,
    };

    // Saved settings, then environment overrides
    let mut settings = AppSettings::load();
    if let Ok(url) = env::var("TAKEOFF_BACKEND_URL") {
        settings.backend_url = url;
    }
    if let Some(zoom) = env::var("TAKEOFF_RENDER_ZOOM")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|z| z.is_finite() && *z > 0.0)
    {
        settings.render_zoom = zoom;
    }
    if let Some(secs) = env::var("TAKEOFF_PAGE_TIMEOUT")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|s| *s > 0)
    {
        settings.page_load_timeout_secs = secs;
    }

    let backend = TakeoffClient::new(settings.backend_config())?;
    let mut session =
        Session::new(settings.session_config()).with_calibration(settings.calibration_engine());

    let document = std::fs::read(path).with_context(|| format!("Failed to read {}", path))?;

    println!("Structural Takeoff");
    println!("================================================");
    println!("Document: {} ({} bytes)", path, document.len());
    println!("Backend: {}", settings.backend_url);
    println!("Render zoom: {}", settings.render_zoom);
    println!(
        "Page timeout: {:?}",
        Duration::from_secs(settings.page_load_timeout_secs)
    );
    println!("Scale: {}", session.calibration().describe());
    println!("================================================\n");

    session.open_document(document)?;
    match session.load_page(&backend, start_page).await {
        Ok(()) => print_page(&session),
        Err(e) => println!("{}", Notice::from_page_error(&e)),
    }

    println!("Type 'help' for commands, 'quit' to exit.\n");

    let stdin = io::stdin();
    loop {
        print!("takeoff> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, rest)) = words.split_first() else {
            continue;
        };

        if command == "quit" || command == "exit" {
            break;
        }
        if let Err(e) = run_command(&mut session, &backend, command, rest).await {
            println!("{}", e);
        }
    }

    settings.remember_calibration(session.calibration());
    if let Err(e) = settings.save() {
        tracing::warn!("Failed to save settings: {}", e);
    }
    println!("Goodbye!");
    Ok(())
}

async fn run_command(
    session: &mut Session,
    backend: &TakeoffClient,
    command: &str,
    args: &[&str],
) -> anyhow::Result<()> {
    match command {
        "help" => println!("{}", HELP),
        "calibrate" => {
            let [x1, y1, x2, y2] = coords(args)?;
            let distance = args.get(4).context("Missing real distance")?;
            session.set_mode(InteractionMode::Calibrate);
            session.pointer_down(Point::new(x1, y1));
            session.pointer_down(Point::new(x2, y2));
            match session.submit_calibration_distance(distance) {
                Ok(_) => println!("{}", Notice::scale_set(&session.calibration().describe())),
                Err(e) => {
                    session.reset_calibration_points();
                    session.set_mode(InteractionMode::Select);
                    println!("{}", Notice::from_error(&e));
                }
            }
        }
        "manual" => {
            let value = args.first().context("Missing value")?;
            let axis = match args.get(1).copied() {
                Some("y") | Some("Y") => Axis::Y,
                _ => Axis::X,
            };
            match session.apply_manual_scale(value, axis) {
                Ok(_) => println!("{}", Notice::scale_set(&session.calibration().describe())),
                Err(e) => println!("{}", Notice::from_error(&e)),
            }
        }
        "preset" => {
            let index: usize = args
                .first()
                .context("Missing preset number")?
                .parse()
                .context("Preset must be a number")?;
            match session.apply_preset(index) {
                Ok(preset) => println!("{}", Notice::scale_set(preset.label)),
                Err(e) => println!("{}", Notice::from_error(&e)),
            }
        }
        "presets" => {
            for (i, preset) in COMMON_SCALES.iter().enumerate() {
                println!("  {:>2}. {}", i, preset.label);
            }
        }
        "unit" => {
            let label = args.first().context("Missing unit label")?;
            let suggested = session.set_unit_label(label);
            println!("Unit: {} (page unit {})", label, suggested);
        }
        "pageunit" => {
            let unit: PageUnit = args
                .first()
                .context("Missing page unit")?
                .parse()
                .map_err(anyhow::Error::msg)?;
            session.set_page_unit(unit);
            println!("Page unit: {}", unit);
        }
        "separate" => {
            let on = matches!(args.first().copied(), Some("on") | Some("true") | Some("1"));
            session.set_separate_axes(on);
            println!("Separate axes: {}", if on { "on" } else { "off" });
        }
        "precision" => {
            let digits: u8 = args
                .first()
                .context("Missing digits")?
                .parse()
                .context("Digits must be a number")?;
            if let Err(e) = session.set_precision_digits(digits) {
                println!("{}", Notice::from_error(&e));
            }
        }
        "scale" => println!("Scale: {}", session.calibration().describe()),
        "select" => {
            let [x1, y1, x2, y2] = coords(args)?;
            session.set_mode(InteractionMode::Select);
            session.pointer_down(Point::new(x1, y1));
            session.pointer_move(Point::new(x2, y2));
            session.pointer_up();
            println!("Selection pending. Type 'extract' to read it.");
        }
        "extract" => match session.extract_pending(backend).await {
            Ok(id) => {
                println!("{}", Notice::extraction_complete(id));
                print_results(session);
            }
            Err(e) => println!("{}", Notice::from_extraction_error(&e)),
        },
        "measure" => {
            let [x1, y1, x2, y2] = coords(args)?;
            match session.measure(Point::new(x1, y1), Point::new(x2, y2)) {
                Some(real) => {
                    let state = session.calibration();
                    println!("{} {}", state.format(real), state.unit_label);
                }
                None => println!("Not calibrated"),
            }
        }
        "results" => print_results(session),
        "history" => {
            if session.history().is_empty() {
                println!("No selections yet");
            }
            for selection in session.history().iter() {
                println!(
                    "  {} page {} {} at {} - studs {}",
                    selection.id(),
                    selection.page_index() + 1,
                    selection.bounds_document(),
                    selection.captured_at().format("%H:%M:%S"),
                    selection.result().studs_total
                );
            }
        }
        "delete" => {
            let id: u64 = args
                .first()
                .map(|s| s.trim_start_matches('#'))
                .context("Missing selection id")?
                .parse()
                .context("Id must be a number")?;
            match session.delete_selection(id.into()) {
                Ok(removed) => println!("{}", Notice::selection_deleted(removed.id())),
                Err(e) => println!("{}", Notice::from_error(&e)),
            }
        }
        "clear" => {
            session.clear_all();
            println!("{}", Notice::history_cleared());
        }
        "next" | "prev" | "page" => {
            let outcome = match command {
                "next" => session.next_page(backend).await,
                "prev" => session.previous_page(backend).await,
                _ => {
                    let number = args.first().context("Missing page number")?;
                    let page = page_index_from_number(number)?;
                    session.load_page(backend, page).await
                }
            };
            match outcome {
                Ok(()) => print_page(session),
                Err(e) => println!("{}", Notice::from_page_error(&e)),
            }
        }
        "zoom" => {
            let scale = match args.first().copied() {
                Some("in") => session.zoom_in(),
                Some("out") => session.zoom_out(),
                _ => session.reset_zoom(),
            };
            println!("Display scale: {:.0}%", scale * 100.0);
        }
        other => println!("Unknown command '{}'. Type 'help' for commands.", other),
    }
    Ok(())
}

/// Pages are numbered from 1 on the command line.
fn page_index_from_number(text: &str) -> anyhow::Result<usize> {
    let number: usize = text.trim().parse().context("Page must be a number")?;
    number.checked_sub(1).context("Pages are numbered from 1")
}

fn coords(args: &[&str]) -> anyhow::Result<[f64; 4]> {
    let mut values = [0.0; 4];
    for (i, value) in values.iter_mut().enumerate() {
        *value = args
            .get(i)
            .context("Expected four coordinates")?
            .parse()
            .context("Coordinates must be numbers")?;
    }
    Ok(values)
}

fn print_page(session: &Session) {
    if let Some(page) = session.page() {
        println!(
            "Page {} rendered at {}x ({}x{} px)",
            page.page_index + 1,
            page.zoom,
            page.width(),
            page.height()
        );
    }
}

fn print_results(session: &Session) {
    let results = session.results();
    if results.is_empty() {
        println!("No results yet");
        return;
    }
    let elevations: Vec<&str> = results.elevations.iter().map(String::as_str).collect();
    println!("Elevations: {}", elevations.join(", "));
    println!(
        "Studs: {} labels, {} total",
        results.studs_label_count, results.studs_total
    );
    for (designation, values) in &results.profiles {
        println!(
            "  {}: {} values, sum {}",
            designation,
            values.len(),
            session.calibration().format(results.profile_sum(designation))
        );
    }
}
