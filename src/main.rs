use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use glowguide::acquire::FileCandidate;
use glowguide::config::SessionConfig;
use glowguide::location::Coordinate;
use glowguide::services::{HttpBackend, HttpConfig, NoCamera, StaticPosition};
use glowguide::session::{GlowSession, Services, SessionEvent};
use glowguide::stage::StageStatus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let http_config = HttpConfig::from_env().unwrap_or_else(|| {
        eprintln!("Error: GLOWGUIDE_API_URL not set");
        eprintln!("  export GLOWGUIDE_API_URL=http://localhost:8080");
        std::process::exit(1);
    });

    // Device geolocation has no headless backend; a fixed position can be
    // provided via GLOWGUIDE_LAT / GLOWGUIDE_LNG for local testing.
    let geolocation = match (parse_env_f64("GLOWGUIDE_LAT"), parse_env_f64("GLOWGUIDE_LNG")) {
        (Some(lat), Some(lng)) => StaticPosition::new(Coordinate { lat, lng }),
        _ => StaticPosition::unavailable(),
    };

    eprintln!("✨ GlowGuide v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", http_config.base_url);
    eprintln!("   Type /help for commands. /quit to exit.\n");

    let backend = Arc::new(HttpBackend::new(http_config));
    let session = Arc::new(GlowSession::new(
        Services {
            analysis: backend.clone(),
            geolocation: Arc::new(geolocation),
            directory: backend.clone(),
            conversation: backend,
            camera: Arc::new(NoCamera),
        },
        SessionConfig::default(),
    ));

    // Print stage notifications as they arrive.
    let mut events = session.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            print_event(&event);
        }
    });

    let stdin = tokio::io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    eprint!("> ");
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }
        if matches!(line, "/quit" | "/exit") {
            break;
        }
        handle_command(&session, line).await;
        eprint!("> ");
    }

    Ok(())
}

async fn handle_command(session: &GlowSession, line: &str) {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "/help" => print_help(),
        "/load" => {
            if rest.is_empty() {
                eprintln!("usage: /load <path>");
                return;
            }
            match tokio::fs::read(rest).await {
                Ok(bytes) => {
                    let candidate = FileCandidate {
                        name: rest.to_string(),
                        media_type: guess_media_type(rest).to_string(),
                        bytes,
                    };
                    if let Err(e) = session.acquire.select_file(candidate).await {
                        eprintln!("❌ {e}");
                    }
                }
                Err(e) => eprintln!("❌ Cannot read {rest}: {e}"),
            }
        }
        "/capture" => {
            if let Err(e) = session.acquire.capture().await {
                eprintln!("❌ {e}");
            }
        }
        "/clear" => session.acquire.clear().await,
        "/analyze" => {
            if let Err(e) = session.analyze().await {
                eprintln!("❌ {e}");
            }
        }
        "/report" => match session.report().await {
            Some(report) => {
                println!(
                    "Skin type: {} ({}% confidence)",
                    report.skin_type, report.confidence_percent
                );
                if !report.issues.is_empty() {
                    println!("Concerns: {}", report.issues.join(", "));
                }
                for remedy in &report.home_remedies {
                    println!("  🌿 {remedy}");
                }
                for chemical in &report.chemicals {
                    println!("  🧪 {chemical}");
                }
            }
            None => eprintln!("No analysis yet — /load an image and /analyze"),
        },
        "/locate" => {
            if let Err(e) = session.location.from_device().await {
                eprintln!("❌ {e} — try /city <name> instead");
            }
        }
        "/city" => {
            if rest.is_empty() {
                eprintln!("usage: /city <name> (e.g. delhi, mumbai, chennai)");
                return;
            }
            if let Err(e) = session.location.from_city(rest).await {
                eprintln!("❌ {e}");
            }
        }
        "/doctors" => match session.directory.status().await {
            StageStatus::Succeeded(providers) if providers.is_empty() => {
                println!("No specialists found near you.");
            }
            StageStatus::Succeeded(providers) => {
                for p in &providers {
                    let rating = p
                        .rating
                        .map(|r| format!(" ⭐ {r}"))
                        .unwrap_or_default();
                    println!(
                        "{} — {} ({:.1} km){}\n    {}  {}",
                        p.name, p.clinic_name, p.distance_km, rating, p.address, p.phone
                    );
                }
            }
            StageStatus::Failed(e) => eprintln!("❌ {e}"),
            StageStatus::Pending => eprintln!("⏳ Searching..."),
            StageStatus::Idle => eprintln!("No search yet — /locate or /city <name> first"),
        },
        "/status" => {
            println!("analysis:  {}", session.analysis.status().await);
            println!("directory: {}", session.directory.status().await);
            println!("chat:      {}", session.chat.status().await);
            println!(
                "image:     {}",
                if session.acquire.current().await.is_some() {
                    "acquired"
                } else {
                    "none"
                }
            );
        }
        _ if command.starts_with('/') => {
            eprintln!("Unknown command {command}; /help for a list");
        }
        // Anything else goes to the assistant.
        _ => {
            if let Err(e) = session.chat.send(line).await {
                eprintln!("❌ {e}");
            }
        }
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::AssetReplaced => eprintln!("📷 Image ready for analysis"),
        SessionEvent::AssetCleared => eprintln!("🗑  Image cleared"),
        SessionEvent::AnalysisChanged(status) => match status {
            StageStatus::Pending => eprintln!("⏳ Analyzing..."),
            StageStatus::Succeeded(_) => eprintln!("✅ Analysis complete — /report to view"),
            StageStatus::Failed(e) => eprintln!("❌ Analysis failed: {e}"),
            StageStatus::Idle => {}
        },
        SessionEvent::LocationResolved(c) => {
            eprintln!("📍 Location resolved ({:.4}, {:.4})", c.lat, c.lng);
        }
        SessionEvent::DirectoryChanged(status) => match status {
            StageStatus::Pending => eprintln!("⏳ Finding doctors..."),
            StageStatus::Succeeded(providers) => {
                eprintln!("✅ Found {} specialists — /doctors to view", providers.len());
            }
            StageStatus::Failed(e) => eprintln!("❌ Doctor search failed: {e}"),
            StageStatus::Idle => {}
        },
        SessionEvent::TranscriptAppended(message) => {
            if message.origin == glowguide::chat::Origin::Assistant {
                println!("\n🤖 {}\n", message.text);
            }
        }
        SessionEvent::ChatExchangeFailed(e) => eprintln!("❌ Assistant unavailable: {e}"),
    }
}

fn print_help() {
    eprintln!("Commands:");
    eprintln!("  /load <path>   select an image file");
    eprintln!("  /capture       capture from the camera device");
    eprintln!("  /clear         remove the current image");
    eprintln!("  /analyze       submit the image for analysis");
    eprintln!("  /report        show the latest analysis");
    eprintln!("  /locate        find doctors via device location");
    eprintln!("  /city <name>   find doctors near a city");
    eprintln!("  /doctors       show the latest doctor results");
    eprintln!("  /status        show stage statuses");
    eprintln!("  /quit          exit");
    eprintln!("  anything else is sent to the assistant");
}

fn parse_env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok()?.trim().parse().ok()
}

fn guess_media_type(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}
