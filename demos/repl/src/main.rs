//! Terminal demo for the skill execution controller.
//!
//! Run with: cargo run -p skillstream-repl -- <skill-slug> <prompt...>
//!
//! With no arguments, lists the available skills. Set `SKILLSTREAM_BASE_URL`
//! to execute against a live SSE service; without it, an in-process
//! transport replays a canned stream so the controller can be exercised
//! offline. Ctrl-C cancels the in-flight session.

use std::{io::Write, sync::Arc, time::Duration};

use skillstream_catalog::MemoryCatalog;
use skillstream_core::{SessionStatus, SkillCatalog, SkillTransport};
use skillstream_session::SessionController;
use skillstream_transport::{ChannelTransport, SseTransport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CATALOG_JSON: &str = include_str!("../skills.json");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let catalog = MemoryCatalog::from_json(CATALOG_JSON)?;

    let mut args = std::env::args().skip(1);
    let Some(slug) = args.next() else {
        print_catalog(&catalog).await?;
        return Ok(());
    };
    let prompt = args.collect::<Vec<_>>().join(" ");

    let skill = catalog.get(&slug).await?;
    tracing::debug!(%slug, "Selected skill");

    match std::env::var("SKILLSTREAM_BASE_URL") {
        Ok(base_url) => {
            let transport = Arc::new(SseTransport::new(base_url)?);
            run(transport, &skill, &prompt).await
        }
        Err(_) => {
            eprintln!("SKILLSTREAM_BASE_URL not set; replaying a canned stream\n");
            let transport = ChannelTransport::new();
            spawn_canned_feed(&transport);
            run(Arc::new(transport), &skill, &prompt).await
        }
    }
}

async fn print_catalog(catalog: &MemoryCatalog) -> anyhow::Result<()> {
    for category in catalog.list_categories().await? {
        println!("{} ({})", category.label, category.count);
        for skill in catalog.list_skills(Some(&category.id)).await? {
            println!("  {:<24} {}", skill.slug, skill.description);
        }
    }
    Ok(())
}

async fn run<T>(transport: Arc<T>, skill: &skillstream_core::Skill, prompt: &str) -> anyhow::Result<()>
where
    T: SkillTransport + 'static,
{
    let controller = SessionController::new(transport);
    let mut rx = controller.watch();

    controller.execute(skill, prompt)?;

    let mut printed = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                controller.cancel();
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let Some(session) = rx.borrow_and_update().clone() else {
            continue;
        };

        // Print only what arrived since the last snapshot.
        if session.accumulated_output.len() > printed {
            print!("{}", &session.accumulated_output[printed..]);
            std::io::stdout().flush()?;
            printed = session.accumulated_output.len();
        }

        match session.status {
            SessionStatus::Finished => {
                let secs = session.execution_time_seconds.unwrap_or_default();
                println!("\n\n[finished in {secs:.1}s]");
                break;
            }
            SessionStatus::Errored => {
                let error = session
                    .error
                    .map_or_else(|| "unknown error".to_string(), |e| e.message);
                println!("\n\n[failed: {error}]");
                break;
            }
            SessionStatus::Cancelled => {
                println!("\n\n[cancelled]");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

/// Arm the offline transport with a canned AFL response.
fn spawn_canned_feed(transport: &ChannelTransport) {
    let feed = transport.arm();
    tokio::spawn(async move {
        let fragments = [
            "// Moving average crossover\n",
            "FastMA = MA(Close, 10);\n",
            "SlowMA = MA(Close, 30);\n",
            "Buy = Cross(FastMA, SlowMA);\n",
            "Sell = Cross(SlowMA, FastMA);\n",
        ];
        for fragment in fragments {
            tokio::time::sleep(Duration::from_millis(200)).await;
            feed.fragment(fragment);
        }
        feed.complete(1.8);
    });
}
