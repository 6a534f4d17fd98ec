use anyhow::Context;
use pagebot_core::{Config, Paths, Sender, WidgetPosition};
use pagebot_storage::SnapshotStore;
use pagebot_widget::{
    DragSurface, HttpBackend, Point, UiEvent, WidgetController, WidgetUpdate,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn run(page: PathBuf, watch: bool, open: bool) -> anyhow::Result<()> {
    let paths = Paths::new();
    paths.ensure_dirs()?;
    let config = Config::load_or_default(&paths)?;
    let store = SnapshotStore::new(paths);

    let page_html = std::fs::read_to_string(&page)
        .with_context(|| format!("Failed to read host page {}", page.display()))?;

    let backend = Arc::new(HttpBackend::new(&config));
    let (updates_tx, mut updates_rx) = mpsc::channel(64);

    let Some(controller) =
        WidgetController::mount(config, store, backend, updates_tx, &page_html)
    else {
        println!("A widget is already mounted on this page; nothing to do.");
        return Ok(());
    };

    let (events_tx, events_rx) = mpsc::channel(64);

    let watcher = if watch {
        let watch_tx = events_tx.clone();
        Some(super::spawn_page_watcher(page.clone(), move |html| {
            let _ = watch_tx.blocking_send(UiEvent::PageChanged { html });
        })?)
    } else {
        None
    };

    let controller_handle = tokio::spawn(controller.run(events_rx));

    if open {
        let _ = events_tx.send(UiEvent::Open).await;
    }

    let printer = tokio::spawn(async move {
        while let Some(update) = updates_rx.recv().await {
            print_update(&update);
        }
    });

    // Single stdin reader thread drives all interaction.
    let stdin_handle = tokio::task::spawn_blocking(move || stdin_loop(events_tx));
    stdin_handle.await?;

    // All event senders are gone now; the controller drains and exits.
    drop(watcher);
    controller_handle.await??;
    printer.await?;
    Ok(())
}

fn stdin_loop(tx: mpsc::Sender<UiEvent>) {
    use std::io::{BufRead, Write};
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    println!("pagebot interactive mode (/quit to exit)");
    println!("Commands: /toggle open/close | /paste <file> attach image | /drag <dx> <dy> move widget");
    println!("          /logout clear session | /quit exit");
    println!();

    loop {
        print!("> ");
        let _ = stdout.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        let event = if line == "/toggle" {
            UiEvent::Toggle
        } else if line == "/logout" {
            UiEvent::Logout
        } else if let Some(path) = line.strip_prefix("/paste ") {
            match std::fs::read(path.trim()) {
                Ok(bytes) => UiEvent::Paste { bytes },
                Err(e) => {
                    eprintln!("Could not read {}: {}", path.trim(), e);
                    continue;
                }
            }
        } else if let Some(delta) = line.strip_prefix("/drag ") {
            let parts: Vec<f64> = delta
                .split_whitespace()
                .filter_map(|p| p.parse().ok())
                .collect();
            if parts.len() != 2 {
                eprintln!("Usage: /drag <dx> <dy>");
                continue;
            }
            let down = UiEvent::PointerDown {
                surface: DragSurface::Header,
                pointer: Point { x: 0.0, y: 0.0 },
            };
            let motion = UiEvent::PointerMove {
                pointer: Point { x: parts[0], y: parts[1] },
            };
            if tx.blocking_send(down).is_err() || tx.blocking_send(motion).is_err() {
                break;
            }
            UiEvent::PointerUp
        } else {
            UiEvent::Send { text: line.to_string() }
        };

        if tx.blocking_send(event).is_err() {
            break;
        }
    }
}

fn print_update(update: &WidgetUpdate) {
    match update {
        WidgetUpdate::Restored { open, messages } => {
            println!(
                "[widget] restored {} message(s), {}",
                messages,
                if *open { "open" } else { "closed" }
            );
        }
        WidgetUpdate::OpenChanged(open) => {
            println!("[widget] {}", if *open { "opened" } else { "closed" });
        }
        WidgetUpdate::MessageAppended { sender, html } => {
            let who = match sender {
                Sender::User => "you",
                Sender::Bot => "assistant",
            };
            println!("[{}] {}", who, html);
        }
        WidgetUpdate::TypingChanged(true) => println!("[assistant] typing..."),
        WidgetUpdate::TypingChanged(false) => {}
        WidgetUpdate::ErrorShown { html } => println!("[error] {}", html),
        WidgetUpdate::IdentityChanged { name: Some(name) } => {
            println!("[widget] signed-in user: {}", name);
        }
        WidgetUpdate::IdentityChanged { name: None } => {
            println!("[widget] identity cleared");
        }
        WidgetUpdate::PositionChanged(position) => match position {
            WidgetPosition::Absolute { top, left } => {
                println!("[widget] moved to top {:.0}, left {:.0}", top, left);
            }
            WidgetPosition::Anchored { bottom, right } => {
                println!("[widget] anchored {:.0} from bottom, {:.0} from right", bottom, right);
            }
        },
        WidgetUpdate::LogCleared => println!("[widget] conversation cleared"),
    }
}
