//! Terminal chat client.
//!
//! Drives the full client pipeline end-to-end: community login, transcript
//! restore, message submission, SSE consumption, and transcript
//! reconciliation. Tracing goes to stderr so stdout stays a clean chat
//! surface.

use finguru::chat::StreamChunk;
use finguru::client::ChatApi;
use finguru::config::RelayConfig;
use finguru::store::{ChatStore, CommunityStore, KvStore, SubmitBlocked};
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};

fn prompt(label: &str) {
    print!("{label}");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = RelayConfig::load()?;
    let kv = KvStore::open(&config.storage.db_path())?;
    let community = CommunityStore::new(kv.clone());
    let api = ChatApi::new(config.client.backend_url.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let user = match community.restore_session() {
        Some(user) => {
            println!("Welcome back, {}!", user.name);
            user
        }
        None => {
            prompt("Your name: ");
            let name = lines
                .next_line()
                .await?
                .unwrap_or_default()
                .trim()
                .to_owned();
            if name.is_empty() {
                anyhow::bail!("a name is required");
            }
            let user = community.login(&name, "boy1")?;
            community.save_session(&user)?;
            user
        }
    };
    let mut store = ChatStore::open(kv, user);

    if let Some(greeting) = store.messages().first() {
        println!("{}\n", greeting.text);
    }
    println!("Commands: /clear, /export, /unlock <password>, /logout, /quit\n");

    loop {
        let remaining = store.poll_lockdown();
        if remaining > 0 {
            println!("[conversation locked: {remaining}s remaining]");
        }

        prompt("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" => break,
            "/logout" => {
                community.clear_session()?;
                println!("(logged out)");
                break;
            }
            "/clear" => {
                store.clear_chat();
                println!("(chat cleared)");
                continue;
            }
            "/export" => {
                println!("{}", store.export_markdown());
                continue;
            }
            _ => {}
        }
        if let Some(password) = line.strip_prefix("/unlock ") {
            if store.unlock(password.trim()) {
                println!("(lock released)");
            } else {
                println!("(wrong password)");
            }
            continue;
        }

        let request = match store.submit(line, None) {
            Ok(request) => request,
            Err(SubmitBlocked::Locked) => continue,
            Err(SubmitBlocked::Busy) => {
                println!("(still replying, hold on)");
                continue;
            }
        };

        let chunks = api.send_message(request);
        store
            .run_turn_with(chunks, |chunk| match chunk {
                StreamChunk::Lockdown => {
                    println!("\n[conversation locked for 5 minutes]");
                }
                StreamChunk::Chart { text, image_url } => {
                    print!("{text}");
                    if image_url.is_some() {
                        print!("\n[chart image attached]");
                    }
                    let _ = std::io::stdout().flush();
                }
                StreamChunk::Text { text } | StreamChunk::Error { text } => {
                    print!("{text}");
                    let _ = std::io::stdout().flush();
                }
            })
            .await;
        println!("\n");
    }

    Ok(())
}
