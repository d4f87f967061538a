//! Entry point for the monitorz TUI. Parses args, resolves the agent, runs the App.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use monitorz::app::App;
use monitorz::dashboard::DashboardView;
use monitorz::http::{AgentClient, DEFAULT_AGENT_URL};
use monitorz::logging;
use monitorz::poller::DEFAULT_INTERVAL;
use monitorz::profiles::{
    load_profiles, profiles_path, save_action, save_profiles, ProfileEntry, ProfileRequest,
    ResolveProfile, SaveAction,
};
use monitorz::types::AgentConfigUpdate;
use monitorz::ui::settings::SessionInfo;

#[derive(Parser)]
#[command(name = "monitorz")]
#[command(version)]
#[command(about = "Terminal dashboard for a local machine-metrics agent", long_about = None)]
struct Cli {
    /// Agent base URL [default: http://127.0.0.1:17820]
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Poll interval in milliseconds [default: 3000]
    #[arg(short, long, value_name = "MS", env = "MONITORZ_INTERVAL_MS")]
    interval: Option<u64>,

    /// Connection profile to load, create or update
    #[arg(short = 'P', long, value_name = "NAME")]
    profile: Option<String>,

    /// Overwrite an existing profile without asking
    #[arg(long)]
    save: bool,

    /// Resolve the profile, print the endpoint and exit
    #[arg(long)]
    dry_run: bool,

    /// Fetch one snapshot, print a summary and exit
    #[arg(long)]
    once: bool,

    /// Query the agent's health endpoint and exit
    #[arg(long)]
    health: bool,

    /// Ask the agent to collect every SECS seconds, then exit
    #[arg(long, value_name = "SECS")]
    agent_interval: Option<u64>,

    /// Ask the agent to push its metrics to URL, then exit
    #[arg(long, value_name = "URL")]
    push_url: Option<String>,

    /// Enable verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (_guard, log_dir) = logging::init(cli.verbose)?;

    let Some(entry) = resolve_target(&cli)? else {
        return Ok(());
    };
    let interval_ms = entry
        .interval_ms
        .unwrap_or(DEFAULT_INTERVAL.as_millis() as u64);
    let client = AgentClient::new(&entry.url)
        .with_context(|| format!("cannot use agent address '{}'", entry.url))?;

    if cli.dry_run {
        println!("endpoint: {}", client.base_url());
        println!("interval_ms: {interval_ms}");
        if let Some(name) = &cli.profile {
            println!("profile: {name} ({})", profiles_path().display());
        }
        return Ok(());
    }

    if cli.health {
        let h = client.health().await.context("agent health check failed")?;
        println!("{} {}", h.status, h.ts.unwrap_or_default());
        return Ok(());
    }

    if cli.agent_interval.is_some() || cli.push_url.is_some() {
        let update = AgentConfigUpdate {
            poll_interval: cli.agent_interval,
            push_url: cli.push_url.clone(),
        };
        let cfg = client.configure(&update).await.context("agent config update failed")?;
        if !cfg.ok {
            bail!("agent rejected the config update");
        }
        println!(
            "agent poll_interval: {}",
            cfg.poll_interval.map(|s| format!("{s}s")).unwrap_or_else(|| "-".into())
        );
        println!("agent push_url: {}", cfg.push_url.unwrap_or_else(|| "-".into()));
        return Ok(());
    }

    if cli.once {
        let m = match client.metrics().await {
            Ok(m) => m,
            Err(e) => bail!("Failed to load metrics: {e}"),
        };
        print!("{}", DashboardView::from_snapshot(Some(&m)).render_text());
        return Ok(());
    }

    let client = Arc::new(client);
    let info = SessionInfo {
        endpoint: client.base_url().to_string(),
        interval_ms,
        profile: cli.profile.clone(),
        log_dir: Some(log_dir.display().to_string()),
    };
    let mut app = App::with_agent(info, client.clone());
    let res = app.run(client).await;
    info!("dashboard closed");
    res
}

/// Work out which agent to talk to, persisting the profile when asked.
/// `None` means the user backed out of a prompt.
fn resolve_target(cli: &Cli) -> Result<Option<ProfileEntry>> {
    let mut pf = load_profiles();
    let req = ProfileRequest {
        profile_name: cli.profile.clone(),
        url: cli.url.clone(),
        interval_ms: cli.interval,
    };

    let entry = match req.resolve(&pf) {
        ResolveProfile::Direct(entry) => {
            if let Some(name) = cli.profile.as_deref() {
                let write = match save_action(&pf, name, &entry, cli.save) {
                    SaveAction::Insert | SaveAction::Overwrite => true,
                    SaveAction::AskOverwrite => {
                        prompt_yes_no(&format!("Overwrite existing profile '{name}'? [y/N]: "))
                    }
                    SaveAction::Keep => false,
                };
                if write {
                    pf.profiles.insert(name.to_string(), entry.clone());
                    save_profiles(&pf).context("saving profiles")?;
                    info!(profile = name, url = %entry.url, "profile saved");
                }
            }
            entry
        }
        ResolveProfile::Loaded(entry) => entry,
        ResolveProfile::PromptSelect(names) => {
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            let line = prompt_string("Enter number (or blank to abort): ")?;
            let picked = line
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| idx.checked_sub(1))
                .and_then(|idx| names.get(idx))
                .and_then(|name| pf.profiles.get(name));
            match picked {
                Some(entry) => ProfileEntry {
                    url: entry.url.clone(),
                    interval_ms: cli.interval.or(entry.interval_ms),
                },
                None => return Ok(None),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string(&format!("Enter agent URL [{DEFAULT_AGENT_URL}]: "))?;
            let url = match url.trim() {
                "" => DEFAULT_AGENT_URL.to_string(),
                u => u.to_string(),
            };
            let entry = ProfileEntry {
                url,
                interval_ms: cli.interval,
            };
            pf.profiles.insert(name.clone(), entry.clone());
            save_profiles(&pf).context("saving profiles")?;
            info!(profile = %name, url = %entry.url, "profile created");
            entry
        }
        ResolveProfile::Default => ProfileEntry {
            url: DEFAULT_AGENT_URL.to_string(),
            interval_ms: cli.interval,
        },
    };
    Ok(Some(entry))
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}
