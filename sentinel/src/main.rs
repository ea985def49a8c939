//! Entry point for the sentinel TUI. Parses args, resolves the backend profile and runs the App.

use std::env;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::Context;
use sentinel::api::ApiClient;
use sentinel::app::App;
use sentinel::config::Settings;
use sentinel::logging;
use sentinel::profiles::{
    load_profiles, save_profiles, ProfileEntry, ProfileRequest, ResolveProfile,
};
use tracing::{info, warn};

const DEMO_PORT: u16 = 3231;

#[derive(Debug, Default, PartialEq)]
struct ParsedArgs {
    url: Option<String>,
    tls_ca: Option<String>,
    profile: Option<String>,
    save: bool,
    demo: bool,
    dry_run: bool,
}

fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--tls-ca CERT_PEM|-t CERT_PEM] [--profile NAME|-P NAME] [--save] [--demo] [--dry-run] [http://HOST:PORT]"
    )
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "sentinel".into());
    let mut parsed = ParsedArgs::default();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--tls-ca" | "-t" => parsed.tls_ca = it.next(),
            "--profile" | "-P" => parsed.profile = it.next(),
            "--save" => parsed.save = true,
            "--demo" => parsed.demo = true,
            "--dry-run" => parsed.dry_run = true,
            _ if arg.starts_with("--tls-ca=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.tls_ca = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with("--profile=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.profile = Some(v.to_string());
                    }
                }
            }
            _ => {
                if parsed.url.is_none() {
                    parsed.url = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. {}", usage(&prog)));
                }
            }
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    match logging::init() {
        Ok(path) => info!(log = %path.display(), "sentinel starting"),
        Err(e) => eprintln!("warning: file logging disabled: {e}"),
    }

    if parsed.demo || matches!(parsed.profile.as_deref(), Some("demo")) {
        return run_demo_mode(parsed.dry_run).await;
    }

    let profiles_file = load_profiles();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url: parsed.url.clone(),
        tls_ca: parsed.tls_ca.clone(),
    };
    let resolved = req.resolve(&profiles_file);

    let mut profiles_mut = profiles_file.clone();
    let (url, tls_ca): (String, Option<String>) = match resolved {
        ResolveProfile::Direct(u, t) => {
            if let Some(name) = parsed.profile.as_ref() {
                let entry = ProfileEntry {
                    url: u.clone(),
                    tls_ca: t.clone(),
                };
                let write = match profiles_mut.profiles.get(name) {
                    // new profile: saved right away
                    None => true,
                    Some(existing) if *existing == entry => false,
                    Some(_) => {
                        let question = format!("Overwrite existing profile '{name}'? [y/N]: ");
                        parsed.save || prompt_yes_no(&question)
                    }
                };
                if write {
                    profiles_mut.profiles.insert(name.clone(), entry);
                    if let Err(e) = save_profiles(&profiles_mut) {
                        warn!(error = %e, "could not save profiles");
                        eprintln!("warning: could not save profile '{name}': {e}");
                    }
                }
            }
            (u, t)
        }
        ResolveProfile::Loaded(u, t) => (u, t),
        ResolveProfile::PromptSelect(mut names) => {
            if !names.iter().any(|n| n == "demo") {
                names.push("demo".into());
            }
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            let line = prompt_string("Enter number (or blank to abort): ")?;
            let Some(name) = line
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| idx.checked_sub(1))
                .and_then(|idx| names.get(idx))
            else {
                return Ok(());
            };
            if name == "demo" {
                return run_demo_mode(parsed.dry_run).await;
            }
            match profiles_mut.profiles.get(name) {
                Some(entry) => (entry.url.clone(), entry.tls_ca.clone()),
                None => return Ok(()),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter URL (http://HOST:PORT or https://...): ")?;
            if url.trim().is_empty() {
                return Ok(());
            }
            let ca = prompt_string("Enter TLS CA path (or leave blank): ")?;
            let ca_opt = Some(ca.trim().to_string()).filter(|c| !c.is_empty());
            profiles_mut.profiles.insert(
                name.clone(),
                ProfileEntry {
                    url: url.trim().to_string(),
                    tls_ca: ca_opt.clone(),
                },
            );
            if let Err(e) = save_profiles(&profiles_mut) {
                eprintln!("warning: could not save profile '{name}': {e}");
            }
            (url.trim().to_string(), ca_opt)
        }
        ResolveProfile::None => {
            eprintln!("No URL provided and no profiles to select.");
            return Ok(());
        }
    };

    if parsed.dry_run {
        println!("backend: {url}");
        if let Some(ca) = &tls_ca {
            println!("tls-ca: {ca}");
        }
        return Ok(());
    }

    let api = ApiClient::new(&url, tls_ca.as_deref())
        .with_context(|| format!("cannot use backend '{url}'"))?;
    let mut app = App::new(api, Settings::load());
    app.run().await
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

// --- Demo Mode ---

async fn run_demo_mode(dry_run: bool) -> anyhow::Result<()> {
    let url = format!("http://127.0.0.1:{DEMO_PORT}");
    if dry_run {
        println!("backend: {url} (demo agent)");
        return Ok(());
    }
    let guard = spawn_demo_agent(DEMO_PORT)?;
    let api = ApiClient::new(&url, None)?;
    // wait for the agent to answer before drawing
    for _ in 0..20 {
        if api.probe().await.online {
            break;
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
    }
    let mut app = App::new(api, Settings::load());
    tokio::select! {
        res = app.run() => { drop(guard); res }
        _ = tokio::signal::ctrl_c() => {
            drop(guard);
            Ok(())
        }
    }
}

/// Kills the demo agent when dropped.
struct DemoGuard(Option<std::process::Child>);

impl Drop for DemoGuard {
    fn drop(&mut self) {
        if let Some(mut ch) = self.0.take() {
            let _ = ch.kill();
            let _ = ch.wait();
        }
    }
}

fn spawn_demo_agent(port: u16) -> anyhow::Result<DemoGuard> {
    let candidate = find_agent_executable();
    info!(agent = %candidate.display(), port, "spawning demo agent");
    let child = std::process::Command::new(&candidate)
        .arg("--port")
        .arg(port.to_string())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .with_context(|| format!("cannot start demo agent '{}'", candidate.display()))?;
    Ok(DemoGuard(Some(child)))
}

fn find_agent_executable() -> std::path::PathBuf {
    #[cfg(windows)]
    let name = "sentinel_agent.exe";
    #[cfg(not(windows))]
    let name = "sentinel_agent";
    if let Some(candidate) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join(name)))
        .filter(|c| c.exists())
    {
        return candidate;
    }
    // Fallback to relying on PATH
    std::path::PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<ParsedArgs, String> {
        parse_args(std::iter::once("sentinel").chain(list.iter().copied()).map(String::from))
    }

    #[test]
    fn flags_and_positional_url() {
        let p = args(&["-t", "ca.pem", "--profile=prod", "--save", "http://h:8000"]).unwrap();
        assert_eq!(
            p,
            ParsedArgs {
                url: Some("http://h:8000".into()),
                tls_ca: Some("ca.pem".into()),
                profile: Some("prod".into()),
                save: true,
                ..ParsedArgs::default()
            }
        );
    }

    #[test]
    fn second_positional_is_rejected() {
        let err = args(&["http://a", "http://b"]).unwrap_err();
        assert!(err.contains("Unexpected argument"));
        assert!(args(&["--help"]).unwrap_err().starts_with("Usage: sentinel"));
    }
}
