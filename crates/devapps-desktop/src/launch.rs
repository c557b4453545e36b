//! Exec line handling: quoting, field codes and process spawning.

use crate::desktop_entry::DesktopApp;
use log::{debug, info};
use std::path::Path;
use std::process::{Command, Stdio};

/// Split an `Exec` value into argv, expanding field codes.
///
/// No files or URLs are passed, so `%f %F %u %U` disappear.
pub fn exec_argv(exec: &str, app: &DesktopApp) -> Vec<String> {
    tokenize(exec)
        .into_iter()
        .flat_map(|token| expand(&token, app))
        .collect()
}

fn tokenize(exec: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    let mut chars = exec.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            '\\' if in_quotes => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        args.push(current);
    }
    args
}

fn expand(token: &str, app: &DesktopApp) -> Vec<String> {
    match token {
        "%f" | "%F" | "%u" | "%U" => Vec::new(),
        "%i" => match &app.icon_name {
            Some(icon) => vec!["--icon".to_string(), icon.clone()],
            None => Vec::new(),
        },
        _ => {
            let mut out = String::new();
            let mut chars = token.chars();
            while let Some(c) = chars.next() {
                if c != '%' {
                    out.push(c);
                    continue;
                }
                match chars.next() {
                    Some('%') => out.push('%'),
                    Some('c') => out.push_str(&app.name),
                    Some('k') => out.push_str(&app.desktop_file_path.to_string_lossy()),
                    // Deprecated and file codes expand to nothing
                    _ => {}
                }
            }
            // A token made only of removed codes vanishes; a quoted "" stays
            if out.is_empty() && !token.is_empty() {
                Vec::new()
            } else {
                vec![out]
            }
        }
    }
}

/// Whether a `TryExec` value names an executable that exists.
pub fn try_exec_available(try_exec: &str) -> bool {
    let path = Path::new(try_exec);
    if path.is_absolute() {
        return path.is_file();
    }

    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(try_exec).is_file()))
        .unwrap_or(false)
}

/// Spawn `argv` detached from our stdio. A reaper thread waits on the child.
pub fn spawn(argv: &[String], terminal: bool) -> std::io::Result<()> {
    let mut argv: Vec<String> = argv.to_vec();

    if terminal {
        if let Ok(term) = std::env::var("TERMINAL") {
            argv.insert(0, "-e".to_string());
            argv.insert(0, term);
        }
    }

    let Some((program, args)) = argv.split_first() else {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line"));
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    info!("Spawned {} (pid {})", program, child.id());

    std::thread::Builder::new()
        .name("devapps-reaper".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => debug!("Launched process exited with {}", status),
            Err(e) => debug!("Failed to wait on launched process: {}", e),
        })?;

    Ok(())
}
