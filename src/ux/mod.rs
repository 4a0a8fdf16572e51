use colored::{ColoredString, Colorize};
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

use crate::apply::{ApplyKind, ApplySummary};
use crate::cli::Theme;
use crate::project::Project;
use crate::wire::{ChatMessage, Role};

/// Lines of diff shown per file after an edit turn.
const MAX_DIFF_LINES: usize = 80;

pub fn accent(theme: Theme, s: &str) -> ColoredString {
    match theme {
        Theme::Dark => s.cyan().bold(),
        Theme::Light => s.blue().bold(),
    }
}

pub fn heading(theme: Theme, title: &str) {
    println!("\n{}", accent(theme, &format!("=== {title} ===")));
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

pub fn notice(msg: &str) {
    println!("{} {}", "·".dimmed(), msg);
}

pub fn show_files(theme: Theme, project: &Project, active: Option<&str>) {
    heading(theme, &format!("FILES ({}, {})", project.len(), format_size(project.total_bytes(), DECIMAL)));
    for (path, content) in project.iter() {
        let marker = if Some(path) == active { "▸".green().bold() } else { " ".normal() };
        println!("{marker} {path}  {}", format_size(content.len(), DECIMAL).dimmed());
    }
}

pub fn show_file(theme: Theme, path: &str, content: &str) {
    heading(theme, path);
    println!("{content}");
}

pub fn show_history(theme: Theme, history: &[ChatMessage]) {
    heading(theme, "CHAT");
    if history.is_empty() {
        println!("(no messages)");
        return;
    }
    for m in history {
        print_message(theme, m);
    }
}

pub fn print_message(theme: Theme, m: &ChatMessage) {
    let who = match m.role {
        Role::User => "you".bold(),
        Role::Model => accent(theme, "assistant"),
    };
    println!("{who}: {}", m.text);
}

/// Created/updated counts, then a unified diff for every file that changed.
pub fn print_apply_dashboard(sum: &ApplySummary, project: &Project) {
    println!(
        "\n  {}: {}   {}: {}   {}: {}   {}: {}",
        "Created".green().bold(), sum.created,
        "Updated".yellow().bold(), sum.updated,
        "Unchanged".bold(), sum.unchanged,
        "Written".bold(), format_size(sum.bytes_written, DECIMAL)
    );

    for d in &sum.details {
        match d.kind {
            ApplyKind::Created => println!(
                "{} {}  {}",
                "[CREATE]".green().bold(),
                d.path,
                format_size(d.bytes_after, DECIMAL).dimmed()
            ),
            ApplyKind::Unchanged => println!("{} {}", "[SAME]".dimmed(), d.path),
            ApplyKind::Updated => {
                println!(
                    "{} {}  {}",
                    "[UPDATE]".yellow().bold(),
                    d.path,
                    format!(
                        "{} → {}",
                        format_size(d.bytes_before.unwrap_or_default(), DECIMAL),
                        format_size(d.bytes_after, DECIMAL)
                    )
                    .dimmed()
                );
                if let (Some(before), Some(after)) = (d.previous.as_deref(), project.get(&d.path)) {
                    print_diff(&d.path, before, after);
                }
            }
        }
    }
}

fn print_diff(path: &str, before: &str, after: &str) {
    let old: Vec<&str> = before.lines().collect();
    let new: Vec<&str> = after.lines().collect();
    let lines = difflib::unified_diff(&old, &new, &format!("a/{path}"), &format!("b/{path}"), "", "", 2);
    for line in lines.iter().take(MAX_DIFF_LINES) {
        let line = line.trim_end();
        if line.starts_with("+++") || line.starts_with("---") {
            println!("{}", line.bold());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else {
            println!("{line}");
        }
    }
    if lines.len() > MAX_DIFF_LINES {
        println!("{}", format!("… {} more diff lines", lines.len() - MAX_DIFF_LINES).dimmed());
    }
}

/// Spinner for a blocking model or network call.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Byte counter for a streaming generation; update it with the partial document.
pub fn stream_counter() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} generating… {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn update_stream_counter(pb: &ProgressBar, partial: &str, fragments: usize) {
    pb.set_message(format!("{} in {fragments} chunks", format_size(partial.len(), DECIMAL)));
}

pub fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    let _ = io::stdout().flush();
    let mut s = String::new();
    if io::stdin().read_line(&mut s).is_ok() {
        let ans = s.trim().to_lowercase();
        ans == "y" || ans == "yes"
    } else {
        false
    }
}

/// Read one line after printing `prompt`. `None` at end of input.
pub fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut s = String::new();
    match io::stdin().read_line(&mut s) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(s.trim_end_matches(['\r', '\n']).to_string()),
    }
}

pub fn print_help(theme: Theme) {
    heading(theme, "COMMANDS");
    for (cmd, what) in [
        (":help", "show this list"),
        (":files", "list project files"),
        (":open <path>", "make a file active and show it"),
        (":show", "show the active file"),
        (":preview", "write the site to the preview folder, or show the README"),
        (":history", "show the conversation"),
        (":replace <path> <local-file>", "overwrite a project file with a local file"),
        (":save <dir>", "write the project to a directory"),
        (":export [dir]", "write a zip archive"),
        (":publish [token]", "deploy index.html to Vercel"),
        (":new <prompt>", "start over with a new prompt"),
        (":signin <email> <password>", "sign in"),
        (":signup <name> <email> <password>", "create an account"),
        (":signout", "sign out"),
        (":quit", "leave"),
    ] {
        println!("  {:<36} {}", cmd.bold(), what);
    }
    println!("  anything else is sent to the assistant as a change request");
}
