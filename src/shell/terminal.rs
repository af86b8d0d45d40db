use std::fmt::Write as _;
use std::time::Duration;

use anyhow::Result;
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};

use super::{Rendered, Session};
use crate::indexer::IndexingStats;

/// Run the interactive loop until the user leaves.
///
/// `initial_repository` is indexed first when given; afterwards the user is asked
/// for a path until one indexes successfully. An empty line, `exit` or `quit`
/// ends the session.
#[inline]
pub async fn run_terminal(mut session: Session, initial_repository: Option<String>) -> Result<()> {
    eprintln!("{}", style("Repository Chat").bold().cyan());
    eprintln!("Ask questions about a local code repository, or ask it to generate a component.");
    eprintln!();

    let mut pending = initial_repository;

    while !session.is_ready() {
        let input = match pending.take() {
            Some(input) => input,
            None => Input::<String>::new()
                .with_prompt("Path to your repository")
                .allow_empty(true)
                .interact_text()?,
        };

        if is_exit(&input) {
            return Ok(());
        }

        let bar = spinner("Indexing repository...");
        let result = session.open_repository(&input).await;
        bar.finish_and_clear();

        match result {
            Ok(stats) => eprintln!("{}", style(summarize(&stats)).green()),
            Err(e) => eprintln!("{}", style(e).red()),
        }
    }

    eprintln!(
        "{}",
        style("Type a question, or an empty line to quit.").dim()
    );

    loop {
        let query = Input::<String>::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;

        if is_exit(&query) {
            break;
        }

        let bar = spinner("Thinking...");
        let rendered = session.submit_query(&query).await;
        bar.finish_and_clear();

        println!("{}", render(&rendered));
    }

    eprintln!("{}", style("Goodbye!").cyan());
    Ok(())
}

pub(crate) fn is_exit(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit")
}

fn spinner(message: &'static str) -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// One line describing an indexing run
pub(crate) fn summarize(stats: &IndexingStats) -> String {
    let mut summary = format!(
        "✓ Indexed {} files into {} chunks in {:.1}s",
        stats.documents_loaded,
        stats.chunks_created,
        stats.elapsed.as_secs_f64()
    );
    if stats.load_failures > 0 {
        let _ = write!(summary, " ({} files could not be read)", stats.load_failures);
    }
    summary
}

/// Format a query result for the terminal
pub(crate) fn render(rendered: &Rendered) -> String {
    match rendered {
        Rendered::Code(code) => format!(
            "{}\n{}\n",
            style("Generated component:").bold().green(),
            code.trim_end()
        ),
        Rendered::Prose { answer, sources } => {
            let mut out = format!("{}\n{}\n", style("Assistant:").bold().cyan(), answer.trim_end());
            if !sources.is_empty() {
                let _ = writeln!(out, "{}", style("Sources:").dim());
                for source in sources {
                    let _ = writeln!(out, "  {}", style(source).dim());
                }
            }
            out
        }
        Rendered::Error(message) => format!("{} {}\n", style("Error:").bold().red(), message),
    }
}
