//! `dermachat chat`: Interactive or single-question terminal chat.

use std::io::Write;

use dermachat_agent::{ChatSession, QueryParamSource, RagPipeline, SubmitOutcome, source_for};
use dermachat_config::AppConfig;
use dermachat_core::context::ContextSource;
use dermachat_core::message::{Role, Turn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

const EXIT_COMMANDS: [&str; 5] = ["exit", "quit", "/exit", "/quit", ":q"];

pub async fn run(
    query: Option<String>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Fail early with setup instructions
    let missing = config.missing_keys();
    if !missing.is_empty() {
        eprintln!();
        eprintln!("  ERROR: Missing service keys: {}", missing.join(", "));
        eprintln!();
        eprintln!("  Set these environment variables:");
        eprintln!("    OPENAI_API_KEY    (embeddings)");
        eprintln!("    PINECONE_API_KEY  (vector index)");
        eprintln!("    GEMINI_API_KEY    (answer generation)");
        eprintln!();
        eprintln!("  Or add them to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("Service keys missing. See above for setup instructions.".into());
    }

    let pipeline = RagPipeline::from_config(&config);
    let source: Box<dyn ContextSource> = match &query {
        Some(raw) => Box::new(QueryParamSource::from_query(raw)),
        None => source_for(
            &config,
            None,
            dermachat_providers::http_client(config.request_timeout_secs),
        ),
    };
    let mut session = ChatSession::start(source.as_ref()).await;
    tracing::debug!(session = %session.id(), source = source.name(), "Terminal chat ready");

    for warning in session.warnings() {
        eprintln!("  ⚠️  {warning}");
    }

    let mut stdout = std::io::stdout();

    if let Some(msg) = message {
        // Single message mode
        session.render();
        session.set_input(msg);

        eprint!("  Su respuesta se está generando...");
        let outcome = session.submit(&pipeline).await;
        eprint!("\r{}\r", " ".repeat(40));
        match outcome? {
            SubmitOutcome::Answered { assistant, .. } => {
                writeln!(stdout, "{}", assistant.content())?;
            }
            SubmitOutcome::Ignored => return Err("Empty question".into()),
        }
    } else {
        // Interactive mode
        println!();
        println!("  ╔══════════════════════════════════════════════╗");
        println!("  ║       DermaChat — Consulta de tratamiento      ║");
        println!("  ╚══════════════════════════════════════════════╝");
        println!();
        println!("  Context:    {}", source.name());
        println!("  Formulario: {}", preview(&session.context().formulario));
        println!("  Tratamiento: {}", preview(&session.context().tratamiento));
        println!();
        println!("  ¿Tiene alguna consulta sobre el tratamiento? ¡Cuéntanos!");
        println!("  Type 'exit' or Ctrl+D to quit.");
        println!();

        let stdin = BufReader::new(tokio::io::stdin());
        converse(&mut session, &pipeline, stdin, &mut stdout).await?;

        println!();
        println!("  ¡Hasta pronto!");
        println!();
    }

    Ok(())
}

/// Read questions line by line, submitting each and redrawing the transcript.
///
/// Returns when the reader hits EOF or an exit command.
pub async fn converse<R, W>(
    session: &mut ChatSession,
    pipeline: &RagPipeline,
    reader: R,
    out: &mut W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = reader.lines();
    redraw(session.render(), out)?;

    while let Some(line) = lines.next_line().await? {
        if EXIT_COMMANDS.contains(&line.trim()) {
            break;
        }

        session.set_input(line);
        match session.submit(pipeline).await {
            Ok(SubmitOutcome::Answered { .. }) => redraw(session.render(), out)?,
            Ok(SubmitOutcome::Ignored) => {}
            Err(e) => {
                writeln!(out, "  [Error] {e}")?;
                writeln!(out)?;
            }
        }
        write!(out, "  Usted > ")?;
        out.flush()?;
    }

    Ok(())
}

/// Print the whole transcript.
fn redraw(turns: &[Turn], out: &mut impl Write) -> std::io::Result<()> {
    for turn in turns {
        let prefix = match turn.role() {
            Role::User => "  Usted     >",
            Role::Assistant => "  Asistente >",
        };
        for line in turn.content().lines() {
            writeln!(out, "{prefix} {line}")?;
        }
        writeln!(out)?;
    }
    if turns.is_empty() {
        write!(out, "  Usted > ")?;
        out.flush()?;
    }
    Ok(())
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(60).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
