//! CLI command definitions, routing, and tracing setup.

use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use annotator_core::{
    Auditor, RubricSet, Session, SystemStatus, TopicSelection, explain, extract_keywords,
    generate_hypothesis, load_document, sandbox_context, section_hypothesis, topic_context,
};
use annotator_genai::GeminiClient;
use annotator_markup::{TopicKind, explainable_topics, parse_document, render_markdown};
use annotator_shared::{
    AnnotatorError, AppConfig, AuditorConfig, DocumentConfig, GenerationRequest, SafetyReport,
    Section, SubsectionMode, TextGenerator, init_config, load_config, resolve_api_key,
    validate_api_key,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Blueprint annotator: read, explain and audit the blueprint document.
#[derive(Parser)]
#[command(
    name = "annotator",
    version,
    about = "Read a technical blueprint section by section, with AI explanations and a safety audit.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Document to read instead of the configured or bundled one.
    #[arg(long, global = true)]
    pub document: Option<PathBuf>,

    /// Keep subsections inside their parent section.
    #[arg(long, global = true)]
    pub folded: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// List the document's sections.
    Sections {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print one section as Markdown.
    Show {
        /// Section id (see `sections`).
        id: String,
    },

    /// List the explainable terms and formulas of a section.
    Topics {
        /// Section id.
        id: String,
    },

    /// Explain a term or formula.
    Explain {
        /// Term or formula text.
        topic: String,

        /// Section to take the context from (defaults to the first one
        /// mentioning the topic).
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Extract key concepts from a section or a file.
    Keywords {
        /// Section id (defaults to the first section).
        #[arg(short, long, conflicts_with = "file")]
        section: Option<String>,

        /// Text file to read instead of a section.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Generate a research hypothesis connecting the given topics.
    Hypothesize {
        /// Topic to connect (repeatable).
        #[arg(short, long = "topic", required = true)]
        topics: Vec<String>,

        /// Section to anchor on (defaults to the first section).
        #[arg(short, long, conflicts_with = "file")]
        section: Option<String>,

        /// Use your own text as background instead of a section.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Append the full document to the text from --file.
        #[arg(long, requires = "file")]
        link_document: bool,

        /// Skip the safety audit of the generated hypothesis.
        #[arg(long)]
        no_audit: bool,
    },

    /// Run the safety audit on a text (stdin when neither --file nor --text).
    Audit {
        /// File holding the text to audit.
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Text to audit.
        #[arg(short, long)]
        text: Option<String>,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "annotator=info",
        1 => "annotator=debug",
        _ => "annotator=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        };
    }

    let config = load_config()?;
    let doc_config = document_config(&config, cli.document.as_deref(), cli.folded);
    let raw = load_document(doc_config.path.as_deref().map(Path::new))?;
    let mut session = Session::new(parse_document(&raw, doc_config.subsections));
    debug!(sections = session.sections().len(), "session ready");

    match cli.command {
        Command::Sections { json } => cmd_sections(&session, json),
        Command::Show { id } => cmd_show(&mut session, &id),
        Command::Topics { id } => cmd_topics(&mut session, &id),
        Command::Explain { topic, section } => {
            cmd_explain(&config, &mut session, &topic, section.as_deref()).await
        }
        Command::Keywords { section, file } => {
            cmd_keywords(&config, &mut session, section.as_deref(), file.as_deref()).await
        }
        Command::Hypothesize {
            topics,
            section,
            file,
            link_document,
            no_audit,
        } => {
            let selection: TopicSelection = topics.into_iter().collect();
            let source = match file {
                Some(path) => HypothesisSource::File {
                    path,
                    link_document,
                },
                None => HypothesisSource::Section(section),
            };
            cmd_hypothesize(&config, &mut session, &raw, &selection, source, !no_audit).await
        }
        Command::Audit { file, text, json } => {
            cmd_audit(&config, file.as_deref(), text, json).await
        }
        Command::Config { .. } => Ok(()),
    }
}

/// `[document]` config with the global flags applied on top.
fn document_config(config: &AppConfig, document: Option<&Path>, folded: bool) -> DocumentConfig {
    let mut doc = config.document.clone();
    if let Some(path) = document {
        doc.path = Some(path.display().to_string());
    }
    if folded {
        doc.subsections = SubsectionMode::Folded;
    }
    doc
}

fn gemini_client(config: &AppConfig) -> Result<GeminiClient> {
    let api_key = resolve_api_key(config)?;
    Ok(GeminiClient::from_config(&config.gemini, api_key)?)
}

/// Generator behind the `audit` command.
///
/// Without an API key every rubric call fails, so the report carries the
/// local metrics and neutral fallback rubric entries.
enum AuditClient {
    Gemini(GeminiClient),
    Offline(String),
}

impl TextGenerator for AuditClient {
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> impl Future<Output = annotator_shared::Result<String>> + Send {
        async move {
            match self {
                Self::Gemini(client) => client.generate(request).await,
                Self::Offline(reason) => Err(AnnotatorError::config(reason.clone())),
            }
        }
    }
}

fn audit_client(config: &AppConfig) -> Result<AuditClient> {
    match resolve_api_key(config) {
        Ok(api_key) => Ok(AuditClient::Gemini(GeminiClient::from_config(
            &config.gemini,
            api_key,
        )?)),
        Err(e) => {
            warn!(error = %e, "no API key, rubric audit will use neutral scores");
            let reason = match e {
                AnnotatorError::Config { message } => message,
                other => other.to_string(),
            };
            Ok(AuditClient::Offline(reason))
        }
    }
}

/// Select `id`, or stay on the active section when `None`.
fn pick_section(session: &mut Session, id: Option<&str>) -> Result<Section> {
    match id {
        Some(id) => Ok(session.select(id)?.clone()),
        None => session
            .active()
            .cloned()
            .ok_or_else(|| eyre!("the document has no sections")),
    }
}

/// First section listing `topic` as explainable, else the first mentioning it.
fn section_for_topic<'a>(sections: &'a [Section], topic: &str) -> Option<&'a Section> {
    let needle = topic.to_lowercase();
    sections
        .iter()
        .find(|s| {
            explainable_topics(&s.content)
                .iter()
                .any(|t| t.text.to_lowercase() == needle)
        })
        .or_else(|| {
            sections
                .iter()
                .find(|s| s.content.to_lowercase().contains(&needle))
        })
}

fn read_text_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| eyre!("cannot read '{}': {e}", path.display()))
}

// ---------------------------------------------------------------------------
// Progress spinner
// ---------------------------------------------------------------------------

/// Spinner shown on stderr while a remote call is in flight.
struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    fn start(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    fn finish(self) {
        self.bar.finish_and_clear();
    }
}

async fn with_spinner<T>(message: &str, call: impl Future<Output = T>) -> T {
    let spinner = Spinner::start(message);
    let out = call.await;
    spinner.finish();
    out
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_sections(session: &Session, json: bool) -> Result<()> {
    if json {
        let rows: Vec<serde_json::Value> = session
            .sections()
            .iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.id,
                    "title": s.title,
                    "level": s.level,
                    "status": SystemStatus::for_section(&s.id),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for section in session.sections() {
        let indent = if section.is_subsection() { "    " } else { "" };
        println!("{indent}{:<60} {}", section.id, section.title);
    }
    Ok(())
}

fn cmd_show(session: &mut Session, id: &str) -> Result<()> {
    let section = pick_section(session, Some(id))?;
    let status = SystemStatus::for_section(&section.id);
    let heading = if section.is_subsection() { "###" } else { "##" };

    println!("{heading} {}\n", section.title);
    print!("{}", render_markdown(&section.content));
    println!();
    println!(
        "  integrity {:.2} ({})  friction {:.2} ({})  asymmetry {:.2}",
        status.integrity,
        status.integrity_level(),
        status.friction,
        status.friction_level(),
        status.asymmetry
    );
    Ok(())
}

fn cmd_topics(session: &mut Session, id: &str) -> Result<()> {
    let section = pick_section(session, Some(id))?;
    let topics = explainable_topics(&section.content);
    if topics.is_empty() {
        println!("No explainable topics in '{}'.", section.title);
        return Ok(());
    }

    for topic in topics {
        let kind = match topic.kind {
            TopicKind::Term => "term",
            TopicKind::Formula => "formula",
        };
        println!("{kind:<8} {}", topic.text);
    }
    Ok(())
}

async fn cmd_explain(
    config: &AppConfig,
    session: &mut Session,
    topic: &str,
    section: Option<&str>,
) -> Result<()> {
    let section = match section {
        Some(id) => pick_section(session, Some(id))?,
        None => match section_for_topic(session.sections(), topic).map(|s| s.id.clone()) {
            Some(id) => pick_section(session, Some(&id))?,
            None => pick_section(session, None)?,
        },
    };
    info!(topic, section = %section.id, "explaining topic");

    let client = gemini_client(config)?;
    let ticket = session.begin_request();
    let context = topic_context(&section, topic);
    let explanation = with_spinner(
        &format!("Explaining {topic}..."),
        explain(&client, topic, context),
    )
    .await?;

    if let Some(text) = session.accept(ticket, explanation) {
        println!("{text}");
    }
    Ok(())
}

async fn cmd_keywords(
    config: &AppConfig,
    session: &mut Session,
    section: Option<&str>,
    file: Option<&Path>,
) -> Result<()> {
    let text = match file {
        Some(path) => read_text_file(path)?,
        None => pick_section(session, section)?.content,
    };

    let client = gemini_client(config)?;
    let ticket = session.begin_request();
    let keywords = with_spinner("Extracting keywords...", extract_keywords(&client, &text)).await?;

    if let Some(keywords) = session.accept(ticket, keywords) {
        for keyword in keywords {
            println!("{keyword}");
        }
    }
    Ok(())
}

enum HypothesisSource {
    Section(Option<String>),
    File { path: PathBuf, link_document: bool },
}

async fn cmd_hypothesize(
    config: &AppConfig,
    session: &mut Session,
    document: &str,
    selection: &TopicSelection,
    source: HypothesisSource,
    audit: bool,
) -> Result<()> {
    let client = gemini_client(config)?;
    let message = "Generating hypothesis...";

    let (ticket, hypothesis) = match source {
        HypothesisSource::Section(id) => {
            let section = pick_section(session, id.as_deref())?;
            let ticket = session.begin_request();
            let call = section_hypothesis(&client, &section, selection.as_slice());
            (ticket, with_spinner(message, call).await?)
        }
        HypothesisSource::File {
            path,
            link_document,
        } => {
            let input = read_text_file(&path)?;
            let context = sandbox_context(&input, link_document, document);
            let ticket = session.begin_request();
            let call = generate_hypothesis(&client, &context, selection.as_slice());
            (ticket, with_spinner(message, call).await?)
        }
    };

    let Some(text) = session.accept(ticket, hypothesis) else {
        return Ok(());
    };
    println!("{text}");

    if audit {
        match audit_generated(&client, &config.auditor, &text).await {
            Ok(report) => print_report(&report),
            Err(e) => warn!(error = %e, "hypothesis audit skipped"),
        }
    }
    Ok(())
}

/// Run the safety audit over freshly generated text.
async fn audit_generated<G: TextGenerator>(
    client: G,
    config: &AuditorConfig,
    text: &str,
) -> annotator_shared::Result<SafetyReport> {
    let rubrics = RubricSet::from_config(config)?;
    let auditor = Auditor::new(client, rubrics, config);
    Ok(with_spinner("Auditing hypothesis...", auditor.audit(text)).await)
}

/// Audit input from `--file`, `--text`, or stdin.
fn audit_input(file: Option<&Path>, text: Option<String>) -> Result<String> {
    match (file, text) {
        (Some(path), _) => read_text_file(path),
        (None, Some(text)) => Ok(text),
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| eyre!("cannot read stdin: {e}"))?;
            Ok(buf)
        }
    }
}

async fn cmd_audit(
    config: &AppConfig,
    file: Option<&Path>,
    text: Option<String>,
    json: bool,
) -> Result<()> {
    let text = audit_input(file, text)?;
    if text.trim().is_empty() {
        return Err(eyre!("nothing to audit: the input text is empty"));
    }

    let rubrics = RubricSet::from_config(&config.auditor)?;
    let auditor = Auditor::new(audit_client(config)?, rubrics, &config.auditor);
    let report = with_spinner("Auditing...", auditor.audit(&text)).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SafetyReport) {
    println!();
    if report.circuit_breaker_triggered() {
        println!("  Verdict:  {} (circuit breaker triggered)", report.status());
    } else {
        println!("  Verdict:  {}", report.status());
    }
    println!("  Report:   {}", report.id);
    println!("  Time:     {}", report.timestamp.to_rfc3339());
    println!();
    println!("  Metrics");
    for metric in report.sentience_metrics.iter() {
        println!(
            "    {:<32} {:.2} / {:.2}  {:<8} {}",
            metric.name, metric.score, metric.threshold, metric.status, metric.reasoning
        );
    }
    println!();
    println!("  Rubrics");
    for audit in &report.semantic_audit {
        let mark = if audit.passed { "pass" } else { "FAIL" };
        println!(
            "    [{mark}] {:<28} {:.2}  {}",
            audit.rubric_name, audit.score, audit.notes
        );
    }
    println!();
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");

    let key_state = match validate_api_key(&config) {
        Ok(()) => "set",
        Err(_) => "not set",
    };
    println!("# {} is {key_state}", config.gemini.api_key_env);
    Ok(())
}
