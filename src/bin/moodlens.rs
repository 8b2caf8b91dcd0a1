//! MoodLens CLI - Command-line interface for the interview session core
//!
//! Commands:
//! - simulate: Run a scripted session scenario and print the report
//! - evaluate: Score a single answer against a question
//! - questions: Print the generated question set for a configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use moodlens_interview::guard::{ClipboardAction, IntegritySignal};
use moodlens_interview::questions::build_question_set;
use moodlens_interview::report::SessionReport;
use moodlens_interview::types::{Difficulty, InterviewType, MetricsSample, ResponseMode};
use moodlens_interview::{
    PracticeSession, ResponseEvaluator, SessionConfig, SessionPhase, CORE_VERSION, PRODUCER_NAME,
};

/// MoodLens - interview practice session core
#[derive(Parser)]
#[command(name = "moodlens")]
#[command(version = CORE_VERSION)]
#[command(about = "Run and score interview practice sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted session scenario and print the report
    Simulate {
        /// Scenario file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        output_format: OutputFormat,
    },

    /// Score a single answer against a question
    Evaluate {
        /// Question text
        #[arg(short, long)]
        question: String,

        /// Answer text (use - to read from stdin)
        #[arg(short, long)]
        answer: String,

        /// Interview category
        #[arg(long, default_value = "behavioral")]
        interview_type: CliInterviewType,

        /// Topic key within the category
        #[arg(long, default_value = "general")]
        topic: String,

        /// Question difficulty
        #[arg(long, default_value = "medium")]
        difficulty: CliDifficulty,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the generated question set for a configuration
    Questions {
        /// Interview category
        #[arg(long, default_value = "behavioral")]
        interview_type: CliInterviewType,

        /// Topic key within the category
        #[arg(long, default_value = "general")]
        topic: String,

        /// Free-form focus topic appended to each question
        #[arg(long)]
        custom_topic: Option<String>,

        /// Question difficulty
        #[arg(long, default_value = "medium")]
        difficulty: CliDifficulty,

        /// Number of questions
        #[arg(long, default_value = "4")]
        count: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CliInterviewType {
    /// Behavioral interview
    Behavioral,
    /// Technical interview
    Technical,
    /// HR screening interview
    Hr,
}

impl From<CliInterviewType> for InterviewType {
    fn from(value: CliInterviewType) -> Self {
        match value {
            CliInterviewType::Behavioral => InterviewType::Behavioral,
            CliInterviewType::Technical => InterviewType::Technical,
            CliInterviewType::Hr => InterviewType::Hr,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliDifficulty {
    Easy,
    Medium,
    Hard,
}

impl From<CliDifficulty> for Difficulty {
    fn from(value: CliDifficulty) -> Self {
        match value {
            CliDifficulty::Easy => Difficulty::Easy,
            CliDifficulty::Medium => Difficulty::Medium,
            CliDifficulty::Hard => Difficulty::Hard,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable report sections
    Text,
    /// Single JSON object
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

/// Scripted session scenario consumed by `simulate`
#[derive(serde::Deserialize)]
struct Scenario {
    config: SessionConfig,
    /// One entry per question, in order
    answers: Vec<ScenarioAnswer>,
    /// Metrics samples with strictly increasing timestamps
    #[serde(default)]
    samples: Vec<MetricsSample>,
    /// Integrity signals, interleaved by timestamp
    #[serde(default)]
    integrity_signals: Vec<ScenarioSignal>,
    /// Compute the proctoring risk section
    #[serde(default)]
    proctoring: bool,
    /// Session duration in milliseconds
    #[serde(default = "default_duration_ms")]
    duration_ms: i64,
}

fn default_duration_ms() -> i64 {
    120_000
}

#[derive(serde::Deserialize)]
struct ScenarioAnswer {
    answer: String,
    #[serde(default = "default_mode")]
    mode: ResponseMode,
}

fn default_mode() -> ResponseMode {
    ResponseMode::Text
}

#[derive(serde::Deserialize)]
struct ScenarioSignal {
    signal: ScenarioSignalKind,
    at_ms: i64,
}

#[derive(serde::Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum ScenarioSignalKind {
    TabHidden,
    WindowBlur,
    ClipboardCopy,
    ClipboardPaste,
    ContextMenu,
    BlockedShortcut,
}

impl From<ScenarioSignalKind> for IntegritySignal {
    fn from(kind: ScenarioSignalKind) -> Self {
        match kind {
            ScenarioSignalKind::TabHidden => IntegritySignal::TabHidden,
            ScenarioSignalKind::WindowBlur => IntegritySignal::WindowBlur,
            ScenarioSignalKind::ClipboardCopy => IntegritySignal::Clipboard(ClipboardAction::Copy),
            ScenarioSignalKind::ClipboardPaste => {
                IntegritySignal::Clipboard(ClipboardAction::Paste)
            }
            ScenarioSignalKind::ContextMenu => IntegritySignal::ContextMenu,
            ScenarioSignalKind::BlockedShortcut => IntegritySignal::BlockedShortcut,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), MoodlensCliError> {
    match cli.command {
        Commands::Simulate {
            input,
            output_format,
        } => cmd_simulate(&input, output_format),

        Commands::Evaluate {
            question,
            answer,
            interview_type,
            topic,
            difficulty,
            json,
        } => cmd_evaluate(&question, &answer, interview_type, &topic, difficulty, json),

        Commands::Questions {
            interview_type,
            topic,
            custom_topic,
            difficulty,
            count,
        } => cmd_questions(interview_type, &topic, custom_topic, difficulty, count),
    }
}

fn cmd_simulate(input: &PathBuf, output_format: OutputFormat) -> Result<(), MoodlensCliError> {
    let scenario_data = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(MoodlensCliError::NoScenario);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let scenario: Scenario = serde_json::from_str(&scenario_data)?;
    if scenario.answers.is_empty() {
        return Err(MoodlensCliError::EmptyScenario);
    }

    let mut session = PracticeSession::new(
        scenario.config,
        ResponseEvaluator::heuristic_only(),
        scenario.proctoring,
    );
    session.start(0)?;

    for sample in scenario.samples {
        session.record_sample(sample)?;
    }

    for signal in &scenario.integrity_signals {
        session.observe_integrity(signal.signal.into(), signal.at_ms)?;
        // Scenarios auto-dismiss so queued notifications do not suppress
        // later focus signals.
        while session.dismiss_notification().is_some() {}
    }

    let mut answer_time = 1_000;
    for entry in &scenario.answers {
        // A ceiling breach inside the signal loop already ended the session.
        if session.phase() == SessionPhase::Ended || session.current_question().is_none() {
            break;
        }
        session.submit_answer(&entry.answer, entry.mode, answer_time)?;
        answer_time += 1_000;
    }

    let report = session.end(scenario.duration_ms).clone();
    print_report(&report, session.end_reason(), &output_format)?;
    Ok(())
}

fn print_report(
    report: &SessionReport,
    end_reason: Option<&str>,
    format: &OutputFormat,
) -> Result<(), MoodlensCliError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(report)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            println!("MoodLens Session Report ({PRODUCER_NAME} {CORE_VERSION})");
            println!("=======================");
            if let Some(reason) = end_reason {
                println!("{reason}");
                println!();
            }

            print_section("Summary", &report.summary);
            print_section("Expression trend", &report.expressions);
            print_section("Insights", &report.insights);
            print_section("Response quality", &report.quality);
            print_section("Integrity", &report.integrity);
            if !report.risk_items.is_empty() {
                print_section("Proctoring risk", &report.risk_items);
            }
            println!("Next step:");
            println!("  {}", report.next_step);
        }
    }
    Ok(())
}

fn print_section(title: &str, items: &[String]) {
    println!("{title}:");
    for item in items {
        println!("  - {item}");
    }
    println!();
}

fn cmd_evaluate(
    question: &str,
    answer: &str,
    interview_type: CliInterviewType,
    topic: &str,
    difficulty: CliDifficulty,
    json: bool,
) -> Result<(), MoodlensCliError> {
    let answer_text = if answer == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        answer.to_string()
    };
    if answer_text.trim().is_empty() {
        return Err(MoodlensCliError::EmptyAnswer);
    }

    let config = SessionConfig {
        interview_type: interview_type.into(),
        topic: topic.to_string(),
        custom_topic: None,
        difficulty: difficulty.into(),
        question_count: 1,
    };
    let mut evaluator = ResponseEvaluator::heuristic_only();
    let evaluation = evaluator.evaluate(question, answer_text.trim(), &config);

    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    } else {
        println!("Score: {}/100", evaluation.score);
        for strength in &evaluation.strengths {
            println!("  + {strength}");
        }
        for improvement in &evaluation.improvements {
            println!("  - {improvement}");
        }
        println!("{}", evaluation.summary);
    }
    Ok(())
}

fn cmd_questions(
    interview_type: CliInterviewType,
    topic: &str,
    custom_topic: Option<String>,
    difficulty: CliDifficulty,
    count: u32,
) -> Result<(), MoodlensCliError> {
    if count == 0 {
        return Err(MoodlensCliError::EmptyScenario);
    }
    let config = SessionConfig {
        interview_type: interview_type.into(),
        topic: topic.to_string(),
        custom_topic,
        difficulty: difficulty.into(),
        question_count: count,
    };

    for (i, question) in build_question_set(&config).iter().enumerate() {
        println!("{}. {}", i + 1, question);
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum MoodlensCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Session(moodlens_interview::SessionError),
    NoScenario,
    EmptyScenario,
    EmptyAnswer,
}

impl From<io::Error> for MoodlensCliError {
    fn from(e: io::Error) -> Self {
        MoodlensCliError::Io(e)
    }
}

impl From<serde_json::Error> for MoodlensCliError {
    fn from(e: serde_json::Error) -> Self {
        MoodlensCliError::Json(e)
    }
}

impl From<moodlens_interview::SessionError> for MoodlensCliError {
    fn from(e: moodlens_interview::SessionError) -> Self {
        MoodlensCliError::Session(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MoodlensCliError> for CliError {
    fn from(e: MoodlensCliError) -> Self {
        match e {
            MoodlensCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MoodlensCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check scenario JSON syntax and field names".to_string()),
            },
            MoodlensCliError::Session(e) => CliError {
                code: "SESSION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check scenario ordering: answers and signals after start".to_string()),
            },
            MoodlensCliError::NoScenario => CliError {
                code: "NO_SCENARIO".to_string(),
                message: "stdin is a TTY; pipe a scenario or pass a file path".to_string(),
                hint: Some("Try: moodlens simulate --input scenario.json".to_string()),
            },
            MoodlensCliError::EmptyScenario => CliError {
                code: "EMPTY_SCENARIO".to_string(),
                message: "Scenario has no answers or questions".to_string(),
                hint: Some("Provide at least one answer entry".to_string()),
            },
            MoodlensCliError::EmptyAnswer => CliError {
                code: "EMPTY_ANSWER".to_string(),
                message: "An answer is required".to_string(),
                hint: Some("Pass --answer text or pipe it via --answer -".to_string()),
            },
        }
    }
}
