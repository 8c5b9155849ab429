//! services/client/src/bin/phr.rs

use clap::{Args, Parser, Subcommand};
use client_lib::{
    app::{
        AppState, AuthFlow, DashboardView, InsightsView, LogsView, ProfileView, Provenance,
        ReportsView,
    },
    config::Config,
    error::{ClientError, ClientResult},
};
use health_record_core::{
    domain::{Mood, PainLevel, ReportFile, ReportType, SymptomSeverity, UserRole},
    forms::RegistrationForm,
    insight::render_text,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "phr")]
#[command(about = "Personal health record client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        phone: Option<String>,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Update your name or phone number.
    Profile {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    #[command(subcommand)]
    Logs(LogsCommand),
    #[command(subcommand)]
    Reports(ReportsCommand),
    #[command(subcommand)]
    Insights(InsightsCommand),
    /// Ask for advice about a symptom.
    Advice {
        symptom: String,
        #[arg(long, default_value = "mild")]
        severity: SymptomSeverity,
    },
    Chat {
        message: String,
    },
    /// Summarize recent sleep.
    Sleep,
    Dashboard,
}

#[derive(Subcommand)]
enum LogsCommand {
    List,
    Add(LogArgs),
    Show { id: String },
    Delete { id: String },
}

/// Unset fields keep the form defaults.
#[derive(Args)]
struct LogArgs {
    #[arg(long)]
    patient_name: Option<String>,
    #[arg(long)]
    doctor_name: Option<String>,
    #[arg(long)]
    temperature: Option<String>,
    #[arg(long)]
    systolic: Option<String>,
    #[arg(long)]
    diastolic: Option<String>,
    /// Repeatable: fever, cough, headache, fatigue, body-pain, nausea.
    #[arg(long = "symptom")]
    symptoms: Vec<String>,
    #[arg(long)]
    mood: Option<Mood>,
    #[arg(long)]
    pain: Option<PainLevel>,
    #[arg(long)]
    sleep_hours: Option<String>,
    #[arg(long)]
    sleep_quality: Option<i32>,
    #[arg(long)]
    stress: Option<i32>,
    #[arg(long)]
    anxiety: Option<i32>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand)]
enum ReportsCommand {
    List,
    Upload {
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "lab_test")]
        report_type: ReportType,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        doctor_name: Option<String>,
        #[arg(long)]
        hospital_name: Option<String>,
        #[arg(long)]
        diagnosis: Option<String>,
    },
    Delete { id: String },
    /// Download the PDF health summary.
    Export {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum InsightsCommand {
    /// Analyze the selected logs (or all of them) and save the result.
    Generate {
        #[arg(long = "log")]
        logs: Vec<String>,
        #[arg(long, conflicts_with = "logs")]
        all: bool,
    },
    Saved,
    Show { id: String },
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // --- 2. Restore the Session & Build the Shared AppState ---
    let app = AppState::connect(&config).await?;
    info!("Using API at {}", config.api_base_url);

    // --- 3. Dispatch ---
    match cli.command {
        Commands::Register {
            email,
            password,
            full_name,
            phone,
        } => {
            let form = RegistrationForm {
                full_name,
                email,
                password,
                phone: phone.unwrap_or_default(),
                role: UserRole::Patient,
            };
            let user = AuthFlow::new(app).register(&form).await?;
            println!("Registered and signed in as {} <{}>", user.full_name, user.email);
        }
        Commands::Login { email, password } => {
            let user = AuthFlow::new(app).login(&email, &password).await?;
            println!("Welcome back, {}!", user.first_name());
        }
        Commands::Logout => {
            AuthFlow::new(app).logout().await?;
            println!("Signed out");
        }
        command => {
            if let Err(e) = app.require_session().await {
                eprintln!("{}. Run `phr login` first.", e);
                return Err(e);
            }
            run_protected(app, &config, command).await?;
        }
    }
    Ok(())
}

async fn run_protected(app: AppState, config: &Config, command: Commands) -> ClientResult<()> {
    match command {
        Commands::Whoami => {
            let user = app.auth.current_user().await?;
            println!("{} <{}>", user.full_name, user.email);
            println!("Role:  {:?}", user.role);
            if let Some(phone) = user.phone {
                println!("Phone: {}", phone);
            }
        }
        Commands::Profile { full_name, phone } => {
            let view = ProfileView::new(app);
            view.mount().await;
            view.edit_form(|form| {
                if let Some(name) = full_name {
                    form.full_name = name;
                }
                if let Some(phone) = phone {
                    form.phone = phone;
                }
            })
            .await;
            view.submit().await?;
            if let Some(message) = view.snapshot().await.success {
                println!("{}", message);
            }
        }
        Commands::Logs(command) => run_logs(app, command).await?,
        Commands::Reports(command) => run_reports(app, command).await?,
        Commands::Insights(command) => run_insights(app, config, command).await?,
        Commands::Advice { symptom, severity } => {
            let advice = app.ai.symptom_advice(&symptom, severity).await?;
            if let Some(error) = advice.error {
                eprintln!("{}", error);
            }
            println!("{}", advice.advice.unwrap_or_default());
            if let Some(disclaimer) = advice.disclaimer {
                println!("\n{}", disclaimer);
            }
        }
        Commands::Chat { message } => {
            let reply = app.ai.chat(&message, None).await?;
            println!("{}", reply.response);
        }
        Commands::Sleep => {
            let analysis = app.ai.sleep_analysis().await?;
            if let Some(message) = analysis.message {
                println!("{}", message);
            }
            if let Some(hours) = analysis.average_sleep_hours {
                println!("Average sleep:   {:.1} h", hours);
            }
            if let Some(quality) = analysis.average_sleep_quality {
                println!("Average quality: {:.1}/10", quality);
            }
            if let Some(nights) = analysis.total_nights_tracked {
                println!("Nights tracked:  {}", nights);
            }
            if let Some(text) = analysis.insights.or(analysis.recommendation) {
                println!("\n{}", text);
            }
        }
        Commands::Dashboard => {
            let view = DashboardView::new(app);
            view.mount().await;
            let stats = view.stats().await;
            println!("{}", view.greeting().await);
            println!("Health logs: {}", stats.logs);
            println!("Reports:     {}", stats.reports);
        }
        Commands::Register { .. } | Commands::Login { .. } | Commands::Logout => {
            return Err(ClientError::Internal("not a protected command".to_string()));
        }
    }
    Ok(())
}

async fn run_logs(app: AppState, command: LogsCommand) -> ClientResult<()> {
    match command {
        LogsCommand::List => {
            let view = LogsView::new(app);
            view.refresh().await;
            let logs = view.snapshot().await.logs;
            if logs.is_empty() {
                println!("No health logs yet");
            }
            for log in logs {
                let date = log
                    .log_date
                    .or(log.created_at)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string());
                let symptoms = log.entry.active_symptoms();
                println!(
                    "{}  {}  mood={} pain={} symptoms={}",
                    log.id,
                    date,
                    log.entry.mood,
                    log.entry.pain_level,
                    if symptoms.is_empty() { "none".to_string() } else { symptoms.join(",") }
                );
            }
        }
        LogsCommand::Add(args) => {
            let view = LogsView::new(app);
            view.edit_form(|form| {
                set_if_some(&mut form.patient_name, args.patient_name);
                set_if_some(&mut form.doctor_name, args.doctor_name);
                set_if_some(&mut form.temperature, args.temperature);
                set_if_some(&mut form.blood_pressure_systolic, args.systolic);
                set_if_some(&mut form.blood_pressure_diastolic, args.diastolic);
                set_if_some(&mut form.mood, args.mood);
                set_if_some(&mut form.pain_level, args.pain);
                set_if_some(&mut form.sleep_hours, args.sleep_hours);
                set_if_some(&mut form.sleep_quality, args.sleep_quality);
                set_if_some(&mut form.stress_level, args.stress);
                set_if_some(&mut form.anxiety_level, args.anxiety);
                set_if_some(&mut form.notes, args.notes);
                for symptom in &args.symptoms {
                    match symptom.trim().to_lowercase().as_str() {
                        "fever" => form.has_fever = true,
                        "cough" => form.has_cough = true,
                        "headache" => form.has_headache = true,
                        "fatigue" => form.has_fatigue = true,
                        "body-pain" | "body_pain" => form.has_body_pain = true,
                        "nausea" => form.has_nausea = true,
                        other => tracing::warn!("Ignoring unknown symptom '{}'", other),
                    }
                }
            })
            .await;
            let log = view.submit().await?;
            println!("Saved health log {}", log.id);
        }
        LogsCommand::Show { id } => {
            let log = app.logs.get_log(&id).await?;
            println!("{}", serde_json::to_string_pretty(&log)?);
        }
        LogsCommand::Delete { id } => {
            LogsView::new(app).delete(&id).await?;
            println!("Deleted health log {}", id);
        }
    }
    Ok(())
}

async fn run_reports(app: AppState, command: ReportsCommand) -> ClientResult<()> {
    match command {
        ReportsCommand::List => {
            let view = ReportsView::new(app);
            view.refresh().await;
            let reports = view.snapshot().await.reports;
            if reports.is_empty() {
                println!("No reports uploaded yet");
            }
            for report in &reports {
                println!(
                    "{}  [{}] {}\n    {}",
                    report.id,
                    report.report_type,
                    report.title,
                    view.file_url(report)
                );
            }
        }
        ReportsCommand::Upload {
            file,
            title,
            report_type,
            description,
            doctor_name,
            hospital_name,
            diagnosis,
        } => {
            let picked = read_report_file(&file).await?;
            let view = ReportsView::new(app);
            view.edit_form(|form| {
                form.report_type = report_type;
                form.title = title;
                form.description = description.unwrap_or_default();
                form.doctor_name = doctor_name.unwrap_or_default();
                form.hospital_name = hospital_name.unwrap_or_default();
                form.diagnosis = diagnosis.unwrap_or_default();
                form.file = Some(picked);
            })
            .await;
            let report = view.upload().await?;
            println!("Uploaded report {} ({})", report.id, report.title);
        }
        ReportsCommand::Delete { id } => {
            ReportsView::new(app).delete(&id).await?;
            println!("Deleted report {}", id);
        }
        ReportsCommand::Export { dir } => {
            let path = ReportsView::new(app).export_summary(&dir).await?;
            println!("Health summary written to {}", path.display());
        }
    }
    Ok(())
}

async fn run_insights(app: AppState, config: &Config, command: InsightsCommand) -> ClientResult<()> {
    let view = InsightsView::new(app, config.insight_days);
    match command {
        InsightsCommand::Generate { logs, all } => {
            view.mount().await;
            let selection = if all {
                view.snapshot().await.logs.into_iter().map(|l| l.id).collect()
            } else {
                logs
            };
            for id in &selection {
                view.toggle_log(id).await;
            }
            view.generate().await?;
            print_displayed(&view).await;
        }
        InsightsCommand::Saved => {
            view.refresh_saved().await;
            let saved = view.snapshot().await.saved;
            if saved.is_empty() {
                println!("No saved insights");
            }
            for insight in saved {
                let date = insight
                    .analysis_date
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {}  {} logs, {} data points",
                    insight.id, date, insight.logs_analyzed_count, insight.data_points_analyzed
                );
            }
        }
        InsightsCommand::Show { id } => {
            view.refresh_saved().await;
            view.load_saved(&id).await?;
            print_displayed(&view).await;
        }
        InsightsCommand::Delete { id } => {
            view.delete_saved(&id).await?;
            println!("Deleted insight {}", id);
        }
    }
    Ok(())
}

async fn print_displayed(view: &InsightsView) {
    let Some(displayed) = view.snapshot().await.displayed else {
        return;
    };
    let origin = match displayed.provenance {
        Provenance::Fresh => "new analysis",
        Provenance::Saved => "saved analysis",
    };
    println!("Health insights for {} ({})", displayed.patient_name, origin);
    println!(
        "{} logs analyzed, {} data points",
        displayed.logs_analyzed, displayed.data_points_analyzed
    );
    if let Some(id) = &displayed.id {
        println!("Saved as {}", id);
    }
    println!();
    match &displayed.insight {
        Some(insight) => println!("{}", render_text(insight)),
        None => println!("No insights available"),
    }
}

fn set_if_some<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

async fn read_report_file(path: &Path) -> ClientResult<ReportFile> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ClientError::Internal(format!("{:?} is not a file", path)))?;
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let content_type = match extension.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    };
    Ok(ReportFile {
        file_name,
        content_type: content_type.to_string(),
        bytes,
    })
}
