//! LeagueDesk CLI - Main entry point
//!
//! This binary provides the `leaguedesk` tool for managing a league project
//! and serving its REST API.

use anyhow::{bail, Context};
use clap::Parser;
use leaguedesk_lib::engine::{
    api::{create_router, ApiState},
    cli::formatter::{count_label, CliFormatter},
    cli::{Cli, Commands, MigrateAction, OutputFormat, RosterAction, ScheduleAction},
    config::{Config, CONFIG_FILE},
    database::Database,
    migrations::MigrationRunner,
    roster::{OwnerRef, Reconciler},
    scheduling::{parse_candidates, parse_date, AssignmentRequest, ConflictDetector, ScheduleOutcome, ScheduleService},
};
use serde_json::json;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(e) = run_cli(cli) {
        CliFormatter::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let project_dir = cli.get_project_dir();
    let json_output = cli.format == OutputFormat::Json;

    match cli.command {
        Commands::Init { name } => cmd_init(&project_dir, &name, json_output),
        Commands::Migrate { action } => cmd_migrate(action, &project_dir, json_output),
        Commands::Serve { port, host } => cmd_serve(&project_dir, host, port),
        Commands::Status => cmd_status(&project_dir, json_output),
        Commands::Schedule { action } => cmd_schedule(action, &project_dir, json_output),
        Commands::Roster { action } => cmd_roster(action, &project_dir, json_output),
    }
}

fn open_project(project_dir: &Path) -> anyhow::Result<(Config, Database)> {
    let config = Config::load(project_dir)
        .with_context(|| format!("failed to load project at {}", project_dir.display()))?;
    let db = Database::new(&config.database_path(project_dir))?;
    Ok((config, db))
}

fn cmd_init(project_dir: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    if project_dir.join(CONFIG_FILE).exists() {
        bail!("Project already initialized: {}", project_dir.display());
    }

    std::fs::create_dir_all(project_dir)?;
    let config = Config::default_for_project(name);
    config.save(project_dir)?;

    std::fs::create_dir_all(project_dir.join("sql").join("migrations"))?;
    std::fs::create_dir_all(project_dir.join("data"))?;

    let gitignore = "# LeagueDesk\ndata/*.db\ndata/*.db-*\n*.log\n";
    std::fs::write(project_dir.join(".gitignore"), gitignore)?;

    let _db = Database::new(&config.database_path(project_dir))?;

    if json {
        println!("{}", json!({
            "success": true,
            "project_dir": project_dir.display().to_string(),
            "name": name
        }));
    } else {
        CliFormatter::success(&format!("Created LeagueDesk project: {}", name));
        CliFormatter::kv("Directory", &project_dir.display().to_string());
        CliFormatter::info("Start the API with `leaguedesk serve`");
    }

    Ok(())
}

fn cmd_migrate(action: MigrateAction, project_dir: &Path, json: bool) -> anyhow::Result<()> {
    let (_config, db) = open_project(project_dir)?;
    let runner = MigrationRunner::new(project_dir);

    match action {
        MigrateAction::Create { name } => {
            let path = runner.create(&name)?;
            if json {
                println!("{}", json!({ "success": true, "path": path.display().to_string() }));
            } else {
                CliFormatter::success(&format!("Created migration: {}", path.display()));
                CliFormatter::info("Edit the file and run `leaguedesk migrate push`");
            }
        }
        MigrateAction::Push => {
            let applied = runner.push(&db)?;
            if json {
                println!("{}", json!({ "success": true, "applied": applied }));
            } else if applied.is_empty() {
                CliFormatter::success("No pending migrations");
            } else {
                CliFormatter::success(&format!("Applied {} migration(s):", applied.len()));
                for name in &applied {
                    CliFormatter::item(name);
                }
            }
        }
        MigrateAction::Check => {
            let status = runner.check(&db)?;
            if json {
                println!("{}", json!({
                    "applied": status.applied_count,
                    "pending": status.pending_count,
                    "pending_migrations": status.pending_migrations
                }));
            } else {
                CliFormatter::header("Migration Status");
                CliFormatter::kv("Applied", &status.applied_count.to_string());
                CliFormatter::kv("Pending", &status.pending_count.to_string());
                for name in &status.pending_migrations {
                    CliFormatter::item(name);
                }
            }
        }
    }

    Ok(())
}

fn cmd_serve(project_dir: &Path, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let (config, db) = open_project(project_dir)?;
    let host = host.unwrap_or_else(|| config.api.host.clone());
    let port = port.unwrap_or(config.api.port);

    let app = create_router(ApiState::new(db, &config.scheduling));
    let addr = format!("{}:{}", host, port);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind to {}", addr))?;

        CliFormatter::header("LeagueDesk API Server");
        CliFormatter::kv("Project", &config.project.name);
        CliFormatter::kv("Listening", &format!("http://{}", addr));
        CliFormatter::kv("Conflict policy", &format!("{:?}", config.scheduling.conflict_policy));
        CliFormatter::info("Press Ctrl+C to stop");
        info!(%addr, project = %config.project.name, "server starting");

        axum::serve(listener, app).await.context("server error")
    })
}

fn cmd_status(project_dir: &Path, json: bool) -> anyhow::Result<()> {
    let (config, db) = open_project(project_dir)?;
    let status = MigrationRunner::new(project_dir).check(&db)?;
    let memberships = db.count_rows("memberships")?;
    let assignments = db.count_rows("match_assignments")?;

    if json {
        println!("{}", json!({
            "project": config.project.name,
            "database": config.database.db_type,
            "api_port": config.api.port,
            "migrations_applied": status.applied_count,
            "migrations_pending": status.pending_count,
            "memberships": memberships,
            "assignments": assignments
        }));
    } else {
        CliFormatter::header("LeagueDesk Project Status");
        CliFormatter::kv("Project", &config.project.name);
        CliFormatter::kv(
            "Database",
            &format!("{} ({})", config.database.db_type, config.database.path.display()),
        );
        CliFormatter::kv("API Port", &config.api.port.to_string());
        CliFormatter::kv(
            "Migrations",
            &format!("{} applied, {} pending", status.applied_count, status.pending_count),
        );
        CliFormatter::kv("Memberships", &memberships.to_string());
        CliFormatter::kv("Scheduled matches", &assignments.to_string());
    }

    Ok(())
}

fn read_assignment_file(path: &Path) -> anyhow::Result<Vec<AssignmentRequest>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let requests = serde_json::from_str(&content)
        .with_context(|| format!("{} must contain a JSON array of assignments", path.display()))?;
    Ok(requests)
}

fn cmd_schedule(action: ScheduleAction, project_dir: &Path, json: bool) -> anyhow::Result<()> {
    let (config, db) = open_project(project_dir)?;
    let scheduling = &config.scheduling;
    let service = ScheduleService::new(
        &db,
        ConflictDetector::new(scheduling.conflict_policy, scheduling.default_duration_minutes),
    );

    match action {
        ScheduleAction::Check { file } => {
            let batch = parse_candidates(&read_assignment_file(&file)?)?;
            let conflicts = service.check(&batch)?;
            if json {
                println!("{}", json!({ "conflicts": conflicts }));
            } else if conflicts.is_empty() {
                CliFormatter::success(&format!("No conflicts in {} assignment(s)", batch.len()));
            } else {
                CliFormatter::warning(&format!("{} conflict(s) found", conflicts.len()));
                CliFormatter::conflicts(&conflicts);
            }
        }
        ScheduleAction::Apply { file } => {
            let batch = parse_candidates(&read_assignment_file(&file)?)?;
            let outcome = service.apply(&batch)?;
            if json {
                println!("{}", serde_json::to_string(&outcome)?);
            }
            match outcome {
                ScheduleOutcome::Applied { applied } => {
                    if !json {
                        CliFormatter::success(&format!("Scheduled {} match(es)", applied));
                    }
                }
                ScheduleOutcome::Rejected { conflicts } => {
                    if !json {
                        CliFormatter::conflicts(&conflicts);
                    }
                    bail!("{} conflict(s) found; nothing was saved", conflicts.len());
                }
            }
        }
        ScheduleAction::List { date, field } => {
            let date = date.as_deref().map(parse_date).transpose()?;
            let assignments = service.list(date, field.as_deref())?;
            if json {
                println!("{}", json!({ "data": assignments, "count": assignments.len() }));
            } else if assignments.is_empty() {
                CliFormatter::info("No scheduled matches");
            } else {
                CliFormatter::header("Scheduled Matches");
                CliFormatter::assignments(&assignments, scheduling.default_duration_minutes);
            }
        }
        ScheduleAction::Unassign { match_id } => {
            service.unassign(&match_id)?;
            if json {
                println!("{}", json!({ "success": true, "matchId": match_id }));
            } else {
                CliFormatter::success(&format!("Removed {} from the schedule", match_id));
            }
        }
    }

    Ok(())
}

fn cmd_roster(action: RosterAction, project_dir: &Path, json: bool) -> anyhow::Result<()> {
    let (_config, db) = open_project(project_dir)?;
    let reconciler = Reconciler::new(&db);

    match action {
        RosterAction::Show { kind, owner } => {
            let owner = OwnerRef::new(kind, owner);
            let members = reconciler.members(&owner)?;
            if json {
                println!("{}", json!({
                    "ownerKind": owner.kind,
                    "ownerId": owner.id,
                    "memberIds": members
                }));
            } else {
                CliFormatter::header(&format!("{} {}", owner, kind.member_label()));
                if members.is_empty() {
                    CliFormatter::info("No members");
                }
                for member in &members {
                    CliFormatter::item(member);
                }
            }
        }
        RosterAction::Set { kind, owner, members } => {
            let owner = OwnerRef::new(kind, owner);
            let report = reconciler.reconcile(&owner, &members)?;
            if json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                CliFormatter::success(&format!(
                    "{}: added {}, removed {}, kept {}",
                    owner,
                    count_label(report.added.len(), "member", "members"),
                    count_label(report.removed.len(), "member", "members"),
                    report.unchanged
                ));
                for member in &report.added {
                    CliFormatter::item(&format!("+ {}", member));
                }
                for member in &report.removed {
                    CliFormatter::item(&format!("- {}", member));
                }
            }
        }
    }

    Ok(())
}
