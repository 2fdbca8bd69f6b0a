use std::{
    collections::HashSet,
    path::Path,
    time::Duration,
};

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::{Value, json};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    app::{
        ActiveDialog, Dashboard, DayCountIndex, Message, SECTION_COLOR_PALETTE, SyncFailure,
        completed_tasks, progress, visible_groups,
    },
    auth::{AuthClient, AuthConfig, AuthError, ProfileNames},
    calendar::CalendarCell,
    dates::{self, day_heading, first_day_of_month, short_day_label},
    localdata::LocalData,
    settings::Settings,
    store::{StoreError, TaskStore, rest::{RestStore, RestStoreConfig}},
    streak::{current_streak, milestone_label},
    timer::{TimerMode, format_clock},
    types::{DailyStats, Section, StoredSession, Task, UserProfile},
};

const SCHEMA_VERSION: &str = "cli.v1";

const PASSWORD_ENV: &str = "POMODASH_PASSWORD";

// How far back the streak scan reaches; one row per active day keeps
// this cheap even at a year.
const STREAK_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Clone, Subcommand)]
pub enum RootCommand {
    /// Sign in, sign out, and manage the profile name
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
    /// Show a day, carry tasks forward, or import pre-account data
    Day {
        #[command(subcommand)]
        command: DayCommand,
    },
    /// Add and edit tasks on a day
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Manage the sections tasks are grouped under
    Section {
        #[command(subcommand)]
        command: SectionCommand,
    },
    /// Run a focus or break countdown
    Timer {
        #[command(subcommand)]
        command: TimerCommand,
    },
    /// Focus totals and the current streak
    Stats {
        #[command(subcommand)]
        command: StatsCommand,
    },
    /// Month grid with per-day task tallies
    Calendar {
        #[command(subcommand)]
        command: CalendarCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum AuthCommand {
    /// Sign in and store the session locally
    Login(AuthLoginArgs),
    /// Drop the stored session
    Logout,
    /// Show the signed-in profile
    Whoami,
    /// Set the profile name shown in the greeting
    SetName(AuthSetNameArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum DayCommand {
    /// Print a day's sections, tasks, and focus totals
    Show(DayShowArgs),
    /// Carry yesterday's unfinished tasks to today
    Plan(DayPlanArgs),
    /// Move a past day's unfinished tasks to today
    Sweep(DaySweepArgs),
    /// Import the pre-account data file, if one exists
    Migrate,
}

#[derive(Debug, Clone, Subcommand)]
pub enum TaskCommand {
    /// Add a task
    Add(TaskAddArgs),
    /// Flip a task between done and open
    Toggle(TaskRefArgs),
    /// Delete a task
    Delete(TaskRefArgs),
    /// Change a task's text
    Rename(TaskRenameArgs),
    /// Attach notes to a task
    Describe(TaskDescribeArgs),
    /// Move a task into a section, or out of all of them
    Move(TaskMoveArgs),
    /// Move a task to another position in the day's list
    Reorder(TaskReorderArgs),
    /// Move a task to another day
    Reschedule(TaskRescheduleArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum SectionCommand {
    /// List sections in display order
    List,
    /// Add a section
    Add(SectionAddArgs),
    /// Rename a section
    Rename(SectionRenameArgs),
    /// Change a section's color
    Recolor(SectionRecolorArgs),
    /// Delete a section; its tasks keep their day and lose the label
    Delete(SectionRefArgs),
    /// Move a section to another position
    Reorder(SectionReorderArgs),
    /// Rename the bucket that holds tasks outside every section
    RenameUncategorized(SectionRenameUncategorizedArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum TimerCommand {
    /// Count a session down to zero
    Run(TimerRunArgs),
    /// Show the configured durations and today's focus totals
    Status,
}

#[derive(Debug, Clone, Subcommand)]
pub enum StatsCommand {
    /// Print the streak and recent focus totals
    Show(StatsShowArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum CalendarCommand {
    /// Print a month grid with per-day tallies
    Show(CalendarShowArgs),
}

#[derive(Debug, Clone, Args)]
pub struct AuthLoginArgs {
    /// Sign-in email; falls back to the one in settings.toml
    #[arg(long, value_name = "EMAIL")]
    pub email: Option<String>,

    /// Password; falls back to the POMODASH_PASSWORD environment variable
    #[arg(long, value_name = "PASSWORD")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct AuthSetNameArgs {
    /// Full name; the first word becomes the greeting name
    #[arg(long, value_name = "TEXT")]
    pub name: String,
}

#[derive(Debug, Clone, Args)]
pub struct DayShowArgs {
    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Args)]
pub struct DayPlanArgs {
    /// Leave this task behind; repeatable, takes an id or unique prefix
    #[arg(long, value_name = "TASK_ID", conflicts_with = "dismiss")]
    pub skip: Vec<String>,

    /// Decline the carry-forward and stop asking for the rest of the day
    #[arg(long)]
    pub dismiss: bool,
}

#[derive(Debug, Clone, Args)]
pub struct DaySweepArgs {
    /// Past day to sweep
    #[arg(long, value_name = "DATE")]
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Args)]
pub struct TaskAddArgs {
    #[arg(long, value_name = "TEXT")]
    pub text: String,

    /// Section to file the task under, by name, id, or unique prefix
    #[arg(long, value_name = "SECTION")]
    pub section: Option<String>,

    /// Day to schedule the task on; defaults to today
    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Args)]
pub struct TaskRefArgs {
    /// Task id or unique prefix
    #[arg(long, value_name = "TASK_ID")]
    pub id: String,

    /// Day the task sits on; defaults to today
    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Args)]
pub struct TaskRenameArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: String,

    #[arg(long, value_name = "TEXT")]
    pub text: String,

    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Args)]
pub struct TaskDescribeArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: String,

    /// Notes to store with the task; pass an empty string to clear them
    #[arg(long, value_name = "TEXT")]
    pub notes: String,

    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Args)]
pub struct TaskMoveArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: String,

    /// Target section, by name, id, or unique prefix
    #[arg(long, value_name = "SECTION", conflicts_with = "uncategorized")]
    pub section: Option<String>,

    /// Detach the task from every section
    #[arg(long)]
    pub uncategorized: bool,

    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Args)]
pub struct TaskReorderArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: String,

    /// New position in the day's list, counted from 1
    #[arg(long, value_name = "N")]
    pub to: usize,

    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Args)]
pub struct TaskRescheduleArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: String,

    /// Day to move the task to
    #[arg(long, value_name = "DATE")]
    pub to: NaiveDate,

    /// Day the task currently sits on; defaults to today
    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Args)]
pub struct SectionAddArgs {
    #[arg(long, value_name = "TEXT")]
    pub name: String,
}

#[derive(Debug, Clone, Args)]
pub struct SectionRefArgs {
    /// Section name, id, or unique prefix
    #[arg(long, value_name = "SECTION")]
    pub section: String,
}

#[derive(Debug, Clone, Args)]
pub struct SectionRenameArgs {
    #[arg(long, value_name = "SECTION")]
    pub section: String,

    #[arg(long, value_name = "TEXT")]
    pub name: String,
}

#[derive(Debug, Clone, Args)]
pub struct SectionRecolorArgs {
    #[arg(long, value_name = "SECTION")]
    pub section: String,

    /// Palette position (1 through 8) or a #rrggbb value
    #[arg(long, value_name = "COLOR")]
    pub color: String,
}

#[derive(Debug, Clone, Args)]
pub struct SectionReorderArgs {
    #[arg(long, value_name = "SECTION")]
    pub section: String,

    /// New position in the section list, counted from 1
    #[arg(long, value_name = "N")]
    pub to: usize,
}

#[derive(Debug, Clone, Args)]
pub struct SectionRenameUncategorizedArgs {
    #[arg(long, value_name = "TEXT")]
    pub name: String,
}

#[derive(Debug, Clone, Args)]
pub struct TimerRunArgs {
    /// Session kind: focus, short-break, or long-break
    #[arg(long, value_name = "MODE", default_value = "focus")]
    pub mode: String,
}

#[derive(Debug, Clone, Args)]
pub struct StatsShowArgs {
    /// How many recent days to list
    #[arg(long, value_name = "N", default_value_t = 7)]
    pub days: u32,
}

#[derive(Debug, Clone, Args)]
pub struct CalendarShowArgs {
    #[arg(long, value_name = "N")]
    pub year: Option<i32>,

    /// Month number, 1 through 12
    #[arg(long, value_name = "N")]
    pub month: Option<u32>,
}

pub async fn run(
    command: RootCommand,
    json_output: bool,
    quiet: bool,
    config_path: Option<&Path>,
) -> i32 {
    let settings = match config_path {
        Some(path) => {
            if !path.exists() {
                warn!(path = %path.display(), "settings file not found; using defaults");
            }
            Settings::load_from_path(path)
        }
        None => Settings::load(),
    };

    match execute(command, &settings).await {
        Ok(output) => {
            print_success(output, json_output, quiet);
            0
        }
        Err(err) => {
            print_error(&err, json_output);
            err.exit_code
        }
    }
}

struct CommandOutput {
    command: &'static str,
    data: Value,
    text: String,
}

#[derive(Debug)]
struct CliError {
    exit_code: i32,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

type CliResult<T> = Result<T, CliError>;

async fn execute(command: RootCommand, settings: &Settings) -> CliResult<CommandOutput> {
    match command {
        RootCommand::Auth { command } => execute_auth_command(settings, command).await,
        RootCommand::Day { command } => execute_day_command(settings, command).await,
        RootCommand::Task { command } => execute_task_command(settings, command).await,
        RootCommand::Section { command } => execute_section_command(settings, command).await,
        RootCommand::Timer { command } => execute_timer_command(settings, command).await,
        RootCommand::Stats { command } => execute_stats_command(settings, command).await,
        RootCommand::Calendar { command } => execute_calendar_command(settings, command).await,
    }
}

async fn execute_auth_command(
    settings: &Settings,
    command: AuthCommand,
) -> CliResult<CommandOutput> {
    match command {
        AuthCommand::Login(args) => auth_login(settings, args).await,
        AuthCommand::Logout => auth_logout(settings).await,
        AuthCommand::Whoami => auth_whoami(settings).await,
        AuthCommand::SetName(args) => auth_set_name(settings, args).await,
    }
}

async fn execute_day_command(settings: &Settings, command: DayCommand) -> CliResult<CommandOutput> {
    match command {
        DayCommand::Show(args) => day_show(settings, args).await,
        DayCommand::Plan(args) => day_plan(settings, args).await,
        DayCommand::Sweep(args) => day_sweep(settings, args).await,
        DayCommand::Migrate => day_migrate(settings).await,
    }
}

async fn execute_task_command(
    settings: &Settings,
    command: TaskCommand,
) -> CliResult<CommandOutput> {
    match command {
        TaskCommand::Add(args) => task_add(settings, args).await,
        TaskCommand::Toggle(args) => task_toggle(settings, args).await,
        TaskCommand::Delete(args) => task_delete(settings, args).await,
        TaskCommand::Rename(args) => task_rename(settings, args).await,
        TaskCommand::Describe(args) => task_describe(settings, args).await,
        TaskCommand::Move(args) => task_move(settings, args).await,
        TaskCommand::Reorder(args) => task_reorder(settings, args).await,
        TaskCommand::Reschedule(args) => task_reschedule(settings, args).await,
    }
}

async fn execute_section_command(
    settings: &Settings,
    command: SectionCommand,
) -> CliResult<CommandOutput> {
    match command {
        SectionCommand::List => section_list(settings).await,
        SectionCommand::Add(args) => section_add(settings, args).await,
        SectionCommand::Rename(args) => section_rename(settings, args).await,
        SectionCommand::Recolor(args) => section_recolor(settings, args).await,
        SectionCommand::Delete(args) => section_delete(settings, args).await,
        SectionCommand::Reorder(args) => section_reorder(settings, args).await,
        SectionCommand::RenameUncategorized(args) => {
            section_rename_uncategorized(settings, args).await
        }
    }
}

async fn execute_timer_command(
    settings: &Settings,
    command: TimerCommand,
) -> CliResult<CommandOutput> {
    match command {
        TimerCommand::Run(args) => timer_run(settings, args).await,
        TimerCommand::Status => timer_status(settings).await,
    }
}

async fn execute_stats_command(
    settings: &Settings,
    command: StatsCommand,
) -> CliResult<CommandOutput> {
    match command {
        StatsCommand::Show(args) => stats_show(settings, args).await,
    }
}

async fn execute_calendar_command(
    settings: &Settings,
    command: CalendarCommand,
) -> CliResult<CommandOutput> {
    match command {
        CalendarCommand::Show(args) => calendar_show(settings, args).await,
    }
}

async fn auth_login(settings: &Settings, args: AuthLoginArgs) -> CliResult<CommandOutput> {
    let email = args
        .email
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            let fallback = settings.email.trim();
            (!fallback.is_empty()).then(|| fallback.to_string())
        })
        .ok_or_else(|| {
            usage_error(
                "EMAIL_REQUIRED",
                "provide --email or set one in settings.toml",
            )
        })?;
    let password = match args.password {
        Some(password) => password,
        None => std::env::var(PASSWORD_ENV).map_err(|_| {
            usage_error(
                "PASSWORD_REQUIRED",
                format!("provide --password or set {PASSWORD_ENV}"),
            )
        })?,
    };

    let client = auth_client(settings)?;
    let session = client
        .sign_in(&email, &password)
        .await
        .map_err(auth_error)?;
    let profile = session.user.clone();

    let mut local = LocalData::open();
    local.state.session = Some(session);
    local
        .save()
        .map_err(|err| runtime_error(format_anyhow_error_chain(&err)))?;
    info!(user = %profile.id, "signed in");

    Ok(CommandOutput {
        command: "auth login",
        data: json!({ "user": profile }),
        text: format!("signed in as {}", describe_account(&profile)),
    })
}

async fn auth_logout(settings: &Settings) -> CliResult<CommandOutput> {
    let mut local = LocalData::open();
    let Some(session) = local.state.session.take() else {
        return Err(not_signed_in_error());
    };

    // Revoke server-side when we can; a dead network must not keep the
    // session pinned on this machine.
    if let Ok(client) = auth_client(settings) {
        if let Err(err) = client.sign_out(&session.access_token).await {
            warn!(error = %err, "server-side sign-out failed, dropping the local session anyway");
        }
    }
    local
        .save()
        .map_err(|err| runtime_error(format_anyhow_error_chain(&err)))?;
    info!(user = %session.user.id, "signed out");

    Ok(CommandOutput {
        command: "auth logout",
        data: json!({}),
        text: "signed out".to_string(),
    })
}

async fn auth_whoami(settings: &Settings) -> CliResult<CommandOutput> {
    let local = LocalData::open();
    let session = stored_session(&local)?;
    let profile = match auth_client(settings) {
        Ok(client) => match client.fetch_user(&session.access_token).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(error = %err, "profile fetch failed, showing the stored copy");
                session.user.clone()
            }
        },
        Err(_) => session.user.clone(),
    };

    let text = format!(
        "{}\ngreeting name: {}\nemail: {}\nuser id: {}",
        profile.full_name.as_deref().unwrap_or("(no name saved)"),
        profile.first_name(),
        profile.email.as_deref().unwrap_or("(none)"),
        profile.id,
    );
    Ok(CommandOutput {
        command: "auth whoami",
        data: json!({ "user": profile }),
        text,
    })
}

async fn auth_set_name(settings: &Settings, args: AuthSetNameArgs) -> CliResult<CommandOutput> {
    if args.name.trim().is_empty() {
        return Err(usage_error("NAME_REQUIRED", "name cannot be empty"));
    }

    let mut dashboard = open_dashboard(settings).await?;
    dashboard
        .update(Message::SaveFullName {
            name: args.name.clone(),
        })
        .await
        .map_err(store_error)?;
    let request = dashboard
        .take_profile_update()
        .ok_or_else(|| runtime_error("no profile update was staged"))?;

    let client = auth_client(settings)?;
    let token = dashboard
        .local
        .state
        .session
        .as_ref()
        .map(|session| session.access_token.clone())
        .ok_or_else(not_signed_in_error)?;
    let names = ProfileNames {
        full_name: Some(request.full_name.clone()),
        display_name: Some(request.display_name.clone()),
    };
    let profile = client
        .update_profile_names(&token, &names)
        .await
        .map_err(auth_error)?;

    if let Some(session) = dashboard.local.state.session.as_mut() {
        session.user = profile.clone();
    }
    if let Err(err) = dashboard.local.save() {
        warn!(error = %err, "could not persist the refreshed profile");
    }

    Ok(CommandOutput {
        command: "auth set-name",
        data: json!({ "user": profile }),
        text: format!("saved profile name; the greeting uses {}", profile.first_name()),
    })
}

async fn day_show(settings: &Settings, args: DayShowArgs) -> CliResult<CommandOutput> {
    let date = args.date.unwrap_or_else(dates::today);
    let dashboard = dashboard_on(settings, date).await?;
    Ok(day_output("day show", &dashboard))
}

async fn day_plan(settings: &Settings, args: DayPlanArgs) -> CliResult<CommandOutput> {
    let mut dashboard = open_dashboard(settings).await?;

    // The name prompt outranks the morning prompt; step past it here,
    // it has its own command.
    if matches!(dashboard.active_dialog, ActiveDialog::NamePrompt(_)) {
        dashboard.active_dialog = ActiveDialog::None;
        dashboard.maybe_plan_day().await;
    }
    let ActiveDialog::PlanDay(dialog) = &dashboard.active_dialog else {
        return Ok(CommandOutput {
            command: "day plan",
            data: json!({ "moved": 0 }),
            text: "nothing to carry forward".to_string(),
        });
    };
    let from = dialog.date;
    let offered: Vec<Task> = dialog.tasks.clone();

    if args.dismiss {
        dashboard
            .update(Message::DismissPlanDay)
            .await
            .map_err(store_error)?;
        return Ok(CommandOutput {
            command: "day plan",
            data: json!({ "from": from, "moved": 0, "dismissed": true }),
            text: format!(
                "left {} on {}",
                count_label(offered.len(), "task"),
                short_day_label(from)
            ),
        });
    }

    for raw in &args.skip {
        let id = resolve_task(&offered, raw)?.id;
        dashboard
            .update(Message::TogglePlanSelection(id))
            .await
            .map_err(store_error)?;
    }
    let moved = match &dashboard.active_dialog {
        ActiveDialog::PlanDay(dialog) => dialog.selected_ids().len(),
        _ => 0,
    };
    dashboard
        .update(Message::ConfirmPlanDay)
        .await
        .map_err(store_error)?;
    ensure_synced(&mut dashboard)?;

    Ok(CommandOutput {
        command: "day plan",
        data: json!({ "from": from, "moved": moved }),
        text: format!(
            "carried {} forward from {}",
            count_label(moved, "task"),
            short_day_label(from)
        ),
    })
}

async fn day_sweep(settings: &Settings, args: DaySweepArgs) -> CliResult<CommandOutput> {
    let today = dates::today();
    if args.date >= today {
        return Err(usage_error(
            "DATE_INVALID",
            "the sweep day must be before today",
        ));
    }

    let mut dashboard = dashboard_on(settings, args.date).await?;
    if !dashboard.tasks.iter().any(|task| !task.completed) {
        return Ok(CommandOutput {
            command: "day sweep",
            data: json!({ "from": args.date, "moved": 0 }),
            text: format!("nothing unfinished on {}", short_day_label(args.date)),
        });
    }

    // Leaving the stale day raises the reschedule prompt with its
    // unfinished tasks; confirming moves them to today.
    dashboard
        .update(Message::SelectDate(today))
        .await
        .map_err(store_error)?;
    let moved = match &dashboard.active_dialog {
        ActiveDialog::Reschedule(dialog) => dialog.task_count(),
        _ => 0,
    };
    dashboard
        .update(Message::ConfirmReschedule)
        .await
        .map_err(store_error)?;
    ensure_synced(&mut dashboard)?;

    Ok(CommandOutput {
        command: "day sweep",
        data: json!({ "from": args.date, "moved": moved }),
        text: format!(
            "moved {} from {} to today",
            count_label(moved, "task"),
            short_day_label(args.date)
        ),
    })
}

async fn day_migrate(settings: &Settings) -> CliResult<CommandOutput> {
    let found = LocalData::open().has_legacy_snapshot();
    // The first load runs the import; the data file is consumed on
    // every path through it.
    let dashboard = open_dashboard(settings).await?;

    let text = if found {
        format!(
            "imported the pre-account data file; today lists {}",
            count_label(dashboard.tasks.len(), "task")
        )
    } else {
        "no pre-account data file found".to_string()
    };
    Ok(CommandOutput {
        command: "day migrate",
        data: json!({ "found": found, "tasks_today": dashboard.tasks.len() }),
        text,
    })
}

async fn task_add(settings: &Settings, args: TaskAddArgs) -> CliResult<CommandOutput> {
    if args.text.trim().is_empty() {
        return Err(usage_error("TEXT_REQUIRED", "task text cannot be empty"));
    }

    let date = args.date.unwrap_or_else(dates::today);
    let mut dashboard = dashboard_on(settings, date).await?;
    let section_id = match args.section.as_deref() {
        Some(raw) => Some(resolve_section(&dashboard.sections, raw)?.id),
        None => None,
    };

    dashboard
        .update(Message::AddTask {
            text: args.text.clone(),
            section_id,
        })
        .await
        .map_err(store_error)?;
    let task = dashboard
        .tasks
        .last()
        .cloned()
        .ok_or_else(|| runtime_error("the store returned no task row"))?;

    Ok(CommandOutput {
        command: "task add",
        data: json!({ "task": task }),
        text: format!("created task {}: {}", short_id(task.id), task.text),
    })
}

async fn task_toggle(settings: &Settings, args: TaskRefArgs) -> CliResult<CommandOutput> {
    let date = args.date.unwrap_or_else(dates::today);
    let mut dashboard = dashboard_on(settings, date).await?;
    let id = resolve_task(&dashboard.tasks, &args.id)?.id;

    dashboard
        .update(Message::ToggleTask(id))
        .await
        .map_err(store_error)?;
    ensure_synced(&mut dashboard)?;

    let task = dashboard
        .tasks
        .iter()
        .find(|task| task.id == id)
        .cloned()
        .ok_or_else(|| runtime_error("the toggled task disappeared"))?;
    let text = if task.completed {
        format!("completed task {}", short_id(task.id))
    } else {
        format!("reopened task {}", short_id(task.id))
    };
    Ok(CommandOutput {
        command: "task toggle",
        data: json!({ "task": task }),
        text,
    })
}

async fn task_delete(settings: &Settings, args: TaskRefArgs) -> CliResult<CommandOutput> {
    let date = args.date.unwrap_or_else(dates::today);
    let mut dashboard = dashboard_on(settings, date).await?;
    let task = resolve_task(&dashboard.tasks, &args.id)?.clone();

    dashboard
        .update(Message::DeleteTask(task.id))
        .await
        .map_err(store_error)?;
    ensure_synced(&mut dashboard)?;

    Ok(CommandOutput {
        command: "task delete",
        data: json!({ "task": task }),
        text: format!("deleted task {}: {}", short_id(task.id), task.text),
    })
}

async fn task_rename(settings: &Settings, args: TaskRenameArgs) -> CliResult<CommandOutput> {
    if args.text.trim().is_empty() {
        return Err(usage_error("TEXT_REQUIRED", "task text cannot be empty"));
    }

    let date = args.date.unwrap_or_else(dates::today);
    let mut dashboard = dashboard_on(settings, date).await?;
    let id = resolve_task(&dashboard.tasks, &args.id)?.id;

    dashboard
        .update(Message::RenameTask {
            id,
            text: args.text.clone(),
        })
        .await
        .map_err(store_error)?;
    ensure_synced(&mut dashboard)?;

    Ok(CommandOutput {
        command: "task rename",
        data: json!({ "id": id, "text": args.text.trim() }),
        text: format!("renamed task {}", short_id(id)),
    })
}

async fn task_describe(settings: &Settings, args: TaskDescribeArgs) -> CliResult<CommandOutput> {
    let date = args.date.unwrap_or_else(dates::today);
    let mut dashboard = dashboard_on(settings, date).await?;
    let id = resolve_task(&dashboard.tasks, &args.id)?.id;

    dashboard
        .update(Message::EditDescription {
            id,
            description: args.notes.clone(),
        })
        .await
        .map_err(store_error)?;
    ensure_synced(&mut dashboard)?;

    let text = if args.notes.is_empty() {
        format!("cleared notes on task {}", short_id(id))
    } else {
        format!("saved notes on task {}", short_id(id))
    };
    Ok(CommandOutput {
        command: "task describe",
        data: json!({ "id": id, "notes": args.notes }),
        text,
    })
}

async fn task_move(settings: &Settings, args: TaskMoveArgs) -> CliResult<CommandOutput> {
    let date = args.date.unwrap_or_else(dates::today);
    let mut dashboard = dashboard_on(settings, date).await?;
    let id = resolve_task(&dashboard.tasks, &args.id)?.id;

    let (section_id, destination) = if args.uncategorized {
        (None, dashboard.uncategorized_name())
    } else {
        let raw = args.section.as_deref().ok_or_else(|| {
            usage_error(
                "SECTION_SELECTOR_REQUIRED",
                "provide one of --section or --uncategorized",
            )
        })?;
        let section = resolve_section(&dashboard.sections, raw)?;
        (Some(section.id), section.name.clone())
    };

    dashboard
        .update(Message::MoveTaskToSection { id, section_id })
        .await
        .map_err(store_error)?;
    ensure_synced(&mut dashboard)?;

    Ok(CommandOutput {
        command: "task move",
        data: json!({ "id": id, "section_id": section_id }),
        text: format!("moved task {} to {}", short_id(id), destination),
    })
}

async fn task_reorder(settings: &Settings, args: TaskReorderArgs) -> CliResult<CommandOutput> {
    let date = args.date.unwrap_or_else(dates::today);
    let mut dashboard = dashboard_on(settings, date).await?;
    if !dashboard.capabilities.task_ordering {
        return Err(ordering_disabled_error());
    }

    let id = resolve_task(&dashboard.tasks, &args.id)?.id;
    let from = dashboard
        .tasks
        .iter()
        .position(|task| task.id == id)
        .ok_or_else(|| runtime_error("the task disappeared"))?;
    let to = args
        .to
        .checked_sub(1)
        .ok_or_else(|| usage_error("POSITION_INVALID", "positions are counted from 1"))?;
    if to >= dashboard.tasks.len() {
        return Err(usage_error(
            "POSITION_INVALID",
            format!("position must be between 1 and {}", dashboard.tasks.len()),
        ));
    }

    dashboard
        .update(Message::ReorderTasks { from, to })
        .await
        .map_err(store_error)?;
    ensure_synced(&mut dashboard)?;

    Ok(CommandOutput {
        command: "task reorder",
        data: json!({ "id": id, "position": args.to }),
        text: format!("moved task {} to position {}", short_id(id), args.to),
    })
}

async fn task_reschedule(
    settings: &Settings,
    args: TaskRescheduleArgs,
) -> CliResult<CommandOutput> {
    let date = args.date.unwrap_or_else(dates::today);
    let mut dashboard = dashboard_on(settings, date).await?;
    let task = resolve_task(&dashboard.tasks, &args.id)?.clone();

    if args.to == date {
        return Ok(CommandOutput {
            command: "task reschedule",
            data: json!({ "id": task.id, "date": args.to }),
            text: format!(
                "task {} is already on {}",
                short_id(task.id),
                short_day_label(args.to)
            ),
        });
    }

    dashboard
        .update(Message::RescheduleTask {
            id: task.id,
            date: args.to,
        })
        .await
        .map_err(store_error)?;
    ensure_synced(&mut dashboard)?;

    Ok(CommandOutput {
        command: "task reschedule",
        data: json!({ "id": task.id, "date": args.to }),
        text: format!(
            "moved task {} to {}",
            short_id(task.id),
            short_day_label(args.to)
        ),
    })
}

async fn section_list(settings: &Settings) -> CliResult<CommandOutput> {
    let dashboard = open_dashboard(settings).await?;
    let data = json!({ "sections": dashboard.sections });
    let text = render_section_list_text(&dashboard.sections);

    Ok(CommandOutput {
        command: "section list",
        data,
        text,
    })
}

fn render_section_list_text(sections: &[Section]) -> String {
    if sections.is_empty() {
        return "No sections found.".to_string();
    }

    let headers = ["ID", "Name", "Color"];
    let rows = sections
        .iter()
        .map(|section| {
            let name = section.name.replace('\n', " ");
            vec![short_id(section.id), name, section.color.clone()]
        })
        .collect::<Vec<_>>();

    render_text_table(&headers, &rows)
}

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();

    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            let width = cell.chars().count();
            if width > widths[index] {
                widths[index] = width;
            }
        }
    }

    let border = format!(
        "+{}+",
        widths
            .iter()
            .map(|width| "-".repeat(*width + 2))
            .collect::<Vec<_>>()
            .join("+")
    );

    let mut lines = Vec::new();
    lines.push(border.clone());
    lines.push(format!(
        "| {} |",
        headers
            .iter()
            .enumerate()
            .map(|(index, header)| format!("{header:<width$}", width = widths[index]))
            .collect::<Vec<_>>()
            .join(" | ")
    ));
    lines.push(border.clone());

    for row in rows {
        lines.push(format!(
            "| {} |",
            row.iter()
                .enumerate()
                .map(|(index, cell)| format!("{cell:<width$}", width = widths[index]))
                .collect::<Vec<_>>()
                .join(" | ")
        ));
    }

    lines.push(border);
    lines.join("\n")
}

async fn section_add(settings: &Settings, args: SectionAddArgs) -> CliResult<CommandOutput> {
    if args.name.trim().is_empty() {
        return Err(usage_error("NAME_REQUIRED", "section name cannot be empty"));
    }

    let mut dashboard = open_dashboard(settings).await?;
    dashboard
        .update(Message::AddSection {
            name: args.name.clone(),
        })
        .await
        .map_err(store_error)?;
    let section = dashboard
        .sections
        .last()
        .cloned()
        .ok_or_else(|| runtime_error("the store returned no section row"))?;

    Ok(CommandOutput {
        command: "section add",
        data: json!({ "section": section }),
        text: format!("created section {} ({})", section.name, section.color),
    })
}

async fn section_rename(settings: &Settings, args: SectionRenameArgs) -> CliResult<CommandOutput> {
    if args.name.trim().is_empty() {
        return Err(usage_error("NAME_REQUIRED", "section name cannot be empty"));
    }

    let mut dashboard = open_dashboard(settings).await?;
    let section = resolve_section(&dashboard.sections, &args.section)?;
    let id = section.id;
    let old_name = section.name.clone();

    dashboard
        .update(Message::RenameSection {
            id,
            name: args.name.clone(),
        })
        .await
        .map_err(store_error)?;
    ensure_synced(&mut dashboard)?;

    Ok(CommandOutput {
        command: "section rename",
        data: json!({ "id": id, "name": args.name.trim() }),
        text: format!("renamed section {} to {}", old_name, args.name.trim()),
    })
}

async fn section_recolor(
    settings: &Settings,
    args: SectionRecolorArgs,
) -> CliResult<CommandOutput> {
    let color = parse_color(&args.color)?;
    let mut dashboard = open_dashboard(settings).await?;
    let section = resolve_section(&dashboard.sections, &args.section)?;
    let id = section.id;
    let name = section.name.clone();

    dashboard.recolor_section(id, &color).await;
    ensure_synced(&mut dashboard)?;

    Ok(CommandOutput {
        command: "section recolor",
        data: json!({ "id": id, "color": color }),
        text: format!("recolored section {} to {}", name, color),
    })
}

async fn section_delete(settings: &Settings, args: SectionRefArgs) -> CliResult<CommandOutput> {
    let mut dashboard = open_dashboard(settings).await?;
    let section = resolve_section(&dashboard.sections, &args.section)?.clone();
    let detached = dashboard
        .tasks
        .iter()
        .filter(|task| task.section_id == Some(section.id))
        .count();

    dashboard
        .update(Message::DeleteSection(section.id))
        .await
        .map_err(store_error)?;
    ensure_synced(&mut dashboard)?;

    Ok(CommandOutput {
        command: "section delete",
        data: json!({ "section": section, "detached_today": detached }),
        text: format!("deleted section {}", section.name),
    })
}

async fn section_reorder(
    settings: &Settings,
    args: SectionReorderArgs,
) -> CliResult<CommandOutput> {
    let mut dashboard = open_dashboard(settings).await?;
    let section = resolve_section(&dashboard.sections, &args.section)?;
    let id = section.id;
    let name = section.name.clone();

    let from = dashboard
        .sections
        .iter()
        .position(|candidate| candidate.id == id)
        .ok_or_else(|| runtime_error("the section disappeared"))?;
    let to = args
        .to
        .checked_sub(1)
        .ok_or_else(|| usage_error("POSITION_INVALID", "positions are counted from 1"))?;
    if to >= dashboard.sections.len() {
        return Err(usage_error(
            "POSITION_INVALID",
            format!("position must be between 1 and {}", dashboard.sections.len()),
        ));
    }

    dashboard
        .update(Message::ReorderSections { from, to })
        .await
        .map_err(store_error)?;
    ensure_synced(&mut dashboard)?;

    Ok(CommandOutput {
        command: "section reorder",
        data: json!({ "id": id, "position": args.to }),
        text: format!("moved section {} to position {}", name, args.to),
    })
}

async fn section_rename_uncategorized(
    settings: &Settings,
    args: SectionRenameUncategorizedArgs,
) -> CliResult<CommandOutput> {
    if args.name.trim().is_empty() {
        return Err(usage_error("NAME_REQUIRED", "name cannot be empty"));
    }

    let mut dashboard = open_dashboard(settings).await?;
    dashboard
        .update(Message::RenameUncategorized {
            name: args.name.clone(),
        })
        .await
        .map_err(store_error)?;

    Ok(CommandOutput {
        command: "section rename-uncategorized",
        data: json!({ "name": dashboard.uncategorized_name() }),
        text: format!(
            "renamed the uncategorized bucket to {}",
            dashboard.uncategorized_name()
        ),
    })
}

async fn timer_run(settings: &Settings, args: TimerRunArgs) -> CliResult<CommandOutput> {
    let mode = TimerMode::parse(&args.mode).ok_or_else(|| {
        usage_error(
            "MODE_INVALID",
            "mode must be focus, short-break, or long-break",
        )
    })?;

    let mut dashboard = open_dashboard(settings).await?;
    dashboard
        .update(Message::SwitchTimerMode(mode))
        .await
        .map_err(store_error)?;
    dashboard
        .update(Message::ToggleTimer)
        .await
        .map_err(store_error)?;
    let total = dashboard.timer.remaining_secs();
    info!(mode = mode.as_str(), seconds = total, "countdown started");

    // Ticking through the controller means a finished focus session
    // books its stats credit the same way the dashboard does.
    while dashboard.timer.is_running() {
        tokio::time::sleep(Duration::from_secs(1)).await;
        dashboard
            .update(Message::TimerTick)
            .await
            .map_err(store_error)?;
    }
    ensure_synced(&mut dashboard)?;

    Ok(CommandOutput {
        command: "timer run",
        data: json!({
            "mode": mode.as_str(),
            "seconds": total,
            "stats": dashboard.stats,
        }),
        text: format!("{} session finished ({})", mode.label(), format_clock(total)),
    })
}

async fn timer_status(settings: &Settings) -> CliResult<CommandOutput> {
    let dashboard = open_dashboard(settings).await?;
    let durations = dashboard.settings.timer_durations();

    let text = format!(
        "focus       {}\nshort break {}\nlong break  {}\ncue         {}\ntoday: {} focus minutes across {}",
        format_clock(durations.focus_secs),
        format_clock(durations.short_break_secs),
        format_clock(durations.long_break_secs),
        dashboard.settings.notification_backend().as_str(),
        dashboard.stats.total_focus_minutes,
        count_label(dashboard.stats.sessions_completed.max(0) as usize, "session"),
    );
    Ok(CommandOutput {
        command: "timer status",
        data: json!({
            "durations": {
                "focus_secs": durations.focus_secs,
                "short_break_secs": durations.short_break_secs,
                "long_break_secs": durations.long_break_secs,
            },
            "notification": dashboard.settings.notification_backend().as_str(),
            "today": dashboard.stats,
        }),
        text,
    })
}

async fn stats_show(settings: &Settings, args: StatsShowArgs) -> CliResult<CommandOutput> {
    let dashboard = open_dashboard(settings).await?;
    let today = dashboard.today;
    let from = today - chrono::Duration::days(STREAK_WINDOW_DAYS - 1);
    let rows = dashboard
        .store()
        .fetch_stats_range(dashboard.user.id, from, today)
        .await
        .map_err(store_error)?;

    let streak = current_streak(&rows, today);
    let milestone = milestone_label(streak);

    let days = args.days.max(1);
    let cutoff = today - chrono::Duration::days(i64::from(days) - 1);
    let recent: Vec<&DailyStats> = rows.iter().filter(|row| row.date >= cutoff).collect();

    let mut text = match milestone {
        Some(label) => format!(
            "current streak: {} ({})",
            count_label(streak as usize, "day"),
            label
        ),
        None => format!("current streak: {}", count_label(streak as usize, "day")),
    };
    text.push_str(&format!(
        "\ntoday: {} focus minutes across {}",
        dashboard.stats.total_focus_minutes,
        count_label(dashboard.stats.sessions_completed.max(0) as usize, "session"),
    ));
    if !recent.is_empty() {
        let headers = ["Date", "Focus min", "Sessions"];
        let table_rows = recent
            .iter()
            .rev()
            .map(|row| {
                vec![
                    dates::day_key(row.date),
                    row.total_focus_minutes.to_string(),
                    row.sessions_completed.to_string(),
                ]
            })
            .collect::<Vec<_>>();
        text.push('\n');
        text.push_str(&render_text_table(&headers, &table_rows));
    }

    Ok(CommandOutput {
        command: "stats show",
        data: json!({
            "streak": streak,
            "milestone": milestone,
            "today": dashboard.stats,
            "recent": recent,
        }),
        text,
    })
}

async fn calendar_show(settings: &Settings, args: CalendarShowArgs) -> CliResult<CommandOutput> {
    if let Some(month) = args.month {
        if !(1..=12).contains(&month) {
            return Err(usage_error(
                "MONTH_INVALID",
                "month must be between 1 and 12",
            ));
        }
    }

    let mut dashboard = open_dashboard(settings).await?;
    if let Some(year) = args.year {
        dashboard
            .update(Message::SelectYear(year))
            .await
            .map_err(store_error)?;
    }
    if let Some(month) = args.month {
        dashboard
            .update(Message::SelectMonth(month))
            .await
            .map_err(store_error)?;
    }

    let (year, month) = dashboard.calendar.viewed();
    let cells = dashboard.calendar.grid(dashboard.today);
    let text = render_month(year, month, &cells, &dashboard.counts, dashboard.today);
    let data_cells = cells
        .iter()
        .map(|cell| {
            let tally = dashboard.counts.counts_for(cell.date);
            json!({
                "date": cell.date,
                "day": cell.day,
                "in_month": cell.in_month,
                "is_today": cell.is_today,
                "total": tally.total,
                "completed": tally.completed,
            })
        })
        .collect::<Vec<_>>();

    Ok(CommandOutput {
        command: "calendar show",
        data: json!({ "year": year, "month": month, "cells": data_cells }),
        text,
    })
}

fn auth_client(settings: &Settings) -> CliResult<AuthClient> {
    if !settings.is_store_configured() {
        return Err(not_configured_error());
    }
    let mut config = AuthConfig::new(settings.store_url.clone(), settings.store_api_key.clone());
    config.timeout = settings.request_timeout();
    AuthClient::new(config).map_err(auth_error)
}

fn stored_session(local: &LocalData) -> CliResult<StoredSession> {
    local.state.session.clone().ok_or_else(not_signed_in_error)
}

// Construction probes the schema; the first load runs the one-time
// import and raises any pending prompt.
async fn open_dashboard(settings: &Settings) -> CliResult<Dashboard<RestStore>> {
    if !settings.is_store_configured() {
        return Err(not_configured_error());
    }
    let local = LocalData::open();
    let session = stored_session(&local)?;

    let mut config =
        RestStoreConfig::new(settings.store_url.clone(), settings.store_api_key.clone())
            .with_access_token(session.access_token.clone());
    config.timeout = settings.request_timeout();
    let store = RestStore::new(config).map_err(store_error)?;

    let mut dashboard =
        Dashboard::new(store, session.user, settings.clone(), local, dates::today())
            .await
            .map_err(store_error)?;
    dashboard.initialize().await.map_err(store_error)?;
    Ok(dashboard)
}

async fn dashboard_on(settings: &Settings, date: NaiveDate) -> CliResult<Dashboard<RestStore>> {
    let mut dashboard = open_dashboard(settings).await?;
    if date != dashboard.selected_date {
        dashboard
            .update(Message::SelectDate(date))
            .await
            .map_err(store_error)?;
    }
    Ok(dashboard)
}

// A write the controller absorbed into its failure ledger still did not
// land; in a one-shot process that means the command failed.
fn ensure_synced(dashboard: &mut Dashboard<RestStore>) -> CliResult<()> {
    if let Some(failure) = dashboard.take_sync_failures().into_iter().next() {
        return Err(sync_error(failure));
    }
    Ok(())
}

fn describe_account(profile: &UserProfile) -> String {
    profile
        .email
        .clone()
        .unwrap_or_else(|| profile.first_name())
}

fn short_id(id: Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

fn id_matches(id: Uuid, needle: &str) -> bool {
    id.to_string().starts_with(needle) || id.as_simple().to_string().starts_with(needle)
}

fn resolve_task<'a>(tasks: &'a [Task], selector: &str) -> CliResult<&'a Task> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return Err(usage_error("TASK_ID_REQUIRED", "task id cannot be empty"));
    }

    if let Ok(parsed) = Uuid::parse_str(trimmed) {
        return tasks.iter().find(|task| task.id == parsed).ok_or_else(|| {
            not_found_error(
                "TASK_NOT_FOUND",
                format!("task {} not found on this day", parsed),
            )
        });
    }

    let needle = trimmed.to_ascii_lowercase();
    let matches = tasks
        .iter()
        .filter(|task| id_matches(task.id, &needle))
        .collect::<Vec<_>>();
    match matches.as_slice() {
        [single] => Ok(single),
        [] => Err(not_found_error(
            "TASK_NOT_FOUND",
            format!("task '{}' not found on this day", trimmed),
        )),
        many => Err(conflict_error(
            "TASK_ID_AMBIGUOUS",
            format!(
                "task id prefix '{}' matches {} tasks; use a longer id",
                trimmed,
                many.len()
            ),
            Some(json!({
                "matches": many
                    .iter()
                    .map(|task| json!({ "id": task.id, "text": task.text }))
                    .collect::<Vec<_>>()
            })),
        )),
    }
}

// Names win over id prefixes so `--section errands` keeps working after
// a hex-looking name shows up.
fn resolve_section<'a>(sections: &'a [Section], selector: &str) -> CliResult<&'a Section> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return Err(usage_error("SECTION_REQUIRED", "section cannot be empty"));
    }

    let by_name = sections
        .iter()
        .filter(|section| section.name.eq_ignore_ascii_case(trimmed))
        .collect::<Vec<_>>();
    match by_name.as_slice() {
        [single] => return Ok(single),
        [] => {}
        many => {
            return Err(conflict_error(
                "SECTION_NAME_AMBIGUOUS",
                format!(
                    "{} sections are named '{}'; use an id",
                    many.len(),
                    trimmed
                ),
                Some(json!({
                    "matches": many
                        .iter()
                        .map(|section| json!({ "id": section.id, "name": section.name }))
                        .collect::<Vec<_>>()
                })),
            ));
        }
    }

    if let Ok(parsed) = Uuid::parse_str(trimmed) {
        return sections
            .iter()
            .find(|section| section.id == parsed)
            .ok_or_else(|| {
                not_found_error("SECTION_NOT_FOUND", format!("section {} not found", parsed))
            });
    }

    let needle = trimmed.to_ascii_lowercase();
    let matches = sections
        .iter()
        .filter(|section| id_matches(section.id, &needle))
        .collect::<Vec<_>>();
    match matches.as_slice() {
        [single] => Ok(single),
        [] => Err(not_found_error(
            "SECTION_NOT_FOUND",
            format!("section '{}' not found", trimmed),
        )),
        many => Err(conflict_error(
            "SECTION_AMBIGUOUS",
            format!(
                "section prefix '{}' matches {} sections; use a longer id",
                trimmed,
                many.len()
            ),
            Some(json!({
                "matches": many
                    .iter()
                    .map(|section| json!({ "id": section.id, "name": section.name }))
                    .collect::<Vec<_>>()
            })),
        )),
    }
}

fn parse_color(raw: &str) -> CliResult<String> {
    let trimmed = raw.trim();
    if let Ok(position) = trimmed.parse::<usize>() {
        let index = position
            .checked_sub(1)
            .filter(|index| *index < SECTION_COLOR_PALETTE.len())
            .ok_or_else(|| {
                usage_error(
                    "COLOR_INVALID",
                    format!(
                        "palette positions run 1 through {}",
                        SECTION_COLOR_PALETTE.len()
                    ),
                )
            })?;
        return Ok(SECTION_COLOR_PALETTE[index].to_string());
    }

    let is_hex = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed[1..].chars().all(|c| c.is_ascii_hexdigit());
    if is_hex {
        return Ok(trimmed.to_ascii_lowercase());
    }

    Err(usage_error(
        "COLOR_INVALID",
        "color must be a palette position or a #rrggbb value",
    ))
}

fn day_output(command: &'static str, dashboard: &Dashboard<RestStore>) -> CommandOutput {
    let heading = day_heading(dashboard.selected_date, dashboard.today);
    let (done, total, percent) = progress(&dashboard.tasks);
    let uncategorized = dashboard.uncategorized_name();
    let groups = visible_groups(&dashboard.tasks, &dashboard.sections, &uncategorized);
    let completed = completed_tasks(&dashboard.tasks);

    let mut lines = vec![format!(
        "{}: {} of {} done ({}%)",
        heading, done, total, percent
    )];
    let mut any_open = false;
    for group in &groups {
        if group.tasks.is_empty() {
            continue;
        }
        any_open = true;
        lines.push(String::new());
        match &group.color {
            Some(color) => lines.push(format!("{} ({})", group.name, color)),
            None => lines.push(group.name.clone()),
        }
        for task in &group.tasks {
            lines.push(task_line(task));
        }
    }
    if !any_open {
        lines.push(String::new());
        lines.push("No open tasks.".to_string());
    }
    if !completed.is_empty() {
        lines.push(String::new());
        lines.push(format!("Done ({})", completed.len()));
        for task in &completed {
            lines.push(task_line(task));
        }
    }
    if dashboard.stats.total_focus_minutes > 0 || dashboard.stats.sessions_completed > 0 {
        lines.push(String::new());
        lines.push(format!(
            "Focus: {} minutes across {}.",
            dashboard.stats.total_focus_minutes,
            count_label(dashboard.stats.sessions_completed.max(0) as usize, "session"),
        ));
    }

    let data = json!({
        "date": dashboard.selected_date,
        "heading": heading,
        "progress": { "completed": done, "total": total, "percent": percent },
        "groups": groups
            .iter()
            .map(|group| json!({
                "name": group.name,
                "color": group.color,
                "tasks": group.tasks,
            }))
            .collect::<Vec<_>>(),
        "completed": completed,
        "stats": dashboard.stats,
    });

    CommandOutput {
        command,
        data,
        text: lines.join("\n"),
    }
}

fn task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    let mut line = format!("  [{}] {}  {}", mark, short_id(task.id), task.text);
    if task.pomodoros_spent > 0 {
        line.push_str(&format!(
            " ({})",
            count_label(task.pomodoros_spent.max(0) as usize, "pomodoro")
        ));
    }
    line
}

fn count_label(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

// Seven columns of four characters each. A day carrying open tasks gets
// a dot, a day with every task done gets a star.
fn render_month(
    year: i32,
    month: u32,
    cells: &[CalendarCell],
    counts: &DayCountIndex,
    today: NaiveDate,
) -> String {
    let title = first_day_of_month(year, month).format("%B %Y").to_string();
    let mut lines = vec![format!("{title:^28}").trim_end().to_string()];
    lines.push(" Su  Mo  Tu  We  Th  Fr  Sa".to_string());

    for week in cells.chunks(7) {
        let mut line = String::new();
        for cell in week {
            let tally = counts.counts_for(cell.date);
            let mark = if tally.total > 0 && tally.completed >= tally.total {
                '*'
            } else if tally.total > 0 {
                '.'
            } else {
                ' '
            };
            line.push_str(&format!("{:>3}{}", cell.day, mark));
        }
        lines.push(line.trim_end().to_string());
    }

    lines.push(format!(
        "today is {}; '.' marks days with open tasks and '*' days with every task done",
        dates::day_key(today)
    ));
    lines.join("\n")
}

fn usage_error(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 2,
        code,
        message: message.into(),
        details: None,
    }
}

fn not_found_error(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 3,
        code,
        message: message.into(),
        details: None,
    }
}

fn conflict_error(
    code: &'static str,
    message: impl Into<String>,
    details: Option<Value>,
) -> CliError {
    CliError {
        exit_code: 4,
        code,
        message: message.into(),
        details,
    }
}

fn runtime_error(err: impl std::fmt::Display) -> CliError {
    CliError {
        exit_code: 5,
        code: "RUNTIME_ERROR",
        message: err.to_string(),
        details: None,
    }
}

fn not_configured_error() -> CliError {
    CliError {
        exit_code: 2,
        code: "NOT_CONFIGURED",
        message: "no hosted project configured; set store_url and store_api_key in settings.toml"
            .to_string(),
        details: None,
    }
}

fn not_signed_in_error() -> CliError {
    CliError {
        exit_code: 2,
        code: "NOT_SIGNED_IN",
        message: "not signed in; run `pomodash auth login` first".to_string(),
        details: None,
    }
}

fn ordering_disabled_error() -> CliError {
    CliError {
        exit_code: 5,
        code: "ORDERING_DISABLED",
        message: "this project has no sort_order column, so manual ordering is off".to_string(),
        details: None,
    }
}

fn store_error(err: StoreError) -> CliError {
    let details = json!({ "provider_code": err.code });
    CliError {
        exit_code: 5,
        code: "STORE_ERROR",
        message: err.message,
        details: Some(details),
    }
}

fn auth_error(err: AuthError) -> CliError {
    let message = if err.is_invalid_credentials() {
        "sign-in failed: the email or password is wrong".to_string()
    } else {
        err.message.clone()
    };
    CliError {
        exit_code: 5,
        code: "AUTH_ERROR",
        message,
        details: Some(json!({ "provider_code": err.code })),
    }
}

fn sync_error(failure: SyncFailure) -> CliError {
    CliError {
        exit_code: 5,
        code: "SYNC_FAILED",
        message: format!("{}: {}", failure.operation, failure.error.message),
        details: Some(json!({
            "operation": failure.operation,
            "provider_code": failure.error.code,
        })),
    }
}

fn print_success(output: CommandOutput, json_output: bool, quiet: bool) {
    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "command": output.command,
            "data": output.data
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => println!("{value}"),
            Err(_) => println!("{}", payload),
        }
        return;
    }

    if quiet {
        return;
    }

    if output.text.is_empty() {
        println!("ok");
    } else {
        println!("{}", output.text);
    }
}

fn print_error(err: &CliError, json_output: bool) {
    error!(
        code = err.code,
        message = %err.message,
        details = ?err.details,
        "cli command failed"
    );

    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "error": {
                "code": err.code,
                "message": err.message,
                "details": err.details
            }
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => eprintln!("{value}"),
            Err(_) => eprintln!("{}", payload),
        }
        return;
    }

    eprintln!("error[{}]: {}", err.code, err.message);
}

fn format_anyhow_error_chain(err: &anyhow::Error) -> String {
    let mut seen = HashSet::new();
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        if seen.contains(&text) {
            continue;
        }
        seen.insert(text.clone());
        parts.push(text);
    }

    parts.join(": ")
}
