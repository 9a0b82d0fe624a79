use breakflow_core::*;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "breakflow")]
#[command(about = "Work/break timer with guided desk exercises", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a work/break run
    Run(RunArgs),

    /// List the configured work/break presets
    Presets,

    /// List the exercise catalog in rotation order
    Catalog,
}

#[derive(Args)]
struct RunArgs {
    /// Name shown in the timer and the summary
    #[arg(long)]
    name: String,

    /// Work phase length in minutes (1-120)
    #[arg(long)]
    work: Option<u32>,

    /// Break phase length in minutes (1-60)
    #[arg(long = "break")]
    break_minutes: Option<u32>,

    /// Take work/break lengths from a named preset
    #[arg(long)]
    preset: Option<String>,

    /// Run without the camera panel
    #[arg(long)]
    no_camera: bool,

    /// Run on a simulated clock without waiting (for testing)
    #[arg(long)]
    simulate: bool,

    /// Stop after this many work/break cycles (default 1 when simulating)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    sessions: Option<u32>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    breakflow_core::logging::init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Run(args) => cmd_run(&config, args),
        Commands::Presets => {
            cmd_presets(&config);
            Ok(())
        }
        Commands::Catalog => {
            cmd_catalog(&config);
            Ok(())
        }
    }
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(config: &Config, args: RunArgs) -> Result<()> {
    let settings = resolve_settings(config, &args)?;

    // No device access from the terminal; the panel is simulated
    let camera: Box<dyn MediaSource> = if args.no_camera {
        Box::new(SimulatedCamera::failing(MediaError::DeviceUnavailable))
    } else {
        Box::new(SimulatedCamera::available())
    };

    if args.simulate {
        let clock = ManualClock::new(Utc::now());
        let engine = BreakEngine::from_config(clock.clone(), config, camera)?;
        let reporter = Reporter::new(args.json, false, clock.now());
        run_simulated(
            engine,
            &clock,
            settings,
            &reporter,
            config.timer.tick_interval_ms,
            args.sessions.unwrap_or(1),
        )
    } else {
        let engine = BreakEngine::from_config(SystemClock, config, camera)?;
        let reporter = Reporter::new(args.json, !args.json, Utc::now());
        run_interactive(
            engine,
            settings,
            &reporter,
            config.timer.tick_interval_ms,
            args.sessions,
        )
    }
}

/// Explicit flags win over the preset, the preset over the config file
fn resolve_settings(config: &Config, args: &RunArgs) -> Result<SessionSettings> {
    let preset = match args.preset.as_deref() {
        Some(name) => Some(config.find_preset(name).ok_or_else(|| {
            Error::Config(format!(
                "Unknown preset '{}'. Run `breakflow presets` to list them.",
                name
            ))
        })?),
        None => None,
    };

    let work = args
        .work
        .or(preset.map(|p| p.work_minutes))
        .unwrap_or(config.timer.work_minutes);
    let brk = args
        .break_minutes
        .or(preset.map(|p| p.break_minutes))
        .unwrap_or(config.timer.break_minutes);

    SessionSettings::new(&args.name, work, brk)
}

fn run_simulated(
    mut engine: BreakEngine<ManualClock>,
    clock: &ManualClock,
    settings: SessionSettings,
    reporter: &Reporter,
    tick_interval_ms: u64,
    sessions: u32,
) -> Result<()> {
    let panel = ConsumerId::new();
    let events = engine.start(settings)?;
    handle_events(&mut engine, reporter, panel, &events)?;

    let step = tick_interval_ms as i64;
    tracing::debug!("Simulating {} session(s) in {}ms steps", sessions, step);
    while engine.session_count() <= sessions {
        clock.advance_millis(step);
        let events = engine.tick();
        handle_events(&mut engine, reporter, panel, &events)?;
    }

    finish(&mut engine, reporter)
}

fn run_interactive(
    mut engine: BreakEngine<SystemClock>,
    settings: SessionSettings,
    reporter: &Reporter,
    tick_interval_ms: u64,
    sessions: Option<u32>,
) -> Result<()> {
    let panel = ConsumerId::new();
    let input = spawn_input_reader();
    let tick = Duration::from_millis(tick_interval_ms);

    if !reporter.json {
        print_keys();
    }
    let events = engine.start(settings)?;
    handle_events(&mut engine, reporter, panel, &events)?;

    'run: loop {
        // Drain everything typed since the last tick
        loop {
            match input.try_recv() {
                Ok(line) => match parse_input(&line) {
                    Input::Command(command) => {
                        apply_command(&mut engine, reporter, panel, command)?
                    }
                    Input::Help => print_keys(),
                    Input::Quit => break 'run,
                    Input::Empty => {}
                    Input::Unknown(text) => {
                        reporter.line(&format!("  ? Unknown input '{}'. Type 'h' for keys.", text))
                    }
                },
                Err(TryRecvError::Empty) => break,
                // stdin closed behaves like 'q'
                Err(TryRecvError::Disconnected) => break 'run,
            }
        }

        let events = engine.tick();
        handle_events(&mut engine, reporter, panel, &events)?;

        if sessions.is_some_and(|limit| engine.session_count() > limit) {
            break;
        }

        reporter.status(&engine.snapshot())?;
        thread::sleep(tick);
    }

    finish(&mut engine, reporter)
}

fn finish<C: Clock>(engine: &mut BreakEngine<C>, reporter: &Reporter) -> Result<()> {
    let events = engine.stop()?;
    for event in &events {
        reporter.report(engine, event)?;
    }
    Ok(())
}

/// Report events and keep the camera pointed at the break panel
fn handle_events<C: Clock>(
    engine: &mut BreakEngine<C>,
    reporter: &Reporter,
    panel: ConsumerId,
    events: &[EngineEvent],
) -> Result<()> {
    for event in events {
        reporter.report(engine, event)?;
        match event {
            EngineEvent::PhaseEntered {
                phase: Phase::Break,
                ..
            } => engine.bind_camera(panel),
            EngineEvent::PhaseEntered {
                phase: Phase::Work,
                ..
            } => engine.unbind_camera(panel),
            _ => {}
        }
    }
    Ok(())
}

// ============================================================================
// presets / catalog
// ============================================================================

fn cmd_presets(config: &Config) {
    println!("{:<12} {:>6} {:>7}", "PRESET", "WORK", "BREAK");
    for preset in &config.presets {
        println!(
            "{:<12} {:>4}m {:>6}m",
            preset.name, preset.work_minutes, preset.break_minutes
        );
    }
}

fn cmd_catalog(config: &Config) {
    let catalog = config.catalog();
    println!(
        "{} exercises, {}s each",
        catalog.len(),
        config.exercises.duration_seconds
    );
    for (i, exercise) in catalog.exercises.iter().enumerate() {
        println!();
        println!("  {}. {} ({})", i + 1, exercise.name, exercise.reps);
        println!("     {}", exercise.cue);
        println!("     Checkpoints: {}", exercise.checkpoints.join(", "));
    }
}

// ============================================================================
// Interactive input
// ============================================================================

enum Command {
    Skip,
    Rest,
    Resume,
    Done,
    Checkpoint(String),
}

enum Input {
    Command(Command),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let (key, rest) = match line.split_once(char::is_whitespace) {
        Some((key, rest)) => (key, rest.trim()),
        None => (line, ""),
    };

    match key.to_lowercase().as_str() {
        "" => Input::Empty,
        "s" => Input::Command(Command::Skip),
        "r" => Input::Command(Command::Rest),
        "g" => Input::Command(Command::Resume),
        "d" => Input::Command(Command::Done),
        "c" if !rest.is_empty() => Input::Command(Command::Checkpoint(rest.to_string())),
        "h" | "?" => Input::Help,
        "q" => Input::Quit,
        _ => Input::Unknown(line.to_string()),
    }
}

fn apply_command<C: Clock>(
    engine: &mut BreakEngine<C>,
    reporter: &Reporter,
    panel: ConsumerId,
    command: Command,
) -> Result<()> {
    let result = match command {
        Command::Skip => engine.skip_break(),
        Command::Rest => engine.enter_rest(),
        Command::Resume => engine.exit_rest(),
        Command::Done => engine.advance_exercise(),
        Command::Checkpoint(label) => {
            let label = checkpoint_label(engine, &label);
            engine.toggle_checkpoint(&label)
        }
    };

    match result {
        Ok(events) => handle_events(engine, reporter, panel, &events),
        Err(e) if e.is_rejected_command() => {
            tracing::debug!("Input rejected: {:?}", e);
            reporter.line(&format!("  ✗ {}", e));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// `c 2` means the second checkpoint of the displayed exercise
fn checkpoint_label<C: Clock>(engine: &BreakEngine<C>, input: &str) -> String {
    let by_position = input.parse::<usize>().ok().and_then(|n| {
        engine
            .current_exercise()
            .and_then(|e| e.checkpoints.get(n.checked_sub(1)?))
    });
    match by_position {
        Some(label) => label.clone(),
        None => input.to_string(),
    }
}

/// Read stdin lines on a helper thread so the tick loop never blocks
fn spawn_input_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn print_keys() {
    println!("─────────────────────────────────────────");
    println!("Type a key and press Enter:");
    println!("  s  skip the break");
    println!("  r  rest (pause exercise timer)");
    println!("  g  go on after resting");
    println!("  d  done, next exercise");
    println!("  c <label|number>  tick a checkpoint");
    println!("  q  stop and show summary");
    println!("─────────────────────────────────────────");
}

// ============================================================================
// Output
// ============================================================================

struct Reporter {
    json: bool,
    /// A status line is redrawn in place between events
    live: bool,
    started: DateTime<Utc>,
}

impl Reporter {
    fn new(json: bool, live: bool, started: DateTime<Utc>) -> Self {
        Self {
            json,
            live,
            started,
        }
    }

    fn line(&self, text: &str) {
        if self.live {
            // Clear the status line first
            print!("\r\x1b[2K");
        }
        println!("{}", text);
    }

    fn report<C: Clock>(&self, engine: &BreakEngine<C>, event: &EngineEvent) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }

        let elapsed = (engine.clock().now() - self.started).num_seconds().max(0) as u64;
        let stamp = format!("[{}]", format_mmss(elapsed));

        match event {
            EngineEvent::PhaseEntered {
                phase: Phase::Work,
                session_count,
                duration_secs,
                cause,
            } => {
                let note = match cause {
                    TransitionCause::Skipped => " (break skipped)",
                    TransitionCause::Start | TransitionCause::Expired => "",
                };
                self.line(&format!(
                    "{} ▶ Work session {} ({}){}",
                    stamp,
                    session_count,
                    format_mmss(*duration_secs),
                    note
                ));
            }
            EngineEvent::PhaseEntered {
                phase: Phase::Break,
                session_count,
                duration_secs,
                ..
            } => {
                self.line(&format!(
                    "{} ☕ Break after session {} ({})",
                    stamp,
                    session_count,
                    format_mmss(*duration_secs)
                ));
                if let Some(exercise) = engine.current_exercise() {
                    self.exercise(exercise);
                }
            }
            EngineEvent::ExerciseAdvanced { cause, .. } => {
                let how = match cause {
                    AdvanceCause::Timer => "time's up",
                    AdvanceCause::Manual => "done",
                    AdvanceCause::RestEnded => "back from rest",
                };
                self.line(&format!("{} → Next exercise ({})", stamp, how));
                if let Some(exercise) = engine.current_exercise() {
                    self.exercise(exercise);
                }
            }
            EngineEvent::RestEntered => {
                self.line(&format!(
                    "{} ⏸ Resting. Exercise timer paused, 'g' to go on.",
                    stamp
                ));
            }
            EngineEvent::CheckpointToggled { label, checked } => {
                let mark = if *checked { "x" } else { " " };
                self.line(&format!("  [{}] {}", mark, label));
            }
            EngineEvent::CameraOnline => self.line("  ◉ Camera on"),
            EngineEvent::CameraUnavailable { error } => {
                self.line(&format!("  ○ Camera off: {}", error))
            }
            EngineEvent::CameraEnded => self.line("  ○ Camera disconnected"),
            EngineEvent::Feedback { message } => self.line(&format!("  {}", message)),
            EngineEvent::Stopped { summary } => self.summary(summary),
            EngineEvent::Restarted => self.line(&format!("{} Reset", stamp)),
        }

        Ok(())
    }

    fn exercise(&self, exercise: &Exercise) {
        if !self.live {
            self.line(&format!("    {} · {}", exercise.name, exercise.reps));
            return;
        }

        self.line("");
        self.line("  ╭─────────────────────────────────────────╮");
        self.line(&format!("  │  {}", exercise.name.to_uppercase()));
        self.line("  ╰─────────────────────────────────────────╯");
        self.line(&format!("  {}", exercise.reps));
        self.line(&format!("  {}", exercise.cue));
        self.line("");
        for (i, step) in exercise.steps.iter().enumerate() {
            self.line(&format!("  {}. {}", i + 1, step));
        }
        if !exercise.steps.is_empty() {
            self.line("");
        }
        for (i, label) in exercise.checkpoints.iter().enumerate() {
            self.line(&format!("  c {} → [ ] {}", i + 1, label));
        }
        self.line("");
    }

    fn summary(&self, summary: &SessionSummary) {
        self.line("");
        self.line("╭─────────────────────────────────────────╮");
        self.line("│  Session summary");
        self.line("╰─────────────────────────────────────────╯");
        self.line(&format!("  {}", summary.user_name));
        self.line(&format!("  Sessions:            {}", summary.sessions));
        self.line(&format!("  Focus minutes:       {}", summary.focus_minutes));
        self.line(&format!("  Exercises completed: {}", summary.exercises_completed));
    }

    /// Redraw the one-line countdown in place
    fn status(&self, snapshot: &Snapshot) -> Result<()> {
        if !self.live {
            return Ok(());
        }

        let text = match snapshot.phase {
            Some(Phase::Work) => format!(
                "▶ Work {} · {} left · {:>3.0}%",
                snapshot.session_count,
                format_mmss(snapshot.remaining_secs),
                snapshot.phase_progress() * 100.0
            ),
            Some(Phase::Break) => {
                let (name, total_checks) = snapshot
                    .current_exercise
                    .as_ref()
                    .map_or(("", 0), |e| (e.name.as_str(), e.checkpoints.len()));
                let exercise_timer = match snapshot.exercise_remaining_secs {
                    Some(secs) => format_mmss(secs),
                    None => "resting".to_string(),
                };
                format!(
                    "☕ Break {} left · {} {} · {}/{} checked · camera {}",
                    format_mmss(snapshot.remaining_secs),
                    name,
                    exercise_timer,
                    snapshot.checked_checkpoints.len(),
                    total_checks,
                    if snapshot.camera_online { "on" } else { "off" }
                )
            }
            None => snapshot.state.to_string(),
        };

        print!("\r\x1b[2K{}", text);
        io::stdout().flush()?;
        Ok(())
    }
}
