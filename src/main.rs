//! forms-demo: hosts a ribbon form in the terminal or replays scripted input
//!
//! `run` takes over the terminal (Ctrl+Q quits, Ctrl+V pastes). `replay`
//! drives the same form over the headless platform and prints every semantic
//! event the script produced, followed by the final window state.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::{error, info};
use thiserror::Error;

use forms::config::FormsConfig;
use forms::error::{ConfigError, PlatformError, ScriptError, TreeError};
use forms::geometry::Padding;
use forms::platform::headless::{HeadlessPlatform, InputScript};
use forms::platform::WindowEvent;
use forms::ui::widgets::{Panel, RibbonItem, RibbonItemGroup, RibbonTabPage, TitleBar, TAB_PAGE_HEIGHT};
use forms::ui::{ControlStyle, Dock, Theme};
use forms::window::{StartPosition, Window};

#[derive(Parser, Debug)]
#[command(name = "forms-demo", version, about = "Ribbon form demo for the forms toolkit")]
struct Cli {
    /// Configuration file (defaults to ./forms.toml when present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write log output to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Client width in device-independent units
    #[arg(long)]
    width: Option<i32>,

    #[arg(long)]
    height: Option<i32>,

    /// manual, center-screen or center-parent
    #[arg(long, value_name = "POSITION")]
    start_position: Option<StartPosition>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Host the demo form in this terminal
    Run,
    /// Replay a raw-input script against a headless window
    Replay {
        /// Script file, one `<ms> <event> [args]` per line
        script: PathBuf,
    },
}

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("cannot open log file {}: {source}", path.display())]
    LogFile { path: PathBuf, source: io::Error },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(cli.log_file.as_deref(), matches!(cli.command, Command::Run)) {
        eprintln!("forms-demo: {}", err);
        return ExitCode::FAILURE;
    }
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            eprintln!("forms-demo: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Log to `log_file` when given. Without one, the terminal host stays silent
/// unless RUST_LOG asks for output, since stderr shares the screen.
fn init_logging(log_file: Option<&Path>, owns_terminal: bool) -> Result<(), DemoError> {
    let default_filter = if owns_terminal && log_file.is_none() { "off" } else { "info" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if let Some(path) = log_file {
        let file = File::create(path).map_err(|source| DemoError::LogFile { path: path.to_path_buf(), source })?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn run(cli: Cli) -> Result<(), DemoError> {
    let mut config = match &cli.config {
        Some(path) => FormsConfig::load_from_file(path)?,
        None => FormsConfig::load_or_default(),
    };
    config.merge_with_env();
    if let Some(width) = cli.width {
        config.window.width = width;
    }
    if let Some(height) = cli.height {
        config.window.height = height;
    }
    if let Some(position) = cli.start_position {
        config.window.start_position = position;
    }
    if config.window.title.is_empty() {
        config.window.title = "Forms Demo".to_string();
    }
    info!("Starting forms-demo ({:?}), window {:?}", cli.command, config.window.size());

    match cli.command {
        Command::Run => run_terminal(config),
        Command::Replay { script } => replay(config, &script),
    }
}

#[cfg(unix)]
fn run_terminal(mut config: FormsConfig) -> Result<(), DemoError> {
    use forms::platform::terminal::TerminalPlatform;

    let mut platform = TerminalPlatform::new()?;
    // The terminal is small; never open larger than it
    let screen = platform.screen_rect();
    config.window.width = config.window.width.min(screen.width);
    config.window.height = config.window.height.min(screen.height);

    let mut window = Window::with_config(&mut platform, &config)?;
    let ribbon_height = TAB_PAGE_HEIGHT.min(config.window.height / 3);
    build_form(&mut window, ribbon_height)?;
    window.on_closed(|| info!("Window closed"));
    window.show();
    platform.run(&mut window)?;
    Ok(())
}

#[cfg(not(unix))]
fn run_terminal(_config: FormsConfig) -> Result<(), DemoError> {
    Err(PlatformError::Unsupported("the terminal host needs a unix tty".into()).into())
}

fn replay(config: FormsConfig, path: &Path) -> Result<(), DemoError> {
    let script = InputScript::load(path)?;
    let mut platform = HeadlessPlatform::new();
    let mut window = Window::with_config(&mut platform, &config)?;
    build_form(&mut window, TAB_PAGE_HEIGHT)?;
    window.show();

    let state = platform.last_window();
    let start = Instant::now();
    for step in script.steps() {
        let ms = step.at.as_millis();
        for event in window.handle_input(&step.input, start + step.at) {
            println!("{:>6} ms  {:?}", ms, event);
        }
        // Repaint whatever the step damaged, as a platform paint callback would
        let damage = state.as_ref().map(|s| std::mem::take(&mut s.borrow_mut().invalidated)).unwrap_or_default();
        if let Some(rect) = damage.into_iter().reduce(|a, b| a.union(&b)) {
            window.handle_event(WindowEvent::Paint(rect));
        }
    }

    println!("steps:        {}", script.steps().len());
    println!("title:        {}", window.text());
    println!("location:     {:?}", window.location());
    println!("client size:  {:?}", window.client_size());
    println!("state:        {:?}", window.window_state());
    println!("closed:       {}", window.is_closed());
    println!("hovered:      {:?}", window.adapter().hovered());
    println!("focused:      {:?}", window.adapter().focused());
    if let Some(state) = state {
        let state = state.borrow();
        println!("move drags:   {}", state.move_drags);
        println!("frames:       {}", state.frames);
    }
    Ok(())
}

/// Title bar, one ribbon tab page and a document area filling the rest
fn build_form(window: &mut Window, ribbon_height: i32) -> Result<(), DemoError> {
    let title = window.text().to_string();
    let tree = window.controls_mut();
    tree.add_root(TitleBar::new(title));

    let page = tree.add_root(RibbonTabPage::new("Home").with_height(ribbon_height));
    let groups: [(&str, &[(&str, i32)]); 3] = [
        ("Clipboard", &[("Paste", 40), ("Cut", 28), ("Copy", 28)]),
        ("Font", &[("Bold", 24), ("Italic", 24), ("Underline", 24)]),
        ("Editing", &[("Find", 36), ("Replace", 36)]),
    ];
    for (group_text, items) in groups {
        let group = tree.add_child(page, RibbonItemGroup::new(group_text))?;
        for &(item_text, width) in items {
            let name = format!("{}/{}", group_text, item_text);
            let item = RibbonItem::new(item_text, width).on_click(move |_| info!("[Demo] {} clicked", name));
            tree.add_child(group, item)?;
        }
    }

    let document = Panel::new()
        .with_dock(Dock::Fill)
        .with_padding(Padding::all(4))
        .with_style(ControlStyle::new().with_background(Theme::MODERN.control_background));
    tree.add_root(document);
    Ok(())
}
