//! Console host: runs a demo flow under the debugger and reads operator
//! commands from stdin.
//!
//! Usage: `flowdebug-rs [config.toml|config.json]`

use anyhow::{anyhow, Context};
use flowdebug_rs::{
    config::{default_config_path, DebugConfig},
    debug::{
        BlockedState, BreakpointRegistry, BreakpointSummary, ChannelSink, DebugBridge,
        DebugCommand, DebugEvent, ExecutionController, ExecutionSnapshot,
    },
    flow::{
        nodes::{CollectorActor, ScriptActor, SetVariableActor, SourceActor},
        Flow, FlowOutcome,
    },
    scripting::ScriptEngine,
    types::ViewKind,
    ScopeRestriction,
};
use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const HELP: &str = "commands: c=resume s=step p=pause t=toggle active breakpoint \
                    d=disable/enable debugger b=breakpoints ?=state q=stop h=help";

fn main() -> anyhow::Result<()> {
    let config_path: Option<PathBuf> = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(default_config_path);
    let config = match &config_path {
        Some(path) => DebugConfig::load_or_default(path),
        None => DebugConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.controller.log_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting flowdebug-rs");
    if let Some(path) = &config_path {
        tracing::info!("Config: {}", path.display());
    }

    let engine = Arc::new(ScriptEngine::new());
    let (bridge, cmd_rx, event_tx) =
        DebugBridge::new(config.controller.effective_capacity());
    let controller = Arc::new(ExecutionController::new(
        Arc::new(BreakpointRegistry::new()),
        Arc::new(ChannelSink::new(event_tx.clone())),
    ));

    let installed = config
        .apply_to(&controller, &engine)
        .context("Installing configured breakpoints")?;
    if installed == 0 && !config.controller.step_mode {
        // Nothing would ever block without a breakpoint; start stepping instead.
        tracing::info!("No breakpoints configured, starting in step mode");
        controller.toggle_step_mode(true);
    }

    let mut flow = demo_flow(Arc::clone(&engine))?;

    let server = {
        let controller = Arc::clone(&controller);
        thread::Builder::new()
            .name("debug-control".into())
            .spawn(move || controller.serve(cmd_rx, event_tx))
            .context("Failed to spawn control thread")?
    };

    let printer = {
        let events = bridge.event_rx.clone();
        let engine = Arc::clone(&engine);
        thread::Builder::new()
            .name("debug-events".into())
            .spawn(move || {
                for event in events.iter() {
                    if !print_event(&event, &engine) {
                        break;
                    }
                }
            })
            .context("Failed to spawn event thread")?
    };

    // Stdin is read on its own thread so the host can exit when the flow ends.
    {
        let cmd_tx = bridge.cmd_tx.clone();
        thread::Builder::new()
            .name("operator-input".into())
            .spawn(move || {
                println!("{}", HELP);
                let mut disabled = false;
                for line in std::io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    let cmd = match line.trim() {
                        "c" => DebugCommand::Resume,
                        "s" => DebugCommand::Step,
                        "p" => DebugCommand::Pause,
                        "t" => DebugCommand::ToggleActiveBreakpoint,
                        "d" => {
                            disabled = !disabled;
                            DebugCommand::SetDisabled(disabled)
                        }
                        "b" | "?" => DebugCommand::RequestState,
                        "q" => DebugCommand::Stop("operator quit".into()),
                        "" => continue,
                        _ => {
                            println!("{}", HELP);
                            continue;
                        }
                    };
                    if cmd_tx.send(cmd).is_err() {
                        break;
                    }
                }
            })
            .context("Failed to spawn input thread")?;
    }

    let runner = {
        let controller = Arc::clone(&controller);
        thread::Builder::new()
            .name("flow-exec".into())
            .spawn(move || flow.run(controller.as_ref()))
            .context("Failed to spawn flow thread")?
    };

    let outcome = runner
        .join()
        .map_err(|_| anyhow!("Flow thread panicked"))?
        .context("Flow failed")?;
    match &outcome {
        FlowOutcome::Completed { executions } => {
            println!("flow completed after {} executions", executions)
        }
        FlowOutcome::Stopped(reason) => println!("flow stopped: {}", reason),
    }

    bridge.shutdown();
    server
        .join()
        .map_err(|_| anyhow!("Control thread panicked"))?;
    printer
        .join()
        .map_err(|_| anyhow!("Event thread panicked"))?;

    tracing::info!("flowdebug-rs shutdown complete");
    Ok(())
}

/// `Demo.Numbers` feeds `Demo.Math.Square`, whose results are remembered in
/// `last` and collected. `Demo.Math` only admits breakpoints inside itself.
fn demo_flow(engine: Arc<ScriptEngine>) -> anyhow::Result<Flow> {
    let mut flow = Flow::with_engine("Demo", engine);
    let root = flow.root_path().clone();
    let math = flow.add_group(
        &root,
        "Math",
        Some(ScopeRestriction::subtree(root.child("Math"))),
    )?;

    let square = ScriptActor::new(flow.engine(), "token * token")?;
    let (collector, _tokens) = CollectorActor::new();

    let numbers = flow.add_actor(&root, "Numbers", SourceActor::counting(1..4))?;
    let square = flow.add_actor(&math, "Square", square)?;
    let remember = flow.add_actor(&math, "Remember", SetVariableActor::new("last"))?;
    let sink = flow.add_actor(&root, "Sink", collector)?;

    flow.add_edge(numbers, square)?;
    flow.add_edge(square, remember)?;
    flow.add_edge(remember, sink)?;
    Ok(flow)
}

/// Print one event; returns false once the controller shut down.
fn print_event(event: &DebugEvent, engine: &ScriptEngine) -> bool {
    match event {
        DebugEvent::BreakpointReached { state, views } => print_block(state, views, engine),
        DebugEvent::State(snapshot) => print_snapshot(snapshot),
        DebugEvent::BreakpointList(list) => print_breakpoints(list),
        DebugEvent::CommandFailed(message) => println!("error: {}", message),
        DebugEvent::Stopped(reason) => println!("stopped: {}", reason),
        DebugEvent::Shutdown => return false,
    }
    true
}

fn print_block(state: &BlockedState, views: &BTreeSet<ViewKind>, engine: &ScriptEngine) {
    println!(
        "[{}] blocked at {} {} on '{}'",
        state.thread,
        state.actor_path,
        state.hook_name(),
        state.breakpoint.describe()
    );
    if let Some(token) = &state.token {
        println!("  token: {}", token);
    }
    if views.contains(&ViewKind::Variables) {
        for (name, value) in &state.variables {
            println!("  {} = {}", name, value);
        }
    }
    for watch in state.breakpoint.watches() {
        match engine.evaluate_watch(&watch, state) {
            Ok(value) => println!("  watch {} = {}", watch.expression, value),
            Err(e) => println!("  watch {} failed: {}", watch.expression, e),
        }
    }
}

fn print_snapshot(snapshot: &ExecutionSnapshot) {
    print!("mode: {:?}", snapshot.mode);
    if let (Some(path), Some(hook)) = (&snapshot.actor_path, snapshot.hook_name()) {
        print!(" at {} {}", path, hook);
    }
    if snapshot.step_mode {
        print!(" (step mode)");
    }
    if snapshot.disabled {
        print!(" (debugger disabled)");
    }
    if let Some(reason) = &snapshot.stopped {
        print!(" (stopped: {})", reason);
    }
    println!();
}

fn print_breakpoints(list: &[BreakpointSummary]) {
    if list.is_empty() {
        println!("no breakpoints");
    }
    for bp in list {
        println!(
            "  #{} {}{}{} hits={}",
            bp.index,
            bp.description,
            if bp.disabled { " [disabled]" } else { "" },
            if bp.one_off { " [one-off]" } else { "" },
            bp.trigger_count
        );
    }
}
