//! Line-oriented station console.
//!
//! Reads technician commands from stdin and drives the inspection engine.
//! A timer tick refreshes the elapsed-time line on interactive terminals.

use anyhow::{Context, Result, bail};
use qcflow_core::{
    AdvanceResult, Answer, BlockReason, Category, EngineView, InspectionEngine, Slot,
    SubmitOutcome,
};
use std::io::{IsTerminal, Write};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  y [CODE...]        answer yes to the current step (scan steps need codes)
  n                  answer no
  code <1|2> <CODE>  set the battery code of an item (step 14)
  cat <1|2> <A-E>    toggle the category of an item (step 14)
  done               finish the category assignment (step 14)
  status             show the current step and timer
  checkout           abandon the unit and check out
  help               show this help
  quit               leave, keeping the session for --resume";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Yes(Vec<String>),
    No,
    Code(Slot, String),
    Category(Slot, Category),
    Done,
    Status,
    Checkout,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `None`.
fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "y" | "yes" | "si" => Command::Yes(words.map(str::to_string).collect()),
        "n" | "no" => Command::No,
        "code" => {
            let slot = parse_slot(words.next())?;
            let code = words.next().context("usage: code <1|2> <CODE>")?;
            Command::Code(slot, code.to_string())
        }
        "cat" | "category" => {
            let slot = parse_slot(words.next())?;
            let category = words
                .next()
                .context("usage: cat <1|2> <A-E>")?
                .parse::<Category>()?;
            Command::Category(slot, category)
        }
        "done" => Command::Done,
        "status" | "s" => Command::Status,
        "checkout" => Command::Checkout,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => bail!("unknown command '{other}', type 'help'"),
    };
    Ok(Some(command))
}

fn parse_slot(word: Option<&str>) -> Result<Slot> {
    Ok(word.context("missing item number (1 or 2)")?.parse::<Slot>()?)
}

/// Console state around the engine.
struct StationConsole {
    engine: InspectionEngine,
    should_quit: bool,
}

impl StationConsole {
    fn new(engine: InspectionEngine) -> Self {
        Self {
            engine,
            should_quit: false,
        }
    }

    /// Handles one input line, printing the result.
    async fn handle_line(&mut self, line: &str) {
        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return,
            Err(e) => {
                println!("! {e:#}");
                return;
            }
        };

        if let Err(e) = self.execute(command).await {
            println!("! {e:#}");
        }
    }

    async fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Yes(codes) => {
                let step = self.engine.view()?.step.number.get();
                let outcome = self.engine.submit(step, Answer::with_codes(codes))?;
                self.report(&outcome)?;
            }
            Command::No => {
                let step = self.engine.view()?.step.number.get();
                let outcome = self.engine.submit(step, Answer::no())?;
                self.report(&outcome)?;
            }
            Command::Code(slot, code) => {
                self.engine.set_category_code(slot, &code)?;
                println!("  {slot} code: {code}");
            }
            Command::Category(slot, category) => {
                match self.engine.toggle_category(slot, category)? {
                    Some(selected) => println!("  {slot} category: {selected}"),
                    None => println!("  {slot} category cleared"),
                }
            }
            Command::Done => {
                let outcome = self.engine.complete_categories()?;
                self.report(&outcome)?;
            }
            Command::Status => print_view(&self.engine.view()?),
            Command::Checkout => {
                self.engine.check_out().await?;
                println!("Checked out.");
                self.should_quit = true;
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => self.should_quit = true,
        }
        Ok(())
    }

    fn report(&self, outcome: &SubmitOutcome) -> Result<()> {
        for warning in &outcome.warnings {
            println!("  warning: {warning}");
        }
        match &outcome.result {
            AdvanceResult::Blocked {
                reason: BlockReason::NegativeAnswer,
                ..
            } => {
                if let Some(guidance) = &outcome.guidance {
                    println!("\n{}\n", guidance.message);
                }
            }
            AdvanceResult::Blocked {
                reason: BlockReason::CategorySubmissionPending,
                ..
            } => println!("  finish the category assignment first (code, cat, done)"),
            AdvanceResult::Blocked { .. } => println!("  submission ignored"),
            AdvanceResult::CategorySubmissionOpened { .. } => {
                println!("  classify both batteries: code <1|2> <CODE>, cat <1|2> <A-E>, done");
                return Ok(());
            }
            AdvanceResult::Advanced { .. } | AdvanceResult::CycleComplete { .. } => {}
        }

        if let Some(cycle) = &outcome.cycle {
            println!(
                "\n✔ Unit complete in {}s, counter {} (next session {})\n",
                cycle.duration_seconds, cycle.production_counter, cycle.next_session
            );
        }
        print_prompt(&self.engine.view()?);
        Ok(())
    }
}

fn print_prompt(view: &EngineView) {
    let step = view.step;
    let mut line = format!("[{}/21 {}] {}", step.number, step.phase, step.prompt);
    if step.scan_count() > 0 {
        line.push_str(&format!(" (scan {} code(s))", step.scan_count()));
    }
    if step.requires_multiple_operators {
        line.push_str(" [2 operators]");
    }
    println!("{line}");
}

fn print_view(view: &EngineView) {
    println!("Project:   {}", view.project_id);
    println!("Session:   {}", view.session_id);
    println!("Counter:   {}", view.production_counter);
    println!("Elapsed:   {}", view.timer.elapsed);
    println!("Per box:   {}", view.timer.summary);
    if view.checkpoint_failures > 0 {
        println!("Checkpoints not recorded: {}", view.checkpoint_failures);
    }
    if let Some(draft) = &view.draft {
        for (slot, item) in [(Slot::Item1, &draft.item1), (Slot::Item2, &draft.item2)] {
            let category = item.category.map_or("-".to_string(), |c| c.to_string());
            println!("  {slot}: code '{}' category {category}", item.code);
        }
    }
    print_prompt(view);
}

/// Runs the console until `quit`, `checkout`, or end of input.
pub async fn run_station(engine: InspectionEngine, tick_ms: u64) -> Result<()> {
    let mut console = StationConsole::new(engine);
    let interactive = std::io::stdout().is_terminal();

    println!("Type 'help' for commands.");
    print_view(&console.engine.view()?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(tick_ms));

    while !console.should_quit {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("failed to read input")? {
                    Some(line) => console.handle_line(&line).await,
                    None => break,
                }
            }
            _ = ticker.tick(), if interactive => {
                if let Ok(display) = console.engine.tick() {
                    print!("\r  elapsed {}  per box {}  ", display.elapsed, display.summary);
                    std::io::stdout().flush().ok();
                }
            }
        }
    }

    console.engine.flush_checkpoints().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answers() {
        assert_eq!(parse_command("y").unwrap(), Some(Command::Yes(vec![])));
        assert_eq!(
            parse_command("y BAT1 BAT2").unwrap(),
            Some(Command::Yes(vec!["BAT1".into(), "BAT2".into()]))
        );
        assert_eq!(parse_command("  N ").unwrap(), Some(Command::No));
        assert_eq!(parse_command("").unwrap(), None);
    }

    #[test]
    fn test_parse_category_commands() {
        assert_eq!(
            parse_command("code 2 B2").unwrap(),
            Some(Command::Code(Slot::Item2, "B2".into()))
        );
        assert_eq!(
            parse_command("cat 1 c").unwrap(),
            Some(Command::Category(Slot::Item1, Category::C))
        );
        assert_eq!(parse_command("done").unwrap(), Some(Command::Done));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("cat 1 Z").is_err());
        assert!(parse_command("code 3 X").is_err());
        assert!(parse_command("code 1").is_err());
        assert!(parse_command("launch").is_err());
    }
}
