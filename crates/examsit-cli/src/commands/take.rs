//! The `examsit take` command: the interactive assessment loop.
//!
//! One task owns the session and interleaves two event sources: a
//! once-per-second tick (only while the countdown is running) and lines
//! read from stdin. Answer keys, navigation, submit, and pause/resume all
//! arrive as plain text commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Duration, MissedTickBehavior};

use examsit_client::{load_config_from, HttpAssessmentApi};
use examsit_core::api::AssessmentApi;
use examsit_core::error::SessionError;
use examsit_core::session::{ExamSession, FinalizeOutcome, TickOutcome};

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Answer(String),
    Next,
    Prev,
    Goto(usize),
    Submit,
    Pause,
    Resume,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let lower = line.to_lowercase();
        match lower.as_str() {
            "n" | "next" => return Command::Next,
            "p" | "prev" | "previous" => return Command::Prev,
            "submit" => return Command::Submit,
            "pause" => return Command::Pause,
            "resume" => return Command::Resume,
            "h" | "help" | "?" => return Command::Help,
            "q" | "quit" | "exit" => return Command::Quit,
            _ => {}
        }
        if let Some(rest) = lower.strip_prefix("goto ") {
            if let Ok(n) = rest.trim().parse::<usize>() {
                // 1-based on the command line.
                return Command::Goto(n.saturating_sub(1));
            }
        }
        if lower.len() == 1 && matches!(lower.chars().next(), Some('a'..='e')) {
            return Command::Answer(lower.to_uppercase());
        }
        Command::Unknown(line.to_string())
    }
}

enum Flow {
    Continue,
    Done,
}

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let api: Arc<dyn AssessmentApi> = Arc::new(HttpAssessmentApi::new(&config));

    let mut session = match ExamSession::begin(api).await {
        Ok(session) => session,
        Err(SessionError::AttemptClosed) => {
            println!("This assessment has already been taken; see the existing result.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if session.is_completed() {
        println!("Attempt {} is already complete.", session.attempt_id());
        return Ok(());
    }

    print_section(&session);
    print_question(&session);
    print_help();

    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick(), if session.timer_running() => {
                match session.tick().await {
                    Ok(TickOutcome::Idle) => {}
                    Ok(TickOutcome::Running { remaining }) => {
                        if remaining % 60 == 0 || remaining <= 10 {
                            println!("  [{} left]", format_clock(remaining));
                        }
                    }
                    Ok(TickOutcome::SectionAdvanced) => {
                        println!("\nTime is up; unanswered questions were defaulted.");
                        print_section(&session);
                        print_question(&session);
                    }
                    Ok(TickOutcome::AttemptCompleted) => {
                        println!("\nTime is up. The assessment is complete.");
                        break;
                    }
                    Err(e) => {
                        // The next tick retries; a transient fetch failure
                        // must not kill the session.
                        tracing::warn!("tick failed: {e}");
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_command(&mut session, Command::parse(&line)).await? {
                    Flow::Continue => {}
                    Flow::Done => break,
                }
            }
        }
    }
    Ok(())
}

async fn handle_command(session: &mut ExamSession, command: Command) -> Result<Flow> {
    match command {
        Command::Empty => {}
        Command::Help => print_help(),
        Command::Quit => {
            println!("Leaving; your progress is saved and the timer keeps running server-side.");
            return Ok(Flow::Done);
        }
        Command::Answer(key) => {
            let Some((question_id, index, count)) = current_question(session) else {
                println!("No active question.");
                return Ok(Flow::Continue);
            };
            match session.record_answer(question_id, &key) {
                Ok(()) => {
                    println!("Recorded {key}.");
                    if index + 1 < count {
                        session.goto_question(index + 1)?;
                        print_question(session);
                    } else {
                        println!("Last question answered. Type 'submit' to finish the section.");
                    }
                }
                Err(SessionError::SectionLocked) => {
                    println!("This section is closed; answers can no longer be changed.");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Next => {
            if let Some((_, index, _)) = current_question(session) {
                session.goto_question(index + 1)?;
                print_question(session);
            }
        }
        Command::Prev => {
            if let Some((_, index, _)) = current_question(session) {
                session.goto_question(index.saturating_sub(1))?;
                print_question(session);
            }
        }
        Command::Goto(index) => {
            session.goto_question(index)?;
            print_question(session);
        }
        Command::Submit => match session.finalize_section(false).await {
            Ok(FinalizeOutcome::InFlight) => {}
            Ok(FinalizeOutcome::SectionAdvanced) => {
                print_section(session);
                print_question(session);
            }
            Ok(FinalizeOutcome::AttemptCompleted) => {
                println!("\nAll sections finished. The assessment is complete.");
                return Ok(Flow::Done);
            }
            Err(SessionError::IncompleteAnswers { answered, total }) => {
                println!("Only {answered} of {total} questions answered; answer the rest first.");
            }
            Err(e) => {
                println!("Submission failed: {e}. Your answers are kept; type 'submit' to retry.");
            }
        },
        Command::Pause => match session.pause().await {
            Ok(state) => println!("Paused at {}.", format_clock(state.remaining_seconds)),
            Err(e) => println!("Pause failed: {e}"),
        },
        Command::Resume => match session.resume().await {
            Ok(state) => println!("Resumed with {} left.", format_clock(state.remaining_seconds)),
            Err(e) => println!("Resume failed: {e}"),
        },
        Command::Unknown(text) => {
            println!("Unrecognized input '{text}'; type 'help' for commands.");
        }
    }
    Ok(Flow::Continue)
}

fn current_question(session: &ExamSession) -> Option<(i64, usize, usize)> {
    let active = session.active()?;
    let question = active.questions.get(active.question_index)?;
    Some((question.id, active.question_index, active.questions.len()))
}

fn print_section(session: &ExamSession) {
    if let Some(active) = session.active() {
        println!(
            "\n=== Section {}: {} ({} questions, {}) ===",
            active.section.order_index,
            active.section.name,
            active.questions.len(),
            format_clock(active.timer.remaining_seconds()),
        );
    }
}

fn print_question(session: &ExamSession) {
    let Some(active) = session.active() else {
        return;
    };
    let Some(question) = active.questions.get(active.question_index) else {
        return;
    };
    println!(
        "\nQ{}/{}: {}",
        active.question_index + 1,
        active.questions.len(),
        question.text
    );
    for option in &question.options {
        let marker = if active.answers.get(&question.id) == Some(&option.key) {
            "*"
        } else {
            " "
        };
        println!(" {marker} {}) {}", option.key, option.label);
    }
}

fn print_help() {
    println!(
        "\nCommands: A-E answer, next/prev, goto N, submit, pause, resume, help, quit"
    );
}

fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
