//! Line-oriented adventure loop.
//!
//! Protocol:
//! - Story text and questions are printed as they are generated
//! - Each non-empty input line answers the current question
//! - Lines starting with `#` are commands (status, quit, help)

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use story_core::{
    ClaudeGenerator, ConfigError, LearningFocus, PipelineConfig, SessionError, StorySession, Theme,
};

/// Everything needed to start one adventure.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub child_name: String,
    pub theme: Theme,
    pub learning_focus: LearningFocus,
    pub config_path: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            child_name: "Explorer".to_string(),
            theme: Theme::Dragons,
            learning_focus: LearningFocus::Math,
            config_path: None,
        }
    }
}

impl RunConfig {
    /// Parse command line arguments. Unknown flags are ignored.
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--name" => {
                    if let Some(name) = args.get(i + 1) {
                        config.child_name = name.clone();
                        i += 1;
                    }
                }
                "--theme" => {
                    if let Some(theme) = args.get(i + 1) {
                        config.theme = theme.parse()?;
                        i += 1;
                    }
                }
                "--focus" => {
                    if let Some(focus) = args.get(i + 1) {
                        config.learning_focus = focus.parse()?;
                        i += 1;
                    }
                }
                "--config" => {
                    if let Some(path) = args.get(i + 1) {
                        config.config_path = Some(PathBuf::from(path));
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }

        Ok(config)
    }

    fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        match &self.config_path {
            Some(path) => PipelineConfig::from_file(path),
            None => Ok(PipelineConfig::default()),
        }
    }
}

enum Input {
    Answer(String),
    Quit,
}

/// Run one adventure against Claude.
pub async fn run(config: RunConfig) -> Result<(), SessionError> {
    let pipeline = config.pipeline_config()?;
    let generator = Arc::new(ClaudeGenerator::from_env()?.with_timeout(pipeline.retry.attempt_timeout()));
    let client = Arc::new(pipeline.build_client(generator, Arc::new(pipeline.build_cache())));

    let mut session = StorySession::new(&config.child_name, config.theme, config.learning_focus, client)?
        .with_settings(pipeline.session.clone())?
        .with_thresholds(pipeline.difficulty);

    println!("=== {} and the {} adventure ===", session.child_name(), session.theme());
    println!("Learning focus: {}", session.learning_focus().label());
    println!("Type your answer after each question. #help for commands.");
    println!();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    for index in 0..pipeline.session.total_parts {
        print!("[GENERATING]");
        io::stdout().flush().ok();
        let part = session.start_part(index).await?;
        print!("\r            \r");

        println!("[PART {} of {} | {}]", index + 1, pipeline.session.total_parts, part.difficulty_at_time);
        println!("{}", part.content.story_text);
        println!();
        println!("[QUESTION] {}", part.content.question);
        io::stdout().flush().ok();

        let answer = match read_answer(&mut lines, &session) {
            Input::Answer(answer) => answer,
            Input::Quit => {
                println!("Goodbye!");
                return Ok(());
            }
        };

        let outcome = session.submit_answer(index, &answer)?;
        if outcome.is_correct {
            println!("[CORRECT] Great job, {}!", session.child_name());
        } else {
            println!("[TRY AGAIN NEXT TIME] The answer was: {}", outcome.correct_answer);
        }
        if !outcome.explanation.is_empty() {
            println!("[FOR PARENTS] {}", outcome.explanation);
        }
        println!();
    }

    print_status(&session);
    println!("The End!");
    Ok(())
}

fn read_answer(lines: &mut impl Iterator<Item = io::Result<String>>, session: &StorySession) -> Input {
    loop {
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Error reading input: {e}");
                return Input::Quit;
            }
            None => return Input::Quit,
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.strip_prefix('#').map(str::trim) {
            Some("quit") | Some("exit") => return Input::Quit,
            Some("status") => print_status(session),
            Some("help") => {
                println!("[HELP]");
                println!("  #status - Show progress and difficulty");
                println!("  #quit   - Stop the adventure");
                println!("  (anything else answers the question)");
            }
            Some(_) => println!("[ERROR] Unknown command. Type #help for help."),
            None => return Input::Answer(line.to_string()),
        }
        io::stdout().flush().ok();
    }
}

fn print_status(session: &StorySession) {
    let summary = session.summary();
    println!("[STATUS]");
    println!("  Progress: {}%", summary.progress_percent);
    println!("  Correct: {}/{}", summary.correct, summary.answered);
    println!("  Current level: {}", summary.current_level);
    let path: Vec<String> = summary.difficulty_path.iter().map(|d| d.to_string()).collect();
    println!("  Levels so far: {}", path.join(" -> "));
    if !summary.degraded_parts.is_empty() {
        println!("  Backup story parts: {}", summary.degraded_parts.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_args(&args(&["story"])).unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn test_parse_all_flags() {
        let config = RunConfig::from_args(&args(&[
            "story",
            "--name",
            "Maya",
            "--theme",
            "Pirates",
            "--focus",
            "problem-solving",
            "--config",
            "story.toml",
        ]))
        .unwrap();

        assert_eq!(config.child_name, "Maya");
        assert_eq!(config.theme, Theme::Pirates);
        assert_eq!(config.learning_focus, LearningFocus::ProblemSolving);
        assert_eq!(config.config_path, Some(PathBuf::from("story.toml")));
    }

    #[test]
    fn test_unknown_theme_rejected() {
        let err = RunConfig::from_args(&args(&["story", "--theme", "robots"])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownVariant { .. }));
    }
}
