use anyhow::Result;
use std::fs::OpenOptions;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::warn;

const EXIT_WORDS: [&str; 4] = ["exit", "q", "Q", "bye"];

pub struct Repl {
    history: Option<PathBuf>,
}

impl Repl {
    /// `history` is a file that every entered line is appended to.
    pub fn new(history: Option<PathBuf>) -> Self {
        Self { history }
    }

    /// Read lines until EOF or an exit word and hand each one, split on
    /// whitespace, to `execute`. Errors are printed and the loop goes on.
    pub fn run<R, W, F>(&self, input: &mut R, output: &mut W, mut execute: F) -> Result<()>
    where
        R: BufRead,
        W: Write,
        F: FnMut(Vec<String>) -> Result<()>,
    {
        loop {
            write!(output, "> ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(());
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if EXIT_WORDS.contains(&line) {
                writeln!(output, "Goodbye!")?;
                return Ok(());
            }
            self.remember(line);

            let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if let Err(e) = execute(words) {
                writeln!(output, "Error: {:#}", e)?;
            }
        }
    }

    fn remember(&self, line: &str) {
        let Some(path) = &self.history else {
            return;
        };
        let appended = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{}", line));
        if let Err(e) = appended {
            warn!("could not write history {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_runs_lines_until_exit_word() {
        let mut input = Cursor::new("list\n\nshow 4\nbye\nlist\n");
        let mut output = Vec::new();
        let mut seen = Vec::new();

        Repl::new(None)
            .run(&mut input, &mut output, |words| {
                seen.push(words);
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, vec![vec!["list".to_string()], vec!["show".to_string(), "4".to_string()]]);
    }

    #[test]
    fn test_errors_do_not_stop_the_loop() {
        let mut input = Cursor::new("done x\nlist\n");
        let mut output = Vec::new();
        let mut calls = 0;

        Repl::new(None)
            .run(&mut input, &mut output, |words| {
                calls += 1;
                if words[0] == "done" {
                    anyhow::bail!("invalid value 'x'");
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(calls, 2);
        assert!(String::from_utf8(output).unwrap().contains("Error: invalid value 'x'"));
    }

    #[test]
    fn test_history_is_appended() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cmd.history");
        let mut input = Cursor::new("list\nprojects\nq\n");
        let mut output = Vec::new();

        Repl::new(Some(path.clone())).run(&mut input, &mut output, |_| Ok(())).unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "list\nprojects\n");
    }
}
