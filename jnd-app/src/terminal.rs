use std::io::{BufRead, ErrorKind, Write};

use jnd_core::{Result, SessionKind, TaskKind};
use jnd_experiment::{ChoicePrompt, Notice, Presenter};

/// Line-based presenter: the participant types `l` or `r` and Enter.
pub struct TerminalPresenter<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPresenter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(std::io::Error::new(ErrorKind::UnexpectedEof, "input closed").into());
        }
        Ok(line.trim().to_ascii_lowercase())
    }

    fn wait_for_enter(&mut self) -> Result<()> {
        write!(self.output, "\n[Enter] to continue ")?;
        self.output.flush()?;
        self.read_line().map(|_| ())
    }
}

fn instructions(task: TaskKind, kind: SessionKind) -> String {
    let item = if task == TaskKind::Pause {
        "word group"
    } else {
        "name"
    };
    let block = match kind {
        SessionKind::Practice => "a few practice trials with feedback",
        SessionKind::Trial => "the test runs, without feedback",
    };
    format!(
        "You will hear the same {item} three times.\n\
         One of them differs from the other two: sometimes the FIRST (pattern ABB),\n\
         sometimes the THIRD (pattern BBA).\n\
         After the third {item}, type l if the FIRST differed or r if the THIRD differed.\n\
         Next: {block}."
    )
}

/// Maps typed input to the key names the session expects.
fn side_key(input: &str) -> Option<&'static str> {
    match input {
        "l" | "left" | "1" => Some("left"),
        "r" | "right" | "3" => Some("right"),
        _ => None,
    }
}

impl<R: BufRead, W: Write> Presenter for TerminalPresenter<R, W> {
    fn show(&mut self, notice: &Notice) -> Result<()> {
        match notice {
            Notice::Instructions { task, kind } => {
                writeln!(self.output, "\n{}", instructions(*task, *kind))?;
                self.wait_for_enter()
            }
            Notice::RunBreak {
                task,
                completed,
                total,
            } => {
                writeln!(
                    self.output,
                    "\nRun {completed} of {total} of the {task} task done. Take a short break."
                )?;
                self.wait_for_enter()
            }
            Notice::TaskBreak { completed, total } => {
                writeln!(self.output, "\nTask {completed} of {total} done. Take a break.")?;
                self.wait_for_enter()
            }
            Notice::Finished => {
                writeln!(self.output, "\nThe experiment is over. Thank you!")?;
                Ok(())
            }
        }
    }

    fn choose(&mut self, prompt: &ChoicePrompt<'_>) -> Result<String> {
        loop {
            write!(
                self.output,
                "Trial {}: which one differed? [l]eft / [r]ight ",
                prompt.trial
            )?;
            self.output.flush()?;
            let line = self.read_line()?;
            if let Some(key) = side_key(&line) {
                return Ok(key.to_string());
            }
        }
    }

    fn feedback(&mut self, correct: bool) -> Result<()> {
        let text = if correct { "correct" } else { "incorrect" };
        writeln!(self.output, "  {text}")?;
        Ok(())
    }
}
