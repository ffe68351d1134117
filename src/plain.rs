//! Line-oriented front end for pipes and dumb terminals.

use std::io::{BufRead, Write};

use crate::{
    classify::Classification,
    error::Result,
    session::ReplLoop,
    transcript::{LineKind, Transcript},
    Submission,
};

/// Read commands from `input` until EOF or `exit`, writing results to `output`.
///
/// Blocks until the backend is ready first; a failed load is returned as an error.
pub fn run_plain<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    repl: &mut ReplLoop,
    prompt: &str,
) -> Result<()> {
    let mut transcript = Transcript::new();
    repl.wait_ready(&mut transcript)?;
    flush_lines(&mut output, &mut transcript)?;

    let mut lines = input.lines();
    loop {
        write!(output, "{prompt}")?;
        output.flush()?;
        let Some(line) = lines.next() else {
            writeln!(output)?;
            break;
        };
        let line = line?;

        let outcome = repl.submit(&line, &mut transcript);
        flush_lines(&mut output, &mut transcript)?;
        if outcome == Submission::Exit {
            break;
        }
    }
    output.flush()?;
    Ok(())
}

/// Output is never redrawn, so written lines leave the transcript.
fn flush_lines<W: Write>(output: &mut W, transcript: &mut Transcript) -> Result<()> {
    for line in transcript.take() {
        match line.kind {
            LineKind::Input { .. } | LineKind::Response(Classification::Empty) => {}
            LineKind::Blank => writeln!(output)?,
            _ => writeln!(output, "{}", line.text)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::{io::Cursor, sync::Arc};

    use super::*;
    use crate::{
        error::LoadError,
        loader::{BackendHandle, BackendSource, Evaluate},
        transcript::MAX_LINES,
    };

    fn calculator() -> ReplLoop {
        ReplLoop::with_handle(BackendHandle::new("calc", |cmd: &str| match cmd {
            "6*7" => "42".to_string(),
            "1/0" => "Error: division by zero".to_string(),
            _ => "<div>...</div>".to_string(),
        }))
        .with_builtins(true)
    }

    fn run(repl: &mut ReplLoop, input: &str) -> Result<String> {
        let mut out = Vec::new();
        run_plain(Cursor::new(input), &mut out, repl, "> ")?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn prints_results_per_line() {
        let out = run(&mut calculator(), "6*7\n\n1/0\nwidget\n").unwrap();
        assert_eq!(out, "> 42\n> \n> Error: division by zero\n> > \n");
    }

    #[test]
    fn long_sessions_print_every_result() {
        let echo = BackendHandle::new("echo", |cmd: &str| cmd.to_string());
        let mut repl = ReplLoop::with_handle(echo);
        let commands = MAX_LINES + 3;
        let input: String = (0..commands).map(|i| format!("{i}\n")).collect();
        let out = run(&mut repl, &input).unwrap();

        let printed: Vec<&str> = out.lines().map(|l| l.trim_start_matches("> ")).collect();
        assert_eq!(repl.dispatched(), commands);
        assert_eq!(printed.len(), commands + 1);
        assert_eq!(printed[commands - 1], (commands - 1).to_string());
    }

    #[test]
    fn exit_stops_reading() {
        let out = run(&mut calculator(), "exit\n6*7\n").unwrap();
        assert_eq!(out, "> ");
    }

    #[test]
    fn failed_backend_is_an_error() {
        let source: Arc<dyn BackendSource> = Arc::new(
            || -> std::result::Result<Box<dyn Evaluate>, LoadError> {
                Err(LoadError::Acquire("unreachable module".into()))
            },
        );
        let err = run(&mut ReplLoop::start(source), "6*7\n").unwrap_err();
        assert!(err.to_string().contains("unreachable module"));
    }
}
