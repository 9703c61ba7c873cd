use super::VDCaptureError;
use std::{
    fmt::Display,
    io::{BufRead, Write},
    path::Path,
    thread,
    time::Duration,
};

pub const DEFAULT_SCRIPT_DELAY: Duration = Duration::from_secs(3);

/// A script is a JSON array of utterances, played one per turn.
pub fn parse_script(raw: &str) -> Result<Vec<String>, VDCaptureError> {
    serde_json::from_str(raw).map_err(|e| VDCaptureError::Script(e.to_string()))
}

pub fn load_script(path: &Path) -> Result<Vec<String>, VDCaptureError> {
    let raw = std::fs::read_to_string(path)?;
    parse_script(&raw)
}

fn take_turn<W, F, E>(output: &mut W, text: &str, on_message: &mut F) -> std::io::Result<bool>
where
    W: Write,
    F: FnMut(&str) -> Result<String, E>,
    E: Display,
{
    match on_message(text) {
        Ok(answer) => {
            writeln!(output, "AI: {answer}")?;
            Ok(true)
        }
        Err(e) => {
            tracing::warn!(error = %e, "turn failed");
            writeln!(output, "(no reply produced this turn: {e})")?;
            Ok(false)
        }
    }
}

/// Reads utterances line by line until EOF. Blank lines are ignored.
///
/// Returns the number of turns that got a reply.
pub fn run_interactive<R, W, F, E>(
    input: R,
    mut output: W,
    mut on_message: F,
) -> std::io::Result<usize>
where
    R: BufRead,
    W: Write,
    F: FnMut(&str) -> Result<String, E>,
    E: Display,
{
    let mut answered = 0;
    let mut lines = input.lines();
    loop {
        write!(output, "You: ")?;
        output.flush()?;
        let Some(line) = lines.next() else {
            writeln!(output)?;
            break;
        };
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if take_turn(&mut output, text, &mut on_message)? {
            answered += 1;
        }
    }
    Ok(answered)
}

pub fn run_script<W, F, E>(
    script: &[String],
    delay: Duration,
    mut output: W,
    mut on_message: F,
) -> std::io::Result<usize>
where
    W: Write,
    F: FnMut(&str) -> Result<String, E>,
    E: Display,
{
    let mut answered = 0;
    for text in script {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        writeln!(output, "Script: {text}")?;
        if take_turn(&mut output, text, &mut on_message)? {
            answered += 1;
        }
    }
    Ok(answered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_script() {
        let script = parse_script(r#"["Hi!", "What am I holding?"]"#).unwrap();
        assert_eq!(script, vec!["Hi!", "What am I holding?"]);
        assert!(matches!(
            parse_script(r#"{"lines": []}"#),
            Err(VDCaptureError::Script(_))
        ));
    }

    #[test]
    fn test_interactive_skips_blank_lines() {
        let input = Cursor::new("hello\n\n   \nbye\n");
        let mut output = Vec::new();
        let mut seen = Vec::new();
        let answered = run_interactive(input, &mut output, |text| {
            seen.push(text.to_string());
            Ok::<_, String>(format!("echo {text}"))
        })
        .unwrap();
        assert_eq!(answered, 2);
        assert_eq!(seen, vec!["hello", "bye"]);
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("AI: echo hello"));
        assert!(printed.contains("AI: echo bye"));
    }

    #[test]
    fn test_failed_turn_keeps_dialogue_going() {
        let script = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let mut output = Vec::new();
        let answered = run_script(&script, Duration::ZERO, &mut output, |text| {
            if text == "two" {
                Err("model timed out")
            } else {
                Ok(text.to_uppercase())
            }
        })
        .unwrap();
        assert_eq!(answered, 2);
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("Script: two\n(no reply produced this turn: model timed out)"));
        assert!(printed.contains("AI: THREE"));
    }
}
