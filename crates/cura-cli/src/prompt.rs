use std::io::{self, BufRead, Write};

use cura_core::{ArbiterError, DuplicateArbiter, DuplicateSet, ScriptedArbiter, TrackId};

/// Árbitro de la terminal: primero las respuestas de `--keep`, después
/// pregunta por stdin salvo en modo no interactivo.
pub struct CliArbiter {
    scripted: ScriptedArbiter,
    interactive: bool,
}

impl CliArbiter {
    pub fn new(scripted: ScriptedArbiter, interactive: bool) -> Self {
        CliArbiter { scripted, interactive }
    }
}

impl DuplicateArbiter for CliArbiter {
    fn choose(&self, set: &DuplicateSet) -> Result<TrackId, ArbiterError> {
        if let Some(id) = self.scripted.answer_for(set) {
            return Ok(id.clone());
        }
        if !self.interactive {
            return Err(ArbiterError::Unanswered(set.key()));
        }

        let stdin = io::stdin();
        let stderr = io::stderr();
        ask(set, stdin.lock(), stderr.lock())
    }
}

/// Muestra las candidatas y lee hasta recibir un id válido.
pub fn ask<R: BufRead, W: Write>(set: &DuplicateSet, mut input: R, mut out: W) -> Result<TrackId, ArbiterError> {
    writeln!(out, "\nDuplicate tracks for {}:", set.key())?;
    for candidate in &set.candidates {
        writeln!(
            out,
            "  [{}] title={:?} language={:?} -> {}",
            candidate.id,
            candidate.raw_title.as_deref().unwrap_or("-"),
            candidate.raw_language.as_deref().unwrap_or("-"),
            candidate.new_title
        )?;
    }

    let mut line = String::new();
    loop {
        write!(out, "Track id to keep: ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(ArbiterError::Aborted);
        }

        let choice = line.trim();
        if set.contains(choice) {
            return Ok(choice.to_string());
        }
        writeln!(out, "`{choice}` is not one of the listed ids")?;
    }
}

/// `GRUPO=ID`, p. ej. `audio:portuguese=2`.
pub fn parse_keep(s: &str) -> Result<(String, TrackId), String> {
    let (key, id) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected GROUP=ID, got `{s}`"))?;
    let (key, id) = (key.trim(), id.trim());
    if key.is_empty() || id.is_empty() {
        return Err(format!("expected GROUP=ID, got `{s}`"));
    }
    Ok((key.to_string(), id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cura_core::{Candidate, Language, TrackKind, Variant};

    fn set() -> DuplicateSet {
        let candidate = |id: &str, title: &str| Candidate {
            id: id.into(),
            raw_title: Some(title.into()),
            raw_language: Some("por".into()),
            new_title: "Portuguese".into(),
        };
        DuplicateSet {
            kind: TrackKind::Audio,
            language: Language::Portuguese,
            variant: Variant::Normal,
            candidates: vec![candidate("1", "Portugues 2.0"), candidate("2", "Portugues 5.1")],
        }
    }

    #[test]
    fn asks_until_the_answer_is_valid() {
        let mut out = Vec::new();
        let id = ask(&set(), "9\n 2 \n".as_bytes(), &mut out).unwrap();

        assert_eq!(id, "2");
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("audio:portuguese"));
        assert!(shown.contains("`9` is not one of the listed ids"));
    }

    #[test]
    fn closed_input_aborts() {
        let err = ask(&set(), "".as_bytes(), Vec::new()).unwrap_err();
        assert!(matches!(err, ArbiterError::Aborted));
    }

    #[test]
    fn scripted_answers_win_and_non_interactive_never_prompts() {
        let scripted = ScriptedArbiter::new().with("audio:portuguese", "1");
        assert_eq!(CliArbiter::new(scripted, true).choose(&set()).unwrap(), "1");

        let err = CliArbiter::new(ScriptedArbiter::new(), false).choose(&set()).unwrap_err();
        assert!(matches!(err, ArbiterError::Unanswered(key) if key == "audio:portuguese"));
    }

    #[test]
    fn keep_arguments() {
        assert_eq!(
            parse_keep("subtitle:english:forced=7").unwrap(),
            ("subtitle:english:forced".to_string(), "7".to_string())
        );
        assert!(parse_keep("audio:japanese").is_err());
        assert!(parse_keep("=3").is_err());
    }
}
