//! Live translation through an external program.
//!
//! The program receives a JSON array of strings on stdin and the target
//! language in `MODELBPA_TARGET_LANGUAGE`, and must print a JSON array of
//! the same length on stdout (`null` for "no translation").

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use modelbpa_domain::{TranslationError, Translator};

pub const TARGET_LANGUAGE_ENV: &str = "MODELBPA_TARGET_LANGUAGE";

#[derive(Debug, Clone)]
pub struct CommandTranslator {
    program: String,
    args: Vec<String>,
}

impl CommandTranslator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Translator for CommandTranslator {
    fn translate_batch(
        &self,
        texts: &[String],
        target_language: &str,
    ) -> Result<Vec<Option<String>>, TranslationError> {
        let input =
            serde_json::to_vec(texts).map_err(|e| TranslationError::Service(e.to_string()))?;

        debug!(
            "Running translator '{}' for {} text(s) into '{}'",
            self.program,
            texts.len(),
            target_language
        );
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(TARGET_LANGUAGE_ENV, target_language)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TranslationError::Service(format!("spawn '{}': {e}", self.program)))?;

        // Feed stdin from its own thread while stdout and stderr drain here.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || -> std::io::Result<()> {
                stdin.write_all(&input)?;
                stdin.flush()
            })
        });

        let output = child
            .wait_with_output()
            .map_err(|e| TranslationError::Service(format!("wait for translator: {e}")))?;
        let written = match writer {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked"))),
            None => Ok(()),
        };

        if !output.status.success() {
            // Killed by a signal.
            if output.status.code().is_none() {
                return Err(TranslationError::Cancelled);
            }
            return Err(TranslationError::Service(format!(
                "translator exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // Checked after the exit status: a program that quits early breaks the pipe.
        written.map_err(|e| TranslationError::Service(format!("write to translator: {e}")))?;

        serde_json::from_slice(&output.stdout)
            .map_err(|e| TranslationError::Service(format!("parse translator output: {e}")))
    }
}
