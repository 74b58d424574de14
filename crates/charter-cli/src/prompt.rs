//! Line-oriented driver for the document wizard.
//!
//! Reads answers from any `BufRead` and writes prompts to any `Write`, so the
//! same loop serves a terminal and tests. At a field prompt an empty line
//! keeps the current value and `-` clears it; menus accept `q` to quit.

use std::io::{BufRead, Write};

use anyhow::Context;
use charter_core::schema::FieldSpec;
use charter_core::{DocumentType, FieldKind, FieldValue, Phase, Wizard, WizardEvent};

/// How the author left the wizard.
pub enum Outcome {
    /// Wizard is at review; the caller generates (or saves a draft) and
    /// then applies `Finish`.
    Submit { wizard: Wizard, draft: bool },
    Quit,
}

pub struct Prompter<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    /// Read one trimmed line; `None` at end of input.
    fn ask(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("reading answer")?;
        Ok((read > 0).then(|| line.trim().to_string()))
    }

    fn say(&mut self, text: impl AsRef<str>) -> anyhow::Result<()> {
        writeln!(self.out, "{}", text.as_ref())?;
        Ok(())
    }

    /// Apply an event, reporting a rejected one instead of failing.
    fn step(&mut self, wizard: Wizard, event: WizardEvent) -> anyhow::Result<Wizard> {
        match wizard.apply(event) {
            Ok(next) => Ok(next),
            Err(e) => {
                self.say(format!("  ! {e}"))?;
                Ok(wizard)
            }
        }
    }

    pub fn run(&mut self, initial: Option<DocumentType>) -> anyhow::Result<Outcome> {
        let mut wizard = Wizard::new();
        if let Some(doc_type) = initial {
            wizard = wizard.apply(WizardEvent::ChooseType(doc_type))?;
        }

        loop {
            let next = match wizard.phase() {
                Phase::TypeSelect => self.choose_type(&wizard)?,
                Phase::EditSection(index) => self.edit_section(wizard.clone(), index)?,
                Phase::Review => match self.review(wizard.clone())? {
                    Step::Continue(next) => Some(next),
                    Step::Done(outcome) => return Ok(outcome),
                },
                Phase::Generated => return Ok(Outcome::Submit { wizard, draft: false }),
            };
            match next {
                Some(next) => wizard = next,
                None => return Ok(Outcome::Quit),
            }
        }
    }

    fn choose_type(&mut self, wizard: &Wizard) -> anyhow::Result<Option<Wizard>> {
        self.say("Document types:")?;
        for (i, doc_type) in DocumentType::all().iter().enumerate() {
            self.say(format!("  {}. {}", i + 1, doc_type.schema().display_name))?;
        }
        loop {
            let Some(answer) = self.ask("Choose a type (number or slug, q to quit): ")? else {
                return Ok(None);
            };
            if answer.eq_ignore_ascii_case("q") {
                return Ok(None);
            }
            let chosen = match answer.parse::<usize>() {
                Ok(n) if (1..=DocumentType::all().len()).contains(&n) => {
                    Some(DocumentType::all()[n - 1])
                }
                _ => answer.parse::<DocumentType>().ok(),
            };
            match chosen {
                Some(doc_type) => {
                    return Ok(Some(self.step(wizard.clone(), WizardEvent::ChooseType(doc_type))?));
                }
                None => self.say(format!("  ! unknown type {answer:?}"))?,
            }
        }
    }

    fn edit_section(&mut self, mut wizard: Wizard, index: usize) -> anyhow::Result<Option<Wizard>> {
        let Some(schema) = wizard.schema() else {
            return Ok(Some(wizard));
        };
        let Some(section) = schema.section(index) else {
            return Ok(Some(wizard));
        };
        self.say(format!(
            "\n── {} ({}/{}) ──",
            section.title,
            index + 1,
            schema.section_count()
        ))?;
        if let Some(description) = section.description {
            self.say(description)?;
        }

        for field in section.fields {
            let edited = if field.kind == FieldKind::Repeatable {
                self.edit_rows(wizard, field)?
            } else {
                self.edit_scalar(wizard, field)?
            };
            match edited {
                Some(next) => wizard = next,
                None => return Ok(None),
            }
        }

        loop {
            let Some(answer) = self.ask("[n]ext, [b]ack, [q]uit (default next): ")? else {
                return Ok(None);
            };
            let event = match answer.to_ascii_lowercase().as_str() {
                "" | "n" | "next" => WizardEvent::Next,
                "b" | "back" => WizardEvent::Back,
                "q" | "quit" => return Ok(None),
                other => {
                    self.say(format!("  ! unknown choice {other:?}"))?;
                    continue;
                }
            };
            return Ok(Some(self.step(wizard, event)?));
        }
    }

    fn edit_scalar(&mut self, wizard: Wizard, field: &FieldSpec) -> anyhow::Result<Option<Wizard>> {
        if let Some(help) = field.help {
            self.say(format!("  ({help})"))?;
        }
        if field.kind == FieldKind::Select {
            self.say(format!("  options: {}", field.options.join(", ")))?;
        }
        let current = wizard
            .values()
            .get(field.key)
            .map(ToString::to_string)
            .unwrap_or_default();
        let marker = if field.required { "*" } else { "" };
        let prompt = format!("{}{marker} ({}) [{current}]: ", field.label, field.kind);

        let Some(answer) = self.ask(&prompt)? else {
            return Ok(None);
        };
        let value = match answer.as_str() {
            "" => return Ok(Some(wizard)),
            "-" => FieldValue::text(""),
            _ => FieldValue::text(answer),
        };
        Ok(Some(self.step(
            wizard,
            WizardEvent::SetField {
                key: field.key.to_string(),
                value,
            },
        )?))
    }

    fn edit_rows(&mut self, mut wizard: Wizard, field: &FieldSpec) -> anyhow::Result<Option<Wizard>> {
        loop {
            let rows = wizard
                .values()
                .get(field.key)
                .and_then(FieldValue::rows)
                .map(<[_]>::len)
                .unwrap_or(0);
            let marker = if field.required { "*" } else { "" };
            let prompt = format!(
                "{}{marker}: {rows} row(s). [a]dd, [r]emove <n>, Enter to continue: ",
                field.label
            );
            let Some(answer) = self.ask(&prompt)? else {
                return Ok(None);
            };
            let lower = answer.to_ascii_lowercase();
            if lower.is_empty() {
                return Ok(Some(wizard));
            }
            if lower == "a" || lower == "add" {
                wizard = self.step(
                    wizard,
                    WizardEvent::AddRow {
                        key: field.key.to_string(),
                    },
                )?;
                for sub in field.subfields {
                    let marker = if sub.required { "*" } else { "" };
                    let Some(value) = self.ask(&format!("  {}{marker}: ", sub.label))? else {
                        return Ok(None);
                    };
                    wizard = self.step(
                        wizard,
                        WizardEvent::SetRowField {
                            key: field.key.to_string(),
                            row: rows,
                            subkey: sub.key.to_string(),
                            value,
                        },
                    )?;
                }
            } else if let Some(n) = lower.strip_prefix('r').map(str::trim)
                && let Ok(n) = n.trim_start_matches("emove").trim().parse::<usize>()
                && n >= 1
            {
                wizard = self.step(
                    wizard,
                    WizardEvent::RemoveRow {
                        key: field.key.to_string(),
                        row: n - 1,
                    },
                )?;
            } else {
                self.say(format!("  ! unknown choice {answer:?}"))?;
            }
        }
    }

    fn review(&mut self, wizard: Wizard) -> anyhow::Result<Step> {
        let Some(schema) = wizard.schema() else {
            return Ok(Step::Continue(wizard));
        };
        self.say(format!("\n── Review: {} ──", schema.display_name))?;
        for (i, section) in schema.sections.iter().enumerate() {
            self.say(format!("{}. {}", i + 1, section.title))?;
            for field in section.fields {
                let value = wizard
                    .values()
                    .get(field.key)
                    .filter(|v| !v.is_blank())
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "-".into());
                self.say(format!("  {:<26} {}", field.label, value))?;
            }
        }
        let violations = wizard.violations();
        if !violations.is_empty() {
            self.say("Still needed before generating:")?;
            for v in &violations {
                self.say(format!("  - {v}"))?;
            }
        }

        loop {
            let Some(answer) = self.ask("[g]enerate, save [d]raft, [e]dit <n>, [b]ack, [q]uit: ")?
            else {
                return Ok(Step::Done(Outcome::Quit));
            };
            let lower = answer.to_ascii_lowercase();
            match lower.as_str() {
                "g" | "generate" => {
                    if violations.is_empty() {
                        return Ok(Step::Done(Outcome::Submit { wizard, draft: false }));
                    }
                    self.say("  ! fix the fields above first, or save a draft")?;
                }
                "d" | "draft" => return Ok(Step::Done(Outcome::Submit { wizard, draft: true })),
                "b" | "back" => return Ok(Step::Continue(self.step(wizard, WizardEvent::Back)?)),
                "q" | "quit" => return Ok(Step::Done(Outcome::Quit)),
                other => {
                    let section = other
                        .strip_prefix('e')
                        .map(|rest| rest.trim_start_matches("dit").trim())
                        .and_then(|n| n.parse::<usize>().ok())
                        .filter(|n| *n >= 1);
                    match section {
                        Some(n) => {
                            return Ok(Step::Continue(
                                self.step(wizard, WizardEvent::EditSection(n - 1))?,
                            ));
                        }
                        None => self.say(format!("  ! unknown choice {answer:?}"))?,
                    }
                }
            }
        }
    }
}

enum Step {
    Continue(Wizard),
    Done(Outcome),
}
