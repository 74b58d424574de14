//! Authoring wizard: a finite-state sequencer over a schema's sections.
//!
//! The whole wizard is one explicit value. [`Wizard::apply`] takes an event and
//! returns the next value, leaving the current one untouched, so the state
//! machine is testable without any UI and an invalid event costs nothing.
//!
//! ```text
//! TypeSelect ─ChooseType→ EditSection(0) ─Next→ … ─Next→ EditSection(last) ─Next→ Review
//!      ↑                        │                                              │    │
//!      └─────────Back───────────┘             EditSection(j) ←──EditSection(j)─┘    │
//!                                                                                 Finish
//!                                                                                   ↓
//!                                                                               Generated
//! ```

use std::fmt;

use thiserror::Error;

use crate::ids::DocumentId;
use crate::registry::DocumentType;
use crate::schema::{DocumentTypeSchema, FieldKind, SectionSpec};
use crate::validate::{Violation, validate};
use crate::value::{FieldValue, ValueMap, empty_row, synthesize_defaults};

/// Where the author currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    TypeSelect,
    EditSection(usize),
    Review,
    Generated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::TypeSelect => f.write_str("type selection"),
            Phase::EditSection(i) => write!(f, "section {}", i + 1),
            Phase::Review => f.write_str("review"),
            Phase::Generated => f.write_str("generated"),
        }
    }
}

/// Input to the wizard.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    ChooseType(DocumentType),
    Next,
    Back,
    /// Jump from review back into one section.
    EditSection(usize),
    SetField { key: String, value: FieldValue },
    AddRow { key: String },
    SetRowField { key: String, row: usize, subkey: String, value: String },
    RemoveRow { key: String, row: usize },
    /// The caller generated the document (or saved a draft) as this record.
    Finish(DocumentId),
}

impl WizardEvent {
    fn name(&self) -> &'static str {
        match self {
            WizardEvent::ChooseType(_) => "choose type",
            WizardEvent::Next => "next",
            WizardEvent::Back => "back",
            WizardEvent::EditSection(_) => "edit section",
            WizardEvent::SetField { .. } => "set field",
            WizardEvent::AddRow { .. } => "add row",
            WizardEvent::SetRowField { .. } => "set row field",
            WizardEvent::RemoveRow { .. } => "remove row",
            WizardEvent::Finish(_) => "finish",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("cannot {event} during {phase}")]
    NotAllowed { event: &'static str, phase: Phase },

    #[error("section {index} does not exist (document has {count} sections)")]
    SectionOutOfRange { index: usize, count: usize },

    #[error("no field named {0:?}")]
    UnknownField(String),

    #[error("field {0:?} holds rows; edit it with row events")]
    NotScalar(String),

    #[error("field {0:?} is not a repeatable group")]
    NotRepeatable(String),

    #[error("field {key:?} has no row {row}")]
    RowOutOfRange { key: String, row: usize },

    #[error("field {key:?} has no subfield {subkey:?}")]
    UnknownSubfield { key: String, subkey: String },
}

/// Wizard state: phase, chosen type and the accumulating value map.
#[derive(Debug, Clone, PartialEq)]
pub struct Wizard {
    phase: Phase,
    doc_type: Option<DocumentType>,
    values: ValueMap,
    document_id: Option<DocumentId>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            phase: Phase::TypeSelect,
            doc_type: None,
            values: ValueMap::new(),
            document_id: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn doc_type(&self) -> Option<DocumentType> {
        self.doc_type
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    /// Record produced when the wizard reached [`Phase::Generated`].
    pub fn document_id(&self) -> Option<DocumentId> {
        self.document_id
    }

    pub fn schema(&self) -> Option<&'static DocumentTypeSchema> {
        self.doc_type.map(DocumentType::schema)
    }

    pub fn current_section(&self) -> Option<&'static SectionSpec> {
        match self.phase {
            Phase::EditSection(i) => self.schema()?.section(i),
            _ => None,
        }
    }

    /// Violations of the current value map; empty before a type is chosen.
    pub fn violations(&self) -> Vec<Violation> {
        self.schema()
            .map(|schema| validate(schema, &self.values))
            .unwrap_or_default()
    }

    /// Apply one event, returning the next state.
    pub fn apply(&self, event: WizardEvent) -> Result<Wizard, WizardError> {
        let not_allowed = WizardError::NotAllowed {
            event: event.name(),
            phase: self.phase,
        };

        match (self.phase, event) {
            (Phase::TypeSelect, WizardEvent::ChooseType(doc_type)) => Ok(Wizard {
                phase: Phase::EditSection(0),
                doc_type: Some(doc_type),
                values: synthesize_defaults(doc_type.schema()),
                document_id: None,
            }),

            (Phase::EditSection(i), WizardEvent::Next) => {
                let last = self.require_schema()?.last_section_index();
                let phase = if i >= last {
                    Phase::Review
                } else {
                    Phase::EditSection(i + 1)
                };
                Ok(self.with_phase(phase))
            }

            (Phase::EditSection(0), WizardEvent::Back) => Ok(Wizard::new()),
            (Phase::EditSection(i), WizardEvent::Back) => {
                Ok(self.with_phase(Phase::EditSection(i - 1)))
            }
            (Phase::Review, WizardEvent::Back) => {
                let last = self.require_schema()?.last_section_index();
                Ok(self.with_phase(Phase::EditSection(last)))
            }

            (Phase::Review, WizardEvent::EditSection(index)) => {
                let count = self.require_schema()?.section_count();
                if index >= count {
                    return Err(WizardError::SectionOutOfRange { index, count });
                }
                Ok(self.with_phase(Phase::EditSection(index)))
            }

            (Phase::Review, WizardEvent::Finish(id)) => {
                let mut next = self.with_phase(Phase::Generated);
                next.document_id = Some(id);
                Ok(next)
            }

            (Phase::EditSection(_), WizardEvent::SetField { key, value }) => {
                let field = self.field_kind(&key)?;
                if field == FieldKind::Repeatable {
                    return Err(WizardError::NotScalar(key));
                }
                let mut next = self.clone();
                next.values.insert(key, value);
                Ok(next)
            }

            (Phase::EditSection(_), WizardEvent::AddRow { key }) => {
                let schema = self.require_schema()?;
                let field = schema
                    .field(&key)
                    .ok_or_else(|| WizardError::UnknownField(key.clone()))?;
                if field.kind != FieldKind::Repeatable {
                    return Err(WizardError::NotRepeatable(key));
                }
                let mut next = self.clone();
                next.rows_mut(&key).push(empty_row(field));
                Ok(next)
            }

            (Phase::EditSection(_), WizardEvent::SetRowField { key, row, subkey, value }) => {
                let schema = self.require_schema()?;
                let field = schema
                    .field(&key)
                    .ok_or_else(|| WizardError::UnknownField(key.clone()))?;
                if field.kind != FieldKind::Repeatable {
                    return Err(WizardError::NotRepeatable(key));
                }
                if field.subfield(&subkey).is_none() {
                    return Err(WizardError::UnknownSubfield { key, subkey });
                }
                let mut next = self.clone();
                let target = next
                    .rows_mut(&key)
                    .get_mut(row)
                    .ok_or_else(|| WizardError::RowOutOfRange { key: key.clone(), row })?;
                target.insert(subkey, value);
                Ok(next)
            }

            (Phase::EditSection(_), WizardEvent::RemoveRow { key, row }) => {
                if self.field_kind(&key)? != FieldKind::Repeatable {
                    return Err(WizardError::NotRepeatable(key));
                }
                let mut next = self.clone();
                let rows = next.rows_mut(&key);
                if row >= rows.len() {
                    return Err(WizardError::RowOutOfRange { key, row });
                }
                rows.remove(row);
                Ok(next)
            }

            _ => Err(not_allowed),
        }
    }

    fn with_phase(&self, phase: Phase) -> Wizard {
        Wizard {
            phase,
            ..self.clone()
        }
    }

    fn require_schema(&self) -> Result<&'static DocumentTypeSchema, WizardError> {
        self.schema().ok_or(WizardError::NotAllowed {
            event: "edit",
            phase: self.phase,
        })
    }

    fn field_kind(&self, key: &str) -> Result<FieldKind, WizardError> {
        self.require_schema()?
            .field(key)
            .map(|f| f.kind)
            .ok_or_else(|| WizardError::UnknownField(key.to_string()))
    }

    /// Row list for a repeatable key, replacing any non-row value.
    fn rows_mut(&mut self, key: &str) -> &mut Vec<crate::value::Row> {
        let slot = self
            .values
            .entry(key.to_string())
            .or_insert_with(|| FieldValue::Rows(Vec::new()));
        if !matches!(slot, FieldValue::Rows(_)) {
            *slot = FieldValue::Rows(Vec::new());
        }
        match slot {
            FieldValue::Rows(rows) => rows,
            _ => unreachable!("slot was just set to rows"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(wizard: &Wizard, event: WizardEvent) -> Wizard {
        wizard
            .apply(event.clone())
            .unwrap_or_else(|e| panic!("{event:?} from {}: {e}", wizard.phase()))
    }

    fn set(key: &str, value: &str) -> WizardEvent {
        WizardEvent::SetField {
            key: key.into(),
            value: FieldValue::text(value),
        }
    }

    fn at_review(doc_type: DocumentType) -> Wizard {
        let mut wizard = step(&Wizard::new(), WizardEvent::ChooseType(doc_type));
        while wizard.phase() != Phase::Review {
            wizard = step(&wizard, WizardEvent::Next);
        }
        wizard
    }

    #[test]
    fn choosing_a_type_starts_at_first_section_with_defaults() {
        let wizard = step(&Wizard::new(), WizardEvent::ChooseType(DocumentType::Nda));
        assert_eq!(wizard.phase(), Phase::EditSection(0));
        assert_eq!(wizard.values(), &synthesize_defaults(DocumentType::Nda.schema()));
        assert_eq!(wizard.current_section().unwrap().title, "Parties");
    }

    #[test]
    fn next_walks_sections_then_review() {
        let mut wizard = step(&Wizard::new(), WizardEvent::ChooseType(DocumentType::Msa));
        let mut seen = vec![wizard.phase()];
        while wizard.phase() != Phase::Review {
            wizard = step(&wizard, WizardEvent::Next);
            seen.push(wizard.phase());
        }
        assert_eq!(
            seen,
            vec![
                Phase::EditSection(0),
                Phase::EditSection(1),
                Phase::EditSection(2),
                Phase::Review
            ]
        );
    }

    #[test]
    fn back_from_first_section_returns_to_type_select_and_discards_values() {
        let wizard = step(&Wizard::new(), WizardEvent::ChooseType(DocumentType::Nda));
        let wizard = step(&wizard, set("recipient_name", "Acme"));
        let wizard = step(&wizard, WizardEvent::Back);
        assert_eq!(wizard.phase(), Phase::TypeSelect);
        assert_eq!(wizard.doc_type(), None);
        assert!(wizard.values().is_empty());
    }

    #[test]
    fn back_steps_to_previous_section() {
        let wizard = step(&Wizard::new(), WizardEvent::ChooseType(DocumentType::Nda));
        let wizard = step(&wizard, WizardEvent::Next);
        let wizard = step(&wizard, WizardEvent::Back);
        assert_eq!(wizard.phase(), Phase::EditSection(0));
    }

    #[test]
    fn review_edit_returns_to_review_exactly_once() {
        let review = at_review(DocumentType::Retainer);
        let mut wizard = step(&review, WizardEvent::EditSection(1));
        assert_eq!(wizard.phase(), Phase::EditSection(1));

        let mut review_entries = 0;
        for _ in 0..review.schema().unwrap().section_count() {
            if wizard.phase() == Phase::Review {
                break;
            }
            wizard = step(&wizard, WizardEvent::Next);
            if wizard.phase() == Phase::Review {
                review_entries += 1;
            }
        }
        assert_eq!(review_entries, 1);
        assert_eq!(wizard.phase(), Phase::Review);
    }

    #[test]
    fn review_edit_out_of_range_rejected() {
        let review = at_review(DocumentType::Nda);
        assert_eq!(
            review.apply(WizardEvent::EditSection(3)),
            Err(WizardError::SectionOutOfRange { index: 3, count: 3 })
        );
    }

    #[test]
    fn field_edits_keep_phase() {
        let wizard = step(&Wizard::new(), WizardEvent::ChooseType(DocumentType::Nda));
        let wizard = step(&wizard, WizardEvent::Next);
        let edited = step(&wizard, set("recipient_name", "Acme"));
        assert_eq!(edited.phase(), wizard.phase());
        assert_eq!(edited.values()["recipient_name"], FieldValue::text("Acme"));
    }

    #[test]
    fn field_edits_rejected_outside_sections() {
        let review = at_review(DocumentType::Nda);
        assert!(matches!(
            review.apply(set("purpose", "x")),
            Err(WizardError::NotAllowed { phase: Phase::Review, .. })
        ));
        assert!(matches!(
            Wizard::new().apply(WizardEvent::Next),
            Err(WizardError::NotAllowed { phase: Phase::TypeSelect, .. })
        ));
    }

    #[test]
    fn unknown_and_row_fields_rejected_by_set_field() {
        let wizard = step(&Wizard::new(), WizardEvent::ChooseType(DocumentType::Sow));
        assert_eq!(
            wizard.apply(set("nope", "x")),
            Err(WizardError::UnknownField("nope".into()))
        );
        assert_eq!(
            wizard.apply(set("deliverables", "x")),
            Err(WizardError::NotScalar("deliverables".into()))
        );
    }

    #[test]
    fn rows_can_be_added_edited_and_removed() {
        let wizard = step(&Wizard::new(), WizardEvent::ChooseType(DocumentType::Sow));
        let wizard = step(&wizard, WizardEvent::AddRow { key: "deliverables".into() });
        let wizard = step(
            &wizard,
            WizardEvent::SetRowField {
                key: "deliverables".into(),
                row: 0,
                subkey: "title".into(),
                value: "Homepage".into(),
            },
        );
        let rows = wizard.values()["deliverables"].rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "Homepage");

        assert_eq!(
            wizard.apply(WizardEvent::SetRowField {
                key: "deliverables".into(),
                row: 0,
                subkey: "colour".into(),
                value: "red".into(),
            }),
            Err(WizardError::UnknownSubfield {
                key: "deliverables".into(),
                subkey: "colour".into()
            })
        );
        assert_eq!(
            wizard.apply(WizardEvent::RemoveRow { key: "deliverables".into(), row: 4 }),
            Err(WizardError::RowOutOfRange { key: "deliverables".into(), row: 4 })
        );

        let wizard = step(&wizard, WizardEvent::RemoveRow { key: "deliverables".into(), row: 0 });
        assert!(wizard.values()["deliverables"].rows().unwrap().is_empty());
    }

    #[test]
    fn finish_only_from_review() {
        let id = DocumentId::new();
        let wizard = step(&Wizard::new(), WizardEvent::ChooseType(DocumentType::Nda));
        assert!(wizard.apply(WizardEvent::Finish(id)).is_err());

        let done = step(&at_review(DocumentType::Nda), WizardEvent::Finish(id));
        assert_eq!(done.phase(), Phase::Generated);
        assert_eq!(done.document_id(), Some(id));
        assert!(done.apply(WizardEvent::Back).is_err());
    }

    #[test]
    fn failed_event_leaves_state_untouched() {
        let wizard = step(&Wizard::new(), WizardEvent::ChooseType(DocumentType::Nda));
        let before = wizard.clone();
        let _ = wizard.apply(set("nope", "x"));
        assert_eq!(wizard, before);
    }

    #[test]
    fn review_back_goes_to_last_section() {
        let review = at_review(DocumentType::Sow);
        assert_eq!(step(&review, WizardEvent::Back).phase(), Phase::EditSection(2));
    }
}
