//! Turns the text of the result region into an [`EligibilityRecord`].
//!
//! The result region renders as `Label: value` lines, occasionally with a
//! value wrapped onto the following line(s):
//!
//! ```text
//! Eligibility Details
//! Eligibility: Yes
//! Scheme Id: 12345
//! Doctor Number: D1
//! ```
//!
//! Parsing is pure and never fails; labels that do not appear leave their
//! field `None`.

use crate::outcome::EligibilityRecord;

/// Header line printed above the record. Skipped by the parser.
pub const RECORD_HEADER: &str = "Eligibility Details";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Eligibility,
    SchemeId,
    SchemeType,
    DoctorNumber,
    DateOfBirth,
    EligibilityStartDate,
    EligibilityEndDate,
}

const LABELS: [(&str, Field); 7] = [
    ("Eligibility", Field::Eligibility),
    ("Scheme Id", Field::SchemeId),
    ("Scheme Type", Field::SchemeType),
    ("Doctor Number", Field::DoctorNumber),
    ("Date of Birth", Field::DateOfBirth),
    ("Eligibility Start Date", Field::EligibilityStartDate),
    ("Eligibility End Date", Field::EligibilityEndDate),
];

impl Field {
    fn from_label(label: &str) -> Option<Self> {
        LABELS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(label))
            .map(|(_, field)| *field)
    }

    fn slot(self, record: &mut EligibilityRecord) -> &mut Option<String> {
        match self {
            Self::Eligibility => &mut record.eligibility,
            Self::SchemeId => &mut record.scheme_id,
            Self::SchemeType => &mut record.scheme_type,
            Self::DoctorNumber => &mut record.doctor_number,
            Self::DateOfBirth => &mut record.date_of_birth,
            Self::EligibilityStartDate => &mut record.eligibility_start_date,
            Self::EligibilityEndDate => &mut record.eligibility_end_date,
        }
    }
}

/// Label most recently seen while scanning.
#[derive(Debug, Clone, Copy)]
enum Cursor {
    /// No label yet.
    Unset,
    /// The last label is not one we keep; its continuation lines are dropped.
    Ignored,
    Field(Field),
}

/// Parse result-region text into a record.
pub fn parse(raw_text: &str) -> EligibilityRecord {
    let mut record = EligibilityRecord::default();
    let mut cursor = Cursor::Unset;

    for line in raw_text.lines() {
        let line = line.trim();
        if line.is_empty() || line.eq_ignore_ascii_case(RECORD_HEADER) {
            continue;
        }

        match line.split_once(':') {
            Some((label, value)) => {
                cursor = match Field::from_label(label.trim()) {
                    Some(field) => {
                        let value = value.trim();
                        if !value.is_empty() {
                            *field.slot(&mut record) = Some(value.to_string());
                        }
                        Cursor::Field(field)
                    }
                    None => Cursor::Ignored,
                };
            }
            None => {
                if let Cursor::Field(field) = cursor {
                    let slot = field.slot(&mut record);
                    match slot {
                        Some(existing) => {
                            existing.push(' ');
                            existing.push_str(line);
                        }
                        None => *slot = Some(line.to_string()),
                    }
                }
            }
        }
    }

    record
}
